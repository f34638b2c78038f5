#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_async)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::redundant_closure_for_method_calls)]

//! # vendor-connectors
//!
//! Uniform connectors for third-party vendor APIs. Every connector declares
//! its inputs (credentials, endpoints) and its methods once; the same
//! declaration drives the CLI, the MCP server and the agent-framework tool
//! renderers.
//!
//! ## Architecture
//!
//! ```text
//! error.rs        error kinds, backend errors, normalized errors
//! inputs.rs       input specs and the override/env/config/prompt resolver
//! connector.rs    method tables, parameter specs, tool categories
//! registry.rs     connector descriptors and the instance cache
//! dispatch.rs     argument validation and normalized results
//! http.rs         shared reqwest backend for vendor REST APIs
//! connectors/     built-in vendor connectors
//! tools/          tool catalog and framework renderers
//! mcp.rs          MCP JSON-RPC protocol handler (stdio)
//! config.rs       CLI definition and config file loading
//! ```
//!
//! ## Connectors
//!
//! `github`, `slack`, `vault`, `zoom`, `anthropic`, `cursor`, `meshy`,
//! `jules`. Tools are named `{connector}_{method}`.

pub mod config;
pub mod connector;
pub mod connectors;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod inputs;
pub mod mcp;
pub mod registry;
pub mod tools;

pub use connector::{Args, Connector, MethodSpec, ParamSpec, ToolCategory, VendorConnector};
pub use dispatch::Dispatcher;
pub use error::{BackendError, ConnectorError, ErrorKind, NormalizedError};
pub use inputs::{InputResolver, InputSpec, ResolvedConfig};
pub use registry::{ConnectorDescriptor, ConnectorRegistry};
pub use tools::{Framework, ToolCatalog, ToolDefinition};
