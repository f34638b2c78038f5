//! # vendor-connectors
//!
//! Command-line front end: calls connector methods directly, prints tool
//! metadata for agent frameworks, or runs the MCP server on stdio.
//!
//! Results go to stdout as JSON. Logs and errors go to stderr; a failed
//! call exits with the error kind's code.

use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info};

use vendor_connectors::config::{self, Cli, Command, LoadedConfig};
use vendor_connectors::connector::ToolCategory;
use vendor_connectors::error::{ConnectorError, ErrorKind, NormalizedError};
use vendor_connectors::inputs::{InputResolver, ProcessEnv, TerminalPrompter};
use vendor_connectors::mcp;
use vendor_connectors::registry::ConnectorRegistry;
use vendor_connectors::tools::{ConfiguredFrameworks, ToolCatalog};
use vendor_connectors::Dispatcher;

const DEFAULT_LOG_LEVEL: &str = "warn";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let loaded = match config::load(cli.config.as_deref(), &ProcessEnv) {
        Ok(c) => c,
        Err(e) => fail(&NormalizedError::new(ErrorKind::Config, e.to_string())),
    };

    let log_filter = std::env::var("RUST_LOG")
        .ok()
        .or_else(|| loaded.app.logging.level.clone())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = &loaded.path {
        debug!(path = %path.display(), keys = loaded.values.len(), "config loaded");
    }

    // The MCP server owns stdin, so it never prompts.
    let serving = matches!(cli.command, Command::Serve);
    let mut resolver = InputResolver::new().with_config(loaded.values.clone());
    if !serving && config::prompting_allowed(cli.interactive, &loaded.app, &ProcessEnv) {
        resolver = resolver.with_prompter(TerminalPrompter);
    }

    let registry = match ConnectorRegistry::with_builtin(resolver) {
        Ok(r) => Arc::new(r),
        Err(e) => fail(&NormalizedError::from(e)),
    };
    let dispatcher = Dispatcher::new(registry);

    let outcome = match cli.command {
        Command::List => {
            list(&dispatcher);
            Ok(())
        }
        Command::Call {
            inputs,
            connector,
            method,
            args,
        } => call(&dispatcher, &inputs, &connector, &method, &args).await,
        Command::Tools {
            connector,
            framework,
            categories,
        } => tools(&dispatcher, &loaded, connector.as_deref(), &framework, &categories),
        Command::Serve => serve(&dispatcher).await,
    };

    if let Err(e) = outcome {
        fail(&e);
    }
}

fn list(dispatcher: &Dispatcher) {
    for name in dispatcher.registry().names() {
        println!("{name}");
    }
}

async fn call(
    dispatcher: &Dispatcher,
    inputs: &[String],
    connector: &str,
    method: &str,
    args: &[String],
) -> Result<(), NormalizedError> {
    let at_call = |e: ConnectorError| NormalizedError::from(e).at(connector, method);
    let overrides = config::parse_inputs(inputs).map_err(at_call)?;
    // Unknown names are reported by the dispatcher below.
    let spec = dispatcher
        .registry()
        .descriptor(connector)
        .ok()
        .and_then(|d| d.method(method));
    let args = config::parse_call_args(args, spec).map_err(at_call)?;
    let result = dispatcher
        .call_with(connector, method, args, &overrides)
        .await?;
    print_json(&result);
    Ok(())
}

fn tools(
    dispatcher: &Dispatcher,
    loaded: &LoadedConfig,
    connector: Option<&str>,
    framework: &str,
    categories: &[String],
) -> Result<(), NormalizedError> {
    let catalog = match connector {
        Some(name) => ToolCatalog::for_connector(dispatcher, name)?,
        None => ToolCatalog::all(dispatcher)?,
    };
    let categories = categories
        .iter()
        .map(|c| c.parse::<ToolCategory>())
        .collect::<Result<Vec<_>, _>>()?;
    let catalog = catalog
        .filter(&categories, &[])
        .with_probe(ConfiguredFrameworks::from_names(&loaded.app.frameworks.available));

    let rendered: Vec<_> = catalog
        .get_tools(framework)?
        .iter()
        .map(|tool| tool.metadata())
        .collect();
    print_json(&serde_json::Value::Array(rendered));
    Ok(())
}

async fn serve(dispatcher: &Dispatcher) -> Result<(), NormalizedError> {
    let catalog = ToolCatalog::all(dispatcher)?;
    info!(
        connectors = dispatcher.registry().names().len(),
        tools = catalog.len(),
        "vendor-connectors v{} serving MCP on stdio",
        env!("CARGO_PKG_VERSION")
    );
    mcp::run_stdio(&catalog).await;
    Ok(())
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("vendor-connectors: cannot render result: {e}");
            std::process::exit(1);
        }
    }
}

/// Print the error as JSON on stderr and exit with its kind's code.
fn fail(err: &NormalizedError) -> ! {
    let text = serde_json::to_string(&err.to_json()).unwrap_or_else(|_| err.to_string());
    eprintln!("{text}");
    std::process::exit(err.kind.exit_code());
}
