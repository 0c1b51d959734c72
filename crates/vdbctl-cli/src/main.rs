mod cli;
mod commands;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use cli::CliArgs;
use config::Config;
use std::path::Path;
use tracing::debug;
use vdbctl_logging::{init_logging, LogFormat};
use vdbctl_mcp::{resolve_endpoint, EndpointSources, ExecutionContext, Session};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    init_logging(&config.logging.level, LogFormat::from_name(&config.logging.format))?;

    // Resolve the endpoint once for this invocation
    let sources = EndpointSources::gather(args.server.clone(), Path::new(".env"));
    let endpoint = resolve_endpoint(&sources);
    let context = ExecutionContext::detect();
    debug!(?context, "Execution context detected");

    let mut session = Session::open(endpoint, config.mcp.deadline_for(context)).await?;
    let result = commands::run(&mut session, &args.command, args.json).await;
    session.close().await;
    result
}
