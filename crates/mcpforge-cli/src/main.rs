//! Launches the reference `mcpforge` server over one of the three
//! transports named on the command line. Grounded on the teacher's
//! `turbomcp-cli::main` (thin `main` delegating to a `run()` that returns
//! a `Result`, `tracing_subscriber` initialized up front, process exit
//! code derived from the error kind).

mod cli;
mod error;
mod server;

use clap::Parser;
use cli::{Cli, Commands};
use error::CliError;
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();

    match run().await {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            tracing::error!(error = %err, "mcpforge exited with an error");
            std::process::exit(err.exit_code());
        }
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Stdio => {
            let server = server::build_server(false)?;
            mcpforge::run_stdio(&server).await?;
        }
        Commands::HttpSse { port, token, openapi } => {
            let server = Arc::new(server::build_server(openapi)?);
            let addr: SocketAddr = format!("127.0.0.1:{port}")
                .parse()
                .map_err(|e| CliError::InvalidArguments(format!("invalid port {port}: {e}")))?;

            let auth = token.map(|expected| -> mcpforge::AuthPredicate {
                Arc::new(move |presented: Option<&str>| match presented {
                    Some(t) if t == expected => mcpforge::AuthOutcome::Authorized,
                    _ => mcpforge::AuthOutcome::Unauthorized("missing or incorrect bearer token".to_string()),
                })
            });

            let options = mcpforge::HttpOptions { auth, openapi_enabled: openapi };
            mcpforge::run_http(server, addr, options).await?;
        }
        Commands::Tcp { name, port } => {
            let server = Arc::new(server::build_server(false)?);
            let addr: SocketAddr = format!("127.0.0.1:{port}")
                .parse()
                .map_err(|e| CliError::InvalidArguments(format!("invalid port {port}: {e}")))?;

            let options = mcpforge::TcpOptions {
                mdns_service_name: name,
                ..Default::default()
            };
            mcpforge::run_tcp(server, addr, options).await?;
        }
    }

    Ok(())
}
