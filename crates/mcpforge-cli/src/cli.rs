//! CLI argument parsing. Grounded on the teacher's `turbomcp-cli::cli`
//! (`Parser`/`Subcommand` derive, `#[command(name = "...")]` per variant).

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "mcpforge", version, about = "Launches an mcpforge server over one of three transports")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve over newline-delimited JSON-RPC on stdin/stdout.
    Stdio,
    /// Serve over HTTP with a Server-Sent-Events push channel.
    #[command(name = "httpsse")]
    HttpSse {
        #[arg(long)]
        port: u16,
        /// Bearer token required on every request when set; unauthenticated
        /// access is allowed when omitted (spec: fail-open when unconfigured).
        #[arg(long)]
        token: Option<String>,
        /// Serve `GET /openapi.json` and `GET /.well-known/ai-plugin.json`.
        #[arg(long, default_value_t = false)]
        openapi: bool,
    },
    /// Serve over raw TCP, advertised via `_mcp._tcp` mDNS.
    Tcp {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = 0)]
        port: u16,
    },
}
