//! CLI-specific error type, grounded on the teacher's `turbomcp-cli::error::CliError`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("transport error: {0}")]
    Transport(#[from] mcpforge::McpError),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("registration error: {0}")]
    Registration(#[from] mcpforge::RegistryError),
}

impl CliError {
    /// Exit codes per the CLI surface: transport failures are `1`,
    /// everything a client could have avoided by calling in validly is `2`.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Transport(_) => 1,
            CliError::InvalidArguments(_) | CliError::Registration(_) => 2,
        }
    }
}
