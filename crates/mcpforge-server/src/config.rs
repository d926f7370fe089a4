//! Server configuration: protocol version negotiation, connection limits,
//! required capabilities. Grounded on the teacher's `ServerConfig`/
//! `ServerConfigBuilder` pair.

use std::time::Duration;

/// Protocol versions this engine understands, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2024-11-05"];

pub const DEFAULT_MAX_CONNECTIONS: usize = 1000;
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;
pub const DEFAULT_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    pub preferred_version: String,
    pub supported_versions: Vec<String>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            preferred_version: SUPPORTED_PROTOCOL_VERSIONS[0].to_string(),
            supported_versions: SUPPORTED_PROTOCOL_VERSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ProtocolConfig {
    pub fn is_supported(&self, version: &str) -> bool {
        self.supported_versions.iter().any(|v| v == version)
    }

    /// §4.G: if the client's proposed version is supported, use it;
    /// otherwise reply with the server's newest so the client may retry.
    pub fn negotiate(&self, client_version: &str) -> String {
        if self.is_supported(client_version) {
            client_version.to_string()
        } else {
            self.preferred_version.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionLimits {
    pub max_connections: usize,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Capability kinds a client must advertise for the connection to proceed;
/// empty by default (no requirements).
#[derive(Debug, Clone, Default)]
pub struct RequiredCapabilities {
    pub required: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub protocol: ProtocolConfig,
    pub connection_limits: ConnectionLimits,
    pub required_capabilities: RequiredCapabilities,
    pub max_message_size: usize,
    pub shutdown_deadline: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "mcpforge-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: None,
            protocol: ProtocolConfig::default(),
            connection_limits: ConnectionLimits::default(),
            required_capabilities: RequiredCapabilities::default(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            shutdown_deadline: DEFAULT_SHUTDOWN_DEADLINE,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiate_accepts_supported_version() {
        let cfg = ProtocolConfig::default();
        assert_eq!(cfg.negotiate("2024-11-05"), "2024-11-05");
    }

    #[test]
    fn negotiate_falls_back_to_preferred() {
        let cfg = ProtocolConfig::default();
        assert_eq!(cfg.negotiate("1999-01-01"), cfg.preferred_version);
    }
}
