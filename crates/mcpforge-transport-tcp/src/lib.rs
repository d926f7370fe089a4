//! TCP transport (spec §4.K): newline-delimited JSON-RPC identical to the
//! stdio framing, one session per connection, optional `_mcp._tcp` mDNS
//! advertisement. Grounded on the teacher's `run_tcp` accept loop
//! (`ConnectionCounter`-style concurrency gate, per-connection task).

use mcpforge_server::{parse_incoming, McpServer, Session};
use mcpforge_types::{JsonRpcError, JsonRpcResponse, McpError, ResponseId};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

/// Options controlling one TCP listener.
pub struct TcpOptions {
    pub max_connections: usize,
    /// Reject any peer whose address is not loopback (spec §4.K:
    /// "local-only connection gating" is the default posture).
    pub local_only: bool,
    /// When set, advertises `_mcp._tcp.local.` via mDNS under this instance name.
    pub mdns_service_name: Option<String>,
}

impl Default for TcpOptions {
    fn default() -> Self {
        Self {
            max_connections: mcpforge_server::ConnectionLimits::default().max_connections,
            local_only: true,
            mdns_service_name: None,
        }
    }
}

/// Binds `addr`, optionally advertises over mDNS, and serves connections
/// until the listener errors or the process is signalled to stop.
pub async fn run_tcp(server: Arc<McpServer>, addr: SocketAddr, options: TcpOptions) -> Result<(), McpError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| McpError::internal(format!("failed to bind {addr}: {e}")))?;
    let bound_addr = listener.local_addr().map_err(|e| McpError::internal(format!("local_addr failed: {e}")))?;

    let _mdns_guard = options
        .mdns_service_name
        .as_deref()
        .map(|name| advertise(name, bound_addr.port()));

    let permits = Arc::new(Semaphore::new(options.max_connections));
    tracing::info!(%bound_addr, max_connections = options.max_connections, "tcp transport listening");

    loop {
        let (stream, peer_addr) = listener
            .accept()
            .await
            .map_err(|e| McpError::internal(format!("accept failed: {e}")))?;

        if options.local_only && !peer_addr.ip().is_loopback() {
            tracing::warn!(%peer_addr, "rejecting non-loopback connection");
            continue;
        }

        let Ok(permit) = Arc::clone(&permits).try_acquire_owned() else {
            tracing::warn!(%peer_addr, "rejecting connection: at capacity");
            continue;
        };

        let server = server.clone();
        tokio::spawn(async move {
            let _permit = permit;
            serve_connection(server, stream, peer_addr).await;
        });
    }
}

async fn serve_connection(server: Arc<McpServer>, stream: tokio::net::TcpStream, peer_addr: SocketAddr) {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    let (session, _push_rx) = Session::new(peer_addr.to_string());
    let max_bytes = server.config.max_message_size;

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                if line.len() > max_bytes {
                    tracing::warn!(%peer_addr, len = line.len(), "rejecting oversized tcp frame");
                    continue;
                }
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match parse_incoming(trimmed) {
                    Ok(batch) => {
                        if let Some(rendered) = server.engine.dispatch_frame(&session, batch).await {
                            if write_value(&mut writer, &rendered).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(err) => {
                        if write_error(&mut writer, &err.to_jsonrpc_error(None)).await.is_err() {
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!(%peer_addr, error = %e, "tcp read error");
                break;
            }
        }
    }

    session.close();
    tracing::debug!(%peer_addr, "tcp connection closed");
}

async fn write_error(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    error: &JsonRpcError,
) -> std::io::Result<()> {
    let response = JsonRpcResponse::error(ResponseId::null(), error.clone());
    write_value(writer, &serde_json::to_value(&response).expect("JsonRpcResponse serializes")).await
}

async fn write_value(writer: &mut tokio::net::tcp::OwnedWriteHalf, value: &serde_json::Value) -> std::io::Result<()> {
    let encoded = serde_json::to_string(value).expect("Value always serializes");
    writer.write_all(encoded.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Holds the mDNS daemon handle alive for as long as the service should stay
/// advertised; dropping it unregisters the service.
struct MdnsGuard {
    daemon: mdns_sd::ServiceDaemon,
    fullname: String,
}

impl Drop for MdnsGuard {
    fn drop(&mut self) {
        if let Err(e) = self.daemon.unregister(&self.fullname) {
            tracing::warn!(error = %e, "failed to unregister mdns service");
        }
    }
}

fn advertise(instance_name: &str, port: u16) -> Option<MdnsGuard> {
    let daemon = match mdns_sd::ServiceDaemon::new() {
        Ok(daemon) => daemon,
        Err(e) => {
            tracing::warn!(error = %e, "mdns daemon unavailable, continuing without advertisement");
            return None;
        }
    };

    let host_name = format!("{instance_name}.local.");
    let ip = local_ipv4().unwrap_or(Ipv4Addr::UNSPECIFIED).to_string();
    let service = match mdns_sd::ServiceInfo::new(
        "_mcp._tcp.local.",
        instance_name,
        &host_name,
        ip.as_str(),
        port,
        None,
    ) {
        Ok(service) => service,
        Err(e) => {
            tracing::warn!(error = %e, "failed to build mdns service info");
            return None;
        }
    };

    let fullname = service.get_fullname().to_string();
    if let Err(e) = daemon.register(service) {
        tracing::warn!(error = %e, "failed to register mdns service");
        return None;
    }
    tracing::info!(instance_name, port, "advertising _mcp._tcp via mdns");
    Some(MdnsGuard { daemon, fullname })
}

fn local_ipv4() -> Option<Ipv4Addr> {
    match std::net::UdpSocket::bind("0.0.0.0:0") {
        Ok(socket) => {
            socket.connect("8.8.8.8:80").ok()?;
            match socket.local_addr().ok()?.ip() {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            }
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_local_only() {
        let options = TcpOptions::default();
        assert!(options.local_only);
        assert!(options.mdns_service_name.is_none());
    }

    #[test]
    fn non_loopback_peer_is_rejected_by_default() {
        let options = TcpOptions::default();
        let remote: SocketAddr = "203.0.113.5:9000".parse().unwrap();
        assert!(options.local_only && !remote.ip().is_loopback());
    }
}
