//! Per-client session lifecycle (spec §3, §4.G).

use mcpforge_types::Implementation;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// `Uninitialized → Initializing → Ready → Closed`, plus the implicit
/// "any state → Closed" transition on disconnect or unrecoverable violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Uninitialized = 0,
    Initializing = 1,
    Ready = 2,
    Closed = 3,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Uninitialized,
            1 => Self::Initializing,
            2 => Self::Ready,
            _ => Self::Closed,
        }
    }
}

/// A notification or log/progress event pushed out-of-band by a thunk while
/// `CurrentSession` is bound, spec §4.G.
#[derive(Debug, Clone)]
pub enum PushEvent {
    Log { level: LogLevel, message: String },
    Progress { progress: f64, total: Option<f64>, message: Option<String> },
    ResourcesListChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
}

/// The per-connection state of one client. Owned by its transport connection;
/// destroyed on disconnect or explicit shutdown (spec §3).
pub struct Session {
    pub id: String,
    state: AtomicU8,
    protocol_version: parking_lot::RwLock<Option<String>>,
    pub client_info: parking_lot::RwLock<Option<Implementation>>,
    negotiated_capabilities: parking_lot::RwLock<HashSet<String>>,
    log_level: parking_lot::RwLock<LogLevel>,
    push_tx: mpsc::Sender<PushEvent>,
}

impl Session {
    /// Creates a session plus the receiving half of its push channel,
    /// which the transport owns and drains (single-writer/single-reader,
    /// spec §5).
    pub fn new(id: impl Into<String>) -> (Arc<Self>, mpsc::Receiver<PushEvent>) {
        let (push_tx, push_rx) = mpsc::channel(64);
        let session = Arc::new(Self {
            id: id.into(),
            state: AtomicU8::new(SessionState::Uninitialized as u8),
            protocol_version: parking_lot::RwLock::new(None),
            client_info: parking_lot::RwLock::new(None),
            negotiated_capabilities: parking_lot::RwLock::new(HashSet::new()),
            log_level: parking_lot::RwLock::new(LogLevel::Info),
            push_tx,
        });
        (session, push_rx)
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// `Uninitialized -> Initializing`. Returns `false` if `initialize` was
    /// already attempted (spec §9: re-initialization is forbidden, surfaced
    /// by the caller as `InvalidRequest`).
    pub fn begin_initialize(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Uninitialized as u8,
                SessionState::Initializing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// `Initializing -> Ready`, recording the negotiated version and
    /// capability kinds.
    pub fn complete_initialize(&self, protocol_version: String, client_info: Implementation, capabilities: HashSet<String>) {
        *self.protocol_version.write() = Some(protocol_version);
        *self.client_info.write() = Some(client_info);
        *self.negotiated_capabilities.write() = capabilities;
        self.set_state(SessionState::Ready);
    }

    pub fn close(&self) {
        self.set_state(SessionState::Closed);
    }

    pub fn protocol_version(&self) -> Option<String> {
        self.protocol_version.read().clone()
    }

    pub fn log_level(&self) -> LogLevel {
        *self.log_level.read()
    }

    pub fn set_log_level(&self, level: LogLevel) {
        *self.log_level.write() = level;
    }

    /// Best-effort push: a full or closed channel drops the event rather
    /// than failing the calling thunk (spec §4.G).
    pub fn push(&self, event: PushEvent) {
        let _ = self.push_tx.try_send(event);
    }
}

tokio::task_local! {
    /// Ambient "current session", bound for the duration of one thunk
    /// invocation (spec §3, §9: task-local, never a global).
    static CURRENT_SESSION: Arc<Session>;
}

/// Runs `f` with `session` bound as the ambient `CurrentSession`.
pub async fn with_current_session<F, T>(session: Arc<Session>, f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    CURRENT_SESSION.scope(session, f).await
}

/// Reads the ambient session, if one is bound on the current task.
pub fn try_current_session() -> Option<Arc<Session>> {
    CURRENT_SESSION.try_with(|s| s.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uninitialized() {
        let (session, _rx) = Session::new("s1");
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[test]
    fn second_begin_initialize_fails() {
        let (session, _rx) = Session::new("s1");
        assert!(session.begin_initialize());
        assert!(!session.begin_initialize());
    }

    #[tokio::test]
    async fn current_session_is_bound_only_inside_scope() {
        let (session, _rx) = Session::new("s1");
        assert!(try_current_session().is_none());
        let id = with_current_session(session.clone(), async { try_current_session().unwrap().id.clone() }).await;
        assert_eq!(id, "s1");
        assert!(try_current_session().is_none());
    }

    #[test]
    fn push_to_full_channel_is_dropped_not_fatal() {
        let (session, _rx) = Session::new("s1");
        for _ in 0..200 {
            session.push(PushEvent::ResourcesListChanged);
        }
    }
}
