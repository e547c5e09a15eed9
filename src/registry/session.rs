//! WebSocket sessions and endpoint lifecycle hooks

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

/// WebSocket close codes (RFC 6455 section 7.4.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    NormalClosure = 1000,
    GoingAway = 1001,
    ProtocolError = 1002,
    CannotAccept = 1003,
    NotConsistent = 1007,
    ViolatedPolicy = 1008,
    TooBig = 1009,
    NoExtension = 1010,
    UnexpectedCondition = 1011,
}

/// Why a session was closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: CloseCode,
    pub phrase: String,
}

impl CloseReason {
    pub fn new(code: CloseCode, phrase: impl Into<String>) -> Self {
        Self {
            code,
            phrase: phrase.into(),
        }
    }

    /// Close reason applied when an authenticated HTTP session ends and
    /// its WebSocket sessions are torn down with it
    pub fn authenticated_session_ended() -> Self {
        Self::new(
            CloseCode::ViolatedPolicy,
            "Authenticated HTTP session that has ended",
        )
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.phrase, self.code)
    }
}

/// Endpoint lifecycle hooks, invoked by the registry outside of any of
/// its locks
#[async_trait]
pub trait EndpointHandler: Send + Sync {
    async fn on_open(&self, _session: &WsSession) {}
    async fn on_close(&self, _session: &WsSession, _reason: &CloseReason) {}
}

/// Converts outbound application messages into WebSocket frames
pub trait MessageEncoder: Send {
    fn encode(&mut self, message: &str) -> Result<Bytes, String>;
}

/// Deferred encoder construction, validated when the endpoint is
/// published: a factory whose `instantiate` fails makes deployment fail
/// rather than the first message send.
#[derive(Clone)]
pub struct EncoderFactory {
    name: String,
    constructor: Arc<dyn Fn() -> Result<Box<dyn MessageEncoder>, String> + Send + Sync>,
}

impl EncoderFactory {
    pub fn new(
        name: impl Into<String>,
        constructor: impl Fn() -> Result<Box<dyn MessageEncoder>, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            constructor: Arc::new(constructor),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instantiate(&self) -> Result<Box<dyn MessageEncoder>, String> {
        (self.constructor)()
    }
}

impl fmt::Debug for EncoderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderFactory")
            .field("name", &self.name)
            .finish()
    }
}

/// One connected WebSocket session
///
/// The transport owns the socket; the registry only tracks identity,
/// authentication linkage, and open/closed state.
pub struct WsSession {
    id: u64,
    path: String,
    user_principal: Option<String>,
    http_session_id: Option<String>,
    open: AtomicBool,
    handler: Option<Arc<dyn EndpointHandler>>,
}

impl WsSession {
    pub fn new(id: u64, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            user_principal: None,
            http_session_id: None,
            open: AtomicBool::new(true),
            handler: None,
        }
    }

    /// Attach the authenticated user and the HTTP session the upgrade
    /// came from
    pub fn with_user(
        mut self,
        principal: impl Into<String>,
        http_session_id: impl Into<String>,
    ) -> Self {
        self.user_principal = Some(principal.into());
        self.http_session_id = Some(http_session_id.into());
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn EndpointHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn user_principal(&self) -> Option<&str> {
        self.user_principal.as_deref()
    }

    pub fn http_session_id(&self) -> Option<&str> {
        self.http_session_id.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Close the session once; later calls are no-ops. The handler's
    /// close hook runs on the first transition only.
    pub async fn close(&self, reason: CloseReason) {
        if self.open.swap(false, Ordering::AcqRel) {
            tracing::debug!(session_id = self.id, reason = %reason, "session closed");
            if let Some(handler) = &self.handler {
                handler.on_close(self, &reason).await;
            }
        }
    }

    pub(crate) async fn notify_open(&self) {
        if let Some(handler) = &self.handler {
            handler.on_open(self).await;
        }
    }
}

impl fmt::Debug for WsSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsSession")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}
