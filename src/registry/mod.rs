//! WebSocket endpoint registry
//!
//! Maps request paths to endpoint configurations, with exact matches
//! taking precedence over URI templates. Templates live in buckets keyed
//! by segment count, ordered by their normalized path; the first template
//! in that order whose match binds wins.
//!
//! ```text
//!        find_mapping("/rooms/42")
//!                 │
//!        exact: {"/rooms/lobby": cfg, ...}      ── hit? return
//!                 │ miss
//!        templated[2]: BTreeMap by normalized path
//!            "/rooms/{}"  ──► match? bind {id: "42"} and return
//!            "/{}/lobby"  ──► (only reached if the previous missed)
//! ```
//!
//! The registry is shared across request-handling tasks. Lookups and
//! insertions synchronize on reader-writer locks per map, so readers see
//! either the pre- or post-insert bucket but never a torn one. No lock is
//! held across a session close or an endpoint handler callback.

pub mod config;
pub mod session;
pub mod template;

pub use config::{EndpointConfig, RegistryConfig};
pub use session::{
    CloseCode, CloseReason, EncoderFactory, EndpointHandler, MessageEncoder, WsSession,
};
pub use template::UriTemplate;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::DeploymentError;

/// A successful path lookup: the endpoint plus any template bindings
#[derive(Debug, Clone)]
pub struct MappingResult {
    pub config: Arc<EndpointConfig>,
    pub path_params: HashMap<String, String>,
}

#[derive(Debug)]
struct TemplateMatch {
    template: UriTemplate,
    config: Arc<EndpointConfig>,
}

/// Concurrent path-to-endpoint registry for one server container
pub struct EndpointRegistry {
    config: RegistryConfig,
    /// Paths without parameters
    exact: RwLock<HashMap<String, Arc<EndpointConfig>>>,
    /// Parameterized paths bucketed by segment count, ordered by
    /// normalized path within a bucket
    templated: RwLock<HashMap<usize, BTreeMap<String, TemplateMatch>>>,
    /// Every path ever registered, template or not
    registered_paths: RwLock<HashSet<String>>,
    /// One-way gate: flips to false on the first lookup and never back
    add_allowed: AtomicBool,
    /// All registered sessions by id
    sessions: RwLock<HashMap<u64, Arc<WsSession>>>,
    /// Sessions grouped by the HTTP session that authenticated them
    authenticated_sessions: RwLock<HashMap<String, HashMap<u64, Arc<WsSession>>>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            exact: RwLock::new(HashMap::new()),
            templated: RwLock::new(HashMap::new()),
            registered_paths: RwLock::new(HashSet::new()),
            add_allowed: AtomicBool::new(true),
            sessions: RwLock::new(HashMap::new()),
            authenticated_sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Whether `add_endpoint` would currently be accepted under
    /// handshake enforcement
    pub fn is_add_allowed(&self) -> bool {
        self.add_allowed.load(Ordering::Acquire)
    }

    /// Publish an endpoint at its configured path.
    ///
    /// Fails on duplicate paths (a template counts as a duplicate of any
    /// template with the same normalized form), on an encoder factory
    /// that cannot instantiate, and, when configured, after the first
    /// mapping lookup.
    pub async fn add_endpoint(&self, config: EndpointConfig) -> Result<(), DeploymentError> {
        tracing::debug!(path = %config.path, "add endpoint");
        if self.config.enforce_no_add_after_handshake && !self.is_add_allowed() {
            return Err(DeploymentError::AddNotAllowed);
        }
        if config.path.is_empty() {
            return Err(DeploymentError::MissingPath);
        }
        // instantiate every encoder once so a broken one fails the
        // deployment, not the first outbound message
        for factory in &config.encoders {
            if let Err(reason) = factory.instantiate() {
                return Err(DeploymentError::EncoderInvalid {
                    name: factory.name().to_string(),
                    reason,
                });
            }
        }

        let template = UriTemplate::new(&config.path)?;
        let path = config.path.clone();
        let config = Arc::new(config);
        if template.has_parameters() {
            let mut templated = self.templated.write().await;
            let bucket = templated.entry(template.segment_count()).or_default();
            let key = template.normalized_path().to_string();
            if bucket.contains_key(&key) {
                return Err(DeploymentError::DuplicatePath(path));
            }
            bucket.insert(key, TemplateMatch { template, config });
        } else {
            let mut exact = self.exact.write().await;
            if exact.contains_key(&path) {
                return Err(DeploymentError::DuplicatePath(path));
            }
            exact.insert(path.clone(), config);
        }
        self.registered_paths.write().await.insert(path);
        Ok(())
    }

    /// Resolve a request path to an endpoint.
    ///
    /// Exact matches win; otherwise the request is parsed as a path and
    /// tried against the templates with the same segment count in
    /// normalized order. The first call seals registration when
    /// `enforce_no_add_after_handshake` is set.
    pub async fn find_mapping(&self, path: &str) -> Option<MappingResult> {
        // one-way and idempotent, so a plain store is enough
        if self.is_add_allowed() {
            self.add_allowed.store(false, Ordering::Release);
        }

        if let Some(config) = self.exact.read().await.get(path) {
            return Some(MappingResult {
                config: config.clone(),
                path_params: HashMap::new(),
            });
        }

        // not an exact match; an unparseable path cannot match a template
        let request = UriTemplate::new(path).ok()?;
        let templated = self.templated.read().await;
        let bucket = templated.get(&request.segment_count())?;
        for candidate in bucket.values() {
            if let Some(path_params) = candidate.template.matches(&request) {
                return Some(MappingResult {
                    config: candidate.config.clone(),
                    path_params,
                });
            }
        }
        None
    }

    /// Paths registered so far
    pub async fn registered_paths(&self) -> HashSet<String> {
        self.registered_paths.read().await.clone()
    }

    /// Track a session; authenticated sessions are additionally indexed
    /// by their HTTP session id so they can be closed with it
    pub async fn register_session(&self, session: Arc<WsSession>) {
        self.sessions
            .write()
            .await
            .insert(session.id(), session.clone());
        if session.is_open() && session.user_principal().is_some() {
            if let Some(http_id) = session.http_session_id() {
                self.authenticated_sessions
                    .write()
                    .await
                    .entry(http_id.to_string())
                    .or_default()
                    .insert(session.id(), session.clone());
                tracing::debug!(session_id = session.id(), "authenticated session registered");
            }
        }
        session.notify_open().await;
    }

    pub async fn unregister_session(&self, session: &Arc<WsSession>) {
        if let Some(http_id) = session.http_session_id() {
            let mut authenticated = self.authenticated_sessions.write().await;
            // absent bucket means the HTTP session already ended
            if let Some(bucket) = authenticated.get_mut(http_id) {
                bucket.remove(&session.id());
                if bucket.is_empty() {
                    authenticated.remove(http_id);
                }
            }
        }
        self.sessions.write().await.remove(&session.id());
        tracing::debug!(session_id = session.id(), "session unregistered");
    }

    /// Close every WebSocket session tied to an ended HTTP session.
    ///
    /// The bucket is removed first, so concurrent register/unregister
    /// calls observe a registry that no longer knows the HTTP session;
    /// the closes themselves run without any registry lock held.
    pub async fn close_authenticated_sessions(&self, http_session_id: &str) {
        let bucket = self
            .authenticated_sessions
            .write()
            .await
            .remove(http_session_id);
        let Some(bucket) = bucket else {
            return;
        };
        tracing::debug!(
            http_session_id = http_session_id,
            count = bucket.len(),
            "closing sessions for ended http session"
        );
        for session in bucket.into_values() {
            session.close(CloseReason::authenticated_session_ended()).await;
            self.sessions.write().await.remove(&session.id());
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_exact_match_beats_template() {
        let registry = EndpointRegistry::new();
        registry
            .add_endpoint(EndpointConfig::new("/rooms/{id}").user_property("kind", "templated"))
            .await
            .unwrap();
        registry
            .add_endpoint(EndpointConfig::new("/rooms/lobby").user_property("kind", "exact"))
            .await
            .unwrap();

        let mapping = registry.find_mapping("/rooms/lobby").await.unwrap();
        assert_eq!(
            mapping.config.user_properties.get("kind").map(String::as_str),
            Some("exact")
        );
        assert!(mapping.path_params.is_empty());

        let mapping = registry.find_mapping("/rooms/42").await.unwrap();
        assert_eq!(
            mapping.config.user_properties.get("kind").map(String::as_str),
            Some("templated")
        );
        assert_eq!(
            mapping.path_params.get("id").map(String::as_str),
            Some("42")
        );
    }

    #[tokio::test]
    async fn test_no_match() {
        let registry = EndpointRegistry::new();
        registry
            .add_endpoint(EndpointConfig::new("/rooms/{id}"))
            .await
            .unwrap();
        assert!(registry.find_mapping("/rooms").await.is_none());
        assert!(registry.find_mapping("/halls/1/2").await.is_none());
        assert!(registry.find_mapping("not-a-path").await.is_none());
    }

    #[tokio::test]
    async fn test_template_order_first_match_wins() {
        let registry = EndpointRegistry::new();
        // both match "/rooms/lobby"; "/rooms/{}" sorts before "/{}/lobby"
        // because 'r' < '{'
        registry
            .add_endpoint(EndpointConfig::new("/{kind}/lobby").user_property("t", "second"))
            .await
            .unwrap();
        registry
            .add_endpoint(EndpointConfig::new("/rooms/{id}").user_property("t", "first"))
            .await
            .unwrap();

        let mapping = registry.find_mapping("/rooms/lobby").await.unwrap();
        assert_eq!(
            mapping.config.user_properties.get("t").map(String::as_str),
            Some("first")
        );
    }

    #[tokio::test]
    async fn test_duplicate_paths_rejected() {
        let registry = EndpointRegistry::new();
        registry
            .add_endpoint(EndpointConfig::new("/chat"))
            .await
            .unwrap();
        let err = registry
            .add_endpoint(EndpointConfig::new("/chat"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::DuplicatePath(_)));

        registry
            .add_endpoint(EndpointConfig::new("/rooms/{id}"))
            .await
            .unwrap();
        // same normalized template, different parameter name
        let err = registry
            .add_endpoint(EndpointConfig::new("/rooms/{name}"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::DuplicatePath(_)));
    }

    #[tokio::test]
    async fn test_add_after_first_lookup_rejected_when_enforced() {
        let registry = EndpointRegistry::with_config(
            RegistryConfig::new().enforce_no_add_after_handshake(true),
        );
        registry
            .add_endpoint(EndpointConfig::new("/chat"))
            .await
            .unwrap();
        assert!(registry.is_add_allowed());

        let _ = registry.find_mapping("/chat").await;
        assert!(!registry.is_add_allowed());

        let err = registry
            .add_endpoint(EndpointConfig::new("/late"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::AddNotAllowed));
    }

    #[tokio::test]
    async fn test_add_after_lookup_allowed_without_enforcement() {
        let registry = EndpointRegistry::new();
        registry
            .add_endpoint(EndpointConfig::new("/chat"))
            .await
            .unwrap();
        let _ = registry.find_mapping("/chat").await;
        // the gate still flips, but nothing checks it
        assert!(!registry.is_add_allowed());
        assert!(registry
            .add_endpoint(EndpointConfig::new("/late"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_missing_path_rejected() {
        let registry = EndpointRegistry::new();
        let err = registry
            .add_endpoint(EndpointConfig::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::MissingPath));
    }

    #[tokio::test]
    async fn test_invalid_encoder_fails_deployment() {
        let registry = EndpointRegistry::new();
        let err = registry
            .add_endpoint(
                EndpointConfig::new("/chat").encoder(EncoderFactory::new("broken", || {
                    Err("no codec".to_string())
                })),
            )
            .await
            .unwrap_err();
        match err {
            DeploymentError::EncoderInvalid { name, reason } => {
                assert_eq!(name, "broken");
                assert_eq!(reason, "no codec");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    struct CountingHandler {
        opens: AtomicUsize,
        closes: AtomicUsize,
    }

    impl CountingHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                opens: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl EndpointHandler for CountingHandler {
        async fn on_open(&self, _session: &WsSession) {
            self.opens.fetch_add(1, Ordering::SeqCst);
        }
        async fn on_close(&self, _session: &WsSession, reason: &CloseReason) {
            assert_eq!(reason.code, CloseCode::ViolatedPolicy);
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_close_authenticated_sessions() {
        let registry = EndpointRegistry::new();
        let handler = CountingHandler::new();

        let alice_1 = Arc::new(
            WsSession::new(1, "/rooms/1")
                .with_user("alice", "http-a")
                .with_handler(handler.clone()),
        );
        let alice_2 = Arc::new(
            WsSession::new(2, "/rooms/2")
                .with_user("alice", "http-a")
                .with_handler(handler.clone()),
        );
        let anonymous = Arc::new(WsSession::new(3, "/rooms/3").with_handler(handler.clone()));

        registry.register_session(alice_1.clone()).await;
        registry.register_session(alice_2.clone()).await;
        registry.register_session(anonymous.clone()).await;
        assert_eq!(registry.session_count().await, 3);
        assert_eq!(handler.opens.load(Ordering::SeqCst), 3);

        registry.close_authenticated_sessions("http-a").await;
        assert!(!alice_1.is_open());
        assert!(!alice_2.is_open());
        assert!(anonymous.is_open());
        assert_eq!(handler.closes.load(Ordering::SeqCst), 2);
        assert_eq!(registry.session_count().await, 1);

        // already removed; a second call is a no-op
        registry.close_authenticated_sessions("http-a").await;
        assert_eq!(handler.closes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unregister_clears_authenticated_bucket() {
        let registry = EndpointRegistry::new();
        let session = Arc::new(WsSession::new(9, "/chat").with_user("bob", "http-b"));
        registry.register_session(session.clone()).await;
        registry.unregister_session(&session).await;
        assert_eq!(registry.session_count().await, 0);

        // nothing left to close
        registry.close_authenticated_sessions("http-b").await;
        assert!(session.is_open());
    }

    #[tokio::test]
    async fn test_registered_paths_accumulate() {
        let registry = EndpointRegistry::new();
        registry
            .add_endpoint(EndpointConfig::new("/chat"))
            .await
            .unwrap();
        registry
            .add_endpoint(EndpointConfig::new("/rooms/{id}"))
            .await
            .unwrap();
        let paths = registry.registered_paths().await;
        assert!(paths.contains("/chat"));
        assert!(paths.contains("/rooms/{id}"));
    }

    #[tokio::test]
    async fn test_concurrent_lookups_during_insertion() {
        let registry = Arc::new(EndpointRegistry::new());
        registry
            .add_endpoint(EndpointConfig::new("/rooms/{id}"))
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for i in 0..8 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    let _ = registry
                        .add_endpoint(EndpointConfig::new(format!("/extra{}/{{id}}", i)))
                        .await;
                } else {
                    // must always resolve regardless of insert timing
                    assert!(registry.find_mapping("/rooms/7").await.is_some());
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
    }
}
