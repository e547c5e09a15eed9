//! Registry and endpoint configuration

use std::collections::HashMap;
use std::sync::Arc;

use super::session::{EncoderFactory, EndpointHandler};

/// Container-wide defaults for the endpoint registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum buffered size for an incoming binary message, in bytes
    pub binary_buffer_size: usize,

    /// Maximum buffered size for an incoming text message, in bytes
    pub text_buffer_size: usize,

    /// When set, `add_endpoint` is rejected once the first mapping
    /// lookup has happened
    pub enforce_no_add_after_handshake: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            binary_buffer_size: 8192,
            text_buffer_size: 8192,
            enforce_no_add_after_handshake: false,
        }
    }
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binary_buffer_size(mut self, size: usize) -> Self {
        self.binary_buffer_size = size;
        self
    }

    pub fn text_buffer_size(mut self, size: usize) -> Self {
        self.text_buffer_size = size;
        self
    }

    pub fn enforce_no_add_after_handshake(mut self, enforce: bool) -> Self {
        self.enforce_no_add_after_handshake = enforce;
        self
    }
}

/// Everything needed to publish one endpoint
#[derive(Clone)]
pub struct EndpointConfig {
    /// Request path, exact (`/chat`) or templated (`/rooms/{id}`)
    pub path: String,

    /// Subprotocols offered during the upgrade negotiation
    pub subprotocols: Vec<String>,

    /// Free-form properties passed through to the endpoint
    pub user_properties: HashMap<String, String>,

    /// Encoder factories; each must instantiate successfully at
    /// deployment time
    pub encoders: Vec<EncoderFactory>,

    /// Lifecycle hooks for sessions opened on this endpoint
    pub handler: Option<Arc<dyn EndpointHandler>>,
}

impl EndpointConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            subprotocols: Vec::new(),
            user_properties: HashMap::new(),
            encoders: Vec::new(),
            handler: None,
        }
    }

    pub fn subprotocols(mut self, subprotocols: Vec<String>) -> Self {
        self.subprotocols = subprotocols;
        self
    }

    pub fn user_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_properties.insert(key.into(), value.into());
        self
    }

    pub fn encoder(mut self, factory: EncoderFactory) -> Self {
        self.encoders.push(factory);
        self
    }

    pub fn handler(mut self, handler: Arc<dyn EndpointHandler>) -> Self {
        self.handler = Some(handler);
        self
    }
}

impl std::fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("path", &self.path)
            .field("subprotocols", &self.subprotocols)
            .field("encoders", &self.encoders.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.binary_buffer_size, 8192);
        assert_eq!(config.text_buffer_size, 8192);
        assert!(!config.enforce_no_add_after_handshake);
    }

    #[test]
    fn test_builders() {
        let config = RegistryConfig::new()
            .binary_buffer_size(65536)
            .text_buffer_size(32768)
            .enforce_no_add_after_handshake(true);
        assert_eq!(config.binary_buffer_size, 65536);
        assert_eq!(config.text_buffer_size, 32768);
        assert!(config.enforce_no_add_after_handshake);

        let endpoint = EndpointConfig::new("/rooms/{id}")
            .subprotocols(vec!["chat.v2".to_string()])
            .user_property("maxIdle", "30000");
        assert_eq!(endpoint.path, "/rooms/{id}");
        assert_eq!(endpoint.subprotocols, vec!["chat.v2".to_string()]);
        assert_eq!(
            endpoint.user_properties.get("maxIdle").map(String::as_str),
            Some("30000")
        );
    }
}
