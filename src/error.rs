//! Unified error types for rtmp-ingest

use std::fmt;

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all decoder and registry operations
#[derive(Debug)]
pub enum Error {
    /// RTMP protocol violation
    Protocol(ProtocolError),
    /// AMF decoding error
    Amf(AmfError),
    /// Endpoint deployment failure
    Deployment(DeploymentError),
    /// Connection is no longer in a decodable state
    ConnectionClosed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
            Error::Amf(e) => write!(f, "AMF error: {}", e),
            Error::Deployment(e) => write!(f, "Deployment error: {}", e),
            Error::ConnectionClosed => write!(f, "Connection closed"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(err)
    }
}

impl From<AmfError> for Error {
    fn from(err: AmfError) -> Self {
        Error::Amf(err)
    }
}

impl From<DeploymentError> for Error {
    fn from(err: DeploymentError) -> Self {
        Error::Deployment(err)
    }
}

/// Protocol-level errors; all of these are connection-fatal
#[derive(Debug)]
pub enum ProtocolError {
    /// Chunk basic-header format tag outside 0..=3
    UnexpectedHeaderFormat(u8),
    /// Compressed header on a channel that never saw a full header
    /// (raised only when `close_on_header_error` is set)
    OrphanCompressedHeader { channel_id: u32, format: u8 },
    /// Declared message size exceeds the configured maximum
    OversizedMessage { size: u32, max: u32 },
    /// AMF decode failed inside a message body; `dump` holds the
    /// undecoded remainder as hex for reproducibility
    MalformedAmf { error: AmfError, dump: String },
    /// Shared-object envelope selector was neither 0 (AMF0) nor 3 (AMF3)
    UnknownSharedObjectEncoding(u8),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnexpectedHeaderFormat(fmt_byte) => {
                write!(f, "Unexpected chunk header format: {}", fmt_byte)
            }
            ProtocolError::OrphanCompressedHeader { channel_id, format } => {
                write!(
                    f,
                    "Compressed header (format {}) on channel {} with no prior full header",
                    format, channel_id
                )
            }
            ProtocolError::OversizedMessage { size, max } => {
                write!(f, "Message too large: {} bytes (max {})", size, max)
            }
            ProtocolError::MalformedAmf { error, dump } => {
                write!(f, "Malformed AMF: {} (remaining: {})", error, dump)
            }
            ProtocolError::UnknownSharedObjectEncoding(b) => {
                write!(f, "Unknown shared object encoding: {}", b)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// AMF decoding errors
#[derive(Debug)]
pub enum AmfError {
    UnknownMarker(u8),
    UnexpectedEof,
    InvalidUtf8,
    InvalidReference(u32),
    NestingTooDeep,
    InvalidObjectEnd,
    /// Marker is recognized but this decoder cannot materialize the value
    /// (externalizable objects, for example)
    UnsupportedType(u8),
    /// A value decoded fine but is not what the message grammar requires
    UnexpectedValue(&'static str),
}

impl fmt::Display for AmfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmfError::UnknownMarker(m) => write!(f, "Unknown AMF marker: 0x{:02x}", m),
            AmfError::UnexpectedEof => write!(f, "Unexpected end of AMF data"),
            AmfError::InvalidUtf8 => write!(f, "Invalid UTF-8 in AMF string"),
            AmfError::InvalidReference(idx) => write!(f, "Invalid AMF reference: {}", idx),
            AmfError::NestingTooDeep => write!(f, "AMF nesting too deep"),
            AmfError::InvalidObjectEnd => write!(f, "Invalid object end marker"),
            AmfError::UnsupportedType(m) => write!(f, "Unsupported AMF type: 0x{:02x}", m),
            AmfError::UnexpectedValue(what) => write!(f, "Expected {}", what),
        }
    }
}

impl std::error::Error for AmfError {}

/// Endpoint deployment errors
#[derive(Debug)]
pub enum DeploymentError {
    /// Path (or an equivalent template) is already registered
    DuplicatePath(String),
    /// Registration attempted after the first mapping lookup
    AddNotAllowed,
    /// An encoder factory failed to produce an instance
    EncoderInvalid { name: String, reason: String },
    /// Endpoint config carries no usable path
    MissingPath,
    /// Path could not be parsed as a URI template
    InvalidTemplate(String),
}

impl fmt::Display for DeploymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentError::DuplicatePath(path) => {
                write!(f, "Multiple endpoints registered for path: {}", path)
            }
            DeploymentError::AddNotAllowed => {
                write!(f, "Endpoint registration is no longer allowed")
            }
            DeploymentError::EncoderInvalid { name, reason } => {
                write!(f, "Encoder {} could not be instantiated: {}", name, reason)
            }
            DeploymentError::MissingPath => write!(f, "Endpoint config has no path"),
            DeploymentError::InvalidTemplate(path) => {
                write!(f, "Invalid URI template: {}", path)
            }
        }
    }
}

impl std::error::Error for DeploymentError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Protocol(ProtocolError::OversizedMessage {
            size: 4_000_000,
            max: 3_145_728,
        });
        assert!(err.to_string().contains("4000000"));
        assert!(err.to_string().contains("3145728"));

        let err = Error::Amf(AmfError::UnknownMarker(0xFF));
        assert!(err.to_string().contains("0xff"));

        let err = Error::Deployment(DeploymentError::DuplicatePath("/rooms/{id}".into()));
        assert!(err.to_string().contains("/rooms/{id}"));
    }

    #[test]
    fn test_from_conversions() {
        let err: Error = ProtocolError::UnexpectedHeaderFormat(7).into();
        assert!(matches!(err, Error::Protocol(_)));

        let err: Error = AmfError::UnexpectedEof.into();
        assert!(matches!(err, Error::Amf(_)));

        let err: Error = DeploymentError::AddNotAllowed.into();
        assert!(matches!(err, Error::Deployment(_)));
    }

    #[test]
    fn test_malformed_amf_carries_dump() {
        let err = ProtocolError::MalformedAmf {
            error: AmfError::UnexpectedEof,
            dump: "02000763".into(),
        };
        assert!(err.to_string().contains("02000763"));
    }
}
