//! RTMP chunk stream decoding
//!
//! RTMP multiplexes variable-size messages over one TCP connection by
//! splitting each message into chunks of at most the negotiated chunk
//! size. Chunk headers are aggressively compressed against the previous
//! header on the same channel, so decoding is stateful per channel. The
//! [`decoder::RtmpDecoder`] owns that state for one connection and turns
//! raw bytes into typed [`event::Event`]s.

pub mod constants;
pub mod cursor;
pub mod decoder;
pub mod event;
pub mod header;
pub mod message;
pub mod shared_object;

pub use cursor::ByteCursor;
pub use decoder::{ConnectionState, DecoderConfig, RtmpDecoder};
pub use event::{
    AudioData, Event, FrameType, Invoke, PingEvent, ServiceCall, StreamData, VideoData,
};
pub use header::{ChunkHeader, Header};
pub use shared_object::{SharedObjectEvent, SharedObjectMessage, SoEventPayload, SoEventType};
