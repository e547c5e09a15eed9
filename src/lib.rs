//! rtmp-ingest: RTMP ingest decoder and WebSocket endpoint registry
//!
//! This library turns the TCP byte stream of a connected RTMP client into
//! a sequence of typed protocol messages:
//! - Chunk stream demultiplexing with compressed-header state per channel
//! - Message reassembly across interleaved channels and partial reads
//! - AMF0/AMF3 command decoding with mid-message encoding switches
//! - Shared object, stream metadata, and media events
//!
//! The decoder activates after the handshake: the transport owns the
//! socket and hands every received buffer to [`RtmpDecoder::feed`], which
//! returns the messages that buffer completed. Incomplete packets stay
//! buffered; back-pressure is simply bytes the decoder has not consumed
//! yet.
//!
//! # Example
//!
//! ```no_run
//! use rtmp_ingest::{Event, RtmpDecoder};
//!
//! fn on_socket_data(decoder: &mut RtmpDecoder, data: &[u8]) {
//!     match decoder.feed(data) {
//!         Ok(events) => {
//!             for event in events {
//!                 match event {
//!                     Event::Audio(audio) => println!("audio {} bytes", audio.data.len()),
//!                     Event::Invoke(invoke) => println!("call {}", invoke.call.method),
//!                     _ => {}
//!                 }
//!             }
//!         }
//!         Err(e) => eprintln!("connection poisoned: {}", e),
//!     }
//! }
//! ```
//!
//! The [`registry`] module is the embedded WebSocket side of the server:
//! a concurrent request-path to endpoint mapping with URI-template
//! support and session lifecycle bookkeeping.

pub mod amf;
pub mod error;
pub mod protocol;
pub mod registry;

// Re-export main types for convenience
pub use amf::{AmfReader, AmfValue, Encoding};
pub use error::{AmfError, DeploymentError, Error, ProtocolError, Result};
pub use protocol::decoder::{ConnectionState, DecoderConfig, RtmpDecoder};
pub use protocol::event::{AudioData, Event, Invoke, ServiceCall, StreamData, VideoData};
pub use registry::{EndpointConfig, EndpointRegistry, RegistryConfig, WsSession};
