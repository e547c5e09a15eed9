//! RTMP chunk stream decoder
//!
//! One decoder per connection, owned exclusively by the transport that
//! feeds it. The decoder is a pure state machine: `feed(bytes)` appends to
//! the connection's receive buffer, decodes as many complete messages as
//! the buffer holds, and leaves partial packets buffered for the next
//! feed.
//!
//! ```text
//!               feed(bytes)
//!                   │
//!                   ▼
//!     ┌──────────────────────────┐
//!     │ ByteCursor (recv buffer) │
//!     └──────────┬───────────────┘
//!                │ per packet
//!                ▼
//!     basic header ─► message header ─► payload chunk
//!                │                          │
//!                │ per channel              ▼
//!                ▼                   Packet (reassembly)
//!     last_headers[channel]                 │ complete
//!                                           ▼
//!                                    decode_message ─► Event
//! ```
//!
//! Chunks from different channels interleave freely; each channel keeps
//! its own compressed-header state and at most one in-flight message.
//! When the buffer runs short mid-packet the cursor rewinds to the packet
//! start and the decoder records how many bytes the next attempt needs.

use std::collections::HashMap;

use bytes::BytesMut;

use crate::amf::Encoding;
use crate::error::{Error, ProtocolError, Result};
use crate::protocol::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_PACKET_SIZE, MAX_CHUNK_SIZE};
use crate::protocol::cursor::ByteCursor;
use crate::protocol::event::Event;
use crate::protocol::header::{decode_header, ChunkHeader, Header, HeaderOutcome};
use crate::protocol::message::decode_message;

/// Channel ids below this bound live in a dense array; the 3-byte basic
/// header encoding can reach 65599, those go to the fallback map
const DENSE_CHANNELS: usize = 64;

/// Sparse map keyed by channel id, dense for the ids encoders actually use
#[derive(Debug)]
struct ChannelMap<T> {
    dense: Vec<Option<T>>,
    sparse: HashMap<u32, T>,
}

impl<T> ChannelMap<T> {
    fn new() -> Self {
        Self {
            dense: (0..DENSE_CHANNELS).map(|_| None).collect(),
            sparse: HashMap::new(),
        }
    }

    fn get(&self, id: u32) -> Option<&T> {
        match self.dense.get(id as usize) {
            Some(slot) => slot.as_ref(),
            None => self.sparse.get(&id),
        }
    }

    fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        match self.dense.get_mut(id as usize) {
            Some(slot) => slot.as_mut(),
            None => self.sparse.get_mut(&id),
        }
    }

    fn insert(&mut self, id: u32, value: T) {
        match self.dense.get_mut(id as usize) {
            Some(slot) => *slot = Some(value),
            None => {
                self.sparse.insert(id, value);
            }
        }
    }

    fn remove(&mut self, id: u32) -> Option<T> {
        match self.dense.get_mut(id as usize) {
            Some(slot) => slot.take(),
            None => self.sparse.remove(&id),
        }
    }

    fn get_or_insert_with(&mut self, id: u32, default: impl FnOnce() -> T) -> &mut T {
        if (id as usize) < DENSE_CHANNELS {
            let slot = &mut self.dense[id as usize];
            if slot.is_none() {
                *slot = Some(default());
            }
            match slot {
                Some(value) => value,
                // the line above just filled the slot
                None => unreachable!(),
            }
        } else {
            self.sparse.entry(id).or_insert_with(default)
        }
    }
}

/// In-flight reassembly for one channel
#[derive(Debug)]
struct Packet {
    /// Header of the chunk that opened the message
    header: Header,
    payload: BytesMut,
}

impl Packet {
    fn new(header: Header) -> Self {
        let capacity = header.size as usize;
        Self {
            header,
            payload: BytesMut::with_capacity(capacity),
        }
    }

    fn remaining(&self) -> usize {
        (self.header.size as usize).saturating_sub(self.payload.len())
    }
}

/// Connection lifecycle from the decoder's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake done; the decoder is live
    Connected,
    /// A protocol error poisoned the connection
    Error,
    Disconnecting,
    Disconnected,
}

/// Progress tracking across feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Ready,
    /// The last attempt fell short; decoding resumes once the buffer
    /// holds at least `required` bytes from the rewound position
    Buffering { required: usize },
}

/// Decoder configuration
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Reject any message whose declared size exceeds this (bytes)
    pub max_packet_size: u32,
    /// Treat a compressed header on a virgin channel as fatal instead of
    /// skipping it
    pub close_on_header_error: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            close_on_header_error: false,
        }
    }
}

impl DecoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_packet_size(mut self, size: u32) -> Self {
        self.max_packet_size = size;
        self
    }

    pub fn close_on_header_error(mut self, close: bool) -> Self {
        self.close_on_header_error = close;
        self
    }
}

/// Per-connection RTMP decoder
pub struct RtmpDecoder {
    cursor: ByteCursor,
    state: DecodeState,
    connection_state: ConnectionState,
    /// Negotiated maximum chunk payload; updated by ChunkSize messages
    read_chunk_size: u32,
    /// Most recent fully-decoded header per channel
    last_headers: ChannelMap<Header>,
    /// In-progress reassembly per channel
    packets: ChannelMap<Packet>,
    /// Negotiated AMF encoding for command messages
    encoding: Encoding,
    config: DecoderConfig,
}

impl RtmpDecoder {
    /// Create a decoder for a freshly-connected client
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            cursor: ByteCursor::new(),
            state: DecodeState::Ready,
            connection_state: ConnectionState::Connected,
            read_chunk_size: DEFAULT_CHUNK_SIZE,
            last_headers: ChannelMap::new(),
            packets: ChannelMap::new(),
            encoding: Encoding::Amf0,
            config,
        }
    }

    /// Currently negotiated read chunk size
    pub fn read_chunk_size(&self) -> u32 {
        self.read_chunk_size
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Record the object encoding negotiated during connect
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
    }

    /// Bytes buffered but not yet decodable
    pub fn buffered(&self) -> usize {
        self.cursor.remaining()
    }

    /// Mark the connection as going away; input is discarded from here on
    /// but state survives until [`close`](Self::close)
    pub fn begin_close(&mut self) {
        if self.connection_state == ConnectionState::Connected {
            self.connection_state = ConnectionState::Disconnecting;
        }
    }

    /// Drop all state and stop decoding
    pub fn close(&mut self) {
        self.connection_state = ConnectionState::Disconnected;
        self.cursor.clear();
    }

    /// Consume transport bytes and return every message they complete.
    ///
    /// May return zero, one, or many events. Splitting a byte stream
    /// across feeds in any way yields the same event sequence as feeding
    /// it whole. A protocol error poisons the connection: the buffer is
    /// cleared, the state moves to `Error`, and every later feed returns
    /// nothing.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Event>> {
        match self.connection_state {
            ConnectionState::Connected => {}
            state => {
                tracing::trace!(state = ?state, "discarding input, connection not decodable");
                return Ok(Vec::new());
            }
        }
        self.cursor.extend(bytes);

        let mut events = Vec::new();
        loop {
            let remaining = self.cursor.remaining();
            if remaining == 0 {
                break;
            }
            if let DecodeState::Buffering { required } = self.state {
                if remaining < required {
                    break;
                }
            }
            self.state = DecodeState::Ready;
            match self.decode_packet() {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {
                    if matches!(self.state, DecodeState::Buffering { .. }) {
                        break;
                    }
                    // skipped bytes or a mid-message chunk; keep scanning
                }
                Err(error) => {
                    tracing::warn!(
                        position = self.cursor.position(),
                        limit = self.cursor.limit(),
                        chunk_size = self.read_chunk_size,
                        dump = %self.cursor.hex_dump(),
                        error = %error,
                        "closing connection because decoding failed"
                    );
                    self.cursor.clear();
                    self.connection_state = ConnectionState::Error;
                    return Err(Error::Protocol(error));
                }
            }
        }
        self.cursor.compact();
        Ok(events)
    }

    /// One pass: header, payload chunk, and on completion the decoded
    /// message. `Ok(None)` with a `Buffering` state means the caller must
    /// wait for more bytes; `Ok(None)` otherwise means progress was made
    /// but no message completed.
    fn decode_packet(&mut self) -> std::result::Result<Option<Event>, ProtocolError> {
        let start = self.cursor.position();
        let chh = match ChunkHeader::read(&mut self.cursor) {
            Ok(chh) => chh,
            Err(required) => {
                self.state = DecodeState::Buffering { required };
                return Ok(None);
            }
        };
        let channel_id = chh.channel_id;

        let outcome = decode_header(
            &chh,
            &mut self.cursor,
            self.last_headers.get(channel_id),
            start,
            self.config.close_on_header_error,
        )?;
        let header = match outcome {
            HeaderOutcome::Header(header) => header,
            HeaderOutcome::NeedMore { required } => {
                self.state = DecodeState::Buffering { required };
                return Ok(None);
            }
            HeaderOutcome::Skip => return Ok(None),
        };

        // size gate before any buffer is allocated for the message
        if header.size > self.config.max_packet_size {
            return Err(ProtocolError::OversizedMessage {
                size: header.size,
                max: self.config.max_packet_size,
            });
        }
        self.last_headers.insert(channel_id, header.clone());

        let to_read = {
            let packet = self
                .packets
                .get_or_insert_with(channel_id, || Packet::new(header.clone()));
            packet.remaining().min(self.read_chunk_size as usize)
        };
        if self.cursor.remaining() < to_read {
            let consumed = self.cursor.position() - start;
            tracing::trace!(
                available = self.cursor.remaining(),
                needed = to_read,
                "buffering partial chunk"
            );
            self.state = DecodeState::Buffering {
                required: consumed + to_read,
            };
            self.cursor.set_position(start);
            return Ok(None);
        }

        let complete = {
            let Some(packet) = self.packets.get_mut(channel_id) else {
                return Ok(None);
            };
            if let Some(chunk) = self.cursor.read_slice(to_read) {
                packet.payload.extend_from_slice(chunk);
            }
            packet.remaining() == 0
        };
        if !complete {
            return Ok(None);
        }

        // the message is whole: hand it to the event decoder. The packet
        // leaves the channel first so a decode failure cannot leave a
        // poisoned reassembly behind.
        let Some(packet) = self.packets.remove(channel_id) else {
            return Ok(None);
        };
        let effective_ts = header.timer();
        let event = decode_message(
            packet.header.data_type,
            packet.header.stream_id,
            effective_ts,
            self.encoding,
            packet.payload,
        )?;

        match &event {
            Event::ChunkSize { size } => {
                self.read_chunk_size = (*size).clamp(1, MAX_CHUNK_SIZE);
                tracing::debug!(size = self.read_chunk_size, "read chunk size updated");
            }
            Event::Abort { channel_id: aborted } => {
                if self.packets.remove(*aborted).is_some() {
                    tracing::debug!(
                        channel_id = aborted,
                        "dropped in-flight message after abort"
                    );
                }
            }
            _ => {}
        }

        // collapse the stored header onto the effective timestamp so that
        // format-1/2 deltas keep chaining from the emitted value
        if let Some(last) = self.last_headers.get_mut(channel_id) {
            last.timer_base = effective_ts;
        }

        Ok(Some(event))
    }
}

impl Default for RtmpDecoder {
    fn default() -> Self {
        Self::new()
    }
}
