//! RTMP chunk header parsing
//!
//! Each chunk opens with a basic header (1-3 bytes) carrying the format
//! tag and channel id, followed by a message header whose length depends
//! on the format, and an optional 4-byte extended timestamp:
//!
//! ```text
//! Basic Header:
//! - 1 byte:  fmt(2) + csid(6)         for channel 2-63
//! - 2 bytes: fmt(2) + 0 + id(8)       for channel 64-319
//! - 3 bytes: fmt(2) + 1 + id(16, LE)  for channel 64-65599
//!
//! Message Header (by fmt):
//! - Type 0 (11 bytes): timestamp(3) + size(3) + type(1) + stream_id(4, LE)
//! - Type 1 (7 bytes):  ts delta(3) + size(3) + type(1)
//! - Type 2 (3 bytes):  ts delta(3)
//! - Type 3 (0 bytes):  everything inherited from the previous header
//! ```
//!
//! A timestamp field of 0xFFFFFF pushes the real value into a trailing
//! 4-byte field; once a message has used the extended field, every type-3
//! continuation of that message carries it too.
//!
//! Reference: RTMP Specification Section 5.3

use crate::error::ProtocolError;
use crate::protocol::constants::EXTENDED_TIMESTAMP;
use crate::protocol::cursor::ByteCursor;

/// Basic header: format tag plus channel id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Header compression format, 0-3
    pub format: u8,
    /// Resolved channel (chunk stream) id
    pub channel_id: u32,
    /// Encoded length of the basic header in bytes (1-3)
    pub len: usize,
}

impl ChunkHeader {
    /// Parse the basic header, consuming its bytes.
    ///
    /// Returns `Err(needed)` with the total byte count the basic header
    /// requires when the cursor holds too few; the cursor is untouched in
    /// that case.
    pub fn read(cur: &mut ByteCursor) -> Result<ChunkHeader, usize> {
        let first = match cur.peek_u8() {
            Some(b) => b,
            None => return Err(1),
        };
        let format = first >> 6;
        let (channel_id, len) = match first & 0x3F {
            0 => match cur.peek(2) {
                Some(bytes) => (64 + bytes[1] as u32, 2),
                None => return Err(2),
            },
            1 => match cur.peek(3) {
                Some(bytes) => (64 + bytes[1] as u32 + ((bytes[2] as u32) << 8), 3),
                None => return Err(3),
            },
            id => (id as u32, 1),
        };
        cur.skip(len);
        Ok(ChunkHeader {
            format,
            channel_id,
            len,
        })
    }

    /// Message-header length implied by the format tag
    pub fn message_header_len(&self) -> usize {
        match self.format {
            0 => 11,
            1 => 7,
            2 => 3,
            _ => 0,
        }
    }
}

/// Fully-materialized message header for one chunk
///
/// Compressed formats inherit their missing fields from the channel's
/// previous header, so a `Header` always describes the complete message
/// the chunk belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Channel (chunk stream) id, 3..=65599 for application data
    pub channel_id: u32,
    /// Full message size in bytes
    pub size: u32,
    /// RTMP message type
    pub data_type: u8,
    /// Logical stream id (little-endian on the wire)
    pub stream_id: u32,
    /// Absolute timestamp base in milliseconds
    pub timer_base: u32,
    /// Timestamp delta; the effective timestamp is base + delta
    pub timer_delta: u32,
    /// Whether this message transmitted a 4-byte extended timestamp;
    /// sticky across type-3 continuations
    pub extended: bool,
}

impl Header {
    /// Effective message timestamp. Wraps after ~49.7 days like the wire
    /// format itself.
    pub fn timer(&self) -> u32 {
        self.timer_base.wrapping_add(self.timer_delta)
    }
}

/// Outcome of a header decode attempt
#[derive(Debug)]
pub enum HeaderOutcome {
    /// Header fully decoded; cursor sits at the first payload byte
    Header(Header),
    /// Not enough bytes; `required` is the total prefix (from the packet
    /// start) the next attempt needs. Cursor rewound to the packet start.
    NeedMore { required: usize },
    /// Compressed header on a virgin channel in lenient mode; the basic
    /// header bytes stay consumed so the scan resumes one header later
    Skip,
}

/// Decode the message header for a chunk whose basic header was already
/// read. `start` is the cursor position of the packet's first byte;
/// `last` is the channel's previous fully-decoded header, if any.
pub fn decode_header(
    chh: &ChunkHeader,
    cur: &mut ByteCursor,
    last: Option<&Header>,
    start: usize,
    close_on_header_error: bool,
) -> Result<HeaderOutcome, ProtocolError> {
    let msg_len = chh.message_header_len();
    if cur.remaining() < msg_len {
        cur.set_position(start);
        return Ok(HeaderOutcome::NeedMore {
            required: chh.len + msg_len,
        });
    }

    let mut header = if chh.format == 0 {
        let timer_base = read_u24(cur);
        let size = read_u24(cur);
        let data_type = read_u8(cur);
        let stream_id = read_u32_le(cur);
        Header {
            channel_id: chh.channel_id,
            size,
            data_type,
            stream_id,
            timer_base,
            timer_delta: 0,
            extended: false,
        }
    } else {
        let Some(prev) = last else {
            // compressed header references state this channel never had
            tracing::debug!(
                channel_id = chh.channel_id,
                format = chh.format,
                "compressed header on channel with no prior full header"
            );
            if close_on_header_error {
                return Err(ProtocolError::OrphanCompressedHeader {
                    channel_id: chh.channel_id,
                    format: chh.format,
                });
            }
            return Ok(HeaderOutcome::Skip);
        };
        match chh.format {
            1 => {
                let timer_delta = read_u24(cur);
                let size = read_u24(cur);
                let data_type = read_u8(cur);
                Header {
                    channel_id: chh.channel_id,
                    size,
                    data_type,
                    stream_id: prev.stream_id,
                    timer_base: prev.timer_base,
                    timer_delta,
                    extended: false,
                }
            }
            2 => {
                let timer_delta = read_u24(cur);
                Header {
                    channel_id: chh.channel_id,
                    size: prev.size,
                    data_type: prev.data_type,
                    stream_id: prev.stream_id,
                    timer_base: prev.timer_base,
                    timer_delta,
                    extended: false,
                }
            }
            3 => Header {
                channel_id: chh.channel_id,
                size: prev.size,
                data_type: prev.data_type,
                stream_id: prev.stream_id,
                timer_base: prev.timer_base,
                timer_delta: prev.timer_delta,
                extended: prev.extended,
            },
            other => return Err(ProtocolError::UnexpectedHeaderFormat(other)),
        }
    };

    // extended timestamp handling
    match chh.format {
        0 if header.timer_base >= EXTENDED_TIMESTAMP => {
            match read_extended(cur, chh, msg_len, start) {
                Ok(ext) => {
                    header.timer_base = ext;
                    header.extended = true;
                }
                Err(outcome) => return Ok(outcome),
            }
        }
        1 | 2 if header.timer_delta >= EXTENDED_TIMESTAMP => {
            match read_extended(cur, chh, msg_len, start) {
                Ok(ext) => {
                    header.timer_delta = ext;
                    header.extended = true;
                }
                Err(outcome) => return Ok(outcome),
            }
        }
        3 if header.extended => {
            // present because the opening chunk of this message used it;
            // the value replaces the inherited base outright
            match read_extended(cur, chh, msg_len, start) {
                Ok(ext) => {
                    header.timer_base = ext;
                    header.timer_delta = 0;
                }
                Err(outcome) => return Ok(outcome),
            }
        }
        _ => {}
    }

    tracing::trace!(header = ?header, format = chh.format, "decoded chunk header");
    Ok(HeaderOutcome::Header(header))
}

fn read_extended(
    cur: &mut ByteCursor,
    chh: &ChunkHeader,
    msg_len: usize,
    start: usize,
) -> Result<u32, HeaderOutcome> {
    match cur.read_u32_be() {
        Some(ext) => {
            tracing::trace!(extended = ext, "extended timestamp read");
            Ok(ext)
        }
        None => {
            cur.set_position(start);
            Err(HeaderOutcome::NeedMore {
                required: chh.len + msg_len + 4,
            })
        }
    }
}

// The message-header length was verified before parsing begins, so these
// cannot fall short; the fallbacks keep the code panic-free regardless.

fn read_u8(cur: &mut ByteCursor) -> u8 {
    cur.read_u8().unwrap_or(0)
}

fn read_u24(cur: &mut ByteCursor) -> u32 {
    cur.read_u24_be().unwrap_or(0)
}

fn read_u32_le(cur: &mut ByteCursor) -> u32 {
    cur.read_u32_le().unwrap_or(0)
}
