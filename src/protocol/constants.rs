//! RTMP protocol constants
//!
//! Reference: Adobe RTMP Specification (December 2012)
//! Reference: RFC 7425 - Adobe's RTMP (Informational)

/// Default chunk size until a SetChunkSize message arrives (per RTMP spec)
pub const DEFAULT_CHUNK_SIZE: u32 = 128;

/// Largest chunk size a peer may negotiate
pub const MAX_CHUNK_SIZE: u32 = 0xFFFFFF;

/// Default cap on a single reassembled message (3 MiB). Anything larger is
/// rejected before a buffer is allocated for it.
pub const DEFAULT_MAX_PACKET_SIZE: u32 = 3_145_728;

/// Timestamp field value signalling a 4-byte extended timestamp
pub const EXTENDED_TIMESTAMP: u32 = 0xFFFFFF;

/// Lowest channel id usable by application messages; 0 and 1 are basic
/// header escape codes and 2 carries low-level protocol control
pub const MIN_CHANNEL_ID: u32 = 2;

/// Highest channel id reachable via the 3-byte basic header
pub const MAX_CHANNEL_ID: u32 = 65599;

// ============================================================================
// Message Type IDs
// RTMP spec section 5.4
// ============================================================================

/// Set Chunk Size (1) - protocol control
pub const TYPE_CHUNK_SIZE: u8 = 1;

/// Abort Message (2) - protocol control
pub const TYPE_ABORT: u8 = 2;

/// Acknowledgement / bytes read (3) - protocol control
pub const TYPE_BYTES_READ: u8 = 3;

/// User Control Message / ping (4)
pub const TYPE_PING: u8 = 4;

/// Window Acknowledgement Size / server bandwidth (5)
pub const TYPE_SERVER_BANDWIDTH: u8 = 5;

/// Set Peer Bandwidth / client bandwidth (6)
pub const TYPE_CLIENT_BANDWIDTH: u8 = 6;

/// Audio data (8)
pub const TYPE_AUDIO_DATA: u8 = 8;

/// Video data (9)
pub const TYPE_VIDEO_DATA: u8 = 9;

/// AMF3 stream metadata (15)
pub const TYPE_FLEX_STREAM_SEND: u8 = 15;

/// AMF3 shared object (16)
pub const TYPE_FLEX_SHARED_OBJECT: u8 = 16;

/// AMF3 command (17)
pub const TYPE_FLEX_MESSAGE: u8 = 17;

/// AMF0 stream metadata / notification (18)
pub const TYPE_NOTIFY: u8 = 18;

/// AMF0 shared object (19)
pub const TYPE_SHARED_OBJECT: u8 = 19;

/// AMF0 command (20) - connect, createStream, publish, etc.
pub const TYPE_INVOKE: u8 = 20;

/// Aggregate message (22) - back-to-back FLV tags
pub const TYPE_AGGREGATE: u8 = 22;

// ============================================================================
// User Control (ping) event subtypes
// ============================================================================

/// Stream begin - stream is ready to transport data
pub const PING_STREAM_BEGIN: u16 = 0;

/// Stream EOF / playback buffer clear
pub const PING_STREAM_PLAYBUFFER_CLEAR: u16 = 1;

/// Stream dry - no more data for now
pub const PING_STREAM_DRY: u16 = 2;

/// Client buffer length announcement (stream id + milliseconds)
pub const PING_CLIENT_BUFFER: u16 = 3;

/// Recorded stream notification
pub const PING_RECORDED_STREAM: u16 = 4;

/// Server ping request
pub const PING_CLIENT: u16 = 6;

/// Client pong response
pub const PONG_SERVER: u16 = 7;

/// SWF verification request carrying no arguments
pub const PING_SWF_VERIFY: u16 = 26;

/// SWF verification response carrying a 42-byte HMAC
pub const PONG_SWF_VERIFY: u16 = 27;

/// Playback buffer ran empty
pub const PING_BUFFER_EMPTY: u16 = 31;

/// Playback buffer refilled
pub const PING_BUFFER_FULL: u16 = 32;

/// Length of the SWF verification response body
pub const SWF_VERIFICATION_LENGTH: usize = 42;

// ============================================================================
// Common action names
// ============================================================================

pub const ACTION_CONNECT: &str = "connect";
pub const ACTION_CREATE_STREAM: &str = "createStream";
pub const ACTION_DELETE_STREAM: &str = "deleteStream";
pub const ACTION_PUBLISH: &str = "publish";
pub const ACTION_PLAY: &str = "play";
pub const ACTION_SET_DATA_FRAME: &str = "@setDataFrame";
pub const ACTION_ON_METADATA: &str = "onMetaData";
