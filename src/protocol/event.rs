//! Typed RTMP events
//!
//! One event per reassembled message. Media payloads are owned `Bytes`
//! and never alias the connection's receive buffer, which compacts after
//! every feed.

use std::collections::HashMap;

use bytes::Bytes;

use crate::amf::AmfValue;
use crate::protocol::constants::SWF_VERIFICATION_LENGTH;
use crate::protocol::shared_object::SharedObjectMessage;

/// A fully-decoded RTMP message
#[derive(Debug, Clone)]
pub enum Event {
    /// Set Chunk Size (type 1); already applied to the decoder by the
    /// time the event is emitted
    ChunkSize { size: u32 },

    /// Abort (type 2); the named channel's partial message was dropped
    Abort { channel_id: u32 },

    /// Acknowledgement (type 3)
    BytesRead { count: u32 },

    /// User control (type 4)
    Ping(PingEvent),

    /// Window acknowledgement size (type 5)
    ServerBandwidth { window_size: u32 },

    /// Set peer bandwidth (type 6)
    ClientBandwidth { window_size: u32, limit_type: u8 },

    /// Audio data (type 8)
    Audio(AudioData),

    /// Video data (type 9)
    Video(VideoData),

    /// AMF0 command (type 20)
    Invoke(Invoke),

    /// AMF3 command (type 17)
    FlexInvoke(Invoke),

    /// AMF0 notification on stream 0 (type 18); same shape as an invoke
    /// but no response is expected
    Notify(Invoke),

    /// Stream metadata (type 18 with a non-zero stream id, or type 15)
    StreamData(StreamData),

    /// Shared object update (types 16 and 19)
    SharedObject(SharedObjectMessage),

    /// Aggregate of back-to-back FLV tags (type 22); retained raw
    Aggregate { timestamp: u32, data: Bytes },

    /// Message type this decoder does not understand; non-fatal
    Unknown { data_type: u8, data: Bytes },
}

/// User control event, discriminated by the leading 16-bit subtype
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PingEvent {
    /// Client buffer length announcement (subtype 3)
    SetBuffer { stream_id: u32, buffer_ms: u32 },
    /// SWF verification request; carries no arguments (subtype 26)
    SwfVerifyRequest,
    /// SWF verification response with its 42-byte HMAC (subtype 27)
    SwfVerifyResponse([u8; SWF_VERIFICATION_LENGTH]),
    /// Every other subtype carries one 32-bit argument
    Other { event_type: u16, value: u32 },
}

/// A remote procedure call or notification
#[derive(Debug, Clone)]
pub struct Invoke {
    /// Effective message timestamp in milliseconds
    pub timestamp: u32,
    /// Transaction id; 0 when the caller expects no response
    pub transaction_id: f64,
    /// Service routing resolved from the action string
    pub call: ServiceCall,
    /// The optional leading map (the connect command object)
    pub connection_params: Option<HashMap<String, AmfValue>>,
}

/// Service routing: `x.y.z.method` splits into service `x.y.z` and
/// `method`; leading `@` / `|` prefixes are stripped from both sides
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCall {
    pub service_name: Option<String>,
    pub method: String,
    pub args: Vec<AmfValue>,
}

impl ServiceCall {
    /// Split an action string into service name and method
    pub fn from_action(action: &str, args: Vec<AmfValue>) -> Self {
        let (service_name, method) = match action.rfind('.') {
            Some(dot) => (Some(&action[..dot]), &action[dot + 1..]),
            None => (None, action),
        };
        let strip = |s: &str| s.trim_start_matches(['@', '|']).to_string();
        Self {
            service_name: service_name.map(strip),
            method: strip(method),
            args,
        }
    }
}

/// Stream metadata event
///
/// For `@setDataFrame` the payload is the metadata re-encoded as AMF0
/// `(method, params)`; for anything else it is the original message
/// payload verbatim with the detected action attached.
#[derive(Debug, Clone)]
pub struct StreamData {
    pub timestamp: u32,
    pub action: Option<String>,
    pub data: Bytes,
}

/// Video frame classification from the first payload byte's high nibble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameType {
    #[default]
    Unknown,
    /// Seekable frame
    Keyframe,
    /// Non-seekable frame
    Interframe,
    /// Droppable frame (H.263 only)
    DisposableInterframe,
    /// Server-generated keyframe
    GeneratedKeyframe,
    /// Video info / command frame
    InfoFrame,
}

impl FrameType {
    fn from_first_byte(b: u8) -> Self {
        match (b >> 4) & 0x0F {
            1 => FrameType::Keyframe,
            2 => FrameType::Interframe,
            3 => FrameType::DisposableInterframe,
            4 => FrameType::GeneratedKeyframe,
            5 => FrameType::InfoFrame,
            _ => FrameType::Unknown,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(self, FrameType::Keyframe | FrameType::GeneratedKeyframe)
    }
}

/// Audio codec id from the first payload byte's high nibble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    PcmPlatform = 0,
    Adpcm = 1,
    Mp3 = 2,
    PcmLe = 3,
    Nellymoser16K = 4,
    Nellymoser8K = 5,
    Nellymoser = 6,
    G711Alaw = 7,
    G711Mulaw = 8,
    Aac = 10,
    Speex = 11,
    Mp38K = 14,
    DeviceSpecific = 15,
}

impl AudioCodec {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(AudioCodec::PcmPlatform),
            1 => Some(AudioCodec::Adpcm),
            2 => Some(AudioCodec::Mp3),
            3 => Some(AudioCodec::PcmLe),
            4 => Some(AudioCodec::Nellymoser16K),
            5 => Some(AudioCodec::Nellymoser8K),
            6 => Some(AudioCodec::Nellymoser),
            7 => Some(AudioCodec::G711Alaw),
            8 => Some(AudioCodec::G711Mulaw),
            10 => Some(AudioCodec::Aac),
            11 => Some(AudioCodec::Speex),
            14 => Some(AudioCodec::Mp38K),
            15 => Some(AudioCodec::DeviceSpecific),
            _ => None,
        }
    }

    /// Codecs that front their stream with a configuration packet
    pub fn has_config_packet(&self) -> bool {
        matches!(self, AudioCodec::Aac)
    }
}

/// Video codec id from the first payload byte's low nibble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    SorensonH263 = 2,
    ScreenVideo = 3,
    Vp6 = 4,
    Vp6Alpha = 5,
    ScreenVideoV2 = 6,
    Avc = 7,
    Hevc = 12,
    Av1 = 13,
}

impl VideoCodec {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            2 => Some(VideoCodec::SorensonH263),
            3 => Some(VideoCodec::ScreenVideo),
            4 => Some(VideoCodec::Vp6),
            5 => Some(VideoCodec::Vp6Alpha),
            6 => Some(VideoCodec::ScreenVideoV2),
            7 => Some(VideoCodec::Avc),
            12 => Some(VideoCodec::Hevc),
            13 => Some(VideoCodec::Av1),
            _ => None,
        }
    }

    /// Codecs whose second payload byte distinguishes config packets and
    /// end-of-sequence markers
    pub fn has_config_packet(&self) -> bool {
        matches!(self, VideoCodec::Avc | VideoCodec::Hevc | VideoCodec::Av1)
    }
}

/// Audio message with flags lifted from its first bytes
#[derive(Debug, Clone)]
pub struct AudioData {
    pub timestamp: u32,
    pub codec: Option<AudioCodec>,
    /// True when this is a codec configuration packet (AAC sequence
    /// header), not audible samples
    pub config: bool,
    pub data: Bytes,
}

impl AudioData {
    pub fn new(timestamp: u32, data: Bytes) -> Self {
        let codec = data.first().and_then(|b| AudioCodec::from_id((b & 0xF0) >> 4));
        let config = match codec {
            Some(c) if c.has_config_packet() => data.get(1) == Some(&0),
            _ => false,
        };
        Self {
            timestamp,
            codec,
            config,
            data,
        }
    }
}

/// Video message with flags lifted from its first bytes
#[derive(Debug, Clone)]
pub struct VideoData {
    pub timestamp: u32,
    pub codec: Option<VideoCodec>,
    pub frame_type: FrameType,
    /// True when this is a codec configuration packet (AVC/HEVC/AV1
    /// sequence header)
    pub config: bool,
    /// True when this marks the end of the coded sequence
    pub end_of_sequence: bool,
    pub data: Bytes,
}

impl VideoData {
    pub fn new(timestamp: u32, data: Bytes) -> Self {
        let first = data.first().copied();
        let codec = first.and_then(|b| VideoCodec::from_id(b & 0x0F));
        let frame_type = first.map(FrameType::from_first_byte).unwrap_or_default();
        let (config, end_of_sequence) = match codec {
            Some(c) if c.has_config_packet() => {
                let second = data.get(1).copied();
                (second == Some(0), second == Some(2))
            }
            _ => (false, false),
        };
        Self {
            timestamp,
            codec,
            frame_type,
            config,
            end_of_sequence,
            data,
        }
    }
}
