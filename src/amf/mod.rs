//! AMF (Action Message Format) implementation
//!
//! AMF is Adobe's binary serialization format used in RTMP for encoding
//! command parameters, metadata, and shared-object state. This module
//! implements AMF0 decoding/encoding and AMF3 decoding, plus the
//! mixed-encoding reader that handles mid-message switches between the
//! two (signaled by the AMF0 avmplus marker 0x11).

pub mod amf0;
pub mod amf3;
pub mod reader;
pub mod value;

pub use amf0::{Amf0Decoder, Amf0Encoder};
pub use amf3::Amf3Decoder;
pub use reader::{AmfReader, Encoding};
pub use value::AmfValue;
