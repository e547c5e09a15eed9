//! Mixed-encoding AMF reader
//!
//! RTMP message bodies negotiate AMF0 but may switch to AMF3 mid-stream:
//! either explicitly via the avmplus marker (0x11), or implicitly when a
//! flex-message argument leads with an AMF3 vector marker. The AMF3
//! reference tables must survive every switch within one message body, so
//! this reader owns a single [`Amf3Decoder`] and routes each value to the
//! right decoder based on a peeked byte.

use super::amf0::{self, Amf0Decoder};
use super::amf3::{self, Amf3Decoder};
use super::value::AmfValue;
use crate::error::AmfError;
use crate::protocol::cursor::ByteCursor;

/// Negotiated object encoding of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Amf0,
    Amf3,
}

/// Stateful reader for one message body
pub struct AmfReader {
    amf0: Amf0Decoder,
    amf3: Amf3Decoder,
}

impl AmfReader {
    pub fn new() -> Self {
        Self {
            amf0: Amf0Decoder::new(),
            amf3: Amf3Decoder::new(),
        }
    }

    /// Decode one value in a fixed encoding, no marker detection
    pub fn decode_with(
        &mut self,
        cur: &mut ByteCursor,
        encoding: Encoding,
    ) -> Result<AmfValue, AmfError> {
        match encoding {
            Encoding::Amf0 => self.amf0.decode(cur),
            Encoding::Amf3 => self.amf3.decode(cur),
        }
    }

    /// Decode one value, switching to AMF3 when the next byte is the
    /// avmplus marker (the marker itself is consumed by the switch)
    pub fn decode_detect(&mut self, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        match cur.peek_u8() {
            Some(amf0::MARKER_AVMPLUS) => {
                cur.skip(1);
                self.amf3.decode(cur)
            }
            Some(_) => self.amf0.decode(cur),
            None => Err(AmfError::UnexpectedEof),
        }
    }

    /// Flex-message argument decoding: the avmplus marker and the AMF3
    /// vector markers both select AMF3. Vector markers are AMF3 type
    /// bytes in their own right and are not consumed here.
    pub fn decode_flex_arg(&mut self, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        match cur.peek_u8() {
            Some(amf0::MARKER_AVMPLUS) => {
                cur.skip(1);
                self.amf3.decode(cur)
            }
            Some(
                amf3::MARKER_VECTOR_INT
                | amf3::MARKER_VECTOR_UINT
                | amf3::MARKER_VECTOR_DOUBLE
                | amf3::MARKER_VECTOR_OBJECT,
            ) => self.amf3.decode(cur),
            Some(_) => self.amf0.decode(cur),
            None => Err(AmfError::UnexpectedEof),
        }
    }

    /// Enforce AMF3 for one value regardless of the next byte
    pub fn decode_amf3(&mut self, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        self.amf3.decode(cur)
    }

    /// Decode an AMF0 string value, marker included (action names)
    pub fn decode_amf0_string(&mut self, cur: &mut ByteCursor) -> Result<String, AmfError> {
        self.amf0.decode_string(cur)
    }

    /// Read a bare string (no type marker) in the given encoding:
    /// length-prefixed UTF-8 for AMF0, U29S for AMF3. Shared-object
    /// envelope strings and attribute keys use this form.
    pub fn read_bare_string(
        &mut self,
        cur: &mut ByteCursor,
        encoding: Encoding,
    ) -> Result<String, AmfError> {
        match encoding {
            Encoding::Amf0 => super::amf0::read_utf8(cur),
            Encoding::Amf3 => self.amf3.read_string(cur),
        }
    }

    /// Clear AMF0 reference state while keeping the AMF3 tables, mirroring
    /// the action-decode sequence where references reset between the
    /// invoke preamble and its parameters
    pub fn reset_amf0_refs(&mut self) {
        self.amf0.reset();
    }
}

impl Default for AmfReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf::Amf0Encoder;

    #[test]
    fn test_detect_stays_amf0() {
        let mut enc = Amf0Encoder::new();
        enc.encode(&AmfValue::Number(7.0));
        let bytes = enc.finish();
        let mut cur = ByteCursor::from_slice(&bytes);
        let mut reader = AmfReader::new();
        assert_eq!(
            reader.decode_detect(&mut cur).unwrap(),
            AmfValue::Number(7.0)
        );
    }

    #[test]
    fn test_detect_switches_on_avmplus() {
        // 0x11 (avmplus) followed by AMF3 integer 9
        let bytes = [0x11, 0x04, 0x09];
        let mut cur = ByteCursor::from_slice(&bytes);
        let mut reader = AmfReader::new();
        assert_eq!(
            reader.decode_detect(&mut cur).unwrap(),
            AmfValue::Integer(9)
        );
    }

    #[test]
    fn test_amf3_references_survive_switches() {
        // two separately-switched AMF3 strings, the second a back-reference
        let bytes = [
            0x11, 0x06, 0x05, b'h', b'i', // avmplus, string "hi"
            0x11, 0x06, 0x00, // avmplus, string ref 0
        ];
        let mut cur = ByteCursor::from_slice(&bytes);
        let mut reader = AmfReader::new();
        assert_eq!(
            reader.decode_detect(&mut cur).unwrap(),
            AmfValue::String("hi".into())
        );
        assert_eq!(
            reader.decode_detect(&mut cur).unwrap(),
            AmfValue::String("hi".into())
        );
    }

    #[test]
    fn test_flex_arg_vector_marker_selects_amf3() {
        let bytes = [
            0x0D, 0x03, 0x00, // vector<int>, 1 element
            0x00, 0x00, 0x00, 0x2A, // 42
        ];
        let mut cur = ByteCursor::from_slice(&bytes);
        let mut reader = AmfReader::new();
        assert_eq!(
            reader.decode_flex_arg(&mut cur).unwrap(),
            AmfValue::Array(vec![AmfValue::Integer(42)])
        );
    }

    #[test]
    fn test_enforced_amf3() {
        // AMF3 string without any switch marker
        let bytes = [0x06, 0x07, b'a', b'b', b'c'];
        let mut cur = ByteCursor::from_slice(&bytes);
        let mut reader = AmfReader::new();
        assert_eq!(
            reader.decode_amf3(&mut cur).unwrap(),
            AmfValue::String("abc".into())
        );
    }
}
