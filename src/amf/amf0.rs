//! AMF0 decoder and encoder
//!
//! AMF0 is the original Action Message Format used in Flash/RTMP.
//!
//! Type Markers:
//! ```text
//! 0x00 - Number (IEEE 754 double)
//! 0x01 - Boolean
//! 0x02 - String (UTF-8, 16-bit length prefix)
//! 0x03 - Object (key-value pairs until 0x000009)
//! 0x05 - Null
//! 0x06 - Undefined
//! 0x07 - Reference (16-bit index)
//! 0x08 - ECMA Array (associative array)
//! 0x09 - Object End (0x000009 sequence)
//! 0x0A - Strict Array (dense array)
//! 0x0B - Date (double + timezone)
//! 0x0C - Long String (UTF-8, 32-bit length prefix)
//! 0x0D - Unsupported
//! 0x0F - XML Document
//! 0x10 - Typed Object (class name + properties)
//! 0x11 - AVM+ (switch to AMF3)
//! ```
//!
//! The decoder reads from a [`ByteCursor`] so it can share the buffer with
//! the chunk decoder; a short buffer surfaces as `UnexpectedEof` rather
//! than a rewind because message payloads are always complete by the time
//! AMF decoding starts.

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};

use super::value::AmfValue;
use crate::error::AmfError;
use crate::protocol::cursor::ByteCursor;

// AMF0 type markers
pub(crate) const MARKER_NUMBER: u8 = 0x00;
pub(crate) const MARKER_BOOLEAN: u8 = 0x01;
pub(crate) const MARKER_STRING: u8 = 0x02;
pub(crate) const MARKER_OBJECT: u8 = 0x03;
pub(crate) const MARKER_NULL: u8 = 0x05;
pub(crate) const MARKER_UNDEFINED: u8 = 0x06;
pub(crate) const MARKER_REFERENCE: u8 = 0x07;
pub(crate) const MARKER_ECMA_ARRAY: u8 = 0x08;
pub(crate) const MARKER_OBJECT_END: u8 = 0x09;
pub(crate) const MARKER_STRICT_ARRAY: u8 = 0x0A;
pub(crate) const MARKER_DATE: u8 = 0x0B;
pub(crate) const MARKER_LONG_STRING: u8 = 0x0C;
pub(crate) const MARKER_UNSUPPORTED: u8 = 0x0D;
pub(crate) const MARKER_XML_DOCUMENT: u8 = 0x0F;
pub(crate) const MARKER_TYPED_OBJECT: u8 = 0x10;
/// AMF0 marker that hands the rest of the value off to AMF3
pub(crate) const MARKER_AVMPLUS: u8 = 0x11;

/// Maximum nesting depth for objects/arrays (prevent stack overflow)
const MAX_NESTING_DEPTH: usize = 64;

/// AMF0 decoder with lenient parsing mode
pub struct Amf0Decoder {
    /// Reference table for object references
    references: Vec<AmfValue>,
    /// Enable lenient parsing for encoder quirks
    lenient: bool,
    /// Current nesting depth
    depth: usize,
}

impl Amf0Decoder {
    pub fn new() -> Self {
        Self {
            references: Vec::new(),
            lenient: true, // Default to lenient for OBS/encoder compatibility
            depth: 0,
        }
    }

    pub fn with_lenient(lenient: bool) -> Self {
        Self {
            references: Vec::new(),
            lenient,
            depth: 0,
        }
    }

    /// Reset reference state (call between independent value sequences)
    pub fn reset(&mut self) {
        self.references.clear();
        self.depth = 0;
    }

    /// Decode a single AMF0 value from the cursor
    pub fn decode(&mut self, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        let marker = cur.read_u8().ok_or(AmfError::UnexpectedEof)?;
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            self.depth -= 1;
            return Err(AmfError::NestingTooDeep);
        }
        let result = self.decode_value(marker, cur);
        self.depth -= 1;
        result
    }

    /// Decode a bare AMF0 string (marker 0x02 or 0x0C required)
    pub fn decode_string(&mut self, cur: &mut ByteCursor) -> Result<String, AmfError> {
        match self.decode(cur)? {
            AmfValue::String(s) => Ok(s),
            _ => Err(AmfError::UnexpectedValue("string")),
        }
    }

    fn decode_value(&mut self, marker: u8, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        match marker {
            MARKER_NUMBER => {
                let n = cur.read_f64_be().ok_or(AmfError::UnexpectedEof)?;
                Ok(AmfValue::Number(n))
            }
            MARKER_BOOLEAN => {
                let b = cur.read_u8().ok_or(AmfError::UnexpectedEof)?;
                Ok(AmfValue::Boolean(b != 0))
            }
            MARKER_STRING => Ok(AmfValue::String(read_utf8(cur)?)),
            MARKER_OBJECT => self.decode_object(cur),
            MARKER_NULL => Ok(AmfValue::Null),
            MARKER_UNDEFINED => Ok(AmfValue::Undefined),
            MARKER_REFERENCE => self.decode_reference(cur),
            MARKER_ECMA_ARRAY => self.decode_ecma_array(cur),
            MARKER_STRICT_ARRAY => self.decode_strict_array(cur),
            MARKER_DATE => {
                let ts = cur.read_f64_be().ok_or(AmfError::UnexpectedEof)?;
                // timezone offset is deprecated and ignored
                cur.read_u16_be().ok_or(AmfError::UnexpectedEof)?;
                Ok(AmfValue::Date(ts))
            }
            MARKER_LONG_STRING => Ok(AmfValue::String(read_utf8_long(cur)?)),
            MARKER_UNSUPPORTED => Ok(AmfValue::Undefined),
            MARKER_XML_DOCUMENT => Ok(AmfValue::Xml(read_utf8_long(cur)?)),
            MARKER_TYPED_OBJECT => self.decode_typed_object(cur),
            MARKER_AVMPLUS => {
                // The caller is expected to peek for this marker and route
                // the value through an AMF3 decoder. Hitting it here means
                // an avmplus value appeared where none was expected.
                Err(AmfError::UnsupportedType(MARKER_AVMPLUS))
            }
            _ => {
                if self.lenient {
                    Ok(AmfValue::Undefined)
                } else {
                    Err(AmfError::UnknownMarker(marker))
                }
            }
        }
    }

    fn decode_object(&mut self, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        let obj_index = self.references.len();
        self.references.push(AmfValue::Null); // placeholder for self-refs
        let properties = self.decode_key_values(cur)?;
        let obj = AmfValue::Object(properties);
        self.references[obj_index] = obj.clone();
        Ok(obj)
    }

    fn decode_ecma_array(&mut self, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        // the count is a hint only; ffmpeg in particular under-reports it
        let _count = cur.read_u32_be().ok_or(AmfError::UnexpectedEof)?;
        let arr_index = self.references.len();
        self.references.push(AmfValue::Null);
        let properties = self.decode_key_values(cur)?;
        let arr = AmfValue::EcmaArray(properties);
        self.references[arr_index] = arr.clone();
        Ok(arr)
    }

    fn decode_strict_array(&mut self, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        let count = cur.read_u32_be().ok_or(AmfError::UnexpectedEof)? as usize;
        let arr_index = self.references.len();
        self.references.push(AmfValue::Null);
        let mut elements = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            elements.push(self.decode(cur)?);
        }
        let arr = AmfValue::Array(elements);
        self.references[arr_index] = arr.clone();
        Ok(arr)
    }

    fn decode_typed_object(&mut self, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        let class_name = read_utf8(cur)?;
        let obj_index = self.references.len();
        self.references.push(AmfValue::Null);
        let properties = self.decode_key_values(cur)?;
        let obj = AmfValue::TypedObject {
            class_name,
            properties,
        };
        self.references[obj_index] = obj.clone();
        Ok(obj)
    }

    fn decode_reference(&mut self, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        let index = cur.read_u16_be().ok_or(AmfError::UnexpectedEof)? as usize;
        self.references
            .get(index)
            .cloned()
            .ok_or(AmfError::InvalidReference(index as u32))
    }

    /// Key-value pairs terminated by an empty key + object-end marker
    fn decode_key_values(
        &mut self,
        cur: &mut ByteCursor,
    ) -> Result<HashMap<String, AmfValue>, AmfError> {
        let mut properties = HashMap::new();
        loop {
            let key = read_utf8(cur)?;
            if key.is_empty() {
                match cur.read_u8() {
                    Some(MARKER_OBJECT_END) => break,
                    // OBS and some encoders omit the end marker
                    Some(_) if self.lenient => break,
                    None if self.lenient => break,
                    Some(_) => return Err(AmfError::InvalidObjectEnd),
                    None => return Err(AmfError::UnexpectedEof),
                }
            }
            let value = self.decode(cur)?;
            properties.insert(key, value);
        }
        Ok(properties)
    }
}

impl Default for Amf0Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Read UTF-8 string with 16-bit length prefix (no type marker). Object
/// keys and shared-object envelope strings use this bare form.
pub(crate) fn read_utf8(cur: &mut ByteCursor) -> Result<String, AmfError> {
    let len = cur.read_u16_be().ok_or(AmfError::UnexpectedEof)? as usize;
    let bytes = cur.read_slice(len).ok_or(AmfError::UnexpectedEof)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AmfError::InvalidUtf8)
}

/// Read UTF-8 string with 32-bit length prefix
fn read_utf8_long(cur: &mut ByteCursor) -> Result<String, AmfError> {
    let len = cur.read_u32_be().ok_or(AmfError::UnexpectedEof)? as usize;
    let bytes = cur.read_slice(len).ok_or(AmfError::UnexpectedEof)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AmfError::InvalidUtf8)
}

/// AMF0 encoder
///
/// Only the decoder side of the protocol is in scope for this crate, with
/// one exception: `@setDataFrame` metadata is normalized by re-encoding
/// `(method, params)` back into AMF0.
pub struct Amf0Encoder {
    buf: BytesMut,
}

impl Amf0Encoder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
        }
    }

    /// Take the encoded bytes and reset the encoder
    pub fn finish(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Encode a single AMF0 value
    pub fn encode(&mut self, value: &AmfValue) {
        match value {
            AmfValue::Null => {
                self.buf.put_u8(MARKER_NULL);
            }
            AmfValue::Undefined => {
                self.buf.put_u8(MARKER_UNDEFINED);
            }
            AmfValue::Boolean(b) => {
                self.buf.put_u8(MARKER_BOOLEAN);
                self.buf.put_u8(if *b { 1 } else { 0 });
            }
            AmfValue::Number(n) => {
                self.buf.put_u8(MARKER_NUMBER);
                self.buf.put_f64(*n);
            }
            AmfValue::Integer(i) => {
                // AMF0 has no integer type
                self.buf.put_u8(MARKER_NUMBER);
                self.buf.put_f64(*i as f64);
            }
            AmfValue::String(s) => {
                if s.len() > 0xFFFF {
                    self.buf.put_u8(MARKER_LONG_STRING);
                    self.buf.put_u32(s.len() as u32);
                } else {
                    self.buf.put_u8(MARKER_STRING);
                    self.buf.put_u16(s.len() as u16);
                }
                self.buf.put_slice(s.as_bytes());
            }
            AmfValue::Object(props) => {
                self.buf.put_u8(MARKER_OBJECT);
                self.write_properties(props);
            }
            AmfValue::EcmaArray(props) => {
                self.buf.put_u8(MARKER_ECMA_ARRAY);
                self.buf.put_u32(props.len() as u32);
                self.write_properties(props);
            }
            AmfValue::Array(elements) => {
                self.buf.put_u8(MARKER_STRICT_ARRAY);
                self.buf.put_u32(elements.len() as u32);
                for elem in elements {
                    self.encode(elem);
                }
            }
            AmfValue::Date(timestamp) => {
                self.buf.put_u8(MARKER_DATE);
                self.buf.put_f64(*timestamp);
                self.buf.put_i16(0); // timezone (deprecated)
            }
            AmfValue::Xml(s) => {
                self.buf.put_u8(MARKER_XML_DOCUMENT);
                self.buf.put_u32(s.len() as u32);
                self.buf.put_slice(s.as_bytes());
            }
            AmfValue::TypedObject {
                class_name,
                properties,
            } => {
                self.buf.put_u8(MARKER_TYPED_OBJECT);
                self.write_utf8(class_name);
                self.write_properties(properties);
            }
            AmfValue::ByteArray(_) => {
                // ByteArray is AMF3-only
                self.buf.put_u8(MARKER_NULL);
            }
        }
    }

    fn write_properties(&mut self, props: &HashMap<String, AmfValue>) {
        for (key, val) in props {
            self.write_utf8(key);
            self.encode(val);
        }
        self.buf.put_u16(0); // empty key
        self.buf.put_u8(MARKER_OBJECT_END);
    }

    /// Write UTF-8 string with 16-bit length prefix (no type marker)
    fn write_utf8(&mut self, s: &str) {
        let len = s.len().min(0xFFFF);
        self.buf.put_u16(len as u16);
        self.buf.put_slice(&s.as_bytes()[..len]);
    }
}

impl Default for Amf0Encoder {
    fn default() -> Self {
        Self::new()
    }
}
