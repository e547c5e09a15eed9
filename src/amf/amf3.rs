//! AMF3 decoder
//!
//! AMF3 is the ActionScript 3.0 serialization format. RTMP carries it
//! inside AMF0 streams behind the avmplus marker (0x11), and natively in
//! flex messages. Unlike AMF0, AMF3 interns strings, complex objects, and
//! class traits into reference tables that persist for the whole message
//! body, across any number of AMF0-to-AMF3 switches.
//!
//! Type Markers:
//! ```text
//! 0x00 - Undefined        0x09 - Array
//! 0x01 - Null             0x0A - Object
//! 0x02 - False            0x0B - XML
//! 0x03 - True             0x0C - ByteArray
//! 0x04 - Integer (U29)    0x0D - Vector<int>
//! 0x05 - Double           0x0E - Vector<uint>
//! 0x06 - String           0x0F - Vector<double>
//! 0x07 - XMLDocument      0x10 - Vector<object>
//! 0x08 - Date             0x11 - Dictionary
//! ```

use std::collections::HashMap;

use super::value::AmfValue;
use crate::error::AmfError;
use crate::protocol::cursor::ByteCursor;

const MARKER_UNDEFINED: u8 = 0x00;
const MARKER_NULL: u8 = 0x01;
const MARKER_FALSE: u8 = 0x02;
const MARKER_TRUE: u8 = 0x03;
const MARKER_INTEGER: u8 = 0x04;
const MARKER_DOUBLE: u8 = 0x05;
const MARKER_STRING: u8 = 0x06;
const MARKER_XML_DOC: u8 = 0x07;
const MARKER_DATE: u8 = 0x08;
const MARKER_ARRAY: u8 = 0x09;
const MARKER_OBJECT: u8 = 0x0A;
const MARKER_XML: u8 = 0x0B;
const MARKER_BYTE_ARRAY: u8 = 0x0C;
/// Vector markers; seeing one of these while decoding AMF0 flex-message
/// arguments also forces a switch to AMF3
pub(crate) const MARKER_VECTOR_INT: u8 = 0x0D;
pub(crate) const MARKER_VECTOR_UINT: u8 = 0x0E;
pub(crate) const MARKER_VECTOR_DOUBLE: u8 = 0x0F;
pub(crate) const MARKER_VECTOR_OBJECT: u8 = 0x10;
const MARKER_DICTIONARY: u8 = 0x11;

const MAX_NESTING_DEPTH: usize = 64;

/// Class traits: sealed member names plus the dynamic flag
#[derive(Debug, Clone)]
struct Traits {
    class_name: String,
    dynamic: bool,
    members: Vec<String>,
}

/// AMF3 decoder with reference storage
///
/// One instance must serve an entire message body so that back-references
/// emitted after an encoding switch still resolve.
pub struct Amf3Decoder {
    string_refs: Vec<String>,
    complex_refs: Vec<AmfValue>,
    trait_refs: Vec<Traits>,
    depth: usize,
}

impl Amf3Decoder {
    pub fn new() -> Self {
        Self {
            string_refs: Vec::new(),
            complex_refs: Vec::new(),
            trait_refs: Vec::new(),
            depth: 0,
        }
    }

    /// Drop all reference tables (call between messages)
    pub fn reset(&mut self) {
        self.string_refs.clear();
        self.complex_refs.clear();
        self.trait_refs.clear();
        self.depth = 0;
    }

    /// Decode a single AMF3 value from the cursor
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

    fn decode_value(&mut self, marker: u8, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        match marker {
            MARKER_UNDEFINED => Ok(AmfValue::Undefined),
            MARKER_NULL => Ok(AmfValue::Null),
            MARKER_FALSE => Ok(AmfValue::Boolean(false)),
            MARKER_TRUE => Ok(AmfValue::Boolean(true)),
            MARKER_INTEGER => {
                let raw = read_u29(cur)?;
                Ok(AmfValue::Integer(sign_extend_u29(raw)))
            }
            MARKER_DOUBLE => {
                let n = cur.read_f64_be().ok_or(AmfError::UnexpectedEof)?;
                Ok(AmfValue::Number(n))
            }
            MARKER_STRING => Ok(AmfValue::String(self.read_string(cur)?)),
            MARKER_XML_DOC | MARKER_XML => self.decode_xml(cur),
            MARKER_DATE => self.decode_date(cur),
            MARKER_ARRAY => self.decode_array(cur),
            MARKER_OBJECT => self.decode_object(cur),
            MARKER_BYTE_ARRAY => self.decode_byte_array(cur),
            MARKER_VECTOR_INT => self.decode_vector(cur, VectorKind::Int),
            MARKER_VECTOR_UINT => self.decode_vector(cur, VectorKind::Uint),
            MARKER_VECTOR_DOUBLE => self.decode_vector(cur, VectorKind::Double),
            MARKER_VECTOR_OBJECT => self.decode_vector(cur, VectorKind::Object),
            MARKER_DICTIONARY => self.decode_dictionary(cur),
            _ => Err(AmfError::UnknownMarker(marker)),
        }
    }

    /// U29S-ref / U29S-value string, interned on first sight. Also used
    /// bare (no marker) for AMF3 shared-object envelope strings.
    pub(crate) fn read_string(&mut self, cur: &mut ByteCursor) -> Result<String, AmfError> {
        let header = read_u29(cur)?;
        if header & 1 == 0 {
            let index = (header >> 1) as usize;
            return self
                .string_refs
                .get(index)
                .cloned()
                .ok_or(AmfError::InvalidReference(index as u32));
        }
        let len = (header >> 1) as usize;
        let bytes = cur.read_slice(len).ok_or(AmfError::UnexpectedEof)?;
        let s = String::from_utf8(bytes.to_vec()).map_err(|_| AmfError::InvalidUtf8)?;
        // the empty string is never interned
        if !s.is_empty() {
            self.string_refs.push(s.clone());
        }
        Ok(s)
    }

    fn decode_xml(&mut self, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        let header = read_u29(cur)?;
        if header & 1 == 0 {
            return self.complex_ref((header >> 1) as usize);
        }
        let len = (header >> 1) as usize;
        let bytes = cur.read_slice(len).ok_or(AmfError::UnexpectedEof)?;
        let s = String::from_utf8(bytes.to_vec()).map_err(|_| AmfError::InvalidUtf8)?;
        let value = AmfValue::Xml(s);
        self.complex_refs.push(value.clone());
        Ok(value)
    }

    fn decode_date(&mut self, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        let header = read_u29(cur)?;
        if header & 1 == 0 {
            return self.complex_ref((header >> 1) as usize);
        }
        let ts = cur.read_f64_be().ok_or(AmfError::UnexpectedEof)?;
        let value = AmfValue::Date(ts);
        self.complex_refs.push(value.clone());
        Ok(value)
    }

    fn decode_byte_array(&mut self, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        let header = read_u29(cur)?;
        if header & 1 == 0 {
            return self.complex_ref((header >> 1) as usize);
        }
        let len = (header >> 1) as usize;
        let bytes = cur.read_slice(len).ok_or(AmfError::UnexpectedEof)?;
        let value = AmfValue::ByteArray(bytes.to_vec());
        self.complex_refs.push(value.clone());
        Ok(value)
    }

    fn decode_array(&mut self, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        let header = read_u29(cur)?;
        if header & 1 == 0 {
            return self.complex_ref((header >> 1) as usize);
        }
        let dense_len = (header >> 1) as usize;
        let slot = self.complex_refs.len();
        self.complex_refs.push(AmfValue::Null); // placeholder for self-refs

        // associative portion first, terminated by the empty key
        let mut assoc = HashMap::new();
        loop {
            let key = self.read_string(cur)?;
            if key.is_empty() {
                break;
            }
            let value = self.decode(cur)?;
            assoc.insert(key, value);
        }
        let mut dense = Vec::with_capacity(dense_len.min(1024));
        for _ in 0..dense_len {
            dense.push(self.decode(cur)?);
        }

        let value = if assoc.is_empty() {
            AmfValue::Array(dense)
        } else {
            // mixed arrays fold the dense part in under numeric keys
            for (i, v) in dense.into_iter().enumerate() {
                assoc.insert(i.to_string(), v);
            }
            AmfValue::EcmaArray(assoc)
        };
        self.complex_refs[slot] = value.clone();
        Ok(value)
    }

    fn decode_object(&mut self, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        let header = read_u29(cur)?;
        if header & 1 == 0 {
            return self.complex_ref((header >> 1) as usize);
        }
        let traits = if header & 2 == 0 {
            // traits reference
            let index = (header >> 2) as usize;
            self.trait_refs
                .get(index)
                .cloned()
                .ok_or(AmfError::InvalidReference(index as u32))?
        } else if header & 4 != 0 {
            // externalizable objects need class-specific readers
            return Err(AmfError::UnsupportedType(MARKER_OBJECT));
        } else {
            let dynamic = header & 8 != 0;
            let member_count = (header >> 4) as usize;
            let class_name = self.read_string(cur)?;
            let mut members = Vec::with_capacity(member_count.min(256));
            for _ in 0..member_count {
                members.push(self.read_string(cur)?);
            }
            let traits = Traits {
                class_name,
                dynamic,
                members,
            };
            self.trait_refs.push(traits.clone());
            traits
        };

        let slot = self.complex_refs.len();
        self.complex_refs.push(AmfValue::Null);

        let mut properties = HashMap::new();
        for name in &traits.members {
            let value = self.decode(cur)?;
            properties.insert(name.clone(), value);
        }
        if traits.dynamic {
            loop {
                let key = self.read_string(cur)?;
                if key.is_empty() {
                    break;
                }
                let value = self.decode(cur)?;
                properties.insert(key, value);
            }
        }

        let value = if traits.class_name.is_empty() {
            AmfValue::Object(properties)
        } else {
            AmfValue::TypedObject {
                class_name: traits.class_name.clone(),
                properties,
            }
        };
        self.complex_refs[slot] = value.clone();
        Ok(value)
    }

    fn decode_vector(
        &mut self,
        cur: &mut ByteCursor,
        kind: VectorKind,
    ) -> Result<AmfValue, AmfError> {
        let header = read_u29(cur)?;
        if header & 1 == 0 {
            return self.complex_ref((header >> 1) as usize);
        }
        let count = (header >> 1) as usize;
        // fixed-length flag is irrelevant on the decode side
        cur.read_u8().ok_or(AmfError::UnexpectedEof)?;
        let slot = self.complex_refs.len();
        self.complex_refs.push(AmfValue::Null);

        let mut elements = Vec::with_capacity(count.min(1024));
        match kind {
            VectorKind::Int => {
                for _ in 0..count {
                    let v = cur.read_i32_be().ok_or(AmfError::UnexpectedEof)?;
                    elements.push(AmfValue::Integer(v));
                }
            }
            VectorKind::Uint => {
                for _ in 0..count {
                    let v = cur.read_u32_be().ok_or(AmfError::UnexpectedEof)?;
                    elements.push(AmfValue::Number(v as f64));
                }
            }
            VectorKind::Double => {
                for _ in 0..count {
                    let v = cur.read_f64_be().ok_or(AmfError::UnexpectedEof)?;
                    elements.push(AmfValue::Number(v));
                }
            }
            VectorKind::Object => {
                // object vectors carry their element type name up front
                let _type_name = self.read_string(cur)?;
                for _ in 0..count {
                    elements.push(self.decode(cur)?);
                }
            }
        }
        let value = AmfValue::Array(elements);
        self.complex_refs[slot] = value.clone();
        Ok(value)
    }

    fn decode_dictionary(&mut self, cur: &mut ByteCursor) -> Result<AmfValue, AmfError> {
        let header = read_u29(cur)?;
        if header & 1 == 0 {
            return self.complex_ref((header >> 1) as usize);
        }
        let count = (header >> 1) as usize;
        // weak-keys flag
        cur.read_u8().ok_or(AmfError::UnexpectedEof)?;
        let slot = self.complex_refs.len();
        self.complex_refs.push(AmfValue::Null);

        let mut map = HashMap::new();
        for i in 0..count {
            let key = self.decode(cur)?;
            let value = self.decode(cur)?;
            let key = match key {
                AmfValue::String(s) => s,
                AmfValue::Number(n) => n.to_string(),
                AmfValue::Integer(n) => n.to_string(),
                _ => i.to_string(),
            };
            map.insert(key, value);
        }
        let value = AmfValue::EcmaArray(map);
        self.complex_refs[slot] = value.clone();
        Ok(value)
    }

    fn complex_ref(&self, index: usize) -> Result<AmfValue, AmfError> {
        self.complex_refs
            .get(index)
            .cloned()
            .ok_or(AmfError::InvalidReference(index as u32))
    }
}

impl Default for Amf3Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
enum VectorKind {
    Int,
    Uint,
    Double,
    Object,
}

/// Variable-length 29-bit unsigned integer: 7 bits per byte for the first
/// three bytes, all 8 bits of a fourth byte if present
fn read_u29(cur: &mut ByteCursor) -> Result<u32, AmfError> {
    let mut result: u32 = 0;
    for i in 0..4 {
        let b = cur.read_u8().ok_or(AmfError::UnexpectedEof)? as u32;
        if i == 3 {
            result = (result << 8) | b;
        } else {
            result = (result << 7) | (b & 0x7F);
            if b & 0x80 == 0 {
                break;
            }
        }
    }
    Ok(result)
}

/// U29 integers are sign-extended from bit 28
fn sign_extend_u29(raw: u32) -> i32 {
    if raw & 0x1000_0000 != 0 {
        (raw | 0xE000_0000) as i32
    } else {
        raw as i32
    }
}
