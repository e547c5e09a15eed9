//! Shared object message decoding
//!
//! A shared object is a property bag synchronized between peers. One RTMP
//! message carries an envelope (name, version, persistence) followed by a
//! stream of typed events, each length-prefixed:
//!
//! ```text
//! name: bare UTF-8 string (u16 length, or U29S when the envelope is AMF3)
//! version: u32
//! persistence: u32 (2 = persistent)
//! reserved: 4 bytes
//! events: (type: u8, length: u32, body[length])*
//! ```
//!
//! Attribute keys inside event bodies use the same bare string form as the
//! envelope; values are full AMF values, switching to AMF3 when one leads
//! with the avmplus marker. An AMF failure inside one body skips the rest
//! of that body and decoding continues with the next event.

use std::collections::HashMap;

use crate::amf::{AmfReader, AmfValue, Encoding};
use crate::error::{AmfError, ProtocolError};
use crate::protocol::cursor::ByteCursor;

/// Wire event types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoEventType {
    ServerConnect = 1,
    ServerDisconnect = 2,
    SetAttribute = 3,
    ClientUpdateData = 4,
    ClientUpdateAttribute = 5,
    ServerSendMessage = 6,
    ClientStatus = 7,
    ClientClearData = 8,
    ClientDeleteData = 9,
    DeleteAttribute = 10,
    ClientSendMessage = 11,
}

impl SoEventType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(SoEventType::ServerConnect),
            2 => Some(SoEventType::ServerDisconnect),
            3 => Some(SoEventType::SetAttribute),
            4 => Some(SoEventType::ClientUpdateData),
            5 => Some(SoEventType::ClientUpdateAttribute),
            6 => Some(SoEventType::ServerSendMessage),
            7 => Some(SoEventType::ClientStatus),
            8 => Some(SoEventType::ClientClearData),
            9 => Some(SoEventType::ClientDeleteData),
            10 => Some(SoEventType::DeleteAttribute),
            11 => Some(SoEventType::ClientSendMessage),
            _ => None,
        }
    }
}

/// Payload of a single shared-object event
#[derive(Debug, Clone, PartialEq)]
pub enum SoEventPayload {
    /// Event carries no body, or its body could not be decoded
    None,
    /// Status notification: code plus level
    Status { code: String, level: String },
    /// Batched attribute update
    Attributes(HashMap<String, AmfValue>),
    /// Positional arguments of a send-message event
    Arguments(Vec<AmfValue>),
    /// A single attribute value
    Value(AmfValue),
}

/// One typed event inside a shared-object message
#[derive(Debug, Clone, PartialEq)]
pub struct SharedObjectEvent {
    pub kind: SoEventType,
    /// Attribute name, status code, or send-message handler name
    pub key: Option<String>,
    pub payload: SoEventPayload,
}

/// A decoded shared-object message
#[derive(Debug, Clone)]
pub struct SharedObjectMessage {
    pub timestamp: u32,
    pub name: String,
    pub version: u32,
    pub persistent: bool,
    /// Envelope encoding: always AMF0 for message type 19; for type 16
    /// the leading selector byte decides
    pub encoding: Encoding,
    pub events: Vec<SharedObjectEvent>,
}

/// Decode the envelope and event stream. The type-16 selector byte, when
/// present, has already been consumed by the message decoder.
pub fn decode_shared_object(
    cur: &mut ByteCursor,
    reader: &mut AmfReader,
    encoding: Encoding,
    timestamp: u32,
) -> Result<SharedObjectMessage, ProtocolError> {
    let name = reader
        .read_bare_string(cur, encoding)
        .map_err(|error| malformed(error, cur))?;
    let version = cur.read_u32_be().ok_or_else(|| truncated(cur))?;
    let persistent = cur.read_u32_be().ok_or_else(|| truncated(cur))? == 2;
    if !cur.skip(4) {
        return Err(truncated(cur));
    }

    let mut events = Vec::new();
    while cur.has_remaining() {
        let type_byte = match cur.read_u8() {
            Some(b) => b,
            None => break,
        };
        let Some(kind) = SoEventType::from_byte(type_byte) else {
            // unknown event type; nothing after it can be framed reliably
            tracing::debug!(type_byte = type_byte, "unknown shared object event type");
            cur.skip_remaining();
            break;
        };
        let length = cur.read_u32_be().ok_or_else(|| truncated(cur))? as usize;
        let body_start = cur.position();
        let body_end = body_start + length;
        if body_end > cur.limit() {
            return Err(truncated(cur));
        }

        match decode_event_body(cur, reader, encoding, kind, length, body_start) {
            Ok(event) => events.push(event),
            Err(error) => {
                // a broken body is contained by its length prefix; resume
                // at the next event
                tracing::debug!(
                    kind = ?kind,
                    error = %error,
                    "skipping undecodable shared object event body"
                );
                cur.set_position(body_end);
                events.push(SharedObjectEvent {
                    kind,
                    key: None,
                    payload: SoEventPayload::None,
                });
            }
        }
    }

    Ok(SharedObjectMessage {
        timestamp,
        name,
        version,
        persistent,
        encoding,
        events,
    })
}

fn decode_event_body(
    cur: &mut ByteCursor,
    reader: &mut AmfReader,
    encoding: Encoding,
    kind: SoEventType,
    length: usize,
    body_start: usize,
) -> Result<SharedObjectEvent, AmfError> {
    let (key, payload) = match kind {
        SoEventType::ClientStatus => {
            let code = reader.read_bare_string(cur, encoding)?;
            let level = reader.read_bare_string(cur, encoding)?;
            (Some(code.clone()), SoEventPayload::Status { code, level })
        }
        SoEventType::ClientUpdateData => {
            let mut map = HashMap::new();
            while cur.position() - body_start < length {
                let key = reader.read_bare_string(cur, encoding)?;
                let value = reader.decode_with(cur, encoding)?;
                map.insert(key, value);
            }
            (None, SoEventPayload::Attributes(map))
        }
        SoEventType::ServerSendMessage | SoEventType::ClientSendMessage => {
            // the handler name is a complete AMF value, marker included
            let handler = match reader.decode_with(cur, encoding)? {
                AmfValue::String(s) => s,
                _ => return Err(AmfError::UnexpectedValue("handler name")),
            };
            let mut args = Vec::new();
            while cur.position() - body_start < length {
                args.push(decode_so_value(cur, reader, encoding)?);
            }
            (Some(handler), SoEventPayload::Arguments(args))
        }
        _ => {
            if length == 0 {
                (None, SoEventPayload::None)
            } else {
                let key = reader.read_bare_string(cur, encoding)?;
                if cur.position() - body_start < length {
                    let value = decode_so_value(cur, reader, encoding)?;
                    (Some(key), SoEventPayload::Value(value))
                } else {
                    (Some(key), SoEventPayload::None)
                }
            }
        }
    };
    Ok(SharedObjectEvent { kind, key, payload })
}

/// Event values switch to AMF3 when they lead with the avmplus marker and
/// the envelope itself is AMF0; an AMF3 envelope already implies AMF3
fn decode_so_value(
    cur: &mut ByteCursor,
    reader: &mut AmfReader,
    encoding: Encoding,
) -> Result<AmfValue, AmfError> {
    match encoding {
        Encoding::Amf0 => reader.decode_detect(cur),
        Encoding::Amf3 => reader.decode_with(cur, Encoding::Amf3),
    }
}

fn malformed(error: AmfError, cur: &ByteCursor) -> ProtocolError {
    ProtocolError::MalformedAmf {
        error,
        dump: cur.hex_dump(),
    }
}

fn truncated(cur: &ByteCursor) -> ProtocolError {
    malformed(AmfError::UnexpectedEof, cur)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf::Amf0Encoder;
    use bytes::{BufMut, BytesMut};

    fn put_bare_string(buf: &mut BytesMut, s: &str) {
        buf.put_u16(s.len() as u16);
        buf.put_slice(s.as_bytes());
    }

    fn envelope(name: &str) -> BytesMut {
        let mut buf = BytesMut::new();
        put_bare_string(&mut buf, name);
        buf.put_u32(1); // version
        buf.put_u32(2); // persistent
        buf.put_u32(0); // reserved
        buf
    }

    fn decode(buf: BytesMut) -> SharedObjectMessage {
        let mut cur = ByteCursor::from_buf(buf);
        let mut reader = AmfReader::new();
        decode_shared_object(&mut cur, &mut reader, Encoding::Amf0, 0).unwrap()
    }

    #[test]
    fn test_envelope_fields() {
        let so = decode(envelope("room1"));
        assert_eq!(so.name, "room1");
        assert_eq!(so.version, 1);
        assert!(so.persistent);
        assert!(so.events.is_empty());
    }

    #[test]
    fn test_non_persistent_envelope() {
        let mut buf = BytesMut::new();
        put_bare_string(&mut buf, "t");
        buf.put_u32(0);
        buf.put_u32(0); // anything but 2
        buf.put_u32(0);
        assert!(!decode(buf).persistent);
    }

    #[test]
    fn test_status_event() {
        let mut buf = envelope("room1");
        let mut body = BytesMut::new();
        put_bare_string(&mut body, "change");
        put_bare_string(&mut body, "status");
        buf.put_u8(SoEventType::ClientStatus as u8);
        buf.put_u32(body.len() as u32);
        buf.put_slice(&body);

        let so = decode(buf);
        assert_eq!(so.events.len(), 1);
        assert_eq!(so.events[0].kind, SoEventType::ClientStatus);
        assert_eq!(
            so.events[0].payload,
            SoEventPayload::Status {
                code: "change".into(),
                level: "status".into(),
            }
        );
    }

    #[test]
    fn test_update_data_pairs() {
        let mut buf = envelope("scores");
        let mut body = BytesMut::new();
        put_bare_string(&mut body, "alice");
        let mut enc = Amf0Encoder::new();
        enc.encode(&AmfValue::Number(10.0));
        body.put_slice(&enc.finish());
        put_bare_string(&mut body, "bob");
        let mut enc = Amf0Encoder::new();
        enc.encode(&AmfValue::Number(4.0));
        body.put_slice(&enc.finish());
        buf.put_u8(SoEventType::ClientUpdateData as u8);
        buf.put_u32(body.len() as u32);
        buf.put_slice(&body);

        let so = decode(buf);
        match &so.events[0].payload {
            SoEventPayload::Attributes(map) => {
                assert_eq!(map.get("alice"), Some(&AmfValue::Number(10.0)));
                assert_eq!(map.get("bob"), Some(&AmfValue::Number(4.0)));
            }
            other => panic!("expected attributes, got {:?}", other),
        }
    }

    #[test]
    fn test_send_message_args() {
        let mut buf = envelope("chat");
        let mut body = Amf0Encoder::new();
        body.encode(&AmfValue::String("onMessage".into()));
        body.encode(&AmfValue::String("hello".into()));
        body.encode(&AmfValue::Number(3.0));
        let body = body.finish();
        buf.put_u8(SoEventType::ClientSendMessage as u8);
        buf.put_u32(body.len() as u32);
        buf.put_slice(&body);

        let so = decode(buf);
        assert_eq!(so.events[0].key.as_deref(), Some("onMessage"));
        assert_eq!(
            so.events[0].payload,
            SoEventPayload::Arguments(vec![
                AmfValue::String("hello".into()),
                AmfValue::Number(3.0),
            ])
        );
    }

    #[test]
    fn test_set_attribute_key_and_value() {
        let mut buf = envelope("props");
        let mut body = BytesMut::new();
        put_bare_string(&mut body, "color");
        let mut enc = Amf0Encoder::new();
        enc.encode(&AmfValue::String("teal".into()));
        body.put_slice(&enc.finish());
        buf.put_u8(SoEventType::SetAttribute as u8);
        buf.put_u32(body.len() as u32);
        buf.put_slice(&body);

        let so = decode(buf);
        assert_eq!(so.events[0].key.as_deref(), Some("color"));
        assert_eq!(
            so.events[0].payload,
            SoEventPayload::Value(AmfValue::String("teal".into()))
        );
    }

    #[test]
    fn test_delete_attribute_key_only() {
        let mut buf = envelope("props");
        let mut body = BytesMut::new();
        put_bare_string(&mut body, "color");
        buf.put_u8(SoEventType::DeleteAttribute as u8);
        buf.put_u32(body.len() as u32);
        buf.put_slice(&body);

        let so = decode(buf);
        assert_eq!(so.events[0].key.as_deref(), Some("color"));
        assert_eq!(so.events[0].payload, SoEventPayload::None);
    }

    #[test]
    fn test_zero_length_event() {
        let mut buf = envelope("x");
        buf.put_u8(SoEventType::ClientClearData as u8);
        buf.put_u32(0);
        let so = decode(buf);
        assert_eq!(so.events[0].kind, SoEventType::ClientClearData);
        assert_eq!(so.events[0].payload, SoEventPayload::None);
    }

    #[test]
    fn test_amf3_value_after_switch_marker() {
        let mut buf = envelope("mixed");
        let mut body = BytesMut::new();
        put_bare_string(&mut body, "count");
        body.put_slice(&[0x11, 0x04, 0x07]); // avmplus, AMF3 integer 7
        buf.put_u8(SoEventType::SetAttribute as u8);
        buf.put_u32(body.len() as u32);
        buf.put_slice(&body);

        let so = decode(buf);
        assert_eq!(
            so.events[0].payload,
            SoEventPayload::Value(AmfValue::Integer(7))
        );
    }

    #[test]
    fn test_broken_body_skips_to_next_event() {
        let mut buf = envelope("x");
        // body claims a 16-byte key string but holds 1 byte
        buf.put_u8(SoEventType::SetAttribute as u8);
        buf.put_u32(3);
        buf.put_slice(&[0x00, 0x10, b'a']);
        // then a clean zero-length event
        buf.put_u8(SoEventType::ClientClearData as u8);
        buf.put_u32(0);

        let so = decode(buf);
        assert_eq!(so.events.len(), 2);
        assert_eq!(so.events[0].payload, SoEventPayload::None);
        assert_eq!(so.events[1].kind, SoEventType::ClientClearData);
    }

    #[test]
    fn test_unknown_event_type_stops_parsing() {
        let mut buf = envelope("x");
        buf.put_u8(0x7F);
        buf.put_u32(4);
        buf.put_slice(&[1, 2, 3, 4]);
        let so = decode(buf);
        assert!(so.events.is_empty());
    }
}
