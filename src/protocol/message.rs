//! RTMP message decoding
//!
//! Dispatches on the reassembled message's data type and produces a typed
//! [`Event`]. RPC-bearing types run through the AMF reader; media and
//! control types have structured constructors. The effective timestamp
//! (timer base + delta of the completing chunk) is stamped onto every
//! event that carries one.

use bytes::BytesMut;

use crate::amf::{AmfReader, AmfValue, Amf0Encoder, Encoding};
use crate::error::{AmfError, ProtocolError};
use crate::protocol::constants::*;
use crate::protocol::cursor::ByteCursor;
use crate::protocol::event::{
    AudioData, Event, Invoke, PingEvent, ServiceCall, StreamData, VideoData,
};
use crate::protocol::shared_object::decode_shared_object;

/// Decode one reassembled message payload into an event.
///
/// `stream_id` comes from the header that opened the message; `timestamp`
/// is the already-composed effective timestamp; `encoding` is the
/// connection's negotiated object encoding.
pub fn decode_message(
    data_type: u8,
    stream_id: u32,
    timestamp: u32,
    encoding: Encoding,
    payload: BytesMut,
) -> Result<Event, ProtocolError> {
    match data_type {
        TYPE_CHUNK_SIZE => {
            let mut cur = ByteCursor::from_buf(payload);
            let size = cur.read_u32_be().ok_or_else(|| truncated(&cur))?;
            tracing::debug!(size = size, "decoded chunk size");
            Ok(Event::ChunkSize { size })
        }
        TYPE_ABORT => {
            let mut cur = ByteCursor::from_buf(payload);
            let channel_id = cur.read_u32_be().ok_or_else(|| truncated(&cur))?;
            Ok(Event::Abort { channel_id })
        }
        TYPE_BYTES_READ => {
            let mut cur = ByteCursor::from_buf(payload);
            let count = cur.read_u32_be().ok_or_else(|| truncated(&cur))?;
            Ok(Event::BytesRead { count })
        }
        TYPE_PING => {
            let mut cur = ByteCursor::from_buf(payload);
            Ok(Event::Ping(decode_ping(&mut cur)?))
        }
        TYPE_SERVER_BANDWIDTH => {
            let mut cur = ByteCursor::from_buf(payload);
            let window_size = cur.read_u32_be().ok_or_else(|| truncated(&cur))?;
            Ok(Event::ServerBandwidth { window_size })
        }
        TYPE_CLIENT_BANDWIDTH => {
            let mut cur = ByteCursor::from_buf(payload);
            let window_size = cur.read_u32_be().ok_or_else(|| truncated(&cur))?;
            let limit_type = cur.read_u8().ok_or_else(|| truncated(&cur))?;
            Ok(Event::ClientBandwidth {
                window_size,
                limit_type,
            })
        }
        TYPE_AUDIO_DATA => Ok(Event::Audio(AudioData::new(timestamp, payload.freeze()))),
        TYPE_VIDEO_DATA => Ok(Event::Video(VideoData::new(timestamp, payload.freeze()))),
        TYPE_AGGREGATE => Ok(Event::Aggregate {
            timestamp,
            data: payload.freeze(),
        }),
        TYPE_FLEX_SHARED_OBJECT => {
            let mut cur = ByteCursor::from_buf(payload);
            let selector = cur.read_u8().ok_or_else(|| truncated(&cur))?;
            let so_encoding = match selector {
                0 => Encoding::Amf0,
                3 => Encoding::Amf3,
                other => return Err(ProtocolError::UnknownSharedObjectEncoding(other)),
            };
            let mut reader = AmfReader::new();
            let so = decode_shared_object(&mut cur, &mut reader, so_encoding, timestamp)?;
            Ok(Event::SharedObject(so))
        }
        TYPE_SHARED_OBJECT => {
            let mut cur = ByteCursor::from_buf(payload);
            let mut reader = AmfReader::new();
            let so = decode_shared_object(&mut cur, &mut reader, Encoding::Amf0, timestamp)?;
            Ok(Event::SharedObject(so))
        }
        TYPE_INVOKE => {
            let mut cur = ByteCursor::from_buf(payload);
            Ok(Event::Invoke(decode_action(&mut cur, encoding, timestamp)?))
        }
        TYPE_FLEX_MESSAGE => {
            let mut cur = ByteCursor::from_buf(payload);
            Ok(Event::FlexInvoke(decode_flex_message(&mut cur, timestamp)?))
        }
        TYPE_NOTIFY => {
            let mut cur = ByteCursor::from_buf(payload);
            if stream_id != 0 {
                Ok(Event::StreamData(decode_stream_data(&mut cur, timestamp)?))
            } else {
                Ok(Event::Notify(decode_action(&mut cur, encoding, timestamp)?))
            }
        }
        TYPE_FLEX_STREAM_SEND => {
            let mut cur = ByteCursor::from_buf(payload);
            // leading flex byte, then stream data on the sliced remainder
            cur.skip(1);
            let mut sliced = cur.split_remaining();
            Ok(Event::StreamData(decode_stream_data(&mut sliced, timestamp)?))
        }
        other => {
            tracing::warn!(data_type = other, "unknown message type");
            Ok(Event::Unknown {
                data_type: other,
                data: payload.freeze(),
            })
        }
    }
}

/// User control events carry a 16-bit subtype followed by
/// subtype-specific arguments
fn decode_ping(cur: &mut ByteCursor) -> Result<PingEvent, ProtocolError> {
    let event_type = cur.read_u16_be().ok_or_else(|| truncated(cur))?;
    let ping = match event_type {
        PING_CLIENT_BUFFER => {
            let stream_id = cur.read_u32_be().ok_or_else(|| truncated(cur))?;
            let buffer_ms = cur.read_u32_be().ok_or_else(|| truncated(cur))?;
            PingEvent::SetBuffer {
                stream_id,
                buffer_ms,
            }
        }
        PING_SWF_VERIFY => PingEvent::SwfVerifyRequest,
        PONG_SWF_VERIFY => match cur.read_slice(SWF_VERIFICATION_LENGTH) {
            Some(bytes) => {
                let mut body = [0u8; SWF_VERIFICATION_LENGTH];
                body.copy_from_slice(bytes);
                PingEvent::SwfVerifyResponse(body)
            }
            None => return Err(truncated(cur)),
        },
        other => {
            let value = cur.read_u32_be().ok_or_else(|| truncated(cur))?;
            PingEvent::Other {
                event_type: other,
                value,
            }
        }
    };
    Ok(ping)
}

/// Decode an invoke/notify action: action string, transaction id,
/// optional leading connection-params map, positional arguments.
fn decode_action(
    cur: &mut ByteCursor,
    encoding: Encoding,
    timestamp: u32,
) -> Result<Invoke, ProtocolError> {
    let mut reader = AmfReader::new();
    // responses from AMF3 peers may front the action with the avmplus
    // marker; everyone else stays AMF0
    let mode = if encoding == Encoding::Amf3
        && cur.peek_u8() == Some(crate::amf::amf0::MARKER_AVMPLUS)
    {
        cur.skip(1);
        Encoding::Amf3
    } else {
        Encoding::Amf0
    };

    let action = match reader.decode_with(cur, mode) {
        Ok(AmfValue::String(s)) => s,
        Ok(_) => {
            return Err(ProtocolError::MalformedAmf {
                error: AmfError::UnexpectedValue("action string"),
                dump: cur.hex_dump(),
            })
        }
        Err(error) => {
            return Err(ProtocolError::MalformedAmf {
                error,
                dump: cur.hex_dump(),
            })
        }
    };
    tracing::trace!(action = %action, "decoded action");

    let transaction_id = read_transaction_id(cur, &mut reader, mode);
    // reference state does not carry over from the preamble
    reader.reset_amf0_refs();

    let mut connection_params = None;
    let mut args = Vec::new();
    let mut first = true;
    while cur.has_remaining() {
        match reader.decode_with(cur, mode) {
            Ok(value) => {
                if first {
                    first = false;
                    match value {
                        v @ (AmfValue::Object(_)
                        | AmfValue::EcmaArray(_)
                        | AmfValue::TypedObject { .. }) => {
                            // the leading map is the command object, kept
                            // apart from the positional arguments
                            connection_params =
                                v.as_object().cloned();
                            continue;
                        }
                        AmfValue::Null => continue,
                        v => args.push(v),
                    }
                } else {
                    args.push(value);
                }
            }
            Err(error) => {
                // a short or broken argument list truncates the call
                // rather than killing the connection
                tracing::debug!(error = %error, "stopping argument decode");
                break;
            }
        }
    }

    Ok(Invoke {
        timestamp,
        transaction_id,
        call: ServiceCall::from_action(&action, args),
        connection_params,
    })
}

/// Flex messages (type 17) skip a leading byte and then decode like an
/// invoke, except each argument independently detects its encoding; AMF3
/// reference tables span the whole argument list.
fn decode_flex_message(cur: &mut ByteCursor, timestamp: u32) -> Result<Invoke, ProtocolError> {
    let mut reader = AmfReader::new();
    let _flex_byte = cur.read_u8();

    let action = match reader.decode_with(cur, Encoding::Amf0) {
        Ok(AmfValue::String(s)) => s,
        Ok(_) => {
            return Err(ProtocolError::MalformedAmf {
                error: AmfError::UnexpectedValue("action string"),
                dump: cur.hex_dump(),
            })
        }
        Err(error) => {
            return Err(ProtocolError::MalformedAmf {
                error,
                dump: cur.hex_dump(),
            })
        }
    };
    let transaction_id = read_transaction_id(cur, &mut reader, Encoding::Amf0);

    let mut connection_params = None;
    let mut args = Vec::new();
    let mut first = true;
    while cur.has_remaining() {
        match reader.decode_flex_arg(cur) {
            Ok(value) => {
                if first {
                    first = false;
                    match value {
                        v @ (AmfValue::Object(_)
                        | AmfValue::EcmaArray(_)
                        | AmfValue::TypedObject { .. }) => {
                            connection_params = v.as_object().cloned();
                            continue;
                        }
                        AmfValue::Null => continue,
                        v => args.push(v),
                    }
                } else {
                    args.push(value);
                }
            }
            Err(error) => {
                tracing::debug!(error = %error, "stopping flex argument decode");
                break;
            }
        }
    }

    Ok(Invoke {
        timestamp,
        transaction_id,
        call: ServiceCall::from_action(&action, args),
        connection_params,
    })
}

fn read_transaction_id(cur: &mut ByteCursor, reader: &mut AmfReader, mode: Encoding) -> f64 {
    cur.mark();
    match reader.decode_with(cur, mode) {
        Ok(value) => value.as_number().unwrap_or(0.0),
        Err(_) => {
            cur.reset();
            0.0
        }
    }
}

/// Stream metadata: `@setDataFrame` gets normalized (method + params
/// re-encoded as AMF0), anything else is retained verbatim with the
/// detected action attached.
fn decode_stream_data(cur: &mut ByteCursor, timestamp: u32) -> Result<StreamData, ProtocolError> {
    let mut reader = AmfReader::new();
    cur.mark();

    let action = match cur.peek_u8() {
        Some(crate::amf::amf0::MARKER_STRING) => match reader.decode_amf0_string(cur) {
            Ok(s) => s,
            Err(error) => {
                return Err(ProtocolError::MalformedAmf {
                    error,
                    dump: cur.hex_dump(),
                })
            }
        },
        _ => {
            // not string-led; hand the payload through untouched
            cur.reset();
            return Ok(StreamData {
                timestamp,
                action: None,
                data: cur.remaining_bytes(),
            });
        }
    };

    if action == ACTION_SET_DATA_FRAME {
        // the real method name (onMetaData, onCuePoint, ...) follows
        let method = reader.decode_amf0_string(cur).map_err(|error| {
            ProtocolError::MalformedAmf {
                error,
                dump: cur.hex_dump(),
            }
        })?;
        let params = decode_dataframe_params(cur, &mut reader);
        tracing::debug!(method = %method, "dataframe decoded");

        let mut out = Amf0Encoder::new();
        out.encode(&AmfValue::String(method.clone()));
        out.encode(&params);
        Ok(StreamData {
            timestamp,
            action: Some(method),
            data: out.finish(),
        })
    } else {
        // onFI and friends: peek at the params for the log, keep the raw
        // payload for downstream dispatch
        if let Ok(params) = reader.decode_detect(cur) {
            tracing::debug!(action = %action, params = ?params, "stream send");
        }
        cur.reset();
        Ok(StreamData {
            timestamp,
            action: Some(action),
            data: cur.remaining_bytes(),
        })
    }
}

/// Dataframe parameters arrive as a mixed array (ffmpeg), a strict array,
/// an object, or occasionally a bare string; every shape lands in a
/// map-like value so the re-encode stays uniform
fn decode_dataframe_params(cur: &mut ByteCursor, reader: &mut AmfReader) -> AmfValue {
    let value = match reader.decode_detect(cur) {
        Ok(v) => v,
        Err(error) => {
            tracing::warn!(error = %error, "dataframe params decode failed");
            return AmfValue::EcmaArray(Default::default());
        }
    };
    match value {
        v @ (AmfValue::Object(_) | AmfValue::EcmaArray(_) | AmfValue::TypedObject { .. }) => v,
        AmfValue::Array(items) => {
            let map = items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect();
            AmfValue::EcmaArray(map)
        }
        AmfValue::String(s) => {
            let mut map = std::collections::HashMap::new();
            map.insert("0".to_string(), AmfValue::String(s));
            AmfValue::EcmaArray(map)
        }
        other => {
            tracing::debug!(params = ?other, "dataframe params have no usable shape");
            AmfValue::EcmaArray(Default::default())
        }
    }
}

fn truncated(cur: &ByteCursor) -> ProtocolError {
    ProtocolError::MalformedAmf {
        error: AmfError::UnexpectedEof,
        dump: cur.hex_dump(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;
    use std::collections::HashMap;

    fn amf0_bytes(values: &[AmfValue]) -> BytesMut {
        let mut enc = Amf0Encoder::new();
        for v in values {
            enc.encode(v);
        }
        BytesMut::from(&enc.finish()[..])
    }

    #[test]
    fn test_chunk_size() {
        let mut payload = BytesMut::new();
        payload.put_u32(4096);
        let event = decode_message(TYPE_CHUNK_SIZE, 0, 0, Encoding::Amf0, payload).unwrap();
        assert!(matches!(event, Event::ChunkSize { size: 4096 }));
    }

    #[test]
    fn test_abort_and_bytes_read() {
        let mut payload = BytesMut::new();
        payload.put_u32(4);
        let event = decode_message(TYPE_ABORT, 0, 0, Encoding::Amf0, payload).unwrap();
        assert!(matches!(event, Event::Abort { channel_id: 4 }));

        let mut payload = BytesMut::new();
        payload.put_u32(123456);
        let event = decode_message(TYPE_BYTES_READ, 0, 0, Encoding::Amf0, payload).unwrap();
        assert!(matches!(event, Event::BytesRead { count: 123456 }));
    }

    #[test]
    fn test_client_bandwidth() {
        let mut payload = BytesMut::new();
        payload.put_u32(2_500_000);
        payload.put_u8(2);
        let event = decode_message(TYPE_CLIENT_BANDWIDTH, 0, 0, Encoding::Amf0, payload).unwrap();
        match event {
            Event::ClientBandwidth {
                window_size,
                limit_type,
            } => {
                assert_eq!(window_size, 2_500_000);
                assert_eq!(limit_type, 2);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_ping_set_buffer() {
        let mut payload = BytesMut::new();
        payload.put_u16(PING_CLIENT_BUFFER);
        payload.put_u32(1);
        payload.put_u32(3000);
        let event = decode_message(TYPE_PING, 0, 0, Encoding::Amf0, payload).unwrap();
        assert!(matches!(
            event,
            Event::Ping(PingEvent::SetBuffer {
                stream_id: 1,
                buffer_ms: 3000
            })
        ));
    }

    #[test]
    fn test_ping_swf_verify_pair() {
        let mut payload = BytesMut::new();
        payload.put_u16(PING_SWF_VERIFY);
        let event = decode_message(TYPE_PING, 0, 0, Encoding::Amf0, payload).unwrap();
        assert!(matches!(event, Event::Ping(PingEvent::SwfVerifyRequest)));

        let mut payload = BytesMut::new();
        payload.put_u16(PONG_SWF_VERIFY);
        payload.put_slice(&[7u8; SWF_VERIFICATION_LENGTH]);
        let event = decode_message(TYPE_PING, 0, 0, Encoding::Amf0, payload).unwrap();
        match event {
            Event::Ping(PingEvent::SwfVerifyResponse(body)) => {
                assert_eq!(body, [7u8; SWF_VERIFICATION_LENGTH]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_ping_default_subtype() {
        let mut payload = BytesMut::new();
        payload.put_u16(PING_STREAM_BEGIN);
        payload.put_u32(1);
        let event = decode_message(TYPE_PING, 0, 0, Encoding::Amf0, payload).unwrap();
        assert!(matches!(
            event,
            Event::Ping(PingEvent::Other {
                event_type: PING_STREAM_BEGIN,
                value: 1
            })
        ));
    }

    #[test]
    fn test_invoke_connect() {
        let mut params = HashMap::new();
        params.insert("app".to_string(), AmfValue::String("live".into()));
        let payload = amf0_bytes(&[
            AmfValue::String("connect".into()),
            AmfValue::Number(1.0),
            AmfValue::Object(params),
        ]);
        let event = decode_message(TYPE_INVOKE, 0, 500, Encoding::Amf0, payload).unwrap();
        match event {
            Event::Invoke(invoke) => {
                assert_eq!(invoke.timestamp, 500);
                assert_eq!(invoke.transaction_id, 1.0);
                assert_eq!(invoke.call.service_name, None);
                assert_eq!(invoke.call.method, "connect");
                assert!(invoke.call.args.is_empty());
                let params = invoke.connection_params.unwrap();
                assert_eq!(params.get("app"), Some(&AmfValue::String("live".into())));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_invoke_positional_args() {
        let payload = amf0_bytes(&[
            AmfValue::String("play".into()),
            AmfValue::Number(0.0),
            AmfValue::Null,
            AmfValue::String("stream1".into()),
            AmfValue::Number(-2.0),
        ]);
        let event = decode_message(TYPE_INVOKE, 1, 0, Encoding::Amf0, payload).unwrap();
        match event {
            Event::Invoke(invoke) => {
                assert_eq!(invoke.call.method, "play");
                // the leading null command object is dropped
                assert_eq!(
                    invoke.call.args,
                    vec![
                        AmfValue::String("stream1".into()),
                        AmfValue::Number(-2.0)
                    ]
                );
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_invoke_dotted_action() {
        let payload = amf0_bytes(&[
            AmfValue::String("|rooms.service.join".into()),
            AmfValue::Number(2.0),
        ]);
        let event = decode_message(TYPE_INVOKE, 0, 0, Encoding::Amf0, payload).unwrap();
        match event {
            Event::Invoke(invoke) => {
                assert_eq!(invoke.call.service_name.as_deref(), Some("rooms.service"));
                assert_eq!(invoke.call.method, "join");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_invoke_without_action_fails() {
        let payload = amf0_bytes(&[AmfValue::Number(1.0)]);
        let err = decode_message(TYPE_INVOKE, 0, 0, Encoding::Amf0, payload).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedAmf { .. }));
    }

    #[test]
    fn test_invoke_missing_transaction_defaults_to_zero() {
        let payload = amf0_bytes(&[AmfValue::String("closeStream".into())]);
        let event = decode_message(TYPE_INVOKE, 0, 0, Encoding::Amf0, payload).unwrap();
        match event {
            Event::Invoke(invoke) => assert_eq!(invoke.transaction_id, 0.0),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_flex_message_skips_lead_byte() {
        let mut payload = BytesMut::new();
        payload.put_u8(0x00);
        payload.put_slice(&amf0_bytes(&[
            AmfValue::String("receive".into()),
            AmfValue::Number(3.0),
            AmfValue::Null,
            AmfValue::String("x".into()),
        ]));
        let event = decode_message(TYPE_FLEX_MESSAGE, 0, 0, Encoding::Amf0, payload).unwrap();
        match event {
            Event::FlexInvoke(invoke) => {
                assert_eq!(invoke.call.method, "receive");
                assert_eq!(invoke.transaction_id, 3.0);
                assert_eq!(invoke.call.args, vec![AmfValue::String("x".into())]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_flex_message_amf3_argument() {
        let mut payload = BytesMut::new();
        payload.put_u8(0x00);
        payload.put_slice(&amf0_bytes(&[
            AmfValue::String("push".into()),
            AmfValue::Number(0.0),
            AmfValue::Null,
        ]));
        // avmplus-switched AMF3 integer argument
        payload.put_slice(&[0x11, 0x04, 0x2A]);
        let event = decode_message(TYPE_FLEX_MESSAGE, 0, 0, Encoding::Amf0, payload).unwrap();
        match event {
            Event::FlexInvoke(invoke) => {
                assert_eq!(invoke.call.args, vec![AmfValue::Integer(42)]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_notify_stream_zero_decodes_as_action() {
        let payload = amf0_bytes(&[
            AmfValue::String("onStatus".into()),
            AmfValue::Number(0.0),
        ]);
        let event = decode_message(TYPE_NOTIFY, 0, 0, Encoding::Amf0, payload).unwrap();
        assert!(matches!(event, Event::Notify(_)));
    }

    #[test]
    fn test_notify_dataframe_reencodes() {
        let mut meta = HashMap::new();
        meta.insert("duration".to_string(), AmfValue::Number(0.0));
        meta.insert("width".to_string(), AmfValue::Number(1280.0));
        let payload = amf0_bytes(&[
            AmfValue::String("@setDataFrame".into()),
            AmfValue::String("onMetaData".into()),
            AmfValue::EcmaArray(meta.clone()),
        ]);
        let event = decode_message(TYPE_NOTIFY, 1, 40, Encoding::Amf0, payload).unwrap();
        match event {
            Event::StreamData(data) => {
                assert_eq!(data.action.as_deref(), Some("onMetaData"));
                assert_eq!(data.timestamp, 40);
                // the re-encoded buffer holds (method, params) and drops
                // the @setDataFrame wrapper
                let mut cur = ByteCursor::from_slice(&data.data);
                let mut dec = crate::amf::Amf0Decoder::new();
                assert_eq!(
                    dec.decode(&mut cur).unwrap(),
                    AmfValue::String("onMetaData".into())
                );
                assert_eq!(dec.decode(&mut cur).unwrap(), AmfValue::EcmaArray(meta));
                assert_eq!(cur.remaining(), 0);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_notify_other_action_keeps_raw_payload() {
        let payload = amf0_bytes(&[
            AmfValue::String("onFI".into()),
            AmfValue::String("09:11:33".into()),
        ]);
        let raw = payload.clone();
        let event = decode_message(TYPE_NOTIFY, 1, 0, Encoding::Amf0, payload).unwrap();
        match event {
            Event::StreamData(data) => {
                assert_eq!(data.action.as_deref(), Some("onFI"));
                assert_eq!(&data.data[..], &raw[..]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_flex_stream_send_slices_past_lead_byte() {
        let mut payload = BytesMut::new();
        payload.put_u8(0x00);
        let inner = amf0_bytes(&[
            AmfValue::String("onFI".into()),
            AmfValue::String("12-07-2011".into()),
        ]);
        payload.put_slice(&inner);
        let event = decode_message(TYPE_FLEX_STREAM_SEND, 1, 0, Encoding::Amf0, payload).unwrap();
        match event {
            Event::StreamData(data) => {
                assert_eq!(data.action.as_deref(), Some("onFI"));
                // the retained payload starts after the flex byte
                assert_eq!(&data.data[..], &inner[..]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_is_not_fatal() {
        let payload = BytesMut::from(&[1u8, 2, 3][..]);
        let event = decode_message(99, 0, 0, Encoding::Amf0, payload).unwrap();
        match event {
            Event::Unknown { data_type, data } => {
                assert_eq!(data_type, 99);
                assert_eq!(&data[..], &[1, 2, 3]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_flex_shared_object_bad_selector() {
        let payload = BytesMut::from(&[7u8][..]);
        let err =
            decode_message(TYPE_FLEX_SHARED_OBJECT, 0, 0, Encoding::Amf0, payload).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownSharedObjectEncoding(7)));
    }

    #[test]
    fn test_audio_event_owns_payload() {
        let payload = BytesMut::from(&[0xAF, 0x01, 0xAA, 0xBB][..]);
        let event = decode_message(TYPE_AUDIO_DATA, 1, 1000, Encoding::Amf0, payload).unwrap();
        match event {
            Event::Audio(audio) => {
                assert_eq!(audio.timestamp, 1000);
                assert_eq!(audio.data.len(), 4);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
