//! AMF value types
//!
//! AMF0 and AMF3 share one in-memory value representation; the wire
//! markers differ but the shapes are the same. A few variants
//! (ByteArray, Integer) only exist on the AMF3 wire.

use std::collections::HashMap;

/// Unified AMF value representation
#[derive(Debug, Clone, PartialEq)]
pub enum AmfValue {
    /// Null value (AMF0: 0x05, AMF3: 0x01)
    Null,

    /// Undefined value (AMF0: 0x06, AMF3: 0x00)
    Undefined,

    /// Boolean value (AMF0: 0x01, AMF3: 0x02/0x03)
    Boolean(bool),

    /// IEEE 754 double (AMF0: 0x00, AMF3: 0x05)
    Number(f64),

    /// 29-bit signed integer (AMF3 only: 0x04)
    Integer(i32),

    /// UTF-8 string (AMF0: 0x02/0x0C, AMF3: 0x06)
    String(String),

    /// Dense array (AMF0 strict array 0x0A, AMF3 array 0x09)
    Array(Vec<AmfValue>),

    /// Associative array (AMF0 ECMA array 0x08; AMF3 array with a
    /// non-empty associative portion)
    EcmaArray(HashMap<String, AmfValue>),

    /// Anonymous key-value object (AMF0: 0x03, AMF3: 0x0A)
    Object(HashMap<String, AmfValue>),

    /// Object carrying a class name alongside its properties
    TypedObject {
        class_name: String,
        properties: HashMap<String, AmfValue>,
    },

    /// Milliseconds since the Unix epoch (AMF0: 0x0B, AMF3: 0x08)
    Date(f64),

    /// XML document (AMF0: 0x0F, AMF3: 0x07/0x0B)
    Xml(String),

    /// Raw byte array (AMF3 only: 0x0C)
    ByteArray(Vec<u8>),
}

impl AmfValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AmfValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AmfValue::Number(n) => Some(*n),
            AmfValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AmfValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Any map-shaped value: object, ECMA array, or typed object
    pub fn as_object(&self) -> Option<&HashMap<String, AmfValue>> {
        match self {
            AmfValue::Object(m) => Some(m),
            AmfValue::EcmaArray(m) => Some(m),
            AmfValue::TypedObject { properties, .. } => Some(properties),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[AmfValue]> {
        match self {
            AmfValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, AmfValue::Null | AmfValue::Undefined)
    }

    /// Property lookup on a map-shaped value
    pub fn get(&self, key: &str) -> Option<&AmfValue> {
        self.as_object()?.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key)?.as_number()
    }
}

impl Default for AmfValue {
    fn default() -> Self {
        AmfValue::Null
    }
}

impl From<bool> for AmfValue {
    fn from(v: bool) -> Self {
        AmfValue::Boolean(v)
    }
}

impl From<f64> for AmfValue {
    fn from(v: f64) -> Self {
        AmfValue::Number(v)
    }
}

impl From<&str> for AmfValue {
    fn from(v: &str) -> Self {
        AmfValue::String(v.to_string())
    }
}

impl From<String> for AmfValue {
    fn from(v: String) -> Self {
        AmfValue::String(v)
    }
}

impl<V: Into<AmfValue>> From<Vec<V>> for AmfValue {
    fn from(v: Vec<V>) -> Self {
        AmfValue::Array(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<V: Into<AmfValue>> From<HashMap<String, V>> for AmfValue {
    fn from(v: HashMap<String, V>) -> Self {
        AmfValue::Object(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let s = AmfValue::String("live".into());
        assert_eq!(s.as_str(), Some("live"));
        assert_eq!(s.as_number(), None);

        let i = AmfValue::Integer(7);
        assert_eq!(i.as_number(), Some(7.0));

        let mut map = HashMap::new();
        map.insert("app".to_string(), AmfValue::String("live".into()));
        let obj = AmfValue::Object(map);
        assert_eq!(obj.get_string("app"), Some("live"));
        assert_eq!(obj.get_number("app"), None);
    }

    #[test]
    fn test_map_shapes_share_accessor() {
        let mut map = HashMap::new();
        map.insert("k".to_string(), AmfValue::Number(1.0));
        let ecma = AmfValue::EcmaArray(map.clone());
        let typed = AmfValue::TypedObject {
            class_name: "flex.messaging.messages.RemotingMessage".into(),
            properties: map,
        };
        assert!(ecma.as_object().is_some());
        assert!(typed.as_object().is_some());
    }

    #[test]
    fn test_from_conversions() {
        let v: AmfValue = "x".into();
        assert!(matches!(v, AmfValue::String(_)));
        let v: AmfValue = 1.5.into();
        assert!(matches!(v, AmfValue::Number(_)));
        let v: AmfValue = vec![1.0, 2.0].into();
        assert_eq!(v.as_array().map(|a| a.len()), Some(2));
    }
}
