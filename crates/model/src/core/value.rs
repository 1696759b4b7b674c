use crate::{core::value_type::ValueType, records::record::Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, hash::Hash};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Collection(Vec<Value>),
    Object(Record),
    Null,
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        use Value::*;
        std::mem::discriminant(self).hash(state);
        match self {
            Int(v) => v.hash(state),
            Float(v) => {
                // Hash the bits of the float to handle NaN and -0.0 correctly
                let bits = v.to_bits();
                bits.hash(state);
            }
            String(v) => v.hash(state),
            Boolean(v) => v.hash(state),
            Bytes(v) => v.hash(state),
            Timestamp(v) => v.hash(state),
            Collection(v) => v.hash(state),
            Object(record) => {
                for (name, value) in record.attributes() {
                    name.hash(state);
                    value.hash(state);
                }
            }
            Null => {} // Nothing to hash for Null
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::String(v) => v.trim().parse::<f64>().ok(),
            Value::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::Timestamp(v) => Some(v.timestamp_millis() as f64),
            Value::Bytes(_) | Value::Collection(_) | Value::Object(_) | Value::Null => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Int(v) => Some(*v != 0),
            Value::Float(v) => Some(*v != 0.0),
            Value::String(v) => match v.to_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            Value::Boolean(v) => Some(*v),
            Value::Bytes(_)
            | Value::Timestamp(_)
            | Value::Collection(_)
            | Value::Object(_)
            | Value::Null => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Plain text form used by string functions and directory filters.
    /// `Null` renders as the empty string.
    pub fn to_text(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::String(v) => v.clone(),
            Value::Boolean(v) => v.to_string(),
            Value::Bytes(b) => String::from_utf8_lossy(b).to_string(),
            Value::Timestamp(t) => t.to_rfc3339(),
            Value::Collection(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(record) => record.get_value("id").to_text(),
            Value::Null => String::new(),
        }
    }

    /// Orders two scalars. Numbers compare numerically, and a string compares
    /// numerically against a number when it parses as one.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Int(a), Float(b)) => (*a as f64).partial_cmp(b),
            (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)),
            (String(a), String(b)) => Some(a.cmp(b)),
            (String(_), Int(_) | Float(_)) | (Int(_) | Float(_), String(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Boolean(a), String(_)) => other.as_bool().map(|b| a.cmp(&b)),
            (String(_), Boolean(b)) => self.as_bool().map(|a| a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (Bytes(a), Bytes(b)) => Some(a.cmp(b)),
            (Object(a), Object(b)) => a.get_value("id").compare(&b.get_value("id")),
            _ => None,
        }
    }

    pub fn equal(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Int(_) | Value::Float(_) | Value::Timestamp(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Bytes(_) => ValueType::Binary,
            Value::Collection(_) => ValueType::Collection,
            Value::Object(_) | Value::Null => ValueType::Any,
        }
    }

    /// Converts to the requested type, `None` when no documented coercion exists.
    /// `Null` stays `Null` for every scalar target.
    pub fn coerce(&self, target: ValueType) -> Option<Value> {
        match target {
            ValueType::Any => Some(self.clone()),
            ValueType::Collection => Some(Value::Collection(self.clone().into_collection())),
            _ if self.is_null() => Some(Value::Null),
            ValueType::Boolean => self.as_bool().map(Value::Boolean),
            ValueType::Number => match self {
                Value::Int(_) | Value::Float(_) => Some(self.clone()),
                Value::String(s) => {
                    let trimmed = s.trim();
                    trimmed
                        .parse::<i64>()
                        .map(Value::Int)
                        .ok()
                        .or_else(|| trimmed.parse::<f64>().ok().map(Value::Float))
                }
                Value::Boolean(b) => Some(Value::Int(i64::from(*b))),
                Value::Timestamp(t) => Some(Value::Int(t.timestamp_millis())),
                _ => None,
            },
            ValueType::String | ValueType::WildcardString => match self {
                Value::Collection(_) | Value::Object(_) => None,
                other => Some(Value::String(other.to_text())),
            },
            ValueType::Binary => match self {
                Value::Bytes(_) => Some(self.clone()),
                Value::String(s) => Some(Value::Bytes(s.clone().into_bytes())),
                _ => None,
            },
        }
    }

    /// Collection view: collections unwrap, `Null` is empty, scalars are singletons.
    pub fn into_collection(self) -> Vec<Value> {
        match self {
            Value::Collection(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        }
    }

    /// Walks a dotted path below this value. Walking over a collection maps the
    /// remaining path over each element and flattens the result.
    pub fn get_path(&self, segments: &[String]) -> Value {
        let Some((head, rest)) = segments.split_first() else {
            return self.clone();
        };
        match self {
            Value::Object(record) => record.get_value(head).get_path(rest),
            Value::Collection(items) => {
                let mut flattened = Vec::new();
                for item in items {
                    match item.get_path(segments) {
                        Value::Collection(inner) => flattened.extend(inner),
                        Value::Null => {}
                        other => flattened.push(other),
                    }
                }
                Value::Collection(flattened)
            }
            _ => Value::Null,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Value::from(*v),
            Value::String(v) => serde_json::Value::from(v.clone()),
            Value::Boolean(v) => serde_json::Value::from(*v),
            Value::Bytes(b) => serde_json::Value::from(String::from_utf8_lossy(b).to_string()),
            Value::Timestamp(t) => serde_json::Value::from(t.to_rfc3339()),
            Value::Collection(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(record) => serde_json::Value::Object(
                record
                    .attributes()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect(),
            ),
            Value::Null => serde_json::Value::Null,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Collection(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .fold(Record::new(), |record, (name, value)| {
                        record.with(&name, Value::from(value))
                    }),
            ),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Collection(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Object(v)
    }
}

/// Renders the value as an inline SQL literal.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Bytes(v) => {
                let hex = v
                    .iter()
                    .fold(String::new(), |acc, byte: &u8| acc + &format!("{byte:02x}"));
                write!(f, "X'{hex}'")
            }
            Value::Timestamp(v) => write!(f, "'{}'", v.to_rfc3339()),
            Value::Collection(items) => {
                let rendered = items
                    .iter()
                    .map(|item| item.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{rendered}")
            }
            Value::Object(record) => write!(f, "{}", record.get_value("id")),
            Value::Null => write!(f, "NULL"),
        }
    }
}
