//! Identity model: application keys and positional slots.
//!
//! A [`Key`] is a canonical, hashable form of whatever value the application
//! used to name an element. Nodes without a key are identified by their
//! position among unkeyed siblings ([`Identity::Slot`]), which keeps them
//! stable across rebuilds as long as the surrounding structure is.
use crate::errors::KeyError;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Bool(bool),
    Int(i64),
    /// Bit pattern of a finite, non-integral float.
    Float(u64),
    Str(Arc<str>),
    Seq(Arc<[Key]>),
    /// Fields sorted by name.
    Map(Arc<[(Arc<str>, Key)]>),
    Unique(Uuid),
}

impl Key {
    /// A fresh per-instance token. Nodes carrying it never match across rebuilds.
    pub fn unique() -> Self {
        Key::Unique(Uuid::new_v4())
    }

    pub fn seq<I, K>(items: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        Key::Seq(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, S, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, K)>,
        S: Into<Arc<str>>,
        K: Into<Key>,
    {
        let mut fields: Vec<(Arc<str>, Key)> = fields
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        Key::Map(fields.into())
    }

    pub fn float(value: f64) -> Result<Self, KeyError> {
        if value.is_nan() {
            return Err(KeyError::Unhashable { value: value.to_string() });
        }
        if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
            return Ok(Key::Int(value as i64));
        }
        Ok(Key::Float(value.to_bits()))
    }

    /// Canonicalise an arbitrary JSON value.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, KeyError> {
        use serde_json::Value;
        match value {
            Value::Null => Err(KeyError::Null),
            Value::Bool(b) => Ok(Key::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Key::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Key::float(f)
                } else {
                    Err(KeyError::Unhashable { value: n.to_string() })
                }
            }
            Value::String(s) => Ok(Key::Str(s.as_str().into())),
            Value::Array(items) => {
                let items = items.iter().map(Key::from_json).collect::<Result<Vec<_>, _>>()?;
                Ok(Key::Seq(items.into()))
            }
            Value::Object(fields) => {
                let mut canonical = Vec::with_capacity(fields.len());
                for (name, field) in fields {
                    canonical.push((Arc::<str>::from(name.as_str()), Key::from_json(field)?));
                }
                canonical.sort_by(|a, b| a.0.cmp(&b.0));
                Ok(Key::Map(canonical.into()))
            }
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.into())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value.into())
    }
}

impl From<bool> for Key {
    fn from(value: bool) -> Self {
        Key::Bool(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(value.into())
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Key::Int(value.into())
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        i64::try_from(value)
            .map(Key::Int)
            .unwrap_or_else(|_| Key::Str(value.to_string().into()))
    }
}

impl From<Uuid> for Key {
    fn from(value: Uuid) -> Self {
        Key::Unique(value)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Bool(b) => write!(f, "{}", b),
            Key::Int(i) => write!(f, "{}", i),
            Key::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Key::Str(s) => write!(f, "{:?}", s),
            Key::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Key::Map(fields) => {
                f.write_str("{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                f.write_str("}")
            }
            Key::Unique(id) => write!(f, "#{}", id),
        }
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Key::Bool(b) => serializer.serialize_bool(*b),
            Key::Int(i) => serializer.serialize_i64(*i),
            Key::Float(bits) => serializer.serialize_f64(f64::from_bits(*bits)),
            Key::Str(s) => serializer.serialize_str(s),
            Key::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Key::Map(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields.iter() {
                    map.serialize_entry(name.as_ref(), value)?;
                }
                map.end()
            }
            Key::Unique(id) => serializer.serialize_str(&id.to_string()),
        }
    }
}

/// What a record in the snapshot is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Identity {
    Root,
    Key(Key),
    /// The `ordinal`-th unkeyed child of `parent`.
    Slot { parent: Arc<Identity>, ordinal: u32 },
    /// An unkeyed stateful node built directly by the state `owner`.
    Built { owner: Arc<Identity> },
}

impl Identity {
    pub fn slot(parent: &Identity, ordinal: u32) -> Self {
        Identity::Slot { parent: Arc::new(parent.clone()), ordinal }
    }

    pub fn built_by(owner: &Identity) -> Self {
        Identity::Built { owner: Arc::new(owner.clone()) }
    }

    pub fn key(&self) -> Option<&Key> {
        match self {
            Identity::Key(key) => Some(key),
            _ => None,
        }
    }
}

impl From<Key> for Identity {
    fn from(key: Key) -> Self {
        Identity::Key(key)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Root => f.write_str("root"),
            Identity::Key(key) => write!(f, "{}", key),
            Identity::Slot { parent, ordinal } => write!(f, "{}/{}", parent, ordinal),
            Identity::Built { owner } => write!(f, "{}/built", owner),
        }
    }
}
