// Payload shapes accepted by the cache.
// Each variant states how it is written to disk.

use std::fmt;

use serde_json::Value;
use tokio::io::AsyncRead;

/// Data to persist under a cache key.
pub enum Payload {
    /// A live byte stream, copied to the entry until EOF.
    Stream(Box<dyn AsyncRead + Send + Unpin>),
    /// A structured value, written as compact JSON.
    Structured(Value),
    /// Raw bytes or text, written as-is.
    Raw(Vec<u8>),
}

impl Payload {
    pub fn stream<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Payload::Stream(Box::new(reader))
    }

    /// Map a JSON value received from the peer: strings are stored verbatim,
    /// everything else as structured JSON.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(text) => Payload::Raw(text.into_bytes()),
            other => Payload::Structured(other),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Stream(_) => f.write_str("Stream(..)"),
            Payload::Structured(value) => f.debug_tuple("Structured").field(value).finish(),
            Payload::Raw(bytes) => write!(f, "Raw({} bytes)", bytes.len()),
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Raw(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Raw(bytes.to_vec())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Raw(text.into_bytes())
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Raw(text.as_bytes().to_vec())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Structured(value)
    }
}
