// Operation registry.
// The closed set of operations the front-end may call, with typed arguments.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{HostError, Result};
use crate::settings::Settings;

use super::backend::Backend;

/// Name of a registered operation as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationName {
    AppInfo,
    GetSettings,
    SetSettings,
    CacheHas,
    CacheRemove,
    CacheDownload,
    CacheSave,
}

impl OperationName {
    /// Every registered operation.
    pub const ALL: [OperationName; 7] = [
        OperationName::AppInfo,
        OperationName::GetSettings,
        OperationName::SetSettings,
        OperationName::CacheHas,
        OperationName::CacheRemove,
        OperationName::CacheDownload,
        OperationName::CacheSave,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationName::AppInfo => "appInfo",
            OperationName::GetSettings => "getSettings",
            OperationName::SetSettings => "setSettings",
            OperationName::CacheHas => "cacheHas",
            OperationName::CacheRemove => "cacheRemove",
            OperationName::CacheDownload => "cacheDownload",
            OperationName::CacheSave => "cacheSave",
        }
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationName {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| HostError::UnknownOperation(s.to_string()))
    }
}

/// A decoded call, ready to run against a [`Backend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    AppInfo,
    GetSettings,
    SetSettings(Settings),
    CacheHas { key: String },
    CacheRemove { key: String },
    CacheDownload { url: String, key: String },
    CacheSave { key: String, data: Value },
}

impl Operation {
    pub fn name(&self) -> OperationName {
        match self {
            Operation::AppInfo => OperationName::AppInfo,
            Operation::GetSettings => OperationName::GetSettings,
            Operation::SetSettings(_) => OperationName::SetSettings,
            Operation::CacheHas { .. } => OperationName::CacheHas,
            Operation::CacheRemove { .. } => OperationName::CacheRemove,
            Operation::CacheDownload { .. } => OperationName::CacheDownload,
            Operation::CacheSave { .. } => OperationName::CacheSave,
        }
    }

    /// Decode positional wire arguments for `name`.
    ///
    /// Surplus arguments are ignored.
    pub fn decode(name: OperationName, args: Vec<Value>) -> Result<Self> {
        let mut args = Args::new(name, args);

        let operation = match name {
            OperationName::AppInfo => Operation::AppInfo,
            OperationName::GetSettings => Operation::GetSettings,
            OperationName::SetSettings => Operation::SetSettings(args.next()?),
            OperationName::CacheHas => Operation::CacheHas {
                key: args.next_key()?,
            },
            OperationName::CacheRemove => Operation::CacheRemove {
                key: args.next_key()?,
            },
            OperationName::CacheDownload => Operation::CacheDownload {
                url: args.next()?,
                key: args.next_key()?,
            },
            OperationName::CacheSave => Operation::CacheSave {
                key: args.next_key()?,
                data: args.next()?,
            },
        };

        Ok(operation)
    }

    /// Run the operation and serialize its result for the reply.
    pub async fn invoke(self, backend: &dyn Backend) -> Result<Value> {
        match self {
            Operation::AppInfo => to_reply(backend.app_info().await?),
            Operation::GetSettings => to_reply(backend.get_settings().await?),
            Operation::SetSettings(settings) => to_reply(backend.set_settings(settings).await?),
            Operation::CacheHas { key } => to_reply(backend.cache_has(key).await?),
            Operation::CacheRemove { key } => to_reply(backend.cache_remove(key).await?),
            Operation::CacheDownload { url, key } => {
                to_reply(backend.cache_download(url, key).await?)
            }
            Operation::CacheSave { key, data } => to_reply(backend.cache_save(key, data).await?),
        }
    }
}

fn to_reply<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Cursor over positional arguments.
struct Args {
    name: OperationName,
    values: std::vec::IntoIter<Value>,
    position: usize,
}

impl Args {
    fn new(name: OperationName, values: Vec<Value>) -> Self {
        Self {
            name,
            values: values.into_iter(),
            position: 0,
        }
    }

    fn take(&mut self) -> Result<Value> {
        self.position += 1;
        self.values.next().ok_or_else(|| {
            HostError::invalid_arguments(
                self.name.as_str(),
                format!("missing argument {}", self.position),
            )
        })
    }

    fn next<T: DeserializeOwned>(&mut self) -> Result<T> {
        let value = self.take()?;
        serde_json::from_value(value).map_err(|e| {
            HostError::invalid_arguments(
                self.name.as_str(),
                format!("argument {}: {}", self.position, e),
            )
        })
    }

    /// Cache keys may arrive as strings or numbers.
    fn next_key(&mut self) -> Result<String> {
        match self.take()? {
            Value::String(key) => Ok(key),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(HostError::invalid_arguments(
                self.name.as_str(),
                format!("argument {}: expected a cache key, got {}", self.position, other),
            )),
        }
    }
}
