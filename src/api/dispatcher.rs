// Request dispatcher.
// Runs peer requests against the backend, racing each one against a fixed timeout.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{HostError, Result};

use super::backend::Backend;
use super::operation::{Operation, OperationName};

/// Time an operation gets before the peer receives a timeout rejection.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Channel name of the synchronous operation listing.
pub const LIST_OPERATIONS: &str = "getApiKeys";

/// Opaque token the peer uses to match a reply to its request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "TokenRepr")]
pub struct CorrelationToken(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum TokenRepr {
    Text(String),
    Number(serde_json::Number),
}

impl From<TokenRepr> for CorrelationToken {
    fn from(repr: TokenRepr) -> Self {
        match repr {
            TokenRepr::Text(text) => CorrelationToken(text),
            TokenRepr::Number(n) => CorrelationToken(n.to_string()),
        }
    }
}

impl From<&str> for CorrelationToken {
    fn from(token: &str) -> Self {
        CorrelationToken(token.to_string())
    }
}

impl From<String> for CorrelationToken {
    fn from(token: String) -> Self {
        CorrelationToken(token)
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, correlated call received from the peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub operation: String,
    pub token: CorrelationToken,
    pub args: Vec<Value>,
}

impl Request {
    pub fn new(
        operation: impl Into<String>,
        token: impl Into<CorrelationToken>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            operation: operation.into(),
            token: token.into(),
            args,
        }
    }

    /// Channel the reply is sent on: operation name followed by the token.
    pub fn reply_channel(&self) -> String {
        format!("{}{}", self.operation, self.token)
    }
}

/// Message from the peer.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Call(Request),
    /// Ask for the registered operation names. Answered immediately.
    ListOperations,
}

/// Message to the peer.
///
/// A failed operation and a timed-out one both arrive as a rejection; only
/// the payload tells them apart.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub channel: String,
    pub outcome: std::result::Result<Value, Value>,
}

impl Reply {
    pub fn resolve(channel: impl Into<String>, value: Value) -> Self {
        Self {
            channel: channel.into(),
            outcome: Ok(value),
        }
    }

    pub fn reject(channel: impl Into<String>, value: Value) -> Self {
        Self {
            channel: channel.into(),
            outcome: Err(value),
        }
    }

    pub fn operation_names(names: Vec<&'static str>) -> Self {
        Self::resolve(LIST_OPERATIONS, Value::from(names))
    }
}

/// Bridges peer requests to a [`Backend`].
///
/// Every call is spawned as its own task and raced against the timeout.
/// When the timeout wins, the task is detached rather than aborted: it runs
/// to completion in the background and its result is discarded, so any side
/// effects it performs still happen.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn Backend>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Names of every registered operation.
    pub fn operation_names(&self) -> Vec<&'static str> {
        OperationName::ALL.iter().map(|name| name.as_str()).collect()
    }

    /// Run `operation`, settling with whichever finishes first: the
    /// operation or the timeout.
    pub async fn call(&self, operation: Operation) -> Result<Value> {
        let name = operation.name();
        let backend = self.backend.clone();
        let task = tokio::spawn(async move { operation.invoke(backend.as_ref()).await });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(HostError::TaskFailed(e.to_string())),
            Err(_) => {
                warn!(operation = %name, "operation timed out, abandoning it");
                Err(HostError::Timeout(self.timeout))
            }
        }
    }

    /// Handle one peer request and build its reply.
    pub async fn handle_request(&self, request: Request) -> Reply {
        let channel = request.reply_channel();
        debug!(operation = %request.operation, token = %request.token, "request received");

        let outcome = match decode(request) {
            Ok(operation) => self.call(operation).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(value) => {
                debug!(%channel, "replying");
                Reply::resolve(channel, value)
            }
            Err(e) => {
                warn!(%channel, error = %e, "replying with failure");
                Reply::reject(channel, e.reply_value())
            }
        }
    }

    /// Serve every registered operation until the inbound channel closes.
    ///
    /// Calls run concurrently; the operation listing is answered inline.
    /// Replies of calls still in flight when this returns are delivered as
    /// they settle, for as long as the outbound receiver is alive.
    pub async fn serve(
        self,
        mut inbound: mpsc::Receiver<Inbound>,
        outbound: mpsc::UnboundedSender<Reply>,
    ) {
        debug!(operations = ?self.operation_names(), "serving operations");

        while let Some(message) = inbound.recv().await {
            match message {
                Inbound::ListOperations => {
                    let _ = outbound.send(Reply::operation_names(self.operation_names()));
                }
                Inbound::Call(request) => {
                    let dispatcher = self.clone();
                    let outbound = outbound.clone();
                    tokio::spawn(async move {
                        let reply = dispatcher.handle_request(request).await;
                        if outbound.send(reply).is_err() {
                            debug!("peer gone, dropping reply");
                        }
                    });
                }
            }
        }

        debug!("inbound channel closed");
    }
}

fn decode(request: Request) -> Result<Operation> {
    let name: OperationName = request.operation.parse()?;
    Operation::decode(name, request.args)
}
