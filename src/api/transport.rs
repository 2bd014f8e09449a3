// Line-delimited JSON transport.
// Frames inbound requests and outbound replies over an async reader/writer pair.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{HostError, Result};

use super::dispatcher::{CorrelationToken, Dispatcher, Inbound, LIST_OPERATIONS, Reply, Request};

/// Maximum number of decoded requests waiting for the dispatcher.
const INBOUND_BUFFER: usize = 64;

/// Inbound line: `{"op": "cacheHas", "token": "17", "args": ["key"]}`.
#[derive(Debug, Deserialize)]
struct WireRequest {
    op: String,
    #[serde(default)]
    token: Option<CorrelationToken>,
    #[serde(default)]
    args: Vec<Value>,
}

/// Outbound line: `{"channel": "cacheHas17", "resolve": true}` or with `reject`.
#[derive(Debug, Serialize)]
struct WireReply<'a> {
    channel: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolve: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reject: Option<&'a Value>,
}

/// Decode one request line.
///
/// Returns `Ok(None)` for a call without a correlation token, since there
/// is no channel to reply on.
pub fn decode_line(line: &str) -> Result<Option<Inbound>> {
    let wire: WireRequest = serde_json::from_str(line)?;

    if wire.op == LIST_OPERATIONS {
        return Ok(Some(Inbound::ListOperations));
    }

    Ok(wire.token.map(|token| {
        Inbound::Call(Request {
            operation: wire.op,
            token,
            args: wire.args,
        })
    }))
}

/// Encode a reply as a single line, without the trailing newline.
pub fn encode_reply(reply: &Reply) -> Result<String> {
    let (resolve, reject) = match &reply.outcome {
        Ok(value) => (Some(value), None),
        Err(value) => (None, Some(value)),
    };
    let wire = WireReply {
        channel: &reply.channel,
        resolve,
        reject,
    };
    Ok(serde_json::to_string(&wire)?)
}

/// Serve `dispatcher` over a line-oriented reader and writer.
///
/// Returns once the reader hits EOF and every reply of an already accepted
/// request has been written.
pub async fn run<R, W>(dispatcher: Dispatcher, reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (in_tx, in_rx) = mpsc::channel(INBOUND_BUFFER);
    let (out_tx, out_rx) = mpsc::unbounded_channel();

    let server = tokio::spawn(dispatcher.serve(in_rx, out_tx));
    let replies = tokio::spawn(write_replies(writer, out_rx));

    read_requests(reader, in_tx).await?;

    server
        .await
        .map_err(|e| HostError::TaskFailed(e.to_string()))?;
    replies
        .await
        .map_err(|e| HostError::TaskFailed(e.to_string()))?
}

async fn read_requests<R>(mut reader: R, requests: mpsc::Sender<Inbound>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        // Invalid UTF-8 is a malformed line like any other, not the end of the stream
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!(error = %e, "dropping request line that is not UTF-8");
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        match decode_line(line) {
            Ok(Some(message)) => {
                if requests.send(message).await.is_err() {
                    break;
                }
            }
            Ok(None) => warn!("dropping call without correlation token"),
            Err(e) => warn!(error = %e, "dropping malformed request line"),
        }
    }

    debug!("request stream ended");
    Ok(())
}

async fn write_replies<W>(mut writer: W, mut replies: mpsc::UnboundedReceiver<Reply>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(reply) = replies.recv().await {
        let mut line = encode_reply(&reply)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }

    writer.shutdown().await?;
    Ok(())
}
