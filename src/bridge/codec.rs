//! Native-messaging framing: a 4-byte native-endian length, then UTF-8 JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::SummaryError;

/// Browsers cap host-to-extension messages at 1 MiB; inbound uses the same bound.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Message shapes exchanged over the port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Envelope {
    /// Extension asks the host to do something (`getSummary`, ...).
    Request { id: Value, body: Value },
    /// Host answers a `Request`.
    Response { id: Value, body: Value },
    /// Host asks the extension to run a collaborator method.
    Call {
        id: String,
        method: String,
        params: Value,
    },
    /// Extension answers a `Call`.
    Reply {
        id: String,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Reads one frame. `Ok(None)` means the peer closed the stream cleanly.
///
/// # Errors
///
/// Returns `MalformedRequest` for a body that isn't JSON (the stream stays usable)
/// and `Driver` for I/O failures or an oversized frame.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Value>, SummaryError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_ne_bytes(len_buf) as usize;
    // The body is left unread, so the stream can't be resynchronized
    if len > MAX_FRAME_BYTES {
        return Err(SummaryError::Driver(format!(
            "frame of {len} bytes exceeds limit of {MAX_FRAME_BYTES}"
        )));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(serde_json::from_slice(&body)?))
}

/// # Errors
///
/// Returns an error if the value is too large to send or the write fails.
pub async fn write_frame<W>(writer: &mut W, value: &Value) -> Result<(), SummaryError>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value)?;
    if body.len() > MAX_FRAME_BYTES {
        return Err(SummaryError::MalformedRequest(format!(
            "outbound frame of {} bytes exceeds limit of {MAX_FRAME_BYTES}",
            body.len()
        )));
    }

    let len = u32::try_from(body.len())
        .map_err(|e| SummaryError::MalformedRequest(format!("frame length: {e}")))?;
    writer.write_all(&len.to_ne_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}
