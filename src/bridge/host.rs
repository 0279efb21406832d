use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::client::BridgeClient;
use super::codec::{Envelope, read_frame, write_frame};
use crate::errors::SummaryError;
use crate::transport::TransportAdapter;

/// Native-messaging host: reads envelopes from the extension, answers requests
/// through the transport adapter, and carries collaborator calls the other way.
pub struct NativeHost {
    client: Arc<BridgeClient>,
    outbound: mpsc::UnboundedReceiver<Envelope>,
}

impl NativeHost {
    #[must_use]
    pub fn new(call_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client: Arc::new(BridgeClient::new(tx, call_timeout)),
            outbound: rx,
        }
    }

    /// The collaborator client; wire it into the pipeline before calling `serve`.
    #[must_use]
    pub fn client(&self) -> Arc<BridgeClient> {
        Arc::clone(&self.client)
    }

    /// Serve until the extension closes its end of the port.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the port fails.
    pub async fn serve<R, W>(
        self,
        adapter: Arc<TransportAdapter>,
        mut reader: R,
        writer: W,
    ) -> Result<(), SummaryError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let NativeHost {
            client,
            mut outbound,
        } = self;

        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(envelope) = outbound.recv().await {
                let value = match serde_json::to_value(&envelope) {
                    Ok(value) => value,
                    Err(e) => {
                        error!("[Bridge] Failed to encode envelope: {}", e);
                        continue;
                    }
                };
                if let Err(e) = write_frame(&mut writer, &value).await {
                    error!("[Bridge] Failed to write frame: {}", e);
                    break;
                }
            }
        });

        info!("[Bridge] Native host ready");
        let result = loop {
            let frame = match read_frame(&mut reader).await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("[Bridge] Extension closed the port");
                    break Ok(());
                }
                Err(SummaryError::MalformedRequest(msg)) => {
                    warn!("[Bridge] Dropping malformed frame: {}", msg);
                    continue;
                }
                Err(e) => break Err(e),
            };
            route_frame(frame, &client, &adapter);
        };

        client.fail_all();
        writer_task.abort();
        result
    }
}

fn route_frame(frame: Value, client: &Arc<BridgeClient>, adapter: &Arc<TransportAdapter>) {
    let envelope: Envelope = match serde_json::from_value(frame) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("[Bridge] Ignoring unrecognized message: {}", e);
            return;
        }
    };

    match envelope {
        Envelope::Request { id, body } => {
            let client = Arc::clone(client);
            let adapter = Arc::clone(adapter);
            tokio::spawn(async move {
                let body = adapter.handle(body).await;
                if let Err(e) = client.send(Envelope::Response { id, body }) {
                    warn!("[Bridge] Could not deliver response: {}", e);
                }
            });
        }
        Envelope::Reply { id, result, error } => {
            let outcome = match error {
                Some(message) => Err(message),
                None => Ok(result.unwrap_or(Value::Null)),
            };
            client.resolve(&id, outcome);
        }
        Envelope::Response { .. } | Envelope::Call { .. } => {
            debug!("[Bridge] Ignoring host-bound message type from extension");
        }
    }
}
