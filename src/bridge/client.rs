//! Collaborator calls routed to the extension over the native-messaging port.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use super::codec::Envelope;
use crate::core::{Tab, TabId};
use crate::errors::SummaryError;
use crate::external::{AutomationDriver, PageProbe, SubmitOutcome, SurfaceId};
use crate::store::KeyValueStore;
use crate::tabs::{ContentExtractor, TabRegistry};

/// Default bound on a single call to the extension.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(30);

type ReplySender = oneshot::Sender<Result<Value, String>>;

pub struct BridgeClient {
    outbound: mpsc::UnboundedSender<Envelope>,
    pending: Mutex<HashMap<String, ReplySender>>,
    call_timeout: Duration,
}

impl BridgeClient {
    #[must_use]
    pub fn new(outbound: mpsc::UnboundedSender<Envelope>, call_timeout: Duration) -> Self {
        Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            call_timeout,
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, ReplySender>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue an envelope for the writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the port has shut down.
    pub fn send(&self, envelope: Envelope) -> Result<(), SummaryError> {
        self.outbound
            .send(envelope)
            .map_err(|_| SummaryError::Driver("native messaging port closed".to_string()))
    }

    /// Invoke `method` in the extension and wait for its reply.
    ///
    /// # Errors
    ///
    /// Returns `Driver` if the port is closed, the extension reports an error,
    /// or no reply arrives within the call timeout.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, SummaryError> {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending().insert(id.clone(), tx);

        debug!("[Bridge] call {} id={}", method, id);
        if let Err(e) = self.send(Envelope::Call {
            id: id.clone(),
            method: method.to_string(),
            params,
        }) {
            self.pending().remove(&id);
            return Err(e);
        }

        match timeout(self.call_timeout, rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(message))) => Err(SummaryError::Driver(format!("{method}: {message}"))),
            Ok(Err(_)) => Err(SummaryError::Driver(format!(
                "{method}: port closed before reply"
            ))),
            Err(_) => {
                self.pending().remove(&id);
                Err(SummaryError::Driver(format!(
                    "{method}: no reply within {}s",
                    self.call_timeout.as_secs()
                )))
            }
        }
    }

    /// Route a reply from the extension to whoever is waiting on it.
    pub fn resolve(&self, id: &str, result: Result<Value, String>) {
        match self.pending().remove(id) {
            Some(tx) => {
                if tx.send(result).is_err() {
                    debug!("[Bridge] Caller for {} gave up before the reply", id);
                }
            }
            None => warn!("[Bridge] Reply for unknown call id {}", id),
        }
    }

    /// Drop every outstanding call; their callers see a closed-port error.
    pub fn fail_all(&self) {
        let mut pending = self.pending();
        if !pending.is_empty() {
            warn!("[Bridge] Abandoning {} outstanding calls", pending.len());
        }
        pending.clear();
    }

    async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, SummaryError> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| SummaryError::Driver(format!("{method}: unexpected reply shape: {e}")))
    }
}

#[async_trait]
impl TabRegistry for BridgeClient {
    async fn get(&self, tab_id: TabId) -> Result<Option<Tab>, SummaryError> {
        self.call_as("tabs.get", json!({ "tabId": tab_id })).await
    }

    async fn list(&self) -> Result<Vec<Tab>, SummaryError> {
        self.call_as("tabs.list", json!({})).await
    }
}

#[async_trait]
impl ContentExtractor for BridgeClient {
    async fn extract(&self, tab_id: TabId, url: &str) -> Result<Option<String>, SummaryError> {
        self.call_as("content.extract", json!({ "tabId": tab_id, "url": url }))
            .await
    }
}

#[async_trait]
impl AutomationDriver for BridgeClient {
    async fn open_surface(&self, url: &str) -> Result<SurfaceId, SummaryError> {
        self.call_as("automation.open", json!({ "url": url })).await
    }

    async fn probe(&self, surface: &SurfaceId) -> Result<PageProbe, SummaryError> {
        self.call_as("automation.probe", json!({ "surfaceId": surface }))
            .await
    }

    async fn submit(
        &self,
        surface: &SurfaceId,
        prompt: &str,
    ) -> Result<SubmitOutcome, SummaryError> {
        self.call_as(
            "automation.submit",
            json!({ "surfaceId": surface, "prompt": prompt }),
        )
        .await
    }

    async fn latest_response(&self, surface: &SurfaceId) -> Result<Option<String>, SummaryError> {
        self.call_as("automation.latestResponse", json!({ "surfaceId": surface }))
            .await
    }

    async fn close_surface(&self, surface: &SurfaceId) -> Result<(), SummaryError> {
        self.call("automation.close", json!({ "surfaceId": surface }))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl KeyValueStore for BridgeClient {
    async fn get(&self, key: &str) -> Result<Option<Value>, SummaryError> {
        self.call_as("storage.get", json!({ "key": key }))
            .await
            .map_err(|e| SummaryError::Storage(e.to_string()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), SummaryError> {
        self.call("storage.set", json!({ "key": key, "value": value }))
            .await
            .map(|_| ())
            .map_err(|e| SummaryError::Storage(e.to_string()))
    }
}
