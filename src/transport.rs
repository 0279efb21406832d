//! UI-facing request handling: translates extension messages into pipeline calls
//! and maps results and errors back into JSON responses.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::core::config::REQUEST_TIMEOUT;
use crate::core::{ReportSnapshot, SummaryOrigin, TabId};
use crate::errors::{ErrorKind, SummaryError};
use crate::external::LoginProbe;
use crate::pipeline::{ProgressObserver, SummaryPipeline};
use crate::store::{KeyValueStore, load_settings, save_report};

/// Shown when a request outlives the safety-net timeout.
pub const FETCH_FAILED_MESSAGE: &str = "Error fetching summary.";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    GetSummary {
        #[serde(rename = "tabId", default)]
        tab_id: Option<TabId>,
    },
    ReloadSettings,
    Refresh,
    GenerateReport,
    CheckLogin,
}

impl Request {
    /// # Errors
    ///
    /// Returns `MalformedRequest` for unknown actions or ill-typed fields.
    pub fn from_value(value: Value) -> Result<Self, SummaryError> {
        serde_json::from_value(value).map_err(|e| SummaryError::MalformedRequest(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Summary {
        summary: String,
        /// Set when the summary is a local fallback; names why the service failed.
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<ErrorKind>,
    },
    Success {
        success: bool,
    },
    Report {
        report: ReportSnapshot,
    },
    Login {
        #[serde(rename = "loggedIn")]
        logged_in: bool,
    },
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        kind: Option<ErrorKind>,
    },
}

impl Response {
    fn from_error(error: &SummaryError) -> Self {
        Response::Error {
            error: error.to_string(),
            kind: Some(error.kind()),
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            json!({ "error": format!("Failed to encode response: {e}") })
        })
    }
}

pub struct TransportAdapter {
    pipeline: Arc<SummaryPipeline>,
    store: Arc<dyn KeyValueStore>,
    login: Option<LoginProbe>,
    request_timeout: Duration,
}

impl TransportAdapter {
    #[must_use]
    pub fn new(pipeline: Arc<SummaryPipeline>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            pipeline,
            store,
            login: None,
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_login_probe(mut self, login: LoginProbe) -> Self {
        self.login = Some(login);
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    #[must_use]
    pub fn pipeline(&self) -> &Arc<SummaryPipeline> {
        &self.pipeline
    }

    /// Handle one raw message from the extension.
    #[tracing::instrument(level = "info", skip(self, raw))]
    pub async fn handle(&self, raw: Value) -> Value {
        let response = match Request::from_value(raw) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                warn!("Rejecting request: {}", e);
                Response::from_error(&e)
            }
        };
        response.to_value()
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        match request {
            Request::GetSummary { tab_id: Some(tab_id) } => self.get_summary(tab_id).await,
            Request::GetSummary { tab_id: None } => Response::from_error(
                &SummaryError::MalformedRequest("getSummary requires a tabId".to_string()),
            ),
            Request::ReloadSettings => self.reload_settings().await,
            Request::Refresh => {
                self.pipeline.refresh();
                Response::Success { success: true }
            }
            Request::GenerateReport => self.generate_report().await,
            Request::CheckLogin => {
                let logged_in = match &self.login {
                    Some(probe) => probe.check().await,
                    None => true,
                };
                Response::Login { logged_in }
            }
        }
    }

    async fn get_summary(&self, tab_id: TabId) -> Response {
        info!("[Message] getSummary for tab {}", tab_id);
        let progress = |tab_id: TabId, percent: u8| {
            debug!("[Progress] Tab {}: {}%", tab_id, percent);
        };
        let observer: &dyn ProgressObserver = &progress;

        match timeout(
            self.request_timeout,
            self.pipeline.summarize_tab(tab_id, Some(observer)),
        )
        .await
        {
            Ok(Ok(summary)) => {
                info!("[Message] Summary ready for tab {}", tab_id);
                let warning = match summary.origin {
                    SummaryOrigin::Fallback(kind) => Some(kind),
                    _ => None,
                };
                Response::Summary {
                    summary: summary.text,
                    warning,
                }
            }
            Ok(Err(e)) => {
                error!("[Message] Error getting summary for tab {}: {}", tab_id, e);
                Response::from_error(&e)
            }
            Err(_) => {
                error!(
                    "[Message] Summary for tab {} exceeded {}s",
                    tab_id,
                    self.request_timeout.as_secs()
                );
                Response::Error {
                    error: FETCH_FAILED_MESSAGE.to_string(),
                    kind: Some(ErrorKind::ResponseTimeout),
                }
            }
        }
    }

    async fn reload_settings(&self) -> Response {
        match load_settings(self.store.as_ref()).await {
            Ok(settings) => {
                info!(
                    "[Settings] Loaded: custom prompt set={}",
                    !settings.custom_prompt.is_empty()
                );
                self.pipeline.apply_settings(settings);
                Response::Success { success: true }
            }
            Err(e) => {
                error!("[Settings] Failed to load: {}", e);
                Response::from_error(&e)
            }
        }
    }

    async fn generate_report(&self) -> Response {
        let report = match self.pipeline.generate_report().await {
            Ok(report) => report,
            Err(e) => {
                error!("An error occurred while generating the report: {}", e);
                return Response::from_error(&e);
            }
        };

        if let Err(e) = save_report(self.store.as_ref(), &report).await {
            // The report is still useful to the caller even if it wasn't persisted
            warn!("Failed to persist report snapshot: {}", e);
        }

        Response::Report { report }
    }
}
