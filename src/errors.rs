use serde::Serialize;
use thiserror::Error;

/// Message surfaced when the external service reports a signed-out session.
pub const NOT_AUTHENTICATED_MESSAGE: &str =
    "Not logged into ChatGPT. Please visit chatgpt.com and log in.";

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Failed to extract page content: {0}")]
    ExtractionFailed(String),

    #[error("Cannot analyze system pages or special URLs: {0}")]
    UnsupportedLocator(String),

    #[error("{0}")]
    NotAuthenticated(String),

    #[error("ChatGPT UI not automatable: {0}")]
    AutomationUiMismatch(String),

    #[error("ChatGPT request timeout: {0}")]
    ResponseTimeout(String),

    #[error("ChatGPT response failed validation: {0}")]
    LowQualityResponse(String),

    #[error("Tab was closed during processing: {0}")]
    SubjectGone(String),

    #[error("Automation driver failure: {0}")]
    Driver(String),

    #[error("Queued work was abandoned before it settled")]
    WorkAbandoned,

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Failed to access storage: {0}")]
    Storage(String),

    #[error("Failed to send HTTP request: {0}")]
    Http(String),
}

/// Structured error kind shared with the UI so it never has to inspect message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    ExtractionFailed,
    UnsupportedLocator,
    NotAuthenticated,
    AutomationUiMismatch,
    ResponseTimeout,
    LowQualityResponse,
    SubjectGone,
    Driver,
    WorkAbandoned,
    MalformedRequest,
    Storage,
    Http,
}

impl SummaryError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SummaryError::ExtractionFailed(_) => ErrorKind::ExtractionFailed,
            SummaryError::UnsupportedLocator(_) => ErrorKind::UnsupportedLocator,
            SummaryError::NotAuthenticated(_) => ErrorKind::NotAuthenticated,
            SummaryError::AutomationUiMismatch(_) => ErrorKind::AutomationUiMismatch,
            SummaryError::ResponseTimeout(_) => ErrorKind::ResponseTimeout,
            SummaryError::LowQualityResponse(_) => ErrorKind::LowQualityResponse,
            SummaryError::SubjectGone(_) => ErrorKind::SubjectGone,
            SummaryError::Driver(_) => ErrorKind::Driver,
            SummaryError::WorkAbandoned => ErrorKind::WorkAbandoned,
            SummaryError::MalformedRequest(_) => ErrorKind::MalformedRequest,
            SummaryError::Storage(_) => ErrorKind::Storage,
            SummaryError::Http(_) => ErrorKind::Http,
        }
    }

    /// Failures of the external collaborator. These are absorbed into a cached
    /// fallback summary instead of surfacing to the caller.
    #[must_use]
    pub fn is_external_failure(&self) -> bool {
        matches!(
            self,
            SummaryError::NotAuthenticated(_)
                | SummaryError::AutomationUiMismatch(_)
                | SummaryError::ResponseTimeout(_)
                | SummaryError::LowQualityResponse(_)
                | SummaryError::Driver(_)
                | SummaryError::Http(_)
        )
    }
}

impl From<reqwest::Error> for SummaryError {
    fn from(error: reqwest::Error) -> Self {
        SummaryError::Http(error.to_string())
    }
}

impl From<serde_json::Error> for SummaryError {
    fn from(error: serde_json::Error) -> Self {
        SummaryError::MalformedRequest(error.to_string())
    }
}

impl From<std::io::Error> for SummaryError {
    fn from(error: std::io::Error) -> Self {
        SummaryError::Driver(error.to_string())
    }
}
