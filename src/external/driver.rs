use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::SummaryError;

/// Handle to an auxiliary automation surface, e.g. a background tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub String);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the driver sees on the service page right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageProbe {
    /// The prompt input element is present.
    pub input_ready: bool,
    /// The page is a sign-in wall rather than the chat UI.
    pub login_wall: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmitOutcome {
    Sent,
    ButtonDisabled,
    ButtonMissing,
}

/// DOM-level primitives for driving the service UI. The polling, validation and
/// timeout policy live in [`super::ExternalSummaryClient`], not here.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    async fn open_surface(&self, url: &str) -> Result<SurfaceId, SummaryError>;

    async fn probe(&self, surface: &SurfaceId) -> Result<PageProbe, SummaryError>;

    /// Types `prompt` into the input and presses send.
    async fn submit(&self, surface: &SurfaceId, prompt: &str)
    -> Result<SubmitOutcome, SummaryError>;

    /// Text of the newest assistant message, if any is rendered yet.
    async fn latest_response(&self, surface: &SurfaceId) -> Result<Option<String>, SummaryError>;

    async fn close_surface(&self, surface: &SurfaceId) -> Result<(), SummaryError>;
}
