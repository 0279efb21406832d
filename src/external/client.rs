//! External summary client
//!
//! Drives one automated session against the conversational web UI: open a
//! background surface, wait for the prompt input, submit, poll for a reply that
//! looks like prose. The whole session is bounded by a single deadline and the
//! surface is always closed afterwards.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info, warn};

use super::driver::{AutomationDriver, PageProbe, SubmitOutcome, SurfaceId};
use super::poll::{PollError, PollPolicy, poll_until};
use crate::core::config::{DEFAULT_SERVICE_URL, SUMMARY_TIMEOUT};
use crate::errors::{NOT_AUTHENTICATED_MESSAGE, SummaryError};
use crate::prompt::build_prompt;

const MIN_RESPONSE_CHARS: usize = 20;
const ERROR_TEXT_TOLERANCE_CHARS: usize = 100;
const STYLING_ARTIFACTS: [&str; 2] = ["font-family", ".progress-"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTimings {
    /// Overall budget for one summary, surface creation included.
    pub timeout: Duration,
    /// Wait after opening the surface before looking for the input.
    pub settle_delay: Duration,
    pub readiness: PollPolicy,
    pub response: PollPolicy,
}

impl Default for ClientTimings {
    fn default() -> Self {
        Self {
            timeout: SUMMARY_TIMEOUT,
            settle_delay: Duration::from_secs(5),
            readiness: PollPolicy::new(5, Duration::from_secs(1)),
            response: PollPolicy::new(10, Duration::from_secs(3)),
        }
    }
}

pub struct ExternalSummaryClient {
    driver: Arc<dyn AutomationDriver>,
    service_url: String,
    timings: ClientTimings,
}

impl ExternalSummaryClient {
    #[must_use]
    pub fn new(driver: Arc<dyn AutomationDriver>) -> Self {
        Self::with_timings(driver, DEFAULT_SERVICE_URL, ClientTimings::default())
    }

    #[must_use]
    pub fn with_timings(
        driver: Arc<dyn AutomationDriver>,
        service_url: impl Into<String>,
        timings: ClientTimings,
    ) -> Self {
        Self {
            driver,
            service_url: service_url.into(),
            timings,
        }
    }

    #[must_use]
    pub fn timings(&self) -> &ClientTimings {
        &self.timings
    }

    /// Summarize `content` with the configured prompt.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when the service shows a sign-in wall,
    /// `AutomationUiMismatch` when the input or send button never shows up,
    /// `LowQualityResponse` when only non-prose replies were seen,
    /// `ResponseTimeout` when nothing usable arrived before the deadline,
    /// and `Driver` for collaborator transport failures.
    pub async fn summarize(
        &self,
        content: &str,
        custom_prompt: Option<&str>,
    ) -> Result<String, SummaryError> {
        let deadline = Instant::now() + self.timings.timeout;
        let prompt = build_prompt(content, custom_prompt);
        info!(
            "[ChatGPT] Starting summary session, prompt length {} chars",
            prompt.chars().count()
        );

        // Page content is private; only print it when explicitly asked for
        #[cfg(feature = "debug-logs")]
        debug!("[ChatGPT] Prompt:\n{:?}", prompt);

        #[cfg(not(feature = "debug-logs"))]
        debug!("[ChatGPT] Prompt: [... content masked, enable debug-logs feature to view ...]");

        let mut session: Option<SurfaceGuard> = None;
        let outcome = timeout_at(deadline, self.run_session(&prompt, deadline, &mut session)).await;

        match outcome {
            Ok(result) => {
                if let Some(guard) = session.take() {
                    if timeout_at(deadline, guard.close()).await.is_err() {
                        warn!("[ChatGPT] Surface close did not finish before the deadline");
                    }
                }
                result
            }
            Err(_) => {
                // Past the deadline the close runs detached from the guard's Drop
                drop(session.take());
                warn!(
                    "[ChatGPT] Request timed out after {}s",
                    self.timings.timeout.as_secs()
                );
                Err(SummaryError::ResponseTimeout(format!(
                    "no result within {} seconds",
                    self.timings.timeout.as_secs()
                )))
            }
        }
    }

    async fn run_session(
        &self,
        prompt: &str,
        deadline: Instant,
        session: &mut Option<SurfaceGuard>,
    ) -> Result<String, SummaryError> {
        let surface = self.driver.open_surface(&self.service_url).await?;
        debug!("[ChatGPT] Opened surface {}", surface);
        *session = Some(SurfaceGuard::new(Arc::clone(&self.driver), surface.clone()));

        sleep(self.timings.settle_delay).await;

        let probe = self.wait_for_input(&surface, deadline).await?;
        if probe.login_wall {
            return Err(SummaryError::NotAuthenticated(
                NOT_AUTHENTICATED_MESSAGE.to_string(),
            ));
        }

        match self.driver.submit(&surface, prompt).await? {
            SubmitOutcome::Sent => {}
            SubmitOutcome::ButtonDisabled => {
                return Err(SummaryError::AutomationUiMismatch(
                    "Submit button is disabled. ChatGPT may be rate limiting.".to_string(),
                ));
            }
            SubmitOutcome::ButtonMissing => {
                return Err(SummaryError::AutomationUiMismatch(
                    "Submit button not found. ChatGPT UI may have changed.".to_string(),
                ));
            }
        }

        info!("[ChatGPT] Prompt submitted, waiting for response");
        self.wait_for_response(&surface, deadline).await
    }

    async fn wait_for_input(
        &self,
        surface: &SurfaceId,
        deadline: Instant,
    ) -> Result<PageProbe, SummaryError> {
        let driver = &*self.driver;
        let result = poll_until(self.timings.readiness, deadline, || async move {
            let probe = driver.probe(surface).await?;
            debug!(
                "[ChatGPT] Probe: input_ready={}, login_wall={}",
                probe.input_ready, probe.login_wall
            );
            Ok::<_, SummaryError>((probe.input_ready || probe.login_wall).then_some(probe))
        })
        .await;

        match result {
            Ok(probe) => Ok(probe),
            Err(PollError::Exhausted) => Err(SummaryError::AutomationUiMismatch(
                "ChatGPT textarea not found after waiting. Try refreshing ChatGPT or check your internet connection."
                    .to_string(),
            )),
            Err(PollError::DeadlineExceeded) => Err(SummaryError::ResponseTimeout(
                "deadline passed while waiting for the ChatGPT input".to_string(),
            )),
            Err(PollError::Failed(e)) => Err(e),
        }
    }

    async fn wait_for_response(
        &self,
        surface: &SurfaceId,
        deadline: Instant,
    ) -> Result<String, SummaryError> {
        let driver = &*self.driver;
        let rejected: Mutex<Option<String>> = Mutex::new(None);
        let rejected_ref = &rejected;

        let result = poll_until(self.timings.response, deadline, || async move {
            let Some(text) = driver.latest_response(surface).await? else {
                return Ok(None);
            };
            match validate_response(&text) {
                Ok(valid) => Ok(Some(valid)),
                Err(reason) => {
                    debug!("[ChatGPT] Rejected response text: {}", reason);
                    *rejected_ref.lock().unwrap_or_else(PoisonError::into_inner) =
                        Some(reason.to_string());
                    Ok::<_, SummaryError>(None)
                }
            }
        })
        .await;

        let budget = self.timings.response.budget().as_secs();
        match result {
            Ok(text) => {
                info!("[ChatGPT] Valid response received, {} chars", text.chars().count());
                Ok(text)
            }
            Err(PollError::Exhausted) => {
                match rejected.into_inner().unwrap_or_else(PoisonError::into_inner) {
                    Some(reason) => Err(SummaryError::LowQualityResponse(reason)),
                    None => Err(SummaryError::ResponseTimeout(format!(
                        "No response received after {budget} seconds. ChatGPT may be slow or rate limiting."
                    ))),
                }
            }
            Err(PollError::DeadlineExceeded) => Err(SummaryError::ResponseTimeout(
                "deadline passed while waiting for the ChatGPT response".to_string(),
            )),
            Err(PollError::Failed(e)) => Err(e),
        }
    }
}

/// Checks that scraped response text reads like prose rather than an error
/// banner or leaked stylesheet. Returns the trimmed text.
///
/// # Errors
///
/// Returns a short reason when the text is rejected.
pub fn validate_response(text: &str) -> Result<String, &'static str> {
    let trimmed = text.trim();
    let length = trimmed.chars().count();

    if length <= MIN_RESPONSE_CHARS {
        return Err("response too short");
    }
    if STYLING_ARTIFACTS.iter().any(|marker| trimmed.contains(marker)) {
        return Err("response looks like styling markup");
    }
    if trimmed.contains("Error:") && length <= ERROR_TEXT_TOLERANCE_CHARS {
        return Err("response looks like an error message");
    }

    Ok(trimmed.to_string())
}

/// Owns an open surface. `close` releases it on the normal path; if the session
/// future is dropped first, `Drop` hands the close off to the runtime.
struct SurfaceGuard {
    driver: Arc<dyn AutomationDriver>,
    surface: Option<SurfaceId>,
}

impl SurfaceGuard {
    fn new(driver: Arc<dyn AutomationDriver>, surface: SurfaceId) -> Self {
        Self {
            driver,
            surface: Some(surface),
        }
    }

    async fn close(mut self) {
        if let Some(surface) = self.surface.take() {
            close_logged(&*self.driver, &surface).await;
        }
    }
}

impl Drop for SurfaceGuard {
    fn drop(&mut self) {
        let Some(surface) = self.surface.take() else {
            return;
        };
        let driver = Arc::clone(&self.driver);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    close_logged(&*driver, &surface).await;
                });
            }
            Err(_) => warn!("[ChatGPT] Surface {} leaked: no runtime to close it", surface),
        }
    }
}

async fn close_logged(driver: &dyn AutomationDriver, surface: &SurfaceId) {
    match driver.close_surface(surface).await {
        Ok(()) => debug!("[ChatGPT] Closed surface {}", surface),
        Err(e) => warn!("[ChatGPT] Failed to close surface {}: {}", surface, e),
    }
}
