use reqwest::Client;
use std::time::Duration;
use tracing::{error, info};

use crate::errors::SummaryError;

/// Best-effort check of whether the browser session is signed in to the service.
pub struct LoginProbe {
    http: Client,
    service_url: String,
}

impl LoginProbe {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(service_url: impl Into<String>) -> Result<Self, SummaryError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| SummaryError::Http(format!("Failed to build login probe client: {e}")))?;

        Ok(Self {
            http,
            service_url: service_url.into(),
        })
    }

    /// Fetches the service home page and inspects it for sign-in markers.
    /// Network failures count as signed in so the probe never blocks a real attempt.
    pub async fn check(&self) -> bool {
        let page = match self.fetch_home().await {
            Ok(page) => page,
            Err(e) => {
                error!("[ChatGPT] Error checking login: {}", e);
                return true;
            }
        };

        let logged_in = page_looks_logged_in(&page);
        info!("[ChatGPT] Login detection: logged_in={}", logged_in);
        logged_in
    }

    async fn fetch_home(&self) -> Result<String, SummaryError> {
        let response = self.http.get(&self.service_url).send().await?;
        Ok(response.text().await?)
    }
}

/// Anything short of a clear sign-in prompt counts as logged in.
#[must_use]
pub fn page_looks_logged_in(page: &str) -> bool {
    let has_user_data = page.contains("\"user\":{");
    let has_auth_attribute = page.contains("data-authenticated=\"true\"");
    let has_logout_button = page.contains("Log out");
    let has_login_button = page.contains("Log in") || page.contains("Sign up");

    has_user_data || has_auth_attribute || has_logout_button || !has_login_button
}
