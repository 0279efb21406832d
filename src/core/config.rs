use std::env;
use std::time::Duration;

/// Upper bound on automated sessions running against the external service at once.
pub const MAX_CONCURRENT: usize = 2;

/// Budget for one external summary: page load, UI readiness, response polling and margin.
pub const SUMMARY_TIMEOUT: Duration = Duration::from_secs(50);

/// Wall-clock safety net on a whole `getSummary` request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Content longer than this many characters is truncated before it is sent out.
pub const MAX_CONTENT_CHARS: usize = 4000;

pub const DEFAULT_SERVICE_URL: &str = "https://chatgpt.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub service_url: String,
    pub max_concurrent: usize,
    pub summary_timeout: Duration,
    pub request_timeout: Duration,
    pub max_content_chars: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            max_concurrent: MAX_CONCURRENT,
            summary_timeout: SUMMARY_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            max_content_chars: MAX_CONTENT_CHARS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let max_concurrent = parse_var("TABINATOR_MAX_CONCURRENT", defaults.max_concurrent)?;
        if max_concurrent == 0 {
            return Err("TABINATOR_MAX_CONCURRENT: must be at least 1".to_string());
        }

        Ok(Self {
            service_url: env::var("TABINATOR_SERVICE_URL").unwrap_or(defaults.service_url),
            max_concurrent,
            summary_timeout: Duration::from_secs(parse_var(
                "TABINATOR_SUMMARY_TIMEOUT_SECS",
                defaults.summary_timeout.as_secs(),
            )?),
            request_timeout: Duration::from_secs(parse_var(
                "TABINATOR_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            max_content_chars: parse_var(
                "TABINATOR_MAX_CONTENT_CHARS",
                defaults.max_content_chars,
            )?,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("{}: {}", name, e)),
        Err(_) => Ok(default),
    }
}
