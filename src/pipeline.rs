//! Per-tab summarization pipeline
//!
//! cache check -> content extraction -> queued external summary -> fallback.
//! Every resolvable tab ends with some cached summary; only a vanished tab or
//! abandoned work surfaces as an error.

use chrono::Utc;
use futures::future::join_all;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{error, info, warn};

use crate::cache::SummaryCache;
use crate::core::{ReportSnapshot, Settings, Summary, SummaryOrigin, Tab, TabId, TabReport};
use crate::core::config::MAX_CONTENT_CHARS;
use crate::errors::SummaryError;
use crate::external::ExternalSummaryClient;
use crate::fallback::{NO_CONTENT_MESSAGE, fallback_summary};
use crate::queue::RequestQueue;
use crate::tabs::{CANNOT_ANALYZE_MESSAGE, ContentExtractor, TabRegistry, is_unsupported_locator};

pub const TRUNCATION_MARKER: &str = "... [content truncated]";

/// Prefix on summaries produced locally because the external service failed.
pub const UNAVAILABLE_WARNING: &str = "⚠ ChatGPT unavailable. Please log into chatgpt.com first.";

/// Summary text recorded in reports for tabs that could not be processed.
pub const REPORT_ERROR_SUMMARY: &str = "Error";

/// Progress milestones, in percent.
pub const PROGRESS_CONTENT_CHECKED: u8 = 10;
pub const PROGRESS_CONTENT_TRUNCATED: u8 = 20;
pub const PROGRESS_DONE: u8 = 100;

/// Observer for progress milestones. Purely informational.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, tab_id: TabId, percent: u8);
}

impl<F> ProgressObserver for F
where
    F: Fn(TabId, u8) + Send + Sync,
{
    fn on_progress(&self, tab_id: TabId, percent: u8) {
        self(tab_id, percent);
    }
}

/// Keep at most `max_chars` characters, marking the cut.
#[must_use]
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &content[..cut], TRUNCATION_MARKER),
        None => content.to_string(),
    }
}

/// Text cached when the external service could not produce a summary.
#[must_use]
pub fn unavailable_summary(content: &str) -> String {
    format!(
        "{}\n\nQuick summary: {}",
        UNAVAILABLE_WARNING,
        fallback_summary(content)
    )
}

pub struct SummaryPipeline {
    tabs: Arc<dyn TabRegistry>,
    extractor: Arc<dyn ContentExtractor>,
    client: Arc<ExternalSummaryClient>,
    queue: RequestQueue,
    cache: SummaryCache,
    settings: RwLock<Settings>,
    max_content_chars: usize,
}

impl SummaryPipeline {
    #[must_use]
    pub fn new(
        tabs: Arc<dyn TabRegistry>,
        extractor: Arc<dyn ContentExtractor>,
        client: Arc<ExternalSummaryClient>,
        queue: RequestQueue,
    ) -> Self {
        Self {
            tabs,
            extractor,
            client,
            queue,
            cache: SummaryCache::new(),
            settings: RwLock::new(Settings::default()),
            max_content_chars: MAX_CONTENT_CHARS,
        }
    }

    #[must_use]
    pub fn with_max_content_chars(mut self, max_content_chars: usize) -> Self {
        self.max_content_chars = max_content_chars;
        self
    }

    #[must_use]
    pub fn cache(&self) -> &SummaryCache {
        &self.cache
    }

    #[must_use]
    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the settings. Cached summaries were produced with the old prompt,
    /// so the cache is cleared; in-flight requests keep the prompt they started with.
    pub fn apply_settings(&self, settings: Settings) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
        self.cache.clear();
    }

    /// Explicit user refresh.
    pub fn refresh(&self) {
        info!("Refreshing: clearing all cached summaries");
        self.cache.clear();
    }

    /// Produce the summary for one tab.
    ///
    /// # Errors
    ///
    /// `SubjectGone` if the tab no longer exists (before or after queueing),
    /// `WorkAbandoned` if the queued work died without settling, or a registry
    /// error if the tab lookup itself fails. External service failures are not
    /// errors here; they yield a cached fallback summary.
    #[tracing::instrument(level = "info", skip(self, progress))]
    pub async fn summarize_tab(
        &self,
        tab_id: TabId,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<Summary, SummaryError> {
        let report = |percent: u8| {
            if let Some(observer) = progress {
                observer.on_progress(tab_id, percent);
            }
        };

        if let Some(cached) = self.cache.get(tab_id) {
            info!("Cache hit for tab {}", tab_id);
            report(PROGRESS_DONE);
            return Ok(cached);
        }

        let tab = self
            .tabs
            .get(tab_id)
            .await?
            .ok_or_else(|| SummaryError::SubjectGone(format!("tab {tab_id}")))?;

        let text = match self.extract(&tab).await {
            Ok(text) => text,
            Err(SummaryError::UnsupportedLocator(url)) => {
                info!("Skipping special URL for tab {}: {}", tab_id, url);
                return Ok(self.finish(
                    tab_id,
                    Summary::new(CANNOT_ANALYZE_MESSAGE, SummaryOrigin::Unsupported),
                    report,
                ));
            }
            Err(e) => {
                warn!("Skipping tab {}: {}", tab_id, e);
                return Ok(self.finish(
                    tab_id,
                    Summary::new(NO_CONTENT_MESSAGE, SummaryOrigin::NoContent),
                    report,
                ));
            }
        };

        info!("Content length: {} characters for tab {}", text.chars().count(), tab_id);
        report(PROGRESS_CONTENT_CHECKED);

        let truncated = truncate_content(&text, self.max_content_chars);
        report(PROGRESS_CONTENT_TRUNCATED);

        let custom_prompt = self.settings().custom_prompt;
        let client = Arc::clone(&self.client);
        let tabs = Arc::clone(&self.tabs);
        let pending = self.queue.enqueue(tab_id, move || async move {
            if tabs.get(tab_id).await?.is_none() {
                return Err(SummaryError::SubjectGone(format!(
                    "tab {tab_id} closed while queued"
                )));
            }
            client.summarize(&truncated, Some(custom_prompt.as_str())).await
        });

        let summary = match pending.await {
            Ok(external) => {
                info!("Got external summary for tab {}", tab_id);
                Summary::new(external, SummaryOrigin::External)
            }
            Err(e) if e.is_external_failure() => {
                warn!("External summary failed for tab {}: {}", tab_id, e);
                Summary::new(unavailable_summary(&text), SummaryOrigin::Fallback(e.kind()))
            }
            Err(e) => {
                error!("Summary request for tab {} failed: {}", tab_id, e);
                return Err(e);
            }
        };

        Ok(self.finish(tab_id, summary, report))
    }

    /// Summarize every open tab through the queue and assemble a report.
    /// Tabs that fail outright are listed with an error summary.
    ///
    /// # Errors
    ///
    /// Returns an error only if the tab list cannot be fetched.
    pub async fn generate_report(&self) -> Result<ReportSnapshot, SummaryError> {
        let tabs = self.tabs.list().await?;
        info!("Generating report for {} tabs", tabs.len());

        let results = join_all(tabs.iter().map(|tab| self.summarize_tab(tab.id, None))).await;

        let reports = tabs
            .into_iter()
            .zip(results)
            .map(|(tab, result)| {
                let summary = match result {
                    Ok(summary) => summary.text,
                    Err(e) => {
                        error!("Error processing tab {} for report: {}", tab.id, e);
                        REPORT_ERROR_SUMMARY.to_string()
                    }
                };
                TabReport {
                    id: tab.id,
                    url: tab.url,
                    title: tab.title,
                    fav_icon_url: tab.fav_icon_url,
                    summary,
                }
            })
            .collect();

        Ok(ReportSnapshot {
            generated_at: Utc::now(),
            tabs: reports,
        })
    }

    /// Page text for `tab`. `UnsupportedLocator` for pages that are never inspected,
    /// `ExtractionFailed` when the extractor fails or finds nothing.
    async fn extract(&self, tab: &Tab) -> Result<String, SummaryError> {
        if is_unsupported_locator(&tab.url) {
            return Err(SummaryError::UnsupportedLocator(tab.url.clone()));
        }

        match self.extractor.extract(tab.id, &tab.url).await {
            Ok(Some(text)) if !text.trim().is_empty() => Ok(text),
            Ok(Some(_)) => Err(SummaryError::ExtractionFailed("page has no text".to_string())),
            Ok(None) => Err(SummaryError::ExtractionFailed(
                "no content extracted".to_string(),
            )),
            Err(e) => {
                error!("Failed to extract content for tab {}: {}", tab.id, e);
                Err(SummaryError::ExtractionFailed(e.to_string()))
            }
        }
    }

    fn finish(&self, tab_id: TabId, summary: Summary, report: impl Fn(u8)) -> Summary {
        self.cache.put(tab_id, summary.clone());
        report(PROGRESS_DONE);
        summary
    }
}
