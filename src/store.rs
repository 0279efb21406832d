//! Key-value persistence collaborator and the records the core keeps in it.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::warn;

use crate::core::{ReportSnapshot, Settings};
use crate::errors::SummaryError;
use crate::prompt::sanitize_custom_prompt;

pub const SETTINGS_KEY: &str = "tabulatorSettings";
pub const REPORT_KEY: &str = "tabData";

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, SummaryError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), SummaryError>;
}

/// In-process store, used standalone and in tests.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, SummaryError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), SummaryError> {
        self.values.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Loads the settings record. Missing or unreadable records yield defaults, and a
/// stored prompt that fails sanitization is dropped in favor of the default prompt.
///
/// # Errors
///
/// Returns an error only if the store itself fails.
pub async fn load_settings(store: &dyn KeyValueStore) -> Result<Settings, SummaryError> {
    let Some(raw) = store.get(SETTINGS_KEY).await? else {
        return Ok(Settings::default());
    };

    let mut settings: Settings = match serde_json::from_value(raw) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Ignoring unreadable settings record: {}", e);
            return Ok(Settings::default());
        }
    };

    match sanitize_custom_prompt(&settings.custom_prompt) {
        Ok(clean) => settings.custom_prompt = clean,
        Err(e) => {
            warn!("Ignoring stored custom prompt: {}", e);
            settings.custom_prompt.clear();
        }
    }

    Ok(settings)
}

/// # Errors
///
/// Returns an error if the store rejects the write.
pub async fn save_report(
    store: &dyn KeyValueStore,
    report: &ReportSnapshot,
) -> Result<(), SummaryError> {
    let value = serde_json::to_value(report)
        .map_err(|e| SummaryError::Storage(format!("report serialize: {e}")))?;
    store.set(REPORT_KEY, value).await
}
