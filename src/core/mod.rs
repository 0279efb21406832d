//! Configuration and shared data model

pub mod config;
pub mod models;

pub use config::AppConfig;
pub use models::{ReportSnapshot, Settings, Summary, SummaryOrigin, Tab, TabId, TabReport};
