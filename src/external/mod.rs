//! Everything that talks to the external conversational service

pub mod client;
pub mod driver;
pub mod login;
pub mod poll;

// Re-export main types for convenience
pub use client::{ClientTimings, ExternalSummaryClient, validate_response};
pub use driver::{AutomationDriver, PageProbe, SubmitOutcome, SurfaceId};
pub use login::LoginProbe;
pub use poll::{PollError, PollPolicy, poll_until};
