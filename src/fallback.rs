//! Local extractive summary used whenever the external service cannot be reached.

use regex::Regex;

pub const NO_CONTENT_MESSAGE: &str = "No content available.";
pub const TOO_SHORT_MESSAGE: &str = "Content too short to summarize.";

const MAX_SENTENCES: usize = 3;
const MAX_SUMMARY_CHARS: usize = 200;
const ELLIPSIS: &str = "...";

static SENTENCE_RE: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]+").expect("static regex compile"));

/// First three sentence-like segments of `content`, capped at 200 characters.
///
/// Pure and total: never fails and never blocks.
#[must_use]
pub fn fallback_summary(content: &str) -> String {
    if content.trim().is_empty() {
        return NO_CONTENT_MESSAGE.to_string();
    }

    let summary = SENTENCE_RE
        .find_iter(content)
        .take(MAX_SENTENCES)
        .map(|m| m.as_str().trim())
        .collect::<Vec<_>>()
        .join(" ");
    let summary = summary.trim();

    if summary.is_empty() {
        return TOO_SHORT_MESSAGE.to_string();
    }

    if summary.chars().count() > MAX_SUMMARY_CHARS {
        let keep = MAX_SUMMARY_CHARS - ELLIPSIS.len();
        let mut truncated: String = summary.chars().take(keep).collect();
        truncated.push_str(ELLIPSIS);
        return truncated;
    }

    summary.to_string()
}
