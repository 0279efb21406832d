/// Prompt used when the user has not configured a custom one.
pub const DEFAULT_PROMPT: &str = "Please provide a concise summary of the following content:";

/// List of disallowed patterns in custom prompts (prompt injection protection)
pub const DISALLOWED_PATTERNS: [&str; 4] = ["system:", "assistant:", "user:", "{{"];

/// Maximum length allowed for custom prompts saved from the settings page
pub const MAX_CUSTOM_PROMPT_LENGTH: usize = 800;

/// Named prompt presets offered by the settings page.
pub const PRESETS: [(&str, &str); 5] = [
    (
        "concise",
        "Provide a very brief 1-2 sentence summary focusing on the main point only.",
    ),
    (
        "detailed",
        "Provide a comprehensive summary covering all key points, important details, and main conclusions.",
    ),
    (
        "bullet",
        "Summarize as a list of bullet points with the most important information first.",
    ),
    (
        "technical",
        "Provide a technical summary focusing on facts, data, methodologies, and technical details.",
    ),
    (
        "eli5",
        "Explain this like I'm five years old - use simple language and analogies.",
    ),
];

/// Look up a preset prompt by name.
#[must_use]
pub fn preset(name: &str) -> Option<&'static str> {
    PRESETS
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, text)| *text)
}

/// Sanitizes a custom prompt to prevent prompt injection attacks
/// Returns a Result with either the sanitized prompt or an error message
pub fn sanitize_custom_prompt(prompt: &str) -> Result<String, String> {
    if prompt.chars().count() > MAX_CUSTOM_PROMPT_LENGTH {
        return Err(format!(
            "Custom prompt exceeds maximum length of {} characters",
            MAX_CUSTOM_PROMPT_LENGTH
        ));
    }

    let lowered = prompt.to_lowercase();
    for pattern in DISALLOWED_PATTERNS.iter() {
        if lowered.contains(pattern) {
            return Err(format!(
                "Custom prompt contains disallowed pattern: {}",
                pattern
            ));
        }
    }

    // Newlines are legitimate in prompts; other control characters are not
    let sanitized = prompt
        .chars()
        .filter(|&c| c == '\n' || !c.is_control())
        .collect::<String>();

    Ok(sanitized.trim().to_string())
}

/// Builds the text typed into the external service for one piece of content.
#[must_use]
pub fn build_prompt(content: &str, custom_prompt: Option<&str>) -> String {
    match custom_prompt.map(str::trim).filter(|p| !p.is_empty()) {
        Some(custom) => format!("{custom}\n\nContent to summarize:\n{content}"),
        None => format!("{DEFAULT_PROMPT}\n\n{content}"),
    }
}
