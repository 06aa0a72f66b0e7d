//! Prompt composition.

/// Quality suffix appended to every prompt by default.
pub const QUALITY_SUFFIX: &str =
    "((masterpiece, best quality, ultra-detailed, photorealistic, 8k, sharp focus))";

/// Suffix steering the model away from rendering text.
pub const NO_TEXT_SUFFIX: &str =
    "((no text, no watermark, no labels, no subtitles, neutral background))";

/// Default suffix list.
#[must_use]
pub fn default_suffixes() -> Vec<String> {
    vec![QUALITY_SUFFIX.to_string(), NO_TEXT_SUFFIX.to_string()]
}

/// Join the prompt and each non-blank suffix with newlines.
#[must_use]
pub fn compose_prompt(prompt: &str, suffixes: &[String]) -> String {
    let mut full = prompt.to_string();
    for suffix in suffixes.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        full.push('\n');
        full.push_str(suffix);
    }
    full
}
