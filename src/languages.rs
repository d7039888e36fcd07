use thiserror::Error;

/// Target languages accepted by `/translate`, in the order they are documented.
const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("ar", "Arabic"),
    ("bn", "Bengali"),
    ("de", "German"),
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("gu", "Gujarati"),
    ("hi", "Hindi"),
    ("id", "Indonesian"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("kn", "Kannada"),
    ("ko", "Korean"),
    ("ml", "Malayalam"),
    ("mr", "Marathi"),
    ("nl", "Dutch"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("th", "Thai"),
    ("tr", "Turkish"),
    ("vi", "Vietnamese"),
    ("zh", "Chinese"),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid target language: {code}. Supported languages: {supported}")]
pub struct UnsupportedLanguage {
    pub code: String,
    pub supported: String,
}

/// Look up the display name for a language code.
pub fn resolve(code: &str) -> Result<&'static str, UnsupportedLanguage> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .ok_or_else(|| UnsupportedLanguage {
            code: code.to_string(),
            supported: list_entries()
                .map(|(c, _)| c)
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// Every (code, name) pair. Each call starts a fresh iteration.
pub fn list_entries() -> impl Iterator<Item = (&'static str, &'static str)> + Clone {
    SUPPORTED_LANGUAGES.iter().copied()
}

/// Markdown-style bullet list used in the API documentation text.
pub fn format_language_list() -> String {
    list_entries()
        .map(|(code, name)| format!("- {}: {}", code, name))
        .collect::<Vec<_>>()
        .join("\n")
}
