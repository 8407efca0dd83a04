use serde::{Deserialize, Serialize};

/// Languages the pipeline can answer in. Declaration order is the
/// tie-break order used by the detector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ru")]
    Russian,
    #[serde(rename = "uz")]
    Uzbek,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::English, Language::Russian, Language::Uzbek];

    /// Returned when no keyword of any language matches.
    pub const FALLBACK: Language = Language::English;

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Russian => "ru",
            Language::Uzbek => "uz",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Language::English),
            "ru" => Some(Language::Russian),
            "uz" => Some(Language::Uzbek),
            _ => None,
        }
    }
}
