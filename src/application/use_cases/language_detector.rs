//! Keyword-scoring language detection for natural-language queries.
//!
//! Each language has three keyword categories (interrogatives, action verbs,
//! temporal nouns). The score is the number of matches across all three.
//! The highest score wins; ties go to the language listed first in
//! [`Language::ALL`], and a text with no matches at all is [`Language::FALLBACK`].

use crate::domain::language::Language;
use once_cell::sync::Lazy;
use regex::Regex;

struct LanguagePatterns {
    language: Language,
    categories: Vec<Regex>,
}

fn keywords(words: &str) -> Regex {
    // `\b` is Unicode-aware, so this also bounds Cyrillic words.
    Regex::new(&format!(r"(?i)\b(?:{})\b", words)).unwrap()
}

static PATTERNS: Lazy<Vec<LanguagePatterns>> = Lazy::new(|| {
    vec![
        LanguagePatterns {
            language: Language::English,
            categories: vec![
                keywords(r"what|which|who|how|when|where|why"),
                keywords(r"show|list|find|get|display|give|count|calculate|compare"),
                keywords(r"days?|daily|weeks?|weekly|months?|monthly|years?|yearly|today|yesterday|quarters?"),
            ],
        },
        LanguagePatterns {
            language: Language::Russian,
            categories: vec![
                keywords(r"что|какой|какая|какие|каких|кто|сколько|когда|где|почему|как"),
                keywords(r"покажи\w*|показать|выведи|найди|посчитай|подсчитай|дай|список"),
                keywords(r"день|дня|дней|недел\w*|месяц\w*|год\w*|сегодня|вчера|квартал\w*"),
            ],
        },
        LanguagePatterns {
            language: Language::Uzbek,
            categories: vec![
                keywords(r"qaysi|nima|kim|qancha|nechta|qachon|qayerda|nega|qanday"),
                keywords(r"ko['ʻ’]rsat\w*|chiqar\w*|toping|hisobla\w*|bering?|ro['ʻ’]yxat\w*"),
                keywords(r"kun\w*|hafta\w*|oy\w*|yil\w*|bugun|kecha|chorak\w*"),
            ],
        },
    ]
});

/// Keyword match count per language, in [`Language::ALL`] order.
pub fn language_scores(text: &str) -> Vec<(Language, usize)> {
    PATTERNS
        .iter()
        .map(|patterns| {
            let score = patterns
                .categories
                .iter()
                .map(|category| category.find_iter(text).count())
                .sum();
            (patterns.language, score)
        })
        .collect()
}

pub fn detect_language(text: &str) -> Language {
    let mut best = (Language::FALLBACK, 0);
    for (language, score) in language_scores(text) {
        // Strictly greater, so the earlier language keeps a tie.
        if score > best.1 {
            best = (language, score);
        }
    }
    best.0
}
