//! Provider-agnostic token estimation for prompt budgeting.
//!
//! Approximation: ~4 characters per token, which holds well enough across
//! OpenAI, Gemini and OpenRouter models without a provider tokenizer.

pub struct TokenCounter;

impl TokenCounter {
    /// Estimate token count for text. Counts characters, not bytes, so
    /// Cyrillic schema comments are not over-counted.
    pub fn estimate_tokens(text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        (text.chars().count() + 3) / 4
    }

    pub fn fits_in_budget(estimated: usize, budget: usize) -> bool {
        estimated <= budget
    }

    /// Number of leading sections whose combined estimate fits the budget.
    /// The first section is always kept so a prompt never loses all context.
    pub fn count_sections_that_fit(sections: &[String], budget: usize) -> usize {
        let mut used_tokens = 0;
        let mut count = 0;

        for section in sections {
            let section_tokens = Self::estimate_tokens(section);
            if count > 0 && !Self::fits_in_budget(used_tokens + section_tokens, budget) {
                break;
            }
            used_tokens += section_tokens;
            count += 1;
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(TokenCounter::estimate_tokens(""), 0);
        assert_eq!(TokenCounter::estimate_tokens("a"), 1);
        assert_eq!(TokenCounter::estimate_tokens("abcd"), 1);
        assert_eq!(TokenCounter::estimate_tokens("abcdefgh"), 2);
    }

    #[test]
    fn test_estimate_counts_chars() {
        // 8 Cyrillic chars are 16 bytes.
        assert_eq!(TokenCounter::estimate_tokens("продажи!"), 2);
    }

    #[test]
    fn test_sections_trimmed_from_the_end() {
        let sections = vec!["a".repeat(40), "b".repeat(40), "c".repeat(40)];
        assert_eq!(TokenCounter::count_sections_that_fit(&sections, 25), 2);
        assert_eq!(TokenCounter::count_sections_that_fit(&sections, 30), 3);
    }

    #[test]
    fn test_first_section_always_kept() {
        let sections = vec!["x".repeat(400), "y".repeat(4)];
        assert_eq!(TokenCounter::count_sections_that_fit(&sections, 10), 1);
        assert_eq!(TokenCounter::count_sections_that_fit(&[], 10), 0);
    }
}
