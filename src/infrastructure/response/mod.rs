use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

static LEADING_FENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*\r?\n?").unwrap());

static TRAILING_FENCE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n?[ \t]*```$").unwrap());

static MULTIPLE_NEWLINES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Cleans LLM response by removing reasoning tags and excess blank lines
pub fn clean_llm_response(response: &str) -> String {
    let mut cleaned = THINK_TAG_PATTERN.replace_all(response, "").to_string();

    // Some models wrap chain-of-thought in <reasoning> instead
    cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "").to_string();

    cleaned = cleaned.trim().to_string();

    MULTIPLE_NEWLINES_PATTERN
        .replace_all(&cleaned, "\n\n")
        .to_string()
}

/// Removes one leading and one trailing markdown code fence, if present.
pub fn strip_code_fence(response: &str) -> String {
    let trimmed = response.trim();
    let without_leading = LEADING_FENCE_PATTERN.replace(trimmed, "");
    let without_trailing = TRAILING_FENCE_PATTERN.replace(&without_leading, "");
    without_trailing.trim().to_string()
}
