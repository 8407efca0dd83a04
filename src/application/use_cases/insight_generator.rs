//! Short narrative summaries of query results.

use crate::domain::language::Language;
use crate::domain::value::Row;
use crate::infrastructure::llm_clients::pool::{CompletionRequest, GenerationPool};
use crate::infrastructure::response::clean_llm_response;
use std::fmt::Write;
use tracing::warn;

/// Rows shown to the provider as grounding.
pub const INSIGHT_SAMPLE_ROWS: usize = 5;

const INSIGHT_TEMPERATURE: f32 = 0.3;
const INSIGHT_MAX_TOKENS: u32 = 500;

pub fn no_data_message(language: Language) -> &'static str {
    match language {
        Language::English => "No data returned from the query.",
        Language::Russian => "Запрос не вернул данных.",
        Language::Uzbek => "So'rov hech qanday ma'lumot qaytarmadi.",
    }
}

pub fn unavailable_message(language: Language) -> &'static str {
    match language {
        Language::English => "Unable to generate insights for this result.",
        Language::Russian => "Не удалось сформировать выводы по этому результату.",
        Language::Uzbek => "Ushbu natija bo'yicha xulosa chiqarib bo'lmadi.",
    }
}

fn system_prompt(language: Language) -> &'static str {
    match language {
        Language::English => {
            "You are a data analyst AI. Analyze the query results and provide insightful observations.

Provide:
1. Key findings and trends
2. Notable patterns or anomalies
3. Business insights if applicable
4. Recommendations based on the data

Keep your response concise but informative (2-3 sentences max). Answer in English."
        }
        Language::Russian => {
            "Вы аналитик данных. Проанализируйте результаты запроса и сформулируйте содержательные наблюдения.

Укажите:
1. Ключевые выводы и тенденции
2. Заметные закономерности или аномалии
3. Бизнес-выводы, если применимо
4. Рекомендации на основе данных

Отвечайте кратко, но информативно (не более 2-3 предложений). Отвечайте на русском языке."
        }
        Language::Uzbek => {
            "Siz ma'lumotlar tahlilchisisiz. So'rov natijalarini tahlil qiling va foydali kuzatuvlarni bering.

Quyidagilarni keltiring:
1. Asosiy xulosalar va tendensiyalar
2. E'tiborga molik qonuniyatlar yoki anomaliyalar
3. Agar mos bo'lsa, biznes xulosalari
4. Ma'lumotlarga asoslangan tavsiyalar

Javobingiz qisqa, lekin mazmunli bo'lsin (ko'pi bilan 2-3 gap). O'zbek tilida javob bering."
        }
    }
}

/// The query, the first rows as JSON and a note on how many were left out.
pub fn data_summary(query: &str, rows: &[Row]) -> String {
    let mut summary = format!("Query: {}\n\nResults ({} rows):\n", query, rows.len());
    for (i, row) in rows.iter().take(INSIGHT_SAMPLE_ROWS).enumerate() {
        let rendered = serde_json::to_string(row).unwrap_or_default();
        let _ = writeln!(summary, "Row {}: {}", i + 1, rendered);
    }
    if rows.len() > INSIGHT_SAMPLE_ROWS {
        let _ = writeln!(
            summary,
            "... and {} more rows",
            rows.len() - INSIGHT_SAMPLE_ROWS
        );
    }
    summary
}

pub struct InsightGenerator {
    pool: GenerationPool,
}

impl InsightGenerator {
    pub fn new(pool: GenerationPool) -> Self {
        Self { pool }
    }

    /// Never fails. An empty result skips the provider entirely; a provider
    /// error yields a localized placeholder.
    pub async fn generate(&self, query: &str, rows: &[Row], language: Language) -> String {
        if rows.is_empty() {
            return no_data_message(language).to_string();
        }

        let request = CompletionRequest {
            system: system_prompt(language).to_string(),
            user: data_summary(query, rows),
            temperature: INSIGHT_TEMPERATURE,
            max_tokens: INSIGHT_MAX_TOKENS,
        };

        match self.pool.complete(request).await {
            Ok(raw) => {
                let insight = clean_llm_response(&raw);
                if insight.is_empty() {
                    unavailable_message(language).to_string()
                } else {
                    insight
                }
            }
            Err(e) => {
                warn!("Insight generation failed: {}", e);
                unavailable_message(language).to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::{pool, row, FakeLlm};
    use crate::domain::error::AppError;
    use serde_json::json;

    fn rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| row(json!({"region": format!("R{}", i), "total": i * 10})))
            .collect()
    }

    #[tokio::test]
    async fn test_empty_rows_skip_provider() {
        let llm = FakeLlm::replying(&["should not be used"]);
        let generator = InsightGenerator::new(pool(llm.clone()));

        let insight = generator.generate("sales", &[], Language::English).await;
        assert_eq!(insight, "No data returned from the query.");

        let insight = generator.generate("продажи", &[], Language::Russian).await;
        assert_eq!(insight, "Запрос не вернул данных.");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_prompt_uses_first_five_rows() {
        let llm = FakeLlm::replying(&["<think>...</think>R6 leads all regions."]);
        let generator = InsightGenerator::new(pool(llm.clone()));

        let insight = generator
            .generate("sales by region", &rows(7), Language::English)
            .await;
        assert_eq!(insight, "R6 leads all regions.");

        let call = llm.call(0);
        assert!(call.user.starts_with("Query: sales by region\n\nResults (7 rows):\n"));
        assert!(call.user.contains(r#"Row 5: {"region":"R4","total":40}"#));
        assert!(!call.user.contains("Row 6:"));
        assert!(call.user.contains("... and 2 more rows"));
        assert_eq!(call.config.temperature, Some(0.3));
        assert_eq!(call.config.max_tokens, Some(500));
    }

    #[tokio::test]
    async fn test_answer_language_follows_detection() {
        let llm = FakeLlm::replying(&["Savdo o'sdi."]);
        let generator = InsightGenerator::new(pool(llm.clone()));
        generator.generate("savdo", &rows(2), Language::Uzbek).await;
        assert!(llm.call(0).system.contains("O'zbek tilida"));
    }

    #[tokio::test]
    async fn test_provider_failure_is_not_fatal() {
        let llm = FakeLlm::new(vec![Err(AppError::Timeout("60s".to_string()))]);
        let generator = InsightGenerator::new(pool(llm));
        let insight = generator.generate("sales", &rows(3), Language::English).await;
        assert_eq!(insight, unavailable_message(Language::English));
    }

    #[test]
    fn test_summary_without_overflow_note() {
        let summary = data_summary("q", &rows(2));
        assert!(summary.contains("Row 2:"));
        assert!(!summary.contains("more rows"));
    }
}
