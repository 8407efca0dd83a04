//! Prompt construction and provider delegation for SQL generation.
//!
//! All generation prompt text lives here. The generator never fails: a
//! provider error or an unusable answer becomes [`GeneratedSql::Diagnostic`].

use crate::application::use_cases::table_ranker::SchemaContext;
use crate::domain::connection::DbEngine;
use crate::domain::error::AppError;
use crate::domain::language::Language;
use crate::infrastructure::llm_clients::pool::{CompletionRequest, GenerationPool};
use crate::infrastructure::response::{clean_llm_response, strip_code_fence};
use tracing::{info, warn};

const SQL_TEMPERATURE: f32 = 0.1;
const SQL_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedSql {
    Statement(String),
    Diagnostic(AppError),
}

impl GeneratedSql {
    /// The statement, or the diagnostic rendered as a SQL comment.
    pub fn to_text(&self) -> String {
        match self {
            GeneratedSql::Statement(sql) => sql.clone(),
            GeneratedSql::Diagnostic(err) => format!("-- Error generating SQL: {}", err),
        }
    }
}

pub struct SqlGenerator {
    pool: GenerationPool,
}

impl SqlGenerator {
    pub fn new(pool: GenerationPool) -> Self {
        Self { pool }
    }

    pub fn system_prompt(language: Language, engine: DbEngine, context: &SchemaContext) -> String {
        let dialect = engine.dialect();
        let schema = context.text.trim_end();
        match language {
            Language::English => format!(
                "You are an expert SQL generator. Convert natural language queries to SQL.

Database Schema (tables ranked by relevance to the question):
{schema}

Rules:
1. Generate only a single valid SQL SELECT statement
2. Use only table and column names that appear in the schema above
3. Use explicit JOIN ... ON clauses when more than one table is needed
4. Use appropriate WHERE clauses for filtering
5. Include GROUP BY and ORDER BY when the question implies grouping or ordering
6. Return only the SQL query, no explanations
7. Use double quotes for identifiers if needed
8. Ensure the query is {dialect} compatible
"
            ),
            Language::Russian => format!(
                "Вы эксперт по генерации SQL. Преобразуйте запросы на естественном языке в SQL.

Схема базы данных (таблицы упорядочены по релевантности вопросу):
{schema}

Правила:
1. Сгенерируйте только один корректный оператор SQL SELECT
2. Используйте только имена таблиц и столбцов из приведённой схемы
3. Используйте явные JOIN ... ON, если нужно несколько таблиц
4. Используйте подходящие условия WHERE для фильтрации
5. Добавляйте GROUP BY и ORDER BY, если вопрос подразумевает группировку или сортировку
6. Верните только SQL-запрос, без пояснений
7. При необходимости заключайте идентификаторы в двойные кавычки
8. Запрос должен быть совместим с {dialect}
"
            ),
            Language::Uzbek => format!(
                "Siz SQL yaratish bo'yicha mutaxassissiz. Tabiiy tildagi so'rovlarni SQL ga aylantiring.

Ma'lumotlar bazasi sxemasi (jadvallar savolga aloqadorligi bo'yicha tartiblangan):
{schema}

Qoidalar:
1. Faqat bitta to'g'ri SQL SELECT so'rovini yarating
2. Faqat yuqoridagi sxemada mavjud jadval va ustun nomlaridan foydalaning
3. Bir nechta jadval kerak bo'lsa, aniq JOIN ... ON dan foydalaning
4. Filtrlash uchun mos WHERE shartlaridan foydalaning
5. Savol guruhlash yoki tartiblashni nazarda tutsa, GROUP BY va ORDER BY qo'shing
6. Faqat SQL so'rovini qaytaring, izohlarsiz
7. Kerak bo'lsa, identifikatorlarni qo'sh tirnoqqa oling
8. So'rov {dialect} bilan mos bo'lishi kerak
"
            ),
        }
    }

    pub fn user_prompt(language: Language, query: &str) -> String {
        match language {
            Language::English => format!("Convert this natural language query to SQL: {}", query),
            Language::Russian => format!(
                "Преобразуйте этот запрос на естественном языке в SQL: {}",
                query
            ),
            Language::Uzbek => format!(
                "Ushbu tabiiy tildagi so'rovni SQL ga aylantiring: {}",
                query
            ),
        }
    }

    pub async fn generate(
        &self,
        query: &str,
        language: Language,
        engine: DbEngine,
        context: &SchemaContext,
    ) -> GeneratedSql {
        let request = CompletionRequest {
            system: Self::system_prompt(language, engine, context),
            user: Self::user_prompt(language, query),
            temperature: SQL_TEMPERATURE,
            max_tokens: SQL_MAX_TOKENS,
        };

        let raw = match self.pool.complete(request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("SQL generation failed: {}", e);
                return GeneratedSql::Diagnostic(e);
            }
        };

        let sql = strip_code_fence(&clean_llm_response(&raw));
        if sql.is_empty() {
            return GeneratedSql::Diagnostic(AppError::LLMError(
                "Provider returned an empty response".to_string(),
            ));
        }

        info!(
            language = language.code(),
            tables = context.tables.len(),
            "Generated SQL"
        );
        GeneratedSql::Statement(sql)
    }
}
