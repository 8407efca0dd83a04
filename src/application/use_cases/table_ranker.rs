//! Table relevance ranking over a flat schema listing.
//!
//! The listing is the text rendered by the schema introspector:
//!
//! ```text
//! Database: sales (postgresql)
//!
//! Table: public.orders
//! Columns:
//!   - id: integer NOT NULL
//!   - created_at: timestamp without time zone NULL
//! ```
//!
//! Scores are small integers:
//! - +3 per table-name word found in the query
//! - +2 per column named in the query (as-is or with `_` read as a space)
//! - +4 per date-like column when the query talks about time, +3 more if
//!   the column is declared as a date or timestamp
//! - +2 per numeric column when the query asks for an aggregate

use crate::shared::token_counter::TokenCounter;
use once_cell::sync::Lazy;
use regex::Regex;

/// Tables kept for the generation prompt.
pub const MAX_RANKED_TABLES: usize = 5;

static DATE_QUERY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:date|time|day|daily|week|month|year|quarter|today|yesterday|when|trend|period|дат|время|врем|день|дня|дней|недел|месяц|год|квартал|сегодня|вчера|когда|период|sana|vaqt|kun|hafta|oy|yil|chorak|bugun|kecha|qachon|davr)",
    )
    .unwrap()
});

static AGGREGATE_QUERY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:count|sum|total|average|avg|mean|max|min|how many|how much|number of|сколько|количеств|сумм|средн|итог|всего|максим|миним|qancha|nechta|soni|jami|yig['ʻ’]indi|o['ʻ’]rtacha|umumiy)",
    )
    .unwrap()
});

static DATE_COLUMN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:date|time|_at$|created|updated|month|year|day|week|quarter)").unwrap()
});

static DATE_TYPE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:date|timestamp\w*|timestamptz)\b").unwrap());

static NUMERIC_TYPE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:integer|int|int2|int4|int8|smallint|bigint|numeric|decimal|real|double precision|double|float|float4|float8|money|smallserial|serial|bigserial)\b",
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq)]
pub struct ListedColumn {
    pub name: String,
    pub data_type: String,
    /// The column line exactly as it appeared in the listing.
    pub line: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListedTable {
    pub name: String,
    pub columns: Vec<ListedColumn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedTable {
    pub table: ListedTable,
    pub score: u32,
}

/// Schema text handed to the SQL generator.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaContext {
    pub text: String,
    pub tables: Vec<RankedTable>,
    /// False when no table scored and the full listing was used instead.
    pub filtered: bool,
    /// Tables dropped to stay inside the token budget.
    pub dropped_for_budget: usize,
}

/// Header lines (before the first `Table:`) and the tables that follow.
pub fn parse_schema_listing(listing: &str) -> (Vec<String>, Vec<ListedTable>) {
    let mut header = Vec::new();
    let mut tables: Vec<ListedTable> = Vec::new();

    for raw in listing.lines() {
        let line = raw.trim_end();
        let trimmed = line.trim_start();

        if let Some(name) = trimmed.strip_prefix("Table:") {
            tables.push(ListedTable {
                name: name.trim().to_string(),
                columns: Vec::new(),
            });
            continue;
        }

        match tables.last_mut() {
            None => {
                if !trimmed.is_empty() {
                    header.push(trimmed.to_string());
                }
            }
            Some(table) => {
                if let Some(column) = trimmed.strip_prefix("- ") {
                    if let Some((name, rest)) = column.split_once(':') {
                        table.columns.push(ListedColumn {
                            name: name.trim().to_string(),
                            data_type: strip_nullability(rest.trim()).to_string(),
                            line: trimmed.to_string(),
                        });
                    }
                }
            }
        }
    }

    (header, tables)
}

fn strip_nullability(declared: &str) -> &str {
    declared
        .strip_suffix("NOT NULL")
        .or_else(|| declared.strip_suffix("NULL"))
        .unwrap_or(declared)
        .trim_end()
}

fn table_words(name: &str) -> Vec<String> {
    let last_segment = name.rsplit('.').next().unwrap_or(name);
    last_segment
        .split(|c| c == '_' || c == '-' || c == '.')
        .map(|word| word.trim_matches('"').to_lowercase())
        .filter(|word| word.chars().count() >= 2)
        .collect()
}

pub fn score_table(query: &str, table: &ListedTable) -> u32 {
    let query = query.to_lowercase();
    let mentions_dates = DATE_QUERY_PATTERN.is_match(&query);
    let mentions_aggregates = AGGREGATE_QUERY_PATTERN.is_match(&query);

    let mut score = 0;

    for word in table_words(&table.name) {
        if query.contains(&word) {
            score += 3;
        }
    }

    for column in &table.columns {
        let name = column.name.to_lowercase();
        if query.contains(&name) || query.contains(&name.replace('_', " ")) {
            score += 2;
        }

        if mentions_dates && DATE_COLUMN_PATTERN.is_match(&name) {
            score += 4;
            if DATE_TYPE_PATTERN.is_match(&column.data_type) {
                score += 3;
            }
        }

        if mentions_aggregates && NUMERIC_TYPE_PATTERN.is_match(column.data_type.trim()) {
            score += 2;
        }
    }

    score
}

/// Every table in the listing, highest score first. Ties keep listing order.
pub fn rank_tables(query: &str, listing: &str) -> Vec<RankedTable> {
    let (_, tables) = parse_schema_listing(listing);
    let mut ranked: Vec<RankedTable> = tables
        .into_iter()
        .map(|table| RankedTable {
            score: score_table(query, &table),
            table,
        })
        .collect();
    // `sort_by` is stable.
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

/// The top [`MAX_RANKED_TABLES`] tables with a non-zero score.
pub fn relevant_tables(query: &str, listing: &str) -> Vec<RankedTable> {
    rank_tables(query, listing)
        .into_iter()
        .filter(|ranked| ranked.score > 0)
        .take(MAX_RANKED_TABLES)
        .collect()
}

fn render_table(ranked: &RankedTable) -> String {
    let mut section = format!(
        "Table: {} (relevance score: {})\nColumns:\n",
        ranked.table.name, ranked.score
    );
    for column in &ranked.table.columns {
        section.push_str("  ");
        section.push_str(&column.line);
        section.push('\n');
    }
    section
}

/// Builds the prompt schema context. Falls back to the whole listing, in
/// listing order, when no table scores.
pub fn build_schema_context(query: &str, listing: &str, token_budget: usize) -> SchemaContext {
    let (header, _) = parse_schema_listing(listing);
    let mut tables = relevant_tables(query, listing);
    let filtered = !tables.is_empty();
    if !filtered {
        tables = rank_tables(query, listing);
    }

    let header_text = if header.is_empty() {
        String::new()
    } else {
        format!("{}\n\n", header.join("\n"))
    };
    let budget = token_budget.saturating_sub(TokenCounter::estimate_tokens(&header_text));

    let sections: Vec<String> = tables.iter().map(render_table).collect();
    let kept = TokenCounter::count_sections_that_fit(&sections, budget);
    let dropped_for_budget = tables.len() - kept;
    tables.truncate(kept);

    let mut text = header_text;
    text.push_str(&sections[..kept].join("\n"));

    SchemaContext {
        text,
        tables,
        filtered,
        dropped_for_budget,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "Database: shop (postgresql)

Table: public.customers
Columns:
  - id: integer NOT NULL
  - full_name: text NOT NULL
  - city: text NULL

Table: public.order_items
Columns:
  - id: integer NOT NULL
  - quantity: integer NOT NULL
  - unit_price: numeric NOT NULL

Table: public.orders
Columns:
  - id: integer NOT NULL
  - customer_id: integer NOT NULL
  - created_at: timestamp without time zone NULL
  - total: numeric NULL

Table: audit.login_events
Columns:
  - happened: text NULL
";

    #[test]
    fn test_parse_listing() {
        let (header, tables) = parse_schema_listing(LISTING);
        assert_eq!(header, vec!["Database: shop (postgresql)".to_string()]);
        assert_eq!(tables.len(), 4);
        assert_eq!(tables[2].name, "public.orders");
        assert_eq!(tables[2].columns[2].name, "created_at");
        assert_eq!(
            tables[2].columns[2].data_type,
            "timestamp without time zone"
        );
        assert_eq!(tables[0].columns[0].data_type, "integer");
    }

    #[test]
    fn test_table_words_use_last_segment() {
        assert_eq!(table_words("public.order_items"), vec!["order", "items"]);
        assert_eq!(table_words("sales-2024"), vec!["sales", "2024"]);
    }

    #[test]
    fn test_date_vocabulary_boosts_timestamp_columns() {
        let (_, tables) = parse_schema_listing(LISTING);
        let orders = &tables[2];
        // "orders" word +3, created_at date-like +4 and timestamp +3,
        // aggregate "total": column named +2, numeric id/customer_id/total +6.
        assert_eq!(score_table("total orders per month", orders), 3 + 4 + 3 + 2 + 6);
    }

    #[test]
    fn test_column_with_underscore_as_space() {
        let (_, tables) = parse_schema_listing(LISTING);
        assert_eq!(score_table("list customers by full name", &tables[0]), 3 + 2);
    }

    #[test]
    fn test_ranking_is_non_increasing() {
        let ranked = rank_tables("total orders per month", LISTING);
        for pair in ranked.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(ranked[0].table.name, "public.orders");
        assert_eq!(ranked[0].score, 18);
        assert_eq!(ranked[3].table.name, "audit.login_events");
        assert_eq!(ranked[3].score, 0);
    }

    #[test]
    fn test_ties_keep_listing_order() {
        // Each of the first three tables has an `id` column and nothing else matches.
        let ranked = rank_tables("show id", LISTING);
        let names: Vec<&str> = ranked.iter().map(|r| r.table.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "public.customers",
                "public.order_items",
                "public.orders",
                "audit.login_events"
            ]
        );
        assert_eq!(ranked[0].score, 2);
        assert_eq!(ranked[2].score, 2);
    }

    #[test]
    fn test_zero_scores_excluded_and_capped() {
        let relevant = relevant_tables("total orders per month", LISTING);
        assert!(relevant.iter().all(|r| r.score > 0));
        assert!(relevant.len() <= MAX_RANKED_TABLES);
        assert!(!relevant.iter().any(|r| r.table.name == "audit.login_events"));

        let mut big = String::from("Database: wide (postgresql)\n\n");
        for i in 0..8 {
            big.push_str(&format!("Table: public.sales_{}\nColumns:\n  - amount: numeric NULL\n\n", i));
        }
        assert_eq!(relevant_tables("sales", &big).len(), MAX_RANKED_TABLES);
    }

    #[test]
    fn test_russian_date_vocabulary() {
        let (_, tables) = parse_schema_listing(LISTING);
        // No table word matches, but "месяц" makes created_at relevant.
        assert_eq!(score_table("выручка за прошлый месяц", &tables[2]), 7);
    }

    #[test]
    fn test_context_includes_scores_and_header() {
        let context = build_schema_context("total orders per month", LISTING, 6000);
        assert!(context.filtered);
        assert!(context.text.starts_with("Database: shop (postgresql)"));
        assert!(context.text.contains("Table: public.orders (relevance score: 18)"));
        assert!(context.text.contains("  - created_at: timestamp without time zone NULL"));
        assert!(!context.text.contains("login_events"));
    }

    #[test]
    fn test_context_falls_back_to_full_listing() {
        let context = build_schema_context("zzz", LISTING, 6000);
        assert!(!context.filtered);
        assert_eq!(context.tables.len(), 4);
        assert!(context.text.contains("login_events"));
    }

    #[test]
    fn test_budget_drops_lowest_ranked_tables() {
        let context = build_schema_context("total orders per month", LISTING, 1);
        assert_eq!(context.tables.len(), 1);
        assert_eq!(context.tables[0].table.name, "public.orders");
        assert!(context.dropped_for_budget > 0);
    }
}
