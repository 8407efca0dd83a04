//! Chart selection from result shape.
//!
//! Selection is an ordered rule table; the first rule that returns a
//! config wins and a vertical or horizontal bar chart is the default.
//! Only the first two columns are considered: column 1 supplies labels,
//! column 2 supplies values.

use crate::domain::chart::{
    Axis, ChartConfig, ChartSpec, ChartSummary, LayoutHints, Margin, NoChart, NoChartReason,
    Orientation, Series,
};
use crate::domain::language::Language;
use crate::domain::value::Row;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

pub const PIE_MAX_ROWS: usize = 8;
pub const HORIZONTAL_LABEL_CHARS: usize = 12;
pub const HORIZONTAL_MIN_ROWS: usize = 15;

static DATE_COLUMN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:date|time|month|year|day|week|quarter|дата|время|день|недел|месяц|год|квартал)|(?:^|_)(?:sana|vaqt|kun|hafta|oy|yil|chorak)",
    )
    .unwrap()
});

const STANDARD_MARGIN: Margin = Margin {
    left: 60,
    right: 40,
    top: 80,
    bottom: 60,
};

/// The first two columns of a result, pre-extracted.
struct ChartData<'a> {
    rows: &'a [Row],
    columns: Vec<String>,
    labels: Vec<String>,
    values: Vec<Value>,
}

impl<'a> ChartData<'a> {
    fn from_rows(rows: &'a [Row]) -> Self {
        let columns: Vec<String> = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();

        let labels = match columns.first() {
            Some(col) => rows.iter().map(|row| label(row.get(col))).collect(),
            None => Vec::new(),
        };
        let values = match columns.get(1) {
            Some(col) => rows
                .iter()
                .map(|row| row.get(col).cloned().unwrap_or(Value::Null))
                .collect(),
            None => Vec::new(),
        };

        Self {
            rows,
            columns,
            labels,
            values,
        }
    }

    fn label_column(&self) -> &str {
        self.columns.first().map(String::as_str).unwrap_or_default()
    }

    fn value_column(&self) -> &str {
        self.columns.get(1).map(String::as_str).unwrap_or_default()
    }

    fn numbers(&self) -> Vec<f64> {
        self.values.iter().map(coerce_number).collect()
    }

    fn label_column_is_temporal(&self) -> bool {
        DATE_COLUMN_PATTERN.is_match(self.label_column())
    }
}

/// Numbers, or non-empty strings made only of digits, `.` and `-` with at least one digit.
pub fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => {
            !s.is_empty()
                && s.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-')
                && s.chars().any(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

/// Chart value for a cell. Anything that does not parse is 0.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn label(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "null".to_string(),
        Some(other) => other.to_string(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn humanize(column: &str) -> String {
    column.replace('_', " ")
}

fn by_title(language: Language, y: &str, x: &str) -> String {
    match language {
        Language::English => format!("{} by {}", y, x),
        Language::Russian => format!("{} по {}", y, x),
        Language::Uzbek => format!("{} bo'yicha {}", x, y),
    }
}

fn over_title(language: Language, y: &str, x: &str) -> String {
    match language {
        Language::English => format!("{} over {}", y, x),
        Language::Russian => format!("{} в динамике по {}", y, x),
        Language::Uzbek => format!("{} davomida {}", x, y),
    }
}

pub fn no_chart_message(reason: NoChartReason, language: Language) -> &'static str {
    match (reason, language) {
        (NoChartReason::EmptyData, Language::English) => "No data to chart.",
        (NoChartReason::EmptyData, Language::Russian) => "Нет данных для построения графика.",
        (NoChartReason::EmptyData, Language::Uzbek) => "Grafik uchun ma'lumot yo'q.",
        (NoChartReason::InsufficientData, Language::English) => {
            "A single result is shown instead of a chart."
        }
        (NoChartReason::InsufficientData, Language::Russian) => {
            "Вместо графика показан единственный результат."
        }
        (NoChartReason::InsufficientData, Language::Uzbek) => {
            "Grafik o'rniga yagona natija ko'rsatildi."
        }
        (NoChartReason::InsufficientColumns, Language::English) => {
            "At least two columns are needed for a chart."
        }
        (NoChartReason::InsufficientColumns, Language::Russian) => {
            "Для графика нужно минимум два столбца."
        }
        (NoChartReason::InsufficientColumns, Language::Uzbek) => {
            "Grafik uchun kamida ikkita ustun kerak."
        }
        (NoChartReason::EmptyValues, Language::English) => "The value column is empty.",
        (NoChartReason::EmptyValues, Language::Russian) => "Столбец значений пуст.",
        (NoChartReason::EmptyValues, Language::Uzbek) => "Qiymatlar ustuni bo'sh.",
        (NoChartReason::UniformValues, Language::English) => "All values are identical.",
        (NoChartReason::UniformValues, Language::Russian) => "Все значения одинаковы.",
        (NoChartReason::UniformValues, Language::Uzbek) => "Barcha qiymatlar bir xil.",
    }
}

fn no_chart(reason: NoChartReason, language: Language, summary: Option<ChartSummary>) -> ChartConfig {
    ChartConfig::NoChart(NoChart {
        reason,
        message: no_chart_message(reason, language).to_string(),
        summary,
    })
}

fn series(data: &ChartData) -> Vec<Series> {
    vec![Series {
        name: data.value_column().to_string(),
        labels: data.labels.clone(),
        values: data.numbers(),
    }]
}

fn axis(column: &str) -> Option<Axis> {
    Some(Axis {
        column: column.to_string(),
        title: humanize(column),
    })
}

type Rule = fn(&ChartData, Language) -> Option<ChartConfig>;

fn empty_data(data: &ChartData, language: Language) -> Option<ChartConfig> {
    data.rows
        .is_empty()
        .then(|| no_chart(NoChartReason::EmptyData, language, None))
}

fn insufficient_data(data: &ChartData, language: Language) -> Option<ChartConfig> {
    (data.rows.len() < 2).then(|| {
        let summary = data.rows.first().map(|row| ChartSummary::SingleResult {
            fields: row.clone(),
        });
        no_chart(NoChartReason::InsufficientData, language, summary)
    })
}

fn insufficient_columns(data: &ChartData, language: Language) -> Option<ChartConfig> {
    (data.columns.len() < 2).then(|| {
        let summary = ChartSummary::TableView {
            columns: data.columns.clone(),
            row_count: data.rows.len(),
        };
        no_chart(NoChartReason::InsufficientColumns, language, Some(summary))
    })
}

fn empty_values(data: &ChartData, language: Language) -> Option<ChartConfig> {
    data.values
        .iter()
        .all(is_blank)
        .then(|| no_chart(NoChartReason::EmptyValues, language, None))
}

fn uniform_values(data: &ChartData, language: Language) -> Option<ChartConfig> {
    let first = data.values.first()?;
    data.values
        .iter()
        .all(|value| value == first)
        .then(|| no_chart(NoChartReason::UniformValues, language, None))
}

fn pie(data: &ChartData, language: Language) -> Option<ChartConfig> {
    let qualifies = data.rows.len() <= PIE_MAX_ROWS
        && data.values.iter().all(is_numeric)
        && data.numbers().iter().all(|v| *v >= 0.0)
        && !data.label_column_is_temporal();

    qualifies.then(|| {
        ChartConfig::Pie(ChartSpec {
            title: by_title(
                language,
                &humanize(data.value_column()),
                &humanize(data.label_column()),
            ),
            orientation: Orientation::Vertical,
            series: series(data),
            x_axis: None,
            y_axis: None,
            layout: LayoutHints {
                height: None,
                show_legend: true,
                donut_hole: Some(0.3),
                margin: Margin {
                    right: 60,
                    ..STANDARD_MARGIN
                },
            },
        })
    })
}

fn line(data: &ChartData, language: Language) -> Option<ChartConfig> {
    data.label_column_is_temporal().then(|| {
        ChartConfig::Line(ChartSpec {
            title: over_title(
                language,
                &humanize(data.value_column()),
                &humanize(data.label_column()),
            ),
            orientation: Orientation::Vertical,
            series: series(data),
            x_axis: axis(data.label_column()),
            y_axis: axis(data.value_column()),
            layout: LayoutHints {
                height: None,
                show_legend: false,
                donut_hole: None,
                margin: STANDARD_MARGIN,
            },
        })
    })
}

fn bar(data: &ChartData, language: Language) -> ChartConfig {
    let horizontal = data.rows.len() > HORIZONTAL_MIN_ROWS
        || data
            .labels
            .iter()
            .any(|label| label.chars().count() > HORIZONTAL_LABEL_CHARS);

    let title = by_title(
        language,
        &humanize(data.value_column()),
        &humanize(data.label_column()),
    );

    let spec = if horizontal {
        ChartSpec {
            title,
            orientation: Orientation::Horizontal,
            series: series(data),
            x_axis: axis(data.value_column()),
            y_axis: axis(data.label_column()),
            layout: LayoutHints {
                height: Some((data.rows.len() as u32 * 30).max(400)),
                show_legend: false,
                donut_hole: None,
                margin: Margin {
                    left: 120,
                    ..STANDARD_MARGIN
                },
            },
        }
    } else {
        ChartSpec {
            title,
            orientation: Orientation::Vertical,
            series: series(data),
            x_axis: axis(data.label_column()),
            y_axis: axis(data.value_column()),
            layout: LayoutHints {
                height: None,
                show_legend: false,
                donut_hole: None,
                margin: STANDARD_MARGIN,
            },
        }
    };

    ChartConfig::Bar(spec)
}

const RULES: [(&str, Rule); 7] = [
    ("empty_data", empty_data),
    ("insufficient_data", insufficient_data),
    ("insufficient_columns", insufficient_columns),
    ("empty_values", empty_values),
    ("uniform_values", uniform_values),
    ("pie", pie),
    ("line", line),
];

pub fn build_chart(rows: &[Row], language: Language) -> ChartConfig {
    let data = ChartData::from_rows(rows);
    for (name, rule) in RULES {
        if let Some(config) = rule(&data, language) {
            debug!(rule = name, rows = rows.len(), "Chart rule matched");
            return config;
        }
    }
    debug!(rule = "bar", rows = rows.len(), "Chart rule matched");
    bar(&data, language)
}
