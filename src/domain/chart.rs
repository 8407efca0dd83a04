//! Renderer-agnostic chart descriptions.

use crate::domain::value::Row;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartConfig {
    Pie(ChartSpec),
    Line(ChartSpec),
    Bar(ChartSpec),
    NoChart(NoChart),
}

impl ChartConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            ChartConfig::Pie(_) => "pie",
            ChartConfig::Line(_) => "line",
            ChartConfig::Bar(_) => "bar",
            ChartConfig::NoChart(_) => "no_chart",
        }
    }

    pub fn spec(&self) -> Option<&ChartSpec> {
        match self {
            ChartConfig::Pie(spec) | ChartConfig::Line(spec) | ChartConfig::Bar(spec) => {
                Some(spec)
            }
            ChartConfig::NoChart(_) => None,
        }
    }

    pub fn no_chart_reason(&self) -> Option<NoChartReason> {
        match self {
            ChartConfig::NoChart(no_chart) => Some(no_chart.reason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub orientation: Orientation,
    pub series: Vec<Series>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<Axis>,
    pub layout: LayoutHints,
}

/// Parallel label/value arrays. Non-numeric source values are rendered as 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Series {
    pub name: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Axis {
    /// Source column name.
    pub column: String,
    /// Localized axis caption.
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub show_legend: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donut_hole: Option<f64>,
    pub margin: Margin,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Margin {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoChartReason {
    EmptyData,
    InsufficientData,
    InsufficientColumns,
    EmptyValues,
    UniformValues,
}

impl NoChartReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoChartReason::EmptyData => "empty_data",
            NoChartReason::InsufficientData => "insufficient_data",
            NoChartReason::InsufficientColumns => "insufficient_columns",
            NoChartReason::EmptyValues => "empty_values",
            NoChartReason::UniformValues => "uniform_values",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoChart {
    pub reason: NoChartReason,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ChartSummary>,
}

/// What the client should show instead of a chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ChartSummary {
    SingleResult { fields: Row },
    TableView { columns: Vec<String>, row_count: usize },
}
