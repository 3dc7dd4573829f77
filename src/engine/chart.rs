//! Picks a chart for a result table, or none.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::db::table::{Cell, ColumnKind, ResultTable};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: String,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    /// Category or time axis; slice names for a pie.
    pub x: String,
    /// Value axis; slice sizes for a pie.
    pub y: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub markers: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hole: Option<f32>,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug)]
enum ChartError {
    BadDate(String),
    NonFinite(f64),
}

impl fmt::Display for ChartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartError::BadDate(value) => write!(f, "cannot parse {:?} as a date", value),
            ChartError::NonFinite(value) => write!(f, "cannot plot {}", value),
        }
    }
}

/// Decision order: scalar answers, time series, categories as bars, small categorical
/// distributions as pies. Bars win over pies whenever both conditions hold.
pub fn select_chart(table: &ResultTable) -> Option<ChartSpec> {
    if table.is_empty() {
        return None;
    }

    let numeric = table.columns_of(ColumnKind::Numeric);
    let text = table.columns_of(ColumnKind::Text);
    let dates: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.name.to_lowercase().contains("date"))
        .map(|(i, _)| i)
        .collect();
    let rows = table.row_count();

    if rows == 1 && numeric.len() == 1 {
        return None;
    }

    let built = if let (Some(&x), Some(&y)) = (dates.first(), numeric.first()) {
        line_chart(table, x, y)
    } else if let (Some(&x), Some(&y)) = (text.first(), numeric.first()) {
        bar_chart(table, x, y)
    } else if text.len() == 1 && numeric.len() == 1 && rows > 2 && rows < 10 {
        pie_chart(table, text[0], numeric[0])
    } else {
        return None;
    };

    match built {
        Ok(spec) => Some(spec),
        Err(e) => {
            debug!("Skipping chart: {}", e);
            None
        }
    }
}

fn line_chart(table: &ResultTable, x: usize, y: usize) -> Result<ChartSpec, ChartError> {
    let xs = table
        .column_values(x)
        .map(parse_date)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ChartSpec {
        kind: ChartKind::Line,
        title: "Time Series Analysis".to_string(),
        x: table.columns[x].name.clone(),
        y: table.columns[y].name.clone(),
        color: None,
        markers: true,
        hole: None,
        points: points(xs, table, y)?,
    })
}

fn bar_chart(table: &ResultTable, x: usize, y: usize) -> Result<ChartSpec, ChartError> {
    let x_name = table.columns[x].name.clone();
    let y_name = table.columns[y].name.clone();
    Ok(ChartSpec {
        kind: ChartKind::Bar,
        title: format!("Analysis by {}", x_name),
        points: points(labels(table, x), table, y)?,
        color: Some(y_name.clone()),
        x: x_name,
        y: y_name,
        markers: false,
        hole: None,
    })
}

fn pie_chart(table: &ResultTable, names: usize, values: usize) -> Result<ChartSpec, ChartError> {
    let values_name = table.columns[values].name.clone();
    Ok(ChartSpec {
        kind: ChartKind::Pie,
        title: format!("Distribution of {}", values_name),
        x: table.columns[names].name.clone(),
        y: values_name,
        color: None,
        markers: false,
        hole: Some(0.3),
        points: points(labels(table, names), table, values)?,
    })
}

fn labels(table: &ResultTable, idx: usize) -> Vec<String> {
    table.column_values(idx).map(ToString::to_string).collect()
}

fn points(xs: Vec<String>, table: &ResultTable, y: usize) -> Result<Vec<ChartPoint>, ChartError> {
    xs.into_iter()
        .zip(table.column_values(y))
        .map(|(x, cell)| match cell.as_f64() {
            Some(v) if !v.is_finite() => Err(ChartError::NonFinite(v)),
            y => Ok(ChartPoint { x, y }),
        })
        .collect()
}

fn parse_date(cell: &Cell) -> Result<String, ChartError> {
    let raw = match cell {
        Cell::Text(s) => s.trim(),
        other => return Err(ChartError::BadDate(other.to_string())),
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(ts.format("%Y-%m-%dT%H:%M:%S").to_string());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Ok(date.format("%Y-%m-%d").to_string());
        }
    }
    Err(ChartError::BadDate(raw.to_string()))
}
