use crate::ParsedDataset;
use chrono::NaiveDate;
use core_types::ColumnType;
use std::collections::{HashMap, HashSet};

const SAMPLE_ROWS: usize = 200;
const TYPE_MAJORITY: f64 = 0.8;
const CATEGORICAL_MAX_DISTINCT: usize = 20;

/// Column-name to column-type mapping inferred from a sample of rows.
#[derive(Debug, Clone)]
pub struct Schema {
    types: HashMap<String, ColumnType>,
}

impl Schema {
    pub fn new(types: HashMap<String, ColumnType>) -> Self {
        Self { types }
    }

    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.types.get(column).copied()
    }
}

/// Infers a column type for every header by inspecting up to the first
/// 200 rows. Empty values are ignored; a column that is empty throughout
/// falls back to `String`.
pub fn infer_schema(dataset: &ParsedDataset) -> Schema {
    let mut types = HashMap::with_capacity(dataset.headers.len());
    for header in &dataset.headers {
        let values: Vec<&str> = dataset
            .rows
            .iter()
            .take(SAMPLE_ROWS)
            .filter_map(|row| row.get(header))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();
        types.insert(header.clone(), classify_column(header, &values));
    }
    Schema::new(types)
}

fn classify_column(name: &str, values: &[&str]) -> ColumnType {
    if values.is_empty() {
        return ColumnType::String;
    }

    if is_boolean(values) {
        return ColumnType::Boolean;
    }
    if majority(values, is_date_value) {
        return ColumnType::Date;
    }
    if is_currency(name, values) {
        return ColumnType::Currency;
    }
    if values.iter().all(|v| v.parse::<i64>().is_ok()) {
        return ColumnType::Integer;
    }
    if majority(values, |v| parse_loose_number(v).is_some()) {
        return ColumnType::Number;
    }

    let distinct: HashSet<&str> = values.iter().copied().collect();
    if distinct.len() <= CATEGORICAL_MAX_DISTINCT {
        ColumnType::Categorical
    } else {
        ColumnType::String
    }
}

fn majority(values: &[&str], predicate: impl Fn(&str) -> bool) -> bool {
    let hits = values.iter().filter(|v| predicate(v)).count();
    hits as f64 / values.len() as f64 >= TYPE_MAJORITY
}

fn is_boolean(values: &[&str]) -> bool {
    values.iter().all(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "true" | "false" | "yes" | "no" | "0" | "1"
        )
    })
}

fn is_currency(name: &str, values: &[&str]) -> bool {
    let name_hint = {
        let lowered = name.to_lowercase();
        lowered.contains("amount") || lowered.contains("amt") || lowered.contains("usd")
    };
    let symbol_hint = values.iter().any(|v| v.contains('$'));
    (name_hint || symbol_hint) && majority(values, |v| parse_loose_number(v).is_some())
}

/// Numeric parse after stripping `$`, `,`, and whitespace.
pub fn parse_loose_number(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Case-insensitive label-column search: the conventional names first,
/// then a pattern sweep over the headers.
pub fn detect_label_column(headers: &[String]) -> Option<String> {
    const KNOWN: [&str; 4] = ["isanomaly", "is_anomaly", "label", "target"];
    for header in headers {
        if KNOWN.contains(&header.to_lowercase().as_str()) {
            return Some(header.clone());
        }
    }
    let pattern = regex::RegexBuilder::new("^is_?anomal|label|target|fraud|flag")
        .case_insensitive(true)
        .build()
        .ok()?;
    headers.iter().find(|h| pattern.is_match(h)).cloned()
}

fn is_date_value(value: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(value).is_ok()
        || chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").is_ok()
        || chrono::NaiveDateTime::parse_from_str(value, "%m/%d/%Y %H:%M").is_ok()
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}
