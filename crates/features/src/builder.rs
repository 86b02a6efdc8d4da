use crate::error::FeatureError;
use crate::BuiltFeatures;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use core_types::{ColumnType, CoreError, NormalizationContext, NumericStats};
use dataset::schema::parse_loose_number;
use dataset::{ParsedDataset, Schema};
use ndarray::Array2;
use std::collections::HashMap;

/// Up to this many categories of a categorical column become one-hot
/// features; the rest collapse to all-zeros.
const TOP_K_CATEGORIES: usize = 10;

/// Whether the builder may compute fresh normalization statistics
/// (training) or must reuse the ones captured at training time (scoring).
#[derive(Debug, Clone, Copy)]
pub enum FeatureMode<'a> {
    Training,
    Scoring(&'a NormalizationContext),
}

/// Transforms raw string rows plus an inferred schema into a dense
/// numeric matrix, an ordered feature-name list, and (when a label
/// column is given) a 0/1 label vector.
///
/// Feature generation walks the headers in dataset order and emits, per
/// column type:
/// - numeric/integer/currency: one z-scored feature; currency columns
///   whose name contains "amount" additionally emit `<col>_zScore` and
///   `<col>_log`
/// - categorical/string: one 0/1 feature per top-K training category
/// - date: `<col>_hourOfDay`, `<col>_dayOfWeek`, `<col>_isWeekend`,
///   `<col>_isOutOfHours`, `<col>_isExtendedHours`
/// - boolean: one 0/1 feature
///
/// The order is deterministic, so identical (schema, context) inputs
/// yield identical feature-name orderings at training and scoring time.
pub fn build_features(
    dataset: &ParsedDataset,
    schema: &Schema,
    label_column: Option<&str>,
    mode: FeatureMode<'_>,
) -> Result<BuiltFeatures, FeatureError> {
    let n_samples = dataset.rows.len();
    let reuse = matches!(mode, FeatureMode::Scoring(_));
    let mut context = match mode {
        FeatureMode::Training => NormalizationContext::default(),
        FeatureMode::Scoring(ctx) => ctx.clone(),
    };

    if let Some(label) = label_column {
        if !dataset.headers.iter().any(|h| h == label) {
            return Err(FeatureError::MissingLabel(label.to_string()));
        }
    }

    let mut feature_names: Vec<String> = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();

    for header in &dataset.headers {
        if Some(header.as_str()) == label_column {
            continue;
        }
        let Some(col_type) = schema.column_type(header) else {
            continue;
        };

        let raw = |row: &HashMap<String, String>| -> String {
            row.get(header).map(|v| v.trim().to_string()).unwrap_or_default()
        };

        match col_type {
            ColumnType::Integer | ColumnType::Number | ColumnType::Currency => {
                let values: Vec<f64> = dataset
                    .rows
                    .iter()
                    .map(|row| parse_loose_number(&raw(row)).unwrap_or(f64::NAN))
                    .collect();

                let stats = match context.numeric_stats.get(header) {
                    Some(stats) => *stats,
                    None => {
                        let stats = compute_stats(&values);
                        if !reuse {
                            context.numeric_stats.insert(header.clone(), stats);
                        }
                        stats
                    }
                };

                let z_scores: Vec<f64> = values.iter().map(|v| z_score(*v, stats)).collect();
                feature_names.push(header.clone());
                columns.push(z_scores.clone());

                let is_amount = col_type == ColumnType::Currency
                    && header.to_lowercase().contains("amount");
                if is_amount {
                    feature_names.push(format!("{header}_zScore"));
                    columns.push(z_scores);
                    feature_names.push(format!("{header}_log"));
                    columns.push(values.iter().map(|v| log_amount(*v)).collect());
                }
            }
            ColumnType::Categorical | ColumnType::String => {
                let categories = match context.categorical_mappings.get(header) {
                    Some(categories) => categories.clone(),
                    None => {
                        let categories = top_categories(dataset, header);
                        if !reuse {
                            context
                                .categorical_mappings
                                .insert(header.clone(), categories.clone());
                        }
                        categories
                    }
                };
                for category in &categories {
                    feature_names.push(format!("{header}_{category}"));
                    columns.push(
                        dataset
                            .rows
                            .iter()
                            .map(|row| if raw(row) == *category { 1.0 } else { 0.0 })
                            .collect(),
                    );
                }
            }
            ColumnType::Date => {
                let parsed: Vec<Option<NaiveDateTime>> =
                    dataset.rows.iter().map(|row| parse_date_time(&raw(row))).collect();
                let derived: [(&str, fn(&NaiveDateTime) -> f64); 5] = [
                    ("hourOfDay", |dt| dt.hour() as f64),
                    ("dayOfWeek", |dt| dt.weekday().num_days_from_sunday() as f64),
                    ("isWeekend", |dt| {
                        let day = dt.weekday().num_days_from_sunday();
                        if day == 0 || day == 6 { 1.0 } else { 0.0 }
                    }),
                    ("isOutOfHours", |dt| {
                        let hour = dt.hour();
                        if hour < 6 || hour >= 22 { 1.0 } else { 0.0 }
                    }),
                    ("isExtendedHours", |dt| {
                        let hour = dt.hour();
                        if (6..8).contains(&hour) || (17..22).contains(&hour) { 1.0 } else { 0.0 }
                    }),
                ];
                for (suffix, extract) in derived {
                    feature_names.push(format!("{header}_{suffix}"));
                    columns.push(
                        parsed
                            .iter()
                            .map(|dt| dt.as_ref().map(extract).unwrap_or(0.0))
                            .collect(),
                    );
                }
            }
            ColumnType::Boolean => {
                feature_names.push(header.clone());
                columns.push(
                    dataset
                        .rows
                        .iter()
                        .map(|row| if is_truthy(&raw(row)) { 1.0 } else { 0.0 })
                        .collect(),
                );
            }
        }
    }

    if feature_names.is_empty() {
        return Err(FeatureError::Core(CoreError::InvalidInput(
            "feature matrix has zero columns".to_string(),
        )));
    }

    let n_features = feature_names.len();
    let x = Array2::from_shape_fn((n_samples, n_features), |(i, j)| columns[j][i]);

    let y = label_column.map(|label| {
        dataset
            .rows
            .iter()
            .map(|row| parse_label(row.get(label).map(String::as_str).unwrap_or("")))
            .collect()
    });

    tracing::debug!(
        samples = n_samples,
        features = n_features,
        reuse_context = reuse,
        "built feature matrix"
    );

    Ok(BuiltFeatures { x, y, feature_names, context })
}

/// Case-insensitive label parse: 1/true/yes and 0/false/no map directly;
/// anything else is parsed numerically and thresholded at 0.5, with a
/// fallback of 0.
pub fn parse_label(value: &str) -> f64 {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => 1.0,
        "0" | "false" | "no" => 0.0,
        other => match other.parse::<f64>() {
            Ok(v) if v >= 0.5 => 1.0,
            _ => 0.0,
        },
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes")
}

/// Population mean/std over the parseable values only. A column with no
/// parseable values gets (0, 0), which the z-score guard turns into 0s.
fn compute_stats(values: &[f64]) -> NumericStats {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return NumericStats { mean: 0.0, std: 0.0 };
    }
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    let variance =
        finite.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / finite.len() as f64;
    NumericStats { mean, std: variance.sqrt() }
}

fn z_score(value: f64, stats: NumericStats) -> f64 {
    if stats.std == 0.0 {
        return 0.0;
    }
    let z = (value - stats.mean) / stats.std;
    // Missing values are imputed to 0 after normalization.
    if z.is_finite() { z } else { 0.0 }
}

fn log_amount(value: f64) -> f64 {
    if value.is_nan() || value < 0.0 {
        0.0
    } else {
        (value + 1.0).ln()
    }
}

/// Top-K categories by training frequency, ties broken by value so the
/// mapping is deterministic.
fn top_categories(dataset: &ParsedDataset, header: &str) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in &dataset.rows {
        let value = row.get(header).map(|v| v.trim()).unwrap_or("");
        if value.is_empty() {
            continue;
        }
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_K_CATEGORIES);
    ranked.into_iter().map(|(value, _)| value).collect()
}

fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%m/%d/%Y %H:%M") {
        return Some(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    None
}
