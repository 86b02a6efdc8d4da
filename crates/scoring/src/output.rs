use crate::error::ScoringError;
use dataset::ParsedDataset;

/// Builds the scored output table: the original columns in their
/// original order followed by `AnomalyScore` (fixed 6-decimal text) and
/// `PredictedLabel` (`0`/`1`), as UTF-8 CSV with `\n` newlines.
pub fn scored_csv(
    dataset: &ParsedDataset,
    scores: &[f64],
    threshold: f64,
) -> Result<Vec<u8>, ScoringError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut headers: Vec<&str> = dataset.headers.iter().map(String::as_str).collect();
    headers.push("AnomalyScore");
    headers.push("PredictedLabel");
    writer
        .write_record(&headers)
        .map_err(|e| ScoringError::Emit(e.to_string()))?;

    for (row, score) in dataset.rows.iter().zip(scores.iter()) {
        let mut record: Vec<String> = dataset
            .headers
            .iter()
            .map(|h| row.get(h).cloned().unwrap_or_default())
            .collect();
        record.push(format!("{score:.6}"));
        record.push(if *score >= threshold { "1" } else { "0" }.to_string());
        writer
            .write_record(&record)
            .map_err(|e| ScoringError::Emit(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| ScoringError::Emit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataset::reader::parse_csv;

    #[test]
    fn appends_score_and_label_columns() {
        let parsed = parse_csv(b"WireId,Amount\nw-1,10\nw-2,99\n").unwrap();
        let bytes = scored_csv(&parsed, &[0.25, 0.9], 0.5).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "WireId,Amount,AnomalyScore,PredictedLabel");
        assert_eq!(lines[1], "w-1,10,0.250000,0");
        assert_eq!(lines[2], "w-2,99,0.900000,1");
        assert!(text.ends_with('\n'));
        assert!(!text.contains('\r'));
    }
}
