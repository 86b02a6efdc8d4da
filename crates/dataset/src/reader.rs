use crate::error::DatasetError;
use crate::ParsedDataset;
use calamine::{Reader, Xlsx};
use std::collections::HashMap;
use std::io::Cursor;

/// Parses UTF-8 CSV bytes. Quoted fields and embedded commas are handled
/// by the csv reader; short records are padded with empty strings so
/// every row map carries every header.
pub fn parse_csv(bytes: &[u8]) -> Result<ParsedDataset, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = HashMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let value = record.get(i).unwrap_or("").to_string();
            row.insert(header.clone(), value);
        }
        rows.push(row);
    }

    Ok(ParsedDataset { headers, rows })
}

/// Parses the first sheet of an XLSX workbook. Cell values are rendered
/// to strings so downstream code sees the same shape as CSV input.
pub fn parse_xlsx(bytes: &[u8]) -> Result<ParsedDataset, DatasetError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DatasetError::NoSheets)??;

    let mut row_iter = range.rows();
    let headers: Vec<String> = match row_iter.next() {
        Some(header_row) => header_row.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => return Err(DatasetError::MissingHeaders),
    };

    let mut rows = Vec::new();
    for cells in row_iter {
        let mut row = HashMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let value = cells.get(i).map(|c| c.to_string()).unwrap_or_default();
            row.insert(header.clone(), value);
        }
        rows.push(row);
    }

    Ok(ParsedDataset { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_csv() {
        let bytes = b"WireId,Amount,Memo\nw-1,100.50,\"hello, world\"\nw-2,7,plain\n";
        let parsed = parse_csv(bytes).unwrap();
        assert_eq!(parsed.headers, vec!["WireId", "Amount", "Memo"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0]["Memo"], "hello, world");
        assert_eq!(parsed.rows[1]["Amount"], "7");
    }

    #[test]
    fn short_records_are_padded() {
        let bytes = b"a,b,c\n1,2\n";
        let parsed = parse_csv(bytes).unwrap();
        assert_eq!(parsed.rows[0]["c"], "");
    }
}
