use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset is empty")]
    Empty,

    #[error("Dataset has no header row")]
    MissingHeaders,

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX parse error: {0}")]
    Xlsx(#[from] calamine::XlsxError),

    #[error("XLSX workbook has no sheets")]
    NoSheets,
}
