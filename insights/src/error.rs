pub type Result<T, E = InsightsError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum InsightsError {
    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("malformed CSV: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    #[error("invalid amount '{value}' on line {line}")]
    InvalidAmount { line: u64, value: String },

    #[error("invalid date '{value}' on line {line}, expected YYYY-MM-DD")]
    InvalidDateValue { line: u64, value: String },

    /// A date range bound supplied by the caller could not be parsed.
    #[error("invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("CSV file contains no data")]
    EmptyTable,

    #[error("no product values to rank")]
    NoProducts,
}

impl InsightsError {
    /// Errors caused by request parameters rather than by the file contents.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::InvalidDate { .. })
    }

    pub fn is_missing_column(&self) -> bool {
        matches!(self, Self::MissingColumn { .. })
    }
}
