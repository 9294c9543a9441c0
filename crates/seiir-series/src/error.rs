use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeriesError {
  #[error("column '{0}' not found")]
  MissingColumn(String),

  #[error("invalid value '{value}' in column '{column}' on row {row}")]
  InvalidValue {
    column: String,
    row: usize,
    value: String,
  },

  #[error("invalid date '{value}' on row {row}")]
  InvalidDate { row: usize, value: String },

  #[error("row {row} has {found} cells, expected {expected}")]
  RowWidth {
    row: usize,
    found: usize,
    expected: usize,
  },

  #[error("ambiguous lag: column '{column}' holds {values:?}, expected a single value")]
  AmbiguousLag { column: String, values: Vec<i64> },

  #[error("no lag value: column '{column}' is empty on an observed row or has no observed rows")]
  MissingLag { column: String },

  #[error("parameter '{0}' not found")]
  MissingParameterRow(String),

  #[error("invalid value for parameter '{name}': {value}")]
  InvalidParameter { name: String, value: String },

  #[error("duplicate date {date} in {segment} segment")]
  DuplicateDate {
    date: NaiveDate,
    segment: &'static str,
  },

  #[error("date arithmetic out of range")]
  DateOutOfRange,

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl SeriesError {
  /// Whether the input is inconsistent with the configuration (ambiguous or
  /// missing lag, unknown columns, malformed parameters), as opposed to a
  /// malformed file.
  pub fn is_configuration(&self) -> bool {
    matches!(
      self,
      SeriesError::MissingColumn(_)
        | SeriesError::AmbiguousLag { .. }
        | SeriesError::MissingLag { .. }
        | SeriesError::MissingParameterRow(_)
        | SeriesError::InvalidParameter { .. }
    )
  }
}
