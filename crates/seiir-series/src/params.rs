use std::collections::BTreeMap;

use crate::error::SeriesError;

/// Name of the per-draw day shift parameter.
pub const DAY_SHIFT: &str = "day_shift";

const NAME_COLUMN: &str = "params";
const VALUE_COLUMN: &str = "values";

/// Result of looking up a draw's parameters.
///
/// A draw without a parameter file is expected for some draws and is not an
/// error; callers skip the draw on `NotFound`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterLookup<T> {
  Found(T),
  NotFound,
}

/// Per-draw scalar parameters, read from a `params,values` table.
///
/// When a name appears on several rows the first row wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterTable {
  values: BTreeMap<String, String>,
}

impl ParameterTable {
  pub fn from_csv(data: &[u8]) -> Result<Self, SeriesError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(data);
    let headers = reader.headers()?.clone();
    let position = |name: &str| {
      headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| SeriesError::MissingColumn(name.to_string()))
    };
    let name_index = position(NAME_COLUMN)?;
    let value_index = position(VALUE_COLUMN)?;

    let mut values = BTreeMap::new();
    for record in reader.records() {
      let record = record?;
      if let (Some(name), Some(value)) = (record.get(name_index), record.get(value_index)) {
        values
          .entry(name.trim().to_string())
          .or_insert_with(|| value.trim().to_string());
      }
    }
    Ok(Self { values })
  }

  /// Parse a looked-up parameter file, keeping `NotFound` as is.
  pub fn lookup(data: Option<impl AsRef<[u8]>>) -> Result<ParameterLookup<Self>, SeriesError> {
    match data {
      Some(data) => Self::from_csv(data.as_ref()).map(ParameterLookup::Found),
      None => Ok(ParameterLookup::NotFound),
    }
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.values.get(name).map(String::as_str)
  }

  /// A parameter holding a whole number of days.
  pub fn whole_days(&self, name: &str) -> Result<i64, SeriesError> {
    let raw = self
      .get(name)
      .ok_or_else(|| SeriesError::MissingParameterRow(name.to_string()))?;
    let invalid = || SeriesError::InvalidParameter {
      name: name.to_string(),
      value: raw.to_string(),
    };
    let value: f64 = raw.parse().map_err(|_| invalid())?;
    if !value.is_finite() || value.fract() != 0.0 {
      return Err(invalid());
    }
    Ok(value as i64)
  }

  pub fn day_shift(&self) -> Result<i64, SeriesError> {
    self.whole_days(DAY_SHIFT)
  }
}
