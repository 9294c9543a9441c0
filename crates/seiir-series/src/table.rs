//! Date-keyed table with named columns.

use chrono::NaiveDate;

use crate::error::SeriesError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One row of a [`TimeSeries`]. `cells` includes the date column verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
  pub date: NaiveDate,
  pub cells: Vec<String>,
}

/// A table keyed by date.
///
/// Columns other than the date column are kept as raw text, so a table
/// survives a read/write cycle unchanged apart from the columns a transform
/// touches.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
  columns: Vec<String>,
  date_index: usize,
  rows: Vec<Row>,
}

/// Parse an ISO date, ignoring any time component after the date.
fn parse_date(value: &str) -> Option<NaiveDate> {
  let value = value.trim();
  let head = value.get(..10).unwrap_or(value);
  NaiveDate::parse_from_str(head, DATE_FORMAT).ok()
}

impl TimeSeries {
  /// Create an empty table.
  pub fn new(columns: Vec<String>, date_column: &str) -> Result<Self, SeriesError> {
    let date_index = columns
      .iter()
      .position(|c| c == date_column)
      .ok_or_else(|| SeriesError::MissingColumn(date_column.to_string()))?;
    Ok(Self {
      columns,
      date_index,
      rows: Vec::new(),
    })
  }

  /// Parse a CSV table with a header row.
  pub fn from_csv(data: &[u8], date_column: &str) -> Result<Self, SeriesError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(data);
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut series = Self::new(columns, date_column)?;

    for record in reader.records() {
      let record = record?;
      series.push(record.iter().map(str::to_string).collect())?;
    }
    Ok(series)
  }

  /// Serialize as CSV with a header row.
  pub fn to_csv(&self) -> Result<Vec<u8>, SeriesError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(&self.columns)?;
    for row in &self.rows {
      writer.write_record(&row.cells)?;
    }
    writer
      .into_inner()
      .map_err(|e| SeriesError::Io(e.into_error()))
  }

  /// Append a row. The date cell is parsed; other cells are kept verbatim.
  pub fn push(&mut self, cells: Vec<String>) -> Result<(), SeriesError> {
    let row = self.rows.len();
    if cells.len() != self.columns.len() {
      return Err(SeriesError::RowWidth {
        row,
        found: cells.len(),
        expected: self.columns.len(),
      });
    }
    let date = parse_date(&cells[self.date_index]).ok_or_else(|| SeriesError::InvalidDate {
      row,
      value: cells[self.date_index].clone(),
    })?;
    self.rows.push(Row { date, cells });
    Ok(())
  }

  pub fn columns(&self) -> &[String] {
    &self.columns
  }

  pub fn date_column(&self) -> &str {
    &self.columns[self.date_index]
  }

  pub fn rows(&self) -> &[Row] {
    &self.rows
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
    self.rows.iter().map(|r| r.date)
  }

  /// Latest date in the table.
  pub fn max_date(&self) -> Option<NaiveDate> {
    self.dates().max()
  }

  /// Position of a named column.
  pub fn column_index(&self, name: &str) -> Result<usize, SeriesError> {
    self
      .columns
      .iter()
      .position(|c| c == name)
      .ok_or_else(|| SeriesError::MissingColumn(name.to_string()))
  }

  /// Numeric value of a cell. Empty and `NaN` cells read as `None`.
  pub fn number(&self, row: usize, column: usize) -> Result<Option<f64>, SeriesError> {
    let value = self.rows[row].cells[column].trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
      return Ok(None);
    }
    value
      .parse::<f64>()
      .map(Some)
      .map_err(|_| SeriesError::InvalidValue {
        column: self.columns[column].clone(),
        row,
        value: value.to_string(),
      })
  }

  /// Whole-day integer value of a cell (`5` and `5.0` both read as 5).
  pub fn whole_number(&self, row: usize, column: usize) -> Result<Option<i64>, SeriesError> {
    match self.number(row, column)? {
      None => Ok(None),
      Some(v) if v.is_finite() && v.fract() == 0.0 => Ok(Some(v as i64)),
      Some(_) => Err(SeriesError::InvalidValue {
        column: self.columns[column].clone(),
        row,
        value: self.rows[row].cells[column].clone(),
      }),
    }
  }

  /// Keep the rows for which `keep` returns true, in order.
  pub fn filter_rows(&self, mut keep: impl FnMut(usize, &Row) -> bool) -> Self {
    Self {
      columns: self.columns.clone(),
      date_index: self.date_index,
      rows: self
        .rows
        .iter()
        .enumerate()
        .filter(|(i, row)| keep(*i, row))
        .map(|(_, row)| row.clone())
        .collect(),
    }
  }

  /// Overwrite one cell in every row.
  pub fn fill_column(&mut self, column: usize, value: &str) {
    for row in &mut self.rows {
      row.cells[column] = value.to_string();
    }
  }

  /// Overwrite one cell in every row whose date satisfies `pred`.
  pub fn fill_column_where(
    &mut self,
    column: usize,
    value: &str,
    pred: impl Fn(NaiveDate) -> bool,
  ) {
    for row in self.rows.iter_mut().filter(|r| pred(r.date)) {
      row.cells[column] = value.to_string();
    }
  }

  /// Add a column in first position holding the same value on every row.
  pub fn with_leading_column(mut self, name: &str, value: &str) -> Self {
    self.columns.insert(0, name.to_string());
    self.date_index += 1;
    for row in &mut self.rows {
      row.cells.insert(0, value.to_string());
    }
    self
  }

  /// Stack tables on top of each other.
  ///
  /// Output columns are the union of input columns in first-seen order; a
  /// table lacking a column contributes empty cells. Row order is preserved.
  /// The date column name of the first table is used.
  pub fn concat(tables: &[TimeSeries]) -> Option<TimeSeries> {
    let first = tables.first()?;
    let mut columns: Vec<String> = Vec::new();
    for table in tables {
      for column in &table.columns {
        if !columns.contains(column) {
          columns.push(column.clone());
        }
      }
    }
    let date_index = columns.iter().position(|c| c == first.date_column())?;

    let mut rows = Vec::with_capacity(tables.iter().map(TimeSeries::len).sum());
    for table in tables {
      let mapping: Vec<Option<usize>> = columns
        .iter()
        .map(|c| table.columns.iter().position(|own| own == c))
        .collect();
      for row in &table.rows {
        let cells = mapping
          .iter()
          .map(|m| m.map(|i| row.cells[i].clone()).unwrap_or_default())
          .collect();
        rows.push(Row {
          date: row.date,
          cells,
        });
      }
    }

    Some(TimeSeries {
      columns,
      date_index,
      rows,
    })
  }

  pub(crate) fn from_parts(columns: Vec<String>, date_index: usize, rows: Vec<Row>) -> Self {
    Self {
      columns,
      date_index,
      rows,
    }
  }

  pub(crate) fn date_index(&self) -> usize {
    self.date_index
  }
}
