use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::SeriesError;
use crate::table::{Row, TimeSeries};

fn index_by_date<'a>(
  series: &'a TimeSeries,
  segment: &'static str,
) -> Result<BTreeMap<NaiveDate, &'a Row>, SeriesError> {
  let mut by_date = BTreeMap::new();
  for row in series.rows() {
    if by_date.insert(row.date, row).is_some() {
      return Err(SeriesError::DuplicateDate {
        date: row.date,
        segment,
      });
    }
  }
  Ok(by_date)
}

/// Merge a draw's historical segment with its forecast into one series.
///
/// Output columns are the historical columns followed by the forecast
/// columns the history lacks. Rows are sorted by date with one row per date.
/// Where both segments cover a date the historical cells win and the
/// forecast only contributes its extra columns. Cells a segment has no value
/// for are left empty.
pub fn splice(historical: &TimeSeries, forecast: &TimeSeries) -> Result<TimeSeries, SeriesError> {
  let history = index_by_date(historical, "historical")?;
  let projected = index_by_date(forecast, "forecast")?;

  let mut columns = historical.columns().to_vec();
  let forecast_only: Vec<usize> = forecast
    .columns()
    .iter()
    .enumerate()
    .filter(|(i, name)| *i != forecast.date_index() && !columns.contains(*name))
    .map(|(i, _)| i)
    .collect();
  columns.extend(forecast_only.iter().map(|&i| forecast.columns()[i].clone()));

  // Position of each historical column in the forecast table, if shared.
  let shared: Vec<Option<usize>> = historical
    .columns()
    .iter()
    .enumerate()
    .map(|(i, name)| {
      if i == historical.date_index() {
        Some(forecast.date_index())
      } else {
        forecast.columns().iter().position(|c| c == name)
      }
    })
    .collect();

  let mut dates: Vec<NaiveDate> = history.keys().chain(projected.keys()).copied().collect();
  dates.sort_unstable();
  dates.dedup();

  let mut rows = Vec::with_capacity(dates.len());
  for date in dates {
    let forecast_row = projected.get(&date);
    let mut cells: Vec<String> = match history.get(&date) {
      Some(row) => row.cells.clone(),
      None => {
        // Dates only reach here from one of the two maps.
        let Some(row) = forecast_row else { continue };
        shared
          .iter()
          .map(|m| m.map(|i| row.cells[i].clone()).unwrap_or_default())
          .collect()
      }
    };
    cells.extend(
      forecast_only
        .iter()
        .map(|&i| forecast_row.map(|row| row.cells[i].clone()).unwrap_or_default()),
    );
    rows.push(Row { date, cells });
  }

  Ok(TimeSeries::from_parts(
    columns,
    historical.date_index(),
    rows,
  ))
}
