use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use seiir_config::InfectionColumns;

use crate::error::SeriesError;
use crate::table::TimeSeries;

const OBSERVED: &str = "1";
const UNOBSERVED: &str = "0";

/// Train and validation windows of one draw's series.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldoutSplit {
  pub split_date: NaiveDate,
  pub lag: i64,
  pub train: TimeSeries,
  pub validation: TimeSeries,
}

fn shift_back(date: NaiveDate, days: i64) -> Result<NaiveDate, SeriesError> {
  let shifted = if days >= 0 {
    date.checked_sub_days(Days::new(days as u64))
  } else {
    date.checked_add_days(Days::new(days.unsigned_abs()))
  };
  shifted.ok_or(SeriesError::DateOutOfRange)
}

/// Rows whose death flag is exactly 1. Empty and `NaN` flags are unobserved.
fn observed_rows(
  series: &TimeSeries,
  columns: &InfectionColumns,
) -> Result<TimeSeries, SeriesError> {
  let deaths = series.column_index(&columns.observed_deaths)?;
  let mut keep = Vec::with_capacity(series.len());
  for row in 0..series.len() {
    keep.push(series.number(row, deaths)? == Some(1.0));
  }
  Ok(series.filter_rows(|i, _| keep[i]))
}

/// The single lag value of a series, read from the lag column.
///
/// Every row must carry a lag; an empty or `NaN` cell is a missing lag.
pub fn draw_lag(series: &TimeSeries, columns: &InfectionColumns) -> Result<i64, SeriesError> {
  let lag_column = series.column_index(&columns.lag)?;
  let mut values = BTreeSet::new();
  for row in 0..series.len() {
    let lag = series
      .whole_number(row, lag_column)?
      .ok_or_else(|| SeriesError::MissingLag {
        column: columns.lag.clone(),
      })?;
    values.insert(lag);
  }

  let mut iter = values.iter();
  match (iter.next(), iter.next()) {
    (Some(lag), None) => Ok(*lag),
    (None, _) => Err(SeriesError::MissingLag {
      column: columns.lag.clone(),
    }),
    _ => Err(SeriesError::AmbiguousLag {
      column: columns.lag.clone(),
      values: values.into_iter().collect(),
    }),
  }
}

/// Split a draw's series into a train window and a blinded validation window.
///
/// Only rows with an observed death flag take part. The split date is the
/// last observed date minus `holdout_days`; rows on or before it are train,
/// later rows are validation. In the train window, deaths on or before
/// `split_date - day_shift` and cases on or before
/// `split_date - day_shift - lag` are marked unobserved, everything else
/// observed. Every validation row is unobserved for both.
///
/// An empty train window is a valid result when the holdout covers the whole
/// series.
pub fn split(
  series: &TimeSeries,
  columns: &InfectionColumns,
  holdout_days: u32,
  day_shift: i64,
) -> Result<HoldoutSplit, SeriesError> {
  let observed = observed_rows(series, columns)?;
  let lag = draw_lag(&observed, columns)?;
  let deaths = observed.column_index(&columns.observed_deaths)?;
  let cases = observed.column_index(&columns.observed_cases)?;

  let end_date = observed.max_date().ok_or_else(|| SeriesError::MissingLag {
    column: columns.lag.clone(),
  })?;
  let split_date = shift_back(end_date, i64::from(holdout_days))?;
  let deaths_cutoff = shift_back(split_date, day_shift)?;
  let cases_cutoff = shift_back(deaths_cutoff, lag)?;

  let mut train = observed.filter_rows(|_, row| row.date <= split_date);
  let mut validation = observed.filter_rows(|_, row| row.date > split_date);

  train.fill_column(deaths, OBSERVED);
  train.fill_column(cases, OBSERVED);
  train.fill_column_where(deaths, UNOBSERVED, |date| date <= deaths_cutoff);
  train.fill_column_where(cases, UNOBSERVED, |date| date <= cases_cutoff);

  validation.fill_column(deaths, UNOBSERVED);
  validation.fill_column(cases, UNOBSERVED);

  Ok(HoldoutSplit {
    split_date,
    lag,
    train,
    validation,
  })
}
