//! Holdout split of infectionator draws.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use seiir_artifact::{Store, WriteOutcome};
use seiir_config::{DrawId, HoldoutSpecification, InfectionColumns, LocationId};
use seiir_paths::{DrawFile, HoldoutPaths, InfectionPaths, ParameterPaths, StageLayout};
use seiir_series::{ParameterLookup, ParameterTable, TimeSeries, split};
use tracing::{debug, info, instrument, warn};

use crate::error::ExecutorError;
use crate::stage::fs_store;

/// What happened to one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
  /// Train and validation partitions were written.
  Written,
  /// The draw has no parameter file.
  Skipped,
  /// Both partitions were already present; nothing was written.
  AlreadyExists,
}

/// Per-location summary of a split.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitReport {
  pub location_id: LocationId,
  pub folder: String,
  pub written: Vec<DrawId>,
  pub skipped: Vec<DrawId>,
  pub already_present: Vec<DrawId>,
}

/// Splits infectionator draw files into train and validation partitions.
///
/// Output mirrors the input layout: the train partition keeps the draw file's
/// name and the validation partition is written next to it with a
/// `VALIDATION_` prefix.
#[derive(Clone)]
pub struct HoldoutSplitter {
  input: InfectionPaths,
  output: Arc<dyn Store>,
  parameters: ParameterPaths,
  columns: InfectionColumns,
  time_holdout: u32,
}

impl HoldoutSplitter {
  pub fn new(
    input: Arc<dyn Store>,
    output: Arc<dyn Store>,
    parameters: Arc<dyn Store>,
    columns: InfectionColumns,
    time_holdout: u32,
  ) -> Self {
    Self {
      input: InfectionPaths::new(input),
      output,
      parameters: ParameterPaths::new(parameters),
      columns,
      time_holdout,
    }
  }

  pub fn from_specification(spec: &HoldoutSpecification) -> Self {
    Self::new(
      fs_store(&spec.data.infection_version),
      fs_store(&spec.data.output_root),
      fs_store(&spec.data.parameter_version),
      spec.columns.clone(),
      spec.parameters.time_holdout,
    )
  }

  pub fn input(&self) -> &InfectionPaths {
    &self.input
  }

  pub fn output(&self) -> &Arc<dyn Store> {
    &self.output
  }

  /// Output layout for the given location folders.
  pub fn layout(&self, folders: BTreeMap<LocationId, String>) -> HoldoutPaths {
    HoldoutPaths::new(self.output.clone(), folders)
  }

  /// Split one draw file of a location folder.
  ///
  /// A draw without parameters is skipped. Partitions already present are
  /// left alone with a warning; a missing one is still written.
  #[instrument(skip(self, folder, file), fields(draw_id = file.draw_id))]
  pub async fn split_draw(
    &self,
    location_id: LocationId,
    folder: &str,
    file: &DrawFile,
  ) -> Result<DrawOutcome, ExecutorError> {
    let draw_id = file.draw_id;
    let raw_params = self
      .parameters
      .read_draw_params(draw_id)
      .await
      .map_err(ExecutorError::artifact(location_id))?;
    let params = match ParameterTable::lookup(raw_params)
      .map_err(ExecutorError::series(location_id, draw_id))?
    {
      ParameterLookup::Found(params) => params,
      ParameterLookup::NotFound => {
        info!(location_id, draw_id, "no parameters for draw, skipping");
        return Ok(DrawOutcome::Skipped);
      }
    };
    let day_shift = params
      .day_shift()
      .map_err(ExecutorError::series(location_id, draw_id))?;

    let train_key = InfectionPaths::draw_file(folder, &file.file_name);
    let validation_key = InfectionPaths::validation_file(folder, &file.file_name);
    if self.output.exists(&train_key).await? && self.output.exists(&validation_key).await? {
      warn!(key = %train_key, "output already exists");
      return Ok(DrawOutcome::AlreadyExists);
    }

    let data = self
      .input
      .store()
      .read(&train_key)
      .await
      .map_err(ExecutorError::artifact(location_id))?;
    let to_series = ExecutorError::series(location_id, draw_id);
    let partitions = TimeSeries::from_csv(&data, &self.columns.date)
      .and_then(|series| split(&series, &self.columns, self.time_holdout, day_shift))
      .map_err(to_series)?;
    let train = partitions
      .train
      .to_csv()
      .map_err(ExecutorError::series(location_id, draw_id))?;
    let validation = partitions
      .validation
      .to_csv()
      .map_err(ExecutorError::series(location_id, draw_id))?;

    // Validation goes first: a present train file implies a present
    // validation file, and either one missing is filled in on rerun.
    let mut written = false;
    for (key, data) in [(&validation_key, validation), (&train_key, train)] {
      match self.output.write_if_absent(key, Bytes::from(data)).await? {
        WriteOutcome::Written => written = true,
        WriteOutcome::AlreadyExists => warn!(key = %key, "output already exists"),
      }
    }
    if !written {
      return Ok(DrawOutcome::AlreadyExists);
    }

    debug!(
      split_date = %partitions.split_date,
      lag = partitions.lag,
      day_shift,
      train_rows = partitions.train.len(),
      validation_rows = partitions.validation.len(),
      "split draw"
    );
    Ok(DrawOutcome::Written)
  }

  /// Split every draw of one location.
  ///
  /// Fails before writing anything if the location's output folder already
  /// exists. Draws are processed in draw order; the first failing draw aborts
  /// the location, leaving earlier draws in place.
  #[instrument(skip(self))]
  pub async fn split_location(&self, location_id: LocationId) -> Result<SplitReport, ExecutorError> {
    let folder = self.input.resolve_location_folder(location_id).await?;
    let layout = self.layout(BTreeMap::from([(location_id, folder.clone())]));
    layout.make_dirs(&[location_id]).await?;

    let mut report = SplitReport {
      location_id,
      folder: folder.clone(),
      ..Default::default()
    };
    for file in self.input.draw_files(&folder).await? {
      match self.split_draw(location_id, &folder, &file).await? {
        DrawOutcome::Written => report.written.push(file.draw_id),
        DrawOutcome::Skipped => report.skipped.push(file.draw_id),
        DrawOutcome::AlreadyExists => report.already_present.push(file.draw_id),
      }
    }

    info!(
      location_id,
      folder = %folder,
      written = report.written.len(),
      skipped = report.skipped.len(),
      already_present = report.already_present.len(),
      "split location"
    );
    Ok(report)
  }
}
