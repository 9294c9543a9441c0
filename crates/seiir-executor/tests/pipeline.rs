//! Stage drivers against a real directory tree.

use std::path::{Path, PathBuf};

use seiir_config::{
  FitSpecification, ForecastSpecification, HoldoutSpecification, RegressionSpecification,
  Specification,
};
use seiir_executor::{
  ForecastStage, HoldoutStage, RegressionStage, SpliceInputs, ensure_success,
};
use seiir_workflow::{TaskId, TaskStatus};
use tokio_util::sync::CancellationToken;

fn write(path: &Path, content: &str) {
  std::fs::create_dir_all(path.parent().unwrap()).unwrap();
  std::fs::write(path, content).unwrap();
}

fn infection_csv(days: u32) -> String {
  let mut csv = String::from("date,obs_deaths,obs_infecs,i_d_lag,deaths\n");
  for day in 1..=days {
    csv.push_str(&format!("2020-04-{day:02},1,1,3,{day}\n"));
  }
  csv
}

fn write_infections(root: &Path, folder: &str, n_draws: u32, days: u32) {
  for draw_id in 0..n_draws {
    write(
      &root.join(folder).join(format!("draw{draw_id:04}_prepped.csv")),
      &infection_csv(days),
    );
  }
}

fn holdout_spec(root: &Path, n_draws: u32) -> PathBuf {
  let path = root.join("holdout.yaml");
  write(
    &path,
    &format!(
      "data:\n  infection_version: {}\n  parameter_version: {}\n  output_root: {}\nparameters:\n  time_holdout: 5\n  n_draws: {n_draws}\nworkflow:\n  max_concurrency: 3\n",
      root.join("infections").display(),
      root.join("params").display(),
      root.join("holdout").display(),
    ),
  );
  path
}

#[tokio::test]
async fn test_holdout_skips_draw_without_parameters() {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path();
  write_infections(&root.join("infections"), "kinshasa_170", 10, 20);
  for draw_id in (0..10).filter(|&d| d != 7) {
    write(
      &root.join("params").join(format!("params_draw_{draw_id}.csv")),
      "params,values\nday_shift,2\n",
    );
  }

  let spec = HoldoutSpecification::from_path(holdout_spec(root, 10)).unwrap();
  let stage = HoldoutStage::from_specification(spec);
  let report = stage.run(CancellationToken::new()).await.unwrap();

  assert_eq!(report.count(TaskStatus::Done), 9);
  assert_eq!(report.count(TaskStatus::Skipped), 1);
  assert_eq!(
    report.status(&TaskId::from("holdout_l170_d7")),
    Some(TaskStatus::Skipped)
  );
  let report = ensure_success(HoldoutStage::WORKFLOW, report).unwrap();
  assert_eq!(report.tasks.len(), 10);

  let output = root.join("holdout").join("kinshasa_170");
  assert!(output.join("draw0000_prepped.csv").is_file());
  assert!(output.join("VALIDATION_draw0000_prepped.csv").is_file());
  assert!(!output.join("draw0007_prepped.csv").exists());
  assert!(root.join("holdout").join(HoldoutSpecification::FILE_NAME).is_file());

  let train = std::fs::read_to_string(output.join("draw0003_prepped.csv")).unwrap();
  assert_eq!(train.lines().count(), 16);
}

#[tokio::test]
async fn test_holdout_rerun_conflicts() {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path();
  write_infections(&root.join("infections"), "kinshasa_170", 2, 20);
  for draw_id in 0..2 {
    write(
      &root.join("params").join(format!("params_draw_{draw_id}.csv")),
      "params,values\nday_shift,1\n",
    );
  }
  let spec = HoldoutSpecification::from_path(holdout_spec(root, 2)).unwrap();

  HoldoutStage::from_specification(spec.clone())
    .run(CancellationToken::new())
    .await
    .unwrap();
  let train = root.join("holdout/kinshasa_170/draw0000_prepped.csv");
  let before = std::fs::read(&train).unwrap();

  let err = HoldoutStage::from_specification(spec)
    .run(CancellationToken::new())
    .await
    .unwrap_err();
  assert!(err.is_conflict());
  assert_eq!(std::fs::read(&train).unwrap(), before);
}

/// Lay out a recorded ODE fit over `infections/` with locations 102 and 523.
fn write_fit(root: &Path, n_draws: u32) -> PathBuf {
  let fit_root = root.join("fit");
  write(
    &fit_root.join(FitSpecification::FILE_NAME),
    &format!(
      "data:\n  infection_version: {}\n  output_root: {}\nparameters:\n  n_draws: {n_draws}\n",
      root.join("infections").display(),
      fit_root.display(),
    ),
  );
  for location_id in [102, 523] {
    write_infections(
      &root.join("infections"),
      &format!("place_{location_id}"),
      n_draws,
      10,
    );
    write(
      &fit_root.join(format!("betas/{location_id}/fit_draw_0.csv")),
      "date,beta\n",
    );
  }
  fit_root
}

fn regression_yaml(root: &Path, program: &str, n_draws: u32) -> String {
  format!(
    "data:\n  ode_fit_version: {}\n  covariate_version: {}\n  output_root: {}\nparameters:\n  n_draws: {n_draws}\ncovariates:\n  mobility:\n    order: 1\nworkflow:\n  program: '{program}'\n",
    root.join("fit").display(),
    root.join("covariates").display(),
    root.join("regression").display(),
  )
}

fn forecast_yaml(root: &Path, program: &str) -> String {
  format!(
    "data:\n  regression_version: {}\n  covariate_version: {}\n  output_root: {}\nworkflow:\n  program: '{program}'\n",
    root.join("regression").display(),
    root.join("covariates").display(),
    root.join("forecast").display(),
  )
}

#[tokio::test]
async fn test_splice_from_recorded_versions() {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path();
  write_fit(root, 2);
  write(
    &root.join("regression").join(RegressionSpecification::FILE_NAME),
    &regression_yaml(root, "true", 2),
  );
  write(
    &root.join("forecast").join(ForecastSpecification::FILE_NAME),
    &forecast_yaml(root, "true"),
  );
  for draw_id in 0..2 {
    write(
      &root.join(format!("forecast/component_draws/102/draw_{draw_id}.csv")),
      "date,beta\n2020-04-10,0.7\n2020-04-11,0.6\n",
    );
  }

  let inputs =
    SpliceInputs::from_versions(&root.join("regression"), &root.join("forecast")).unwrap();
  assert_eq!(inputs.n_draws(), 2);
  inputs.splice_location(102).await.unwrap();

  let spliced = std::fs::read_to_string(root.join("forecast/spliced/102.csv")).unwrap();
  let mut lines = spliced.lines();
  assert_eq!(
    lines.next(),
    Some("draw,date,obs_deaths,obs_infecs,i_d_lag,deaths,beta")
  );
  // 10 history days plus one forecast-only day, per draw.
  assert_eq!(lines.count(), 22);
}

#[tokio::test]
async fn test_splice_reads_fit_column_names() {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path();
  write(
    &root.join("fit").join(FitSpecification::FILE_NAME),
    &format!(
      "data:\n  infection_version: {}\n  output_root: {}\nparameters:\n  n_draws: 1\ncolumns:\n  date: day\n",
      root.join("infections").display(),
      root.join("fit").display(),
    ),
  );
  write(
    &root.join("infections/place_102/draw0000_prepped.csv"),
    &infection_csv(3).replacen("date,", "day,", 1),
  );
  write(
    &root.join("regression").join(RegressionSpecification::FILE_NAME),
    &regression_yaml(root, "true", 1),
  );
  write(
    &root.join("forecast").join(ForecastSpecification::FILE_NAME),
    &forecast_yaml(root, "true"),
  );
  write(
    &root.join("forecast/component_draws/102/draw_0.csv"),
    "day,beta\n2020-04-03,0.7\n2020-04-04,0.6\n",
  );

  let inputs =
    SpliceInputs::from_versions(&root.join("regression"), &root.join("forecast")).unwrap();
  inputs.splice_location(102).await.unwrap();

  let spliced = std::fs::read_to_string(root.join("forecast/spliced/102.csv")).unwrap();
  let mut lines = spliced.lines();
  assert_eq!(
    lines.next(),
    Some("draw,day,obs_deaths,obs_infecs,i_d_lag,deaths,beta")
  );
  assert_eq!(lines.count(), 4);
}

#[tokio::test]
async fn test_splice_missing_regression_reference() {
  let dir = tempfile::tempdir().unwrap();
  let err = SpliceInputs::from_versions(&dir.path().join("regression"), &dir.path().join("forecast"))
    .err()
    .unwrap();
  assert!(err.is_configuration());
}

#[cfg(unix)]
#[tokio::test]
async fn test_regression_then_forecast() {
  use std::os::unix::fs::PermissionsExt;

  let dir = tempfile::tempdir().unwrap();
  let root = dir.path();
  write_fit(root, 2);
  write(&root.join("covariates/mobility/mobility_info.csv"), "location_id,value\n");

  let regression_path = root.join("regression.yaml");
  write(&regression_path, &regression_yaml(root, "true", 2));
  let regression = RegressionSpecification::from_path(&regression_path).unwrap();
  let report = RegressionStage::from_specification(regression)
    .unwrap()
    .run(CancellationToken::new())
    .await
    .unwrap();
  ensure_success(RegressionStage::WORKFLOW, report).unwrap();
  assert!(root.join("regression/info/mobility_info.csv").is_file());
  assert!(root.join("regression/beta/523").is_dir());

  // Stand-in forecast program: writes a two-day component draw.
  let program = root.join("forecast.sh");
  write(
    &program,
    "#!/bin/sh\nprintf 'date,beta\\n2020-04-10,0.7\\n2020-04-11,0.6\\n' > \"$6/component_draws/$2/draw_$4.csv\"\n",
  );
  std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

  let forecast_path = root.join("forecast.yaml");
  write(&forecast_path, &forecast_yaml(root, &program.display().to_string()));
  let forecast = ForecastSpecification::from_path(&forecast_path).unwrap();
  let report = ForecastStage::from_specification(forecast)
    .unwrap()
    .run(CancellationToken::new())
    .await
    .unwrap();
  let report = ensure_success(ForecastStage::WORKFLOW, report).unwrap();
  assert_eq!(report.count(TaskStatus::Done), 6);

  for location_id in [102, 523] {
    let spliced =
      std::fs::read_to_string(root.join(format!("forecast/spliced/{location_id}.csv"))).unwrap();
    assert_eq!(spliced.lines().count(), 23);
  }
}
