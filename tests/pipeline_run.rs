mod support;

use std::collections::BTreeSet;

use profitboost::TrainerError;
use profitboost::cli::HyperParams;
use profitboost::dataset::DatasetError;
use profitboost::tracking::{RunStatus, TrackingStore, TrackingUri};
use profitboost::pipeline;
use support::startups::{HEADER, RunHarness, startup_rows};

fn params(n_estimators: usize, max_depth: usize) -> HyperParams {
    HyperParams {
        n_estimators,
        max_depth,
    }
}

fn open_store(harness: &RunHarness) -> TrackingStore {
    let uri = TrackingUri::parse(&harness.config.tracking_uri).expect("parse uri");
    TrackingStore::open(&uri, None).expect("open store")
}

#[test]
fn valid_run_logs_params_metrics_and_finishes() {
    let harness = RunHarness::with_rows(100);
    let summary = pipeline::run(&harness.config, &params(50, 3)).expect("run succeeds");

    assert_eq!(summary.train_rows, 70);
    assert_eq!(summary.test_rows, 30);
    assert_eq!(summary.metrics.example_count, 30);
    assert!(summary.metrics.mean_absolute_error.is_finite());
    assert!(summary.metrics.mean_absolute_error >= 0.0);
    assert_eq!(summary.model_uri, format!("runs:/{}/model", summary.run_id));

    let store = open_store(&harness);
    let experiment = store
        .experiment_by_name("PotentialStartups")
        .unwrap()
        .expect("experiment created");
    let runs = store.list_runs(experiment.experiment_id).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, summary.run_id);
    assert_eq!(runs[0].status, RunStatus::Finished);

    let logged = store.params(&summary.run_id).unwrap();
    assert_eq!(logged["n_estimators"], "50");
    assert_eq!(logged["max_depth"], "3");

    let metrics = store.latest_metrics(&summary.run_id).unwrap();
    assert_eq!(metrics["example_count"], 30.0);
    assert_eq!(
        metrics["mean_absolute_error"],
        summary.metrics.mean_absolute_error
    );
    assert_eq!(
        store
            .metric_history(&summary.run_id, "train-rmse")
            .unwrap()
            .len(),
        50
    );

    let artifacts: BTreeSet<String> = store
        .artifacts(&summary.run_id)
        .unwrap()
        .into_iter()
        .map(|entry| entry.path)
        .collect();
    for expected in [
        "model/model.json",
        "model/MLmodel.json",
        "eval_results_table.json",
        "feature_importance_gain.json",
    ] {
        assert!(artifacts.contains(expected), "missing artifact {expected}");
    }

    let model = store.load_model(&summary.model_uri).unwrap();
    assert_eq!(model.trees.len(), 50);
    assert!(model.trees.iter().all(|tree| tree.depth() <= 3));
    assert_eq!(
        model.feature_names,
        ["R&D Spend", "Administration", "Marketing Spend", "State"]
    );
}

#[test]
fn repeated_runs_are_deterministic() {
    let harness = RunHarness::with_rows(60);
    let first = pipeline::run(&harness.config, &params(20, 4)).unwrap();
    let second = pipeline::run(&harness.config, &params(20, 4)).unwrap();
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.metrics, second.metrics);

    let store = open_store(&harness);
    let a = store.load_model(&first.model_uri).unwrap();
    let b = store.load_model(&second.model_uri).unwrap();
    assert_eq!(a, b);
}

#[test]
fn missing_target_column_is_a_data_error_without_a_run() {
    let rows: Vec<String> = startup_rows(20)
        .into_iter()
        .map(|row| row.rsplit_once(',').unwrap().0.to_string())
        .collect();
    let harness = RunHarness::with_csv("R&D Spend,Administration,Marketing Spend,State", &rows);
    let err = pipeline::run(&harness.config, &params(50, 3)).unwrap_err();
    assert!(matches!(
        err,
        TrainerError::Data(DatasetError::MissingColumn { ref column, .. }) if column == "Profit"
    ));
    assert!(!harness.db_path().exists());
}

#[test]
fn unknown_region_fails_fast() {
    let mut rows = startup_rows(20);
    rows[4] = rows[4].replace("Florida", "Texas");
    let harness = RunHarness::with_csv(HEADER, &rows);
    let err = pipeline::run(&harness.config, &params(10, 2)).unwrap_err();
    assert!(matches!(
        err,
        TrainerError::Data(DatasetError::UnknownRegion { row: 4, .. })
    ));
    assert!(!harness.db_path().exists());
}

#[test]
fn missing_dataset_is_a_file_error() {
    let mut harness = RunHarness::with_rows(10);
    harness.config.dataset_path = harness.dir.path().join("absent.csv");
    let err = pipeline::run(&harness.config, &params(10, 2)).unwrap_err();
    assert!(matches!(err, TrainerError::File(_)));
}

#[test]
fn non_numeric_depth_is_an_argument_error() {
    let err = HyperParams::parse("50", "abc").unwrap_err();
    assert!(matches!(
        err,
        TrainerError::Argument {
            name: "max_depth",
            ..
        }
    ));
}

#[test]
fn oversized_round_count_fails_the_run_instead_of_panicking() {
    let harness = RunHarness::with_rows(20);
    let params = HyperParams::parse(&usize::MAX.to_string(), "3").unwrap();
    let err = pipeline::run(&harness.config, &params).unwrap_err();
    assert!(matches!(err, TrainerError::ModelFit(_)));

    let store = open_store(&harness);
    let experiment = store
        .experiment_by_name("PotentialStartups")
        .unwrap()
        .expect("experiment created");
    let runs = store.list_runs(experiment.experiment_id).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
}

#[test]
fn unsupported_tracking_uri_is_a_store_error() {
    let mut harness = RunHarness::with_rows(20);
    harness.config.tracking_uri = "http://localhost:5000".to_string();
    let err = pipeline::run(&harness.config, &params(10, 2)).unwrap_err();
    assert!(matches!(err, TrainerError::TrackingStore(_)));
}

#[test]
fn failure_inside_the_run_marks_it_failed() {
    let mut harness = RunHarness::with_rows(30);
    let blocked = harness.dir.path().join("blocked");
    std::fs::write(&blocked, b"not a directory").unwrap();
    harness.config.artifact_root = Some(blocked.clone());

    let err = pipeline::run(&harness.config, &params(5, 2)).unwrap_err();
    assert!(matches!(err, TrainerError::TrackingStore(_)));

    let uri = TrackingUri::parse(&harness.config.tracking_uri).unwrap();
    let store = TrackingStore::open(&uri, Some(&blocked)).unwrap();
    let experiment = store
        .experiment_by_name("PotentialStartups")
        .unwrap()
        .expect("experiment created");
    let runs = store.list_runs(experiment.experiment_id).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert!(runs[0].end_time.is_some());
}
