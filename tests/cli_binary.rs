mod support;

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use support::startups::{HEADER, startup_rows, write_csv};
use tempfile::tempdir;

/// `profitboost` isolated to `workdir`, reading `dataset`.
fn profitboost(workdir: &Path, dataset: &Path) -> Command {
    let db_path = workdir.join("mydb.sqlite");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_profitboost"));
    cmd.current_dir(workdir)
        .env_remove("PROFITBOOST_CONFIG")
        .env_remove("PROFITBOOST_EXPERIMENT")
        .env_remove("PROFITBOOST_ARTIFACT_ROOT")
        .env("PROFITBOOST_HOME", workdir.join("home"))
        .env("PROFITBOOST_DATASET", dataset)
        .env(
            "PROFITBOOST_TRACKING_URI",
            format!("sqlite:///{}", db_path.display()),
        );
    cmd
}

#[test]
fn bad_depth_is_reported_before_the_dataset_is_touched() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent.csv");

    profitboost(dir.path(), &missing)
        .args(["--n_estimators", "50", "--max_depth", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid argument --max_depth"))
        .stderr(predicate::str::contains("absent.csv").not());
    assert!(!dir.path().join("mydb.sqlite").exists());
}

#[test]
fn valid_arguments_train_and_print_the_model_uri() {
    let dir = tempdir().unwrap();
    let dataset = dir.path().join("startups_profit.csv");
    write_csv(&dataset, HEADER, &startup_rows(50));

    profitboost(dir.path(), &dataset)
        .args(["--n_estimators", "10", "--max_depth", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Model: runs:/"))
        .stdout(predicate::str::contains("Rows: 35 train / 15 test"));
    assert!(dir.path().join("mydb.sqlite").exists());
}
