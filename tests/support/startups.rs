use std::path::{Path, PathBuf};

use profitboost::config::RunConfig;
use tempfile::TempDir;

pub const HEADER: &str = "R&D Spend,Administration,Marketing Spend,State,Profit";
const STATES: [&str; 3] = ["New York", "Florida", "California"];

/// Deterministic startup rows with profit driven mostly by R&D spend.
pub fn startup_rows(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let rd = 1_000.0 + ((i * 7_919) % 160_000) as f64;
            let admin = 50_000.0 + ((i * 3_571) % 100_000) as f64;
            let marketing = ((i * 12_553) % 450_000) as f64;
            let state = STATES[i % STATES.len()];
            let noise = ((i * 31) % 17) as f64 * 100.0;
            let profit = 40_000.0 + 0.8 * rd + 0.03 * marketing + noise;
            format!("{rd},{admin},{marketing},{state},{profit}")
        })
        .collect()
}

pub fn write_csv(path: &Path, header: &str, rows: &[String]) {
    let mut text = String::from(header);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    std::fs::write(path, text).expect("write csv");
}

/// Temp workspace holding a dataset and a tracking database.
pub struct RunHarness {
    pub dir: TempDir,
    pub config: RunConfig,
}

impl RunHarness {
    pub fn with_rows(rows: usize) -> Self {
        Self::with_csv(HEADER, &startup_rows(rows))
    }

    pub fn with_csv(header: &str, rows: &[String]) -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let dataset_path = dir.path().join("startups_profit.csv");
        write_csv(&dataset_path, header, rows);
        let db_path = dir.path().join("mydb.sqlite");
        let config = RunConfig {
            dataset_path,
            tracking_uri: format!("sqlite:///{}", db_path.display()),
            ..RunConfig::default()
        };
        Self { dir, config }
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("mydb.sqlite")
    }
}
