//! Developer utility to list runs recorded in a tracking store.

use clap::Parser;
use profitboost::config::RunConfig;
use profitboost::tracking::{TrackingStore, TrackingUri};

/// List runs with their status, params and latest metrics.
#[derive(Debug, Parser)]
#[command(name = "profitboost-runs", version, about)]
struct Args {
    /// Experiment to list; defaults to the configured experiment.
    #[arg(long)]
    experiment: Option<String>,
    /// Tracking store URI; defaults to the configured URI.
    #[arg(long = "tracking-uri", value_name = "URI")]
    tracking_uri: Option<String>,
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = RunConfig::load()?;
    let uri = TrackingUri::parse(args.tracking_uri.as_deref().unwrap_or(&config.tracking_uri))?;
    let experiment_name = args.experiment.unwrap_or(config.experiment_name);
    println!("DB: {}", uri.db_path().display());

    let store = TrackingStore::open_read_only(&uri)?;
    let Some(experiment) = store.experiment_by_name(&experiment_name)? else {
        println!("Experiment {experiment_name:?} not found");
        let names: Vec<String> = store
            .list_experiments()?
            .into_iter()
            .map(|experiment| experiment.name)
            .collect();
        if !names.is_empty() {
            println!("Known experiments: {}", names.join(", "));
        }
        return Ok(());
    };

    let runs = store.list_runs(experiment.experiment_id)?;
    println!(
        "Experiment {} (id {}): {} runs",
        experiment.name,
        experiment.experiment_id,
        runs.len()
    );
    for run in runs {
        println!();
        println!(
            "{}  {}  {}",
            run.run_id,
            run.status,
            run.run_name.as_deref().unwrap_or("-")
        );
        for (key, value) in store.params(&run.run_id)? {
            println!("  param  {key} = {value}");
        }
        for (key, value) in store.latest_metrics(&run.run_id)? {
            println!("  metric {key} = {value}");
        }
        println!("  artifacts {}", run.artifact_uri.display());
    }
    Ok(())
}
