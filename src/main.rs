//! Train, autolog and evaluate one profit model.

use clap::Parser;
use profitboost::cli::{Args, HyperParams};
use profitboost::config::RunConfig;
use profitboost::{TrainerError, logging, pipeline};

fn main() {
    let args = Args::parse();
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run(&args) {
        tracing::error!("{err}");
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), TrainerError> {
    let params = HyperParams::try_from(args)?;
    let config = RunConfig::load()?;
    let summary = pipeline::run(&config, &params)?;

    println!("Run {} finished", summary.run_id);
    println!("Model: {}", summary.model_uri);
    println!(
        "Rows: {} train / {} test",
        summary.train_rows, summary.test_rows
    );
    for (name, value) in summary.metrics.entries() {
        println!("  {name}: {value}");
    }
    Ok(())
}
