mod batch;
mod config;
mod grading;

use batch::Grader;
use std::{env, fs, path::PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = ".config/ved.toml";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = env::var("VED_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG));
    let cfg = config::Config::load(&config_path)?;
    let grader = Grader::from_config(&cfg);
    info!(
        config = %config_path.display(),
        codes = grader.catalog().len(),
        input = %cfg.input_dir.display(),
        output = %cfg.output_dir.display(),
        "Configuration loaded"
    );

    fs::create_dir_all(&cfg.output_dir)?;
    let files = batch::list_batches(&cfg.input_dir)?;
    let total = files.len();

    let mut failed = 0;
    for (i, path) in files.iter().enumerate() {
        // A bad file never stops the rest of the run
        match grader.process_file(path, &cfg.output_dir) {
            Ok((output, summary)) => {
                info!(
                    rows = summary.rows,
                    graded = summary.graded,
                    unmapped = summary.unmapped,
                    water_soluble = summary.water_soluble,
                    output = %output.display(),
                    "{}/{} done",
                    i + 1,
                    total
                );
            }
            Err(e) => {
                failed += 1;
                error!(file = %path.display(), error = %e, "Failed to process batch");
            }
        }
    }

    info!(files = total, failed, "All batches processed");
    Ok(())
}
