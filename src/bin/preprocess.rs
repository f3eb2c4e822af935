use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use faceword_prep::{init_file_logger, run_batch, DataLayout, PipelineConfig, SessionInfo};
use log::LevelFilter;

#[derive(Parser)]
#[command(
    name = "faceword-preprocess",
    about = "Preprocess the FaceWord EEG recordings into epochs"
)]
struct Args {
    /// Directory holding FaceWord_<participant>.vhdr; epochs go to <data-root>/preprocessed
    #[arg(long, default_value = "data")]
    data_root: PathBuf,

    /// Session info file with per-participant bad channels
    /// (default: <data-root>/session_info.txt)
    #[arg(long)]
    session_info: Option<PathBuf>,

    /// Log file, appended to
    #[arg(long, default_value = "preprocessing.log")]
    log_file: PathBuf,

    /// Log debug detail as well
    #[arg(long)]
    verbose: bool,
}

fn run(args: Args) -> Result<bool> {
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    init_file_logger(&args.log_file, level)?;

    let session_path = args
        .session_info
        .unwrap_or_else(|| args.data_root.join("session_info.txt"));
    let session = SessionInfo::load(&session_path)
        .with_context(|| format!("loading session info from {}", session_path.display()))?;

    let layout = DataLayout::new(&args.data_root);
    let report = run_batch(&session, &PipelineConfig::default(), &layout)?;
    print!("{report}");
    Ok(report.is_success())
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
