use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use video_script::config::Config;
use video_script::generator::{RunOptions, run_generation};
use video_script::init;

/// Builds a narrated compilation video from the Audio, Images, LongVideo and Music folders.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// JSON settings; defaults are used when the file is absent
    #[arg(long, default_value = "video_script.json")]
    config: PathBuf,

    /// Folder holding the four input folders
    #[arg(long)]
    root: Option<PathBuf>,

    /// Output video file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    yes: bool,

    /// Validate and show the plan without rendering
    #[arg(long)]
    dry_run: bool,

    /// Seed for choosing the first music track
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load_or_default(&args.config).await?;
    if let Some(root) = args.root {
        cfg.input_root = root;
    }
    if let Some(output) = args.output {
        cfg.output = output;
    }

    let missing = init::missing_tools().await;
    if !missing.is_empty() {
        tracing::warn!("Not found in PATH: {}. Please install FFmpeg.", missing.join(", "));
    }

    let opts = RunOptions {
        assume_yes: args.yes,
        dry_run: args.dry_run,
        seed: args.seed,
    };
    if let Some(out) = run_generation(&cfg, &opts).await? {
        println!("{}", out.display());
    }
    Ok(())
}
