use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::{error, info, warn};

use reelsmith::{
    config::RunConfig,
    engine,
    logging,
    pipeline::VideoPipeline,
    story::{load_stories, Story},
};

/// Config or story list unreadable, or logging could not start
const EXIT_FATAL: u8 = 3;
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(
    name = "reelsmith",
    version,
    about = "Turn narration scripts and scene prompts into captioned vertical videos",
    long_about = "Reelsmith reads a list of stories, narrates each one with text-to-speech, illustrates every scene with a diffusion model, assembles a Ken-Burns slideshow over the narration and background music, and burns word-level captions into the result."
)]
struct Cli {
    /// Run configuration (JSON, or TOML by extension)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Story list, overriding `stories_file` from the configuration
    #[arg(short, long)]
    stories: Option<PathBuf>,

    /// Output directory, overriding `output_dir` from the configuration
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Directory for the run log
    #[arg(short, long, default_value = "logs")]
    log_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Load and check everything the batch needs before the first story starts
fn prepare(cli: &Cli) -> Result<(RunConfig, Vec<Story>)> {
    info!("Loading configuration from {:?}", cli.config);
    let mut config = RunConfig::from_file(&cli.config).map_err(|e| anyhow!(e.user_message()))?;

    if let Some(stories) = &cli.stories {
        config.stories_file = stories.clone();
    }
    if let Some(output_dir) = &cli.output_dir {
        config.output_dir = output_dir.clone();
    }
    config.validate().map_err(|e| anyhow!(e.user_message()))?;

    info!("Loading stories from {:?}", config.stories_file);
    let stories = load_stories(&config.stories_file).map_err(|e| anyhow!(e.user_message()))?;
    info!("✓ {} stories loaded", stories.len());

    Ok((config, stories))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_file = match logging::init(&cli.log_dir, cli.verbose) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    info!("Starting Reelsmith v{}", env!("CARGO_PKG_VERSION"));
    info!("Log file: {}", log_file.display());

    let (config, stories) = match prepare(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("❌ {:#}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    if !engine::is_available(&config.engines.ffmpeg_binary, "-version").await {
        warn!(
            "'{}' could not be started; video assembly will fail. {}",
            config.engines.ffmpeg_binary,
            engine::install_hint("ffmpeg")
        );
    }

    let pipeline = match VideoPipeline::from_config(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("❌ {}", e.user_message());
            return ExitCode::from(EXIT_FATAL);
        }
    };

    tokio::select! {
        summary = pipeline.run_batch(&stories) => {
            summary.log_report();
            ExitCode::from(summary.outcome().exit_code() as u8)
        }
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("");
            warn!("⚠️  Interrupted by user");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}
