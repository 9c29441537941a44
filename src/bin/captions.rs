use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::{error, info};

use reelsmith::{
    captions::{CaptionGenerator, TranscriptionTask},
    config::RunConfig,
    logging,
};

#[derive(Parser)]
#[command(
    name = "reelsmith-captions",
    version,
    about = "Transcribe a video and burn word-level captions into it"
)]
struct Cli {
    /// Video to caption
    input: PathBuf,

    /// Captioned video to write
    output: PathBuf,

    /// Same as --translate, given positionally
    #[arg(value_name = "TRANSLATE", action = clap::ArgAction::Set, value_parser = parse_yes_no)]
    translate_word: Option<bool>,

    /// Translate the captions to English: yes/sim or no/nao; anything else means no
    #[arg(short, long, default_value = "yes", action = clap::ArgAction::Set, value_parser = parse_yes_no)]
    translate: bool,

    /// Run configuration supplying caption style and engine paths
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn wants_translation(&self) -> bool {
        self.translate_word.unwrap_or(self.translate)
    }
}

/// Only an explicit yes turns translation on
fn parse_yes_no(value: &str) -> std::result::Result<bool, String> {
    Ok(matches!(
        value.trim().to_lowercase().as_str(),
        "yes" | "y" | "sim" | "s" | "true" | "1"
    ))
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            RunConfig::from_file(path).map_err(|e| anyhow!(e.user_message()))?
        }
        None => RunConfig::default(),
    };

    let generator = CaptionGenerator::from_config(&config).map_err(|e| anyhow!(e.user_message()))?;
    let report = generator
        .generate(&cli.input, &cli.output, TranscriptionTask::from_translate(cli.wants_translation()))
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    info!("{} words, {} caption lines", report.word_count, report.event_count);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_console(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yes_no() {
        assert_eq!(parse_yes_no("Sim"), Ok(true));
        assert_eq!(parse_yes_no("YES"), Ok(true));
        assert_eq!(parse_yes_no(" s "), Ok(true));
        assert_eq!(parse_yes_no("no"), Ok(false));
        assert_eq!(parse_yes_no("nao"), Ok(false));
        assert_eq!(parse_yes_no("não"), Ok(false));
        assert_eq!(parse_yes_no("maybe"), Ok(false));
        assert_eq!(parse_yes_no(""), Ok(false));
    }

    #[test]
    fn test_cli_defaults_to_translation() {
        let cli = Cli::parse_from(["reelsmith-captions", "in.mp4", "out.mp4"]);
        assert!(cli.wants_translation());
        assert!(cli.config.is_none());

        let cli = Cli::parse_from(["reelsmith-captions", "in.mp4", "out.mp4", "--translate", "no"]);
        assert!(!cli.translate);

        let cli = Cli::parse_from(["reelsmith-captions", "in.mp4", "out.mp4", "-t", "sim"]);
        assert!(cli.translate);

        let cli = Cli::parse_from(["reelsmith-captions", "in.mp4", "out.mp4", "-t", "talvez"]);
        assert!(!cli.translate);
    }

    #[test]
    fn test_positional_translate_word() {
        let cli = Cli::parse_from(["reelsmith-captions", "video.mp4", "legendado.mp4", "nao"]);
        assert_eq!(cli.translate_word, Some(false));
        assert!(!cli.wants_translation());

        let cli = Cli::parse_from(["reelsmith-captions", "video.mp4", "legendado.mp4", "sim"]);
        assert!(cli.wants_translation());

        let cli = Cli::parse_from(["reelsmith-captions", "video.mp4", "legendado.mp4", "qualquer"]);
        assert!(!cli.wants_translation());
    }
}
