//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use eyre::Result;

/// Model used when `--model` is not given.
pub const DEFAULT_MODEL: &str = "models/whisper-large-v3";

#[derive(Debug, Parser)]
#[command(name = "murmur")]
#[command(about = "Speech-to-text with Whisper large-v3")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Transcribe a 16kHz WAV file
    Transcribe(crate::transcribe::Args),

    /// List supported languages
    Languages,
}

/// Where to look for model files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ModelSource {
    /// Local directory if it exists, otherwise the HuggingFace Hub
    #[default]
    Auto,
    /// Local directory
    Path,
    /// HuggingFace cache only, no network
    Cache,
    /// HuggingFace Hub
    Api,
}

/// Model location arguments shared by model-backed commands.
#[derive(clap::Args, Debug)]
pub struct ModelArgs {
    /// Model directory or HuggingFace repository id
    #[arg(short, long = "model", default_value = DEFAULT_MODEL)]
    pub model_id: String,

    /// How to resolve the model id
    #[arg(long, value_enum, default_value_t)]
    pub model_source: ModelSource,
}

/// Execute CLI command - separated for testing.
pub fn run(cli: Cli) -> Result<()> {
    tracing::debug!(?cli, "parsed arguments");

    match cli.command {
        Commands::Transcribe(args) => crate::transcribe::execute(args.try_into()?),
        Commands::Languages => crate::languages::execute(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_asr::session::ExecutionDevice;
    use murmur_asr::token::Language;

    #[test]
    fn parses_transcribe_command() {
        let cli = Cli::parse_from(["murmur", "transcribe", "audio.wav"]);

        match &cli.command {
            Commands::Transcribe(crate::transcribe::Args {
                path,
                language: Language::Auto,
                translate: false,
                timestamps: false,
                raw: false,
                json: false,
                device: ExecutionDevice::Cpu,
                model,
            }) if path.to_str() == Some("audio.wav") => {
                assert_eq!(model.model_id, DEFAULT_MODEL);
                assert_eq!(model.model_source, ModelSource::Auto);
            }
            _ => panic!("unexpected command: {:?}", cli.command),
        }
    }

    #[test]
    fn parses_transcribe_options() {
        let cli = Cli::parse_from([
            "murmur",
            "transcribe",
            "audio.wav",
            "-l",
            "German",
            "--translate",
            "--timestamps",
            "--device",
            "cuda",
            "-m",
            "openai/whisper-large-v3",
            "--model-source",
            "api",
        ]);

        match &cli.command {
            Commands::Transcribe(crate::transcribe::Args {
                language: Language::German,
                translate: true,
                timestamps: true,
                device: ExecutionDevice::Cuda,
                model,
                ..
            }) => {
                assert_eq!(model.model_id, "openai/whisper-large-v3");
                assert_eq!(model.model_source, ModelSource::Api);
            }
            _ => panic!("unexpected command: {:?}", cli.command),
        }
    }

    #[test]
    fn rejects_unknown_language() {
        let result = Cli::try_parse_from(["murmur", "transcribe", "audio.wav", "-l", "klingon"]);

        assert!(result.is_err());
    }

    #[test]
    fn raw_and_json_conflict() {
        let result = Cli::try_parse_from(["murmur", "transcribe", "audio.wav", "--raw", "--json"]);

        assert!(result.is_err());
    }

    #[test]
    fn parses_languages_command() {
        let cli = Cli::parse_from(["murmur", "languages"]);

        assert!(matches!(cli.command, Commands::Languages));
    }
}
