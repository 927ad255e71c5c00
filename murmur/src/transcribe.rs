//! Transcribe subcommand - speech-to-text for one WAV file.

use crate::cli::ModelArgs;
use crate::config::ModelConfig;
use color_eyre::Section;
use eyre::{Context, Result};
use murmur_asr::pipelines::Whisper;
use murmur_asr::session::ExecutionDevice;
use murmur_asr::task::TranscriptionTask;
use murmur_asr::token::Language;
use murmur_asr::types::Transcription;
use std::path::PathBuf;
use std::time::Instant;

/// CLI arguments for transcription.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Path to input WAV file
    pub path: PathBuf,

    /// Spoken language as ISO code or name (default: detected by the model)
    #[arg(short, long, default_value = "auto")]
    pub language: Language,

    /// Translate to English instead of transcribing
    #[arg(long)]
    pub translate: bool,

    /// Predict timestamps and print segments
    #[arg(long)]
    pub timestamps: bool,

    /// Print text with special markers
    #[arg(long, conflicts_with = "json")]
    pub raw: bool,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,

    /// Execution device: cpu, cuda, tensorrt, coreml, directml, openvino
    #[arg(short, long, default_value = "cpu")]
    pub device: ExecutionDevice,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// How the result is printed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    Text,
    Raw,
    Segments,
    Json,
}

/// Resolved configuration for transcription.
#[derive(Debug)]
pub struct Config {
    pub path: PathBuf,
    pub task: TranscriptionTask,
    pub output: Output,
    pub device: ExecutionDevice,
    pub model: ModelConfig,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        let mut task = TranscriptionTask::new().language(args.language);
        if args.translate {
            task = task.translate();
        }
        if args.timestamps {
            task = task.with_timestamps();
        }

        let output = match (args.json, args.raw, args.timestamps) {
            (true, _, _) => Output::Json,
            (_, true, _) => Output::Raw,
            (_, _, true) => Output::Segments,
            _ => Output::Text,
        };

        Ok(Self {
            path: args.path,
            task,
            output,
            device: args.device,
            model: args.model.try_into()?,
        })
    }
}

pub fn execute(config: Config) -> Result<()> {
    tracing::info!(
        input = ?config.path.display(),
        device = %config.device,
        language = %config.task.language,
        "transcribing"
    );

    let builder = config.device.session_builder().with_suggestion(|| {
        format!(
            "rebuild with `--features {}` or use `--device cpu`",
            config.device.feature()
        )
    })?;

    let s = Instant::now();

    let mut whisper = Whisper::from_repo(&config.model.repo, builder)?;

    let d = s.elapsed();
    tracing::info!(duration = %format_secs(d.as_secs_f32()), "model loaded");

    let s = Instant::now();

    let result = whisper
        .transcribe_file(&config.path, &config.task)
        .wrap_err_with(|| format!("failed to transcribe {:?}", config.path.display()))?;

    let d = s.elapsed();
    tracing::info!(
        duration = %format_secs(d.as_secs_f32()),
        tokens = result.tokens.len(),
        "inference completed"
    );

    println!("{}", render(&result, config.output)?);

    Ok(())
}

fn render(result: &Transcription, output: Output) -> Result<String> {
    let rendered = match output {
        Output::Text => result.text.clone(),
        Output::Raw => result.raw_text.clone(),
        Output::Json => serde_json::to_string_pretty(result)?,
        Output::Segments if result.segments.is_empty() => result.text.clone(),
        Output::Segments => result
            .segments
            .iter()
            .map(|segment| {
                format!(
                    "[{} --> {}] {}",
                    format_secs(segment.start),
                    format_secs(segment.end),
                    segment.text.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    };

    Ok(rendered)
}

/// Format seconds as a string with two decimal places.
fn format_secs(secs: f32) -> String {
    format!("{:.2}s", secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ModelSource;
    use murmur_asr::task::Task;
    use murmur_asr::types::{Segment, Token};

    fn args() -> Args {
        Args {
            path: PathBuf::from("audio.wav"),
            language: Language::English,
            translate: false,
            timestamps: false,
            raw: false,
            json: false,
            device: ExecutionDevice::Cpu,
            model: ModelArgs {
                model_id: "models/whisper".into(),
                model_source: ModelSource::Path,
            },
        }
    }

    fn transcription() -> Transcription {
        Transcription {
            raw_text: "<|startoftranscript|><|0.00|> hi<|1.00|><|endoftext|>".into(),
            text: "hi".into(),
            tokens: vec![Token {
                id: 50258,
                symbol: "<|startoftranscript|>".into(),
            }],
            segments: vec![Segment {
                text: " hi".into(),
                start: 0.0,
                end: 1.0,
            }],
        }
    }

    #[test]
    fn builds_task_from_flags() {
        let config = Config::try_from(Args {
            translate: true,
            timestamps: true,
            ..args()
        })
        .unwrap();

        assert_eq!(config.task.language, Language::English);
        assert_eq!(config.task.task, Task::Translate);
        assert!(config.task.timestamps);
        assert_eq!(config.output, Output::Segments);
    }

    #[test]
    fn json_wins_over_segments() {
        let config = Config::try_from(Args {
            timestamps: true,
            json: true,
            ..args()
        })
        .unwrap();

        assert_eq!(config.output, Output::Json);
    }

    #[test]
    fn renders_segments_with_times() {
        let rendered = render(&transcription(), Output::Segments).unwrap();

        assert_eq!(rendered, "[0.00s --> 1.00s] hi");
    }

    #[test]
    fn renders_json() {
        let rendered = render(&transcription(), Output::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["segments"][0]["end"], 1.0);
        assert_eq!(value["tokens"][0]["id"], 50258);
    }
}
