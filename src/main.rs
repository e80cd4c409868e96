//! Application entry point: transcribe one media file from the command line.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk; on first run write the defaults so
//!    they can be edited.
//! 3. Parse the command line; flags override the `[transcription]` defaults.
//! 4. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 5. Report the FFmpeg version (or the remediation text when it is missing).
//! 6. Start the [`JobOrchestrator`] and submit the job.
//! 7. Print every status update until the job resolves.  The first Ctrl-C
//!    cancels the job; a second one abandons it and exits.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use media_transcriber::{
    config::{AppConfig, AppPaths},
    output::OutputWriter,
    pipeline::{
        CancelOutcome, ChannelListener, EnvironmentProbe, FfmpegProbe, Job, JobOrchestrator,
        JobStatus,
    },
    stt::{find_model_by_id, ModelPaths, Task, WhisperModelLoader},
};

const USAGE: &str = "\
Usage: media-transcriber <FILE> [options]

Options:
  --model ID            Whisper model (tiny, base, small, medium, large, ...)
  --language CODE|auto  Source language; `auto` detects it
  --translate           Translate to English instead of transcribing
  --word-timestamps     Include per-word timings in the JSON output
  -h, --help            Show this message";

/// Exit status after a second Ctrl-C (128 + SIGINT).
const ABORTED: u8 = 130;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    file: PathBuf,
    model: Option<String>,
    /// `Some(None)` means `--language auto`.
    language: Option<Option<String>>,
    translate: bool,
    word_timestamps: bool,
}

impl CliArgs {
    /// `Ok(None)` when help was requested.
    fn parse(args: impl IntoIterator<Item = String>) -> anyhow::Result<Option<Self>> {
        let mut parsed = CliArgs::default();
        let mut file = None;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(None),
                "--model" => {
                    parsed.model = Some(args.next().context("--model needs a value")?);
                }
                "--language" => {
                    let value = args.next().context("--language needs a value")?;
                    parsed.language = Some(match value.as_str() {
                        "auto" | "" => None,
                        _ => Some(value),
                    });
                }
                "--translate" => parsed.translate = true,
                "--word-timestamps" => parsed.word_timestamps = true,
                flag if flag.starts_with("--") => bail!("unknown option {flag}"),
                _ if file.is_none() => file = Some(PathBuf::from(&arg)),
                _ => bail!("only one input file is supported"),
            }
        }

        parsed.file = file.context("no input file given")?;
        Ok(Some(parsed))
    }

    fn into_job(self, config: &AppConfig) -> Job {
        let mut job = config.job_for(self.file);
        if let Some(model) = self.model {
            job.model = model;
        }
        if let Some(language) = self.language {
            job.language = language;
        }
        if self.translate {
            job.task = Task::Translate;
        }
        job.word_timestamps |= self.word_timestamps;
        job
    }
}

/// Help footer naming the models already downloaded to `paths`.
fn local_models_text(paths: &ModelPaths) -> String {
    let local = paths.list_local_models();
    if local.is_empty() {
        return format!(
            "No models downloaded yet in {}; the first job fetches its model.",
            paths.models_dir.display()
        );
    }
    let mut text = format!("Models in {}:", paths.models_dir.display());
    for model in local {
        text.push_str(&format!("\n  {:<10} {}", model.id, model.display_name));
    }
    text
}

/// What a Ctrl-C press means, given how many came before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Cancel,
    Abort,
}

fn on_interrupt(presses: &mut u32) -> Interrupt {
    *presses += 1;
    if *presses == 1 {
        Interrupt::Cancel
    } else {
        Interrupt::Abort
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<ExitCode> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    let settings_file = AppPaths::new().settings_file;
    if !settings_file.exists() {
        match config.save() {
            Ok(()) => log::info!("Wrote default settings to {}", settings_file.display()),
            Err(e) => log::warn!("Could not write default settings: {e}"),
        }
    }

    // 3. Command line
    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{USAGE}\n");
            println!("{}", local_models_text(&ModelPaths::new(config.models_dir())));
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => {
            eprintln!("error: {e}\n\n{USAGE}");
            return Ok(ExitCode::from(2));
        }
    };
    let job = args.into_job(&config);
    if let Some(model) = find_model_by_id(&job.model) {
        let non_english = job.language.as_deref().is_some_and(|l| l != "en");
        if model.english_only && (non_english || job.task == Task::Translate) {
            log::warn!(
                "{} is English-only; use a multilingual model for other languages",
                model.display_name
            );
        }
    }

    // 4. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let code = rt.block_on(run(config, job));
    // An abandoned engine run must not keep the process alive.
    rt.shutdown_background();
    code
}

async fn run(config: AppConfig, job: Job) -> anyhow::Result<ExitCode> {
    // 5. FFmpeg banner
    let probe = Arc::new(FfmpegProbe::from_config(&config.decoder));
    match probe.check().await {
        Ok(version) => println!("{version}"),
        Err(e) => log::warn!("{e}"),
    }

    // 6. Orchestrator
    let writer = OutputWriter::new(config.output_dir()).with_context(|| {
        format!(
            "could not create output directory {}",
            config.output_dir().display()
        )
    })?;
    let (listener, mut updates) = ChannelListener::channel();
    let orchestrator = JobOrchestrator::start(
        &tokio::runtime::Handle::current(),
        probe,
        Arc::new(WhisperModelLoader::from_config(&config)),
        writer,
        Arc::new(listener),
    );
    println!("Output folder: {}", orchestrator.output_dir().display());
    orchestrator.submit(job)?;

    // 7. Status loop
    let mut presses = 0;
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(update) = update else {
                    bail!("status channel closed before the job finished");
                };
                println!("[{}] {}", update.status, update.detail);
                if update.is_final() {
                    return Ok(match update.status {
                        JobStatus::Failed(_) => ExitCode::FAILURE,
                        _ => ExitCode::SUCCESS,
                    });
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                match on_interrupt(&mut presses) {
                    Interrupt::Cancel => {
                        if orchestrator.cancel() == CancelOutcome::Ignored {
                            log::debug!("Ctrl-C with no job running");
                        } else {
                            eprintln!("Canceling after the current step; press Ctrl-C again to quit now.");
                        }
                    }
                    Interrupt::Abort => {
                        eprintln!("Aborted; the running job was abandoned.");
                        return Ok(ExitCode::from(ABORTED));
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
