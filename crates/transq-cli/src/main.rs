use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use transq_core::transcribe::{self, FileOutcome, TranscribeOptions, WhisperCommand};
use transq_core::{
    Action, CancellationToken, Error, Event, FfprobeOracle, Mode, ProcessControl, ProcessOptions,
    ProcessResult,
};

#[derive(Parser)]
#[command(name = "transq", version, about = "Centralize media for transcription and return finished files to where they came from")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stage media that needs transcripts and return media that has them
    Sync(SyncArgs),
    /// Write .srt and .txt files for media using the whisper command line tool
    Transcribe(TranscribeArgs),
}

#[derive(Args)]
struct SyncArgs {
    /// Directory tree to scan
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Move files (default: list moves only)
    #[arg(short = 'm', long = "move")]
    execute: bool,

    /// Which kinds of work this run may do
    #[arg(long, value_enum, default_value_t = Mode::Full)]
    mode: Mode,

    /// Staging directory (default: <root>/TRANSCRIBE)
    #[arg(long)]
    staging_dir: Option<PathBuf>,

    /// Records file (default: <root>/records.json)
    #[arg(long)]
    records: Option<PathBuf>,

    /// ffprobe executable used to check for audio tracks
    #[arg(long, env = "TRANSQ_FFPROBE", default_value = "ffprobe")]
    ffprobe: PathBuf,
}

#[derive(Args)]
struct TranscribeArgs {
    /// Input files or directories (directories are not searched recursively)
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Whisper model name
    #[arg(short, long, default_value = transcribe::DEFAULT_MODEL)]
    model: String,

    /// Device passed to whisper
    #[arg(long, default_value = "cpu")]
    device: String,

    /// whisper executable
    #[arg(long, env = "TRANSQ_WHISPER", default_value = "whisper")]
    whisper: PathBuf,

    /// ffprobe executable used to read media durations
    #[arg(long, env = "TRANSQ_FFPROBE", default_value = "ffprobe")]
    ffprobe: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || handler_token.cancel()).context("failed to install interrupt handler")?;

    match cli.command {
        Command::Sync(args) => sync(args, token),
        Command::Transcribe(args) => transcribe(args, token),
    }
}

fn sync(args: SyncArgs, token: CancellationToken) -> anyhow::Result<()> {
    let t_total = Instant::now();

    let options = ProcessOptions {
        root: args.root,
        staging_dir: args.staging_dir,
        records_file: args.records,
        mode: args.mode,
        execute: args.execute,
        ffprobe: args.ffprobe,
    };
    let oracle = FfprobeOracle::new(&options.ffprobe);
    let control = ProcessControl::new().with_cancel_token(token);

    let result = transq_core::process_with_control(&options, &control, &oracle, &print_event)
        .with_context(|| format!("sync of {} failed", options.root.display()))?;

    print_summary(&result, options.mode);
    eprintln!("  took {:.2}s", t_total.elapsed().as_secs_f64());
    Ok(())
}

fn dir_name(path: &Path) -> String {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_event(event: &Event) {
    match event {
        Event::Move {
            action: Action::Stage,
            from,
            to,
        } => println!(">>> Queueing {} in {}", file_name(from), dir_name(to)),
        Event::Move {
            action: Action::Return,
            from,
            to,
        } => println!("=== Moving {} to {}", file_name(from), dir_name(to)),
        Event::Move {
            action: Action::Quarantine,
            from,
            to,
        } => println!("??? Setting aside {} in {} (origin unknown)", file_name(from), dir_name(to)),
        Event::Collision { from, to, .. } => println!(
            "!!! Skipping {}: {} already exists",
            file_name(from),
            to.display()
        ),
        Event::MissingRecord { path } => {
            println!("??? No record of an original directory for {}", path.display())
        }
        Event::Discard { path } => println!("--- Ignoring {}: no audio track", path.display()),
    }
}

fn print_summary(result: &ProcessResult, mode: Mode) {
    if mode == Mode::AuditOnly {
        eprintln!(
            "Audit done! {} media files, {} staged without a record",
            result.candidates, result.missing_records
        );
        return;
    }

    eprintln!(
        "Done! {} media files, {} staged, {} returned, {} set aside, {} without audio, {} files moved, {} collisions",
        result.candidates,
        result.staged,
        result.returned,
        result.quarantined,
        result.discarded,
        result.files_moved,
        result.collisions
    );
    if !result.executed {
        println!("This was a demonstration. Nothing was moved.");
        println!("Run again with --move to apply the moves listed above.");
    }
}

fn transcribe(args: TranscribeArgs, token: CancellationToken) -> anyhow::Result<()> {
    let t_total = Instant::now();
    let files = transcribe::collect_inputs(&args.input)?;

    let whisper = WhisperCommand {
        program: args.whisper,
        model: args.model,
        device: args.device,
    };
    let options = TranscribeOptions {
        ffprobe: args.ffprobe,
        ..TranscribeOptions::default()
    };

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} {msg}")?);

    let mut transcribed = 0u64;
    for file in &files {
        token.check()?;
        pb.set_message(file_name(file));

        let outcome = match transcribe::transcribe_file(file, &whisper, &options) {
            // The interrupt also reaches the whisper subprocess
            Err(_) if token.is_cancelled() => return Err(Error::Cancelled.into()),
            other => other?,
        };

        match outcome {
            FileOutcome::Transcribed {
                segments,
                media_seconds,
                elapsed,
            } => {
                transcribed += 1;
                let took = elapsed.as_secs_f64();
                match media_seconds {
                    Some(audio) if took > 0.0 => pb.println(format!(
                        "=== {}: {} segments, took {:.2}s for {:.2}s audio (ratio: {:.2}x)",
                        file.display(),
                        segments,
                        took,
                        audio,
                        audio / took
                    )),
                    _ => pb.println(format!(
                        "=== {}: {} segments, took {:.2}s",
                        file.display(),
                        segments,
                        took
                    )),
                }
            }
            skipped => log::debug!("skipping {}: {:?}", file.display(), skipped),
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    eprintln!(
        "Done! {} of {} files transcribed ({:.2}s)",
        transcribed,
        files.len(),
        t_total.elapsed().as_secs_f64()
    );
    Ok(())
}
