//! pgz - parallel block gzip compressor.
//!
//! Compresses a file into a sequence of self-delimiting gzip frames, one per
//! 1 MiB block, using every available core, and decompresses such files back.
//! The output of `compress` is also a valid multi-member gzip file.
//!
//! # Usage
//!
//! ```bash
//! # Compress to data.bin.gz
//! pgz compress data.bin
//!
//! # Decompress to an explicit destination with 4 workers
//! pgz decompress data.bin.gz restored.bin -j 4
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use parallel_gzip::{ErrorKind, Mode, NoProgress, PipelineConfig, PipelineError, Progress, RunSummary};
use tracing::{info, warn, Level};

mod preflight;
mod progress;

use preflight::PreflightError;
use progress::BarProgress;

/// Command-line arguments for pgz.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    /// Without it, RUST_LOG is honoured and defaults to warn.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compress a file into block frames
    Compress(JobArgs),
    /// Decompress a file produced by `compress`
    Decompress(JobArgs),
}

#[derive(Args, Debug)]
struct JobArgs {
    /// Source file
    source: PathBuf,

    /// Destination file (defaults to <source>.gz, or <source> without .gz
    /// when decompressing)
    destination: Option<PathBuf>,

    /// Number of worker threads (default = number of logical cores)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Raw block size when compressing (supports K/M suffixes)
    #[arg(long, default_value = "1M", value_parser = parse_size)]
    block_size: usize,

    /// Gzip compression level (0-9)
    #[arg(short = 'l', long, default_value_t = 6,
          value_parser = clap::value_parser!(u32).range(0..=9))]
    level: u32,

    /// Do not show a progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Keep the destination file if the run fails
    #[arg(long)]
    keep_partial: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (mode, args) = match cli.command {
        Command::Compress(args) => (Mode::Compress, args),
        Command::Decompress(args) => (Mode::Decompress, args),
    };

    match execute(mode, &args) {
        Ok(summary) => {
            if !args.quiet {
                eprintln!(
                    "{} complete: {} blocks, {} -> {} bytes",
                    verb(mode),
                    summary.blocks,
                    summary.input_bytes,
                    summary.output_bytes
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("An error occurred: {}", describe(&err));
            ExitCode::FAILURE
        }
    }
}

fn execute(mode: Mode, args: &JobArgs) -> Result<RunSummary> {
    let destination = args
        .destination
        .clone()
        .unwrap_or_else(|| preflight::default_destination(mode, &args.source));
    let source_len = preflight::check(mode, &args.source, &destination)?;

    let mut config = PipelineConfig::default()
        .with_block_size(args.block_size)
        .with_level(args.level);
    if let Some(jobs) = args.jobs {
        config = config.with_workers(jobs);
    }

    // Refuse settings whose output could not be read back before any file
    // is touched.
    config.validate(mode)?;

    info!(
        source = %args.source.display(),
        destination = %destination.display(),
        workers = config.workers,
        "start {}",
        verb(mode).to_lowercase()
    );

    let bar = (!args.quiet).then(|| BarProgress::new(source_len));
    let progress: &dyn Progress = match &bar {
        Some(bar) => bar,
        None => &NoProgress,
    };

    let result = transcode(
        mode,
        &args.source,
        &destination,
        source_len,
        &config,
        progress,
        args.keep_partial,
    );
    if let Some(bar) = &bar {
        match &result {
            Ok(_) => bar.finish(),
            Err(_) => bar.abandon(),
        }
    }
    result.with_context(|| format!("{} of {} failed", verb(mode), args.source.display()))
}

/// Runs the pipeline from `source` into a newly created `destination`.
///
/// On failure the destination is removed unless `keep_partial` is set, but
/// only once this call has created it; an earlier failure leaves any existing
/// file alone.
fn transcode(
    mode: Mode,
    source: &Path,
    destination: &Path,
    total: u64,
    config: &PipelineConfig,
    progress: &dyn Progress,
    keep_partial: bool,
) -> Result<RunSummary> {
    let input =
        File::open(source).with_context(|| format!("cannot open {}", source.display()))?;
    let output = File::create(destination)
        .with_context(|| format!("cannot create {}", destination.display()))?;

    let reader = BufReader::new(input);
    let writer = BufWriter::new(output);
    let result = match mode {
        Mode::Compress => parallel_gzip::compress(reader, writer, total, config, progress),
        Mode::Decompress => parallel_gzip::decompress(reader, writer, total, config, progress),
    };

    if result.is_err() && !keep_partial {
        if let Err(rm_err) = fs::remove_file(destination) {
            warn!(path = %destination.display(), error = %rm_err, "could not remove partial output");
        }
    }
    Ok(result?)
}

fn verb(mode: Mode) -> &'static str {
    match mode {
        Mode::Compress => "Compression",
        Mode::Decompress => "Decompression",
    }
}

/// Picks a user-facing message by error kind.
fn describe(err: &anyhow::Error) -> String {
    for cause in err.chain() {
        if let Some(preflight) = cause.downcast_ref::<PreflightError>() {
            return preflight.to_string();
        }
        if let Some(pipeline) = cause.downcast_ref::<PipelineError>() {
            return match pipeline.kind() {
                ErrorKind::Corrupt => format!("the input file is corrupted ({pipeline})"),
                ErrorKind::Io => format!("{pipeline}"),
                ErrorKind::Config => format!("invalid settings: {pipeline}"),
                ErrorKind::Internal => format!("internal failure: {pipeline}"),
            };
        }
    }
    format!("{err:#}")
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => std::env::var("RUST_LOG")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Level::WARN),
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Parses a byte size with an optional K/M/G suffix.
fn parse_size(value: &str) -> Result<usize, String> {
    let value = value.trim();
    let (digits, multiplier) = match value.char_indices().last() {
        Some((idx, 'k' | 'K')) => (&value[..idx], 1usize << 10),
        Some((idx, 'm' | 'M')) => (&value[..idx], 1usize << 20),
        Some((idx, 'g' | 'G')) => (&value[..idx], 1usize << 30),
        _ => (value, 1),
    };
    let base: usize = digits
        .trim()
        .parse()
        .map_err(|_| format!("invalid size: {value}"))?;
    let size = base
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size too large: {value}"))?;
    if size == 0 {
        return Err("size must be greater than zero".to_string());
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_size_accepts_suffixes() {
        assert_eq!(parse_size("4096"), Ok(4096));
        assert_eq!(parse_size("64K"), Ok(64 << 10));
        assert_eq!(parse_size("1m"), Ok(1 << 20));
        assert_eq!(parse_size("2G"), Ok(2 << 30));
        assert!(parse_size("0").is_err());
        assert!(parse_size("lots").is_err());
    }

    #[test]
    fn describe_uses_preflight_message() {
        let err = anyhow::Error::from(PreflightError::EmptySource).context("while checking");
        assert_eq!(describe(&err), "unable to process an empty file");
    }

    #[test]
    fn describe_flags_corruption() {
        let err = anyhow::Error::from(PipelineError::corrupt(3, "bad frame magic"));
        assert!(describe(&err).starts_with("the input file is corrupted"));
    }

    #[test]
    fn failed_open_leaves_existing_destination_alone() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("gone.bin");
        let destination = dir.path().join("gone.bin.gz");
        fs::write(&destination, b"keep me").unwrap();

        let config = PipelineConfig::default().with_workers(1);
        let err = transcode(
            Mode::Compress,
            &source,
            &destination,
            0,
            &config,
            &NoProgress,
            false,
        )
        .unwrap_err();

        assert!(format!("{err:#}").contains("cannot open"), "{err:#}");
        assert_eq!(fs::read(&destination).unwrap(), b"keep me");
    }

    #[test]
    fn failed_run_removes_the_destination_it_created() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("bogus.gz");
        let destination = dir.path().join("bogus");
        fs::write(&source, b"definitely not a frame stream").unwrap();

        let config = PipelineConfig::default().with_workers(2);
        let err = transcode(
            Mode::Decompress,
            &source,
            &destination,
            29,
            &config,
            &NoProgress,
            false,
        )
        .unwrap_err();
        assert!(describe(&err).starts_with("the input file is corrupted"));
        assert!(!destination.exists());

        transcode(
            Mode::Decompress,
            &source,
            &destination,
            29,
            &config,
            &NoProgress,
            true,
        )
        .unwrap_err();
        assert!(destination.exists());
    }

    #[test]
    fn describe_flags_invalid_settings() {
        let config = PipelineConfig::default().with_block_size(1 << 30);
        let err = anyhow::Error::from(config.validate(Mode::Compress).unwrap_err());
        assert!(describe(&err).starts_with("invalid settings"), "{}", describe(&err));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
