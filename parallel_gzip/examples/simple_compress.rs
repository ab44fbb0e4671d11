use anyhow::{Context, Result};
use parallel_gzip::{Mode, NoProgress, PipelineConfig};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <input> <output.gz> [-d]", args[0]);
        return Ok(());
    }

    let mode = if args.get(3).map(String::as_str) == Some("-d") {
        Mode::Decompress
    } else {
        Mode::Compress
    };

    let summary = parallel_gzip::process_file(
        mode,
        Path::new(&args[1]),
        Path::new(&args[2]),
        &PipelineConfig::default(),
        &NoProgress,
    )
    .with_context(|| format!("failed to process {}", args[1]))?;

    eprintln!(
        "{} blocks, {} -> {} bytes",
        summary.blocks, summary.input_bytes, summary.output_bytes
    );
    Ok(())
}
