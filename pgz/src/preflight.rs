//! Checks run before the pipeline touches any file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parallel_gzip::Mode;
use sysinfo::Disks;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("file \"{}\" does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("\"{}\" is not a regular file", .0.display())]
    NotAFile(PathBuf),

    #[error("source and destination must be different files")]
    SameFile,

    #[error("unable to process an empty file")]
    EmptySource,

    #[error("\"{}\" does not have the .gz extension", .0.display())]
    BadExtension(PathBuf),

    #[error("not enough free space on {}: {needed} bytes needed, {available} available", .mount.display())]
    InsufficientSpace {
        mount: PathBuf,
        needed: u64,
        available: u64,
    },
}

/// Validates a job and returns the source size in bytes.
pub fn check(mode: Mode, source: &Path, destination: &Path) -> Result<u64> {
    let meta = match fs::metadata(source) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(PreflightError::NotFound(source.to_path_buf()).into())
        }
        Err(err) => {
            return Err(err).with_context(|| format!("cannot stat {}", source.display()))
        }
    };
    if !meta.is_file() {
        return Err(PreflightError::NotAFile(source.to_path_buf()).into());
    }

    let source_abs = fs::canonicalize(source)
        .with_context(|| format!("cannot resolve {}", source.display()))?;
    let destination_abs = resolve_destination(destination)?;
    if source_abs == destination_abs {
        return Err(PreflightError::SameFile.into());
    }

    match mode {
        Mode::Compress if meta.len() == 0 => return Err(PreflightError::EmptySource.into()),
        Mode::Decompress if !has_gz_extension(source) => {
            return Err(PreflightError::BadExtension(source.to_path_buf()).into())
        }
        _ => {}
    }

    check_free_space(&destination_abs, required_space(mode, meta.len()))?;
    Ok(meta.len())
}

/// Space heuristic: the source size for compression, twice that for
/// decompression.
pub fn required_space(mode: Mode, source_len: u64) -> u64 {
    match mode {
        Mode::Compress => source_len,
        Mode::Decompress => source_len.saturating_mul(2),
    }
}

pub fn has_gz_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Default output path: `<src>.gz` when compressing, `<src>` without its
/// `.gz` when decompressing.
pub fn default_destination(mode: Mode, source: &Path) -> PathBuf {
    match mode {
        Mode::Compress => {
            let mut name = source.as_os_str().to_owned();
            name.push(".gz");
            PathBuf::from(name)
        }
        Mode::Decompress if has_gz_extension(source) => source.with_extension(""),
        Mode::Decompress => {
            let mut name = source.as_os_str().to_owned();
            name.push(".out");
            PathBuf::from(name)
        }
    }
}

/// Absolute form of a path that may not exist yet.
fn resolve_destination(destination: &Path) -> Result<PathBuf> {
    if let Ok(existing) = fs::canonicalize(destination) {
        return Ok(existing);
    }

    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let parent = fs::canonicalize(parent)
        .map_err(|_| PreflightError::NotFound(parent.to_path_buf()))?;
    let name = destination
        .file_name()
        .with_context(|| format!("{} is not a file path", destination.display()))?;
    Ok(parent.join(name))
}

fn check_free_space(destination: &Path, needed: u64) -> Result<()> {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .filter(|disk| destination.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len());

    let Some(disk) = disk else {
        warn!(path = %destination.display(), "no disk found for destination, skipping free space check");
        return Ok(());
    };

    let available = disk.available_space();
    debug!(mount = %disk.mount_point().display(), available, needed, "free space check");
    if available < needed {
        return Err(PreflightError::InsufficientSpace {
            mount: disk.mount_point().to_path_buf(),
            needed,
            available,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preflight_error(result: Result<u64>) -> PreflightError {
        result
            .unwrap_err()
            .downcast::<PreflightError>()
            .expect("expected a preflight error")
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = preflight_error(check(
            Mode::Compress,
            &dir.path().join("nope.bin"),
            &dir.path().join("out.gz"),
        ));
        assert!(matches!(err, PreflightError::NotFound(_)));
    }

    #[test]
    fn identical_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("data.gz");
        fs::write(&src, b"payload").unwrap();
        let alias = dir.path().join(".").join("data.gz");
        let err = preflight_error(check(Mode::Decompress, &src, &alias));
        assert!(matches!(err, PreflightError::SameFile));
    }

    #[test]
    fn empty_source_cannot_be_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("empty.bin");
        fs::write(&src, b"").unwrap();
        let err = preflight_error(check(Mode::Compress, &src, &dir.path().join("e.gz")));
        assert!(matches!(err, PreflightError::EmptySource));
    }

    #[test]
    fn decompress_requires_gz_extension() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("archive.zip");
        fs::write(&src, b"PK").unwrap();
        let err = preflight_error(check(Mode::Decompress, &src, &dir.path().join("out")));
        assert!(matches!(err, PreflightError::BadExtension(_)));
    }

    #[test]
    fn valid_job_returns_source_len() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("data.bin");
        fs::write(&src, vec![1u8; 1234]).unwrap();
        let len = check(Mode::Compress, &src, &dir.path().join("data.bin.gz")).unwrap();
        assert_eq!(len, 1234);
    }

    #[test]
    fn default_destinations() {
        assert_eq!(
            default_destination(Mode::Compress, Path::new("dir/a.txt")),
            PathBuf::from("dir/a.txt.gz")
        );
        assert_eq!(
            default_destination(Mode::Decompress, Path::new("dir/a.txt.gz")),
            PathBuf::from("dir/a.txt")
        );
        assert_eq!(required_space(Mode::Decompress, 10), 20);
        assert_eq!(required_space(Mode::Compress, 10), 10);
    }
}
