//! Per-block transforms.

use std::io::{self, Read, Write};

use flate2::bufread::GzDecoder;
use flate2::{Compression, GzBuilder};

use crate::frame;

/// Direction of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Compress,
    Decompress,
}

/// A block transform applied independently to each block.
///
/// Implementations must be deterministic and safe to call from many worker
/// threads at once. `compress` must return a buffer that starts with the frame
/// magic and has room for the length in bytes 4..8; the worker stamps it.
pub trait BlockCodec: Send + Sync {
    fn compress(&self, raw: &[u8]) -> io::Result<Vec<u8>>;

    fn decompress(&self, framed: &[u8]) -> io::Result<Vec<u8>>;
}

/// Gzip codec producing one gzip member per block.
#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    level: Compression,
}

impl GzipCodec {
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl BlockCodec for GzipCodec {
    fn compress(&self, raw: &[u8]) -> io::Result<Vec<u8>> {
        // No file name, comment or extra field keeps FLG at 0, so the member
        // begins with the frame magic. MTIME is overwritten with the length.
        let out = Vec::with_capacity(raw.len() / 2 + 64);
        let mut encoder = GzBuilder::new().mtime(0).write(out, self.level);
        encoder.write_all(raw)?;
        encoder.finish()
    }

    fn decompress(&self, framed: &[u8]) -> io::Result<Vec<u8>> {
        if !frame::has_magic(framed) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "frame does not start with the gzip magic",
            ));
        }
        let mut out = Vec::with_capacity(framed.len() * 3);
        let mut decoder = GzDecoder::new(framed);
        decoder.read_to_end(&mut out)?;
        // The member must end exactly where the frame header says it does.
        let rest = decoder.into_inner();
        if !rest.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} trailing bytes after the gzip member", rest.len()),
            ));
        }
        Ok(out)
    }
}
