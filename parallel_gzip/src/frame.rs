//! Self-delimiting frame format.
//!
//! Every compressed block is stored as a frame:
//!
//! | bytes  | content                                         |
//! |--------|-------------------------------------------------|
//! | 0..4   | magic `559903`, little-endian (`1f 8b 08 00`)   |
//! | 4..8   | total frame length including header, LE `u32`   |
//! | 8..    | remainder of the gzip member                    |
//!
//! The magic is the first four bytes of a gzip member written without
//! optional header fields, and bytes 4..8 are the gzip MTIME slot. A frame is
//! therefore still a valid gzip member after the length is stamped into it.

use crate::error::{PipelineError, Result};

/// Frame magic, little-endian.
pub const MAGIC: u32 = 559_903;

/// Length of the fixed frame header.
pub const HEADER_LEN: usize = 8;

/// Parsed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Total frame length, header included.
    pub length: u32,
}

impl FrameHeader {
    /// Validates a raw header read from the stream.
    ///
    /// `sequence` is only used for error reporting; `max_len` caps the
    /// declared length so a corrupt header cannot trigger a huge allocation.
    pub fn parse(raw: &[u8; HEADER_LEN], sequence: u64, max_len: usize) -> Result<Self> {
        let magic = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        if magic != MAGIC {
            return Err(PipelineError::corrupt(
                sequence,
                format!("bad frame magic {magic:#010x}"),
            ));
        }

        let length = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        if (length as usize) < HEADER_LEN {
            return Err(PipelineError::corrupt(
                sequence,
                format!("frame length {length} is shorter than its header"),
            ));
        }
        if length as usize > max_len {
            return Err(PipelineError::corrupt(
                sequence,
                format!("frame length {length} exceeds limit of {max_len} bytes"),
            ));
        }

        Ok(Self { length })
    }

    /// Number of bytes that follow the header.
    pub fn body_len(&self) -> usize {
        self.length as usize - HEADER_LEN
    }
}

/// Returns true if `frame` starts with the frame magic.
pub fn has_magic(frame: &[u8]) -> bool {
    frame.len() >= 4 && frame[..4] == MAGIC.to_le_bytes()
}

/// Writes the total frame length into bytes 4..8 of a compressed block.
pub fn stamp_length(frame: &mut [u8], sequence: u64) -> Result<()> {
    if frame.len() < HEADER_LEN {
        return Err(PipelineError::corrupt(
            sequence,
            "compressed block is shorter than a frame header",
        ));
    }
    let length = u32::try_from(frame.len()).map_err(|_| PipelineError::FrameTooLarge {
        sequence,
        len: frame.len(),
    })?;
    frame[4..HEADER_LEN].copy_from_slice(&length.to_le_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(magic: u32, length: u32) -> [u8; HEADER_LEN] {
        let mut raw = [0u8; HEADER_LEN];
        raw[..4].copy_from_slice(&magic.to_le_bytes());
        raw[4..].copy_from_slice(&length.to_le_bytes());
        raw
    }

    #[test]
    fn magic_matches_gzip_member_prefix() {
        assert_eq!(MAGIC.to_le_bytes(), [0x1f, 0x8b, 0x08, 0x00]);
    }

    #[test]
    fn parse_accepts_valid_header() {
        let parsed = FrameHeader::parse(&header(MAGIC, 120), 0, 1 << 20).unwrap();
        assert_eq!(parsed.length, 120);
        assert_eq!(parsed.body_len(), 112);
    }

    #[test]
    fn parse_rejects_wrong_magic() {
        let err = FrameHeader::parse(&header(0xdead_beef, 120), 3, 1 << 20).unwrap_err();
        assert!(matches!(err, PipelineError::CorruptInput { sequence: 3, .. }));
    }

    #[test]
    fn parse_rejects_short_and_oversized_lengths() {
        assert!(FrameHeader::parse(&header(MAGIC, 7), 0, 1 << 20).is_err());
        assert!(FrameHeader::parse(&header(MAGIC, 4096), 0, 1024).is_err());
        assert!(FrameHeader::parse(&header(MAGIC, 8), 0, 1024).is_ok());
    }

    #[test]
    fn stamp_length_writes_little_endian_total() {
        let mut frame = vec![0x1f, 0x8b, 0x08, 0x00, 0, 0, 0, 0, 1, 2, 3];
        stamp_length(&mut frame, 0).unwrap();
        assert_eq!(&frame[4..8], &11u32.to_le_bytes());
        assert!(has_magic(&frame));
    }

    #[test]
    fn stamp_length_rejects_headerless_block() {
        let mut frame = vec![0x1f, 0x8b];
        assert!(stamp_length(&mut frame, 9).is_err());
    }
}
