#![no_main]

use libfuzzer_sys::fuzz_target;
use parallel_gzip::frame::{FrameHeader, HEADER_LEN, MAGIC};

fuzz_target!(|raw: [u8; HEADER_LEN]| {
    if let Ok(header) = FrameHeader::parse(&raw, 0, usize::MAX) {
        assert_eq!(raw[..4], MAGIC.to_le_bytes());
        assert!(header.length as usize >= HEADER_LEN);
        assert_eq!(header.body_len() + HEADER_LEN, header.length as usize);
    }
});
