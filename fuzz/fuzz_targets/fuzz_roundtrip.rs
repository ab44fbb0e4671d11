#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use parallel_gzip::{compress_to_vec, decompress_to_vec, PipelineConfig};

#[derive(Arbitrary, Debug)]
struct Input {
    block_size: u16,
    workers: u8,
    data: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let config = PipelineConfig::default()
        .with_block_size(input.block_size as usize)
        .with_workers((input.workers % 8) as usize);

    let compressed = compress_to_vec(&input.data, &config).expect("compression failed");
    let restored = decompress_to_vec(&compressed, &config).expect("decompression failed");
    assert_eq!(restored, input.data);
});
