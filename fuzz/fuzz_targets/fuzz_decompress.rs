#![no_main]

use libfuzzer_sys::fuzz_target;
use parallel_gzip::{decompress_to_vec, PipelineConfig};

fuzz_target!(|data: &[u8]| {
    // Keep declared frame sizes small so corrupt headers cannot OOM the run
    let config = PipelineConfig::default()
        .with_workers(2)
        .with_queue_capacity(4)
        .with_max_frame_len(1 << 20);

    // Must return, either with output or a corrupt-input error; never hang
    let _ = decompress_to_vec(data, &config);
});
