#![no_main]

use gitinsight_git::parser::{parse_blocks, split_records};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let blocks: Vec<&str> = split_records(&text).collect();
    let report = parse_blocks(&blocks);
    assert_eq!(report.total(), blocks.len());
});
