#![no_main]

use libfuzzer_sys::fuzz_target;
use trailscope_collector::source::decode_object;

fuzz_target!(|data: &[u8]| {
    let _ = decode_object("logs/2025-05-01-00-00-00-ABCDEF.gz", data);
    let _ = decode_object("logs/2025-05-01-00-00-00-ABCDEF", data);
});
