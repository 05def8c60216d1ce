#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use trailscope_collector::source::KeyDateExtractor;
use trailscope_core::config::KeyDateLayout;

#[derive(Debug, Arbitrary)]
struct Input {
    year_from_end: u8,
    key: String,
}

fuzz_target!(|input: Input| {
    let embedded = KeyDateLayout::Embedded;
    let segments = KeyDateLayout::Segments {
        year_from_end: usize::from(input.year_from_end),
    };
    for layout in [embedded, segments] {
        if let Ok(extractor) = KeyDateExtractor::new(&layout) {
            let _ = extractor.extract(&input.key);
        }
    }
});
