#![no_main]

use libfuzzer_sys::fuzz_target;
use trailscope_collector::parser::parse_body;
use trailscope_collector::FlowLogParser;

fuzz_target!(|data: &[u8]| {
    if let Ok(body) = std::str::from_utf8(data) {
        let parser = FlowLogParser::new();
        let (records, dropped) = parse_body(&parser, body);
        assert!(records.len() as u64 + dropped <= body.lines().count() as u64);
    }
});
