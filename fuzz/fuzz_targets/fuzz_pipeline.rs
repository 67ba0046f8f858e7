#![no_main]

use dg_graph::{EdgeOptions, EdgeSink};
use libfuzzer_sys::fuzz_target;

struct NullSink;

impl EdgeSink for NullSink {
    fn set_edge(&mut self, _start: &str, _end: &str, _options: EdgeOptions) {}
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(diagram) = dg_parser::Diagram::parse(text) else {
        return;
    };
    if let Some(db) = diagram.flow() {
        let mut sink = NullSink;
        let _ = dg_graph::add_edges(db, &mut sink);
    }
});
