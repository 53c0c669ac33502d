#![no_main]
use libfuzzer_sys::fuzz_target;
use pdf_graph::document::DocumentParser;
use pdf_graph::writer::{Writer, WriteOptions};

fn harness(data: &[u8]) {
    if let Ok(context) = DocumentParser::new(data).parse_into_context() {
        let _ = Writer::new(&context, WriteOptions::default()).serialize_to_buffer();
    }
}

fuzz_target!(|data: &[u8]| {
    harness(data);
});
