extern crate pdf_graph;

use std::env::args;
use std::fs;
use std::time::SystemTime;

use pdf_graph::error::PdfError;
use pdf_graph::{DocumentParser, Writer, WriteOptions};

/// roundtrip <input> <output> [--compact]
fn main() -> Result<(), PdfError> {
    let input = args().nth(1).expect("no input file given");
    let output = args().nth(2).expect("no output file given");
    let compact = args().skip(3).any(|a| a == "--compact");
    let now = SystemTime::now();

    let data = fs::read(&input)?;
    let doc = DocumentParser::new(&data).parse()?;
    println!("read {}: {} with {} update(s)", input, doc.header, doc.updates.len());
    let context = doc.into_context(&Default::default())?;
    println!("{} objects, largest object number {}", context.len(), context.largest_object_number());

    let options = if compact { WriteOptions::compact() } else { WriteOptions::default() };
    let out = Writer::new(&context, options).serialize_to_buffer()?;
    fs::write(&output, &out)?;
    println!("wrote {} bytes to {}", out.len(), output);

    if let Ok(elapsed) = now.elapsed() {
        println!("Time: {}s", elapsed.as_secs_f64());
    }
    Ok(())
}
