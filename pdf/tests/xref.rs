use pdf_graph::*;
use pdf_graph::parser::Lexer;
use pdf_graph::xref::XRef;

fn catalog_with(ids: &[ObjNr]) -> Context {
    let mut ctx = Context::new();
    let mut catalog = Dictionary::new();
    catalog.insert("Type", Primitive::name("Catalog"));
    ctx.assign(PlainRef::new(1, 0), catalog);
    for &id in ids.iter().filter(|&&id| id != 1) {
        ctx.assign(PlainRef::new(id, 0), Primitive::Integer(id as i64));
    }
    ctx
}

/// The text between `xref` and `trailer`.
fn table(data: &[u8]) -> &str {
    let text = std::str::from_utf8(data).unwrap();
    let start = text.rfind("\nxref\n").unwrap() + 1;
    let end = text.rfind("trailer\n").unwrap();
    &text[start .. end]
}

fn subsection_headers(table: &str) -> Vec<&str> {
    table.lines().skip(1).filter(|l| l.split(' ').count() == 2).collect()
}

fn write(ctx: &Context) -> Vec<u8> {
    Writer::new(ctx, WriteOptions::default()).serialize_to_buffer().unwrap()
}

#[test]
fn contiguous_subsections() {
    let data = write(&catalog_with(&[1, 3, 4]));
    assert_eq!(subsection_headers(table(&data)), ["0 2", "3 2"]);

    let data = write(&catalog_with(&[1, 2, 5, 6]));
    assert_eq!(subsection_headers(table(&data)), ["0 3", "5 2"]);

    let data = write(&catalog_with(&[1, 2, 3]));
    assert_eq!(subsection_headers(table(&data)), ["0 4"]);
}

#[test]
fn entry_lines() {
    let data = write(&catalog_with(&[1, 2]));
    let table = table(&data);
    let lines: Vec<&str> = table.split_inclusive('\n').collect();
    assert_eq!(lines[0], "xref\n");
    assert_eq!(lines[1], "0 3\n");
    assert_eq!(lines[2], "0000000000 65535 f \n");
    for line in &lines[2 ..] {
        assert_eq!(line.len(), 20);
    }
    assert!(lines[3].ends_with(" 00000 n \n"));
}

#[test]
fn offsets_point_at_objects() {
    let data = write(&catalog_with(&[1, 2, 7]));
    let startxref = std::str::from_utf8(&data).unwrap().rfind("\nxref\n").unwrap() + 1;
    let mut lexer = Lexer::new(&data[startxref ..]);
    let section = parser::parse_xref_table(&mut lexer).unwrap().unwrap();
    for (id, entry) in section.iter() {
        if let XRef::Raw { pos, .. } = *entry {
            let mut lexer = Lexer::new(&data[pos ..]);
            let obj = parser::parse_indirect_object(&mut lexer).unwrap().unwrap();
            assert_eq!(obj.reference.id(), id);
        }
    }
}

#[test]
fn trailer_records_size_and_startxref() {
    let data = write(&catalog_with(&[1, 5]));
    let text = std::str::from_utf8(&data).unwrap();
    let xref_pos = text.rfind("\nxref\n").unwrap() + 1;
    let trailer_pos = text.rfind("trailer").unwrap();
    let mut lexer = Lexer::new(&data[trailer_pos ..]);
    let trailer = parser::parse_trailer(&mut lexer).unwrap().unwrap();
    assert_eq!(trailer.size(), Some(6));
    assert_eq!(trailer.root(), Some(PlainRef::new(1, 0)));
    assert_eq!(trailer.startxref, xref_pos);
    assert!(text.ends_with("%%EOF\n"));
}

#[test]
fn infinite_loop_invalid_file() {
    assert!(DocumentParser::new(b"startxref%PDF-").parse().is_err());
}

#[test]
fn ending_angle_bracket() {
    assert!(DocumentParser::new(b"%PDF-startxref>").parse().is_err());
    assert!(DocumentParser::new(b"%PDF-startxref<").parse().is_err());
}
