use std::fs;

use glob::glob;
use pdf_graph::*;
use pdf_graph::parser::{parse, ParseFlags};

macro_rules! file_path {
    ( $subdir:expr ) => { concat!("tests/files/", $subdir) }
}

fn print_err<T>(e: PdfError) -> T {
    e.trace();
    panic!("{}", e);
}

fn read(path: &str) -> Context {
    let data = fs::read(path).unwrap();
    DocumentParser::new(&data).parse_into_context().unwrap_or_else(print_err)
}

fn write(ctx: &Context, options: WriteOptions) -> Vec<u8> {
    Writer::new(ctx, options).serialize_to_buffer().unwrap_or_else(print_err)
}

fn assert_same_objects(a: &Context, b: &Context) {
    let a: Vec<_> = a.enumerate_indirect_objects().collect();
    let b: Vec<_> = b.enumerate_indirect_objects().collect();
    assert_eq!(a, b);
}

const TWO_OBJECTS: &[u8] = b"%PDF-1.7\n\
    1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
    2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n\
    trailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n0\n%%EOF\n";

#[test]
fn catalog_and_pages() {
    let ctx = DocumentParser::new(TWO_OBJECTS).parse_into_context().unwrap_or_else(print_err);
    assert_eq!(ctx.len(), 2);
    let catalog = ctx.lookup(PlainRef::new(1, 0), Some(PrimitiveKind::Dictionary)).unwrap();
    match catalog.as_dict().unwrap().get("Type") {
        Some(Primitive::Name(ty)) => assert!(Name::ptr_eq(ty, &Name::of("Catalog"))),
        other => panic!("unexpected /Type {:?}", other),
    }
    assert_eq!(catalog.as_dict().unwrap().kind(), DictKind::Catalog);
}

#[test]
fn read_files() {
    for entry in glob("tests/files/*.pdf").expect("Failed to read glob pattern") {
        let path = entry.unwrap();
        let path = path.to_str().unwrap();
        println!("\n\n == Now testing `{}` ==\n", path);

        let ctx = read(path);
        assert!(ctx.find_catalog().is_ok(), "{}: no catalog", path);

        for options in [WriteOptions::default(), WriteOptions::compact()] {
            let data = write(&ctx, options);
            let again = DocumentParser::new(&data).parse_into_context().unwrap_or_else(print_err);
            assert_same_objects(&ctx, &again);
            assert_eq!(again.header, ctx.header);
        }
    }
}

#[test]
fn incremental_update() {
    let ctx = read(file_path!("incremental.pdf"));
    let ids: Vec<ObjNr> = ctx.enumerate_indirect_objects().map(|(r, _)| r.id()).collect();
    // object 5 was freed by the update, 7 added
    assert_eq!(ids, [1, 2, 3, 4, 6, 7]);

    let page = ctx.lookup(PlainRef::new(3, 0), Some(PrimitiveKind::Dictionary)).unwrap().as_dict().unwrap();
    assert_eq!(page["Rotate"], Primitive::Integer(90));
    assert_eq!(ctx.trailer_info.info, Some(PlainRef::new(6, 0)));

    let info = ctx.lookup(PlainRef::new(6, 0), None).unwrap().as_dict().unwrap();
    assert_eq!(info["Title"].as_string().unwrap().to_string_lossy(), "Minimal (test) file");
    assert_eq!(info["Producer"].as_string().unwrap().format, StringFormat::Hex);
}

#[test]
fn incremental_sections_are_kept_apart() {
    let data = fs::read(file_path!("incremental.pdf")).unwrap();
    let doc = DocumentParser::new(&data).parse().unwrap_or_else(print_err);
    assert_eq!(doc.original.objects.len(), 6);
    assert_eq!(doc.updates.len(), 1);
    let update = &doc.updates[0];
    assert_eq!(update.objects.len(), 2);
    let trailer = update.trailer.as_ref().unwrap();
    assert_eq!(trailer.prev(), doc.original.trailer.as_ref().map(|t| t.startxref));
}

#[test]
fn object_streams() {
    let data = fs::read(file_path!("objstm.pdf")).unwrap();
    let doc = DocumentParser::new(&data).parse().unwrap_or_else(print_err);
    assert_eq!(doc.header, PdfHeader { major: 1, minor: 5 });
    // the xref stream replaces the trailer dictionary
    assert_eq!(doc.original.trailer.as_ref().unwrap().dict, None);

    let ctx = doc.into_context(&ParseOptions::strict()).unwrap_or_else(print_err);
    let ids: Vec<ObjNr> = ctx.enumerate_indirect_objects().map(|(r, _)| r.id()).collect();
    assert_eq!(ids, [1, 2, 3, 4]);
    assert_eq!(ctx.trailer_info.root, Some(PlainRef::new(1, 0)));
    let page = ctx.lookup(PlainRef::new(3, 0), None).unwrap().as_dict().unwrap();
    assert_eq!(page.kind(), DictKind::Page);
}

#[test]
fn linearized_file() {
    let data = fs::read(file_path!("linearized.pdf")).unwrap();
    let doc = DocumentParser::new(&data).parse().unwrap_or_else(print_err);
    let lin = doc.linearization.as_ref().unwrap();
    assert_eq!(lin.objects.len(), 1);
    assert_eq!(lin.objects[0].value.as_dict().unwrap().kind(), DictKind::LinearizationParams);
    let ctx = doc.into_context(&ParseOptions::default()).unwrap_or_else(print_err);
    assert!(ctx.lookup_maybe(PlainRef::new(7, 0), None).unwrap().is_none());
    assert_eq!(ctx.len(), 3);
}

#[test]
fn compact_output() {
    let mut ctx = read(file_path!("minimal.pdf"));
    for i in 0 .. 7 {
        ctx.register(Primitive::Array(vec![Primitive::Integer(i), Primitive::name("Filler")]));
    }
    let options = WriteOptions { objects_per_stream: 4, ..WriteOptions::compact() };
    let data = write(&ctx, options);

    let doc = DocumentParser::new(&data).parse().unwrap_or_else(print_err);
    let containers = doc.original.objects.iter()
        .filter(|o| matches!(&o.value, Primitive::Stream(s) if s.info.get_type() == Some("ObjStm")))
        .count();
    // 5 of the 6 original objects and the 7 arrays are not streams
    assert_eq!(containers, 3);
    let xref = doc.original.objects.last().unwrap();
    assert_eq!(xref.value.as_stream().unwrap().info.get_type(), Some("XRef"));

    let again = doc.into_context(&ParseOptions::default()).unwrap_or_else(print_err);
    assert_same_objects(&ctx, &again);
}

#[test]
fn output_layout() {
    let ctx = DocumentParser::new(TWO_OBJECTS).parse_into_context().unwrap_or_else(print_err);
    let data = write(&ctx, WriteOptions::default());
    let expected = b"%PDF-1.7\n%\x81\x81\x81\x81\n\n\
        1 0 obj\n<<\n/Type /Catalog\n/Pages 2 0 R\n>>\nendobj\n\n\
        2 0 obj\n<<\n/Type /Pages\n/Kids []\n/Count 0\n>>\nendobj\n\n\
        xref\n0 3\n0000000000 65535 f \n0000000016 00000 n \n0000000066 00000 n \n\
        trailer\n<<\n/Size 3\n/Root 1 0 R\n>>\nstartxref\n119\n%%EOF\n";
    assert_eq!(String::from_utf8_lossy(&data), String::from_utf8_lossy(expected));
}

/// Offsets of objects 1..=n as recorded in the written file's xref table.
fn offsets(data: &[u8]) -> Vec<usize> {
    let doc = DocumentParser::new(data).parse().unwrap_or_else(print_err);
    let xref = doc.original.xref.unwrap();
    xref.iter().filter_map(|(_, e)| match *e {
        xref::XRef::Raw { pos, .. } => Some(pos),
        _ => None,
    }).collect()
}

#[test]
fn offsets_shift_by_size_delta() {
    let mut ctx = DocumentParser::new(TWO_OBJECTS).parse_into_context().unwrap_or_else(print_err);
    for i in 0 .. 3 {
        ctx.register(Primitive::Integer(i));
    }
    let before = write(&ctx, WriteOptions::default());
    let old = offsets(&before);

    let pages = ctx.get_mut(PlainRef::new(2, 0)).unwrap().as_dict_mut().unwrap();
    pages.insert("Extra", PdfString::from("twelve bytes"));
    let after = write(&ctx, WriteOptions::default());
    let new = offsets(&after);

    let delta = after.len() - before.len();
    assert_eq!(delta, "/Extra (twelve bytes)\n".len());
    assert_eq!(old[.. 2], new[.. 2]);
    for (o, n) in old[2 ..].iter().zip(&new[2 ..]) {
        assert_eq!(n - o, "/Extra (twelve bytes)\n".len());
    }
    for (o, n) in old.iter().zip(&new) {
        assert!(n >= o);
    }
    let mut lexer = parser::Lexer::new(&after[new[1] ..]);
    assert!(parser::parse_indirect_object(&mut lexer).unwrap().is_some());
}

#[test]
fn missing_catalog_writes_nothing() {
    let mut ctx = Context::new();
    ctx.register(Primitive::Integer(1));
    let err = Writer::new(&ctx, WriteOptions::default()).serialize_to_buffer().unwrap_err();
    assert!(matches!(err.root(), PdfError::MissingCatalog));
    let err = Writer::new(&ctx, WriteOptions::compact()).serialize_to_buffer().unwrap_err();
    assert!(matches!(err.root(), PdfError::MissingCatalog));
}

#[test]
fn encryption_transform() {
    fn xor(data: &[u8], id: ObjNr, _gen: GenNr) -> Vec<u8> {
        data.iter().map(|b| b ^ id as u8).collect()
    }

    let mut ctx = Context::new();
    let catalog = ctx.obj(Literal::map([("Type", Literal::from("Catalog"))]));
    ctx.register(catalog);
    let encrypt = ctx.obj(Literal::map([
        ("Filter", Literal::from("Standard")),
        ("O", Literal::Value(PdfString::from("owner").into())),
    ]));
    let encrypt = ctx.register(encrypt);
    ctx.trailer_info.encrypt = Some(encrypt.into());
    let mut info = Dictionary::new();
    info.insert("Title", PdfString::from("secret"));
    let info = ctx.register(info);
    ctx.trailer_info.info = Some(info);
    let stream = ctx.register(PdfStream::new(Dictionary::new(), b"payload".to_vec()));

    let data = write(&ctx, WriteOptions::default().with_encryption(xor));
    let again = DocumentParser::new(&data).parse_into_context().unwrap_or_else(print_err);
    let title = again.lookup(info, None).unwrap().as_dict().unwrap()["Title"].as_string().unwrap();
    assert_eq!(title.format, StringFormat::Hex);
    assert_eq!(title.as_bytes(), xor(b"secret", info.id(), 0));
    let owner = again.lookup(encrypt, None).unwrap().as_dict().unwrap()["O"].as_string().unwrap();
    assert_eq!(owner.as_bytes(), b"owner");
    let payload = again.lookup(stream, None).unwrap().as_stream().unwrap().decode().unwrap().into_owned();
    assert_eq!(payload, xor(b"payload", stream.id(), 0));
    assert_eq!(again.trailer_info.encrypt, Some(Primitive::Reference(encrypt)));

    // object streams are encrypted as a whole; the encryption dictionary stays outside them
    let data = write(&ctx, WriteOptions::compact().with_encryption(xor));
    let doc = DocumentParser::new(&data).parse().unwrap_or_else(print_err);
    let direct: Vec<&IndirectObject> = doc.original.objects.iter().collect();
    let owner = direct.iter().find(|o| o.reference == encrypt).unwrap();
    assert_eq!(owner.value.as_dict().unwrap()["O"].as_string().unwrap().as_bytes(), b"owner");
    let payload = direct.iter().find(|o| o.reference == stream).unwrap();
    assert_eq!(&*payload.value.as_stream().unwrap().decode().unwrap(), &xor(b"payload", stream.id(), 0)[..]);
    assert!(direct.iter().all(|o| o.reference != info));

    // without /Encrypt the transform is not applied
    ctx.trailer_info.encrypt = None;
    let data = write(&ctx, WriteOptions::default().with_encryption(xor));
    let again = DocumentParser::new(&data).parse_into_context().unwrap_or_else(print_err);
    let title = again.lookup(info, None).unwrap().as_dict().unwrap()["Title"].as_string().unwrap();
    assert_eq!(title.as_bytes(), b"secret");
}

#[test]
fn copy_between_documents() {
    let src = read(file_path!("minimal.pdf"));
    let mut dest = DocumentParser::new(TWO_OBJECTS).parse_into_context().unwrap_or_else(print_err);
    let before = dest.len();

    let page = ObjectCopier::new(&src, &mut dest).copy_ref(PlainRef::new(3, 0)).unwrap_or_else(print_err);
    // page, content stream and font
    assert_eq!(dest.len(), before + 3);
    let page = dest.lookup(page, None).unwrap().as_dict().unwrap();
    assert!(page.get("Parent").is_none());
    assert_eq!(page["MediaBox"], parse(b"[0 0 612 792]", ParseFlags::ARRAY).unwrap());

    let data = write(&dest, WriteOptions::default());
    assert_same_objects(&dest, &DocumentParser::new(&data).parse_into_context().unwrap_or_else(print_err));
}

#[test]
fn invalid_files() {
    assert!(DocumentParser::new(b"startxref%PDF-").parse().is_err());
    assert!(DocumentParser::new(b"%PDF-startxref>").parse().is_err());
    assert!(DocumentParser::new(b"%PDF-1.7\n1 0 obj << /A [1 2 >> endobj").parse().is_err());
    match DocumentParser::new(b"%PDF-1.7\n1 0 obj (abc endobj").parse() {
        Err(e) => assert!(matches!(e.root(), PdfError::UnbalancedParenthesis { .. }), "{:?}", e),
        Ok(_) => panic!("unterminated string accepted"),
    }
}
