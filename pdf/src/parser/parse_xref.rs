use crate::error::*;
use crate::parser::lexer::Lexer;
use crate::parser::parse_dictionary;
use crate::xref::{XRefSection, XRefSubsection, Trailer};
use crate::primitive::{Primitive, PdfStream};
use crate::object::*;
use std::convert::TryInto;

/// Read `first count` followed by `count` fixed-width entries from the decoded payload of an
/// xref stream. Takes `&mut &[u8]` so that it can "consume" data as it reads.
fn parse_xref_subsection_from_stream(first_id: ObjNr, num_entries: usize, width: [usize; 3], data: &mut &[u8]) -> Result<XRefSubsection> {
    let [w0, w1, w2] = width;
    let needed = match num_entries.checked_mul(w0 + w1 + w2) {
        Some(needed) => needed,
        None => bail!("xref stream subsection {} declares {} entries, which overflows", first_id, num_entries),
    };
    if needed > data.len() {
        bail!("xref stream subsection {} needs {} bytes, but only {} are left", first_id, needed, data.len());
    }
    let mut section = XRefSubsection::new(first_id);
    for _ in 0..num_entries {
        // a missing type field means type 1
        let _type = if w0 == 0 {
            1
        } else {
            read_u64_from_stream(w0, data)?
        };
        let field1 = read_u64_from_stream(w1, data)?;
        let field2 = read_u64_from_stream(w2, data)?;

        match _type {
            0 => section.add_free_entry(field1 as ObjNr, field2 as GenNr),
            1 => section.add_inuse_entry(field1 as usize, field2 as GenNr),
            2 => section.add_stream_entry(field1 as ObjNr, field2 as usize),
            _ => return Err(PdfError::XRefStreamType {found: _type}),
        }
    }
    Ok(section)
}

/// Helper to read an integer with a certain amount of bytes `width` from stream.
fn read_u64_from_stream(width: usize, data: &mut &[u8]) -> Result<u64> {
    if width > std::mem::size_of::<u64>() {
        bail!("xref stream entry has invalid width {}", width);
    }
    if width > data.len() {
        bail!("xref stream entry has width {} but only {} bytes left to read", width, data.len());
    }
    let (bytes, rest) = data.split_at(width);
    *data = rest;
    Ok(bytes.iter().fold(0, |acc, &b| acc << 8 | u64::from(b)))
}

/// Decode the entries of a `/Type /XRef` stream. `/Index` defaults to `[0 Size]`.
pub fn decode_xref_stream(stream: &PdfStream) -> Result<XRefSection> {
    let info = &stream.info;
    let width: Vec<usize> = t!(info.get_required("XRef", "W")).as_array()?
        .iter()
        .map(|p| p.as_usize())
        .collect::<Result<_>>()?;
    let width: [usize; 3] = width.try_into().map_err(|w: Vec<usize>| other!("xref stream /W has {} elements instead of 3", w.len()))?;
    if width.iter().any(|&w| w > std::mem::size_of::<u64>()) {
        bail!("xref stream /W {:?} has a field wider than 8 bytes", width);
    }

    let index: Vec<u64> = match info.get("Index") {
        Some(index) => index.as_array()?.iter().map(|p| p.as_u64()).collect::<Result<_>>()?,
        None => vec![0, t!(info.get_required("XRef", "Size")).as_u64()?],
    };
    if index.len() % 2 != 0 {
        bail!("xref stream /Index has {} elements which is not an even number", index.len());
    }

    let data = t!(stream.decode());
    let mut data_left = &*data;
    let mut section = XRefSection::new();
    if width == [0, 0, 0] && index.chunks_exact(2).any(|pair| pair[1] > 0) {
        bail!("xref stream /W is [0 0 0] but /Index declares entries");
    }
    for pair in index.chunks_exact(2) {
        let count = match usize::try_from(pair[1]) {
            Ok(count) => count,
            Err(_) => bail!("xref stream subsection {} declares {} entries", pair[0], pair[1]),
        };
        let subsection = t!(parse_xref_subsection_from_stream(pair[0], count, width, &mut data_left));
        section.subsections.push(subsection);
    }
    if !data_left.is_empty() {
        warn!("{} bytes left over after the xref stream entries", data_left.len());
    }
    Ok(section)
}

/// `xref` followed by subsections, each a `first count` header and `count` entries of the form
/// `offset gen n` or `next gen f`.
pub fn parse_xref_table(lexer: &mut Lexer) -> Result<Option<XRefSection>> {
    if !lexer.next_if("xref") {
        return Ok(None);
    }
    let mut section = XRefSection::new();

    // Keep reading subsections while there is a `first count` header (and not `N G obj`)
    loop {
        let mut probe = *lexer;
        let (start_id, num_ids) = match (probe.next(), probe.next()) {
            (Ok(a), Ok(b)) if a.is_unsigned() && b.is_unsigned() && !matches!(probe.peek(), Ok(w) if w.equals(b"obj")) => {
                (t!(a.to::<ObjNr>()), t!(b.to::<usize>()))
            }
            _ => break,
        };
        *lexer = probe;

        let mut subsection = XRefSubsection::new(start_id);
        for i in 0..num_ids {
            let w1 = t!(lexer.next());
            if w1.equals(b"trailer") || w1.equals(b"startxref") {
                bail!("xref subsection {} declares {} entries, but only {} follow", start_id, num_ids, i);
            }
            let w2 = t!(lexer.next());
            let w3 = t!(lexer.next());
            if w3.equals(b"f") {
                subsection.add_free_entry(t!(w1.to::<ObjNr>()), t!(w2.to::<GenNr>()));
            } else if w3.equals(b"n") {
                subsection.add_inuse_entry(t!(w1.to::<usize>()), t!(w2.to::<GenNr>()));
            } else {
                return Err(PdfError::UnexpectedLexeme {pos: lexer.position_of(&w3), lexeme: w3.to_string(), expected: "f or n"});
            }
        }
        trace!("xref subsection {} + {}", start_id, num_ids);
        section.subsections.push(subsection);
    }
    Ok(Some(section))
}

/// `trailer <<...>> startxref N %%EOF`, or the degraded `startxref N %%EOF`.
///
/// `%%EOF` looks like a comment to the lexer, so it is matched on the raw bytes.
pub fn parse_trailer(lexer: &mut Lexer) -> Result<Option<Trailer>> {
    let mut probe = *lexer;
    let dict = if probe.next_if("trailer") {
        match t!(parse_dictionary(&mut probe)) {
            Some(dict) => Some(dict),
            None => {
                let word = t!(probe.peek());
                return Err(PdfError::UnexpectedLexeme {pos: probe.position_of(&word), lexeme: word.to_string(), expected: "<<"});
            }
        }
    } else if probe.peek()?.equals(b"startxref") {
        None
    } else {
        return Ok(None);
    };

    if let Err(e) = probe.next_expect("startxref") {
        return match e {
            PdfError::UnexpectedLexeme { pos, .. } | PdfError::EOF { pos } => Err(PdfError::MissingKeyword { pos, keyword: "startxref" }),
            e => Err(e),
        };
    }
    let startxref = t!(probe.next_as::<usize>());
    probe.skip_blank();
    if !probe.starts_with(b"%%EOF") {
        return Err(PdfError::MissingKeyword { pos: probe.here(), keyword: "%%EOF" });
    }
    probe.offset_pos(5);
    *lexer = probe;

    Ok(Some(match dict {
        Some(dict) => Trailer::new(dict, startxref),
        None => Trailer::footer(startxref),
    }))
}

/// True for a `/Type /XRef` stream.
pub fn is_xref_stream(value: &Primitive) -> bool {
    matches!(value, Primitive::Stream(s) if s.info.get_type() == Some("XRef"))
}
