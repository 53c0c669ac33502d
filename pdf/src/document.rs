//! Whole-file parsing: header, optional linearization block and the body sections, and their
//! normalization into a [`Context`].
//!
//! Sections are read in the order they appear in the file; `/Prev` chains are not followed.
//! A later section's definition of an object replaces an earlier one.

use std::cell::Cell;

use crate::context::{Context, PdfHeader, TrailerInfo};
use crate::error::*;
use crate::object::*;
use crate::options::ParseOptions;
use crate::parser::{Lexer, parse_indirect_object, parse_xref_table, parse_trailer, decode_xref_stream, is_xref_stream};
use crate::primitive::{Primitive, DictKind};
use crate::xref::{XRef, XRefSection, Trailer};

const HEADER: &[u8] = b"%PDF-";

/// One body of the file: objects, then an optional `xref` table, then the trailer.
///
/// Sections that use an xref stream keep it among `objects`.
#[derive(Debug, Clone, Default)]
pub struct ParsedSection {
    pub objects: Vec<IndirectObject>,
    pub xref: Option<XRefSection>,
    pub trailer: Option<Trailer>,
}

impl ParsedSection {
    /// Entries of the section's xref table and of any xref streams among its objects.
    pub fn xref_sections(&self) -> Result<Vec<XRefSection>> {
        let mut sections: Vec<XRefSection> = self.xref.iter().cloned().collect();
        for obj in &self.objects {
            if let Primitive::Stream(ref s) = obj.value {
                if is_xref_stream(&obj.value) {
                    sections.push(t!(decode_xref_stream(s)));
                }
            }
        }
        Ok(sections)
    }

    fn has_xref_stream(&self) -> bool {
        self.objects.iter().any(|o| is_xref_stream(&o.value))
    }
}

/// The file as read, before normalization.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub header: PdfHeader,
    /// The linearization parameter dictionary with the first-page xref section and trailer.
    pub linearization: Option<ParsedSection>,
    pub original: ParsedSection,
    /// Incremental updates, oldest first.
    pub updates: Vec<ParsedSection>,
}

impl ParsedDocument {
    /// Merge every section into one object graph.
    ///
    /// Within a section, objects stored in object streams come first and direct definitions
    /// override them. Object streams and xref streams themselves are not kept. Free entries of
    /// update sections delete older generations of the objects they name.
    pub fn into_context(self, options: &ParseOptions) -> Result<Context> {
        let mut ctx = Context::new();
        ctx.header = self.header;

        let sections = self.linearization.into_iter().map(|s| (false, s))
            .chain(std::iter::once((false, self.original)))
            .chain(self.updates.into_iter().map(|s| (true, s)));
        for (is_update, section) in sections {
            t!(merge_section(&mut ctx, section, is_update, options));
        }
        debug!("{} objects after normalization", ctx.len());
        Ok(ctx)
    }
}

fn merge_section(ctx: &mut Context, section: ParsedSection, is_update: bool, options: &ParseOptions) -> Result<()> {
    if is_update && options.apply_deletions {
        for xref in t!(section.xref_sections()) {
            for (id, entry) in xref.iter() {
                if let XRef::Free { gen_nr, .. } = *entry {
                    if id != 0 {
                        delete_older(ctx, id, gen_nr);
                    }
                }
            }
        }
    }

    let mut trailer_dict = section.trailer.and_then(|t| t.dict);
    let mut compressed = Vec::new();
    let mut direct = Vec::new();
    for obj in section.objects {
        match obj.value {
            Primitive::Stream(ref s) if ObjectStream::is_object_stream(s) => {
                let objstm = t!(ObjectStream::parse(s));
                trace!("object stream {} holds {} objects", obj.reference, objstm.n_objects());
                compressed.extend(t!(objstm.objects()));
            }
            Primitive::Stream(ref s) if is_xref_stream(&obj.value) => {
                if trailer_dict.is_none() {
                    trailer_dict = Some(s.info.clone());
                }
            }
            Primitive::Dictionary(ref d) if d.kind() == DictKind::LinearizationParams && !options.keep_linearization_dict => {
                debug!("dropping linearization parameters {}", obj.reference);
            }
            _ => direct.push(obj),
        }
    }

    for obj in compressed.into_iter().chain(direct) {
        if t!(ctx.lookup_maybe(obj.reference, None)).is_some() {
            warn!("{} is redefined; keeping the later definition", obj.reference);
        }
        ctx.assign(obj.reference, obj.value);
    }

    if let Some(dict) = trailer_dict {
        ctx.trailer_info = TrailerInfo::from_dict(&dict);
    }
    Ok(())
}

/// A free entry with generation `gen_nr` ends every earlier generation of object `id`.
fn delete_older(ctx: &mut Context, id: ObjNr, gen_nr: GenNr) {
    let stale: Vec<PlainRef> = ctx.generations(id).filter(|r| r.gen_nr() < gen_nr).collect();
    for r in stale {
        debug!("{} deleted by update", r);
        ctx.delete(r);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ParseState {
    Ready,
    Parsing,
    Done,
}

/// Reads a complete PDF file from memory. Each parser parses once.
pub struct DocumentParser<'a> {
    data: &'a [u8],
    options: ParseOptions,
    state: Cell<ParseState>,
}

impl<'a> DocumentParser<'a> {
    pub fn new(data: &'a [u8]) -> DocumentParser<'a> {
        DocumentParser::with_options(data, ParseOptions::default())
    }
    pub fn with_options(data: &'a [u8], options: ParseOptions) -> DocumentParser<'a> {
        DocumentParser {
            data,
            options,
            state: Cell::new(ParseState::Ready),
        }
    }
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn parse(&self) -> Result<ParsedDocument> {
        match self.state.get() {
            ParseState::Parsing => return Err(PdfError::ReentrantParse),
            ParseState::Done => return Err(PdfError::Reparse { what: "DocumentParser::parse" }),
            ParseState::Ready => {}
        }
        self.state.set(ParseState::Parsing);
        let result = self.parse_document();
        self.state.set(ParseState::Done);
        result
    }

    /// Parse and normalize.
    pub fn parse_into_context(&self) -> Result<Context> {
        let document = self.parse()?;
        document.into_context(&self.options)
    }

    fn parse_document(&self) -> Result<ParsedDocument> {
        let mut lexer = Lexer::new(self.data);
        let header = t!(self.parse_header(&mut lexer));
        debug!("header {}", header);

        let first = t!(parse_indirect_object(&mut lexer));
        let (linearization, first) = match first {
            Some(obj) if is_linearization_dict(&obj.value) => (Some(t!(self.parse_linearization(&mut lexer, obj))), None),
            first => (None, first),
        };

        let original = t!(self.parse_section(&mut lexer, first));
        let mut updates = Vec::new();
        while !lexer.is_empty() {
            debug!("update section {} at {}", updates.len() + 1, lexer.file_pos());
            updates.push(t!(self.parse_section(&mut lexer, None)));
        }

        Ok(ParsedDocument { header, linearization, original, updates })
    }

    /// `%PDF-M.m` within the first `header_search_limit` bytes. The lexer is left at the end of
    /// the header line.
    fn parse_header(&self, lexer: &mut Lexer) -> Result<PdfHeader> {
        let data = self.data;
        let limit = self.options.header_search_limit.saturating_add(HEADER.len()).min(data.len());
        let start = match data[.. limit].windows(HEADER.len()).position(|w| w == HEADER) {
            Some(start) => start,
            None => return Err(PdfError::MissingHeader { pos: lexer.position(0) }),
        };
        if start > 0 {
            warn!("{} bytes before the PDF header", start);
        }

        let mut pos = start + HEADER.len();
        let major = read_version_number(data, &mut pos);
        let dot = data.get(pos) == Some(&b'.');
        if dot {
            pos += 1;
        }
        let minor = read_version_number(data, &mut pos);
        let header = match (major, dot, minor) {
            (Some(major), true, Some(minor)) => PdfHeader { major, minor },
            _ => return Err(PdfError::MissingHeader { pos: lexer.position(start) }),
        };

        while pos < data.len() && !matches!(data[pos], b'\n' | b'\r') {
            pos += 1;
        }
        lexer.set_pos(pos);
        Ok(header)
    }

    /// The linearization parameters must be followed by the first-page xref section: a table
    /// with its trailer, or an xref stream.
    fn parse_linearization(&self, lexer: &mut Lexer, params: IndirectObject) -> Result<ParsedSection> {
        debug!("linearized file, parameters in {}", params.reference);
        let mut objects = vec![params];
        if let Some(xref) = t!(parse_xref_table(lexer)) {
            let pos = lexer.here();
            let trailer = match t!(parse_trailer(lexer)) {
                Some(trailer) => trailer,
                None => return Err(PdfError::MissingKeyword { pos, keyword: "trailer" }),
            };
            return Ok(ParsedSection { objects, xref: Some(xref), trailer: Some(trailer) });
        }

        let pos = lexer.here();
        match t!(parse_indirect_object(lexer)) {
            Some(obj) if is_xref_stream(&obj.value) => {
                objects.push(obj);
                let trailer = t!(parse_trailer(lexer));
                Ok(ParsedSection { objects, xref: None, trailer })
            }
            _ => Err(PdfError::MissingKeyword { pos, keyword: "xref" }),
        }
    }

    /// Objects until none match, an optional `xref` table, then the trailer.
    fn parse_section(&self, lexer: &mut Lexer, first: Option<IndirectObject>) -> Result<ParsedSection> {
        let mut section = ParsedSection {
            objects: first.into_iter().collect(),
            .. ParsedSection::default()
        };
        while let Some(obj) = t!(parse_indirect_object(lexer)) {
            section.objects.push(obj);
        }
        section.xref = t!(parse_xref_table(lexer));

        lexer.skip_filler();
        let pos = lexer.here();
        section.trailer = t!(parse_trailer(lexer));
        match section.trailer {
            Some(Trailer { dict: Some(_), .. }) => {}
            Some(Trailer { dict: None, startxref }) => {
                if !section.has_xref_stream() {
                    if !self.options.allow_degraded_trailer {
                        return Err(PdfError::MissingKeyword { pos, keyword: "trailer" });
                    }
                    warn!("section without trailer dictionary; only startxref {} recovered", startxref);
                }
            }
            None if !lexer.is_empty() => return Err(lexer.stalled()),
            None => {
                if !self.options.allow_degraded_trailer {
                    return Err(PdfError::MissingKeyword { pos, keyword: "trailer" });
                }
                warn!("file ends without a trailer");
            }
        }
        debug!("section with {} objects, xref table: {}", section.objects.len(), section.xref.is_some());
        Ok(section)
    }
}

fn is_linearization_dict(value: &Primitive) -> bool {
    matches!(value, Primitive::Dictionary(d) if d.kind() == DictKind::LinearizationParams)
}

fn read_version_number(data: &[u8], pos: &mut usize) -> Option<u8> {
    let start = *pos;
    while data.get(*pos).map_or(false, u8::is_ascii_digit) {
        *pos += 1;
    }
    std::str::from_utf8(&data[start .. *pos]).ok()?.parse().ok()
}
