use std::fmt::{Debug, Formatter};
use std::io;

use crate::error::*;
use crate::object::*;
use crate::primitive::{Primitive, Dictionary, PdfStream};

///////////////////////////
// Cross-reference table //
///////////////////////////

/// Generation number of the head of the free list (object 0).
pub const FREE_HEAD_GEN: GenNr = 65535;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum XRef {
    /// Not currently used.
    Free {
        next_obj_nr: ObjNr,
        gen_nr: GenNr
    },

    /// In use.
    Raw {
        pos: usize,
        gen_nr: GenNr
    },
    /// In use and compressed inside an Object Stream
    Stream {
        stream_id: ObjNr,
        index: usize,
    },
}

impl XRef {
    pub fn get_gen_nr(&self) -> GenNr {
        match *self {
            XRef::Free {gen_nr, ..}
            | XRef::Raw {gen_nr, ..} => gen_nr,
            // objects in object streams always have generation 0
            XRef::Stream { .. } => 0,
        }
    }
    pub fn is_free(&self) -> bool {
        matches!(*self, XRef::Free { .. })
    }
    /// The three fields of the stream encoding: type, field 1, field 2.
    fn fields(&self) -> [u64; 3] {
        match *self {
            XRef::Free { next_obj_nr, gen_nr } => [0, next_obj_nr, gen_nr as u64],
            XRef::Raw { pos, gen_nr } => [1, pos as u64, gen_nr as u64],
            XRef::Stream { stream_id, index } => [2, stream_id, index as u64],
        }
    }
}

/// A run of consecutive object numbers, as found in PDF files.
#[derive(Debug, Clone, PartialEq)]
pub struct XRefSubsection {
    pub first_id: ObjNr,
    pub entries: Vec<XRef>,
}

impl XRefSubsection {
    pub fn new(first_id: ObjNr) -> XRefSubsection {
        XRefSubsection {
            first_id,
            entries: Vec::new(),
        }
    }
    pub fn add_free_entry(&mut self, next_obj_nr: ObjNr, gen_nr: GenNr) {
        self.entries.push(XRef::Free{next_obj_nr, gen_nr});
    }
    pub fn add_inuse_entry(&mut self, pos: usize, gen_nr: GenNr) {
        self.entries.push(XRef::Raw{pos, gen_nr});
    }
    pub fn add_stream_entry(&mut self, stream_id: ObjNr, index: usize) {
        self.entries.push(XRef::Stream{stream_id, index});
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    /// Object number after the last entry.
    pub fn end_id(&self) -> ObjNr {
        self.first_id + self.entries.len() as ObjNr
    }
    pub fn iter(&self) -> impl Iterator<Item=(ObjNr, &XRef)> + '_ {
        self.entries.iter().enumerate().map(move |(i, e)| (self.first_id + i as ObjNr, e))
    }
}

/// One cross-reference section: the subsections of a single `xref` table or xref stream.
#[derive(Clone, Default, PartialEq)]
pub struct XRefSection {
    pub subsections: Vec<XRefSubsection>,
}

impl XRefSection {
    pub fn new() -> XRefSection {
        XRefSection::default()
    }

    /// Build a section from entries sorted by object number, starting a new subsection at every
    /// gap in the numbering. Object 0 is always the free-list head.
    pub fn from_entries(entries: impl IntoIterator<Item=(ObjNr, XRef)>) -> XRefSection {
        let mut section = XRefSection::new();
        let mut head = XRefSubsection::new(0);
        head.add_free_entry(0, FREE_HEAD_GEN);
        section.subsections.push(head);

        for (id, entry) in entries {
            if id == 0 {
                continue;
            }
            match section.subsections.last_mut() {
                Some(last) if last.end_id() == id => last.entries.push(entry),
                _ => section.subsections.push(XRefSubsection { first_id: id, entries: vec![entry] }),
            }
        }
        section
    }

    pub fn iter(&self) -> impl Iterator<Item=(ObjNr, &XRef)> + '_ {
        self.subsections.iter().flat_map(|s| s.iter())
    }

    /// One past the highest object number, i.e. the trailer's `/Size`.
    pub fn size(&self) -> ObjNr {
        self.subsections.iter().map(|s| s.end_id()).max().unwrap_or(0)
    }

    /// `xref` followed by the subsection headers and their 20-byte entry lines.
    pub fn write_table(&self, out: &mut impl io::Write) -> Result<()> {
        writeln!(out, "xref")?;
        for subsection in &self.subsections {
            writeln!(out, "{} {}", subsection.first_id, subsection.len())?;
            for entry in &subsection.entries {
                match *entry {
                    XRef::Free { next_obj_nr, gen_nr } => write!(out, "{:010} {:05} f \n", next_obj_nr, gen_nr)?,
                    XRef::Raw { pos, gen_nr } => write!(out, "{:010} {:05} n \n", pos, gen_nr)?,
                    XRef::Stream { .. } => return Err(PdfError::Unimplemented { what: "compressed entries in an xref table" }),
                }
            }
        }
        Ok(())
    }

    /// Smallest `/W` that fits every entry.
    pub fn widths(&self) -> [usize; 3] {
        let mut max = [0u64; 3];
        for (_, entry) in self.iter() {
            for (m, f) in max.iter_mut().zip(entry.fields()) {
                *m = (*m).max(f);
            }
        }
        max.map(byte_width)
    }

    /// Encode as an xref stream. `info` supplies the trailer entries; `/Type`, `/W` and `/Index`
    /// are filled in here. The stream is Flate compressed.
    pub fn to_stream(&self, mut info: Dictionary) -> PdfStream {
        let widths = self.widths();
        let mut data = Vec::with_capacity(self.iter().count() * widths.iter().sum::<usize>());
        for (_, entry) in self.iter() {
            for (field, width) in entry.fields().into_iter().zip(widths) {
                data.extend_from_slice(&field.to_be_bytes()[8 - width ..]);
            }
        }
        info.insert("Type", Primitive::name("XRef"));
        info.insert("W", Primitive::Array(widths.iter().map(|&w| Primitive::from(w)).collect()));
        info.insert("Index", Primitive::Array(
            self.subsections.iter()
                .flat_map(|s| [Primitive::Integer(s.first_id as i64), Primitive::from(s.len())])
                .collect()
        ));
        PdfStream::flate(info, data)
    }
}

/// Number of bytes needed to store `n` (at least 1).
fn byte_width(n: u64) -> usize {
    let bits = 64 - n.leading_zeros() as usize;
    ((bits + 7) / 8).max(1)
}

impl Debug for XRefSection {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        for (i, entry) in self.iter() {
            match *entry {
                XRef::Free {next_obj_nr, gen_nr} => {
                    writeln!(f, "{:4}: {:010} {:05} f", i, next_obj_nr, gen_nr)?
                },
                XRef::Raw {pos, gen_nr} => {
                    writeln!(f, "{:4}: {:010} {:05} n", i, pos, gen_nr)?
                },
                XRef::Stream {stream_id, index} => {
                    writeln!(f, "{:4}: in stream {}, index {}", i, stream_id, index)?
                },
            }
        }
        Ok(())
    }
}

/// The end of a file version: the trailer dictionary (absent for xref streams and degraded
/// trailers) and the `startxref` offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Trailer {
    pub dict: Option<Dictionary>,
    pub startxref: usize,
}
impl Trailer {
    pub fn new(dict: Dictionary, startxref: usize) -> Trailer {
        Trailer { dict: Some(dict), startxref }
    }
    /// Just the `startxref` footer.
    pub fn footer(startxref: usize) -> Trailer {
        Trailer { dict: None, startxref }
    }
    fn get(&self, key: &str) -> Option<&Primitive> {
        self.dict.as_ref().and_then(|d| d.get(key))
    }
    pub fn size(&self) -> Option<u64> {
        self.get("Size").and_then(|p| p.as_u64().ok())
    }
    pub fn root(&self) -> Option<PlainRef> {
        self.get("Root").and_then(|p| p.as_reference().ok())
    }
    pub fn prev(&self) -> Option<usize> {
        self.get("Prev").and_then(|p| p.as_usize().ok())
    }
    pub fn serialize(&self, out: &mut impl io::Write) -> Result<()> {
        if let Some(ref dict) = self.dict {
            writeln!(out, "trailer")?;
            dict.serialize(out)?;
            writeln!(out)?;
        }
        write!(out, "startxref\n{}\n%%EOF\n", self.startxref)?;
        Ok(())
    }
}
