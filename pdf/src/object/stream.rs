use crate::object::*;
use crate::primitive::*;
use crate::error::*;
use crate::parser::{Lexer, parse_with_lexer, ParseFlags};

use std::io::Write;

/// A decoded `/Type /ObjStm` stream: `N` pairs of (object number, offset) followed by the
/// objects themselves, starting at `/First`.
pub struct ObjectStream {
    /// Object number and byte offset (relative to `first`) of each object.
    entries: Vec<(ObjNr, usize)>,
    first: usize,
    data: Vec<u8>,
}

impl ObjectStream {
    pub fn is_object_stream(stream: &PdfStream) -> bool {
        stream.info.get_type() == Some("ObjStm")
    }

    pub fn parse(stream: &PdfStream) -> Result<ObjectStream> {
        let n = t!(stream.info.get_required("ObjStm", "N")).as_usize()?;
        let first = t!(stream.info.get_required("ObjStm", "First")).as_usize()?;
        let data = t!(stream.decode()).into_owned();

        let header_len = first.min(data.len());
        // every pair takes at least two bytes of header, whatever /N claims
        let mut entries = Vec::with_capacity(n.min(header_len / 2));
        {
            let header = &data[.. header_len];
            let mut lexer = Lexer::new(header);
            for _ in 0 .. n {
                let obj_nr = t!(lexer.next_as::<ObjNr>());
                let offset = t!(lexer.next_as::<usize>());
                entries.push((obj_nr, offset));
            }
        }
        debug!("object stream with {} objects", n);

        Ok(ObjectStream { entries, first, data })
    }

    /// Absolute position of an entry's offset within the decoded data.
    fn data_pos(&self, offset: usize) -> Result<usize> {
        match self.first.checked_add(offset) {
            Some(pos) => Ok(pos),
            None => bail!("object stream offset {} past /First {} overflows", offset, self.first),
        }
    }

    pub fn get_object_slice(&self, index: usize) -> Result<&[u8]> {
        if index >= self.entries.len() {
            err!(PdfError::ObjStmOutOfBounds {index, max: self.entries.len()});
        }
        let start = self.data_pos(self.entries[index].1)?;
        let end = match self.entries.get(index + 1) {
            Some(&(_, next)) => self.data_pos(next)?,
            None => self.data.len(),
        };
        match self.data.get(start .. end) {
            Some(slice) => Ok(slice),
            None => bail!("object {} of object stream lies outside its data ({}..{} of {})", index, start, end, self.data.len()),
        }
    }

    /// Returns the number of contained objects
    pub fn n_objects(&self) -> usize {
        self.entries.len()
    }

    /// Parse every contained object. They all have generation 0 and cannot be streams.
    pub fn objects(&self) -> Result<Vec<IndirectObject>> {
        let mut objects = Vec::with_capacity(self.entries.len());
        for (index, &(obj_nr, _)) in self.entries.iter().enumerate() {
            let slice = self.get_object_slice(index)?;
            let mut lexer = Lexer::with_offset(slice, self.data_pos(self.entries[index].1)?);
            let value = match t!(parse_with_lexer(&mut lexer, ParseFlags::ANY - ParseFlags::STREAM)) {
                Some(value) => value,
                None => return Err(lexer.stalled()),
            };
            objects.push(IndirectObject::new(PlainRef::new(obj_nr, 0), value));
        }
        Ok(objects)
    }
}

/// Collects objects for one object stream while writing.
#[derive(Default)]
pub struct ObjectStreamBuilder {
    header: Vec<u8>,
    body: Vec<u8>,
    count: usize,
}
impl ObjectStreamBuilder {
    pub fn new() -> ObjectStreamBuilder {
        ObjectStreamBuilder::default()
    }
    pub fn len(&self) -> usize {
        self.count
    }
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
    /// Append an object; returns its index in the stream.
    pub fn push(&mut self, obj_nr: ObjNr, value: &Primitive) -> Result<usize> {
        if let Primitive::Stream(_) = value {
            bail!("object {} is a stream and cannot be stored in an object stream", obj_nr);
        }
        if !self.body.is_empty() {
            self.body.push(b'\n');
        }
        write!(self.header, "{} {} ", obj_nr, self.body.len())?;
        value.serialize(&mut self.body)?;
        self.count += 1;
        Ok(self.count - 1)
    }
    pub fn build(self, compress: bool) -> PdfStream {
        let mut info = Dictionary::new();
        info.insert("Type", Primitive::name("ObjStm"));
        info.insert("N", self.count);
        info.insert("First", self.header.len());
        let mut data = self.header;
        data.extend_from_slice(&self.body);
        if compress {
            PdfStream::flate(info, data)
        } else {
            PdfStream::new(info, data)
        }
    }
}
