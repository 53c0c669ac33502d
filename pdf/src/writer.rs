//! Serialize a [`Context`] into a complete PDF file.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use crate::context::Context;
use crate::error::*;
use crate::object::*;
use crate::primitive::{Primitive, Dictionary, PdfString};
use crate::xref::{XRef, XRefSection, Trailer};

/// Encrypts the bytes of a string or stream belonging to the given object.
pub type EncryptFn = Arc<dyn Fn(&[u8], ObjNr, GenNr) -> Vec<u8> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XRefStrategy {
    /// Every object on its own, an `xref` table and a `trailer` dictionary.
    #[default]
    Table,
    /// Object streams and an xref stream.
    Stream,
}

#[derive(Clone)]
pub struct WriteOptions {
    pub strategy: XRefStrategy,
    /// At most this many objects go into one object stream.
    pub objects_per_stream: usize,
    pub compress_object_streams: bool,
    /// Applied to strings and stream payloads when the document has an `/Encrypt` entry.
    pub encrypt: Option<EncryptFn>,
}

impl WriteOptions {
    pub fn compact() -> WriteOptions {
        WriteOptions {
            strategy: XRefStrategy::Stream,
            .. WriteOptions::default()
        }
    }
    pub fn with_encryption(self, encrypt: impl Fn(&[u8], ObjNr, GenNr) -> Vec<u8> + Send + Sync + 'static) -> WriteOptions {
        WriteOptions {
            encrypt: Some(Arc::new(encrypt)),
            .. self
        }
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            strategy: XRefStrategy::Table,
            objects_per_stream: 50,
            compress_object_streams: true,
            encrypt: None,
        }
    }
}

impl fmt::Debug for WriteOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WriteOptions")
            .field("strategy", &self.strategy)
            .field("objects_per_stream", &self.objects_per_stream)
            .field("compress_object_streams", &self.compress_object_streams)
            .field("encrypt", &self.encrypt.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

pub struct Writer<'a> {
    context: &'a Context,
    options: WriteOptions,
}

impl<'a> Writer<'a> {
    pub fn new(context: &'a Context, options: WriteOptions) -> Writer<'a> {
        Writer { context, options }
    }

    /// The whole file. Fails with `MissingCatalog` before anything is written if the document
    /// has no catalog.
    pub fn serialize_to_buffer(&self) -> Result<Vec<u8>> {
        let root = t!(self.context.find_catalog());
        let objects = t!(self.prepare());

        let mut out = Vec::new();
        let header = self.context.header;
        writeln!(out, "{}", header)?;
        out.extend_from_slice(b"%\x81\x81\x81\x81\n\n");

        match self.options.strategy {
            XRefStrategy::Table => t!(self.write_classic(&mut out, objects, root)),
            XRefStrategy::Stream => t!(self.write_compact(&mut out, objects, root)),
        }
        Ok(out)
    }

    /// The objects to write, one generation per object number, with every stream's filters
    /// applied and `/Length` set.
    fn prepare(&self) -> Result<Vec<IndirectObject>> {
        let mut objects: Vec<IndirectObject> = Vec::with_capacity(self.context.len());
        for (r, value) in self.context.enumerate_indirect_objects() {
            if r.id() == 0 {
                warn!("not writing {}: object 0 is the head of the free list", r);
                continue;
            }
            let mut value = value.clone();
            if let Primitive::Stream(ref mut s) = value {
                t!(s.finalize());
            }
            match objects.last_mut() {
                Some(last) if last.reference.id() == r.id() => {
                    warn!("{} shadows {}", r, last.reference);
                    *last = IndirectObject::new(r, value);
                }
                _ => objects.push(IndirectObject::new(r, value)),
            }
        }
        Ok(objects)
    }

    /// The reference of the encryption dictionary, which is never encrypted itself.
    fn encrypt_dict_ref(&self) -> Option<PlainRef> {
        match self.context.trailer_info.encrypt {
            Some(Primitive::Reference(r)) => Some(r),
            _ => None,
        }
    }

    fn encryption(&self) -> Option<&EncryptFn> {
        match (&self.options.encrypt, &self.context.trailer_info.encrypt) {
            (Some(f), Some(_)) => Some(f),
            (Some(_), None) => {
                debug!("encryption transform given, but the document has no /Encrypt");
                None
            }
            _ => None,
        }
    }

    /// Write one indirect object, encrypting it if needed; returns its offset.
    fn write_object(&self, out: &mut Vec<u8>, mut obj: IndirectObject) -> Result<usize> {
        if let Some(f) = self.encryption() {
            if Some(obj.reference) != self.encrypt_dict_ref() {
                t!(encrypt_value(&mut obj.value, f.as_ref(), obj.reference));
            }
        }
        let pos = out.len();
        trace!("{} at {}", obj.reference, pos);
        t!(obj.serialize(out));
        Ok(pos)
    }

    fn trailer_dict(&self, size: ObjNr, root: PlainRef) -> Dictionary {
        let info = &self.context.trailer_info;
        let mut dict = Dictionary::new();
        dict.insert("Size", size);
        dict.insert("Root", root);
        if let Some(r) = info.info {
            dict.insert("Info", r);
        }
        if let Some(ref encrypt) = info.encrypt {
            dict.insert("Encrypt", encrypt.clone());
        }
        if let Some(ref id) = info.id {
            dict.insert("ID", id.clone());
        }
        dict
    }

    fn write_classic(&self, out: &mut Vec<u8>, objects: Vec<IndirectObject>, root: PlainRef) -> Result<()> {
        let mut entries = Vec::with_capacity(objects.len());
        for obj in objects {
            let r = obj.reference;
            let pos = t!(self.write_object(out, obj));
            entries.push((r.id(), XRef::Raw { pos, gen_nr: r.gen_nr() }));
        }
        let section = XRefSection::from_entries(entries);

        let startxref = out.len();
        t!(section.write_table(out));
        let trailer = Trailer::new(self.trailer_dict(section.size(), root), startxref);
        t!(trailer.serialize(out));
        Ok(())
    }

    fn write_compact(&self, out: &mut Vec<u8>, objects: Vec<IndirectObject>, root: PlainRef) -> Result<()> {
        let encrypt_ref = self.encrypt_dict_ref();
        let (packable, direct): (Vec<IndirectObject>, Vec<IndirectObject>) = objects.into_iter().partition(|obj| {
            obj.reference.gen_nr() == 0
                && Some(obj.reference) != encrypt_ref
                && !matches!(obj.value, Primitive::Stream(_))
        });

        let mut entries = BTreeMap::new();
        let mut next_id = self.context.largest_object_number() + 1;
        let mut containers = Vec::new();
        for chunk in packable.chunks(self.options.objects_per_stream.max(1)) {
            let stream_id = next_id;
            next_id += 1;
            let mut builder = ObjectStreamBuilder::new();
            for obj in chunk {
                let index = t!(builder.push(obj.reference.id(), &obj.value));
                entries.insert(obj.reference.id(), XRef::Stream { stream_id, index });
            }
            let mut stream = builder.build(self.options.compress_object_streams);
            t!(stream.finalize());
            debug!("object stream {} with {} objects", stream_id, chunk.len());
            containers.push(IndirectObject::new(PlainRef::new(stream_id, 0), Primitive::Stream(stream)));
        }

        for obj in direct.into_iter().chain(containers) {
            let r = obj.reference;
            let pos = t!(self.write_object(out, obj));
            entries.insert(r.id(), XRef::Raw { pos, gen_nr: r.gen_nr() });
        }

        let xref_ref = PlainRef::new(next_id, 0);
        let startxref = out.len();
        entries.insert(xref_ref.id(), XRef::Raw { pos: startxref, gen_nr: 0 });
        let section = XRefSection::from_entries(entries);

        let mut xref_stream = section.to_stream(self.trailer_dict(section.size(), root));
        t!(xref_stream.finalize());
        t!(IndirectObject::new(xref_ref, Primitive::Stream(xref_stream)).serialize(out));
        t!(Trailer::footer(startxref).serialize(out));
        Ok(())
    }
}

/// Encrypt every string in `value` and, for a stream, its payload. Encrypted strings are
/// written in hex form.
fn encrypt_value(value: &mut Primitive, f: &(dyn Fn(&[u8], ObjNr, GenNr) -> Vec<u8> + Send + Sync), r: PlainRef) -> Result<()> {
    match value {
        Primitive::String(s) => {
            *s = PdfString::hex(f(s.as_bytes(), r.id(), r.gen_nr()));
        }
        Primitive::Array(items) => {
            for item in items {
                encrypt_value(item, f, r)?;
            }
        }
        Primitive::Dictionary(dict) => {
            for (_, v) in dict.iter_mut() {
                encrypt_value(v, f, r)?;
            }
        }
        Primitive::Stream(stream) => {
            for (_, v) in stream.info.iter_mut() {
                encrypt_value(v, f, r)?;
            }
            stream.finalize()?;
            let data = f(&stream.encoded()?.1, r.id(), r.gen_nr());
            stream.set_raw(data);
        }
        _ => {}
    }
    Ok(())
}
