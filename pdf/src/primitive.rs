use crate::error::*;
use crate::object::{PlainRef, Resolve};
use crate::enc::{self, StreamFilter};

pub use crate::name::Name;

use std::{fmt, io};
use std::ops::{Deref, Index};
use std::borrow::Cow;
use indexmap::IndexMap;
use itertools::Itertools;

#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Null,
    Integer (i64),
    Number (f64),
    Boolean (bool),
    String (PdfString),
    Stream (PdfStream),
    Dictionary (Dictionary),
    Array (Vec<Primitive>),
    Reference (PlainRef),
    Name (Name),
}

/// Type tag of a `Primitive`, used to filter lookups.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrimitiveKind {
    Null,
    Boolean,
    /// Integer or real
    Number,
    String,
    HexString,
    Name,
    Array,
    Dictionary,
    Stream,
    Reference,
}
impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Null => "Null",
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::Number => "Number",
            PrimitiveKind::String => "String",
            PrimitiveKind::HexString => "HexString",
            PrimitiveKind::Name => "Name",
            PrimitiveKind::Array => "Array",
            PrimitiveKind::Dictionary => "Dictionary",
            PrimitiveKind::Stream => "Stream",
            PrimitiveKind::Reference => "Reference",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Primitive::Null => write!(f, "null"),
            Primitive::Integer(i) => write!(f, "{}", i),
            Primitive::Number(n) => write!(f, "{}", n),
            Primitive::Boolean(b) => write!(f, "{}", b),
            Primitive::String(ref s) => write!(f, "{:?}", s),
            Primitive::Stream(_) => write!(f, "stream"),
            Primitive::Dictionary(ref d) => write!(f, "{}", d),
            Primitive::Array(ref arr) => write!(f, "[{}]", arr.iter().format(", ")),
            Primitive::Reference(r) => write!(f, "@{}", r.id()),
            Primitive::Name(ref s) => write!(f, "{}", s),
        }
    }
}
impl Primitive {
    pub fn serialize(&self, out: &mut impl io::Write) -> Result<()> {
        match self {
            Primitive::Null => write!(out, "null")?,
            Primitive::Integer(i) => write!(out, "{}", i)?,
            Primitive::Number(n) => serialize_real(*n, out)?,
            Primitive::Boolean(b) => write!(out, "{}", b)?,
            Primitive::String(ref s) => s.serialize(out)?,
            Primitive::Stream(ref s) => s.serialize(out)?,
            Primitive::Dictionary(ref d) => d.serialize(out)?,
            Primitive::Array(ref arr) => serialize_list(arr, out)?,
            Primitive::Reference(r) => r.serialize(out)?,
            Primitive::Name(ref s) => s.serialize(out)?,
        }
        Ok(())
    }
    pub fn name(name: &str) -> Primitive {
        Primitive::Name(Name::of(name))
    }
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Null => PrimitiveKind::Null,
            Primitive::Integer(..) | Primitive::Number(..) => PrimitiveKind::Number,
            Primitive::Boolean(..) => PrimitiveKind::Boolean,
            Primitive::String(s) if s.format == StringFormat::Hex => PrimitiveKind::HexString,
            Primitive::String(..) => PrimitiveKind::String,
            Primitive::Stream(..) => PrimitiveKind::Stream,
            Primitive::Dictionary(..) => PrimitiveKind::Dictionary,
            Primitive::Array(..) => PrimitiveKind::Array,
            Primitive::Reference(..) => PrimitiveKind::Reference,
            Primitive::Name(..) => PrimitiveKind::Name,
        }
    }
}

// PDF reals have no exponent form. Rust's float Display never emits one either; a trailing
// ".0" keeps integral reals from reading back as integers.
fn serialize_real(n: f64, out: &mut impl io::Write) -> Result<()> {
    if !n.is_finite() {
        bail!("cannot write non-finite number {}", n);
    }
    if n.fract() == 0.0 {
        write!(out, "{:.1}", n)?;
    } else {
        write!(out, "{}", n)?;
    }
    Ok(())
}

fn serialize_list(arr: &[Primitive], out: &mut impl io::Write) -> Result<()> {
    let mut parts = arr.iter();
    write!(out, "[")?;
    if let Some(first) = parts.next() {
        first.serialize(out)?;
    }
    for p in parts {
        write!(out, " ")?;
        p.serialize(out)?;
    }
    write!(out, "]")?;
    Ok(())
}

/// Specialised dictionary variants, decided by `/Type` (or `/Linearized`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum DictKind {
    #[default]
    Plain,
    Catalog,
    Page,
    PageTree,
    LinearizationParams,
}
impl DictKind {
    pub fn classify(dict: &IndexMap<Name, Primitive>) -> DictKind {
        if dict.contains_key(&b"Linearized"[..]) {
            return DictKind::LinearizationParams;
        }
        match dict.get(&b"Type"[..]) {
            Some(Primitive::Name(ty)) => match ty.as_str() {
                "Catalog" => DictKind::Catalog,
                "Page" => DictKind::Page,
                "Pages" => DictKind::PageTree,
                _ => DictKind::Plain,
            },
            _ => DictKind::Plain,
        }
    }
}

/// Primitive Dictionary type.
///
/// The [`DictKind`] is derived from `/Type` and `/Linearized` each time it is asked for, so it
/// follows every change made through `insert`, `remove`, `get_mut` or `iter_mut`.
#[derive(Default, Clone, PartialEq)]
pub struct Dictionary {
    dict: IndexMap<Name, Primitive>,
}
impl Dictionary {
    pub fn new() -> Dictionary {
        Dictionary::default()
    }
    pub fn len(&self) -> usize {
        self.dict.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn kind(&self) -> DictKind {
        DictKind::classify(&self.dict)
    }
    pub fn get(&self, key: &str) -> Option<&Primitive> {
        self.dict.get(key.as_bytes())
    }
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Primitive> {
        self.dict.get_mut(key.as_bytes())
    }
    pub fn insert(&mut self, key: impl Into<Name>, val: impl Into<Primitive>) -> Option<Primitive> {
        self.dict.insert(key.into(), val.into())
    }
    pub fn iter(&self) -> impl Iterator<Item=(&Name, &Primitive)> {
        self.dict.iter()
    }
    pub fn iter_mut(&mut self) -> impl Iterator<Item=(&Name, &mut Primitive)> {
        self.dict.iter_mut()
    }
    /// Removes the entry, keeping the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<Primitive> {
        self.dict.shift_remove(key.as_bytes())
    }
    /// Look up `key`, which must exist.
    pub fn get_required(&self, typ: &'static str, key: &str) -> Result<&Primitive> {
        self.get(key).ok_or(PdfError::MissingEntry { typ, field: key.into() })
    }
    /// `/Type` as a string, if present.
    pub fn get_type(&self) -> Option<&str> {
        self.get("Type").and_then(|t| t.as_name().ok())
    }
    pub fn serialize(&self, out: &mut impl io::Write) -> Result<()> {
        writeln!(out, "<<")?;
        for (key, val) in self.iter() {
            key.serialize(out)?;
            write!(out, " ")?;
            val.serialize(out)?;
            writeln!(out)?;
        }
        write!(out, ">>")?;
        Ok(())
    }
}
impl Deref for Dictionary {
    type Target = IndexMap<Name, Primitive>;
    fn deref(&self) -> &IndexMap<Name, Primitive> {
        &self.dict
    }
}
impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{{")?;
        for (k, v) in self {
            writeln!(f, "{:>15}: {}", k, v)?;
        }
        write!(f, "}}")
    }
}
impl fmt::Display for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{}>", self.iter().format_with(", ", |(k, v), f| f(&format_args!("{}={}", k, v))))
    }
}
impl<'a> Index<&'a str> for Dictionary {
    type Output = Primitive;
    fn index(&self, idx: &'a str) -> &Primitive {
        self.dict.index(idx.as_bytes())
    }
}
impl IntoIterator for Dictionary {
    type Item = (Name, Primitive);
    type IntoIter = indexmap::map::IntoIter<Name, Primitive>;
    fn into_iter(self) -> Self::IntoIter {
        self.dict.into_iter()
    }
}
impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a Name, &'a Primitive);
    type IntoIter = indexmap::map::Iter<'a, Name, Primitive>;
    fn into_iter(self) -> Self::IntoIter {
        self.dict.iter()
    }
}
impl FromIterator<(Name, Primitive)> for Dictionary {
    fn from_iter<T: IntoIterator<Item=(Name, Primitive)>>(iter: T) -> Dictionary {
        Dictionary { dict: iter.into_iter().collect() }
    }
}

/// Primitive Stream: dictionary plus payload.
#[derive(Clone, Debug, PartialEq)]
pub struct PdfStream {
    pub info: Dictionary,
    inner: StreamInner,
}

#[derive(Clone, Debug, PartialEq)]
enum StreamInner {
    /// Bytes exactly as they appear between `stream` and `endstream`, encoded with the
    /// filters listed in `info`.
    Raw { data: Vec<u8> },
    /// Decoded bytes; `filters` are applied when the stream is written.
    Pending { data: Vec<u8>, filters: Vec<StreamFilter> },
}

impl PdfStream {
    /// A stream whose payload is already encoded according to `info`'s `/Filter`.
    pub fn from_raw(info: Dictionary, data: Vec<u8>) -> PdfStream {
        let mut info = info;
        info.insert("Length", Primitive::Integer(data.len() as i64));
        PdfStream { info, inner: StreamInner::Raw { data } }
    }
    /// An unfiltered stream: any `/Filter` and `/DecodeParms` in `info` are dropped.
    pub fn new(mut info: Dictionary, data: Vec<u8>) -> PdfStream {
        info.remove("Filter");
        info.remove("DecodeParms");
        PdfStream::from_raw(info, data)
    }
    /// A stream holding decoded `data`, to be encoded with `filters` (in decode order) on write.
    pub fn with_filters(info: Dictionary, data: Vec<u8>, filters: Vec<StreamFilter>) -> PdfStream {
        PdfStream { info, inner: StreamInner::Pending { data, filters } }
    }
    pub fn flate(info: Dictionary, data: Vec<u8>) -> PdfStream {
        PdfStream::with_filters(info, data, vec![StreamFilter::FlateDecode(enc::LZWFlateParams::default())])
    }
    /// Used by the parser: keeps the bytes and the dictionary as found, `/Length` included.
    pub(crate) fn parsed(info: Dictionary, data: Vec<u8>) -> PdfStream {
        PdfStream { info, inner: StreamInner::Raw { data } }
    }

    pub fn is_encoded(&self) -> bool {
        matches!(self.inner, StreamInner::Raw { .. })
    }

    /// The filter chain this stream's payload is (or will be) encoded with, in decode order.
    pub fn filters(&self) -> Result<Vec<StreamFilter>> {
        match self.inner {
            StreamInner::Raw { .. } => StreamFilter::from_dict(&self.info),
            StreamInner::Pending { ref filters, .. } => Ok(filters.clone()),
        }
    }

    /// Decoded payload: each filter's output feeds the next.
    pub fn decode(&self) -> Result<Cow<'_, [u8]>> {
        match self.inner {
            StreamInner::Raw { ref data } => {
                let filters = StreamFilter::from_dict(&self.info)?;
                let mut out = Cow::Borrowed(data.as_slice());
                for filter in &filters {
                    out = Cow::Owned(enc::decode(&out, filter)?);
                }
                Ok(out)
            }
            StreamInner::Pending { ref data, .. } => Ok(Cow::Borrowed(data)),
        }
    }

    /// Final dictionary and payload as they will be written: filters applied, `/Filter` and
    /// `/Length` set.
    pub fn encoded(&self) -> Result<(Cow<'_, Dictionary>, Cow<'_, [u8]>)> {
        match self.inner {
            StreamInner::Raw { ref data } => {
                if self.info.get("Length") == Some(&Primitive::Integer(data.len() as i64)) {
                    Ok((Cow::Borrowed(&self.info), Cow::Borrowed(data)))
                } else {
                    let mut info = self.info.clone();
                    info.insert("Length", Primitive::Integer(data.len() as i64));
                    Ok((Cow::Owned(info), Cow::Borrowed(data)))
                }
            }
            StreamInner::Pending { ref data, ref filters } => {
                let mut encoded = Cow::Borrowed(data.as_slice());
                for filter in filters.iter().rev() {
                    encoded = Cow::Owned(enc::encode(&encoded, filter)?);
                }
                let mut info = self.info.clone();
                match filters.len() {
                    0 => { info.remove("Filter"); }
                    1 => { info.insert("Filter", Primitive::name(filters[0].name())); }
                    _ => {
                        info.insert("Filter", Primitive::Array(
                            filters.iter().map(|f| Primitive::name(f.name())).collect()
                        ));
                    }
                }
                info.remove("DecodeParms");
                let params: Vec<Option<Dictionary>> = filters.iter().map(|f| f.params()).collect();
                if params.iter().any(|p| p.is_some()) {
                    if let [Some(ref p)] = params[..] {
                        info.insert("DecodeParms", p.clone());
                    } else {
                        info.insert("DecodeParms", Primitive::Array(
                            params.into_iter().map(|p| p.map(Primitive::Dictionary).unwrap_or(Primitive::Null)).collect()
                        ));
                    }
                }
                info.insert("Length", Primitive::Integer(encoded.len() as i64));
                Ok((Cow::Owned(info), encoded))
            }
        }
    }

    /// Apply pending filters now, so the stream holds exactly the bytes that will be written.
    pub fn finalize(&mut self) -> Result<()> {
        let (info, data) = self.encoded()?;
        let (info, data) = (info.into_owned(), data.into_owned());
        self.info = info;
        self.inner = StreamInner::Raw { data };
        Ok(())
    }

    /// Replace the payload with already encoded bytes (used by the writer's encrypt pass).
    pub(crate) fn set_raw(&mut self, data: Vec<u8>) {
        self.info.insert("Length", Primitive::Integer(data.len() as i64));
        self.inner = StreamInner::Raw { data };
    }

    pub fn serialize(&self, out: &mut impl io::Write) -> Result<()> {
        let (info, data) = self.encoded()?;
        info.serialize(out)?;
        write!(out, "\nstream\n")?;
        out.write_all(&data)?;
        write!(out, "\nendstream")?;
        Ok(())
    }
}

macro_rules! unexpected_primitive {
    ($expected:ident, $found:expr) => (
        Err(PdfError::UnexpectedPrimitive {
            expected: stringify!($expected),
            found: $found
        })
    )
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum StringFormat {
    /// `(...)`
    #[default]
    Literal,
    /// `<...>`
    Hex,
}

/// Primitive String type.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PdfString {
    pub data: Vec<u8>,
    pub format: StringFormat,
}
impl fmt::Debug for PdfString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"")?;
        for &b in self.data.as_slice() {
            match b {
                b'"' => write!(f, "\\\"")?,
                b' ' ..= b'~' => write!(f, "{}", b as char)?,
                o @ 0 ..= 7  => write!(f, "\\{}", o)?,
                x => write!(f, "\\x{:02x}", x)?
            }
        }
        write!(f, "\"")
    }
}

impl PdfString {
    pub fn new(data: Vec<u8>) -> PdfString {
        PdfString { data, format: StringFormat::Literal }
    }
    pub fn hex(data: Vec<u8>) -> PdfString {
        PdfString { data, format: StringFormat::Hex }
    }
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
    pub fn serialize(&self, out: &mut impl io::Write) -> Result<()> {
        match self.format {
            StringFormat::Hex => {
                write!(out, "<")?;
                for &b in &self.data {
                    write!(out, "{:02X}", b)?;
                }
                write!(out, ">")?;
            }
            StringFormat::Literal => {
                write!(out, "(")?;
                for &b in &self.data {
                    match b {
                        b'\\' | b'(' | b')' => out.write_all(&[b'\\', b])?,
                        // a raw CR would be read back as LF
                        b'\r' => out.write_all(b"\\r")?,
                        _ => out.write_all(&[b])?,
                    }
                }
                write!(out, ")")?;
            }
        }
        Ok(())
    }
    /// Text of the string: UTF-16BE if it starts with a byte order mark, else bytes as-is with
    /// invalid UTF-8 replaced.
    pub fn to_string_lossy(&self) -> String {
        if self.data.starts_with(&[0xfe, 0xff]) {
            let units = self.data[2..].chunks(2).map(|c| match *c {
                [hi, lo] => u16::from_be_bytes([hi, lo]),
                _ => 0xFFFD,
            });
            char::decode_utf16(units)
                .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        } else {
            String::from_utf8_lossy(&self.data).into()
        }
    }
}
impl AsRef<[u8]> for PdfString {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
impl<'a> From<&'a str> for PdfString {
    fn from(value: &'a str) -> Self {
        PdfString::new(value.as_bytes().to_vec())
    }
}

impl Primitive {
    /// For debugging / error messages: get the name of the variant
    pub fn get_debug_name(&self) -> &'static str {
        match *self {
            Primitive::Integer (..) => "Integer",
            Primitive::Number (..) => "Real",
            _ => self.kind().name(),
        }
    }
    /// resolve the primitive if it is a reference, otherwise do nothing
    pub fn resolve(self, r: &impl Resolve) -> Result<Primitive> {
        match self {
            Primitive::Reference(id) => r.resolve(id),
            _ => Ok(self)
        }
    }
    pub fn as_integer(&self) -> Result<i64> {
        match *self {
            Primitive::Integer(n) => Ok(n),
            ref p => unexpected_primitive!(Integer, p.get_debug_name())
        }
    }
    pub fn as_u64(&self) -> Result<u64> {
        match *self {
            Primitive::Integer(n) if n >= 0 => Ok(n as u64),
            Primitive::Integer(_) => bail!("negative integer"),
            ref p => unexpected_primitive!(Integer, p.get_debug_name())
        }
    }
    pub fn as_usize(&self) -> Result<usize> {
        match *self {
            Primitive::Integer(n) if n >= 0 => Ok(n as usize),
            Primitive::Integer(_) => bail!("negative integer"),
            ref p => unexpected_primitive!(Integer, p.get_debug_name())
        }
    }
    pub fn as_number(&self) -> Result<f64> {
        match *self {
            Primitive::Integer(n) => Ok(n as f64),
            Primitive::Number(f) => Ok(f),
            ref p => unexpected_primitive!(Number, p.get_debug_name())
        }
    }
    pub fn as_bool(&self) -> Result<bool> {
        match *self {
            Primitive::Boolean (b) => Ok(b),
            ref p => unexpected_primitive!(Boolean, p.get_debug_name())
        }
    }
    pub fn as_name(&self) -> Result<&str> {
        match self {
            Primitive::Name(ref name) => Ok(name.as_str()),
            p => unexpected_primitive!(Name, p.get_debug_name())
        }
    }
    pub fn as_string(&self) -> Result<&PdfString> {
        match self {
            Primitive::String(ref data) => Ok(data),
            p => unexpected_primitive!(String, p.get_debug_name())
        }
    }
    pub fn as_array(&self) -> Result<&[Primitive]> {
        match self {
            Primitive::Array(ref v) => Ok(v),
            p => unexpected_primitive!(Array, p.get_debug_name())
        }
    }
    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Primitive::Dictionary(ref dict) => Ok(dict),
            p => unexpected_primitive!(Dictionary, p.get_debug_name())
        }
    }
    pub fn as_dict_mut(&mut self) -> Result<&mut Dictionary> {
        match self {
            Primitive::Dictionary(ref mut dict) => Ok(dict),
            p => unexpected_primitive!(Dictionary, p.get_debug_name())
        }
    }
    pub fn as_stream(&self) -> Result<&PdfStream> {
        match self {
            Primitive::Stream(ref s) => Ok(s),
            p => unexpected_primitive!(Stream, p.get_debug_name())
        }
    }
    pub fn as_reference(&self) -> Result<PlainRef> {
        match *self {
            Primitive::Reference(id) => Ok(id),
            ref p => unexpected_primitive!(Reference, p.get_debug_name())
        }
    }
    pub fn into_array(self) -> Result<Vec<Primitive>> {
        match self {
            Primitive::Array(v) => Ok(v),
            p => unexpected_primitive!(Array, p.get_debug_name())
        }
    }
    pub fn into_dictionary(self) -> Result<Dictionary> {
        match self {
            Primitive::Dictionary(dict) => Ok(dict),
            p => unexpected_primitive!(Dictionary, p.get_debug_name())
        }
    }
    pub fn into_stream(self) -> Result<PdfStream> {
        match self {
            Primitive::Stream (s) => Ok(s),
            p => unexpected_primitive!(Stream, p.get_debug_name())
        }
    }
}

impl From<i64> for Primitive {
    fn from(x: i64) -> Primitive {
        Primitive::Integer(x)
    }
}
impl From<i32> for Primitive {
    fn from(x: i32) -> Primitive {
        Primitive::Integer(x as i64)
    }
}
impl From<usize> for Primitive {
    fn from(x: usize) -> Primitive {
        Primitive::Integer(x as i64)
    }
}
impl From<u64> for Primitive {
    fn from(x: u64) -> Primitive {
        Primitive::Integer(x as i64)
    }
}
impl From<f64> for Primitive {
    fn from(x: f64) -> Primitive {
        Primitive::Number(x)
    }
}
impl From<bool> for Primitive {
    fn from(x: bool) -> Primitive {
        Primitive::Boolean(x)
    }
}
impl From<Name> for Primitive {
    fn from(x: Name) -> Primitive {
        Primitive::Name(x)
    }
}
impl From<PdfString> for Primitive {
    fn from(x: PdfString) -> Primitive {
        Primitive::String (x)
    }
}
impl From<PdfStream> for Primitive {
    fn from(x: PdfStream) -> Primitive {
        Primitive::Stream (x)
    }
}
impl From<Dictionary> for Primitive {
    fn from(x: Dictionary) -> Primitive {
        Primitive::Dictionary (x)
    }
}
impl From<Vec<Primitive>> for Primitive {
    fn from(x: Vec<Primitive>) -> Primitive {
        Primitive::Array (x)
    }
}
impl From<PlainRef> for Primitive {
    fn from(x: PlainRef) -> Primitive {
        Primitive::Reference (x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_bytes(p: &Primitive) -> Vec<u8> {
        let mut out = Vec::new();
        p.serialize(&mut out).unwrap();
        out
    }

    #[test]
    fn utf16be_string() {
        let s = PdfString::new(vec![0xfe, 0xff, 0x20, 0x09]);
        assert_eq!(s.to_string_lossy(), "\u{2009}");
        let s = PdfString::new(vec![0xfe, 0xff, 0xd8, 0x34]);
        assert_eq!(s.to_string_lossy(), String::from(char::REPLACEMENT_CHARACTER));
    }

    #[test]
    fn literal_string_escapes() {
        let s = Primitive::String(PdfString::new(b"a(b)\\c\rd".to_vec()));
        assert_eq!(to_bytes(&s), b"(a\\(b\\)\\\\c\\rd)");
        let h = Primitive::String(PdfString::hex(vec![0x90, 0x1f]));
        assert_eq!(to_bytes(&h), b"<901F>");
        assert_eq!(h.kind(), PrimitiveKind::HexString);
    }

    #[test]
    fn reals_keep_a_fraction() {
        assert_eq!(to_bytes(&Primitive::Number(2.0)), b"2.0");
        assert_eq!(to_bytes(&Primitive::Number(-0.25)), b"-0.25");
        assert_eq!(to_bytes(&Primitive::Number(1e-7)), b"0.0000001");
        assert_eq!(to_bytes(&Primitive::Integer(-3)), b"-3");
    }

    #[test]
    fn dictionary_kind_follows_type() {
        let mut dict = Dictionary::new();
        assert_eq!(dict.kind(), DictKind::Plain);
        dict.insert("Type", Name::of("Catalog"));
        assert_eq!(dict.kind(), DictKind::Catalog);
        dict.insert("Type", Name::of("Pages"));
        assert_eq!(dict.kind(), DictKind::PageTree);
        dict.remove("Type");
        assert_eq!(dict.kind(), DictKind::Plain);
        dict.insert("Linearized", 1);
        assert_eq!(dict.kind(), DictKind::LinearizationParams);
    }

    #[test]
    fn dictionary_kind_follows_in_place_edits() {
        let mut dict = Dictionary::new();
        dict.insert("Type", Name::of("Page"));
        *dict.get_mut("Type").unwrap() = Primitive::name("Catalog");
        assert_eq!(dict.kind(), DictKind::Catalog);
        for (key, value) in dict.iter_mut() {
            if key == "Type" {
                *value = Primitive::name("Pages");
            }
        }
        assert_eq!(dict.kind(), DictKind::PageTree);
    }

    #[test]
    fn unfiltered_stream_drops_filter_entries() {
        let mut info = Dictionary::new();
        info.insert("Filter", Primitive::name("FlateDecode"));
        info.insert("DecodeParms", Dictionary::new());
        let stream = PdfStream::new(info, b"plain".to_vec());
        assert!(stream.info.get("Filter").is_none());
        assert!(stream.info.get("DecodeParms").is_none());
        assert_eq!(stream.info.get("Length"), Some(&Primitive::Integer(5)));
        assert_eq!(&*stream.decode().unwrap(), b"plain");
    }

    #[test]
    fn dictionary_keeps_insertion_order() {
        let mut dict = Dictionary::new();
        dict.insert("Z", 1);
        dict.insert("A", 2);
        dict.insert("M", 3);
        dict.remove("A");
        let keys: Vec<&str> = dict.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["Z", "M"]);
        assert_eq!(to_bytes(&Primitive::Dictionary(dict)), b"<<\n/Z 1\n/M 3\n>>");
    }

    #[test]
    fn pending_stream_sets_length_and_filter() {
        let stream = PdfStream::flate(Dictionary::new(), b"hello hello hello".to_vec());
        let (info, data) = stream.encoded().unwrap();
        assert_eq!(info.get("Length"), Some(&Primitive::Integer(data.len() as i64)));
        assert_eq!(info.get("Filter"), Some(&Primitive::name("FlateDecode")));
        let mut stream = stream.clone();
        stream.finalize().unwrap();
        assert!(stream.is_encoded());
        assert_eq!(&*stream.decode().unwrap(), b"hello hello hello");
    }

    #[test]
    fn type_mismatch_names_both_sides() {
        let err = Primitive::Integer(1).as_name().unwrap_err();
        match err {
            PdfError::UnexpectedPrimitive { expected, found } => {
                assert_eq!(expected, "Name");
                assert_eq!(found, "Integer");
            }
            e => panic!("unexpected error {:?}", e),
        }
    }
}
