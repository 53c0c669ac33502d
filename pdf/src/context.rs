//! The registry of indirect objects that a document is made of.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::*;
use crate::object::*;
use crate::primitive::*;

/// `%PDF-M.m`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfHeader {
    pub major: u8,
    pub minor: u8,
}
impl Default for PdfHeader {
    fn default() -> Self {
        PdfHeader { major: 1, minor: 7 }
    }
}
impl fmt::Display for PdfHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "%PDF-{}.{}", self.major, self.minor)
    }
}

/// The trailer entries that survive a parse and are written back out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrailerInfo {
    pub root: Option<PlainRef>,
    pub info: Option<PlainRef>,
    pub encrypt: Option<Primitive>,
    pub id: Option<Primitive>,
}
impl TrailerInfo {
    /// Take `/Root`, `/Info`, `/Encrypt` and `/ID` from a trailer (or xref stream) dictionary.
    pub fn from_dict(dict: &Dictionary) -> TrailerInfo {
        TrailerInfo {
            root: dict.get("Root").and_then(|p| p.as_reference().ok()),
            info: dict.get("Info").and_then(|p| p.as_reference().ok()),
            encrypt: dict.get("Encrypt").cloned(),
            id: dict.get("ID").cloned(),
        }
    }
}

/// Owns every indirect object of a document.
///
/// Values live here and nowhere else; other values point at them through [`PlainRef`]s.
#[derive(Debug, Default)]
pub struct Context {
    objects: BTreeMap<PlainRef, Primitive>,
    largest_object_number: ObjNr,
    pub trailer_info: TrailerInfo,
    pub header: PdfHeader,
}

impl Context {
    pub fn new() -> Context {
        Context::default()
    }

    /// Store `value` under `r`, replacing what was there.
    pub fn assign(&mut self, r: PlainRef, value: impl Into<Primitive>) {
        self.largest_object_number = self.largest_object_number.max(r.id());
        self.objects.insert(r, value.into());
    }

    /// A reference that is not in use yet. Does not reserve it.
    pub fn next_ref(&self) -> PlainRef {
        PlainRef::new(self.largest_object_number + 1, 0)
    }

    /// Store `value` under a fresh reference.
    pub fn register(&mut self, value: impl Into<Primitive>) -> PlainRef {
        let r = self.next_ref();
        self.assign(r, value);
        r
    }

    /// Returns whether there was an object to remove.
    pub fn delete(&mut self, r: PlainRef) -> bool {
        self.objects.remove(&r).is_some()
    }

    /// The object behind `r`; with `kind` set, anything else is an `UnexpectedPrimitive` error.
    pub fn lookup(&self, r: PlainRef, kind: Option<PrimitiveKind>) -> Result<&Primitive> {
        match self.lookup_maybe(r, kind)? {
            Some(p) => Ok(p),
            None => Err(PdfError::NullRef { obj_nr: r.id() }),
        }
    }

    /// Like [`lookup`](Context::lookup), but a missing object is `Ok(None)`.
    pub fn lookup_maybe(&self, r: PlainRef, kind: Option<PrimitiveKind>) -> Result<Option<&Primitive>> {
        let p = match self.objects.get(&r) {
            Some(p) => p,
            None => return Ok(None),
        };
        match kind {
            Some(kind) if p.kind() != kind => Err(PdfError::UnexpectedPrimitive {
                expected: kind.name(),
                found: p.kind().name(),
            }),
            _ => Ok(Some(p)),
        }
    }

    pub fn get_mut(&mut self, r: PlainRef) -> Option<&mut Primitive> {
        self.objects.get_mut(&r)
    }

    /// Every stored reference with object number `id`, by ascending generation.
    pub fn generations(&self, id: ObjNr) -> impl Iterator<Item=PlainRef> + '_ {
        self.objects.range(PlainRef::new(id, 0) ..= PlainRef::new(id, GenNr::MAX)).map(|(&r, _)| r)
    }

    /// Reverse lookup: the first reference (in ascending order) whose value equals `value`.
    pub fn get_object_ref(&self, value: &Primitive) -> Option<PlainRef> {
        self.objects.iter().find(|(_, p)| *p == value).map(|(&r, _)| r)
    }

    /// All objects, by ascending object number and then generation.
    pub fn enumerate_indirect_objects(&self) -> impl Iterator<Item=(PlainRef, &Primitive)> + '_ {
        self.objects.iter().map(|(&r, p)| (r, p))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
    pub fn largest_object_number(&self) -> ObjNr {
        self.largest_object_number
    }

    /// The document catalog: `trailer_info.root` if it points at an object, otherwise the
    /// single dictionary of kind `Catalog`.
    pub fn find_catalog(&self) -> Result<PlainRef> {
        if let Some(root) = self.trailer_info.root {
            if self.objects.contains_key(&root) {
                return Ok(root);
            }
            warn!("/Root {} does not exist; looking for a catalog", root);
        }
        let mut catalogs = self.objects.iter()
            .filter(|(_, p)| matches!(p, Primitive::Dictionary(d) if d.kind() == DictKind::Catalog))
            .map(|(&r, _)| r);
        match (catalogs.next(), catalogs.next()) {
            (Some(r), None) => Ok(r),
            (None, _) => Err(PdfError::MissingCatalog),
            (Some(first), Some(second)) => bail!("more than one catalog ({} and {}) and no usable /Root", first, second),
        }
    }

    /// Build a value graph from a [`Literal`]. Nested `Literal::Indirect` containers are
    /// registered and replaced by their reference.
    pub fn obj(&mut self, literal: impl Into<Literal>) -> Primitive {
        match literal.into() {
            Literal::Null => Primitive::Null,
            Literal::Bool(b) => Primitive::Boolean(b),
            Literal::Integer(i) => Primitive::Integer(i),
            Literal::Real(n) => Primitive::Number(n),
            Literal::Name(name) => Primitive::Name(Name::of(&name)),
            Literal::Array(items) => Primitive::Array(items.into_iter().map(|l| self.obj(l)).collect()),
            Literal::Map(entries) => {
                let mut dict = Dictionary::new();
                for (key, value) in entries {
                    let value = self.obj(value);
                    dict.insert(Name::of(&key), value);
                }
                Primitive::Dictionary(dict)
            }
            Literal::Value(p) => p,
            Literal::Indirect(inner) => {
                let value = self.obj(*inner);
                Primitive::Reference(self.register(value))
            }
        }
    }
}

impl Resolve for Context {
    fn resolve(&self, r: PlainRef) -> Result<Primitive> {
        self.lookup(r, None).map(|p| p.clone())
    }
}

/// A native description of a value graph, lowered by [`Context::obj`].
///
/// Text becomes a Name, as in `/Type /Catalog`; strings must be given as a built
/// `Literal::Value(Primitive::String(..))`.
#[derive(Debug, Clone)]
pub enum Literal {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Name(String),
    Array(Vec<Literal>),
    /// Keys in order of appearance
    Map(Vec<(String, Literal)>),
    Value(Primitive),
    Indirect(Box<Literal>),
}
impl Literal {
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item=(K, Literal)>) -> Literal {
        Literal::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
    pub fn indirect(inner: impl Into<Literal>) -> Literal {
        Literal::Indirect(Box::new(inner.into()))
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Literal {
        Literal::Bool(b)
    }
}
impl From<i64> for Literal {
    fn from(i: i64) -> Literal {
        Literal::Integer(i)
    }
}
impl From<i32> for Literal {
    fn from(i: i32) -> Literal {
        Literal::Integer(i as i64)
    }
}
impl From<f64> for Literal {
    fn from(n: f64) -> Literal {
        Literal::Real(n)
    }
}
impl<'a> From<&'a str> for Literal {
    fn from(s: &'a str) -> Literal {
        Literal::Name(s.into())
    }
}
impl From<Primitive> for Literal {
    fn from(p: Primitive) -> Literal {
        Literal::Value(p)
    }
}
impl From<PlainRef> for Literal {
    fn from(r: PlainRef) -> Literal {
        Literal::Value(Primitive::Reference(r))
    }
}
impl<T: Into<Literal>> From<Vec<T>> for Literal {
    fn from(items: Vec<T>) -> Literal {
        Literal::Array(items.into_iter().map(Into::into).collect())
    }
}
impl<T: Into<Literal>> From<Option<T>> for Literal {
    fn from(item: Option<T>) -> Literal {
        item.map_or(Literal::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_and_pages() -> Context {
        let mut ctx = Context::new();
        let mut pages = Dictionary::new();
        pages.insert("Type", Primitive::name("Pages"));
        pages.insert("Kids", Primitive::Array(vec![]));
        pages.insert("Count", 0);
        let pages = ctx.register(pages);
        let mut catalog = Dictionary::new();
        catalog.insert("Type", Primitive::name("Catalog"));
        catalog.insert("Pages", pages);
        ctx.register(catalog);
        ctx
    }

    #[test]
    fn allocation() {
        let mut ctx = Context::new();
        assert_eq!(ctx.next_ref(), PlainRef::new(1, 0));
        ctx.assign(PlainRef::new(7, 2), Primitive::Null);
        assert_eq!(ctx.largest_object_number(), 7);
        let r = ctx.register(Primitive::Integer(1));
        assert_eq!(r, PlainRef::new(8, 0));
        // no deduplication
        assert_ne!(ctx.register(Primitive::Integer(1)), r);
        assert_eq!(ctx.len(), 3);
    }

    #[test]
    fn lookup_filters_by_kind() {
        let ctx = catalog_and_pages();
        let r = PlainRef::new(2, 0);
        assert!(ctx.lookup(r, Some(PrimitiveKind::Dictionary)).is_ok());
        match ctx.lookup(r, Some(PrimitiveKind::Array)) {
            Err(PdfError::UnexpectedPrimitive { expected, found }) => {
                assert_eq!(expected, "Array");
                assert_eq!(found, "Dictionary");
            }
            r => panic!("unexpected {:?}", r),
        }
        assert!(matches!(ctx.lookup(PlainRef::new(9, 0), None), Err(PdfError::NullRef { obj_nr: 9 })));
        assert!(ctx.lookup_maybe(PlainRef::new(9, 0), Some(PrimitiveKind::Array)).unwrap().is_none());
        // generation is part of the identity
        assert!(ctx.lookup_maybe(PlainRef::new(2, 1), None).unwrap().is_none());
    }

    #[test]
    fn delete_and_enumerate() {
        let mut ctx = catalog_and_pages();
        ctx.assign(PlainRef::new(5, 0), Primitive::Null);
        ctx.assign(PlainRef::new(3, 0), Primitive::Boolean(true));
        let ids: Vec<ObjNr> = ctx.enumerate_indirect_objects().map(|(r, _)| r.id()).collect();
        assert_eq!(ids, [1, 2, 3, 5]);
        assert!(ctx.delete(PlainRef::new(3, 0)));
        assert!(!ctx.delete(PlainRef::new(3, 0)));
        assert_eq!(ctx.len(), 3);
        // deleting does not give numbers back
        assert_eq!(ctx.next_ref().id(), 6);
    }

    #[test]
    fn reverse_lookup() {
        let ctx = catalog_and_pages();
        let catalog = ctx.lookup(PlainRef::new(2, 0), None).unwrap().clone();
        assert_eq!(ctx.get_object_ref(&catalog), Some(PlainRef::new(2, 0)));
        assert_eq!(ctx.get_object_ref(&Primitive::Integer(3)), None);
    }

    #[test]
    fn catalog_lookup() {
        let mut ctx = catalog_and_pages();
        assert_eq!(ctx.find_catalog().unwrap(), PlainRef::new(2, 0));
        ctx.trailer_info.root = Some(PlainRef::new(1, 0));
        assert_eq!(ctx.find_catalog().unwrap(), PlainRef::new(1, 0));
        ctx.trailer_info.root = None;
        ctx.delete(PlainRef::new(2, 0));
        assert!(matches!(ctx.find_catalog(), Err(PdfError::MissingCatalog)));
    }

    #[test]
    fn literal_lowering() {
        let mut ctx = Context::new();
        let value = ctx.obj(Literal::map([
            ("Type", Literal::from("Page")),
            ("MediaBox", vec![0, 0, 612, 792].into()),
            ("Rotate", Literal::from(None::<i64>)),
            ("UserUnit", 1.5.into()),
            ("Resources", Literal::indirect(Literal::map([("ProcSet", vec!["PDF"].into())]))),
        ]));
        let dict = value.as_dict().unwrap();
        assert_eq!(dict.kind(), DictKind::Page);
        let keys: Vec<&str> = dict.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["Type", "MediaBox", "Rotate", "UserUnit", "Resources"]);
        assert_eq!(dict["Rotate"], Primitive::Null);
        assert_eq!(dict["UserUnit"], Primitive::Number(1.5));

        let resources = dict["Resources"].as_reference().unwrap();
        assert_eq!(resources, PlainRef::new(1, 0));
        let resources = ctx.lookup(resources, Some(PrimitiveKind::Dictionary)).unwrap();
        assert_eq!(resources.as_dict().unwrap()["ProcSet"], Primitive::Array(vec![Primitive::name("PDF")]));
    }

    #[test]
    fn lowering_a_value_is_identity() {
        let mut ctx = Context::new();
        let value = Primitive::Array(vec![Primitive::name("X"), PlainRef::new(4, 0).into(), PdfString::from("hi").into()]);
        assert_eq!(ctx.obj(value.clone()), value);
        assert!(ctx.is_empty());
    }

    #[test]
    fn resolve() {
        let ctx = catalog_and_pages();
        let pages = ctx.resolve(PlainRef::new(1, 0)).unwrap();
        assert_eq!(pages.as_dict().unwrap().kind(), DictKind::PageTree);
        let r = Primitive::Reference(PlainRef::new(1, 0)).resolve(&ctx).unwrap();
        assert_eq!(r, pages);
    }
}
