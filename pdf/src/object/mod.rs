//! References, indirect objects and the `Resolve` trait.

mod stream;

pub use self::stream::*;

use crate::primitive::*;
use crate::error::*;

use std::fmt;
use std::io;

pub type ObjNr = u64;
pub type GenNr = u16;

/// Something that can look up the value behind a reference.
pub trait Resolve {
    fn resolve(&self, r: PlainRef) -> Result<Primitive>;
}

pub struct NoResolve;
impl Resolve for NoResolve {
    fn resolve(&self, r: PlainRef) -> Result<Primitive> {
        Err(PdfError::NullRef { obj_nr: r.id() })
    }
}

///////
// Refs
///////

/// An indirect reference `N G R`.
///
/// The pair is the whole identity: two refs with the same numbers are the same value, so a
/// `PlainRef` can be copied and compared freely. Construct with [`PlainRef::new`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PlainRef {
    id: ObjNr,
    gen: GenNr,
}
impl PlainRef {
    #[inline]
    pub const fn new(id: ObjNr, gen: GenNr) -> PlainRef {
        PlainRef { id, gen }
    }
    #[inline]
    pub const fn id(&self) -> ObjNr {
        self.id
    }
    #[inline]
    pub const fn gen_nr(&self) -> GenNr {
        self.gen
    }
    pub fn serialize(&self, out: &mut impl io::Write) -> Result<()> {
        write!(out, "{} {} R", self.id, self.gen)?;
        Ok(())
    }
}
impl fmt::Debug for PlainRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}
impl fmt::Display for PlainRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

/// A value bound to its reference; the unit of storage in a file.
#[derive(Clone, Debug, PartialEq)]
pub struct IndirectObject {
    pub reference: PlainRef,
    pub value: Primitive,
}
impl IndirectObject {
    pub fn new(reference: PlainRef, value: Primitive) -> IndirectObject {
        IndirectObject { reference, value }
    }
    /// `N G obj\n<value>\nendobj\n\n`
    pub fn serialize(&self, out: &mut impl io::Write) -> Result<()> {
        writeln!(out, "{} {} obj", self.reference.id, self.reference.gen)?;
        self.value.serialize(out)?;
        write!(out, "\nendobj\n\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refs_compare_by_pair() {
        let a = PlainRef::new(12, 0);
        let b = PlainRef::new(12, 0);
        assert_eq!(a, b);
        assert_ne!(a, PlainRef::new(12, 1));
        assert!(PlainRef::new(2, 5) < PlainRef::new(3, 0));
    }

    #[test]
    fn indirect_object_layout() {
        let obj = IndirectObject::new(PlainRef::new(7, 0), Primitive::Integer(42));
        let mut out = Vec::new();
        obj.serialize(&mut out).unwrap();
        assert_eq!(out, b"7 0 obj\n42\nendobj\n\n");
    }
}
