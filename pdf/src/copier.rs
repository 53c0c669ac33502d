//! Copy values from one [`Context`] into another.
//!
//! Every object reachable from the copied value is copied once and gets a fresh reference in
//! the destination; shared and cyclic references stay shared and cyclic.
//!
//! A page that is itself the thing being copied is detached from its page tree. Pages reached
//! through references keep their `/Parent`.

use std::collections::{HashMap, HashSet};

use crate::context::Context;
use crate::error::*;
use crate::object::*;
use crate::primitive::*;

/// Page attributes that a page inherits from its ancestors in the page tree.
const INHERITABLE_PAGE_KEYS: [&str; 4] = ["Resources", "CropBox", "MediaBox", "Rotate"];

pub struct ObjectCopier<'a> {
    src: &'a Context,
    dest: &'a mut Context,
    /// source reference -> destination reference
    visited: HashMap<PlainRef, PlainRef>,
    /// objects that have a destination reference but no value yet
    worklist: Vec<(PlainRef, PlainRef)>,
}

impl<'a> ObjectCopier<'a> {
    pub fn new(src: &'a Context, dest: &'a mut Context) -> ObjectCopier<'a> {
        ObjectCopier {
            src,
            dest,
            visited: HashMap::new(),
            worklist: Vec::new(),
        }
    }

    /// Copy `value` and everything it references. The returned value belongs in the
    /// destination context; referenced objects have already been added to it.
    pub fn copy(&mut self, value: &Primitive) -> Result<Primitive> {
        let copied = match value {
            Primitive::Dictionary(page) if page.kind() == DictKind::Page => {
                Primitive::Dictionary(self.rewrite_dict(&self.flatten_page(page)?)?)
            }
            _ => self.rewrite(value)?,
        };
        self.drain()?;
        Ok(copied)
    }

    /// Copy the object behind `r`; returns its reference in the destination.
    pub fn copy_ref(&mut self, r: PlainRef) -> Result<PlainRef> {
        if let Some(&new) = self.visited.get(&r) {
            return Ok(new);
        }
        let new = match self.src.lookup_maybe(r, None)? {
            Some(Primitive::Dictionary(page)) if page.kind() == DictKind::Page => {
                let new = self.reserve(r);
                let page = self.flatten_page(page)?;
                let value = Primitive::Dictionary(self.rewrite_dict(&page)?);
                self.dest.assign(new, value);
                new
            }
            _ => self.map_ref(r),
        };
        self.drain()?;
        Ok(new)
    }

    /// Destination reference for `r`, queueing the object for copying on first sight.
    fn map_ref(&mut self, r: PlainRef) -> PlainRef {
        if let Some(&new) = self.visited.get(&r) {
            return new;
        }
        let new = self.reserve(r);
        self.worklist.push((r, new));
        new
    }

    /// Allocate the destination number for `r`; it holds null until the value is filled in.
    fn reserve(&mut self, r: PlainRef) -> PlainRef {
        let new = self.dest.next_ref();
        self.dest.assign(new, Primitive::Null);
        self.visited.insert(r, new);
        new
    }

    fn drain(&mut self) -> Result<()> {
        while let Some((old, new)) = self.worklist.pop() {
            let value = match self.src.lookup_maybe(old, None)? {
                Some(value) => self.rewrite(value)?,
                None => {
                    warn!("{} does not exist in the source; copying it as null", old);
                    Primitive::Null
                }
            };
            trace!("copied {} -> {}", old, new);
            self.dest.assign(new, value);
        }
        Ok(())
    }

    /// Deep-copy the direct structure of `value`, mapping every reference.
    fn rewrite(&mut self, value: &Primitive) -> Result<Primitive> {
        Ok(match value {
            Primitive::Reference(r) => Primitive::Reference(self.map_ref(*r)),
            Primitive::Array(items) => Primitive::Array(
                items.iter().map(|p| self.rewrite(p)).collect::<Result<_>>()?
            ),
            Primitive::Dictionary(dict) => Primitive::Dictionary(self.rewrite_dict(dict)?),
            Primitive::Stream(stream) => {
                let mut stream = stream.clone();
                stream.info = self.rewrite_dict(&stream.info)?;
                Primitive::Stream(stream)
            }
            p => p.clone(),
        })
    }

    fn rewrite_dict(&mut self, dict: &Dictionary) -> Result<Dictionary> {
        let mut out = Dictionary::new();
        for (key, value) in dict.iter() {
            out.insert(key.clone(), self.rewrite(value)?);
        }
        Ok(out)
    }

    /// A page detached from its tree: inherited attributes are pulled in from the ancestors and
    /// `/Parent` is dropped.
    fn flatten_page(&self, page: &Dictionary) -> Result<Dictionary> {
        let mut page = page.clone();
        let mut seen = HashSet::new();
        let mut parent = page.remove("Parent");
        while let Some(Primitive::Reference(r)) = parent {
            if !seen.insert(r) {
                bail!("page tree cycle through {}", r);
            }
            let node = match self.src.lookup_maybe(r, Some(PrimitiveKind::Dictionary))? {
                Some(Primitive::Dictionary(node)) => node,
                _ => break,
            };
            for key in INHERITABLE_PAGE_KEYS {
                if page.get(key).is_none() {
                    if let Some(value) = node.get(key) {
                        page.insert(key, value.clone());
                    }
                }
            }
            parent = node.get("Parent").cloned();
        }
        Ok(page)
    }
}
