//! Parse, mutate and re-serialize the object graph of PDF files.
//!
//! [`DocumentParser`] reads a file into a [`Context`], the registry that owns every indirect
//! object. After mutation, [`Writer`] turns the context back into bytes, with either a classic
//! `xref` table or object streams and an xref stream.

#![allow(clippy::len_without_is_empty)]

#[macro_use] extern crate log;
#[macro_use] extern crate bitflags;

#[macro_use]
pub mod error;
pub mod name;
pub mod object;
pub mod primitive;
pub mod enc;
pub mod parser;
pub mod xref;
pub mod options;
pub mod context;
pub mod copier;
pub mod document;
pub mod writer;

pub use crate::error::{PdfError, Position, Result};
pub use crate::primitive::{Primitive, PrimitiveKind, Dictionary, DictKind, PdfStream, PdfString, StringFormat, Name};
pub use crate::object::{PlainRef, ObjNr, GenNr, IndirectObject, Resolve, NoResolve};
pub use crate::context::{Context, Literal, TrailerInfo, PdfHeader};
pub use crate::copier::ObjectCopier;
pub use crate::document::{DocumentParser, ParsedDocument, ParsedSection};
pub use crate::options::ParseOptions;
pub use crate::writer::{Writer, WriteOptions, XRefStrategy};
