use crate::error::*;
use crate::object::*;
use crate::parser::lexer::*;
use crate::parser::{parse_with_lexer, ParseFlags};
use crate::primitive::Primitive;

/// `N G obj <value> endobj`, starting at the current position of `lexer`.
///
/// Exactly one value is read from the interior. Anything but whitespace and comments between it
/// and `endobj` is `UnparsedObjectContent`; a missing `endobj` is `MissingKeyword`.
pub fn parse_indirect_object(lexer: &mut Lexer) -> Result<Option<IndirectObject>> {
    let mut probe = *lexer;
    let (id, gen) = match (probe.next(), probe.next(), probe.next()) {
        (Ok(id), Ok(gen), Ok(kw)) if id.is_unsigned() && gen.is_unsigned() && kw.equals(b"obj") => (id, gen),
        _ => return Ok(None),
    };
    let obj_nr = t!(id.to::<ObjNr>());
    let gen_nr = t!(gen.to::<GenNr>());
    *lexer = probe;

    let value = match t!(parse_with_lexer(lexer, ParseFlags::ANY)) {
        Some(value) => value,
        None if lexer.peek()?.equals(b"endobj") => {
            warn!("object {} {} is empty; reading it as null", obj_nr, gen_nr);
            Primitive::Null
        }
        None => return Err(lexer.stalled()),
    };

    if lexer.next_if("endobj") {
        trace!("object {} {}: {}", obj_nr, gen_nr, value.get_debug_name());
        return Ok(Some(IndirectObject::new(PlainRef::new(obj_nr, gen_nr), value)));
    }
    lexer.skip_filler();
    match lexer.find(b"endobj") {
        Some(_) => Err(PdfError::UnparsedObjectContent { pos: lexer.here(), obj_nr, gen_nr }),
        None => Err(PdfError::MissingKeyword { pos: lexer.here(), keyword: "endobj" }),
    }
}
