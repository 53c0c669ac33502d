//! Basic functionality for parsing a PDF file.
//!
//! Every production takes a lexer and returns `Ok(Some(value))` with the lexer moved past the
//! value, `Ok(None)` with the lexer untouched when the input does not start with that
//! production, or `Err` when it does but the content is broken.

mod lexer;
mod parse_object;
mod parse_xref;

pub use self::lexer::*;
pub use self::parse_object::*;
pub use self::parse_xref::*;

use crate::error::*;
use crate::enc::StreamFilter;
use crate::primitive::{Primitive, Dictionary, PdfStream, PdfString, Name};
use crate::object::{ObjNr, GenNr, PlainRef};

bitflags! {
    /// Which productions `parse_with_lexer` may try.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct ParseFlags: u16 {
        const INTEGER = 1 << 0;
        const STREAM = 1 << 1;
        const DICT = 1 << 2;
        const NUMBER = 1 << 3;
        const NAME = 1 << 4;
        const ARRAY = 1 << 5;
        const STRING = 1 << 6;
        const BOOL = 1 << 7;
        const NULL = 1 << 8;
        const REF = 1 << 9;
        const ANY = (1 << 10) - 1;
    }
}

/// Parse exactly one value from `data`.
pub fn parse(data: &[u8], flags: ParseFlags) -> Result<Primitive> {
    let mut lexer = Lexer::new(data);
    parse_with_lexer(&mut lexer, flags)?.ok_or_else(|| lexer.stalled())
}

/// Try every production allowed by `flags`, in order: dictionary (or stream), array, name,
/// literal string, hex string, reference, number, boolean, null.
pub fn parse_with_lexer(lexer: &mut Lexer, flags: ParseFlags) -> Result<Option<Primitive>> {
    let first = t!(lexer.peek());
    if first.is_empty() {
        return Ok(None);
    }

    if flags.intersects(ParseFlags::DICT | ParseFlags::STREAM) && first.equals(b"<<") {
        return parse_dictionary_or_stream(lexer, flags);
    }
    if flags.contains(ParseFlags::ARRAY) && first.equals(b"[") {
        return parse_array(lexer).map(|a| a.map(Primitive::Array));
    }
    if flags.contains(ParseFlags::NAME) && first[0] == b'/' {
        lexer.next()?;
        return Ok(Some(Primitive::Name(Name::from_escaped(&first[1..]))));
    }
    if flags.contains(ParseFlags::STRING) {
        if first.equals(b"(") {
            return parse_literal_string(lexer).map(|s| s.map(Primitive::String));
        }
        if first.equals(b"<") {
            return parse_hex_string(lexer).map(|s| s.map(Primitive::String));
        }
    }
    if flags.contains(ParseFlags::REF) {
        if let Some(r) = parse_reference(lexer)? {
            return Ok(Some(Primitive::Reference(r)));
        }
    }
    if flags.intersects(ParseFlags::INTEGER | ParseFlags::NUMBER) {
        if let Some(n) = parse_number(lexer, flags)? {
            return Ok(Some(n));
        }
    }
    if flags.contains(ParseFlags::BOOL) {
        if lexer.next_if("true") {
            return Ok(Some(Primitive::Boolean(true)));
        }
        if lexer.next_if("false") {
            return Ok(Some(Primitive::Boolean(false)));
        }
    }
    if flags.contains(ParseFlags::NULL) && lexer.next_if("null") {
        return Ok(Some(Primitive::Null));
    }
    Ok(None)
}

/// A value that has to be there.
fn expect_value(lexer: &mut Lexer) -> Result<Primitive> {
    match parse_with_lexer(lexer, ParseFlags::ANY)? {
        Some(p) => Ok(p),
        None if lexer.is_empty() => Err(lexer.eof_error()),
        None => Err(lexer.stalled()),
    }
}

fn closing_bracket(word: &[u8]) -> bool {
    matches!(word, b">>" | b"]" | b")" | b">" | b"}")
}

pub fn parse_dictionary(lexer: &mut Lexer) -> Result<Option<Dictionary>> {
    if !lexer.next_if("<<") {
        return Ok(None);
    }
    let mut dict = Dictionary::new();
    loop {
        let word = t!(lexer.peek());
        if word.is_empty() {
            return Err(lexer.eof_error());
        }
        if word.equals(b">>") {
            lexer.next()?;
            break;
        }
        if word[0] == b'/' {
            lexer.next()?;
            let key = Name::from_escaped(&word[1..]);
            let value = t!(expect_value(lexer));
            dict.insert(key, value);
        } else if closing_bracket(&word) {
            return Err(PdfError::MismatchedBracket {
                pos: lexer.position_of(&word),
                expected: ">>",
                found: word.to_string(),
            });
        } else {
            return Err(PdfError::UnexpectedLexeme {
                pos: lexer.here(),
                lexeme: word.to_string(),
                expected: "/Name or >>",
            });
        }
    }
    trace!("dictionary {:?} with {} entries", dict.kind(), dict.len());
    Ok(Some(dict))
}

fn parse_dictionary_or_stream(lexer: &mut Lexer, flags: ParseFlags) -> Result<Option<Primitive>> {
    let start = *lexer;
    let dict = match parse_dictionary(lexer)? {
        Some(dict) => dict,
        None => return Ok(None),
    };
    let mut probe = *lexer;
    probe.skip_filler();
    if probe.starts_with(b"stream") && flags.contains(ParseFlags::STREAM) {
        *lexer = probe;
        let stream = t!(parse_stream_body(lexer, dict));
        return Ok(Some(Primitive::Stream(stream)));
    }
    if !flags.contains(ParseFlags::DICT) {
        *lexer = start;
        return Ok(None);
    }
    Ok(Some(Primitive::Dictionary(dict)))
}

/// Everything after the stream dictionary: `stream` EOL payload EOL? `endstream`.
fn parse_stream_body(lexer: &mut Lexer, info: Dictionary) -> Result<PdfStream> {
    t!(lexer.next_stream());
    let start = lexer.get_pos();
    let buf = lexer.buf();

    let declared = match info.get("Length") {
        Some(&Primitive::Integer(n)) if n >= 0 => Some(n as usize),
        _ => None,
    };
    let direct_end = declared.and_then(|len| {
        let end = start.checked_add(len)?;
        let mut probe = *lexer;
        probe.set_pos(end);
        probe.skip_blank();
        if end <= buf.len() && probe.starts_with(b"endstream") {
            Some(end)
        } else {
            None
        }
    });

    let end = match direct_end {
        Some(end) => end,
        None => {
            let keyword = match lexer.find(b"endstream") {
                Some(pos) => pos,
                None => return Err(PdfError::MissingKeyword { pos: lexer.here(), keyword: "endstream" }),
            };
            let mut end = keyword;
            if end >= start + 2 && &buf[end - 2 .. end] == b"\r\n" {
                end -= 2;
            } else if end > start && matches!(buf[end - 1], b'\n' | b'\r') {
                end -= 1;
            }
            match declared {
                Some(len) => warn!("stream /Length {} does not end at 'endstream'; using {} bytes found by search", len, end - start),
                None => debug!("stream without direct /Length; {} bytes found by search", end - start),
            }
            end
        }
    };

    let data = buf[start .. end].to_vec();
    lexer.set_pos(end);
    t!(lexer.next_expect("endstream"));

    for filter in filter_names(&info) {
        if !StreamFilter::is_known(filter) {
            warn!("unknown stream filter /{}; payload kept as is", filter);
        }
    }
    Ok(PdfStream::parsed(info, data))
}

fn filter_names(info: &Dictionary) -> Vec<&str> {
    match info.get("Filter") {
        Some(Primitive::Name(name)) => vec![name.as_str()],
        Some(Primitive::Array(arr)) => arr.iter().filter_map(|p| p.as_name().ok()).collect(),
        _ => vec![],
    }
}

pub fn parse_array(lexer: &mut Lexer) -> Result<Option<Vec<Primitive>>> {
    if !lexer.next_if("[") {
        return Ok(None);
    }
    let mut array = Vec::new();
    loop {
        let word = t!(lexer.peek());
        if word.is_empty() {
            return Err(lexer.eof_error());
        }
        if word.equals(b"]") {
            lexer.next()?;
            break;
        }
        if closing_bracket(&word) {
            return Err(PdfError::MismatchedBracket {
                pos: lexer.position_of(&word),
                expected: "]",
                found: word.to_string(),
            });
        }
        array.push(t!(expect_value(lexer)));
    }
    Ok(Some(array))
}

pub fn parse_literal_string(lexer: &mut Lexer) -> Result<Option<PdfString>> {
    let open = *lexer;
    if !lexer.next_if("(") {
        return Ok(None);
    }
    let (string, consumed) = match read_literal_string(lexer.get_remaining_slice()) {
        Ok(r) => r,
        Err(_) => {
            let mut at = open;
            at.skip_filler();
            return Err(PdfError::UnbalancedParenthesis { pos: at.here() });
        }
    };
    lexer.offset_pos(consumed);
    Ok(Some(PdfString::new(string)))
}

pub fn parse_hex_string(lexer: &mut Lexer) -> Result<Option<PdfString>> {
    if !lexer.next_if("<") {
        return Ok(None);
    }
    let start = lexer.get_pos();
    let (string, consumed) = match read_hex_string(lexer.get_remaining_slice()) {
        Ok(r) => r,
        Err(PdfError::EOF { .. }) => return Err(lexer.eof_error()),
        Err(PdfError::HexDecode { pos, bytes }) => return Err(PdfError::UnexpectedLexeme {
            pos: lexer.position(start + pos.saturating_sub(1)),
            lexeme: String::from_utf8_lossy(&bytes).into(),
            expected: "hex digit or >",
        }),
        Err(e) => return Err(e),
    };
    lexer.offset_pos(consumed);
    Ok(Some(PdfString::hex(string)))
}

/// `N G R`
pub fn parse_reference(lexer: &mut Lexer) -> Result<Option<PlainRef>> {
    let mut probe = *lexer;
    let id = probe.next();
    let gen = probe.next();
    let r = probe.next();
    match (id, gen, r) {
        (Ok(id), Ok(gen), Ok(r)) if id.is_unsigned() && gen.is_unsigned() && r.equals(b"R") => {
            match (id.to::<ObjNr>(), gen.to::<GenNr>()) {
                (Ok(id), Ok(gen)) => {
                    *lexer = probe;
                    Ok(Some(PlainRef::new(id, gen)))
                }
                _ => Ok(None),
            }
        }
        _ => Ok(None),
    }
}

/// Integer or real. Signs and a fraction are allowed, exponents are not.
pub fn parse_number(lexer: &mut Lexer, flags: ParseFlags) -> Result<Option<Primitive>> {
    let word = t!(lexer.peek());
    if word.is_empty() || !word.looks_numeric() {
        return Ok(None);
    }
    let value = if word.is_integer() {
        match word.to::<i64>() {
            Ok(i) => Primitive::Integer(i),
            // too large for an integer
            Err(_) => Primitive::Number(t!(word.to::<f64>())),
        }
    } else if word.is_real_number() {
        let text = t!(word.as_str());
        let (sign, digits) = match text.as_bytes()[0] {
            b'+' | b'-' => text.split_at(1),
            _ => ("", text),
        };
        let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
        // normalized so the float parser sees digits on both sides of the dot
        let normal = format!(
            "{}{}.{}",
            sign,
            if int.is_empty() { "0" } else { int },
            if frac.is_empty() { "0" } else { frac }
        );
        match normal.parse::<f64>() {
            Ok(f) => Primitive::Number(f),
            Err(_) => return Err(PdfError::InvalidNumber { pos: lexer.position_of(&word), lexeme: word.to_string() }),
        }
    } else {
        return Err(PdfError::InvalidNumber { pos: lexer.position_of(&word), lexeme: word.to_string() });
    };
    match value {
        Primitive::Integer(_) if !flags.contains(ParseFlags::INTEGER) && !flags.contains(ParseFlags::NUMBER) => return Ok(None),
        Primitive::Number(_) if !flags.contains(ParseFlags::NUMBER) => return Ok(None),
        _ => {}
    }
    lexer.next()?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(data: &[u8]) -> Primitive {
        parse(data, ParseFlags::ANY).unwrap()
    }

    #[test]
    fn dict_with_hexstring() {
        let data = b"<< /Filter /FlateDecode /Length 1 0 R /Id <1de5d4f8ccac7c3f9c7e4d9b0ddd8f9d> >>";
        let dict = p(data).into_dictionary().unwrap();
        assert_eq!(dict.get("Length"), Some(&Primitive::Reference(PlainRef::new(1, 0))));
        let id = dict["Id"].as_string().unwrap();
        assert_eq!(id.as_bytes().len(), 16);
        assert_eq!(id.format, crate::primitive::StringFormat::Hex);
    }

    #[test]
    fn references_and_numbers() {
        assert_eq!(
            p(b"[1 0 R 2 3 -4 5.5 .5 -.5 +6 7.]"),
            Primitive::Array(vec![
                Primitive::Reference(PlainRef::new(1, 0)),
                Primitive::Integer(2),
                Primitive::Integer(3),
                Primitive::Integer(-4),
                Primitive::Number(5.5),
                Primitive::Number(0.5),
                Primitive::Number(-0.5),
                Primitive::Integer(6),
                Primitive::Number(7.0),
            ])
        );
        assert_eq!(p(b"99999999999999999999"), Primitive::Number(1e20));
    }

    #[test]
    fn keywords() {
        assert_eq!(p(b"true"), Primitive::Boolean(true));
        assert_eq!(p(b" false"), Primitive::Boolean(false));
        assert_eq!(p(b"%c\nnull"), Primitive::Null);
    }

    #[test]
    fn no_match_leaves_lexer_untouched() {
        let mut lexer = Lexer::new(b"  endobj");
        assert!(parse_with_lexer(&mut lexer, ParseFlags::ANY).unwrap().is_none());
        assert_eq!(lexer.get_pos(), 0);

        let mut lexer = Lexer::new(b"<< /A 1 >>");
        assert!(parse_with_lexer(&mut lexer, ParseFlags::STREAM).unwrap().is_none());
        assert_eq!(lexer.get_pos(), 0);

        let err = parse(b"endobj", ParseFlags::ANY).unwrap_err();
        assert!(matches!(err, PdfError::StalledParser { .. }));
    }

    #[test]
    fn mismatched_brackets() {
        let err = parse(b"[1 2 >>", ParseFlags::ANY).unwrap_err();
        match *err.root() {
            PdfError::MismatchedBracket { pos, expected, ref found } => {
                assert_eq!(expected, "]");
                assert_eq!(found, ">>");
                assert_eq!(pos.offset, 5);
            }
            ref e => panic!("unexpected error {:?}", e),
        }
        let err = parse(b"<< /A 1 ]", ParseFlags::ANY).unwrap_err();
        assert!(matches!(err.root(), PdfError::MismatchedBracket { expected: ">>", .. }));
    }

    #[test]
    fn unbalanced_string() {
        let err = parse(b"\n(abc (def)", ParseFlags::ANY).unwrap_err();
        match *err.root() {
            PdfError::UnbalancedParenthesis { pos } => assert_eq!((pos.line, pos.column), (2, 1)),
            ref e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn invalid_number() {
        let err = parse(b"[12abc]", ParseFlags::ANY).unwrap_err();
        assert!(matches!(err.root(), PdfError::InvalidNumber { .. }));
    }

    #[test]
    fn stream_with_direct_length() {
        let data = b"<< /Length 5 >>\nstream\r\nhello\nendstream";
        let stream = p(data).into_stream().unwrap();
        assert_eq!(&*stream.decode().unwrap(), b"hello");
    }

    #[test]
    fn stream_with_wrong_or_indirect_length() {
        for data in [
            &b"<< /Length 2 >>stream\nhello world\r\nendstream"[..],
            b"<< /Length 8 0 R >>stream\nhello world\nendstream",
        ] {
            let stream = p(data).into_stream().unwrap();
            assert_eq!(&*stream.decode().unwrap(), b"hello world");
        }
        let err = parse(b"<< >>stream\nhello", ParseFlags::ANY).unwrap_err();
        assert!(matches!(err.root(), PdfError::MissingKeyword { keyword: "endstream", .. }));
    }

    #[test]
    fn names_are_interned() {
        let a = p(b"/Foo#20Bar");
        match a {
            Primitive::Name(ref name) => assert!(Name::ptr_eq(name, &Name::of("Foo Bar"))),
            ref p => panic!("not a name: {:?}", p),
        }
    }
}
