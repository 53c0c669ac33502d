use snafu::Snafu;
use crate::object::{ObjNr, GenNr};
use std::error::Error;
use std::fmt;
use std::io;

/// Location of a parse error inside the buffer that was being parsed.
///
/// `line` and `column` are 1-based, `offset` is the absolute byte offset.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}
impl Position {
    /// Compute line and column of `pos` within `buf`. `file_offset` is added to `offset` so that
    /// errors from sub-buffers still point into the file.
    pub fn locate(buf: &[u8], pos: usize, file_offset: usize) -> Position {
        let pos = pos.min(buf.len());
        let before = &buf[..pos];
        let line = 1 + before.iter().filter(|&&b| b == b'\n').count();
        let column = match before.iter().rposition(|&b| b == b'\n') {
            Some(nl) => pos - nl,
            None => pos + 1,
        };
        Position { line, column, offset: file_offset + pos }
    }
}
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}, column {} (offset {})", self.line, self.column, self.offset)
    }
}

fn at(pos: &Option<Position>) -> String {
    match pos {
        Some(pos) => format!(" at {}", pos),
        None => String::new(),
    }
}

#[derive(Debug, Snafu)]
pub enum PdfError {
    // Syntax / parsing
    #[snafu(display("Unexpected end of file at {}", pos))]
    EOF { pos: Position },

    #[snafu(display("No %PDF- header found near {}", pos))]
    MissingHeader { pos: Position },

    #[snafu(display("Mismatched brackets at {}: expected '{}', found '{}'", pos, expected, found))]
    MismatchedBracket { pos: Position, expected: &'static str, found: String },

    #[snafu(display("Unbalanced parenthesis in literal string starting at {}", pos))]
    UnbalancedParenthesis { pos: Position },

    #[snafu(display("Missing keyword '{}' at {}", keyword, pos))]
    MissingKeyword { pos: Position, keyword: &'static str },

    #[snafu(display("Unsupported stream filter /{}{}", name, at(pos)))]
    UnsupportedFilter { name: String, pos: Option<Position> },

    #[snafu(display("Parser stalled at {}: no production matched. Rest: {:?}", pos, rest))]
    StalledParser { pos: Position, rest: String },

    #[snafu(display("Object {} {} has unparsed content before 'endobj' at {}", obj_nr, gen_nr, pos))]
    UnparsedObjectContent { pos: Position, obj_nr: ObjNr, gen_nr: GenNr },

    #[snafu(display("Unexpected token '{}' at {} - expected '{}'", lexeme, pos, expected))]
    UnexpectedLexeme { pos: Position, lexeme: String, expected: &'static str },

    #[snafu(display("Invalid number '{}' at {}", lexeme, pos))]
    InvalidNumber { pos: Position, lexeme: String },

    #[snafu(display("Error parsing from string: {}", source))]
    Parse { source: Box<dyn Error + Send + Sync> },

    #[snafu(display("Invalid UTF-8: {}", source))]
    Utf8 { source: Box<dyn Error + Send + Sync> },

    #[snafu(display("Erroneous 'type' field in xref stream - expected 0, 1 or 2, found {}", found))]
    XRefStreamType { found: u64 },

    //////////////////
    // Encode/decode
    #[snafu(display("Hex decode error. Position {}, bytes {:?}", pos, bytes))]
    HexDecode { pos: usize, bytes: [u8; 2] },

    #[snafu(display("Ascii85 tail error"))]
    Ascii85TailError,

    #[snafu(display("Failed to convert '{}' into PredictorType", n))]
    IncorrectPredictorType { n: u8 },

    #[snafu(display("Flate stream could not be inflated: {}", source))]
    Inflate { source: io::Error },

    #[snafu(display("LZW stream could not be decoded: {}", msg))]
    Lzw { msg: String },

    //////////////////
    // Object model
    #[snafu(display("Field /{} is missing in dictionary for type {}.", field, typ))]
    MissingEntry { typ: &'static str, field: String },

    #[snafu(display("Expected primitive {}, found primitive {} instead.", expected, found))]
    UnexpectedPrimitive { expected: &'static str, found: &'static str },

    #[snafu(display("Tried to dereference non-existing object nr {}.", obj_nr))]
    NullRef { obj_nr: ObjNr },

    #[snafu(display("Object stream index out of bounds ({}/{}).", index, max))]
    ObjStmOutOfBounds { index: usize, max: usize },

    #[snafu(display("parse() called while this parser is already parsing"))]
    ReentrantParse,

    #[snafu(display("{} can only be used once; it has already run", what))]
    Reparse { what: &'static str },

    #[snafu(display("{} is not implemented", what))]
    Unimplemented { what: &'static str },

    #[snafu(display("No /Catalog object in the document; refusing to write a file without /Root"))]
    MissingCatalog,

    //////////////////
    // Misc
    #[snafu(display("IO Error"))]
    Io { source: io::Error },

    #[snafu(display("{}", msg))]
    Other { msg: String },

    #[snafu(display("{}:{}:{}", file, line, column))]
    Try { file: &'static str, line: u32, column: u32, source: Box<PdfError> },
}
impl PdfError {
    /// Strip the location frames added by `t!` and return the error that started it all.
    pub fn root(&self) -> &PdfError {
        match self {
            PdfError::Try { source, .. } => source.root(),
            e => e,
        }
    }
    /// Byte position of the error, if it came out of the parser.
    pub fn position(&self) -> Option<Position> {
        match *self.root() {
            PdfError::EOF { pos }
            | PdfError::MissingHeader { pos }
            | PdfError::MismatchedBracket { pos, .. }
            | PdfError::UnbalancedParenthesis { pos }
            | PdfError::MissingKeyword { pos, .. }
            | PdfError::StalledParser { pos, .. }
            | PdfError::UnparsedObjectContent { pos, .. }
            | PdfError::UnexpectedLexeme { pos, .. }
            | PdfError::InvalidNumber { pos, .. } => Some(pos),
            PdfError::UnsupportedFilter { pos, .. } => pos,
            _ => None,
        }
    }
    pub fn trace(&self) {
        trace(self, 0);
    }
}
fn trace(err: &dyn Error, depth: usize) {
    debug!("{}: {}", depth, err);
    if let Some(source) = err.source() {
        trace(source, depth + 1);
    }
}

pub type Result<T, E = PdfError> = std::result::Result<T, E>;

impl From<io::Error> for PdfError {
    fn from(source: io::Error) -> PdfError {
        PdfError::Io { source }
    }
}
impl From<String> for PdfError {
    fn from(msg: String) -> PdfError {
        PdfError::Other { msg }
    }
}

macro_rules! err_from {
    ($($st:ty),* => $variant:ident) => (
        $(
            impl From<$st> for PdfError {
                fn from(e: $st) -> PdfError {
                    PdfError::$variant { source: e.into() }
                }
            }
        )*
    )
}
err_from!(std::str::Utf8Error, std::string::FromUtf8Error => Utf8);
err_from!(std::num::ParseIntError, std::num::ParseFloatError => Parse);

/// Propagate an error, recording where it passed through.
macro_rules! t {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return Err($crate::error::PdfError::Try {
                file: file!(),
                line: line!(),
                column: column!(),
                source: Box::new(e.into()),
            }),
        }
    };
}

macro_rules! err {
    ($e: expr) => ({
        return Err($e);
    })
}
macro_rules! other {
    ($($t:tt)*) => ($crate::error::PdfError::Other { msg: format!($($t)*) })
}
macro_rules! bail {
    ($($t:tt)*) => {
        err!($crate::error::PdfError::Other { msg: format!($($t)*) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_of_offset() {
        let buf = b"%PDF-1.7\n1 0 obj\n<< >>";
        let pos = Position::locate(buf, 11, 0);
        assert_eq!(pos, Position { line: 2, column: 3, offset: 11 });
        assert_eq!(Position::locate(buf, 0, 100), Position { line: 1, column: 1, offset: 100 });
    }

    #[test]
    fn root_strips_try_frames() {
        fn inner() -> Result<()> {
            Err(PdfError::MissingCatalog)
        }
        fn outer() -> Result<()> {
            t!(inner());
            Ok(())
        }
        let e = outer().unwrap_err();
        assert!(matches!(e, PdfError::Try { .. }));
        assert!(matches!(e.root(), PdfError::MissingCatalog));
    }
}
