//! Breaking the input up into lexemes at delimiters and whitespace.

use std::str::FromStr;
use std::ops::{Range, Deref};

use crate::error::*;

mod str;
pub use self::str::{read_literal_string, read_hex_string};


/// `Lexer` walks the PDF lexemes of a buffer. It is `Copy`, so saving and restoring a position
/// is just a copy of the lexer.
#[derive(Copy, Clone)]
pub struct Lexer<'a> {
    pos: usize,
    buf: &'a [u8],
    file_offset: usize,
}

// find the position where condition(data[pos-1]) == true and condition(data[pos]) == false
#[inline]
fn boundary(data: &[u8], pos: usize, condition: impl Fn(u8) -> bool) -> usize {
    match data[pos ..].iter().position(|&b| !condition(b)) {
        Some(start) => pos + start,
        None => data.len()
    }
}

/// PDF whitespace: NUL, TAB, LF, FF, CR and SP.
#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, 0 | b'\t' | b'\n' | 0x0c | b'\r' | b' ')
}
#[inline]
pub fn is_delimiter(b: u8) -> bool {
    b"()<>[]{}/%".contains(&b)
}

impl<'a> Lexer<'a> {
    pub fn new(buf: &'a [u8]) -> Lexer<'a> {
        Lexer {
            pos: 0,
            buf,
            file_offset: 0
        }
    }
    /// A lexer over a sub-buffer that starts at `file_offset` in the file, so positions in errors
    /// still point into the file.
    pub fn with_offset(buf: &'a [u8], file_offset: usize) -> Lexer<'a> {
        Lexer {
            pos: 0,
            buf,
            file_offset
        }
    }

    /// Returns next lexeme. Lexer moves to the next byte after the lexeme.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Substr<'a>> {
        match self.next_word() {
            Some((lexeme, pos)) => {
                self.pos = pos;
                Ok(lexeme)
            }
            None => Err(self.eof_error()),
        }
    }

    /// Consume `stream` and the end-of-line marker after it, which must be CRLF or LF.
    pub fn next_stream(&mut self) -> Result<()> {
        let pos = self.skip_whitespace(self.pos);
        if !self.buf[pos ..].starts_with(b"stream") {
            return Err(PdfError::MissingKeyword { pos: self.position(pos), keyword: "stream" });
        }
        let eol = pos + 6;
        match (self.buf.get(eol), self.buf.get(eol + 1)) {
            (Some(b'\n'), _) => self.pos = eol + 1,
            (Some(b'\r'), Some(b'\n')) => self.pos = eol + 2,
            (None, _) => return Err(self.eof_error()),
            (Some(&b), _) => return Err(PdfError::UnexpectedLexeme {
                pos: self.position(eol),
                lexeme: format!("{:?}", b as char),
                expected: "CRLF or LF after 'stream'",
            }),
        }
        Ok(())
    }

    /// Look at the next lexeme. Will return empty substr if the next character is EOF.
    pub fn peek(&self) -> Result<Substr<'a>> {
        match self.next_word() {
            Some((substr, _)) => Ok(substr),
            None => Ok(self.new_substr(self.buf.len() .. self.buf.len())),
        }
    }

    /// Returns `Ok` if the next lexeme matches `expected` - else `Err`.
    pub fn next_expect(&mut self, expected: &'static str) -> Result<()> {
        let start = self.pos;
        let word = self.next()?;
        if word.equals(expected.as_bytes()) {
            Ok(())
        } else {
            self.pos = start;
            Err(PdfError::UnexpectedLexeme {
                pos: self.position_of(&word),
                lexeme: word.to_string(),
                expected
            })
        }
    }

    /// Consume the next lexeme if it is `keyword`.
    pub fn next_if(&mut self, keyword: &str) -> bool {
        match self.next_word() {
            Some((word, pos)) if word.equals(keyword) => {
                self.pos = pos;
                true
            }
            _ => false,
        }
    }

    /// skip whitespace and return the position of the first non-whitespace character
    #[inline]
    fn skip_whitespace(&self, pos: usize) -> usize {
        boundary(self.buf, pos, is_whitespace)
    }

    /// Skip whitespace and `%` comments, returning the position of the next lexeme.
    fn skip_whitespace_and_comments(&self, pos: usize) -> usize {
        let mut pos = self.skip_whitespace(pos);
        while self.buf.get(pos) == Some(&b'%') {
            pos += match self.buf[pos..].iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(off) => off,
                None => self.buf.len() - pos,
            };
            pos = self.skip_whitespace(pos);
        }
        pos
    }

    /// Move past whitespace and comments.
    pub fn skip_filler(&mut self) {
        self.pos = self.skip_whitespace_and_comments(self.pos);
    }

    /// Move past whitespace only; comments are left in place.
    pub fn skip_blank(&mut self) {
        self.pos = self.skip_whitespace(self.pos);
    }

    /// Used by next and peek - returns substring and new position, or `None` at the end of the
    /// input.
    fn next_word(&self) -> Option<(Substr<'a>, usize)> {
        let mut pos = self.skip_whitespace_and_comments(self.pos);
        if pos >= self.buf.len() {
            return None;
        }
        let start_pos = pos;

        // If first character is delimiter, this lexeme only contains that character.
        //  - except << and >> which go together, and / which marks the start of a
        // name token.
        if is_delimiter(self.buf[pos]) {
            if self.buf[pos] == b'/' {
                pos += 1;
                pos = boundary(self.buf, pos, |b| !is_whitespace(b) && !is_delimiter(b));
                return Some((self.new_substr(start_pos..pos), pos));
            }

            if let Some(slice) = self.buf.get(pos..=pos+1) {
                if slice == b"<<" || slice == b">>" {
                    pos += 1;
                }
            }

            pos += 1;
            return Some((self.new_substr(start_pos..pos), pos));
        }

        // Read to past the end of lexeme
        pos = boundary(self.buf, pos, |b| !is_whitespace(b) && !is_delimiter(b));
        Some((self.new_substr(start_pos..pos), pos))
    }

    #[inline]
    pub fn next_as<T>(&mut self) -> Result<T>
        where T: FromStr, T::Err: std::error::Error + Send + Sync + 'static
    {
        self.next().and_then(|word| word.to::<T>())
    }

    #[inline]
    pub fn get_pos(&self) -> usize {
        self.pos
    }
    /// Absolute offset of the current position in the file.
    #[inline]
    pub fn file_pos(&self) -> usize {
        self.file_offset + self.pos
    }
    #[inline]
    pub fn buf(&self) -> &'a [u8] {
        self.buf
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.skip_whitespace_and_comments(self.pos) >= self.buf.len()
    }

    /// Line, column and file offset of `pos`.
    pub fn position(&self, pos: usize) -> Position {
        Position::locate(self.buf, pos, self.file_offset)
    }
    /// Position of a lexeme taken from this lexer.
    pub fn position_of(&self, word: &Substr) -> Position {
        self.position(word.file_range().start.saturating_sub(self.file_offset))
    }
    pub fn here(&self) -> Position {
        self.position(self.pos)
    }
    pub fn eof_error(&self) -> PdfError {
        PdfError::EOF { pos: self.position(self.buf.len()) }
    }
    /// Error for "nothing here can be parsed".
    pub fn stalled(&self) -> PdfError {
        let pos = self.skip_whitespace_and_comments(self.pos);
        let end = self.buf.len().min(pos + 50);
        PdfError::StalledParser {
            pos: self.position(pos),
            rest: String::from_utf8_lossy(&self.buf[pos .. end]).into(),
        }
    }

    #[inline]
    pub fn new_substr(&self, range: Range<usize>) -> Substr<'a> {
        Substr {
            file_offset: self.file_offset + range.start,
            slice: &self.buf[range],
        }
    }

    /// Set the position; returns the substr between the old and new positions.
    #[inline]
    pub fn set_pos(&mut self, wanted_pos: usize) -> Substr<'a> {
        let new_pos = wanted_pos.min(self.buf.len());
        let range = if self.pos < new_pos {
            self.pos..new_pos
        } else {
            new_pos..self.pos
        };
        self.pos = new_pos;
        self.new_substr(range)
    }

    /// Returns the substr between the old and new positions
    #[inline]
    pub fn offset_pos(&mut self, offset: usize) -> Substr<'a> {
        self.set_pos(self.pos.saturating_add(offset))
    }

    /// Position of the next occurrence of `needle` at or after the current position.
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        self.buf[self.pos ..].windows(needle.len())
            .position(|w| w == needle)
            .map(|i| self.pos + i)
    }

    /// True if the raw bytes at the current position are `prefix`.
    #[inline]
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.buf[self.pos ..].starts_with(prefix)
    }

    /// Returns slice from current position to end.
    #[inline]
    pub fn get_remaining_slice(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}



/// A slice from some original string - a lexeme.
#[derive(Copy, Clone, Debug)]
pub struct Substr<'a> {
    slice: &'a [u8],
    file_offset: usize,
}
impl<'a> Substr<'a> {
    pub fn new<T: AsRef<[u8]> + ?Sized>(data: &'a T, file_offset: usize) -> Self {
        Substr { slice: data.as_ref(), file_offset }
    }
    #[allow(clippy::inherent_to_string)]
    pub fn to_string(&self) -> String {
        String::from_utf8_lossy(self.as_slice()).into()
    }
    pub fn to_vec(&self) -> Vec<u8> {
        self.slice.to_vec()
    }
    pub fn to<T>(&self) -> Result<T>
        where T: FromStr, T::Err: std::error::Error + Send + Sync + 'static
    {
        std::str::from_utf8(self.slice)?.parse::<T>().map_err(|e| PdfError::Parse { source: e.into() })
    }
    /// Unsigned decimal digits only.
    pub fn is_unsigned(&self) -> bool {
        !self.slice.is_empty() && is_int(self.slice)
    }
    /// `[+-]?\d+`
    pub fn is_integer(&self) -> bool {
        let slice = strip_sign(self.slice);
        !slice.is_empty() && is_int(slice)
    }
    /// `[+-]?\d*\.?\d*` with at least one digit. Exponents are not PDF syntax.
    pub fn is_real_number(&self) -> bool {
        let slice = strip_sign(self.slice);
        let (int, frac) = match slice.iter().position(|&b| b == b'.') {
            Some(i) => (&slice[..i], &slice[i+1..]),
            None => (slice, &[][..]),
        };
        is_int(int) && is_int(frac) && int.len() + frac.len() > 0
    }
    /// Could this lexeme have been meant as a number?
    pub fn looks_numeric(&self) -> bool {
        matches!(self.slice.first(), Some(b'0'..=b'9' | b'+' | b'-' | b'.'))
    }

    pub fn as_slice(&self) -> &'a [u8] {
        self.slice
    }
    pub fn as_str(&self) -> Result<&'a str> {
        std::str::from_utf8(self.slice).map_err(|e| PdfError::Parse { source: e.into() })
    }

    pub fn equals(&self, other: impl AsRef<[u8]>) -> bool {
        self.slice == other.as_ref()
    }

    pub fn file_range(&self) -> Range<usize> {
        self.file_offset .. self.file_offset + self.slice.len()
    }
}

#[inline]
fn strip_sign(b: &[u8]) -> &[u8] {
    match b.first() {
        Some(b'+' | b'-') => &b[1..],
        _ => b,
    }
}

#[inline]
fn is_int(b: &[u8]) -> bool {
    b.iter().all(|&b| b.is_ascii_digit())
}
impl<'a> Deref for Substr<'a> {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}
impl<'a> PartialEq<&[u8]> for Substr<'a> {
    fn eq(&self, rhs: &&[u8]) -> bool {
        self.equals(rhs)
    }
}

impl<'a> PartialEq<&str> for Substr<'a> {
    fn eq(&self, rhs: &&str) -> bool {
        self.equals(rhs.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexemes(data: &[u8]) -> Vec<String> {
        let mut lexer = Lexer::new(data);
        let mut out = vec![];
        while !lexer.is_empty() {
            out.push(lexer.next().unwrap().to_string());
        }
        out
    }

    #[test]
    fn test_boundary() {
        assert_eq!(boundary(b" hello ", 3, |b| !is_whitespace(b)), 6);
        assert_eq!(boundary(b" hello ", 3, is_whitespace), 3);
        assert_eq!(boundary(b"01234  7orld", 5, is_whitespace), 7);
        assert_eq!(boundary(b"01234  7orld", 7, is_whitespace), 7);
        assert_eq!(boundary(b"q\n", 1, is_whitespace), 2);
    }

    #[test]
    fn test_substr() {
        assert!(Substr::new("123", 0).is_real_number());
        assert!(Substr::new("123.", 0).is_real_number());
        assert!(Substr::new("123.45", 0).is_real_number());
        assert!(Substr::new(".45", 0).is_real_number());
        assert!(Substr::new("-.45", 0).is_real_number());
        assert!(Substr::new("+7", 0).is_integer());
        assert!(!Substr::new(".", 0).is_real_number());
        assert!(!Substr::new("1e5", 0).is_real_number());
        assert!(!Substr::new("123.45", 0).is_integer());
        assert!(!Substr::new("-", 0).is_integer());
        assert!(Substr::new("123", 0).is_integer());
    }

    #[test]
    fn delimiters_and_comments() {
        assert_eq!(
            lexemes(b"<</Type/Page%comment\r/Kids[1 0 R]>>\x0c\x00null"),
            ["<<", "/Type", "/Page", "/Kids", "[", "1", "0", "R", "]", ">>", "null"]
        );
        assert_eq!(lexemes(b"/ /A#20B<AB>"), ["/", "/A#20B", "<", "AB", ">"]);
    }

    #[test]
    fn stream_keyword_needs_lf() {
        let mut lexer = Lexer::new(b" stream\r\nDATA");
        lexer.next_stream().unwrap();
        assert_eq!(lexer.get_remaining_slice(), b"DATA");

        let mut lexer = Lexer::new(b"stream\rDATA");
        assert!(lexer.next_stream().is_err());
    }

    #[test]
    fn expect_reports_position() {
        let mut lexer = Lexer::with_offset(b"\n  foo", 100);
        match lexer.next_expect("bar") {
            Err(PdfError::UnexpectedLexeme { pos, lexeme, .. }) => {
                assert_eq!(lexeme, "foo");
                assert_eq!(pos, Position { line: 2, column: 3, offset: 103 });
            }
            r => panic!("unexpected {:?}", r.err()),
        }
        // the failed expectation does not consume
        assert_eq!(lexer.get_pos(), 0);
    }
}
