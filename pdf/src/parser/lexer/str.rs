//! The bodies of literal `( )` and hex `< >` strings.

use crate::error::*;

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn next(&mut self) -> Result<u8> {
        let b = self.peek().ok_or_else(|| PdfError::EOF { pos: Position::locate(self.buf, self.pos, 0) })?;
        self.pos += 1;
        Ok(b)
    }
    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }
    /// Consume `b` if it is next.
    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}

/// Read a literal string body. `buf` starts right after the opening `(`.
///
/// Returns the bytes with escapes resolved and the number of input bytes consumed, including the
/// closing `)`. Fails with `EOF` if the parentheses never balance.
pub fn read_literal_string(buf: &[u8]) -> Result<(Vec<u8>, usize)> {
    let mut cur = Cursor { buf, pos: 0 };
    let mut out = Vec::new();
    let mut depth = 0usize;
    loop {
        match cur.next()? {
            b'\\' => match cur.next()? {
                b'n' => out.push(b'\n'),
                b'r' => out.push(b'\r'),
                b't' => out.push(b'\t'),
                b'b' => out.push(0x08),
                b'f' => out.push(0x0c),
                // escaped line break: a continuation, contributes nothing
                b'\n' => {
                    cur.eat(b'\r');
                }
                b'\r' => {
                    cur.eat(b'\n');
                }
                d @ b'0' ..= b'7' => {
                    // up to three digits; overflow past 255 wraps
                    let mut code = u16::from(d - b'0');
                    for _ in 0 .. 2 {
                        match cur.peek() {
                            Some(d @ b'0' ..= b'7') => {
                                cur.pos += 1;
                                code = code * 8 + u16::from(d - b'0');
                            }
                            _ => break,
                        }
                    }
                    out.push(code as u8);
                }
                // `\\`, `\(`, `\)` and unknown escapes all drop the backslash
                c => out.push(c),
            },
            b'(' => {
                depth += 1;
                out.push(b'(');
            }
            b')' if depth == 0 => return Ok((out, cur.pos)),
            b')' => {
                depth -= 1;
                out.push(b')');
            }
            b'\r' => {
                cur.eat(b'\n');
                out.push(b'\n');
            }
            c => out.push(c),
        }
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0' ..= b'9' => Some(c - b'0'),
        b'A' ..= b'F' => Some(c - b'A' + 10),
        b'a' ..= b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Read a hex string body. `buf` starts right after the opening `<`.
///
/// Whitespace between digits is skipped and an odd final digit is padded with `0`. Returns the
/// decoded bytes and the number of input bytes consumed, including the closing `>`. A bad digit
/// yields `HexDecode` with the offset just past it.
pub fn read_hex_string(buf: &[u8]) -> Result<(Vec<u8>, usize)> {
    let mut cur = Cursor { buf, pos: 0 };
    let mut out = Vec::new();
    let mut high: Option<u8> = None;
    loop {
        let c = cur.next()?;
        if super::is_whitespace(c) {
            continue;
        }
        if c == b'>' {
            if let Some(h) = high {
                out.push(h << 4);
            }
            return Ok((out, cur.pos));
        }
        let value = hex_value(c).ok_or(PdfError::HexDecode {
            pos: cur.pos,
            bytes: [c, cur.peek().unwrap_or(0)],
        })?;
        match high.take() {
            Some(h) => out.push(h << 4 | value),
            None => high = Some(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(data: &[u8]) -> Vec<u8> {
        read_literal_string(data).unwrap().0
    }

    #[test]
    fn escapes() {
        assert_eq!(literal(b"a\\nb\\rc\\td\\(f/)\\\\hei)"), b"a\nb\rc\td(f/");
        assert_eq!(literal(b"\\b\\f\\\\\\q)"), b"\x08\x0c\\q");
    }

    #[test]
    fn nested_parentheses() {
        let data = b"a (b (c)) d) rest";
        let (bytes, consumed) = read_literal_string(data).unwrap();
        assert_eq!(bytes, b"a (b (c)) d");
        assert_eq!(&data[consumed ..], b" rest");
    }

    #[test]
    fn line_continuations() {
        for data in [&b"These \\\ntwo strings \\\nare the same.)"[..], b"These \\\rtwo strings \\\rare the same.)", b"These \\\r\ntwo strings \\\r\nare the same.)"] {
            assert_eq!(literal(data), b"These two strings are the same.");
        }
    }

    #[test]
    fn raw_line_breaks() {
        let data = b"a\r\nb\rc\nd)";
        let (bytes, consumed) = read_literal_string(data).unwrap();
        assert_eq!(bytes, b"a\nb\nc\nd");
        assert_eq!(consumed, data.len());
    }

    #[test]
    fn unterminated() {
        assert!(matches!(read_literal_string(b"abc (nested)"), Err(PdfError::EOF { .. })));
    }

    #[test]
    fn octal() {
        assert_eq!(literal(b"contains\\245two\\307.)"), b"contains\xa5two\xc7.");
        assert_eq!(literal(b"\\0053)"), b"\x053");
        assert_eq!(literal(b"\\053)"), b"+");
        assert_eq!(literal(b"\\53)"), b"+");
        assert_eq!(literal(b"\\541)"), b"a");
    }

    #[test]
    fn hex() {
        assert_eq!(read_hex_string(b"901FA3>").unwrap(), (vec![0x90, 0x1f, 0xa3], 7));
        assert_eq!(read_hex_string(b"901FA>").unwrap().0, [0x90, 0x1f, 0xa0]);
        assert_eq!(read_hex_string(b"1 9F\t5\r\n4\x0c62a>").unwrap().0, [0x19, 0xf5, 0x46, 0x2a]);
        assert_eq!(read_hex_string(b">").unwrap(), (vec![], 1));
        assert!(matches!(read_hex_string(b"12G4>"), Err(PdfError::HexDecode { pos: 3, bytes: [b'G', b'4'] })));
        assert!(matches!(read_hex_string(b"12"), Err(PdfError::EOF { .. })));
    }
}
