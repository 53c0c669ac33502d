//! Interned PDF names.
//!
//! Every `Name` with the same decoded bytes shares one allocation, so equality is a pointer
//! comparison. The only way to get a `Name` is through the interner.
//!
//! Names are byte strings. Most are UTF-8 and are read through [`Name::as_str`]; the rest keep
//! their exact bytes for writing and show replacement characters as text.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io;
use std::ops::Deref;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use crate::error::Result;

static INTERNER: Lazy<Mutex<HashSet<Name>>> = Lazy::new(|| Mutex::new(HashSet::new()));

struct NameData {
    text: Box<str>,
    /// Exact bytes, only for names that are not UTF-8.
    raw: Option<Box<[u8]>>,
}

impl NameData {
    fn bytes(&self) -> &[u8] {
        match self.raw {
            Some(ref raw) => raw,
            None => self.text.as_bytes(),
        }
    }
}

#[derive(Clone)]
pub struct Name(Arc<NameData>);

impl Name {
    /// Intern `text`, which is the decoded form (no `#xx` escapes, no leading slash).
    pub fn of(text: &str) -> Name {
        Name::of_bytes(text.as_bytes())
    }

    /// Intern decoded name bytes.
    pub fn of_bytes(bytes: &[u8]) -> Name {
        let mut set = match INTERNER.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(existing) = set.get(bytes) {
            return existing.clone();
        }
        let data = match std::str::from_utf8(bytes) {
            Ok(text) => NameData { text: text.into(), raw: None },
            Err(_) => NameData {
                text: String::from_utf8_lossy(bytes).into(),
                raw: Some(bytes.into()),
            },
        };
        let name = Name(Arc::new(data));
        set.insert(name.clone());
        name
    }

    /// Intern a name as it appears in a file, i.e. with `#xx` hex escapes.
    /// Malformed escapes are kept literally.
    pub fn from_escaped(raw: &[u8]) -> Name {
        let mut decoded = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'#' && i + 2 < raw.len() {
                if let (Some(h), Some(l)) = (hex_val(raw[i + 1]), hex_val(raw[i + 2])) {
                    decoded.push(h << 4 | l);
                    i += 3;
                    continue;
                }
            }
            decoded.push(raw[i]);
            i += 1;
        }
        Name::of_bytes(&decoded)
    }

    /// The decoded text. Bytes that are not UTF-8 read as U+FFFD.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0.text
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.bytes()
    }

    /// True if both names are the same interned instance.
    #[inline]
    pub fn ptr_eq(a: &Name, b: &Name) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Write `/Name`, escaping whitespace, delimiters, `#` and anything outside `!`..`~`.
    pub fn serialize(&self, out: &mut impl io::Write) -> Result<()> {
        out.write_all(b"/")?;
        for &b in self.as_bytes() {
            if needs_escape(b) {
                write!(out, "#{:02X}", b)?;
            } else {
                out.write_all(&[b])?;
            }
        }
        Ok(())
    }
}

#[inline]
fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[inline]
fn needs_escape(b: u8) -> bool {
    !(b'!'..=b'~').contains(&b) || b"#()<>[]{}/%".contains(&b)
}

impl PartialEq for Name {
    #[inline]
    fn eq(&self, other: &Name) -> bool {
        Name::ptr_eq(self, other)
    }
}
impl Eq for Name {}
impl Hash for Name {
    // must agree with `[u8]`'s hash so `Borrow<[u8]>` lookups work
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state)
    }
}
impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Name) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Name {
    fn cmp(&self, other: &Name) -> std::cmp::Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}
impl Deref for Name {
    type Target = str;
    #[inline]
    fn deref(&self) -> &str {
        self.as_str()
    }
}
impl Borrow<[u8]> for Name {
    #[inline]
    fn borrow(&self) -> &[u8] {
        self.as_bytes()
    }
}
impl PartialEq<str> for Name {
    #[inline]
    fn eq(&self, rhs: &str) -> bool {
        self.as_bytes() == rhs.as_bytes()
    }
}
impl<'a> PartialEq<&'a str> for Name {
    #[inline]
    fn eq(&self, rhs: &&'a str) -> bool {
        self.as_bytes() == rhs.as_bytes()
    }
}
impl<'a> From<&'a str> for Name {
    #[inline]
    fn from(s: &'a str) -> Name {
        Name::of(s)
    }
}
impl From<String> for Name {
    #[inline]
    fn from(s: String) -> Name {
        Name::of(&s)
    }
}
impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "/{}", self.as_str())
    }
}
impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "/{}", self.as_str())
    }
}
