/// Tolerances of the document parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// How many bytes from the start of the buffer may precede `%PDF-`.
    pub header_search_limit: usize,

    /// Accept `startxref N %%EOF` without a `trailer` dictionary even when the section has no
    /// xref stream to carry the trailer entries.
    pub allow_degraded_trailer: bool,

    /// Remove objects that an update section marks as free.
    pub apply_deletions: bool,

    /// Keep the linearization parameter dictionary as an ordinary object. It describes byte
    /// offsets of the parsed file, which are stale once the document is rewritten.
    pub keep_linearization_dict: bool,
}

impl ParseOptions {
    /// Header at offset 0, full trailers only.
    pub fn strict() -> ParseOptions {
        ParseOptions {
            header_search_limit: 0,
            allow_degraded_trailer: false,
            .. ParseOptions::default()
        }
    }

    pub fn tolerant() -> ParseOptions {
        ParseOptions {
            header_search_limit: usize::MAX,
            allow_degraded_trailer: true,
            .. ParseOptions::default()
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            header_search_limit: 1024,
            allow_degraded_trailer: true,
            apply_deletions: true,
            keep_linearization_dict: false,
        }
    }
}
