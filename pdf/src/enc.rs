use deflate::deflate_bytes_zlib;
use libflate::{zlib, deflate as raw_deflate};

use crate::error::*;
use crate::primitive::{Primitive, Dictionary};
use std::convert::TryInto;
use std::io::Read;

/// `/DecodeParms` of the LZW and Flate filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LZWFlateParams {
    pub predictor: i32,
    pub n_components: i32,
    pub bits_per_component: i32,
    pub columns: i32,
    pub early_change: i32,
}
impl Default for LZWFlateParams {
    fn default() -> LZWFlateParams {
        LZWFlateParams {
            predictor: 1,
            n_components: 1,
            bits_per_component: 8,
            columns: 1,
            early_change: 1
        }
    }
}
impl LZWFlateParams {
    pub fn from_dict(dict: &Dictionary) -> Result<LZWFlateParams> {
        let int = |key: &str, default: i32| -> Result<i32> {
            match dict.get(key) {
                Some(p) => Ok(p.as_integer()? as i32),
                None => Ok(default),
            }
        };
        Ok(LZWFlateParams {
            predictor: int("Predictor", 1)?,
            n_components: int("Colors", 1)?,
            bits_per_component: int("BitsPerComponent", 8)?,
            columns: int("Columns", 1)?,
            early_change: int("EarlyChange", 1)?,
        })
    }
    /// The non-default entries, for writing `/DecodeParms` back out.
    pub fn to_dict(&self) -> Dictionary {
        let defaults = LZWFlateParams::default();
        let mut dict = Dictionary::new();
        if self.predictor != defaults.predictor {
            dict.insert("Predictor", self.predictor);
        }
        if self.n_components != defaults.n_components {
            dict.insert("Colors", self.n_components);
        }
        if self.bits_per_component != defaults.bits_per_component {
            dict.insert("BitsPerComponent", self.bits_per_component);
        }
        if self.columns != defaults.columns {
            dict.insert("Columns", self.columns);
        }
        if self.early_change != defaults.early_change {
            dict.insert("EarlyChange", self.early_change);
        }
        dict
    }
}

/// A stream filter, named as in `/Filter`.
///
/// The image codecs are recognised so that streams using them survive a round trip, but their
/// payload is never touched; asking to decode or encode them is `UnsupportedFilter`.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFilter {
    ASCIIHexDecode,
    ASCII85Decode,
    LZWDecode (LZWFlateParams),
    FlateDecode (LZWFlateParams),
    RunLengthDecode,
    JPXDecode, //Jpeg2k
    DCTDecode,
    CCITTFaxDecode,
    JBIG2Decode,
    Crypt
}
impl StreamFilter {
    pub fn from_kind_and_params(kind: &str, params: Option<&Dictionary>) -> Result<StreamFilter> {
        let empty = Dictionary::new();
        let params = params.unwrap_or(&empty);
        Ok(
        match kind {
            "ASCIIHexDecode" | "AHx" => StreamFilter::ASCIIHexDecode,
            "ASCII85Decode" | "A85" => StreamFilter::ASCII85Decode,
            "LZWDecode" | "LZW" => StreamFilter::LZWDecode (LZWFlateParams::from_dict(params)?),
            "FlateDecode" | "Fl" => StreamFilter::FlateDecode (LZWFlateParams::from_dict(params)?),
            "RunLengthDecode" | "RL" => StreamFilter::RunLengthDecode,
            "JPXDecode" => StreamFilter::JPXDecode,
            "DCTDecode" | "DCT" => StreamFilter::DCTDecode,
            "CCITTFaxDecode" | "CCF" => StreamFilter::CCITTFaxDecode,
            "JBIG2Decode" => StreamFilter::JBIG2Decode,
            "Crypt" => StreamFilter::Crypt,
            ty => return Err(PdfError::UnsupportedFilter { name: ty.into(), pos: None }),
        }
        )
    }

    /// The filter chain of a stream dictionary, in decode order.
    pub fn from_dict(info: &Dictionary) -> Result<Vec<StreamFilter>> {
        let names: Vec<&str> = match info.get("Filter") {
            None | Some(Primitive::Null) => return Ok(vec![]),
            Some(Primitive::Name(name)) => vec![name.as_str()],
            Some(Primitive::Array(arr)) => arr.iter().map(|p| p.as_name()).collect::<Result<_>>()?,
            Some(p) => return Err(PdfError::UnexpectedPrimitive { expected: "Name or Array", found: p.get_debug_name() }),
        };
        let params: Vec<Option<&Dictionary>> = match info.get("DecodeParms") {
            None | Some(Primitive::Null) => vec![None; names.len()],
            Some(Primitive::Dictionary(dict)) => vec![Some(dict)],
            Some(Primitive::Array(arr)) => arr.iter().map(|p| match p {
                Primitive::Dictionary(dict) => Some(dict),
                _ => None,
            }).collect(),
            Some(p) => return Err(PdfError::UnexpectedPrimitive { expected: "Dictionary or Array", found: p.get_debug_name() }),
        };
        names.iter().enumerate()
            .map(|(i, name)| StreamFilter::from_kind_and_params(name, params.get(i).copied().flatten()))
            .collect()
    }

    /// True if `name` is a filter this crate recognises.
    pub fn is_known(name: &str) -> bool {
        StreamFilter::from_kind_and_params(name, None).is_ok()
    }

    pub fn name(&self) -> &'static str {
        match *self {
            StreamFilter::ASCIIHexDecode => "ASCIIHexDecode",
            StreamFilter::ASCII85Decode => "ASCII85Decode",
            StreamFilter::LZWDecode (_) => "LZWDecode",
            StreamFilter::FlateDecode (_) => "FlateDecode",
            StreamFilter::RunLengthDecode => "RunLengthDecode",
            StreamFilter::JPXDecode => "JPXDecode",
            StreamFilter::DCTDecode => "DCTDecode",
            StreamFilter::CCITTFaxDecode => "CCITTFaxDecode",
            StreamFilter::JBIG2Decode => "JBIG2Decode",
            StreamFilter::Crypt => "Crypt",
        }
    }

    /// Parameters worth writing to `/DecodeParms`, if any.
    pub fn params(&self) -> Option<Dictionary> {
        match *self {
            StreamFilter::LZWDecode (ref p) | StreamFilter::FlateDecode (ref p) => {
                let dict = p.to_dict();
                if dict.is_empty() { None } else { Some(dict) }
            }
            _ => None,
        }
    }
}

#[inline]
fn decode_nibble(c: u8) -> Option<u8> {
    match c {
        n @ b'0' ..= b'9' => Some(n - b'0'),
        a @ b'a' ..= b'f' => Some(a - b'a' + 0xa),
        a @ b'A' ..= b'F' => Some(a - b'A' + 0xA),
        _ => None
    }
}

#[inline]
fn encode_nibble(c: u8) -> u8 {
    match c {
        0 ..= 9 => b'0' + c,
        _ => b'A' + c - 10,
    }
}

fn encode_hex(data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(data.len() * 2);
    for &b in data {
        buf.push(encode_nibble(b >> 4));
        buf.push(encode_nibble(b & 0xf));
    }
    buf
}

/// ASCIIHexDecode: whitespace is ignored, `>` ends the data, and an odd final digit is padded
/// with 0.
fn decode_ascii_hex(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut high = None;
    for (i, &b) in data.iter().enumerate() {
        if b == b'>' {
            break;
        }
        if is_whitespace(b) {
            continue;
        }
        let n = decode_nibble(b).ok_or(PdfError::HexDecode { pos: i, bytes: [b, 0] })?;
        match high.take() {
            None => high = Some(n),
            Some(h) => out.push(h << 4 | n),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    Ok(out)
}
fn encode_ascii_hex(data: &[u8]) -> Vec<u8> {
    let mut buf = encode_hex(data);
    buf.push(b'>');
    buf
}

#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, 0 | b'\t' | b'\n' | 0x0c | b'\r' | b' ')
}

#[inline]
fn sym_85(byte: u8) -> Option<u8> {
    match byte {
        b @ 0x21 ..= 0x75 => Some(b - 0x21),
        _ => None
    }
}

fn word_85([a, b, c, d, e]: [u8; 5]) -> Option<[u8; 4]> {
    fn s(b: u8) -> Option<u32> { sym_85(b).map(|n| n as u32) }
    let (a, b, c, d, e) = (s(a)?, s(b)?, s(c)?, s(d)?, s(e)?);
    let q = (((a * 85 + b) * 85 + c) * 85 + d).checked_mul(85)?.checked_add(e)?;
    Some(q.to_be_bytes())
}

fn decode_85(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity((data.len() + 4) / 5 * 4);

    let mut stream = data.iter().cloned()
        .filter(|&b| !is_whitespace(b));

    let mut symbols = stream.by_ref()
        .take_while(|&b| b != b'~');

    let (tail_len, tail) = loop {
        match symbols.next() {
            Some(b'z') => out.extend_from_slice(&[0; 4]),
            Some(a) => {
                let (b, c, d, e) = match (symbols.next(), symbols.next(), symbols.next(), symbols.next()) {
                    (Some(b), Some(c), Some(d), Some(e)) => (b, c, d, e),
                    (None, _, _, _) => break (1, [a, b'u', b'u', b'u', b'u']),
                    (Some(b), None, _, _) => break (2, [a, b, b'u', b'u', b'u']),
                    (Some(b), Some(c), None, _) => break (3, [a, b, c, b'u', b'u']),
                    (Some(b), Some(c), Some(d), None) => break (4, [a, b, c, d, b'u']),
                };
                out.extend_from_slice(&word_85([a, b, c, d, e]).ok_or(PdfError::Ascii85TailError)?);
            }
            None => break (0, [b'u'; 5])
        }
    };

    if tail_len > 0 {
        if tail_len == 1 {
            return Err(PdfError::Ascii85TailError);
        }
        let last = word_85(tail).ok_or(PdfError::Ascii85TailError)?;
        out.extend_from_slice(&last[.. tail_len-1]);
    }

    match (stream.next(), stream.next()) {
        (Some(b'>'), None) | (None, None) => Ok(out),
        _ => Err(PdfError::Ascii85TailError)
    }
}

#[inline]
fn divmod(n: u32, m: u32) -> (u32, u32) {
    (n / m, n % m)
}

#[inline]
fn a85(n: u32) -> u8 {
    n as u8 + 0x21
}

#[inline]
fn base85_chunk(c: [u8; 4]) -> [u8; 5] {
    let n = u32::from_be_bytes(c);
    let (n, e) = divmod(n, 85);
    let (n, d) = divmod(n, 85);
    let (n, c) = divmod(n, 85);
    let (a, b) = divmod(n, 85);

    [a85(a), a85(b), a85(c), a85(d), a85(e)]
}

fn encode_85(data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity((data.len() / 4) * 5 + 10);
    let mut chunks = data.chunks_exact(4);
    for chunk in chunks.by_ref() {
        let c: [u8; 4] = match chunk.try_into() {
            Ok(c) => c,
            Err(_) => continue,
        };
        if c == [0; 4] {
            buf.push(b'z');
        } else {
            buf.extend_from_slice(&base85_chunk(c));
        }
    }

    let r = chunks.remainder();
    if !r.is_empty() {
        let mut c = [0; 4];
        c[.. r.len()].copy_from_slice(r);
        let out = base85_chunk(c);
        buf.extend_from_slice(&out[.. r.len() + 1]);
    }
    buf.extend_from_slice(b"~>");
    buf
}

fn run_length_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        let len = data[i];
        i += 1;
        match len {
            128 => break,
            0 ..= 127 => {
                let n = len as usize + 1;
                let run = data.get(i .. i + n)
                    .ok_or_else(|| other!("RunLengthDecode: literal run of {} bytes past end of data", n))?;
                out.extend_from_slice(run);
                i += n;
            }
            _ => {
                let &b = data.get(i)
                    .ok_or_else(|| other!("RunLengthDecode: missing repeated byte"))?;
                out.extend(std::iter::repeat(b).take(257 - len as usize));
                i += 1;
            }
        }
    }
    Ok(out)
}
fn run_length_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 128 + 1);
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        let run = data[i ..].iter().take(128).take_while(|&&c| c == b).count();
        if run > 1 {
            out.push((257 - run) as u8);
            out.push(b);
            i += run;
        } else {
            // literal run up to the next pair of equal bytes
            let start = i;
            i += 1;
            while i < data.len() && i - start < 128 && !(i + 1 < data.len() && data[i] == data[i + 1]) {
                i += 1;
            }
            out.push((i - start - 1) as u8);
            out.extend_from_slice(&data[start .. i]);
        }
    }
    out.push(128);
    out
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match zlib::Decoder::new(data).and_then(|mut d| d.read_to_end(&mut out)) {
        Ok(_) => Ok(out),
        Err(_) => {
            info!("invalid zlib header. trying without");
            out.clear();
            raw_deflate::Decoder::new(data).read_to_end(&mut out)
                .map_err(|source| PdfError::Inflate { source })?;
            Ok(out)
        }
    }
}

fn flate_decode(data: &[u8], params: &LZWFlateParams) -> Result<Vec<u8>> {
    let decoded = t!(inflate(data));
    predict_decode(decoded, params)
}
fn flate_encode(data: &[u8], params: &LZWFlateParams) -> Result<Vec<u8>> {
    let predicted = predict_encode(data, params)?;
    Ok(deflate_bytes_zlib(&predicted))
}

fn lzw_decode(data: &[u8], params: &LZWFlateParams) -> Result<Vec<u8>> {
    use weezl::{BitOrder, decode::Decoder};
    let mut decoder = if params.early_change != 0 {
        Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
    } else {
        Decoder::new(BitOrder::Msb, 8)
    };
    let decoded = decoder.decode(data)
        .map_err(|e| PdfError::Lzw { msg: e.to_string() })?;
    predict_decode(decoded, params)
}
fn lzw_encode(data: &[u8], params: &LZWFlateParams) -> Result<Vec<u8>> {
    use weezl::{BitOrder, encode::Encoder};
    let predicted = predict_encode(data, params)?;
    let mut encoder = if params.early_change != 0 {
        Encoder::with_tiff_size_switch(BitOrder::Msb, 8)
    } else {
        Encoder::new(BitOrder::Msb, 8)
    };
    encoder.encode(&predicted)
        .map_err(|e| PdfError::Lzw { msg: e.to_string() })
}

/// Decode `data` with a single filter.
pub fn decode(data: &[u8], filter: &StreamFilter) -> Result<Vec<u8>> {
    match *filter {
        StreamFilter::ASCIIHexDecode => decode_ascii_hex(data),
        StreamFilter::ASCII85Decode => decode_85(data),
        StreamFilter::LZWDecode(ref params) => lzw_decode(data, params),
        StreamFilter::FlateDecode(ref params) => flate_decode(data, params),
        StreamFilter::RunLengthDecode => run_length_decode(data),
        ref f => Err(PdfError::UnsupportedFilter { name: f.name().into(), pos: None }),
    }
}

/// Encode `data` so that `decode` with the same filter gives it back.
pub fn encode(data: &[u8], filter: &StreamFilter) -> Result<Vec<u8>> {
    match *filter {
        StreamFilter::ASCIIHexDecode => Ok(encode_ascii_hex(data)),
        StreamFilter::ASCII85Decode => Ok(encode_85(data)),
        StreamFilter::LZWDecode(ref params) => lzw_encode(data, params),
        StreamFilter::FlateDecode (ref params) => flate_encode(data, params),
        StreamFilter::RunLengthDecode => Ok(run_length_encode(data)),
        ref f => Err(PdfError::UnsupportedFilter { name: f.name().into(), pos: None }),
    }
}

/*
 * Predictors. Predictor 1 is none, 2 is TIFF, 10 and up are PNG (the row tag decides).
 */

fn row_params(params: &LZWFlateParams) -> Result<(usize, usize)> {
    if params.bits_per_component != 8 {
        return Err(PdfError::Unimplemented { what: "predictors with BitsPerComponent other than 8" });
    }
    let bpp = params.n_components.max(1) as usize;
    let row_len = params.columns.max(1) as usize * bpp;
    Ok((bpp, row_len))
}

fn predict_decode(data: Vec<u8>, params: &LZWFlateParams) -> Result<Vec<u8>> {
    match params.predictor {
        p if p < 2 => Ok(data),
        2 => {
            let (bpp, row_len) = row_params(params)?;
            let mut data = data;
            for row in data.chunks_mut(row_len) {
                for i in bpp .. row.len() {
                    row[i] = row[i].wrapping_add(row[i - bpp]);
                }
            }
            Ok(data)
        }
        p if p >= 10 => {
            let (bpp, columns) = row_params(params)?;
            let inp = data;
            let rows = inp.len() / (columns+1);

            let mut out = vec![0; rows * columns];
            let null_vec = vec![0; columns];

            let mut in_off = 0;
            let mut out_off = 0;
            let mut last_out_off = 0;

            // a trailing partial row is dropped
            while in_off + columns < inp.len() {
                let predictor = PredictorType::from_u8(inp[in_off])?;
                in_off += 1; // +1 because the first byte on each row is predictor

                let row_in = &inp[in_off .. in_off + columns];
                let (prev_row, row_out) = if out_off == 0 {
                    (&null_vec[..], &mut out[out_off .. out_off+columns])
                } else {
                    let (prev, curr) = out.split_at_mut(out_off);
                    (&prev[last_out_off ..], &mut curr[.. columns])
                };
                unfilter(predictor, bpp, prev_row, row_in, row_out);

                last_out_off = out_off;

                in_off += columns;
                out_off += columns;
            }
            Ok(out)
        }
        p => Err(PdfError::IncorrectPredictorType { n: p as u8 }),
    }
}

fn predict_encode(data: &[u8], params: &LZWFlateParams) -> Result<Vec<u8>> {
    match params.predictor {
        p if p < 2 => Ok(data.to_vec()),
        2 => {
            let (bpp, row_len) = row_params(params)?;
            let mut out = data.to_vec();
            for row in out.chunks_mut(row_len) {
                for i in (bpp .. row.len()).rev() {
                    row[i] = row[i].wrapping_sub(row[i - bpp]);
                }
            }
            Ok(out)
        }
        p if p >= 10 => {
            let (bpp, columns) = row_params(params)?;
            // 15 ("optimum") lets the encoder choose; Up is a fine choice for everything
            let method = match p {
                10 => PredictorType::NoFilter,
                11 => PredictorType::Sub,
                13 => PredictorType::Avg,
                14 => PredictorType::Paeth,
                _ => PredictorType::Up,
            };
            let mut out = Vec::with_capacity(data.len() + data.len() / columns + 1);
            let mut previous = vec![0; columns];
            for chunk in data.chunks(columns) {
                let mut current = chunk.to_vec();
                current.resize(columns, 0);
                let original = current.clone();
                filter(method, bpp, &previous, &mut current);
                out.push(method as u8);
                out.extend_from_slice(&current);
                previous = original;
            }
            Ok(out)
        }
        p => Err(PdfError::IncorrectPredictorType { n: p as u8 }),
    }
}

/*
 * PNG row filters.
 */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum PredictorType {
    NoFilter = 0,
    Sub = 1,
    Up = 2,
    Avg = 3,
    Paeth = 4
}

impl PredictorType {
    fn from_u8(n: u8) -> Result<PredictorType> {
        match n {
            0 => Ok(PredictorType::NoFilter),
            1 => Ok(PredictorType::Sub),
            2 => Ok(PredictorType::Up),
            3 => Ok(PredictorType::Avg),
            4 => Ok(PredictorType::Paeth),
            n => Err(PdfError::IncorrectPredictorType {n})
        }
    }
}

fn filter_paeth(a: u8, b: u8, c: u8) -> u8 {
    let ia = a as i16;
    let ib = b as i16;
    let ic = c as i16;

    let p = ia + ib - ic;

    let pa = (p - ia).abs();
    let pb = (p - ib).abs();
    let pc = (p - ic).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn unfilter(filter: PredictorType, bpp: usize, prev: &[u8], inp: &[u8], out: &mut [u8]) {
    use self::PredictorType::*;
    let len = inp.len();
    debug_assert_eq!(len, out.len());
    debug_assert_eq!(len, prev.len());
    let bpp = bpp.min(len);

    match filter {
        NoFilter => {
            out[..len].copy_from_slice(&inp[..len]);
        }
        Sub => {
            out[..bpp].copy_from_slice(&inp[..bpp]);
            for i in bpp..len {
                out[i] = inp[i].wrapping_add(out[i - bpp]);
            }
        }
        Up => {
            for i in 0..len {
                out[i] = inp[i].wrapping_add(prev[i]);
            }
        }
        Avg => {
            for i in 0..bpp {
                out[i] = inp[i].wrapping_add(prev[i] / 2);
            }

            for i in bpp..len {
                out[i] = inp[i].wrapping_add(
                    ((out[i - bpp] as i16 + prev[i] as i16) / 2) as u8
                );
            }
        }
        Paeth => {
            for i in 0..bpp {
                out[i] = inp[i].wrapping_add(
                    filter_paeth(0, prev[i], 0)
                );
            }

            for i in bpp..len {
                out[i] = inp[i].wrapping_add(
                    filter_paeth(out[i - bpp], prev[i], prev[i - bpp])
                );
            }
        }
    }
}

fn filter(method: PredictorType, bpp: usize, previous: &[u8], current: &mut [u8]) {
    use self::PredictorType::*;
    let len  = current.len();
    let bpp = bpp.min(len);

    match method {
        NoFilter => (),
        Sub => {
            for i in (bpp..len).rev() {
                current[i] = current[i].wrapping_sub(current[i - bpp]);
            }
        }
        Up => {
            for i in 0..len {
                current[i] = current[i].wrapping_sub(previous[i]);
            }
        }
        Avg => {
            for i in (bpp..len).rev() {
                current[i] = current[i].wrapping_sub(((current[i - bpp] as u16 + previous[i] as u16) / 2) as u8);
            }

            for i in 0..bpp {
                current[i] = current[i].wrapping_sub(previous[i] / 2);
            }
        }
        Paeth => {
            for i in (bpp..len).rev() {
                current[i] = current[i].wrapping_sub(filter_paeth(current[i - bpp], previous[i], previous[i - bpp]));
            }

            for i in 0..bpp {
                current[i] = current[i].wrapping_sub(filter_paeth(0, previous[i], 0));
            }
        }
    }
}
