//! PDF Stream Filters
//!
//! Decodes stream payloads for [`PdfReader::decompress`](super::PdfReader::decompress)
//! according to ISO 32000-1 Section 7.4. Only filters that need no
//! `/DecodeParms` are handled; anything else is reported as unsupported and
//! the payload is left alone.

use super::objects::{PdfDictionary, PdfObject};
use super::{ParseError, ParseResult};

#[cfg(feature = "compression")]
use flate2::read::ZlibDecoder;
#[cfg(feature = "compression")]
use std::io::Read;

/// Standard PDF filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// ASCII hex decode
    ASCIIHexDecode,

    /// ASCII 85 decode
    ASCII85Decode,

    /// LZW decode
    LZWDecode,

    /// Flate decode (zlib/deflate compression)
    FlateDecode,

    /// Run length decode
    RunLengthDecode,

    /// CCITT fax decode
    CCITTFaxDecode,

    /// JBIG2 decode
    JBIG2Decode,

    /// DCT decode (JPEG)
    DCTDecode,

    /// JPX decode (JPEG 2000)
    JPXDecode,

    /// Crypt filter
    Crypt,
}

impl Filter {
    /// Parse filter from name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ASCIIHexDecode" => Some(Filter::ASCIIHexDecode),
            "ASCII85Decode" => Some(Filter::ASCII85Decode),
            "LZWDecode" => Some(Filter::LZWDecode),
            "FlateDecode" => Some(Filter::FlateDecode),
            "RunLengthDecode" => Some(Filter::RunLengthDecode),
            "CCITTFaxDecode" => Some(Filter::CCITTFaxDecode),
            "JBIG2Decode" => Some(Filter::JBIG2Decode),
            "DCTDecode" => Some(Filter::DCTDecode),
            "JPXDecode" => Some(Filter::JPXDecode),
            "Crypt" => Some(Filter::Crypt),
            _ => None,
        }
    }

    /// Whether [`decode_stream`] can undo this filter
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            Filter::ASCIIHexDecode | Filter::ASCII85Decode | Filter::FlateDecode
        )
    }
}

/// The `/Filter` entry of a stream dictionary as an ordered list. A stream
/// without the entry has an empty chain.
pub fn filter_chain(dict: &PdfDictionary) -> ParseResult<Vec<Filter>> {
    let names: Vec<&str> = match dict.get("Filter") {
        None => return Ok(Vec::new()),
        Some(PdfObject::Name(name)) => vec![name.as_str()],
        Some(PdfObject::Array(array)) => array
            .iter()
            .map(|obj| {
                obj.as_name().map(|n| n.as_str()).ok_or_else(|| {
                    ParseError::StreamDecodeError("Invalid filter in array".to_string())
                })
            })
            .collect::<ParseResult<_>>()?,
        Some(other) => {
            return Err(ParseError::StreamDecodeError(format!(
                "Invalid Filter type: {}",
                other.kind()
            )))
        }
    };

    names
        .into_iter()
        .map(|name| {
            Filter::from_name(name)
                .ok_or_else(|| ParseError::StreamDecodeError(format!("Unknown filter: {name}")))
        })
        .collect()
}

/// Decode stream data according to the dictionary's filters
pub fn decode_stream(data: &[u8], dict: &PdfDictionary) -> ParseResult<Vec<u8>> {
    if dict.contains_key("DecodeParms") {
        return Err(ParseError::StreamDecodeError(
            "/DecodeParms not supported".to_string(),
        ));
    }

    let mut result = data.to_vec();
    for filter in filter_chain(dict)? {
        result = apply_filter(&result, filter)?;
    }
    Ok(result)
}

/// Apply a single filter to data
fn apply_filter(data: &[u8], filter: Filter) -> ParseResult<Vec<u8>> {
    match filter {
        Filter::FlateDecode => decode_flate(data),
        Filter::ASCIIHexDecode => decode_ascii_hex(data),
        Filter::ASCII85Decode => decode_ascii85(data),
        _ => Err(ParseError::StreamDecodeError(format!(
            "Filter {filter:?} not supported"
        ))),
    }
}

/// Decode FlateDecode (zlib/deflate) compressed data
#[cfg(feature = "compression")]
fn decode_flate(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut result = Vec::new();
    decoder
        .read_to_end(&mut result)
        .map_err(|e| ParseError::StreamDecodeError(format!("Flate decode error: {e}")))?;
    Ok(result)
}

#[cfg(not(feature = "compression"))]
fn decode_flate(_data: &[u8]) -> ParseResult<Vec<u8>> {
    Err(ParseError::StreamDecodeError(
        "FlateDecode requires 'compression' feature".to_string(),
    ))
}

/// Decode ASCIIHexDecode data
fn decode_ascii_hex(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut digits = Vec::new();
    for &ch in data.iter().filter(|b| !b.is_ascii_whitespace()) {
        if ch == b'>' {
            break;
        }
        let value = hex_digit_value(ch).ok_or_else(|| {
            ParseError::StreamDecodeError(format!("Invalid hex digit: {}", ch as char))
        })?;
        digits.push(value);
    }

    // Odd number of digits, pad with 0
    if digits.len() % 2 != 0 {
        digits.push(0);
    }

    Ok(digits
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair[1])
        .collect())
}

fn hex_digit_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        _ => None,
    }
}

/// Decode ASCII85Decode data
fn decode_ascii85(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut body: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if body.starts_with(b"<~") {
        body.drain(..2);
    }

    let mut result = Vec::new();
    let mut group = Vec::with_capacity(5);
    let mut chars = body.iter().copied();

    while let Some(c) = chars.next() {
        match c {
            b'~' => {
                if chars.next() != Some(b'>') {
                    return Err(ParseError::StreamDecodeError(
                        "Invalid ASCII85 end marker".to_string(),
                    ));
                }
                break;
            }
            // 'z' stands for four zero bytes between groups
            b'z' if group.is_empty() => result.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group.push(c);
                if group.len() == 5 {
                    result.extend_from_slice(&ascii85_group(&group)?);
                    group.clear();
                }
            }
            _ => {
                return Err(ParseError::StreamDecodeError(format!(
                    "Invalid ASCII85 character: {}",
                    c as char
                )));
            }
        }
    }

    // A final partial group of n characters encodes n - 1 bytes
    if !group.is_empty() {
        if group.len() == 1 {
            return Err(ParseError::StreamDecodeError(
                "Truncated ASCII85 group".to_string(),
            ));
        }
        let encoded = group.len() - 1;
        group.resize(5, b'u');
        result.extend_from_slice(&ascii85_group(&group)?[..encoded]);
    }

    Ok(result)
}

fn ascii85_group(group: &[u8]) -> ParseResult<[u8; 4]> {
    let value = group
        .iter()
        .fold(0u64, |acc, &ch| acc * 85 + u64::from(ch - b'!'));
    let value = u32::try_from(value)
        .map_err(|_| ParseError::StreamDecodeError("ASCII85 group out of range".to_string()))?;
    Ok(value.to_be_bytes())
}
