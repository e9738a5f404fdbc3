//! PDF Header and Footer Framing
//!
//! Checks the `%PDF-x.y` header and the `%%EOF` marker according to
//! ISO 32000-1 Section 7.5.2 and 7.5.5, cutting off anything written after
//! the end-of-file marker.

use super::diagnostics::Diagnostics;
use super::lexer::{find_bytes, is_whitespace, rfind_bytes};
use super::{ParseError, ParseResult};

const HEADER_MARKER: &[u8] = b"%PDF-";
const EOF_MARKER: &[u8] = b"%EOF";

/// PDF Version information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    /// Create a new PDF version
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Parse the `x.y` text following `%PDF-`
    pub fn parse(text: &[u8]) -> Option<Self> {
        let end = text
            .iter()
            .position(|&b| is_whitespace(b) || b == b'%')
            .unwrap_or(text.len());
        let text = std::str::from_utf8(&text[..end]).ok()?;
        let (major, minor) = text.split_once('.')?;
        Some(Self::new(major.parse().ok()?, minor.parse().ok()?))
    }

    /// Check if this version is one the format defines
    pub fn is_supported(&self) -> bool {
        matches!((self.major, self.minor), (1, 0..=7) | (2, 0))
    }
}

impl Default for PdfVersion {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

impl std::fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// PDF Header information
#[derive(Debug, Clone, PartialEq)]
pub struct PdfHeader {
    pub version: PdfVersion,
    /// Offset of `%PDF-` in the file; non-zero when junk precedes it
    pub offset: usize,
    pub has_binary_marker: bool,
}

impl PdfHeader {
    /// Validate the framing of a whole file and trim it after `%EOF`.
    ///
    /// The buffer is truncated two bytes past the last `%EOF` so a trailing
    /// line end survives.
    pub fn frame(data: &mut Vec<u8>, diagnostics: &mut Diagnostics) -> ParseResult<Self> {
        let offset = if data.starts_with(HEADER_MARKER) {
            0
        } else {
            match find_bytes(data, HEADER_MARKER, 0, data.len()) {
                Some(offset) => {
                    diagnostics.warn(Some(offset), "PDF header not at beginning of file");
                    offset
                }
                None => return Err(Self::missing_header(data)),
            }
        };

        let Some(eof) = rfind_bytes(data, EOF_MARKER) else {
            let tail = &data[data.len().saturating_sub(20)..];
            return Err(ParseError::MissingEofMarker(
                String::from_utf8_lossy(tail).into_owned(),
            ));
        };

        let end = (eof + EOF_MARKER.len() + 2).min(data.len());
        if has_junk(&data[end..]) {
            diagnostics.warn(Some(end), "Extra data at end of file");
        }
        data.truncate(end);

        let after_marker = data.get(offset + HEADER_MARKER.len()..).unwrap_or_default();
        let version = match PdfVersion::parse(after_marker) {
            Some(version) => version,
            None => {
                diagnostics.warn(Some(offset), "Unable to parse PDF version, assuming 1.0");
                PdfVersion::default()
            }
        };

        Ok(Self {
            version,
            offset,
            has_binary_marker: Self::check_binary_marker(after_marker),
        })
    }

    fn missing_header(data: &[u8]) -> ParseError {
        let start = data
            .iter()
            .position(|&b| !b.is_ascii_whitespace())
            .unwrap_or(data.len());
        let rest = &data[start..];
        if rest.is_empty() {
            return ParseError::EmptyFile;
        }
        let line_end = rest
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
            .unwrap_or(rest.len());
        ParseError::InvalidHeader(String::from_utf8_lossy(&rest[..line_end]).into_owned())
    }

    /// Check for binary marker comment on the line after the header
    fn check_binary_marker(after_marker: &[u8]) -> bool {
        let Some(line_end) = after_marker.iter().position(|&b| b == b'\n' || b == b'\r') else {
            return false;
        };
        let rest = &after_marker[line_end..];
        let start = rest
            .iter()
            .position(|&b| b != b'\n' && b != b'\r')
            .unwrap_or(rest.len());
        let line = &rest[start..];
        if line.first() != Some(&b'%') {
            return false;
        }
        // Binary marker should be a comment with at least 4 binary characters
        line.iter()
            .skip(1)
            .take_while(|&&b| b != b'\n' && b != b'\r')
            .filter(|&&b| b >= 128)
            .count()
            >= 4
    }
}

/// Anything other than NUL padding and whitespace after the end marker
fn has_junk(tail: &[u8]) -> bool {
    let without_nuls = match tail.iter().rposition(|&b| b != 0) {
        Some(last) => &tail[..=last],
        None => return false,
    };
    without_nuls
        .iter()
        .any(|&b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0B' | b'\x0C'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(input: &[u8]) -> (ParseResult<PdfHeader>, Vec<u8>, Diagnostics) {
        let mut data = input.to_vec();
        let mut diagnostics = Diagnostics::new(true);
        let result = PdfHeader::frame(&mut data, &mut diagnostics);
        (result, data, diagnostics)
    }

    #[test]
    fn test_frame_basic() {
        let (header, data, diagnostics) = frame(b"%PDF-1.7\n1 0 obj\nnull\nendobj\n%%EOF\n");
        let header = header.unwrap();

        assert_eq!(header.version, PdfVersion::new(1, 7));
        assert_eq!(header.offset, 0);
        assert!(!header.has_binary_marker);
        assert!(data.ends_with(b"%%EOF\n"));
        assert!(diagnostics.items().is_empty());
    }

    #[test]
    fn test_frame_with_binary_marker() {
        let (header, _, _) = frame(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n%%EOF");
        assert!(header.unwrap().has_binary_marker);

        let (header, _, _) = frame(b"%PDF-1.4\n%\xE2\xE3\n%%EOF");
        assert!(!header.unwrap().has_binary_marker);
    }

    #[test]
    fn test_header_not_at_start() {
        let (header, _, diagnostics) = frame(b"garbage\n%PDF-1.3\n%%EOF");
        let header = header.unwrap();

        assert_eq!(header.offset, 8);
        assert_eq!(header.version, PdfVersion::new(1, 3));
        assert_eq!(diagnostics.warnings().count(), 1);
        assert_eq!(
            diagnostics.items()[0].message,
            "PDF header not at beginning of file"
        );
    }

    #[test]
    fn test_missing_header() {
        let (result, _, _) = frame(b"  \n\t ");
        assert!(matches!(result, Err(ParseError::EmptyFile)));

        let (result, _, _) = frame(b"\n\nNot a PDF\nsecond line");
        match result {
            Err(ParseError::InvalidHeader(line)) => assert_eq!(line, "Not a PDF"),
            other => panic!("expected invalid header, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_eof_marker() {
        let (result, _, _) = frame(b"%PDF-1.4\n1 0 obj null endobj\ntrailer");
        match result {
            Err(ParseError::MissingEofMarker(tail)) => assert_eq!(tail, " null endobj\ntrailer"),
            other => panic!("expected missing EOF, got {other:?}"),
        }
    }

    #[test]
    fn test_trailing_junk_is_cut() {
        let (header, data, diagnostics) = frame(b"%PDF-1.4\n%%EOF\r\nJUNK");
        header.unwrap();
        assert_eq!(data, b"%PDF-1.4\n%%EOF\r\n");
        assert_eq!(diagnostics.items().len(), 1);
        assert_eq!(diagnostics.items()[0].message, "Extra data at end of file");
    }

    #[test]
    fn test_trailing_padding_is_quiet() {
        let (header, data, diagnostics) = frame(b"%PDF-1.4\n%%EOF\n\n  \0\0\0");
        header.unwrap();
        assert_eq!(data, b"%PDF-1.4\n%%EOF\n\n");
        assert!(diagnostics.items().is_empty());
    }

    #[test]
    fn test_last_eof_marker_wins() {
        let input = b"%PDF-1.4\n%%EOF\nupdate\n%%EOF\n";
        let (header, data, diagnostics) = frame(input);
        header.unwrap();
        assert_eq!(data, input.to_vec());
        assert!(diagnostics.items().is_empty());
    }

    #[test]
    fn test_unparsable_version_defaults() {
        let (header, _, diagnostics) = frame(b"%PDF-x.y\n%%EOF");
        assert_eq!(header.unwrap().version, PdfVersion::new(1, 0));
        assert_eq!(diagnostics.warnings().count(), 1);
    }

    #[test]
    fn test_version_parse() {
        assert_eq!(PdfVersion::parse(b"1.5\r\n"), Some(PdfVersion::new(1, 5)));
        assert_eq!(PdfVersion::parse(b"2.0%comment"), Some(PdfVersion::new(2, 0)));
        assert_eq!(PdfVersion::parse(b"1\n"), None);
        assert_eq!(PdfVersion::parse(b"1.4.2\n"), None);
        assert_eq!(PdfVersion::parse(b""), None);
    }

    #[test]
    fn test_pdf_version_is_supported() {
        assert!(PdfVersion::new(1, 0).is_supported());
        assert!(PdfVersion::new(1, 7).is_supported());
        assert!(PdfVersion::new(2, 0).is_supported());
        assert!(!PdfVersion::new(1, 8).is_supported());
        assert!(!PdfVersion::new(3, 0).is_supported());
        assert_eq!(PdfVersion::new(1, 7).to_string(), "1.7");
    }
}
