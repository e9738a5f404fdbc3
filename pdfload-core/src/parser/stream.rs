//! Stream boundary detection
//!
//! Slices the raw payload of a stream object out of the file. The declared
//! `/Length` is trusted first; when the bytes after it are not
//! `endstream endobj` the extractor searches for the real boundary and either
//! repairs the payload or reports why it cannot.

use super::diagnostics::Diagnostics;
use super::lexer::{find_bytes, Lexer, Token};
use super::{ParseError, ParseResult};

const STREAM_KEYWORD_LEN: usize = b"stream".len();

/// The boundary search never looks at the last bytes of the file, which hold
/// the footer.
const FOOTER_RESERVE: usize = 20;

/// Per-document stream extraction state
#[derive(Debug, Clone, Default)]
pub struct StreamExtractor {
    lenient: bool,
    warned_bad_start: bool,
    warned_bad_end: bool,
}

impl StreamExtractor {
    pub fn new(lenient: bool) -> Self {
        Self {
            lenient,
            ..Self::default()
        }
    }

    /// Check the token following an object's value and compute where the
    /// stream payload begins.
    ///
    /// `token` is the token just read after the value; only a dictionary
    /// followed by `stream` is accepted.
    pub fn payload_start(
        &mut self,
        lexer: &Lexer,
        is_dict: bool,
        token: &Token,
        diagnostics: &mut Diagnostics,
    ) -> ParseResult<usize> {
        if !is_dict {
            return Err(lexer.syntax_error("Expected 'endobj'"));
        }
        if *token != Token::Stream {
            return Err(lexer.syntax_error("Expected 'endobj' or 'stream'"));
        }

        let data = lexer.data();
        let mut start = lexer.token_start() + STREAM_KEYWORD_LEN;
        let got_cr = data.get(start) == Some(&b'\r');
        if got_cr {
            start += 1;
        }
        let got_lf = data.get(start) == Some(&b'\n');
        if got_lf {
            start += 1;
        }

        if !got_lf {
            if !got_cr {
                return Err(ParseError::StreamError {
                    position: start,
                    message: "stream keyword not followed by \\n".to_string(),
                });
            }
            if !self.warned_bad_start {
                diagnostics.warn(Some(start), "stream keyword terminated by \\r without \\n");
                self.warned_bad_start = true;
            }
        }

        Ok(start)
    }

    /// Extract `length` payload bytes starting at `start`
    pub fn extract(
        &mut self,
        lexer: &mut Lexer,
        start: usize,
        length: usize,
        diagnostics: &mut Diagnostics,
    ) -> ParseResult<Vec<u8>> {
        let target_end = start.saturating_add(length);
        lexer.seek(target_end);
        let ending = lexer.read_tokens(2).unwrap_or_default();
        let data = lexer.data();

        if target_end <= data.len() && ending == [Token::EndStream, Token::EndObj] {
            return Ok(data[start..target_end].to_vec());
        }

        // The declared length does not end at `endstream endobj`
        let declared = data[start.min(data.len())..target_end.min(data.len())].to_vec();
        let search_end = data.len().saturating_sub(FOOTER_RESERVE);

        let Some(endstream) = find_bytes(data, b"endstream", start, search_end) else {
            return self.mismatch(diagnostics, start, "Could not find endstream".to_string(), declared);
        };
        let gap = endstream - start;

        if length == gap + 1 && start >= 2 && &data[start - 2..start] == b"\r\n" {
            if !self.warned_bad_end {
                diagnostics.warn(Some(start), "stream keyword terminated by \\r without \\n");
                self.warned_bad_end = true;
            }
            return Ok(data[start - 1..start - 1 + length].to_vec());
        }

        if length > gap {
            return self.mismatch(
                diagnostics,
                start,
                format!("Length too big: /Length {length} exceeds the {gap} bytes before endstream"),
                data[start..endstream].to_vec(),
            );
        }

        if has_content(&data[target_end..endstream]) {
            return self.mismatch(
                diagnostics,
                target_end,
                format!("Length too small: data follows the declared {length} bytes (size {gap})"),
                declared,
            );
        }

        let Some(endobj) = find_bytes(data, b"endobj", endstream, search_end) else {
            return self.mismatch(
                diagnostics,
                endstream,
                "Could not find endobj after endstream".to_string(),
                declared,
            );
        };

        if trim_end(&data[endstream..endobj]) != b"endstream" {
            return self.mismatch(
                diagnostics,
                endstream,
                "Unexpected data between endstream and endobj".to_string(),
                declared,
            );
        }

        Err(ParseError::StreamError {
            position: endstream,
            message: "Illegal endstream/endobj combination".to_string(),
        })
    }

    /// A boundary problem with a usable fallback payload
    fn mismatch(
        &self,
        diagnostics: &mut Diagnostics,
        position: usize,
        message: String,
        fallback: Vec<u8>,
    ) -> ParseResult<Vec<u8>> {
        if self.lenient {
            diagnostics.error(Some(position), message);
            Ok(fallback)
        } else {
            Err(ParseError::StreamError { position, message })
        }
    }
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0B' | b'\x0C')
}

fn trim_end(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| !is_space(b))
        .map_or(0, |last| last + 1);
    &bytes[..end]
}

fn has_content(bytes: &[u8]) -> bool {
    !trim_end(bytes).is_empty()
}
