//! PDF Lexer
//!
//! Tokenizes PDF syntax according to ISO 32000-1 Section 7.2. The lexer works
//! over the whole file held in memory, so callers can seek to any offset,
//! rewind to the start of the last token, or search the raw bytes directly.

use super::{ParseError, ParseResult};

/// PDF Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Boolean: true or false
    Boolean(bool),

    /// Integer number (optional sign followed by digits only)
    Integer(i64),

    /// Real number
    Real(f64),

    /// String (literal or hexadecimal)
    String(Vec<u8>),

    /// Name object (e.g., /Type)
    Name(String),

    /// Left square bracket [
    ArrayStart,

    /// Right square bracket ]
    ArrayEnd,

    /// Dictionary start <<
    DictStart,

    /// Dictionary end >>
    DictEnd,

    /// Stream keyword
    Stream,

    /// Endstream keyword
    EndStream,

    /// Obj keyword
    Obj,

    /// Endobj keyword
    EndObj,

    /// Xref keyword
    XRef,

    /// Trailer keyword
    Trailer,

    /// StartXRef keyword
    StartXRef,

    /// The `R` of an indirect reference
    R,

    /// Null object
    Null,

    /// Any other bare word
    Keyword(String),

    /// A delimiter that never starts a valid object: `)`, `{`, `}` or a lone `>`
    Delimiter(u8),

    /// Comment, without the leading `%`
    Comment(Vec<u8>),

    /// End of file
    Eof,
}

impl Token {
    /// Non-negative integers are the only tokens that can start a reference
    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            Token::Integer(n) if *n >= 0 => Some(*n as u64),
            _ => None,
        }
    }
}

/// PDF whitespace characters (ISO 32000-1 Table 1)
pub fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

/// PDF delimiter characters (ISO 32000-1 Table 2)
pub fn is_delimiter(ch: u8) -> bool {
    matches!(
        ch,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(ch: u8) -> bool {
    !is_whitespace(ch) && !is_delimiter(ch)
}

/// Find `needle` in `haystack[start..end]`, returning an absolute offset
pub fn find_bytes(haystack: &[u8], needle: &[u8], start: usize, end: usize) -> Option<usize> {
    let end = end.min(haystack.len());
    if needle.is_empty() || start >= end || end - start < needle.len() {
        return None;
    }
    haystack[start..end]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + start)
}

/// Find the last occurrence of `needle` in `haystack`
pub fn rfind_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

/// PDF Lexer over an in-memory buffer
pub struct Lexer {
    data: Vec<u8>,
    position: usize,
    token_start: usize,
}

impl Lexer {
    /// Create a new lexer positioned at the start of `data`
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            position: 0,
            token_start: 0,
        }
    }

    /// The full buffer, for boundary searches
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get current position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Offset where the most recently returned token starts
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// Move to an absolute offset; offsets past the end clamp to the end
    pub fn seek(&mut self, offset: usize) {
        self.position = offset.min(self.data.len());
        self.token_start = self.position;
    }

    /// Step back so the last token is returned again by the next read
    pub fn rewind_to_token_start(&mut self) {
        self.position = self.token_start;
    }

    /// Build a syntax error annotated with the start of the current token
    pub fn syntax_error(&self, message: impl Into<String>) -> ParseError {
        ParseError::SyntaxError {
            position: self.token_start,
            message: message.into(),
        }
    }

    /// Get the next token, skipping comments
    pub fn next_token(&mut self) -> ParseResult<Token> {
        loop {
            match self.next_raw_token()? {
                Token::Comment(_) => continue,
                token => return Ok(token),
            }
        }
    }

    /// Read `count` tokens at once. Past the end of the buffer the batch is
    /// padded with [`Token::Eof`].
    pub fn read_tokens(&mut self, count: usize) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::with_capacity(count);
        for _ in 0..count {
            tokens.push(self.next_token()?);
        }
        Ok(tokens)
    }

    /// Get the next token including comments
    pub fn next_raw_token(&mut self) -> ParseResult<Token> {
        self.skip_whitespace();
        self.token_start = self.position;

        let ch = match self.peek() {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };

        match ch {
            b'%' => Ok(self.read_comment()),
            b'/' => Ok(self.read_name()),
            b'(' => self.read_literal_string(),
            b'<' => {
                if self.peek_at(1) == Some(b'<') {
                    self.position += 2;
                    Ok(Token::DictStart)
                } else {
                    self.read_hex_string()
                }
            }
            b'>' => {
                if self.peek_at(1) == Some(b'>') {
                    self.position += 2;
                    Ok(Token::DictEnd)
                } else {
                    self.position += 1;
                    Ok(Token::Delimiter(b'>'))
                }
            }
            b'[' => {
                self.position += 1;
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.position += 1;
                Ok(Token::ArrayEnd)
            }
            b')' | b'{' | b'}' => {
                self.position += 1;
                Ok(Token::Delimiter(ch))
            }
            _ => Ok(self.read_word()),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.data.get(self.position + ahead).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if !is_whitespace(ch) {
                break;
            }
            self.position += 1;
        }
    }

    /// Read a comment (from % to end of line)
    fn read_comment(&mut self) -> Token {
        self.position += 1;
        let start = self.position;
        while let Some(ch) = self.peek() {
            if ch == b'\n' || ch == b'\r' {
                break;
            }
            self.position += 1;
        }
        Token::Comment(self.data[start..self.position].to_vec())
    }

    /// Read a name object (e.g., /Type)
    fn read_name(&mut self) -> Token {
        self.position += 1;
        let mut name = String::new();

        while let Some(ch) = self.peek() {
            if !is_regular(ch) {
                break;
            }
            self.position += 1;

            // Handle hex codes in names (e.g., /A#20B means /A B)
            if ch == b'#' {
                let escaped = match (self.peek(), self.peek_at(1)) {
                    (Some(high), Some(low)) => hex_value(high).zip(hex_value(low)),
                    _ => None,
                };
                if let Some((high, low)) = escaped {
                    self.position += 2;
                    name.push(((high << 4) | low) as char);
                    continue;
                }
            }
            name.push(ch as char);
        }

        Token::Name(name)
    }

    /// Read a literal string (parentheses)
    fn read_literal_string(&mut self) -> ParseResult<Token> {
        self.position += 1;
        let mut string = Vec::new();
        let mut depth = 1;

        loop {
            let ch = self.peek().ok_or_else(|| self.syntax_error("Unterminated string"))?;
            self.position += 1;

            match ch {
                b'\\' => {
                    let Some(next) = self.peek() else {
                        continue;
                    };
                    self.position += 1;
                    match next {
                        b'n' => string.push(b'\n'),
                        b'r' => string.push(b'\r'),
                        b't' => string.push(b'\t'),
                        b'b' => string.push(b'\x08'),
                        b'f' => string.push(b'\x0C'),
                        b'0'..=b'7' => {
                            let mut value = u32::from(next - b'0');
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(digit @ b'0'..=b'7') => {
                                        self.position += 1;
                                        value = value * 8 + u32::from(digit - b'0');
                                    }
                                    _ => break,
                                }
                            }
                            string.push(value as u8);
                        }
                        // Line continuation
                        b'\r' => {
                            if self.peek() == Some(b'\n') {
                                self.position += 1;
                            }
                        }
                        b'\n' => {}
                        other => string.push(other),
                    }
                }
                b'(' => {
                    depth += 1;
                    string.push(ch);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    string.push(ch);
                }
                _ => string.push(ch),
            }
        }

        Ok(Token::String(string))
    }

    /// Read a hexadecimal string (<48656C6C6F>)
    fn read_hex_string(&mut self) -> ParseResult<Token> {
        self.position += 1;
        let mut digits = Vec::new();

        loop {
            let ch = self
                .peek()
                .ok_or_else(|| self.syntax_error("Unterminated hex string"))?;
            self.position += 1;
            match ch {
                b'>' => break,
                _ if is_whitespace(ch) => {}
                _ => {
                    let value = hex_value(ch).ok_or_else(|| {
                        self.syntax_error(format!(
                            "Invalid character in hex string: {:?}",
                            ch as char
                        ))
                    })?;
                    digits.push(value);
                }
            }
        }

        // Pad with 0 if odd number of digits
        if digits.len() % 2 != 0 {
            digits.push(0);
        }

        Ok(Token::String(
            digits
                .chunks(2)
                .map(|pair| (pair[0] << 4) | pair[1])
                .collect(),
        ))
    }

    /// Read a run of regular characters and classify it
    fn read_word(&mut self) -> Token {
        let start = self.position;
        while let Some(ch) = self.peek() {
            if !is_regular(ch) {
                break;
            }
            self.position += 1;
        }
        classify_word(&self.data[start..self.position])
    }
}

fn hex_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        _ => None,
    }
}

fn classify_word(word: &[u8]) -> Token {
    match word {
        b"true" => return Token::Boolean(true),
        b"false" => return Token::Boolean(false),
        b"null" => return Token::Null,
        b"obj" => return Token::Obj,
        b"endobj" => return Token::EndObj,
        b"stream" => return Token::Stream,
        b"endstream" => return Token::EndStream,
        b"xref" => return Token::XRef,
        b"trailer" => return Token::Trailer,
        b"startxref" => return Token::StartXRef,
        b"R" => return Token::R,
        _ => {}
    }

    let text = String::from_utf8_lossy(word);
    let digits = text.strip_prefix(&['+', '-'][..]).unwrap_or(&*text);

    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(value) = text.parse::<i64>() {
            return Token::Integer(value);
        }
    }

    let numeric = !digits.is_empty()
        && digits.bytes().any(|b| b.is_ascii_digit())
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && digits.bytes().filter(|&b| b == b'.').count() <= 1;
    if numeric {
        if let Ok(value) = text.parse::<f64>() {
            return Token::Real(value);
        }
    }

    Token::Keyword(text.into_owned())
}
