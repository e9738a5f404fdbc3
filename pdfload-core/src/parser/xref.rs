//! PDF Cross-Reference Table Parser
//!
//! Parses xref tables according to ISO 32000-1 Section 7.5.4. A section that
//! does not follow the fixed grammar is re-read line by line; only lines that
//! cannot be understood at all make the load fail.

use super::diagnostics::Diagnostics;
use super::lexer::{find_bytes, rfind_bytes, Lexer, Token};
use super::objects::ObjectKey;
use super::{ParseError, ParseResult};
use std::collections::HashMap;

/// Byte offsets of in-use objects, keyed by object number and generation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XRefTable {
    offsets: HashMap<ObjectKey, u64>,
}

impl XRefTable {
    /// Create a new empty xref table
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            offsets: HashMap::with_capacity(capacity),
        }
    }

    /// Record an offset unless the key already has one. Returns whether the
    /// entry was added.
    pub fn insert_if_absent(&mut self, key: ObjectKey, offset: u64) -> bool {
        if self.offsets.contains_key(&key) {
            return false;
        }
        self.offsets.insert(key, offset);
        true
    }

    pub fn get(&self, key: ObjectKey) -> Option<u64> {
        self.offsets.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Apply a more recent section on top of this one; its entries win
    pub fn update(&mut self, newer: &XRefTable) {
        self.offsets
            .extend(newer.offsets.iter().map(|(key, offset)| (*key, *offset)));
    }

    /// All keys in ascending order
    pub fn keys(&self) -> Vec<ObjectKey> {
        let mut keys: Vec<ObjectKey> = self.offsets.keys().copied().collect();
        keys.sort();
        keys
    }
}

fn invalid(position: usize, message: impl Into<String>) -> ParseError {
    ParseError::InvalidXRef {
        position,
        message: message.into(),
    }
}

/// Locate the newest xref section through the last `startxref` in the file.
///
/// The keyword must be followed by the section offset and an end-of-file
/// comment. The lexer is left wherever the footer ended.
pub fn find_startxref(lexer: &mut Lexer) -> ParseResult<u64> {
    let Some(start) = rfind_bytes(lexer.data(), b"startxref") else {
        return Err(invalid(
            lexer.data().len(),
            "Did not find \"startxref\" at end of file",
        ));
    };

    lexer.seek(start);
    lexer.next_raw_token()?;
    let offset = match lexer.next_raw_token()? {
        Token::Integer(offset) if offset >= 0 => offset as u64,
        _ => return Err(lexer.syntax_error("Expected table location")),
    };

    let eof = match lexer.next_raw_token()? {
        Token::Comment(body) => {
            let body = String::from_utf8_lossy(&body);
            body.trim_end().trim_start_matches('%') == "EOF"
        }
        _ => false,
    };
    if !eof {
        return Err(lexer.syntax_error("Expected %%EOF"));
    }

    tracing::debug!("startxref points to offset {}", offset);
    Ok(offset)
}

/// Parse one `xref ... trailer` section into `table`.
///
/// On return the lexer is positioned just after the `trailer` keyword.
pub fn parse_section(
    lexer: &mut Lexer,
    table: &mut XRefTable,
    diagnostics: &mut Diagnostics,
) -> ParseResult<()> {
    if lexer.next_token()? != Token::XRef {
        return Err(invalid(lexer.token_start(), "Expected \"xref\" keyword"));
    }
    let start = lexer.position();

    if let Some(section) = parse_strict(lexer) {
        for (key, offset) in section {
            table.insert_if_absent(key, offset);
        }
        return Ok(());
    }

    let end = recover_lines(lexer.data(), start, table)?;
    diagnostics.warn(Some(start), "Badly formatted xref table");
    lexer.seek(end);
    lexer.next_token()?;
    Ok(())
}

/// Subsection grammar: `first count` followed by `count` entries of
/// `offset generation n|f`. Returns `None` on the first deviation.
fn parse_strict(lexer: &mut Lexer) -> Option<Vec<(ObjectKey, u64)>> {
    let mut entries = Vec::new();

    loop {
        let first = match lexer.next_token().ok()? {
            Token::Trailer => return Some(entries),
            token => token.as_unsigned()?,
        };
        let count = lexer.next_token().ok()?.as_unsigned()?;

        for number in first..first.checked_add(count)? {
            let offset = lexer.next_token().ok()?.as_unsigned()?;
            let generation = lexer.next_token().ok()?.as_unsigned()?;
            match lexer.next_token().ok()? {
                Token::Keyword(flag) if flag == "n" => {
                    if offset != 0 {
                        entries.push((ObjectKey::from_parts(number, generation)?, offset));
                    }
                }
                Token::Keyword(flag) if flag == "f" => {}
                _ => return None,
            }
        }
    }
}

/// Line-oriented reading of a damaged section, from `start` up to the next
/// `trailer` keyword. Returns the offset of that keyword.
fn recover_lines(data: &[u8], start: usize, table: &mut XRefTable) -> ParseResult<usize> {
    let end = find_bytes(data, b"trailer", start, data.len())
        .ok_or_else(|| invalid(start, "Invalid table format"))?;

    let bad_table = || invalid(start, "Invalid table format");
    let mut number: Option<u64> = None;
    for line in data[start..end].split(|&b| b == b'\n' || b == b'\r') {
        let fields: Vec<&[u8]> = line
            .split(|b| b.is_ascii_whitespace())
            .filter(|field| !field.is_empty())
            .collect();

        match fields.as_slice() {
            [] => {}
            [first, _count] => {
                number = Some(parse_field(first).ok_or_else(bad_table)?);
            }
            [offset, generation, flag] => {
                let current = number.ok_or_else(bad_table)?;
                let offset = parse_field(offset).ok_or_else(bad_table)?;
                let generation = parse_field(generation).ok_or_else(bad_table)?;
                if offset != 0 && *flag == b"n" {
                    let key = ObjectKey::from_parts(current, generation).ok_or_else(bad_table)?;
                    table.insert_if_absent(key, offset);
                }
                number = Some(current.checked_add(1).ok_or_else(bad_table)?);
            }
            _ => {
                tracing::error!(
                    "Invalid line in xref table: {:?}",
                    String::from_utf8_lossy(line)
                );
                return Err(bad_table());
            }
        }
    }

    Ok(end)
}

fn parse_field(field: &[u8]) -> Option<u64> {
    std::str::from_utf8(field).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(input: &str) -> (ParseResult<XRefTable>, Lexer, Diagnostics) {
        let mut lexer = Lexer::new(input.as_bytes());
        let mut table = XRefTable::new();
        let mut diagnostics = Diagnostics::new(true);
        let result = parse_section(&mut lexer, &mut table, &mut diagnostics).map(|_| table);
        (result, lexer, diagnostics)
    }

    #[test]
    fn test_find_startxref() {
        let mut lexer = Lexer::new(&b"startxref\n1\n%%EOF\n... startxref\n  1234\n%%EOF\n"[..]);
        assert_eq!(find_startxref(&mut lexer).unwrap(), 1234);

        let mut lexer = Lexer::new(&b"startxref 9 %EOF"[..]);
        assert_eq!(find_startxref(&mut lexer).unwrap(), 9);
    }

    #[test]
    fn test_find_startxref_failures() {
        let mut lexer = Lexer::new(&b"%PDF-1.4\n%%EOF"[..]);
        assert!(matches!(
            find_startxref(&mut lexer),
            Err(ParseError::InvalidXRef { .. })
        ));

        let mut lexer = Lexer::new(&b"startxref\nxref\n%%EOF"[..]);
        match find_startxref(&mut lexer) {
            Err(ParseError::SyntaxError { message, .. }) => {
                assert_eq!(message, "Expected table location")
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let mut lexer = Lexer::new(&b"startxref\n116\ntrailer"[..]);
        match find_startxref(&mut lexer) {
            Err(ParseError::SyntaxError { message, .. }) => assert_eq!(message, "Expected %%EOF"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_well_formed_section() {
        let (table, mut lexer, diagnostics) = section(
            "xref\n0 4\n0000000000 65535 f \n0000000009 00000 n \n0000000074 00000 n \n0000000000 00000 n \n\
             10 1\n0000000500 00002 n \ntrailer\n<< /Size 11 >>",
        );
        let table = table.unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(ObjectKey::new(1, 0)), Some(9));
        assert_eq!(table.get(ObjectKey::new(2, 0)), Some(74));
        assert_eq!(table.get(ObjectKey::new(3, 0)), None);
        assert_eq!(table.get(ObjectKey::new(10, 2)), Some(500));
        assert!(diagnostics.items().is_empty());
        assert_eq!(lexer.next_token().unwrap(), Token::DictStart);
    }

    #[test]
    fn test_duplicate_entries_first_wins() {
        let (table, _, _) = section("xref\n1 1\n0000000100 00000 n\n1 1\n0000000200 00000 n\ntrailer\n");
        assert_eq!(table.unwrap().get(ObjectKey::new(1, 0)), Some(100));
    }

    #[test]
    fn test_existing_entries_are_kept() {
        let mut lexer = Lexer::new(&b"xref\n1 1\n0000000200 00000 n\ntrailer"[..]);
        let mut table = XRefTable::new();
        table.insert_if_absent(ObjectKey::new(1, 0), 100);
        let mut diagnostics = Diagnostics::new(true);
        parse_section(&mut lexer, &mut table, &mut diagnostics).unwrap();
        assert_eq!(table.get(ObjectKey::new(1, 0)), Some(100));
    }

    #[test]
    fn test_malformed_section_recovers_by_lines() {
        // Subsection claims 4 entries but only 3 follow
        let (table, mut lexer, diagnostics) = section(
            "xref\n0 4\n0000000000 65535 f\n0000000015 00000 n\n0000000079 00000 n\ntrailer\n<< >>",
        );
        let table = table.unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(ObjectKey::new(1, 0)), Some(15));
        assert_eq!(table.get(ObjectKey::new(2, 0)), Some(79));
        assert_eq!(diagnostics.warnings().count(), 1);
        assert_eq!(diagnostics.items()[0].message, "Badly formatted xref table");
        assert_eq!(lexer.next_token().unwrap(), Token::DictStart);
    }

    #[test]
    fn test_recovery_handles_odd_entry_shapes() {
        // Entries with a missing flag space and a stray keyword break the strict grammar
        let (table, _, diagnostics) = section(
            "xref\n0 3\n0000000000 65535 f\r\n0000000015 00000 n\r\n0000000079 00000 x\r\n5 1\r\n0000000300 00001 n\r\ntrailer",
        );
        let table = table.unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(ObjectKey::new(1, 0)), Some(15));
        assert_eq!(table.get(ObjectKey::new(5, 1)), Some(300));
        assert_eq!(diagnostics.warnings().count(), 1);
    }

    #[test]
    fn test_unrecoverable_section() {
        let (result, _, _) = section("xref\n0 2\n0000000000 65535 f\ngarbage in this line\ntrailer");
        match result {
            Err(ParseError::InvalidXRef { position, message }) => {
                assert_eq!(position, 4);
                assert_eq!(message, "Invalid table format");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let (result, _, _) = section("xref\n0 1\n0000000000 65535 f\n");
        assert!(matches!(result, Err(ParseError::InvalidXRef { .. })));
    }

    #[test]
    fn test_object_number_overflow_is_invalid() {
        let (result, _, diagnostics) =
            section("xref\n18446744073709551615 1\n0000000000 65535 f\ntrailer\n<< >>");
        match result {
            Err(ParseError::InvalidXRef { message, .. }) => {
                assert_eq!(message, "Invalid table format")
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(diagnostics.items().is_empty());
    }

    #[test]
    fn test_missing_xref_keyword() {
        let (result, _, _) = section("1 0 obj\n<< >>\nendobj");
        match result {
            Err(ParseError::InvalidXRef { position, message }) => {
                assert_eq!(position, 0);
                assert_eq!(message, "Expected \"xref\" keyword");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_update_newer_wins() {
        let mut older = XRefTable::new();
        older.insert_if_absent(ObjectKey::new(1, 0), 10);
        older.insert_if_absent(ObjectKey::new(2, 0), 20);
        let mut newer = XRefTable::new();
        newer.insert_if_absent(ObjectKey::new(2, 0), 200);
        newer.insert_if_absent(ObjectKey::new(3, 0), 300);

        older.update(&newer);
        assert_eq!(older.get(ObjectKey::new(1, 0)), Some(10));
        assert_eq!(older.get(ObjectKey::new(2, 0)), Some(200));
        assert_eq!(older.get(ObjectKey::new(3, 0)), Some(300));
        assert_eq!(
            older.keys(),
            vec![ObjectKey::new(1, 0), ObjectKey::new(2, 0), ObjectKey::new(3, 0)]
        );
    }
}
