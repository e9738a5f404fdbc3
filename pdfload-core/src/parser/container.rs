//! Container parsing
//!
//! Turns `<< ... >>` and `[ ... ]` token runs into dictionaries and arrays.
//! Indirect references are folded into placeholders registered with the
//! object table; nothing nested is loaded here.

use super::lexer::{Lexer, Token};
use super::objects::{ObjectKey, PdfArray, PdfDictionary, PdfName, PdfObject, PdfString};
use super::table::ObjectTable;
use super::ParseResult;

/// Maximum nesting of arrays and dictionaries inside one object
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parse a value starting from a token already taken from the lexer
pub fn read_value(lexer: &mut Lexer, table: &mut ObjectTable, token: Token) -> ParseResult<PdfObject> {
    read_value_at(lexer, table, token, 0)
}

fn read_value_at(
    lexer: &mut Lexer,
    table: &mut ObjectTable,
    token: Token,
    depth: usize,
) -> ParseResult<PdfObject> {
    match token {
        Token::Null => Ok(PdfObject::Null),
        Token::Boolean(b) => Ok(PdfObject::Boolean(b)),
        Token::Integer(i) => Ok(PdfObject::Integer(i)),
        Token::Real(r) => Ok(PdfObject::Real(r)),
        Token::String(s) => Ok(PdfObject::String(PdfString(s))),
        Token::Name(n) => Ok(PdfObject::Name(PdfName(n))),
        Token::DictStart => {
            check_depth(lexer, depth)?;
            read_dict_at(lexer, table, depth + 1).map(PdfObject::Dictionary)
        }
        Token::ArrayStart => {
            check_depth(lexer, depth)?;
            read_array_at(lexer, table, depth + 1).map(PdfObject::Array)
        }
        Token::DictEnd | Token::ArrayEnd | Token::Delimiter(_) => {
            Err(lexer.syntax_error("Unexpected delimiter"))
        }
        Token::Eof => Err(lexer.syntax_error("Unexpected end of file")),
        other => Err(lexer.syntax_error(format!("Unexpected keyword {other:?}"))),
    }
}

fn check_depth(lexer: &Lexer, depth: usize) -> ParseResult<()> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(lexer.syntax_error(format!(
            "Maximum nesting depth exceeded (limit: {MAX_NESTING_DEPTH})"
        )));
    }
    Ok(())
}

/// Parse the body of a dictionary; the lexer is just past `<<`
pub fn read_dict(lexer: &mut Lexer, table: &mut ObjectTable) -> ParseResult<PdfDictionary> {
    read_dict_at(lexer, table, 1)
}

fn read_dict_at(lexer: &mut Lexer, table: &mut ObjectTable, depth: usize) -> ParseResult<PdfDictionary> {
    let mut dict = PdfDictionary::new();

    loop {
        let key = match lexer.next_token()? {
            Token::DictEnd => break,
            Token::Name(name) => name,
            _ => return Err(lexer.syntax_error("Expected PDF /name object")),
        };

        let token = lexer.next_token()?;
        let value = match token.as_unsigned() {
            Some(number) => {
                let after = lexer.next_token()?;
                match after.as_unsigned() {
                    Some(generation) => {
                        if lexer.next_token()? != Token::R {
                            return Err(lexer.syntax_error("Expected \"R\" following two integers"));
                        }
                        reference(lexer, table, number, generation)?
                    }
                    None => {
                        lexer.rewind_to_token_start();
                        read_value_at(lexer, table, token, depth)?
                    }
                }
            }
            None => read_value_at(lexer, table, token, depth)?,
        };

        dict.insert(key, value);
    }

    Ok(dict)
}

/// Parse the body of an array; the lexer is just past `[`
pub fn read_array(lexer: &mut Lexer, table: &mut ObjectTable) -> ParseResult<PdfArray> {
    read_array_at(lexer, table, 1)
}

fn read_array_at(lexer: &mut Lexer, table: &mut ObjectTable, depth: usize) -> ParseResult<PdfArray> {
    let mut items: Vec<PdfObject> = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::ArrayEnd => break,
            Token::R => {
                let generation = items.pop().and_then(|obj| unsigned(&obj));
                let number = items.pop().and_then(|obj| unsigned(&obj));
                match (number, generation) {
                    (Some(number), Some(generation)) => {
                        items.push(reference(lexer, table, number, generation)?);
                    }
                    _ => {
                        return Err(
                            lexer.syntax_error("Expected two integers preceding \"R\"")
                        )
                    }
                }
            }
            token => items.push(read_value_at(lexer, table, token, depth)?),
        }
    }

    Ok(PdfArray::from(items))
}

fn unsigned(obj: &PdfObject) -> Option<u64> {
    match obj {
        PdfObject::Integer(n) if *n >= 0 => Some(*n as u64),
        _ => None,
    }
}

fn reference(
    lexer: &Lexer,
    table: &mut ObjectTable,
    number: u64,
    generation: u64,
) -> ParseResult<PdfObject> {
    let key = ObjectKey::from_parts(number, generation).ok_or_else(|| {
        lexer.syntax_error(format!("Object number out of range: {number} {generation}"))
    })?;
    Ok(table.find_indirect(key))
}
