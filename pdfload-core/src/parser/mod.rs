//! PDF Loader Module
//!
//! This module turns a raw PDF byte buffer into a graph of typed objects linked
//! by lazily resolved indirect references. Streams are located and sliced out of
//! the file but never interpreted.

pub mod container;
pub mod diagnostics;
pub mod filters;
pub mod header;
pub mod lexer;
pub mod objects;
pub mod page_tree;
pub mod reader;
pub mod stream;
pub mod table;
pub mod trailer;
pub mod xref;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use self::diagnostics::{Diagnostic, Severity};
pub use self::objects::{ObjectKey, PdfArray, PdfDictionary, PdfName, PdfObject, PdfString};
pub use self::reader::PdfReader;
pub use self::trailer::PdfTrailer;

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// PDF Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty PDF file")]
    EmptyFile,

    #[error("Invalid PDF header: {0:?}")]
    InvalidHeader(String),

    #[error("EOF mark not found: {0:?}")]
    MissingEofMarker(String),

    #[error("Syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Invalid xref table at position {position}: {message}")]
    InvalidXRef { position: usize, message: String },

    #[error("Stream error at position {position}: {message}")]
    StreamError { position: usize, message: String },

    #[error("Stream decode error: {0}")]
    StreamDecodeError(String),
}

impl ParseError {
    /// Byte offset the error refers to, when it has one
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::SyntaxError { position, .. }
            | ParseError::InvalidXRef { position, .. }
            | ParseError::StreamError { position, .. } => Some(*position),
            _ => None,
        }
    }
}

/// Options controlling how forgiving the loader is
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOptions {
    /// Record stream `/Length` mismatches as errors and keep a best-effort
    /// payload instead of failing the load. On by default.
    pub lenient_streams: bool,
    /// Keep every diagnostic in memory so callers can inspect it
    pub collect_warnings: bool,
    /// Decode every stream once loading has finished
    pub decompress: bool,
    /// Expected number of indirect objects, used to pre-size the tables
    pub object_capacity: Option<usize>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            lenient_streams: true,
            collect_warnings: true,
            decompress: false,
            object_capacity: None,
        }
    }
}

impl ParseOptions {
    /// Fail on every stream boundary problem
    pub fn strict() -> Self {
        Self {
            lenient_streams: false,
            ..Self::default()
        }
    }

    /// Recover from everything that has a usable fallback (the default)
    pub fn lenient() -> Self {
        Self::default()
    }

    /// Builder-style setter for [`ParseOptions::decompress`]
    pub fn with_decompress(mut self, decompress: bool) -> Self {
        self.decompress = decompress;
        self
    }

    /// Builder-style setter for [`ParseOptions::object_capacity`]
    pub fn with_object_capacity(mut self, capacity: usize) -> Self {
        self.object_capacity = Some(capacity);
        self
    }
}
