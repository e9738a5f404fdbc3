//! # pdfload
//!
//! A lazy, error-tolerant PDF document loader.
//!
//! `pdfload` turns a PDF file into a graph of typed objects linked by indirect
//! references. Only the cross-reference chain and the page tree are read up
//! front; every other object is parsed the first time it is resolved. Stream
//! payloads are sliced out of the file but not interpreted.
//!
//! ## Features
//!
//! - **Incremental updates**: follows `/Prev` links and merges every xref section,
//!   newest entries winning
//! - **Recovery**: malformed xref tables, objects at the wrong offset and wrong
//!   stream `/Length` values are repaired where possible and reported as
//!   [`Diagnostic`]s instead of aborting the load
//! - **Page list**: the page tree is flattened into document order at load time
//! - **Decompression**: optional pass decoding Flate, ASCIIHex and ASCII85 streams
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfload::{ObjectKey, PdfReader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut reader = PdfReader::open("document.pdf")?;
//!
//! println!("PDF {} with {} pages", reader.version(), reader.page_count());
//!
//! // Objects are loaded the first time they are resolved
//! let info = reader.resolve(ObjectKey::new(1, 0))?;
//! println!("{}", info.kind());
//!
//! for diagnostic in reader.diagnostics() {
//!     eprintln!("{diagnostic}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Strict and lenient loading
//!
//! By default a stream whose `/Length` cannot be reconciled with the file is
//! recorded as an error [`Diagnostic`] and keeps a best-effort payload.
//! [`ParseOptions::strict`] turns those problems into load failures:
//!
//! ```rust,no_run
//! use pdfload::{ParseOptions, PdfReader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ParseOptions::strict().with_decompress(true);
//! let reader = PdfReader::open_with_options("document.pdf", options)?;
//! println!("{} diagnostics", reader.diagnostics().len());
//! # Ok(())
//! # }
//! ```

pub mod parser;

pub use parser::{
    Diagnostic, ObjectKey, ParseError, ParseOptions, ParseResult, PdfArray, PdfDictionary,
    PdfName, PdfObject, PdfReader, PdfString, PdfTrailer, Severity,
};

/// Current version of pdfload
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
