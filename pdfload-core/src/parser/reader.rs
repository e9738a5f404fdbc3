//! High-level PDF Reader API
//!
//! [`PdfReader`] owns the file buffer and every table built from it. Loading
//! reads the xref chain and the page tree; every other object is parsed on
//! first use.

use super::container;
use super::diagnostics::{Diagnostic, Diagnostics};
use super::filters;
use super::header::{PdfHeader, PdfVersion};
use super::lexer::{find_bytes, Lexer, Token};
use super::objects::{ObjectKey, PdfDictionary, PdfObject};
use super::page_tree;
use super::stream::StreamExtractor;
use super::table::{ObjectState, ObjectTable};
use super::trailer::PdfTrailer;
use super::xref::{self, XRefTable};
use super::{ParseError, ParseOptions, ParseResult};
use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::Path;

/// High-level PDF reader
pub struct PdfReader {
    lexer: Lexer,
    header: PdfHeader,
    options: ParseOptions,
    objects: ObjectTable,
    xref: XRefTable,
    trailer: PdfTrailer,
    /// Flattened page list: references for indirect pages, inline dictionaries otherwise
    pages: Vec<PdfObject>,
    streams: StreamExtractor,
    diagnostics: Diagnostics,
}

impl fmt::Debug for PdfReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfReader")
            .field("version", &self.header.version)
            .field("size", &self.lexer.data().len())
            .field("objects", &self.objects.len())
            .field("xref_entries", &self.xref.len())
            .field("pages", &self.pages.len())
            .finish_non_exhaustive()
    }
}

impl PdfReader {
    /// Open a PDF file from a path
    pub fn open<P: AsRef<Path>>(path: P) -> ParseResult<Self> {
        Self::open_with_options(path, ParseOptions::default())
    }

    /// Open a PDF file from a path with custom parsing options
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> ParseResult<Self> {
        let data = std::fs::read(path.as_ref())?;
        tracing::debug!("Read {} bytes from {}", data.len(), path.as_ref().display());
        Self::from_bytes_with_options(data, options)
    }

    /// Load a PDF from any reader; the whole input is read up front
    pub fn from_reader<R: Read>(reader: R) -> ParseResult<Self> {
        Self::from_reader_with_options(reader, ParseOptions::default())
    }

    pub fn from_reader_with_options<R: Read>(mut reader: R, options: ParseOptions) -> ParseResult<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes_with_options(data, options)
    }

    /// Load a PDF held in memory
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> ParseResult<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    /// Load a PDF held in memory with custom parsing options
    pub fn from_bytes_with_options(data: impl Into<Vec<u8>>, options: ParseOptions) -> ParseResult<Self> {
        let mut data = data.into();
        let mut diagnostics = Diagnostics::new(options.collect_warnings);
        let header = PdfHeader::frame(&mut data, &mut diagnostics)?;
        let capacity = options.object_capacity.unwrap_or(0);

        let mut reader = Self {
            lexer: Lexer::new(data),
            header,
            objects: ObjectTable::with_capacity(capacity),
            xref: XRefTable::with_capacity(capacity),
            trailer: PdfTrailer::default(),
            pages: Vec::new(),
            streams: StreamExtractor::new(options.lenient_streams),
            diagnostics,
            options,
        };

        reader.load_xref_chain()?;
        reader.pages = page_tree::flatten(&mut reader)?;
        if reader.options.decompress {
            reader.decompress()?;
        }

        tracing::debug!(
            "Loaded PDF {}: {} xref entries, {} pages",
            reader.header.version,
            reader.xref.len(),
            reader.pages.len()
        );
        Ok(reader)
    }

    /// Walk the xref sections from the newest one back through `/Prev`
    fn load_xref_chain(&mut self) -> ParseResult<()> {
        let mut offset = xref::find_startxref(&mut self.lexer)?;
        let mut visited = HashSet::new();
        let mut sections: Vec<XRefTable> = Vec::new();
        let mut snapshot: Option<(ObjectTable, PdfTrailer)> = None;

        loop {
            if !visited.insert(offset) {
                return Err(ParseError::InvalidXRef {
                    position: to_position(offset),
                    message: "Circular /Prev chain".to_string(),
                });
            }

            let mut section = XRefTable::new();
            let mut trailer = self.read_section(offset, &mut section, sections.is_empty())?;
            sections.push(section);

            let prev = match trailer.dict().get("Prev") {
                None => {
                    if snapshot.is_none() {
                        self.trailer = trailer;
                    }
                    break;
                }
                Some(_) => trailer.prev().ok_or_else(|| ParseError::InvalidXRef {
                    position: self.lexer.position(),
                    message: "Invalid /Prev entry in trailer".to_string(),
                })?,
            };

            if snapshot.is_none() {
                trailer.take_prev();
                snapshot = Some((self.objects.clone(), trailer));
            }
            // Older trailers must not leave placeholders behind
            self.objects = ObjectTable::new();
            tracing::debug!("Following /Prev to xref section at {}", prev);
            offset = prev;
        }

        // Oldest first, so entries from newer sections overwrite older ones
        for section in sections.iter().rev() {
            self.xref.update(section);
        }
        if let Some((objects, trailer)) = snapshot {
            self.objects = objects;
            self.trailer = trailer;
        }
        Ok(())
    }

    /// Parse the xref section at `offset` and the trailer dictionary after it
    fn read_section(
        &mut self,
        offset: u64,
        section: &mut XRefTable,
        newest: bool,
    ) -> ParseResult<PdfTrailer> {
        self.lexer.seek(to_position(offset));
        xref::parse_section(&mut self.lexer, section, &mut self.diagnostics)?;

        if self.lexer.next_token()? != Token::DictStart {
            return Err(self
                .lexer
                .syntax_error("Expected \"<<\" starting trailer dictionary"));
        }
        let dict = container::read_dict(&mut self.lexer, &mut self.objects)?;

        if self.lexer.next_token()? != Token::StartXRef {
            let position = self.lexer.token_start();
            let message = "Expected \"startxref\" at end of xref table";
            if !newest {
                return Err(ParseError::InvalidXRef {
                    position,
                    message: message.to_string(),
                });
            }
            self.diagnostics.warn(Some(position), message);
        }

        Ok(PdfTrailer::from_dict(dict))
    }

    /// Load one indirect object if it has not been settled yet
    fn load_indirect(&mut self, key: ObjectKey) -> ParseResult<()> {
        if self.objects.is_settled(key) {
            return Ok(());
        }
        self.objects.find_indirect(key);

        let Some(offset) = self.xref.get(key) else {
            self.diagnostics.warn(
                None,
                format!("Did not find PDF object {} {}", key.number, key.generation),
            );
            self.objects.fail(key);
            return Ok(());
        };
        let offset = to_position(offset);

        self.lexer.seek(offset);
        let header = self.lexer.read_tokens(3).unwrap_or_default();
        let header_ok = matches!(
            header.as_slice(),
            [number, generation, Token::Obj]
                if number.as_unsigned() == Some(u64::from(key.number))
                    && generation.as_unsigned() == Some(u64::from(key.generation))
        );

        if !header_ok {
            let object_header = format!("{} {} obj", key.number, key.generation);
            match self.find_object_header(object_header.as_bytes()) {
                Some(found) => {
                    self.diagnostics.warn(
                        Some(found),
                        format!(
                            "Indirect object {object_header} found at incorrect offset {found} (expected offset {offset})"
                        ),
                    );
                    self.lexer.seek(found + object_header.len());
                }
                None => {
                    self.diagnostics.warn(
                        Some(offset),
                        format!("Expected indirect object '{object_header}'"),
                    );
                    self.objects.fail(key);
                    return Ok(());
                }
            }
        }

        let token = self.lexer.next_token()?;
        let mut value = if token == Token::EndObj {
            // Empty object: leave `endobj` for the check below
            self.lexer.rewind_to_token_start();
            PdfObject::Null
        } else {
            container::read_value(&mut self.lexer, &mut self.objects, token)?
        };
        value.set_indirect(key);
        let is_dict = value.as_dict().is_some();
        self.objects.store(key, value);
        tracing::trace!("Loaded object {} {}", key.number, key.generation);

        let token = self.lexer.next_token()?;
        if token != Token::EndObj {
            let start = self
                .streams
                .payload_start(&self.lexer, is_dict, &token, &mut self.diagnostics)?;
            let length = self.stream_length(key, start)?;
            let payload = self
                .streams
                .extract(&mut self.lexer, start, length, &mut self.diagnostics)?;
            if let Some(dict) = self.objects.value_mut(key).and_then(PdfObject::as_dict_mut) {
                dict.set_stream(payload);
            }
        }

        Ok(())
    }

    /// Search the whole file for a unique `N G obj` at the start of a line.
    /// Returns the offset of the header itself.
    fn find_object_header(&self, object_header: &[u8]) -> Option<usize> {
        let data = self.lexer.data();
        for line_end in [b'\n', b'\r'] {
            let mut needle = Vec::with_capacity(object_header.len() + 1);
            needle.push(line_end);
            needle.extend_from_slice(object_header);

            if let Some(found) = find_bytes(data, &needle, 0, data.len()) {
                if find_bytes(data, &needle, found + 1, data.len()).is_some() {
                    return None;
                }
                return Some(found + 1);
            }
        }
        None
    }

    /// The `/Length` of a stream object, loading it if it is indirect
    fn stream_length(&mut self, key: ObjectKey, start: usize) -> ParseResult<usize> {
        let declared = self
            .objects
            .value(key)
            .as_dict()
            .and_then(|dict| dict.get("Length"))
            .cloned();

        let length = match declared {
            Some(PdfObject::Integer(length)) => Some(length),
            Some(PdfObject::Reference(length_key)) => {
                self.load_indirect(length_key)?;
                self.objects.value(length_key).as_integer()
            }
            _ => None,
        };

        length
            .and_then(|length| usize::try_from(length).ok())
            .ok_or_else(|| ParseError::StreamError {
                position: start,
                message: format!(
                    "Invalid /Length for stream object {} {}",
                    key.number, key.generation
                ),
            })
    }

    /// Load every object referenced so far, and everything those reference,
    /// until no deferred keys remain. Calling it again is a no-op.
    pub fn read_all(&mut self) -> ParseResult<()> {
        while let Some(key) = self.objects.next_deferred() {
            self.load_indirect(key)?;
        }
        Ok(())
    }

    /// Load everything and decode every stream whose filters are supported.
    ///
    /// Decoded streams lose their `/Filter` entry and get a `/Length` that
    /// matches the new payload. Returns the number of streams decoded.
    pub fn decompress(&mut self) -> ParseResult<usize> {
        self.read_all()?;

        let mut decoded = 0;
        for key in self.objects.resolved_keys() {
            let Some(dict) = self.objects.value_mut(key).and_then(PdfObject::as_dict_mut) else {
                continue;
            };
            let Some(data) = dict.stream() else {
                continue;
            };
            if !dict.contains_key("Filter") {
                continue;
            }

            let supported = !dict.contains_key("DecodeParms")
                && filters::filter_chain(dict)
                    .map(|chain| chain.iter().all(filters::Filter::is_supported))
                    .unwrap_or(false);
            if !supported {
                tracing::debug!("Leaving stream {} encoded", key);
                continue;
            }

            match filters::decode_stream(data, dict) {
                Ok(bytes) => {
                    let length = i64::try_from(bytes.len()).unwrap_or(i64::MAX);
                    dict.set_stream(bytes);
                    dict.remove("Filter");
                    dict.insert("Length", PdfObject::Integer(length));
                    decoded += 1;
                }
                Err(e) => self.diagnostics.warn(
                    None,
                    format!(
                        "Could not decode stream of object {} {}: {e}",
                        key.number, key.generation
                    ),
                ),
            }
        }

        tracing::debug!("Decoded {} streams", decoded);
        Ok(decoded)
    }

    /// Resolve an indirect object, loading it on first use. Keys that cannot
    /// be loaded resolve to Null.
    pub fn resolve(&mut self, key: ObjectKey) -> ParseResult<&PdfObject> {
        self.load_indirect(key)?;
        Ok(self.objects.value(key))
    }

    /// Resolve a value that may be a reference
    pub fn resolve_value<'a>(&'a mut self, obj: &'a PdfObject) -> ParseResult<&'a PdfObject> {
        match obj {
            PdfObject::Reference(key) => self.resolve(*key),
            _ => Ok(obj),
        }
    }

    /// An already loaded object, without triggering a load
    pub fn get(&self, key: ObjectKey) -> Option<&PdfObject> {
        match self.objects.state(key) {
            Some(ObjectState::Resolved(value)) => Some(value),
            _ => None,
        }
    }

    /// Placeholder for `key`, registering it for deferred loading when new
    pub fn find_indirect(&mut self, key: ObjectKey) -> PdfObject {
        self.objects.find_indirect(key)
    }

    /// Get the document catalog
    pub fn catalog(&mut self) -> ParseResult<Option<&PdfDictionary>> {
        match self.trailer.root().cloned() {
            Some(PdfObject::Reference(key)) => Ok(self.resolve(key)?.as_dict()),
            Some(PdfObject::Dictionary(_)) => Ok(self.trailer.root().and_then(PdfObject::as_dict)),
            _ => Ok(None),
        }
    }

    pub fn trailer(&self) -> &PdfTrailer {
        &self.trailer
    }

    /// Get PDF version
    pub fn version(&self) -> PdfVersion {
        self.header.version
    }

    pub fn header(&self) -> &PdfHeader {
        &self.header
    }

    /// Get parsing options
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Everything recovered from so far, in order
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.items()
    }

    pub(crate) fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Number of page objects in the document
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Get a page dictionary by index (0-based)
    pub fn page(&self, index: usize) -> Option<&PdfDictionary> {
        self.pages.get(index).and_then(|entry| self.page_dict(entry))
    }

    /// Page dictionaries in document order
    pub fn pages(&self) -> impl Iterator<Item = &PdfDictionary> + '_ {
        self.pages.iter().filter_map(|entry| self.page_dict(entry))
    }

    /// The raw page list: a reference per indirect page
    pub fn page_entries(&self) -> &[PdfObject] {
        &self.pages
    }

    fn page_dict<'a>(&'a self, entry: &'a PdfObject) -> Option<&'a PdfDictionary> {
        match entry {
            PdfObject::Reference(key) => self.objects.value(*key).as_dict(),
            other => other.as_dict(),
        }
    }

    /// Number of keys still waiting to be loaded
    pub fn deferred_count(&self) -> usize {
        self.objects.deferred_count()
    }

    /// Number of indirect keys known to the object table
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of keys that loaded successfully
    pub fn resolved_count(&self) -> usize {
        self.objects.resolved_count()
    }

    /// Every key known to the object table, ascending
    pub fn object_keys(&self) -> Vec<ObjectKey> {
        self.objects.keys()
    }

    /// Byte offset the merged xref table records for `key`
    pub fn xref_offset(&self, key: ObjectKey) -> Option<u64> {
        self.xref.get(key)
    }

    /// Number of in-use entries across all xref sections
    pub fn xref_len(&self) -> usize {
        self.xref.len()
    }
}

fn to_position(offset: u64) -> usize {
    usize::try_from(offset).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::diagnostics::Severity;
    use crate::parser::test_helpers::PdfBuilder;

    fn simple_pdf() -> Vec<u8> {
        PdfBuilder::new()
            .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>")
            .object(3, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>")
            .object(4, "<< /Type /Page /Parent 2 0 R /Contents 5 0 R >>")
            .stream(5, "<< /Length 11 >>", b"BT (Hi) Tj ")
            .build("<< /Size 6 /Root 1 0 R >>")
    }

    #[test]
    fn test_load_simple_document() {
        let mut reader = PdfReader::from_bytes(simple_pdf()).unwrap();

        assert_eq!(reader.version(), PdfVersion::new(1, 4));
        assert_eq!(reader.page_count(), 2);
        assert_eq!(
            reader.page_entries(),
            &[
                PdfObject::Reference(ObjectKey::new(3, 0)),
                PdfObject::Reference(ObjectKey::new(4, 0))
            ]
        );
        assert_eq!(reader.page(0).unwrap().indirect(), Some(ObjectKey::new(3, 0)));
        assert!(reader.page(2).is_none());
        assert!(reader.diagnostics().is_empty());

        // The content stream is only referenced, not loaded yet
        assert!(reader.get(ObjectKey::new(5, 0)).is_none());
        assert_eq!(reader.deferred_count(), 1);

        let contents = reader.resolve(ObjectKey::new(5, 0)).unwrap();
        assert_eq!(contents.as_dict().unwrap().stream(), Some(&b"BT (Hi) Tj "[..]));
        assert_eq!(reader.deferred_count(), 0);
    }

    #[test]
    fn test_catalog_and_trailer() {
        let mut reader = PdfReader::from_bytes(simple_pdf()).unwrap();
        assert_eq!(reader.trailer().size(), Some(6));
        let catalog = reader.catalog().unwrap().unwrap();
        assert_eq!(catalog.get_type(), Some("Catalog"));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut reader = PdfReader::from_bytes(simple_pdf()).unwrap();
        let first = reader.resolve(ObjectKey::new(4, 0)).unwrap().clone();
        let second = reader.resolve(ObjectKey::new(4, 0)).unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_object_resolves_to_null() {
        let mut reader = PdfReader::from_bytes(simple_pdf()).unwrap();
        let key = ObjectKey::new(42, 0);

        assert!(reader.resolve(key).unwrap().is_null());
        assert!(reader.resolve(key).unwrap().is_null());

        let warnings: Vec<&Diagnostic> = reader
            .diagnostics()
            .iter()
            .filter(|d| d.message == "Did not find PDF object 42 0")
            .collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_read_all_is_repeatable() {
        let mut reader = PdfReader::from_bytes(simple_pdf()).unwrap();
        reader.read_all().unwrap();
        assert_eq!(reader.deferred_count(), 0);
        let resolved = reader.resolved_count();

        reader.read_all().unwrap();
        assert_eq!(reader.resolved_count(), resolved);
        assert_eq!(resolved, 5);
    }

    #[test]
    fn test_object_at_wrong_offset_is_found() {
        let mut pdf = PdfBuilder::new()
            .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
            .object(3, "(moved)");
        pdf.shift_offset(3, 5);
        let mut reader = PdfReader::from_bytes(pdf.build("<< /Size 4 /Root 1 0 R >>")).unwrap();

        let value = reader.resolve(ObjectKey::new(3, 0)).unwrap().clone();
        assert_eq!(value.as_string().unwrap().as_bytes(), b"moved");
        assert!(reader
            .diagnostics()
            .iter()
            .any(|d| d.message.starts_with("Indirect object 3 0 obj found at incorrect offset")));
    }

    #[test]
    fn test_empty_object_is_null() {
        let pdf = PdfBuilder::new()
            .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
            .object(3, "")
            .build("<< /Size 4 /Root 1 0 R >>");
        let mut reader = PdfReader::from_bytes(pdf).unwrap();
        assert!(reader.resolve(ObjectKey::new(3, 0)).unwrap().is_null());
        assert!(reader.get(ObjectKey::new(3, 0)).is_some());
    }

    #[test]
    fn test_indirect_length() {
        let pdf = PdfBuilder::new()
            .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
            .stream(3, "<< /Length 4 0 R >>", b"abcdef")
            .object(4, "6")
            .build("<< /Size 5 /Root 1 0 R >>");
        let mut reader = PdfReader::from_bytes(pdf).unwrap();

        let stream = reader.resolve(ObjectKey::new(3, 0)).unwrap().clone();
        assert_eq!(stream.as_dict().unwrap().stream(), Some(&b"abcdef"[..]));
        assert_eq!(reader.get(ObjectKey::new(4, 0)), Some(&PdfObject::Integer(6)));
    }

    #[test]
    fn test_negative_length_is_fatal() {
        let pdf = PdfBuilder::new()
            .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
            .stream(3, "<< /Length -1 >>", b"abc")
            .build("<< /Size 4 /Root 1 0 R >>");
        let mut reader = PdfReader::from_bytes_with_options(pdf, ParseOptions::lenient()).unwrap();
        assert!(matches!(
            reader.resolve(ObjectKey::new(3, 0)),
            Err(ParseError::StreamError { .. })
        ));
    }

    #[test]
    fn test_non_dictionary_followed_by_stream() {
        let pdf = PdfBuilder::new()
            .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
            .object(3, "[1 2]\nstream\nabc\nendstream")
            .build("<< /Size 4 /Root 1 0 R >>");
        let mut reader = PdfReader::from_bytes(pdf).unwrap();
        match reader.resolve(ObjectKey::new(3, 0)) {
            Err(ParseError::SyntaxError { message, .. }) => assert_eq!(message, "Expected 'endobj'"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_collect_warnings_off() {
        let options = ParseOptions {
            collect_warnings: false,
            ..ParseOptions::default()
        };
        let mut reader = PdfReader::from_bytes_with_options(simple_pdf(), options).unwrap();
        reader.resolve(ObjectKey::new(99, 0)).unwrap();
        assert!(reader.diagnostics().is_empty());
    }

    #[test]
    fn test_object_capacity_has_no_effect_on_result() {
        let options = ParseOptions::default().with_object_capacity(1024);
        let reader = PdfReader::from_bytes_with_options(simple_pdf(), options).unwrap();
        assert_eq!(reader.page_count(), 2);
    }
}
