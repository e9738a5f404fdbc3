//! Shared helpers for the integration tests: an in-memory PDF writer that
//! records the real offset of every object it emits.

#![allow(dead_code)]

use pdfload::{ParseOptions, PdfReader};

pub struct PdfBuilder {
    data: Vec<u8>,
    pending: Vec<(u32, u16, usize)>,
    sections: Vec<usize>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::with_header("%PDF-1.7\n%\u{e2}\u{e3}\n")
    }

    pub fn with_header(header: &str) -> Self {
        Self {
            data: header.as_bytes().to_vec(),
            pending: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn object(self, number: u32, body: &str) -> Self {
        self.object_gen(number, 0, body)
    }

    pub fn object_gen(mut self, number: u32, generation: u16, body: &str) -> Self {
        self.pending.push((number, generation, self.data.len()));
        self.data
            .extend_from_slice(format!("{number} {generation} obj\n{body}\nendobj\n").as_bytes());
        self
    }

    /// A stream object; `line_end` is written between `stream` and the payload
    pub fn stream_with(mut self, number: u32, dict: &str, line_end: &str, payload: &[u8]) -> Self {
        self.pending.push((number, 0, self.data.len()));
        self.data
            .extend_from_slice(format!("{number} 0 obj\n{dict}\nstream{line_end}").as_bytes());
        self.data.extend_from_slice(payload);
        self.data.extend_from_slice(b"\nendstream\nendobj\n");
        self
    }

    pub fn stream(self, number: u32, dict: &str, payload: &[u8]) -> Self {
        self.stream_with(number, dict, "\n", payload)
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    /// Hand out the recorded object offsets, for tests writing their own xref
    pub fn take_offsets(&mut self) -> Vec<(u32, u16, usize)> {
        self.pending.drain(..).collect()
    }

    pub fn offset(&self) -> usize {
        self.data.len()
    }

    /// Write an xref section for the objects added since the last one
    pub fn end_section(mut self, trailer: &str) -> Self {
        let xref_start = self.data.len();
        let mut xref = String::from("xref\n");
        if self.sections.is_empty() {
            xref.push_str("0 1\n0000000000 65535 f \n");
        }
        for (number, generation, offset) in self.pending.drain(..) {
            xref.push_str(&format!("{number} 1\n{offset:010} {generation:05} n \n"));
        }
        xref.push_str(&format!("trailer\n{trailer}\nstartxref\n{xref_start}\n%%EOF\n"));

        self.data.extend_from_slice(xref.as_bytes());
        self.sections.push(xref_start);
        self
    }

    pub fn last_xref(&self) -> usize {
        self.sections.last().copied().unwrap_or_default()
    }

    pub fn build(self, trailer: &str) -> Vec<u8> {
        self.end_section(trailer).into_bytes()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Catalog (1) and a page tree root (2) holding the given kids
pub fn with_pages(kids: &str) -> PdfBuilder {
    PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, &format!("<< /Type /Pages /Kids [{kids}] >>"))
}

pub fn load(data: Vec<u8>) -> PdfReader {
    PdfReader::from_bytes(data).expect("PDF should load")
}

pub fn load_strict(data: Vec<u8>) -> PdfReader {
    PdfReader::from_bytes_with_options(data, ParseOptions::strict()).expect("PDF should load")
}

pub fn messages(reader: &PdfReader) -> Vec<String> {
    reader
        .diagnostics()
        .iter()
        .map(|d| d.message.clone())
        .collect()
}
