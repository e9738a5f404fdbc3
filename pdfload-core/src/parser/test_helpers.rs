//! Helper for creating test PDFs with correct xref offsets

/// Builds a PDF body object by object and writes xref sections whose
/// offsets match what was written.
pub struct PdfBuilder {
    data: Vec<u8>,
    pending: Vec<(u32, u16, usize)>,
    sections: Vec<usize>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::with_header("%PDF-1.4\n")
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

    pub fn stream(mut self, number: u32, dict: &str, payload: &[u8]) -> Self {
        self.pending.push((number, 0, self.data.len()));
        self.data
            .extend_from_slice(format!("{number} 0 obj\n{dict}\nstream\n").as_bytes());
        self.data.extend_from_slice(payload);
        self.data.extend_from_slice(b"\nendstream\nendobj\n");
        self
    }

    /// Append bytes that are not an indexed object
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    /// Make the xref entry of `number` point `delta` bytes past the object
    pub fn shift_offset(&mut self, number: u32, delta: usize) {
        for entry in self.pending.iter_mut().filter(|entry| entry.0 == number) {
            entry.2 += delta;
        }
    }

    /// Write an xref section for the objects added since the last one,
    /// followed by `trailer` and a footer
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

    /// Offset of the most recent xref section
    pub fn last_xref(&self) -> Option<usize> {
        self.sections.last().copied()
    }

    pub fn build(self, trailer: &str) -> Vec<u8> {
        self.end_section(trailer).into_bytes()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Creates a minimal valid PDF with an empty page tree
pub fn create_minimal_pdf() -> Vec<u8> {
    PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
        .build("<< /Size 3 /Root 1 0 R >>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_pdf_structure() {
        let pdf = create_minimal_pdf();
        assert!(pdf.starts_with(b"%PDF-1.4\n"));
        assert!(pdf.ends_with(b"%%EOF\n"));

        let text = String::from_utf8_lossy(&pdf);
        assert!(text.contains("1 1\n0000000009 00000 n \n"));
        assert!(text.contains("startxref"));
    }

    #[test]
    fn test_sections_are_recorded() {
        let builder = PdfBuilder::new()
            .object(1, "null")
            .end_section("<< /Size 2 >>");
        let first = builder.last_xref().unwrap();
        let builder = builder.object(2, "null").end_section("<< /Size 3 >>");
        assert!(builder.last_xref().unwrap() > first);
    }
}
