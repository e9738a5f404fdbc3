//! PDF Trailer
//!
//! Accessors over the adopted trailer dictionary according to ISO 32000-1
//! Section 7.5.5. For incrementally updated files this is the newest trailer,
//! with its `/Prev` link removed once the chain has been walked.

use super::objects::{ObjectKey, PdfDictionary, PdfObject};

/// PDF Trailer information
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfTrailer {
    dict: PdfDictionary,
}

impl PdfTrailer {
    pub fn from_dict(dict: PdfDictionary) -> Self {
        Self { dict }
    }

    /// Byte offset of the previous xref section, if the trailer links one
    pub fn prev(&self) -> Option<u64> {
        self.dict
            .get("Prev")
            .and_then(|obj| obj.as_integer())
            .and_then(|i| u64::try_from(i).ok())
    }

    /// Drop the `/Prev` link, returning it
    pub fn take_prev(&mut self) -> Option<PdfObject> {
        self.dict.remove("Prev")
    }

    /// Number of entries declared for the xref table
    pub fn size(&self) -> Option<u32> {
        self.dict
            .get("Size")
            .and_then(|obj| obj.as_integer())
            .and_then(|i| u32::try_from(i).ok())
    }

    /// The `/Root` entry (document catalog), usually a reference
    pub fn root(&self) -> Option<&PdfObject> {
        self.dict.get("Root")
    }

    /// The document information dictionary reference
    pub fn info(&self) -> Option<ObjectKey> {
        self.dict.get("Info").and_then(|obj| obj.as_reference())
    }

    /// Get the ID array (file identifiers)
    pub fn id(&self) -> Option<&PdfObject> {
        self.dict.get("ID")
    }

    /// Check if this PDF is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.dict.contains_key("Encrypt")
    }

    /// Get access to the trailer dictionary
    pub fn dict(&self) -> &PdfDictionary {
        &self.dict
    }
}
