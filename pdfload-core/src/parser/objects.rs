//! PDF Object Model
//!
//! Value types produced by the loader (ISO 32000-1 Section 7.3). Indirect
//! references are plain keys; the [`PdfReader`](super::PdfReader) owns the
//! table that maps them to values.

use indexmap::IndexMap;
use std::fmt;

/// Identity of an indirect object: (object number, generation number)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub number: u32,
    pub generation: u16,
}

impl ObjectKey {
    pub fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }

    /// Build a key from raw token values, rejecting out-of-range numbers
    pub fn from_parts(number: u64, generation: u64) -> Option<Self> {
        Some(Self {
            number: u32::try_from(number).ok()?,
            generation: u16::try_from(generation).ok()?,
        })
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// PDF Name object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PdfName(pub String);

impl PdfName {
    pub fn new(name: impl Into<String>) -> Self {
        PdfName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PdfName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

/// PDF String object
#[derive(Debug, Clone, PartialEq)]
pub struct PdfString(pub Vec<u8>);

impl PdfString {
    pub fn new(data: Vec<u8>) -> Self {
        PdfString(data)
    }

    /// Get as UTF-8 string if possible
    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// PDF Array object
#[derive(Debug, Clone, Default)]
pub struct PdfArray {
    items: Vec<PdfObject>,
    indirect: Option<ObjectKey>,
}

impl PdfArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PdfObject> {
        self.items.get(index)
    }

    pub fn push(&mut self, obj: PdfObject) {
        self.items.push(obj);
    }

    pub fn pop(&mut self) -> Option<PdfObject> {
        self.items.pop()
    }

    pub fn last(&self) -> Option<&PdfObject> {
        self.items.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PdfObject> {
        self.items.iter()
    }

    /// Key of the indirect object this array was loaded as, if any
    pub fn indirect(&self) -> Option<ObjectKey> {
        self.indirect
    }
}

impl From<Vec<PdfObject>> for PdfArray {
    fn from(items: Vec<PdfObject>) -> Self {
        Self {
            items,
            indirect: None,
        }
    }
}

impl<'a> IntoIterator for &'a PdfArray {
    type Item = &'a PdfObject;
    type IntoIter = std::slice::Iter<'a, PdfObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// The identity slot is bookkeeping, not content
impl PartialEq for PdfArray {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

/// PDF Dictionary object.
///
/// Entries keep their file order. Besides the entries a dictionary has two
/// slots that never appear in the file syntax: the key it was loaded under
/// and, for stream objects, the raw (still encoded) payload.
#[derive(Debug, Clone, Default)]
pub struct PdfDictionary {
    entries: IndexMap<PdfName, PdfObject>,
    indirect: Option<ObjectKey>,
    stream: Option<Vec<u8>>,
}

impl PdfDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut PdfObject> {
        self.entries.get_mut(key)
    }

    /// Insert a key-value pair; a repeated key keeps its original position
    pub fn insert(&mut self, key: impl Into<String>, value: PdfObject) {
        self.entries.insert(PdfName(key.into()), value);
    }

    /// Remove a key, keeping the order of the remaining entries
    pub fn remove(&mut self, key: &str) -> Option<PdfObject> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, PdfName, PdfObject> {
        self.entries.iter()
    }

    /// Get the dictionary type (value of /Type key)
    pub fn get_type(&self) -> Option<&str> {
        self.get("Type").and_then(|obj| obj.as_name()).map(|n| n.as_str())
    }

    /// Key of the indirect object this dictionary was loaded as, if any
    pub fn indirect(&self) -> Option<ObjectKey> {
        self.indirect
    }

    /// Raw stream payload, for stream objects
    pub fn stream(&self) -> Option<&[u8]> {
        self.stream.as_deref()
    }

    pub fn is_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn set_stream(&mut self, data: Vec<u8>) {
        self.stream = Some(data);
    }
}

impl PartialEq for PdfDictionary {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries && self.stream == other.stream
    }
}

// `IndexMap` lookups by `&str` need the name to borrow as one
impl std::borrow::Borrow<str> for PdfName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// PDF Object types
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PdfObject {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(PdfString),
    Name(PdfName),
    Array(PdfArray),
    Dictionary(PdfDictionary),
    /// Placeholder for an indirect object; resolve it through the reader
    Reference(ObjectKey),
}

impl PdfObject {
    pub fn is_null(&self) -> bool {
        matches!(self, PdfObject::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PdfObject::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PdfObject::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            PdfObject::Real(r) => Some(*r),
            PdfObject::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&PdfString> {
        match self {
            PdfObject::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&PdfName> {
        match self {
            PdfObject::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&PdfArray> {
        match self {
            PdfObject::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&PdfDictionary> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut PdfDictionary> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectKey> {
        match self {
            PdfObject::Reference(key) => Some(*key),
            _ => None,
        }
    }

    /// Short name of the value's kind, for listings and messages
    pub fn kind(&self) -> &'static str {
        match self {
            PdfObject::Null => "null",
            PdfObject::Boolean(_) => "boolean",
            PdfObject::Integer(_) => "integer",
            PdfObject::Real(_) => "real",
            PdfObject::String(_) => "string",
            PdfObject::Name(_) => "name",
            PdfObject::Array(_) => "array",
            PdfObject::Dictionary(d) if d.is_stream() => "stream",
            PdfObject::Dictionary(_) => "dictionary",
            PdfObject::Reference(_) => "reference",
        }
    }

    /// Tag a container with the key it was loaded under. Scalars have no slot;
    /// their identity lives in the object table only.
    pub(crate) fn set_indirect(&mut self, key: ObjectKey) {
        match self {
            PdfObject::Dictionary(d) => d.indirect = Some(key),
            PdfObject::Array(a) => a.indirect = Some(key),
            _ => {}
        }
    }
}
