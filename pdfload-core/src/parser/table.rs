//! Indirect object table
//!
//! Registry of every indirect key the loader has seen. A key enters the table
//! as `Unresolved` the first time a reference to it is parsed and stays in the
//! deferred set until it is either loaded or given up on.

use super::objects::{ObjectKey, PdfObject};
use std::collections::{BTreeSet, HashMap};

/// Shared sentinel for keys that could not be loaded
pub static NULL_OBJECT: PdfObject = PdfObject::Null;

/// Load state of one indirect object
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectState {
    Unresolved,
    Resolved(PdfObject),
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectTable {
    entries: HashMap<ObjectKey, ObjectState>,
    deferred: BTreeSet<ObjectKey>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            deferred: BTreeSet::new(),
        }
    }

    /// Placeholder for `key`, registering it as deferred on first sight
    pub fn find_indirect(&mut self, key: ObjectKey) -> PdfObject {
        if !self.entries.contains_key(&key) {
            self.entries.insert(key, ObjectState::Unresolved);
            self.deferred.insert(key);
        }
        PdfObject::Reference(key)
    }

    pub fn state(&self, key: ObjectKey) -> Option<&ObjectState> {
        self.entries.get(&key)
    }

    /// True once the key is Resolved or Failed
    pub fn is_settled(&self, key: ObjectKey) -> bool {
        matches!(
            self.entries.get(&key),
            Some(ObjectState::Resolved(_) | ObjectState::Failed)
        )
    }

    pub fn store(&mut self, key: ObjectKey, value: PdfObject) {
        self.entries.insert(key, ObjectState::Resolved(value));
        self.deferred.remove(&key);
    }

    pub fn fail(&mut self, key: ObjectKey) {
        self.entries.insert(key, ObjectState::Failed);
        self.deferred.remove(&key);
    }

    /// Value of a settled key. Failed and unknown keys read as Null.
    pub fn value(&self, key: ObjectKey) -> &PdfObject {
        match self.entries.get(&key) {
            Some(ObjectState::Resolved(value)) => value,
            _ => &NULL_OBJECT,
        }
    }

    pub fn value_mut(&mut self, key: ObjectKey) -> Option<&mut PdfObject> {
        match self.entries.get_mut(&key) {
            Some(ObjectState::Resolved(value)) => Some(value),
            _ => None,
        }
    }

    /// Lowest deferred key, if any remain
    pub fn next_deferred(&self) -> Option<ObjectKey> {
        self.deferred.iter().next().copied()
    }

    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolved_count(&self) -> usize {
        self.entries
            .values()
            .filter(|state| matches!(state, ObjectState::Resolved(_)))
            .count()
    }

    /// Every key in ascending order
    pub fn keys(&self) -> Vec<ObjectKey> {
        let mut keys: Vec<ObjectKey> = self.entries.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn resolved_keys(&self) -> Vec<ObjectKey> {
        let mut keys: Vec<ObjectKey> = self
            .entries
            .iter()
            .filter(|(_, state)| matches!(state, ObjectState::Resolved(_)))
            .map(|(key, _)| *key)
            .collect();
        keys.sort();
        keys
    }
}
