use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

/// A stable identifier for a source file, derived from
/// (dataset name, path relative to the documents folder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(pub u64);

impl DocumentId {
    pub fn new(dataset: &str, relative_path: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        dataset.hash(&mut hasher);
        relative_path.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Store key of the `chunk_index`-th chunk of this document.
    ///
    /// Hash of `(id, chunk_index)`, so every index gets its own key.
    pub fn chunk_key(self, chunk_index: usize) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.0.hash(&mut hasher);
        (chunk_index as u64).hash(&mut hasher);
        hasher.finish()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", &format!("{:016x}", self.0)[..6])
    }
}
