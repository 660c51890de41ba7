use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_DOCUMENTS_FOLDER: &str = "data";
pub const DEFAULT_LOG_FOLDER: &str = "log";
pub const DEFAULT_STORE_FOLDER: &str = "local_vectorstore";

const STORE_FILE: &str = "index.redb";

/// A named document collection and the folders derived from its name.
///
/// Every dataset owns `{documents}/{name}` (its source files),
/// `{store}/{name}` (its vector store) and `{log}/{name}` (its query logs).
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    documents_dir: PathBuf,
    store_dir: PathBuf,
    log_dir: PathBuf,
}

impl Dataset {
    pub fn new(
        name: &str,
        documents_root: &Path,
        store_root: &Path,
        log_root: &Path,
    ) -> Result<Self> {
        if name.is_empty()
            || name.contains(['/', '\\'])
            || name == "."
            || name == ".."
        {
            return Err(Error::Config(format!(
                "invalid dataset name: '{name}'"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            documents_dir: documents_root.join(name),
            store_dir: store_root.join(name),
            log_dir: log_root.join(name),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn documents_dir(&self) -> &Path {
        &self.documents_dir
    }

    /// The documents folder, failing if it does not exist.
    pub fn require_documents_dir(&self) -> Result<&Path> {
        if !self.documents_dir.is_dir() {
            return Err(Error::NotFound {
                kind: "documents folder",
                name: self.documents_dir.display().to_string(),
            });
        }
        Ok(&self.documents_dir)
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Path of the store database, creating its folder if needed.
    pub fn store_path(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.store_dir)?;
        Ok(self.store_dir.join(STORE_FILE))
    }

    /// Path of the store database if this dataset was ever indexed.
    /// Creates nothing.
    pub fn existing_store_path(&self) -> Option<PathBuf> {
        let path = self.store_dir.join(STORE_FILE);
        path.is_file().then_some(path)
    }
}
