use std::collections::{HashMap, HashSet};

use kdam::{BarExt, tqdm};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::{
    dataset::Dataset,
    doc_id::DocumentId,
    embedding::Embedder,
    error::Result,
    loader::load_file,
    store::{FileRecord, IndexedChunk, VectorStore},
    walker::{DiscoveredFile, discover_files},
};

/// What to do with an existing store before indexing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum IndexMode {
    /// Clear the store and index every file again.
    #[default]
    Rebuild,
    /// Only index new or modified files and drop deleted ones.
    Incremental,
    /// Use the store as it is when it already holds chunks.
    Skip,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOptions {
    pub mode: IndexMode,
    /// Draw a progress bar on stderr.
    pub progress: bool,
}

/// Counts from one indexing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Files whose chunks were (re)written.
    pub files: usize,
    pub chunks: usize,
    /// Files that could not be loaded.
    pub skipped: usize,
    /// Files dropped from the store because they no longer exist.
    pub removed: usize,
    /// Files left untouched because they did not change.
    pub unchanged: usize,
}

/// Files to (re)index and stored files to drop.
#[derive(Debug, Default)]
pub struct DiffResult {
    /// Files that are new (not in the store).
    pub new_files: Vec<DiscoveredFile>,
    /// Files that have changed (mtime differs).
    pub changed_files: Vec<DiscoveredFile>,
    /// Stored files no longer on disk.
    pub deleted: Vec<String>,
    pub unchanged: usize,
}

/// Compare discovered files against what the store recorded for them.
pub fn diff_files(
    known: &[(String, FileRecord)],
    discovered: &[DiscoveredFile],
) -> DiffResult {
    let known: HashMap<&str, u64> = known
        .iter()
        .map(|(name, record)| (name.as_str(), record.mtime))
        .collect();

    let mut result = DiffResult::default();
    let mut seen = HashSet::new();

    for file in discovered {
        let name = file.name();
        match known.get(name.as_str()) {
            None => result.new_files.push(file.clone()),
            Some(&mtime) if mtime != file.mtime => {
                result.changed_files.push(file.clone());
            }
            Some(_) => result.unchanged += 1,
        }
        seen.insert(name);
    }

    for name in known.keys() {
        if !seen.contains(*name) {
            result.deleted.push((*name).to_string());
        }
    }
    result.deleted.sort();

    result
}

/// Load, split and embed every file of a dataset into its store.
///
/// Files that cannot be read or parsed are skipped with a warning. Embedding
/// and storage failures abort the run.
pub fn index_dataset(
    dataset: &Dataset,
    store: &VectorStore,
    embedder: &mut dyn Embedder,
    options: IndexOptions,
) -> Result<IndexReport> {
    let root = dataset.require_documents_dir()?;
    let model_id = embedder.model_id();
    let mut report = IndexReport::default();

    let mut mode = options.mode;
    if mode == IndexMode::Skip {
        if store.chunk_count()? > 0 {
            info!(
                "reusing the existing store for dataset '{}'",
                dataset.name()
            );
            report.unchanged = store.files()?.len();
            return Ok(report);
        }
        mode = IndexMode::Rebuild;
    }

    if mode == IndexMode::Incremental
        && let Some(indexed) = store.embedding_model()?
        && indexed != model_id
    {
        info!("store was built with {indexed}, rebuilding with {model_id}");
        mode = IndexMode::Rebuild;
    }

    let discovered = discover_files(root)?;
    info!("found {} files in {}", discovered.len(), root.display());

    let to_index = match mode {
        IndexMode::Incremental => {
            let diff = diff_files(&store.files()?, &discovered);
            for name in &diff.deleted {
                store.remove_file(name)?;
            }
            report.removed = diff.deleted.len();
            report.unchanged = diff.unchanged;

            let mut files = diff.new_files;
            files.extend(diff.changed_files);
            files
        }
        IndexMode::Rebuild | IndexMode::Skip => {
            store.clear()?;
            discovered
        }
    };

    store.set_embedding_model(&model_id)?;

    // Parsing is CPU-bound and independent per file; embedding is not Send.
    let loaded: Vec<_> = to_index
        .par_iter()
        .map(|file| (file, load_file(&file.absolute_path)))
        .collect();

    let mut pb = tqdm!(
        total = loaded.len(),
        desc = "Indexing",
        unit = " files",
        disable = !options.progress
    );

    for (file, chunks) in loaded {
        let name = file.name();
        let chunks = match chunks {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!("skipping {name}: {e}");
                report.skipped += 1;
                let _ = pb.update(1);
                continue;
            }
        };

        let texts: Vec<String> =
            chunks.iter().map(|c| c.text().to_string()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed_documents(&texts)?
        };

        let doc_id = DocumentId::new(dataset.name(), &name);
        let entries: Vec<IndexedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (chunk, embedding))| IndexedChunk {
                key: doc_id.chunk_key(i),
                chunk,
                embedding,
            })
            .collect();

        report.files += 1;
        report.chunks += entries.len();
        store.add_file(&name, file.mtime, &entries)?;
        let _ = pb.update(1);
    }

    if options.progress {
        eprintln!();
    }
    info!(
        "indexed {} chunks from {} files into {}",
        report.chunks,
        report.files,
        dataset.store_dir().display()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::{error::Error, test_support::BagOfWords};

    fn make_file(name: &str, mtime: u64) -> DiscoveredFile {
        DiscoveredFile {
            relative_path: PathBuf::from(name),
            absolute_path: PathBuf::from(format!("/abs/{name}")),
            mtime,
        }
    }

    fn record(mtime: u64) -> FileRecord {
        FileRecord {
            mtime,
            chunk_keys: vec![],
        }
    }

    fn setup(files: &[(&str, &str)]) -> (tempfile::TempDir, Dataset) {
        let tmp = tempfile::tempdir().unwrap();
        let dataset = Dataset::new(
            "notes",
            &tmp.path().join("data"),
            &tmp.path().join("store"),
            &tmp.path().join("log"),
        )
        .unwrap();
        std::fs::create_dir_all(dataset.documents_dir()).unwrap();
        for (name, content) in files {
            write(dataset.documents_dir(), name, content);
        }
        (tmp, dataset)
    }

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    fn open_store(dataset: &Dataset) -> VectorStore {
        VectorStore::open(&dataset.store_path().unwrap()).unwrap()
    }

    fn options(mode: IndexMode) -> IndexOptions {
        IndexOptions {
            mode,
            progress: false,
        }
    }

    #[test]
    fn all_new_files() {
        let files = vec![make_file("a.md", 100), make_file("b.md", 200)];
        let diff = diff_files(&[], &files);

        assert_eq!(diff.new_files.len(), 2);
        assert!(diff.changed_files.is_empty());
        assert!(diff.deleted.is_empty());
    }

    #[test]
    fn unchanged_changed_and_deleted() {
        let known = vec![
            ("a.md".to_string(), record(100)),
            ("b.md".to_string(), record(100)),
            ("gone.md".to_string(), record(100)),
        ];
        let files = vec![make_file("a.md", 100), make_file("b.md", 200)];
        let diff = diff_files(&known, &files);

        assert!(diff.new_files.is_empty());
        assert_eq!(diff.changed_files.len(), 1);
        assert_eq!(diff.changed_files[0].name(), "b.md");
        assert_eq!(diff.deleted, vec!["gone.md".to_string()]);
        assert_eq!(diff.unchanged, 1);
    }

    #[test]
    fn rebuild_indexes_every_supported_file() {
        let (_tmp, dataset) = setup(&[
            ("soup.txt", "Slice the onions thinly."),
            ("notes.md", "# Notes\n\nStock matters."),
            ("image.png", "not really an image"),
        ]);
        let store = open_store(&dataset);
        let mut embedder = BagOfWords;

        let report = index_dataset(
            &dataset,
            &store,
            &mut embedder,
            options(IndexMode::Rebuild),
        )
        .unwrap();

        // The .png file is listed but yields no chunks.
        assert_eq!(report.files, 3);
        assert_eq!(report.chunks, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(store.chunk_count().unwrap(), 2);
        assert_eq!(
            store.embedding_model().unwrap().as_deref(),
            Some("test:bag-of-words")
        );
    }

    #[test]
    fn rebuild_does_not_duplicate_chunks() {
        let (_tmp, dataset) = setup(&[("soup.txt", "Slice the onions.")]);
        let store = open_store(&dataset);
        let mut embedder = BagOfWords;

        for _ in 0..2 {
            index_dataset(
                &dataset,
                &store,
                &mut embedder,
                options(IndexMode::Rebuild),
            )
            .unwrap();
        }
        assert_eq!(store.chunk_count().unwrap(), 1);
    }

    #[test]
    fn unreadable_files_are_skipped() {
        let (_tmp, dataset) = setup(&[("ok.txt", "fine")]);
        std::fs::write(dataset.documents_dir().join("broken.pdf"), b"nope")
            .unwrap();
        let store = open_store(&dataset);
        let mut embedder = BagOfWords;

        let report = index_dataset(
            &dataset,
            &store,
            &mut embedder,
            options(IndexMode::Rebuild),
        )
        .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.chunks, 1);
    }

    #[test]
    fn incremental_picks_up_changes() {
        let (_tmp, dataset) =
            setup(&[("a.txt", "alpha"), ("b.txt", "beta")]);
        let store = open_store(&dataset);
        let mut embedder = BagOfWords;

        index_dataset(
            &dataset,
            &store,
            &mut embedder,
            options(IndexMode::Incremental),
        )
        .unwrap();

        std::fs::remove_file(dataset.documents_dir().join("b.txt")).unwrap();
        write(dataset.documents_dir(), "c.txt", "gamma");

        let report = index_dataset(
            &dataset,
            &store,
            &mut embedder,
            options(IndexMode::Incremental),
        )
        .unwrap();

        assert_eq!(report.files, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(report.unchanged, 1);

        let mut texts: Vec<String> = store
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.chunk.text().to_string())
            .collect();
        texts.sort();
        assert_eq!(texts, vec!["alpha", "gamma"]);
    }

    #[test]
    fn incremental_rebuilds_after_a_model_change() {
        let (_tmp, dataset) =
            setup(&[("a.txt", "alpha"), ("b.txt", "beta"), ("c.txt", "gamma")]);
        let store = open_store(&dataset);
        let mut embedder = BagOfWords;

        index_dataset(
            &dataset,
            &store,
            &mut embedder,
            options(IndexMode::Incremental),
        )
        .unwrap();
        store.set_embedding_model("other:model").unwrap();

        let report = index_dataset(
            &dataset,
            &store,
            &mut embedder,
            options(IndexMode::Incremental),
        )
        .unwrap();

        assert_eq!(report.files, 3);
        assert_eq!(report.chunks, 3);
        assert_eq!(report.unchanged, 0);
        assert_eq!(report.removed, 0);
        assert_eq!(store.chunk_count().unwrap(), 3);
        assert_eq!(
            store.embedding_model().unwrap(),
            Some(embedder.model_id())
        );
    }

    #[test]
    fn skip_reuses_a_populated_store() {
        let (_tmp, dataset) = setup(&[("a.txt", "alpha")]);
        let store = open_store(&dataset);
        let mut embedder = BagOfWords;

        index_dataset(
            &dataset,
            &store,
            &mut embedder,
            options(IndexMode::Skip),
        )
        .unwrap();
        assert_eq!(store.chunk_count().unwrap(), 1);

        write(dataset.documents_dir(), "b.txt", "beta");
        let report = index_dataset(
            &dataset,
            &store,
            &mut embedder,
            options(IndexMode::Skip),
        )
        .unwrap();

        assert_eq!(report.files, 0);
        assert_eq!(store.chunk_count().unwrap(), 1);
    }

    #[test]
    fn missing_documents_folder_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dataset = Dataset::new(
            "ghost",
            &tmp.path().join("data"),
            &tmp.path().join("store"),
            &tmp.path().join("log"),
        )
        .unwrap();
        let store = open_store(&dataset);

        let err = index_dataset(
            &dataset,
            &store,
            &mut BagOfWords,
            IndexOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
