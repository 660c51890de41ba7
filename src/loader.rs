//! Turning source files into text chunks.
//!
//! The file extension selects a [`LoaderSpec`]: how to extract text from the
//! file and, optionally, how to split that text. Unsupported extensions are
//! not an error; they produce no chunks and a warning.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    chunking::{SplitterConfig, split_text},
    error::{Error, Result},
};

/// A bounded span of text from a source file.
///
/// Chunks are immutable; the relevance score is attached by retrieval via
/// [`DocumentChunk::with_score`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    text: String,
    source_path: String,
    chunk_index: usize,
    #[serde(skip)]
    score: Option<f32>,
}

impl DocumentChunk {
    pub fn new(text: String, source_path: String, chunk_index: usize) -> Self {
        Self {
            text,
            source_path,
            chunk_index,
            score: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Path of the file this chunk was read from.
    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    /// Position of the chunk within its file (the page number, zero-based,
    /// for PDFs).
    pub fn chunk_index(&self) -> usize {
        self.chunk_index
    }

    /// Relevance score, present only on retrieval results.
    pub fn score(&self) -> Option<f32> {
        self.score
    }

    pub fn with_score(self, score: f32) -> Self {
        Self {
            score: Some(score),
            ..self
        }
    }
}

/// How text is extracted from a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderKind {
    /// UTF-8 text (plain text, LaTeX, Markdown).
    Text,
    /// Word document body text.
    Docx,
    /// One chunk per PDF page.
    Pdf,
}

/// Loader selected for an extension, with the splitter applied to its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderSpec {
    pub kind: LoaderKind,
    pub splitter: Option<SplitterConfig>,
}

const PLAIN_TEXT: LoaderSpec = LoaderSpec {
    kind: LoaderKind::Text,
    splitter: Some(SplitterConfig::new(1000, 500)),
};

const MARKDOWN: LoaderSpec = LoaderSpec {
    kind: LoaderKind::Text,
    splitter: Some(SplitterConfig::new(1000, 200)),
};

const WORD: LoaderSpec = LoaderSpec {
    kind: LoaderKind::Docx,
    splitter: Some(SplitterConfig::new(1000, 200)),
};

const PDF: LoaderSpec = LoaderSpec {
    kind: LoaderKind::Pdf,
    splitter: None,
};

/// Lower-case extension -> loader.
const REGISTRY: &[(&str, LoaderSpec)] = &[
    ("txt", PLAIN_TEXT),
    ("tex", PLAIN_TEXT),
    ("md", MARKDOWN),
    ("docx", WORD),
    ("pdf", PDF),
];

/// Look up the loader for a file by its (case-insensitive) extension.
pub fn loader_for(path: &Path) -> Option<LoaderSpec> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    REGISTRY
        .iter()
        .find(|(registered, _)| *registered == ext)
        .map(|(_, spec)| *spec)
}

/// Read a file and split it into chunks tagged with its path.
///
/// Returns an empty list (and logs a warning) when the extension is not
/// supported. Files that cannot be read or decoded are an
/// [`Error::Load`].
pub fn load_file(path: &Path) -> Result<Vec<DocumentChunk>> {
    let Some(spec) = loader_for(path) else {
        warn!("the file type of {} is not supported", path.display());
        return Ok(Vec::new());
    };

    let source = path.display().to_string();
    let sections = match spec.kind {
        LoaderKind::Text => vec![read_text(path)?],
        LoaderKind::Docx => vec![read_docx(path)?],
        LoaderKind::Pdf => read_pdf_pages(path)?,
    };

    let chunks: Vec<DocumentChunk> = match spec.splitter {
        Some(config) => sections
            .iter()
            .flat_map(|section| split_text(section, config))
            .enumerate()
            .map(|(i, piece)| DocumentChunk::new(piece, source.clone(), i))
            .collect(),
        // Unsplit sections keep their position (the page, for PDFs).
        None => sections
            .into_iter()
            .enumerate()
            .filter(|(_, section)| !section.trim().is_empty())
            .map(|(i, section)| {
                let text = section.trim().to_string();
                DocumentChunk::new(text, source.clone(), i)
            })
            .collect(),
    };

    debug!("loaded {} chunk(s) from {source}", chunks.len());
    Ok(chunks)
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::load(path, e))
}

fn read_pdf_pages(path: &Path) -> Result<Vec<String>> {
    let document =
        lopdf::Document::load(path).map_err(|e| Error::load(path, e))?;

    let pages = document
        .get_pages()
        .into_keys()
        .map(|page_number| {
            document.extract_text(&[page_number]).unwrap_or_else(|e| {
                debug!(
                    "no text extracted from page {page_number} of {}: {e}",
                    path.display()
                );
                String::new()
            })
        })
        .collect();

    Ok(pages)
}

fn read_docx(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| Error::load(path, e))?;
    let docx = docx_rs::read_docx(&bytes).map_err(|e| Error::load(path, e))?;

    let mut text = String::new();
    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(paragraph) => {
                push_paragraph(&mut text, paragraph);
            }
            docx_rs::DocumentChild::Table(table) => {
                push_table(&mut text, table);
            }
            _ => {}
        }
    }

    Ok(text)
}

/// Paragraph text followed by a newline; hyperlinked runs included.
fn push_paragraph(out: &mut String, paragraph: &docx_rs::Paragraph) {
    push_runs(out, &paragraph.children);
    out.push('\n');
}

fn push_runs(out: &mut String, children: &[docx_rs::ParagraphChild]) {
    for child in children {
        match child {
            docx_rs::ParagraphChild::Run(run) => {
                for child in &run.children {
                    if let docx_rs::RunChild::Text(t) = child {
                        out.push_str(&t.text);
                    }
                }
            }
            docx_rs::ParagraphChild::Hyperlink(link) => {
                push_runs(out, &link.children);
            }
            _ => {}
        }
    }
}

/// Cell paragraphs in row order, recursing into nested tables.
fn push_table(out: &mut String, table: &docx_rs::Table) {
    for docx_rs::TableChild::TableRow(row) in &table.rows {
        for docx_rs::TableRowChild::TableCell(cell) in &row.cells {
            for content in &cell.children {
                match content {
                    docx_rs::TableCellContent::Paragraph(paragraph) => {
                        push_paragraph(out, paragraph);
                    }
                    docx_rs::TableCellContent::Table(nested) => {
                        push_table(out, nested);
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup_is_case_insensitive() {
        assert_eq!(loader_for(Path::new("a.TXT")), Some(PLAIN_TEXT));
        assert_eq!(loader_for(Path::new("thesis.tex")), Some(PLAIN_TEXT));
        assert_eq!(loader_for(Path::new("notes.Md")), Some(MARKDOWN));
        assert_eq!(loader_for(Path::new("cv.docx")), Some(WORD));
        assert_eq!(loader_for(Path::new("paper.pdf")), Some(PDF));
        assert_eq!(loader_for(Path::new("image.png")), None);
        assert_eq!(loader_for(Path::new("Makefile")), None);
    }

    #[test]
    fn unsupported_extension_yields_no_chunks() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("photo.jpg");
        std::fs::write(&path, "not really a jpeg").unwrap();

        assert!(load_file(&path).unwrap().is_empty());
    }

    #[test]
    fn unsupported_missing_file_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_file(&tmp.path().join("gone.xyz")).unwrap().is_empty());
    }

    #[test]
    fn text_like_files_carry_their_source() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.tex", "c.md"] {
            let path = tmp.path().join(name);
            std::fs::write(&path, "French onion soup recipe").unwrap();

            let chunks = load_file(&path).unwrap();
            assert_eq!(chunks.len(), 1);
            assert_eq!(chunks[0].text(), "French onion soup recipe");
            assert_eq!(chunks[0].source_path(), path.display().to_string());
            assert_eq!(chunks[0].chunk_index(), 0);
            assert_eq!(chunks[0].score(), None);
        }
    }

    #[test]
    fn long_text_is_split_with_sequential_indices() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("long.txt");
        std::fs::write(&path, "lorem ipsum dolor ".repeat(300)).unwrap();

        let chunks = load_file(&path).unwrap();
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index(), i);
            assert!(chunk.text().chars().count() <= 1000);
        }
    }

    #[test]
    fn loading_is_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("notes.md");
        std::fs::write(&path, "# Soup\n\nChop onions.\n".repeat(120)).unwrap();

        assert_eq!(load_file(&path).unwrap(), load_file(&path).unwrap());
    }

    #[test]
    fn invalid_utf8_is_a_load_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        assert!(matches!(load_file(&path), Err(Error::Load { .. })));
    }

    #[test]
    fn corrupt_pdf_is_a_load_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.pdf");
        std::fs::write(&path, "definitely not a pdf").unwrap();

        assert!(matches!(load_file(&path), Err(Error::Load { .. })));
    }

    #[test]
    fn docx_paragraphs_are_extracted() {
        use docx_rs::{Docx, Paragraph, Run};

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("recipe.docx");
        let file = std::fs::File::create(&path).unwrap();
        Docx::new()
            .add_paragraph(
                Paragraph::new().add_run(Run::new().add_text("Slice onions.")),
            )
            .add_paragraph(
                Paragraph::new().add_run(Run::new().add_text("Add stock.")),
            )
            .build()
            .pack(file)
            .unwrap();

        let chunks = load_file(&path).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text(), "Slice onions.\nAdd stock.");
        assert_eq!(chunks[0].source_path(), path.display().to_string());
    }

    #[test]
    fn docx_tables_and_links_are_extracted() {
        use docx_rs::{
            Docx,
            Hyperlink,
            HyperlinkType,
            Paragraph,
            Run,
            Table,
            TableCell,
            TableRow,
        };

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("menu.docx");
        let file = std::fs::File::create(&path).unwrap();
        let link =
            Hyperlink::new("https://example.com", HyperlinkType::External)
                .add_run(Run::new().add_text("Onion guide"));
        let cell = |text: &str| {
            let run = Run::new().add_text(text);
            TableCell::new().add_paragraph(Paragraph::new().add_run(run))
        };
        Docx::new()
            .add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text("See "))
                    .add_hyperlink(link),
            )
            .add_table(Table::new(vec![TableRow::new(vec![
                cell("Soup"),
                cell("Caramelised onions"),
            ])]))
            .build()
            .pack(file)
            .unwrap();

        let chunks = load_file(&path).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].text(),
            "See Onion guide\nSoup\nCaramelised onions"
        );
    }

    #[test]
    fn docx_with_only_a_table_is_not_empty() {
        use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("table.docx");
        let file = std::fs::File::create(&path).unwrap();
        Docx::new()
            .add_table(Table::new(vec![TableRow::new(vec![
                TableCell::new().add_paragraph(
                    Paragraph::new().add_run(Run::new().add_text("Stock")),
                ),
            ])]))
            .build()
            .pack(file)
            .unwrap();

        let chunks = load_file(&path).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text(), "Stock");
    }

    #[test]
    fn pdf_pages_become_chunks() {
        use lopdf::{
            Document,
            Object,
            Stream,
            content::{Content, Operation},
            dictionary,
        };

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal("Hello onion soup")],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("soup.pdf");
        doc.save(&path).unwrap();

        let chunks = load_file(&path).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text().contains("Hello onion soup"));
        assert_eq!(chunks[0].chunk_index(), 0);
        assert_eq!(chunks[0].source_path(), path.display().to_string());
    }

    #[test]
    fn with_score_keeps_content() {
        let chunk = DocumentChunk::new("text".into(), "a.txt".into(), 3);
        let scored = chunk.clone().with_score(0.5);

        assert_eq!(scored.score(), Some(0.5));
        assert_eq!(scored.text(), chunk.text());
        assert_eq!(scored.chunk_index(), 3);
    }
}
