//! Source document loading.
//!
//! PDFs are read page by page with `lopdf` so callers can ask for a bounded
//! window of pages (summaries only look at the opening pages). Plain-text
//! exports are read whole. Every path returns whitespace-normalized text.

use std::fs;
use std::ops::Range;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::IngestionError;
use crate::types::Document;

/// Pages read for a summary when the caller does not say otherwise.
pub const DEFAULT_SUMMARY_PAGES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    PlainText,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("pdf") {
            Some(Self::Pdf)
        } else if ["txt", "text", "md"].iter().any(|e| ext.eq_ignore_ascii_case(e)) {
            Some(Self::PlainText)
        } else {
            None
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self { Self }

    /// Load the whole document at `path`.
    pub fn load(&self, path: &Path) -> Result<Document, IngestionError> {
        let text = match source_kind(path)? {
            SourceKind::Pdf => read_pdf(path, None)?,
            SourceKind::PlainText => normalize_whitespace(&read_text(path)?),
        };
        if text.is_empty() {
            return Err(IngestionError::Empty { path: path.to_path_buf() });
        }
        debug!(path = %path.display(), chars = text.chars().count(), "loaded document");
        Ok(Document::new(path, text))
    }

    /// Normalized text of pages `start_page..start_page + num_pages` (zero-based).
    ///
    /// Pages past the end of the document are skipped. A plain-text source is a
    /// single page.
    pub fn load_pages(&self, path: &Path, start_page: usize, num_pages: usize) -> Result<String, IngestionError> {
        let text = match source_kind(path)? {
            SourceKind::Pdf => read_pdf(path, Some((start_page, num_pages)))?,
            SourceKind::PlainText => {
                let raw = read_text(path)?;
                if page_window(1, start_page, num_pages).is_empty() { String::new() } else { normalize_whitespace(&raw) }
            }
        };
        if text.is_empty() {
            return Err(IngestionError::Empty { path: path.to_path_buf() });
        }
        Ok(text)
    }
}

/// Collapse every whitespace run (newlines included) into one space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The zero-based page indices to read, clamped to `total_pages`.
pub fn page_window(total_pages: usize, start_page: usize, num_pages: usize) -> Range<usize> {
    let start = start_page.min(total_pages);
    let end = start_page.saturating_add(num_pages).min(total_pages);
    start..end
}

fn source_kind(path: &Path) -> Result<SourceKind, IngestionError> {
    SourceKind::from_path(path).ok_or_else(|| IngestionError::Unsupported { path: path.to_path_buf() })
}

fn read_text(path: &Path) -> Result<String, IngestionError> {
    let bytes = fs::read(path).map_err(|source| IngestionError::Unreadable { path: path.to_path_buf(), source })?;
    match String::from_utf8(bytes) {
        Ok(content) => Ok(content),
        Err(e) => Ok(String::from_utf8_lossy(e.as_bytes()).into_owned()),
    }
}

fn read_pdf(path: &Path, window: Option<(usize, usize)>) -> Result<String, IngestionError> {
    let bytes = fs::read(path).map_err(|source| IngestionError::Unreadable { path: path.to_path_buf(), source })?;
    let doc = lopdf::Document::load_mem(&bytes)
        .map_err(|e| IngestionError::Parse { path: path.to_path_buf(), message: e.to_string() })?;
    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    let range = match window {
        Some((start, num)) => page_window(page_numbers.len(), start, num),
        None => 0..page_numbers.len(),
    };
    let mut pages_text = Vec::with_capacity(range.len());
    for &page in &page_numbers[range] {
        match doc.extract_text(&[page]) {
            Ok(text) => {
                let text = normalize_whitespace(&text);
                if !text.is_empty() { pages_text.push(text); }
            }
            Err(e) => warn!(path = %path.display(), page, error = %e, "skipping page without extractable text"),
        }
    }
    Ok(pages_text.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn normalize_collapses_newlines_and_runs() {
        assert_eq!(normalize_whitespace("  The\nwarranty \t\r\n expires\n\nin June.  "), "The warranty expires in June.");
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }

    #[test]
    fn page_window_clamps_to_document() {
        assert_eq!(page_window(10, 0, 3), 0..3);
        assert_eq!(page_window(2, 0, 3), 0..2);
        assert_eq!(page_window(2, 5, 3), 2..2);
        assert_eq!(page_window(4, 1, usize::MAX), 1..4);
    }

    #[test]
    fn source_kind_by_extension() {
        assert_eq!(SourceKind::from_path(Path::new("a/Paper.PDF")), Some(SourceKind::Pdf));
        assert_eq!(SourceKind::from_path(Path::new("My Clippings.txt")), Some(SourceKind::PlainText));
        assert_eq!(SourceKind::from_path(Path::new("image.png")), None);
        assert_eq!(SourceKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn load_plain_text_normalizes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        fs::write(&path, "Line one\n\nLine   two\n").unwrap();
        let doc = DocumentLoader::new().load(&path).unwrap();
        assert_eq!(doc.id, "notes.txt");
        assert_eq!(doc.raw_text, "Line one Line two");
    }

    #[test]
    fn load_rejects_empty_unsupported_and_missing() {
        let tmp = TempDir::new().unwrap();
        let empty = tmp.path().join("blank.txt");
        fs::write(&empty, "\n \n").unwrap();
        let loader = DocumentLoader::new();
        assert!(matches!(loader.load(&empty), Err(IngestionError::Empty { .. })));
        assert!(matches!(loader.load(&tmp.path().join("x.docx")), Err(IngestionError::Unsupported { .. })));
        assert!(matches!(loader.load(&tmp.path().join("gone.txt")), Err(IngestionError::Unreadable { .. })));
    }

    #[test]
    fn corrupt_pdf_is_a_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        fs::write(&path, b"definitely not a pdf").unwrap();
        assert!(matches!(DocumentLoader::new().load(&path), Err(IngestionError::Parse { .. })));
    }

    fn write_pdf(path: &Path, pages: &[&str]) {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Object, Stream};

        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }
        let count = i64::try_from(kids.len()).unwrap();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn pdf_pages_are_joined_and_windowed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manual.pdf");
        write_pdf(&path, &["Alpha page text", "Bravo page text", "Charlie page text"]);
        let loader = DocumentLoader::new();

        let doc = loader.load(&path).unwrap();
        assert_eq!(doc.raw_text, "Alpha page text Bravo page text Charlie page text");
        assert_eq!(loader.load_pages(&path, 1, 1).unwrap(), "Bravo page text");
        assert_eq!(loader.load_pages(&path, 0, DEFAULT_SUMMARY_PAGES).unwrap(), doc.raw_text);
        assert!(matches!(loader.load_pages(&path, 5, 3), Err(IngestionError::Empty { .. })));
    }

    #[test]
    fn plain_text_pages_beyond_first_are_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        fs::write(&path, "only page").unwrap();
        let loader = DocumentLoader::new();
        assert_eq!(loader.load_pages(&path, 0, DEFAULT_SUMMARY_PAGES).unwrap(), "only page");
        assert!(matches!(loader.load_pages(&path, 1, 3), Err(IngestionError::Empty { .. })));
    }
}
