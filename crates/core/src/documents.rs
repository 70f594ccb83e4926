//! Splitting fetched documents into text elements ahead of chunking.

use std::path::Path;

use crate::error::{IngestError, Result};

/// One paragraph-sized piece of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub text: String,
    /// 1-based page for paginated formats.
    pub page: Option<u32>,
}

/// Read `path` and split it into elements. PDFs are read page by page with
/// `lopdf`; anything else is treated as (lossy) UTF-8 text.
pub fn extract_elements(path: &Path) -> Result<Vec<Element>> {
    let _span = tracing::debug_span!("documents.extract", path = %path.display()).entered();

    let bytes = std::fs::read(path)?;
    let is_pdf = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        pdf_elements(path, &bytes)
    } else {
        Ok(paragraphs(&String::from_utf8_lossy(&bytes), None))
    }
}

fn pdf_elements(path: &Path, bytes: &[u8]) -> Result<Vec<Element>> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| IngestError::DocumentFailed {
        path: path.to_path_buf(),
        reason: format!("failed to load PDF: {e}"),
    })?;

    let mut elements = Vec::new();
    for (page_num, _) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(text) => elements.extend(paragraphs(&text, Some(page_num))),
            Err(e) => tracing::warn!(
                path = %path.display(),
                page = page_num,
                error = %e,
                "skipping unreadable PDF page"
            ),
        }
    }
    Ok(elements)
}

/// Blank-line separated paragraphs, trimmed, empty ones dropped.
fn paragraphs(text: &str, page: Option<u32>) -> Vec<Element> {
    let mut elements = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    let mut flush = |current: &mut Vec<&str>| {
        if !current.is_empty() {
            elements.push(Element {
                text: current.join("\n"),
                page,
            });
            current.clear();
        }
    };

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut current);
        } else {
            current.push(line);
        }
    }
    flush(&mut current);

    elements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_blank_lines() {
        let elements = paragraphs("  first line\nstill first\n\n\n second \n\t\nthird", None);
        let texts: Vec<_> = elements.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["first line\nstill first", "second", "third"]);
        assert!(elements.iter().all(|e| e.page.is_none()));
    }

    #[test]
    fn blank_input_has_no_elements() {
        assert!(paragraphs("", None).is_empty());
        assert!(paragraphs("\n \n\t\n", Some(1)).is_empty());
    }

    #[test]
    fn reads_transcripts_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture_transcription.txt");
        std::fs::write(&path, "Mitosis is cell division.\n\nMeiosis makes gametes.").unwrap();

        let elements = extract_elements(&path).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].text, "Meiosis makes gametes.");
    }

    #[test]
    fn corrupt_pdf_is_a_document_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();

        let err = extract_elements(&path).unwrap_err();
        assert!(matches!(err, IngestError::DocumentFailed { .. }));
    }
}
