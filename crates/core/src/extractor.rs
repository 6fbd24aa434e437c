//! Plain-text extraction from resume documents (PDF, DOCX).

use anyhow::Context;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "pdf" => Some(DocumentKind::Pdf),
                "docx" => Some(DocumentKind::Docx),
                _ => None,
            })
    }
}

/// Returns the document's text, or an empty string if it cannot be read.
pub fn extract(path: &Path) -> String {
    let Some(kind) = DocumentKind::from_path(path) else {
        warn!(path = %path.display(), "unsupported document type");
        return String::new();
    };
    match extract_kind(path, kind) {
        Ok(text) => {
            if text.trim().is_empty() {
                warn!(path = %path.display(), "no text could be extracted");
            } else {
                debug!(path = %path.display(), chars = text.len(), "extracted text");
            }
            text
        }
        Err(e) => {
            warn!(path = %path.display(), error = %format!("{e:#}"), "text extraction failed");
            String::new()
        }
    }
}

fn extract_kind(path: &Path, kind: DocumentKind) -> anyhow::Result<String> {
    match kind {
        DocumentKind::Pdf => pdf_text(path),
        DocumentKind::Docx => docx_text(path),
    }
}

#[cfg(feature = "pdf")]
fn pdf_text(path: &Path) -> anyhow::Result<String> {
    // pdf-extract panics on some malformed documents.
    let content = std::panic::catch_unwind(|| pdf_extract::extract_text(path))
        .map_err(|_| anyhow::anyhow!("pdf parser panicked"))?
        .context("read pdf")?;
    Ok(non_empty_lines(&content))
}

#[cfg(not(feature = "pdf"))]
fn pdf_text(_path: &Path) -> anyhow::Result<String> {
    anyhow::bail!("built without the `pdf` feature")
}

#[cfg(feature = "office")]
fn docx_text(path: &Path) -> anyhow::Result<String> {
    use std::io::Read;

    let file = std::fs::File::open(path).context("open docx")?;
    let mut archive = zip::ZipArchive::new(file).context("open docx archive")?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("docx has no word/document.xml")?
        .read_to_string(&mut xml)?;
    docx_xml_text(&xml)
}

#[cfg(not(feature = "office"))]
fn docx_text(_path: &Path) -> anyhow::Result<String> {
    anyhow::bail!("built without the `office` feature")
}

/// Collects paragraph text (including table cells) from a WordprocessingML body.
pub fn docx_xml_text(xml: &str) -> anyhow::Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    let text = current.trim();
                    if !text.is_empty() {
                        paragraphs.push(text.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" | b"w:cr" => current.push(' '),
                _ => {}
            },
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs.join("\n"))
}

fn non_empty_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
