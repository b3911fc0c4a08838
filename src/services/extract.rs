use std::path::{Path, PathBuf};

use pdfium_render::prelude::*;
use tracing::{info, warn};

use crate::error::{Result, ViewerError};
use crate::services::outline::{self, OutlineEntry};
use crate::services::resolver::PdfRenderer;
use crate::text_map::Document;

/// Extraction path chosen from a file name's extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Word,
    Sec,
}

impl FileKind {
    pub fn from_name(name: &str) -> Result<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "doc" | "docx" => Ok(Self::Word),
            "sec" => Ok(Self::Sec),
            _ => Err(ViewerError::UnsupportedFileType(extension)),
        }
    }
}

/// A document's text plus, for PDFs, the renderer that owns its coordinate space
pub struct LoadedDocument<'a> {
    pub name: String,
    pub kind: FileKind,
    pub text: Document,
    pub renderer: Option<PdfRenderer<'a>>,
}

impl LoadedDocument<'_> {
    /// Native PDF bookmarks, flattened; empty for other formats
    pub fn native_outline(&self) -> Vec<OutlineEntry> {
        self.renderer
            .as_ref()
            .map(|r| outline::extract_bookmarks(r.document()))
            .unwrap_or_default()
    }
}

/// Bind PDFium from `dir` (or the working directory), falling back to the system library
pub fn init_pdfium(dir: Option<&Path>) -> Result<Pdfium> {
    let dir = dir.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("./"));
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| ViewerError::ExtractionFailure(format!("Failed to bind to PDFium: {}", e)))?;
    Ok(Pdfium::new(bindings))
}

/// Extract a document's per-page text.
///
/// The extension is checked before any bytes are parsed. PDFs need a bound `pdfium`.
pub fn load_document<'a>(
    pdfium: Option<&'a Pdfium>,
    bytes: &'a [u8],
    name: &str,
) -> Result<LoadedDocument<'a>> {
    let kind = FileKind::from_name(name)?;

    let (text, renderer) = match kind {
        FileKind::Pdf => {
            let pdfium = pdfium.ok_or_else(|| {
                ViewerError::ExtractionFailure("Pdfium not initialized".to_string())
            })?;
            let document = pdfium
                .load_pdf_from_byte_slice(bytes, None)
                .map_err(|e| ViewerError::ExtractionFailure(format!("Failed to open PDF: {}", e)))?;
            let text = extract_pdf(&document)?;
            (text, Some(PdfRenderer::new(document)))
        }
        FileKind::Word => (extract_word(bytes)?, None),
        FileKind::Sec => (extract_sec(bytes), None),
    };

    info!(name, pages = text.page_count(), ?kind, "document loaded");

    Ok(LoadedDocument {
        name: name.to_string(),
        kind,
        text,
        renderer,
    })
}

/// One text block per page, in PDFium's page order
pub fn extract_pdf(document: &PdfDocument) -> Result<Document> {
    let mut pages = Vec::new();
    for page in document.pages().iter() {
        let text_page = page
            .text()
            .map_err(|e| ViewerError::ExtractionFailure(format!("Failed to read page text: {}", e)))?;
        pages.push(text_page.all());
    }
    Ok(Document::from_pages(pages))
}

/// Word documents have no page model here; the whole body becomes page 0
pub fn extract_word(bytes: &[u8]) -> Result<Document> {
    let docx = docx_rs::read_docx(bytes)
        .map_err(|e| ViewerError::ExtractionFailure(format!("Failed to read Word document: {}", e)))?;

    let mut text = String::new();
    for child in &docx.document.children {
        push_docx_child(child, &mut text);
    }
    if text.ends_with('\n') {
        text.pop();
    }

    Ok(Document::from_pages([text]))
}

/// Best-effort UTF-8 decode; invalid sequences become U+FFFD
pub fn extract_sec(bytes: &[u8]) -> Document {
    let text = String::from_utf8_lossy(bytes);
    if matches!(text, std::borrow::Cow::Owned(_)) {
        warn!("invalid UTF-8 sequences replaced while decoding .sec file");
    }
    Document::from_pages([text.into_owned()])
}

fn push_docx_child(child: &docx_rs::DocumentChild, text: &mut String) {
    match child {
        docx_rs::DocumentChild::Paragraph(p) => push_paragraph(p, text),
        docx_rs::DocumentChild::Table(t) => push_table(t, text),
        _ => {}
    }
}

fn push_paragraph(paragraph: &docx_rs::Paragraph, text: &mut String) {
    for child in &paragraph.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                    docx_rs::RunChild::Tab(_) => text.push('\t'),
                    _ => {}
                }
            }
        }
    }
    text.push('\n');
}

fn push_table(table: &docx_rs::Table, text: &mut String) {
    for row_child in &table.rows {
        let docx_rs::TableChild::TableRow(row) = row_child;
        for cell_child in &row.cells {
            let docx_rs::TableRowChild::TableCell(cell) = cell_child;
            for content in &cell.children {
                match content {
                    docx_rs::TableCellContent::Paragraph(p) => push_paragraph(p, text),
                    docx_rs::TableCellContent::Table(t) => push_table(t, text),
                    _ => {}
                }
            }
        }
    }
}
