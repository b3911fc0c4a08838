use pdfium_render::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, ViewerError};
use crate::text_map::{MatchSpan, OffsetTable};

/// Axis-aligned rectangle in a page's native space: points, origin top-left, y down
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Build from `[x0, y0, x1, y1]`; anything else (or non-finite values) is rejected
    pub fn from_coords(coords: &[f64]) -> Option<Self> {
        match coords {
            [x0, y0, x1, y1] if coords.iter().all(|c| c.is_finite()) => {
                Some(Self::new(*x0, *y0, *x1, *y1))
            }
            _ => None,
        }
    }

    /// Convert PDFium bounds (origin bottom-left, y up) into top-left page space
    pub fn from_pdf_bounds(bounds: &PdfRect, page_height: f64) -> Self {
        Self {
            x0: bounds.left().value as f64,
            y0: page_height - bounds.top().value as f64,
            x1: bounds.right().value as f64,
            y1: page_height - bounds.bottom().value as f64,
        }
    }

    pub fn coords(&self) -> [f64; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }

    /// Bitwise identity key, used to collapse identical rectangles
    pub fn key(&self) -> [u64; 4] {
        self.coords().map(f64::to_bits)
    }
}

/// Literal per-page text search offered by a rendering backend
pub trait PageSearch {
    fn page_count(&self) -> usize;

    /// Rectangles of every literal, case-insensitive occurrence of `needle` on `page`,
    /// in the backend's own order. Empty when the page is missing or nothing matches.
    fn search(&self, page: usize, needle: &str) -> Vec<Rect>;
}

/// PDFium-backed search over a loaded document
pub struct PdfRenderer<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfRenderer<'a> {
    pub fn new(document: PdfDocument<'a>) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &PdfDocument<'a> {
        &self.document
    }
}

impl PageSearch for PdfRenderer<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn search(&self, page: usize, needle: &str) -> Vec<Rect> {
        let Ok(page_index) = u16::try_from(page) else {
            return Vec::new();
        };
        let Ok(pdf_page) = self.document.pages().get(page_index) else {
            return Vec::new();
        };
        let page_height = pdf_page.height().value as f64;
        let Ok(text_page) = pdf_page.text() else {
            return Vec::new();
        };
        let Ok(search) = text_page.search(needle, &PdfSearchOptions::new()) else {
            return Vec::new();
        };

        let mut rects = Vec::new();
        while let Some(segments) = search.find_next() {
            // a hit that wraps lines comes back as several segments; cover them all
            let hit = segments
                .iter()
                .map(|segment| Rect::from_pdf_bounds(&segment.bounds(), page_height))
                .reduce(|a, b| Rect {
                    x0: a.x0.min(b.x0),
                    y0: a.y0.min(b.y0),
                    x1: a.x1.max(b.x1),
                    y1: a.y1.max(b.y1),
                });
            if let Some(rect) = hit {
                rects.push(rect);
            }
        }
        rects
    }
}

/// A span anchored to a page rectangle
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSpan {
    pub page: usize,
    pub rect: Rect,
}

/// Maps match spans from the flat text onto rectangles in renderer space
pub struct CoordinateResolver<'a> {
    search: &'a dyn PageSearch,
    index: &'a OffsetTable,
}

impl<'a> CoordinateResolver<'a> {
    pub fn new(search: &'a dyn PageSearch, index: &'a OffsetTable) -> Self {
        Self { search, index }
    }

    /// First rectangle of `snippet` on `page`.
    ///
    /// When the renderer returns several hits the first one wins, even if the
    /// snippet repeats on the page.
    pub fn resolve(&self, snippet: &str, page: usize) -> Result<Rect> {
        if page < self.search.page_count() {
            if let Some(rect) = self.search.search(page, snippet).into_iter().next() {
                return Ok(rect);
            }
        }
        Err(ViewerError::CoordinateNotFound {
            page,
            snippet: snippet.to_string(),
        })
    }

    /// Anchor a span from `full_text`.
    ///
    /// The span's start page is tried first; if the span runs across a page
    /// separator the following pages it covers are tried in order.
    /// Pages beyond the span are never scanned: a repeated term found there would
    /// anchor to the wrong occurrence, so a miss is reported as `CoordinateNotFound`.
    pub fn resolve_span(&self, span: &MatchSpan, full_text: &str) -> Result<ResolvedSpan> {
        let snippet = span.snippet(full_text);
        let first_page = self.index.page_of(span.start);
        let last_page = self
            .index
            .page_of(span.end.saturating_sub(1))
            .max(first_page);

        for page in first_page..=last_page {
            if let Ok(rect) = self.resolve(snippet, page) {
                return Ok(ResolvedSpan { page, rect });
            }
        }

        debug!(page = first_page, snippet, "renderer search found no match");
        Err(ViewerError::CoordinateNotFound {
            page: first_page,
            snippet: snippet.to_string(),
        })
    }
}
