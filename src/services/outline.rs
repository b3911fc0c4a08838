use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};

/// One table-of-contents line: a title pointing at a 0-based page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    #[serde(default, deserialize_with = "crate::services::pipeline::null_as_default")]
    pub title: String,
    pub page: usize,
    #[serde(default, deserialize_with = "crate::services::pipeline::null_as_default")]
    pub depth: usize,
}

#[derive(Debug, Clone)]
struct BookmarkEntry {
    title: String,
    page_index: u32,
    children: Vec<BookmarkEntry>,
    depth: usize,
}

/// Document bookmarks, depth-first, flattened into outline entries
pub fn extract_bookmarks(document: &PdfDocument<'_>) -> Vec<OutlineEntry> {
    let roots: Vec<BookmarkEntry> = document
        .bookmarks()
        .iter()
        .filter(|bookmark| bookmark.parent().is_none())
        .filter_map(|bookmark| process_bookmark(&bookmark, 0))
        .collect();

    let mut entries = Vec::new();
    for root in &roots {
        flatten(root, &mut entries);
    }
    entries
}

fn process_bookmark(bookmark: &PdfBookmark, depth: usize) -> Option<BookmarkEntry> {
    let title = bookmark
        .title()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "Untitled".to_string());

    let page_index = bookmark
        .destination()
        .and_then(|dest| dest.page_index().ok())
        .unwrap_or(0) as u32;

    let mut children = Vec::new();
    let mut child = bookmark.first_child();

    while let Some(c) = child {
        if let Some(child_entry) = process_bookmark(&c, depth + 1) {
            children.push(child_entry);
        }
        child = c.next_sibling();
    }

    Some(BookmarkEntry {
        title,
        page_index,
        children,
        depth,
    })
}

fn flatten(entry: &BookmarkEntry, out: &mut Vec<OutlineEntry>) {
    out.push(OutlineEntry {
        title: entry.title.clone(),
        page: entry.page_index as usize,
        depth: entry.depth,
    });
    for child in &entry.children {
        flatten(child, out);
    }
}

/// Pipeline entries win; native bookmarks fill in when the pipeline has none
pub fn merge_outline(pipeline: Vec<OutlineEntry>, native: Vec<OutlineEntry>) -> Vec<OutlineEntry> {
    if pipeline.is_empty() { native } else { pipeline }
}

/// Indented one-line-per-entry rendering with 1-based page numbers
pub fn render_outline(entries: &[OutlineEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}{} (p{})", "  ".repeat(e.depth), e.title, e.page + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
