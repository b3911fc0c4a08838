/// Character placed between consecutive pages in the concatenated text
pub const PAGE_SEPARATOR: char = '\n';

/// Plain text of a single page, in the renderer's native page order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Page index in the document (0-based)
    pub index: usize,
    pub text: String,
}

impl Page {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// Ordered per-page text for one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub pages: Vec<Page>,
}

impl Document {
    /// Build a document from page texts, numbering pages in order
    pub fn from_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pages: pages
                .into_iter()
                .enumerate()
                .map(|(index, text)| Page::new(index, text))
                .collect(),
        }
    }

    /// Full text: page texts joined by a single separator
    pub fn full_text(&self) -> String {
        let capacity = self.pages.iter().map(|p| p.text.len() + 1).sum();
        let mut text = String::with_capacity(capacity);
        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                text.push(PAGE_SEPARATOR);
            }
            text.push_str(&page.text);
        }
        text
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_texts(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|p| p.text.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.text.is_empty())
    }
}
