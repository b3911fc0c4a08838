use std::ops::Range;

/// Cumulative start offsets of every page inside the concatenated document text.
///
/// `offsets[i]` is the sum of `len(page[j]) + 1` for all `j < i`, where lengths
/// are UTF-8 byte lengths and the `+ 1` accounts for the page separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetTable {
    offsets: Vec<usize>,
    /// Length of each page's own text (separator excluded)
    lengths: Vec<usize>,
}

impl OffsetTable {
    pub fn build<'a, I>(pages: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut offsets = Vec::new();
        let mut lengths = Vec::new();
        let mut acc = 0usize;

        for text in pages {
            offsets.push(acc);
            lengths.push(text.len());
            acc += text.len() + 1;
        }

        Self { offsets, lengths }
    }

    /// Page holding global offset `offset`.
    ///
    /// Returns the greatest `i` with `offsets[i] <= offset`. Offsets past the end
    /// of the last page clamp to the last page. An empty table maps everything to 0.
    pub fn page_of(&self, offset: usize) -> usize {
        // first index whose start is strictly after `offset`
        let after = self.offsets.partition_point(|&start| start <= offset);
        after.saturating_sub(1)
    }

    pub fn page_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn page_start(&self, page: usize) -> Option<usize> {
        self.offsets.get(page).copied()
    }

    /// Byte range of a page's own text inside the full text
    pub fn page_range(&self, page: usize) -> Option<Range<usize>> {
        let start = *self.offsets.get(page)?;
        let len = *self.lengths.get(page)?;
        Some(start..start + len)
    }

    /// Split a global offset into `(page, offset within that page)`
    pub fn to_page_local(&self, offset: usize) -> (usize, usize) {
        let page = self.page_of(offset);
        let start = self.offsets.get(page).copied().unwrap_or(0);
        (page, offset.saturating_sub(start))
    }

    /// Total length of the concatenated text this table describes
    pub fn text_len(&self) -> usize {
        match (self.offsets.last(), self.lengths.last()) {
            (Some(start), Some(len)) => start + len,
            _ => 0,
        }
    }
}
