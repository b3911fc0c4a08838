use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_MAX_DISTANCE, clamp_distance};
use crate::services::pipeline::Entity;
use crate::services::resolver::{CoordinateResolver, PageSearch, Rect};
use crate::text_map::{Document, MatchSpan, OffsetTable, find_all};

/// Fixed highlight palette; labels and terms are hashed onto it
pub const PALETTE: [Rgb; 8] = [
    Rgb::new(0xFF, 0xC1, 0x07),
    Rgb::new(0x03, 0xA9, 0xF4),
    Rgb::new(0x8B, 0xC3, 0x4A),
    Rgb::new(0xE9, 0x1E, 0x63),
    Rgb::new(0x9C, 0x27, 0xB0),
    Rgb::new(0xFF, 0x57, 0x22),
    Rgb::new(0x60, 0x7D, 0x8B),
    Rgb::new(0xFF, 0x98, 0x00),
];

/// Number of search hits listed for navigation
pub const MAX_LISTED_HITS: usize = 50;
const HIT_LABEL_SNIPPET_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Deterministic palette color for a label or term.
///
/// Uses FNV-1a so the choice is stable across runs and builds. Distinct keys may
/// share a color.
pub fn color_for(key: &str) -> Rgb {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let hash = key.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    });
    PALETTE[(hash % PALETTE.len() as u64) as usize]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightSource {
    Ner,
    Search(String),
}

/// A colored rectangle on one page
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub page: usize,
    pub rect: Rect,
    pub color: Rgb,
    pub source: HighlightSource,
    pub label: String,
}

/// Wire shape consumed by the rendering layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightOutput {
    pub page: usize,
    pub coords: [f64; 4],
    pub color: String,
}

impl Highlight {
    pub fn is_ner(&self) -> bool {
        matches!(self.source, HighlightSource::Ner)
    }

    pub fn output(&self) -> HighlightOutput {
        HighlightOutput {
            page: self.page,
            coords: self.rect.coords(),
            color: self.color.to_hex(),
        }
    }
}

/// Clickable navigation entry for one search match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub term: String,
    pub snippet: String,
    pub page: usize,
    pub label: String,
}

impl SearchHit {
    fn new(term: &str, snippet: &str, page: usize) -> Self {
        let short: String = snippet.chars().take(HIT_LABEL_SNIPPET_CHARS).collect();
        Self {
            term: term.to_string(),
            snippet: snippet.to_string(),
            page,
            label: format!("{} (p{}): {}...", term, page + 1, short),
        }
    }
}

/// Per-interaction inputs chosen by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub max_distance: u8,
    /// NER labels to show; `None` shows every label
    pub active_labels: Option<BTreeSet<String>>,
    /// Search terms to show; `None` shows every term
    pub active_terms: Option<BTreeSet<String>>,
    /// Page the viewer is positioned on, if any
    pub selected_page: Option<usize>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            max_distance: DEFAULT_MAX_DISTANCE,
            active_labels: None,
            active_terms: None,
            selected_page: None,
        }
    }
}

impl ViewState {
    pub fn with_max_distance(self, max_distance: u8) -> Self {
        Self {
            max_distance: clamp_distance(max_distance),
            ..self
        }
    }

    pub fn is_active(&self, highlight: &Highlight) -> bool {
        match &highlight.source {
            HighlightSource::Ner => self
                .active_labels
                .as_ref()
                .is_none_or(|labels| labels.contains(&highlight.label)),
            HighlightSource::Search(term) => self
                .active_terms
                .as_ref()
                .is_none_or(|terms| terms.contains(term)),
        }
    }
}

/// Everything a recomputation reads
#[derive(Debug, Clone, Copy)]
pub struct RecomputeInput<'a> {
    pub document: &'a Document,
    pub terms: &'a [String],
    pub entities: &'a [Entity],
}

/// Fresh result of one recomputation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recomputation {
    pub highlights: Vec<Highlight>,
    pub hits: Vec<SearchHit>,
    /// Matches found per term, in term order
    pub hit_counts: Vec<(String, usize)>,
    /// Search matches the renderer could not place
    pub dropped: usize,
}

impl Recomputation {
    pub fn highlights_on(&self, page: usize) -> impl Iterator<Item = &Highlight> {
        self.highlights.iter().filter(move |h| h.page == page)
    }

    pub fn output(&self) -> Vec<HighlightOutput> {
        self.highlights.iter().map(Highlight::output).collect()
    }
}

/// Highlights for entities that already carry page and coordinates
pub fn ner_highlights(entities: &[Entity], page_count: usize) -> Vec<Highlight> {
    entities
        .iter()
        .filter_map(|entity| {
            let (Some(page), Some(rect)) = (entity.page, entity.rect()) else {
                warn!(label = %entity.label, text = %entity.text, "entity without usable page/coords");
                return None;
            };
            if page >= page_count {
                warn!(page, page_count, label = %entity.label, "entity page out of range");
                return None;
            }
            Some(Highlight {
                page,
                rect,
                color: color_for(&entity.label),
                source: HighlightSource::Ner,
                label: entity.label.clone(),
            })
        })
        .collect()
}

/// Resolve search spans into highlights. Spans the renderer cannot place are
/// dropped; the count of dropped spans is returned alongside.
pub fn search_highlights(
    spans: &[MatchSpan],
    full_text: &str,
    resolver: &CoordinateResolver<'_>,
) -> (Vec<Highlight>, usize) {
    let mut highlights = Vec::with_capacity(spans.len());
    let mut dropped = 0;

    for span in spans {
        match resolver.resolve_span(span, full_text) {
            Ok(resolved) => highlights.push(Highlight {
                page: resolved.page,
                rect: resolved.rect,
                color: color_for(&span.term),
                source: HighlightSource::Search(span.term.clone()),
                label: span.term.clone(),
            }),
            Err(e) => {
                debug!(error = %e, "dropping unresolved highlight");
                dropped += 1;
            }
        }
    }

    (highlights, dropped)
}

/// Merge NER and search highlights. Identical `(page, rect)` pairs collapse into
/// one, keeping the NER highlight when both sources hit the same place.
pub fn aggregate(ner: Vec<Highlight>, search: Vec<Highlight>) -> Vec<Highlight> {
    let mut merged: Vec<Highlight> = Vec::with_capacity(ner.len() + search.len());
    let mut seen: HashMap<(usize, [u64; 4]), usize> = HashMap::new();

    for highlight in ner.into_iter().chain(search) {
        let key = (highlight.page, highlight.rect.key());
        match seen.get(&key) {
            Some(&idx) => {
                if highlight.is_ner() && !merged[idx].is_ner() {
                    merged[idx] = highlight;
                }
            }
            None => {
                seen.insert(key, merged.len());
                merged.push(highlight);
            }
        }
    }

    merged
}

/// Keep only highlights the view has switched on
pub fn filter(highlights: &[Highlight], view: &ViewState) -> Vec<Highlight> {
    highlights
        .iter()
        .filter(|h| view.is_active(h))
        .cloned()
        .collect()
}

/// Rebuild highlights and hit list from scratch for the current inputs and view.
///
/// Without a renderer no search highlight can be placed, but hits are still
/// listed with their pages.
pub fn recompute(
    input: RecomputeInput<'_>,
    view: &ViewState,
    renderer: Option<&dyn PageSearch>,
) -> Recomputation {
    let full_text = input.document.full_text();
    let index = OffsetTable::build(input.document.page_texts());
    let max_distance = clamp_distance(view.max_distance);

    let mut spans = Vec::new();
    let mut hit_counts = Vec::with_capacity(input.terms.len());
    for term in input.terms {
        let term_spans = find_all(&full_text, term, max_distance);
        hit_counts.push((term.trim().to_string(), term_spans.len()));
        spans.extend(term_spans);
    }

    let hits = spans
        .iter()
        .map(|span| SearchHit::new(&span.term, span.snippet(&full_text), index.page_of(span.start)))
        .collect();

    let ner = ner_highlights(input.entities, input.document.page_count());
    let (search, dropped) = match renderer {
        Some(renderer) => {
            let resolver = CoordinateResolver::new(renderer, &index);
            search_highlights(&spans, &full_text, &resolver)
        }
        None => (Vec::new(), 0),
    };

    let highlights = filter(&aggregate(ner, search), view);

    info!(
        terms = input.terms.len(),
        matches = spans.len(),
        highlights = highlights.len(),
        dropped,
        "highlights recomputed"
    );

    Recomputation {
        highlights,
        hits,
        hit_counts,
        dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::resolver::tests::FakeRenderer;
    use pretty_assertions::assert_eq;

    fn entity(label: &str, page: usize, coords: [f64; 4]) -> Entity {
        Entity {
            id: None,
            text: label.to_lowercase(),
            label: label.to_string(),
            page: Some(page),
            coords: coords.to_vec(),
        }
    }

    fn search_hl(term: &str, page: usize, rect: Rect) -> Highlight {
        Highlight {
            page,
            rect,
            color: color_for(term),
            source: HighlightSource::Search(term.to_string()),
            label: term.to_string(),
        }
    }

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_color_is_consistent() {
        assert_eq!(color_for("Bravo"), color_for("Bravo"));
        assert!(PALETTE.contains(&color_for("anything at all")));
        assert!(PALETTE.contains(&color_for("")));
    }

    #[test]
    fn test_hex_format() {
        assert_eq!(PALETTE[0].to_hex(), "#FFC107");
        assert_eq!(Rgb::new(0, 10, 255).to_hex(), "#000AFF");
    }

    #[test]
    fn test_bravo_scenario() {
        let doc = Document::from_pages(["Alpha Bravo", "Charlie Delta"]);
        let renderer = FakeRenderer::new(&["Alpha Bravo", "Charlie Delta"]);
        let terms = terms(&["Bravo"]);
        let input = RecomputeInput {
            document: &doc,
            terms: &terms,
            entities: &[],
        };
        let result = recompute(input, &ViewState::default().with_max_distance(0), Some(&renderer));

        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].page, 0);
        assert_eq!(result.hits[0].label, "Bravo (p1): Bravo...");
        assert_eq!(result.highlights.len(), 1);
        assert_eq!(result.highlights[0].page, 0);
        assert_eq!(result.hit_counts, vec![("Bravo".to_string(), 1)]);
    }

    #[test]
    fn test_padded_term_is_counted_once() {
        let doc = Document::from_pages(["Alpha Bravo", "Charlie Delta"]);
        let renderer = FakeRenderer::new(&["Alpha Bravo", "Charlie Delta"]);
        let terms = terms(&[" Bravo"]);
        let input = RecomputeInput {
            document: &doc,
            terms: &terms,
            entities: &[],
        };
        let result = recompute(input, &ViewState::default(), Some(&renderer));

        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.highlights.len(), 1);
        assert_eq!(result.hit_counts, vec![("Bravo".to_string(), 1)]);
    }

    #[test]
    fn test_zephyr_scenario_is_empty() {
        let doc = Document::from_pages(["Alpha Bravo", "Charlie Delta"]);
        let renderer = FakeRenderer::new(&["Alpha Bravo", "Charlie Delta"]);
        let terms = terms(&["Zephyr"]);
        let input = RecomputeInput {
            document: &doc,
            terms: &terms,
            entities: &[],
        };
        let result = recompute(input, &ViewState::default().with_max_distance(2), Some(&renderer));
        assert!(result.hits.is_empty());
        assert!(result.highlights.is_empty());
        assert_eq!(result.dropped, 0);
    }

    #[test]
    fn test_renderer_disagreement_drops_only_that_highlight() {
        let pages = ["Bravo here", "nothing", "Bravo there"];
        let doc = Document::from_pages(pages);
        let renderer = FakeRenderer::new(&pages).blind_on(2);
        let terms = terms(&["Bravo"]);
        let input = RecomputeInput {
            document: &doc,
            terms: &terms,
            entities: &[],
        };
        let result = recompute(input, &ViewState::default(), Some(&renderer));

        assert_eq!(result.hits.len(), 2);
        assert_eq!(result.dropped, 1);
        assert_eq!(result.highlights.len(), 1);
        assert_eq!(result.highlights[0].page, 0);
    }

    #[test]
    fn test_recompute_without_renderer_still_lists_hits() {
        let doc = Document::from_pages(["color colour"]);
        let terms = terms(&["color"]);
        let input = RecomputeInput {
            document: &doc,
            terms: &terms,
            entities: &[],
        };
        let result = recompute(input, &ViewState::default(), None);
        let snippets: Vec<&str> = result.hits.iter().map(|h| h.snippet.as_str()).collect();
        assert_eq!(snippets, vec!["color", "colour"]);
        assert!(result.highlights.is_empty());
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let doc = Document::from_pages(["Alpha Bravo", "Charlie Delta"]);
        let renderer = FakeRenderer::new(&["Alpha Bravo", "Charlie Delta"]);
        let terms = terms(&["Bravo", "Delta"]);
        let entities = [entity("ORG", 1, [1.0, 2.0, 3.0, 4.0])];
        let input = RecomputeInput {
            document: &doc,
            terms: &terms,
            entities: &entities,
        };
        let view = ViewState::default();
        assert_eq!(
            recompute(input, &view, Some(&renderer)),
            recompute(input, &view, Some(&renderer))
        );
    }

    #[test]
    fn test_ner_highlights_skip_bad_entities() {
        let mut bad_coords = entity("PER", 0, [0.0; 4]);
        bad_coords.coords.pop();
        let mut no_page = entity("LOC", 0, [0.0; 4]);
        no_page.page = None;

        let highlights = ner_highlights(
            &[entity("ORG", 0, [1.0, 2.0, 3.0, 4.0]), entity("ORG", 7, [0.0; 4]), bad_coords, no_page],
            2,
        );
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].color, color_for("ORG"));
        assert!(highlights[0].is_ner());
    }

    #[test]
    fn test_aggregate_prefers_ner_on_same_rect() {
        let rect = Rect::new(1.0, 2.0, 3.0, 4.0);
        let ner = ner_highlights(&[entity("ORG", 0, rect.coords())], 1);
        let search = vec![
            search_hl("acme", 0, rect),
            search_hl("acme", 1, rect),
            search_hl("acme", 1, rect),
        ];

        let merged = aggregate(ner, search);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].label, "ORG");
        assert!(merged[0].is_ner());
        assert_eq!(merged[1].page, 1);
    }

    #[test]
    fn test_aggregate_ner_replaces_earlier_search() {
        let rect = Rect::new(0.0, 0.0, 1.0, 1.0);
        let ner = ner_highlights(&[entity("ORG", 0, rect.coords())], 1);
        let merged = aggregate(Vec::new(), vec![search_hl("acme", 0, rect)]);
        let merged = aggregate(ner, merged);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].is_ner());
    }

    #[test]
    fn test_filter_by_labels_and_terms() {
        let highlights = vec![
            ner_highlights(&[entity("ORG", 0, [0.0, 0.0, 1.0, 1.0])], 1).remove(0),
            ner_highlights(&[entity("PER", 0, [2.0, 0.0, 3.0, 1.0])], 1).remove(0),
            search_hl("bravo", 0, Rect::new(4.0, 0.0, 5.0, 1.0)),
            search_hl("delta", 0, Rect::new(6.0, 0.0, 7.0, 1.0)),
        ];

        assert_eq!(filter(&highlights, &ViewState::default()).len(), 4);

        let view = ViewState {
            active_labels: Some(["ORG".to_string()].into_iter().collect()),
            active_terms: Some(["delta".to_string()].into_iter().collect()),
            ..ViewState::default()
        };
        let labels: Vec<String> = filter(&highlights, &view)
            .into_iter()
            .map(|h| h.label)
            .collect();
        assert_eq!(labels, vec!["ORG", "delta"]);
    }

    #[test]
    fn test_highlight_output_shape() {
        let hl = search_hl("bravo", 3, Rect::new(1.5, 2.0, 3.0, 4.0));
        let json = serde_json::to_value(hl.output()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"page": 3, "coords": [1.5, 2.0, 3.0, 4.0], "color": color_for("bravo").to_hex()})
        );
    }

    #[test]
    fn test_highlights_on_page() {
        let result = Recomputation {
            highlights: vec![
                search_hl("a", 0, Rect::new(0.0, 0.0, 1.0, 1.0)),
                search_hl("a", 1, Rect::new(0.0, 0.0, 1.0, 1.0)),
            ],
            ..Recomputation::default()
        };
        assert_eq!(result.highlights_on(1).count(), 1);
    }
}
