use std::cell::RefCell;
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Result, ViewerError};
use crate::services::outline::OutlineEntry;
use crate::services::resolver::Rect;

const TOC_ENDPOINT: &str = "/pipelines/toc_extract";
const NER_ENDPOINT: &str = "/pipelines/ner_extract";

/// One externally recognized entity, with its page and native coordinates
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub coords: Vec<f64>,
}

impl Entity {
    pub fn rect(&self) -> Option<Rect> {
        Rect::from_coords(&self.coords)
    }
}

/// Explicit `null` reads as the field's default
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Items stay raw so one bad entry cannot sink the batch
#[derive(Debug, Default, Deserialize)]
struct OutlineResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    entries: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct EntityResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    entities: Vec<Value>,
}

/// Store for decoded pipeline responses; the owner decides how long it lives
pub trait JsonCache {
    fn get(&self, key: &str) -> Option<Value>;
    fn put(&self, key: &str, value: Value);
}

/// In-memory cache, no eviction
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RefCell<HashMap<String, Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl JsonCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    fn put(&self, key: &str, value: Value) {
        self.entries.borrow_mut().insert(key.to_string(), value);
    }
}

/// Cache key: endpoint path plus query parameters in sorted order
pub fn cache_key(endpoint: &str, params: &[(&str, &str)]) -> String {
    let mut sorted = params.to_vec();
    sorted.sort();
    let query = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", endpoint, query)
}

/// Source of externally computed outline and entity data
pub trait PipelineSource {
    fn outline(&self, file_name: &str) -> Result<Vec<OutlineEntry>>;
    fn entities(&self, file_name: &str) -> Result<Vec<Entity>>;
}

/// Blocking HTTP client for the extraction pipelines
pub struct PipelineClient<'c> {
    base: String,
    token: String,
    client: reqwest::blocking::Client,
    cache: &'c dyn JsonCache,
}

impl<'c> PipelineClient<'c> {
    pub fn new(config: &Config, cache: &'c dyn JsonCache) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            base: config.pipeline_base.clone(),
            token: config.pipeline_token.clone(),
            client,
            cache,
        })
    }

    /// GET `endpoint` with `params`, through the cache
    pub fn get_json(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value> {
        let key = cache_key(endpoint, params);
        if let Some(hit) = self.cache.get(&key) {
            debug!(key, "pipeline cache hit");
            return Ok(hit);
        }

        let url = format!("{}{}", self.base, endpoint);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(params)
            .send()?;

        if !response.status().is_success() {
            return Err(ViewerError::PipelineUnavailable(format!(
                "{} returned status {}",
                endpoint,
                response.status()
            )));
        }

        let value: Value = response.json()?;
        self.cache.put(&key, value.clone());
        Ok(value)
    }

    fn fetch(&self, endpoint: &str, file_name: &str) -> Result<Value> {
        self.get_json(endpoint, &[("fileName", file_name)])
    }
}

impl PipelineSource for PipelineClient<'_> {
    fn outline(&self, file_name: &str) -> Result<Vec<OutlineEntry>> {
        parse_outline(self.fetch(TOC_ENDPOINT, file_name)?)
    }

    fn entities(&self, file_name: &str) -> Result<Vec<Entity>> {
        parse_entities(self.fetch(NER_ENDPOINT, file_name)?)
    }
}

fn parse_response<T: DeserializeOwned>(endpoint: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        ViewerError::PipelineUnavailable(format!("{} returned malformed JSON: {}", endpoint, e))
    })
}

/// Decode each item on its own; items that do not fit `T` are skipped with a warning
fn decode_items<T: DeserializeOwned>(endpoint: &str, items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(endpoint, index, error = %e, "skipping malformed pipeline item");
                None
            }
        })
        .collect()
}

fn parse_outline(value: Value) -> Result<Vec<OutlineEntry>> {
    let response: OutlineResponse = parse_response(TOC_ENDPOINT, value)?;
    Ok(decode_items(TOC_ENDPOINT, response.entries))
}

fn parse_entities(value: Value) -> Result<Vec<Entity>> {
    let response: EntityResponse = parse_response(NER_ENDPOINT, value)?;
    Ok(decode_items(NER_ENDPOINT, response.entities))
}

/// Outline and entities for one document, with any degradation warnings
#[derive(Debug, Default)]
pub struct PipelineData {
    pub outline: Vec<OutlineEntry>,
    pub entities: Vec<Entity>,
    pub warnings: Vec<String>,
}

impl PipelineData {
    /// Empty stub data used in simulate mode
    pub fn simulated() -> Self {
        Self::default()
    }

    /// Fetch both pipelines. Failures degrade to empty data plus a warning.
    pub fn load(source: Option<&dyn PipelineSource>, file_name: &str) -> Self {
        let Some(source) = source else {
            return Self::simulated();
        };

        let mut data = Self::default();

        match source.outline(file_name) {
            Ok(outline) => data.outline = outline,
            Err(e) => data.degrade("TOC", e),
        }
        match source.entities(file_name) {
            Ok(entities) => data.entities = entities,
            Err(e) => data.degrade("NER", e),
        }

        data
    }

    fn degrade(&mut self, what: &str, err: ViewerError) {
        warn!(error = %err, "{} pipeline unavailable, continuing without it", what);
        self.warnings.push(format!("{} unavailable: {}", what, err));
    }
}
