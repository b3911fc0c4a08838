use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PIPELINE_BASE: &str = "https://foundry.api.dod.mil";
const DEFAULT_PIPELINE_TOKEN: &str = "###-token-###";

pub const DEFAULT_MAX_DISTANCE: u8 = 1;
pub const MAX_EDIT_DISTANCE: u8 = 5;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const ENV_PIPELINE_BASE: &str = "DOCMARK_PIPELINE_BASE";
const ENV_PIPELINE_TOKEN: &str = "DOCMARK_PIPELINE_TOKEN";
const ENV_DB: &str = "DOCMARK_DB";
const ENV_PDFIUM_DIR: &str = "DOCMARK_PDFIUM_DIR";

/// Runtime settings, resolved from the environment and then overridden by CLI flags
#[derive(Debug, Clone)]
pub struct Config {
    pub pipeline_base: String,
    pub pipeline_token: String,
    pub db_path: Option<PathBuf>,
    pub pdfium_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub simulate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline_base: DEFAULT_PIPELINE_BASE.to_string(),
            pipeline_token: DEFAULT_PIPELINE_TOKEN.to_string(),
            db_path: default_db_path(),
            pdfium_dir: None,
            timeout: REQUEST_TIMEOUT,
            simulate: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup, so tests don't have to touch the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(base) = lookup(ENV_PIPELINE_BASE).filter(|v| !v.is_empty()) {
            config.pipeline_base = base.trim_end_matches('/').to_string();
        }
        if let Some(token) = lookup(ENV_PIPELINE_TOKEN) {
            config.pipeline_token = token;
        }
        if let Some(db) = lookup(ENV_DB).filter(|v| !v.is_empty()) {
            config.db_path = Some(PathBuf::from(db));
        }
        if let Some(dir) = lookup(ENV_PDFIUM_DIR).filter(|v| !v.is_empty()) {
            config.pdfium_dir = Some(PathBuf::from(dir));
        }

        config
    }
}

/// Returns the default path to the term/comment store
pub fn default_db_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("docmark").join("store.db"))
}

/// Clamp a user supplied edit distance into the supported 0..=5 range
pub fn clamp_distance(distance: u8) -> u8 {
    distance.min(MAX_EDIT_DISTANCE)
}
