use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::Level;

/// Phrases that mark a generated answer as uncertain. The answer prompt asks the
/// model to reply "I don't know." so the first entry must stay in sync with it.
pub const DEFAULT_UNCERTAINTY_MARKERS: &[&str] =
    &["i don't know", "i do not know", "i'm not sure", "i am not sure"];

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub recipes_path: PathBuf,
    pub ollama_url: String,
    pub generation_model: String,
    pub embedding_model: String,
    pub search_url: String,
    pub search_api_key: Option<String>,
    pub top_k: usize,
    pub request_timeout: Duration,
    pub uncertainty_markers: Vec<String>,
    pub log_level: Level,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            recipes_path: PathBuf::from("recipes.json"),
            ollama_url: "http://localhost:11434".to_string(),
            generation_model: "qwen2.5:latest".to_string(),
            embedding_model: "all-minilm".to_string(),
            search_url: "https://s.jina.ai/".to_string(),
            search_api_key: None,
            top_k: 3,
            request_timeout: Duration::from_secs(120),
            uncertainty_markers: DEFAULT_UNCERTAINTY_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            log_level: Level::INFO,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; unset keys keep their defaults.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get("RECIPES_PATH") {
            settings.recipes_path = PathBuf::from(path);
        }
        if let Some(url) = get("OLLAMA_BASE_URL") {
            settings.ollama_url = url;
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            settings.generation_model = model;
        }
        if let Some(model) = get("OLLAMA_EMBED_MODEL") {
            settings.embedding_model = model;
        }
        if let Some(url) = get("SEARCH_URL") {
            settings.search_url = url;
        }
        settings.search_api_key = get("SEARCH_API_KEY");
        if let Some(k) = get("TOP_K") {
            settings.top_k = parse_var("TOP_K", &k)?;
        }
        if let Some(secs) = get("REQUEST_TIMEOUT_SECS") {
            settings.request_timeout = Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECS", &secs)?);
        }
        if let Some(markers) = get("UNCERTAINTY_MARKERS") {
            settings.uncertainty_markers = parse_markers(&markers);
            anyhow::ensure!(
                !settings.uncertainty_markers.is_empty(),
                "UNCERTAINTY_MARKERS must contain at least one phrase"
            );
        }
        if let Some(level) = get("LOG_LEVEL") {
            settings.log_level = parse_var("LOG_LEVEL", &level)?;
        }

        Ok(settings)
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("invalid value for {}: {:?}", key, raw))
}

/// Comma-separated phrases, lowercased, blanks dropped.
fn parse_markers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings_with(vars: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let settings = settings_with(&[]).unwrap();
        assert_eq!(settings.top_k, 3);
        assert_eq!(settings.generation_model, "qwen2.5:latest");
        assert_eq!(settings.request_timeout, Duration::from_secs(120));
        assert_eq!(settings.uncertainty_markers.len(), 4);
        assert!(settings.search_api_key.is_none());
    }

    #[test]
    fn test_overrides_are_applied() {
        let settings = settings_with(&[
            ("TOP_K", "5"),
            ("REQUEST_TIMEOUT_SECS", "10"),
            ("SEARCH_API_KEY", "secret"),
            ("LOG_LEVEL", "debug"),
        ])
        .unwrap();
        assert_eq!(settings.top_k, 5);
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
        assert_eq!(settings.search_api_key.as_deref(), Some("secret"));
        assert_eq!(settings.log_level, Level::DEBUG);
    }

    #[test]
    fn test_bad_number_names_the_variable() {
        let err = settings_with(&[("TOP_K", "three")]).unwrap_err();
        assert!(err.to_string().contains("TOP_K"));
    }

    #[test]
    fn test_markers_are_lowercased_and_trimmed() {
        let settings =
            settings_with(&[("UNCERTAINTY_MARKERS", " No Idea , ,Can't Say ")]).unwrap();
        assert_eq!(settings.uncertainty_markers, vec!["no idea", "can't say"]);
    }

    #[test]
    fn test_marker_override_must_not_be_empty() {
        assert!(settings_with(&[("UNCERTAINTY_MARKERS", " , ,")]).is_err());
    }
}
