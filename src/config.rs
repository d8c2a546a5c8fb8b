//! Assistant configuration: TOML file, environment overrides, defaults.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "llama3.2:latest";
pub const DEFAULT_SEARCH_URL: &str = "https://html.duckduckgo.com/html/?q={query}";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Configuration for the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Base URL of the Ollama server
    pub ollama_url: String,

    /// Chat model name
    pub model: String,

    pub chat_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub page_load_timeout_secs: u64,
    pub command_timeout_secs: u64,

    /// Pause after navigation before reading the page
    pub page_settle_ms: u64,

    pub screenshot_dir: PathBuf,

    /// Intents below this are left to the language model
    pub min_action_confidence: f32,

    /// Rolling conversation history length, in messages
    pub history_limit: usize,

    /// How many news sources a summary visits
    pub news_sites_per_summary: usize,

    /// Search URL template, `{query}` is replaced with the encoded query
    pub search_url: String,

    pub user_agent: String,

    pub log_level: String,

    /// Extra site name -> URL entries merged over the built-in lexicon
    pub sites: BTreeMap<String, String>,

    /// Extra program alias -> launch command entries
    pub programs: BTreeMap<String, String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            chat_timeout_secs: 120,
            probe_timeout_secs: 5,
            page_load_timeout_secs: 10,
            command_timeout_secs: 10,
            page_settle_ms: 0,
            screenshot_dir: PathBuf::from("screenshots"),
            min_action_confidence: 0.6,
            history_limit: 40,
            news_sites_per_summary: 2,
            search_url: DEFAULT_SEARCH_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            log_level: "info".to_string(),
            sites: BTreeMap::new(),
            programs: BTreeMap::new(),
        }
    }
}

impl AssistantConfig {
    /// Load from a TOML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `OLLAMA_URL` / `OLLAMA_MODEL` when set and non-empty
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("OLLAMA_URL").ok(),
            std::env::var("OLLAMA_MODEL").ok(),
        );
    }

    fn apply_overrides(&mut self, url: Option<String>, model: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.ollama_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            self.model = model.trim().to_string();
        }
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::default();
        assert_eq!(config.ollama_url, "http://127.0.0.1:11434");
        assert_eq!(config.model, "llama3.2:latest");
        assert_eq!(config.chat_timeout(), Duration::from_secs(120));
        assert_eq!(config.min_action_confidence, 0.6);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AssistantConfig::from_toml(
            r#"
            model = "mistral:7b"
            page_settle_ms = 1500

            [sites]
            "hacker news" = "https://news.ycombinator.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.model, "mistral:7b");
        assert_eq!(config.page_settle(), Duration::from_millis(1500));
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
        assert_eq!(
            config.sites.get("hacker news").map(String::as_str),
            Some("https://news.ycombinator.com")
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "history_limit = 12").unwrap();

        let config = AssistantConfig::load(file.path()).unwrap();
        assert_eq!(config.history_limit, 12);
    }

    #[test]
    fn test_load_missing_file() {
        let err = AssistantConfig::load(Path::new("/nonexistent/deskpilot.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let err = AssistantConfig::from_toml("history_limit = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_overrides_ignore_blank_values() {
        let mut config = AssistantConfig::default();
        config.apply_overrides(Some("http://gpu-box:11434/".to_string()), Some("  ".to_string()));

        assert_eq!(config.ollama_url, "http://gpu-box:11434");
        assert_eq!(config.model, DEFAULT_MODEL);
    }
}
