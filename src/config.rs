//! Service configuration.
//!
//! Settings are read from an optional TOML file, then overridden by
//! environment variables, then validated by [`load_config`]. Every section
//! has defaults, so the service runs with no file at all as long as the
//! model API key is present in the environment.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 5000
//! frontend_url = "https://bccs.club"
//!
//! [documents]
//! paths = ["data/bccsClub.json"]
//!
//! [retrieval]
//! top_k = 3
//!
//! [embedding]
//! provider = "local"
//! model = "multilingual-e5-large"
//!
//! [llm]
//! provider = "gemini"
//! model = "gemini-2.0-flash"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// The single origin allowed to call the API cross-origin.
    #[serde(default)]
    pub frontend_url: Option<String>,
    #[serde(default)]
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            frontend_url: None,
            debug: false,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    #[serde(default = "default_document_paths")]
    pub paths: Vec<PathBuf>,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            paths: default_document_paths(),
        }
    }
}

fn default_document_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("data/bccsClub.json")]
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ValidationConfig {
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    #[serde(default = "default_suspicious_patterns")]
    pub suspicious_patterns: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_input_chars: default_max_input_chars(),
            suspicious_patterns: default_suspicious_patterns(),
        }
    }
}

fn default_max_input_chars() -> usize {
    1000
}

fn default_suspicious_patterns() -> Vec<String> {
    [
        "ignore previous instructions",
        "ignore all instructions",
        "disregard",
        "system prompt",
        "your instructions",
        "your rules",
        "repeat your",
        "what are your instructions",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Base URL for the `ollama` provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            url: None,
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_embedding_model() -> String {
    "multilingual-e5-large".to_string()
}
fn default_batch_size() -> usize {
    32
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the provider API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            temperature: 0.0,
            base_url: default_llm_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_provider() -> String {
    "gemini".to_string()
}
fn default_llm_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_llm_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    120
}

/// Load configuration from `path` (if it exists), apply environment
/// overrides and validate the result.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
///
/// Recognised variables: `FRONTEND_URL`, `APP_DEBUG` (or `FLASK_DEBUG`),
/// `HOST`, `PORT`.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(origin) = lookup("FRONTEND_URL").filter(|v| !v.trim().is_empty()) {
        config.server.frontend_url = Some(origin);
    }
    if let Some(flag) = lookup("APP_DEBUG").or_else(|| lookup("FLASK_DEBUG")) {
        config.server.debug = flag.trim().eq_ignore_ascii_case("true");
    }
    if let Some(host) = lookup("HOST").filter(|v| !v.trim().is_empty()) {
        config.server.host = host;
    }
    if let Some(port) = lookup("PORT") {
        config.server.port = port
            .trim()
            .parse()
            .with_context(|| format!("PORT must be a valid port number, got '{}'", port))?;
    }
    Ok(())
}

fn validate_config(config: &Config) -> Result<()> {
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if config.validation.max_input_chars == 0 {
        anyhow::bail!("validation.max_input_chars must be >= 1");
    }

    if config.documents.paths.is_empty() {
        anyhow::bail!("documents.paths must list at least one file");
    }

    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }

    match config.embedding.provider.as_str() {
        "local" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be local or ollama.",
            other
        ),
    }

    match config.llm.provider.as_str() {
        "gemini" => {}
        other => anyhow::bail!("Unknown llm provider: '{}'. Must be gemini.", other),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.bind_addr(), "0.0.0.0:5000");
        assert!(!config.server.debug);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.validation.max_input_chars, 1000);
        assert_eq!(config.validation.suspicious_patterns.len(), 8);
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(config.llm.temperature, 0.0);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 8080

            [retrieval]
            top_k = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.embedding.provider, "local");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("FRONTEND_URL", "https://bccs.club"),
                ("APP_DEBUG", "TRUE"),
                ("HOST", "127.0.0.1"),
                ("PORT", "7000"),
            ]),
        )
        .unwrap();
        assert_eq!(config.server.frontend_url.as_deref(), Some("https://bccs.club"));
        assert!(config.server.debug);
        assert_eq!(config.server.bind_addr(), "127.0.0.1:7000");
    }

    #[test]
    fn test_flask_debug_fallback_and_false_values() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, env(&[("FLASK_DEBUG", "true")])).unwrap();
        assert!(config.server.debug);

        apply_env_overrides(&mut config, env(&[("APP_DEBUG", "1")])).unwrap();
        assert!(!config.server.debug);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = Config::default();
        let err = apply_env_overrides(&mut config, env(&[("PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = Config::default();
        config.retrieval.top_k = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_providers() {
        let mut config = Config::default();
        config.embedding.provider = "openai".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.llm.provider = "mystery".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.retrieval.top_k, 3);
    }

    #[test]
    fn test_load_config_malformed_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("club.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();
        assert!(load_config(&path).is_err());
    }
}
