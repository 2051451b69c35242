use serde::Deserialize;

use crate::services::adjustment::FormulaVariant;
use crate::services::history::PersistPolicy;

pub const CONFIG_ENV: &str = "PV_PREDICT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

fn default_port() -> u16 { 8080 }
fn default_history_path() -> String { "data/calculated_results.csv".to_string() }
fn default_language() -> String { "en".to_string() }
fn default_translation_endpoint() -> String { "http://localhost:5000/translate".to_string() }
fn default_timeout_ms() -> u64 { 3000 }

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub formula: FormulaConfig,
    #[serde(default)]
    pub localization: LocalizationConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: String,
    #[serde(default)]
    pub policy: PersistPolicy,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { path: default_history_path(), policy: PersistPolicy::default() }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FormulaConfig {
    /// Variant used when neither the session nor the request names one
    #[serde(default)]
    pub default_variant: FormulaVariant,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocalizationConfig {
    #[serde(default = "default_language")]
    pub default_language: String,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self { default_language: default_language() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranslationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_translation_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_translation_endpoint(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// `$PV_PREDICT_CONFIG`, else `config.json`.
    pub fn path_from_env() -> String {
        std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }
}
