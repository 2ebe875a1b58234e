use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ChatError, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_PRIMARY_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.1";
pub const DEFAULT_FALLBACK_MODEL: &str = "HuggingFaceH4/zephyr-7b-beta";
pub const TOKEN_SETTINGS_URL: &str = "https://huggingface.co/settings/tokens";
/// Environment variable that overrides the stored credential.
pub const TOKEN_ENV_VAR: &str = "HF_TOKEN";

const APP_DIR: &str = "pagechat";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub primary_model: Option<String>,
    pub fallback_model: Option<String>,
    pub storage_path: Option<PathBuf>,
    pub max_new_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

/// Fixed generation parameters sent with every inference request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GenerationParameters {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub return_full_text: bool,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            max_new_tokens: 500,
            temperature: 0.7,
            top_p: 0.95,
            return_full_text: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn primary_endpoint(&self) -> String {
        self.endpoint_for(self.primary_model())
    }

    pub fn fallback_endpoint(&self) -> String {
        self.endpoint_for(self.fallback_model())
    }

    pub fn primary_model(&self) -> &str {
        self.primary_model.as_deref().unwrap_or(DEFAULT_PRIMARY_MODEL)
    }

    pub fn fallback_model(&self) -> &str {
        self.fallback_model.as_deref().unwrap_or(DEFAULT_FALLBACK_MODEL)
    }

    pub fn generation_parameters(&self) -> GenerationParameters {
        let defaults = GenerationParameters::default();
        GenerationParameters {
            max_new_tokens: self.max_new_tokens.unwrap_or(defaults.max_new_tokens),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            return_full_text: false,
        }
    }

    /// Location of the durable chat storage file.
    pub fn storage_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.storage_path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| ChatError::Config("Could not determine data directory".to_string()))?;
        Ok(data_dir.join(APP_DIR).join("storage.json"))
    }

    /// Directory for log files written by the TUI.
    pub fn log_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| ChatError::Config("Could not determine data directory".to_string()))?;
        Ok(data_dir.join(APP_DIR).join("logs"))
    }

    /// Credential from the environment, if set and non-empty.
    pub fn env_credential() -> Option<String> {
        std::env::var(TOKEN_ENV_VAR)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    fn endpoint_for(&self, model: &str) -> String {
        let base = self
            .api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/');
        format!("{}/{}", base, model)
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ChatError::Config("Could not determine config directory".to_string()))?;

        Ok(config_dir.join(APP_DIR).join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let config = Config::new();
        assert_eq!(
            config.primary_endpoint(),
            "https://api-inference.huggingface.co/models/mistralai/Mistral-7B-Instruct-v0.1"
        );
        assert_eq!(
            config.fallback_endpoint(),
            "https://api-inference.huggingface.co/models/HuggingFaceH4/zephyr-7b-beta"
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = Config {
            api_base_url: Some("http://127.0.0.1:9000/".to_string()),
            primary_model: Some("a/b".to_string()),
            ..Config::default()
        };
        assert_eq!(config.primary_endpoint(), "http://127.0.0.1:9000/a/b");
    }

    #[test]
    fn test_generation_parameters_defaults_and_overrides() {
        assert_eq!(Config::new().generation_parameters(), GenerationParameters::default());

        let config = Config {
            max_new_tokens: Some(64),
            ..Config::default()
        };
        let params = config.generation_parameters();
        assert_eq!(params.max_new_tokens, 64);
        assert_eq!(params.temperature, 0.7);
        assert!(!params.return_full_text);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            fallback_model: Some("org/model".to_string()),
            storage_path: Some(dir.path().join("store.json")),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.storage_path().unwrap(), dir.path().join("store.json"));
    }
}
