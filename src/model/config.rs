use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

const DEFAULTS: &str = include_str!("../../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub editor: EditorConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    pub data_dir: String,
    pub default_theme: String,
    pub status_ttl_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditorConfig {
    pub scroll_off: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key. `API_KEY` is tried as a fallback.
    pub api_key_env: String,
    pub max_input_chars: usize,
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config.
    pub fn load() -> Result<Self> {
        let mut config = Self::defaults()?;

        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "inkpad") {
            let config_path = proj_dirs.config_dir().join("config.toml");
            if config_path.exists() {
                let user_str = fs::read_to_string(&config_path)?;
                config = toml::from_str(&user_str)?;
                tracing::info!("loaded user config from {}", config_path.display());
            }
        }

        if config.general.data_dir.starts_with('~') {
            let home = dirs_home().ok_or_else(|| anyhow!("cannot determine home directory"))?;
            config.general.data_dir =
                config
                    .general
                    .data_dir
                    .replacen('~', &home.to_string_lossy(), 1);
        }

        Ok(config)
    }

    /// The embedded defaults, without user overrides or `~` expansion.
    pub fn defaults() -> Result<Self> {
        Ok(toml::from_str(DEFAULTS)?)
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.general.data_dir)
    }

    /// Resolve the API key from the environment; empty values count as unset.
    pub fn api_key(&self) -> Option<String> {
        [self.ai.api_key_env.as_str(), "API_KEY"]
            .into_iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse() {
        let config = AppConfig::defaults().unwrap();
        assert_eq!(config.general.default_theme, "dark");
        assert_eq!(config.ai.max_input_chars, 5000);
        assert!(config.ai.enabled);
    }
}
