use std::fs;
use std::path::{Path, PathBuf};

use llmmit_dirs::Dirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::ai::prompt::DEFAULT_LANGUAGE;
use crate::{AppError, AppResult};

pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Settings for one run, built once at startup and passed by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "openai_api_key")]
    pub api_key: Option<String>,
    /// Override of the provider endpoint, e.g. a local OpenAI-compatible server.
    #[serde(alias = "openai_base_url")]
    pub base_url: Option<String>,
    #[serde(alias = "openai_model")]
    pub model: String,
    #[serde(alias = "openai_temperature")]
    pub temperature: f32,
    pub output_language: String,
    /// Git pathspecs removed from the staged diff.
    #[serde(alias = "ignorePatterns")]
    pub ignore_patterns: Vec<String>,
    /// Send `functions`/`function_call` instead of `tools`/`tool_choice`.
    pub legacy_functions: bool,
    /// Request timeout in seconds. Unset means the HTTP client's default.
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: None,
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            output_language: DEFAULT_LANGUAGE.to_string(),
            ignore_patterns: Vec::new(),
            legacy_functions: false,
            timeout_secs: None,
        }
    }
}

/// Values given on the command line; each one that is set wins over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub output_language: Option<String>,
    pub base_url: Option<String>,
    pub exclude: Vec<String>,
    pub legacy_functions: bool,
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Parse a config file, reporting the JSON path of any type error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let jd = &mut serde_json::Deserializer::from_str(&text);
        serde_path_to_error::deserialize(jd).map_err(|e| {
            AppError::Configuration(format!(
                "{} is not a valid config file: {} at `{}`",
                path.display(),
                e.inner(),
                e.path()
            ))
        })
    }

    /// Resolve the configuration for this run.
    ///
    /// Order, later wins: defaults, `OPENAI_API_KEY`, the config file, CLI
    /// overrides. An explicit `config_path` must exist and parse; a
    /// discovered file that fails to parse is reported and skipped.
    #[tracing::instrument(name = "Loading configuration", level = "debug", skip(overrides))]
    pub fn load(config_path: Option<&Path>, overrides: ConfigOverrides) -> AppResult<Self> {
        let env_key = std::env::var(API_KEY_ENV_VAR).ok();
        let file = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Configuration(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
                Some(Self::from_file(path)?)
            }
            None => Self::discover(&Dirs::from_env().config_candidates()),
        };
        let config = Self::merge(env_key, file, overrides);
        config.validate()?;
        Ok(config)
    }

    fn discover(candidates: &[(llmmit_dirs::ConfigSource, PathBuf)]) -> Option<Self> {
        for (source, path) in candidates {
            if !path.is_file() {
                debug!("No config at {} ({source:?})", path.display());
                continue;
            }
            return match Self::from_file(path) {
                Ok(config) => {
                    info!("Configuration loaded from {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    error!("{e}");
                    error!("Using default configuration.");
                    None
                }
            };
        }
        debug!("No configuration file found. Using defaults.");
        None
    }

    fn merge(env_key: Option<String>, file: Option<Config>, overrides: ConfigOverrides) -> Self {
        let mut config = file.unwrap_or_default();
        if config.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            config.api_key = env_key;
        }
        if let Some(model) = overrides.model {
            config.model = model;
        }
        if let Some(temperature) = overrides.temperature {
            config.temperature = temperature;
        }
        if let Some(language) = overrides.output_language {
            config.output_language = language;
        }
        if let Some(base_url) = overrides.base_url {
            config.base_url = Some(base_url);
        }
        config.ignore_patterns.extend(overrides.exclude);
        config.legacy_functions |= overrides.legacy_functions;
        if overrides.timeout_secs.is_some() {
            config.timeout_secs = overrides.timeout_secs;
        }
        config
    }

    pub fn validate(&self) -> AppResult<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::Configuration(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.model.trim().is_empty() {
            return Err(AppError::Configuration("model must not be empty".to_string()));
        }
        Ok(())
    }

    /// The API key, or a configuration error naming where to set it.
    pub fn api_key(&self) -> AppResult<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AppError::Configuration(format!(
                    "OpenAI API key is missing. Set `api_key` in the config file or the {API_KEY_ENV_VAR} environment variable."
                ))
            })
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmmit_dirs::ConfigSource;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.output_language, "English");
        assert!(config.ignore_patterns.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reads_openai_prefixed_key_names() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            ".llmmitrc",
            r#"{
                "openai_api_key": "sk-file",
                "openai_base_url": "https://example.test/v1",
                "openai_model": "gpt-4.1",
                "openai_temperature": 0.2,
                "output_language": "简体中文",
                "ignorePatterns": ["*.lock", "dist"]
            }"#,
        );
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.api_key().unwrap(), "sk-file");
        assert_eq!(config.base_url(), Some("https://example.test/v1"));
        assert_eq!(config.model, "gpt-4.1");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.output_language, "简体中文");
        assert_eq!(config.ignore_patterns, vec!["*.lock", "dist"]);
    }

    #[test]
    fn type_errors_name_the_field() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "config.json", r#"{"temperature": "hot"}"#);
        match Config::from_file(&path) {
            Err(AppError::Configuration(msg)) => assert!(msg.contains("temperature"), "{msg}"),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn discovery_uses_first_existing_file_and_skips_broken_ones() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        let good = write_file(&dir, "good.json", r#"{"model": "from-good"}"#);
        let found = Config::discover(&[
            (ConfigSource::Xdg, missing),
            (ConfigSource::LegacyRc, good),
        ]);
        assert_eq!(found.unwrap().model, "from-good");

        let broken = write_file(&dir, "broken.json", "{not json");
        let good = dir.path().join("good.json");
        let found = Config::discover(&[
            (ConfigSource::Xdg, broken),
            (ConfigSource::LegacyRc, good),
        ]);
        assert!(found.is_none());
    }

    #[test]
    fn file_key_beats_env_and_overrides_beat_file() {
        let file = Config {
            api_key: Some("sk-file".to_string()),
            model: "file-model".to_string(),
            ignore_patterns: vec!["a".to_string()],
            ..Config::default()
        };
        let overrides = ConfigOverrides {
            model: Some("cli-model".to_string()),
            temperature: Some(0.1),
            exclude: vec!["b".to_string()],
            ..ConfigOverrides::default()
        };
        let config = Config::merge(Some("sk-env".to_string()), Some(file), overrides);
        assert_eq!(config.api_key().unwrap(), "sk-file");
        assert_eq!(config.model, "cli-model");
        assert_eq!(config.temperature, 0.1);
        assert_eq!(config.ignore_patterns, vec!["a", "b"]);
    }

    #[test]
    fn env_key_fills_a_missing_key() {
        let config = Config::merge(Some("sk-env".to_string()), None, ConfigOverrides::default());
        assert_eq!(config.api_key().unwrap(), "sk-env");
    }

    #[test]
    fn blank_key_is_missing() {
        let config = Config {
            api_key: Some("   ".to_string()),
            ..Config::default()
        };
        assert!(matches!(config.api_key(), Err(AppError::Configuration(_))));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.json");
        assert!(matches!(
            Config::load(Some(&path), ConfigOverrides::default()),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let config = Config {
            temperature: 3.5,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Configuration(_))));
    }
}
