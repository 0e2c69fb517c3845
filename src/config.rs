//! User [`Config`], read from a TOML file and the environment.

use std::{
    fs,
    num::NonZeroU16,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{animation::Animation, requester, Client, Model, Request};

/// Overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "DEEPASK_CONFIG";
/// Overrides [`Config::base_url`].
pub const BASE_URL_ENV_VAR: &str = "DEEPSEEK_BASE_URL";
/// Overrides [`Config::data_dir`].
pub const DATA_DIR_ENV_VAR: &str = "DEEPASK_DATA_DIR";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    #[allow(missing_docs)]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has a key of the wrong type.
    #[error("Failed to parse config file '{path}': {source}")]
    #[allow(missing_docs)]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range.
    #[error("Config validation failed: {message}")]
    #[allow(missing_docs)]
    ValidationError { message: String },
}

/// Settings for every invocation. Every key is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API base URL.
    pub base_url: String,
    /// Model to ask.
    pub model: Model,
    /// Sampling temperature, between 0 and 2.
    pub temperature: f32,
    /// Maximum generated tokens. Must not be zero.
    pub max_tokens: u16,
    /// Stream answers as they are generated.
    pub stream: bool,
    /// Status animation.
    pub animation: Animation,
    /// Pause after each streamed character, in milliseconds.
    pub typing_delay_ms: u64,
    /// Where the question log and the word store live. See
    /// [`Config::data_dir`].
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Client::DEFAULT_URL.to_string(),
            model: Model::default(),
            temperature: Request::DEFAULT_TEMPERATURE,
            max_tokens: Request::DEFAULT_MAX_TOKENS,
            stream: false,
            animation: Animation::default(),
            typing_delay_ms: requester::TYPING_DELAY.as_millis() as u64,
            data_dir: None,
        }
    }
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// `$DEEPASK_CONFIG` if set, otherwise `deepask/config.toml` inside
    /// [`dirs::config_dir`] (the current directory if there is none).
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return PathBuf::from(path);
        }
        let config_dir =
            dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("deepask").join("config.toml")
    }

    /// Loads configuration from the default config file, then applies
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`.
    ///
    /// - If the file doesn't exist, returns `Config::default()`.
    /// - If the file exists, parses it as TOML and validates.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            #[cfg(feature = "log")]
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            })?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides. `lookup` returns the value of a variable.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BASE_URL_ENV_VAR).filter(|s| !s.is_empty()) {
            self.base_url = url;
        }
        if let Some(dir) = lookup(DATA_DIR_ENV_VAR).filter(|s| !s.is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - The base URL is an http(s) URL
    /// - The temperature is between 0 and 2
    /// - At least one token may be generated
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://")
            || self.base_url.starts_with("https://"))
        {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "base_url '{}' is not an http(s) URL",
                    self.base_url
                ),
            });
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "temperature {} is outside 0 to 2",
                    self.temperature
                ),
            });
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_tokens must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Directory for the question log and the word store: the configured
    /// one, or `deepask` inside [`dirs::data_dir`].
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("deepask")
        })
    }

    /// Pause after each streamed character.
    pub fn typing_delay(&self) -> Duration {
        Duration::from_millis(self.typing_delay_ms)
    }

    /// Request template with the model and sampling settings.
    pub fn request(&self) -> Result<Request, ConfigError> {
        let max_tokens = NonZeroU16::new(self.max_tokens).ok_or_else(|| {
            ConfigError::ValidationError {
                message: "max_tokens must be at least 1".to_string(),
            }
        })?;

        Ok(Request::default()
            .model(self.model)
            .temperature(self.temperature)
            .max_tokens(max_tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.stream);
        assert_eq!(config.typing_delay(), Duration::from_millis(20));
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
model = "deepseek-reasoner"
stream = true
animation = "dots"
data_dir = "/tmp/deepask"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model, Model::Reasoner);
        assert!(config.stream);
        assert_eq!(config.animation, Animation::Dots);
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/deepask"));
        assert_eq!(config.base_url, Client::DEFAULT_URL);
        assert_eq!(config.max_tokens, Request::DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "stream = maybe").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_validation() {
        let config = Config {
            temperature: 2.5,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { .. })
        ));

        let config = Config {
            max_tokens: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
        assert!(config.request().is_err());

        let config = Config {
            base_url: "api.deepseek.com".into(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|name| match name {
            BASE_URL_ENV_VAR => Some("http://localhost:9000".into()),
            DATA_DIR_ENV_VAR => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.base_url, "http://localhost:9000");
        // Empty values are ignored.
        assert_eq!(config.data_dir, None);
    }

    #[test]
    fn test_request_template() {
        let config = Config {
            model: Model::Reasoner,
            temperature: 1.0,
            max_tokens: 64,
            ..Config::default()
        };
        let request = config.request().unwrap();
        assert_eq!(request.model, Model::Reasoner);
        assert_eq!(request.temperature, Some(1.0));
        assert_eq!(request.max_tokens.get(), 64);
        assert!(request.messages.is_empty());
    }
}
