use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use wxdecode_core::{ErrorPolicy, Processor, DEFAULT_MAX_WEATHER};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "WXDECODE_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Batch policy for reports that fail to decode
    pub errors: Option<ErrorPolicy>,
    /// Resolve TAF change groups before returning them
    pub propagate: Option<bool>,
    /// Weather groups given their own columns when flattening
    pub max_weather: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub decode: Option<DecodeConfig>,
    pub http: Option<HttpConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppConfig {
    /// Load configuration from WXDECODE_CONFIG path (TOML) if present, with reasonable defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(path)
    }

    /// Load configuration from `path`; a missing file yields the defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let cfg = if path.exists() {
            let s = fs::read_to_string(path)?;
            toml::from_str::<AppConfig>(&s)?
        } else {
            AppConfig::default()
        };
        Ok(cfg)
    }

    /// Get HTTP bind address (default 0.0.0.0:8080)
    pub fn http_bind(&self) -> String {
        self.http
            .as_ref()
            .and_then(|h| h.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
    }

    /// Batch error policy (default ignore)
    pub fn error_policy(&self) -> ErrorPolicy {
        self.decode
            .as_ref()
            .and_then(|d| d.errors)
            .unwrap_or_default()
    }

    /// Whether TAF forecasts are propagated (default true)
    pub fn propagate(&self) -> bool {
        self.decode
            .as_ref()
            .and_then(|d| d.propagate)
            .unwrap_or(true)
    }

    /// Weather groups kept when flattening (default 2)
    pub fn max_weather(&self) -> usize {
        self.decode
            .as_ref()
            .and_then(|d| d.max_weather)
            .unwrap_or(DEFAULT_MAX_WEATHER)
    }

    /// Batch processor configured from the `[decode]` section
    pub fn processor(&self) -> Processor {
        Processor {
            policy: self.error_policy(),
            propagate: self.propagate(),
            max_weather: self.max_weather(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.http_bind(), "0.0.0.0:8080");
        assert_eq!(cfg.error_policy(), ErrorPolicy::Ignore);
        assert!(cfg.propagate());
        assert_eq!(cfg.max_weather(), 2);
        assert_eq!(cfg.processor(), Processor::default());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[decode]
errors = "raise"
propagate = false
max_weather = 3

[http]
bind = "127.0.0.1:9000"
"#
        )
        .unwrap();

        let cfg = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(cfg.http_bind(), "127.0.0.1:9000");
        assert_eq!(cfg.error_policy(), ErrorPolicy::Raise);
        assert!(!cfg.propagate());
        assert_eq!(cfg.max_weather(), 3);
    }

    #[test]
    fn partial_section_keeps_defaults() {
        let cfg: AppConfig = toml::from_str("[decode]\nmax_weather = 1\n").unwrap();
        assert_eq!(cfg.max_weather(), 1);
        assert!(cfg.propagate());
        assert_eq!(cfg.http_bind(), "0.0.0.0:8080");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[decode]\nerrors = \"panic\"\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::Toml(_))
        ));
    }
}
