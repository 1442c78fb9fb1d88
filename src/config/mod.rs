#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};
pub use toml_config::TomlConfig;

use crate::adapters::http::DEFAULT_AUTH_SCHEME;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_url, Validate,
};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_OUTPUT_DIR: &str = "./output";

/// Values given explicitly on the command line; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub session_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

/// Fully resolved configuration: flags, then the TOML file, then defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub auth_scheme: String,
    pub timeout_secs: u64,
    pub session_path: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(None, &Overrides::default())
    }
}

impl Settings {
    pub fn resolve(file: Option<&TomlConfig>, overrides: &Overrides) -> Self {
        let server = file.map(|f| &f.server);

        let base_url = overrides
            .base_url
            .clone()
            .or_else(|| server.and_then(|s| s.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let session_path = overrides
            .session_file
            .clone()
            .or_else(|| file.and_then(|f| f.session.path.as_ref().map(PathBuf::from)))
            .unwrap_or_else(default_session_path);

        let output_dir = overrides
            .output_dir
            .clone()
            .or_else(|| file.and_then(|f| f.report.output_dir.as_ref().map(PathBuf::from)))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        Self {
            base_url,
            auth_scheme: server
                .and_then(|s| s.auth_scheme.clone())
                .unwrap_or_else(|| DEFAULT_AUTH_SCHEME.to_string()),
            timeout_secs: server
                .and_then(|s| s.timeout_seconds)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            session_path,
            output_dir,
        }
    }

    /// Same as [`Settings::resolve`] but reads the TOML file first.
    pub fn load(config_file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let file = match config_file {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                let file = TomlConfig::from_file(path)?;
                file.validate()?;
                Some(file)
            }
            None => None,
        };
        Ok(Self::resolve(file.as_ref(), overrides))
    }
}

/// `<config dir>/equipment-dash/session.json`, or a dotfile in the working
/// directory when the platform has no config dir.
pub fn default_session_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("equipment-dash").join("session.json"))
        .unwrap_or_else(|| PathBuf::from(".equipment-dash-session.json"))
}

impl ConfigProvider for Settings {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_scheme(&self) -> &str {
        &self.auth_scheme
    }

    fn request_timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    fn session_path(&self) -> &Path {
        &self.session_path
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("base_url", &self.base_url)?;
        validate_non_empty_string("auth_scheme", &self.auth_scheme)?;
        validate_positive_number("timeout_secs", self.timeout_secs, 1)?;
        validate_path("session_file", &self.session_path.to_string_lossy())?;
        validate_path("output_dir", &self.output_dir.to_string_lossy())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.auth_scheme, "Token");
        assert_eq!(settings.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(settings.session_path.ends_with("session.json"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_flags_override_file() {
        let file = TomlConfig::from_toml_str(
            r#"
[server]
base_url = "http://file.example.com"
auth_scheme = "Bearer"

[report]
output_dir = "./from-file"
"#,
        )
        .unwrap();

        let overrides = Overrides {
            base_url: Some("http://flag.example.com".into()),
            ..Default::default()
        };
        let settings = Settings::resolve(Some(&file), &overrides);

        assert_eq!(settings.base_url, "http://flag.example.com");
        assert_eq!(settings.auth_scheme, "Bearer");
        assert_eq!(settings.output_dir, PathBuf::from("./from-file"));
    }

    #[test]
    fn test_invalid_base_url_fails_validation() {
        let settings = Settings::resolve(
            None,
            &Overrides {
                base_url: Some("ftp://nope".into()),
                ..Default::default()
            },
        );
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dash.toml");
        std::fs::write(&path, "[session]\npath = \"/tmp/s.json\"\n").unwrap();

        let settings = Settings::load(Some(&path), &Overrides::default()).unwrap();
        assert_eq!(settings.session_path, PathBuf::from("/tmp/s.json"));

        assert!(Settings::load(Some(&dir.path().join("missing.toml")), &Overrides::default()).is_err());
    }
}
