use crate::utils::error::{DashError, Result};
use crate::utils::validation::{validate_path, validate_positive_number, validate_url, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    /// Prefix of the Authorization header value, e.g. `Token` or `Bearer`.
    pub auth_scheme: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    pub output_dir: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DashError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DashError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DASH_SERVER})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| {
            DashError::ConfigError {
                message: format!("env substitution pattern: {}", e),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if let Some(base_url) = &self.server.base_url {
            validate_url("server.base_url", base_url)?;
        }

        if let Some(timeout) = self.server.timeout_seconds {
            validate_positive_number("server.timeout_seconds", timeout, 1)?;
        }

        if let Some(scheme) = &self.server.auth_scheme {
            if scheme.trim().is_empty() || scheme.contains(char::is_whitespace) {
                return Err(DashError::InvalidConfigValueError {
                    field: "server.auth_scheme".to_string(),
                    value: scheme.clone(),
                    reason: "Auth scheme must be a single non-empty word".to_string(),
                });
            }
        }

        if let Some(path) = &self.session.path {
            validate_path("session.path", path)?;
        }

        if let Some(dir) = &self.report.output_dir {
            validate_path("report.output_dir", dir)?;
        }

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[server]
base_url = "http://localhost:8000"
timeout_seconds = 15
auth_scheme = "Bearer"

[session]
path = "/tmp/dash-session.json"

[report]
output_dir = "./reports"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.server.base_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.server.timeout_seconds, Some(15));
        assert_eq!(config.server.auth_scheme.as_deref(), Some("Bearer"));
        assert_eq!(config.report.output_dir.as_deref(), Some("./reports"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_default() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert!(config.server.base_url.is_none());
        assert!(config.session.path.is_none());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("DASH_TEST_SERVER_URL", "https://dash.example.com");

        let toml_content = r#"
[server]
base_url = "${DASH_TEST_SERVER_URL}"
auth_scheme = "${DASH_TEST_UNSET_VARIABLE}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.server.base_url.as_deref(),
            Some("https://dash.example.com")
        );
        assert_eq!(
            config.server.auth_scheme.as_deref(),
            Some("${DASH_TEST_UNSET_VARIABLE}")
        );

        std::env::remove_var("DASH_TEST_SERVER_URL");
    }

    #[test]
    fn test_config_validation() {
        let config = TomlConfig::from_toml_str(
            r#"
[server]
base_url = "invalid-url"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str(
            r#"
[server]
timeout_seconds = 0
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str(
            r#"
[server]
auth_scheme = "Token extra"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[server").unwrap_err();
        assert!(matches!(err, DashError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[report]\noutput_dir = \"./out\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.report.output_dir.as_deref(), Some("./out"));
    }
}
