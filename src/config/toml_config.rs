use crate::config::join_url;
use crate::core::{ConfigProvider, PollPolicy};
use crate::utils::error::{Result, SubmitError};
use crate::utils::validation::{
    validate_endpoint_path, validate_positive_number, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.madrasjamaatportal.org";
pub const DEFAULT_REGISTER_PATH: &str = "/api/registrations/";
pub const DEFAULT_LOOKUP_PATH: &str = "/api/registrations/search/";
pub const DEFAULT_CORRECTION_PATH: &str = "/api/corrections/";
pub const DEFAULT_KEY_PARAM: &str = "its";
pub const DEFAULT_SUBMISSION_TIMEOUT_SECONDS: u64 = 20;
pub const MAX_POLL_ATTEMPTS: u32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub api: ApiConfig,
    pub submission: Option<SubmissionConfig>,
    pub polling: Option<PollingConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub register_path: Option<String>,
    pub lookup_path: Option<String>,
    pub correction_path: Option<String>,
    pub key_param: Option<String>,
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    pub attempts: Option<u32>,
    pub interval_ms: Option<u64>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                register_path: None,
                lookup_path: None,
                correction_path: None,
                key_param: None,
                bearer_token: None,
            },
            submission: None,
            polling: None,
            logging: None,
        }
    }
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SubmitError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SubmitError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value. Unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SubmitError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("api.base_url", &self.api.base_url)?;
        validate_endpoint_path("api.register_path", self.register_path())?;
        validate_endpoint_path("api.lookup_path", self.lookup_path())?;
        validate_endpoint_path("api.correction_path", self.correction_path())?;

        if self.key_param().trim().is_empty() {
            return Err(SubmitError::MissingConfigError {
                field: "api.key_param".to_string(),
            });
        }

        validate_positive_number(
            "submission.timeout_seconds",
            self.submission_timeout().as_secs(),
            1,
        )?;

        let policy = self.poll_policy();
        validate_range("polling.attempts", policy.attempts, 1, MAX_POLL_ATTEMPTS)?;
        validate_positive_number("polling.timeout_seconds", policy.timeout.as_secs(), 1)?;

        Ok(())
    }

    pub fn register_path(&self) -> &str {
        self.api
            .register_path
            .as_deref()
            .unwrap_or(DEFAULT_REGISTER_PATH)
    }

    pub fn lookup_path(&self) -> &str {
        self.api.lookup_path.as_deref().unwrap_or(DEFAULT_LOOKUP_PATH)
    }

    pub fn correction_path(&self) -> &str {
        self.api
            .correction_path
            .as_deref()
            .unwrap_or(DEFAULT_CORRECTION_PATH)
    }

    pub fn verbose_logging(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.verbose)
            .unwrap_or(false)
    }

    pub fn json_logging(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn submit_endpoint(&self) -> String {
        join_url(&self.api.base_url, self.register_path())
    }

    fn lookup_endpoint(&self) -> String {
        join_url(&self.api.base_url, self.lookup_path())
    }

    fn correction_endpoint(&self) -> String {
        join_url(&self.api.base_url, self.correction_path())
    }

    fn key_param(&self) -> &str {
        self.api.key_param.as_deref().unwrap_or(DEFAULT_KEY_PARAM)
    }

    fn submission_timeout(&self) -> Duration {
        let seconds = self
            .submission
            .as_ref()
            .and_then(|s| s.timeout_seconds)
            .unwrap_or(DEFAULT_SUBMISSION_TIMEOUT_SECONDS);
        Duration::from_secs(seconds)
    }

    fn poll_policy(&self) -> PollPolicy {
        let defaults = PollPolicy::default();
        match &self.polling {
            Some(polling) => PollPolicy {
                attempts: polling.attempts.unwrap_or(defaults.attempts),
                interval: polling
                    .interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.interval),
                timeout: polling
                    .timeout_seconds
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.timeout),
            },
            None => defaults,
        }
    }

    fn bearer_token(&self) -> Option<&str> {
        self.api
            .bearer_token
            .as_deref()
            .filter(|token| !token.trim().is_empty() && !token.starts_with("${"))
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
    fn test_parse_full_config() {
        let toml_content = r#"
[api]
base_url = "https://api.example.org/"
register_path = "/api/registrations/"
lookup_path = "/api/registrations/search/"
key_param = "its"

[submission]
timeout_seconds = 30

[polling]
attempts = 8
interval_ms = 2000
timeout_seconds = 4

[logging]
json = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(
            config.submit_endpoint(),
            "https://api.example.org/api/registrations/"
        );
        assert_eq!(
            config.lookup_endpoint(),
            "https://api.example.org/api/registrations/search/"
        );
        assert_eq!(config.submission_timeout(), Duration::from_secs(30));
        assert_eq!(
            config.poll_policy(),
            PollPolicy {
                attempts: 8,
                interval: Duration::from_secs(2),
                timeout: Duration::from_secs(4),
            }
        );
        assert!(config.json_logging());
        assert!(!config.verbose_logging());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_for_minimal_config() {
        let config = TomlConfig::from_toml_str("[api]\nbase_url = \"http://localhost:8000\"\n").unwrap();

        assert_eq!(config.key_param(), "its");
        assert_eq!(
            config.correction_endpoint(),
            "http://localhost:8000/api/corrections/"
        );
        assert_eq!(config.submission_timeout(), Duration::from_secs(20));
        assert_eq!(config.poll_policy(), PollPolicy::default());
        assert_eq!(config.bearer_token(), None);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SHERULLAH_TEST_TOKEN", "secret-token");

        let toml_content = r#"
[api]
base_url = "https://api.example.org"
bearer_token = "${SHERULLAH_TEST_TOKEN}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.bearer_token(), Some("secret-token"));

        std::env::remove_var("SHERULLAH_TEST_TOKEN");
    }

    #[test]
    fn test_unresolved_token_is_ignored() {
        let toml_content = r#"
[api]
base_url = "https://api.example.org"
bearer_token = "${SHERULLAH_TOKEN_THAT_IS_NOT_SET}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.bearer_token(), None);
    }

    #[test]
    fn test_config_validation() {
        let invalid_url = TomlConfig::from_toml_str("[api]\nbase_url = \"invalid-url\"\n").unwrap();
        assert!(invalid_url.validate().is_err());

        let zero_attempts = TomlConfig::from_toml_str(
            "[api]\nbase_url = \"https://api.example.org\"\n[polling]\nattempts = 0\n",
        )
        .unwrap();
        assert!(zero_attempts.validate().is_err());

        let bad_path = TomlConfig::from_toml_str(
            "[api]\nbase_url = \"https://api.example.org\"\nregister_path = \"api/registrations/\"\n",
        )
        .unwrap();
        assert!(bad_path.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[api]\nbase_url = \"https://api.example.org\"\n[polling]\nattempts = 10\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.poll_policy().attempts, 10);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = TomlConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, SubmitError::IoError(_)));
    }
}
