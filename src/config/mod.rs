pub mod cli;
pub mod toml_config;

pub use toml_config::TomlConfig;

/// Joins a base URL and an absolute path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(feature = "cli")]
mod args {
    use super::toml_config::{
        ApiConfig, LoggingConfig, PollingConfig, SubmissionConfig, TomlConfig, DEFAULT_BASE_URL,
        DEFAULT_CORRECTION_PATH, DEFAULT_KEY_PARAM, DEFAULT_LOOKUP_PATH, DEFAULT_REGISTER_PATH,
    };
    use clap::Args;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, Args)]
    pub struct CliConfig {
        /// TOML configuration file. When set, the API and polling flags below are ignored
        #[arg(short, long, global = true)]
        pub config: Option<String>,

        #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
        pub base_url: String,

        #[arg(long, global = true, default_value = DEFAULT_REGISTER_PATH)]
        pub register_path: String,

        #[arg(long, global = true, default_value = DEFAULT_LOOKUP_PATH)]
        pub lookup_path: String,

        #[arg(long, global = true, default_value = DEFAULT_CORRECTION_PATH)]
        pub correction_path: String,

        #[arg(long, global = true, default_value = DEFAULT_KEY_PARAM)]
        pub key_param: String,

        /// Bearer token attached to every request
        #[arg(long, global = true)]
        pub bearer_token: Option<String>,

        #[arg(long, global = true, default_value = "20")]
        pub submit_timeout: u64,

        #[arg(long, global = true, default_value = "6")]
        pub poll_attempts: u32,

        #[arg(long, global = true, default_value = "3000")]
        pub poll_interval_ms: u64,

        #[arg(long, global = true, default_value = "5")]
        pub poll_timeout: u64,

        #[arg(short, long, global = true, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, global = true, help = "Emit logs as JSON lines")]
        pub json_logs: bool,
    }

    impl CliConfig {
        pub fn to_toml_config(&self) -> TomlConfig {
            TomlConfig {
                api: ApiConfig {
                    base_url: self.base_url.clone(),
                    register_path: Some(self.register_path.clone()),
                    lookup_path: Some(self.lookup_path.clone()),
                    correction_path: Some(self.correction_path.clone()),
                    key_param: Some(self.key_param.clone()),
                    bearer_token: self.bearer_token.clone(),
                },
                submission: Some(SubmissionConfig {
                    timeout_seconds: Some(self.submit_timeout),
                }),
                polling: Some(PollingConfig {
                    attempts: Some(self.poll_attempts),
                    interval_ms: Some(self.poll_interval_ms),
                    timeout_seconds: Some(self.poll_timeout),
                }),
                logging: Some(LoggingConfig {
                    verbose: Some(self.verbose),
                    json: Some(self.json_logs),
                }),
            }
        }

        /// The file config when `--config` is given, otherwise the flags.
        pub fn resolve(&self) -> crate::utils::error::Result<TomlConfig> {
            match &self.config {
                Some(path) => TomlConfig::from_file(path),
                None => Ok(self.to_toml_config()),
            }
        }
    }
}

#[cfg(feature = "cli")]
pub use args::CliConfig;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://api.example.org/", "/api/registrations/"),
            "https://api.example.org/api/registrations/"
        );
        assert_eq!(
            join_url("http://localhost:8000", "api/registrations/search/"),
            "http://localhost:8000/api/registrations/search/"
        );
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_cli_flags_map_to_config() {
        use crate::core::ConfigProvider;
        use clap::Parser;

        #[derive(Parser)]
        struct Harness {
            #[command(flatten)]
            config: CliConfig,
        }

        let harness = Harness::parse_from([
            "sherullah-submit",
            "--base-url",
            "http://localhost:8000",
            "--poll-attempts",
            "9",
            "--poll-interval-ms",
            "250",
        ]);
        let config = harness.config.resolve().unwrap();

        assert_eq!(
            config.submit_endpoint(),
            "http://localhost:8000/api/registrations/"
        );
        assert_eq!(config.poll_policy().attempts, 9);
        assert_eq!(
            config.poll_policy().interval,
            std::time::Duration::from_millis(250)
        );
        assert_eq!(config.submission_timeout(), std::time::Duration::from_secs(20));
    }
}
