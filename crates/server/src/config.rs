use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Verification queue tuning.
#[derive(Clone, Debug, Deserialize)]
pub struct QueueConfig {
    /// Upper bound on simultaneously outstanding provider calls during a drain.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Behavioural toggles of the SMTP based verification provider.
#[derive(Clone, Debug, Deserialize)]
pub struct VerifierConfig {
    /// Open a live SMTP session against the domain's MX hosts.
    #[serde(default = "default_true")]
    pub smtp_check: bool,
    #[serde(default = "default_true")]
    pub disposable_check: bool,
    /// Try a random local part to detect accept-all domains.
    #[serde(default = "default_true")]
    pub catch_all_check: bool,
    #[serde(default = "default_true")]
    pub domain_suggest: bool,
    #[serde(default = "default_true")]
    pub gravatar_check: bool,
    /// Name announced in `HELO`.
    #[serde(default = "default_hello_name")]
    pub hello_name: String,
    /// Envelope sender used for `MAIL FROM`.
    #[serde(default = "default_from_email")]
    pub from_email: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            smtp_check: true,
            disposable_check: true,
            catch_all_check: true,
            domain_suggest: true,
            gravatar_check: true,
            hello_name: default_hello_name(),
            from_email: default_from_email(),
            smtp_port: default_smtp_port(),
            connect_timeout_secs: default_connect_timeout_secs(),
            operation_timeout_secs: default_operation_timeout_secs(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub verifier: VerifierConfig,
}

fn default_true() -> bool {
    true
}

fn default_max_concurrency() -> usize {
    10
}

fn default_listen_addr() -> String {
    "0.0.0.0:30001".to_string()
}

fn default_hello_name() -> String {
    "localhost".to_string()
}

fn default_from_email() -> String {
    "verify@localhost".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_operation_timeout_secs() -> u64 {
    10
}

impl AppConfig {
    /// Checks invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.max_concurrency == 0 {
            return Err(ConfigError::Validation(
                "queue.max_concurrency must be > 0".into(),
            ));
        }
        if self.verifier.smtp_check {
            if !self.verifier.from_email.contains('@') {
                return Err(ConfigError::Validation(
                    "verifier.from_email must be an email address".into(),
                ));
            }
            if self.verifier.hello_name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "verifier.hello_name must not be empty".into(),
                ));
            }
            if self.verifier.smtp_port == 0 {
                return Err(ConfigError::Validation(
                    "verifier.smtp_port must be > 0".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// Any environment variable matching the key path separated by double
/// underscores (e.g. `QUEUE__MAX_CONCURRENCY`) overrides the file value. A
/// `.env` file in the working directory is loaded first.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let _ = dotenvy::dotenv();
    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml"))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// Convenience helper for binaries wanting panic-on-error behaviour.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".into(),
            listen_addr: default_listen_addr(),
            queue: QueueConfig::default(),
            verifier: VerifierConfig::default(),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(base().validate().is_ok());
        assert_eq!(base().queue.max_concurrency, 10);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let mut cfg = base();
        cfg.queue.max_concurrency = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn sender_only_checked_with_smtp_enabled() {
        let mut cfg = base();
        cfg.verifier.from_email = "nobody".into();
        assert!(cfg.validate().is_err());

        cfg.verifier.smtp_check = false;
        assert!(cfg.validate().is_ok());
    }
}
