use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::locale::Locale;

pub const DEFAULT_FUNCTION_NAME: &str = "copilot-recommend";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base_url: String,
    pub function_name: String,
    pub api_key: Option<SecretString>,
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub locale: Locale,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub service_base_url: Option<String>,
    pub service_function_name: Option<String>,
    pub locale: Option<Locale>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                base_url: "http://localhost:54321".to_string(),
                function_name: DEFAULT_FUNCTION_NAME.to_string(),
                api_key: None,
                timeout_secs: None,
            },
            session: SessionConfig { locale: Locale::default() },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl ServiceConfig {
    /// Full URL of the recommendation function.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/functions/v1/{}",
            self.base_url.trim_end_matches('/'),
            self.function_name.trim_matches('/')
        )
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("copilot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(service) = patch.service {
            if let Some(base_url) = service.base_url {
                self.service.base_url = base_url;
            }
            if let Some(function_name) = service.function_name {
                self.service.function_name = function_name;
            }
            if let Some(api_key_value) = service.api_key {
                self.service.api_key = Some(secret_value(api_key_value));
            }
            if let Some(timeout_secs) = service.timeout_secs {
                self.service.timeout_secs = Some(timeout_secs);
            }
        }

        if let Some(session) = patch.session {
            if let Some(locale) = session.locale {
                self.session.locale = locale;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COPILOT_SERVICE_BASE_URL") {
            self.service.base_url = value;
        }
        if let Some(value) = read_env("COPILOT_SERVICE_FUNCTION_NAME") {
            self.service.function_name = value;
        }
        if let Some(value) = read_env("COPILOT_SERVICE_API_KEY") {
            self.service.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("COPILOT_SERVICE_TIMEOUT_SECS") {
            self.service.timeout_secs = Some(parse_u64("COPILOT_SERVICE_TIMEOUT_SECS", &value)?);
        }

        if let Some(value) = read_env("COPILOT_SESSION_LOCALE") {
            self.session.locale = value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "COPILOT_SESSION_LOCALE".to_string(),
                value: value.clone(),
            })?;
        }

        let log_level = read_env("COPILOT_LOGGING_LEVEL").or_else(|| read_env("COPILOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COPILOT_LOGGING_FORMAT").or_else(|| read_env("COPILOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.service_base_url {
            self.service.base_url = base_url;
        }
        if let Some(function_name) = overrides.service_function_name {
            self.service.function_name = function_name;
        }
        if let Some(locale) = overrides.locale {
            self.session.locale = locale;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_service(&self.service)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("copilot.toml"), PathBuf::from("config/copilot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_service(service: &ServiceConfig) -> Result<(), ConfigError> {
    let base_url = service.base_url.trim();
    if base_url.is_empty() {
        return Err(ConfigError::Validation("service.base_url is required".to_string()));
    }
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "service.base_url must start with http:// or https://".to_string(),
        ));
    }

    let function_name = service.function_name.trim().trim_matches('/');
    if function_name.is_empty() || function_name.contains('/') {
        return Err(ConfigError::Validation(
            "service.function_name must be a single non-empty path segment".to_string(),
        ));
    }

    if let Some(timeout_secs) = service.timeout_secs {
        if timeout_secs == 0 || timeout_secs > 300 {
            return Err(ConfigError::Validation(
                "service.timeout_secs must be in range 1..=300 when set".to_string(),
            ));
        }
    }

    let blank_key =
        service.api_key.as_ref().map(|key| key.expose_secret().trim().is_empty()).unwrap_or(false);
    if blank_key {
        return Err(ConfigError::Validation(
            "service.api_key is set but empty; remove it or provide the project anon key"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    service: Option<ServicePatch>,
    session: Option<SessionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServicePatch {
    base_url: Option<String>,
    function_name: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    locale: Option<Locale>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
