use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use copilot_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run(options: LoadOptions) -> String {
    let overrides = options.overrides.clone();
    let config_file_path = options.config_path.clone().or_else(detect_config_path);

    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, Some(env_key), config_file_doc.as_ref(), config_file_path.as_deref())
    };
    let flag_source = |flag: &str, is_set: bool, key_path: &str, env_key: &str| {
        if is_set {
            return format!("flag ({flag})");
        }
        source(key_path, env_key)
    };
    let logging_source = |key_path: &str, env_key: &str, alias: &str| {
        if env_is_set(alias) && !env_is_set(env_key) {
            return format!("env ({alias})");
        }
        source(key_path, env_key)
    };

    let mut lines =
        vec!["effective config (source precedence: flags > env > file > default):".to_string()];

    lines.push(render_line(
        "service.base_url",
        &config.service.base_url,
        flag_source(
            "--base-url",
            overrides.service_base_url.is_some(),
            "service.base_url",
            "COPILOT_SERVICE_BASE_URL",
        ),
    ));
    lines.push(render_line(
        "service.function_name",
        &config.service.function_name,
        flag_source(
            "--function-name",
            overrides.service_function_name.is_some(),
            "service.function_name",
            "COPILOT_SERVICE_FUNCTION_NAME",
        ),
    ));

    let api_key = config
        .service
        .api_key
        .as_ref()
        .map(|key| redact_key(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    lines.push(render_line(
        "service.api_key",
        &api_key,
        source("service.api_key", "COPILOT_SERVICE_API_KEY"),
    ));

    let timeout = config
        .service
        .timeout_secs
        .map(|secs| secs.to_string())
        .unwrap_or_else(|| "<unset>".to_string());
    lines.push(render_line(
        "service.timeout_secs",
        &timeout,
        source("service.timeout_secs", "COPILOT_SERVICE_TIMEOUT_SECS"),
    ));

    lines.push(render_line(
        "session.locale",
        config.session.locale.as_str(),
        flag_source(
            "--locale",
            overrides.locale.is_some(),
            "session.locale",
            "COPILOT_SESSION_LOCALE",
        ),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        logging_source("logging.level", "COPILOT_LOGGING_LEVEL", "COPILOT_LOG_LEVEL"),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        logging_source("logging.format", "COPILOT_LOGGING_FORMAT", "COPILOT_LOG_FORMAT"),
    ));

    lines.push(format!("- endpoint = {}", config.service.endpoint()));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("copilot.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/copilot.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env_is_set(env_key) {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn env_is_set(key: &str) -> bool {
    env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false)
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    // JWT-style anon keys: keep the header segment, hide the payload.
    if let Some((header, _)) = trimmed.split_once('.') {
        let visible = header.chars().take(6).collect::<String>();
        return format!("{visible}…<redacted>");
    }

    "<redacted>".to_string()
}
