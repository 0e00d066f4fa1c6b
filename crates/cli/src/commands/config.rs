use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;
use transpak_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILES};

struct ConfigField {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl ConfigField {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec![
        "effective config (source precedence: env > file > default):".to_string(),
    ];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<ConfigField> {
    let secret_state = |present: bool| if present { "<redacted>" } else { "<unset>" };

    vec![
        ConfigField::new(
            "database.url",
            &config.database.url,
            &["TRANSPAK_DATABASE_URL", "DATABASE_URL"],
        ),
        ConfigField::new(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["TRANSPAK_DATABASE_MAX_CONNECTIONS"],
        ),
        ConfigField::new(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["TRANSPAK_DATABASE_TIMEOUT_SECS"],
        ),
        ConfigField::new("llm.provider", config.llm.provider.as_str(), &["TRANSPAK_LLM_PROVIDER"]),
        ConfigField::new("llm.model", &config.llm.model, &["TRANSPAK_LLM_MODEL"]),
        ConfigField::new(
            "llm.base_url",
            config.llm.resolved_base_url().unwrap_or_else(|| "<unset>".to_string()),
            &["TRANSPAK_LLM_BASE_URL"],
        ),
        ConfigField::new(
            "llm.api_key",
            secret_state(config.llm.has_api_key()),
            &["TRANSPAK_LLM_API_KEY", "OPENAI_API_KEY"],
        ),
        ConfigField::new(
            "llm.timeout_secs",
            config.llm.timeout_secs.to_string(),
            &["TRANSPAK_LLM_TIMEOUT_SECS"],
        ),
        ConfigField::new(
            "llm.max_retries",
            config.llm.max_retries.to_string(),
            &["TRANSPAK_LLM_MAX_RETRIES"],
        ),
        ConfigField::new(
            "server.bind_address",
            &config.server.bind_address,
            &["TRANSPAK_SERVER_BIND_ADDRESS"],
        ),
        ConfigField::new("server.port", config.server.port.to_string(), &["TRANSPAK_SERVER_PORT"]),
        ConfigField::new(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["TRANSPAK_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        ConfigField::new(
            "security.session_secret",
            secret_state(config.security.session_secret.is_some()),
            &["TRANSPAK_SESSION_SECRET", "SESSION_SECRET"],
        ),
        ConfigField::new(
            "rate_limit.generate_quote_per_minute",
            config.rate_limit.generate_quote_per_minute.to_string(),
            &["TRANSPAK_RATE_LIMIT_GENERATE_QUOTE_PER_MINUTE"],
        ),
        ConfigField::new(
            "rate_limit.window_secs",
            config.rate_limit.window_secs.to_string(),
            &["TRANSPAK_RATE_LIMIT_WINDOW_SECS"],
        ),
        ConfigField::new(
            "cache.ttl_secs",
            config.cache.ttl_secs.to_string(),
            &["TRANSPAK_CACHE_TTL_SECS"],
        ),
        ConfigField::new(
            "cache.max_entries",
            config.cache.max_entries.to_string(),
            &["TRANSPAK_CACHE_MAX_ENTRIES"],
        ),
        ConfigField::new(
            "logging.level",
            &config.logging.level,
            &["TRANSPAK_LOGGING_LEVEL", "TRANSPAK_LOG_LEVEL"],
        ),
        ConfigField::new(
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["TRANSPAK_LOGGING_FORMAT", "TRANSPAK_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    DEFAULT_CONFIG_FILES.iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
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
