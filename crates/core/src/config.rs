//! Runtime configuration: defaults, then an optional TOML file, then `TRANSPAK_*`
//! environment variables, then programmatic overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["transpak.toml", "config/transpak.toml"];
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: "sqlite://transpak.db".to_string(), max_connections: 5, timeout_secs: 30 }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    #[serde(deserialize_with = "secret")]
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Offline,
            api_key: None,
            base_url: None,
            model: "gpt-4o".to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl LlmConfig {
    /// Explicit base URL, else the provider's conventional OpenAI-compatible endpoint.
    pub fn resolved_base_url(&self) -> Option<String> {
        if let Some(url) = self.base_url.as_ref().filter(|url| !url.trim().is_empty()) {
            return Some(url.trim_end_matches('/').to_string());
        }
        match self.provider {
            LlmProvider::OpenAi => Some(OPENAI_BASE_URL.to_string()),
            LlmProvider::Ollama => Some(OLLAMA_BASE_URL.to_string()),
            LlmProvider::Offline => None,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty())
    }

    /// Readiness label reported by `/health` and `doctor`.
    pub fn readiness(&self) -> &'static str {
        match self.provider {
            LlmProvider::Offline => "offline",
            LlmProvider::OpenAi if !self.has_api_key() => "no_api_key",
            LlmProvider::OpenAi | LlmProvider::Ollama => "available",
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "127.0.0.1".to_string(), port: 5000, graceful_shutdown_secs: 15 }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    #[serde(deserialize_with = "secret")]
    pub session_secret: Option<SecretString>,
}

/// Quote generation allowance per client.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub generate_quote_per_minute: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { generate_quote_per_minute: 5, window_secs: 60 }
    }
}

/// Narration cache bounds.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 86_400, max_entries: 1_000 }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    Offline,
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "offline" => Ok(Self::Offline),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected offline|openai|ollama)"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
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

/// Values that win over file and environment, e.g. from tests or the CLI.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let explicit = options.config_path.as_deref();
        let mut config = match find_config_file(explicit) {
            Some(path) => read_file(&path)?,
            None => Self::default(),
        };

        config.apply_env()?;
        set(&mut config.database.url, options.overrides.database_url);
        set(&mut config.logging.level, options.overrides.log_level);
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        let database = &mut self.database;
        set(&mut database.url, env_text("TRANSPAK_DATABASE_URL", "DATABASE_URL"));
        set(&mut database.max_connections, env_parsed("TRANSPAK_DATABASE_MAX_CONNECTIONS")?);
        set(&mut database.timeout_secs, env_parsed("TRANSPAK_DATABASE_TIMEOUT_SECS")?);

        let llm = &mut self.llm;
        set(&mut llm.provider, env_parsed("TRANSPAK_LLM_PROVIDER")?);
        if let Some(key) = env_text("TRANSPAK_LLM_API_KEY", "OPENAI_API_KEY") {
            llm.api_key = Some(key.into());
        }
        if let Some(url) = read_env("TRANSPAK_LLM_BASE_URL") {
            llm.base_url = Some(url);
        }
        set(&mut llm.model, read_env("TRANSPAK_LLM_MODEL"));
        set(&mut llm.timeout_secs, env_parsed("TRANSPAK_LLM_TIMEOUT_SECS")?);
        set(&mut llm.max_retries, env_parsed("TRANSPAK_LLM_MAX_RETRIES")?);

        let server = &mut self.server;
        set(&mut server.bind_address, read_env("TRANSPAK_SERVER_BIND_ADDRESS"));
        set(&mut server.port, env_parsed("TRANSPAK_SERVER_PORT")?);
        set(
            &mut server.graceful_shutdown_secs,
            env_parsed("TRANSPAK_SERVER_GRACEFUL_SHUTDOWN_SECS")?,
        );

        if let Some(secret) = env_text("TRANSPAK_SESSION_SECRET", "SESSION_SECRET") {
            self.security.session_secret = Some(secret.into());
        }

        set(
            &mut self.rate_limit.generate_quote_per_minute,
            env_parsed("TRANSPAK_RATE_LIMIT_GENERATE_QUOTE_PER_MINUTE")?,
        );
        set(&mut self.rate_limit.window_secs, env_parsed("TRANSPAK_RATE_LIMIT_WINDOW_SECS")?);
        set(&mut self.cache.ttl_secs, env_parsed("TRANSPAK_CACHE_TTL_SECS")?);
        set(&mut self.cache.max_entries, env_parsed("TRANSPAK_CACHE_MAX_ENTRIES")?);

        set(&mut self.logging.level, env_text("TRANSPAK_LOGGING_LEVEL", "TRANSPAK_LOG_LEVEL"));
        if let Some(format) = env_text("TRANSPAK_LOGGING_FORMAT", "TRANSPAK_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (database, llm, server) = (&self.database, &self.llm, &self.server);
        let url = database.url.trim();
        let secret_len = self
            .security
            .session_secret
            .as_ref()
            .map(|secret| secret.expose_secret().trim().chars().count());
        let level = self.logging.level.trim().to_ascii_lowercase();

        let checks = [
            (
                url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:",
                "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)",
            ),
            (database.max_connections > 0, "database.max_connections must be greater than zero"),
            (
                (1..=300).contains(&database.timeout_secs),
                "database.timeout_secs must be in range 1..=300",
            ),
            ((1..=300).contains(&llm.timeout_secs), "llm.timeout_secs must be in range 1..=300"),
            (
                llm.provider == LlmProvider::Offline || !llm.model.trim().is_empty(),
                "llm.model is required when an llm provider is enabled",
            ),
            (
                llm.base_url.as_ref().map_or(true, |url| {
                    url.starts_with("http://") || url.starts_with("https://")
                }),
                "llm.base_url must start with http:// or https://",
            ),
            (server.port > 0, "server.port must be greater than zero"),
            (
                server.graceful_shutdown_secs > 0,
                "server.graceful_shutdown_secs must be greater than zero",
            ),
            (
                secret_len.map_or(true, |len| len >= 16),
                "security.session_secret must be at least 16 characters",
            ),
            (
                self.rate_limit.generate_quote_per_minute > 0,
                "rate_limit.generate_quote_per_minute must be greater than zero",
            ),
            (self.rate_limit.window_secs > 0, "rate_limit.window_secs must be greater than zero"),
            (self.cache.max_entries > 0, "cache.max_entries must be greater than zero"),
            (
                matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error"),
                "logging.level must be one of trace|debug|info|warn|error",
            ),
        ];

        match checks.into_iter().find(|(ok, _)| !ok) {
            Some((_, message)) => Err(ConfigError::Validation(message.to_string())),
            None => Ok(()),
        }
    }
}

/// Explicit path when it exists, else the first conventional location that does.
fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => DEFAULT_CONFIG_FILES.iter().map(PathBuf::from).find(|path| path.exists()),
    }
}

fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&interpolate_env_vars(&raw)?)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Replaces every `${NAME}` with the value of that environment variable.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &after[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }
    output.push_str(rest);
    Ok(output)
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// `key`, falling back to the conventional unprefixed name.
fn env_text(key: &str, fallback: &str) -> Option<String> {
    read_env(key).or_else(|| read_env(fallback))
}

fn env_parsed<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    read_env(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value })
        })
        .transpose()
}
