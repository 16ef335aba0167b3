use config::{Config, ConfigError, Environment, File, Map, Source, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration file picked up when no `--config` path is given
pub const DEFAULT_CONFIG_PATH: &str = "config/backend.toml";

/// Prefix of environment overrides, e.g. `HYLIUM_RPC__URL`
pub const ENV_PREFIX: &str = "HYLIUM";

/// Flat variable names used by existing `.env` deployments
const LEGACY_ENV_KEYS: [(&str, &str); 6] = [
    ("HYLIUM_RPC_URL", "rpc.url"),
    ("HYLIUM_RPC_USER", "rpc.user"),
    ("HYLIUM_RPC_PASS", "rpc.pass"),
    ("PORT", "server.port"),
    ("CORS_ORIGIN", "server.cors_origin"),
    ("RATE_LIMIT_MAX", "rate_limit.max_requests"),
];

/// Legacy rate limit window, in milliseconds
const LEGACY_WINDOW_MS: &str = "RATE_LIMIT_WINDOW_MS";

#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BackendConfig {
    pub server: ServerConfig,
    pub rpc: RpcConfig,
    pub stats: StatsConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Single origin allowed by CORS ("*" allows any)
    pub cors_origin: String,
    pub max_json_payload_bytes: usize,
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
}

/// Upstream node connection. Durations are in seconds.
#[derive(Serialize, Deserialize, Clone)]
pub struct RpcConfig {
    pub url: String,
    pub user: String,
    pub pass: String,
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    pub max_response_bytes: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StatsConfig {
    #[serde(with = "duration_serde")]
    pub cache_ttl: Duration,
}

/// Fixed-window limit applied per client address
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(with = "duration_serde")]
    pub window: Duration,
    pub max_requests: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.port == 0 {
            return Err(ConfigValidationError::InvalidPort(
                "server.port cannot be 0".to_string(),
            ));
        }
        if self.bind_address.trim().is_empty() {
            return Err(ConfigValidationError::MissingField(
                "server.bind_address".to_string(),
            ));
        }
        if self.cors_origin.trim().is_empty() {
            return Err(ConfigValidationError::MissingField(
                "server.cors_origin".to_string(),
            ));
        }
        if self.cors_origin != "*"
            && !(self.cors_origin.starts_with("http://") || self.cors_origin.starts_with("https://"))
        {
            return Err(ConfigValidationError::InvalidValue(format!(
                "server.cors_origin must be \"*\" or an http(s) origin: got '{}'",
                self.cors_origin
            )));
        }
        if self.max_json_payload_bytes == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "server.max_json_payload_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl RpcConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.url.trim().is_empty() {
            return Err(ConfigValidationError::MissingField("rpc.url".to_string()));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ConfigValidationError::InvalidValue(format!(
                "rpc.url must be an http(s) URL: got '{}'",
                self.url
            )));
        }
        if self.timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(ConfigValidationError::InvalidValue(
                "rpc.timeout and rpc.connect_timeout must be greater than 0".to_string(),
            ));
        }
        if self.max_response_bytes == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "rpc.max_response_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl StatsConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.cache_ttl.is_zero() {
            return Err(ConfigValidationError::InvalidValue(
                "stats.cache_ttl must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl RateLimitConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.window.is_zero() || self.max_requests == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "rate_limit.window and rate_limit.max_requests must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3001,
            cors_origin: "http://localhost:5173".to_string(),
            max_json_payload_bytes: 10 * 1024,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8332".to_string(),
            user: String::new(),
            pass: String::new(),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            max_response_bytes: 4 * 1024 * 1024,
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            max_requests: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl fmt::Debug for RpcConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("pass", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("max_response_bytes", &self.max_response_bytes)
            .finish()
    }
}

impl BackendConfig {
    /// Layer defaults, the configuration file and environment variables,
    /// then validate the result.
    ///
    /// Flat legacy names (`HYLIUM_RPC_URL`, `PORT`, ...) override the file;
    /// `HYLIUM_*` names with `__` separators override both. An explicit
    /// `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, std::env::vars().collect())
    }

    /// As [`BackendConfig::load`], reading variables from `vars`.
    fn load_with_env(path: Option<&Path>, vars: Map<String, String>) -> Result<Self, ConfigError> {
        let mut config = Config::builder();
        config = config.add_source(Config::try_from(&Self::default())?);

        match path {
            Some(path) => {
                config = config.add_source(File::from(path).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    config = config.add_source(File::from(default_path.as_path()).required(false));
                }
            }
        }

        // values stay strings until deserialized, so "007" is not read as 7
        config = config.add_source(LegacyEnvironment::from_vars(&vars));
        config = config.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(Some(vars)),
        );

        let config: BackendConfig = config.build()?.try_deserialize()?;
        if let Err(e) = config.validate() {
            return Err(ConfigError::Message(format!("Configuration validation error: {e}")));
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.server.validate()?;
        self.rpc.validate()?;
        self.stats.validate()?;
        self.rate_limit.validate()?;
        Ok(())
    }
}

/// Source reading the flat variable names of earlier deployments
#[derive(Debug, Clone)]
struct LegacyEnvironment {
    vars: Map<String, String>,
}

impl LegacyEnvironment {
    fn from_vars(vars: &Map<String, String>) -> Self {
        let vars = LEGACY_ENV_KEYS
            .iter()
            .map(|(name, _)| *name)
            .chain(std::iter::once(LEGACY_WINDOW_MS))
            .filter_map(|name| vars.get(name).map(|value| (name.to_string(), value.clone())))
            .filter(|(_, value)| !value.is_empty())
            .collect();
        Self { vars }
    }
}

impl Source for LegacyEnvironment {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, ConfigError> {
        let origin = "the environment".to_string();
        let mut values = Map::new();

        for (name, key) in LEGACY_ENV_KEYS {
            if let Some(value) = self.vars.get(name) {
                values.insert(key.to_string(), Value::new(Some(&origin), value.as_str()));
            }
        }

        if let Some(window_ms) = self.vars.get(LEGACY_WINDOW_MS) {
            let window_ms: u64 = window_ms.trim().parse().map_err(|e| {
                ConfigError::Message(format!(
                    "{LEGACY_WINDOW_MS} must be a number of milliseconds: {e}"
                ))
            })?;
            let window_secs = window_ms.saturating_add(999) / 1000;
            values.insert(
                "rate_limit.window".to_string(),
                Value::new(Some(&origin), window_secs),
            );
        }

        Ok(values)
    }
}
