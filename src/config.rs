use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub shortener: ShortenerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend name: "memory" or "redis".
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// Collection (key namespace) holding the short link documents.
    #[serde(default = "default_store_collection")]
    pub collection: String,
    #[serde(default)]
    pub redis: RedisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortenerConfig {
    /// Upper bound on token-collision probes per create before the request
    /// fails with a retries-exhausted error.
    #[serde(default = "default_max_token_attempts")]
    pub max_token_attempts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "text" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Log file path; empty or absent means stdout.
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub enable_rotation: bool,
    #[serde(default = "default_max_backups")]
    pub max_backups: u64,
}

// Default value functions
fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_store_collection() -> String {
    "shortener".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_redis_key_prefix() -> String {
    "snaplink:".to_string()
}

fn default_max_token_attempts() -> usize {
    16
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u64 {
    7
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            shortener: ShortenerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            collection: default_store_collection(),
            redis: RedisConfig::default(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
        }
    }
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            max_token_attempts: default_max_token_attempts(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            enable_rotation: false,
            max_backups: default_max_backups(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file with environment variable
    /// overrides (environment wins).
    pub fn load() -> Self {
        let mut config = Self::load_from_file();
        config.override_with_env();
        config
    }

    fn load_from_file() -> Self {
        let config_paths = [
            "config.toml",
            "snaplink.toml",
            "config/config.toml",
            "/etc/snaplink/config.toml",
        ];

        for path in &config_paths {
            if let Some(config) = Self::parse_file(Path::new(path)) {
                debug!("Loaded config from: {}", path);
                return config;
            }
        }

        debug!("No config file found, using defaults");
        Self::default()
    }

    fn parse_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            }
        }
    }

    fn override_with_env(&mut self) {
        if let Ok(host) = env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("SERVER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            } else {
                error!("Invalid SERVER_PORT: {}", port);
            }
        }

        if let Ok(backend) = env::var("STORE_BACKEND") {
            self.store.backend = backend;
        }
        if let Ok(collection) = env::var("STORE_COLLECTION") {
            self.store.collection = collection;
        }
        if let Ok(url) = env::var("REDIS_URL") {
            self.store.redis.url = url;
        }
        if let Ok(prefix) = env::var("REDIS_KEY_PREFIX") {
            self.store.redis.key_prefix = prefix;
        }

        if let Ok(attempts) = env::var("MAX_TOKEN_ATTEMPTS") {
            if let Ok(attempts) = attempts.parse() {
                self.shortener.max_token_attempts = attempts;
            } else {
                error!("Invalid MAX_TOKEN_ATTEMPTS: {}", attempts);
            }
        }

        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(file) = env::var("LOG_FILE") {
            self.logging.file = Some(file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.store.collection, "shortener");
        assert_eq!(config.shortener.max_token_attempts, 16);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[server]\nport = 9001\n\n[store]\nbackend = \"redis\"\n"
        )
        .expect("write config");

        let config = AppConfig::parse_file(file.path()).expect("parse config");
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.store.backend, "redis");
        assert_eq!(config.store.redis.key_prefix, "snaplink:");
        assert_eq!(config.shortener.max_token_attempts, 16);
    }

    #[test]
    fn environment_overrides_win() {
        // SAFETY: no other test in this binary reads these variables.
        unsafe {
            env::set_var("SERVER_PORT", "9002");
            env::set_var("STORE_BACKEND", "redis");
            env::set_var("MAX_TOKEN_ATTEMPTS", "3");
        }

        let mut config = AppConfig::default();
        config.override_with_env();

        unsafe {
            env::remove_var("SERVER_PORT");
            env::remove_var("STORE_BACKEND");
            env::remove_var("MAX_TOKEN_ATTEMPTS");
        }

        assert_eq!(config.server.port, 9002);
        assert_eq!(config.store.backend, "redis");
        assert_eq!(config.shortener.max_token_attempts, 3);
    }

    #[test]
    fn invalid_toml_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[server\nport = ").expect("write config");

        assert!(AppConfig::parse_file(file.path()).is_none());
    }
}
