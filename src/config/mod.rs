use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_USER: &str = "user";
const DEFAULT_DB_PASSWORD: &str = "password";
const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_NAME: &str = "db_name";
const DEFAULT_TEST_DB_NAME: &str = "test_db_name";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── ObservabilityConfig ─────────────────────────────────────────────────────

/// Observability configuration (`[observability]` in taskd.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log statements that exceed this threshold (milliseconds). Default: 1000.
    /// Set to 0 to disable slow statement logging.
    pub slow_query_threshold_ms: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold_ms: 1000,
        }
    }
}

// ─── DatabaseConfig ──────────────────────────────────────────────────────────

/// Connection settings for the task table.
///
/// The environment variables follow the PostgreSQL container convention, so
/// the compose file that provisions the database also configures the service:
/// `POSTGRES_USER`, `POSTGRES_PASSWORD`, `DB_HOST`, `DB_PORT`, `POSTGRES_DB`,
/// plus `TEST_DB_NAME` / `TESTING` to swap in the test database and
/// `DATABASE_URL` to override everything at once.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    /// Resolved database name: the test name when `TESTING` is truthy.
    pub database: String,
    /// Pool size (`max_connections` under `[database]` in taskd.toml).
    pub max_connections: u32,
    /// Full connection string override; wins over the per-field settings.
    pub url: Option<String>,
}

impl DatabaseConfig {
    /// Merge environment variables over the TOML section. Env wins.
    fn resolve(toml: TomlDatabase) -> Self {
        let user = env_var("POSTGRES_USER")
            .or(toml.user)
            .unwrap_or_else(|| DEFAULT_DB_USER.to_string());
        let password = env_var("POSTGRES_PASSWORD")
            .or(toml.password)
            .unwrap_or_else(|| DEFAULT_DB_PASSWORD.to_string());
        let host = env_var("DB_HOST")
            .or(toml.host)
            .unwrap_or_else(|| DEFAULT_DB_HOST.to_string());
        let port = env_var("DB_PORT")
            .and_then(|v| v.parse().ok())
            .or(toml.port)
            .unwrap_or(DEFAULT_DB_PORT);

        let name = env_var("POSTGRES_DB")
            .or(toml.name)
            .unwrap_or_else(|| DEFAULT_DB_NAME.to_string());
        let test_name = env_var("TEST_DB_NAME")
            .or(toml.test_name)
            .unwrap_or_else(|| DEFAULT_TEST_DB_NAME.to_string());
        let database = if testing_enabled() { test_name } else { name };

        let max_connections = toml.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let url = env_var("DATABASE_URL").or(toml.url);

        Self {
            user,
            password,
            host,
            port,
            database,
            max_connections,
            url,
        }
    }

    /// Config that connects through a full URL. Used by tests and one-off
    /// tools that already have a connection string.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            user: DEFAULT_DB_USER.to_string(),
            password: DEFAULT_DB_PASSWORD.to_string(),
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            database: DEFAULT_DB_NAME.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            url: Some(url.into()),
        }
    }
}

/// Read an environment variable, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// `TESTING=true` (case-insensitive) or `TESTING=1` selects the test database.
fn testing_enabled() -> bool {
    match env_var("TESTING") {
        Some(v) => {
            let v = v.to_ascii_lowercase();
            v == "true" || v == "1"
        }
        None => false,
    }
}

// ─── TOML config file ────────────────────────────────────────────────────────

/// `[database]` section; all fields are optional overrides.
#[derive(Deserialize, Default)]
struct TomlDatabase {
    /// Database user (default: "user").
    user: Option<String>,
    /// Database password (default: "password").
    password: Option<String>,
    /// Database host (default: "localhost").
    host: Option<String>,
    /// Database port (default: 5432).
    port: Option<u16>,
    /// Production database name (default: "db_name").
    name: Option<String>,
    /// Test database name, used when `TESTING` is set (default: "test_db_name").
    test_name: Option<String>,
    /// Connection pool size (default: 10).
    max_connections: Option<u32>,
    /// Full connection URL; overrides every other field here.
    url: Option<String>,
}

/// `taskd.toml` at the path given by `--config`; all fields are optional
/// overrides. Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// HTTP server port (default: 8000).
    port: Option<u16>,
    /// Bind address for the HTTP server (default: "127.0.0.1"; use "0.0.0.0" for LAN access).
    bind_address: Option<String>,
    /// Log level filter string, e.g. "debug", "info,taskd=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "compact" (default, human-readable) | "json" (structured for log aggregators).
    log_format: Option<String>,
    /// Database connection settings (`[database]`).
    database: Option<TomlDatabase>,
    /// Observability configuration (`[observability]`).
    observability: Option<ObservabilityConfig>,
}

fn load_toml(path: &Path) -> Option<TomlConfig> {
    let contents = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config file, using defaults");
            None
        }
    }
}

// ─── ServiceConfig ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    /// Bind address for the HTTP server (TASKD_BIND env var, default: "127.0.0.1").
    pub bind_address: String,
    /// Log level filter string (TASKD_LOG env var, default: "info").
    pub log: String,
    /// Log output format: "compact" (default) | "json".
    pub log_format: String,
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Observability: slow statement threshold.
    pub observability: ObservabilityConfig,
}

impl ServiceConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env var, passed as `Some(value)` from clap
    ///   2. TOML file at `config_file`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        bind_address: Option<String>,
        log: Option<String>,
        log_format: Option<String>,
        config_file: &Path,
    ) -> Self {
        // Load TOML as the lowest-priority override layer
        let toml = load_toml(config_file).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let bind_address = bind_address
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());
        let log_format = log_format
            .or(toml.log_format)
            .unwrap_or_else(|| "compact".to_string());

        let database = DatabaseConfig::resolve(toml.database.unwrap_or_default());
        let observability = toml.observability.unwrap_or_default();

        Self {
            port,
            bind_address,
            log,
            log_format,
            database,
            observability,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_values_win() {
        let cfg = ServiceConfig::new(
            Some(9100),
            Some("0.0.0.0".to_string()),
            Some("debug".to_string()),
            Some("json".to_string()),
            Path::new("/nonexistent/taskd.toml"),
        );
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.bind_address, "0.0.0.0");
        assert_eq!(cfg.log, "debug");
        assert_eq!(cfg.log_format, "json");
    }

    #[test]
    fn test_defaults_without_file() {
        let cfg = ServiceConfig::new(None, None, None, None, Path::new("/nonexistent/taskd.toml"));
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.bind_address, "127.0.0.1");
        assert_eq!(cfg.log, "info");
        assert_eq!(cfg.log_format, "compact");
        assert_eq!(
            cfg.observability.slow_query_threshold_ms,
            ObservabilityConfig::default().slow_query_threshold_ms
        );
    }

    #[test]
    fn test_toml_sections_parse() {
        let toml: TomlConfig = toml::from_str(
            r#"
            port = 8100
            log_format = "json"

            [database]
            host = "db.internal"
            name = "tasks"
            max_connections = 4

            [observability]
            slow_query_threshold_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(toml.port, Some(8100));
        assert_eq!(toml.log_format.as_deref(), Some("json"));
        let db = toml.database.unwrap();
        assert_eq!(db.host.as_deref(), Some("db.internal"));
        assert_eq!(db.name.as_deref(), Some("tasks"));
        assert_eq!(db.max_connections, Some(4));
        assert_eq!(toml.observability.unwrap().slow_query_threshold_ms, 250);
    }
}
