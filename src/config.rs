//! Environment-driven configuration.
//!
//! Everything the layer reads from the environment is loaded through the
//! `from_env()` constructors below, once, during the pre-serve phase. Values
//! are opaque to the core: the database parameters are only handed to the
//! storage hook, and the CORS lists are only turned into response headers.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `GANTRY_HOST` | bind host | `127.0.0.1` |
//! | `GANTRY_PORT` | bind port | `5000` |
//! | `GANTRY_WS_PORT` | websocket upgrade listener port | HTTP port + 1 |
//! | `GANTRY_MODE` | `release` enables release behavior | unset |
//! | `GANTRY_STACK_SIZE` | coroutine stack size, decimal or `0x` hex | `0x4000` |
//! | `GANTRY_DB_HOST` etc. | storage parameters, passed through | empty |
//! | `CORS_ALLOW_ORIGINS/METHODS/HEADERS` | comma-separated allow-lists | permissive set |

use std::env;

pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_X_LOCALE: &str = "x-locale";

/// Storage backend kind selectors. The connection itself is the storage
/// hook's business; the kind is recorded on the registry configuration so
/// the hook can branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    MySql,
    Postgres,
    Memory,
}

impl DbKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbKind::MySql => "mysql",
            DbKind::Postgres => "postgres",
            DbKind::Memory => "memory",
        }
    }
}

/// Runtime settings for the serving phase.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub host: String,
    pub port: u16,
    /// Port for the websocket upgrade listener. Defaults to `port + 1`.
    pub ws_port: u16,
    pub release: bool,
    /// Stack size for handler coroutines in bytes.
    pub stack_size: usize,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let host = env_or("GANTRY_HOST", "127.0.0.1");
        let port: u16 = env::var("GANTRY_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000);
        let ws_port = env::var("GANTRY_WS_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(port.wrapping_add(1));
        let release = env::var("GANTRY_MODE").map(|v| v == "release").unwrap_or(false);
        let stack_size = match env::var("GANTRY_STACK_SIZE") {
            Ok(val) => {
                if let Some(hex) = val.strip_prefix("0x") {
                    usize::from_str_radix(hex, 16).unwrap_or(0x4000)
                } else {
                    val.parse().unwrap_or(0x4000)
                }
            }
            Err(_) => 0x4000,
        };
        RuntimeConfig {
            host,
            port,
            ws_port,
            release,
            stack_size,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ws_addr(&self) -> String {
        format!("{}:{}", self.host, self.ws_port)
    }
}

/// Connection parameters handed to the storage hook, values opaque here.
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub database: String,
    /// Suppress storage-layer logging. Set explicitly via `GANTRY_DB_SILENT`,
    /// otherwise inherited from release mode.
    pub silent: bool,
}

impl DatabaseConfig {
    pub fn from_env(release: bool) -> Self {
        let silent = match env::var("GANTRY_DB_SILENT") {
            Ok(v) => v == "true",
            Err(_) => release,
        };
        DatabaseConfig {
            host: env_or("GANTRY_DB_HOST", ""),
            port: env_or("GANTRY_DB_PORT", ""),
            username: env_or("GANTRY_DB_USERNAME", ""),
            password: env_or("GANTRY_DB_PASSWORD", ""),
            database: env_or("GANTRY_DB_DATABASE", ""),
            silent,
        }
    }
}

/// Cross-origin allow-lists, read once at startup and baked into static
/// response headers.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
}

impl CorsConfig {
    pub fn from_env() -> Self {
        CorsConfig {
            allow_origins: split_or(env::var("CORS_ALLOW_ORIGINS").ok(), &["*"]),
            allow_methods: split_or(
                env::var("CORS_ALLOW_METHODS").ok(),
                &["GET", "POST", "PUT", "DELETE", "PATCH"],
            ),
            allow_headers: split_or(
                env::var("CORS_ALLOW_HEADERS").ok(),
                &["Origin", "Authorization", "Content-Type", "X-Locale"],
            ),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

/// Split a comma-separated allow-list, falling back to the permissive
/// default when the variable is unset or empty.
fn split_or(value: Option<String>, default: &[&str]) -> Vec<String> {
    match value {
        Some(v) if !v.trim().is_empty() => v
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_or_falls_back_on_empty() {
        let v = split_or(None, &["*"]);
        assert_eq!(v, vec!["*".to_string()]);
        let v = split_or(Some("".into()), &["*"]);
        assert_eq!(v, vec!["*".to_string()]);
        let v = split_or(Some("a, b".into()), &["*"]);
        assert_eq!(v, vec!["a".to_string(), "b".to_string()]);
    }
}
