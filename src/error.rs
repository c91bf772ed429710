use std::fmt;

/// Errors raised while turning registered declarations into a running
/// service or generated client bindings.
///
/// Every variant is unrecoverable by design: registration happens once at
/// startup, so a bad pattern or missing metadata means the process should
/// abort rather than serve a partially configured routing table. Request-time
/// failures never surface here; they are absorbed by the [`Context`]
/// response lifecycle.
///
/// [`Context`]: crate::context::Context
#[derive(Debug)]
pub enum ConfigError {
    /// A middleware match/skip pattern failed to compile as a regex.
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
    /// A cron descriptor carried an unparsable schedule pattern.
    InvalidCronPattern { pattern: String, message: String },
    /// The storage hook reported a connection/setup failure.
    Storage(anyhow::Error),
    /// An endpoint carries client-codegen metadata without a function name.
    MissingFunctionName { path: String },
    /// An endpoint with client-codegen metadata uses a verb the generated
    /// transport cannot express.
    UnsupportedMethod { method: http::Method, path: String },
    /// Filesystem failure while writing generated bindings.
    Io(std::io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPattern { pattern, source } => {
                write!(f, "invalid middleware pattern {pattern:?}: {source}")
            }
            ConfigError::InvalidCronPattern { pattern, message } => {
                write!(f, "invalid cron pattern {pattern:?}: {message}")
            }
            ConfigError::Storage(err) => write!(f, "storage configuration failed: {err}"),
            ConfigError::MissingFunctionName { path } => {
                write!(f, "client codegen: function name is empty for {path}")
            }
            ConfigError::UnsupportedMethod { method, path } => {
                write!(f, "client codegen: unsupported method {method} for {path}")
            }
            ConfigError::Io(err) => write!(f, "client codegen: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPattern { source, .. } => Some(source),
            ConfigError::Storage(err) => Some(err.as_ref()),
            ConfigError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}
