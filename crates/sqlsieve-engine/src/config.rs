//! Engine configuration.

use std::str::FromStr;

use sqlsieve_core::{CompilerOptions, QueryError, Result};

/// Default pool size for [`crate::connect`].
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Runtime configuration for an [`crate::Engine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Statement compilation options.
    pub compiler: CompilerOptions,
    /// Run insert/upsert chunks one after another instead of concurrently.
    pub sequential_chunks: bool,
    /// Decode text cells holding a JSON object or array into structured values.
    pub parse_json_text: bool,
    /// Maximum pool connections.
    pub max_connections: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compiler: CompilerOptions::default(),
            sequential_chunks: false,
            parse_json_text: true,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl EngineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the compiler options.
    #[must_use]
    pub fn compiler(mut self, options: CompilerOptions) -> Self {
        self.compiler = options;
        self
    }

    /// Runs chunks sequentially.
    #[must_use]
    pub const fn sequential_chunks(mut self, sequential: bool) -> Self {
        self.sequential_chunks = sequential;
        self
    }

    /// Enables or disables JSON text decoding in read results.
    #[must_use]
    pub const fn parse_json_text(mut self, enabled: bool) -> Self {
        self.parse_json_text = enabled;
        self
    }

    /// Sets the pool size.
    #[must_use]
    pub const fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Reads the configuration from `SQLSIEVE_*` environment variables.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `SQLSIEVE_SCHEMA` | default schema |
    /// | `SQLSIEVE_AUTO_WILDCARD` | `like` wildcard wrapping |
    /// | `SQLSIEVE_NORMALIZE_FILTERS` | filter value normalization |
    /// | `SQLSIEVE_BATCH_SIZE` | records per INSERT |
    /// | `SQLSIEVE_SEQUENTIAL_CHUNKS` | sequential chunk execution |
    /// | `SQLSIEVE_PARSE_JSON_TEXT` | JSON text decoding |
    /// | `SQLSIEVE_MAX_CONNECTIONS` | pool size |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`EngineConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(schema) = lookup("SQLSIEVE_SCHEMA").filter(|s| !s.trim().is_empty()) {
            config.compiler = config.compiler.schema(schema.trim());
        }
        if let Some(enabled) = parse_flag(&lookup, "SQLSIEVE_AUTO_WILDCARD")? {
            config.compiler = config.compiler.auto_wildcard(enabled);
        }
        if let Some(enabled) = parse_flag(&lookup, "SQLSIEVE_NORMALIZE_FILTERS")? {
            config.compiler = config.compiler.normalize_filter_values(enabled);
        }
        if let Some(size) = parse_var::<usize>(&lookup, "SQLSIEVE_BATCH_SIZE")? {
            config.compiler = config.compiler.batch_size(size);
        }
        if let Some(sequential) = parse_flag(&lookup, "SQLSIEVE_SEQUENTIAL_CHUNKS")? {
            config.sequential_chunks = sequential;
        }
        if let Some(enabled) = parse_flag(&lookup, "SQLSIEVE_PARSE_JSON_TEXT")? {
            config.parse_json_text = enabled;
        }
        if let Some(max) = parse_var::<u32>(&lookup, "SQLSIEVE_MAX_CONNECTIONS")? {
            config.max_connections = max.max(1);
        }
        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key).filter(|raw| !raw.trim().is_empty()) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|e| QueryError::Config(format!("{key}={raw:?}: {e}")))
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<bool>> {
    let Some(raw) = lookup(key).filter(|raw| !raw.trim().is_empty()) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(QueryError::Config(format!("{key}={raw:?}: expected a boolean"))),
    }
}
