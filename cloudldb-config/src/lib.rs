use std::path::PathBuf;

use envconfig::Envconfig;

#[derive(Debug, thiserror::Error)]
#[error("Failed to load {scope} config: {source}")]
pub struct ConfigError {
    scope: &'static str,
    #[source]
    source: envconfig::Error,
}

/// Settings for the HTTP invocation surface. Loaded once at startup.
#[derive(Debug, Clone, Envconfig)]
pub struct ServerConfig {
    #[envconfig(from = "CLOUDLDB_PORT", default = "5001")]
    pub port: u16,
    #[envconfig(from = "CLOUDLDB_HOST", default = "0.0.0.0")]
    pub host: String,
    #[envconfig(from = "CLOUDLDB_LOG_LEVEL", default = "info")]
    pub log_level: String,
}

impl ServerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::init_from_env().map_err(|source| ConfigError {
            scope: "server",
            source,
        })
    }
}

/// Settings consumed by a single handler invocation.
///
/// This is read from the environment on every invocation and never cached, so a
/// warm process picks up changed values on the next request.
#[derive(Debug, Clone, Envconfig)]
pub struct InvocationConfig {
    #[envconfig(from = "LEVELDB_REGION")]
    pub region: String,
    #[envconfig(from = "LEVELDB_BUCKET")]
    pub bucket: String,
    #[envconfig(from = "LEVELDB_MERGER_BIN", default = "./standalone_merger")]
    pub merger_bin: PathBuf,
    #[envconfig(from = "LEVELDB_TABLE_READER_BIN", default = "./table_reader")]
    pub table_reader_bin: PathBuf,
    /// Parent directory for staging areas. Falls back to the platform temp dir.
    #[envconfig(from = "LEVELDB_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,
    /// Serve tables from a local directory instead of S3.
    #[envconfig(from = "LEVELDB_LOCAL_STORE_DIR")]
    pub local_store_dir: Option<PathBuf>,
    #[envconfig(from = "LEVELDB_REPORT_TIMINGS", default = "false")]
    pub report_timings: bool,
}

impl InvocationConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::init_from_env().map_err(|source| ConfigError {
            scope: "invocation",
            source,
        })
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
