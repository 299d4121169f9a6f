//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Persistence configuration
    pub persistence: PersistenceConfig,
    /// Pipeline timing configuration
    pub pipeline: PipelineConfig,
    /// Download lifecycle configuration
    pub downloads: DownloadConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
    /// Largest accepted upload, in bytes
    pub max_upload_bytes: usize,
}

/// Persistence configuration
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Base directory for database, uploads and generated downloads
    pub data_dir: PathBuf,
    /// SQLite database file (None = in-memory state only)
    pub database_path: Option<PathBuf>,
}

impl PersistenceConfig {
    /// Directory where uploaded source files are stored
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    /// Directory where generated downloads are written
    pub fn downloads_dir(&self) -> PathBuf {
        self.data_dir.join("downloads")
    }
}

/// Timing knobs for the simulated pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Delay between progress ticks of a single agent stage
    pub step_delay: Duration,
    /// Progress increment per tick (1..=100)
    pub progress_step: u8,
    /// Upper bound for a single agent stage
    pub agent_timeout: Duration,
    /// Delay before agents return to idle after a job finishes
    pub agent_reset_delay: Duration,
    /// Number of messages kept in the communication log
    pub message_log_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(300),
            progress_step: 20,
            agent_timeout: Duration::from_secs(30),
            agent_reset_delay: Duration::from_millis(3000),
            message_log_capacity: 1000,
        }
    }
}

impl PipelineConfig {
    /// Configuration with no artificial delays (tests, benchmarks)
    pub fn immediate() -> Self {
        Self {
            step_delay: Duration::ZERO,
            agent_reset_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Download lifecycle configuration
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// How long a generated download stays available
    pub expiry: chrono::Duration,
    /// Interval between expiry sweeps
    pub cleanup_interval: Duration,
    /// Delay between generation progress stages
    pub stage_delay: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            expiry: chrono::Duration::hours(24),
            cleanup_interval: Duration::from_secs(3600),
            stage_delay: Duration::from_millis(100),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let data_dir = env::var("DATA_DIR").map(PathBuf::from).unwrap_or_else(|_| {
            // Default to ~/.media-suite or current directory
            if let Some(home) = env::var_os("HOME") {
                PathBuf::from(home).join(".media-suite")
            } else {
                PathBuf::from(".media-suite")
            }
        });

        let database_path = match env::var("DATABASE_PATH") {
            Ok(path) if path.eq_ignore_ascii_case("none") => None,
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => Some(data_dir.join("media_suite.db")),
        };

        let pipeline_defaults = PipelineConfig::default();
        let download_defaults = DownloadConfig::default();

        Self {
            server: ServerConfig {
                port: env_parse("PORT").unwrap_or(3001),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                max_upload_bytes: env_parse("MAX_UPLOAD_BYTES").unwrap_or(100 * 1024 * 1024),
            },
            persistence: PersistenceConfig {
                data_dir,
                database_path,
            },
            pipeline: PipelineConfig {
                step_delay: env_parse("PIPELINE_STEP_DELAY_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(pipeline_defaults.step_delay),
                progress_step: env_parse::<u32>("PIPELINE_PROGRESS_STEP")
                    .map(|step| step.clamp(1, 100) as u8)
                    .unwrap_or(pipeline_defaults.progress_step),
                agent_timeout: env_parse("AGENT_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(pipeline_defaults.agent_timeout),
                agent_reset_delay: env_parse("AGENT_RESET_DELAY_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(pipeline_defaults.agent_reset_delay),
                message_log_capacity: env_parse("MESSAGE_LOG_CAPACITY")
                    .filter(|cap: &usize| *cap > 0)
                    .unwrap_or(pipeline_defaults.message_log_capacity),
            },
            downloads: DownloadConfig {
                expiry: env_parse::<u32>("DOWNLOAD_EXPIRY_HOURS")
                    .filter(|hours| *hours > 0)
                    .map(|hours| chrono::Duration::hours(i64::from(hours)))
                    .unwrap_or(download_defaults.expiry),
                cleanup_interval: env_parse("DOWNLOAD_CLEANUP_INTERVAL_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(download_defaults.cleanup_interval),
                stage_delay: download_defaults.stage_delay,
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
