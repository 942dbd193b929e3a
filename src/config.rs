//! Configuration management for PenguinBlur.
//!
//! Settings come from command-line arguments, environment variables and
//! defaults, in that order of precedence.
//!
//! # Commands
//!
//! - `penguinblur` / `penguinblur serve` - Run the HTTP server
//! - `penguinblur cleanup` - Delete expired processed files once and exit
//! - `penguinblur check` - Check the storage directories
//!
//! # Environment Variables
//!
//! - `PENGUINBLUR_HOST` - Server bind address (default: 0.0.0.0)
//! - `PORT` - Server port (default: 8080)
//! - `PENGUINBLUR_ENV` - Deployment environment label (default: development)
//! - `PENGUINBLUR_UPLOAD_DIR` - Upload area (default: /app/uploads)
//! - `PENGUINBLUR_TEMP_DIR` - Processed files area (default: /app/temp)
//! - `PENGUINBLUR_STATIC_DIR` - Frontend assets (default: /app/static)
//! - `PENGUINBLUR_MAX_UPLOAD_SIZE` - Upload body limit in bytes (default: 512 MiB)
//! - `PENGUINBLUR_SWEEP_INTERVAL` - Background cleanup period in seconds, 0 = off
//! - `PENGUINBLUR_CORS_ORIGINS` - Allowed CORS origins, comma-separated
//! - `PENGUINBLUR_LOG_FORMAT` - `text` or `json`

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::server::DEFAULT_MAX_UPLOAD_SIZE;
use crate::storage::StoragePaths;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default environment label.
pub const DEFAULT_ENVIRONMENT: &str = "development";

pub const DEFAULT_UPLOAD_DIR: &str = "/app/uploads";
pub const DEFAULT_TEMP_DIR: &str = "/app/temp";
pub const DEFAULT_STATIC_DIR: &str = "/app/static";

// =============================================================================
// CLI Arguments
// =============================================================================

/// PenguinBlur - upload, blur and download video clips.
#[derive(Parser, Debug, Clone)]
#[command(name = "penguinblur")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Server settings used when no subcommand is given.
    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// The command to run, defaulting to `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve(ServeConfig),

    /// Delete processed files older than the retention window and exit
    Cleanup(CleanupConfig),

    /// Check that the storage directories exist and are writable
    Check(CheckConfig),
}

/// Log output format.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

// =============================================================================
// Storage Directories
// =============================================================================

/// Directory settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// Directory holding uploaded source clips.
    #[arg(long, default_value = DEFAULT_UPLOAD_DIR, env = "PENGUINBLUR_UPLOAD_DIR")]
    pub upload_dir: PathBuf,

    /// Directory holding processed clips, reaped after 15 minutes.
    #[arg(long, default_value = DEFAULT_TEMP_DIR, env = "PENGUINBLUR_TEMP_DIR")]
    pub temp_dir: PathBuf,

    /// Directory holding the frontend build.
    #[arg(long, default_value = DEFAULT_STATIC_DIR, env = "PENGUINBLUR_STATIC_DIR")]
    pub static_dir: PathBuf,
}

impl StorageArgs {
    pub fn validate(&self) -> Result<(), String> {
        for (name, dir) in [
            ("upload_dir", &self.upload_dir),
            ("temp_dir", &self.temp_dir),
            ("static_dir", &self.static_dir),
        ] {
            if dir.as_os_str().is_empty() {
                return Err(format!("{} must not be empty", name));
            }
        }

        if self.upload_dir == self.temp_dir {
            return Err(format!(
                "upload_dir and temp_dir must differ (both are {}); \
                 cleanup would delete uploaded files",
                self.upload_dir.display()
            ));
        }

        Ok(())
    }

    pub fn paths(&self) -> StoragePaths {
        StoragePaths::new(&self.upload_dir, &self.temp_dir, &self.static_dir)
    }
}

// =============================================================================
// Serve Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "PENGUINBLUR_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    /// Deployment environment label, reported at startup.
    #[arg(long, default_value = DEFAULT_ENVIRONMENT, env = "PENGUINBLUR_ENV")]
    pub environment: String,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Maximum upload body size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_SIZE, env = "PENGUINBLUR_MAX_UPLOAD_SIZE")]
    pub max_upload_size: usize,

    /// Run cleanup in the background every N seconds (0 disables).
    #[arg(long, default_value_t = 0, env = "PENGUINBLUR_SWEEP_INTERVAL")]
    pub sweep_interval: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "PENGUINBLUR_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "PENGUINBLUR_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }

        self.storage.validate()?;

        if self.max_upload_size == 0 {
            return Err("max_upload_size must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the socket address string for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Background cleanup period, if enabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }
}

// =============================================================================
// Cleanup Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CleanupConfig {
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Check Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
