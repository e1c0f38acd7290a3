//! Configuration module
//!
//! Runtime settings are read from the environment (optionally seeded from a
//! `.env` file by the binary). Everything has a sensible default so the
//! service runs with no configuration at all.

use std::env;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_UPLOAD_SIZE_MB: usize = 100;

/// Service configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub server_port: u16,
    /// Root directory for staged chunks and merged/output artifacts.
    pub storage_root: PathBuf,
    /// Path to the ffmpeg binary.
    pub ffmpeg_path: String,
    /// Maximum accepted request body size, in bytes.
    pub max_upload_size_bytes: usize,
    /// Deployment environment name ("development", "production", ...).
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable             | Default       |
    /// |----------------------|---------------|
    /// | `PORT`               | `8000`        |
    /// | `STORAGE_ROOT`       | `./data`      |
    /// | `FFMPEG_PATH`        | `ffmpeg`      |
    /// | `MAX_UPLOAD_SIZE_MB` | `100`         |
    /// | `ENVIRONMENT`        | `development` |
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let server_port = match env::var("PORT") {
            Ok(val) => val
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("PORT must be a number between 1 and 65535: {val}"))?,
            Err(_) => DEFAULT_PORT,
        };

        let max_upload_size_mb = match env::var("MAX_UPLOAD_SIZE_MB") {
            Ok(val) => val
                .parse::<usize>()
                .map_err(|_| anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be a number: {val}"))?,
            Err(_) => DEFAULT_MAX_UPLOAD_SIZE_MB,
        };

        Ok(Config {
            server_port,
            storage_root: env::var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_port: DEFAULT_PORT,
            storage_root: PathBuf::from("./data"),
            ffmpeg_path: "ffmpeg".to_string(),
            max_upload_size_bytes: DEFAULT_MAX_UPLOAD_SIZE_MB * 1024 * 1024,
            environment: "development".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.max_upload_size_bytes, 100 * 1024 * 1024);
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert!(!config.is_production());
    }

    #[test]
    fn test_is_production() {
        let config = Config {
            environment: "Production".to_string(),
            ..Config::default()
        };
        assert!(config.is_production());
    }
}
