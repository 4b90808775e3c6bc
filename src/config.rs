//! Application configuration

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;
use tracing::warn;

use crate::errors::RecorderError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub busy_timeout: Duration,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding uploads between extraction and commit
    pub staging_dir: PathBuf,
    /// Directory holding committed images
    pub artifact_dir: PathBuf,
    /// URL prefix under which committed images are published
    pub public_prefix: String,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    pub command: String,
    pub language: String,
    pub max_concurrency: usize,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub timeout: Duration,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.bind", "127.0.0.1:8000")?
            .set_default("database.path", "data.db")?
            .set_default("database.max_connections", 5)?
            .set_default("database.busy_timeout", 5)?
            .set_default("storage.staging_dir", "uploads/staging")?
            .set_default("storage.artifact_dir", "uploads")?
            .set_default("storage.public_prefix", "/uploads")?
            .set_default("ocr.command", "tesseract")?
            .set_default("ocr.language", "eng")?
            .set_default("ocr.max_concurrency", 2)?
            .set_default("ocr.timeout", 30)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("VESCRECORDER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate every section, creating missing directories
    pub fn validate(&self) -> Result<(), RecorderError> {
        self.database.validate()?;
        self.storage.validate()?;
        self.ocr.validate()?;
        Ok(())
    }
}

impl DatabaseConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), RecorderError> {
        if self.path.as_os_str().is_empty() {
            return Err(RecorderError::ConfigurationError {
                message: "Database path cannot be empty".to_string(),
            });
        }
        if self.max_connections == 0 {
            return Err(RecorderError::ConfigurationError {
                message: "Database max_connections must be greater than zero".to_string(),
            });
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_directory_exists(parent)?;
            }
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), RecorderError> {
        for (name, dir) in [
            ("staging_dir", &self.staging_dir),
            ("artifact_dir", &self.artifact_dir),
        ] {
            if dir.as_os_str().is_empty() {
                return Err(RecorderError::ConfigurationError {
                    message: format!("Storage {} cannot be empty", name),
                });
            }
            ensure_directory_exists(dir)?;
        }
        Ok(())
    }
}

impl OcrConfig {
    pub fn validate(&self) -> Result<(), RecorderError> {
        if self.command.trim().is_empty() {
            return Err(RecorderError::ConfigurationError {
                message: "OCR command cannot be empty".to_string(),
            });
        }
        if self.max_concurrency == 0 {
            return Err(RecorderError::ConfigurationError {
                message: "OCR max_concurrency must be greater than zero".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(RecorderError::ConfigurationError {
                message: "OCR timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn ensure_directory_exists(dir: &Path) -> Result<(), RecorderError> {
    if !dir.exists() {
        warn!("Directory {} does not exist, attempting to create it", dir.display());
        std::fs::create_dir_all(dir).map_err(|e| RecorderError::ConfigurationError {
            message: format!("Could not create directory {}: {}", dir.display(), e),
        })?;
    }
    Ok(())
}
