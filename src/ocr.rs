//! OCR collaborator
//!
//! Engines are blocking; [`OcrWorker`] runs them off the async runtime with
//! bounded concurrency and a deadline.

use std::io::{Cursor, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use image::ImageFormat;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::config::OcrConfig;
use crate::errors::RecorderError;

/// Turns image bytes into raw text
pub trait OcrEngine: Send + Sync + 'static {
    fn recognize(&self, image: &[u8]) -> Result<String, RecorderError>;
}

/// Runs the `tesseract` command line tool
pub struct TesseractEngine {
    command: String,
    language: String,
}

impl TesseractEngine {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }

    /// Decode any supported format and hand tesseract a PNG
    fn normalize(image: &[u8]) -> Result<Vec<u8>, RecorderError> {
        let decoded = image::load_from_memory(image)
            .map_err(|e| RecorderError::ExtractionError(format!("Undecodable image: {}", e)))?;
        let mut png = Cursor::new(Vec::new());
        decoded
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| RecorderError::ExtractionError(format!("Could not re-encode image: {}", e)))?;
        Ok(png.into_inner())
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &[u8]) -> Result<String, RecorderError> {
        let png = Self::normalize(image)?;

        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .inspect_err(|e| error!("Could not run {}: {}", self.command, e))?;

        // Feed stdin from a separate thread so a full stdout pipe cannot deadlock us
        let mut stdin = child.stdin.take().ok_or_else(|| {
            RecorderError::ExtractionError("OCR process has no stdin".to_string())
        })?;
        let feeder = std::thread::spawn(move || stdin.write_all(&png));

        let output = child.wait_with_output()?;
        match feeder.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Writing image to OCR process failed: {}", e),
            Err(_) => warn!("OCR stdin feeder panicked"),
        }

        if !output.status.success() {
            return Err(RecorderError::ExtractionError(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Bounded pool in front of a blocking engine
#[derive(Clone)]
pub struct OcrWorker {
    engine: Arc<dyn OcrEngine>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl OcrWorker {
    pub fn new(engine: Arc<dyn OcrEngine>, max_concurrency: usize, timeout: Duration) -> Self {
        Self {
            engine,
            permits: Arc::new(Semaphore::new(max_concurrency)),
            timeout,
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(
            Arc::new(TesseractEngine::new(&config.command, &config.language)),
            config.max_concurrency,
            config.timeout,
        )
    }

    /// Recognize text, waiting at most the configured timeout
    ///
    /// The timeout covers queueing for a permit as well as the engine run.
    /// A run that times out keeps its permit until the engine returns.
    pub async fn recognize(&self, image: Vec<u8>) -> Result<String, RecorderError> {
        let engine = Arc::clone(&self.engine);
        let permits = Arc::clone(&self.permits);

        let run = async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|e| RecorderError::ExtractionError(format!("OCR pool closed: {}", e)))?;
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                engine.recognize(&image)
            })
            .await
            .map_err(|e| RecorderError::ExtractionError(format!("OCR task failed: {}", e)))?
        };

        let text = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| RecorderError::OcrTimeout(self.timeout))??;
        debug!("OCR output:\n{}", text);
        Ok(text)
    }
}
