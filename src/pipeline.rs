//! Entry points of the recorder: extract, commit, export

use std::sync::Arc;

use tracing::info;

use crate::artifacts::ArtifactStore;
use crate::commit::CommitService;
use crate::config::AppConfig;
use crate::database::Database;
use crate::errors::RecorderError;
use crate::export::{CsvExporter, ExportFile, TableExporter};
use crate::extractor::{FieldExtractor, PatternExtractor};
use crate::metrics;
use crate::models::{CommitRequest, ExtractionOutcome, Reading};
use crate::ocr::OcrWorker;
use crate::staging::StagingManager;

/// Wires the collaborators together; cheap to clone
#[derive(Clone)]
pub struct Recorder {
    ocr: OcrWorker,
    extractor: Arc<dyn FieldExtractor>,
    staging: Arc<StagingManager>,
    artifacts: Arc<ArtifactStore>,
    committer: CommitService,
    exporter: Arc<dyn TableExporter>,
    database: Database,
}

impl Recorder {
    pub fn new(
        ocr: OcrWorker,
        extractor: Arc<dyn FieldExtractor>,
        staging: Arc<StagingManager>,
        artifacts: Arc<ArtifactStore>,
        database: Database,
        exporter: Arc<dyn TableExporter>,
    ) -> Self {
        let committer = CommitService::new(
            Arc::clone(&staging),
            Arc::clone(&artifacts),
            database.clone(),
        );
        Self {
            ocr,
            extractor,
            staging,
            artifacts,
            committer,
            exporter,
            database,
        }
    }

    /// Build the production recorder: tesseract, pattern extraction, CSV export
    pub async fn from_config(config: &AppConfig, database: Database) -> Result<Self, RecorderError> {
        let staging = StagingManager::new(&config.storage.staging_dir).await?;
        let artifacts =
            ArtifactStore::new(&config.storage.artifact_dir, &config.storage.public_prefix).await?;
        Ok(Self::new(
            OcrWorker::from_config(&config.ocr),
            Arc::new(PatternExtractor::new()?),
            Arc::new(staging),
            Arc::new(artifacts),
            database,
            Arc::new(CsvExporter),
        ))
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// OCR an upload, extract its fields and stage it for review
    ///
    /// Nothing is staged when OCR fails.
    pub async fn extract(
        &self,
        image: Vec<u8>,
        original_name: &str,
        motor_name: &str,
    ) -> Result<ExtractionOutcome, RecorderError> {
        if image.is_empty() {
            return Err(RecorderError::InvalidInput("Uploaded file is empty".to_string()));
        }

        let text = self.ocr.recognize(image.clone()).await?;
        let fields = self.extractor.extract(&text);
        let derived = metrics::derive(fields.erpm, fields.volts_in);
        let staging_token = self.staging.stage(&image, original_name).await?;

        info!(
            motor = %motor_name,
            token = %staging_token,
            found = fields.present_count(),
            "Extracted fields"
        );
        Ok(ExtractionOutcome {
            motor_name: motor_name.to_string(),
            fields,
            derived,
            staging_token,
        })
    }

    pub async fn commit(&self, request: CommitRequest) -> Result<Reading, RecorderError> {
        self.committer.commit(request).await
    }

    /// Snapshot every committed reading, in insertion order
    pub async fn export(&self) -> Result<ExportFile, RecorderError> {
        let readings = self.database.list_readings().await?;
        self.exporter.export(&readings)
    }
}
