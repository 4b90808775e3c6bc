use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use vesc_recorder::{
    artifacts::ArtifactStore,
    database::Database,
    errors::RecorderError,
    export::CsvExporter,
    extractor::PatternExtractor,
    ocr::{OcrEngine, OcrWorker},
    pipeline::Recorder,
    staging::StagingManager,
};

/// OCR engine returning fixed text; bytes starting with `!` are undecodable
pub struct ScriptedOcr(pub &'static str);

impl OcrEngine for ScriptedOcr {
    fn recognize(&self, image: &[u8]) -> Result<String, RecorderError> {
        if image.starts_with(b"!") {
            return Err(RecorderError::ExtractionError("Undecodable image".to_string()));
        }
        Ok(self.0.to_string())
    }
}

pub async fn recorder(dir: &TempDir, ocr_text: &'static str) -> Recorder {
    let uploads = dir.path().join("uploads");
    let staging = StagingManager::new(uploads.join("staging")).await.unwrap();
    let artifacts = ArtifactStore::new(&uploads, "/uploads").await.unwrap();
    let database = Database::from_path(&dir.path().join("data.db"))
        .await
        .unwrap();

    Recorder::new(
        OcrWorker::new(Arc::new(ScriptedOcr(ocr_text)), 2, Duration::from_secs(5)),
        Arc::new(PatternExtractor::new().unwrap()),
        Arc::new(staging),
        Arc::new(artifacts),
        database,
        Arc::new(CsvExporter),
    )
}
