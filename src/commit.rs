//! Promotion of a reviewed upload into a committed reading

use std::sync::Arc;

use chrono::{Timelike, Utc};
use tracing::{error, info, warn};

use crate::artifacts::ArtifactStore;
use crate::database::Database;
use crate::errors::RecorderError;
use crate::metrics;
use crate::models::{CommitRequest, DerivedMetrics, NewReading, Reading};
use crate::staging::StagingManager;

/// Moves a staged image into permanent storage and records the reading
#[derive(Clone)]
pub struct CommitService {
    staging: Arc<StagingManager>,
    artifacts: Arc<ArtifactStore>,
    database: Database,
}

impl CommitService {
    pub fn new(
        staging: Arc<StagingManager>,
        artifacts: Arc<ArtifactStore>,
        database: Database,
    ) -> Self {
        Self {
            staging,
            artifacts,
            database,
        }
    }

    /// Commit a reviewed reading
    ///
    /// Nothing is written unless the staged image could be promoted. The
    /// token is consumed on success, so committing it again fails with
    /// `StagingNotFound`. If the insert fails, the image is moved back to
    /// staging and the database error is returned.
    ///
    /// Promotion and insert run on their own task: dropping the returned
    /// future (e.g. a disconnected client) does not stop them halfway.
    pub async fn commit(&self, request: CommitRequest) -> Result<Reading, RecorderError> {
        let motor_name = request.motor_name.trim().to_string();
        if motor_name.is_empty() {
            return Err(RecorderError::InvalidInput(
                "Motor name cannot be empty".to_string(),
            ));
        }

        let derived = metrics::derive(request.fields.erpm, request.fields.volts_in);
        if !derived.agrees_with(&request.derived) {
            warn!(
                motor = %motor_name,
                submitted = ?request.derived,
                recomputed = ?derived,
                "Submitted derived metrics disagree, storing recomputed values"
            );
        }

        let service = self.clone();
        tokio::spawn(async move { service.promote_and_record(request, motor_name, derived).await })
            .await
            .map_err(|e| RecorderError::CommitAborted(e.to_string()))?
    }

    async fn promote_and_record(
        &self,
        request: CommitRequest,
        motor_name: String,
        derived: DerivedMetrics,
    ) -> Result<Reading, RecorderError> {
        let claim = self.staging.claim(&request.staging_token).await?;
        let captured_at = Utc::now().with_nanosecond(0).unwrap_or_else(Utc::now);

        let artifact = self
            .artifacts
            .promote(
                claim.path(),
                &motor_name,
                claim.extension().as_deref(),
                captured_at,
            )
            .await?;

        let reading = NewReading {
            motor_name,
            captured_at,
            fields: request.fields,
            derived,
            image_url: artifact.url.clone(),
        };

        match self.database.insert_reading(reading).await {
            Ok(reading) => {
                info!(
                    id = reading.id,
                    motor = %reading.motor_name,
                    image = %reading.image_url,
                    "Committed reading"
                );
                Ok(reading)
            }
            Err(e) => {
                error!(token = %claim.token(), "Insert failed after promotion: {}", e);
                if let Err(restore_error) = self.artifacts.restore(&artifact, claim.path()).await {
                    error!(
                        artifact = %self.artifacts.path_of(&artifact).display(),
                        "Artifact left orphaned: {}",
                        restore_error
                    );
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MotorFields, StagingToken};
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        dir: TempDir,
        staging: Arc<StagingManager>,
        artifacts: Arc<ArtifactStore>,
        database: Database,
        service: CommitService,
    }

    impl Fixture {
        fn artifact_dir(&self) -> PathBuf {
            self.dir.path().join("uploads")
        }
    }

    async fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let staging = Arc::new(
            StagingManager::new(dir.path().join("staging"))
                .await
                .unwrap(),
        );
        let artifacts = Arc::new(
            ArtifactStore::new(dir.path().join("uploads"), "/uploads")
                .await
                .unwrap(),
        );
        let database = Database::from_path(&dir.path().join("data.db")).await.unwrap();
        let service = CommitService::new(staging.clone(), artifacts.clone(), database.clone());
        Fixture {
            dir,
            staging,
            artifacts,
            database,
            service,
        }
    }

    async fn committed_files(f: &Fixture) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(f.artifact_dir()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            files.push(entry.path());
        }
        files
    }

    fn request(token: StagingToken) -> CommitRequest {
        CommitRequest {
            motor_name: "M1".to_string(),
            fields: MotorFields {
                erpm: Some(700.0),
                volts_in: Some(10.0),
                ..Default::default()
            },
            derived: DerivedMetrics::default(),
            staging_token: token,
        }
    }

    #[tokio::test]
    async fn commit_recomputes_derived_metrics() -> Result<(), RecorderError> {
        let f = fixture().await;
        let token = f.staging.stage(b"img", "a.png").await?;

        let mut req = request(token);
        req.derived = DerivedMetrics {
            normal_erpm: Some(1.0),
            rpm_48v: Some(2.0),
        };
        let reading = f.service.commit(req).await?;

        assert_eq!(reading.normal_erpm, Some(100.0));
        assert_eq!(reading.rpm_48v, Some(480.0));
        assert_eq!(f.database.list_readings().await?, vec![reading]);
        Ok(())
    }

    #[tokio::test]
    async fn second_commit_of_token_is_not_found() -> Result<(), RecorderError> {
        let f = fixture().await;
        let token = f.staging.stage(b"img", "a.png").await?;

        f.service.commit(request(token.clone())).await?;
        let second = f.service.commit(request(token)).await;

        assert!(matches!(second, Err(RecorderError::StagingNotFound(_))));
        assert_eq!(f.database.list_readings().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_token_writes_nothing() -> Result<(), RecorderError> {
        let f = fixture().await;

        let result = f
            .service
            .commit(request(StagingToken::new("temp_never_staged.png")))
            .await;

        assert!(matches!(result, Err(RecorderError::StagingNotFound(_))));
        assert!(f.database.list_readings().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn empty_motor_name_is_rejected_before_promotion() -> Result<(), RecorderError> {
        let f = fixture().await;
        let token = f.staging.stage(b"img", "a.png").await?;

        let mut req = request(token.clone());
        req.motor_name = "  ".to_string();

        assert!(matches!(
            f.service.commit(req).await,
            Err(RecorderError::InvalidInput(_))
        ));
        assert!(f.staging.exists(&token).await?);
        Ok(())
    }

    #[tokio::test]
    async fn failed_insert_restores_staged_image() -> Result<(), RecorderError> {
        let f = fixture().await;
        let token = f.staging.stage(b"img", "a.png").await?;
        sqlx::query("DROP TABLE motor_data")
            .execute(f.database.pool())
            .await?;

        let result = f.service.commit(request(token.clone())).await;

        assert!(matches!(result, Err(RecorderError::DatabaseError(_))));
        assert!(f.staging.exists(&token).await?);
        assert!(committed_files(&f).await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn failed_promotion_writes_nothing() -> Result<(), RecorderError> {
        let f = fixture().await;
        let token = f.staging.stage(b"img", "a.png").await?;
        tokio::fs::remove_dir_all(f.artifact_dir()).await?;
        tokio::fs::write(f.artifact_dir(), b"not a directory").await?;

        let result = f.service.commit(request(token.clone())).await;

        assert!(matches!(result, Err(RecorderError::PromotionError { .. })));
        assert!(f.staging.exists(&token).await?);
        assert!(f.database.list_readings().await?.is_empty());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dropped_commit_still_completes() -> Result<(), RecorderError> {
        let f = fixture().await;
        let token = f.staging.stage(b"img", "a.png").await?;

        // Another writer holds the database while the commit is in flight
        let mut blocker = f.database.pool().acquire().await?;
        sqlx::query("BEGIN EXCLUSIVE").execute(&mut *blocker).await?;

        let abandoned =
            tokio::time::timeout(Duration::from_millis(300), f.service.commit(request(token.clone())))
                .await;
        assert!(abandoned.is_err(), "commit should still be waiting on the database");

        sqlx::query("COMMIT").execute(&mut *blocker).await?;
        drop(blocker);

        let mut readings = Vec::new();
        for _ in 0..100 {
            readings = f.database.list_readings().await?;
            if !readings.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        assert_eq!(readings.len(), 1);
        let path = f.artifacts.resolve_url(&readings[0].image_url).unwrap();
        assert_eq!(tokio::fs::read(path).await?, b"img");
        assert!(!f.staging.exists(&token).await?);
        Ok(())
    }
}
