//! Permanent storage of committed images

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::RecorderError;
use crate::models::ArtifactRef;
use crate::staging::sanitize_file_name;

const DEFAULT_EXTENSION: &str = "png";

/// Directory of committed images, published under a URL prefix
pub struct ArtifactStore {
    dir: PathBuf,
    public_prefix: String,
}

impl ArtifactStore {
    pub async fn new(
        dir: impl Into<PathBuf>,
        public_prefix: impl Into<String>,
    ) -> Result<Self, RecorderError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        let public_prefix = public_prefix.into().trim_end_matches('/').to_string();
        Ok(Self { dir, public_prefix })
    }

    /// Move a staged file to a new, uniquely named permanent location
    ///
    /// The staged file is gone afterwards. A missing source yields
    /// `StagingNotFound`, any other failure `PromotionError`.
    pub async fn promote(
        &self,
        staged: &Path,
        motor_name: &str,
        extension: Option<&str>,
        captured_at: DateTime<Utc>,
    ) -> Result<ArtifactRef, RecorderError> {
        let file_name = format!(
            "{}_{}_{}.{}",
            sanitize_file_name(motor_name),
            captured_at.format("%Y%m%d_%H%M%S"),
            Uuid::new_v4().simple(),
            extension.unwrap_or(DEFAULT_EXTENSION)
        );
        self.promote_as(staged, file_name).await
    }

    async fn promote_as(
        &self,
        staged: &Path,
        file_name: String,
    ) -> Result<ArtifactRef, RecorderError> {
        let target = self.dir.join(&file_name);

        let promotion_error = |origin: String| RecorderError::PromotionError {
            from: staged.to_path_buf(),
            to: target.clone(),
            origin,
        };

        if tokio::fs::try_exists(&target)
            .await
            .map_err(|e| promotion_error(e.to_string()))?
        {
            return Err(promotion_error("target already exists".to_string()));
        }

        match tokio::fs::rename(staged, &target).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RecorderError::StagingNotFound(staged.display().to_string()));
            }
            Err(e) => return Err(promotion_error(e.to_string())),
        }

        info!(from = %staged.display(), to = %target.display(), "Promoted staged image");
        Ok(ArtifactRef {
            url: format!("{}/{}", self.public_prefix, file_name),
            file_name,
        })
    }

    /// Move a promoted artifact back to where it was staged
    pub async fn restore(&self, artifact: &ArtifactRef, staged: &Path) -> Result<(), RecorderError> {
        let path = self.path_of(artifact);
        tokio::fs::rename(&path, staged).await?;
        warn!(from = %path.display(), to = %staged.display(), "Restored artifact to staging");
        Ok(())
    }

    pub fn path_of(&self, artifact: &ArtifactRef) -> PathBuf {
        self.dir.join(&artifact.file_name)
    }

    /// Map a published URL back to a file in the store
    pub fn resolve_url(&self, url: &str) -> Option<PathBuf> {
        let name = url
            .strip_prefix(&self.public_prefix)?
            .strip_prefix('/')?;
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return None;
        }
        Some(self.dir.join(name))
    }
}
