//! Temporary storage of uploads between extraction and commit

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::RecorderError;
use crate::models::StagingToken;

/// Marker every staged file name starts with
pub const STAGING_PREFIX: &str = "temp_";

const MAX_NAME_LEN: usize = 64;
const MAX_EXTENSION_LEN: usize = 10;

/// Owns staged uploads until a commit claims them
pub struct StagingManager {
    dir: PathBuf,
    claims: Arc<Mutex<HashSet<String>>>,
}

impl StagingManager {
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, RecorderError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        info!("Staging uploads in {}", dir.display());
        Ok(Self {
            dir,
            claims: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    /// Write uploaded bytes to a fresh staged file
    ///
    /// Every call yields a distinct token, also for identical `original_name`s.
    pub async fn stage(
        &self,
        bytes: &[u8],
        original_name: &str,
    ) -> Result<StagingToken, RecorderError> {
        let token = StagingToken::new(format!(
            "{}{}_{}",
            STAGING_PREFIX,
            Uuid::new_v4().simple(),
            sanitize_file_name(original_name)
        ));
        let path = self.dir.join(token.as_str());
        tokio::fs::write(&path, bytes).await?;
        debug!(token = %token, size = bytes.len(), "Staged upload");
        Ok(token)
    }

    /// Whether the token refers to a staged file that is still present
    pub async fn exists(&self, token: &StagingToken) -> Result<bool, RecorderError> {
        match self.resolve(token) {
            Ok(path) => Ok(tokio::fs::try_exists(path).await?),
            Err(_) => Ok(false),
        }
    }

    /// Take exclusive hold of a staged file for promotion
    ///
    /// Fails with `StagingNotFound` when the file is missing, the token is
    /// malformed, or another commit currently holds it.
    pub async fn claim(&self, token: &StagingToken) -> Result<StagingClaim, RecorderError> {
        let path = self.resolve(token)?;

        if !self.lock_claims().insert(token.as_str().to_string()) {
            debug!(token = %token, "Token already being committed");
            return Err(RecorderError::StagingNotFound(token.to_string()));
        }
        let claim = StagingClaim {
            token: token.clone(),
            path,
            claims: Arc::clone(&self.claims),
        };

        if !tokio::fs::try_exists(&claim.path).await? {
            return Err(RecorderError::StagingNotFound(token.to_string()));
        }
        Ok(claim)
    }

    /// Map a token to its path, rejecting anything that could escape the staging directory
    fn resolve(&self, token: &StagingToken) -> Result<PathBuf, RecorderError> {
        let name = token.as_str();
        let well_formed = name.starts_with(STAGING_PREFIX)
            && !name.contains(['/', '\\'])
            && !name.contains("..");
        if !well_formed {
            return Err(RecorderError::StagingNotFound(name.to_string()));
        }
        Ok(self.dir.join(name))
    }

    fn lock_claims(&self) -> MutexGuard<'_, HashSet<String>> {
        self.claims.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Exclusive hold on a staged file, released on drop
#[derive(Debug)]
pub struct StagingClaim {
    token: StagingToken,
    path: PathBuf,
    claims: Arc<Mutex<HashSet<String>>>,
}

impl StagingClaim {
    pub fn token(&self) -> &StagingToken {
        &self.token
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extension of the original upload, if it had a usable one
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase())
    }
}

impl Drop for StagingClaim {
    fn drop(&mut self) {
        let mut claims = self.claims.lock().unwrap_or_else(|e| e.into_inner());
        claims.remove(self.token.as_str());
    }
}

/// Keep ASCII letters, digits, `.`, `-` and `_`; replace the rest
///
/// Long names lose the end of their stem, never their extension.
pub(crate) fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').replace("..", "_");
    if cleaned.is_empty() {
        return "upload".to_string();
    }
    if cleaned.len() <= MAX_NAME_LEN {
        return cleaned;
    }

    // Only ASCII is left, so byte offsets are char boundaries
    match cleaned.rfind('.') {
        Some(dot) if cleaned.len() - dot <= MAX_EXTENSION_LEN + 1 => {
            let extension = &cleaned[dot..];
            let stem = &cleaned[..dot.min(MAX_NAME_LEN - extension.len())];
            format!("{stem}{extension}")
        }
        _ => cleaned[..MAX_NAME_LEN].to_string(),
    }
}
