//! Screenshot artifacts left behind by a run

use std::path::{Path, PathBuf};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{VerifyError, VerifyResult};

/// A screenshot that exists on disk and decodes as an image
#[derive(Debug, Clone)]
pub struct ScreenshotArtifact {
    pub path: PathBuf,

    pub width: u32,
    pub height: u32,

    /// SHA-256 of the file contents, hex encoded
    pub sha256: String,
}

impl ScreenshotArtifact {
    /// Inspect the screenshot at `path`
    pub fn inspect(path: &Path) -> VerifyResult<Self> {
        if !path.exists() {
            return Err(VerifyError::ArtifactMissing(path.to_path_buf()));
        }

        let (width, height) = image::image_dimensions(path)?;
        let sha256 = hash_file(path)?;

        debug!("Inspected {} ({}x{})", path.display(), width, height);

        Ok(Self {
            path: path.to_path_buf(),
            width,
            height,
            sha256,
        })
    }

    pub fn log(&self) {
        info!(
            sha256 = %self.sha256,
            "Screenshot saved: {} ({}x{})",
            self.path.display(),
            self.width,
            self.height
        );
    }
}

/// Artifact locations, overwritten on every run
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub success: PathBuf,
    pub failure: PathBuf,
}

impl ArtifactPaths {
    /// Create the parent directories of both screenshots
    pub fn prepare(&self) -> VerifyResult<()> {
        for path in [&self.success, &self.failure] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        Ok(())
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            success: PathBuf::from("verification/chat_interface.png"),
            failure: PathBuf::from("verification/error.png"),
        }
    }
}

/// Hash a file using SHA256
fn hash_file(path: &Path) -> VerifyResult<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_inspect_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255])).save(&path).unwrap();

        let artifact = ScreenshotArtifact::inspect(&path).unwrap();
        assert_eq!((artifact.width, artifact.height), (4, 3));
        assert_eq!(artifact.sha256.len(), 64);
        assert_eq!(artifact.sha256, hash_file(&path).unwrap());
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScreenshotArtifact::inspect(&dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, VerifyError::ArtifactMissing(_)));
    }

    #[test]
    fn test_not_an_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        assert!(ScreenshotArtifact::inspect(&path).is_err());
    }

    #[test]
    fn test_prepare_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths {
            success: dir.path().join("a/ok.png"),
            failure: dir.path().join("b/err.png"),
        };
        paths.prepare().unwrap();

        assert!(dir.path().join("a").is_dir());
        assert!(dir.path().join("b").is_dir());
    }

    #[test]
    fn test_default_paths() {
        let paths = ArtifactPaths::default();
        assert_eq!(paths.success, PathBuf::from("verification/chat_interface.png"));
        assert_eq!(paths.failure, PathBuf::from("verification/error.png"));
    }
}
