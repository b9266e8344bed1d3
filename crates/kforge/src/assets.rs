//! Extraction of bundled Terraform modules.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Asset extraction errors.
#[derive(Error, Debug)]
pub enum AssetError {
    /// The bundled source does not exist.
    #[error("asset source {} does not exist", .0.display())]
    MissingSource(PathBuf),

    /// Walking the source tree failed.
    #[error("reading asset source: {0}")]
    Walk(#[from] walkdir::Error),

    /// Copying a file or creating a directory failed.
    #[error("copying {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Materializes bundled assets into a destination directory.
pub trait AssetExtractor {
    /// Copy the bundled assets into `destination`, creating it if needed.
    ///
    /// Existing files are overwritten so repeated extraction converges.
    ///
    /// # Errors
    /// Returns an error if any asset cannot be written.
    fn extract(&self, destination: &Path) -> Result<(), AssetError>;
}

/// Extracts assets from a directory tree on disk.
#[derive(Debug, Clone)]
pub struct DirectoryExtractor {
    source: PathBuf,
}

impl DirectoryExtractor {
    #[must_use]
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl AssetExtractor for DirectoryExtractor {
    fn extract(&self, destination: &Path) -> Result<(), AssetError> {
        if !self.source.is_dir() {
            return Err(AssetError::MissingSource(self.source.clone()));
        }

        debug!(
            source = %self.source.display(),
            destination = %destination.display(),
            "Extracting assets"
        );

        for entry in WalkDir::new(&self.source).sort_by_file_name() {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(&self.source)
                .unwrap_or(entry.path());
            let target = destination.join(relative);

            let result = if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target)
            } else {
                std::fs::copy(entry.path(), &target).map(|_| ())
            };

            result.map_err(|source| AssetError::Copy {
                from: entry.path().to_path_buf(),
                to: target.clone(),
                source,
            })?;
        }

        Ok(())
    }
}

/// Extractor for deployments that ship modules some other way.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExtractor;

impl AssetExtractor for NoopExtractor {
    fn extract(&self, destination: &Path) -> Result<(), AssetError> {
        std::fs::create_dir_all(destination).map_err(|source| AssetError::Copy {
            from: PathBuf::new(),
            to: destination.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_extractor_copies_tree() {
        let source = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(source.path().join("tinkerbell/workerpool")).unwrap();
        std::fs::write(source.path().join("tinkerbell/main.tf"), "# controllers").unwrap();
        std::fs::write(
            source.path().join("tinkerbell/workerpool/main.tf"),
            "# workers",
        )
        .unwrap();

        let dest = tempfile::tempdir().unwrap();
        let target = dest.path().join("terraform-modules");
        DirectoryExtractor::new(source.path()).extract(&target).unwrap();

        assert_eq!(
            std::fs::read_to_string(target.join("tinkerbell/main.tf")).unwrap(),
            "# controllers"
        );
        assert_eq!(
            std::fs::read_to_string(target.join("tinkerbell/workerpool/main.tf")).unwrap(),
            "# workers"
        );

        // Extracting again overwrites in place.
        DirectoryExtractor::new(source.path()).extract(&target).unwrap();
    }

    #[test]
    fn test_missing_source() {
        let dest = tempfile::tempdir().unwrap();
        let err = DirectoryExtractor::new("/nonexistent/kforge-modules")
            .extract(dest.path())
            .unwrap_err();
        assert!(matches!(err, AssetError::MissingSource(_)));
    }
}
