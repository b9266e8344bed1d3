//! Terraform directory layout and file materialization.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::TerraformError;
use crate::assets::AssetExtractor;

/// Root module directory name under the asset directory.
pub const ROOT_DIR_NAME: &str = "terraform";

/// Bundled modules directory name under the asset directory.
pub const MODULES_DIR_NAME: &str = "terraform-modules";

/// Backend configuration file in the root module directory.
pub const BACKEND_FILE_NAME: &str = "backend.tf";

/// Platform configuration file in the root module directory.
pub const CLUSTER_FILE_NAME: &str = "cluster.tf";

/// `<asset_dir>/terraform`
#[must_use]
pub fn root_dir(asset_dir: &Path) -> PathBuf {
    asset_dir.join(ROOT_DIR_NAME)
}

/// `<asset_dir>/terraform-modules`
#[must_use]
pub fn modules_dir(asset_dir: &Path) -> PathBuf {
    asset_dir.join(MODULES_DIR_NAME)
}

/// Create the root module directory and any missing parents.
///
/// An existing directory is not an error.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_root_dir(asset_dir: &Path) -> Result<PathBuf, TerraformError> {
    let path = root_dir(asset_dir);
    std::fs::create_dir_all(&path).map_err(|source| TerraformError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Extract bundled modules and create the root module directory.
///
/// # Errors
/// Returns an error if extraction or directory creation fails.
pub fn prepare_directory_and_modules(
    asset_dir: &Path,
    extractor: &dyn AssetExtractor,
) -> Result<(), TerraformError> {
    let modules = modules_dir(asset_dir);
    extractor
        .extract(&modules)
        .map_err(|source| TerraformError::Extract {
            path: modules.clone(),
            source,
        })?;
    debug!(path = %modules.display(), "Terraform modules extracted");

    ensure_root_dir(asset_dir)?;
    Ok(())
}

/// Write `backend.tf` wrapping the rendered backend fragment in a
/// `terraform` block.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn create_backend_file(asset_dir: &Path, fragment: &str) -> Result<(), TerraformError> {
    let path = root_dir(asset_dir).join(BACKEND_FILE_NAME);
    write_file(&path, &format!("terraform {{{fragment}}}\n"))
}

/// Prepare directories and modules, then write `backend.tf` if a backend
/// rendered anything other than whitespace.
///
/// # Errors
/// Returns an error if any step fails.
pub fn configure(
    asset_dir: &Path,
    rendered_backend: &str,
    extractor: &dyn AssetExtractor,
) -> Result<(), TerraformError> {
    prepare_directory_and_modules(asset_dir, extractor)?;

    if rendered_backend.trim().is_empty() {
        debug!("No backend configured, using local state");
        return Ok(());
    }

    create_backend_file(asset_dir, rendered_backend)?;
    info!(path = %root_dir(asset_dir).join(BACKEND_FILE_NAME).display(), "Backend configuration written");
    Ok(())
}

/// Create or truncate `path` and write `contents`, flushed to disk.
///
/// # Errors
/// Returns an error naming the path if any step fails.
pub fn write_file(path: &Path, contents: &str) -> Result<(), TerraformError> {
    let mut file = File::create(path).map_err(|source| TerraformError::CreateFile {
        path: path.to_path_buf(),
        source,
    })?;

    file.write_all(contents.as_bytes())
        .map_err(|source| TerraformError::WriteFile {
            path: path.to_path_buf(),
            source,
        })?;

    file.sync_all().map_err(|source| TerraformError::Flush {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetError, NoopExtractor};

    struct FailingExtractor;

    impl AssetExtractor for FailingExtractor {
        fn extract(&self, destination: &Path) -> Result<(), AssetError> {
            Err(AssetError::MissingSource(destination.to_path_buf()))
        }
    }

    #[test]
    fn test_configure_without_backend_writes_no_backend_file() {
        let dir = tempfile::tempdir().unwrap();
        configure(dir.path(), "  \n\t", &NoopExtractor).unwrap();

        assert!(root_dir(dir.path()).is_dir());
        assert!(modules_dir(dir.path()).is_dir());
        assert!(!root_dir(dir.path()).join(BACKEND_FILE_NAME).exists());
    }

    #[test]
    fn test_configure_with_backend_wraps_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let fragment = "\n  backend \"local\" {}\n";
        configure(dir.path(), fragment, &NoopExtractor).unwrap();

        let content =
            std::fs::read_to_string(root_dir(dir.path()).join(BACKEND_FILE_NAME)).unwrap();
        assert_eq!(content, "terraform {\n  backend \"local\" {}\n}\n");
    }

    #[test]
    fn test_root_dir_creation_tolerates_existing_and_nested() {
        let dir = tempfile::tempdir().unwrap();
        let asset_dir = dir.path().join("a/b/c");

        let first = ensure_root_dir(&asset_dir).unwrap();
        let second = ensure_root_dir(&asset_dir).unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[test]
    fn test_extraction_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = configure(dir.path(), "", &FailingExtractor).unwrap_err();
        assert!(matches!(err, TerraformError::Extract { .. }));
        assert!(!root_dir(dir.path()).exists());
    }

    #[test]
    fn test_write_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir/cluster.tf");
        let err = write_file(&path, "x").unwrap_err();
        assert!(err.to_string().contains("missing-dir/cluster.tf"));
    }
}
