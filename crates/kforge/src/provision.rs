//! Cluster provisioning.
//!
//! Every run prepares the terraform directories and the optional backend
//! file first, then hands over to the platform, which regenerates its own
//! configuration before invoking the executor.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::assets::AssetExtractor;
use crate::backend::Backend;
use crate::platform::{Platform, PlatformError};
use crate::terraform::{self, Executor, TerraformError};

/// Provisioning errors.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("creating terraform directories and backend file: {0}")]
    Configure(#[source] TerraformError),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Drives one platform, and optionally a backend, through terraform.
pub struct Provisioner<'a> {
    platform: &'a dyn Platform,
    backend: Option<&'a dyn Backend>,
    extractor: &'a dyn AssetExtractor,
    asset_dir: PathBuf,
}

impl<'a> Provisioner<'a> {
    /// Provision `platform` with terraform's local state.
    #[must_use]
    pub fn new(platform: &'a dyn Platform, extractor: &'a dyn AssetExtractor) -> Self {
        Self {
            platform,
            backend: None,
            extractor,
            asset_dir: platform.meta().asset_dir,
        }
    }

    /// Keep terraform state in `backend`.
    #[must_use]
    pub fn with_backend(mut self, backend: Option<&'a dyn Backend>) -> Self {
        self.backend = backend;
        self
    }

    #[must_use]
    pub fn asset_dir(&self) -> &Path {
        &self.asset_dir
    }

    /// Root module directory the executor must run in.
    #[must_use]
    pub fn root_dir(&self) -> PathBuf {
        terraform::root_dir(&self.asset_dir)
    }

    /// Extract modules, create the root directory and write `backend.tf`
    /// when a backend is set.
    ///
    /// # Errors
    /// Returns an error if any directory or file cannot be written.
    pub fn configure(&self) -> Result<(), ProvisionError> {
        let rendered = self.backend.map(|b| b.render()).unwrap_or_default();
        terraform::configure(&self.asset_dir, &rendered, self.extractor)
            .map_err(ProvisionError::Configure)
    }

    /// Configure, then create or update the cluster.
    ///
    /// # Errors
    /// Returns an error naming the stage that failed.
    pub fn apply(&self, executor: &dyn Executor) -> Result<(), ProvisionError> {
        self.configure()?;
        info!(asset_dir = %self.asset_dir.display(), "Applying cluster configuration");
        self.platform.apply(executor)?;
        info!(nodes = self.platform.meta().expected_nodes, "Cluster applied");
        Ok(())
    }

    /// Configure, then destroy the cluster.
    ///
    /// # Errors
    /// Returns an error naming the stage that failed.
    pub fn destroy(&self, executor: &dyn Executor) -> Result<(), ProvisionError> {
        self.configure()?;
        info!(asset_dir = %self.asset_dir.display(), "Destroying cluster");
        self.platform.destroy(executor)?;
        info!("Cluster destroyed");
        Ok(())
    }
}
