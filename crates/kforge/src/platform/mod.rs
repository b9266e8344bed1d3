//! Infrastructure platforms.
//!
//! A platform owns the cluster configuration for one kind of infrastructure.
//! It renders the root terraform module and drives the executor through the
//! two-phase contract: [`Platform::initialize`] regenerates configuration on
//! disk, then [`Platform::apply`] or [`Platform::destroy`] act on it.

pub mod tinkerbell;

use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::registry::Configurable;
use crate::terraform::{Executor, TerraformError};

/// Summary derived from a platform configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    /// Asset directory with any leading `~` expanded.
    pub asset_dir: PathBuf,
    /// Controller nodes plus the nodes of every worker pool.
    pub expected_nodes: usize,
}

/// Platform lifecycle errors, tagged with the stage that failed.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("initializing terraform configuration: {0}")]
    Initialize(#[source] TerraformError),

    #[error("applying terraform configuration: {0}")]
    Apply(#[source] TerraformError),

    #[error("destroying cluster: {0}")]
    Destroy(#[source] TerraformError),
}

/// An infrastructure platform.
pub trait Platform: Configurable + Send + Sync {
    fn meta(&self) -> Meta;

    /// Render the root module configuration. Pure and deterministic.
    fn render(&self) -> String;

    /// Materialize the rendered configuration under the asset directory.
    ///
    /// Safe to call repeatedly; each call rewrites the file from the current
    /// configuration.
    ///
    /// # Errors
    /// Returns an error if a directory or file cannot be written.
    fn initialize(&self, executor: &dyn Executor) -> Result<(), PlatformError>;

    /// Initialize, then converge infrastructure.
    ///
    /// # Errors
    /// Returns an error naming the stage that failed.
    fn apply(&self, executor: &dyn Executor) -> Result<(), PlatformError> {
        self.initialize(executor)?;
        executor.apply().map_err(PlatformError::Apply)
    }

    /// Initialize, then tear down infrastructure.
    ///
    /// # Errors
    /// Returns an error naming the stage that failed.
    fn destroy(&self, executor: &dyn Executor) -> Result<(), PlatformError> {
        self.initialize(executor)?;
        executor.destroy().map_err(PlatformError::Destroy)
    }
}

/// A named group of worker nodes.
pub trait WorkerPool {
    fn name(&self) -> &str;
}

/// Report every worker pool name used more than once.
///
/// Each duplicated name yields one diagnostic, however often it repeats.
pub fn worker_pool_names_unique<P: WorkerPool>(pools: &[P]) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();

    for pool in pools {
        let name = pool.name();
        if seen.insert(name) || !reported.insert(name) {
            continue;
        }
        diags.error(
            format!("pool name {name:?} is not unique"),
            format!("worker pool names must be unique, found {name:?} more than once"),
        );
    }

    diags
}
