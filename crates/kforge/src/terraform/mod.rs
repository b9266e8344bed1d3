//! Terraform invocation and on-disk layout.
//!
//! Generated configuration lives under `<asset_dir>/terraform`, bundled
//! modules under `<asset_dir>/terraform-modules`. The [`Executor`] trait is
//! the only way the rest of the crate talks to the terraform binary.

mod executor;
mod layout;

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::assets::AssetError;

pub use executor::{ExecutorConfig, TerraformExecutor, DEFAULT_BINARY};
pub use layout::{
    configure, create_backend_file, ensure_root_dir, modules_dir, prepare_directory_and_modules,
    root_dir, write_file, BACKEND_FILE_NAME, CLUSTER_FILE_NAME, MODULES_DIR_NAME, ROOT_DIR_NAME,
};

/// Errors preparing files for, or running, terraform.
#[derive(Error, Debug)]
pub enum TerraformError {
    #[error("creating directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("creating file {}: {source}", path.display())]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("writing to file {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("flushing data to file {}: {source}", path.display())]
    Flush {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("extracting terraform modules to {}: {source}", path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: AssetError,
    },

    /// The terraform process could not be started.
    #[error("running {program} {command}: {source}")]
    Spawn {
        program: String,
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The terraform process exited unsuccessfully.
    #[error("terraform {command} failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    /// A recorded output could not be decoded.
    #[error("decoding terraform output {key:?}: {source}")]
    Output {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Runs terraform against a prepared root directory.
///
/// Every call blocks until the underlying process exits.
#[cfg_attr(test, mockall::automock)]
pub trait Executor {
    /// Converge infrastructure to the configuration.
    ///
    /// # Errors
    /// Returns an error if terraform fails.
    fn apply(&self) -> Result<(), TerraformError>;

    /// Tear down everything in the state.
    ///
    /// # Errors
    /// Returns an error if terraform fails.
    fn destroy(&self) -> Result<(), TerraformError>;

    /// Read a named output from the recorded state.
    ///
    /// # Errors
    /// Returns an error if the output does not exist or terraform fails.
    fn output(&self, key: &str) -> Result<serde_json::Value, TerraformError>;
}

/// Read a named output and decode it into `T`.
///
/// # Errors
/// Returns an error if reading or decoding fails.
pub fn output_as<T, E>(executor: &E, key: &str) -> Result<T, TerraformError>
where
    T: DeserializeOwned,
    E: Executor + ?Sized,
{
    let value = executor.output(key)?;
    serde_json::from_value(value).map_err(|source| TerraformError::Output {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;

    #[test]
    fn test_output_as_string() {
        let mut executor = MockExecutor::new();
        executor
            .expect_output()
            .with(eq("kubeconfig"))
            .times(1)
            .returning(|_| Ok(serde_json::Value::from("apiVersion: v1\n")));

        let value: String = output_as(&executor, "kubeconfig").unwrap();
        assert_eq!(value, "apiVersion: v1\n");
    }

    #[test]
    fn test_output_type_mismatch() {
        let mut executor = MockExecutor::new();
        executor
            .expect_output()
            .returning(|_| Ok(serde_json::json!({"not": "a string"})));

        let err = output_as::<String, _>(&executor, "kubeconfig").unwrap_err();
        assert!(matches!(err, TerraformError::Output { ref key, .. } if key == "kubeconfig"));
    }
}
