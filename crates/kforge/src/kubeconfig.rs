//! Kubeconfig lookup.
//!
//! Sources are tried in a fixed order and the first one that applies wins:
//!
//! 1. an explicit override path (flag or `KUBECONFIG_FILE`),
//! 2. `<asset_dir>/cluster-assets/auth/kubeconfig` of the configured cluster,
//!    falling back to the `kubeconfig` terraform output when the file does
//!    not exist,
//! 3. the path in `KUBECONFIG`,
//! 4. `~/.kube/config`.
//!
//! A source that applies but fails to read ends the lookup with an error.
//! An override skips every other source, and a configured cluster skips the
//! environment and default paths.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::paths::expand_home;
use crate::terraform::{output_as, Executor, TerraformError};

/// Environment variable holding a kubeconfig path.
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Kubeconfig path used when nothing else applies.
pub const DEFAULT_KUBECONFIG_PATH: &str = "~/.kube/config";

/// Terraform output holding the generated kubeconfig.
pub const KUBECONFIG_OUTPUT_KEY: &str = "kubeconfig";

/// Kubeconfig lookup errors.
#[derive(Error, Debug)]
pub enum KubeconfigError {
    #[error("reading kubeconfig override {}: {source}", path.display())]
    Override {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("reading kubeconfig file {}: {source}", path.display())]
    Assets {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("reading kubeconfig file content from terraform state: {0}")]
    State(#[source] TerraformError),

    #[error("reading kubeconfig file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no valid kubeconfig found")]
    NotFound,
}

/// `<asset_dir>/cluster-assets/auth/kubeconfig`
#[must_use]
pub fn asset_kubeconfig_path(asset_dir: &Path) -> PathBuf {
    asset_dir.join("cluster-assets").join("auth").join("kubeconfig")
}

/// Outcome of one source.
#[derive(Debug)]
enum Lookup {
    Found(Vec<u8>),
    NotApplicable,
}

/// A provisioned cluster to read credentials from.
#[derive(Clone, Copy)]
pub struct ClusterSource<'a> {
    /// Asset directory, already expanded.
    pub asset_dir: &'a Path,
    /// Executor bound to the cluster's terraform root directory.
    pub executor: &'a dyn Executor,
}

/// Path-based kubeconfig sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KubeconfigSources {
    /// Explicit override. Empty means unset.
    pub override_path: String,
    /// Value of `KUBECONFIG`. Empty means unset.
    pub env_path: String,
    /// Last resort path.
    pub default_path: String,
}

type Source = fn(&KubeconfigSources, Option<ClusterSource<'_>>) -> Result<Lookup, KubeconfigError>;

impl KubeconfigSources {
    /// Sources with `KUBECONFIG` read from the process environment.
    #[must_use]
    pub fn from_env(override_path: Option<String>) -> Self {
        Self {
            override_path: override_path.unwrap_or_default(),
            env_path: std::env::var(KUBECONFIG_ENV).unwrap_or_default(),
            default_path: DEFAULT_KUBECONFIG_PATH.to_string(),
        }
    }

    /// Resolve kubeconfig content.
    ///
    /// # Errors
    /// Returns an error if the first applicable source cannot be read, or if
    /// no source applies.
    pub fn resolve(&self, cluster: Option<ClusterSource<'_>>) -> Result<Vec<u8>, KubeconfigError> {
        const CHAIN: [Source; 4] = [
            KubeconfigSources::from_override,
            KubeconfigSources::from_cluster,
            KubeconfigSources::from_env_path,
            KubeconfigSources::from_default,
        ];

        for source in CHAIN {
            if let Lookup::Found(content) = source(self, cluster)? {
                return Ok(content);
            }
        }
        Err(KubeconfigError::NotFound)
    }

    fn from_override(&self, _: Option<ClusterSource<'_>>) -> Result<Lookup, KubeconfigError> {
        if self.override_path.is_empty() {
            return Ok(Lookup::NotApplicable);
        }

        debug!(path = %self.override_path, "Using kubeconfig override");
        read_file(&self.override_path)
            .map(Lookup::Found)
            .map_err(|(path, source)| KubeconfigError::Override { path, source })
    }

    fn from_cluster(&self, cluster: Option<ClusterSource<'_>>) -> Result<Lookup, KubeconfigError> {
        let Some(cluster) = cluster else {
            return Ok(Lookup::NotApplicable);
        };

        let path = asset_kubeconfig_path(cluster.asset_dir);
        match read_file(&path) {
            Ok(content) => {
                debug!(path = %path.display(), "Using kubeconfig from assets");
                Ok(Lookup::Found(content))
            }
            Err((_, e)) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Kubeconfig not in assets, reading terraform output");
                let content: String = output_as(cluster.executor, KUBECONFIG_OUTPUT_KEY)
                    .map_err(KubeconfigError::State)?;
                Ok(Lookup::Found(content.into_bytes()))
            }
            Err((path, source)) => Err(KubeconfigError::Assets { path, source }),
        }
    }

    fn from_env_path(&self, cluster: Option<ClusterSource<'_>>) -> Result<Lookup, KubeconfigError> {
        if cluster.is_some() || self.env_path.is_empty() {
            return Ok(Lookup::NotApplicable);
        }

        debug!(path = %self.env_path, "Using kubeconfig from {KUBECONFIG_ENV}");
        read_path(&self.env_path)
    }

    fn from_default(&self, cluster: Option<ClusterSource<'_>>) -> Result<Lookup, KubeconfigError> {
        if cluster.is_some() || self.default_path.is_empty() {
            return Ok(Lookup::NotApplicable);
        }

        debug!(path = %self.default_path, "Using default kubeconfig");
        read_path(&self.default_path)
    }
}

fn read_path(path: &str) -> Result<Lookup, KubeconfigError> {
    read_file(path)
        .map(Lookup::Found)
        .map_err(|(path, source)| KubeconfigError::Read { path, source })
}

/// Read `path` after expanding a leading `~`. Errors carry the path read.
fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>, (PathBuf, io::Error)> {
    let path = expand_home(path);
    std::fs::read(&path).map_err(|e| (path, e))
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use serial_test::serial;

    use super::*;
    use crate::terraform::MockExecutor;

    fn write(dir: &Path, name: &str, content: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path.to_string_lossy().to_string()
    }

    fn sources(override_path: &str, env_path: &str, default_path: &str) -> KubeconfigSources {
        KubeconfigSources {
            override_path: override_path.to_string(),
            env_path: env_path.to_string(),
            default_path: default_path.to_string(),
        }
    }

    fn unused_executor() -> MockExecutor {
        let mut executor = MockExecutor::new();
        executor.expect_output().never();
        executor
    }

    #[test]
    #[serial]
    fn test_env_path_without_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "foo", "X");

        std::env::set_var(KUBECONFIG_ENV, &path);
        let sources = KubeconfigSources::from_env(None);
        std::env::remove_var(KUBECONFIG_ENV);

        assert_eq!(sources.env_path, path);
        assert_eq!(sources.resolve(None).unwrap(), b"X");
    }

    #[test]
    fn test_asset_file_wins_over_env() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = write(dir.path(), "env-kubeconfig", "X");
        let asset_file = asset_kubeconfig_path(dir.path());
        std::fs::create_dir_all(asset_file.parent().unwrap()).unwrap();
        std::fs::write(&asset_file, "Y").unwrap();

        let executor = unused_executor();
        let cluster = ClusterSource {
            asset_dir: dir.path(),
            executor: &executor,
        };

        let content = sources("", &env_path, DEFAULT_KUBECONFIG_PATH)
            .resolve(Some(cluster))
            .unwrap();
        assert_eq!(content, b"Y");
    }

    #[test]
    fn test_missing_asset_file_reads_terraform_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = MockExecutor::new();
        executor
            .expect_output()
            .with(eq(KUBECONFIG_OUTPUT_KEY))
            .times(1)
            .returning(|_| Ok(serde_json::Value::from("Z")));

        let cluster = ClusterSource {
            asset_dir: dir.path(),
            executor: &executor,
        };
        let content = sources("", "", DEFAULT_KUBECONFIG_PATH)
            .resolve(Some(cluster))
            .unwrap();
        assert_eq!(content, b"Z");
    }

    #[test]
    fn test_terraform_output_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = write(dir.path(), "env-kubeconfig", "X");
        let mut executor = MockExecutor::new();
        executor.expect_output().returning(|_| {
            Err(TerraformError::Failed {
                command: "output".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "no state".to_string(),
            })
        });

        let cluster = ClusterSource {
            asset_dir: dir.path(),
            executor: &executor,
        };
        let err = sources("", &env_path, "")
            .resolve(Some(cluster))
            .unwrap_err();
        assert!(matches!(err, KubeconfigError::State(_)));
    }

    #[test]
    fn test_unreadable_asset_path_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be fails with something other
        // than "not found".
        std::fs::create_dir_all(asset_kubeconfig_path(dir.path())).unwrap();

        let executor = unused_executor();
        let cluster = ClusterSource {
            asset_dir: dir.path(),
            executor: &executor,
        };
        let err = sources("", "", "").resolve(Some(cluster)).unwrap_err();
        assert!(matches!(err, KubeconfigError::Assets { .. }));
    }

    #[test]
    fn test_override_wins_over_everything() {
        let dir = tempfile::tempdir().unwrap();
        let override_path = write(dir.path(), "override", "O");
        let asset_file = asset_kubeconfig_path(dir.path());
        std::fs::create_dir_all(asset_file.parent().unwrap()).unwrap();
        std::fs::write(&asset_file, "Y").unwrap();

        let executor = unused_executor();
        let cluster = ClusterSource {
            asset_dir: dir.path(),
            executor: &executor,
        };
        let content = sources(&override_path, "", "")
            .resolve(Some(cluster))
            .unwrap();
        assert_eq!(content, b"O");
    }

    #[test]
    fn test_missing_override_does_not_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = write(dir.path(), "env-kubeconfig", "X");
        let missing = dir.path().join("missing").to_string_lossy().to_string();

        let err = sources(&missing, &env_path, "").resolve(None).unwrap_err();
        assert!(matches!(err, KubeconfigError::Override { .. }));
    }

    #[test]
    fn test_missing_override_skips_cluster_sources() {
        let dir = tempfile::tempdir().unwrap();
        let asset_file = asset_kubeconfig_path(dir.path());
        std::fs::create_dir_all(asset_file.parent().unwrap()).unwrap();
        std::fs::write(&asset_file, "Y").unwrap();
        let missing = dir.path().join("missing").to_string_lossy().to_string();

        let executor = unused_executor();
        let cluster = ClusterSource {
            asset_dir: dir.path(),
            executor: &executor,
        };
        let err = sources(&missing, "", "")
            .resolve(Some(cluster))
            .unwrap_err();
        assert!(matches!(err, KubeconfigError::Override { .. }));
    }

    #[test]
    fn test_default_path_without_env() {
        let dir = tempfile::tempdir().unwrap();
        let default_path = write(dir.path(), "config", "D");
        assert_eq!(sources("", "", &default_path).resolve(None).unwrap(), b"D");
    }

    #[test]
    fn test_missing_env_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let default_path = write(dir.path(), "config", "D");
        let missing = dir.path().join("missing").to_string_lossy().to_string();

        let err = sources("", &missing, &default_path).resolve(None).unwrap_err();
        assert!(matches!(err, KubeconfigError::Read { .. }));
    }

    #[test]
    fn test_nothing_applies() {
        let err = sources("", "", "").resolve(None).unwrap_err();
        assert!(matches!(err, KubeconfigError::NotFound));
    }
}
