//! Root configuration document.
//!
//! A cluster is described by one YAML document holding at most one backend
//! declaration, at most one cluster (platform) declaration and any number of
//! component declarations. Each declaration names a registered capability and
//! carries an opaque body that the capability decodes into its own typed
//! configuration with [`decode_body`].

mod decode;
mod eval;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use decode::{decode_body, Decode};
pub use eval::EvalContext;

/// Errors reading or parsing configuration documents.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration file could not be read.
    #[error("reading configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration document is not valid YAML or has an unexpected shape.
    #[error("parsing {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Opaque configuration body of a declaration.
///
/// The body is only interpreted by the capability it is handed to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigBody(serde_yaml::Value);

impl ConfigBody {
    #[must_use]
    pub fn new(value: serde_yaml::Value) -> Self {
        Self(value)
    }

    /// Parse a body from YAML text.
    ///
    /// # Errors
    /// Returns an error if the text is not valid YAML.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            what: "configuration body".to_string(),
            source,
        })
    }

    #[must_use]
    pub fn as_value(&self) -> &serde_yaml::Value {
        &self.0
    }
}

/// A named backend, cluster or component declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declaration {
    /// Registered capability name, e.g. `s3` or `tinkerbell`.
    pub name: String,
    /// Body handed to the capability. `None` when the declaration has no body.
    #[serde(default)]
    pub config: Option<ConfigBody>,
}

impl Declaration {
    #[must_use]
    pub fn new(name: impl Into<String>, config: Option<ConfigBody>) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

/// The user-authored root document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootConfig {
    /// Default values for `${var.NAME}` references.
    #[serde(default)]
    pub variables: BTreeMap<String, serde_yaml::Value>,
    /// Remote state backend. Absent means local state.
    #[serde(default)]
    pub backend: Option<Declaration>,
    /// Platform the cluster runs on. Absent means no cluster is managed.
    #[serde(default)]
    pub cluster: Option<Declaration>,
    #[serde(default)]
    pub components: Vec<Declaration>,
}

impl RootConfig {
    /// Find a component declaration by name.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Declaration> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// Parsed root configuration plus the evaluation context for its bodies.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub root: RootConfig,
    pub eval_context: EvalContext,
}

impl Config {
    /// Load the root document and an optional variables file from disk.
    ///
    /// # Errors
    /// Returns an error if a file cannot be read or parsed.
    pub fn load(path: &Path, vars_path: Option<&Path>) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading configuration");
        let document = read(path)?;
        let vars = vars_path.map(read).transpose()?;
        Self::from_yaml(&document, vars.as_deref())
    }

    /// Build a configuration from YAML text.
    ///
    /// Values in `vars` override the `variables` defaults of the document.
    ///
    /// # Errors
    /// Returns an error if either document cannot be parsed.
    pub fn from_yaml(document: &str, vars: Option<&str>) -> Result<Self, ConfigError> {
        let root: RootConfig = if document.trim().is_empty() {
            RootConfig::default()
        } else {
            serde_yaml::from_str(document).map_err(|source| ConfigError::Parse {
                what: "root configuration".to_string(),
                source,
            })?
        };

        let mut variables = root.variables.clone();
        if let Some(vars) = vars.filter(|v| !v.trim().is_empty()) {
            let overrides: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(vars)
                .map_err(|source| ConfigError::Parse {
                    what: "variables file".to_string(),
                    source,
                })?;
            variables.extend(overrides);
        }

        Ok(Self {
            root,
            eval_context: EvalContext::from_variables(variables),
        })
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document() {
        let config = Config::from_yaml("", None).unwrap();
        assert!(config.root.backend.is_none());
        assert!(config.root.cluster.is_none());
        assert!(config.root.components.is_empty());
    }

    #[test]
    fn test_declaration_without_body() {
        let config = Config::from_yaml("cluster:\n  name: tinkerbell\n", None).unwrap();
        let cluster = config.root.cluster.unwrap();
        assert_eq!(cluster.name, "tinkerbell");
        assert!(cluster.config.is_none());
    }

    #[test]
    fn test_vars_override_defaults() {
        let doc = "variables:\n  region: eu-west-1\n  bucket: state\n";
        let config = Config::from_yaml(doc, Some("region: us-east-2\n")).unwrap();

        assert_eq!(
            config.eval_context.variable("region"),
            Some(&serde_yaml::Value::from("us-east-2"))
        );
        assert_eq!(
            config.eval_context.variable("bucket"),
            Some(&serde_yaml::Value::from("state"))
        );
    }

    #[test]
    fn test_unknown_top_level_key_is_rejected() {
        let err = Config::from_yaml("clusters:\n  name: x\n", None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("nope.yaml"), None).unwrap_err();
        assert!(err.to_string().contains("nope.yaml"));
    }

    #[test]
    fn test_component_lookup() {
        let doc = "components:\n  - name: velero\n    config:\n      namespace: backup\n";
        let config = Config::from_yaml(doc, None).unwrap();
        assert!(config.root.component("velero").is_some());
        assert!(config.root.component("metallb").is_none());
    }
}
