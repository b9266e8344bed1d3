//! Bare metal clusters provisioned through Tinkerbell.

mod template;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{worker_pool_names_unique, Meta, Platform, PlatformError, WorkerPool};
use crate::config::{decode_body, ConfigBody, Decode, EvalContext};
use crate::diagnostics::Diagnostics;
use crate::paths::expand_home;
use crate::registry::Configurable;
use crate::terraform::{self, Executor, CLUSTER_FILE_NAME};

/// Registered platform name.
pub const NAME: &str = "tinkerbell";

/// Tinkerbell cluster configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TinkerbellConfig {
    pub asset_dir: String,
    pub name: String,
    pub dns_zone: String,
    pub ssh_public_keys: Vec<String>,
    pub controller_ip_addresses: Vec<String>,
    #[serde(default)]
    pub controller_clc_snippets: Vec<String>,
    #[serde(default)]
    pub controller_flatcar_install_base_url: String,

    #[serde(default)]
    pub os_channel: String,
    #[serde(default)]
    pub os_version: String,

    // Generic options.
    #[serde(default)]
    pub enable_aggregation: bool,
    #[serde(default)]
    pub enable_reporting: bool,
    #[serde(default)]
    pub pod_cidr: String,
    #[serde(default)]
    pub service_cidr: String,
    #[serde(default)]
    pub cluster_domain_suffix: String,
    #[serde(default)]
    pub certs_validity_period_hours: u32,
    #[serde(default)]
    pub network_mtu: u32,

    #[serde(default)]
    pub worker_pools: Vec<TinkerbellWorkerPool>,
}

impl Default for TinkerbellConfig {
    fn default() -> Self {
        Self {
            asset_dir: String::new(),
            name: String::new(),
            dns_zone: String::new(),
            ssh_public_keys: Vec::new(),
            controller_ip_addresses: Vec::new(),
            controller_clc_snippets: Vec::new(),
            controller_flatcar_install_base_url: String::new(),
            os_channel: String::new(),
            os_version: String::new(),
            enable_aggregation: true,
            enable_reporting: false,
            pod_cidr: String::new(),
            service_cidr: String::new(),
            cluster_domain_suffix: String::new(),
            certs_validity_period_hours: 0,
            network_mtu: 0,
            worker_pools: Vec::new(),
        }
    }
}

/// Worker pool of a Tinkerbell cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TinkerbellWorkerPool {
    pub name: String,
    pub ip_addresses: Vec<String>,
    pub ssh_public_keys: Vec<String>,

    #[serde(default)]
    pub os_channel: String,
    #[serde(default)]
    pub os_version: String,
    #[serde(default)]
    pub flatcar_install_base_url: String,
    #[serde(default)]
    pub clc_snippets: Vec<String>,

    /// Kubelet labels, `key=value`.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Node taints, `key=value:Effect`.
    #[serde(default)]
    pub taints: Vec<String>,
}

impl WorkerPool for TinkerbellWorkerPool {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Decode for TinkerbellConfig {
    const REQUIRED: &'static [&'static str] = &[
        "asset_dir",
        "name",
        "dns_zone",
        "ssh_public_keys",
        "controller_ip_addresses",
    ];
}

/// Factory for the registry.
#[must_use]
pub fn new() -> Box<dyn Platform> {
    Box::new(TinkerbellConfig::default())
}

impl TinkerbellConfig {
    fn validate(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();

        for (field, value) in [
            ("asset_dir", &self.asset_dir),
            ("name", &self.name),
            ("dns_zone", &self.dns_zone),
        ] {
            if value.trim().is_empty() {
                diags.error(
                    format!("'{field}' cannot be empty"),
                    "Make sure to set the field to a valid non-empty value",
                );
            }
        }

        if self.controller_ip_addresses.is_empty() {
            diags.error(
                "'controller_ip_addresses' cannot be empty",
                "At least one controller IP address is required",
            );
        }

        if self.ssh_public_keys.is_empty() {
            diags.error(
                "'ssh_public_keys' cannot be empty",
                "At least one SSH public key is required to access controller nodes",
            );
        }

        for pool in &self.worker_pools {
            if pool.name.trim().is_empty() {
                diags.error(
                    "worker pool 'name' cannot be empty",
                    "Every worker pool needs a name, it labels the pool's terraform module",
                );
            }
            if pool.ip_addresses.is_empty() {
                diags.error(
                    format!("worker pool {:?} has no IP addresses", pool.name),
                    "Every worker pool needs at least one entry in 'ip_addresses'",
                );
            }
        }

        diags.extend(worker_pool_names_unique(&self.worker_pools));
        diags
    }
}

impl Configurable for TinkerbellConfig {
    fn load_config(&mut self, body: Option<&ConfigBody>, ctx: &EvalContext) -> Diagnostics {
        let diags = decode_body(body, ctx, self);
        if !diags.is_empty() {
            return diags;
        }
        self.validate()
    }
}

impl Platform for TinkerbellConfig {
    fn meta(&self) -> Meta {
        let workers: usize = self.worker_pools.iter().map(|p| p.ip_addresses.len()).sum();
        Meta {
            asset_dir: expand_home(&self.asset_dir),
            expected_nodes: self.controller_ip_addresses.len() + workers,
        }
    }

    fn render(&self) -> String {
        template::render(self)
    }

    fn initialize(&self, _executor: &dyn Executor) -> Result<(), PlatformError> {
        let asset_dir = expand_home(&self.asset_dir);
        let root = terraform::ensure_root_dir(&asset_dir).map_err(PlatformError::Initialize)?;

        let path = root.join(CLUSTER_FILE_NAME);
        terraform::write_file(&path, &self.render()).map_err(PlatformError::Initialize)?;

        info!(cluster = %self.name, path = %path.display(), "Cluster configuration written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terraform::{MockExecutor, TerraformError};

    const MINIMAL: &str = r"
asset_dir: /tmp/assets
name: mercury
dns_zone: example.com
ssh_public_keys: [ssh-ed25519 AAAA]
controller_ip_addresses: [10.0.0.1, 10.0.0.2, 10.0.0.3]
";

    fn load(yaml: &str) -> (TinkerbellConfig, Diagnostics) {
        let mut config = TinkerbellConfig::default();
        let body = ConfigBody::from_yaml(yaml).unwrap();
        let diags = config.load_config(Some(&body), &EvalContext::new());
        (config, diags)
    }

    fn summaries(diags: &Diagnostics) -> Vec<&str> {
        diags.iter().map(|d| d.summary.as_str()).collect()
    }

    #[test]
    fn test_defaults_survive_decode() {
        let (config, diags) = load(MINIMAL);
        assert!(diags.is_empty(), "{diags}");
        assert!(config.enable_aggregation);
        assert!(!config.enable_reporting);
        assert_eq!(config.network_mtu, 0);
        assert!(config.worker_pools.is_empty());
    }

    #[test]
    fn test_declaration_without_body_reports_required_fields() {
        let mut config = TinkerbellConfig::default();
        let diags = config.load_config(None, &EvalContext::new());

        assert_eq!(diags.len(), TinkerbellConfig::REQUIRED.len());
        assert!(diags.has_errors());
        assert!(diags
            .iter()
            .all(|d| d.summary == "Missing required argument"));
    }

    #[test]
    fn test_missing_required_fields() {
        let (_, diags) = load("name: mercury\n");
        assert_eq!(diags.len(), 4);
        assert!(diags
            .iter()
            .all(|d| d.summary == "Missing required argument"));
    }

    #[test]
    fn test_meta_counts_all_nodes() {
        let yaml = format!(
            "{MINIMAL}worker_pools:\n\
             - {{name: a, ip_addresses: [10.0.1.1, 10.0.1.2], ssh_public_keys: [k]}}\n\
             - {{name: b, ip_addresses: [10.0.2.1], ssh_public_keys: [k]}}\n"
        );
        let (config, diags) = load(&yaml);
        assert!(diags.is_empty(), "{diags}");

        let meta = config.meta();
        assert_eq!(meta.expected_nodes, 3 + 2 + 1);
        assert_eq!(meta.asset_dir, std::path::PathBuf::from("/tmp/assets"));
    }

    #[test]
    fn test_validation_is_aggregated_in_order() {
        let yaml = r#"
asset_dir: /tmp/assets
name: ""
dns_zone: example.com
ssh_public_keys: []
controller_ip_addresses: []
worker_pools:
  - {name: a, ip_addresses: [], ssh_public_keys: [k]}
  - {name: a, ip_addresses: [10.0.1.1], ssh_public_keys: [k]}
"#;
        let (_, diags) = load(yaml);
        assert_eq!(
            summaries(&diags),
            vec![
                "'name' cannot be empty",
                "'controller_ip_addresses' cannot be empty",
                "'ssh_public_keys' cannot be empty",
                "worker pool \"a\" has no IP addresses",
                "pool name \"a\" is not unique",
            ]
        );
    }

    #[test]
    fn test_worker_pool_name_cannot_be_empty() {
        let yaml = format!(
            "{MINIMAL}worker_pools:\n- {{name: \"\", ip_addresses: [10.0.1.1], ssh_public_keys: [k]}}\n"
        );
        let (_, diags) = load(&yaml);
        assert_eq!(summaries(&diags), vec!["worker pool 'name' cannot be empty"]);
    }

    #[test]
    fn test_worker_pool_missing_field_is_a_decode_error() {
        let yaml = format!("{MINIMAL}worker_pools:\n- {{name: a, ssh_public_keys: [k]}}\n");
        let (_, diags) = load(&yaml);
        assert_eq!(summaries(&diags), vec!["Invalid configuration"]);
    }

    #[test]
    fn test_initialize_writes_cluster_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TinkerbellConfig::default();
        let body = ConfigBody::from_yaml(MINIMAL).unwrap();
        let ctx = EvalContext::new();
        assert!(config.load_config(Some(&body), &ctx).is_empty());
        config.asset_dir = dir.path().join("assets").to_string_lossy().to_string();

        let executor = MockExecutor::new();
        config.initialize(&executor).unwrap();
        config.initialize(&executor).unwrap();

        let path = dir.path().join("assets/terraform").join(CLUSTER_FILE_NAME);
        assert_eq!(std::fs::read_to_string(path).unwrap(), config.render());
    }

    #[test]
    fn test_apply_initializes_before_acting() {
        let dir = tempfile::tempdir().unwrap();
        let config = TinkerbellConfig {
            asset_dir: dir.path().to_string_lossy().to_string(),
            name: "mercury".to_string(),
            ..TinkerbellConfig::default()
        };

        let cluster_file = dir.path().join("terraform").join(CLUSTER_FILE_NAME);
        let mut executor = MockExecutor::new();
        executor.expect_apply().times(1).returning(move || {
            assert!(cluster_file.exists(), "configuration must be written first");
            Ok(())
        });

        config.apply(&executor).unwrap();
    }

    #[test]
    fn test_destroy_relays_executor_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = TinkerbellConfig {
            asset_dir: dir.path().to_string_lossy().to_string(),
            ..TinkerbellConfig::default()
        };

        let mut executor = MockExecutor::new();
        executor.expect_destroy().times(1).returning(|| {
            Err(TerraformError::Failed {
                command: "destroy".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "state locked".to_string(),
            })
        });

        let err = config.destroy(&executor).unwrap_err();
        assert!(matches!(err, PlatformError::Destroy(_)));
        assert!(err.to_string().contains("state locked"));
    }
}
