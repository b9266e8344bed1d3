//! Velero backup component.
//!
//! Exactly one storage plugin is configured: `azure`, `openebs` or `restic`.
//! Each plugin contributes its own chart values template; the credentials
//! secret, metrics and plugin init containers are shared.

mod azure;
mod openebs;
mod restic;

use std::sync::OnceLock;

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};

pub use azure::{AzureBackupStorageLocation, AzureConfig, AzureVolumeSnapshotLocation};
pub use openebs::{OpenEbsBackupStorageLocation, OpenEbsConfig, OpenEbsVolumeSnapshotLocation};
pub use restic::{ResticBackupStorageLocation, ResticConfig};

use super::Component;
use crate::config::{decode_body, ConfigBody, Decode, EvalContext};
use crate::diagnostics::Diagnostics;
use crate::registry::Configurable;
use crate::render::{compile_templates, indent, RenderError};

/// Registered component name.
pub const NAME: &str = "velero";

const DEFAULT_NAMESPACE: &str = "velero";

/// Credentials are embedded in a literal block nested three levels deep.
const CREDENTIALS_INDENT: usize = 6;

const CREDENTIALS_PARTIAL: &str = "\
credentials:
  secretContents:
{{#if credentials}}
    cloud: |
{{credentials}}
{{/if}}
";

const FOOTER_PARTIAL: &str = "\
metrics:
  enabled: {{metrics.enabled}}
  serviceMonitor:
    enabled: {{metrics.service_monitor}}
    additionalLabels:
      release: prometheus-operator
initContainers:
{{#each init_containers}}
- image: {{image}}
  imagePullPolicy: IfNotPresent
  name: {{name}}
  resources: {}
  terminationMessagePath: /dev/termination-log
  terminationMessagePolicy: File
  volumeMounts:
  - mountPath: /target
    name: plugins
{{/each}}
";

/// Velero configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VeleroConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub azure: Option<AzureConfig>,
    #[serde(default)]
    pub openebs: Option<OpenEbsConfig>,
    #[serde(default)]
    pub restic: Option<ResticConfig>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Default for VeleroConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            metrics: Metrics::default(),
            azure: None,
            openebs: None,
            restic: None,
        }
    }
}

impl Decode for VeleroConfig {}

/// Prometheus metrics settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Metrics {
    pub enabled: bool,
    /// Create a `ServiceMonitor` for the Prometheus operator.
    pub service_monitor: bool,
}

/// A Velero plugin init container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct PluginImage {
    name: &'static str,
    image: &'static str,
}

const AWS_PLUGIN: PluginImage = PluginImage {
    name: "velero-plugin-for-aws",
    image: "velero/velero-plugin-for-aws:v1.1.0",
};

const GCP_PLUGIN: PluginImage = PluginImage {
    name: "velero-plugin-for-gcp",
    image: "velero/velero-plugin-for-gcp:v1.1.0",
};

const AZURE_PLUGIN: PluginImage = PluginImage {
    name: "velero-plugin-for-azure",
    image: "velero/velero-plugin-for-microsoft-azure:v1.1.0",
};

const OPENEBS_PLUGIN: PluginImage = PluginImage {
    name: "velero-plugin-for-openebs",
    image: "openebs/velero-plugin:2.0.0",
};

/// Object storage plugin for a cloud provider name.
fn provider_plugin(provider: &str) -> Option<PluginImage> {
    match provider {
        "aws" => Some(AWS_PLUGIN),
        "gcp" => Some(GCP_PLUGIN),
        "azure" => Some(AZURE_PLUGIN),
        _ => None,
    }
}

/// `'a', 'b'` for diagnostics.
fn quoted_list(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("'{v}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn require_non_empty(diags: &mut Diagnostics, field: &str, value: &str) {
    if value.is_empty() {
        diags.error(
            format!("'{field}' cannot be empty"),
            "Make sure to set the field to a valid non-empty value",
        );
    }
}

/// Data handed to a plugin's chart values template.
#[derive(Serialize)]
struct Values<'a, P: Serialize> {
    plugin: &'a P,
    /// Credentials already indented for the literal block, or empty.
    credentials: String,
    metrics: &'a Metrics,
    init_containers: Vec<PluginImage>,
}

impl<'a, P: Serialize> Values<'a, P> {
    fn new(plugin: &'a P, credentials: &str, metrics: &'a Metrics) -> Self {
        Self {
            plugin,
            credentials: indent(credentials, CREDENTIALS_INDENT),
            metrics,
            init_containers: Vec::new(),
        }
    }
}

fn templates() -> &'static Handlebars<'static> {
    static TEMPLATES: OnceLock<Handlebars<'static>> = OnceLock::new();
    TEMPLATES.get_or_init(|| {
        compile_templates(&[
            ("credentials", CREDENTIALS_PARTIAL),
            ("footer", FOOTER_PARTIAL),
            (azure::TEMPLATE_NAME, azure::CHART_VALUES),
            (openebs::TEMPLATE_NAME, openebs::CHART_VALUES),
            (restic::TEMPLATE_NAME, restic::CHART_VALUES),
        ])
    })
}

/// Factory for the registry.
#[must_use]
pub fn new() -> Box<dyn Component> {
    Box::new(VeleroConfig::default())
}

impl VeleroConfig {
    fn configured_plugins(&self) -> usize {
        usize::from(self.azure.is_some())
            + usize::from(self.openebs.is_some())
            + usize::from(self.restic.is_some())
    }

    fn validate(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();

        require_non_empty(&mut diags, "namespace", &self.namespace);

        match self.configured_plugins() {
            0 => diags.error(
                "no velero plugin configured",
                "Configure one of 'azure', 'openebs' or 'restic'",
            ),
            1 => {}
            _ => diags.error(
                "only one velero plugin can be configured",
                "Remove all but one of 'azure', 'openebs' and 'restic'",
            ),
        }

        if let Some(azure) = &self.azure {
            diags.extend(azure.validate());
        }
        if let Some(openebs) = &self.openebs {
            diags.extend(openebs.validate());
        }
        if let Some(restic) = &self.restic {
            diags.extend(restic.validate());
        }

        diags
    }
}

impl Configurable for VeleroConfig {
    fn load_config(&mut self, body: Option<&ConfigBody>, ctx: &EvalContext) -> Diagnostics {
        let diags = decode_body(body, ctx, self);
        if diags.has_errors() {
            return diags;
        }
        self.validate()
    }
}

impl Component for VeleroConfig {
    fn render_values(&self) -> Result<String, RenderError> {
        let hb = templates();
        match (&self.azure, &self.openebs, &self.restic) {
            (Some(azure), None, None) => azure.render_values(hb, &self.metrics),
            (None, Some(openebs), None) => openebs.render_values(hb, &self.metrics),
            (None, None, Some(restic)) => restic.render_values(hb, &self.metrics),
            _ => Err(RenderError::Incomplete {
                component: NAME.to_string(),
                reason: "exactly one plugin must be configured".to_string(),
            }),
        }
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }
}
