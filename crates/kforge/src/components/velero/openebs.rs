//! OpenEBS cStor volume snapshots.

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};

use super::{provider_plugin, quoted_list, Metrics, Values, OPENEBS_PLUGIN};
use crate::diagnostics::Diagnostics;
use crate::render::{render_template, RenderError};

pub(super) const TEMPLATE_NAME: &str = "openebs";

const SUPPORTED_PROVIDERS: &[&str] = &["aws", "gcp"];

pub(super) const CHART_VALUES: &str = "\
configuration:
  provider: {{plugin.backup_storage_location.provider}}
  backupStorageLocation:
{{#if plugin.backup_storage_location.provider}}
    provider: {{plugin.backup_storage_location.provider}}
{{/if}}
{{#if plugin.backup_storage_location.name}}
    name: {{plugin.backup_storage_location.name}}
{{/if}}
    bucket: {{plugin.backup_storage_location.bucket}}
    config:
      region: {{plugin.backup_storage_location.region}}
  volumeSnapshotLocation:
    provider: openebs.io/cstor-blockstore
{{#if plugin.volume_snapshot_location.name}}
    name: {{plugin.volume_snapshot_location.name}}
{{/if}}
    config:
{{#with plugin.volume_snapshot_location}}
{{#if provider}}
      provider: {{provider}}
{{/if}}
{{#if bucket}}
      bucket: {{bucket}}
{{/if}}
{{#if prefix}}
      prefix: {{prefix}}
{{/if}}
{{#if region}}
      region: {{region}}
{{/if}}
{{#if openebs_namespace}}
      namespace: {{openebs_namespace}}
{{/if}}
{{#if s3_url}}
      s3_url: {{s3_url}}
{{/if}}
{{#if local}}
      local: {{local}}
{{/if}}
{{/with}}
{{> credentials}}
{{> footer}}
";

/// OpenEBS plugin configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenEbsConfig {
    /// Cloud credentials file content.
    pub credentials: String,
    pub backup_storage_location: OpenEbsBackupStorageLocation,
    pub volume_snapshot_location: OpenEbsVolumeSnapshotLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenEbsBackupStorageLocation {
    pub bucket: String,
    pub region: String,
    pub provider: String,
    pub name: String,
}

impl Default for OpenEbsBackupStorageLocation {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: String::new(),
            provider: "aws".to_string(),
            name: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenEbsVolumeSnapshotLocation {
    pub bucket: String,
    pub region: String,
    pub provider: String,
    pub name: String,
    /// Object name prefix for snapshots.
    pub prefix: String,
    /// Keep snapshots in the cluster instead of uploading them.
    pub local: bool,
    /// Namespace OpenEBS runs in.
    pub openebs_namespace: String,
    /// S3-compatible endpoint, e.g. for MinIO.
    pub s3_url: String,
}

impl Default for OpenEbsVolumeSnapshotLocation {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: String::new(),
            provider: "aws".to_string(),
            name: "default".to_string(),
            prefix: "cstor".to_string(),
            local: false,
            openebs_namespace: "openebs".to_string(),
            s3_url: String::new(),
        }
    }
}

impl OpenEbsConfig {
    pub(super) fn validate(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let backup = &self.backup_storage_location;
        let snapshot = &self.volume_snapshot_location;

        if self.credentials.is_empty() {
            diags.error("'credentials' cannot be empty", "No credentials found.");
        }

        for (field, value) in [
            ("backup_storage_location.bucket", &backup.bucket),
            ("backup_storage_location.region", &backup.region),
            ("volume_snapshot_location.bucket", &snapshot.bucket),
            ("volume_snapshot_location.region", &snapshot.region),
        ] {
            if value.is_empty() {
                diags.error(
                    format!("'openebs.{field}' cannot be empty"),
                    "Make sure to set the field to a valid non-empty value",
                );
            }
        }

        for (field, provider) in [
            ("backup_storage_location", &backup.provider),
            ("volume_snapshot_location", &snapshot.provider),
        ] {
            if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
                diags.error(
                    format!(
                        "openebs.{field}.provider must be one of: {}",
                        quoted_list(SUPPORTED_PROVIDERS)
                    ),
                    "Make sure to set provider to one of supported values",
                );
            }
        }

        diags
    }

    pub(super) fn render_values(
        &self,
        hb: &Handlebars<'_>,
        metrics: &Metrics,
    ) -> Result<String, RenderError> {
        let mut values = Values::new(self, &self.credentials, metrics);
        values.init_containers.push(OPENEBS_PLUGIN);
        values
            .init_containers
            .extend(provider_plugin(&self.backup_storage_location.provider));
        render_template(hb, TEMPLATE_NAME, &values)
    }
}
