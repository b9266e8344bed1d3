//! Azure blob storage and managed disk snapshots.

use std::fmt::Write as _;

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};

use super::{require_non_empty, Metrics, Values, AZURE_PLUGIN};
use crate::diagnostics::Diagnostics;
use crate::render::{render_template, RenderError};

pub(super) const TEMPLATE_NAME: &str = "azure";

pub(super) const CHART_VALUES: &str = "\
configuration:
  provider: azure
  backupStorageLocation:
    name: azure
    provider: velero.io/azure
    bucket: {{plugin.backup_storage_location.bucket}}
    config:
      resourceGroup: {{plugin.backup_storage_location.resource_group}}
      storageAccount: {{plugin.backup_storage_location.storage_account}}
  volumeSnapshotLocation:
    name: azure
    config:
{{#if plugin.volume_snapshot_location.resource_group}}
      resourceGroup: {{plugin.volume_snapshot_location.resource_group}}
{{/if}}
      apitimeout: {{plugin.volume_snapshot_location.api_timeout}}
{{> credentials}}
{{> footer}}
";

/// Azure plugin configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AzureConfig {
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub resource_group: String,
    pub backup_storage_location: AzureBackupStorageLocation,
    pub volume_snapshot_location: AzureVolumeSnapshotLocation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AzureBackupStorageLocation {
    pub resource_group: String,
    pub storage_account: String,
    /// Blob container.
    pub bucket: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AzureVolumeSnapshotLocation {
    /// Defaults to the resource group of the cluster's disks.
    pub resource_group: String,
    pub api_timeout: String,
}

impl Default for AzureVolumeSnapshotLocation {
    fn default() -> Self {
        Self {
            resource_group: String::new(),
            api_timeout: "10m".to_string(),
        }
    }
}

impl AzureConfig {
    pub(super) fn validate(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let location = &self.backup_storage_location;

        for (field, value) in [
            ("azure.subscription_id", &self.subscription_id),
            ("azure.tenant_id", &self.tenant_id),
            ("azure.client_id", &self.client_id),
            ("azure.client_secret", &self.client_secret),
            ("azure.resource_group", &self.resource_group),
            (
                "azure.backup_storage_location.resource_group",
                &location.resource_group,
            ),
            (
                "azure.backup_storage_location.storage_account",
                &location.storage_account,
            ),
            ("azure.backup_storage_location.bucket", &location.bucket),
        ] {
            require_non_empty(&mut diags, field, value);
        }

        diags
    }

    /// Environment file read by the Azure plugin.
    fn credentials(&self) -> String {
        let mut out = String::new();
        for (key, value) in [
            ("AZURE_SUBSCRIPTION_ID", &self.subscription_id),
            ("AZURE_TENANT_ID", &self.tenant_id),
            ("AZURE_CLIENT_ID", &self.client_id),
            ("AZURE_CLIENT_SECRET", &self.client_secret),
            ("AZURE_RESOURCE_GROUP", &self.resource_group),
        ] {
            let _ = writeln!(out, "{key}: \"{value}\"");
        }
        out
    }

    pub(super) fn render_values(
        &self,
        hb: &Handlebars<'_>,
        metrics: &Metrics,
    ) -> Result<String, RenderError> {
        let mut values = Values::new(self, &self.credentials(), metrics);
        values.init_containers.push(AZURE_PLUGIN);
        render_template(hb, TEMPLATE_NAME, &values)
    }
}
