//! Restic file-level backups to object storage.

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};

use super::{provider_plugin, quoted_list, Metrics, Values};
use crate::diagnostics::Diagnostics;
use crate::render::{render_template, RenderError};

pub(super) const TEMPLATE_NAME: &str = "restic";

const SUPPORTED_PROVIDERS: &[&str] = &["aws", "gcp", "azure"];

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
      region: eu-west-1
deployRestic: true
snapshotsEnabled: false
restic:
  privileged: true
{{> credentials}}
{{> footer}}
";

/// Restic plugin configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResticConfig {
    /// Cloud credentials file content.
    pub credentials: String,
    pub backup_storage_location: ResticBackupStorageLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResticBackupStorageLocation {
    pub provider: String,
    pub bucket: String,
    pub name: String,
}

impl Default for ResticBackupStorageLocation {
    fn default() -> Self {
        Self {
            provider: "aws".to_string(),
            bucket: String::new(),
            name: "default".to_string(),
        }
    }
}

impl ResticConfig {
    pub(super) fn validate(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let location = &self.backup_storage_location;

        if location.bucket.is_empty() {
            diags.error(
                "restic.backup_storage_location.bucket must not be empty",
                "Make sure `bucket` value is set",
            );
        }

        if !SUPPORTED_PROVIDERS.contains(&location.provider.as_str()) {
            diags.error(
                format!(
                    "restic.backup_storage_location.provider must be one of: {}",
                    quoted_list(SUPPORTED_PROVIDERS)
                ),
                "Make sure to set provider to one of supported values",
            );
        }

        diags
    }

    pub(super) fn render_values(
        &self,
        hb: &Handlebars<'_>,
        metrics: &Metrics,
    ) -> Result<String, RenderError> {
        let mut values = Values::new(self, &self.credentials, metrics);
        values
            .init_containers
            .extend(provider_plugin(&self.backup_storage_location.provider));
        render_template(hb, TEMPLATE_NAME, &values)
    }
}
