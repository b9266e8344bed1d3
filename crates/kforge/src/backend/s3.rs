//! S3 remote state backend.

use serde::{Deserialize, Serialize};

use super::{render_fragment, Backend};
use crate::config::{decode_body, ConfigBody, Decode, EvalContext};
use crate::diagnostics::Diagnostics;
use crate::registry::Configurable;
use crate::render::hcl::Block;

/// Registered backend name.
pub const NAME: &str = "s3";

/// S3 backend configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct S3Backend {
    pub bucket: String,
    pub key: String,
    pub region: String,
    /// Shared AWS credentials file.
    #[serde(default)]
    pub aws_creds_path: String,
    /// DynamoDB table used for state locking.
    #[serde(default)]
    pub dynamodb_table: String,
}

impl Decode for S3Backend {
    const REQUIRED: &'static [&'static str] = &["bucket", "key", "region"];
}

/// Factory for the registry.
#[must_use]
pub fn new() -> Box<dyn Backend> {
    Box::new(S3Backend::default())
}

impl S3Backend {
    fn validate(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();
        for (field, value) in [
            ("bucket", &self.bucket),
            ("key", &self.key),
            ("region", &self.region),
        ] {
            if value.trim().is_empty() {
                diags.error(
                    format!("'{field}' cannot be empty"),
                    "Make sure to set the field to a valid non-empty value",
                );
            }
        }
        diags
    }
}

impl Configurable for S3Backend {
    fn load_config(&mut self, body: Option<&ConfigBody>, ctx: &EvalContext) -> Diagnostics {
        let mut diags = decode_body(body, ctx, self);
        if diags.has_errors() {
            return diags;
        }
        diags.extend(self.validate());
        diags
    }
}

impl Backend for S3Backend {
    fn render(&self) -> String {
        let mut block = Block::new("backend").label(NAME);
        block
            .body()
            .attr("bucket", self.bucket.as_str())
            .attr("key", self.key.as_str())
            .attr("region", self.region.as_str())
            .string_if_set("shared_credentials_file", &self.aws_creds_path)
            .string_if_set("dynamodb_table", &self.dynamodb_table);
        render_fragment(block)
    }
}
