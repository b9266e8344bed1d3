//! Local file state backend.

use serde::{Deserialize, Serialize};

use super::{render_fragment, Backend};
use crate::config::{decode_body, ConfigBody, Decode, EvalContext};
use crate::diagnostics::Diagnostics;
use crate::registry::Configurable;
use crate::render::hcl::Block;

/// Registered backend name.
pub const NAME: &str = "local";

/// Local backend configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalBackend {
    /// State file location. Terraform's default is used when unset.
    #[serde(default)]
    pub path: String,
}

impl Decode for LocalBackend {}

/// Factory for the registry.
#[must_use]
pub fn new() -> Box<dyn Backend> {
    Box::new(LocalBackend::default())
}

impl Configurable for LocalBackend {
    fn load_config(&mut self, body: Option<&ConfigBody>, ctx: &EvalContext) -> Diagnostics {
        decode_body(body, ctx, self)
    }
}

impl Backend for LocalBackend {
    fn render(&self) -> String {
        let mut block = Block::new("backend").label(NAME);
        block.body().string_if_set("path", &self.path);
        render_fragment(block)
    }
}
