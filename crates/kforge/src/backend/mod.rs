//! Remote state backends.
//!
//! A backend decides where terraform keeps its state. It renders the
//! `backend` block that goes inside `terraform { ... }` in `backend.tf`.

pub mod local;
pub mod s3;

use crate::registry::Configurable;
use crate::render::hcl::{Block, Body};

/// A terraform state backend.
pub trait Backend: Configurable + Send + Sync {
    /// Render the backend block, indented to sit inside a `terraform` block.
    ///
    /// Rendering is pure: the same configuration always renders the same text.
    fn render(&self) -> String;
}

/// Render `block` as the body of a `terraform` block.
pub(crate) fn render_fragment(block: Block) -> String {
    let mut body = Body::new();
    body.block(block);
    format!("\n{}", body.render_indented(1))
}
