//! Rendering of generated configuration.
//!
//! Terraform configuration is built with the structured [`hcl`] writer.
//! Helm chart values are rendered from compiled-in Handlebars templates.

pub mod hcl;

use handlebars::Handlebars;
use serde::Serialize;
use thiserror::Error;

/// Chart values rendering errors.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("rendering template {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: Box<handlebars::RenderError>,
    },

    /// The configuration lacks a section the values depend on.
    #[error("cannot render {component} values: {reason}")]
    Incomplete { component: String, reason: String },
}

/// Compile built-in templates.
///
/// Templates are part of the binary, so a template that fails to parse is a
/// programming error and panics.
#[must_use]
pub fn compile_templates(templates: &[(&str, &str)]) -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    // Output is YAML, not HTML.
    handlebars.register_escape_fn(handlebars::no_escape);

    for (name, source) in templates {
        if let Err(e) = handlebars.register_template_string(name, source) {
            panic!("built-in template {name} is malformed: {e}");
        }
    }
    handlebars
}

/// Render the registered template `name` with `data`.
///
/// # Errors
/// Returns an error if rendering fails.
pub fn render_template<T: Serialize>(
    handlebars: &Handlebars<'_>,
    name: &str,
    data: &T,
) -> Result<String, RenderError> {
    handlebars
        .render(name, data)
        .map_err(|source| RenderError::Template {
            name: name.to_string(),
            source: Box::new(source),
        })
}

/// Indent every non-empty line of `text` by `spaces`.
///
/// Used to embed multi-line values inside YAML literal blocks.
#[must_use]
pub fn indent(text: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
