//! Selection of the configured backend, platform and components.

use tracing::debug;

use crate::backend::Backend;
use crate::components::Component;
use crate::config::{Config, Declaration, EvalContext};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::platform::Platform;
use crate::registry::{self, Configurable, Registry};

/// Look up, decode and validate a declaration against `registry`.
///
/// An absent declaration resolves to `None` with no diagnostics. An unknown
/// name yields a single error diagnostic and nothing is decoded. Otherwise the
/// implementation is returned together with its decode and validation
/// diagnostics, which the caller must check before using it.
pub fn resolve<T>(
    registry: &Registry<T>,
    declaration: Option<&Declaration>,
    ctx: &EvalContext,
) -> (Option<Box<T>>, Diagnostics)
where
    T: Configurable + ?Sized,
{
    let Some(declaration) = declaration else {
        debug!(kind = %registry.kind(), "Nothing declared");
        return (None, Diagnostics::new());
    };

    let mut implementation = match registry.get(&declaration.name) {
        Ok(implementation) => implementation,
        Err(e) => return (None, Diagnostic::error(e.to_string(), "").into()),
    };

    debug!(kind = %registry.kind(), name = %declaration.name, "Loading configuration");
    let diags = implementation.load_config(declaration.config.as_ref(), ctx);
    (Some(implementation), diags)
}

/// The backend declared in `config`, if any.
pub fn configured_backend(config: &Config) -> (Option<Box<dyn Backend>>, Diagnostics) {
    resolve(
        registry::backends(),
        config.root.backend.as_ref(),
        &config.eval_context,
    )
}

/// The platform declared in `config`, if any.
pub fn configured_platform(config: &Config) -> (Option<Box<dyn Platform>>, Diagnostics) {
    resolve(
        registry::platforms(),
        config.root.cluster.as_ref(),
        &config.eval_context,
    )
}

/// The component named `name` if `config` declares it.
pub fn configured_component(
    config: &Config,
    name: &str,
) -> (Option<Box<dyn Component>>, Diagnostics) {
    resolve(
        registry::components(),
        config.root.component(name),
        &config.eval_context,
    )
}
