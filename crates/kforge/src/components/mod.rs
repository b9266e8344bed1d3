//! Cluster components deployed as Helm charts.
//!
//! A component renders the values file for its chart. Installing the chart
//! is left to the package deployment tooling.

pub mod velero;

use crate::registry::Configurable;
use crate::render::RenderError;

/// A deployable cluster component.
pub trait Component: Configurable + Send + Sync {
    /// Render the chart values as YAML.
    ///
    /// # Errors
    /// Returns an error if the values template cannot be rendered.
    fn render_values(&self) -> Result<String, RenderError>;

    /// Namespace the chart is installed into.
    fn namespace(&self) -> &str;
}
