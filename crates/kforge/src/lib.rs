//! Kubernetes cluster provisioning with terraform.
//!
//! Clusters are described in a YAML document naming a state backend, an
//! infrastructure platform and optional components. Each name is looked up in
//! a [`registry`], its configuration body is decoded and validated into
//! [`diagnostics`], and the resulting implementations render terraform
//! configuration that [`provision`] hands to a [`terraform::Executor`].
//! Credentials for the resulting cluster are found by [`kubeconfig`].
//!
//! # Example
//!
//! ```rust,ignore
//! use kforge::assets::NoopExtractor;
//! use kforge::config::Config;
//! use kforge::provision::Provisioner;
//! use kforge::resolve::{configured_backend, configured_platform};
//! use kforge::terraform::{ExecutorConfig, TerraformExecutor};
//!
//! let config = Config::load("cluster.yaml".as_ref(), None)?;
//! let (backend, mut diags) = configured_backend(&config);
//! let (platform, platform_diags) = configured_platform(&config);
//! diags.extend(platform_diags);
//! if diags.has_errors() {
//!     return Err(diags.into());
//! }
//!
//! let platform = platform.expect("cluster declared");
//! let provisioner = Provisioner::new(platform.as_ref(), &NoopExtractor)
//!     .with_backend(backend.as_deref());
//! let executor = TerraformExecutor::new(ExecutorConfig::new(provisioner.root_dir()));
//! provisioner.apply(&executor)?;
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assets;
pub mod backend;
pub mod components;
pub mod config;
pub mod diagnostics;
pub mod kubeconfig;
pub mod paths;
pub mod platform;
pub mod provision;
pub mod registry;
pub mod render;
pub mod resolve;
pub mod terraform;
pub mod ui;

pub use config::Config;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use provision::{ProvisionError, Provisioner};
