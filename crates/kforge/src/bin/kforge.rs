//! kforge CLI - Kubernetes cluster provisioning with terraform.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Confirm};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use kforge::assets::{AssetExtractor, DirectoryExtractor, NoopExtractor};
use kforge::backend::Backend;
use kforge::config::Config;
use kforge::diagnostics::Diagnostics;
use kforge::kubeconfig::{asset_kubeconfig_path, ClusterSource, KubeconfigSources};
use kforge::platform::Platform;
use kforge::provision::Provisioner;
use kforge::resolve::{configured_backend, configured_component, configured_platform};
use kforge::terraform::{self, ExecutorConfig, TerraformExecutor, DEFAULT_BINARY};
use kforge::ui;

/// kforge - provision and manage Kubernetes clusters.
#[derive(Parser)]
#[command(name = "kforge")]
#[command(about = "Provision and manage Kubernetes clusters")]
struct Cli {
    /// Cluster configuration file.
    #[arg(short, long, env = "KFORGE_CONFIG", default_value = "cluster.yaml")]
    config: PathBuf,

    /// Variables file overriding the configuration's `variables`.
    #[arg(long, env = "KFORGE_VARS")]
    vars: Option<PathBuf>,

    /// Kubeconfig to use instead of the cluster's own.
    #[arg(long, env = "KUBECONFIG_FILE")]
    kubeconfig_file: Option<String>,

    /// Directory holding the bundled terraform modules.
    #[arg(long, env = "KFORGE_MODULES_DIR")]
    modules_dir: Option<PathBuf>,

    /// Terraform binary.
    #[arg(long, env = "KFORGE_TERRAFORM_BIN", default_value = DEFAULT_BINARY)]
    terraform_bin: String,

    /// Enable verbose logging and stream terraform output.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the cluster declared in the configuration.
    Cluster {
        #[command(subcommand)]
        command: ClusterCommands,
    },

    /// Print the cluster's kubeconfig.
    Kubeconfig,

    /// Work with cluster components.
    Component {
        #[command(subcommand)]
        command: ComponentCommands,
    },
}

#[derive(Subcommand)]
enum ClusterCommands {
    /// Create or update the cluster.
    Apply {
        /// Do not ask for confirmation.
        #[arg(long, default_value = "false")]
        confirm: bool,
    },

    /// Destroy the cluster.
    Destroy {
        /// Do not ask for confirmation.
        #[arg(long, default_value = "false")]
        confirm: bool,
    },

    /// Validate the configuration and print every problem found.
    Validate,

    /// Print the generated terraform configuration without writing it.
    Render,
}

#[derive(Subcommand)]
enum ComponentCommands {
    /// Print the chart values of a declared component.
    Render {
        /// Component name, e.g. `velero`.
        name: String,
    },
}

/// Backend and platform resolved from a valid configuration.
struct Cluster {
    backend: Option<Box<dyn Backend>>,
    platform: Box<dyn Platform>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Cluster { command } => match command {
            ClusterCommands::Apply { confirm } => cluster_apply(&cli, *confirm),
            ClusterCommands::Destroy { confirm } => cluster_destroy(&cli, *confirm),
            ClusterCommands::Validate => cluster_validate(&cli),
            ClusterCommands::Render => cluster_render(&cli),
        },
        Commands::Kubeconfig => kubeconfig(&cli),
        Commands::Component { command } => match command {
            ComponentCommands::Render { name } => component_render(&cli, name),
        },
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    Config::load(&cli.config, cli.vars.as_deref())
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))
}

/// Print diagnostics and fail if any of them is an error.
fn check(diags: &Diagnostics) -> Result<()> {
    ui::print_diagnostics(diags);
    if diags.has_errors() {
        bail!("Configuration is invalid ({} problem(s) found)", diags.len());
    }
    Ok(())
}

fn resolve_cluster(cli: &Cli, config: &Config) -> Result<Cluster> {
    let (backend, mut diags) = configured_backend(config);
    let (platform, platform_diags) = configured_platform(config);
    diags.extend(platform_diags);
    check(&diags)?;

    let Some(platform) = platform else {
        bail!("No cluster declared in {}", cli.config.display());
    };
    Ok(Cluster { backend, platform })
}

fn extractor(cli: &Cli) -> Box<dyn AssetExtractor> {
    if let Some(dir) = &cli.modules_dir {
        Box::new(DirectoryExtractor::new(dir))
    } else {
        warn!("No modules directory set, expecting terraform modules to be in place");
        Box::new(NoopExtractor)
    }
}

fn executor(cli: &Cli, root_dir: PathBuf) -> TerraformExecutor {
    TerraformExecutor::new(
        ExecutorConfig::new(root_dir)
            .with_binary(cli.terraform_bin.clone())
            .with_verbose(cli.verbose),
    )
}

fn confirm(prompt: &str) -> Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

fn cluster_apply(cli: &Cli, confirmed: bool) -> Result<()> {
    let config = load_config(cli)?;
    let cluster = resolve_cluster(cli, &config)?;

    if !confirmed && !confirm("Apply cluster configuration?")? {
        ui::print_warning("Cluster apply cancelled");
        return Ok(());
    }

    let extractor = extractor(cli);
    let provisioner = Provisioner::new(cluster.platform.as_ref(), extractor.as_ref())
        .with_backend(cluster.backend.as_deref());
    let executor = executor(cli, provisioner.root_dir());

    ui::print_step("Applying cluster configuration");
    provisioner
        .apply(&executor)
        .context("Failed to apply cluster")?;

    let meta = cluster.platform.meta();
    ui::print_success(&format!(
        "Cluster applied, expecting {} node(s)",
        meta.expected_nodes
    ));

    let kubeconfig = asset_kubeconfig_path(&meta.asset_dir);
    if kubeconfig.is_file() {
        ui::print_info(&format!("Kubeconfig written to {}", kubeconfig.display()));
    } else {
        ui::print_info("Run `kforge kubeconfig` to print the cluster's kubeconfig");
    }
    Ok(())
}

fn cluster_destroy(cli: &Cli, confirmed: bool) -> Result<()> {
    let config = load_config(cli)?;
    let cluster = resolve_cluster(cli, &config)?;

    if !confirmed && !confirm("Destroy the cluster? This cannot be undone")? {
        ui::print_warning("Cluster destroy cancelled");
        return Ok(());
    }

    let extractor = extractor(cli);
    let provisioner = Provisioner::new(cluster.platform.as_ref(), extractor.as_ref())
        .with_backend(cluster.backend.as_deref());
    let executor = executor(cli, provisioner.root_dir());

    ui::print_step("Destroying cluster");
    provisioner
        .destroy(&executor)
        .context("Failed to destroy cluster")?;
    ui::print_success("Cluster destroyed");
    Ok(())
}

fn cluster_validate(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    let (_, mut diags) = configured_backend(&config);
    let (_, platform_diags) = configured_platform(&config);
    diags.extend(platform_diags);
    for declaration in &config.root.components {
        let (_, component_diags) = configured_component(&config, &declaration.name);
        diags.extend(component_diags);
    }

    check(&diags)?;
    ui::print_success("Configuration is valid");
    Ok(())
}

fn cluster_render(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let cluster = resolve_cluster(cli, &config)?;

    if let Some(backend) = &cluster.backend {
        println!("# {}", terraform::BACKEND_FILE_NAME);
        println!("terraform {{{}}}", backend.render());
    }
    println!("# {}", terraform::CLUSTER_FILE_NAME);
    print!("{}", cluster.platform.render());
    Ok(())
}

fn kubeconfig(cli: &Cli) -> Result<()> {
    let sources = KubeconfigSources::from_env(cli.kubeconfig_file.clone());

    let platform = if config_exists(&cli.config) {
        let config = load_config(cli)?;
        let (platform, diags) = configured_platform(&config);
        check(&diags)?;
        platform
    } else {
        debug!(path = %cli.config.display(), "No configuration file, skipping cluster lookup");
        None
    };

    let content = match &platform {
        Some(platform) => {
            let asset_dir = platform.meta().asset_dir;
            let executor = executor(cli, terraform::root_dir(&asset_dir));
            sources.resolve(Some(ClusterSource {
                asset_dir: &asset_dir,
                executor: &executor,
            }))
        }
        None => sources.resolve(None),
    }
    .context("Failed to find kubeconfig")?;

    std::io::stdout()
        .write_all(&content)
        .context("Failed to write kubeconfig")
}

fn config_exists(path: &Path) -> bool {
    path.try_exists().unwrap_or(false)
}

fn component_render(cli: &Cli, name: &str) -> Result<()> {
    let config = load_config(cli)?;
    let (component, diags) = configured_component(&config, name);
    check(&diags)?;

    let Some(component) = component else {
        bail!("Component {name:?} is not declared in {}", cli.config.display());
    };

    debug!(component = name, namespace = component.namespace(), "Rendering chart values");
    let values = component
        .render_values()
        .with_context(|| format!("Failed to render {name} values"))?;
    print!("{values}");
    Ok(())
}
