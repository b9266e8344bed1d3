//! Terraform process runner.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::{Executor, TerraformError};

/// Terraform binary used when none is configured.
pub const DEFAULT_BINARY: &str = "terraform";

/// Terraform executor configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Root module directory terraform runs in.
    pub working_dir: PathBuf,
    /// Terraform binary name or path.
    pub binary: String,
    /// Stream terraform output to the console instead of capturing it.
    pub verbose: bool,
}

impl ExecutorConfig {
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            binary: DEFAULT_BINARY.to_string(),
            verbose: false,
        }
    }

    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// [`Executor`] backed by the terraform binary.
#[derive(Debug, Clone)]
pub struct TerraformExecutor {
    config: ExecutorConfig,
}

impl TerraformExecutor {
    #[must_use]
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.config.working_dir
    }

    /// Initialize the working directory (providers, modules, backend).
    ///
    /// # Errors
    /// Returns an error if terraform fails.
    pub fn init(&self) -> Result<(), TerraformError> {
        self.execute(&["init", "-input=false"]).map(|_| ())
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.args(args)
            .current_dir(&self.config.working_dir)
            .env("TF_IN_AUTOMATION", "1")
            .stdin(Stdio::null());
        cmd
    }

    /// Run a mutating command. Output is streamed when verbose.
    fn execute(&self, args: &[&str]) -> Result<Vec<u8>, TerraformError> {
        let command = args.first().copied().unwrap_or_default().to_string();
        info!(command = %command, dir = %self.config.working_dir.display(), "Running terraform");

        if self.config.verbose {
            let status = self
                .command(args)
                .status()
                .map_err(|source| self.spawn_error(&command, source))?;

            if !status.success() {
                return Err(TerraformError::Failed {
                    command,
                    status: status.to_string(),
                    stderr: "see output above".to_string(),
                });
            }
            return Ok(Vec::new());
        }

        self.capture(&command, args)
    }

    /// Run a command and capture stdout regardless of verbosity.
    fn capture(&self, command: &str, args: &[&str]) -> Result<Vec<u8>, TerraformError> {
        let output = self
            .command(args)
            .output()
            .map_err(|source| self.spawn_error(command, source))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TerraformError::Failed {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        debug!(
            command = %command,
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            "terraform finished"
        );
        Ok(output.stdout)
    }

    fn spawn_error(&self, command: &str, source: std::io::Error) -> TerraformError {
        TerraformError::Spawn {
            program: self.config.binary.clone(),
            command: command.to_string(),
            source,
        }
    }
}

impl Executor for TerraformExecutor {
    fn apply(&self) -> Result<(), TerraformError> {
        self.init()?;
        self.execute(&["apply", "-auto-approve", "-input=false"])
            .map(|_| ())
    }

    fn destroy(&self) -> Result<(), TerraformError> {
        self.init()?;
        self.execute(&["destroy", "-auto-approve", "-input=false"])
            .map(|_| ())
    }

    /// Outputs are read from the configured backend, so the working directory
    /// is initialized first. Nothing is streamed, stdout carries the value.
    fn output(&self, key: &str) -> Result<serde_json::Value, TerraformError> {
        self.capture("init", &["init", "-input=false"])?;
        let stdout = self.capture("output", &["output", "-json", key])?;
        serde_json::from_slice(&stdout).map_err(|source| TerraformError::Output {
            key: key.to_string(),
            source,
        })
    }
}
