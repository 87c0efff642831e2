// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stack operations and the [`Stack`] handle.
//!
//! Stacks have no inspect payload; the handle is a plain name bound to a
//! client.

use crate::entity::ScopedResource;
use crate::service::Service;
use crate::task::Task;
use crate::{engine_command, to_string_vec};
use gantry_config::{ClientConfig, read_env_files};
use gantry_error::Result;
use gantry_host::Execution;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A handle to one deployed stack.
#[derive(Debug, Clone)]
pub struct Stack {
    config: ClientConfig,
    name: String,
}

impl Stack {
    /// Bind a stack name to a client.
    pub fn new(config: ClientConfig, name: impl Into<String>) -> Self {
        Self {
            config,
            name: name.into(),
        }
    }

    /// The stack name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn cli(&self) -> StackCli {
        StackCli::new(self.config.clone())
    }

    /// Remove this stack.
    pub async fn remove(&self) -> Result<()> {
        self.cli().remove([self.name.as_str()]).await
    }

    /// The tasks of this stack.
    pub async fn ps(&self) -> Result<Vec<Task>> {
        self.cli().ps(&self.name).await
    }

    /// The services of this stack.
    pub async fn services(&self) -> Result<Vec<Service>> {
        self.cli().services(&self.name).await
    }
}

impl std::fmt::Display for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq for Stack {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config && self.name == other.name
    }
}

impl Eq for Stack {}

impl ScopedResource for Stack {
    async fn teardown(&self) -> Result<()> {
        self.remove().await
    }
}

/// Options for `stack deploy`.
#[derive(Debug, Clone, Default)]
pub struct StackDeployOpts {
    /// Compose files to fuse, in order.
    pub compose_files: Vec<PathBuf>,
    /// Orchestrator (`"swarm"`, `"kubernetes"`, `"all"`).
    pub orchestrator: Option<String>,
    /// Prune services no longer referenced.
    pub prune: bool,
    /// Registry digest resolution (`"always"`, `"changed"`, `"never"`).
    pub resolve_image: Option<String>,
    /// Send registry auth to the agents.
    pub with_registry_auth: bool,
    /// `.env`-style files substituted into the compose files.
    pub env_files: Vec<PathBuf>,
    /// Explicit variables; they win over the env files.
    pub variables: Vec<(String, String)>,
}

/// Stack operations (`stack …`).
#[derive(Debug, Clone)]
pub struct StackCli {
    config: ClientConfig,
}

impl StackCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Deploy a stack. Variables from env files and the explicit set are
    /// passed as overlay environment for compose-file substitution.
    pub async fn deploy(&self, name: &str, opts: StackDeployOpts) -> Result<Stack> {
        let mut cmd = engine_command(&self.config, &["stack", "deploy"]).await?;
        cmd.add_args_iterable(
            "--compose-file",
            opts.compose_files.iter().map(|p| p.display()),
        );
        cmd.add_simple_arg("--orchestrator", opts.orchestrator.as_deref());
        cmd.add_flag("--prune", opts.prune);
        cmd.add_simple_arg("--resolve-image", opts.resolve_image.as_deref());
        cmd.add_flag("--with-registry-auth", opts.with_registry_auth);
        cmd.append(name);

        let mut env: BTreeMap<String, String> = read_env_files(&opts.env_files)?;
        env.extend(opts.variables.iter().cloned());

        Execution::new(cmd.into_vec(), self.config.kind())
            .env(env)
            .capture_stdout(false)
            .run()
            .await?;
        Ok(Stack::new(self.config.clone(), name))
    }

    /// List deployed stacks.
    pub async fn list(&self) -> Result<Vec<Stack>> {
        let cmd = engine_command(&self.config, &["stack", "ls", "--format", "{{.Name}}"]).await?;
        let output = crate::run_command(&self.config, cmd).await?;
        Ok(output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|name| Stack::new(self.config.clone(), name))
            .collect())
    }

    /// The tasks of a stack, as trusted handles.
    pub async fn ps(&self, stack: &str) -> Result<Vec<Task>> {
        let mut cmd =
            engine_command(&self.config, &["stack", "ps", "--quiet", "--no-trunc"]).await?;
        cmd.append(stack);
        let output = crate::run_command(&self.config, cmd).await?;
        Ok(output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|id| Task::from_trusted_id(self.config.clone(), id))
            .collect())
    }

    /// Remove one or more stacks. An empty selection is a no-op.
    pub async fn remove<I, S>(&self, stacks: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stacks = to_string_vec(stacks);
        if stacks.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["stack", "remove"]).await?;
        cmd.extend(stacks);
        crate::run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// The services of a stack, as trusted handles.
    pub async fn services(&self, stack: &str) -> Result<Vec<Service>> {
        let mut cmd = engine_command(&self.config, &["stack", "services", "--quiet"]).await?;
        cmd.append(stack);
        let output = crate::run_command(&self.config, cmd).await?;
        Ok(output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|id| Service::from_trusted_id(self.config.clone(), id))
            .collect())
    }
}
