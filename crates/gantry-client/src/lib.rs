// SPDX-License-Identifier: MIT OR Apache-2.0
//! gantry-client
//!
//! The user-facing client for the Docker and Podman CLIs: one [`Engine`]
//! per client configuration, with a sub-surface per engine domain. Entity
//! handles cache their inspect payload behind a short validity window and
//! can be given scoped lifetimes with guaranteed teardown.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buildx;
pub mod compose;
pub mod container;
pub mod context;
pub mod entity;
pub mod image;
pub mod manifest;
pub mod network;
pub mod node;
pub mod plugin;
pub mod pod;
pub mod secret;
pub mod service;
pub mod stack;
pub mod swarm;
pub mod swarm_config;
pub mod system;
pub mod task;
pub mod volume;

pub use buildx::{
    AttestSpec, BakeOpts, BuildOpts, Builder, BuilderCreateOpts, BuildxCli, CacheSpec,
    ImagetoolsCli, ImagetoolsCreateOpts,
};
pub use compose::ComposeCli;
pub use container::{
    Container, ContainerCli, CopyEndpoint, ExecOpts, LogsOpts, PullPolicy, RunOpts, UpdateOpts,
};
pub use context::{Context, ContextCli, ContextCreateOpts, DockerContextConfig, KubernetesContextConfig};
pub use entity::{Scoped, ScopedResource, scoped};
pub use image::{Image, ImageCli, ImageImportOpts};
pub use manifest::{ManifestAnnotateOpts, ManifestCli, ManifestList};
pub use network::{Network, NetworkCli, NetworkConnectOpts, NetworkCreateOpts};
pub use node::{Node, NodeCli, NodeUpdateOpts};
pub use plugin::{Plugin, PluginCli};
pub use pod::{Pod, PodCli, PodCreateOpts};
pub use secret::{Secret, SecretCli, SecretCreateOpts};
pub use service::{Service, ServiceCli, ServiceCreateOpts, ServiceLogsOpts, ServiceUpdateOpts};
pub use stack::{Stack, StackCli, StackDeployOpts};
pub use swarm::{SwarmCaOpts, SwarmCli, SwarmInitOpts, SwarmJoinOpts, SwarmUpdateOpts};
pub use swarm_config::{SwarmConfig, SwarmConfigCli};
pub use system::{EventsOpts, SystemCli};
pub use task::{Task, TaskCli};
pub use volume::{Volume, VolumeCli, VolumeCopyEndpoint};

use gantry_config::{ClientConfig, ClientOpts};
use gantry_core::Command;
use gantry_error::Result;
use gantry_host::{Execution, FrameStream, Output};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Shared command helpers
// ---------------------------------------------------------------------------

/// Build `prefix + tokens` for a client.
pub(crate) async fn engine_command(config: &ClientConfig, tokens: &[&str]) -> Result<Command> {
    let mut cmd = Command::new(config.command_prefix().await?);
    cmd.extend(tokens.iter().copied());
    Ok(cmd)
}

/// Run a composed command with full capture.
pub(crate) async fn run_command(config: &ClientConfig, cmd: Command) -> Result<Output> {
    Execution::new(cmd.into_vec(), config.kind()).run().await
}

/// Run a composed command with nothing captured; the engine draws on the
/// caller's terminal.
pub(crate) async fn run_unbuffered(config: &ClientConfig, cmd: Command) -> Result<()> {
    Execution::new(cmd.into_vec(), config.kind())
        .capture_stdout(false)
        .capture_stderr(false)
        .run()
        .await?;
    Ok(())
}

/// Start a composed command as a frame stream.
pub(crate) fn stream_command(config: &ClientConfig, cmd: Command) -> Result<FrameStream> {
    FrameStream::spawn(cmd.into_vec(), config.kind(), BTreeMap::new())
}

/// Start a composed command as a frame stream with an env overlay.
pub(crate) fn stream_command_with_env(
    config: &ClientConfig,
    cmd: Command,
    env: BTreeMap<String, String>,
) -> Result<FrameStream> {
    FrameStream::spawn(cmd.into_vec(), config.kind(), env)
}

/// Collect string references.
pub(crate) fn to_string_vec<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items.into_iter().map(|s| s.as_ref().to_string()).collect()
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// A client for one engine (docker or podman).
///
/// Cheap to clone; every sub-surface shares the same [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct Engine {
    config: ClientConfig,
    /// Buildx operations.
    pub buildx: BuildxCli,
    /// Compose project operations.
    pub compose: ComposeCli,
    /// Container operations.
    pub container: ContainerCli,
    /// CLI context operations.
    pub context: ContextCli,
    /// Image operations.
    pub image: ImageCli,
    /// Manifest list operations.
    pub manifest: ManifestCli,
    /// Network operations.
    pub network: NetworkCli,
    /// Swarm node operations.
    pub node: NodeCli,
    /// Plugin operations.
    pub plugin: PluginCli,
    /// Pod operations (podman).
    pub pod: PodCli,
    /// Swarm secret operations.
    pub secret: SecretCli,
    /// Swarm service operations.
    pub service: ServiceCli,
    /// Stack operations.
    pub stack: StackCli,
    /// Swarm membership operations.
    pub swarm: SwarmCli,
    /// Swarm config operations.
    pub swarm_config: SwarmConfigCli,
    /// System-level operations.
    pub system: SystemCli,
    /// Swarm task operations.
    pub task: TaskCli,
    /// Volume operations.
    pub volume: VolumeCli,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(ClientOpts::default())
    }
}

impl Engine {
    /// Build a client from options.
    pub fn new(opts: ClientOpts) -> Self {
        Self::from_config(ClientConfig::new(opts))
    }

    /// Build a client from an existing configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            buildx: BuildxCli::new(config.clone()),
            compose: ComposeCli::new(config.clone()),
            container: ContainerCli::new(config.clone()),
            context: ContextCli::new(config.clone()),
            image: ImageCli::new(config.clone()),
            manifest: ManifestCli::new(config.clone()),
            network: NetworkCli::new(config.clone()),
            node: NodeCli::new(config.clone()),
            plugin: PluginCli::new(config.clone()),
            pod: PodCli::new(config.clone()),
            secret: SecretCli::new(config.clone()),
            service: ServiceCli::new(config.clone()),
            stack: StackCli::new(config.clone()),
            swarm: SwarmCli::new(config.clone()),
            swarm_config: SwarmConfigCli::new(config.clone()),
            system: SystemCli::new(config.clone()),
            task: TaskCli::new(config.clone()),
            volume: VolumeCli::new(config.clone()),
            config,
        }
    }

    /// This client's configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Log in to a registry. The password value is redacted from every
    /// error message and log line.
    pub async fn login(
        &self,
        server: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["login"]).await?;
        cmd.add_simple_arg("--username", username);
        cmd.add_simple_arg("--password", password);
        if let Some(server) = server {
            cmd.append(server);
        }
        run_unbuffered(&self.config, cmd).await
    }

    /// Log out from a registry.
    pub async fn logout(&self, server: Option<&str>) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["logout"]).await?;
        if let Some(server) = server {
            cmd.append(server);
        }
        run_unbuffered(&self.config, cmd).await
    }

    /// Shorthand for [`ContainerCli::run`].
    pub async fn run<I, S>(&self, image: &str, command: I, opts: RunOpts) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.container.run(image, command, opts).await
    }

    /// Shorthand for [`ImageCli::pull`].
    pub async fn pull(&self, reference: &str) -> Result<Image> {
        self.image.pull(reference).await
    }

    /// Shorthand for [`ImageCli::push`].
    pub async fn push(&self, reference: &str) -> Result<()> {
        self.image.push(reference).await
    }

    /// Shorthand for [`BuildxCli::build`].
    pub async fn build(&self, context_path: &str, opts: BuildOpts) -> Result<Option<Image>> {
        self.buildx.build(context_path, opts).await
    }
}
