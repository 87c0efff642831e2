// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pod operations (podman) and the [`Pod`] handle.
//!
//! Podman's `pod inspect` returns a bare JSON object, so the handle does
//! its own fetching instead of going through the shared JSON-array
//! plumbing.

use crate::entity::{InspectCache, ScopedResource};
use crate::{engine_command, run_command, stream_command, to_string_vec};
use gantry_config::ClientConfig;
use gantry_core::{AddHost, Command, PortMapping, Signal, ValidDuration};
use gantry_error::{Error, Result};
use gantry_host::FrameStream;
use gantry_models::{PodContainer, PodInspect};
use std::sync::Arc;

/// A handle to one pod, identified by its immutable id.
#[derive(Debug, Clone)]
pub struct Pod {
    config: ClientConfig,
    id: String,
    cache: Arc<InspectCache<PodInspect>>,
}

impl Pod {
    /// Build a handle from an id the caller vouches for.
    pub fn from_trusted_id(config: ClientConfig, id: impl Into<String>) -> Self {
        Self {
            config,
            id: id.into(),
            cache: Arc::new(InspectCache::empty()),
        }
    }

    /// Resolve a reference through the engine.
    pub async fn from_reference(config: ClientConfig, reference: &str) -> Result<Self> {
        let payload = fetch_pod(&config, reference).await?;
        let id = payload
            .id
            .clone()
            .ok_or_else(|| {
                Error::InvalidInput(format!("pod inspect for {reference:?} carries no id"))
            })?;
        Ok(Self {
            config,
            id,
            cache: Arc::new(InspectCache::primed(payload)),
        })
    }

    /// The canonical immutable id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The owning client configuration.
    pub fn client_config(&self) -> &ClientConfig {
        &self.config
    }

    /// The full inspect payload, refreshed when stale.
    pub async fn inspect_result(&self) -> Result<PodInspect> {
        let config = self.config.clone();
        let id = self.id.clone();
        self.cache
            .get(self.config.cache_validity(), move || async move {
                fetch_pod(&config, &id).await
            })
            .await
    }

    /// Force one refresh now.
    pub async fn reload(&self) -> Result<()> {
        let config = self.config.clone();
        let id = self.id.clone();
        self.cache
            .refresh(move || async move { fetch_pod(&config, &id).await })
            .await
    }

    /// The pod name.
    pub async fn name(&self) -> Result<Option<String>> {
        Ok(self.inspect_result().await?.name)
    }

    /// The pod state.
    pub async fn state(&self) -> Result<Option<String>> {
        Ok(self.inspect_result().await?.state)
    }

    /// The pod's containers.
    pub async fn containers(&self) -> Result<Vec<PodContainer>> {
        Ok(self.inspect_result().await?.containers.unwrap_or_default())
    }

    fn cli(&self) -> PodCli {
        PodCli::new(self.config.clone())
    }

    /// Whether the pod still exists.
    pub async fn exists(&self) -> Result<bool> {
        self.cli().exists(self.id()).await
    }

    /// Kill this pod.
    pub async fn kill(&self, signal: Option<Signal>) -> Result<()> {
        let result = self.cli().kill([self.id()], signal).await;
        self.cache.invalidate().await;
        result
    }

    /// Pause this pod.
    pub async fn pause(&self) -> Result<()> {
        let result = self.cli().pause([self.id()]).await;
        self.cache.invalidate().await;
        result
    }

    /// Unpause this pod.
    pub async fn unpause(&self) -> Result<()> {
        let result = self.cli().unpause([self.id()]).await;
        self.cache.invalidate().await;
        result
    }

    /// Restart this pod.
    pub async fn restart(&self) -> Result<()> {
        let result = self.cli().restart([self.id()]).await;
        self.cache.invalidate().await;
        result
    }

    /// Start this pod.
    pub async fn start(&self) -> Result<()> {
        let result = self.cli().start([self.id()]).await;
        self.cache.invalidate().await;
        result
    }

    /// Stop this pod.
    pub async fn stop(&self, time: Option<ValidDuration>) -> Result<()> {
        let result = self.cli().stop([self.id()], time).await;
        self.cache.invalidate().await;
        result
    }

    /// Remove this pod.
    pub async fn remove(&self, force: bool) -> Result<()> {
        self.cli().remove([self.id()], force, None).await
    }
}

impl std::fmt::Display for Pod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

impl PartialEq for Pod {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config && self.id == other.id
    }
}

impl Eq for Pod {}

impl std::hash::Hash for Pod {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl ScopedResource for Pod {
    /// Force-remove on scope exit.
    async fn teardown(&self) -> Result<()> {
        self.remove(true).await
    }
}

async fn fetch_pod(config: &ClientConfig, reference: &str) -> Result<PodInspect> {
    let mut cmd = engine_command(config, &["pod", "inspect"]).await?;
    cmd.append(reference);
    let output = run_command(config, cmd).await?;
    // Old podman prints a bare object, newer versions an array.
    if output.stdout.trim_start().starts_with('[') {
        gantry_models::parse_single(&output.stdout)
    } else {
        gantry_models::parse_object(&output.stdout)
    }
}

/// Options for `pod create`.
#[derive(Debug, Clone)]
pub struct PodCreateOpts {
    /// Extra `/etc/hosts` entries.
    pub add_hosts: Vec<AddHost>,
    /// Parent cgroup.
    pub cgroup_parent: Option<String>,
    /// DNS servers.
    pub dns: Vec<String>,
    /// DNS options.
    pub dns_options: Vec<String>,
    /// DNS search domains.
    pub dns_search: Vec<String>,
    /// Exit policy (`"continue"` or `"stop"`).
    pub exit_policy: Option<String>,
    /// Hostname of the pod.
    pub hostname: Option<String>,
    /// Whether an infra container is created
    /// (`--infra=<bool>` explicit form).
    pub infra: Option<bool>,
    /// Image of the infra container.
    pub infra_image: Option<String>,
    /// Name of the infra container.
    pub infra_name: Option<String>,
    /// Static IPv4 address.
    pub ip: Option<String>,
    /// Labels, in order.
    pub labels: Vec<(String, String)>,
    /// MAC address.
    pub mac_address: Option<String>,
    /// Pod name.
    pub name: Option<String>,
    /// Networks to join.
    pub networks: Vec<String>,
    /// Ports to publish.
    pub publish: Vec<PortMapping>,
    /// Namespaces shared with the pod's containers.
    pub shares: Vec<String>,
    /// Ulimits.
    pub ulimit: Vec<String>,
    /// Userns mode.
    pub userns: Option<String>,
}

impl Default for PodCreateOpts {
    fn default() -> Self {
        Self {
            add_hosts: Vec::new(),
            cgroup_parent: None,
            dns: Vec::new(),
            dns_options: Vec::new(),
            dns_search: Vec::new(),
            exit_policy: None,
            hostname: None,
            infra: None,
            infra_image: None,
            infra_name: None,
            ip: None,
            labels: Vec::new(),
            mac_address: None,
            name: None,
            networks: Vec::new(),
            publish: Vec::new(),
            shares: Vec::new(),
            ulimit: Vec::new(),
            userns: None,
        }
    }
}

impl PodCreateOpts {
    fn apply(&self, cmd: &mut Command) {
        cmd.add_args_iterable("--add-host", &self.add_hosts);
        cmd.add_simple_arg("--cgroup-parent", self.cgroup_parent.as_deref());
        cmd.add_args_iterable("--dns", &self.dns);
        cmd.add_args_iterable("--dns-option", &self.dns_options);
        cmd.add_args_iterable("--dns-search", &self.dns_search);
        cmd.add_simple_arg("--exit-policy", self.exit_policy.as_deref());
        cmd.add_simple_arg("--hostname", self.hostname.as_deref());
        if let Some(infra) = self.infra {
            cmd.append(format!("--infra={infra}"));
        }
        cmd.add_simple_arg("--infra-image", self.infra_image.as_deref());
        cmd.add_simple_arg("--infra-name", self.infra_name.as_deref());
        cmd.add_simple_arg("--ip", self.ip.as_deref());
        cmd.add_args_mapping("--label", self.labels.iter().map(|(k, v)| (k, v)));
        cmd.add_simple_arg("--mac-address", self.mac_address.as_deref());
        cmd.add_simple_arg("--name", self.name.as_deref());
        cmd.add_args_iterable("--network", &self.networks);
        cmd.add_args_iterable("--publish", &self.publish);
        if !self.shares.is_empty() {
            cmd.add_simple_arg("--share", Some(self.shares.join(",")));
        }
        cmd.add_args_iterable("--ulimit", &self.ulimit);
        cmd.add_simple_arg("--userns", self.userns.as_deref());
    }
}

// ---------------------------------------------------------------------------
// PodCli
// ---------------------------------------------------------------------------

/// Pod operations (`pod …`, podman only).
#[derive(Debug, Clone)]
pub struct PodCli {
    config: ClientConfig,
}

impl PodCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Create a pod.
    pub async fn create(&self, opts: PodCreateOpts) -> Result<Pod> {
        let mut cmd = engine_command(&self.config, &["pod", "create"]).await?;
        opts.apply(&mut cmd);
        let output = run_command(&self.config, cmd).await?;
        Ok(Pod::from_trusted_id(
            self.config.clone(),
            output.stdout.trim(),
        ))
    }

    /// Whether a pod exists, via the dedicated `pod exists` subcommand
    /// (exit code 1 means no).
    pub async fn exists(&self, pod: &str) -> Result<bool> {
        let mut cmd = engine_command(&self.config, &["pod", "exists"]).await?;
        cmd.append(pod);
        match run_command(&self.config, cmd).await {
            Ok(_) => Ok(true),
            Err(Error::CommandFailed(failure)) if failure.exit_code == 1 => Ok(false),
            Err(Error::NoSuchPod(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Resolve a reference into a [`Pod`] handle.
    pub async fn inspect(&self, pod: &str) -> Result<Pod> {
        Pod::from_reference(self.config.clone(), pod).await
    }

    /// Kill one or more pods. An empty selection is a no-op.
    pub async fn kill<I, S>(&self, pods: I, signal: Option<Signal>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pods = to_string_vec(pods);
        if pods.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["pod", "kill"]).await?;
        cmd.add_simple_arg("--signal", signal);
        cmd.extend(pods);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// List pods as trusted handles.
    pub async fn list(&self, filters: &[(&str, &str)]) -> Result<Vec<Pod>> {
        let mut cmd =
            engine_command(&self.config, &["pod", "list", "--quiet", "--no-trunc"]).await?;
        cmd.add_args_iterable("--filter", filters.iter().map(|(k, v)| format!("{k}={v}")));
        let output = run_command(&self.config, cmd).await?;
        Ok(output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|id| Pod::from_trusted_id(self.config.clone(), id))
            .collect())
    }

    /// The combined logs of a pod's containers up to now.
    pub async fn logs(&self, pod: &str, names: bool) -> Result<String> {
        let stream = self.logs_streamed(pod, names, false).await?;
        stream.collect_stdout().await
    }

    /// The combined logs of a pod's containers as a frame stream.
    pub async fn logs_streamed(&self, pod: &str, names: bool, follow: bool) -> Result<FrameStream> {
        let mut cmd = engine_command(&self.config, &["pod", "logs"]).await?;
        cmd.add_flag("--names", names);
        cmd.add_flag("--follow", follow);
        cmd.append(pod);
        stream_command(&self.config, cmd)
    }

    /// Pause one or more pods. An empty selection is a no-op.
    pub async fn pause<I, S>(&self, pods: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pods = to_string_vec(pods);
        if pods.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["pod", "pause"]).await?;
        cmd.extend(pods);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Unpause one or more pods. An empty selection is a no-op.
    pub async fn unpause<I, S>(&self, pods: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pods = to_string_vec(pods);
        if pods.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["pod", "unpause"]).await?;
        cmd.extend(pods);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Remove stopped pods.
    pub async fn prune(&self) -> Result<()> {
        let cmd = engine_command(&self.config, &["pod", "prune", "--force"]).await?;
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Remove one or more pods. An empty selection is a no-op.
    pub async fn remove<I, S>(&self, pods: I, force: bool, time: Option<ValidDuration>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pods = to_string_vec(pods);
        if pods.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["pod", "rm"]).await?;
        cmd.add_flag("--force", force);
        cmd.add_simple_arg("--time", time);
        cmd.extend(pods);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Restart one or more pods. An empty selection is a no-op.
    pub async fn restart<I, S>(&self, pods: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pods = to_string_vec(pods);
        if pods.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["pod", "restart"]).await?;
        cmd.extend(pods);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Start one or more pods. An empty selection is a no-op.
    pub async fn start<I, S>(&self, pods: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pods = to_string_vec(pods);
        if pods.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["pod", "start"]).await?;
        cmd.extend(pods);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Stop one or more pods. An empty selection is a no-op.
    pub async fn stop<I, S>(&self, pods: I, time: Option<ValidDuration>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pods = to_string_vec(pods);
        if pods.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["pod", "stop"]).await?;
        cmd.add_simple_arg("--time", time);
        cmd.extend(pods);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Process listing inside pods has no stable output shape.
    pub fn top(&self) -> Result<()> {
        Err(Error::NotImplemented("pod top"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infra_uses_the_explicit_value_form() {
        let mut cmd = Command::new(["podman", "pod", "create"]);
        PodCreateOpts {
            infra: Some(false),
            ..PodCreateOpts::default()
        }
        .apply(&mut cmd);
        assert!(cmd.as_slice().contains(&"--infra=false".to_string()));
    }

    #[test]
    fn shares_join_with_commas() {
        let mut cmd = Command::new(["podman", "pod", "create"]);
        PodCreateOpts {
            shares: vec!["net".into(), "uts".into()],
            ..PodCreateOpts::default()
        }
        .apply(&mut cmd);
        assert!(cmd
            .as_slice()
            .windows(2)
            .any(|w| w == ["--share", "net,uts"]));
    }
}
