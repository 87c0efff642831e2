// SPDX-License-Identifier: MIT OR Apache-2.0
//! Swarm service operations and the [`Service`] handle.

use crate::entity::{ScopedResource, json_entity};
use crate::task::Task;
use crate::{engine_command, run_command, stream_command, to_string_vec};
use gantry_config::ClientConfig;
use gantry_core::{Command, ValidDuration};
use gantry_error::{Error, Result};
use gantry_host::FrameStream;
use gantry_models::{ServiceInspect, ServiceSpec, ServiceUpdateStatus};

json_entity! {
    /// A handle to one swarm service, identified by its immutable id.
    Service {
        payload: ServiceInspect,
        id_field: id,
        inspect: ["service", "inspect"],
    }
}

impl Service {
    /// The service specification.
    pub async fn spec(&self) -> Result<ServiceSpec> {
        Ok(self.inspect_result().await?.spec.unwrap_or_default())
    }

    /// Progress of an ongoing update, if any.
    pub async fn update_status(&self) -> Result<Option<ServiceUpdateStatus>> {
        Ok(self.inspect_result().await?.update_status)
    }

    fn cli(&self) -> ServiceCli {
        ServiceCli::new(self.client_config().clone())
    }

    /// The tasks of this service.
    pub async fn ps(&self) -> Result<Vec<Task>> {
        self.cli().ps([self.id()]).await
    }

    /// Remove this service.
    pub async fn remove(&self) -> Result<()> {
        self.cli().remove([self.id()]).await
    }

    /// Scale this service.
    pub async fn scale(&self, new_scale: u32, detach: bool) -> Result<()> {
        self.cli().scale(&[(self.id(), new_scale)], detach).await
    }

    /// Whether the service still exists.
    pub async fn exists(&self) -> Result<bool> {
        self.cli().exists(self.id()).await
    }
}

impl ScopedResource for Service {
    async fn teardown(&self) -> Result<()> {
        self.remove().await
    }
}

/// Options for `service create`.
#[derive(Debug, Clone)]
pub struct ServiceCreateOpts {
    /// Capabilities to add.
    pub cap_add: Vec<String>,
    /// Capabilities to drop.
    pub cap_drop: Vec<String>,
    /// Placement constraints.
    pub constraints: Vec<String>,
    /// Return immediately instead of waiting for convergence.
    pub detach: bool,
    /// DNS servers.
    pub dns: Vec<String>,
    /// Endpoint mode (`"vip"` or `"dnsrr"`).
    pub endpoint_mode: Option<String>,
    /// Entrypoint override.
    pub entrypoint: Option<String>,
    /// Environment variables, in order.
    pub envs: Vec<(String, String)>,
    /// Env files.
    pub env_files: Vec<String>,
    /// Extra `/etc/hosts` entries, `host → ip`.
    pub hosts: Vec<(String, String)>,
    /// Container hostname.
    pub hostname: Option<String>,
    /// Whether the image healthcheck stays enabled.
    pub healthcheck: bool,
    /// Healthcheck command override.
    pub health_cmd: Option<String>,
    /// Healthcheck interval.
    pub health_interval: Option<ValidDuration>,
    /// Healthcheck retries.
    pub health_retries: Option<u32>,
    /// Healthcheck grace period.
    pub health_start_period: Option<ValidDuration>,
    /// Healthcheck timeout.
    pub health_timeout: Option<ValidDuration>,
    /// Inject an init process.
    pub init: bool,
    /// Isolation technology.
    pub isolation: Option<String>,
    /// Labels, in order.
    pub labels: Vec<(String, String)>,
    /// CPU limit.
    pub limit_cpu: Option<f64>,
    /// Memory limit.
    pub limit_memory: Option<String>,
    /// Pids limit.
    pub limit_pids: Option<i64>,
    /// Logging driver.
    pub log_driver: Option<String>,
    /// Mount specifications; each inner list is comma-joined.
    pub mounts: Vec<Vec<(String, String)>>,
    /// Network to attach to.
    pub network: Option<String>,
    /// Service name.
    pub name: Option<String>,
    /// Replica count.
    pub replicas: Option<u32>,
    /// Restart condition (`"none"`, `"on-failure"`, `"any"`).
    pub restart_condition: Option<String>,
    /// Restart attempt cap.
    pub restart_max_attempts: Option<u32>,
    /// Secret grants; each inner list is comma-joined.
    pub secrets: Vec<Vec<(String, String)>>,
}

impl Default for ServiceCreateOpts {
    fn default() -> Self {
        Self {
            cap_add: Vec::new(),
            cap_drop: Vec::new(),
            constraints: Vec::new(),
            detach: false,
            dns: Vec::new(),
            endpoint_mode: None,
            entrypoint: None,
            envs: Vec::new(),
            env_files: Vec::new(),
            hosts: Vec::new(),
            hostname: None,
            healthcheck: true,
            health_cmd: None,
            health_interval: None,
            health_retries: None,
            health_start_period: None,
            health_timeout: None,
            init: false,
            isolation: None,
            labels: Vec::new(),
            limit_cpu: None,
            limit_memory: None,
            limit_pids: None,
            log_driver: None,
            mounts: Vec::new(),
            network: None,
            name: None,
            replicas: None,
            restart_condition: None,
            restart_max_attempts: None,
            secrets: Vec::new(),
        }
    }
}

impl ServiceCreateOpts {
    fn apply(&self, cmd: &mut Command) {
        cmd.add_args_iterable("--cap-add", &self.cap_add);
        cmd.add_args_iterable("--cap-drop", &self.cap_drop);
        cmd.add_args_iterable("--constraint", &self.constraints);
        cmd.add_flag("--detach", self.detach);
        cmd.add_args_iterable("--dns", &self.dns);
        cmd.add_simple_arg("--endpoint-mode", self.endpoint_mode.as_deref());
        cmd.add_simple_arg("--entrypoint", self.entrypoint.as_deref());
        cmd.add_args_mapping("--env", self.envs.iter().map(|(k, v)| (k, v)));
        cmd.add_args_iterable("--env-file", &self.env_files);
        for (host, ip) in &self.hosts {
            cmd.extend(["--host".to_string(), format!("{host}:{ip}")]);
        }
        cmd.add_simple_arg("--hostname", self.hostname.as_deref());
        cmd.add_flag("--no-healthcheck", !self.healthcheck);
        cmd.add_simple_arg("--health-cmd", self.health_cmd.as_deref());
        cmd.add_simple_arg("--health-interval", self.health_interval);
        cmd.add_simple_arg("--health-retries", self.health_retries);
        cmd.add_simple_arg("--health-start-period", self.health_start_period);
        cmd.add_simple_arg("--health-timeout", self.health_timeout);
        cmd.add_flag("--init", self.init);
        cmd.add_simple_arg("--isolation", self.isolation.as_deref());
        cmd.add_args_mapping("--label", self.labels.iter().map(|(k, v)| (k, v)));
        cmd.add_simple_arg("--limit-cpu", self.limit_cpu);
        cmd.add_simple_arg("--limit-memory", self.limit_memory.as_deref());
        cmd.add_simple_arg("--limit-pids", self.limit_pids);
        cmd.add_simple_arg("--log-driver", self.log_driver.as_deref());
        cmd.add_args_iterable(
            "--mount",
            self.mounts
                .iter()
                .map(|m| gantry_core::comma_joined_pairs(m.iter().map(|(k, v)| (k, v)))),
        );
        cmd.add_simple_arg("--network", self.network.as_deref());
        cmd.add_simple_arg("--name", self.name.as_deref());
        cmd.add_simple_arg("--replicas", self.replicas);
        cmd.add_simple_arg("--restart-condition", self.restart_condition.as_deref());
        cmd.add_simple_arg("--restart-max-attempts", self.restart_max_attempts);
        cmd.add_args_iterable(
            "--secret",
            self.secrets
                .iter()
                .map(|s| gantry_core::comma_joined_pairs(s.iter().map(|(k, v)| (k, v)))),
        );
    }
}

/// Options for `service logs`.
#[derive(Debug, Clone)]
pub struct ServiceLogsOpts {
    /// Show extra details.
    pub details: bool,
    /// Lower time bound.
    pub since: Option<String>,
    /// Number of lines from the end.
    pub tail: Option<u64>,
    /// Prefix lines with timestamps.
    pub timestamps: bool,
    /// Keep following.
    pub follow: bool,
    /// Raw output without formatting.
    pub raw: bool,
    /// Include task ids.
    pub task_ids: bool,
    /// Resolve object ids to names.
    pub resolve: bool,
    /// Truncate output.
    pub truncate: bool,
}

impl Default for ServiceLogsOpts {
    fn default() -> Self {
        Self {
            details: false,
            since: None,
            tail: None,
            timestamps: false,
            follow: false,
            raw: false,
            task_ids: true,
            resolve: true,
            truncate: true,
        }
    }
}

/// Options for `service update`.
#[derive(Debug, Clone, Default)]
pub struct ServiceUpdateOpts {
    /// Return immediately instead of waiting for convergence.
    pub detach: bool,
    /// Force the update even without changes.
    pub force: bool,
    /// New image.
    pub image: Option<String>,
    /// Send registry auth to the agents.
    pub with_registry_authentication: bool,
    /// Suppress progress output.
    pub quiet: bool,
    /// New replica count.
    pub replicas: Option<u32>,
}

// ---------------------------------------------------------------------------
// ServiceCli
// ---------------------------------------------------------------------------

/// Swarm service operations (`service …`).
#[derive(Debug, Clone)]
pub struct ServiceCli {
    config: ClientConfig,
}

impl ServiceCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Create a service.
    pub async fn create<I, S>(
        &self,
        image: &str,
        command: I,
        opts: ServiceCreateOpts,
    ) -> Result<Service>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = engine_command(&self.config, &["service", "create", "--quiet"]).await?;
        opts.apply(&mut cmd);
        cmd.append(image);
        cmd.extend(to_string_vec(command));
        let output = run_command(&self.config, cmd).await?;
        Ok(Service::from_trusted_id(
            self.config.clone(),
            output.stdout.trim(),
        ))
    }

    /// Resolve a reference into a [`Service`] handle.
    pub async fn inspect(&self, service: &str) -> Result<Service> {
        Service::from_reference(self.config.clone(), service).await
    }

    /// Whether a service exists.
    pub async fn exists(&self, service: &str) -> Result<bool> {
        match self.inspect(service).await {
            Ok(_) => Ok(true),
            Err(Error::NoSuchService(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// The logs of a service up to now.
    pub async fn logs(&self, service: &str, opts: ServiceLogsOpts) -> Result<String> {
        let stream = self.logs_streamed(service, opts).await?;
        stream.collect_stdout().await
    }

    /// The logs of a service as a frame stream.
    pub async fn logs_streamed(
        &self,
        service: &str,
        opts: ServiceLogsOpts,
    ) -> Result<FrameStream> {
        // Raises NoSuchService before streaming begins.
        self.inspect(service).await?;
        let mut cmd = engine_command(&self.config, &["service", "logs"]).await?;
        cmd.add_flag("--details", opts.details);
        cmd.add_simple_arg("--since", opts.since.as_deref());
        cmd.add_simple_arg("--tail", opts.tail);
        cmd.add_flag("--timestamps", opts.timestamps);
        cmd.add_flag("--follow", opts.follow);
        cmd.add_flag("--raw", opts.raw);
        cmd.add_flag("--no-task-ids", !opts.task_ids);
        cmd.add_flag("--no-resolve", !opts.resolve);
        cmd.add_flag("--no-trunc", !opts.truncate);
        cmd.append(service);
        stream_command(&self.config, cmd)
    }

    /// List services as trusted handles.
    ///
    /// The quiet listing truncates ids; a second inspect with
    /// `--format {{.ID}}` recovers the full ones.
    pub async fn list(&self, filters: &[(&str, &str)]) -> Result<Vec<Service>> {
        let mut cmd = engine_command(&self.config, &["service", "list", "--quiet"]).await?;
        cmd.add_args_iterable("--filter", filters.iter().map(|(k, v)| format!("{k}={v}")));
        let output = run_command(&self.config, cmd).await?;
        let truncated: Vec<&str> = output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .collect();
        if truncated.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = engine_command(&self.config, &["service", "inspect"]).await?;
        cmd.extend(truncated.iter().map(|s| s.to_string()));
        cmd.extend(["--format", "{{.ID}}"]);
        let output = run_command(&self.config, cmd).await?;
        Ok(output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|id| Service::from_trusted_id(self.config.clone(), id))
            .collect())
    }

    /// The tasks of one or more services.
    pub async fn ps<I, S>(&self, services: I) -> Result<Vec<Task>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd =
            engine_command(&self.config, &["service", "ps", "--quiet", "--no-trunc"]).await?;
        cmd.extend(to_string_vec(services));
        let output = run_command(&self.config, cmd).await?;
        Ok(output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|id| Task::from_trusted_id(self.config.clone(), id))
            .collect())
    }

    /// Remove one or more services. An empty selection is a no-op.
    pub async fn remove<I, S>(&self, services: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let services = to_string_vec(services);
        if services.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["service", "remove"]).await?;
        cmd.extend(services);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Scale one or more services. Raises `NoSuchService` before changing
    /// anything when a service is missing.
    pub async fn scale(&self, new_scales: &[(&str, u32)], detach: bool) -> Result<()> {
        for (service, _) in new_scales {
            self.inspect(service).await?;
        }
        let mut cmd = engine_command(&self.config, &["service", "scale"]).await?;
        cmd.add_flag("--detach", detach);
        for (service, scale) in new_scales {
            cmd.append(format!("{service}={scale}"));
        }
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Update a service.
    pub async fn update(&self, service: &str, opts: ServiceUpdateOpts) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["service", "update"]).await?;
        cmd.add_flag("--detach", opts.detach);
        cmd.add_flag("--force", opts.force);
        cmd.add_simple_arg("--image", opts.image.as_deref());
        cmd.add_flag("--with-registry-auth", opts.with_registry_authentication);
        cmd.add_flag("--quiet", opts.quiet);
        cmd.add_simple_arg("--replicas", opts.replicas);
        cmd.append(service);
        run_command(&self.config, cmd).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mounts_and_secrets_are_comma_joined() {
        let opts = ServiceCreateOpts {
            mounts: vec![vec![
                ("type".into(), "volume".into()),
                ("source".into(), "data".into()),
                ("destination".into(), "/data".into()),
            ]],
            secrets: vec![vec![("source".into(), "db-pass".into())]],
            ..ServiceCreateOpts::default()
        };
        let mut cmd = Command::new(["docker", "service", "create", "--quiet"]);
        opts.apply(&mut cmd);
        let argv = cmd.into_vec();
        assert!(argv
            .windows(2)
            .any(|w| w == ["--mount", "type=volume,source=data,destination=/data"]));
        assert!(argv.windows(2).any(|w| w == ["--secret", "source=db-pass"]));
    }
}
