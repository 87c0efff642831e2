// SPDX-License-Identifier: MIT OR Apache-2.0
//! Container operations and the [`Container`] handle.

use crate::entity::{ScopedResource, json_entity};
use crate::{engine_command, run_command, stream_command, to_string_vec};
use gantry_config::ClientConfig;
use gantry_core::{AddHost, Command, PortMapping, Signal, ValidDuration, VolumeSpec};
use gantry_error::{Error, Result};
use gantry_host::{Execution, FrameStream};
use gantry_models::{
    ContainerConfig, ContainerHostConfig, ContainerInspect, ContainerNetworkSettings,
    ContainerState, ContainerStats, Mount,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

json_entity! {
    /// A handle to one container, identified by its immutable id.
    Container {
        payload: ContainerInspect,
        id_field: id,
        inspect: ["container", "inspect"],
    }
}

impl Container {
    /// The container's run state.
    pub async fn state(&self) -> Result<ContainerState> {
        Ok(self.inspect_result().await?.state.unwrap_or_default())
    }

    /// The container name, without the engine's leading slash.
    pub async fn name(&self) -> Result<String> {
        let name = self.inspect_result().await?.name.unwrap_or_default();
        Ok(name.strip_prefix('/').unwrap_or(&name).to_string())
    }

    /// The id of the image the container was created from.
    pub async fn image_id(&self) -> Result<Option<String>> {
        Ok(self.inspect_result().await?.image)
    }

    /// The host-level configuration.
    pub async fn host_config(&self) -> Result<ContainerHostConfig> {
        Ok(self.inspect_result().await?.host_config.unwrap_or_default())
    }

    /// The image-level configuration.
    pub async fn config(&self) -> Result<ContainerConfig> {
        Ok(self.inspect_result().await?.config.unwrap_or_default())
    }

    /// The network view.
    pub async fn network_settings(&self) -> Result<ContainerNetworkSettings> {
        Ok(self
            .inspect_result()
            .await?
            .network_settings
            .unwrap_or_default())
    }

    /// The container's mounts.
    pub async fn mounts(&self) -> Result<Vec<Mount>> {
        Ok(self.inspect_result().await?.mounts.unwrap_or_default())
    }

    fn cli(&self) -> ContainerCli {
        ContainerCli::new(self.client_config().clone())
    }

    /// Start this container.
    pub async fn start(&self) -> Result<()> {
        let result = self.cli().start([self.id()]).await;
        self.invalidate().await;
        result
    }

    /// Stop this container.
    pub async fn stop(&self, time: Option<ValidDuration>) -> Result<()> {
        let result = self.cli().stop([self.id()], time).await;
        self.invalidate().await;
        result
    }

    /// Kill this container.
    pub async fn kill(&self, signal: Option<Signal>) -> Result<()> {
        let result = self.cli().kill([self.id()], signal).await;
        self.invalidate().await;
        result
    }

    /// Pause this container.
    pub async fn pause(&self) -> Result<()> {
        let result = self.cli().pause([self.id()]).await;
        self.invalidate().await;
        result
    }

    /// Unpause this container.
    pub async fn unpause(&self) -> Result<()> {
        let result = self.cli().unpause([self.id()]).await;
        self.invalidate().await;
        result
    }

    /// Restart this container.
    pub async fn restart(&self, time: Option<ValidDuration>) -> Result<()> {
        let result = self.cli().restart([self.id()], time).await;
        self.invalidate().await;
        result
    }

    /// Remove this container.
    pub async fn remove(&self, force: bool, volumes: bool) -> Result<()> {
        self.cli().remove([self.id()], force, volumes).await
    }

    /// Rename this container.
    pub async fn rename(&self, new_name: &str) -> Result<()> {
        let result = self.cli().rename(self.id(), new_name).await;
        self.invalidate().await;
        result
    }

    /// Commit this container's changes into a new image.
    pub async fn commit(
        &self,
        tag: Option<&str>,
        author: Option<&str>,
        message: Option<&str>,
    ) -> Result<crate::Image> {
        self.cli().commit(self.id(), tag, author, message).await
    }

    /// The filesystem diff since the container started.
    pub async fn diff(&self) -> Result<BTreeMap<String, String>> {
        self.cli().diff(self.id()).await
    }

    /// Execute a command in this container and return its stdout.
    pub async fn execute<I, S>(&self, command: I, opts: ExecOpts) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cli().execute(self.id(), command, opts).await
    }

    /// The container logs up to now.
    pub async fn logs(&self, opts: LogsOpts) -> Result<String> {
        self.cli().logs(self.id(), opts).await
    }

    /// Export this container's filesystem to a tar archive.
    pub async fn export(&self, output: &Path) -> Result<()> {
        self.cli().export(self.id(), output).await
    }

    /// Copy a path out of this container.
    pub async fn copy_from(&self, container_path: &str, local_path: &Path) -> Result<()> {
        self.cli()
            .copy(
                CopyEndpoint::in_container(self.id(), container_path),
                CopyEndpoint::local(local_path),
            )
            .await
    }

    /// Copy a local path into this container.
    pub async fn copy_to(&self, local_path: &Path, container_path: &str) -> Result<()> {
        self.cli()
            .copy(
                CopyEndpoint::local(local_path),
                CopyEndpoint::in_container(self.id(), container_path),
            )
            .await
    }

    /// Whether the container still exists.
    pub async fn exists(&self) -> Result<bool> {
        self.cli().exists(self.id()).await
    }
}

impl ScopedResource for Container {
    /// Stop if running, then remove with anonymous volumes unless the
    /// container removes itself.
    async fn teardown(&self) -> Result<()> {
        let auto_remove = self.host_config().await?.auto_remove.unwrap_or(false);
        if self.state().await?.running.unwrap_or(false) {
            self.stop(None).await?;
        }
        if !auto_remove {
            self.remove(false, true).await?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// When to pull the image before `create`/`run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PullPolicy {
    /// Pull only when the image is absent locally.
    #[default]
    Missing,
    /// Always pull.
    Always,
    /// Never pull.
    Never,
}

/// Options shared by `create` and `run`.
///
/// Field order mirrors the engine flag order; every field has a neutral
/// default so callers set only what they need.
#[derive(Debug, Clone)]
pub struct RunOpts {
    /// Extra `/etc/hosts` entries.
    pub add_hosts: Vec<AddHost>,
    /// Block IO weight (10..1000, 0 disables).
    pub blkio_weight: Option<u32>,
    /// Per-device block IO weight.
    pub blkio_weight_device: Vec<String>,
    /// Capabilities to add.
    pub cap_add: Vec<String>,
    /// Capabilities to drop.
    pub cap_drop: Vec<String>,
    /// Parent cgroup.
    pub cgroup_parent: Option<String>,
    /// Cgroup namespace mode (`"host"` or `"private"`).
    pub cgroupns: Option<String>,
    /// File to write the container id to.
    pub cidfile: Option<PathBuf>,
    /// CPU CFS period.
    pub cpu_period: Option<u64>,
    /// CPU CFS quota.
    pub cpu_quota: Option<u64>,
    /// CPU real-time period (µs).
    pub cpu_rt_period: Option<u64>,
    /// CPU real-time runtime (µs).
    pub cpu_rt_runtime: Option<u64>,
    /// CPU shares (relative weight).
    pub cpu_shares: Option<u64>,
    /// CPU cores the container may use.
    pub cpus: Option<f64>,
    /// CPUs the container may execute on, e.g. `"0-2"`.
    pub cpuset_cpus: Option<String>,
    /// Memory nodes the container may use.
    pub cpuset_mems: Option<String>,
    /// Devices to map.
    pub devices: Vec<String>,
    /// Device cgroup rules.
    pub device_cgroup_rules: Vec<String>,
    /// Per-device read rate limits.
    pub device_read_bps: Vec<String>,
    /// Per-device read IOPS limits.
    pub device_read_iops: Vec<String>,
    /// Per-device write rate limits.
    pub device_write_bps: Vec<String>,
    /// Per-device write IOPS limits.
    pub device_write_iops: Vec<String>,
    /// Verify image signatures (`--disable-content-trust=false`).
    pub content_trust: bool,
    /// DNS servers.
    pub dns: Vec<String>,
    /// DNS options.
    pub dns_options: Vec<String>,
    /// DNS search domains.
    pub dns_search: Vec<String>,
    /// NIS domain name.
    pub domainname: Option<String>,
    /// Entrypoint override.
    pub entrypoint: Option<String>,
    /// Environment variables, in order.
    pub envs: Vec<(String, String)>,
    /// Env files.
    pub env_files: Vec<PathBuf>,
    /// Use the host environment inside the container (podman).
    pub env_host: bool,
    /// Ports to expose without publishing.
    pub expose: Vec<u16>,
    /// GPU request, e.g. `"all"` or `"device=0,2"`.
    pub gpus: Option<String>,
    /// Additional groups.
    pub groups_add: Vec<String>,
    /// Whether the image's healthcheck stays enabled.
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
    /// Container hostname.
    pub hostname: Option<String>,
    /// Inject an init process.
    pub init: bool,
    /// Keep stdin open.
    pub interactive: bool,
    /// IPv4 address.
    pub ip: Option<String>,
    /// IPv6 address.
    pub ip6: Option<String>,
    /// IPC mode.
    pub ipc: Option<String>,
    /// Isolation technology.
    pub isolation: Option<String>,
    /// Kernel memory limit (`"4k"`, `"2g"`, bytes as digits).
    pub kernel_memory: Option<String>,
    /// Labels, in order.
    pub labels: Vec<(String, String)>,
    /// Label files.
    pub label_files: Vec<PathBuf>,
    /// Legacy links.
    pub link: Vec<String>,
    /// Link-local addresses.
    pub link_local_ip: Vec<String>,
    /// Logging driver.
    pub log_driver: Option<String>,
    /// Logging driver options.
    pub log_options: Vec<String>,
    /// MAC address.
    pub mac_address: Option<String>,
    /// Memory limit.
    pub memory: Option<String>,
    /// Memory soft limit.
    pub memory_reservation: Option<String>,
    /// Memory+swap limit.
    pub memory_swap: Option<String>,
    /// Swappiness (0..100).
    pub memory_swappiness: Option<i32>,
    /// Mount specifications; each inner list is comma-joined.
    pub mounts: Vec<Vec<String>>,
    /// Container name.
    pub name: Option<String>,
    /// Networks to join.
    pub networks: Vec<String>,
    /// Aliases on those networks.
    pub network_aliases: Vec<String>,
    /// Whether the OOM killer stays enabled.
    pub oom_kill: bool,
    /// OOM score adjustment.
    pub oom_score_adj: Option<i32>,
    /// PID namespace mode.
    pub pid: Option<String>,
    /// Pids limit (-1 for unlimited).
    pub pids_limit: Option<i64>,
    /// Target platform.
    pub platform: Option<String>,
    /// Pod to create the container in (podman).
    pub pod: Option<String>,
    /// Extra descriptors to pass through (podman).
    pub preserve_fds: Option<u32>,
    /// Extended privileges.
    pub privileged: bool,
    /// Ports to publish.
    pub publish: Vec<PortMapping>,
    /// Publish all exposed ports.
    pub publish_all: bool,
    /// Pull policy.
    pub pull: PullPolicy,
    /// Read-only root filesystem.
    pub read_only: bool,
    /// Restart policy.
    pub restart: Option<String>,
    /// Remove the container when it exits.
    pub remove: bool,
    /// Runtime to use.
    pub runtime: Option<String>,
    /// Security options.
    pub security_options: Vec<String>,
    /// Size of `/dev/shm`.
    pub shm_size: Option<String>,
    /// Whether signals are proxied to the process.
    pub sig_proxy: bool,
    /// Stop signal.
    pub stop_signal: Option<Signal>,
    /// Seconds to wait on stop before killing.
    pub stop_timeout: Option<u32>,
    /// Storage driver options.
    pub storage_options: Vec<String>,
    /// Sysctls, in order.
    pub sysctl: Vec<(String, String)>,
    /// Systemd mode (podman): `"true"`, `"false"` or `"always"`.
    pub systemd: Option<String>,
    /// Tmpfs mounts.
    pub tmpfs: Vec<PathBuf>,
    /// Allocate a pseudo-TTY.
    pub tty: bool,
    /// Timezone (podman).
    pub tz: Option<String>,
    /// Ulimits.
    pub ulimit: Vec<String>,
    /// User or uid.
    pub user: Option<String>,
    /// User namespace mode.
    pub userns: Option<String>,
    /// UTS namespace mode.
    pub uts: Option<String>,
    /// Volumes to mount.
    pub volumes: Vec<VolumeSpec>,
    /// Volume driver.
    pub volume_driver: Option<String>,
    /// Containers to inherit volumes from.
    pub volumes_from: Vec<String>,
    /// Working directory.
    pub workdir: Option<String>,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            add_hosts: Vec::new(),
            blkio_weight: None,
            blkio_weight_device: Vec::new(),
            cap_add: Vec::new(),
            cap_drop: Vec::new(),
            cgroup_parent: None,
            cgroupns: None,
            cidfile: None,
            cpu_period: None,
            cpu_quota: None,
            cpu_rt_period: None,
            cpu_rt_runtime: None,
            cpu_shares: None,
            cpus: None,
            cpuset_cpus: None,
            cpuset_mems: None,
            devices: Vec::new(),
            device_cgroup_rules: Vec::new(),
            device_read_bps: Vec::new(),
            device_read_iops: Vec::new(),
            device_write_bps: Vec::new(),
            device_write_iops: Vec::new(),
            content_trust: false,
            dns: Vec::new(),
            dns_options: Vec::new(),
            dns_search: Vec::new(),
            domainname: None,
            entrypoint: None,
            envs: Vec::new(),
            env_files: Vec::new(),
            env_host: false,
            expose: Vec::new(),
            gpus: None,
            groups_add: Vec::new(),
            healthcheck: true,
            health_cmd: None,
            health_interval: None,
            health_retries: None,
            health_start_period: None,
            health_timeout: None,
            hostname: None,
            init: false,
            interactive: false,
            ip: None,
            ip6: None,
            ipc: None,
            isolation: None,
            kernel_memory: None,
            labels: Vec::new(),
            label_files: Vec::new(),
            link: Vec::new(),
            link_local_ip: Vec::new(),
            log_driver: None,
            log_options: Vec::new(),
            mac_address: None,
            memory: None,
            memory_reservation: None,
            memory_swap: None,
            memory_swappiness: None,
            mounts: Vec::new(),
            name: None,
            networks: Vec::new(),
            network_aliases: Vec::new(),
            oom_kill: true,
            oom_score_adj: None,
            pid: None,
            pids_limit: None,
            platform: None,
            pod: None,
            preserve_fds: None,
            privileged: false,
            publish: Vec::new(),
            publish_all: false,
            pull: PullPolicy::default(),
            read_only: false,
            restart: None,
            remove: false,
            runtime: None,
            security_options: Vec::new(),
            shm_size: None,
            sig_proxy: true,
            stop_signal: None,
            stop_timeout: None,
            storage_options: Vec::new(),
            sysctl: Vec::new(),
            systemd: None,
            tmpfs: Vec::new(),
            tty: false,
            tz: None,
            ulimit: Vec::new(),
            user: None,
            userns: None,
            uts: None,
            volumes: Vec::new(),
            volume_driver: None,
            volumes_from: Vec::new(),
            workdir: None,
        }
    }
}

impl RunOpts {
    /// Append every configured flag to `cmd`.
    fn apply(&self, cmd: &mut Command) {
        cmd.add_args_iterable("--add-host", &self.add_hosts);
        cmd.add_simple_arg("--blkio-weight", self.blkio_weight);
        cmd.add_args_iterable("--blkio-weight-device", &self.blkio_weight_device);
        cmd.add_args_iterable("--cap-add", &self.cap_add);
        cmd.add_args_iterable("--cap-drop", &self.cap_drop);
        cmd.add_simple_arg("--cgroup-parent", self.cgroup_parent.as_deref());
        cmd.add_simple_arg("--cgroupns", self.cgroupns.as_deref());
        cmd.add_simple_arg("--cidfile", self.cidfile.as_deref().map(Path::display));
        cmd.add_simple_arg("--cpu-period", self.cpu_period);
        cmd.add_simple_arg("--cpu-quota", self.cpu_quota);
        cmd.add_simple_arg("--cpu-rt-period", self.cpu_rt_period);
        cmd.add_simple_arg("--cpu-rt-runtime", self.cpu_rt_runtime);
        cmd.add_simple_arg("--cpu-shares", self.cpu_shares);
        cmd.add_simple_arg("--cpus", self.cpus);
        cmd.add_simple_arg("--cpuset-cpus", self.cpuset_cpus.as_deref());
        cmd.add_simple_arg("--cpuset-mems", self.cpuset_mems.as_deref());
        cmd.add_args_iterable("--device", &self.devices);
        cmd.add_args_iterable("--device-cgroup-rule", &self.device_cgroup_rules);
        cmd.add_args_iterable("--device-read-bps", &self.device_read_bps);
        cmd.add_args_iterable("--device-read-iops", &self.device_read_iops);
        cmd.add_args_iterable("--device-write-bps", &self.device_write_bps);
        cmd.add_args_iterable("--device-write-iops", &self.device_write_iops);
        if self.content_trust {
            cmd.extend(["--disable-content-trust", "false"]);
        }
        cmd.add_args_iterable("--dns", &self.dns);
        cmd.add_args_iterable("--dns-option", &self.dns_options);
        cmd.add_args_iterable("--dns-search", &self.dns_search);
        cmd.add_simple_arg("--domainname", self.domainname.as_deref());
        cmd.add_simple_arg("--entrypoint", self.entrypoint.as_deref());
        cmd.add_args_mapping("--env", self.envs.iter().map(|(k, v)| (k, v)));
        cmd.add_args_iterable("--env-file", self.env_files.iter().map(|p| p.display()));
        cmd.add_flag("--env-host", self.env_host);
        cmd.add_args_iterable("--expose", &self.expose);
        cmd.add_simple_arg("--gpus", self.gpus.as_deref());
        cmd.add_args_iterable("--group-add", &self.groups_add);
        cmd.add_flag("--no-healthcheck", !self.healthcheck);
        cmd.add_simple_arg("--health-cmd", self.health_cmd.as_deref());
        cmd.add_simple_arg("--health-interval", self.health_interval);
        cmd.add_simple_arg("--health-retries", self.health_retries);
        cmd.add_simple_arg("--health-start-period", self.health_start_period);
        cmd.add_simple_arg("--health-timeout", self.health_timeout);
        cmd.add_simple_arg("--hostname", self.hostname.as_deref());
        cmd.add_flag("--init", self.init);
        cmd.add_flag("--interactive", self.interactive);
        cmd.add_simple_arg("--ip", self.ip.as_deref());
        cmd.add_simple_arg("--ip6", self.ip6.as_deref());
        cmd.add_simple_arg("--ipc", self.ipc.as_deref());
        cmd.add_simple_arg("--isolation", self.isolation.as_deref());
        cmd.add_simple_arg("--kernel-memory", self.kernel_memory.as_deref());
        cmd.add_args_mapping("--label", self.labels.iter().map(|(k, v)| (k, v)));
        cmd.add_args_iterable("--label-file", self.label_files.iter().map(|p| p.display()));
        cmd.add_args_iterable("--link", &self.link);
        cmd.add_args_iterable("--link-local-ip", &self.link_local_ip);
        cmd.add_simple_arg("--log-driver", self.log_driver.as_deref());
        cmd.add_args_iterable("--log-opt", &self.log_options);
        cmd.add_simple_arg("--mac-address", self.mac_address.as_deref());
        cmd.add_simple_arg("--memory", self.memory.as_deref());
        cmd.add_simple_arg("--memory-reservation", self.memory_reservation.as_deref());
        cmd.add_simple_arg("--memory-swap", self.memory_swap.as_deref());
        cmd.add_simple_arg("--memory-swappiness", self.memory_swappiness);
        cmd.add_args_iterable("--mount", self.mounts.iter().map(|m| m.join(",")));
        cmd.add_simple_arg("--name", self.name.as_deref());
        cmd.add_args_iterable("--network", &self.networks);
        cmd.add_args_iterable("--network-alias", &self.network_aliases);
        cmd.add_flag("--oom-kill-disable", !self.oom_kill);
        cmd.add_simple_arg("--oom-score-adj", self.oom_score_adj);
        cmd.add_simple_arg("--pid", self.pid.as_deref());
        cmd.add_simple_arg("--pids-limit", self.pids_limit);
        cmd.add_simple_arg("--platform", self.platform.as_deref());
        cmd.add_simple_arg("--pod", self.pod.as_deref());
        cmd.add_simple_arg("--preserve-fds", self.preserve_fds);
        cmd.add_flag("--privileged", self.privileged);
        cmd.add_args_iterable("-p", &self.publish);
        cmd.add_flag("--publish-all", self.publish_all);
        if self.pull == PullPolicy::Never {
            cmd.extend(["--pull", "never"]);
        }
        cmd.add_flag("--read-only", self.read_only);
        cmd.add_simple_arg("--restart", self.restart.as_deref());
        cmd.add_flag("--rm", self.remove);
        cmd.add_simple_arg("--runtime", self.runtime.as_deref());
        cmd.add_args_iterable("--security-opt", &self.security_options);
        cmd.add_simple_arg("--shm-size", self.shm_size.as_deref());
        if !self.sig_proxy {
            cmd.extend(["--sig-proxy", "false"]);
        }
        cmd.add_simple_arg("--stop-signal", self.stop_signal.clone());
        cmd.add_simple_arg("--stop-timeout", self.stop_timeout);
        cmd.add_args_iterable("--storage-opt", &self.storage_options);
        cmd.add_args_mapping("--sysctl", self.sysctl.iter().map(|(k, v)| (k, v)));
        cmd.add_simple_arg("--systemd", self.systemd.as_deref());
        cmd.add_args_iterable("--tmpfs", self.tmpfs.iter().map(|p| p.display()));
        cmd.add_flag("--tty", self.tty);
        cmd.add_simple_arg("--tz", self.tz.as_deref());
        cmd.add_args_iterable("--ulimit", &self.ulimit);
        cmd.add_simple_arg("--user", self.user.as_deref());
        cmd.add_simple_arg("--userns", self.userns.as_deref());
        cmd.add_simple_arg("--uts", self.uts.as_deref());
        cmd.add_args_iterable("--volume", &self.volumes);
        cmd.add_simple_arg("--volume-driver", self.volume_driver.as_deref());
        cmd.add_args_iterable("--volumes-from", &self.volumes_from);
        cmd.add_simple_arg("--workdir", self.workdir.as_deref());
    }
}

/// Options for `exec`.
#[derive(Debug, Clone)]
pub struct ExecOpts {
    /// Environment variables, in order.
    pub envs: Vec<(String, String)>,
    /// Env files.
    pub env_files: Vec<PathBuf>,
    /// Keep stdin open.
    pub interactive: bool,
    /// Extended privileges.
    pub privileged: bool,
    /// Allocate a pseudo-TTY.
    pub tty: bool,
    /// User or uid.
    pub user: Option<String>,
    /// Working directory inside the container.
    pub workdir: Option<String>,
    /// Detach key sequence override.
    pub detach_keys: Option<String>,
    /// Extra descriptors to pass through (podman).
    pub preserve_fds: Option<u32>,
}

impl Default for ExecOpts {
    fn default() -> Self {
        Self {
            envs: Vec::new(),
            env_files: Vec::new(),
            interactive: false,
            privileged: false,
            tty: false,
            user: None,
            workdir: None,
            detach_keys: None,
            preserve_fds: None,
        }
    }
}

impl ExecOpts {
    fn apply(&self, cmd: &mut Command) {
        cmd.add_simple_arg("--detach-keys", self.detach_keys.as_deref());
        cmd.add_args_mapping("--env", self.envs.iter().map(|(k, v)| (k, v)));
        cmd.add_args_iterable("--env-file", self.env_files.iter().map(|p| p.display()));
        cmd.add_flag("--interactive", self.interactive);
        cmd.add_simple_arg("--preserve-fds", self.preserve_fds);
        cmd.add_flag("--privileged", self.privileged);
        cmd.add_flag("--tty", self.tty);
        cmd.add_simple_arg("--user", self.user.as_deref());
        cmd.add_simple_arg("--workdir", self.workdir.as_deref());
    }
}

/// Options for `logs`.
#[derive(Debug, Clone, Default)]
pub struct LogsOpts {
    /// Show extra details.
    pub details: bool,
    /// Lower time bound, e.g. `"2013-01-02T13:23:37Z"` or `"42m"`.
    pub since: Option<String>,
    /// Number of lines from the end.
    pub tail: Option<u64>,
    /// Prefix lines with timestamps.
    pub timestamps: bool,
    /// Upper time bound.
    pub until: Option<String>,
    /// Keep following until the container stops.
    pub follow: bool,
}

impl LogsOpts {
    fn apply(&self, cmd: &mut Command) {
        cmd.add_flag("--details", self.details);
        cmd.add_simple_arg("--since", self.since.as_deref());
        cmd.add_simple_arg("--tail", self.tail);
        cmd.add_flag("--timestamps", self.timestamps);
        cmd.add_simple_arg("--until", self.until.as_deref());
        cmd.add_flag("--follow", self.follow);
    }
}

/// Options for `update`.
#[derive(Debug, Clone, Default)]
pub struct UpdateOpts {
    /// Block IO weight.
    pub blkio_weight: Option<u32>,
    /// CPU CFS period.
    pub cpu_period: Option<u64>,
    /// CPU CFS quota.
    pub cpu_quota: Option<u64>,
    /// CPU real-time period (µs).
    pub cpu_rt_period: Option<u64>,
    /// CPU real-time runtime (µs).
    pub cpu_rt_runtime: Option<u64>,
    /// CPU shares.
    pub cpu_shares: Option<u64>,
    /// CPU cores.
    pub cpus: Option<f64>,
    /// Allowed CPUs.
    pub cpuset_cpus: Option<String>,
    /// Allowed memory nodes.
    pub cpuset_mems: Option<String>,
    /// Kernel memory limit.
    pub kernel_memory: Option<String>,
    /// Memory limit.
    pub memory: Option<String>,
    /// Memory soft limit.
    pub memory_reservation: Option<String>,
    /// Memory+swap limit.
    pub memory_swap: Option<String>,
    /// Pids limit.
    pub pids_limit: Option<i64>,
    /// Restart policy.
    pub restart: Option<String>,
}

/// One side of a `cp` operation.
#[derive(Debug, Clone)]
pub enum CopyEndpoint {
    /// A path on the local filesystem.
    Local(PathBuf),
    /// A path inside a container.
    InContainer {
        /// Container name or id.
        container: String,
        /// Path inside the container.
        path: String,
    },
    /// A tar archive fed through the standard stream (`-`). Only valid as
    /// a source.
    TarBytes(Vec<u8>),
}

impl CopyEndpoint {
    /// A local path.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        CopyEndpoint::Local(path.into())
    }

    /// A path inside a container.
    pub fn in_container(container: impl Into<String>, path: impl Into<String>) -> Self {
        CopyEndpoint::InContainer {
            container: container.into(),
            path: path.into(),
        }
    }

    fn to_arg(&self) -> String {
        match self {
            CopyEndpoint::Local(path) => path.display().to_string(),
            CopyEndpoint::InContainer { container, path } => format!("{container}:{path}"),
            CopyEndpoint::TarBytes(_) => "-".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// ContainerCli
// ---------------------------------------------------------------------------

/// Container operations (`container …`).
#[derive(Debug, Clone)]
pub struct ContainerCli {
    config: ClientConfig,
}

impl ContainerCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    async fn pull_for_policy(&self, image: &str, policy: PullPolicy) -> Result<()> {
        let images = crate::image::ImageCli::new(self.config.clone());
        match policy {
            PullPolicy::Missing => {
                images.pull_if_necessary(image).await?;
            }
            PullPolicy::Always => {
                images.pull(image).await?;
            }
            PullPolicy::Never => {}
        }
        Ok(())
    }

    async fn create_or_run_command<I, S>(
        &self,
        verb: &str,
        image: &str,
        command: I,
        opts: &RunOpts,
        detach: bool,
    ) -> Result<Command>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.pull_for_policy(image, opts.pull).await?;
        let mut cmd = engine_command(&self.config, &["container", verb]).await?;
        opts.apply(&mut cmd);
        cmd.add_flag("--detach", detach);
        cmd.append(image);
        cmd.extend(to_string_vec(command));
        Ok(cmd)
    }

    /// Create a container without starting it. Returns a handle built from
    /// the trusted id the engine printed.
    pub async fn create<I, S>(&self, image: &str, command: I, opts: RunOpts) -> Result<Container>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cmd = self
            .create_or_run_command("create", image, command, &opts, false)
            .await?;
        let output = run_command(&self.config, cmd).await?;
        let id = output
            .stdout
            .lines()
            .last()
            .unwrap_or_default()
            .trim()
            .to_string();
        Ok(Container::from_trusted_id(self.config.clone(), id))
    }

    /// Run a container attached and return its output. The engine's
    /// stderr is passed through to the caller's terminal.
    pub async fn run<I, S>(&self, image: &str, command: I, opts: RunOpts) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tty = opts.tty;
        let cmd = self
            .create_or_run_command("run", image, command, &opts, false)
            .await?;
        let output = Execution::new(cmd.into_vec(), self.config.kind())
            .capture_stderr(false)
            .tty(tty)
            .run()
            .await?;
        Ok(output.stdout)
    }

    /// Run a container detached and return its handle.
    pub async fn run_detached<I, S>(
        &self,
        image: &str,
        command: I,
        opts: RunOpts,
    ) -> Result<Container>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if opts.tty {
            return Err(Error::InvalidInput(
                "a detached container cannot allocate the caller's terminal".to_string(),
            ));
        }
        let cmd = self
            .create_or_run_command("run", image, command, &opts, true)
            .await?;
        let output = run_command(&self.config, cmd).await?;
        let id = output
            .stdout
            .lines()
            .last()
            .unwrap_or_default()
            .trim()
            .to_string();
        Ok(Container::from_trusted_id(self.config.clone(), id))
    }

    /// Run a container attached, streaming tagged output frames.
    pub async fn run_streamed<I, S>(
        &self,
        image: &str,
        command: I,
        opts: RunOpts,
    ) -> Result<FrameStream>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if opts.tty {
            return Err(Error::InvalidInput(
                "streaming and a pseudo-TTY are incompatible".to_string(),
            ));
        }
        let cmd = self
            .create_or_run_command("run", image, command, &opts, false)
            .await?;
        stream_command(&self.config, cmd)
    }

    /// Start one or more containers. An empty selection is a no-op.
    pub async fn start<I, S>(&self, containers: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let containers = to_string_vec(containers);
        if containers.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["container", "start"]).await?;
        cmd.extend(containers);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Stop one or more containers. An empty selection is a no-op.
    pub async fn stop<I, S>(&self, containers: I, time: Option<ValidDuration>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let containers = to_string_vec(containers);
        if containers.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["container", "stop"]).await?;
        cmd.add_simple_arg("--time", time);
        cmd.extend(containers);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Kill one or more containers. An empty selection is a no-op.
    pub async fn kill<I, S>(&self, containers: I, signal: Option<Signal>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let containers = to_string_vec(containers);
        if containers.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["container", "kill"]).await?;
        cmd.add_simple_arg("--signal", signal);
        cmd.extend(containers);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Pause one or more containers. An empty selection is a no-op.
    pub async fn pause<I, S>(&self, containers: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let containers = to_string_vec(containers);
        if containers.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["container", "pause"]).await?;
        cmd.extend(containers);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Unpause one or more containers. An empty selection is a no-op.
    pub async fn unpause<I, S>(&self, containers: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let containers = to_string_vec(containers);
        if containers.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["container", "unpause"]).await?;
        cmd.extend(containers);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Restart one or more containers. An empty selection is a no-op.
    pub async fn restart<I, S>(&self, containers: I, time: Option<ValidDuration>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let containers = to_string_vec(containers);
        if containers.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["container", "restart"]).await?;
        cmd.add_simple_arg("--time", time);
        cmd.extend(containers);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Remove one or more containers. An empty selection is a no-op.
    pub async fn remove<I, S>(&self, containers: I, force: bool, volumes: bool) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let containers = to_string_vec(containers);
        if containers.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["container", "rm"]).await?;
        cmd.add_flag("--force", force);
        cmd.add_flag("--volumes", volumes);
        cmd.extend(containers);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Rename a container.
    pub async fn rename(&self, container: &str, new_name: &str) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["container", "rename"]).await?;
        cmd.append(container);
        cmd.append(new_name);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Commit a container's changes into an image.
    pub async fn commit(
        &self,
        container: &str,
        tag: Option<&str>,
        author: Option<&str>,
        message: Option<&str>,
    ) -> Result<crate::Image> {
        let mut cmd = engine_command(&self.config, &["container", "commit"]).await?;
        cmd.add_simple_arg("--author", author);
        cmd.add_simple_arg("--message", message);
        cmd.append(container);
        if let Some(tag) = tag {
            cmd.append(tag);
        }
        let output = run_command(&self.config, cmd).await?;
        Ok(crate::Image::from_trusted_id(
            self.config.clone(),
            output.stdout.trim(),
        ))
    }

    /// The filesystem diff since the container started, path → change
    /// letter (`A`, `C`, `D`).
    pub async fn diff(&self, container: &str) -> Result<BTreeMap<String, String>> {
        let mut cmd = engine_command(&self.config, &["container", "diff"]).await?;
        cmd.append(container);
        let output = run_command(&self.config, cmd).await?;
        let mut changes = BTreeMap::new();
        for line in output.stdout.lines() {
            if let Some((letter, path)) = line.split_once(' ') {
                changes.insert(path.to_string(), letter.to_string());
            }
        }
        Ok(changes)
    }

    /// Copy files between a container and the local filesystem.
    pub async fn copy(&self, source: CopyEndpoint, destination: CopyEndpoint) -> Result<()> {
        if matches!(destination, CopyEndpoint::TarBytes(_)) {
            return Err(Error::NotImplemented("receiving a tar byte stream from cp"));
        }
        let mut cmd = engine_command(&self.config, &["container", "cp"]).await?;
        cmd.append(source.to_arg());
        cmd.append(destination.to_arg());
        let mut execution = Execution::new(cmd.into_vec(), self.config.kind());
        if let CopyEndpoint::TarBytes(bytes) = source {
            execution = execution.stdin(bytes);
        }
        execution.run().await?;
        Ok(())
    }

    /// Execute a command in a container and return its stdout.
    pub async fn execute<I, S>(&self, container: &str, command: I, opts: ExecOpts) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tty = opts.tty;
        let cmd = self.exec_command(container, command, &opts).await?;
        let output = Execution::new(cmd.into_vec(), self.config.kind())
            .tty(tty)
            .run()
            .await?;
        Ok(output.stdout)
    }

    /// Execute a command detached.
    pub async fn execute_detached<I, S>(
        &self,
        container: &str,
        command: I,
        opts: ExecOpts,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if opts.interactive || opts.tty {
            return Err(Error::InvalidInput(
                "a detached exec cannot be interactive or allocate a TTY".to_string(),
            ));
        }
        let mut cmd = engine_command(&self.config, &["container", "exec"]).await?;
        cmd.add_flag("--detach", true);
        opts.apply(&mut cmd);
        cmd.append(container);
        cmd.extend(to_string_vec(command));
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Execute a command, streaming tagged output frames.
    pub async fn execute_streamed<I, S>(
        &self,
        container: &str,
        command: I,
        opts: ExecOpts,
    ) -> Result<FrameStream>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if opts.interactive || opts.tty {
            return Err(Error::InvalidInput(
                "streaming an exec is incompatible with interactive and tty".to_string(),
            ));
        }
        let cmd = self.exec_command(container, command, &opts).await?;
        stream_command(&self.config, cmd)
    }

    async fn exec_command<I, S>(
        &self,
        container: &str,
        command: I,
        opts: &ExecOpts,
    ) -> Result<Command>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = engine_command(&self.config, &["container", "exec"]).await?;
        opts.apply(&mut cmd);
        cmd.append(container);
        cmd.extend(to_string_vec(command));
        Ok(cmd)
    }

    /// Whether a container exists.
    pub async fn exists(&self, container: &str) -> Result<bool> {
        match self.inspect(container).await {
            Ok(_) => Ok(true),
            Err(Error::NoSuchContainer(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Export a container's filesystem as a tar archive.
    pub async fn export(&self, container: &str, output: &Path) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["container", "export"]).await?;
        cmd.add_simple_arg("--output", Some(output.display()));
        cmd.append(container);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Initialize one or more containers (podman). An empty selection is
    /// a no-op.
    pub async fn init<I, S>(&self, containers: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let containers = to_string_vec(containers);
        if containers.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["container", "init"]).await?;
        cmd.extend(containers);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Resolve a reference into a [`Container`] handle.
    pub async fn inspect(&self, container: &str) -> Result<Container> {
        Container::from_reference(self.config.clone(), container).await
    }

    /// Resolve several references into handles.
    pub async fn inspect_many<I, S>(&self, containers: I) -> Result<Vec<Container>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut handles = Vec::new();
        for reference in containers {
            handles.push(self.inspect(reference.as_ref()).await?);
        }
        Ok(handles)
    }

    /// List containers as trusted handles.
    pub async fn list(&self, all: bool, filters: &[(&str, &str)]) -> Result<Vec<Container>> {
        let mut cmd =
            engine_command(&self.config, &["container", "list", "-q", "--no-trunc"]).await?;
        cmd.add_flag("--all", all);
        cmd.add_args_iterable("--filter", filters.iter().map(|(k, v)| format!("{k}={v}")));
        let output = run_command(&self.config, cmd).await?;
        Ok(output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|id| Container::from_trusted_id(self.config.clone(), id))
            .collect())
    }

    /// Attach the caller's terminal to a running container.
    pub async fn attach(
        &self,
        container: &str,
        detach_keys: Option<&str>,
        stdin: bool,
        sig_proxy: bool,
    ) -> Result<()> {
        // Raises NoSuchContainer before handing the terminal over.
        self.inspect(container).await?;
        let mut cmd = engine_command(&self.config, &["container", "attach"]).await?;
        cmd.add_simple_arg("--detach-keys", detach_keys);
        cmd.add_flag("--no-stdin", !stdin);
        cmd.add_flag("--sig-proxy", sig_proxy);
        cmd.append(container);
        Execution::new(cmd.into_vec(), self.config.kind())
            .tty(true)
            .run()
            .await?;
        Ok(())
    }

    /// The logs of a container up to now, stdout frames concatenated.
    pub async fn logs(&self, container: &str, opts: LogsOpts) -> Result<String> {
        let stream = self.logs_streamed(container, opts).await?;
        stream.collect_stdout().await
    }

    /// The logs of a container as a frame stream.
    pub async fn logs_streamed(&self, container: &str, opts: LogsOpts) -> Result<FrameStream> {
        // Raises NoSuchContainer before streaming begins.
        self.inspect(container).await?;
        let mut cmd = engine_command(&self.config, &["container", "logs"]).await?;
        opts.apply(&mut cmd);
        cmd.append(container);
        stream_command(&self.config, cmd)
    }

    /// Remove stopped containers. An empty filter set prunes everything
    /// not running.
    pub async fn prune(&self, filters: &[(&str, &str)]) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["container", "prune", "--force"]).await?;
        cmd.add_args_iterable("--filter", filters.iter().map(|(k, v)| format!("{k}={v}")));
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Resource usage statistics, one sample per container.
    pub async fn stats<I, S>(&self, all: bool, containers: I) -> Result<Vec<ContainerStats>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let containers = to_string_vec(containers);
        let mut cmd = engine_command(
            &self.config,
            &[
                "container",
                "stats",
                "--format",
                "{{json .}}",
                "--no-stream",
                "--no-trunc",
            ],
        )
        .await?;
        cmd.add_flag("--all", all);
        cmd.extend(containers);
        let output = run_command(&self.config, cmd).await?;
        ContainerStats::parse_lines(&output.stdout)
    }

    /// Update resource limits of one or more containers. An empty
    /// selection is a no-op.
    pub async fn update<I, S>(&self, containers: I, opts: UpdateOpts) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let containers = to_string_vec(containers);
        if containers.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["container", "update"]).await?;
        cmd.add_simple_arg("--blkio-weight", opts.blkio_weight);
        cmd.add_simple_arg("--cpu-period", opts.cpu_period);
        cmd.add_simple_arg("--cpu-quota", opts.cpu_quota);
        cmd.add_simple_arg("--cpu-rt-period", opts.cpu_rt_period);
        cmd.add_simple_arg("--cpu-rt-runtime", opts.cpu_rt_runtime);
        cmd.add_simple_arg("--cpu-shares", opts.cpu_shares);
        cmd.add_simple_arg("--cpus", opts.cpus);
        cmd.add_simple_arg("--cpuset-cpus", opts.cpuset_cpus.as_deref());
        cmd.add_simple_arg("--cpuset-mems", opts.cpuset_mems.as_deref());
        cmd.add_simple_arg("--kernel-memory", opts.kernel_memory.as_deref());
        cmd.add_simple_arg("--memory", opts.memory.as_deref());
        cmd.add_simple_arg("--memory-reservation", opts.memory_reservation.as_deref());
        cmd.add_simple_arg("--memory-swap", opts.memory_swap.as_deref());
        cmd.add_simple_arg("--pids-limit", opts.pids_limit);
        cmd.add_simple_arg("--restart", opts.restart.as_deref());
        cmd.extend(containers);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Block until a container stops; returns its exit code.
    pub async fn wait_one(&self, container: &str) -> Result<i64> {
        let codes = self.wait([container]).await?;
        codes.into_iter().next().ok_or_else(|| {
            Error::InvalidInput("wait returned no exit code".to_string())
        })
    }

    /// Block until the given containers stop; returns their exit codes in
    /// input order. An empty selection returns an empty list.
    pub async fn wait<I, S>(&self, containers: I) -> Result<Vec<i64>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let containers = to_string_vec(containers);
        if containers.is_empty() {
            return Ok(Vec::new());
        }
        let mut cmd = engine_command(&self.config, &["container", "wait"]).await?;
        cmd.extend(containers);
        let output = run_command(&self.config, cmd).await?;
        output
            .stdout
            .lines()
            .map(|line| {
                line.trim().parse().map_err(|_| {
                    Error::InvalidInput(format!("wait printed a non-integer exit code: {line:?}"))
                })
            })
            .collect()
    }

    /// Listing the processes of a container has no stable output shape.
    pub fn top(&self) -> Result<()> {
        Err(Error::NotImplemented("container top"))
    }

    /// The port mapping lookup has no settled output shape.
    pub fn port(&self) -> Result<()> {
        Err(Error::NotImplemented("container port"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_config::{ClientConfig, ClientOpts};

    fn test_config() -> ClientConfig {
        ClientConfig::new(ClientOpts {
            binary_path: Some(PathBuf::from("/usr/bin/docker")),
            ..ClientOpts::default()
        })
    }

    fn rendered(opts: &RunOpts) -> Vec<String> {
        let mut cmd = Command::new(["docker", "container", "run"]);
        opts.apply(&mut cmd);
        cmd.into_vec()
    }

    #[test]
    fn default_opts_add_no_flags() {
        let argv = rendered(&RunOpts::default());
        assert_eq!(argv, ["docker", "container", "run"]);
    }

    #[test]
    fn publish_and_volumes_use_the_formatters() {
        let opts = RunOpts {
            publish: vec![PortMapping::new(8080, 80), PortMapping::container(9000)],
            volumes: vec![VolumeSpec::new("/", "/host").mode("ro")],
            ..RunOpts::default()
        };
        let argv = rendered(&opts);
        assert!(argv.windows(2).any(|w| w == ["-p", "8080:80"]));
        assert!(argv.windows(2).any(|w| w == ["-p", "9000"]));
        assert!(argv.windows(2).any(|w| w == ["--volume", "/:/host:ro"]));
    }

    #[test]
    fn env_and_label_maps_render_in_order() {
        let opts = RunOpts {
            envs: vec![("B".into(), "2".into()), ("A".into(), "1".into())],
            labels: vec![("dodo".into(), "dada".into())],
            ..RunOpts::default()
        };
        let argv = rendered(&opts);
        let env_positions: Vec<_> = argv
            .iter()
            .enumerate()
            .filter(|(_, t)| t.as_str() == "--env")
            .map(|(i, _)| argv[i + 1].clone())
            .collect();
        assert_eq!(env_positions, ["B=2", "A=1"]);
        assert!(argv.windows(2).any(|w| w == ["--label", "dodo=dada"]));
    }

    #[test]
    fn negated_defaults_only_appear_when_disabled() {
        let argv = rendered(&RunOpts::default());
        assert!(!argv.contains(&"--no-healthcheck".to_string()));
        assert!(!argv.contains(&"--oom-kill-disable".to_string()));

        let opts = RunOpts {
            healthcheck: false,
            oom_kill: false,
            sig_proxy: false,
            ..RunOpts::default()
        };
        let argv = rendered(&opts);
        assert!(argv.contains(&"--no-healthcheck".to_string()));
        assert!(argv.contains(&"--oom-kill-disable".to_string()));
        assert!(argv.windows(2).any(|w| w == ["--sig-proxy", "false"]));
    }

    #[test]
    fn content_trust_uses_the_explicit_false_form() {
        let opts = RunOpts {
            content_trust: true,
            ..RunOpts::default()
        };
        let argv = rendered(&opts);
        assert!(argv
            .windows(2)
            .any(|w| w == ["--disable-content-trust", "false"]));
    }

    #[test]
    fn pull_policy_never_adds_the_flag() {
        let opts = RunOpts {
            pull: PullPolicy::Never,
            ..RunOpts::default()
        };
        let argv = rendered(&opts);
        assert!(argv.windows(2).any(|w| w == ["--pull", "never"]));
        assert!(!rendered(&RunOpts::default()).contains(&"--pull".to_string()));
    }

    #[test]
    fn add_hosts_render_as_host_colon_ip() {
        let opts = RunOpts {
            add_hosts: vec![AddHost::new("db", "10.0.0.5")],
            ..RunOpts::default()
        };
        let argv = rendered(&opts);
        assert!(argv.windows(2).any(|w| w == ["--add-host", "db:10.0.0.5"]));
    }

    #[test]
    fn mounts_are_comma_joined() {
        let opts = RunOpts {
            mounts: vec![vec![
                "type=volume".into(),
                "source=data".into(),
                "target=/data".into(),
            ]],
            ..RunOpts::default()
        };
        let argv = rendered(&opts);
        assert!(argv
            .windows(2)
            .any(|w| w == ["--mount", "type=volume,source=data,target=/data"]));
    }

    #[test]
    fn copy_endpoints_render_engine_syntax() {
        assert_eq!(
            CopyEndpoint::in_container("dodo", "/path/in/container.txt").to_arg(),
            "dodo:/path/in/container.txt"
        );
        assert_eq!(CopyEndpoint::local("/tmp/f.txt").to_arg(), "/tmp/f.txt");
        assert_eq!(CopyEndpoint::TarBytes(vec![1, 2]).to_arg(), "-");
    }

    #[test]
    fn trusted_handles_are_equal_by_id_and_client() {
        let config = test_config();
        let a = Container::from_trusted_id(config.clone(), "abc123");
        let b = Container::from_trusted_id(config.clone(), "abc123");
        let c = Container::from_trusted_id(config, "def456");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "abc123");

        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut ha = DefaultHasher::new();
        a.hash(&mut ha);
        let mut hb = DefaultHasher::new();
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[tokio::test]
    async fn wait_on_empty_selection_is_a_noop() {
        let cli = ContainerCli::new(test_config());
        let codes = cli.wait(Vec::<String>::new()).await.unwrap();
        assert!(codes.is_empty());
    }

    #[tokio::test]
    async fn kill_on_empty_selection_spawns_nothing() {
        // The configured binary does not exist; a spawn would error.
        let cli = ContainerCli::new(ClientConfig::new(ClientOpts {
            binary_path: Some(PathBuf::from("/definitely/not/docker")),
            ..ClientOpts::default()
        }));
        cli.kill(Vec::<String>::new(), None).await.unwrap();
        cli.pause(Vec::<String>::new()).await.unwrap();
        cli.remove(Vec::<String>::new(), true, true).await.unwrap();
        cli.start(Vec::<String>::new()).await.unwrap();
        cli.stop(Vec::<String>::new(), None).await.unwrap();
        cli.init(Vec::<String>::new()).await.unwrap();
    }

    #[test]
    fn top_and_port_are_not_implemented() {
        let cli = ContainerCli::new(test_config());
        assert!(matches!(cli.top(), Err(Error::NotImplemented(_))));
        assert!(matches!(cli.port(), Err(Error::NotImplemented(_))));
    }
}
