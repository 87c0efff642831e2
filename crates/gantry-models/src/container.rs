// SPDX-License-Identifier: MIT OR Apache-2.0
//! Container inspect payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of a container health-check log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerHealthcheckResult {
    /// When the probe started.
    pub start: Option<DateTime<Utc>>,
    /// When the probe finished.
    pub end: Option<DateTime<Utc>>,
    /// Probe exit code.
    pub exit_code: Option<i64>,
    /// Probe output.
    pub output: Option<String>,
}

/// Aggregated health state of a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerHealth {
    /// `"starting"`, `"healthy"` or `"unhealthy"`.
    pub status: Option<String>,
    /// Consecutive failures so far.
    pub failing_streak: Option<i64>,
    /// Recent probe results.
    pub log: Option<Vec<ContainerHealthcheckResult>>,
}

/// The engine-owned run state of a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    /// `"created"`, `"running"`, `"paused"`, `"exited"`, …
    pub status: Option<String>,
    /// Whether the main process is running.
    pub running: Option<bool>,
    /// Whether the container is paused.
    pub paused: Option<bool>,
    /// Whether the container is restarting.
    pub restarting: Option<bool>,
    /// Whether the kernel OOM killer fired.
    #[serde(rename = "OOMKilled")]
    pub oom_killed: Option<bool>,
    /// Whether the container is dead.
    pub dead: Option<bool>,
    /// PID of the main process.
    pub pid: Option<i64>,
    /// Exit code of the last run.
    pub exit_code: Option<i64>,
    /// Engine-reported error.
    pub error: Option<String>,
    /// Start timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Finish timestamp.
    pub finished_at: Option<DateTime<Utc>>,
    /// Health-check state, when a check is configured.
    pub health: Option<ContainerHealth>,
}

/// A device mapped into a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerDevice {
    /// Host path.
    pub path_on_host: Option<String>,
    /// In-container path.
    pub path_in_container: Option<String>,
    /// cgroup permission string.
    pub cgroup_permissions: Option<String>,
}

/// A ulimit applied to a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerUlimit {
    /// Limit name.
    pub name: Option<String>,
    /// Soft limit.
    pub soft: Option<i64>,
    /// Hard limit.
    pub hard: Option<i64>,
}

/// Logging driver configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerLogConfig {
    /// Driver name.
    pub r#type: Option<String>,
    /// Driver options.
    pub config: Option<serde_json::Value>,
}

/// Restart policy of a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerRestartPolicy {
    /// Policy name (`"no"`, `"always"`, `"on-failure"`, …).
    pub name: Option<String>,
    /// Retry cap for `"on-failure"`.
    pub maximum_retry_count: Option<i64>,
}

/// One side of a published port.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortBinding {
    /// Host address.
    pub host_ip: Option<String>,
    /// Host port.
    pub host_port: Option<String>,
}

/// A mount attached to a container (host-config view).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerMount {
    /// Mount target inside the container.
    pub target: Option<String>,
    /// Source volume or path.
    pub source: Option<String>,
    /// `"bind"`, `"volume"` or `"tmpfs"`.
    pub r#type: Option<String>,
    /// Whether the mount is read-only.
    pub read_only: Option<bool>,
    /// Consistency requirement.
    pub consistency: Option<String>,
}

/// The host-level configuration of a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerHostConfig {
    /// CPU shares (relative weight).
    pub cpu_shares: Option<i64>,
    /// Memory limit in bytes.
    pub memory: Option<i64>,
    /// Parent cgroup.
    pub cgroup_parent: Option<String>,
    /// Block IO weight.
    pub blkio_weight: Option<i64>,
    /// CPU CFS period.
    pub cpu_period: Option<i64>,
    /// CPU CFS quota.
    pub cpu_quota: Option<i64>,
    /// CPU real-time period.
    pub cpu_realtime_period: Option<i64>,
    /// CPU real-time runtime.
    pub cpu_realtime_runtime: Option<i64>,
    /// Allowed CPUs.
    pub cpuset_cpus: Option<String>,
    /// Allowed memory nodes.
    pub cpuset_mems: Option<String>,
    /// Mapped devices.
    pub devices: Option<Vec<ContainerDevice>>,
    /// Device cgroup rules.
    pub device_cgroup_rules: Option<Vec<String>>,
    /// Kernel memory limit.
    pub kernel_memory: Option<i64>,
    /// Kernel TCP memory limit.
    #[serde(rename = "KernelMemoryTCP")]
    pub kernel_memory_tcp: Option<i64>,
    /// Soft memory limit.
    pub memory_reservation: Option<i64>,
    /// Memory+swap limit.
    pub memory_swap: Option<i64>,
    /// Swappiness tuning.
    pub memory_swappiness: Option<i64>,
    /// CPU quota in units of 1e-9 CPUs.
    pub nano_cpus: Option<i64>,
    /// Whether the OOM killer is disabled.
    pub oom_kill_disable: Option<bool>,
    /// Whether an init process is injected.
    pub init: Option<bool>,
    /// Pids limit.
    pub pids_limit: Option<i64>,
    /// Ulimits.
    pub ulimits: Option<Vec<ContainerUlimit>>,
    /// Bind specifications.
    pub binds: Option<Vec<String>>,
    /// Container id file.
    #[serde(rename = "ContainerIDFile")]
    pub container_id_file: Option<String>,
    /// Logging configuration.
    pub log_config: Option<ContainerLogConfig>,
    /// Network mode.
    pub network_mode: Option<String>,
    /// Published ports.
    pub port_bindings: Option<BTreeMap<String, Option<Vec<PortBinding>>>>,
    /// Restart policy.
    pub restart_policy: Option<ContainerRestartPolicy>,
    /// Whether the container self-removes on exit.
    pub auto_remove: Option<bool>,
    /// Volume driver.
    pub volume_driver: Option<String>,
    /// Containers to inherit volumes from.
    pub volumes_from: Option<Vec<String>>,
    /// Mounts.
    pub mounts: Option<Vec<ContainerMount>>,
    /// Added capabilities.
    pub cap_add: Option<Vec<String>>,
    /// Dropped capabilities.
    pub cap_drop: Option<Vec<String>>,
    /// DNS servers.
    pub dns: Option<Vec<String>>,
    /// DNS options.
    pub dns_options: Option<Vec<String>>,
    /// DNS search domains.
    pub dns_search: Option<Vec<String>>,
    /// Extra `/etc/hosts` entries.
    pub extra_hosts: Option<Vec<String>>,
    /// Additional groups.
    pub group_add: Option<Vec<String>>,
    /// IPC mode.
    pub ipc_mode: Option<String>,
    /// Cgroup to use.
    pub cgroup: Option<String>,
    /// Linked containers.
    pub links: Option<Vec<String>>,
    /// OOM score adjustment.
    pub oom_score_adj: Option<i64>,
    /// PID namespace mode.
    pub pid_mode: Option<String>,
    /// Whether the container is privileged.
    pub privileged: Option<bool>,
    /// Whether all exposed ports are published.
    pub publish_all_ports: Option<bool>,
    /// Whether the root filesystem is read-only.
    pub readonly_rootfs: Option<bool>,
    /// Security options.
    pub security_opt: Option<Vec<String>>,
    /// Storage driver options.
    pub storage_opt: Option<serde_json::Value>,
    /// Tmpfs mounts.
    pub tmpfs: Option<BTreeMap<String, String>>,
    /// UTS namespace mode.
    #[serde(rename = "UTSMode")]
    pub uts_mode: Option<String>,
    /// User namespace mode.
    pub userns_mode: Option<String>,
    /// Size of `/dev/shm` in bytes.
    pub shm_size: Option<i64>,
    /// Sysctls.
    pub sysctls: Option<BTreeMap<String, serde_json::Value>>,
    /// Runtime name.
    pub runtime: Option<String>,
    /// Isolation technology.
    pub isolation: Option<String>,
    /// Masked paths.
    pub masked_paths: Option<Vec<String>>,
    /// Read-only paths.
    pub readonly_paths: Option<Vec<String>>,
}

/// Health-check configuration baked into a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerHealthCheck {
    /// Probe command.
    pub test: Option<Vec<String>>,
    /// Interval between probes (ns).
    pub interval: Option<i64>,
    /// Probe timeout (ns).
    pub timeout: Option<i64>,
    /// Retries before unhealthy.
    pub retries: Option<i64>,
    /// Grace period (ns).
    pub start_period: Option<i64>,
}

/// The image-level configuration of a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfig {
    /// Hostname.
    pub hostname: Option<String>,
    /// NIS domain name.
    pub domainname: Option<String>,
    /// User the process runs as.
    pub user: Option<String>,
    /// Whether stdin is attached.
    pub attach_stdin: Option<bool>,
    /// Whether stdout is attached.
    pub attach_stdout: Option<bool>,
    /// Whether stderr is attached.
    pub attach_stderr: Option<bool>,
    /// Exposed ports.
    pub exposed_ports: Option<serde_json::Value>,
    /// Whether a TTY is allocated.
    pub tty: Option<bool>,
    /// Whether stdin stays open.
    pub open_stdin: Option<bool>,
    /// Whether stdin closes after the first attach.
    pub stdin_once: Option<bool>,
    /// Environment entries (`KEY=value`).
    pub env: Option<Vec<String>>,
    /// Default command.
    pub cmd: Option<Vec<String>>,
    /// Health-check configuration.
    pub healthcheck: Option<ContainerHealthCheck>,
    /// Whether the args are already shell-escaped.
    pub args_escaped: Option<bool>,
    /// Image reference.
    pub image: Option<String>,
    /// Declared volumes.
    pub volumes: Option<serde_json::Value>,
    /// Working directory.
    pub working_dir: Option<String>,
    /// Entrypoint.
    pub entrypoint: Option<Vec<String>>,
    /// Whether networking is disabled.
    pub network_disabled: Option<bool>,
    /// MAC address.
    pub mac_address: Option<String>,
    /// ONBUILD triggers.
    pub on_build: Option<Vec<String>>,
    /// Labels.
    pub labels: Option<BTreeMap<String, String>>,
    /// Stop signal.
    pub stop_signal: Option<String>,
    /// Stop timeout (seconds).
    pub stop_timeout: Option<i64>,
    /// Shell for shell-form commands.
    pub shell: Option<Vec<String>>,
}

/// A mount as reported in the top-level `Mounts` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Mount {
    /// `"bind"`, `"volume"` or `"tmpfs"`.
    pub r#type: Option<String>,
    /// Volume name, for volume mounts.
    pub name: Option<String>,
    /// Source path or volume.
    pub source: Option<String>,
    /// Target inside the container.
    pub destination: Option<String>,
    /// Volume driver.
    pub driver: Option<String>,
    /// Mount mode string.
    pub mode: Option<String>,
    /// Whether the mount is writable.
    #[serde(rename = "RW")]
    pub rw: Option<bool>,
    /// Mount propagation.
    pub propagation: Option<String>,
}

/// Per-network endpoint settings of a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointSettings {
    /// Links into this network.
    pub links: Option<Vec<String>>,
    /// Aliases on this network.
    pub aliases: Option<Vec<String>>,
    /// Network id.
    #[serde(rename = "NetworkID")]
    pub network_id: Option<String>,
    /// Endpoint id.
    #[serde(rename = "EndpointID")]
    pub endpoint_id: Option<String>,
    /// Gateway address.
    pub gateway: Option<String>,
    /// IPv4 address.
    #[serde(rename = "IPAddress")]
    pub ip_address: Option<String>,
    /// IPv4 prefix length.
    #[serde(rename = "IPPrefixLen")]
    pub ip_prefix_len: Option<i64>,
    /// IPv6 gateway.
    #[serde(rename = "IPv6Gateway")]
    pub ipv6_gateway: Option<String>,
    /// Global IPv6 address.
    #[serde(rename = "GlobalIPv6Address")]
    pub global_ipv6_address: Option<String>,
    /// Global IPv6 prefix length.
    #[serde(rename = "GlobalIPv6PrefixLen")]
    pub global_ipv6_prefix_len: Option<i64>,
    /// MAC address on this network.
    pub mac_address: Option<String>,
    /// Driver options.
    pub driver_opts: Option<serde_json::Value>,
}

/// Network-level view of a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerNetworkSettings {
    /// Bridge name.
    pub bridge: Option<String>,
    /// Sandbox id.
    #[serde(rename = "SandboxID")]
    pub sandbox_id: Option<String>,
    /// Whether hairpin NAT is enabled.
    pub hairpin_mode: Option<bool>,
    /// Link-local IPv6 address.
    #[serde(rename = "LinkLocalIPv6Address")]
    pub link_local_ipv6_address: Option<String>,
    /// Link-local IPv6 prefix length.
    #[serde(rename = "LinkLocalIPv6PrefixLen")]
    pub link_local_ipv6_prefix_len: Option<i64>,
    /// Published ports.
    pub ports: Option<BTreeMap<String, Option<Vec<PortBinding>>>>,
    /// Sandbox key.
    pub sandbox_key: Option<String>,
    /// Endpoint id on the default network.
    #[serde(rename = "EndpointID")]
    pub endpoint_id: Option<String>,
    /// Default gateway.
    pub gateway: Option<String>,
    /// Global IPv6 address.
    #[serde(rename = "GlobalIPv6Address")]
    pub global_ipv6_address: Option<String>,
    /// Global IPv6 prefix length.
    #[serde(rename = "GlobalIPv6PrefixLen")]
    pub global_ipv6_prefix_len: Option<i64>,
    /// IPv4 address on the default network.
    #[serde(rename = "IPAddress")]
    pub ip_address: Option<String>,
    /// IPv4 prefix length.
    #[serde(rename = "IPPrefixLen")]
    pub ip_prefix_len: Option<i64>,
    /// IPv6 gateway.
    #[serde(rename = "IPv6Gateway")]
    pub ipv6_gateway: Option<String>,
    /// MAC address.
    pub mac_address: Option<String>,
    /// Per-network endpoint settings.
    pub networks: Option<BTreeMap<String, EndpointSettings>>,
}

/// Storage driver data of a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerGraphDriver {
    /// Driver name.
    pub name: Option<String>,
    /// Driver-specific data.
    pub data: Option<serde_json::Value>,
}

/// The full container inspect payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInspect {
    /// Canonical container id.
    pub id: Option<String>,
    /// Creation timestamp.
    pub created: Option<DateTime<Utc>>,
    /// Path of the main process.
    pub path: Option<String>,
    /// Arguments of the main process.
    pub args: Option<Vec<String>>,
    /// Run state.
    pub state: Option<ContainerState>,
    /// Image id.
    pub image: Option<String>,
    /// Pod the container belongs to (podman).
    pub pod: Option<String>,
    /// Path to `resolv.conf`.
    pub resolv_conf_path: Option<String>,
    /// Path to the hostname file.
    pub hostname_path: Option<String>,
    /// Path to the hosts file.
    pub hosts_path: Option<String>,
    /// Path to the log file.
    pub log_path: Option<String>,
    /// Swarm node data, when relevant.
    pub node: Option<serde_json::Value>,
    /// Name, with the engine's leading slash.
    pub name: Option<String>,
    /// Restart count.
    pub restart_count: Option<i64>,
    /// Storage driver name.
    pub driver: Option<String>,
    /// Platform.
    pub platform: Option<String>,
    /// SELinux mount label.
    pub mount_label: Option<String>,
    /// SELinux process label.
    pub process_label: Option<String>,
    /// AppArmor profile.
    pub app_armor_profile: Option<String>,
    /// Exec session ids.
    #[serde(rename = "ExecIDs")]
    pub exec_ids: Option<Vec<String>>,
    /// Host configuration.
    pub host_config: Option<ContainerHostConfig>,
    /// Storage driver data.
    pub graph_driver: Option<ContainerGraphDriver>,
    /// Bytes written by the container.
    pub size_rw: Option<i64>,
    /// Total root filesystem size.
    pub size_root_fs: Option<i64>,
    /// Mounts.
    pub mounts: Option<Vec<Mount>>,
    /// Image-level configuration.
    pub config: Option<ContainerConfig>,
    /// Network settings.
    pub network_settings: Option<ContainerNetworkSettings>,
    /// Namespace (podman).
    pub namespace: Option<String>,
    /// Whether this is a pod infra container (podman).
    pub is_infra: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_single;

    const SAMPLE: &str = r#"[{
        "Id": "9f2ff923b1a0",
        "Created": "2023-03-01T12:30:00.000000000Z",
        "Path": "sleep",
        "Args": ["infinity"],
        "State": {
            "Status": "running",
            "Running": true,
            "Paused": false,
            "OOMKilled": false,
            "Pid": 4242,
            "ExitCode": 0,
            "StartedAt": "2023-03-01T12:30:01.000000000Z"
        },
        "Image": "sha256:deadbeef",
        "Name": "/busy_shannon",
        "RestartCount": 0,
        "Driver": "overlay2",
        "HostConfig": {
            "AutoRemove": true,
            "NetworkMode": "bridge",
            "PortBindings": {"80/tcp": [{"HostIp": "0.0.0.0", "HostPort": "8080"}]},
            "UTSMode": "",
            "ContainerIDFile": ""
        },
        "Mounts": [
            {"Type": "volume", "Name": "data", "Destination": "/data", "RW": true}
        ],
        "Config": {
            "Hostname": "9f2ff923b1a0",
            "Env": ["PATH=/usr/bin"],
            "Cmd": ["sleep", "infinity"],
            "Image": "busybox:1",
            "Labels": {"dodo": "dada"}
        },
        "NetworkSettings": {
            "SandboxID": "abc",
            "IPAddress": "172.17.0.2",
            "IPPrefixLen": 16,
            "Networks": {
                "bridge": {"NetworkID": "netid", "EndpointID": "epid", "IPAddress": "172.17.0.2"}
            }
        }
    }]"#;

    #[test]
    fn parses_a_realistic_payload() {
        let c: ContainerInspect = parse_single(SAMPLE).unwrap();
        assert_eq!(c.id.as_deref(), Some("9f2ff923b1a0"));
        let state = c.state.unwrap();
        assert_eq!(state.running, Some(true));
        assert_eq!(state.oom_killed, Some(false));
        let host = c.host_config.unwrap();
        assert_eq!(host.auto_remove, Some(true));
        let bindings = host.port_bindings.unwrap();
        let binding = bindings["80/tcp"].as_ref().unwrap();
        assert_eq!(binding[0].host_port.as_deref(), Some("8080"));
    }

    #[test]
    fn acronym_wire_names_round_trip() {
        let c: ContainerInspect = parse_single(SAMPLE).unwrap();
        let net = c.network_settings.unwrap();
        assert_eq!(net.sandbox_id.as_deref(), Some("abc"));
        assert_eq!(net.ip_address.as_deref(), Some("172.17.0.2"));
        assert_eq!(net.ip_prefix_len, Some(16));
        let bridge = &net.networks.unwrap()["bridge"];
        assert_eq!(bridge.network_id.as_deref(), Some("netid"));
        assert_eq!(bridge.endpoint_id.as_deref(), Some("epid"));
    }

    #[test]
    fn mounts_keep_rw_flag() {
        let c: ContainerInspect = parse_single(SAMPLE).unwrap();
        let mounts = c.mounts.unwrap();
        assert_eq!(mounts[0].rw, Some(true));
        assert_eq!(mounts[0].name.as_deref(), Some("data"));
    }

    #[test]
    fn absent_fields_parse_to_none() {
        let c: ContainerInspect = parse_single(r#"[{"Id": "x"}]"#).unwrap();
        assert!(c.state.is_none());
        assert!(c.host_config.is_none());
        assert!(c.exec_ids.is_none());
    }
}
