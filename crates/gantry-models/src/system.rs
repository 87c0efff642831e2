// SPDX-License-Identifier: MIT OR Apache-2.0
//! System-level payloads: `system info`, `system df`, `system events`.

use crate::bytesize::parse_byte_size;
use chrono::{DateTime, Utc};
use gantry_error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// system info
// ---------------------------------------------------------------------------

/// Daemon plugin inventory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Plugins {
    /// Volume plugins.
    pub volume: Option<Vec<String>>,
    /// Network plugins.
    pub network: Option<Vec<String>>,
    /// Authorization plugins.
    pub authorization: Option<serde_json::Value>,
    /// Log plugins.
    pub log: Option<Vec<String>>,
}

/// A registered runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Runtime {
    /// Binary path.
    pub path: Option<String>,
    /// Extra arguments.
    pub runtime_args: Option<Vec<String>>,
}

/// A component commit id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Commit {
    /// Actual commit.
    #[serde(rename = "ID")]
    pub id: Option<String>,
    /// Expected commit.
    pub expected: Option<String>,
}

/// Swarm cluster description, from the manager's perspective.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterInfo {
    /// Cluster id.
    #[serde(rename = "ID")]
    pub id: Option<String>,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
    /// Cluster spec.
    pub spec: Option<serde_json::Value>,
    /// Whether a root CA rotation is in progress.
    pub root_rotation_in_progress: Option<bool>,
    /// Data-path port.
    pub data_path_port: Option<i64>,
    /// Default address pools.
    pub default_addr_pool: Option<Vec<String>>,
    /// Subnet size of the pools.
    pub subnet_size: Option<i64>,
}

/// Swarm membership info of this daemon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SwarmInfo {
    /// This node's id.
    #[serde(rename = "NodeID")]
    pub node_id: Option<String>,
    /// This node's address.
    pub node_addr: Option<String>,
    /// `"active"`, `"inactive"`, `"pending"`, …
    pub local_node_state: Option<String>,
    /// Whether this node can be controlled.
    pub control_available: Option<bool>,
    /// Error state.
    pub error: Option<String>,
    /// Known managers.
    pub remote_managers: Option<Vec<serde_json::Value>>,
    /// Number of nodes.
    pub nodes: Option<i64>,
    /// Number of managers.
    pub managers: Option<i64>,
    /// Cluster description.
    pub cluster: Option<ClusterInfo>,
}

/// A CLI plugin, as reported by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientPlugin {
    /// Schema version.
    pub schema_version: Option<String>,
    /// Vendor.
    pub vendor: Option<String>,
    /// Version.
    pub version: Option<String>,
    /// Short description.
    pub short_description: Option<String>,
    /// Name.
    pub name: Option<String>,
    /// Binary path.
    pub path: Option<String>,
    /// Shadowed binaries.
    pub shadowed_paths: Option<Vec<String>>,
}

/// Client-side info block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientInfo {
    /// Whether the client is in debug mode.
    pub debug: Option<bool>,
    /// Installed CLI plugins.
    pub plugins: Option<Vec<ClientPlugin>>,
    /// Client warnings.
    pub warnings: Option<Vec<String>>,
}

/// The `system info` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SystemInfo {
    /// Daemon id.
    #[serde(rename = "ID")]
    pub id: Option<String>,
    /// Total containers.
    pub containers: Option<i64>,
    /// Running containers.
    pub containers_running: Option<i64>,
    /// Paused containers.
    pub containers_paused: Option<i64>,
    /// Stopped containers.
    pub containers_stopped: Option<i64>,
    /// Number of images.
    pub images: Option<i64>,
    /// Storage driver.
    pub driver: Option<String>,
    /// Storage driver status lines.
    pub driver_status: Option<Vec<Vec<String>>>,
    /// Docker root directory.
    pub docker_root_dir: Option<String>,
    /// Plugin inventory.
    pub plugins: Option<Plugins>,
    /// Whether memory limits are supported.
    pub memory_limit: Option<bool>,
    /// Whether swap limits are supported.
    pub swap_limit: Option<bool>,
    /// Whether kernel memory limits are supported.
    pub kernel_memory: Option<bool>,
    /// Whether CFS period tuning is supported.
    pub cpu_cfs_period: Option<bool>,
    /// Whether CFS quota tuning is supported.
    pub cpu_cfs_quota: Option<bool>,
    /// Whether CPU shares are supported.
    #[serde(rename = "CPUShares")]
    pub cpu_shares: Option<bool>,
    /// Whether cpusets are supported.
    #[serde(rename = "CPUSet")]
    pub cpu_set: Option<bool>,
    /// Whether pids limits are supported.
    pub pids_limit: Option<bool>,
    /// Whether the OOM killer can be disabled.
    pub oom_kill_disable: Option<bool>,
    /// Whether IPv4 forwarding is on.
    #[serde(rename = "IPv4Forwarding")]
    pub ipv4_forwarding: Option<bool>,
    /// Whether bridge-nf iptables is on.
    pub bridge_nf_iptables: Option<bool>,
    /// Whether bridge-nf ip6tables is on.
    #[serde(rename = "BridgeNfIp6tables")]
    pub bridge_nf_ip6tables: Option<bool>,
    /// Whether the daemon is in debug mode.
    pub debug: Option<bool>,
    /// Open file descriptors.
    #[serde(rename = "NFd")]
    pub n_fd: Option<i64>,
    /// Goroutine count.
    pub n_goroutines: Option<i64>,
    /// Daemon system time.
    pub system_time: Option<String>,
    /// Logging driver.
    pub logging_driver: Option<String>,
    /// Cgroup driver.
    pub cgroup_driver: Option<String>,
    /// Event listener count.
    pub n_events_listener: Option<i64>,
    /// Kernel version.
    pub kernel_version: Option<String>,
    /// Host operating system.
    pub operating_system: Option<String>,
    /// `"linux"` or `"windows"`.
    #[serde(rename = "OSType")]
    pub os_type: Option<String>,
    /// CPU architecture.
    pub architecture: Option<String>,
    /// Number of CPUs.
    #[serde(rename = "NCPU")]
    pub n_cpu: Option<i64>,
    /// Total memory in bytes.
    pub mem_total: Option<i64>,
    /// Default registry.
    pub index_server_address: Option<String>,
    /// Registry configuration.
    pub registry_config: Option<serde_json::Value>,
    /// Generic resources.
    pub generic_resources: Option<Vec<serde_json::Value>>,
    /// HTTP proxy.
    pub http_proxy: Option<String>,
    /// HTTPS proxy.
    pub https_proxy: Option<String>,
    /// Proxy exceptions.
    pub no_proxy: Option<String>,
    /// Host name.
    pub name: Option<String>,
    /// Daemon labels.
    pub labels: Option<Vec<String>>,
    /// Whether experimental features are on.
    pub experimental_build: Option<bool>,
    /// Daemon version.
    pub server_version: Option<String>,
    /// Registered runtimes.
    pub runtimes: Option<BTreeMap<String, Runtime>>,
    /// Default runtime name.
    pub default_runtime: Option<String>,
    /// Swarm membership.
    pub swarm: Option<SwarmInfo>,
    /// Whether live restore is enabled.
    pub live_restore_enabled: Option<bool>,
    /// Default isolation technology.
    pub isolation: Option<String>,
    /// Init binary name.
    pub init_binary: Option<String>,
    /// containerd commit.
    pub containerd_commit: Option<Commit>,
    /// runc commit.
    pub runc_commit: Option<Commit>,
    /// init commit.
    pub init_commit: Option<Commit>,
    /// Security options.
    pub security_options: Option<Vec<String>>,
    /// Product license.
    pub product_license: Option<String>,
    /// Daemon warnings.
    pub warnings: Option<Vec<String>>,
    /// Client info block.
    pub client_info: Option<ClientInfo>,
}

// ---------------------------------------------------------------------------
// system df
// ---------------------------------------------------------------------------

/// One category line of `system df`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskFreeSummary {
    /// Number of items in active use.
    pub active: u64,
    /// Reclaimable bytes.
    pub reclaimable: u64,
    /// Reclaimable share, percent. 100 when the engine prints no percent.
    pub reclaimable_percent: f64,
    /// Total bytes.
    pub size: u64,
    /// Total items.
    pub total_count: u64,
}

/// The four categorical summaries of `system df`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskFreeResult {
    /// Image storage.
    pub images: DiskFreeSummary,
    /// Container storage.
    pub containers: DiskFreeSummary,
    /// Local volumes.
    pub volumes: DiskFreeSummary,
    /// Build cache.
    pub build_cache: DiskFreeSummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawDfLine {
    r#type: String,
    active: String,
    reclaimable: String,
    size: String,
    total_count: String,
}

impl DiskFreeResult {
    /// Parse the one-JSON-object-per-line output of
    /// `system df --format '{{json .}}'`.
    pub fn parse(cli_stdout: &str) -> Result<Self> {
        let mut by_type: BTreeMap<String, DiskFreeSummary> = BTreeMap::new();
        for line in cli_stdout.lines().filter(|l| !l.trim().is_empty()) {
            let raw: RawDfLine = serde_json::from_str(line)
                .map_err(|e| Error::parse_failure(format!("bad df line: {e}"), line))?;
            by_type.insert(raw.r#type.clone(), parse_summary(&raw, line)?);
        }
        let mut take = |key: &str| {
            by_type.remove(key).ok_or_else(|| {
                Error::parse_failure(format!("df output is missing the {key:?} category"), cli_stdout)
            })
        };
        Ok(Self {
            images: take("Images")?,
            containers: take("Containers")?,
            volumes: take("Local Volumes")?,
            build_cache: take("Build Cache")?,
        })
    }
}

fn parse_summary(raw: &RawDfLine, line: &str) -> Result<DiskFreeSummary> {
    // "1.304GB (90%)" or just "1.304GB".
    let mut parts = raw.reclaimable.splitn(2, ' ');
    let reclaimable_size = parts.next().unwrap_or("0B");
    let reclaimable_percent = match parts.next() {
        Some(percent) => percent
            .trim_start_matches('(')
            .trim_end_matches(')')
            .trim_end_matches('%')
            .parse::<f64>()
            .map_err(|_| Error::parse_failure("bad reclaimable percent", line))?,
        None => 100.0,
    };
    Ok(DiskFreeSummary {
        active: parse_count(&raw.active, line)?,
        reclaimable: parse_byte_size(reclaimable_size)?,
        reclaimable_percent,
        size: parse_byte_size(&raw.size)?,
        total_count: parse_count(&raw.total_count, line)?,
    })
}

fn parse_count(text: &str, line: &str) -> Result<u64> {
    text.trim()
        .parse()
        .map_err(|_| Error::parse_failure(format!("bad count {text:?}"), line))
}

// ---------------------------------------------------------------------------
// system events
// ---------------------------------------------------------------------------

/// The object an event happened to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineEventActor {
    /// Object id.
    #[serde(rename = "ID")]
    pub id: Option<String>,
    /// Object attributes (name, image, labels, …).
    #[serde(rename = "Attributes")]
    pub attributes: Option<BTreeMap<String, serde_json::Value>>,
}

/// One engine event, as emitted by `system events --format '{{json .}}'`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    /// Object type (`"container"`, `"image"`, `"network"`, …).
    #[serde(rename = "Type")]
    pub r#type: Option<String>,
    /// What happened (`"create"`, `"start"`, `"die"`, …).
    #[serde(rename = "Action")]
    pub action: Option<String>,
    /// The object involved.
    #[serde(rename = "Actor")]
    pub actor: Option<EngineEventActor>,
    /// Event scope (`"local"` or `"swarm"`).
    #[serde(rename = "scope")]
    pub scope: Option<String>,
    /// Event time, seconds since the epoch.
    #[serde(rename = "time")]
    pub time: Option<i64>,
    /// Event time in nanoseconds.
    #[serde(rename = "timeNano")]
    pub time_nano: Option<i64>,
}

impl EngineEvent {
    /// Parse one `{{json .}}` line.
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line)
            .map_err(|e| Error::parse_failure(format!("bad event line: {e}"), line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_info_parses_acronym_fields() {
        let info: SystemInfo = serde_json::from_str(
            r#"{
                "ID": "ABCD:EFGH",
                "Containers": 4,
                "ContainersRunning": 2,
                "Images": 40,
                "NCPU": 16,
                "MemTotal": 67108864,
                "OSType": "linux",
                "IPv4Forwarding": true,
                "CPUShares": true,
                "NFd": 33,
                "ServerVersion": "24.0.2",
                "Swarm": {"NodeID": "n1", "LocalNodeState": "active"}
            }"#,
        )
        .unwrap();
        assert_eq!(info.n_cpu, Some(16));
        assert_eq!(info.os_type.as_deref(), Some("linux"));
        assert_eq!(info.ipv4_forwarding, Some(true));
        assert_eq!(info.swarm.unwrap().node_id.as_deref(), Some("n1"));
    }

    const DF_OUTPUT: &str = concat!(
        r#"{"Active":"2","Reclaimable":"1.304GB (90%)","Size":"1.446GB","TotalCount":"5","Type":"Images"}"#,
        "\n",
        r#"{"Active":"1","Reclaimable":"0B","Size":"12.3MB","TotalCount":"1","Type":"Containers"}"#,
        "\n",
        r#"{"Active":"0","Reclaimable":"256MB (100%)","Size":"256MB","TotalCount":"3","Type":"Local Volumes"}"#,
        "\n",
        r#"{"Active":"0","Reclaimable":"0B","Size":"0B","TotalCount":"0","Type":"Build Cache"}"#,
    );

    #[test]
    fn disk_free_parses_all_categories() {
        let df = DiskFreeResult::parse(DF_OUTPUT).unwrap();
        assert_eq!(df.images.total_count, 5);
        assert_eq!(df.images.reclaimable, 1_304_000_000);
        assert_eq!(df.images.reclaimable_percent, 90.0);
        assert_eq!(df.containers.size, 12_300_000);
        assert_eq!(df.volumes.reclaimable_percent, 100.0);
        assert_eq!(df.build_cache.total_count, 0);
    }

    #[test]
    fn disk_free_assumes_100_percent_without_parens() {
        let df = DiskFreeResult::parse(DF_OUTPUT).unwrap();
        // The Containers line has no percent suffix.
        assert_eq!(df.containers.reclaimable_percent, 100.0);
    }

    #[test]
    fn disk_free_missing_category_is_an_error() {
        let partial =
            r#"{"Active":"2","Reclaimable":"0B","Size":"0B","TotalCount":"5","Type":"Images"}"#;
        assert!(DiskFreeResult::parse(partial).is_err());
    }

    #[test]
    fn event_line_parses() {
        let event = EngineEvent::parse(
            r#"{"Type":"container","Action":"start","Actor":{"ID":"abc","Attributes":{"image":"busybox:1","name":"dodo"}},"scope":"local","time":1680000000,"timeNano":1680000000000000000}"#,
        )
        .unwrap();
        assert_eq!(event.r#type.as_deref(), Some("container"));
        assert_eq!(event.action.as_deref(), Some("start"));
        assert_eq!(event.actor.unwrap().id.as_deref(), Some("abc"));
        assert_eq!(event.time, Some(1_680_000_000));
    }
}
