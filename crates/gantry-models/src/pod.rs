// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pod inspect payload (podman). Podman has emitted both `Created` and
//! `CreatedAt` over time; aliases absorb the drift.

use crate::container::PortBinding;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Infra-container configuration of a pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PodInfraConfig {
    /// Published ports.
    pub port_bindings: Option<BTreeMap<String, Option<Vec<PortBinding>>>>,
    /// Whether the pod shares the host network.
    pub host_network: Option<bool>,
    /// Static IPv4 address.
    #[serde(rename = "StaticIP")]
    pub static_ip: Option<String>,
    /// Static MAC address.
    #[serde(rename = "StaticMAC")]
    pub static_mac: Option<String>,
    /// Whether `resolv.conf` management is disabled.
    pub no_manage_resolv_conf: Option<bool>,
    /// DNS servers.
    #[serde(rename = "DNSServer")]
    pub dns_server: Option<Vec<String>>,
    /// DNS search domains.
    #[serde(rename = "DNSSearch")]
    pub dns_search: Option<Vec<String>>,
    /// DNS options.
    #[serde(rename = "DNSOption")]
    pub dns_option: Option<Vec<String>>,
    /// Whether hosts-file management is disabled.
    pub no_manage_hosts: Option<bool>,
    /// Extra hosts entries.
    pub host_add: Option<Vec<String>>,
    /// Networks the pod joins.
    pub networks: Option<Vec<String>>,
    /// Network options.
    pub network_options: Option<serde_json::Value>,
    /// PID namespace.
    #[serde(rename = "PidNS")]
    pub pid_ns: Option<String>,
    /// User namespace.
    #[serde(rename = "UserNS")]
    pub userns: Option<String>,
    /// UTS namespace.
    #[serde(rename = "UtsNS")]
    pub uts_ns: Option<String>,
}

/// A container inside a pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PodContainer {
    /// Container id.
    pub id: Option<String>,
    /// Container name.
    pub name: Option<String>,
    /// Container state.
    pub state: Option<String>,
}

/// The full pod inspect payload. Unlike the docker inspect family, podman
/// returns a bare object for a single pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PodInspect {
    /// Canonical pod id.
    pub id: Option<String>,
    /// Pod name.
    pub name: Option<String>,
    /// Creation timestamp.
    #[serde(alias = "CreatedAt")]
    pub created: Option<DateTime<Utc>>,
    /// Command the pod was created with.
    pub create_command: Option<Vec<String>>,
    /// Exit policy.
    pub exit_policy: Option<String>,
    /// Pod state (`"Created"`, `"Running"`, `"Exited"`, …).
    pub state: Option<String>,
    /// Hostname.
    pub hostname: Option<String>,
    /// Labels.
    pub labels: Option<BTreeMap<String, String>>,
    /// Whether a cgroup is created for the pod.
    pub create_cgroup: Option<bool>,
    /// Parent cgroup.
    pub cgroup_parent: Option<String>,
    /// Cgroup path.
    pub cgroup_path: Option<String>,
    /// Whether an infra container is created.
    pub create_infra: Option<bool>,
    /// Infra container id.
    #[serde(rename = "InfraContainerID")]
    pub infra_container_id: Option<String>,
    /// Infra configuration.
    pub infra_config: Option<PodInfraConfig>,
    /// Namespaces shared across the pod.
    pub shared_namespaces: Option<Vec<String>>,
    /// Number of containers, infra included.
    pub num_containers: Option<i64>,
    /// The pod's containers.
    pub containers: Option<Vec<PodContainer>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_object;

    #[test]
    fn parses_a_bare_object() {
        let pod: PodInspect = parse_object(
            r#"{
                "Id": "pod123",
                "Name": "mypod",
                "Created": "2023-08-08T08:00:00Z",
                "State": "Running",
                "CreateInfra": true,
                "InfraContainerID": "infra1",
                "SharedNamespaces": ["net", "uts"],
                "NumContainers": 2,
                "Containers": [
                    {"Id": "infra1", "Name": "mypod-infra", "State": "running"},
                    {"Id": "c1", "Name": "app", "State": "running"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(pod.id.as_deref(), Some("pod123"));
        assert_eq!(pod.state.as_deref(), Some("Running"));
        assert_eq!(pod.num_containers, Some(2));
        assert_eq!(pod.containers.unwrap().len(), 2);
    }

    #[test]
    fn created_at_alias_is_accepted() {
        let pod: PodInspect =
            parse_object(r#"{"Id": "p", "CreatedAt": "2023-08-08T08:00:00Z"}"#).unwrap();
        assert!(pod.created.is_some());
    }
}
