// SPDX-License-Identifier: MIT OR Apache-2.0
//! Swarm service inspect payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Monotonic object version of a service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceVersion {
    /// Raft index.
    pub index: Option<i64>,
}

/// CPU/memory quotas of a service task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceResources {
    /// Limits.
    pub limits: Option<ServiceQuotas>,
    /// Reservations.
    pub reservations: Option<ServiceQuotas>,
}

/// One quota record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceQuotas {
    /// CPU quota in units of 1e-9 CPUs.
    #[serde(rename = "NanoCPUs")]
    pub nano_cpus: Option<i64>,
    /// Memory in bytes.
    pub memory_bytes: Option<i64>,
}

/// Container template of a service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceContainerSpec {
    /// Image reference.
    pub image: Option<String>,
    /// Labels.
    pub labels: Option<BTreeMap<String, String>>,
    /// Privilege configuration.
    pub privileges: Option<serde_json::Value>,
    /// Grace period before SIGKILL (ns).
    pub stop_grace_period: Option<i64>,
    /// Isolation technology.
    pub isolation: Option<String>,
    /// Environment entries.
    pub env: Option<Vec<String>>,
}

/// Task template of a service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceTaskTemplate {
    /// Container template.
    pub container_spec: Option<ServiceContainerSpec>,
    /// Resource quotas.
    pub resources: Option<ServiceResources>,
}

/// Update/rollback configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceChangeConfig {
    /// Tasks updated in parallel.
    pub parallelism: Option<i64>,
    /// What to do on failure.
    pub failure_action: Option<String>,
    /// Monitoring window (ns).
    pub monitor: Option<i64>,
    /// Tolerated failure ratio.
    pub max_failure_ratio: Option<f64>,
    /// Update order.
    pub order: Option<String>,
}

/// Declarative specification of a service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceSpec {
    /// Service name.
    pub name: Option<String>,
    /// Labels.
    pub labels: Option<BTreeMap<String, String>>,
    /// Replicated/global mode.
    pub mode: Option<BTreeMap<String, serde_json::Value>>,
    /// Update configuration.
    pub update_config: Option<ServiceChangeConfig>,
    /// Rollback configuration.
    pub rollback_config: Option<ServiceChangeConfig>,
    /// Task template.
    pub task_template: Option<ServiceTaskTemplate>,
}

/// One published port of a service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointPortConfig {
    /// Port name.
    pub name: Option<String>,
    /// `"tcp"`, `"udp"` or `"sctp"`.
    pub protocol: Option<String>,
    /// In-container port.
    pub target_port: Option<i64>,
    /// Published port.
    pub published_port: Option<i64>,
    /// `"ingress"` or `"host"`.
    pub publish_mode: Option<String>,
}

/// Published endpoint specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceEndpointSpec {
    /// Resolution mode.
    pub mode: Option<String>,
    /// Port configurations.
    pub ports: Option<Vec<EndpointPortConfig>>,
}

/// A virtual ip of a service on one network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VirtualIp {
    /// Network id.
    #[serde(rename = "NetworkID")]
    pub network_id: Option<String>,
    /// Address with prefix.
    pub addr: Option<String>,
}

/// Live endpoint state of a service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceEndpoint {
    /// Endpoint specification.
    pub spec: Option<ServiceEndpointSpec>,
    /// Published ports.
    pub ports: Option<Vec<EndpointPortConfig>>,
    /// Virtual ips.
    #[serde(rename = "VirtualIPs")]
    pub virtual_ips: Option<Vec<VirtualIp>>,
}

/// Progress of an ongoing service update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceUpdateStatus {
    /// Update state.
    pub state: Option<String>,
    /// Start timestamp (as reported).
    pub started_at: Option<String>,
    /// Completion timestamp (as reported).
    pub completed_at: Option<String>,
    /// Human-readable message.
    pub message: Option<String>,
}

/// The full service inspect payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceInspect {
    /// Canonical service id.
    #[serde(rename = "ID")]
    pub id: Option<String>,
    /// Object version.
    pub version: Option<ServiceVersion>,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
    /// Current specification.
    pub spec: Option<ServiceSpec>,
    /// Previous specification.
    pub previous_spec: Option<ServiceSpec>,
    /// Endpoint state.
    pub endpoint: Option<ServiceEndpoint>,
    /// Update progress.
    pub update_status: Option<ServiceUpdateStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_single;

    #[test]
    fn parses_id_spec_and_endpoint() {
        let service: ServiceInspect = parse_single(
            r#"[{
                "ID": "svc123",
                "Version": {"Index": 11},
                "CreatedAt": "2023-02-02T02:02:02Z",
                "Spec": {
                    "Name": "web",
                    "TaskTemplate": {"ContainerSpec": {"Image": "nginx:latest"}},
                    "Mode": {"Replicated": {"Replicas": 3}}
                },
                "Endpoint": {
                    "VirtualIPs": [{"NetworkID": "net1", "Addr": "10.0.0.3/24"}]
                }
            }]"#,
        )
        .unwrap();
        assert_eq!(service.id.as_deref(), Some("svc123"));
        assert_eq!(service.version.unwrap().index, Some(11));
        let spec = service.spec.unwrap();
        assert_eq!(spec.name.as_deref(), Some("web"));
        assert_eq!(
            spec.task_template.unwrap().container_spec.unwrap().image.as_deref(),
            Some("nginx:latest")
        );
        let vips = service.endpoint.unwrap().virtual_ips.unwrap();
        assert_eq!(vips[0].network_id.as_deref(), Some("net1"));
    }
}
