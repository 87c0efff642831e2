// SPDX-License-Identifier: MIT OR Apache-2.0
//! Swarm node inspect payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Monotonic object version of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeVersion {
    /// Raft index.
    pub index: Option<i64>,
}

/// Declarative specification of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeSpec {
    /// Node name.
    pub name: Option<String>,
    /// Labels.
    pub labels: Option<BTreeMap<String, String>>,
    /// `"worker"` or `"manager"`.
    pub role: Option<String>,
    /// `"active"`, `"pause"` or `"drain"`.
    pub availability: Option<String>,
}

/// Platform of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodePlatform {
    /// CPU architecture.
    pub architecture: Option<String>,
    /// Operating system.
    #[serde(rename = "OS")]
    pub os: Option<String>,
}

/// Resources a node offers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeResource {
    /// CPU capacity in units of 1e-9 CPUs.
    #[serde(rename = "NanoCPUs")]
    pub nano_cpus: Option<i64>,
    /// Memory in bytes.
    pub memory_bytes: Option<i64>,
    /// Generic resources.
    pub generic_resources: Option<Vec<serde_json::Value>>,
}

/// A plugin available on a node's engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeEnginePlugin {
    /// Plugin type.
    pub r#type: Option<String>,
    /// Plugin name.
    pub name: Option<String>,
}

/// Engine description of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeEngine {
    /// Engine version.
    pub engine_version: Option<String>,
    /// Engine labels.
    pub labels: Option<BTreeMap<String, String>>,
    /// Installed plugins.
    pub plugins: Option<Vec<NodeEnginePlugin>>,
}

/// TLS material of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeTlsInfo {
    /// Trust root certificate.
    pub trust_root: Option<String>,
    /// Issuer subject.
    pub cert_issuer_subject: Option<String>,
    /// Issuer public key.
    pub cert_issuer_public_key: Option<String>,
}

/// Static description of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeDescription {
    /// Hostname.
    pub hostname: Option<String>,
    /// Platform.
    pub platform: Option<NodePlatform>,
    /// Resources.
    pub resources: Option<NodeResource>,
    /// Engine description.
    pub engine: Option<NodeEngine>,
    /// TLS material.
    #[serde(rename = "TLSInfo")]
    pub tls_info: Option<NodeTlsInfo>,
}

/// Live status of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeStatus {
    /// `"ready"`, `"down"`, …
    pub state: Option<String>,
    /// Status message.
    pub message: Option<String>,
    /// Node address.
    pub addr: Option<String>,
}

/// Manager-specific status of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeManagerStatus {
    /// Whether this node is the raft leader.
    pub leader: Option<bool>,
    /// Manager reachability.
    pub reachability: Option<String>,
    /// Manager address.
    pub addr: Option<String>,
}

/// The full node inspect payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeInspect {
    /// Canonical node id.
    #[serde(rename = "ID")]
    pub id: Option<String>,
    /// Object version.
    pub version: Option<NodeVersion>,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
    /// Specification.
    pub spec: Option<NodeSpec>,
    /// Static description.
    pub description: Option<NodeDescription>,
    /// Live status.
    pub status: Option<NodeStatus>,
    /// Manager status, for managers.
    pub manager_status: Option<NodeManagerStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_single;

    #[test]
    fn parses_role_and_manager_status() {
        let node: NodeInspect = parse_single(
            r#"[{
                "ID": "node-abc",
                "Spec": {"Role": "manager", "Availability": "active"},
                "Description": {
                    "Hostname": "worker-1",
                    "Platform": {"Architecture": "x86_64", "OS": "linux"}
                },
                "Status": {"State": "ready", "Addr": "10.0.0.5"},
                "ManagerStatus": {"Leader": true, "Reachability": "reachable"}
            }]"#,
        )
        .unwrap();
        assert_eq!(node.id.as_deref(), Some("node-abc"));
        assert_eq!(node.spec.unwrap().role.as_deref(), Some("manager"));
        let description = node.description.unwrap();
        assert_eq!(description.hostname.as_deref(), Some("worker-1"));
        assert_eq!(description.platform.unwrap().os.as_deref(), Some("linux"));
        assert_eq!(node.manager_status.unwrap().leader, Some(true));
    }
}
