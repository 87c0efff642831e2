// SPDX-License-Identifier: MIT OR Apache-2.0
//! Network inspect payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// IP address management configuration of a network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkIpam {
    /// IPAM driver.
    pub driver: Option<String>,
    /// Subnet/gateway entries.
    pub config: Option<Vec<BTreeMap<String, serde_json::Value>>>,
    /// Driver options.
    pub options: Option<BTreeMap<String, serde_json::Value>>,
}

/// A container attached to a network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkContainer {
    /// Container name.
    pub name: Option<String>,
    /// Endpoint id.
    #[serde(rename = "EndpointID")]
    pub endpoint_id: Option<String>,
    /// MAC address.
    pub mac_address: Option<String>,
    /// IPv4 address with prefix.
    #[serde(rename = "IPv4Address")]
    pub ipv4_address: Option<String>,
    /// IPv6 address with prefix.
    #[serde(rename = "IPv6Address")]
    pub ipv6_address: Option<String>,
}

/// The full network inspect payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkInspect {
    /// Network name.
    pub name: Option<String>,
    /// Canonical network id.
    pub id: Option<String>,
    /// Creation timestamp.
    pub created: Option<DateTime<Utc>>,
    /// `"local"`, `"swarm"` or `"global"`.
    pub scope: Option<String>,
    /// Network driver.
    pub driver: Option<String>,
    /// Whether IPv6 is enabled.
    #[serde(rename = "EnableIPv6")]
    pub enable_ipv6: Option<bool>,
    /// IPAM configuration.
    #[serde(rename = "IPAM")]
    pub ipam: Option<NetworkIpam>,
    /// Whether the network is internal.
    pub internal: Option<bool>,
    /// Whether containers can attach manually.
    pub attachable: Option<bool>,
    /// Whether this is the swarm ingress network.
    pub ingress: Option<bool>,
    /// Attached containers by id.
    pub containers: Option<BTreeMap<String, NetworkContainer>>,
    /// Driver options.
    pub options: Option<BTreeMap<String, serde_json::Value>>,
    /// Labels.
    pub labels: Option<BTreeMap<String, String>>,
    /// Source of a config-only network.
    pub config_from: Option<serde_json::Value>,
    /// Whether this network is config-only.
    pub config_only: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_single;

    #[test]
    fn parses_ipam_and_containers() {
        let network: NetworkInspect = parse_single(
            r#"[{
                "Name": "bridge",
                "Id": "abcdef",
                "Scope": "local",
                "Driver": "bridge",
                "EnableIPv6": false,
                "IPAM": {"Driver": "default", "Config": [{"Subnet": "172.17.0.0/16"}]},
                "Containers": {
                    "c1": {"Name": "web", "EndpointID": "ep1", "IPv4Address": "172.17.0.2/16"}
                }
            }]"#,
        )
        .unwrap();
        assert_eq!(network.id.as_deref(), Some("abcdef"));
        assert_eq!(network.enable_ipv6, Some(false));
        assert_eq!(network.ipam.unwrap().driver.as_deref(), Some("default"));
        let containers = network.containers.unwrap();
        assert_eq!(containers["c1"].ipv4_address.as_deref(), Some("172.17.0.2/16"));
    }
}
