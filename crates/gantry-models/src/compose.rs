// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compose project configuration (`compose config --format json`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Deploy-time configuration of a service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDeployConfig {
    /// Labels.
    pub labels: Option<BTreeMap<String, String>>,
    /// Resource constraints.
    pub resources: Option<serde_json::Value>,
    /// Placement constraints.
    pub placement: Option<serde_json::Value>,
    /// Replica count.
    pub replicas: Option<i64>,
}

/// A `depends_on` condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyCondition {
    /// `"service_started"`, `"service_healthy"` or `"service_completed_successfully"`.
    pub condition: Option<String>,
}

/// One service of a compose project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeConfigService {
    /// Deploy configuration.
    pub deploy: Option<ServiceDeployConfig>,
    /// Build configuration.
    pub build: Option<serde_json::Value>,
    /// Added capabilities.
    pub cap_add: Option<Vec<String>>,
    /// Dropped capabilities.
    pub cap_drop: Option<Vec<String>>,
    /// Parent cgroup.
    pub cgroup_parent: Option<String>,
    /// Command override.
    pub command: Option<Vec<String>>,
    /// Configs granted to the service.
    pub configs: Option<serde_json::Value>,
    /// Explicit container name.
    pub container_name: Option<String>,
    /// Service dependencies.
    pub depends_on: Option<BTreeMap<String, DependencyCondition>>,
    /// Device cgroup rules.
    pub device_cgroup_rules: Option<Vec<String>>,
    /// Devices.
    pub devices: Option<serde_json::Value>,
    /// Environment variables.
    pub environment: Option<BTreeMap<String, Option<String>>>,
    /// Entrypoint override.
    pub entrypoint: Option<Vec<String>>,
    /// Image reference.
    pub image: Option<String>,
    /// Published ports.
    pub ports: Option<serde_json::Value>,
    /// Volumes.
    pub volumes: Option<serde_json::Value>,
}

/// One network of a compose project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeConfigNetwork {
    /// Network driver.
    pub driver: Option<String>,
    /// Network name.
    pub name: Option<String>,
    /// Whether the network pre-exists.
    pub external: Option<bool>,
    /// Driver options.
    pub driver_opts: Option<BTreeMap<String, serde_json::Value>>,
    /// Whether containers can attach manually.
    pub attachable: Option<bool>,
    /// Whether IPv6 is enabled.
    pub enable_ipv6: Option<bool>,
    /// IPAM configuration.
    pub ipam: Option<serde_json::Value>,
    /// Whether the network is internal.
    pub internal: Option<bool>,
    /// Labels.
    pub labels: Option<BTreeMap<String, String>>,
}

/// One volume of a compose project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeConfigVolume {
    /// Volume driver.
    pub driver: Option<String>,
    /// Driver options.
    pub driver_opts: Option<BTreeMap<String, serde_json::Value>>,
    /// Whether the volume pre-exists.
    pub external: Option<bool>,
    /// Labels.
    pub labels: Option<BTreeMap<String, String>>,
    /// Volume name.
    pub name: Option<String>,
}

/// The resolved configuration of a compose project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeConfig {
    /// Project name.
    pub name: Option<String>,
    /// Services by name.
    pub services: Option<BTreeMap<String, ComposeConfigService>>,
    /// Networks by name.
    pub networks: Option<BTreeMap<String, ComposeConfigNetwork>>,
    /// Volumes by name.
    pub volumes: Option<BTreeMap<String, ComposeConfigVolume>>,
    /// Configs by name.
    pub configs: Option<serde_json::Value>,
    /// Secrets by name.
    pub secrets: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_object;

    #[test]
    fn parses_services_and_networks() {
        let config: ComposeConfig = parse_object(
            r#"{
                "name": "demo",
                "services": {
                    "web": {
                        "image": "nginx:latest",
                        "command": ["nginx", "-g", "daemon off;"],
                        "depends_on": {"db": {"condition": "service_started"}},
                        "environment": {"DEBUG": "1", "EMPTY": null}
                    },
                    "db": {"image": "postgres:15"}
                },
                "networks": {
                    "default": {"name": "demo_default", "driver": "bridge"}
                }
            }"#,
        )
        .unwrap();
        let services = config.services.unwrap();
        assert_eq!(services["web"].image.as_deref(), Some("nginx:latest"));
        assert_eq!(
            services["web"].depends_on.as_ref().unwrap()["db"]
                .condition
                .as_deref(),
            Some("service_started")
        );
        assert_eq!(services["web"].environment.as_ref().unwrap()["EMPTY"], None);
        let networks = config.networks.unwrap();
        assert_eq!(networks["default"].driver.as_deref(), Some("bridge"));
    }
}
