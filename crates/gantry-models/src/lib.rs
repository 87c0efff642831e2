// SPDX-License-Identifier: MIT OR Apache-2.0
//! gantry-models
//!
//! Typed records for every payload the engine CLI hands back, plus the
//! textual parsers for the outputs that are not JSON. All records are
//! tolerant: every field is optional, unknown fields are ignored, and
//! engine acronym wire names are mapped explicitly.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod bytesize;
mod compose;
mod config;
mod container;
mod context;
mod image;
mod manifest;
mod network;
mod node;
mod plugin;
mod pod;
mod secret;
mod service;
mod stats;
mod system;
mod task;
mod volume;

pub use builder::{BuilderInspect, BuilderNode, parse_builder_ls_names};
pub use bytesize::parse_byte_size;
pub use compose::{
    ComposeConfig, ComposeConfigNetwork, ComposeConfigService, ComposeConfigVolume,
    DependencyCondition, ServiceDeployConfig,
};
pub use config::{ConfigInspect, ConfigSpec, ConfigSpecDriver};
pub use container::{
    ContainerConfig, ContainerDevice, ContainerGraphDriver, ContainerHealth,
    ContainerHealthCheck, ContainerHealthcheckResult, ContainerHostConfig, ContainerInspect,
    ContainerLogConfig, ContainerMount, ContainerNetworkSettings, ContainerRestartPolicy,
    ContainerState, ContainerUlimit, EndpointSettings, Mount, PortBinding,
};
pub use context::{ContextEndpoint, ContextInspect, ContextStorage};
pub use image::{ImageGraphDriver, ImageInspect, ImageRootFs};
pub use manifest::{
    ImageVariantManifest, ManifestConfig, ManifestLayer, ManifestListInspect, ManifestPlatform,
    RegistryManifest,
};
pub use network::{NetworkContainer, NetworkInspect, NetworkIpam};
pub use node::{
    NodeDescription, NodeEngine, NodeEnginePlugin, NodeInspect, NodeManagerStatus, NodePlatform,
    NodeResource, NodeSpec, NodeStatus, NodeTlsInfo, NodeVersion,
};
pub use plugin::PluginInspect;
pub use pod::{PodContainer, PodInfraConfig, PodInspect};
pub use secret::{SecretInspect, SecretSpec};
pub use service::{
    EndpointPortConfig, ServiceChangeConfig, ServiceContainerSpec, ServiceEndpoint,
    ServiceEndpointSpec, ServiceInspect, ServiceQuotas, ServiceResources, ServiceSpec,
    ServiceTaskTemplate, ServiceUpdateStatus, ServiceVersion, VirtualIp,
};
pub use stats::ContainerStats;
pub use system::{
    ClientInfo, ClientPlugin, ClusterInfo, Commit, DiskFreeResult, DiskFreeSummary, EngineEvent,
    EngineEventActor, Plugins, Runtime, SwarmInfo, SystemInfo,
};
pub use task::{
    TaskContainerStatus, TaskInspect, TaskPlacement, TaskResources, TaskSpec, TaskStatus,
    TaskVersion,
};
pub use volume::VolumeInspect;

use gantry_error::{Error, Result};
use serde::de::DeserializeOwned;

/// Parse a single-object inspect payload: the engine returns a JSON array,
/// the first element is taken.
pub fn parse_single<T: DeserializeOwned>(json_text: &str) -> Result<T> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json_text)
        .map_err(|e| Error::parse_failure(format!("invalid inspect array: {e}"), json_text))?;
    let first = values
        .into_iter()
        .next()
        .ok_or_else(|| Error::parse_failure("inspect returned an empty array", json_text))?;
    serde_json::from_value(first)
        .map_err(|e| Error::parse_failure(format!("invalid inspect payload: {e}"), json_text))
}

/// Parse a bulk inspect payload: the whole JSON array.
pub fn parse_bulk<T: DeserializeOwned>(json_text: &str) -> Result<Vec<T>> {
    serde_json::from_str(json_text)
        .map_err(|e| Error::parse_failure(format!("invalid inspect array: {e}"), json_text))
}

/// Parse a payload that is a bare JSON object rather than an array
/// (`manifest inspect`, podman `pod inspect`).
pub fn parse_object<T: DeserializeOwned>(json_text: &str) -> Result<T> {
    serde_json::from_str(json_text)
        .map_err(|e| Error::parse_failure(format!("invalid inspect payload: {e}"), json_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_takes_first_element() {
        let volume: VolumeInspect =
            parse_single(r#"[{"Name": "vol1"}, {"Name": "vol2"}]"#).unwrap();
        assert_eq!(volume.name.as_deref(), Some("vol1"));
    }

    #[test]
    fn parse_single_rejects_empty_array() {
        let result: Result<VolumeInspect> = parse_single("[]");
        assert!(result.is_err());
    }

    #[test]
    fn parse_bulk_keeps_order() {
        let volumes: Vec<VolumeInspect> =
            parse_bulk(r#"[{"Name": "a"}, {"Name": "b"}]"#).unwrap();
        let names: Vec<_> = volumes.iter().map(|v| v.name.as_deref()).collect();
        assert_eq!(names, [Some("a"), Some("b")]);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let volume: VolumeInspect =
            parse_single(r#"[{"Name": "v", "BrandNewEngineField": 42}]"#).unwrap();
        assert_eq!(volume.name.as_deref(), Some("v"));
    }
}
