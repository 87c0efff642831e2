// SPDX-License-Identifier: MIT OR Apache-2.0
//! Image inspect payload.

use crate::container::ContainerConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Storage driver data of an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageGraphDriver {
    /// Driver name.
    pub name: Option<String>,
    /// Driver-specific data.
    pub data: Option<serde_json::Value>,
}

/// Layer composition of an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageRootFs {
    /// Filesystem type.
    pub r#type: Option<String>,
    /// Layer digests.
    pub layers: Option<Vec<String>>,
    /// Base layer, on Windows.
    pub base_layer: Option<String>,
}

/// The full image inspect payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageInspect {
    /// Canonical image id (content digest).
    pub id: Option<String>,
    /// Repository tags.
    pub repo_tags: Option<Vec<String>>,
    /// Repository digests.
    pub repo_digests: Option<Vec<String>>,
    /// Parent image id.
    pub parent: Option<String>,
    /// Free-form comment.
    pub comment: Option<String>,
    /// Build timestamp.
    pub created: Option<DateTime<Utc>>,
    /// Container the image was committed from.
    pub container: Option<String>,
    /// Config of that container.
    pub container_config: Option<ContainerConfig>,
    /// Engine version that built the image.
    pub docker_version: Option<String>,
    /// Author.
    pub author: Option<String>,
    /// Image configuration.
    pub config: Option<ContainerConfig>,
    /// CPU architecture.
    pub architecture: Option<String>,
    /// Operating system.
    pub os: Option<String>,
    /// OS version, on Windows.
    pub os_version: Option<String>,
    /// Architecture variant.
    pub variant: Option<String>,
    /// Size in bytes.
    pub size: Option<i64>,
    /// Size including shared layers.
    pub virtual_size: Option<i64>,
    /// Storage driver data.
    pub graph_driver: Option<ImageGraphDriver>,
    /// Layer composition.
    #[serde(rename = "RootFS")]
    pub root_fs: Option<ImageRootFs>,
    /// Engine metadata.
    pub metadata: Option<BTreeMap<String, String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_single;

    #[test]
    fn parses_tags_and_rootfs() {
        let image: ImageInspect = parse_single(
            r#"[{
                "Id": "sha256:abc",
                "RepoTags": ["busybox:1", "busybox:latest"],
                "Created": "2023-01-15T10:00:00Z",
                "Architecture": "amd64",
                "Os": "linux",
                "Size": 1234567,
                "RootFS": {"Type": "layers", "Layers": ["sha256:l1", "sha256:l2"]}
            }]"#,
        )
        .unwrap();
        assert_eq!(image.id.as_deref(), Some("sha256:abc"));
        assert_eq!(
            image.repo_tags.as_deref(),
            Some(&["busybox:1".to_string(), "busybox:latest".to_string()][..])
        );
        assert_eq!(image.root_fs.unwrap().layers.unwrap().len(), 2);
    }

    #[test]
    fn empty_object_is_fine() {
        let image: ImageInspect = parse_single("[{}]").unwrap();
        assert!(image.id.is_none());
        assert!(image.repo_tags.is_none());
    }
}
