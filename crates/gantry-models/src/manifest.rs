// SPDX-License-Identifier: MIT OR Apache-2.0
//! Manifest list inspect payload. The engine's `manifest inspect` output
//! does not carry the list's own name, so callers inject the reference
//! after parsing.

use serde::{Deserialize, Serialize};

/// Platform a manifest targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestPlatform {
    /// CPU architecture.
    pub architecture: Option<String>,
    /// Operating system.
    pub os: Option<String>,
    /// Architecture variant.
    pub variant: Option<String>,
}

/// One image variant inside a manifest list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageVariantManifest {
    /// Media type of the variant.
    pub media_type: Option<String>,
    /// Size in bytes.
    pub size: Option<i64>,
    /// Content digest.
    pub digest: Option<String>,
    /// Target platform.
    pub platform: Option<ManifestPlatform>,
}

/// The full manifest list inspect payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestListInspect {
    /// The reference this payload was fetched for; injected by the caller.
    #[serde(default)]
    pub name: Option<String>,
    /// Manifest schema version.
    pub schema_version: Option<i64>,
    /// Media type of the list.
    pub media_type: Option<String>,
    /// The variants.
    pub manifests: Option<Vec<ImageVariantManifest>>,
}

/// The config descriptor of a registry manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestConfig {
    /// Media type of the config blob.
    pub media_type: Option<String>,
    /// Content digest.
    pub digest: Option<String>,
    /// Size in bytes.
    pub size: Option<i64>,
}

/// One layer descriptor of a registry manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestLayer {
    /// Media type of the layer blob.
    pub media_type: Option<String>,
    /// Content digest.
    pub digest: Option<String>,
    /// Size in bytes.
    pub size: Option<i64>,
}

/// A manifest as stored in a registry, fetched without pulling the image
/// (`buildx imagetools inspect --raw`).
///
/// For a single-platform image the payload carries `config` and `layers`;
/// for a multi-arch index it carries `manifests` instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryManifest {
    /// Media type of the manifest itself.
    pub media_type: Option<String>,
    /// Manifest schema version.
    pub schema_version: Option<i64>,
    /// Layer descriptors, for a single image.
    pub layers: Option<Vec<ManifestLayer>>,
    /// Variant descriptors, for a manifest list.
    pub manifests: Option<Vec<ImageVariantManifest>>,
    /// Config descriptor, for a single image.
    pub config: Option<ManifestConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_object;

    #[test]
    fn registry_manifest_parses_a_single_image_shape() {
        let manifest: RegistryManifest = parse_object(
            r#"{
                "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
                "schemaVersion": 2,
                "config": {
                    "mediaType": "application/vnd.docker.container.image.v1+json",
                    "digest": "sha256:cfg",
                    "size": 5864
                },
                "layers": [
                    {
                        "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
                        "digest": "sha256:l1",
                        "size": 22496034
                    },
                    {
                        "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
                        "digest": "sha256:l2",
                        "size": 185
                    }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(manifest.schema_version, Some(2));
        assert!(manifest
            .config
            .as_ref()
            .unwrap()
            .media_type
            .as_deref()
            .unwrap()
            .starts_with("application/"));
        assert_eq!(manifest.layers.unwrap().len(), 2);
        assert!(manifest.manifests.is_none());
    }

    #[test]
    fn registry_manifest_parses_a_multiarch_index_shape() {
        let manifest: RegistryManifest = parse_object(
            r#"{
                "mediaType": "application/vnd.docker.distribution.manifest.list.v2+json",
                "schemaVersion": 2,
                "manifests": [
                    {
                        "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
                        "size": 1367,
                        "digest": "sha256:amd",
                        "platform": {"architecture": "amd64", "os": "linux"}
                    }
                ]
            }"#,
        )
        .unwrap();
        assert!(manifest.config.is_none());
        assert!(manifest.layers.is_none());
        let variants = manifest.manifests.unwrap();
        assert_eq!(variants[0].digest.as_deref(), Some("sha256:amd"));
    }

    #[test]
    fn parses_variants() {
        let mut list: ManifestListInspect = parse_object(
            r#"{
                "schemaVersion": 2,
                "mediaType": "application/vnd.docker.distribution.manifest.list.v2+json",
                "manifests": [
                    {
                        "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
                        "size": 528,
                        "digest": "sha256:aaa",
                        "platform": {"architecture": "amd64", "os": "linux"}
                    },
                    {
                        "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
                        "size": 528,
                        "digest": "sha256:bbb",
                        "platform": {"architecture": "arm64", "os": "linux", "variant": "v8"}
                    }
                ]
            }"#,
        )
        .unwrap();
        list.name = Some("myorg/app:latest".to_string());
        assert_eq!(list.schema_version, Some(2));
        let manifests = list.manifests.unwrap();
        assert_eq!(manifests.len(), 2);
        assert_eq!(
            manifests[1].platform.as_ref().unwrap().variant.as_deref(),
            Some("v8")
        );
    }
}
