// SPDX-License-Identifier: MIT OR Apache-2.0
//! Volume inspect payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The full volume inspect payload. Volumes are identified by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeInspect {
    /// Volume name (the canonical id).
    pub name: Option<String>,
    /// Volume driver.
    pub driver: Option<String>,
    /// Host path where the volume data lives.
    pub mountpoint: Option<String>,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    /// Driver-dependent status.
    pub status: Option<BTreeMap<String, serde_json::Value>>,
    /// Labels.
    pub labels: Option<BTreeMap<String, String>>,
    /// `"local"` or `"global"`.
    pub scope: Option<String>,
    /// Driver options.
    pub options: Option<BTreeMap<String, String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_single;

    #[test]
    fn parses_labels_and_mountpoint() {
        let volume: VolumeInspect = parse_single(
            r#"[{
                "CreatedAt": "2023-04-01T08:00:00Z",
                "Driver": "local",
                "Labels": {"dodo": "dada"},
                "Mountpoint": "/var/lib/docker/volumes/vol1/_data",
                "Name": "vol1",
                "Options": null,
                "Scope": "local"
            }]"#,
        )
        .unwrap();
        assert_eq!(volume.name.as_deref(), Some("vol1"));
        assert_eq!(volume.labels.unwrap()["dodo"], "dada");
        assert!(volume.options.is_none());
    }
}
