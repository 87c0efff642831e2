// SPDX-License-Identifier: MIT OR Apache-2.0
//! Swarm config inspect payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Templating driver of a config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigSpecDriver {
    /// Driver name.
    pub name: Option<String>,
    /// Driver options.
    pub options: Option<BTreeMap<String, serde_json::Value>>,
}

/// Declarative specification of a config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigSpec {
    /// Config name.
    pub name: Option<String>,
    /// Labels.
    pub labels: Option<BTreeMap<String, String>>,
    /// Base64-encoded payload.
    pub data: Option<String>,
    /// Templating driver.
    pub templating: Option<ConfigSpecDriver>,
}

/// The full config inspect payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigInspect {
    /// Canonical config id.
    #[serde(rename = "ID")]
    pub id: Option<String>,
    /// Object version.
    pub version: Option<serde_json::Value>,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
    /// Specification.
    pub spec: Option<ConfigSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_single;

    #[test]
    fn parses_spec_data() {
        let config: ConfigInspect = parse_single(
            r#"[{
                "ID": "cfg1",
                "CreatedAt": "2023-06-06T06:06:06Z",
                "Spec": {"Name": "app-config", "Data": "aGVsbG8=", "Labels": {}}
            }]"#,
        )
        .unwrap();
        assert_eq!(config.id.as_deref(), Some("cfg1"));
        let spec = config.spec.unwrap();
        assert_eq!(spec.name.as_deref(), Some("app-config"));
        assert_eq!(spec.data.as_deref(), Some("aGVsbG8="));
    }
}
