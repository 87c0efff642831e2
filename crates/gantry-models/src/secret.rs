// SPDX-License-Identifier: MIT OR Apache-2.0
//! Swarm secret inspect payload. The payload never includes the secret
//! value itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declarative specification of a secret.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecretSpec {
    /// Secret name.
    pub name: Option<String>,
    /// Labels.
    pub labels: Option<BTreeMap<String, serde_json::Value>>,
}

/// The full secret inspect payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecretInspect {
    /// Canonical secret id.
    #[serde(rename = "ID")]
    pub id: Option<String>,
    /// Object version.
    pub version: Option<serde_json::Value>,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
    /// Specification.
    pub spec: Option<SecretSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_single;

    #[test]
    fn parses_without_exposing_data() {
        let secret: SecretInspect = parse_single(
            r#"[{"ID": "sec1", "Spec": {"Name": "db-password", "Labels": {}}}]"#,
        )
        .unwrap();
        assert_eq!(secret.id.as_deref(), Some("sec1"));
        assert_eq!(secret.spec.unwrap().name.as_deref(), Some("db-password"));
    }
}
