// SPDX-License-Identifier: MIT OR Apache-2.0
//! CLI context inspect payload.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One endpoint of a context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContextEndpoint {
    /// Daemon address.
    pub host: Option<String>,
    /// Whether TLS verification is skipped.
    #[serde(rename = "SkipTLSVerify")]
    pub skip_tls_verify: Option<bool>,
}

/// On-disk storage of a context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContextStorage {
    /// Metadata directory.
    pub metadata_path: Option<String>,
    /// TLS material directory.
    #[serde(rename = "TLSPath")]
    pub tls_path: Option<String>,
}

/// The full context inspect payload. Contexts are identified by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContextInspect {
    /// Context name (the canonical id).
    pub name: Option<String>,
    /// Free-form metadata.
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
    /// Endpoints by kind (`"docker"`, `"kubernetes"`).
    pub endpoints: Option<BTreeMap<String, ContextEndpoint>>,
    /// TLS material per endpoint.
    #[serde(rename = "TLSMaterial")]
    pub tls_material: Option<BTreeMap<String, serde_json::Value>>,
    /// Storage paths.
    pub storage: Option<ContextStorage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_single;

    #[test]
    fn parses_endpoints() {
        let context: ContextInspect = parse_single(
            r#"[{
                "Name": "remote",
                "Metadata": {"Description": "my remote"},
                "Endpoints": {
                    "docker": {"Host": "ssh://user@host", "SkipTLSVerify": false}
                },
                "TLSMaterial": {},
                "Storage": {"MetadataPath": "/meta", "TLSPath": "/tls"}
            }]"#,
        )
        .unwrap();
        assert_eq!(context.name.as_deref(), Some("remote"));
        let endpoints = context.endpoints.unwrap();
        assert_eq!(endpoints["docker"].host.as_deref(), Some("ssh://user@host"));
        assert_eq!(context.storage.unwrap().tls_path.as_deref(), Some("/tls"));
    }
}
