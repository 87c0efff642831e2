// SPDX-License-Identifier: MIT OR Apache-2.0
//! Plugin inspect payload.

use serde::{Deserialize, Serialize};

/// The plugin inspect payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PluginInspect {
    /// Canonical plugin id.
    pub id: Option<String>,
    /// Plugin name.
    pub name: Option<String>,
    /// Whether the plugin is enabled.
    pub enabled: Option<bool>,
    /// Plugin reference.
    pub plugin_reference: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_single;

    #[test]
    fn parses_id_and_enabled() {
        let plugin: PluginInspect = parse_single(
            r#"[{"Id": "plg1", "Name": "vieux/sshfs:latest", "Enabled": true}]"#,
        )
        .unwrap();
        assert_eq!(plugin.id.as_deref(), Some("plg1"));
        assert_eq!(plugin.enabled, Some(true));
    }
}
