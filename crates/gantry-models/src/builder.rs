// SPDX-License-Identifier: MIT OR Apache-2.0
//! Buildx builder output parsing. `buildx inspect` is a key-colon-value
//! text block, not JSON; `buildx ls` is a table.

use serde::{Deserialize, Serialize};

/// One node of a builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderNode {
    /// Node name.
    pub name: String,
    /// Node status (`"running"`, `"inactive"`, …).
    pub status: String,
    /// Platforms the node can build for.
    pub platforms: Vec<String>,
}

/// Parsed `buildx inspect` output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderInspect {
    /// Builder name (the canonical id).
    pub name: String,
    /// Builder driver (`"docker"`, `"docker-container"`, `"kubernetes"`).
    pub driver: String,
    /// The builder's nodes.
    pub nodes: Vec<BuilderNode>,
}

impl BuilderInspect {
    /// Parse the textual inspect block.
    ///
    /// The first `Name:`/`Driver:` lines before the `Nodes:` separator
    /// describe the builder; inside `Nodes:`, each `Name:` starts a new
    /// node record and `Platforms:` closes it.
    pub fn parse(text: &str) -> Self {
        let mut result = BuilderInspect::default();
        let mut nodes_reached = false;
        let mut node = BuilderNode::default();

        for raw_line in text.trim().lines() {
            let line = raw_line.trim();
            if line.starts_with("Nodes:") {
                nodes_reached = true;
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if !nodes_reached {
                match key {
                    "Name" => result.name = value.to_string(),
                    "Driver" => result.driver = value.to_string(),
                    _ => {}
                }
            } else {
                match key {
                    "Name" => node.name = value.to_string(),
                    "Status" => node.status = value.to_string(),
                    "Platforms" => {
                        if !value.is_empty() {
                            node.platforms =
                                value.split(", ").map(str::to_string).collect();
                        }
                        result.nodes.push(std::mem::take(&mut node));
                    }
                    _ => {}
                }
            }
        }
        result
    }

    /// The first node's status, when any node exists.
    pub fn status(&self) -> Option<&str> {
        self.nodes.first().map(|n| n.status.as_str())
    }

    /// The first node's platforms.
    pub fn platforms(&self) -> &[String] {
        self.nodes.first().map(|n| n.platforms.as_slice()).unwrap_or(&[])
    }
}

/// Extract builder names from `buildx ls` output.
///
/// The first line is a header; node lines are indented; the current
/// builder carries a `*` suffix which is stripped.
pub fn parse_builder_ls_names(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(1)
        .filter(|line| !line.starts_with(' ') && !line.trim().is_empty())
        .filter_map(|line| line.split_whitespace().next())
        .map(|name| name.strip_suffix('*').unwrap_or(name).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSPECT_BLOCK: &str = "Name:   blissful_swartz\nDriver: docker-container\n\nNodes:\nName:      blissful_swartz0\nEndpoint:  unix:///var/run/docker.sock\nStatus:    running\nPlatforms: linux/amd64, linux/arm64\n";

    #[test]
    fn parses_name_driver_and_nodes() {
        let builder = BuilderInspect::parse(INSPECT_BLOCK);
        assert_eq!(builder.name, "blissful_swartz");
        assert_eq!(builder.driver, "docker-container");
        assert_eq!(builder.nodes.len(), 1);
        let node = &builder.nodes[0];
        assert_eq!(node.name, "blissful_swartz0");
        assert_eq!(node.status, "running");
        assert_eq!(node.platforms, ["linux/amd64", "linux/arm64"]);
    }

    #[test]
    fn convenience_accessors_use_the_first_node() {
        let builder = BuilderInspect::parse(INSPECT_BLOCK);
        assert_eq!(builder.status(), Some("running"));
        assert_eq!(builder.platforms(), ["linux/amd64", "linux/arm64"]);
    }

    #[test]
    fn multiple_nodes_are_collected() {
        let text = "Name: b\nDriver: kubernetes\n\nNodes:\nName: n0\nStatus: running\nPlatforms: linux/amd64\nName: n1\nStatus: inactive\nPlatforms: linux/arm64\n";
        let builder = BuilderInspect::parse(text);
        assert_eq!(builder.nodes.len(), 2);
        assert_eq!(builder.nodes[1].name, "n1");
        assert_eq!(builder.nodes[1].status, "inactive");
    }

    #[test]
    fn empty_platforms_leaves_node_open() {
        // A node without a Platforms: line never closes, mirroring the
        // block structure the engine prints.
        let text = "Name: b\nDriver: docker\n\nNodes:\nName: n0\nStatus: running\n";
        let builder = BuilderInspect::parse(text);
        assert!(builder.nodes.is_empty());
    }

    #[test]
    fn ls_names_skip_header_and_node_lines() {
        let output = "NAME/NODE       DRIVER/ENDPOINT  STATUS   PLATFORMS\n\
                      default *       docker\n  \
                      default default  running  linux/amd64\n\
                      mybuilder       docker-container\n  \
                      mybuilder0      unix:///var/run/docker.sock inactive\n";
        assert_eq!(parse_builder_ls_names(output), ["default", "mybuilder"]);
    }

    #[test]
    fn ls_strips_star_without_whitespace() {
        let output = "NAME/NODE DRIVER\nmybuilder* docker\n";
        assert_eq!(parse_builder_ls_names(output), ["mybuilder"]);
    }
}
