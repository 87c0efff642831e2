// SPDX-License-Identifier: MIT OR Apache-2.0
//! Swarm node operations and the [`Node`] handle.

use crate::entity::json_entity;
use crate::task::Task;
use crate::{engine_command, run_command, to_string_vec};
use gantry_config::ClientConfig;
use gantry_error::Result;
use gantry_models::{NodeDescription, NodeInspect, NodeSpec, NodeStatus};

json_entity! {
    /// A handle to one swarm node, identified by its immutable id.
    Node {
        payload: NodeInspect,
        id_field: id,
        inspect: ["node", "inspect"],
    }
}

impl Node {
    /// The node specification (role, availability, labels).
    pub async fn spec(&self) -> Result<NodeSpec> {
        Ok(self.inspect_result().await?.spec.unwrap_or_default())
    }

    /// The static node description.
    pub async fn description(&self) -> Result<NodeDescription> {
        Ok(self.inspect_result().await?.description.unwrap_or_default())
    }

    /// The live node status.
    pub async fn status(&self) -> Result<NodeStatus> {
        Ok(self.inspect_result().await?.status.unwrap_or_default())
    }

    fn cli(&self) -> NodeCli {
        NodeCli::new(self.client_config().clone())
    }

    /// Update this node.
    pub async fn update(&self, opts: NodeUpdateOpts) -> Result<()> {
        let result = self.cli().update(self.id(), opts).await;
        self.invalidate().await;
        result
    }

    /// The tasks running on this node.
    pub async fn ps(&self) -> Result<Vec<Task>> {
        self.cli().ps(Some(vec![self.id().to_string()])).await
    }
}

/// Options for `node update`.
#[derive(Debug, Clone, Default)]
pub struct NodeUpdateOpts {
    /// Availability (`"active"`, `"pause"`, `"drain"`).
    pub availability: Option<String>,
    /// Labels to add, in order.
    pub labels_add: Vec<(String, String)>,
    /// Label keys to remove.
    pub rm_labels: Vec<String>,
    /// Role (`"worker"` or `"manager"`).
    pub role: Option<String>,
}

/// Swarm node operations (`node …`).
#[derive(Debug, Clone)]
pub struct NodeCli {
    config: ClientConfig,
}

impl NodeCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Demote one or more manager nodes. An empty selection is a no-op.
    pub async fn demote<I, S>(&self, nodes: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let nodes = to_string_vec(nodes);
        if nodes.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["node", "demote"]).await?;
        cmd.extend(nodes);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Promote one or more worker nodes. An empty selection is a no-op.
    pub async fn promote<I, S>(&self, nodes: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let nodes = to_string_vec(nodes);
        if nodes.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["node", "promote"]).await?;
        cmd.extend(nodes);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Resolve an id or hostname into a [`Node`] handle.
    pub async fn inspect(&self, node: &str) -> Result<Node> {
        Node::from_reference(self.config.clone(), node).await
    }

    /// List the nodes of the swarm as trusted handles.
    pub async fn list(&self) -> Result<Vec<Node>> {
        let cmd = engine_command(&self.config, &["node", "list", "--quiet"]).await?;
        let output = run_command(&self.config, cmd).await?;
        Ok(output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|id| Node::from_trusted_id(self.config.clone(), id))
            .collect())
    }

    /// The tasks running on the given nodes. `None` means the current
    /// node; an empty list returns an empty list without asking the
    /// engine.
    pub async fn ps(&self, nodes: Option<Vec<String>>) -> Result<Vec<Task>> {
        let positional = match nodes {
            Some(nodes) if nodes.is_empty() => return Ok(Vec::new()),
            Some(nodes) => nodes,
            None => Vec::new(),
        };
        let mut cmd = engine_command(&self.config, &["node", "ps", "--quiet", "--no-trunc"]).await?;
        cmd.extend(positional);
        let output = run_command(&self.config, cmd).await?;
        Ok(output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|id| Task::from_trusted_id(self.config.clone(), id))
            .collect())
    }

    /// Remove one or more nodes. An empty selection is a no-op.
    pub async fn remove<I, S>(&self, nodes: I, force: bool) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let nodes = to_string_vec(nodes);
        if nodes.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["node", "remove"]).await?;
        cmd.add_flag("--force", force);
        cmd.extend(nodes);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Update one node.
    pub async fn update(&self, node: &str, opts: NodeUpdateOpts) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["node", "update"]).await?;
        cmd.add_simple_arg("--availability", opts.availability.as_deref());
        cmd.add_args_mapping("--label-add", opts.labels_add.iter().map(|(k, v)| (k, v)));
        cmd.add_args_iterable("--label-rm", &opts.rm_labels);
        cmd.add_simple_arg("--role", opts.role.as_deref());
        cmd.append(node);
        run_command(&self.config, cmd).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_config::ClientOpts;
    use std::path::PathBuf;

    #[tokio::test]
    async fn ps_of_an_empty_node_list_is_a_noop() {
        let cli = NodeCli::new(ClientConfig::new(ClientOpts {
            binary_path: Some(PathBuf::from("/definitely/not/docker")),
            ..ClientOpts::default()
        }));
        assert!(cli.ps(Some(Vec::new())).await.unwrap().is_empty());
    }
}
