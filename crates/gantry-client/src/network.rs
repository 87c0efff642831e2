// SPDX-License-Identifier: MIT OR Apache-2.0
//! Network operations and the [`Network`] handle.

use crate::entity::{ScopedResource, json_entity};
use crate::{engine_command, run_command, to_string_vec};
use gantry_config::ClientConfig;
use gantry_error::Result;
use gantry_models::NetworkInspect;
use std::collections::BTreeMap;

json_entity! {
    /// A handle to one network, identified by its immutable id.
    Network {
        payload: NetworkInspect,
        id_field: id,
        inspect: ["network", "inspect"],
    }
}

impl Network {
    /// The network name.
    pub async fn name(&self) -> Result<Option<String>> {
        Ok(self.inspect_result().await?.name)
    }

    /// The network driver.
    pub async fn driver(&self) -> Result<Option<String>> {
        Ok(self.inspect_result().await?.driver)
    }

    /// Containers attached to this network, by id.
    pub async fn containers(
        &self,
    ) -> Result<BTreeMap<String, gantry_models::NetworkContainer>> {
        Ok(self.inspect_result().await?.containers.unwrap_or_default())
    }

    fn cli(&self) -> NetworkCli {
        NetworkCli::new(self.client_config().clone())
    }

    /// Remove this network.
    pub async fn remove(&self) -> Result<()> {
        self.cli().remove([self.id()]).await
    }
}

impl ScopedResource for Network {
    async fn teardown(&self) -> Result<()> {
        self.remove().await
    }
}

/// Options for `network create`.
#[derive(Debug, Clone, Default)]
pub struct NetworkCreateOpts {
    /// Whether containers can attach manually.
    pub attachable: bool,
    /// Network driver.
    pub driver: Option<String>,
    /// Gateway address.
    pub gateway: Option<String>,
    /// Subnet in CIDR form.
    pub subnet: Option<String>,
    /// Labels, in order.
    pub labels: Vec<(String, String)>,
    /// Driver options.
    pub options: Vec<String>,
}

/// Options for `network connect`.
#[derive(Debug, Clone, Default)]
pub struct NetworkConnectOpts {
    /// Alias for the container on the network.
    pub alias: Option<String>,
    /// Driver options.
    pub driver_options: Vec<String>,
    /// IPv4 address.
    pub ip: Option<String>,
    /// IPv6 address.
    pub ip6: Option<String>,
    /// Legacy links.
    pub links: Vec<String>,
}

// ---------------------------------------------------------------------------
// NetworkCli
// ---------------------------------------------------------------------------

/// Network operations (`network …`).
#[derive(Debug, Clone)]
pub struct NetworkCli {
    config: ClientConfig,
}

impl NetworkCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Create a network.
    pub async fn create(&self, name: &str, opts: NetworkCreateOpts) -> Result<Network> {
        let mut cmd = engine_command(&self.config, &["network", "create"]).await?;
        cmd.add_flag("--attachable", opts.attachable);
        cmd.add_simple_arg("--driver", opts.driver.as_deref());
        cmd.add_simple_arg("--gateway", opts.gateway.as_deref());
        cmd.add_simple_arg("--subnet", opts.subnet.as_deref());
        cmd.add_args_mapping("--label", opts.labels.iter().map(|(k, v)| (k, v)));
        cmd.add_args_iterable("--opt", &opts.options);
        cmd.append(name);
        let output = run_command(&self.config, cmd).await?;
        Ok(Network::from_trusted_id(
            self.config.clone(),
            output.stdout.trim(),
        ))
    }

    /// Connect a container to a network.
    pub async fn connect(
        &self,
        network: &str,
        container: &str,
        opts: NetworkConnectOpts,
    ) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["network", "connect"]).await?;
        cmd.add_simple_arg("--alias", opts.alias.as_deref());
        cmd.add_args_iterable("--driver-opt", &opts.driver_options);
        cmd.add_simple_arg("--ip", opts.ip.as_deref());
        cmd.add_simple_arg("--ip6", opts.ip6.as_deref());
        cmd.add_args_iterable("--link", &opts.links);
        cmd.append(network);
        cmd.append(container);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Disconnect a container from a network.
    pub async fn disconnect(&self, network: &str, container: &str, force: bool) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["network", "disconnect"]).await?;
        cmd.add_flag("--force", force);
        cmd.append(network);
        cmd.append(container);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Resolve a reference into a [`Network`] handle.
    pub async fn inspect(&self, network: &str) -> Result<Network> {
        Network::from_reference(self.config.clone(), network).await
    }

    /// List networks as trusted handles.
    pub async fn list(&self, filters: &[(&str, &str)]) -> Result<Vec<Network>> {
        let mut cmd =
            engine_command(&self.config, &["network", "list", "--no-trunc", "--quiet"]).await?;
        cmd.add_args_iterable("--filter", filters.iter().map(|(k, v)| format!("{k}={v}")));
        let output = run_command(&self.config, cmd).await?;
        Ok(output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|id| Network::from_trusted_id(self.config.clone(), id))
            .collect())
    }

    /// Remove unused networks.
    pub async fn prune(&self, filters: &[(&str, &str)]) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["network", "prune", "--force"]).await?;
        cmd.add_args_iterable("--filter", filters.iter().map(|(k, v)| format!("{k}={v}")));
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Remove one or more networks. An empty selection is a no-op.
    pub async fn remove<I, S>(&self, networks: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let networks = to_string_vec(networks);
        if networks.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["network", "remove"]).await?;
        cmd.extend(networks);
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
    async fn remove_on_empty_selection_spawns_nothing() {
        let cli = NetworkCli::new(ClientConfig::new(ClientOpts {
            binary_path: Some(PathBuf::from("/definitely/not/docker")),
            ..ClientOpts::default()
        }));
        cli.remove(Vec::<String>::new()).await.unwrap();
    }
}
