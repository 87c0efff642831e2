// SPDX-License-Identifier: MIT OR Apache-2.0
//! Swarm config operations and the [`SwarmConfig`] handle.

use crate::entity::{ScopedResource, json_entity};
use crate::{engine_command, run_command, to_string_vec};
use gantry_config::ClientConfig;
use gantry_error::Result;
use gantry_models::{ConfigInspect, ConfigSpec};
use std::path::Path;

json_entity! {
    /// A handle to one swarm config, identified by its immutable id.
    SwarmConfig {
        payload: ConfigInspect,
        id_field: id,
        inspect: ["config", "inspect"],
    }
}

impl SwarmConfig {
    /// The config specification (name, labels, payload).
    pub async fn spec(&self) -> Result<ConfigSpec> {
        Ok(self.inspect_result().await?.spec.unwrap_or_default())
    }

    /// Remove this config.
    pub async fn remove(&self) -> Result<()> {
        SwarmConfigCli::new(self.client_config().clone())
            .remove([self.id()])
            .await
    }
}

impl ScopedResource for SwarmConfig {
    async fn teardown(&self) -> Result<()> {
        self.remove().await
    }
}

/// Swarm config operations (`config …`).
#[derive(Debug, Clone)]
pub struct SwarmConfigCli {
    config: ClientConfig,
}

impl SwarmConfigCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Create a config from a file.
    pub async fn create(
        &self,
        name: &str,
        file: &Path,
        labels: &[(&str, &str)],
        template_driver: Option<&str>,
    ) -> Result<SwarmConfig> {
        let mut cmd = engine_command(&self.config, &["config", "create"]).await?;
        cmd.add_args_mapping("--label", labels.iter().copied());
        cmd.add_simple_arg("--template-driver", template_driver);
        cmd.append(name);
        cmd.append(file.display().to_string());
        let output = run_command(&self.config, cmd).await?;
        Ok(SwarmConfig::from_trusted_id(
            self.config.clone(),
            output.stdout.trim(),
        ))
    }

    /// Resolve a reference into a [`SwarmConfig`] handle.
    pub async fn inspect(&self, config: &str) -> Result<SwarmConfig> {
        SwarmConfig::from_reference(self.config.clone(), config).await
    }

    /// List configs as trusted handles.
    pub async fn list(&self, filters: &[(&str, &str)]) -> Result<Vec<SwarmConfig>> {
        let mut cmd = engine_command(&self.config, &["config", "list", "--quiet"]).await?;
        cmd.add_args_iterable("--filter", filters.iter().map(|(k, v)| format!("{k}={v}")));
        let output = run_command(&self.config, cmd).await?;
        Ok(output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|id| SwarmConfig::from_trusted_id(self.config.clone(), id))
            .collect())
    }

    /// Remove one or more configs. An empty selection is a no-op.
    pub async fn remove<I, S>(&self, configs: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let configs = to_string_vec(configs);
        if configs.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["config", "remove"]).await?;
        cmd.extend(configs);
        run_command(&self.config, cmd).await?;
        Ok(())
    }
}
