// SPDX-License-Identifier: MIT OR Apache-2.0
//! Plugin operations and the [`Plugin`] handle.

use crate::entity::json_entity;
use crate::{engine_command, run_command, run_unbuffered, to_string_vec};
use gantry_config::ClientConfig;
use gantry_error::Result;
use gantry_models::PluginInspect;

json_entity! {
    /// A handle to one plugin, identified by its immutable id.
    Plugin {
        payload: PluginInspect,
        id_field: id,
        inspect: ["plugin", "inspect"],
    }
}

impl Plugin {
    /// The plugin name.
    pub async fn name(&self) -> Result<Option<String>> {
        Ok(self.inspect_result().await?.name)
    }

    /// Whether the plugin is enabled.
    pub async fn enabled(&self) -> Result<Option<bool>> {
        Ok(self.inspect_result().await?.enabled)
    }

    fn cli(&self) -> PluginCli {
        PluginCli::new(self.client_config().clone())
    }

    /// Enable this plugin.
    pub async fn enable(&self, timeout: Option<u32>) -> Result<()> {
        let result = self.cli().enable(self.id(), timeout).await;
        self.invalidate().await;
        result
    }

    /// Disable this plugin.
    pub async fn disable(&self, force: bool) -> Result<()> {
        let result = self.cli().disable(self.id(), force).await;
        self.invalidate().await;
        result
    }

    /// Remove this plugin.
    pub async fn remove(&self, force: bool) -> Result<()> {
        self.cli().remove([self.id()], force).await
    }
}

/// Plugin operations (`plugin …`).
#[derive(Debug, Clone)]
pub struct PluginCli {
    config: ClientConfig,
}

impl PluginCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Disable a plugin.
    pub async fn disable(&self, plugin: &str, force: bool) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["plugin", "disable"]).await?;
        cmd.add_flag("--force", force);
        cmd.append(plugin);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Enable a plugin.
    pub async fn enable(&self, plugin: &str, timeout: Option<u32>) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["plugin", "enable"]).await?;
        cmd.add_simple_arg("--timeout", timeout);
        cmd.append(plugin);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Resolve a reference into a [`Plugin`] handle.
    pub async fn inspect(&self, plugin: &str) -> Result<Plugin> {
        Plugin::from_reference(self.config.clone(), plugin).await
    }

    /// Install a plugin, granting all requested permissions.
    pub async fn install(&self, plugin: &str, disable: bool, alias: Option<&str>) -> Result<Plugin> {
        let mut cmd = engine_command(&self.config, &["plugin", "install", "--grant-all-permissions"])
            .await?;
        cmd.add_flag("--disable", disable);
        cmd.append(plugin);
        if let Some(alias) = alias {
            cmd.append(alias);
        }
        run_unbuffered(&self.config, cmd).await?;
        self.inspect(alias.unwrap_or(plugin)).await
    }

    /// List installed plugins as trusted handles.
    pub async fn list(&self) -> Result<Vec<Plugin>> {
        let cmd = engine_command(
            &self.config,
            &["plugin", "list", "--quiet", "--no-trunc"],
        )
        .await?;
        let output = run_command(&self.config, cmd).await?;
        Ok(output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|id| Plugin::from_trusted_id(self.config.clone(), id))
            .collect())
    }

    /// Push a plugin to a registry.
    pub async fn push(&self, plugin: &str) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["plugin", "push"]).await?;
        cmd.append(plugin);
        run_unbuffered(&self.config, cmd).await
    }

    /// Remove one or more plugins. An empty selection is a no-op.
    pub async fn remove<I, S>(&self, plugins: I, force: bool) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let plugins = to_string_vec(plugins);
        if plugins.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["plugin", "rm"]).await?;
        cmd.add_flag("--force", force);
        cmd.extend(plugins);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Change a plugin's settings.
    pub async fn set(&self, plugin: &str, settings: &[(&str, &str)]) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["plugin", "set"]).await?;
        cmd.append(plugin);
        for (key, value) in settings {
            cmd.append(format!("{key}={value}"));
        }
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Upgrade a plugin, granting all requested permissions.
    pub async fn upgrade(&self, plugin: &str, remote: Option<&str>) -> Result<()> {
        let mut cmd = engine_command(
            &self.config,
            &["plugin", "upgrade", "--grant-all-permissions"],
        )
        .await?;
        cmd.append(plugin);
        if let Some(remote) = remote {
            cmd.append(remote);
        }
        run_unbuffered(&self.config, cmd).await
    }
}
