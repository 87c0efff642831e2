// SPDX-License-Identifier: MIT OR Apache-2.0
//! Swarm secret operations and the [`Secret`] handle. Secret values never
//! appear in argv, errors, or logs; creation reads from a file.

use crate::entity::{ScopedResource, json_entity};
use crate::{engine_command, run_command, to_string_vec};
use gantry_config::ClientConfig;
use gantry_core::Command;
use gantry_error::Result;
use gantry_models::{SecretInspect, SecretSpec};
use std::path::Path;

json_entity! {
    /// A handle to one swarm secret, identified by its immutable id.
    Secret {
        payload: SecretInspect,
        id_field: id,
        inspect: ["secret", "inspect"],
    }
}

impl Secret {
    /// The secret specification (name and labels; never the value).
    pub async fn spec(&self) -> Result<SecretSpec> {
        Ok(self.inspect_result().await?.spec.unwrap_or_default())
    }

    /// Remove this secret.
    pub async fn remove(&self) -> Result<()> {
        SecretCli::new(self.client_config().clone())
            .remove([self.id()])
            .await
    }
}

impl ScopedResource for Secret {
    async fn teardown(&self) -> Result<()> {
        self.remove().await
    }
}

/// Options for `secret create`.
#[derive(Debug, Clone, Default)]
pub struct SecretCreateOpts {
    /// Secret driver.
    pub driver: Option<String>,
    /// Labels, in order.
    pub labels: Vec<(String, String)>,
    /// Templating driver.
    pub template_driver: Option<String>,
}

impl SecretCreateOpts {
    fn apply(&self, cmd: &mut Command) {
        cmd.add_simple_arg("--driver", self.driver.as_deref());
        cmd.add_args_mapping("--label", self.labels.iter().map(|(k, v)| (k, v)));
        cmd.add_simple_arg("--template-driver", self.template_driver.as_deref());
    }
}

/// Swarm secret operations (`secret …`).
#[derive(Debug, Clone)]
pub struct SecretCli {
    config: ClientConfig,
}

impl SecretCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Create a secret from a file.
    pub async fn create(&self, name: &str, file: &Path, opts: SecretCreateOpts) -> Result<Secret> {
        let mut cmd = engine_command(&self.config, &["secret", "create"]).await?;
        opts.apply(&mut cmd);
        cmd.append(name);
        cmd.append(file.display().to_string());
        let output = run_command(&self.config, cmd).await?;
        Ok(Secret::from_trusted_id(
            self.config.clone(),
            output.stdout.trim(),
        ))
    }

    /// Resolve a reference into a [`Secret`] handle.
    pub async fn inspect(&self, secret: &str) -> Result<Secret> {
        Secret::from_reference(self.config.clone(), secret).await
    }

    /// List secrets as trusted handles.
    pub async fn list(&self, filters: &[(&str, &str)]) -> Result<Vec<Secret>> {
        let mut cmd = engine_command(&self.config, &["secret", "list", "--quiet"]).await?;
        cmd.add_args_iterable("--filter", filters.iter().map(|(k, v)| format!("{k}={v}")));
        let output = run_command(&self.config, cmd).await?;
        Ok(output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|id| Secret::from_trusted_id(self.config.clone(), id))
            .collect())
    }

    /// Remove one or more secrets. An empty selection is a no-op.
    pub async fn remove<I, S>(&self, secrets: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let secrets = to_string_vec(secrets);
        if secrets.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["secret", "remove"]).await?;
        cmd.extend(secrets);
        run_command(&self.config, cmd).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(opts: &SecretCreateOpts) -> Vec<String> {
        let mut cmd = Command::new(["docker", "secret", "create"]);
        opts.apply(&mut cmd);
        cmd.into_vec()
    }

    #[test]
    fn labels_render_as_key_equals_value_pairs_in_order() {
        let opts = SecretCreateOpts {
            labels: vec![("team".into(), "infra".into()), ("env".into(), "prod".into())],
            ..SecretCreateOpts::default()
        };
        let argv = rendered(&opts);
        assert!(argv.windows(2).any(|w| w == ["--label", "team=infra"]));
        assert!(argv.windows(2).any(|w| w == ["--label", "env=prod"]));
        let label_values: Vec<_> = argv
            .iter()
            .enumerate()
            .filter(|(_, t)| t.as_str() == "--label")
            .map(|(i, _)| argv[i + 1].clone())
            .collect();
        assert_eq!(label_values, ["team=infra", "env=prod"]);
    }

    #[test]
    fn absent_drivers_add_no_flags() {
        let argv = rendered(&SecretCreateOpts::default());
        assert_eq!(argv, ["docker", "secret", "create"]);
    }

    #[test]
    fn drivers_render_when_set() {
        let opts = SecretCreateOpts {
            driver: Some("builtin".into()),
            template_driver: Some("golang".into()),
            ..SecretCreateOpts::default()
        };
        let argv = rendered(&opts);
        assert!(argv.windows(2).any(|w| w == ["--driver", "builtin"]));
        assert!(argv.windows(2).any(|w| w == ["--template-driver", "golang"]));
    }
}
