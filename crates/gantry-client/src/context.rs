// SPDX-License-Identifier: MIT OR Apache-2.0
//! CLI context operations and the [`Context`] handle.

use crate::entity::{ScopedResource, json_entity};
use crate::{engine_command, run_command, to_string_vec};
use gantry_config::ClientConfig;
use gantry_error::Result;
use gantry_models::{ContextEndpoint, ContextInspect};
use std::collections::BTreeMap;
use std::path::PathBuf;

json_entity! {
    /// A handle to one CLI context, identified by name.
    Context {
        payload: ContextInspect,
        id_field: name,
        inspect: ["context", "inspect"],
    }
}

impl Context {
    /// The context name.
    pub fn name(&self) -> &str {
        self.id()
    }

    /// The context endpoints by kind.
    pub async fn endpoints(&self) -> Result<BTreeMap<String, ContextEndpoint>> {
        Ok(self.inspect_result().await?.endpoints.unwrap_or_default())
    }

    fn cli(&self) -> ContextCli {
        ContextCli::new(self.client_config().clone())
    }

    /// Remove this context.
    pub async fn remove(&self, force: bool) -> Result<()> {
        self.cli().remove([self.id()], force).await
    }

    /// Make this context the default.
    pub async fn use_context(&self) -> Result<()> {
        self.cli().use_context(self.id()).await?;
        Ok(())
    }
}

impl ScopedResource for Context {
    /// Force-remove on scope exit.
    async fn teardown(&self) -> Result<()> {
        self.remove(true).await
    }
}

/// Docker endpoint configuration for `context create`, serialized as a
/// comma-joined `key=value` string.
#[derive(Debug, Clone, Default)]
pub struct DockerContextConfig {
    /// Context to copy from.
    pub from: Option<String>,
    /// Daemon address.
    pub host: Option<String>,
    /// CA certificate path.
    pub certificate_authority: Option<PathBuf>,
    /// Client certificate path.
    pub certificate: Option<PathBuf>,
    /// Client key path.
    pub key: Option<PathBuf>,
    /// Skip TLS verification.
    pub skip_tls_verify: bool,
}

impl DockerContextConfig {
    fn render(&self) -> String {
        let mut parts = Vec::new();
        if let Some(from) = &self.from {
            parts.push(format!("from={from}"));
        }
        if let Some(host) = &self.host {
            parts.push(format!("host={host}"));
        }
        if let Some(ca) = &self.certificate_authority {
            parts.push(format!("ca={}", ca.display()));
        }
        if let Some(cert) = &self.certificate {
            parts.push(format!("cert={}", cert.display()));
        }
        if let Some(key) = &self.key {
            parts.push(format!("key={}", key.display()));
        }
        parts.push(format!("skip-tls-verify={}", self.skip_tls_verify));
        parts.join(",")
    }
}

/// Kubernetes endpoint configuration for `context create`.
#[derive(Debug, Clone, Default)]
pub struct KubernetesContextConfig {
    /// Context to copy from.
    pub from: Option<String>,
    /// Kubeconfig file.
    pub config_file: Option<PathBuf>,
    /// Kubeconfig context override.
    pub context_override: Option<String>,
    /// Namespace override.
    pub namespace_override: Option<String>,
}

impl KubernetesContextConfig {
    fn render(&self) -> String {
        let mut parts = Vec::new();
        if let Some(from) = &self.from {
            parts.push(format!("from={from}"));
        }
        if let Some(config_file) = &self.config_file {
            parts.push(format!("config-file={}", config_file.display()));
        }
        if let Some(context) = &self.context_override {
            parts.push(format!("context-override={context}"));
        }
        if let Some(namespace) = &self.namespace_override {
            parts.push(format!("namespace-override={namespace}"));
        }
        parts.join(",")
    }
}

/// Options for `context create`.
#[derive(Debug, Clone, Default)]
pub struct ContextCreateOpts {
    /// Default stack orchestrator.
    pub default_stack_orchestrator: Option<String>,
    /// Context description.
    pub description: Option<String>,
    /// Context to copy from.
    pub from: Option<String>,
    /// Docker endpoint configuration.
    pub docker: Option<DockerContextConfig>,
    /// Kubernetes endpoint configuration.
    pub kubernetes: Option<KubernetesContextConfig>,
}

/// CLI context operations (`context …`).
#[derive(Debug, Clone)]
pub struct ContextCli {
    config: ClientConfig,
}

impl ContextCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Create a context.
    pub async fn create(&self, context_name: &str, opts: ContextCreateOpts) -> Result<Context> {
        let mut cmd = engine_command(&self.config, &["context", "create"]).await?;
        cmd.add_simple_arg(
            "--default-stack-orchestrator",
            opts.default_stack_orchestrator.as_deref(),
        );
        cmd.add_simple_arg("--description", opts.description.as_deref());
        cmd.add_simple_arg("--from", opts.from.as_deref());
        cmd.add_simple_arg("--docker", opts.docker.as_ref().map(|d| d.render()));
        cmd.add_simple_arg("--kubernetes", opts.kubernetes.as_ref().map(|k| k.render()));
        cmd.append(context_name);
        run_command(&self.config, cmd).await?;
        self.inspect(Some(context_name)).await
    }

    /// Resolve a context. `None` resolves the current one.
    pub async fn inspect(&self, context: Option<&str>) -> Result<Context> {
        match context {
            Some(name) => Context::from_reference(self.config.clone(), name).await,
            None => {
                // No positional: the engine inspects the current context.
                let cmd = engine_command(&self.config, &["context", "inspect"]).await?;
                let output = run_command(&self.config, cmd).await?;
                let payload: ContextInspect = gantry_models::parse_single(&output.stdout)?;
                let name = payload.name.clone().unwrap_or_default();
                Ok(Context::from_trusted_id(self.config.clone(), name))
            }
        }
    }

    /// List contexts as trusted handles.
    pub async fn list(&self) -> Result<Vec<Context>> {
        let cmd = engine_command(&self.config, &["context", "list", "--quiet"]).await?;
        let output = run_command(&self.config, cmd).await?;
        Ok(output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|name| Context::from_trusted_id(self.config.clone(), name))
            .collect())
    }

    /// Remove one or more contexts. An empty selection is a no-op.
    pub async fn remove<I, S>(&self, contexts: I, force: bool) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let contexts = to_string_vec(contexts);
        if contexts.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["context", "remove"]).await?;
        cmd.add_flag("--force", force);
        cmd.extend(contexts);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Set the default context.
    pub async fn use_context(&self, context: &str) -> Result<Context> {
        let mut cmd = engine_command(&self.config, &["context", "use"]).await?;
        cmd.append(context);
        run_command(&self.config, cmd).await?;
        self.inspect(Some(context)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_config_serializes_comma_joined() {
        let config = DockerContextConfig {
            host: Some("ssh://user@host".into()),
            skip_tls_verify: true,
            ..DockerContextConfig::default()
        };
        assert_eq!(config.render(), "host=ssh://user@host,skip-tls-verify=true");
    }

    #[test]
    fn docker_config_always_carries_skip_tls_verify() {
        assert_eq!(
            DockerContextConfig::default().render(),
            "skip-tls-verify=false"
        );
    }

    #[test]
    fn kubernetes_config_serializes_its_options() {
        let config = KubernetesContextConfig {
            config_file: Some("/home/me/.kube/config".into()),
            namespace_override: Some("staging".into()),
            ..KubernetesContextConfig::default()
        };
        assert_eq!(
            config.render(),
            "config-file=/home/me/.kube/config,namespace-override=staging"
        );
    }
}
