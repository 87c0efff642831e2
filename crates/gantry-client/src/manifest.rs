// SPDX-License-Identifier: MIT OR Apache-2.0
//! Manifest list operations and the [`ManifestList`] handle.
//!
//! `manifest inspect` returns a bare JSON object without the list's own
//! name, so the handle injects the reference it was fetched for and the
//! shared JSON-array plumbing does not apply.

use crate::entity::{InspectCache, ScopedResource};
use crate::{engine_command, run_command, to_string_vec};
use gantry_config::ClientConfig;
use gantry_error::Result;
use gantry_host::Execution;
use gantry_models::{ImageVariantManifest, ManifestListInspect};
use std::sync::Arc;

/// Prefix of the success line printed by `manifest create`.
const CREATED_PREFIX: &str = "Created manifest list ";

/// A handle to one manifest list, identified by its reference.
#[derive(Debug, Clone)]
pub struct ManifestList {
    config: ClientConfig,
    name: String,
    cache: Arc<InspectCache<ManifestListInspect>>,
}

impl ManifestList {
    /// Build a handle from a reference the caller vouches for.
    pub fn from_trusted_name(config: ClientConfig, name: impl Into<String>) -> Self {
        Self {
            config,
            name: name.into(),
            cache: Arc::new(InspectCache::empty()),
        }
    }

    /// Resolve a reference through the engine.
    pub async fn from_reference(config: ClientConfig, reference: &str) -> Result<Self> {
        let payload = fetch_manifest(&config, reference).await?;
        Ok(Self {
            config,
            name: reference.to_string(),
            cache: Arc::new(InspectCache::primed(payload)),
        })
    }

    /// The manifest list reference.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parsed inspect payload, refreshed when stale.
    pub async fn inspect_result(&self) -> Result<ManifestListInspect> {
        let config = self.config.clone();
        let name = self.name.clone();
        self.cache
            .get(self.config.cache_validity(), move || async move {
                fetch_manifest(&config, &name).await
            })
            .await
    }

    /// The image variants inside the list.
    pub async fn manifests(&self) -> Result<Vec<ImageVariantManifest>> {
        Ok(self.inspect_result().await?.manifests.unwrap_or_default())
    }

    /// Remove this manifest list.
    pub async fn remove(&self) -> Result<()> {
        ManifestCli::new(self.config.clone())
            .remove([self.name.as_str()])
            .await
    }
}

impl std::fmt::Display for ManifestList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq for ManifestList {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config && self.name == other.name
    }
}

impl Eq for ManifestList {}

impl ScopedResource for ManifestList {
    async fn teardown(&self) -> Result<()> {
        self.remove().await
    }
}

async fn fetch_manifest(config: &ClientConfig, reference: &str) -> Result<ManifestListInspect> {
    let mut cmd = engine_command(config, &["manifest", "inspect"]).await?;
    cmd.append(reference);
    let output = run_command(config, cmd).await?;
    let mut payload: ManifestListInspect = gantry_models::parse_object(&output.stdout)?;
    // The payload has no name of its own.
    payload.name = Some(reference.to_string());
    Ok(payload)
}

/// Options for `manifest annotate`.
#[derive(Debug, Clone, Default)]
pub struct ManifestAnnotateOpts {
    /// Architecture.
    pub arch: Option<String>,
    /// Operating system.
    pub os: Option<String>,
    /// OS features.
    pub os_features: Vec<String>,
    /// OS version.
    pub os_version: Option<String>,
    /// Architecture variant.
    pub variant: Option<String>,
}

/// Manifest operations (`manifest …`).
#[derive(Debug, Clone)]
pub struct ManifestCli {
    config: ClientConfig,
}

impl ManifestCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Annotate one manifest inside a list.
    pub async fn annotate(
        &self,
        name: &str,
        manifest: &str,
        opts: ManifestAnnotateOpts,
    ) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["manifest", "annotate"]).await?;
        cmd.add_simple_arg("--arch", opts.arch.as_deref());
        cmd.add_simple_arg("--os", opts.os.as_deref());
        if !opts.os_features.is_empty() {
            cmd.add_simple_arg("--os-features", Some(opts.os_features.join(",")));
        }
        cmd.add_simple_arg("--os-version", opts.os_version.as_deref());
        cmd.add_simple_arg("--variant", opts.variant.as_deref());
        cmd.append(name);
        cmd.append(manifest);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Create a manifest list from individual manifests.
    pub async fn create<I, S>(&self, name: &str, manifests: I, amend: bool, insecure: bool) -> Result<ManifestList>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = engine_command(&self.config, &["manifest", "create"]).await?;
        cmd.add_flag("--amend", amend);
        cmd.add_flag("--insecure", insecure);
        cmd.append(name);
        cmd.extend(to_string_vec(manifests));
        let output = run_command(&self.config, cmd).await?;
        let created = output
            .stdout
            .trim()
            .strip_prefix(CREATED_PREFIX)
            .unwrap_or(name)
            .to_string();
        Ok(ManifestList::from_trusted_name(self.config.clone(), created))
    }

    /// Resolve a reference into a [`ManifestList`] handle.
    pub async fn inspect(&self, reference: &str) -> Result<ManifestList> {
        ManifestList::from_reference(self.config.clone(), reference).await
    }

    /// Push a manifest list to a repository.
    pub async fn push(&self, reference: &str, purge: bool, quiet: bool) -> Result<()> {
        // Raises before spawning the push when the list is missing.
        self.inspect(reference).await?;
        let mut cmd = engine_command(&self.config, &["manifest", "push"]).await?;
        cmd.add_flag("--purge", purge);
        cmd.append(reference);
        Execution::new(cmd.into_vec(), self.config.kind())
            .capture_stdout(quiet)
            .capture_stderr(quiet)
            .run()
            .await?;
        Ok(())
    }

    /// Remove one or more manifest lists. An empty selection is a no-op.
    pub async fn remove<I, S>(&self, manifest_lists: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let manifest_lists = to_string_vec(manifest_lists);
        if manifest_lists.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["manifest", "rm"]).await?;
        cmd.extend(manifest_lists);
        run_command(&self.config, cmd).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_prefix_matches_the_engine_output_shape() {
        let line = "Created manifest list docker.io/library/myorg/app:latest";
        assert_eq!(
            line.strip_prefix(CREATED_PREFIX),
            Some("docker.io/library/myorg/app:latest")
        );
    }
}
