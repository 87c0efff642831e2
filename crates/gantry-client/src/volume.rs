// SPDX-License-Identifier: MIT OR Apache-2.0
//! Volume operations and the [`Volume`] handle.

use crate::buildx::{BuildOpts, BuildxCli};
use crate::container::{ContainerCli, CopyEndpoint, RunOpts};
use crate::entity::{ScopedResource, json_entity};
use crate::image::ImageCli;
use crate::{engine_command, run_command, run_unbuffered};
use gantry_config::ClientConfig;
use gantry_core::VolumeSpec;
use gantry_error::{Error, Result};
use gantry_models::VolumeInspect;
use std::collections::BTreeMap;

json_entity! {
    /// A handle to one volume, identified by name.
    Volume {
        payload: VolumeInspect,
        id_field: name,
        inspect: ["volume", "inspect"],
    }
}

impl Volume {
    /// The volume name.
    pub fn name(&self) -> &str {
        self.id()
    }

    /// The volume driver.
    pub async fn driver(&self) -> Result<Option<String>> {
        Ok(self.inspect_result().await?.driver)
    }

    /// Where the volume data lives on the host.
    pub async fn mountpoint(&self) -> Result<Option<String>> {
        Ok(self.inspect_result().await?.mountpoint)
    }

    /// The volume labels.
    pub async fn labels(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.inspect_result().await?.labels.unwrap_or_default())
    }

    fn cli(&self) -> VolumeCli {
        VolumeCli::new(self.client_config().clone())
    }

    /// Remove this volume.
    pub async fn remove(&self) -> Result<()> {
        self.cli().remove([self.id()]).await
    }

    /// Create a new volume with this volume's data copied in.
    pub async fn clone_volume(&self, new_volume_name: Option<&str>) -> Result<Volume> {
        self.cli()
            .clone_volume(self.id(), new_volume_name, None, &[], &[])
            .await
    }

    /// Whether the volume still exists.
    pub async fn exists(&self) -> Result<bool> {
        self.cli().exists(self.id()).await
    }
}

impl ScopedResource for Volume {
    async fn teardown(&self) -> Result<()> {
        self.remove().await
    }
}

/// One side of a volume copy: a local path or a path inside a volume.
#[derive(Debug, Clone)]
pub enum VolumeCopyEndpoint {
    /// A path on the local filesystem.
    Local(std::path::PathBuf),
    /// A path inside a volume.
    InVolume {
        /// Volume name.
        volume: String,
        /// Path inside the volume; empty means the volume root.
        path: String,
    },
}

impl VolumeCopyEndpoint {
    /// A local path.
    pub fn local(path: impl Into<std::path::PathBuf>) -> Self {
        VolumeCopyEndpoint::Local(path.into())
    }

    /// A path inside a volume.
    pub fn in_volume(volume: impl Into<String>, path: impl Into<String>) -> Self {
        VolumeCopyEndpoint::InVolume {
            volume: volume.into(),
            path: path.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// VolumeCli
// ---------------------------------------------------------------------------

/// Volume operations (`volume …`).
#[derive(Debug, Clone)]
pub struct VolumeCli {
    config: ClientConfig,
}

impl VolumeCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Create a volume. Without a name the engine picks a random one.
    pub async fn create(
        &self,
        volume_name: Option<&str>,
        driver: Option<&str>,
        labels: &[(&str, &str)],
        options: &[(&str, &str)],
    ) -> Result<Volume> {
        let mut cmd = engine_command(&self.config, &["volume", "create"]).await?;
        cmd.add_simple_arg("--driver", driver);
        cmd.add_args_mapping("--label", labels.iter().copied());
        cmd.add_args_mapping("--opt", options.iter().copied());
        if let Some(name) = volume_name {
            cmd.append(name);
        }
        let output = run_command(&self.config, cmd).await?;
        Volume::from_reference(self.config.clone(), output.stdout.trim()).await
    }

    /// Resolve a reference into a [`Volume`] handle.
    pub async fn inspect(&self, volume: &str) -> Result<Volume> {
        Volume::from_reference(self.config.clone(), volume).await
    }

    /// Whether a volume exists.
    pub async fn exists(&self, volume: &str) -> Result<bool> {
        match self.inspect(volume).await {
            Ok(_) => Ok(true),
            Err(Error::NoSuchVolume(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// List volumes as trusted handles.
    pub async fn list(&self, filters: &[(&str, &str)]) -> Result<Vec<Volume>> {
        let mut cmd = engine_command(&self.config, &["volume", "list", "--quiet"]).await?;
        cmd.add_args_iterable("--filter", filters.iter().map(|(k, v)| format!("{k}={v}")));
        let output = run_command(&self.config, cmd).await?;
        Ok(output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|name| Volume::from_trusted_id(self.config.clone(), name))
            .collect())
    }

    /// Remove unused volumes. The engine prints its report to the
    /// caller's terminal.
    pub async fn prune(&self, filters: &[(&str, &str)]) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["volume", "prune", "--force"]).await?;
        cmd.add_args_iterable("--filter", filters.iter().map(|(k, v)| format!("{k}={v}")));
        run_unbuffered(&self.config, cmd).await
    }

    /// Remove one or more volumes. An empty selection is a no-op.
    pub async fn remove<I, S>(&self, volumes: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let volumes = crate::to_string_vec(volumes);
        if volumes.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["volume", "remove"]).await?;
        cmd.extend(volumes);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Create a new volume and copy all data from `source` into it.
    pub async fn clone_volume(
        &self,
        source: &str,
        new_volume_name: Option<&str>,
        driver: Option<&str>,
        labels: &[(&str, &str)],
        options: &[(&str, &str)],
    ) -> Result<Volume> {
        let new_volume = self.create(new_volume_name, driver, labels, options).await?;
        let staging = tempfile::tempdir()?;
        self.copy(
            VolumeCopyEndpoint::in_volume(source, "."),
            VolumeCopyEndpoint::local(staging.path()),
        )
        .await?;
        self.copy(
            VolumeCopyEndpoint::local(format!("{}/.", staging.path().display())),
            VolumeCopyEndpoint::in_volume(new_volume.name(), ""),
        )
        .await?;
        Ok(new_volume)
    }

    /// Copy between a volume and the local filesystem.
    ///
    /// The engine has no direct volume copy, so a one-shot helper image is
    /// built, a throwaway container mounts the volume, the copy happens
    /// through `container cp`, and both helpers are removed.
    pub async fn copy(
        &self,
        source: VolumeCopyEndpoint,
        destination: VolumeCopyEndpoint,
    ) -> Result<()> {
        const VOLUME_MOUNT: &str = "/volume";

        let (volume, volume_path, to_volume) = match (&source, &destination) {
            (VolumeCopyEndpoint::InVolume { volume, path }, VolumeCopyEndpoint::Local(_)) => {
                (volume.clone(), path.clone(), false)
            }
            (VolumeCopyEndpoint::Local(_), VolumeCopyEndpoint::InVolume { volume, path }) => {
                (volume.clone(), path.clone(), true)
            }
            _ => {
                return Err(Error::InvalidInput(
                    "exactly one side of a volume copy must name a volume".to_string(),
                ));
            }
        };

        let helper_image = self.build_helper_image().await?;
        let containers = ContainerCli::new(self.config.clone());
        let helper = containers
            .create(
                &helper_image,
                Vec::<String>::new(),
                RunOpts {
                    volumes: vec![VolumeSpec::new(volume, VOLUME_MOUNT)],
                    pull: crate::PullPolicy::Never,
                    ..RunOpts::default()
                },
            )
            .await?;

        let in_container = join_in_container(VOLUME_MOUNT, &volume_path);
        let copy_result = if to_volume {
            let VolumeCopyEndpoint::Local(local) = source else {
                unreachable!("matched above")
            };
            containers
                .copy(
                    CopyEndpoint::local(local),
                    CopyEndpoint::in_container(helper.id(), &in_container),
                )
                .await
        } else {
            let VolumeCopyEndpoint::Local(local) = destination else {
                unreachable!("matched above")
            };
            containers
                .copy(
                    CopyEndpoint::in_container(helper.id(), &in_container),
                    CopyEndpoint::local(local),
                )
                .await
        };

        let cleanup_container = helper.remove(false, false).await;
        let cleanup_image = ImageCli::new(self.config.clone())
            .remove([helper_image.as_str()], true, true)
            .await;
        copy_result.and(cleanup_container).and(cleanup_image)
    }

    async fn build_helper_image(&self) -> Result<String> {
        let build_dir = tempfile::tempdir()?;
        std::fs::write(
            build_dir.path().join("Dockerfile"),
            "FROM scratch\nCOPY Dockerfile /\nCMD /Dockerfile\n",
        )?;
        let tag = format!("gantry-volume-copy-{}", std::process::id());
        BuildxCli::new(self.config.clone())
            .build(
                &build_dir.path().display().to_string(),
                BuildOpts {
                    tags: vec![tag.clone()],
                    load: true,
                    progress: Some("plain".to_string()),
                    ..BuildOpts::default()
                },
            )
            .await?;
        Ok(tag)
    }
}

fn join_in_container(mount: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        mount.to_string()
    } else {
        format!("{mount}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_config::ClientOpts;
    use std::path::PathBuf;

    #[test]
    fn in_container_paths_join_under_the_mount() {
        assert_eq!(join_in_container("/volume", ""), "/volume");
        assert_eq!(join_in_container("/volume", "."), "/volume/.");
        assert_eq!(join_in_container("/volume", "/etc/conf"), "/volume/etc/conf");
        assert_eq!(join_in_container("/volume", "data"), "/volume/data");
    }

    #[tokio::test]
    async fn copy_between_two_local_paths_is_invalid() {
        let cli = VolumeCli::new(gantry_config::ClientConfig::new(ClientOpts {
            binary_path: Some(PathBuf::from("/definitely/not/docker")),
            ..ClientOpts::default()
        }));
        let err = cli
            .copy(
                VolumeCopyEndpoint::local("/a"),
                VolumeCopyEndpoint::local("/b"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn remove_on_empty_selection_spawns_nothing() {
        let cli = VolumeCli::new(gantry_config::ClientConfig::new(ClientOpts {
            binary_path: Some(PathBuf::from("/definitely/not/docker")),
            ..ClientOpts::default()
        }));
        cli.remove(Vec::<String>::new()).await.unwrap();
    }
}
