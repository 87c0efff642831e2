// SPDX-License-Identifier: MIT OR Apache-2.0
//! Image operations and the [`Image`] handle.

use crate::container::{ContainerCli, RunOpts};
use crate::entity::{ScopedResource, json_entity, scoped};
use crate::{engine_command, run_command, stream_command, to_string_vec};
use gantry_config::ClientConfig;
use gantry_error::{Error, Result};
use gantry_host::{Execution, FrameStream};
use gantry_models::ImageInspect;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Parallelism of list-form pull and push.
const TRANSFER_POOL_SIZE: usize = 4;

json_entity! {
    /// A handle to one image, identified by its content digest.
    Image {
        payload: ImageInspect,
        id_field: id,
        inspect: ["image", "inspect"],
    }
}

impl Image {
    /// The tags of this image.
    pub async fn repo_tags(&self) -> Result<Vec<String>> {
        Ok(self.inspect_result().await?.repo_tags.unwrap_or_default())
    }

    /// The repository digests of this image.
    pub async fn repo_digests(&self) -> Result<Vec<String>> {
        Ok(self.inspect_result().await?.repo_digests.unwrap_or_default())
    }

    /// The size in bytes.
    pub async fn size(&self) -> Result<Option<i64>> {
        Ok(self.inspect_result().await?.size)
    }

    fn cli(&self) -> ImageCli {
        ImageCli::new(self.client_config().clone())
    }

    /// Remove this image.
    pub async fn remove(&self, force: bool, prune: bool) -> Result<()> {
        self.cli().remove([self.id()], force, prune).await
    }

    /// Save this image to a tar archive.
    pub async fn save(&self, output: &Path) -> Result<()> {
        self.cli().save([self.id()], output).await
    }

    /// Add a tag to this image.
    pub async fn tag(&self, new_tag: &str) -> Result<()> {
        self.cli().tag(self.id(), new_tag).await
    }

    /// Whether the image still exists.
    pub async fn exists(&self) -> Result<bool> {
        self.cli().exists(self.id()).await
    }
}

impl ScopedResource for Image {
    /// Force-remove on scope exit.
    async fn teardown(&self) -> Result<()> {
        self.remove(true, true).await
    }
}

/// Options for `image import`.
#[derive(Debug, Clone, Default)]
pub struct ImageImportOpts {
    /// Dockerfile instructions to apply.
    pub changes: Vec<String>,
    /// Commit message.
    pub message: Option<String>,
    /// Target platform.
    pub platform: Option<String>,
}

// ---------------------------------------------------------------------------
// ImageCli
// ---------------------------------------------------------------------------

/// Image operations (`image …`).
#[derive(Debug, Clone)]
pub struct ImageCli {
    config: ClientConfig,
}

impl ImageCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Pull one image. Progress is drawn on the caller's terminal.
    pub async fn pull(&self, reference: &str) -> Result<Image> {
        self.pull_with(reference, false, None).await
    }

    /// Pull one image with quiet/platform control.
    pub async fn pull_with(
        &self,
        reference: &str,
        quiet: bool,
        platform: Option<&str>,
    ) -> Result<Image> {
        let mut cmd = engine_command(&self.config, &["image", "pull"]).await?;
        cmd.add_flag("--quiet", quiet);
        if let Some(platform) = platform {
            cmd.append(format!("--platform={platform}"));
        }
        cmd.append(reference);
        Execution::new(cmd.into_vec(), self.config.kind())
            .capture_stdout(quiet)
            .capture_stderr(quiet)
            .run()
            .await?;
        Image::from_reference(self.config.clone(), reference).await
    }

    /// Pull several images through a bounded worker pool. The returned
    /// handles match the input order; the first failure aborts the batch.
    pub async fn pull_many<I, S>(
        &self,
        references: I,
        quiet: bool,
        platform: Option<&str>,
    ) -> Result<Vec<Image>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let references = to_string_vec(references);
        if references.is_empty() {
            return Ok(Vec::new());
        }
        if references.len() == 1 {
            return Ok(vec![self.pull_with(&references[0], quiet, platform).await?]);
        }

        let semaphore = Arc::new(Semaphore::new(TRANSFER_POOL_SIZE));
        let mut workers: JoinSet<Result<(usize, Image)>> = JoinSet::new();
        for (index, reference) in references.into_iter().enumerate() {
            let cli = self.clone();
            let semaphore = semaphore.clone();
            let platform = platform.map(str::to_string);
            workers.spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| Error::InvalidInput("pull pool closed".to_string()))?;
                let image = cli.pull_with(&reference, quiet, platform.as_deref()).await?;
                Ok((index, image))
            });
        }

        let mut pulled = Vec::new();
        while let Some(joined) = workers.join_next().await {
            let (index, image) = joined
                .map_err(|e| Error::InvalidInput(format!("pull worker panicked: {e}")))??;
            pulled.push((index, image));
        }
        pulled.sort_by_key(|(index, _)| *index);
        Ok(pulled.into_iter().map(|(_, image)| image).collect())
    }

    /// Push one tag or repository.
    pub async fn push(&self, reference: &str) -> Result<()> {
        self.push_with(reference, false).await
    }

    async fn push_with(&self, reference: &str, quiet: bool) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["image", "push"]).await?;
        cmd.add_flag("--quiet", quiet);
        cmd.append(reference);
        Execution::new(cmd.into_vec(), self.config.kind())
            .capture_stdout(quiet)
            .capture_stderr(quiet)
            .run()
            .await?;
        Ok(())
    }

    /// Push several references through a bounded worker pool. A missing
    /// image raises before any worker starts.
    pub async fn push_many<I, S>(&self, references: I, quiet: bool) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let references = to_string_vec(references);
        if references.is_empty() {
            return Ok(());
        }
        // Raises NoSuchImage for any missing reference up front.
        self.inspect_many(&references).await?;
        if references.len() == 1 {
            return self.push_with(&references[0], quiet).await;
        }

        let semaphore = Arc::new(Semaphore::new(TRANSFER_POOL_SIZE));
        let mut workers: JoinSet<Result<()>> = JoinSet::new();
        for reference in references {
            let cli = self.clone();
            let semaphore = semaphore.clone();
            workers.spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| Error::InvalidInput("push pool closed".to_string()))?;
                cli.push_with(&reference, quiet).await
            });
        }
        while let Some(joined) = workers.join_next().await {
            joined.map_err(|e| Error::InvalidInput(format!("push worker panicked: {e}")))??;
        }
        Ok(())
    }

    /// Save one or more images to a tar archive.
    pub async fn save<I, S>(&self, images: I, output: &Path) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let images = to_string_vec(images);
        // Raises NoSuchImage early instead of mid-write.
        self.inspect_many(&images).await?;
        let mut cmd = engine_command(&self.config, &["image", "save"]).await?;
        cmd.add_simple_arg("--output", Some(output.display()));
        cmd.extend(images);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Save one or more images as a stream; the stdout frames carry the
    /// tar bytes. A nonzero exit raises `NoSuchImage` when stderr says so.
    pub async fn save_streamed<I, S>(&self, images: I) -> Result<FrameStream>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let images = to_string_vec(images);
        self.inspect_many(&images).await?;
        let mut cmd = engine_command(&self.config, &["image", "save"]).await?;
        cmd.extend(images);
        stream_command(&self.config, cmd)
    }

    /// Load images from a tar archive; returns the tags named on the
    /// `Loaded image` lines.
    pub async fn load(&self, input: &Path, quiet: bool) -> Result<Vec<String>> {
        let mut cmd = engine_command(&self.config, &["image", "load"]).await?;
        cmd.extend(["--input".to_string(), input.display().to_string()]);
        cmd.add_flag("--quiet", quiet);
        let stream = stream_command(&self.config, cmd)?;
        let text = stream.collect_stdout().await?;
        Ok(parse_loaded_tags(&text))
    }

    /// Load images from tar bytes fed through stdin.
    pub async fn load_bytes(&self, input: Vec<u8>, quiet: bool) -> Result<Vec<String>> {
        let mut cmd = engine_command(&self.config, &["image", "load"]).await?;
        cmd.add_flag("--quiet", quiet);
        let output = Execution::new(cmd.into_vec(), self.config.kind())
            .stdin(input)
            .run()
            .await?;
        Ok(parse_loaded_tags(&output.stdout))
    }

    /// Add a tag to an image.
    pub async fn tag(&self, source_image: &str, new_tag: &str) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["image", "tag"]).await?;
        cmd.append(source_image);
        cmd.append(new_tag);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Remove one or more images. An empty selection is a no-op.
    pub async fn remove<I, S>(&self, images: I, force: bool, prune: bool) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let images = to_string_vec(images);
        if images.is_empty() {
            return Ok(());
        }
        let mut cmd = engine_command(&self.config, &["image", "rm"]).await?;
        cmd.add_flag("--force", force);
        cmd.add_flag("--no-prune", !prune);
        cmd.extend(images);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// List local images as trusted handles, de-duplicated by id.
    pub async fn list(
        &self,
        repository_or_tag: Option<&str>,
        filters: &[(&str, &str)],
        all: bool,
    ) -> Result<Vec<Image>> {
        let mut cmd =
            engine_command(&self.config, &["image", "list", "--quiet", "--no-trunc"]).await?;
        cmd.add_args_iterable("--filter", filters.iter().map(|(k, v)| format!("{k}={v}")));
        cmd.add_flag("--all", all);
        if let Some(reference) = repository_or_tag {
            cmd.append(reference);
        }
        let output = run_command(&self.config, cmd).await?;
        // More tags than images; uniquify by id.
        let ids: BTreeSet<&str> = output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .collect();
        Ok(ids
            .into_iter()
            .map(|id| Image::from_trusted_id(self.config.clone(), id))
            .collect())
    }

    /// Resolve a reference into an [`Image`] handle.
    pub async fn inspect(&self, reference: &str) -> Result<Image> {
        Image::from_reference(self.config.clone(), reference).await
    }

    /// Resolve several references into handles.
    pub async fn inspect_many<I, S>(&self, references: I) -> Result<Vec<Image>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut handles = Vec::new();
        for reference in references {
            handles.push(self.inspect(reference.as_ref()).await?);
        }
        Ok(handles)
    }

    /// Whether an image exists locally.
    pub async fn exists(&self, reference: &str) -> Result<bool> {
        match self.inspect(reference).await {
            Ok(_) => Ok(true),
            Err(Error::NoSuchImage(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Remove unused images; returns the engine's report (the layers
    /// removed).
    pub async fn prune(&self, all: bool, filters: &[(&str, &str)]) -> Result<String> {
        let mut cmd = engine_command(&self.config, &["image", "prune", "--force"]).await?;
        cmd.add_flag("--all", all);
        cmd.add_args_iterable("--filter", filters.iter().map(|(k, v)| format!("{k}={v}")));
        let output = run_command(&self.config, cmd).await?;
        Ok(output.stdout)
    }

    /// Import a tarball's contents as a filesystem image.
    pub async fn import(
        &self,
        source: &Path,
        tag: Option<&str>,
        opts: ImageImportOpts,
    ) -> Result<Image> {
        let mut cmd = engine_command(&self.config, &["image", "import"]).await?;
        cmd.add_args_iterable("--change", &opts.changes);
        cmd.add_simple_arg("--message", opts.message.as_deref());
        cmd.add_simple_arg("--platform", opts.platform.as_deref());
        cmd.append(source.display().to_string());
        if let Some(tag) = tag {
            cmd.append(tag);
        }
        let output = run_command(&self.config, cmd).await?;
        Image::from_reference(self.config.clone(), output.stdout.trim()).await
    }

    /// Make sure an image is present locally, pulling it when absent.
    pub async fn pull_if_necessary(&self, reference: &str) -> Result<Image> {
        match self.inspect(reference).await {
            Ok(image) => Ok(image),
            Err(Error::NoSuchImage(_)) => self.pull(reference).await,
            Err(other) => Err(other),
        }
    }

    /// Copy a path out of an image through a throwaway container.
    pub async fn copy_from(
        &self,
        image: &str,
        path_in_image: &str,
        destination: &Path,
        pull: crate::PullPolicy,
    ) -> Result<()> {
        let containers = ContainerCli::new(self.config.clone());
        let throwaway = containers
            .create(
                image,
                Vec::<String>::new(),
                RunOpts {
                    pull,
                    ..RunOpts::default()
                },
            )
            .await?;
        scoped(throwaway, async |container| {
            container.copy_from(path_in_image, destination).await
        })
        .await
    }

    /// Copy a local path into an image, committing the result as a new
    /// image (optionally tagged).
    pub async fn copy_to(
        &self,
        base_image: &str,
        local_path: &Path,
        path_in_image: &str,
        new_tag: Option<&str>,
        pull: crate::PullPolicy,
    ) -> Result<Image> {
        let containers = ContainerCli::new(self.config.clone());
        let throwaway = containers
            .create(
                base_image,
                Vec::<String>::new(),
                RunOpts {
                    pull,
                    ..RunOpts::default()
                },
            )
            .await?;
        let new_tag = new_tag.map(str::to_string);
        scoped(throwaway, async |container| {
            container.copy_to(local_path, path_in_image).await?;
            container.commit(new_tag.as_deref(), None, None).await
        })
        .await
    }
}

/// Extract tags from `Loaded image: <tag>` / `Loaded image ID: <id>` lines.
fn parse_loaded_tags(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| line.contains("Loaded image"))
        .filter_map(|line| line.split_whitespace().last())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_config::ClientOpts;
    use std::path::PathBuf;

    #[test]
    fn loaded_tags_are_taken_from_the_last_token() {
        let stdout = "\
            Loaded image: busybox:1\n\
            some progress noise\n\
            Loaded image ID: sha256:abcdef\n";
        assert_eq!(
            parse_loaded_tags(stdout),
            ["busybox:1", "sha256:abcdef"]
        );
    }

    #[test]
    fn no_loaded_lines_means_no_tags() {
        assert!(parse_loaded_tags("nothing here\n").is_empty());
    }

    #[tokio::test]
    async fn remove_on_empty_selection_spawns_nothing() {
        let cli = ImageCli::new(gantry_config::ClientConfig::new(ClientOpts {
            binary_path: Some(PathBuf::from("/definitely/not/docker")),
            ..ClientOpts::default()
        }));
        cli.remove(Vec::<String>::new(), true, true).await.unwrap();
    }

    #[tokio::test]
    async fn pull_many_on_empty_selection_returns_empty() {
        let cli = ImageCli::new(gantry_config::ClientConfig::new(ClientOpts {
            binary_path: Some(PathBuf::from("/definitely/not/docker")),
            ..ClientOpts::default()
        }));
        assert!(cli
            .pull_many(Vec::<String>::new(), true, None)
            .await
            .unwrap()
            .is_empty());
    }
}
