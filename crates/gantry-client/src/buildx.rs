// SPDX-License-Identifier: MIT OR Apache-2.0
//! Buildx operations and the [`Builder`] handle.
//!
//! Builders are the one entity family whose inspect output is a textual
//! block instead of JSON, so the handle is built around the text parser
//! rather than the shared JSON plumbing.

use crate::entity::{InspectCache, ScopedResource};
use crate::image::ImageCli;
use crate::{engine_command, run_command, stream_command_with_env, to_string_vec};
use gantry_config::ClientConfig;
use gantry_core::{Command, comma_joined_pairs};
use gantry_error::{Error, Result};
use gantry_host::{Execution, FrameStream};
use gantry_models::{BuilderInspect, RegistryManifest, parse_builder_ls_names};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// A handle to one buildx builder, identified by name.
#[derive(Debug, Clone)]
pub struct Builder {
    config: ClientConfig,
    name: String,
    cache: Arc<InspectCache<BuilderInspect>>,
}

impl Builder {
    /// Build a handle from a name the caller vouches for.
    pub fn from_trusted_name(config: ClientConfig, name: impl Into<String>) -> Self {
        Self {
            config,
            name: name.into(),
            cache: Arc::new(InspectCache::empty()),
        }
    }

    /// Resolve a builder through the engine. `None` resolves the current
    /// builder.
    pub async fn from_reference(config: ClientConfig, reference: Option<&str>) -> Result<Self> {
        let payload = fetch_builder(&config, reference).await?;
        if payload.name.is_empty() {
            return Err(Error::InvalidInput(format!(
                "builder inspect for {reference:?} carries no name"
            )));
        }
        Ok(Self {
            name: payload.name.clone(),
            cache: Arc::new(InspectCache::primed(payload)),
            config,
        })
    }

    /// The builder name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owning client configuration.
    pub fn client_config(&self) -> &ClientConfig {
        &self.config
    }

    /// The parsed inspect block, refreshed when stale.
    pub async fn inspect_result(&self) -> Result<BuilderInspect> {
        let config = self.config.clone();
        let name = self.name.clone();
        self.cache
            .get(self.config.cache_validity(), move || async move {
                fetch_builder(&config, Some(&name)).await
            })
            .await
    }

    /// Force one refresh now.
    pub async fn reload(&self) -> Result<()> {
        let config = self.config.clone();
        let name = self.name.clone();
        self.cache
            .refresh(move || async move { fetch_builder(&config, Some(&name)).await })
            .await
    }

    /// The builder driver.
    pub async fn driver(&self) -> Result<String> {
        Ok(self.inspect_result().await?.driver)
    }

    /// The first node's status.
    pub async fn status(&self) -> Result<Option<String>> {
        Ok(self.inspect_result().await?.status().map(str::to_string))
    }

    /// The first node's platforms.
    pub async fn platforms(&self) -> Result<Vec<String>> {
        Ok(self.inspect_result().await?.platforms().to_vec())
    }

    /// Remove this builder.
    pub async fn remove(&self) -> Result<()> {
        BuildxCli::new(self.config.clone()).remove(&self.name).await
    }
}

impl std::fmt::Display for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq for Builder {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config && self.name == other.name
    }
}

impl Eq for Builder {}

impl std::hash::Hash for Builder {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl ScopedResource for Builder {
    async fn teardown(&self) -> Result<()> {
        self.remove().await
    }
}

async fn fetch_builder(config: &ClientConfig, reference: Option<&str>) -> Result<BuilderInspect> {
    let mut cmd = engine_command(config, &["buildx", "inspect"]).await?;
    if let Some(reference) = reference {
        cmd.append(reference);
    }
    let output = run_command(config, cmd).await?;
    Ok(BuilderInspect::parse(&output.stdout))
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// A cache source or destination: a plain registry reference or a set of
/// `key=value` options serialized comma-joined with no spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheSpec {
    /// `user/app:cache`-style reference.
    Reference(String),
    /// Options such as `type=local,src=path`.
    Options(Vec<(String, String)>),
}

impl std::fmt::Display for CacheSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheSpec::Reference(reference) => f.write_str(reference),
            CacheSpec::Options(pairs) => {
                f.write_str(&comma_joined_pairs(pairs.iter().map(|(k, v)| (k, v))))
            }
        }
    }
}

/// An attestation-style flag value: a bare boolean (`--flag=true`) or a
/// set of options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestSpec {
    /// Emit `--flag=true` / `--flag=false`.
    Enabled(bool),
    /// Emit `--flag key=value,...`.
    Options(Vec<(String, String)>),
}

/// Options for `buildx build`.
#[derive(Debug, Clone)]
pub struct BuildOpts {
    /// Extra `/etc/hosts` entries, `host → ip`.
    pub add_hosts: Vec<(String, String)>,
    /// Extra privileges, e.g. `network.host`.
    pub allow: Vec<String>,
    /// Attestation parameters.
    pub attest: Option<Vec<(String, String)>>,
    /// Build arguments.
    pub build_args: Vec<(String, String)>,
    /// Additional build contexts.
    pub build_contexts: Vec<(String, String)>,
    /// Builder to use.
    pub builder: Option<String>,
    /// Whether the build cache is used.
    pub cache: bool,
    /// Cache sources.
    pub cache_from: Vec<CacheSpec>,
    /// Cache destination.
    pub cache_to: Option<CacheSpec>,
    /// Dockerfile path.
    pub file: Option<String>,
    /// Image labels.
    pub labels: Vec<(String, String)>,
    /// Load the result into the local engine.
    pub load: bool,
    /// Network used during the build.
    pub network: Option<String>,
    /// Output destination options.
    pub output: Vec<(String, String)>,
    /// Target platforms.
    pub platforms: Vec<String>,
    /// Progress style (`"auto"`, `"plain"`, `"tty"`); `None` keeps the
    /// engine default.
    pub progress: Option<String>,
    /// Provenance attestation shorthand.
    pub provenance: Option<AttestSpec>,
    /// Always pull base images.
    pub pull: bool,
    /// Push the result to a registry.
    pub push: bool,
    /// SBOM attestation shorthand.
    pub sbom: Option<AttestSpec>,
    /// Build secrets.
    pub secrets: Vec<String>,
    /// SSH agent or keys to expose.
    pub ssh: Option<String>,
    /// Tags for the result.
    pub tags: Vec<String>,
    /// Target build stage.
    pub target: Option<String>,
}

impl Default for BuildOpts {
    fn default() -> Self {
        Self {
            add_hosts: Vec::new(),
            allow: Vec::new(),
            attest: None,
            build_args: Vec::new(),
            build_contexts: Vec::new(),
            builder: None,
            cache: true,
            cache_from: Vec::new(),
            cache_to: None,
            file: None,
            labels: Vec::new(),
            load: false,
            network: None,
            output: Vec::new(),
            platforms: Vec::new(),
            progress: None,
            provenance: None,
            pull: false,
            push: false,
            sbom: None,
            secrets: Vec::new(),
            ssh: None,
            tags: Vec::new(),
            target: None,
        }
    }
}

impl BuildOpts {
    fn apply(&self, cmd: &mut Command) {
        if let Some(progress) = &self.progress {
            if progress != "auto" {
                cmd.extend(["--progress", progress.as_str()]);
            }
        }
        cmd.add_args_iterable(
            "--add-host",
            self.add_hosts.iter().map(|(host, ip)| format!("{host}:{ip}")),
        );
        cmd.add_args_iterable("--allow", &self.allow);
        if let Some(attest) = &self.attest {
            cmd.add_simple_arg(
                "--attest",
                Some(comma_joined_pairs(attest.iter().map(|(k, v)| (k, v)))),
            );
        }
        cmd.add_args_mapping("--build-arg", self.build_args.iter().map(|(k, v)| (k, v)));
        cmd.add_args_mapping(
            "--build-context",
            self.build_contexts.iter().map(|(k, v)| (k, v)),
        );
        cmd.add_simple_arg("--builder", self.builder.as_deref());
        cmd.add_args_mapping("--label", self.labels.iter().map(|(k, v)| (k, v)));
        cmd.add_simple_arg("--ssh", self.ssh.as_deref());
        match &self.provenance {
            Some(AttestSpec::Enabled(on)) => {
                cmd.append(format!("--provenance={on}"));
            }
            Some(AttestSpec::Options(pairs)) => {
                cmd.add_simple_arg(
                    "--provenance",
                    Some(comma_joined_pairs(pairs.iter().map(|(k, v)| (k, v)))),
                );
            }
            None => {}
        }
        cmd.add_flag("--pull", self.pull);
        cmd.add_flag("--push", self.push);
        match &self.sbom {
            Some(AttestSpec::Enabled(on)) => {
                cmd.append(format!("--sbom={on}"));
            }
            Some(AttestSpec::Options(pairs)) => {
                cmd.add_simple_arg(
                    "--sbom",
                    Some(comma_joined_pairs(pairs.iter().map(|(k, v)| (k, v)))),
                );
            }
            None => {}
        }
        cmd.add_flag("--load", self.load);
        cmd.add_simple_arg("--file", self.file.as_deref());
        cmd.add_simple_arg("--target", self.target.as_deref());
        for cache_from in &self.cache_from {
            cmd.add_simple_arg("--cache-from", Some(cache_from));
        }
        cmd.add_simple_arg("--cache-to", self.cache_to.as_ref());
        cmd.add_args_iterable("--secret", &self.secrets);
        if !self.output.is_empty() {
            cmd.extend([
                "--output".to_string(),
                comma_joined_pairs(self.output.iter().map(|(k, v)| (k, v))),
            ]);
        }
        if !self.platforms.is_empty() {
            cmd.extend(["--platform".to_string(), self.platforms.join(",")]);
        }
        cmd.add_simple_arg("--network", self.network.as_deref());
        cmd.add_flag("--no-cache", !self.cache);
        cmd.add_args_iterable("--tag", &self.tags);
    }
}

/// Options for `buildx bake`.
#[derive(Debug, Clone)]
pub struct BakeOpts {
    /// Builder to use.
    pub builder: Option<String>,
    /// Definition files.
    pub files: Vec<String>,
    /// Load results into the local engine.
    pub load: bool,
    /// Whether the build cache is used.
    pub cache: bool,
    /// Progress style; `None` keeps the engine default.
    pub progress: Option<String>,
    /// Always pull base images.
    pub pull: bool,
    /// Push results to a registry.
    pub push: bool,
    /// Target overrides, `targetpattern.key → value`.
    pub set: Vec<(String, String)>,
    /// Variables passed to the definition as overlay environment.
    pub variables: Vec<(String, String)>,
}

impl Default for BakeOpts {
    fn default() -> Self {
        Self {
            builder: None,
            files: Vec::new(),
            load: false,
            cache: true,
            progress: None,
            pull: false,
            push: false,
            set: Vec::new(),
            variables: Vec::new(),
        }
    }
}

impl BakeOpts {
    fn apply(&self, cmd: &mut Command) {
        cmd.add_flag("--no-cache", !self.cache);
        cmd.add_simple_arg("--builder", self.builder.as_deref());
        cmd.add_flag("--load", self.load);
        cmd.add_flag("--pull", self.pull);
        cmd.add_flag("--push", self.push);
        if let Some(progress) = &self.progress {
            if progress != "auto" {
                cmd.extend(["--progress", progress.as_str()]);
            }
        }
        cmd.add_args_iterable("--file", &self.files);
        cmd.add_args_mapping("--set", self.set.iter().map(|(k, v)| (k, v)));
    }

    fn env(&self) -> BTreeMap<String, String> {
        self.variables
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Options for `buildx create`.
#[derive(Debug, Clone, Default)]
pub struct BuilderCreateOpts {
    /// Context or endpoint the builder binds to.
    pub context_or_endpoint: Option<String>,
    /// Flags for the buildkitd daemon.
    pub buildkitd_flags: Option<String>,
    /// BuildKit config file.
    pub config_file: Option<String>,
    /// Fixed platforms for the builder.
    pub platforms: Vec<String>,
    /// Driver (`"docker-container"`, `"kubernetes"`, …).
    pub driver: Option<String>,
    /// Driver options.
    pub driver_options: Vec<(String, String)>,
    /// Builder name.
    pub name: Option<String>,
    /// Switch to the new builder.
    pub use_builder: bool,
}

// ---------------------------------------------------------------------------
// BuildxCli
// ---------------------------------------------------------------------------

/// Buildx operations (`buildx …`).
#[derive(Debug, Clone)]
pub struct BuildxCli {
    config: ClientConfig,
    /// Registry manifest operations (`buildx imagetools …`).
    pub imagetools: ImagetoolsCli,
}

impl BuildxCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self {
            imagetools: ImagetoolsCli::new(config.clone()),
            config,
        }
    }

    /// Build an image.
    ///
    /// Returns a handle when the result is loaded into the local engine,
    /// which depends on the driver and the load/push/output options.
    pub async fn build(&self, context_path: &str, opts: BuildOpts) -> Result<Option<crate::Image>> {
        let mut cmd = engine_command(&self.config, &["buildx", "build"]).await?;
        opts.apply(&mut cmd);

        let mut will_load = self.build_will_load_image(&opts).await?;
        // A docker-container builder writes a wrong iidfile for untagged
        // builds; the image cannot be fetched in that case.
        if will_load
            && opts.tags.is_empty()
            && self.inspect(opts.builder.as_deref()).await?.driver().await? == "docker-container"
        {
            will_load = false;
        }

        if !will_load {
            cmd.append(context_path);
            run_command(&self.config, cmd).await?;
            return Ok(None);
        }

        let images = ImageCli::new(self.config.clone());
        let driver = self.inspect(opts.builder.as_deref()).await?.driver().await?;
        if driver == "docker" {
            // The docker driver has a reliable iidfile.
            let scratch = tempfile::tempdir()?;
            let iidfile = scratch.path().join("iidfile.txt");
            cmd.add_simple_arg("--iidfile", Some(iidfile.display()));
            cmd.append(context_path);
            run_command(&self.config, cmd).await?;
            let image_id = std::fs::read_to_string(&iidfile)?;
            Ok(Some(images.inspect(image_id.trim()).await?))
        } else {
            let Some(tag) = opts.tags.first() else {
                return Ok(None);
            };
            cmd.append(context_path);
            run_command(&self.config, cmd).await?;
            Ok(Some(images.inspect(tag).await?))
        }
    }

    /// Build an image, streaming the engine's progress lines.
    pub async fn build_streamed(
        &self,
        context_path: &str,
        opts: BuildOpts,
    ) -> Result<FrameStream> {
        if matches!(opts.progress.as_deref(), Some("tty")) {
            return Err(Error::InvalidInput(
                "streaming build logs is incompatible with tty progress".to_string(),
            ));
        }
        let mut cmd = engine_command(&self.config, &["buildx", "build"]).await?;
        opts.apply(&mut cmd);
        cmd.append(context_path);
        stream_command_with_env(&self.config, cmd, BTreeMap::new())
    }

    async fn build_will_load_image(&self, opts: &BuildOpts) -> Result<bool> {
        if opts.load {
            return Ok(true);
        }
        if opts.push {
            return Ok(false);
        }
        if !opts.output.is_empty() {
            let type_is_docker = opts
                .output
                .iter()
                .any(|(k, v)| k == "type" && v == "docker");
            let has_dest = opts.output.iter().any(|(k, _)| k == "dest");
            return Ok(type_is_docker && !has_dest);
        }
        Ok(self.inspect(opts.builder.as_deref()).await?.driver().await? == "docker")
    }

    /// Run the targets of a bake definition, returning the resolved
    /// configuration.
    pub async fn bake<I, S>(&self, targets: I, opts: BakeOpts) -> Result<serde_json::Value>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let targets = to_string_vec(targets);
        let mut cmd = engine_command(&self.config, &["buildx", "bake"]).await?;
        opts.apply(&mut cmd);
        cmd.extend(targets.clone());
        Execution::new(cmd.into_vec(), self.config.kind())
            .env(opts.env())
            .capture_stdout(false)
            .capture_stderr(false)
            .run()
            .await?;
        self.bake_print(&targets, &opts).await
    }

    /// Return the resolved bake configuration without building.
    pub async fn bake_print<S: AsRef<str>>(
        &self,
        targets: &[S],
        opts: &BakeOpts,
    ) -> Result<serde_json::Value> {
        let mut cmd = engine_command(&self.config, &["buildx", "bake"]).await?;
        opts.apply(&mut cmd);
        cmd.append("--print");
        cmd.extend(targets.iter().map(|t| t.as_ref().to_string()));
        let output = Execution::new(cmd.into_vec(), self.config.kind())
            .env(opts.env())
            .run()
            .await?;
        serde_json::from_str(&output.stdout)
            .map_err(|e| Error::parse_failure(format!("bad bake config: {e}"), &output.stdout))
    }

    /// Run a bake, streaming the engine's progress lines.
    pub async fn bake_streamed<I, S>(&self, targets: I, opts: BakeOpts) -> Result<FrameStream>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = engine_command(&self.config, &["buildx", "bake"]).await?;
        opts.apply(&mut cmd);
        cmd.extend(to_string_vec(targets));
        stream_command_with_env(&self.config, cmd, opts.env())
    }

    /// Create a new builder.
    pub async fn create(&self, opts: BuilderCreateOpts) -> Result<Builder> {
        let mut cmd = engine_command(&self.config, &["buildx", "create"]).await?;
        cmd.add_simple_arg("--buildkitd-flags", opts.buildkitd_flags.as_deref());
        cmd.add_simple_arg("--config", opts.config_file.as_deref());
        if !opts.platforms.is_empty() {
            cmd.extend(["--platform".to_string(), opts.platforms.join(",")]);
        }
        cmd.add_simple_arg("--driver", opts.driver.as_deref());
        if !opts.driver_options.is_empty() {
            cmd.add_simple_arg(
                "--driver-opt",
                Some(comma_joined_pairs(
                    opts.driver_options.iter().map(|(k, v)| (k, v)),
                )),
            );
        }
        cmd.add_simple_arg("--name", opts.name.as_deref());
        cmd.add_flag("--use", opts.use_builder);
        if let Some(context) = &opts.context_or_endpoint {
            cmd.append(context);
        }
        let output = run_command(&self.config, cmd).await?;
        Ok(Builder::from_trusted_name(
            self.config.clone(),
            output.stdout.trim(),
        ))
    }

    /// Resolve a builder. `None` resolves the current one.
    pub async fn inspect(&self, builder: Option<&str>) -> Result<Builder> {
        Builder::from_reference(self.config.clone(), builder).await
    }

    /// List builders as trusted handles.
    pub async fn list(&self) -> Result<Vec<Builder>> {
        let cmd = engine_command(&self.config, &["buildx", "ls"]).await?;
        let output = run_command(&self.config, cmd).await?;
        Ok(parse_builder_ls_names(&output.stdout)
            .into_iter()
            .map(|name| Builder::from_trusted_name(self.config.clone(), name))
            .collect())
    }

    /// Remove build cache on the current builder.
    pub async fn prune(&self, all: bool, filters: &[(&str, &str)]) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["buildx", "prune", "--force"]).await?;
        cmd.add_flag("--all", all);
        cmd.add_args_iterable("--filter", filters.iter().map(|(k, v)| format!("{k}={v}")));
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Remove build cache, streaming the table lines including the
    /// `Total:` trailer.
    pub async fn prune_streamed(
        &self,
        all: bool,
        filters: &[(&str, &str)],
    ) -> Result<FrameStream> {
        let mut cmd = engine_command(&self.config, &["buildx", "prune", "--force"]).await?;
        cmd.add_flag("--all", all);
        cmd.add_args_iterable("--filter", filters.iter().map(|(k, v)| format!("{k}={v}")));
        stream_command_with_env(&self.config, cmd, BTreeMap::new())
    }

    /// Remove a builder.
    pub async fn remove(&self, builder: &str) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["buildx", "rm"]).await?;
        cmd.append(builder);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Stop a builder. `None` stops the current one.
    pub async fn stop(&self, builder: Option<&str>) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["buildx", "stop"]).await?;
        if let Some(builder) = builder {
            cmd.append(builder);
        }
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Switch the current builder.
    pub async fn use_builder(&self, builder: &str, default: bool, global: bool) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["buildx", "use"]).await?;
        cmd.add_flag("--default", default);
        cmd.add_flag("--global", global);
        cmd.append(builder);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// The buildx version line.
    pub async fn version(&self) -> Result<String> {
        let cmd = engine_command(&self.config, &["buildx", "version"]).await?;
        let output = run_command(&self.config, cmd).await?;
        Ok(output.stdout)
    }

    /// Whether buildx is installed and working.
    pub async fn is_installed(&self) -> Result<bool> {
        let cmd = engine_command(&self.config, &["buildx", "--help"]).await?;
        match run_command(&self.config, cmd).await {
            Ok(output) => Ok(output.stdout.contains("buildx")),
            Err(Error::CommandFailed(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }
}

// ---------------------------------------------------------------------------
// ImagetoolsCli
// ---------------------------------------------------------------------------

/// Options for `buildx imagetools create`.
#[derive(Debug, Clone, Default)]
pub struct ImagetoolsCreateOpts {
    /// Tags for the new manifest list.
    pub tags: Vec<String>,
    /// Source descriptor files to read.
    pub files: Vec<PathBuf>,
    /// Append to an existing manifest instead of replacing it.
    pub append: bool,
    /// Show the final manifest instead of pushing it.
    pub dry_run: bool,
    /// Builder to use.
    pub builder: Option<String>,
}

impl ImagetoolsCreateOpts {
    fn apply(&self, cmd: &mut Command) {
        cmd.add_args_iterable("--tag", &self.tags);
        cmd.add_args_iterable("--file", self.files.iter().map(|p| p.display()));
        cmd.add_simple_arg("--builder", self.builder.as_deref());
        cmd.add_flag("--append", self.append);
        cmd.add_flag("--dry-run", self.dry_run);
    }
}

/// Registry manifest operations (`buildx imagetools …`).
#[derive(Debug, Clone)]
pub struct ImagetoolsCli {
    config: ClientConfig,
}

impl ImagetoolsCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// The manifest of an image in a registry, without pulling it.
    pub async fn inspect(&self, name: &str) -> Result<RegistryManifest> {
        let mut cmd =
            engine_command(&self.config, &["buildx", "imagetools", "inspect", "--raw"]).await?;
        cmd.append(name);
        let output = run_command(&self.config, cmd).await?;
        gantry_models::parse_object(&output.stdout)
    }

    /// Create a new manifest list from source manifests already present in
    /// the registry. A single source makes a carbon copy.
    ///
    /// With `dry_run` the final manifest is returned instead of pushed;
    /// otherwise `None` comes back.
    pub async fn create<I, S>(
        &self,
        sources: I,
        opts: ImagetoolsCreateOpts,
    ) -> Result<Option<RegistryManifest>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = engine_command(&self.config, &["buildx", "imagetools", "create"]).await?;
        opts.apply(&mut cmd);
        cmd.extend(to_string_vec(sources));
        let output = run_command(&self.config, cmd).await?;
        if opts.dry_run {
            Ok(Some(gantry_models::parse_object(&output.stdout)?))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_config::ClientOpts;
    use std::path::PathBuf;

    fn rendered(opts: &BuildOpts) -> Vec<String> {
        let mut cmd = Command::new(["docker", "buildx", "build"]);
        opts.apply(&mut cmd);
        cmd.into_vec()
    }

    #[test]
    fn output_serializes_comma_joined_without_spaces() {
        let opts = BuildOpts {
            output: vec![("type".into(), "local".into()), ("dest".into(), "out".into())],
            ..BuildOpts::default()
        };
        let argv = rendered(&opts);
        assert!(argv.windows(2).any(|w| w == ["--output", "type=local,dest=out"]));
    }

    #[test]
    fn cache_specs_render_both_forms() {
        let opts = BuildOpts {
            cache_from: vec![
                CacheSpec::Reference("user/app:cache".into()),
                CacheSpec::Options(vec![
                    ("type".into(), "local".into()),
                    ("src".into(), "path/to/dir".into()),
                ]),
            ],
            cache_to: Some(CacheSpec::Options(vec![
                ("type".into(), "local".into()),
                ("dest".into(), "path".into()),
                ("mode".into(), "max".into()),
            ])),
            ..BuildOpts::default()
        };
        let argv = rendered(&opts);
        assert!(argv.windows(2).any(|w| w == ["--cache-from", "user/app:cache"]));
        assert!(argv
            .windows(2)
            .any(|w| w == ["--cache-from", "type=local,src=path/to/dir"]));
        assert!(argv
            .windows(2)
            .any(|w| w == ["--cache-to", "type=local,dest=path,mode=max"]));
    }

    #[test]
    fn provenance_and_sbom_use_explicit_boolean_values() {
        let opts = BuildOpts {
            provenance: Some(AttestSpec::Enabled(false)),
            sbom: Some(AttestSpec::Enabled(true)),
            ..BuildOpts::default()
        };
        let argv = rendered(&opts);
        assert!(argv.contains(&"--provenance=false".to_string()));
        assert!(argv.contains(&"--sbom=true".to_string()));
    }

    #[test]
    fn platforms_join_with_commas() {
        let opts = BuildOpts {
            platforms: vec!["linux/amd64".into(), "linux/arm64".into()],
            ..BuildOpts::default()
        };
        let argv = rendered(&opts);
        assert!(argv
            .windows(2)
            .any(|w| w == ["--platform", "linux/amd64,linux/arm64"]));
    }

    #[test]
    fn disabling_the_cache_adds_no_cache() {
        let opts = BuildOpts {
            cache: false,
            ..BuildOpts::default()
        };
        assert!(rendered(&opts).contains(&"--no-cache".to_string()));
        assert!(!rendered(&BuildOpts::default()).contains(&"--no-cache".to_string()));
    }

    #[test]
    fn auto_progress_is_omitted() {
        let opts = BuildOpts {
            progress: Some("auto".into()),
            ..BuildOpts::default()
        };
        assert!(!rendered(&opts).contains(&"--progress".to_string()));
        let opts = BuildOpts {
            progress: Some("plain".into()),
            ..BuildOpts::default()
        };
        assert!(rendered(&opts).windows(2).any(|w| w == ["--progress", "plain"]));
    }

    #[test]
    fn imagetools_create_renders_tags_files_and_flags() {
        let opts = ImagetoolsCreateOpts {
            tags: vec!["myorg/app:latest".into(), "myorg/app:1.0".into()],
            files: vec![PathBuf::from("descriptor.json")],
            append: true,
            dry_run: true,
            builder: Some("mybuilder".into()),
        };
        let mut cmd = Command::new(["docker", "buildx", "imagetools", "create"]);
        opts.apply(&mut cmd);
        let argv = cmd.into_vec();
        assert!(argv.windows(2).any(|w| w == ["--tag", "myorg/app:latest"]));
        assert!(argv.windows(2).any(|w| w == ["--tag", "myorg/app:1.0"]));
        assert!(argv.windows(2).any(|w| w == ["--file", "descriptor.json"]));
        assert!(argv.windows(2).any(|w| w == ["--builder", "mybuilder"]));
        assert!(argv.contains(&"--append".to_string()));
        assert!(argv.contains(&"--dry-run".to_string()));
    }

    #[test]
    fn imagetools_create_defaults_add_no_flags() {
        let mut cmd = Command::new(["docker", "buildx", "imagetools", "create"]);
        ImagetoolsCreateOpts::default().apply(&mut cmd);
        assert_eq!(
            cmd.into_vec(),
            ["docker", "buildx", "imagetools", "create"]
        );
    }

    #[test]
    fn trusted_builders_compare_by_name() {
        let config = ClientConfig::new(ClientOpts {
            binary_path: Some(PathBuf::from("/usr/bin/docker")),
            ..ClientOpts::default()
        });
        let a = Builder::from_trusted_name(config.clone(), "b1");
        let b = Builder::from_trusted_name(config.clone(), "b1");
        let c = Builder::from_trusted_name(config, "b2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "b1");
    }
}
