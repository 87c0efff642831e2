// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compose project operations.
//!
//! Every invocation starts from the client's compose prefix: the engine
//! binary, the global flags, `compose`, then the configured compose files,
//! env files and project name.

use crate::container::Container;
use crate::{run_command, run_unbuffered, stream_command, to_string_vec};
use gantry_config::ClientConfig;
use gantry_core::{Command, Signal, ValidDuration};
use gantry_error::{Error, Result};
use gantry_host::FrameStream;
use gantry_models::ComposeConfig;

/// Compose operations (`compose …`).
#[derive(Debug, Clone)]
pub struct ComposeCli {
    config: ClientConfig,
}

impl ComposeCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    async fn compose_command(&self, tokens: &[&str]) -> Result<Command> {
        let mut cmd = Command::new(self.config.compose_prefix().await?);
        cmd.extend(tokens.iter().copied());
        Ok(cmd)
    }

    /// Build the images of the selected services (all when empty).
    pub async fn build<I, S>(&self, services: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = self.compose_command(&["build"]).await?;
        cmd.extend(to_string_vec(services));
        run_unbuffered(&self.config, cmd).await
    }

    /// The resolved project configuration as a typed record.
    pub async fn config(&self) -> Result<ComposeConfig> {
        let cmd = self.compose_command(&["config", "--format", "json"]).await?;
        let output = run_command(&self.config, cmd).await?;
        gantry_models::parse_object(&output.stdout)
    }

    /// The resolved project configuration as raw JSON.
    pub async fn config_json(&self) -> Result<serde_json::Value> {
        let cmd = self.compose_command(&["config", "--format", "json"]).await?;
        let output = run_command(&self.config, cmd).await?;
        serde_json::from_str(&output.stdout)
            .map_err(|e| Error::parse_failure(format!("bad compose config: {e}"), &output.stdout))
    }

    /// Create containers for the selected services without starting them.
    pub async fn create<I, S>(
        &self,
        services: I,
        build: bool,
        force_recreate: bool,
        no_build: bool,
        no_recreate: bool,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = self.compose_command(&["create"]).await?;
        cmd.add_flag("--build", build);
        cmd.add_flag("--force-recreate", force_recreate);
        cmd.add_flag("--no-build", no_build);
        cmd.add_flag("--no-recreate", no_recreate);
        cmd.extend(to_string_vec(services));
        run_unbuffered(&self.config, cmd).await
    }

    /// Stop and remove the project's containers.
    pub async fn down(
        &self,
        remove_orphans: bool,
        remove_images: Option<&str>,
        timeout: Option<ValidDuration>,
        volumes: bool,
    ) -> Result<()> {
        let mut cmd = self.compose_command(&["down"]).await?;
        cmd.add_flag("--remove-orphans", remove_orphans);
        cmd.add_simple_arg("--rmi", remove_images);
        cmd.add_simple_arg("--timeout", timeout);
        cmd.add_flag("--volumes", volumes);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Execute a command in a running service container.
    pub async fn execute<I, S>(&self, service: &str, command: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = self.compose_command(&["exec", "--no-TTY"]).await?;
        cmd.append(service);
        cmd.extend(to_string_vec(command));
        let output = run_command(&self.config, cmd).await?;
        Ok(output.stdout)
    }

    /// Kill the containers of the selected services.
    pub async fn kill<I, S>(&self, services: I, signal: Option<Signal>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = self.compose_command(&["kill"]).await?;
        cmd.add_simple_arg("--signal", signal);
        cmd.extend(to_string_vec(services));
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// The project's logs up to now.
    pub async fn logs<I, S>(&self, services: I, timestamps: bool) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stream = self.logs_streamed(services, timestamps, false).await?;
        stream.collect_stdout().await
    }

    /// The project's logs as a frame stream.
    pub async fn logs_streamed<I, S>(
        &self,
        services: I,
        timestamps: bool,
        follow: bool,
    ) -> Result<FrameStream>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = self.compose_command(&["logs", "--no-color"]).await?;
        cmd.add_flag("--timestamps", timestamps);
        cmd.add_flag("--follow", follow);
        cmd.extend(to_string_vec(services));
        stream_command(&self.config, cmd)
    }

    /// Pause the selected services.
    pub async fn pause<I, S>(&self, services: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = self.compose_command(&["pause"]).await?;
        cmd.extend(to_string_vec(services));
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Unpause the selected services.
    pub async fn unpause<I, S>(&self, services: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = self.compose_command(&["unpause"]).await?;
        cmd.extend(to_string_vec(services));
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// The containers created by this project, as trusted handles. A
    /// leading experimental-CLI warning line is skipped.
    pub async fn ps(&self) -> Result<Vec<Container>> {
        let cmd = self.compose_command(&["ps", "--quiet"]).await?;
        let output = run_command(&self.config, cmd).await?;
        Ok(output
            .stdout
            .lines()
            .filter(|line| !line.is_empty() && !line.contains("experimental"))
            .map(|id| Container::from_trusted_id(self.config.clone(), id))
            .collect())
    }

    /// Pull the images of the selected services.
    pub async fn pull<I, S>(&self, services: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = self.compose_command(&["pull"]).await?;
        cmd.extend(to_string_vec(services));
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Push the images of the selected services.
    pub async fn push<I, S>(&self, services: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = self.compose_command(&["push"]).await?;
        cmd.extend(to_string_vec(services));
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Restart the selected services.
    pub async fn restart<I, S>(&self, services: I, timeout: Option<ValidDuration>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = self.compose_command(&["restart"]).await?;
        cmd.add_simple_arg("--timeout", timeout);
        cmd.extend(to_string_vec(services));
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Remove stopped service containers.
    pub async fn rm<I, S>(&self, services: I, stop: bool, volumes: bool) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = self.compose_command(&["rm", "--force"]).await?;
        cmd.add_flag("--stop", stop);
        cmd.add_flag("--volumes", volumes);
        cmd.extend(to_string_vec(services));
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Run a one-off command on a service; returns its output.
    pub async fn run<I, S>(&self, service: &str, command: I, remove: bool) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = self.compose_command(&["run", "--no-TTY"]).await?;
        cmd.add_flag("--rm", remove);
        cmd.append(service);
        cmd.extend(to_string_vec(command));
        let output = run_command(&self.config, cmd).await?;
        Ok(output.stdout)
    }

    /// Scale services to the given replica counts.
    pub async fn scale(&self, new_scales: &[(&str, u32)]) -> Result<()> {
        let mut cmd = self.compose_command(&["up", "--detach", "--no-recreate"]).await?;
        cmd.add_args_iterable(
            "--scale",
            new_scales.iter().map(|(service, n)| format!("{service}={n}")),
        );
        run_unbuffered(&self.config, cmd).await
    }

    /// Start the selected services.
    pub async fn start<I, S>(&self, services: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = self.compose_command(&["start"]).await?;
        cmd.extend(to_string_vec(services));
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Stop the selected services.
    pub async fn stop<I, S>(&self, services: I, timeout: Option<ValidDuration>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = self.compose_command(&["stop"]).await?;
        cmd.add_simple_arg("--timeout", timeout);
        cmd.extend(to_string_vec(services));
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Bring the project up.
    pub async fn up<I, S>(&self, services: I, build: bool, detach: bool) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = self.compose_command(&["up"]).await?;
        cmd.add_flag("--detach", detach);
        cmd.add_flag("--build", build);
        cmd.extend(to_string_vec(services));
        run_unbuffered(&self.config, cmd).await
    }

    /// The compose plugin's version line.
    pub async fn version(&self) -> Result<String> {
        let cmd = self.compose_command(&["version"]).await?;
        let output = run_command(&self.config, cmd).await?;
        Ok(output.stdout)
    }

    /// Whether the compose plugin is installed and working.
    pub async fn is_installed(&self) -> Result<bool> {
        let cmd = crate::engine_command(&self.config, &["compose", "--help"]).await?;
        match run_command(&self.config, cmd).await {
            Ok(output) => Ok(output.stdout.contains("compose")),
            Err(Error::CommandFailed(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Compose event streaming is not wired up.
    pub fn events(&self) -> Result<()> {
        Err(Error::NotImplemented("compose events"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_config::ClientOpts;
    use std::path::PathBuf;

    #[tokio::test]
    async fn compose_commands_start_from_the_compose_prefix() {
        let cli = ComposeCli::new(ClientConfig::new(ClientOpts {
            binary_path: Some(PathBuf::from("/usr/bin/docker")),
            compose_files: vec!["docker-compose.yml".into()],
            compose_env_files: vec![".env".into()],
            compose_project_name: Some("demo".into()),
            ..ClientOpts::default()
        }));
        let cmd = cli.compose_command(&["up"]).await.unwrap();
        assert_eq!(
            cmd.as_slice(),
            [
                "/usr/bin/docker",
                "compose",
                "--file",
                "docker-compose.yml",
                "--env-file",
                ".env",
                "--project-name",
                "demo",
                "up",
            ]
        );
    }
}
