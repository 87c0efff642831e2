// SPDX-License-Identifier: MIT OR Apache-2.0
//! System-level operations: info, disk usage, events, prune.

use crate::{engine_command, run_command, stream_command};
use gantry_config::ClientConfig;
use gantry_error::{Error, Result};
use gantry_host::{FrameStream, StreamSource};
use gantry_models::{DiskFreeResult, EngineEvent, SystemInfo};
use tokio_stream::StreamExt;

/// Options for `system events`.
#[derive(Debug, Clone, Default)]
pub struct EventsOpts {
    /// Event filters, e.g. `("type", "container")`.
    pub filters: Vec<(String, String)>,
    /// Lower time bound.
    pub since: Option<String>,
    /// Upper time bound. The bounded list form forces `"0s"`.
    pub until: Option<String>,
}

/// System operations (`system …`).
#[derive(Debug, Clone)]
pub struct SystemCli {
    config: ClientConfig,
}

impl SystemCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Disk usage of the daemon, split into the four categories.
    pub async fn disk_free(&self) -> Result<DiskFreeResult> {
        let cmd = engine_command(&self.config, &["system", "df", "--format", "{{json .}}"]).await?;
        let output = run_command(&self.config, cmd).await?;
        DiskFreeResult::parse(&output.stdout)
    }

    /// The events up to now, bounded with `--until 0s` so the engine
    /// returns instead of listening forever.
    pub async fn events(&self, opts: EventsOpts) -> Result<Vec<EngineEvent>> {
        let mut cmd = engine_command(
            &self.config,
            &["system", "events", "--format", "{{json .}}", "--until", "0s"],
        )
        .await?;
        cmd.add_simple_arg("--since", opts.since.as_deref());
        cmd.add_args_iterable(
            "--filter",
            opts.filters.iter().map(|(k, v)| format!("{k}={v}")),
        );
        let output = run_command(&self.config, cmd).await?;
        output
            .stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(EngineEvent::parse)
            .collect()
    }

    /// Stream events as they happen until the stream is dropped.
    pub async fn events_streamed(
        &self,
        opts: EventsOpts,
    ) -> Result<impl tokio_stream::Stream<Item = Result<EngineEvent>>> {
        let mut cmd =
            engine_command(&self.config, &["system", "events", "--format", "{{json .}}"]).await?;
        cmd.add_simple_arg("--since", opts.since.as_deref());
        cmd.add_simple_arg("--until", opts.until.as_deref());
        cmd.add_args_iterable(
            "--filter",
            opts.filters.iter().map(|(k, v)| format!("{k}={v}")),
        );
        let frames: FrameStream = stream_command(&self.config, cmd)?;
        Ok(frames.filter_map(|item| match item {
            Ok(frame) if frame.source == StreamSource::Stdout => {
                let line = String::from_utf8_lossy(&frame.bytes);
                let line = line.trim();
                if line.is_empty() {
                    None
                } else {
                    Some(EngineEvent::parse(line))
                }
            }
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        }))
    }

    /// Client and daemon information.
    pub async fn info(&self) -> Result<SystemInfo> {
        let cmd =
            engine_command(&self.config, &["system", "info", "--format", "{{json .}}"]).await?;
        let output = run_command(&self.config, cmd).await?;
        serde_json::from_str(&output.stdout)
            .map_err(|e| Error::parse_failure(format!("bad system info: {e}"), &output.stdout))
    }

    /// Remove unused data.
    pub async fn prune(&self, all: bool, volumes: bool, filters: &[(&str, &str)]) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["system", "prune", "--force"]).await?;
        cmd.add_flag("--all", all);
        cmd.add_flag("--volumes", volumes);
        cmd.add_args_iterable("--filter", filters.iter().map(|(k, v)| format!("{k}={v}")));
        run_command(&self.config, cmd).await?;
        Ok(())
    }
}
