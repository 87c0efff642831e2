// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dual-stream frame reader over a child's stdout and stderr.

use futures::Stream;
use gantry_config::EngineKind;
use gantry_error::{classify, CommandFailure, Error, Result};
use std::collections::BTreeMap;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

/// Which child stream a frame came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamSource {
    /// The child's standard output.
    Stdout,
    /// The child's standard error.
    Stderr,
}

impl StreamSource {
    /// The conventional lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamSource::Stdout => "stdout",
            StreamSource::Stderr => "stderr",
        }
    }
}

/// One line read from one of the child's streams.
///
/// `bytes` is the exact byte sequence read, including the trailing newline
/// when the child emitted one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Stream the line was read from.
    pub source: StreamSource,
    /// Raw line bytes.
    pub bytes: Vec<u8>,
}

/// An ordered stream of [`Frame`]s from a running child.
///
/// Intra-stream order is preserved; frames from the two streams interleave
/// by arrival. When both streams close and the child exits nonzero, the
/// stream terminates with the classified engine error carrying the full
/// accumulated stderr. Dropping the stream before the end kills the child
/// and releases its stdio.
pub struct FrameStream {
    rx: mpsc::UnboundedReceiver<Result<Frame>>,
    supervisor: tokio::task::JoinHandle<()>,
}

impl FrameStream {
    /// Spawn `argv` and stream its output.
    ///
    /// `env` is overlaid on the ambient environment. Spawn failures surface
    /// immediately rather than as a stream item.
    pub fn spawn(
        argv: Vec<String>,
        kind: EngineKind,
        env: BTreeMap<String, String>,
    ) -> Result<Self> {
        if argv.is_empty() {
            return Err(Error::InvalidInput(
                "cannot stream an empty command".to_string(),
            ));
        }

        let mut env = env;
        if let Some((key, value)) = crate::runner::buildx_env_injection(&argv, kind) {
            env.entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }

        debug!(
            argv = %gantry_error::redact_argv(&argv).join(" "),
            "spawning streamed engine command"
        );

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(Error::Spawn)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::InvalidInput("child stdout unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::InvalidInput("child stderr unavailable".to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();

        // A single supervisor task drives both readers with join!, so
        // aborting it drops the readers and the child together; kill_on_drop
        // then takes the child down.
        let supervisor = tokio::spawn(async move {
            let mut full_stderr: Vec<u8> = Vec::new();

            let stdout_reader = {
                let tx = tx.clone();
                async move {
                    let mut reader = BufReader::new(stdout);
                    loop {
                        let mut line = Vec::new();
                        match reader.read_until(b'\n', &mut line).await {
                            Ok(0) | Err(_) => break,
                            Ok(_) => {
                                if tx
                                    .send(Ok(Frame {
                                        source: StreamSource::Stdout,
                                        bytes: line,
                                    }))
                                    .is_err()
                                {
                                    break;
                                }
                            }
                        }
                    }
                }
            };

            let stderr_reader = {
                let tx = tx.clone();
                let full_stderr = &mut full_stderr;
                async move {
                    let mut reader = BufReader::new(stderr);
                    loop {
                        let mut line = Vec::new();
                        match reader.read_until(b'\n', &mut line).await {
                            Ok(0) | Err(_) => break,
                            Ok(_) => {
                                full_stderr.extend_from_slice(&line);
                                if tx
                                    .send(Ok(Frame {
                                        source: StreamSource::Stderr,
                                        bytes: line,
                                    }))
                                    .is_err()
                                {
                                    break;
                                }
                            }
                        }
                    }
                }
            };

            tokio::join!(stdout_reader, stderr_reader);

            let exit_code = match child.wait().await {
                Ok(status) if status.success() => return,
                Ok(status) => status.code().unwrap_or(-1),
                Err(_) => -1,
            };
            let stderr_text = String::from_utf8_lossy(&full_stderr).into_owned();
            let failure = CommandFailure::new(&argv, exit_code, None, Some(stderr_text));
            let _ = tx.send(Err(classify(failure)));
        });

        Ok(Self { rx, supervisor })
    }

    /// Drain the stream, concatenating decoded stdout frames.
    pub async fn collect_stdout(mut self) -> Result<String> {
        use tokio_stream::StreamExt;
        let mut text = String::new();
        while let Some(item) = self.next().await {
            let frame = item?;
            if frame.source == StreamSource::Stdout {
                text.push_str(&String::from_utf8_lossy(&frame.bytes));
            }
        }
        Ok(text)
    }

    /// Drain the stream into a list of frames.
    pub async fn collect_frames(mut self) -> Result<Vec<Frame>> {
        use tokio_stream::StreamExt;
        let mut frames = Vec::new();
        while let Some(item) = self.next().await {
            frames.push(item?);
        }
        Ok(frames)
    }
}

impl Stream for FrameStream {
    type Item = Result<Frame>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}

impl std::fmt::Debug for FrameStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStream").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    fn sh(script: &str) -> FrameStream {
        FrameStream::spawn(
            vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()],
            EngineKind::Docker,
            BTreeMap::new(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn frames_keep_their_newlines() {
        let frames = sh("printf 'a\\nb\\n'").collect_frames().await.unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].bytes, b"a\n");
        assert_eq!(frames[1].bytes, b"b\n");
    }

    #[tokio::test]
    async fn last_line_without_newline_is_delivered() {
        let frames = sh("printf 'no-newline'").collect_frames().await.unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].bytes, b"no-newline");
    }

    #[tokio::test]
    async fn sources_are_tagged() {
        let frames = sh("echo out; echo err >&2").collect_frames().await.unwrap();
        let stdout: Vec<_> = frames
            .iter()
            .filter(|f| f.source == StreamSource::Stdout)
            .collect();
        let stderr: Vec<_> = frames
            .iter()
            .filter(|f| f.source == StreamSource::Stderr)
            .collect();
        assert_eq!(stdout.len(), 1);
        assert_eq!(stderr.len(), 1);
        assert_eq!(stdout[0].bytes, b"out\n");
        assert_eq!(stderr[0].bytes, b"err\n");
    }

    #[tokio::test]
    async fn intra_stream_order_is_preserved() {
        let frames = sh("for i in 1 2 3 4 5; do echo $i; done")
            .collect_frames()
            .await
            .unwrap();
        let lines: Vec<_> = frames.iter().map(|f| f.bytes.clone()).collect();
        assert_eq!(lines, vec![b"1\n", b"2\n", b"3\n", b"4\n", b"5\n"]);
    }

    #[tokio::test]
    async fn nonzero_exit_terminates_with_classified_error() {
        let mut stream = sh("echo line; echo 'No such container: x' >&2; exit 1");
        let mut saw_error = false;
        while let Some(item) = stream.next().await {
            match item {
                Ok(_) => {}
                Err(err) => {
                    assert!(matches!(err, Error::NoSuchContainer(_)));
                    saw_error = true;
                }
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn error_carries_full_stderr() {
        let mut stream = sh("echo oops1 >&2; echo oops2 >&2; exit 7");
        let mut last_err = None;
        while let Some(item) = stream.next().await {
            if let Err(err) = item {
                last_err = Some(err);
            }
        }
        let err = last_err.expect("stream must fail");
        let failure = err.failure().unwrap();
        assert_eq!(failure.exit_code, 7);
        let stderr = failure.stderr.as_deref().unwrap();
        assert!(stderr.contains("oops1"));
        assert!(stderr.contains("oops2"));
    }

    #[tokio::test]
    async fn zero_exit_ends_stream_cleanly() {
        let mut stream = sh("echo done");
        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item);
        }
        assert!(items.iter().all(|i| i.is_ok()));
    }

    #[tokio::test]
    async fn collect_stdout_ignores_stderr_frames() {
        let text = sh("echo keep; echo drop >&2; echo keep2")
            .collect_stdout()
            .await
            .unwrap();
        assert_eq!(text, "keep\nkeep2\n");
    }

    #[tokio::test]
    async fn abandoning_the_stream_kills_the_child() {
        let marker = tempfile::NamedTempFile::new().unwrap();
        let path = marker.path().display().to_string();
        // The child would write the marker after 10 s; abandoning the
        // stream first must prevent that.
        let mut stream = sh(&format!("echo first; sleep 10; echo late > {path}"));
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.bytes, b"first\n");
        drop(stream);

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        let contents = std::fs::read_to_string(marker.path()).unwrap();
        assert!(contents.is_empty(), "child kept running after abandon");
    }

    #[tokio::test]
    async fn spawn_failure_is_immediate() {
        let err = FrameStream::spawn(
            vec!["/definitely/not/a/binary".to_string()],
            EngineKind::Docker,
            BTreeMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Spawn(_)));
    }
}
