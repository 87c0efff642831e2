// SPDX-License-Identifier: MIT OR Apache-2.0
//! One-shot engine invocations with configurable stdio policy.

use gantry_config::EngineKind;
use gantry_error::{classify, CommandFailure, Error, Result};
use std::collections::BTreeMap;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// A single engine invocation under construction.
///
/// By default both output streams are captured and buffered; disabling
/// capture makes the child inherit the caller's terminal so engine output
/// (progress bars, prompts) shows up in real time.
#[derive(Debug, Clone)]
pub struct Execution {
    argv: Vec<String>,
    kind: EngineKind,
    stdin: Option<Vec<u8>>,
    capture_stdout: bool,
    capture_stderr: bool,
    tty: bool,
    env: BTreeMap<String, String>,
}

/// Captured output of a successful invocation. Streams that were not
/// captured come back empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    /// Decoded stdout with at most one trailing newline stripped.
    pub stdout: String,
    /// Decoded stderr with at most one trailing newline stripped.
    pub stderr: String,
}

impl Execution {
    /// Start from a complete argv (binary first).
    pub fn new(argv: Vec<String>, kind: EngineKind) -> Self {
        Self {
            argv,
            kind,
            stdin: None,
            capture_stdout: true,
            capture_stderr: true,
            tty: false,
            env: BTreeMap::new(),
        }
    }

    /// Feed `bytes` to the child's stdin up to EOF before waiting.
    pub fn stdin(mut self, bytes: Vec<u8>) -> Self {
        self.stdin = Some(bytes);
        self
    }

    /// Whether to capture stdout (default true). When false, the stream is
    /// inherited.
    pub fn capture_stdout(mut self, capture: bool) -> Self {
        self.capture_stdout = capture;
        self
    }

    /// Whether to capture stderr (default true). When false, the stream is
    /// inherited.
    pub fn capture_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }

    /// Give the child the caller's terminal: no capture on either stream.
    pub fn tty(mut self, tty: bool) -> Self {
        self.tty = tty;
        self
    }

    /// Overlay environment variables onto the inherited environment; the
    /// overlay wins on conflicts.
    pub fn env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// The argv this execution will spawn.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Run to completion.
    ///
    /// Exit code 0 returns the captured [`Output`]; any other exit is
    /// classified through the error taxonomy and raised, carrying the
    /// redacted argv and whatever output was captured.
    pub async fn run(mut self) -> Result<Output> {
        if self.argv.is_empty() {
            return Err(Error::InvalidInput(
                "cannot run an empty command".to_string(),
            ));
        }
        if let Some((key, value)) = buildx_env_injection(&self.argv, self.kind) {
            self.env
                .entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }

        debug!(
            argv = %gantry_error::redact_argv(&self.argv).join(" "),
            "spawning engine command"
        );

        let capture_stdout = self.capture_stdout && !self.tty;
        let capture_stderr = self.capture_stderr && !self.tty;

        let mut cmd = Command::new(&self.argv[0]);
        cmd.args(&self.argv[1..]);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd.stdin(if self.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        });
        cmd.stdout(if capture_stdout {
            Stdio::piped()
        } else {
            Stdio::inherit()
        });
        cmd.stderr(if capture_stderr {
            Stdio::piped()
        } else {
            Stdio::inherit()
        });

        let mut child = cmd.spawn().map_err(Error::Spawn)?;

        if let Some(bytes) = self.stdin.take() {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| Error::InvalidInput("child stdin unavailable".to_string()))?;
            // Writing is concurrent with collection below only through the
            // pipe buffer; large payloads need the writer driven to EOF in
            // its own task so the child can drain stdout meanwhile.
            tokio::spawn(async move {
                let _ = stdin.write_all(&bytes).await;
                let _ = stdin.shutdown().await;
            });
        }

        let collected = child.wait_with_output().await?;
        let exit_code = collected.status.code().unwrap_or(-1);

        let stdout = if capture_stdout {
            Some(strip_one_newline(String::from_utf8(collected.stdout)?))
        } else {
            None
        };
        let stderr = if capture_stderr {
            Some(strip_one_newline(String::from_utf8(collected.stderr)?))
        } else {
            None
        };

        if !collected.status.success() {
            let failure = CommandFailure::new(&self.argv, exit_code, stdout, stderr);
            return Err(classify(failure));
        }

        Ok(Output {
            stdout: stdout.unwrap_or_default(),
            stderr: stderr.unwrap_or_default(),
        })
    }
}

/// Buildx on docker requires the experimental CLI switch; podman has the
/// subcommand natively.
pub(crate) fn buildx_env_injection(
    argv: &[String],
    kind: EngineKind,
) -> Option<(&'static str, &'static str)> {
    if argv.len() > 1 && argv[1] == "buildx" && kind == EngineKind::Docker {
        Some(("DOCKER_CLI_EXPERIMENTAL", "enabled"))
    } else {
        None
    }
}

fn strip_one_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Execution {
        Execution::new(
            vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()],
            EngineKind::Docker,
        )
    }

    #[tokio::test]
    async fn captures_stdout_and_strips_one_newline() {
        let out = sh("printf 'hello\\n'").run().await.unwrap();
        assert_eq!(out.stdout, "hello");
    }

    #[tokio::test]
    async fn inner_newlines_survive() {
        let out = sh("printf 'a\\nb\\n'").run().await.unwrap();
        assert_eq!(out.stdout, "a\nb");
    }

    #[tokio::test]
    async fn captures_stderr_separately() {
        let out = sh("echo out; echo err >&2").run().await.unwrap();
        assert_eq!(out.stdout, "out");
        assert_eq!(out.stderr, "err");
    }

    #[tokio::test]
    async fn stdin_is_fed_to_eof() {
        let out = sh("cat").stdin(b"fed through stdin".to_vec()).run().await.unwrap();
        assert_eq!(out.stdout, "fed through stdin");
    }

    #[tokio::test]
    async fn env_overlay_wins_over_ambient() {
        // The test process itself has PATH set; the overlay must win.
        let out = sh("printf '%s' \"$GANTRY_TEST_VAR\"")
            .env([("GANTRY_TEST_VAR", "overlaid")])
            .run()
            .await
            .unwrap();
        assert_eq!(out.stdout, "overlaid");
    }

    #[tokio::test]
    async fn ambient_environment_is_inherited() {
        let out = sh("test -n \"$PATH\" && echo ok").run().await.unwrap();
        assert_eq!(out.stdout, "ok");
    }

    #[tokio::test]
    async fn nonzero_exit_raises_with_captured_streams() {
        let err = sh("echo partial; echo boom >&2; exit 3").run().await.unwrap_err();
        let failure = err.failure().expect("engine failure");
        assert_eq!(failure.exit_code, 3);
        assert_eq!(failure.stdout.as_deref(), Some("partial"));
        assert_eq!(failure.stderr.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn classification_runs_on_stderr() {
        let err = sh("echo 'Error: No such container: dodo' >&2; exit 1")
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoSuchContainer(_)));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let err = Execution::new(
            vec!["/definitely/not/a/binary".to_string()],
            EngineKind::Docker,
        )
        .run()
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Spawn(_)));
    }

    #[tokio::test]
    async fn empty_argv_is_invalid_input() {
        let err = Execution::new(Vec::new(), EngineKind::Docker).run().await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn password_never_reaches_the_error_message() {
        let err = Execution::new(
            vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                "exit 1".to_string(),
                "--password".to_string(),
                "s3cr3t".to_string(),
            ],
            EngineKind::Docker,
        )
        .run()
        .await
        .unwrap_err();
        assert!(!err.to_string().contains("s3cr3t"));
    }

    #[test]
    fn buildx_injection_only_applies_to_docker() {
        let argv: Vec<String> = vec!["docker".into(), "buildx".into(), "build".into()];
        assert_eq!(
            buildx_env_injection(&argv, EngineKind::Docker),
            Some(("DOCKER_CLI_EXPERIMENTAL", "enabled"))
        );
        assert_eq!(buildx_env_injection(&argv, EngineKind::Podman), None);

        let plain: Vec<String> = vec!["docker".into(), "ps".into()];
        assert_eq!(buildx_env_injection(&plain, EngineKind::Docker), None);
    }
}
