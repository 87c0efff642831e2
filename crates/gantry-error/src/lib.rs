// SPDX-License-Identifier: MIT OR Apache-2.0
//! gantry-error
//!
//! Error taxonomy for the Gantry engine client. Every nonzero engine exit
//! becomes a [`CommandFailure`]; [`classify`] upgrades it to a specific
//! error kind when the stderr text identifies one. Argv is redacted before
//! it is stored anywhere, so secrets never reach an error message or a log
//! line.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::fmt;
use std::io::Write;
use std::path::PathBuf;

/// Flags whose following token is masked in every stored or displayed argv.
pub const PARAMETER_BLACKLIST: &[&str] = &["--password"];

/// Replacement for masked tokens.
const MASK: &str = "***";

// ---------------------------------------------------------------------------
// CommandFailure
// ---------------------------------------------------------------------------

/// A nonzero engine exit: the redacted argv, the exit code, and whatever
/// output was captured.
///
/// `stdout`/`stderr` are `None` when the corresponding stream was inherited
/// by the caller's terminal instead of being captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    /// The argv that was executed, with blacklisted values masked.
    pub argv: Vec<String>,
    /// The child's exit code (`-1` when terminated by a signal).
    pub exit_code: i32,
    /// Captured stdout, if the stream was captured.
    pub stdout: Option<String>,
    /// Captured stderr, if the stream was captured.
    pub stderr: Option<String>,
}

impl CommandFailure {
    /// Build a failure record, redacting `argv` on the way in.
    pub fn new(
        argv: &[String],
        exit_code: i32,
        stdout: Option<String>,
        stderr: Option<String>,
    ) -> Self {
        Self {
            argv: redact_argv(argv),
            exit_code,
            stdout,
            stderr,
        }
    }

    /// The stderr text used for classification, empty when not captured.
    pub fn stderr_text(&self) -> &str {
        self.stderr.as_deref().unwrap_or("")
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "the command `{}` returned with code {}",
            self.argv.join(" "),
            self.exit_code
        )?;
        match &self.stdout {
            Some(out) => writeln!(f, "stdout: {out}")?,
            None => writeln!(f, "stdout was not captured (streamed to the terminal)")?,
        }
        match &self.stderr {
            Some(err) => write!(f, "stderr: {err}"),
            None => write!(f, "stderr was not captured (streamed to the terminal)"),
        }
    }
}

/// Mask the token following any blacklisted flag.
pub fn redact_argv(argv: &[String]) -> Vec<String> {
    let mut out: Vec<String> = argv.to_vec();
    let mut i = 0;
    while i < out.len() {
        if PARAMETER_BLACKLIST.contains(&out[i].as_str()) && i + 1 < out.len() {
            out[i + 1] = MASK.to_string();
            i += 1;
        }
        i += 1;
    }
    out
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Every way a Gantry operation can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine reported that a container does not exist.
    #[error("no such container: {0}")]
    NoSuchContainer(CommandFailure),

    /// The engine reported that an image does not exist.
    #[error("no such image: {0}")]
    NoSuchImage(CommandFailure),

    /// The engine reported that a volume does not exist.
    #[error("no such volume: {0}")]
    NoSuchVolume(CommandFailure),

    /// The engine reported that a swarm service does not exist.
    #[error("no such service: {0}")]
    NoSuchService(CommandFailure),

    /// The engine reported that a pod does not exist.
    #[error("no such pod: {0}")]
    NoSuchPod(CommandFailure),

    /// The operation requires a swarm manager and this node is not one.
    #[error("this node is not a swarm manager: {0}")]
    NotASwarmManager(CommandFailure),

    /// Nonzero exit with no more specific classification.
    #[error("{0}")]
    CommandFailed(CommandFailure),

    /// The caller violated a stated precondition; raised before any
    /// subprocess is spawned.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The engine produced output the parser cannot map. The offending
    /// payload is saved to `payload_path` for bug reports.
    #[error("could not parse engine output ({reason}); offending payload saved to {payload_path}")]
    ParseFailure {
        /// Why parsing failed.
        reason: String,
        /// Where the raw payload was written.
        payload_path: PathBuf,
    },

    /// The operation is deliberately unimplemented.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    /// The engine binary could not be located or executed.
    #[error("failed to run the engine binary: {0}")]
    Spawn(#[source] std::io::Error),

    /// Reading from or writing to the child's stdio failed.
    #[error("engine i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Captured output was not valid UTF-8.
    #[error("engine output was not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Access the underlying [`CommandFailure`], for the variants that
    /// carry one.
    pub fn failure(&self) -> Option<&CommandFailure> {
        match self {
            Error::NoSuchContainer(f)
            | Error::NoSuchImage(f)
            | Error::NoSuchVolume(f)
            | Error::NoSuchService(f)
            | Error::NoSuchPod(f)
            | Error::NotASwarmManager(f)
            | Error::CommandFailed(f) => Some(f),
            _ => None,
        }
    }

    /// Build a [`Error::ParseFailure`], dumping `payload` to a temp file
    /// whose path is kept in the error for bug reports.
    pub fn parse_failure(reason: impl Into<String>, payload: &str) -> Self {
        let reason = reason.into();
        let payload_path = dump_payload(payload).unwrap_or_else(|_| PathBuf::from("<unwritable>"));
        Error::ParseFailure {
            reason,
            payload_path,
        }
    }
}

fn dump_payload(payload: &str) -> std::io::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("gantry-payload-")
        .suffix(".json")
        .tempfile()?;
    file.write_all(payload.as_bytes())?;
    let (_file, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Map a failure to its specific error kind from the stderr text.
///
/// Patterns are compared case-insensitively and tried most-specific first;
/// the first match wins, and an unmatched failure stays the generic
/// [`Error::CommandFailed`].
pub fn classify(failure: CommandFailure) -> Error {
    let stderr = failure.stderr_text().to_ascii_lowercase();

    if stderr.contains("no such container") {
        return Error::NoSuchContainer(failure);
    }
    if stderr.contains("no such image") {
        return Error::NoSuchImage(failure);
    }
    if stderr.contains("no such volume") {
        return Error::NoSuchVolume(failure);
    }
    if stderr.contains("no such service")
        || (stderr.contains("service") && stderr.contains("not found"))
    {
        return Error::NoSuchService(failure);
    }
    if stderr.contains("no such pod") || stderr.contains("no pod with name or id") {
        return Error::NoSuchPod(failure);
    }
    if stderr.contains("this node is not a swarm manager") {
        return Error::NotASwarmManager(failure);
    }
    Error::CommandFailed(failure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    fn failure_with_stderr(stderr: &str) -> CommandFailure {
        CommandFailure::new(&argv(&["docker", "inspect", "x"]), 1, None, Some(stderr.into()))
    }

    #[test]
    fn redacts_password_value() {
        let argv = argv(&["docker", "login", "--username", "bob", "--password", "hunter2"]);
        let redacted = redact_argv(&argv);
        assert_eq!(redacted[5], "***");
        assert!(!redacted.contains(&"hunter2".to_string()));
    }

    #[test]
    fn redaction_ignores_trailing_flag() {
        let argv = argv(&["docker", "login", "--password"]);
        assert_eq!(redact_argv(&argv), argv);
    }

    #[test]
    fn failure_stores_redacted_argv() {
        let f = CommandFailure::new(
            &argv(&["docker", "login", "--password", "secret"]),
            1,
            None,
            None,
        );
        assert!(!f.argv.contains(&"secret".to_string()));
        assert!(!f.to_string().contains("secret"));
    }

    #[test]
    fn display_notes_uncaptured_streams() {
        let f = CommandFailure::new(&argv(&["docker", "run"]), 125, None, None);
        let text = f.to_string();
        assert!(text.contains("stdout was not captured"));
        assert!(text.contains("stderr was not captured"));
    }

    #[test]
    fn classify_no_such_container() {
        let err = classify(failure_with_stderr(
            "Error response from daemon: No such container: dodo",
        ));
        assert!(matches!(err, Error::NoSuchContainer(_)));
    }

    #[test]
    fn classify_no_such_image_case_insensitive() {
        let err = classify(failure_with_stderr("Error: No Such Image: busybox:42"));
        assert!(matches!(err, Error::NoSuchImage(_)));
    }

    #[test]
    fn classify_no_such_volume() {
        let err = classify(failure_with_stderr("Error: no such volume: vol1"));
        assert!(matches!(err, Error::NoSuchVolume(_)));
    }

    #[test]
    fn classify_service_not_found() {
        let err = classify(failure_with_stderr("service dodo not found"));
        assert!(matches!(err, Error::NoSuchService(_)));
    }

    #[test]
    fn classify_no_such_pod() {
        let err = classify(failure_with_stderr(
            "Error: no pod with name or ID dodo found: no such pod",
        ));
        assert!(matches!(err, Error::NoSuchPod(_)));
    }

    #[test]
    fn classify_not_a_swarm_manager() {
        let err = classify(failure_with_stderr(
            "Error response from daemon: This node is not a swarm manager.",
        ));
        assert!(matches!(err, Error::NotASwarmManager(_)));
    }

    #[test]
    fn classify_falls_back_to_generic() {
        let err = classify(failure_with_stderr("some unrelated explosion"));
        assert!(matches!(err, Error::CommandFailed(_)));
    }

    #[test]
    fn classify_without_captured_stderr_is_generic() {
        let f = CommandFailure::new(&argv(&["docker", "run"]), 1, None, None);
        assert!(matches!(classify(f), Error::CommandFailed(_)));
    }

    #[test]
    fn parse_failure_dumps_payload() {
        let err = Error::parse_failure("unexpected shape", "{\"weird\": true}");
        match err {
            Error::ParseFailure { payload_path, .. } => {
                let contents = std::fs::read_to_string(&payload_path).unwrap();
                assert_eq!(contents, "{\"weird\": true}");
                let _ = std::fs::remove_file(payload_path);
            }
            other => panic!("expected ParseFailure, got {other:?}"),
        }
    }

    #[test]
    fn failure_accessor_only_on_engine_errors() {
        let engine = classify(failure_with_stderr("boom"));
        assert!(engine.failure().is_some());
        let user = Error::InvalidInput("bad".into());
        assert!(user.failure().is_none());
    }
}
