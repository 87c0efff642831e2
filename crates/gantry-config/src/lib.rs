// SPDX-License-Identifier: MIT OR Apache-2.0
//! gantry-config
//!
//! Per-client configuration: which engine to drive, the global flags that
//! prefix every invocation, compose project settings, and memoized
//! resolution of the engine binary path.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use gantry_error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

/// Engine CLI version fetched by `gantry download-cli` and looked up in the
/// download cache during binary resolution.
pub const PINNED_CLI_VERSION: &str = "19.03.12";

/// Default inspect-cache validity: short enough to observe state changes
/// across operations, long enough to collapse an attribute burst into one
/// inspect call.
pub const DEFAULT_CACHE_VALIDITY: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// EngineKind
// ---------------------------------------------------------------------------

/// Which engine CLI this client drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// The `docker` CLI.
    #[default]
    Docker,
    /// The `podman` CLI.
    Podman,
}

impl EngineKind {
    /// The binary name looked up on `$PATH`.
    pub fn binary_name(&self) -> &'static str {
        match self {
            EngineKind::Docker => "docker",
            EngineKind::Podman => "podman",
        }
    }
}

// ---------------------------------------------------------------------------
// ClientOpts
// ---------------------------------------------------------------------------

/// Everything a client can be configured with. Immutable once the
/// [`ClientConfig`] is built from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOpts {
    /// Engine to drive.
    pub kind: EngineKind,
    /// Explicit binary path, bypassing `$PATH` and the download cache.
    pub binary_path: Option<PathBuf>,
    /// Location of client config files (`--config`).
    pub config_dir: Option<PathBuf>,
    /// Context name (`--context`).
    pub context: Option<String>,
    /// Enable engine debug mode (`--debug`).
    pub debug: bool,
    /// Daemon socket to connect to (`--host`).
    pub host: Option<String>,
    /// Engine logging level (`--log-level`).
    pub log_level: Option<String>,
    /// Use TLS (`--tls`); implied by `tlsverify`.
    pub tls: bool,
    /// CA certificate path (`--tlscacert`).
    pub tlscacert: Option<PathBuf>,
    /// Client certificate path (`--tlscert`).
    pub tlscert: Option<PathBuf>,
    /// Client key path (`--tlskey`).
    pub tlskey: Option<PathBuf>,
    /// Verify the remote (`--tlsverify`).
    pub tlsverify: bool,
    /// Compose files, in order (`--file` per entry).
    pub compose_files: Vec<PathBuf>,
    /// Compose env files, in order (`--env-file` per entry).
    pub compose_env_files: Vec<PathBuf>,
    /// Compose project name (`--project-name`).
    pub compose_project_name: Option<String>,
    /// Extra global flags appended verbatim after the generated ones.
    pub extra_global_args: Vec<String>,
    /// Inspect-cache validity window for entities owned by this client.
    pub cache_validity: Duration,
}

impl Default for ClientOpts {
    fn default() -> Self {
        Self {
            kind: EngineKind::default(),
            binary_path: None,
            config_dir: None,
            context: None,
            debug: false,
            host: None,
            log_level: None,
            tls: false,
            tlscacert: None,
            tlscert: None,
            tlskey: None,
            tlsverify: false,
            compose_files: Vec::new(),
            compose_env_files: Vec::new(),
            compose_project_name: None,
            extra_global_args: Vec::new(),
            cache_validity: DEFAULT_CACHE_VALIDITY,
        }
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Shared, immutable client configuration.
///
/// Cloning is cheap (the options live behind an `Arc`) and every clone keeps
/// sharing the memoized binary path. Two configs compare equal when their
/// options do, which is the "same logical client" relation used by entity
/// equality.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    opts: ClientOpts,
    binary: OnceCell<PathBuf>,
}

impl PartialEq for ClientConfig {
    fn eq(&self, other: &Self) -> bool {
        self.inner.opts == other.inner.opts
    }
}

impl Eq for ClientConfig {}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(ClientOpts::default())
    }
}

impl ClientConfig {
    /// Build a config from options.
    pub fn new(opts: ClientOpts) -> Self {
        Self {
            inner: Arc::new(Inner {
                opts,
                binary: OnceCell::new(),
            }),
        }
    }

    /// The options this config was built from.
    pub fn opts(&self) -> &ClientOpts {
        &self.inner.opts
    }

    /// Engine being driven.
    pub fn kind(&self) -> EngineKind {
        self.inner.opts.kind
    }

    /// The inspect-cache validity window.
    pub fn cache_validity(&self) -> Duration {
        self.inner.opts.cache_validity
    }

    /// Resolve the engine binary.
    ///
    /// Order: explicit path, then `$PATH`, then the download cache. The
    /// result is memoized under a single-flight discipline: concurrent
    /// resolvers race but agree.
    pub async fn binary_path(&self) -> Result<PathBuf> {
        self.inner
            .binary
            .get_or_try_init(|| async { resolve_binary(&self.inner.opts) })
            .await
            .cloned()
    }

    /// The argv fragment prepended to every engine invocation:
    /// `[binary, <global flags>]`.
    pub async fn command_prefix(&self) -> Result<Vec<String>> {
        let binary = self.binary_path().await?;
        let opts = &self.inner.opts;
        let mut prefix = vec![binary.display().to_string()];

        if let Some(config_dir) = &opts.config_dir {
            prefix.push("--config".into());
            prefix.push(config_dir.display().to_string());
        }
        if let Some(context) = &opts.context {
            prefix.push("--context".into());
            prefix.push(context.clone());
        }
        if opts.debug {
            prefix.push("--debug".into());
        }
        if let Some(host) = &opts.host {
            prefix.push("--host".into());
            prefix.push(host.clone());
        }
        if let Some(level) = &opts.log_level {
            prefix.push("--log-level".into());
            prefix.push(level.clone());
        }
        if opts.tls {
            prefix.push("--tls".into());
        }
        if let Some(path) = &opts.tlscacert {
            prefix.push("--tlscacert".into());
            prefix.push(path.display().to_string());
        }
        if let Some(path) = &opts.tlscert {
            prefix.push("--tlscert".into());
            prefix.push(path.display().to_string());
        }
        if let Some(path) = &opts.tlskey {
            prefix.push("--tlskey".into());
            prefix.push(path.display().to_string());
        }
        if opts.tlsverify {
            prefix.push("--tlsverify".into());
        }
        prefix.extend(opts.extra_global_args.iter().cloned());
        Ok(prefix)
    }

    /// The argv fragment prepended to every compose invocation: the client
    /// prefix, `compose`, then the configured files, env files and project
    /// name.
    pub async fn compose_prefix(&self) -> Result<Vec<String>> {
        let mut prefix = self.command_prefix().await?;
        let opts = &self.inner.opts;
        prefix.push("compose".into());
        for file in &opts.compose_files {
            prefix.push("--file".into());
            prefix.push(file.display().to_string());
        }
        for env_file in &opts.compose_env_files {
            prefix.push("--env-file".into());
            prefix.push(env_file.display().to_string());
        }
        if let Some(name) = &opts.compose_project_name {
            prefix.push("--project-name".into());
            prefix.push(name.clone());
        }
        Ok(prefix)
    }
}

fn resolve_binary(opts: &ClientOpts) -> Result<PathBuf> {
    if let Some(path) = &opts.binary_path {
        return Ok(path.clone());
    }
    let name = opts.kind.binary_name();
    if let Some(found) = find_in_path(name) {
        debug!(binary = %found.display(), "resolved engine binary from PATH");
        return Ok(found);
    }
    let cached = cached_cli_path(opts.kind);
    if cached.is_file() {
        debug!(binary = %cached.display(), "resolved engine binary from download cache");
        return Ok(cached);
    }
    Err(Error::InvalidInput(format!(
        "the {name} client binary was not found on this system; install it, \
         point ClientOpts::binary_path at it, or run `gantry download-cli`"
    )))
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Where `gantry download-cli` places the engine binary for `kind`.
pub fn cached_cli_path(kind: EngineKind) -> PathBuf {
    let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("gantry")
        .join(format!("{}-cli", kind.binary_name()))
        .join(PINNED_CLI_VERSION)
        .join(kind.binary_name())
}

// ---------------------------------------------------------------------------
// Env files
// ---------------------------------------------------------------------------

/// Parse a `.env`-style file: `KEY=value` lines, `#` comments, blanks
/// skipped.
pub fn read_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let text = std::fs::read_to_string(path)?;
    let mut result = BTreeMap::new();
    for raw_line in text.lines() {
        let mut line = raw_line.trim();
        if let Some(sharp) = line.find('#') {
            line = line[..sharp].trim();
        }
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(Error::InvalidInput(format!(
                "malformed line in env file {}: {raw_line:?}",
                path.display()
            )));
        };
        result.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(result)
}

/// Merge several env files in order; later files win.
pub fn read_env_files(paths: &[PathBuf]) -> Result<BTreeMap<String, String>> {
    let mut merged = BTreeMap::new();
    for path in paths {
        merged.extend(read_env_file(path)?);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn opts_with_binary() -> ClientOpts {
        ClientOpts {
            binary_path: Some(PathBuf::from("/usr/bin/docker")),
            ..ClientOpts::default()
        }
    }

    #[tokio::test]
    async fn prefix_is_just_binary_by_default() {
        let config = ClientConfig::new(opts_with_binary());
        assert_eq!(config.command_prefix().await.unwrap(), ["/usr/bin/docker"]);
    }

    #[tokio::test]
    async fn prefix_contains_global_flags_in_canonical_order() {
        let config = ClientConfig::new(ClientOpts {
            context: Some("remote".into()),
            debug: true,
            host: Some("ssh://user@host".into()),
            log_level: Some("warn".into()),
            tls: true,
            tlsverify: true,
            ..opts_with_binary()
        });
        assert_eq!(
            config.command_prefix().await.unwrap(),
            [
                "/usr/bin/docker",
                "--context",
                "remote",
                "--debug",
                "--host",
                "ssh://user@host",
                "--log-level",
                "warn",
                "--tls",
                "--tlsverify",
            ]
        );
    }

    #[tokio::test]
    async fn extra_global_args_come_last() {
        let config = ClientConfig::new(ClientOpts {
            extra_global_args: vec!["--experimental".into()],
            ..opts_with_binary()
        });
        let prefix = config.command_prefix().await.unwrap();
        assert_eq!(prefix.last().unwrap(), "--experimental");
    }

    #[tokio::test]
    async fn compose_prefix_lists_files_then_env_files_then_project() {
        let config = ClientConfig::new(ClientOpts {
            compose_files: vec!["a.yml".into(), "b.yml".into()],
            compose_env_files: vec![".env".into()],
            compose_project_name: Some("demo".into()),
            ..opts_with_binary()
        });
        assert_eq!(
            config.compose_prefix().await.unwrap(),
            [
                "/usr/bin/docker",
                "compose",
                "--file",
                "a.yml",
                "--file",
                "b.yml",
                "--env-file",
                ".env",
                "--project-name",
                "demo",
            ]
        );
    }

    #[tokio::test]
    async fn explicit_binary_path_wins() {
        let config = ClientConfig::new(ClientOpts {
            binary_path: Some(PathBuf::from("/opt/engine/docker")),
            ..ClientOpts::default()
        });
        assert_eq!(
            config.binary_path().await.unwrap(),
            PathBuf::from("/opt/engine/docker")
        );
    }

    #[tokio::test]
    async fn binary_resolution_is_memoized_across_clones() {
        let config = ClientConfig::new(opts_with_binary());
        let clone = config.clone();
        let first = config.binary_path().await.unwrap();
        let second = clone.binary_path().await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn equality_is_by_options() {
        let a = ClientConfig::new(opts_with_binary());
        let b = ClientConfig::new(opts_with_binary());
        let c = ClientConfig::new(ClientOpts {
            context: Some("other".into()),
            ..opts_with_binary()
        });
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn engine_kind_binary_names() {
        assert_eq!(EngineKind::Docker.binary_name(), "docker");
        assert_eq!(EngineKind::Podman.binary_name(), "podman");
    }

    #[test]
    fn env_file_parsing_skips_comments_and_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# leading comment").unwrap();
        writeln!(file, "FOO=bar").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "BAZ=qux # trailing comment").unwrap();
        let parsed = read_env_file(file.path()).unwrap();
        assert_eq!(parsed["FOO"], "bar");
        assert_eq!(parsed["BAZ"], "qux");
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn env_file_rejects_lines_without_equals() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "NOT A PAIR").unwrap();
        assert!(read_env_file(file.path()).is_err());
    }

    #[test]
    fn env_files_merge_with_later_files_winning() {
        let mut first = tempfile::NamedTempFile::new().unwrap();
        writeln!(first, "A=1\nB=1").unwrap();
        let mut second = tempfile::NamedTempFile::new().unwrap();
        writeln!(second, "B=2").unwrap();
        let merged = read_env_files(&[
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ])
        .unwrap();
        assert_eq!(merged["A"], "1");
        assert_eq!(merged["B"], "2");
    }
}
