// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine CLI download into the user cache.
//!
//! The static tarball from `download.docker.com` is fetched once and the
//! client binary is unpacked under a versioned cache path. Nothing touches
//! the system package manager and no daemon is installed.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use gantry_config::{EngineKind, PINNED_CLI_VERSION, cached_cli_path};
use std::path::{Path, PathBuf};
use tracing::info;

const DOWNLOAD_TEMPLATE: &str =
    "https://download.docker.com/{os}/static/stable/{arch}/docker-{version}.tgz";

/// Make sure the cached engine CLI exists, downloading it when absent.
/// Returns the cached binary path.
pub async fn ensure_engine_cli() -> Result<PathBuf> {
    let target = cached_cli_path(EngineKind::Docker);
    if target.is_file() {
        info!(path = %target.display(), "engine CLI already cached");
        return Ok(target);
    }

    let url = download_url()?;
    info!(%url, "downloading engine CLI");
    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("fetch {url}"))?
        .error_for_status()
        .with_context(|| format!("fetch {url}"))?;
    let tarball = response.bytes().await.context("read tarball body")?;

    let unpacked = tokio::task::spawn_blocking({
        let target = target.clone();
        move || unpack_engine_cli(&tarball, &target)
    })
    .await
    .context("unpack task failed")??;

    info!(path = %unpacked.display(), "engine CLI cached");
    Ok(unpacked)
}

/// The tarball URL for this host, or an error for unsupported platforms.
fn download_url() -> Result<String> {
    let os = match std::env::consts::OS {
        "linux" => "linux",
        "macos" => "mac",
        "windows" => anyhow::bail!(
            "no standalone engine CLI tarball is published for Windows; \
             install Docker Desktop instead"
        ),
        other => anyhow::bail!("unsupported operating system: {other}"),
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "x86_64",
        "aarch64" => "aarch64",
        other => anyhow::bail!("unsupported architecture: {other}"),
    };
    Ok(DOWNLOAD_TEMPLATE
        .replace("{os}", os)
        .replace("{arch}", arch)
        .replace("{version}", PINNED_CLI_VERSION))
}

/// Unpack `docker/docker` from the tarball into `target`.
fn unpack_engine_cli(tarball: &[u8], target: &Path) -> Result<PathBuf> {
    let scratch = tempfile::tempdir().context("create scratch dir")?;
    tar::Archive::new(GzDecoder::new(tarball))
        .unpack(scratch.path())
        .context("unpack tarball")?;

    let extracted = scratch.path().join("docker").join("docker");
    if !extracted.is_file() {
        anyhow::bail!("tarball did not contain docker/docker");
    }

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    // A rename can fail across filesystems; copy instead.
    std::fs::copy(&extracted, target)
        .with_context(|| format!("install binary at {}", target.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(target, std::fs::Permissions::from_mode(0o755))
            .context("mark binary executable")?;
    }

    Ok(target.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_url_pins_the_version() {
        if std::env::consts::OS == "windows" {
            return;
        }
        let url = download_url().unwrap();
        assert!(url.starts_with("https://download.docker.com/"));
        assert!(url.ends_with(&format!("docker-{PINNED_CLI_VERSION}.tgz")));
        assert!(!url.contains('{'));
    }

    #[test]
    fn unpack_rejects_a_tarball_without_the_binary() {
        // An empty gzip stream unpacks to nothing.
        let empty = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast())
            .finish()
            .unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let target = scratch.path().join("docker");
        assert!(unpack_engine_cli(&empty, &target).is_err());
    }
}
