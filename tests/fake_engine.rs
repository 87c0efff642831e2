// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests against a scripted stand-in for the engine binary.
//!
//! A tiny shell script plays the role of `docker`: it appends every argv
//! it receives to a log file and prints a canned response. That lets the
//! whole stack — prefix composition, process running, parsing, caching,
//! error classification — run for real without a daemon.

#![cfg(unix)]

use gantry_client::{Container, Engine};
use gantry_config::{ClientConfig, ClientOpts};
use gantry_error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

struct FakeEngine {
    dir: TempDir,
    log: PathBuf,
}

impl FakeEngine {
    /// Install a fake `docker` that logs its argv and runs `body`.
    fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let script = format!(
            "#!/bin/sh\necho \"$@\" >> {}\n{}\n",
            log.display(),
            body
        );
        let binary = dir.path().join("docker");
        std::fs::write(&binary, script).unwrap();

        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

        Self { dir, log }
    }

    fn config(&self, cache_validity: Duration) -> ClientConfig {
        ClientConfig::new(ClientOpts {
            binary_path: Some(self.dir.path().join("docker")),
            cache_validity,
            ..ClientOpts::default()
        })
    }

    fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

const CONTAINER_PAYLOAD: &str = r#"echo '[{"Id": "abc123", "Name": "/dodo", "State": {"Status": "running", "Running": true}, "HostConfig": {"AutoRemove": false}}]'"#;

#[tokio::test]
async fn an_attribute_burst_spawns_a_single_inspect() {
    let fake = FakeEngine::new(CONTAINER_PAYLOAD);
    let config = fake.config(Duration::from_secs(60));

    let container = Container::from_reference(config, "dodo").await.unwrap();
    assert_eq!(container.id(), "abc123");

    // All of these hit the cache primed at construction.
    assert_eq!(container.state().await.unwrap().running, Some(true));
    assert_eq!(container.name().await.unwrap(), "dodo");
    container.host_config().await.unwrap();

    assert_eq!(fake.calls().len(), 1);
}

#[tokio::test]
async fn an_expired_window_triggers_exactly_one_refetch() {
    let fake = FakeEngine::new(CONTAINER_PAYLOAD);
    let config = fake.config(Duration::ZERO);

    let container = Container::from_reference(config, "dodo").await.unwrap();
    container.state().await.unwrap();
    assert_eq!(fake.calls().len(), 2);
}

#[tokio::test]
async fn reload_always_respawns() {
    let fake = FakeEngine::new(CONTAINER_PAYLOAD);
    let config = fake.config(Duration::from_secs(60));

    let container = Container::from_reference(config, "dodo").await.unwrap();
    container.reload().await.unwrap();
    container.reload().await.unwrap();
    assert_eq!(fake.calls().len(), 3);
}

#[tokio::test]
async fn bulk_reload_issues_one_inspect_for_the_whole_batch() {
    let fake = FakeEngine::new(
        r#"echo '[{"Id": "aaa", "Name": "/a"}, {"Id": "bbb", "Name": "/b"}]'"#,
    );
    let config = fake.config(Duration::from_secs(60));

    let first = Container::from_trusted_id(config.clone(), "aaa");
    let second = Container::from_trusted_id(config, "bbb");
    Container::bulk_reload(&[first.clone(), second.clone()]).await.unwrap();

    assert_eq!(fake.calls().len(), 1);
    assert!(fake.calls()[0].contains("container inspect aaa bbb"));

    // Both caches are primed now; attribute reads spawn nothing.
    assert_eq!(first.name().await.unwrap(), "a");
    assert_eq!(second.name().await.unwrap(), "b");
    assert_eq!(fake.calls().len(), 1);
}

#[tokio::test]
async fn trusted_construction_is_free_and_identity_is_stable() {
    let fake = FakeEngine::new(CONTAINER_PAYLOAD);
    let config = fake.config(Duration::from_secs(60));

    let a = Container::from_trusted_id(config.clone(), "abc123");
    let b = Container::from_trusted_id(config, "abc123");
    assert_eq!(a, b);
    assert_eq!(a.to_string(), "abc123");
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn global_flags_prefix_every_invocation() {
    let fake = FakeEngine::new("echo ''");
    let engine = Engine::from_config(ClientConfig::new(ClientOpts {
        binary_path: Some(fake.dir.path().join("docker")),
        context: Some("remote".into()),
        debug: true,
        ..ClientOpts::default()
    }));

    engine.volume.list(&[("label", "dodo=dada")]).await.unwrap();
    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    assert!(
        calls[0].starts_with("--context remote --debug volume list --quiet"),
        "unexpected argv: {}",
        calls[0]
    );
    assert!(calls[0].ends_with("--filter label=dodo=dada"));
}

#[tokio::test]
async fn missing_containers_classify_and_exists_recovers() {
    let fake = FakeEngine::new(
        r#"echo 'Error: No such container: ghost' >&2
exit 1"#,
    );
    let engine = Engine::from_config(fake.config(Duration::from_secs(60)));

    let err = engine.container.inspect("ghost").await.unwrap_err();
    assert!(matches!(err, Error::NoSuchContainer(_)));
    assert!(!engine.container.exists("ghost").await.unwrap());
}

#[tokio::test]
async fn login_failures_never_leak_the_password() {
    let fake = FakeEngine::new("exit 1");
    let engine = Engine::from_config(fake.config(Duration::from_secs(60)));

    let err = engine
        .login(Some("registry.example.com"), Some("bob"), Some("hunter2"))
        .await
        .unwrap_err();
    let rendered = err.to_string();
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("***"));
}
