// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end scenarios against a live engine.
//!
//! These run real `docker` commands and are ignored by default; enable
//! them with `cargo test -- --ignored` on a machine with a daemon.

use gantry_client::{Engine, LogsOpts, PullPolicy, RunOpts, scoped};

fn engine() -> Engine {
    Engine::default()
}

#[tokio::test]
#[ignore = "requires a running docker daemon"]
async fn hello_world_returns_the_greeting() {
    let docker = engine();
    let output = docker
        .container
        .run("hello-world", Vec::<String>::new(), RunOpts::default())
        .await
        .unwrap();
    assert!(output.contains("Hello from Docker!"));
}

#[tokio::test]
#[ignore = "requires a running docker daemon"]
async fn detached_run_kill_and_remove() {
    let docker = engine();
    let container = docker
        .container
        .run_detached("busybox:1", ["sleep", "infinity"], RunOpts::default())
        .await
        .unwrap();

    assert_eq!(container.state().await.unwrap().running, Some(true));

    container.kill(None).await.unwrap();
    assert_eq!(container.state().await.unwrap().running, Some(false));

    let id = container.id().to_string();
    container.remove(true, true).await.unwrap();
    let listed = docker.container.list(true, &[]).await.unwrap();
    assert!(listed.iter().all(|c| c.id() != id));
}

#[tokio::test]
#[ignore = "requires a running docker daemon"]
async fn exec_returns_exactly_the_output() {
    let docker = engine();
    let container = docker
        .container
        .run_detached("busybox:1", ["sleep", "infinity"], RunOpts::default())
        .await
        .unwrap();

    let result = scoped(container, async |ctr| {
        ctr.execute(["echo", "dodo"], Default::default()).await
    })
    .await
    .unwrap();
    assert_eq!(result, "dodo");
}

#[tokio::test]
#[ignore = "requires a running docker daemon"]
async fn diff_reports_added_and_deleted_paths() {
    let docker = engine();
    let container = docker
        .container
        .run_detached("busybox:1", ["sleep", "infinity"], RunOpts::default())
        .await
        .unwrap();

    scoped(container, async |ctr| {
        ctr.execute(["mkdir", "/some_path"], Default::default()).await?;
        ctr.execute(["touch", "/some_file"], Default::default()).await?;
        ctr.execute(["rm", "-rf", "/tmp"], Default::default()).await?;

        let diff = ctr.diff().await?;
        assert_eq!(diff.get("/some_path").map(String::as_str), Some("A"));
        assert_eq!(diff.get("/some_file").map(String::as_str), Some("A"));
        assert_eq!(diff.get("/tmp").map(String::as_str), Some("D"));
        Ok(())
    })
    .await
    .unwrap();
}

#[tokio::test]
#[ignore = "requires a running docker daemon"]
async fn bulk_pull_returns_handles_in_order() {
    let docker = engine();
    let images = docker
        .image
        .pull_many(["busybox:1", "hello-world:latest"], true, None)
        .await
        .unwrap();
    assert_eq!(images.len(), 2);
    assert!(images[0]
        .repo_tags()
        .await
        .unwrap()
        .iter()
        .any(|t| t == "busybox:1"));
    assert!(images[1]
        .repo_tags()
        .await
        .unwrap()
        .iter()
        .any(|t| t == "hello-world:latest"));
}

#[tokio::test]
#[ignore = "requires a running docker daemon"]
async fn bulk_pull_with_a_bogus_image_mentions_it() {
    let docker = engine();
    let err = docker
        .image
        .pull_many(["busybox:1", "hellstuff"], true, None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("hellstuff"));
}

#[tokio::test]
#[ignore = "requires a running docker daemon"]
async fn volume_label_filters_select_exactly() {
    let docker = engine();
    let volume = docker
        .volume
        .create(None, None, &[("dodo", "dada")], &[])
        .await
        .unwrap();

    let hits = docker
        .volume
        .list(&[("label", "dodo=dada")])
        .await
        .unwrap();
    assert!(hits.iter().any(|v| v.name() == volume.name()));

    let misses = docker
        .volume
        .list(&[("label", "dodo=dadu")])
        .await
        .unwrap();
    assert!(misses.iter().all(|v| v.name() != volume.name()));

    volume.remove().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running docker daemon"]
async fn save_then_load_round_trips_tags() {
    let docker = engine();
    docker.image.pull("busybox:1").await.unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let archive = scratch.path().join("busybox.tar");

    docker.image.save(["busybox:1"], &archive).await.unwrap();
    docker.image.remove(["busybox:1"], true, true).await.unwrap();
    let tags = docker.image.load(&archive, true).await.unwrap();
    assert!(tags.iter().any(|t| t == "busybox:1"));
}

#[tokio::test]
#[ignore = "requires a running docker daemon"]
async fn copy_to_then_copy_from_round_trips_bytes() {
    let docker = engine();
    let scratch = tempfile::tempdir().unwrap();
    let original = scratch.path().join("payload.txt");
    std::fs::write(&original, b"some bytes that must survive").unwrap();

    let image = docker
        .image
        .copy_to(
            "busybox:1",
            &original,
            "/payload.txt",
            Some("gantry-copy-roundtrip:latest"),
            PullPolicy::Missing,
        )
        .await
        .unwrap();

    let returned = scratch.path().join("returned.txt");
    docker
        .image
        .copy_from(
            "gantry-copy-roundtrip:latest",
            "/payload.txt",
            &returned,
            PullPolicy::Never,
        )
        .await
        .unwrap();

    assert_eq!(
        std::fs::read(&original).unwrap(),
        std::fs::read(&returned).unwrap()
    );
    image.remove(true, true).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running docker daemon"]
async fn logs_streaming_follows_a_live_container() {
    use tokio_stream::StreamExt;

    let docker = engine();
    let container = docker
        .container
        .run_detached(
            "busybox:1",
            ["sh", "-c", "echo one; echo two; sleep infinity"],
            RunOpts::default(),
        )
        .await
        .unwrap();

    let mut stream = docker
        .container
        .logs_streamed(container.id(), LogsOpts::default())
        .await
        .unwrap();
    let mut lines = Vec::new();
    while let Some(frame) = stream.next().await {
        lines.push(String::from_utf8_lossy(&frame.unwrap().bytes).into_owned());
        if lines.len() == 2 {
            break;
        }
    }
    assert_eq!(lines, ["one\n", "two\n"]);

    container.kill(None).await.unwrap();
    container.remove(true, true).await.unwrap();
}
