//! Tests for the steamcmd process supervisor against a fake steamcmd script
//!
//! These tests verify that a launched batch:
//! - passes the whole batch as one argument list
//! - merges stdout and stderr into one line stream
//! - fails reads with a timeout error when the child goes silent
//! - kills the child when the process handle is dropped early

#![cfg(unix)]

mod common;

use common::{retry_text_busy, write_fake_steamcmd};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use workshop_dl::steamcmd::{Credentials, FetchBatch, LineSource, SteamCmd, SteamCmdProcess};
use workshop_dl::{Error, Mod, ModList};

fn batch() -> FetchBatch {
    let mods = ModList::new(vec![
        Mod::new("ace", "463939057"),
        Mod::new("cba_a3", "711159033"),
    ])
    .unwrap();
    FetchBatch::new(Credentials::new("operator", "hunter2"), 107410, &mods)
}

async fn launch(steamcmd: &SteamCmd) -> SteamCmdProcess {
    let batch = &batch();
    retry_text_busy(|| async move { steamcmd.launch(batch) })
        .await
        .unwrap()
}

async fn drain(process: &mut SteamCmdProcess) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(line) = process.next_line().await.unwrap() {
        lines.push(line);
    }
    lines
}

#[tokio::test]
async fn batch_is_passed_as_one_argument_list() {
    let tmp = TempDir::new().unwrap();
    let args_file = tmp.path().join("args.txt");
    let script = write_fake_steamcmd(
        tmp.path(),
        &format!("printf '%s\\n' \"$@\" > '{}'", args_file.display()),
    );

    let mut process = launch(&SteamCmd::new(script)).await;
    drain(&mut process).await;
    assert!(process.finish().await.unwrap().success());

    let recorded = std::fs::read_to_string(&args_file).unwrap();
    let recorded: Vec<&str> = recorded.lines().collect();
    assert_eq!(
        recorded,
        vec![
            "+login",
            "operator",
            "hunter2",
            "+workshop_download_item",
            "107410",
            "463939057",
            "+workshop_download_item",
            "107410",
            "711159033",
            "+quit",
        ]
    );
}

#[tokio::test]
async fn stdout_and_stderr_are_merged() {
    let tmp = TempDir::new().unwrap();
    let script = write_fake_steamcmd(
        tmp.path(),
        "echo 'Loading Steam API...OK'\n\
         echo 'ERROR! Download item 463939057 failed (Failure).' >&2\n\
         printf 'Success. Downloaded item 711159033\\r\\n'",
    );

    let mut process = launch(&SteamCmd::new(script)).await;
    let mut lines = drain(&mut process).await;
    process.finish().await.unwrap();

    // pipes are read concurrently, so only the set of lines is fixed
    lines.sort();
    assert_eq!(
        lines,
        vec![
            "ERROR! Download item 463939057 failed (Failure).",
            "Loading Steam API...OK",
            "Success. Downloaded item 711159033",
        ]
    );
    assert_eq!(process.lines_read(), 3);
}

#[tokio::test]
async fn silent_child_times_out() {
    let tmp = TempDir::new().unwrap();
    let script = write_fake_steamcmd(tmp.path(), "echo 'Redirecting stderr'\nsleep 30");
    let steamcmd = SteamCmd::new(script).with_read_timeout(Some(Duration::from_millis(300)));

    let mut process = launch(&steamcmd).await;
    assert_eq!(
        process.next_line().await.unwrap().as_deref(),
        Some("Redirecting stderr")
    );

    let started = Instant::now();
    match process.next_line().await {
        Err(Error::ProcessTimeout { timeout }) => {
            assert_eq!(timeout, Duration::from_millis(300));
        }
        other => panic!("expected ProcessTimeout, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn dropping_the_process_kills_the_child() {
    let tmp = TempDir::new().unwrap();
    let marker = tmp.path().join("finished");
    let script = write_fake_steamcmd(
        tmp.path(),
        &format!("echo ready\nsleep 2\ntouch '{}'", marker.display()),
    );

    let mut process = launch(&SteamCmd::new(script)).await;
    assert_eq!(process.next_line().await.unwrap().as_deref(), Some("ready"));
    drop(process);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!marker.exists(), "child kept running after the handle was dropped");
}
