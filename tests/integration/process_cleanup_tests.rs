//! Process tree cleanup after timeouts and normal exits
//!
//! These inspect `/proc`, so they only run on Linux.
#![cfg(target_os = "linux")]

use coderun_sandbox::{ErrorKind, ExecutionRequest};
use coderun_tests::common::{
    artifact_count, dispatcher, dispatcher_with_timeout, read_pid, setup_test_logging,
    wait_for_exit,
};
use std::time::Duration;

#[tokio::test]
async fn test_timeout_kills_interpreter_and_children() {
    setup_test_logging();
    let work = tempfile::tempdir().unwrap();
    let pids = tempfile::tempdir().unwrap();
    let parent_file = pids.path().join("parent.pid");
    let child_file = pids.path().join("child.pid");

    let code = format!(
        "echo $$ > '{}'\nsleep 30 &\necho $! > '{}'\nwait\n",
        parent_file.display(),
        child_file.display()
    );
    let result = dispatcher_with_timeout(work.path(), Duration::from_millis(500))
        .execute(ExecutionRequest::new(code, "shell"))
        .await;

    assert_eq!(result.error_kind, Some(ErrorKind::Timeout));
    assert_eq!(artifact_count(work.path()), 0);

    let parent = read_pid(&parent_file).unwrap();
    let child = read_pid(&child_file).unwrap();
    assert!(wait_for_exit(parent, Duration::from_secs(2)).await, "interpreter {parent} survived");
    assert!(wait_for_exit(child, Duration::from_secs(2)).await, "child {child} survived");
}

#[tokio::test]
async fn test_background_children_do_not_outlive_the_call() {
    setup_test_logging();
    let work = tempfile::tempdir().unwrap();
    let pids = tempfile::tempdir().unwrap();
    let child_file = pids.path().join("child.pid");

    // Detached from the output pipes, so the interpreter exits normally
    let code = format!(
        "sleep 30 > /dev/null 2>&1 &\necho $! > '{}'\necho started\n",
        child_file.display()
    );
    let result = dispatcher(work.path())
        .execute(ExecutionRequest::new(code, "shell"))
        .await;

    assert!(result.success, "{:?}", result);
    assert_eq!(result.output, "started\n");

    let child = read_pid(&child_file).unwrap();
    assert!(wait_for_exit(child, Duration::from_secs(2)).await, "child {child} survived");
}

#[tokio::test]
async fn test_grandchild_holding_output_is_killed_with_the_interpreter() {
    setup_test_logging();
    let work = tempfile::tempdir().unwrap();
    let pids = tempfile::tempdir().unwrap();
    let child_file = pids.path().join("child.pid");

    // The background sleep keeps stdout open after the shell exits
    let code = format!(
        "sleep 30 &\necho $! > '{}'\necho early\n",
        child_file.display()
    );
    let start = std::time::Instant::now();
    let result = dispatcher(work.path())
        .execute(ExecutionRequest::new(code, "shell"))
        .await;

    assert!(result.success, "{:?}", result);
    assert_eq!(result.output, "early\n");
    assert!(start.elapsed() < Duration::from_secs(3));
    assert_eq!(artifact_count(work.path()), 0);

    let child = read_pid(&child_file).unwrap();
    assert!(wait_for_exit(child, Duration::from_secs(2)).await, "child {child} survived");
}

#[tokio::test]
async fn test_cancelled_execution_kills_process_tree() {
    setup_test_logging();
    let work = tempfile::tempdir().unwrap();
    let pids = tempfile::tempdir().unwrap();
    let parent_file = pids.path().join("parent.pid");
    let child_file = pids.path().join("child.pid");

    let code = format!(
        "echo $$ > '{parent}.tmp'\nmv '{parent}.tmp' '{parent}'\n\
         sleep 30 &\necho $! > '{child}.tmp'\nmv '{child}.tmp' '{child}'\nwait\n",
        parent = parent_file.display(),
        child = child_file.display()
    );
    let task = tokio::spawn({
        let dispatcher = dispatcher(work.path());
        async move { dispatcher.execute(ExecutionRequest::new(code, "shell")).await }
    });

    for _ in 0..300 {
        if child_file.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(child_file.exists(), "script never started");

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    assert_eq!(artifact_count(work.path()), 0);

    let parent = read_pid(&parent_file).unwrap();
    let child = read_pid(&child_file).unwrap();
    assert!(wait_for_exit(parent, Duration::from_secs(2)).await, "interpreter {parent} survived");
    assert!(wait_for_exit(child, Duration::from_secs(2)).await, "child {child} survived");
}
