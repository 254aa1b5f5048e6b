//! End-to-end dispatch through real interpreters

use coderun_sandbox::{Dispatcher, ErrorKind, ExecutionRequest, SandboxConfig, MISSING_FIELDS};
use coderun_tests::common::{artifact_count, dispatcher, dispatcher_with_timeout, setup_test_logging};
use coderun_tests::require_interpreter;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_python_hello() {
    setup_test_logging();
    require_interpreter!("python3");
    let tmp = tempfile::tempdir().unwrap();

    let result = dispatcher(tmp.path())
        .execute(ExecutionRequest::new("print(\"Hello Python\")", "python").with_identity("u42"))
        .await;

    assert!(result.success, "{:?}", result);
    assert_eq!(result.output, "Hello Python\n");
    assert_eq!(result.language, "python");
    assert_eq!(result.exit_code, Some(0));
    assert_eq!(artifact_count(tmp.path()), 0);
}

#[tokio::test]
async fn test_javascript_hello() {
    setup_test_logging();
    require_interpreter!("node");
    let tmp = tempfile::tempdir().unwrap();

    let result = dispatcher(tmp.path())
        .execute(ExecutionRequest::new("console.log(\"Hello World\")", "javascript"))
        .await;

    assert!(result.success, "{:?}", result);
    assert_eq!(result.output, "Hello World\n");
    assert_eq!(artifact_count(tmp.path()), 0);
}

#[tokio::test]
async fn test_empty_javascript_is_invalid() {
    setup_test_logging();
    let tmp = tempfile::tempdir().unwrap();
    let work = tmp.path().join("work");

    let result = dispatcher(&work)
        .execute(ExecutionRequest::new("", "javascript"))
        .await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::InvalidRequest));
    assert_eq!(result.error_detail.as_deref(), Some(MISSING_FIELDS));
    assert!(!work.exists());
}

#[tokio::test]
async fn test_unsupported_language_creates_nothing() {
    setup_test_logging();
    let tmp = tempfile::tempdir().unwrap();
    let work = tmp.path().join("work");

    let result = dispatcher(&work)
        .execute(ExecutionRequest::new("puts 'hi'", "ruby"))
        .await;

    assert_eq!(result.error_kind, Some(ErrorKind::InvalidRequest));
    assert_eq!(
        result.error_detail.as_deref(),
        Some("Unsupported language 'ruby'. Supported languages: javascript, python, shell")
    );
    assert_eq!(artifact_count(&work), 0);
}

#[tokio::test]
async fn test_shell_requires_configuration() {
    setup_test_logging();
    let tmp = tempfile::tempdir().unwrap();
    let config = SandboxConfig {
        work_dir: tmp.path().join("work"),
        ..SandboxConfig::default()
    };

    let result = Dispatcher::new(config)
        .unwrap()
        .execute(ExecutionRequest::new("echo hi", "shell"))
        .await;

    assert_eq!(result.error_kind, Some(ErrorKind::InvalidRequest));
    assert_eq!(
        result.error_detail.as_deref(),
        Some("Unsupported language 'shell'. Supported languages: javascript, python")
    );
    assert!(!tmp.path().join("work").exists());
}

#[tokio::test]
async fn test_language_tags_are_case_sensitive() {
    setup_test_logging();
    let tmp = tempfile::tempdir().unwrap();

    let result = dispatcher(tmp.path())
        .execute(ExecutionRequest::new("print(1)", "Python"))
        .await;

    assert_eq!(result.error_kind, Some(ErrorKind::InvalidRequest));
    assert_eq!(result.language, "Python");
}

#[tokio::test]
async fn test_python_stderr_is_runtime_error() {
    setup_test_logging();
    require_interpreter!("python3");
    let tmp = tempfile::tempdir().unwrap();

    let code = "import sys\nprint('partial')\nsys.stderr.write('bad thing happened\\n')\nsys.exit(2)\n";
    let result = dispatcher(tmp.path())
        .execute(ExecutionRequest::new(code, "python"))
        .await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::RuntimeError));
    assert_eq!(result.exit_code, Some(2));
    assert_eq!(result.error_detail.as_deref(), Some("bad thing happened\n"));
    assert_eq!(artifact_count(tmp.path()), 0);
}

#[tokio::test]
async fn test_python_exception_detail() {
    setup_test_logging();
    require_interpreter!("python3");
    let tmp = tempfile::tempdir().unwrap();

    let result = dispatcher(tmp.path())
        .execute(ExecutionRequest::new("1 / 0", "python"))
        .await;

    assert_eq!(result.error_kind, Some(ErrorKind::RuntimeError));
    assert!(result
        .error_detail
        .unwrap()
        .contains("ZeroDivisionError"));
}

#[tokio::test]
async fn test_javascript_infinite_loop_times_out() {
    setup_test_logging();
    require_interpreter!("node");
    let tmp = tempfile::tempdir().unwrap();

    let start = Instant::now();
    let result = dispatcher(tmp.path())
        .execute(ExecutionRequest::new("while(true){}", "javascript"))
        .await;
    let elapsed = start.elapsed();

    assert_eq!(result.error_kind, Some(ErrorKind::Timeout));
    assert_eq!(
        result.error_detail.as_deref(),
        Some("Code execution timed out after 5s")
    );
    assert!(elapsed >= Duration::from_secs(5), "{:?}", elapsed);
    assert!(elapsed < Duration::from_secs(8), "{:?}", elapsed);
    assert_eq!(artifact_count(tmp.path()), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_shell_timeout_uses_configured_deadline() {
    setup_test_logging();
    let tmp = tempfile::tempdir().unwrap();

    let start = Instant::now();
    let result = dispatcher_with_timeout(tmp.path(), Duration::from_millis(300))
        .execute(ExecutionRequest::new("while :; do :; done", "shell"))
        .await;

    assert_eq!(result.error_kind, Some(ErrorKind::Timeout));
    assert_eq!(
        result.error_detail.as_deref(),
        Some("Code execution timed out after 0.3s")
    );
    assert!(start.elapsed() < Duration::from_secs(3));
    assert_eq!(artifact_count(tmp.path()), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_silent_program_reports_no_output() {
    setup_test_logging();
    let tmp = tempfile::tempdir().unwrap();

    let result = dispatcher(tmp.path())
        .execute(ExecutionRequest::new(": nothing to say", "shell"))
        .await;

    assert!(result.success);
    assert_eq!(result.output, coderun_sandbox::NO_OUTPUT);
}

#[cfg(unix)]
#[tokio::test]
async fn test_result_json_shape() {
    setup_test_logging();
    let tmp = tempfile::tempdir().unwrap();

    let result = dispatcher(tmp.path())
        .execute(ExecutionRequest::new("echo fail >&2; exit 1", "shell"))
        .await;
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["success"], false);
    assert_eq!(value["language"], "shell");
    assert_eq!(value["errorKind"], "RuntimeError");
    assert_eq!(value["errorDetail"], "fail\n");
    assert!(value.get("output").is_none());
}
