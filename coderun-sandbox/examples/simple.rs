//! Simple dispatcher example - run a few snippets and print the results

use coderun_sandbox::{Dispatcher, ExecutionRequest, ExecutionResult, SandboxConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let mut config = SandboxConfig::default().with_interpreter("shell", "sh");
    config.work_dir = std::env::temp_dir().join("coderun-example");
    config.limits.timeout = Duration::from_secs(2);
    let dispatcher = Dispatcher::new(config)?;

    println!("=== Dispatcher Example ===\n");
    println!("Runtime: {}", dispatcher.runtime_name());
    println!("Work dir: {}\n", dispatcher.work_dir().display());

    println!("Example 1: Simple echo");
    let request = ExecutionRequest::new("echo 'Hello from coderun!'", "shell");
    print_result(&dispatcher.execute(request).await);

    println!("\nExample 2: Count to 5");
    let request = ExecutionRequest::new("for i in 1 2 3 4 5; do echo $i; done", "shell");
    print_result(&dispatcher.execute(request).await);

    println!("\nExample 3: Long running task with timeout");
    let request = ExecutionRequest::new("sleep 10 && echo 'Done!'", "shell");
    print_result(&dispatcher.execute(request).await);

    println!("\nExample 4: Error to stderr");
    let request = ExecutionRequest::new("echo 'Error message' >&2; exit 1", "shell");
    print_result(&dispatcher.execute(request).await);

    println!("\nExample 5: Python, if installed");
    let request = ExecutionRequest::new("print('Hello Python')", "python");
    print_result(&dispatcher.execute(request).await);

    Ok(())
}

fn print_result(result: &ExecutionResult) {
    if result.success {
        for line in result.output.lines() {
            println!("  stdout: {}", line);
        }
    }
    println!(
        "  Result: success={} exit_code={:?} duration={}ms",
        result.success, result.exit_code, result.duration_ms
    );
    if let (Some(kind), Some(detail)) = (result.error_kind, &result.error_detail) {
        println!("  Error ({}): {}", kind, detail.trim_end());
    }
}
