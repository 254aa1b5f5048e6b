//! CLI command implementations

use anyhow::{Context, Result};
use coderun_sandbox::{Dispatcher, ExecutionRequest, ExecutionResult, LanguageTable};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Execute code from a file or stdin and print the result as JSON
///
/// Exits with 0 when the program succeeded, 1 for any failure kind.
pub async fn execute_run(
    dispatcher: &Dispatcher,
    language: String,
    file: Option<PathBuf>,
    user: String,
) -> Result<ExitCode> {
    let code = read_source(file).await?;
    debug!(bytes = code.len(), %language, "Read source");

    let request = ExecutionRequest::new(code, language).with_identity(user);
    let result = dispatcher.execute(request).await;

    println!("{}", render_result(&result)?);
    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Print the language table
pub fn execute_languages(dispatcher: &Dispatcher) {
    print!("{}", render_languages(dispatcher.languages()));
}

async fn read_source(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut code = String::new();
            tokio::io::stdin()
                .read_to_string(&mut code)
                .await
                .context("Failed to read code from stdin")?;
            Ok(code)
        }
    }
}

fn render_result(result: &ExecutionResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("Failed to serialize result")
}

fn render_languages(table: &LanguageTable) -> String {
    let mut out = format!("{:<12} {:<12} {}\n", "LANGUAGE", "INTERPRETER", "EXTENSION");
    for (language, spec) in table.iter() {
        out.push_str(&format!(
            "{:<12} {:<12} .{}\n",
            language.tag(),
            spec.interpreter,
            spec.extension
        ));
    }
    out
}
