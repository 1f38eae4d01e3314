//! Process execution for build tasks.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

/// Captured output of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (0 = success).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the process exited normally with status 0.
    pub success: bool,
}

impl CommandOutput {
    /// Whether this command passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }
}

/// Run a command in `workdir` and capture its output.
///
/// A `timeout_secs` of zero disables the timeout.
pub async fn run_command(
    workdir: &Path,
    argv: &[String],
    timeout_secs: u64,
) -> anyhow::Result<CommandOutput> {
    if argv.is_empty() {
        anyhow::bail!("empty command");
    }

    let exe = &argv[0];
    let args = &argv[1..];

    debug!(command = %argv.join(" "), workdir = %workdir.display(), "Spawning command");

    let start = Instant::now();
    let child = Command::new(exe)
        .args(args)
        .current_dir(workdir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let output = if timeout_secs > 0 {
        tokio::time::timeout(
            std::time::Duration::from_secs(timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| anyhow::anyhow!("{} timed out after {} seconds", exe, timeout_secs))??
    } else {
        child.wait_with_output().await?
    };

    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
        success: output.status.success(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_run_simple_command() {
        let output = run_command(Path::new("."), &argv(&["echo", "hello"]), 60)
            .await
            .expect("execute failed");
        assert!(output.passed());
        assert_eq!(output.exit_code, 0);
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_run_failing_command() {
        let output = run_command(Path::new("."), &argv(&["false"]), 60)
            .await
            .expect("execute failed");
        assert!(!output.passed());
        assert_ne!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let result = run_command(Path::new("."), &[], 60).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let result = run_command(Path::new("."), &argv(&["definitely-not-a-binary-xyz"]), 60).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_timeout_enforced() {
        let result = run_command(Path::new("."), &argv(&["sleep", "5"]), 1).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timed out"));
    }
}
