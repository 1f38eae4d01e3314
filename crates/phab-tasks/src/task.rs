//! Task template and outcome type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of a task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskResult {
    Success,
    Failure,
}

impl TaskResult {
    /// Whether the task succeeded.
    pub fn passed(&self) -> bool {
        matches!(self, TaskResult::Success)
    }

    /// Map a process exit code onto an outcome (0 = success).
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            TaskResult::Success
        } else {
            TaskResult::Failure
        }
    }
}

impl std::fmt::Display for TaskResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskResult::Success => write!(f, "success"),
            TaskResult::Failure => write!(f, "failure"),
        }
    }
}

/// A build-side task with a fixed setup/execute/tear-down lifecycle.
///
/// `setup` and `tear_down` default to no-ops; `tear_down` always runs,
/// regardless of the execute outcome.
#[async_trait]
pub trait Task: Send {
    /// Short tag used to label log lines from this task.
    fn tag(&self) -> &str;

    /// Prepare any state the task needs.
    async fn setup(&mut self) {}

    /// Do the work.
    async fn execute(&mut self) -> TaskResult;

    /// Release anything acquired in setup.
    async fn tear_down(&mut self) {}

    /// Drive the full lifecycle and return the execute outcome.
    async fn run(&mut self) -> TaskResult {
        self.setup().await;
        let result = self.execute().await;
        self.tear_down().await;
        result
    }
}
