//! phab-bridge Build Tasks
//!
//! Work executed on the build-server side of the bridge:
//! - `Task` / `TaskResult`: the setup/execute/tear-down template every task follows
//! - `run_command`: process execution with timeout and captured output
//! - `ArcanistClient`: argv construction for `arc` invocations
//! - `ApplyPatchTask`: land a Differential diff on a build workspace

pub mod apply_patch;
pub mod arcanist;
pub mod command;
pub mod task;

// Re-export key types
pub use apply_patch::{ApplyPatchOptions, ApplyPatchTask, PatchSource, ScmType};
pub use arcanist::{ArcanistClient, PatchFlags};
pub use command::{run_command, CommandOutput};
pub use task::{Task, TaskResult};
