//! Apply a Differential diff onto a build workspace.

use crate::arcanist::{ArcanistClient, PatchFlags};
use crate::command::run_command;
use crate::task::{Task, TaskResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

/// Source control system of the build workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmType {
    Git,
    Svn,
}

/// Where the patch content comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PatchSource {
    /// Let Arcanist fetch and land the diff (`arc patch --diff <id>`).
    Arcanist { diff_id: String },

    /// Apply a caller-supplied unified diff with the SCM's own tooling.
    RawDiff { diff: String },
}

/// Options for [`ApplyPatchTask`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyPatchOptions {
    /// Commit the workspace is reset to before patching.
    pub base_commit: String,

    /// Workspace SCM.
    pub scm_type: ScmType,

    /// Patch content source.
    pub source: PatchSource,

    /// Arcanist patch flags.
    #[serde(default)]
    pub flags: PatchFlags,

    /// Skip the forced `git clean` before patching.
    #[serde(default)]
    pub skip_forced_clean: bool,

    /// Build number, used to label the temp diff file.
    #[serde(default)]
    pub build_number: u32,

    /// Path of the git binary.
    #[serde(default = "default_git_path")]
    pub git_path: String,

    /// Path of the svn binary.
    #[serde(default = "default_svn_path")]
    pub svn_path: String,

    /// Per-command timeout in seconds (0 disables).
    #[serde(default = "default_timeout_secs")]
    pub command_timeout_secs: u64,
}

fn default_git_path() -> String {
    "git".to_string()
}

fn default_svn_path() -> String {
    "svn".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

/// Task that prepares a workspace and lands one diff on it.
///
/// Git workspaces are reset to the base commit, cleaned (unless skipped),
/// and have submodules updated before the patch is applied. Non-zero exits
/// during preparation are logged and tolerated; the patch step itself
/// decides the outcome.
pub struct ApplyPatchTask {
    workspace: PathBuf,
    opts: ApplyPatchOptions,
    arc: ArcanistClient,
}

impl ApplyPatchTask {
    pub fn new(workspace: PathBuf, opts: ApplyPatchOptions, arc: ArcanistClient) -> Self {
        ApplyPatchTask {
            workspace,
            opts,
            arc,
        }
    }

    fn git(&self, args: &[&str]) -> Vec<String> {
        let mut argv = vec![self.opts.git_path.clone()];
        argv.extend(args.iter().map(|s| s.to_string()));
        argv
    }

    async fn reset_workspace(&self) -> anyhow::Result<()> {
        let timeout = self.opts.command_timeout_secs;

        let reset = run_command(
            &self.workspace,
            &self.git(&["reset", "--hard", &self.opts.base_commit]),
            timeout,
        )
        .await?;
        if !reset.passed() {
            info!(
                task = self.tag(),
                exit_code = reset.exit_code,
                base_commit = %self.opts.base_commit,
                "Non-zero exit resetting to base commit"
            );
        }

        if !self.opts.skip_forced_clean {
            // A dirty workspace makes `arc patch` refuse to run
            let clean =
                run_command(&self.workspace, &self.git(&["clean", "-fd", "-f"]), timeout).await?;
            if !clean.passed() {
                warn!(task = self.tag(), exit_code = clean.exit_code, "git clean failed");
            }
        }

        let submodule = run_command(
            &self.workspace,
            &self.git(&["submodule", "update", "--init", "--recursive"]),
            timeout,
        )
        .await?;
        if !submodule.passed() {
            warn!(
                task = self.tag(),
                exit_code = submodule.exit_code,
                "git submodule update failed"
            );
        }

        Ok(())
    }

    async fn apply_with_arcanist(&self, diff_id: &str) -> anyhow::Result<TaskResult> {
        let argv = self.arc.patch_command(
            diff_id,
            self.opts.scm_type == ScmType::Git,
            &self.opts.flags,
        );
        let output = run_command(&self.workspace, &argv, self.opts.command_timeout_secs).await?;
        if !output.passed() {
            warn!(
                task = self.tag(),
                exit_code = output.exit_code,
                stderr = %output.stderr,
                "arc patch failed"
            );
        }
        Ok(TaskResult::from_exit_code(output.exit_code))
    }

    async fn apply_raw_diff(&self, diff: &str) -> anyhow::Result<TaskResult> {
        let file = write_raw_diff(diff, self.opts.build_number)?;
        let path = file.path().to_string_lossy().to_string();
        info!(task = self.tag(), path = %path, "Wrote raw diff");

        let argv = match self.opts.scm_type {
            ScmType::Git => self.git(&["apply", &path]),
            ScmType::Svn => vec![self.opts.svn_path.clone(), "patch".to_string(), path],
        };
        let output = run_command(&self.workspace, &argv, self.opts.command_timeout_secs).await?;
        if !output.passed() {
            warn!(
                task = self.tag(),
                exit_code = output.exit_code,
                stderr = %output.stderr,
                "raw diff application failed"
            );
        }
        Ok(TaskResult::from_exit_code(output.exit_code))
    }
}

/// Write the raw diff to a uniquely named temp file.
fn write_raw_diff(diff: &str, build_number: u32) -> anyhow::Result<tempfile::NamedTempFile> {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .prefix(&format!("{}-{}", build_number, Uuid::new_v4()))
        .suffix(".diff")
        .tempfile()?;
    file.write_all(diff.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[async_trait]
impl Task for ApplyPatchTask {
    fn tag(&self) -> &str {
        match self.opts.source {
            PatchSource::Arcanist { .. } => "arc-patch",
            PatchSource::RawDiff { .. } => "raw-patch",
        }
    }

    async fn execute(&mut self) -> TaskResult {
        let source = self.opts.source.clone();

        let outcome = async {
            if self.opts.scm_type == ScmType::Git {
                self.reset_workspace().await?;
            }
            match &source {
                PatchSource::Arcanist { diff_id } => self.apply_with_arcanist(diff_id).await,
                PatchSource::RawDiff { diff } => self.apply_raw_diff(diff).await,
            }
        }
        .await;

        match outcome {
            Ok(result) => {
                info!(task = self.tag(), result = %result, "Patch task finished");
                result
            }
            Err(e) => {
                warn!(task = self.tag(), error = %e, "Patch task errored");
                TaskResult::Failure
            }
        }
    }
}
