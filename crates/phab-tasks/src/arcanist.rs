//! Arcanist command construction.

use serde::{Deserialize, Serialize};

/// Flags controlling how `arc patch` lands a diff in the workspace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PatchFlags {
    /// Create a commit for the patch (git only; `--nocommit` when false).
    pub create_commit: bool,

    /// Create a branch for the patch (git only; `--nobranch` when false).
    pub create_branch: bool,

    /// Pass `--force` to override dirty-workspace refusals.
    pub force: bool,
}

impl Default for PatchFlags {
    fn default() -> Self {
        PatchFlags {
            create_commit: false,
            create_branch: false,
            force: false,
        }
    }
}

/// Builds argv vectors for invoking the `arc` binary.
#[derive(Debug, Clone)]
pub struct ArcanistClient {
    arc_path: String,
    conduit_token: Option<String>,
}

impl ArcanistClient {
    /// Client for a given `arc` binary path.
    pub fn new(arc_path: &str) -> Self {
        ArcanistClient {
            arc_path: arc_path.to_string(),
            conduit_token: None,
        }
    }

    /// Authenticate arc invocations with a Conduit token.
    pub fn with_token(mut self, token: &str) -> Self {
        self.conduit_token = Some(token.to_string());
        self
    }

    /// argv for an arbitrary arc method.
    pub fn command(&self, method: &str, args: &[String]) -> Vec<String> {
        let mut argv = vec![self.arc_path.clone(), method.to_string()];
        if let Some(token) = &self.conduit_token {
            argv.push("--conduit-token".to_string());
            argv.push(token.clone());
        }
        argv.extend(args.iter().cloned());
        argv
    }

    /// argv for `arc patch` of one diff.
    ///
    /// `--nocommit` and `--nobranch` only apply to git workspaces.
    pub fn patch_command(&self, diff_id: &str, git: bool, flags: &PatchFlags) -> Vec<String> {
        let mut args = vec!["--diff".to_string(), diff_id.to_string()];
        if git {
            if !flags.create_commit {
                args.push("--nocommit".to_string());
            }
            if !flags.create_branch {
                args.push("--nobranch".to_string());
            }
        }
        if flags.force {
            args.push("--force".to_string());
        }
        self.command("patch", &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_includes_token() {
        let arc = ArcanistClient::new("arc").with_token("api-token");
        let argv = arc.command("export", &[]);
        assert_eq!(argv[0], "arc");
        assert_eq!(argv[1], "export");
        assert!(argv.contains(&"--conduit-token".to_string()));
        assert!(argv.contains(&"api-token".to_string()));
    }

    #[test]
    fn test_command_without_token() {
        let arc = ArcanistClient::new("/usr/local/bin/arc");
        let argv = arc.command("patch", &["--diff".to_string(), "7".to_string()]);
        assert_eq!(argv[0], "/usr/local/bin/arc");
        assert!(!argv.contains(&"--conduit-token".to_string()));
        assert!(argv.contains(&"--diff".to_string()));
    }

    #[test]
    fn test_patch_command_default_flags_on_git() {
        let arc = ArcanistClient::new("arc");
        let argv = arc.patch_command("42", true, &PatchFlags::default());
        assert!(argv.contains(&"--nocommit".to_string()));
        assert!(argv.contains(&"--nobranch".to_string()));
        assert!(!argv.contains(&"--force".to_string()));
    }

    #[test]
    fn test_patch_command_commit_and_branch_enabled() {
        let arc = ArcanistClient::new("arc");
        let flags = PatchFlags {
            create_commit: true,
            create_branch: true,
            force: false,
        };
        let argv = arc.patch_command("42", true, &flags);
        assert!(!argv.contains(&"--nocommit".to_string()));
        assert!(!argv.contains(&"--nobranch".to_string()));
    }

    #[test]
    fn test_patch_command_non_git_skips_git_flags() {
        let arc = ArcanistClient::new("arc");
        let argv = arc.patch_command("42", false, &PatchFlags::default());
        assert!(!argv.contains(&"--nocommit".to_string()));
        assert!(!argv.contains(&"--nobranch".to_string()));
    }

    #[test]
    fn test_patch_command_force() {
        let arc = ArcanistClient::new("arc");
        let flags = PatchFlags {
            force: true,
            ..Default::default()
        };
        let argv = arc.patch_command("42", false, &flags);
        assert!(argv.contains(&"--force".to_string()));
    }
}
