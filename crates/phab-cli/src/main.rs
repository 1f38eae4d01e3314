//! phab-bridge - build server <-> Phabricator/Differential bridge
//!
//! ## Commands
//!
//! - `ping`: check connectivity to the Conduit endpoint
//! - `diffs`: fetch diff metadata by diff id
//! - `revisions`: fetch revision metadata by revision id
//! - `apply-patch`: land a Differential diff on a build workspace

mod telemetry;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use phab_conduit::{ConduitClient, ConduitConfig};
use phab_domain::Diff;
use phab_tasks::{
    ApplyPatchOptions, ApplyPatchTask, ArcanistClient, PatchFlags, PatchSource, ScmType, Task,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "phab-bridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bridge a build server with Phabricator/Differential", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Conduit endpoint URL
    #[arg(long, global = true, env = "PHAB_CONDUIT_URL")]
    url: Option<String>,

    /// Conduit API token
    #[arg(long, global = true, env = "PHAB_CONDUIT_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check connectivity to the Conduit endpoint
    Ping,

    /// Fetch diff metadata by diff id
    Diffs {
        /// Diff ids (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<u64>,
    },

    /// Fetch revision metadata by revision id
    Revisions {
        /// Revision ids (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<u64>,
    },

    /// Apply a Differential diff onto a build workspace
    ApplyPatch {
        /// Workspace path
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        /// Diff id to land via Arcanist
        #[arg(long, conflicts_with = "raw_diff_file")]
        diff_id: Option<String>,

        /// Unified diff file to apply with the SCM's own tooling
        #[arg(long)]
        raw_diff_file: Option<PathBuf>,

        /// Commit to reset the workspace to before patching
        #[arg(long, default_value = "origin/master")]
        base_commit: String,

        /// Workspace SCM (git or svn)
        #[arg(long, default_value = "git")]
        scm: String,

        /// Create a commit for the patch
        #[arg(long)]
        create_commit: bool,

        /// Create a branch for the patch
        #[arg(long)]
        create_branch: bool,

        /// Skip the forced git clean before patching
        #[arg(long)]
        skip_forced_clean: bool,

        /// Pass --force to arc patch
        #[arg(long)]
        force: bool,

        /// Build number label for the temp diff file
        #[arg(long, default_value = "0")]
        build_number: u32,

        /// Path to the arc binary
        #[arg(long, default_value = "arc")]
        arc_path: String,

        /// Path to the git binary
        #[arg(long, default_value = "git")]
        git_path: String,

        /// Path to the svn binary
        #[arg(long, default_value = "svn")]
        svn_path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    telemetry::init_tracing(cli.json, level);

    let config = conduit_config(&cli);
    let token = cli.token.clone();

    match cli.command {
        Commands::Ping => cmd_ping(config).await,
        Commands::Diffs { ids } => cmd_diffs(config, &ids).await,
        Commands::Revisions { ids } => cmd_revisions(config, &ids).await,
        Commands::ApplyPatch {
            workspace,
            diff_id,
            raw_diff_file,
            base_commit,
            scm,
            create_commit,
            create_branch,
            skip_forced_clean,
            force,
            build_number,
            arc_path,
            git_path,
            svn_path,
        } => {
            let scm_type = parse_scm(&scm)?;
            let source = patch_source(diff_id, raw_diff_file)?;
            let arc = match &token {
                Some(t) => ArcanistClient::new(&arc_path).with_token(t),
                None => ArcanistClient::new(&arc_path),
            };
            let opts = ApplyPatchOptions {
                base_commit,
                scm_type,
                source,
                flags: PatchFlags {
                    create_commit,
                    create_branch,
                    force,
                },
                skip_forced_clean,
                build_number,
                git_path,
                svn_path,
                command_timeout_secs: 600,
            };
            cmd_apply_patch(workspace, opts, arc).await
        }
    }
}

/// Conduit config from the environment, overridden by CLI flags.
fn conduit_config(cli: &Cli) -> ConduitConfig {
    let mut config = ConduitConfig::from_env();
    if let Some(url) = &cli.url {
        config.base_url = url.clone();
    }
    if let Some(token) = &cli.token {
        config.token = Some(token.clone());
    }
    config
}

fn parse_scm(scm: &str) -> Result<ScmType> {
    match scm {
        "git" => Ok(ScmType::Git),
        "svn" => Ok(ScmType::Svn),
        other => anyhow::bail!("unknown scm type: {} (expected git or svn)", other),
    }
}

fn patch_source(diff_id: Option<String>, raw_diff_file: Option<PathBuf>) -> Result<PatchSource> {
    match (diff_id, raw_diff_file) {
        (Some(diff_id), None) => Ok(PatchSource::Arcanist { diff_id }),
        (None, Some(path)) => {
            let diff = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(PatchSource::RawDiff { diff })
        }
        _ => anyhow::bail!("exactly one of --diff-id or --raw-diff-file is required"),
    }
}

async fn cmd_ping(config: ConduitConfig) -> Result<()> {
    let client = ConduitClient::new(config);
    let hostname = client.ping().await.context("Conduit ping failed")?;
    println!("{}", hostname);
    Ok(())
}

async fn cmd_diffs(config: ConduitConfig, ids: &[u64]) -> Result<()> {
    let client = ConduitClient::new(config);
    let diffs = client
        .query_diffs(ids)
        .await
        .context("differential.querydiffs failed")?;

    #[derive(Serialize)]
    struct DiffView {
        revision: String,
        #[serde(flatten)]
        diff: Diff,
    }

    let views: Vec<DiffView> = diffs
        .into_iter()
        .map(|d| DiffView {
            revision: d.formatted_revision_id(),
            diff: d,
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&views)?);
    Ok(())
}

async fn cmd_revisions(config: ConduitConfig, ids: &[u64]) -> Result<()> {
    let client = ConduitClient::new(config);
    let revisions = client
        .query_revisions(ids)
        .await
        .context("differential.query failed")?;

    println!("{}", serde_json::to_string_pretty(&revisions)?);
    Ok(())
}

async fn cmd_apply_patch(
    workspace: PathBuf,
    opts: ApplyPatchOptions,
    arc: ArcanistClient,
) -> Result<()> {
    let mut task = ApplyPatchTask::new(workspace, opts, arc);
    let result = task.run().await;
    info!(result = %result, "apply-patch finished");

    if !result.passed() {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_diff_ids() {
        let cli = Cli::parse_from(["phab-bridge", "diffs", "--ids", "1,2,3"]);
        match cli.command {
            Commands::Diffs { ids } => assert_eq!(ids, vec![1, 2, 3]),
            _ => panic!("expected diffs command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from(["phab-bridge", "--verbose", "--json", "ping"]);
        assert!(cli.verbose);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Ping));
    }

    #[test]
    fn test_cli_rejects_both_patch_sources() {
        let result = Cli::try_parse_from([
            "phab-bridge",
            "apply-patch",
            "--diff-id",
            "42",
            "--raw-diff-file",
            "x.diff",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_scm() {
        assert_eq!(parse_scm("git").unwrap(), ScmType::Git);
        assert_eq!(parse_scm("svn").unwrap(), ScmType::Svn);
        assert!(parse_scm("hg").is_err());
    }

    #[test]
    fn test_patch_source_requires_exactly_one() {
        assert!(patch_source(None, None).is_err());
        let source = patch_source(Some("42".to_string()), None).unwrap();
        assert!(matches!(source, PatchSource::Arcanist { .. }));
    }

    #[test]
    fn test_patch_source_missing_file_is_an_error() {
        let result = patch_source(None, Some(PathBuf::from("/nonexistent/raw.diff")));
        assert!(result.is_err());
    }
}
