//! Git publishing shim.
//!
//! The run command publishes the working tree (downloaded hour files plus
//! the output artifact) by committing and pushing the repository the process
//! runs in. Remote configuration and credentials belong to the repository
//! itself; this module only drives the `git` binary.

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::info;

/// Stage everything, commit with a timestamped message and push.
///
/// A clean tree is success, not an error: hourly runs that produce no new
/// data have nothing to publish.
pub async fn push_artifacts(message: &str) -> Result<()> {
    git(&["add", "-A"]).await?;

    // Exit code 1 from `diff --cached --quiet` means staged changes exist.
    let status = Command::new("git")
        .args(["diff", "--cached", "--quiet"])
        .status()
        .await
        .context("could not run git")?;
    if status.success() {
        info!("no changes to publish");
        return Ok(());
    }

    let stamped = format!("{message} - {}", chrono::Utc::now().to_rfc3339());
    git(&["commit", "-m", &stamped]).await?;
    git(&["push", "origin", "main"]).await?;

    info!("published artifacts");
    Ok(())
}

async fn git(args: &[&str]) -> Result<()> {
    let output = Command::new("git")
        .args(args)
        .output()
        .await
        .context("could not run git")?;
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.first().copied().unwrap_or_default(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}
