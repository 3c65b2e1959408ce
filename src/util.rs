pub mod diff;

use anyhow::{Context, bail};
use std::process::Command;
use tracing::debug;

const GIT_EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Revision the analyzed changes are compared against to find changed lines
#[derive(Debug, PartialEq, Eq)]
pub enum Base {
    /// Empty tree, so every line of the revision is on the diff
    Root,
    /// Any revision `git diff` accepts
    Rev(String),
}

impl Base {
    /// `ROOT` selects the empty tree and a leading `^` or `~` is taken relative
    /// to `HEAD`. A blank base compares the working tree with `HEAD`.
    pub fn parse(base: &str) -> Self {
        match base.trim() {
            "ROOT" => Self::Root,
            "" => Self::Rev("HEAD".into()),
            relative if relative.starts_with(['^', '~']) => Self::Rev(format!("HEAD{}", relative)),
            rev => Self::Rev(rev.to_string()),
        }
    }

    fn git_rev(&self) -> &str {
        match self {
            Self::Root => GIT_EMPTY_TREE,
            Self::Rev(rev) => rev,
        }
    }
}

/// Zero-context unified diff of the working tree against `base`
pub fn get_diff(base: &Base) -> anyhow::Result<String> {
    let rev = base.git_rev();
    debug!("Running git diff against {}", rev);
    let output = Command::new("git")
        .args(["diff", "--unified=0", "--no-color", rev])
        .output()
        .context("Failed to execute git diff")?;

    if !output.status.success() {
        bail!(
            "git diff {} failed: {}",
            rev,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
