use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use dir_trust::{TrustPolicy, Validator, Verdict};
use tracing::debug;

/// Check whether paths are safe to use, and print one verdict per path.
#[derive(Debug, Parser)]
pub(super) struct Check {
    /// Require regular files instead of directories
    #[clap(long)]
    file: bool,

    /// The paths to check
    ///
    /// Relative paths are taken relative to the current directory.  Paths
    /// may not contain `..`; resolve them first.
    #[clap(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,
}

impl Check {
    /// Check every path with `policy`, printing a line for each.
    ///
    /// Return true if all of them were secure.
    pub(super) fn run(self, policy: TrustPolicy) -> anyhow::Result<bool> {
        debug!("Checking {} path(s) with {:?}", self.paths.len(), policy);
        let validator = Validator::with_policy(policy);
        let cwd = std::env::current_dir().context("Unable to find current directory")?;

        if let Some(path) = self
            .paths
            .iter()
            .find(|p| p.components().any(|c| c == Component::ParentDir))
        {
            bail!(
                "{} contains '..'; give a path without it (e.g. from `realpath`)",
                path.display()
            );
        }

        let mut all_secure = true;
        for path in &self.paths {
            let verifier = if self.file {
                validator.verifier().require_file()
            } else {
                validator.verifier()
            };
            let verdict = verifier
                .validate(cwd.join(path))
                .with_context(|| format!("Unable to check {}", path.display()))?;
            println!("{}", report_line(path, &verdict));
            all_secure &= verdict.is_secure();
        }
        Ok(all_secure)
    }
}

/// Describe `verdict` on `path` in a single line.
fn report_line(path: &Path, verdict: &Verdict) -> String {
    match (verdict.resolved_path(), verdict.diagnostic()) {
        (Some(resolved), _) => format!("secure: {} ({})", path.display(), resolved.display()),
        (None, Some(diagnostic)) => format!("INSECURE: {}: {}", path.display(), diagnostic),
        (None, None) => format!("INSECURE: {}", path.display()),
    }
}
