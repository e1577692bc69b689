//! Follow symbolic links (and other reparse points) that we find along a
//! path.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, trace};

use crate::anon_home::PathExt as _;
use crate::imp::Engine;
use crate::trust::TrustContext;
use crate::{Error, Result, Type};

/// Validate the target of the symbolic link at `link`.
///
/// `parent` is the resolved (link-free) location of the directory holding
/// the link; it has already been checked.  `want` is the kind of object
/// that the link must point to.
///
/// On success, return the resolved location of the target.
pub(crate) fn resolve_and_validate(
    engine: &Engine<'_>,
    link: &Path,
    parent: &Path,
    context: &TrustContext,
    want: Type,
) -> Result<PathBuf> {
    let deeper = match context.descend() {
        Some(c) => c,
        None => {
            debug!(
                "Not following {}: already followed {} links",
                link.anonymize_home(),
                context.depth()
            );
            return Err(Error::SymlinkCycleSuspected(link.into(), context.depth()));
        }
    };

    let target = engine
        .provider()
        .read_link(link)
        .map_err(|e| Error::SymlinkResolutionFailed(link.into(), e.to_string()))?;
    let absolute = absolute_target(parent, &target)
        .map_err(|why| Error::SymlinkResolutionFailed(link.into(), why.into()))?;
    trace!(
        "{} -> {} (depth {})",
        link.anonymize_home(),
        absolute.anonymize_home(),
        deeper.depth()
    );

    engine
        .validate_at(&absolute, &deeper, want)
        .map_err(|e| e.via_symlink(link))
}

/// Compute the location that a link in `parent` with contents `target`
/// refers to.
///
/// Leading `..` components in a relative target are applied to `parent`,
/// which is safe because `parent` contains no links.  A `..` that follows a
/// named component could be undoing a link we have not looked at yet, so we
/// refuse it.
fn absolute_target(parent: &Path, target: &Path) -> std::result::Result<PathBuf, &'static str> {
    if target.as_os_str().is_empty() {
        return Err("empty link target");
    }
    let mut result = if target.is_absolute() {
        PathBuf::new()
    } else {
        parent.to_path_buf()
    };
    let mut seen_name = false;
    for component in target.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => result.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir if seen_name => {
                return Err("'..' after a named component in link target");
            }
            Component::ParentDir => {
                // Popping past the root leaves us at the root, as the kernel
                // would.
                result.pop();
            }
            Component::Normal(name) => {
                seen_name = true;
                result.push(name);
            }
        }
    }
    Ok(result)
}
