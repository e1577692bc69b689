//! Break an absolute path into the list of directories that lead to it.

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// The largest number of ancestors that we will enumerate for a single path.
///
/// `PATH_MAX` is 4096 on Linux, and each component takes at least two bytes
/// (a name and a separator), so no real path comes close.
pub const MAX_ANCESTORS: usize = 2048;

/// Return the ancestors of `path`, from the filesystem root down to `path`
/// itself.
///
/// The result always has at least one element; its first element is a root
/// (`/`, `C:\`, `\\server\share\`, ...), and its last element is `path` with
/// any repeated separators and `.` components removed.  Each element is the
/// parent of the element that follows it.
///
/// Fails with [`Error::InvalidPath`] if `path` is empty, relative, or uses
/// `..`; fails with [`Error::PathTooDeep`] if there are more than
/// [`MAX_ANCESTORS`] elements; fails with [`Error::Exhausted`] if we cannot
/// allocate the list.
pub fn ancestors(path: &Path) -> Result<Vec<PathBuf>> {
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidPath(path.into(), "empty path"));
    }

    let mut components = path.components().peekable();

    // Gather the root: an optional prefix (Windows only), and a root
    // separator.
    let mut root = PathBuf::new();
    if let Some(Component::Prefix(prefix)) = components.peek() {
        root.push(prefix.as_os_str());
        components.next();
    }
    match components.next() {
        Some(Component::RootDir) => root.push(Component::RootDir.as_os_str()),
        Some(Component::Prefix(_)) => return Err(Error::InvalidPath(path.into(), "malformed prefix")),
        _ if root.as_os_str().is_empty() => {
            return Err(Error::InvalidPath(path.into(), "path is not absolute"))
        }
        // This is a drive specifier like `C:` that is not followed by a
        // separator: it means "the current directory on drive C".
        _ => {
            return Err(Error::InvalidPath(
                path.into(),
                "drive specifier not followed by a separator",
            ))
        }
    }

    let mut result = Vec::new();
    reserve(&mut result, 1, path)?;
    result.push(root);

    for component in components {
        match component {
            Component::CurDir => continue,
            Component::Normal(name) => {
                if result.len() >= MAX_ANCESTORS {
                    return Err(Error::PathTooDeep(path.into(), MAX_ANCESTORS));
                }
                let next = match result.last() {
                    Some(parent) => parent.join(name),
                    // We pushed the root above.
                    None => return Err(Error::InvalidPath(path.into(), "no root")),
                };
                reserve(&mut result, 1, path)?;
                result.push(next);
            }
            Component::ParentDir => {
                return Err(Error::InvalidPath(path.into(), "path contains '..'"));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::InvalidPath(path.into(), "unexpected root component"));
            }
        }
    }

    Ok(result)
}

/// Make room for `n` more elements in `v`, or report that we could not.
fn reserve(v: &mut Vec<PathBuf>, n: usize, path: &Path) -> Result<()> {
    v.try_reserve(n)
        .map_err(|e| Error::Exhausted(path.into(), e))
}
