//! Unix implementation: owners, groups, and mode bits.

use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use crate::descriptor::{Identity, PermissionDescriptor};
use crate::meta::{DirectoryAttributes, ObjectKind};
use crate::{Error, Result};

/// Look up the attributes of `path` with `lstat`.
pub(super) fn directory_attributes(path: &Path) -> Result<DirectoryAttributes> {
    let meta = path
        .symlink_metadata()
        .map_err(|e| Error::inspecting(e, path))?;
    let file_type = meta.file_type();

    let kind = if file_type.is_dir() {
        ObjectKind::Directory
    } else if file_type.is_file() {
        ObjectKind::File
    } else {
        ObjectKind::Other
    };

    // A directory's link count is two plus its number of subdirectories:
    // directories can't be hard-linked, so the count says nothing about
    // aliasing.
    let hard_link_count = if file_type.is_dir() { 1 } else { meta.nlink() };

    Ok(DirectoryAttributes::new(
        PermissionDescriptor::from_mode(meta.uid(), meta.gid(), meta.mode()),
        kind,
        file_type.is_symlink(),
        hard_link_count,
    ))
}

/// Return the effective user ID of this process.
#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub(super) fn current_user() -> Option<Identity> {
    Some(Identity::Uid(users::get_effective_uid()))
}

/// Without the `users` crate we can't tell who we are, so only the
/// superuser is trusted.
#[cfg(any(target_os = "ios", target_os = "android"))]
pub(super) fn current_user() -> Option<Identity> {
    None
}

/// Unix has no carve-out directories.
pub(super) fn system_volume_root() -> Option<PathBuf> {
    None
}
