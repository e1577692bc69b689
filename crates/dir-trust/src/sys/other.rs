//! Fallback for platforms where we can't read ownership at all.
//!
//! Every object gets an unreadable owner, so nothing is ever trusted.

use std::path::{Path, PathBuf};

use crate::descriptor::{Identity, PermissionDescriptor};
use crate::meta::{DirectoryAttributes, ObjectKind};
use crate::{Error, Result};

/// Look up what we can about `path`.
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
    Ok(DirectoryAttributes::new(
        PermissionDescriptor::new(Identity::Invalid),
        kind,
        file_type.is_symlink(),
        1,
    ))
}

/// We don't know who we are.
pub(super) fn current_user() -> Option<Identity> {
    None
}

/// No carve-outs here.
pub(super) fn system_volume_root() -> Option<PathBuf> {
    None
}
