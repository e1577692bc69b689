//! The metadata provider that asks the operating system.

use std::{
    io,
    path::{Path, PathBuf},
};

use once_cell::sync::OnceCell;

use crate::descriptor::Identity;
use crate::meta::{DirectoryAttributes, MetadataProvider};
use crate::Result;

#[cfg(target_family = "unix")]
#[path = "unix.rs"]
mod imp;

#[cfg(windows)]
#[path = "windows.rs"]
mod imp;

#[cfg(not(any(target_family = "unix", windows)))]
#[path = "other.rs"]
mod imp;

/// The root of the system volume, looked up the first time anybody asks.
///
/// This can't change while we're running, so we never look it up again.
static SYSTEM_VOLUME_ROOT: OnceCell<Option<PathBuf>> = OnceCell::new();

/// A [`MetadataProvider`] that reads real ownership and permission
/// information from the operating system.
///
/// On Unix, this reports file modes, owners and groups.  On Windows, it reads
/// owners, groups, and access-control lists from security descriptors.
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct SystemProvider;

impl SystemProvider {
    /// Return a new `SystemProvider`.
    pub fn new() -> Self {
        SystemProvider
    }
}

impl MetadataProvider for SystemProvider {
    fn directory_attributes(&self, path: &Path) -> Result<DirectoryAttributes> {
        imp::directory_attributes(path)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::read_link(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        path.canonicalize()
    }

    fn current_user(&self) -> Option<Identity> {
        imp::current_user()
    }

    fn system_volume_root(&self) -> Option<PathBuf> {
        SYSTEM_VOLUME_ROOT
            .get_or_init(imp::system_volume_root)
            .clone()
    }
}
