//! Helpers for tests: an in-memory filesystem, and a scratch directory on
//! the real one.

#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_docs_in_private_items)]

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::descriptor::{Identity, PermissionDescriptor};
use crate::meta::{DirectoryAttributes, MetadataProvider, ObjectKind};
use crate::{Error, Result, TrustPolicy, Validator};

/// What lives at a path in a [`FakeFs`].
#[derive(Debug, Clone)]
enum Entry {
    Object {
        kind: ObjectKind,
        descriptor: PermissionDescriptor,
        nlink: u64,
    },
    Link(Option<PathBuf>),
    Unreadable,
    OutOfMemory,
}

/// A [`MetadataProvider`] backed by a map from paths to entries.
///
/// The root directory exists, owned by uid 0 with mode 0755.
#[derive(Debug, Clone)]
pub(crate) struct FakeFs {
    entries: BTreeMap<PathBuf, Entry>,
    user: Identity,
    system_volume_root: Option<PathBuf>,
}

impl FakeFs {
    /// Return a new filesystem whose current user is `user`.
    pub(crate) fn new(user: Identity) -> Self {
        let mut fs = FakeFs {
            entries: BTreeMap::new(),
            user,
            system_volume_root: None,
        };
        fs.dir("/", 0, 0o755);
        fs
    }

    fn object(&mut self, path: &str, kind: ObjectKind, descriptor: PermissionDescriptor) -> &mut Self {
        self.entries.insert(
            path.into(),
            Entry::Object {
                kind,
                descriptor,
                nlink: 1,
            },
        );
        self
    }

    /// Add a directory owned by `uid` (and the group with the same number).
    pub(crate) fn dir(&mut self, path: &str, uid: u32, mode: u32) -> &mut Self {
        self.dir_group(path, uid, uid, mode)
    }

    /// Add a directory owned by `uid` and `gid`.
    pub(crate) fn dir_group(&mut self, path: &str, uid: u32, gid: u32, mode: u32) -> &mut Self {
        let descriptor = PermissionDescriptor::from_mode(uid, gid, mode);
        self.object(path, ObjectKind::Directory, descriptor)
    }

    /// Add a directory with an arbitrary descriptor.
    pub(crate) fn acl_dir(&mut self, path: &str, descriptor: PermissionDescriptor) -> &mut Self {
        self.object(path, ObjectKind::Directory, descriptor)
    }

    /// Add a regular file owned by `uid`.
    pub(crate) fn file(&mut self, path: &str, uid: u32, mode: u32) -> &mut Self {
        let descriptor = PermissionDescriptor::from_mode(uid, uid, mode);
        self.object(path, ObjectKind::File, descriptor)
    }

    /// Change the hard link count of an existing object.
    pub(crate) fn set_nlink(&mut self, path: &str, count: u64) -> &mut Self {
        if let Some(Entry::Object { nlink, .. }) = self.entries.get_mut(Path::new(path)) {
            *nlink = count;
        }
        self
    }

    /// Add a symbolic link at `path` pointing to `target`.
    pub(crate) fn link(&mut self, path: &str, target: &str) -> &mut Self {
        self.entries
            .insert(path.into(), Entry::Link(Some(target.into())));
        self
    }

    /// Add a symbolic link whose target can't be read.
    pub(crate) fn broken_link(&mut self, path: &str) -> &mut Self {
        self.entries.insert(path.into(), Entry::Link(None));
        self
    }

    /// Add an object whose metadata can't be read.
    pub(crate) fn unreadable(&mut self, path: &str) -> &mut Self {
        self.entries.insert(path.into(), Entry::Unreadable);
        self
    }

    /// Add an object whose lookup runs out of memory.
    pub(crate) fn out_of_memory(&mut self, path: &str) -> &mut Self {
        self.entries.insert(path.into(), Entry::OutOfMemory);
        self
    }

    /// Treat `path` as the root of the system volume.
    pub(crate) fn set_system_volume_root(&mut self, path: &str) -> &mut Self {
        self.system_volume_root = Some(path.into());
        self
    }

    /// Forget about any system volume root.
    pub(crate) fn clear_system_volume_root(&mut self) -> &mut Self {
        self.system_volume_root = None;
        self
    }

    /// Wrap this filesystem in a [`Validator`] with `policy`.
    pub(crate) fn into_validator(self, policy: TrustPolicy) -> Validator {
        Validator::with_provider(policy, Arc::new(self))
    }
}

impl MetadataProvider for FakeFs {
    fn directory_attributes(&self, path: &Path) -> Result<DirectoryAttributes> {
        match self.entries.get(path) {
            None => Err(Error::NotFound(path.into())),
            Some(Entry::Unreadable) => Err(Error::inspecting(
                io::Error::from(io::ErrorKind::PermissionDenied),
                path,
            )),
            Some(Entry::OutOfMemory) => {
                let mut v: Vec<u8> = Vec::new();
                Err(Error::Exhausted(
                    path.into(),
                    v.try_reserve(usize::MAX).unwrap_err(),
                ))
            }
            Some(Entry::Link(_)) => Ok(DirectoryAttributes::new(
                PermissionDescriptor::new(Identity::Invalid),
                ObjectKind::Other,
                true,
                1,
            )),
            Some(Entry::Object {
                kind,
                descriptor,
                nlink,
            }) => Ok(DirectoryAttributes::new(
                descriptor.clone(),
                *kind,
                false,
                *nlink,
            )),
        }
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        match self.entries.get(path) {
            Some(Entry::Link(Some(target))) => Ok(target.clone()),
            Some(Entry::Link(None)) => Err(io::ErrorKind::PermissionDenied.into()),
            _ => Err(io::ErrorKind::InvalidInput.into()),
        }
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        // Good enough for our tests, which never stop at a link.
        if self.entries.contains_key(path) {
            Ok(path.into())
        } else {
            Err(io::ErrorKind::NotFound.into())
        }
    }

    fn current_user(&self) -> Option<Identity> {
        Some(self.user.clone())
    }

    fn system_volume_root(&self) -> Option<PathBuf> {
        self.system_volume_root.clone()
    }
}

/// Which kind of object a real symbolic link points to.
///
/// Windows cares about this; Unix doesn't.
#[derive(Debug, Clone, Copy)]
pub(crate) enum LinkType {
    Dir,
    #[allow(dead_code)]
    File,
}

/// A scratch directory on the real filesystem, deleted when dropped.
#[derive(Debug)]
pub(crate) struct Dir {
    toplevel: tempfile::TempDir,
    canonical_root: PathBuf,
}

impl Dir {
    pub(crate) fn new() -> Self {
        let toplevel = tempfile::TempDir::new().unwrap();
        let canonical_root = toplevel.path().canonicalize().unwrap();
        Dir {
            toplevel,
            canonical_root,
        }
    }

    /// Return the canonical location of this directory.
    pub(crate) fn canonical_root(&self) -> &Path {
        &self.canonical_root
    }

    /// Return `p` relative to this directory.
    pub(crate) fn path(&self, p: &str) -> PathBuf {
        self.toplevel.path().join(p)
    }

    /// Create `p` and any missing parents.
    pub(crate) fn dir(&self, p: &str) {
        fs::create_dir_all(self.path(p)).unwrap();
    }

    /// Create an empty file at `p`.
    pub(crate) fn file(&self, p: &str) {
        fs::write(self.path(p), b"").unwrap();
    }

    /// Add a hard link at `new` to the file at `existing`.
    pub(crate) fn hard_link(&self, existing: &str, new: &str) {
        fs::hard_link(self.path(existing), self.path(new)).unwrap();
    }

    /// Add a symbolic link at `link` whose contents are `target`.
    pub(crate) fn link_rel(&self, link_type: LinkType, target: &str, link: &str) {
        #[cfg(target_family = "unix")]
        {
            let _ = link_type;
            std::os::unix::fs::symlink(target, self.path(link)).unwrap();
        }
        #[cfg(windows)]
        {
            match link_type {
                LinkType::Dir => std::os::windows::fs::symlink_dir(target, self.path(link)),
                LinkType::File => std::os::windows::fs::symlink_file(target, self.path(link)),
            }
            .unwrap();
        }
    }

    /// Change the mode of `p`.
    pub(crate) fn chmod(&self, p: &str, mode: u32) {
        #[cfg(target_family = "unix")]
        {
            use std::os::unix::fs::PermissionsExt;
            let perm = fs::Permissions::from_mode(mode);
            fs::set_permissions(self.path(p), perm).unwrap();
        }
        #[cfg(not(target_family = "unix"))]
        {
            let _ = (p, mode);
        }
    }
}
