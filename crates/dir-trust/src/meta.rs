//! The interface between the validation engine and the operating system.

use std::{
    io,
    path::{Path, PathBuf},
};

use crate::descriptor::{Identity, PermissionDescriptor};
use crate::Result;

/// What kind of object a path names, once we know it is not a link.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[non_exhaustive]
pub enum ObjectKind {
    /// A directory.
    Directory,
    /// A regular file.
    File,
    /// Anything else: a device, a socket, a named pipe, ...
    Other,
}

/// Security-relevant information about a single filesystem object.
///
/// A provider builds one of these afresh every time it is asked: nothing
/// here is cached, since ownership and permissions can change between
/// queries.
#[derive(Debug, Clone)]
pub struct DirectoryAttributes {
    /// Who owns the object, and who may do what to it.
    descriptor: PermissionDescriptor,
    /// True if the object is a symbolic link or other reparse point.
    is_link: bool,
    /// How many hard links the object has.
    hard_link_count: u64,
    /// What kind of object this is.
    kind: ObjectKind,
}

impl DirectoryAttributes {
    /// Construct a new set of attributes.
    pub fn new(
        descriptor: PermissionDescriptor,
        kind: ObjectKind,
        is_link: bool,
        hard_link_count: u64,
    ) -> Self {
        DirectoryAttributes {
            descriptor,
            is_link,
            hard_link_count,
            kind,
        }
    }

    /// Return the owner of this object.
    pub fn owner(&self) -> &Identity {
        self.descriptor.owner()
    }

    /// Return the owning group of this object, if the platform has one.
    pub fn group(&self) -> Option<&Identity> {
        self.descriptor.group()
    }

    /// Return the full permission descriptor of this object.
    pub fn descriptor(&self) -> &PermissionDescriptor {
        &self.descriptor
    }

    /// Consume these attributes and return the descriptor.
    pub fn into_descriptor(self) -> PermissionDescriptor {
        self.descriptor
    }

    /// Return true if this object is a symbolic link or a reparse point.
    pub fn is_link(&self) -> bool {
        self.is_link
    }

    /// Return the number of hard links to this object.
    pub fn hard_link_count(&self) -> u64 {
        self.hard_link_count
    }

    /// Return true if this object is a directory (and not a link).
    pub fn is_directory(&self) -> bool {
        !self.is_link && self.kind == ObjectKind::Directory
    }

    /// Return true if this object is a regular file (and not a link).
    pub fn is_file(&self) -> bool {
        !self.is_link && self.kind == ObjectKind::File
    }

    /// Return the kind of this object.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }
}

/// A source of ownership and permission information about paths.
///
/// The validation engine does all of its filesystem access through this
/// trait.  [`SystemProvider`](crate::SystemProvider) asks the operating
/// system; other implementations can be used for testing, or to check a
/// filesystem image.
pub trait MetadataProvider: Send + Sync {
    /// Return the attributes of the object at `path`, without following a
    /// final symbolic link.
    ///
    /// Must return [`Error::NotFound`](crate::Error::NotFound) if there is
    /// nothing at `path`, and some other error if the object exists but its
    /// metadata cannot be read.  If an implementation cannot tell whether
    /// `path` is a link, it must report that it is one.
    fn directory_attributes(&self, path: &Path) -> Result<DirectoryAttributes>;

    /// Return the target of the symbolic link or reparse point at `path`.
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Return the canonical form of `path`, with every link resolved.
    ///
    /// This is only used to find a configured stopping point among the
    /// ancestors of the paths we check.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Return the identity of the effective user running this process, if
    /// it can be determined.
    fn current_user(&self) -> Option<Identity>;

    /// Return the root directory of the volume holding the operating system,
    /// if this platform grants broad default permissions there.
    fn system_volume_root(&self) -> Option<PathBuf>;
}
