//! Declare an Error type for `dir-trust`.

use std::{
    collections::TryReserveError,
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;

use crate::descriptor::{AccessMask, Identity};

/// An error returned while checking a path for trustworthiness.
///
/// Every variant except [`Error::Exhausted`] describes a reason to consider
/// a path insecure.  See [`Error::is_hard`].
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The path was empty, relative, or otherwise not something we can
    /// decompose into ancestors.
    #[error("Invalid path {}: {1}", .0.display())]
    InvalidPath(PathBuf, &'static str),

    /// The path had more components than we are willing to examine.
    #[error("Path {} has more than {1} components", .0.display())]
    PathTooDeep(PathBuf, usize),

    /// A path element did not exist.
    #[error("File or directory {} not found", .0.display())]
    NotFound(PathBuf),

    /// A path element exists, but we could not read its metadata.
    #[error("Unable to read metadata for {}", .0.display())]
    MetadataUnavailable(PathBuf, #[source] Arc<std::io::Error>),

    /// We could read a path element's type, but not its owner or grants.
    #[error("Unable to read security descriptor of {}: {1}", .0.display())]
    UnreadableDescriptor(PathBuf, String),

    /// A path element is owned by an untrusted identity.
    #[error("Bad owner ({1}) on {}", .0.display())]
    UntrustedOwner(PathBuf, Identity),

    /// A path element grants a write-class right to an untrusted identity.
    #[error("Untrusted {1} may modify {} (access mask {2})", .0.display())]
    UntrustedGrant(PathBuf, Identity, AccessMask),

    /// A path element has more hard links than we tolerate.
    #[error("Too many hard links ({1}) to {}", .0.display())]
    ExcessiveLinkCount(PathBuf, u64),

    /// Following a symbolic link would exceed our depth limit; there is
    /// probably a cycle.
    #[error("Too many symlinks: giving up at {} after following {1}", .0.display())]
    SymlinkCycleSuspected(PathBuf, usize),

    /// We could not read or interpret the target of a symbolic link.
    #[error("Unable to resolve symlink {}: {1}", .0.display())]
    SymlinkResolutionFailed(PathBuf, String),

    /// The target of a symbolic link failed validation.
    #[error("Via symlink {}: {source}", .link.display())]
    ViaSymlink {
        /// The link whose target was rejected.
        link: PathBuf,
        /// Why the target was rejected.
        source: Box<Error>,
    },

    /// A path element that needs to be a directory is something else.
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// The target was required to be a regular file, and is something else.
    #[error("{} is not a regular file", .0.display())]
    NotAFile(PathBuf),

    /// A security descriptor changed since the snapshot we were given.
    #[error("Ownership or permissions of {} changed since they were checked", .0.display())]
    DescriptorChanged(PathBuf),

    /// We ran out of memory while building the list of ancestors.
    ///
    /// This does not mean that the path is insecure: only that we could not
    /// tell.
    #[error("Out of memory while examining {}", .0.display())]
    Exhausted(PathBuf, #[source] TryReserveError),
}

impl Error {
    /// Create an error from an IoError encountered while inspecting the
    /// metadata of `path`.
    pub(crate) fn inspecting(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.into()),
            _ => Error::MetadataUnavailable(path.into(), Arc::new(err)),
        }
    }

    /// Return the path, if any, associated with this error.
    ///
    /// For [`Error::ViaSymlink`], this is the link itself; use
    /// [`Error::innermost`] to find the element that actually failed.
    pub fn path(&self) -> Option<&Path> {
        Some(
            match self {
                Error::InvalidPath(pb, _) => pb,
                Error::PathTooDeep(pb, _) => pb,
                Error::NotFound(pb) => pb,
                Error::MetadataUnavailable(pb, _) => pb,
                Error::UnreadableDescriptor(pb, _) => pb,
                Error::UntrustedOwner(pb, _) => pb,
                Error::UntrustedGrant(pb, _, _) => pb,
                Error::ExcessiveLinkCount(pb, _) => pb,
                Error::SymlinkCycleSuspected(pb, _) => pb,
                Error::SymlinkResolutionFailed(pb, _) => pb,
                Error::ViaSymlink { link, .. } => link,
                Error::NotADirectory(pb) => pb,
                Error::NotAFile(pb) => pb,
                Error::DescriptorChanged(pb) => pb,
                Error::Exhausted(pb, _) => pb,
            }
            .as_path(),
        )
    }

    /// Follow any chain of [`Error::ViaSymlink`] wrappers, and return the
    /// error that caused it.
    pub fn innermost(&self) -> &Error {
        let mut e = self;
        while let Error::ViaSymlink { source, .. } = e {
            e = source.as_ref();
        }
        e
    }

    /// Return true if this error means that we could not reach a verdict at
    /// all, rather than that the path is insecure.
    ///
    /// A caller might retry after a hard error, or treat the path as
    /// "unknown"; a caller must never treat it as "secure".
    pub fn is_hard(&self) -> bool {
        matches!(self.innermost(), Error::Exhausted(..))
    }

    /// Wrap this error to show that it happened while checking the target of
    /// `link`.
    pub(crate) fn via_symlink(self, link: impl Into<PathBuf>) -> Self {
        Error::ViaSymlink {
            link: link.into(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn io_kinds() {
        let e = Error::inspecting(std::io::ErrorKind::NotFound.into(), "/a");
        assert!(matches!(e, Error::NotFound(_)));
        let e = Error::inspecting(std::io::ErrorKind::PermissionDenied.into(), "/a");
        assert!(matches!(e, Error::MetadataUnavailable(..)));
        assert_eq!(e.path(), Some(Path::new("/a")));
        assert!(!e.is_hard());
    }

    #[test]
    fn chain() {
        let inner = Error::UntrustedOwner("/b/c".into(), Identity::Uid(77));
        let e = inner.via_symlink("/a/l1").via_symlink("/x/l0");
        assert_eq!(e.path(), Some(Path::new("/x/l0")));
        assert!(matches!(e.innermost(), Error::UntrustedOwner(_, Identity::Uid(77))));
        assert_eq!(e.innermost().path(), Some(Path::new("/b/c")));

        let msg = e.to_string();
        assert!(msg.contains("l0"));
        assert!(msg.contains("l1"));
        assert!(msg.contains("uid 77"));
    }

    #[test]
    fn hard_errors() {
        let mut v: Vec<u8> = Vec::new();
        let tre = v.try_reserve(usize::MAX).unwrap_err();
        let e = Error::Exhausted("/a".into(), tre).via_symlink("/l");
        assert!(e.is_hard());
    }
}
