//! # `dir-trust`: decide whether a directory is safe to put files in.
//!
//! Before a privileged program creates, opens, or writes a file, it should
//! make sure that nobody it doesn't trust can redirect or tamper with that
//! operation.  It isn't enough to look at the target directory:
//!
//! * If the directory's _parent_ is writable by an untrusted user, that user
//!   can rename the directory away and put their own in its place.  The same
//!   goes for the parent's parent, and so on up to the root.
//! * If any directory along the way is a symbolic link (or a Windows reparse
//!   point), then the permissions that matter are those of the place it
//!   points to, _and all of that place's ancestors_.  Links can also point
//!   at each other in a cycle.
//! * If an object has unexpectedly many hard links, somebody may have made
//!   an alias for it somewhere we aren't looking.
//!
//! This crate checks all of that: it walks from the root of the filesystem
//! down to the target, and reports the shallowest element that is owned by,
//! or writable by, an untrusted identity.  It never tries to fix anything.
//!
//! ## Who is trusted?
//!
//! We use "trust" in the computer-security sense: an identity is trusted if
//! it could break our guarantees anyway.  On Unix, that's `root` and the
//! effective user of this process.  On Windows, it's the current user,
//! `SYSTEM`, `TrustedInstaller`, and the built-in Administrators group.
//!
//! Windows itself lets every authenticated user create entries in the
//! system volume root (`C:\`) and in its `Users` directory.  At exactly those
//! two places, and nowhere else, we also accept write grants to
//! "Authenticated Users" and "Everyone".
//!
//! ## Example
//!
//! ```no_run
//! use dir_trust::Validator;
//!
//! let validator = Validator::new();
//! let verdict = validator.validate("/var/lib/myservice/spool")?;
//! match verdict.resolved_path() {
//!     Some(path) => println!("okay to write into {}", path.display()),
//!     None => println!("refusing: {}", verdict.diagnostic().unwrap_or_default()),
//! }
//! # Ok::<(), dir_trust::Error>(())
//! ```
//!
//! Once a path has been found secure, **all future accesses should use the
//! resolved path** from the verdict: the original path might go through a
//! symlink that a trusted user could later repoint.
//!
//! To make sure that nothing changed between a check and a later use, take
//! a [`PermissionDescriptor`] snapshot with [`Validator::snapshot`] and
//! compare it afterwards with [`Validator::verify_unchanged`].
//!
//! ## Limitations
//!
//! This is not a general permissions model: we don't evaluate POSIX ACLs,
//! SELinux labels, or capabilities, and we reject anything we don't
//! understand rather than computing exact effective rights.
//!
//! Groups are untrusted unless the [`TrustPolicy`] names one, since there's
//! no guarantee that untrusted users won't be added to a group later.
//!
//! We don't look at mount points, and we can't tell a local administrator
//! from the administrator of a remote filesystem.

#![deny(missing_docs)]
#![warn(noop_method_call)]
#![deny(unreachable_pub)]
#![warn(clippy::all)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::cast_lossless)]
#![deny(clippy::checked_conversions)]
#![warn(clippy::cognitive_complexity)]
#![deny(clippy::debug_assert_with_mut_call)]
#![deny(clippy::exhaustive_enums)]
#![deny(clippy::exhaustive_structs)]
#![deny(clippy::expl_impl_clone_on_copy)]
#![deny(clippy::fallible_impl_from)]
#![deny(clippy::implicit_clone)]
#![deny(clippy::large_stack_arrays)]
#![warn(clippy::manual_ok_or)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::needless_pass_by_value)]
#![warn(clippy::option_option)]
#![warn(clippy::rc_buffer)]
#![deny(clippy::ref_option_ref)]
#![warn(clippy::semicolon_if_nothing_returned)]
#![warn(clippy::trait_duplication_in_bounds)]
#![deny(clippy::unnecessary_wraps)]
#![warn(clippy::unseparated_literal_suffix)]
#![deny(clippy::unwrap_used)]

mod anon_home;
mod descriptor;
mod err;
mod imp;
mod link;
mod meta;
mod sys;
mod trust;
pub mod walk;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use educe::Educe;
use tracing::info;

pub use anon_home::{AnonHomePath, PathExt};
pub use descriptor::{
    descriptors_equal, AccessMask, GrantEntry, GrantKind, Identity, PermissionDescriptor,
};
pub use err::Error;
pub use imp::MAX_HARD_LINKS;
pub use meta::{DirectoryAttributes, MetadataProvider, ObjectKind};
pub use sys::SystemProvider;
pub use trust::MAX_SYMLINK_DEPTH;

/// A result type as returned by this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration for deciding which directories are trustworthy.
///
/// By default, we trust the superuser and the current effective user, and we
/// check every directory from the root of the filesystem down.
#[derive(Debug, Clone, derive_builder::Builder, Eq, PartialEq)]
#[cfg_attr(feature = "serde", builder(derive(Debug, Serialize, Deserialize)))]
#[cfg_attr(not(feature = "serde"), builder(derive(Debug)))]
pub struct TrustPolicy {
    /// A directory whose ancestors are assumed to be correctly configured.
    ///
    /// This directory itself is still checked, but its ancestors are not.  A
    /// typical use is to stop at the user's home directory.
    ///
    /// If the directory does not exist, or is not an ancestor of a checked
    /// path, it is ignored.
    #[builder(default, setter(into, strip_option))]
    stop_at: Option<PathBuf>,

    /// A group ID whose members are all trusted.
    ///
    /// Directories that are writable by this group are accepted.
    #[builder(default, setter(strip_option))]
    trust_group: Option<u32>,

    /// If true, trust only the administrative identities, and not the user
    /// running this process.
    #[builder(default)]
    trust_admin_only: bool,
}

impl TrustPolicy {
    /// Return a new [`TrustPolicyBuilder`].
    pub fn builder() -> TrustPolicyBuilder {
        TrustPolicyBuilder::default()
    }

    /// Return the configured stopping-point directory, if any.
    pub fn stop_at(&self) -> Option<&Path> {
        self.stop_at.as_deref()
    }

    /// Return the configured trusted group, if any.
    pub fn trust_group(&self) -> Option<u32> {
        self.trust_group
    }

    /// Return true if we trust only the administrative identities.
    pub fn trust_admin_only(&self) -> bool {
        self.trust_admin_only
    }
}

impl Default for TrustPolicy {
    fn default() -> Self {
        TrustPolicyBuilder::default()
            .build()
            .expect("Could not build default")
    }
}

/// Tool to decide whether paths are safe to use.
///
/// A `Validator` combines a [`TrustPolicy`] with a [`MetadataProvider`].
/// It is cheap to clone, and can be shared between threads.
#[derive(Clone, Educe)]
#[educe(Debug)]
pub struct Validator {
    /// The rules we apply.
    policy: TrustPolicy,
    /// Where we learn about the filesystem.
    #[educe(Debug(ignore))]
    provider: Arc<dyn MetadataProvider>,
}

/// A type of object that we have been told to require.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Type {
    /// A directory.
    Dir,
    /// A regular file.
    File,
    /// A directory or a regular file.
    DirOrFile,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Return a new `Validator` with the default policy, which asks the
    /// operating system about paths.
    pub fn new() -> Self {
        Self::with_policy(TrustPolicy::default())
    }

    /// Return a new `Validator` with a given policy, which asks the
    /// operating system about paths.
    pub fn with_policy(policy: TrustPolicy) -> Self {
        Self::with_provider(policy, Arc::new(SystemProvider::new()))
    }

    /// Return a new `Validator` with a given policy and metadata provider.
    pub fn with_provider(policy: TrustPolicy, provider: Arc<dyn MetadataProvider>) -> Self {
        Validator { policy, provider }
    }

    /// Return the policy of this `Validator`.
    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }

    /// Create a new [`Verifier`] with this configuration, to perform a single
    /// check.
    pub fn verifier(&self) -> Verifier<'_> {
        Verifier {
            validator: self,
            enforce_type: Type::Dir,
        }
    }

    /// Decide whether `dir` is a directory that only trusted identities can
    /// modify or replace.
    ///
    /// Returns `Err` only if we could not reach a verdict at all; see
    /// [`Error::is_hard`].
    ///
    /// `v.validate(dir)` is equivalent to `v.verifier().validate(dir)`.
    pub fn validate<P: AsRef<Path>>(&self, dir: P) -> Result<Verdict> {
        self.verifier().validate(dir)
    }

    /// As [`Validator::validate`], but return the first problem as an error,
    /// and the resolved path on success.
    pub fn check_directory<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        self.verifier().check(dir)
    }

    /// Check that `path` (a directory or a regular file) is secure, and then
    /// return a snapshot of its ownership and permissions.
    ///
    /// Pass the snapshot to [`Validator::verify_unchanged`] after a sensitive
    /// operation to make sure that nothing changed in the meantime.
    pub fn snapshot<P: AsRef<Path>>(&self, path: P) -> Result<PermissionDescriptor> {
        let resolved = self.verifier().permit_file().check(path)?;
        let attrs = self.provider.directory_attributes(&resolved)?;
        Ok(attrs.into_descriptor())
    }

    /// Make sure that the ownership and permissions of `path` still match
    /// `snapshot`.
    ///
    /// `path` should be the resolved path of the object the snapshot was
    /// taken from.  If it has become a link, that counts as a change.
    pub fn verify_unchanged<P: AsRef<Path>>(
        &self,
        path: P,
        snapshot: &PermissionDescriptor,
    ) -> Result<()> {
        let path = path.as_ref();
        let attrs = self.provider.directory_attributes(path)?;
        if attrs.is_link() || !descriptors_equal(attrs.descriptor(), snapshot) {
            return Err(Error::DescriptorChanged(path.into()));
        }
        Ok(())
    }

    /// Build the trust context for a new top-level check.
    fn context(&self) -> trust::TrustContext {
        let current_user = if self.policy.trust_admin_only {
            None
        } else {
            self.provider.current_user()
        };
        trust::TrustContext::new(
            current_user,
            self.policy.trust_group.map(Identity::Gid),
            self.provider.system_volume_root(),
        )
    }
}

/// An object used to perform a single check.
///
/// A `Verifier` is used when [`Validator::validate`] and
/// [`Validator::check_directory`] are not sufficient for your needs.
#[derive(Clone, Debug)]
#[must_use]
pub struct Verifier<'a> {
    /// The [`Validator`] that was used to create this verifier.
    validator: &'a Validator,

    /// If the user called [`Verifier::require_file`] or
    /// [`Verifier::permit_file`], which did they call?
    enforce_type: Type,
}

impl<'a> Verifier<'a> {
    /// Configure this `Verifier` to require that the path it checks be a
    /// directory.  This is the default.
    pub fn require_directory(mut self) -> Self {
        self.enforce_type = Type::Dir;
        self
    }

    /// Configure this `Verifier` to require that the path it checks be a
    /// regular file.  Every ancestor must still be a directory.
    pub fn require_file(mut self) -> Self {
        self.enforce_type = Type::File;
        self
    }

    /// Configure this `Verifier` to accept either a directory or a regular
    /// file as the path it checks.
    pub fn permit_file(mut self) -> Self {
        self.enforce_type = Type::DirOrFile;
        self
    }

    /// Decide whether `path` conforms to the requirements of this `Verifier`
    /// and the [`Validator`] that created it.
    ///
    /// Returns `Err` only if we could not reach a verdict at all; see
    /// [`Error::is_hard`].
    pub fn validate<P: AsRef<Path>>(self, path: P) -> Result<Verdict> {
        let path = path.as_ref();
        match self.check(path) {
            Ok(resolved) => Ok(Verdict {
                outcome: Ok(resolved),
            }),
            Err(e) if e.is_hard() => Err(e),
            Err(e) => {
                info!(
                    "Rejecting {}: problem with {}",
                    path.anonymize_home(),
                    e.innermost().path().unwrap_or(path).anonymize_home()
                );
                Ok(Verdict { outcome: Err(e) })
            }
        }
    }

    /// Check whether `path` conforms to the requirements of this `Verifier`
    /// and the [`Validator`] that created it.
    ///
    /// On success, return `path` with every symbolic link resolved. **All
    /// future accesses to the target should use that path.**
    pub fn check<P: AsRef<Path>>(self, path: P) -> Result<PathBuf> {
        let validator = self.validator;
        let engine = imp::Engine::new(validator.provider.as_ref(), &validator.policy)?;
        engine.validate_at(path.as_ref(), &validator.context(), self.enforce_type)
    }
}

/// The outcome of validating a path.
#[derive(Debug, Clone)]
pub struct Verdict {
    /// The resolved path if secure; otherwise, the first problem found.
    outcome: std::result::Result<PathBuf, Error>,
}

impl Verdict {
    /// Return true if the path was found to be secure.
    pub fn is_secure(&self) -> bool {
        self.outcome.is_ok()
    }

    /// If the path was secure, return it with every symbolic link resolved.
    pub fn resolved_path(&self) -> Option<&Path> {
        self.outcome.as_ref().ok().map(PathBuf::as_path)
    }

    /// If the path was insecure, return the first problem we found.
    pub fn problem(&self) -> Option<&Error> {
        self.outcome.as_ref().err()
    }

    /// If the path was insecure, return a human-readable description of the
    /// first problem we found.
    pub fn diagnostic(&self) -> Option<String> {
        self.problem().map(ToString::to_string)
    }

    /// Convert this verdict into a `Result`.
    pub fn into_result(self) -> Result<PathBuf> {
        self.outcome
    }
}
