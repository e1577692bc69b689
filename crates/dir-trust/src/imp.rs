//! Implementation logic for `dir-trust`: the validation engine.

use std::{
    io::ErrorKind as IoErrorKind,
    path::{Path, PathBuf},
};

use tracing::{debug, trace};

use crate::anon_home::PathExt as _;
use crate::link;
use crate::meta::{DirectoryAttributes, MetadataProvider};
use crate::trust::{is_trusted_identity, TrustContext};
use crate::walk;
use crate::{Error, Result, TrustPolicy, Type};

/// The largest number of hard links that we tolerate on any object we
/// check.  More than this is treated as a sign of tampering.
pub const MAX_HARD_LINKS: u64 = 5;

/// A [`TrustPolicy`] with all of its details filled in, bound to a
/// metadata provider.
///
/// We use this to do the real checking of paths.
pub(crate) struct Engine<'a> {
    /// Where we get our information about the filesystem.
    provider: &'a dyn MetadataProvider,
    /// The `stop_at` directory of the policy, in canonical form.
    real_stop_at_dir: Option<PathBuf>,
}

impl<'a> Engine<'a> {
    /// Try to create a new engine for `policy`, using `provider`.
    pub(crate) fn new(provider: &'a dyn MetadataProvider, policy: &TrustPolicy) -> Result<Self> {
        // We need to canonicalize the stopping-point directory to make sure
        // that we find it among our ancestors, if it is there.  We ignore
        // "not found" errors, but others are fatal.
        let real_stop_at_dir = match policy.stop_at() {
            Some(stop_at) => match provider.canonicalize(stop_at) {
                Ok(pb) => Some(pb),
                Err(err) if err.kind() == IoErrorKind::NotFound => None,
                Err(err) => return Err(Error::inspecting(err, stop_at)),
            },
            None => None,
        };

        Ok(Engine {
            provider,
            real_stop_at_dir,
        })
    }

    /// Return the provider that this engine uses.
    pub(crate) fn provider(&self) -> &dyn MetadataProvider {
        self.provider
    }

    /// Check every directory from the root down to `path`, and `path`
    /// itself, which must be of type `want`.
    ///
    /// On success, return the location of `path` with every symbolic link
    /// resolved.  On failure, return the problem with the shallowest
    /// element that has one.
    pub(crate) fn validate_at(
        &self,
        path: &Path,
        context: &TrustContext,
        want: Type,
    ) -> Result<PathBuf> {
        debug!(
            "Checking {} (link depth {})",
            path.anonymize_home(),
            context.depth()
        );
        let ancestors = walk::ancestors(path)?;
        let last = ancestors.len() - 1;

        // Where the previous element actually lives, after resolving links.
        let mut resolved: Option<PathBuf> = None;
        for (position, lexical) in ancestors.iter().enumerate() {
            let want_here = if position == last { want } else { Type::Dir };
            let (here, parent) = match (resolved.take(), lexical.file_name()) {
                (Some(parent), Some(name)) => (parent.join(name), parent),
                (None, _) => (lexical.clone(), lexical.clone()),
                (Some(_), None) => {
                    return Err(Error::InvalidPath(path.into(), "unnamed path component"))
                }
            };
            resolved = Some(self.check_one(&here, &parent, context, want_here)?);
        }

        // `ancestors` is never empty.
        resolved.ok_or(Error::InvalidPath(path.into(), "no ancestors"))
    }

    /// Check a single element `here`, whose parent directory is at `parent`.
    ///
    /// Return the resolved location of `here`.
    fn check_one(
        &self,
        here: &Path,
        parent: &Path,
        context: &TrustContext,
        want: Type,
    ) -> Result<PathBuf> {
        if self.is_above_stopping_point(here) {
            trace!("Skipping {}: above stopping point", here.anonymize_home());
            return Ok(here.into());
        }

        let attrs = self.provider.directory_attributes(here)?;

        if attrs.hard_link_count() > MAX_HARD_LINKS {
            return Err(Error::ExcessiveLinkCount(
                here.into(),
                attrs.hard_link_count(),
            ));
        }

        if attrs.is_link() {
            // The directory holding the link has been checked already, so
            // only the link's target remains.
            return link::resolve_and_validate(self, here, parent, context, want);
        }

        match want {
            Type::Dir if !attrs.is_directory() => return Err(Error::NotADirectory(here.into())),
            Type::File if !attrs.is_file() => return Err(Error::NotAFile(here.into())),
            Type::DirOrFile if !(attrs.is_directory() || attrs.is_file()) => {
                return Err(Error::NotADirectory(here.into()))
            }
            _ => {}
        }

        check_ownership(here, &attrs, context)?;
        trace!("{} is okay", here.anonymize_home());
        Ok(here.into())
    }

    /// Return true if `path` is a strict ancestor of our configured stopping
    /// point.
    fn is_above_stopping_point(&self, path: &Path) -> bool {
        match &self.real_stop_at_dir {
            Some(stop) => stop != path && stop.starts_with(path),
            None => false,
        }
    }
}

/// Make sure that the owner of the object at `path` is trusted, and that it
/// grants no write-class rights to any untrusted identity.
fn check_ownership(path: &Path, attrs: &DirectoryAttributes, context: &TrustContext) -> Result<()> {
    // The owner can always change the permissions of the object, and if it
    // is a directory, the owner can replace anything inside it.  So the
    // owner must be trusted everywhere, carve-out or not.
    let owner = attrs.owner();
    if !is_trusted_identity(owner, context, false) {
        return Err(Error::UntrustedOwner(path.into(), owner.clone()));
    }

    let carve_out = context.is_carve_out(path);
    if let Some(grant) = attrs
        .descriptor()
        .grants()
        .iter()
        .filter(|g| g.grants_modification())
        .find(|g| !is_trusted_identity(&g.identity, context, carve_out))
    {
        return Err(Error::UntrustedGrant(
            path.into(),
            grant.identity.clone(),
            grant.mask,
        ));
    }

    Ok(())
}
