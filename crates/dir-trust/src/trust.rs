//! Decide which identities we trust, and where.
//!
//! We use "trust" in the computer-security sense: an identity is trusted if
//! it has the opportunity to break our security guarantees anyway.  The
//! superuser can always replace our files, so we may as well share directory
//! ownership with it.  Nobody else gets that benefit, except the user we are
//! running as.

use std::path::{Path, PathBuf};

use crate::descriptor::Identity;

/// The deepest chain of symbolic links that we will follow.
pub const MAX_SYMLINK_DEPTH: usize = 5;

/// String forms of the Windows identities that we always trust.
const TRUSTED_SIDS: &[&str] = &[
    // NT AUTHORITY\SYSTEM
    "S-1-5-18",
    // BUILTIN\Administrators
    "S-1-5-32-544",
    // NT SERVICE\TrustedInstaller
    "S-1-5-80-956008885-3418522649-1831038044-1853292631-2271478464",
];

/// String forms of the broad Windows identities that we trust only at a
/// carve-out path.
const BROAD_SIDS: &[&str] = &[
    // NT AUTHORITY\Authenticated Users
    "S-1-5-11",
    // Everyone
    "S-1-1-0",
];

/// The name of the per-user root directory under the system volume root.
const USERS_DIR: &str = "Users";

/// The identities and locations that a single validation trusts.
///
/// A context is cheap to clone.  It carries the symlink depth of the check
/// in progress, so that each recursive check has its own.
#[derive(Debug, Clone)]
pub(crate) struct TrustContext {
    /// The user we're running as, unless we've been told not to trust it.
    current_user: Option<Identity>,
    /// A group that the configuration tells us to trust, if any.
    trusted_group: Option<Identity>,
    /// The root of the system volume, if the platform has carve-outs.
    system_volume_root: Option<PathBuf>,
    /// How many symbolic links we have followed to get here.
    depth: usize,
}

impl TrustContext {
    /// Construct a new context at depth zero.
    pub(crate) fn new(
        current_user: Option<Identity>,
        trusted_group: Option<Identity>,
        system_volume_root: Option<PathBuf>,
    ) -> Self {
        TrustContext {
            current_user,
            trusted_group,
            system_volume_root,
            depth: 0,
        }
    }

    /// Return the number of symbolic links followed so far.
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// Return a context for checking the target of one more symbolic link,
    /// or `None` if that would exceed [`MAX_SYMLINK_DEPTH`].
    pub(crate) fn descend(&self) -> Option<TrustContext> {
        let depth = self.depth + 1;
        (depth <= MAX_SYMLINK_DEPTH).then(|| TrustContext {
            depth,
            ..self.clone()
        })
    }

    /// Return true if `path` is one of the places where the operating system
    /// itself grants broad write access: the system volume root, and its
    /// per-user root directory.
    pub(crate) fn is_carve_out(&self, path: &Path) -> bool {
        match &self.system_volume_root {
            Some(root) => same_path(path, root) || same_path(path, &root.join(USERS_DIR)),
            None => false,
        }
    }
}

/// Return true if `a` and `b` name the same location.
///
/// Windows paths are compared without regard to ASCII case.
fn same_path(a: &Path, b: &Path) -> bool {
    if cfg!(windows) {
        a.as_os_str().eq_ignore_ascii_case(b.as_os_str())
    } else {
        a == b
    }
}

/// Return true if `identity` is one that we always trust.
fn is_well_known_trusted(identity: &Identity) -> bool {
    match identity {
        Identity::Uid(0) => true,
        Identity::Sid(sid) => TRUSTED_SIDS.contains(&sid.as_str()),
        _ => false,
    }
}

/// Return true if `identity` is one that we trust only at a carve-out.
fn is_broad(identity: &Identity) -> bool {
    match identity {
        Identity::Sid(sid) => BROAD_SIDS.contains(&sid.as_str()),
        _ => false,
    }
}

/// Return true if `identity` may own, or hold write access to, a directory
/// that we depend on.
///
/// `allow_broad_grants` must only be set when checking one of the
/// [carve-out paths](TrustContext::is_carve_out).
pub(crate) fn is_trusted_identity(
    identity: &Identity,
    context: &TrustContext,
    allow_broad_grants: bool,
) -> bool {
    if *identity == Identity::Invalid {
        return false;
    }
    if context.current_user.as_ref() == Some(identity)
        || context.trusted_group.as_ref() == Some(identity)
    {
        return true;
    }
    is_well_known_trusted(identity) || (allow_broad_grants && is_broad(identity))
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn ctx() -> TrustContext {
        TrustContext::new(Some(Identity::Uid(1000)), None, None)
    }

    #[test]
    fn posix_trust() {
        let c = ctx();
        assert!(is_trusted_identity(&Identity::Uid(0), &c, false));
        assert!(is_trusted_identity(&Identity::Uid(1000), &c, false));
        assert!(!is_trusted_identity(&Identity::Uid(1001), &c, false));
        assert!(!is_trusted_identity(&Identity::Gid(0), &c, false));
        assert!(!is_trusted_identity(&Identity::Others, &c, true));
        assert!(!is_trusted_identity(&Identity::Invalid, &c, true));

        let c = TrustContext::new(None, Some(Identity::Gid(50)), None);
        assert!(!is_trusted_identity(&Identity::Uid(1000), &c, false));
        assert!(is_trusted_identity(&Identity::Gid(50), &c, false));
        assert!(is_trusted_identity(&Identity::Uid(0), &c, false));
    }

    #[test]
    fn sid_trust() {
        let c = TrustContext::new(Some(Identity::sid("S-1-5-21-1-2-3-1001")), None, None);
        assert!(is_trusted_identity(&Identity::sid("S-1-5-18"), &c, false));
        assert!(is_trusted_identity(&Identity::sid("S-1-5-32-544"), &c, false));
        assert!(is_trusted_identity(
            &Identity::sid("S-1-5-21-1-2-3-1001"),
            &c,
            false
        ));
        assert!(!is_trusted_identity(
            &Identity::sid("S-1-5-21-1-2-3-1002"),
            &c,
            false
        ));

        for broad in ["S-1-5-11", "S-1-1-0"] {
            assert!(!is_trusted_identity(&Identity::sid(broad), &c, false));
            assert!(is_trusted_identity(&Identity::sid(broad), &c, true));
        }
        // BUILTIN\Users is not one of the broad identities.
        assert!(!is_trusted_identity(&Identity::sid("S-1-5-32-545"), &c, true));
    }

    #[test]
    fn carve_outs() {
        let c = TrustContext::new(None, None, Some("/sysvol".into()));
        assert!(c.is_carve_out(Path::new("/sysvol")));
        assert!(c.is_carve_out(Path::new("/sysvol/Users")));
        assert!(!c.is_carve_out(Path::new("/sysvol/Users/alice")));
        assert!(!c.is_carve_out(Path::new("/sysvol/Shared")));
        assert!(!c.is_carve_out(Path::new("/")));

        assert!(!ctx().is_carve_out(Path::new("/")));
    }

    #[test]
    fn depth() {
        let mut c = ctx();
        for expected in 1..=MAX_SYMLINK_DEPTH {
            c = c.descend().unwrap();
            assert_eq!(c.depth(), expected);
        }
        assert!(c.descend().is_none());
        // Descending doesn't change the original.
        assert_eq!(ctx().descend().unwrap().depth(), 1);
    }
}
