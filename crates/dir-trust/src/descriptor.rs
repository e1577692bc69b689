//! Ownership and access-grant information for a single filesystem object.
//!
//! We model everything the way a Windows security descriptor does: an owner,
//! an optional group, and an ordered list of grant entries.  On POSIX, the
//! mode bits become three entries (owner, group, and "others").

use std::fmt;

use derive_more::{BitOr, BitOrAssign, Display, From, Into};

/// A principal that can own a filesystem object or be granted access to one.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum Identity {
    /// A POSIX user ID.
    Uid(u32),
    /// A POSIX group ID.
    Gid(u32),
    /// The POSIX "other" class: every user who is neither owner nor in the
    /// owning group.
    Others,
    /// A Windows security identifier, in its string form (`S-1-5-18`).
    Sid(String),
    /// An identity that we could not read or parse.
    ///
    /// This is never trusted.
    Invalid,
}

impl Identity {
    /// Construct an [`Identity::Sid`] from its string form.
    pub fn sid<S: Into<String>>(s: S) -> Self {
        Identity::Sid(s.into())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Uid(uid) => write!(f, "uid {}", uid),
            Identity::Gid(gid) => write!(f, "gid {}", gid),
            Identity::Others => write!(f, "all other users"),
            Identity::Sid(sid) => write!(f, "{}", sid),
            Identity::Invalid => write!(f, "<unreadable identity>"),
        }
    }
}

/// A set of access rights, using the Windows bit layout.
///
/// POSIX permission bits are translated into this layout by
/// [`AccessMask::from_rwx`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Eq,
    PartialEq,
    Hash,
    BitOr,
    BitOrAssign,
    Display,
    From,
    Into,
)]
#[display(fmt = "{:#010x}", _0)]
pub struct AccessMask(u32);

impl AccessMask {
    /// Read data, or list a directory.
    pub const READ_DATA: AccessMask = AccessMask(0x0000_0001);
    /// Write data, or add a file to a directory.
    pub const WRITE_DATA: AccessMask = AccessMask(0x0000_0002);
    /// Append data, or add a subdirectory to a directory.
    pub const APPEND_DATA: AccessMask = AccessMask(0x0000_0004);
    /// Write extended attributes.
    pub const WRITE_EA: AccessMask = AccessMask(0x0000_0010);
    /// Execute a file, or traverse a directory.
    pub const EXECUTE: AccessMask = AccessMask(0x0000_0020);
    /// Delete any entry within a directory.
    pub const DELETE_CHILD: AccessMask = AccessMask(0x0000_0040);
    /// Change basic attributes.
    pub const WRITE_ATTRIBUTES: AccessMask = AccessMask(0x0000_0100);
    /// Delete the object itself.
    pub const DELETE: AccessMask = AccessMask(0x0001_0000);
    /// Change the object's access-control list.
    pub const WRITE_DAC: AccessMask = AccessMask(0x0004_0000);
    /// Take ownership of the object.
    pub const WRITE_OWNER: AccessMask = AccessMask(0x0008_0000);
    /// Every right.
    pub const GENERIC_ALL: AccessMask = AccessMask(0x1000_0000);
    /// Every write-class right.
    pub const GENERIC_WRITE: AccessMask = AccessMask(0x4000_0000);

    /// The rights that let their holder change the object, change what is in
    /// it, or change who may do so.
    const MODIFY: AccessMask = AccessMask(
        Self::WRITE_DATA.0
            | Self::APPEND_DATA.0
            | Self::DELETE_CHILD.0
            | Self::WRITE_DAC.0
            | Self::WRITE_OWNER.0
            | Self::GENERIC_ALL.0
            | Self::GENERIC_WRITE.0,
    );

    /// Return the raw bits of this mask.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Return true if every right in `other` is also in `self`.
    pub fn contains(self, other: AccessMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Return true if this mask grants any right that would let its holder
    /// write to, append to, or otherwise modify the object.
    pub fn permits_modification(self) -> bool {
        self.0 & Self::MODIFY.0 != 0
    }

    /// Translate a three-bit POSIX `rwx` triple into an access mask.
    pub fn from_rwx(rwx: u32) -> Self {
        let mut mask = AccessMask::default();
        if rwx & 0o4 != 0 {
            mask |= AccessMask::READ_DATA;
        }
        if rwx & 0o2 != 0 {
            mask |= AccessMask::WRITE_DATA | AccessMask::APPEND_DATA | AccessMask::DELETE_CHILD;
        }
        if rwx & 0o1 != 0 {
            mask |= AccessMask::EXECUTE;
        }
        mask
    }
}

/// What a [`GrantEntry`] does with its access mask.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum GrantKind {
    /// The identity is allowed the rights in the mask.
    Allow,
    /// The identity is denied the rights in the mask.
    Deny,
    /// Some other kind of entry (audit, alarm, object-specific, ...), by its
    /// raw type byte.
    Other(u8),
}

/// A single entry in an object's access-control list.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub struct GrantEntry {
    /// What kind of entry this is.
    pub kind: GrantKind,
    /// Inheritance flags, in the Windows layout.
    pub flags: u8,
    /// The encoded size of the entry, as reported by the platform.
    pub size: u16,
    /// Whom this entry is about.
    pub identity: Identity,
    /// Which rights are allowed or denied.
    pub mask: AccessMask,
}

impl GrantEntry {
    /// Flag: this entry is only inherited by children, and has no effect on
    /// the object itself.
    pub const INHERIT_ONLY: u8 = 0x08;

    /// Construct a new allow-entry with no flags.
    pub fn allow(identity: Identity, mask: AccessMask) -> Self {
        GrantEntry {
            kind: GrantKind::Allow,
            flags: 0,
            size: 0,
            identity,
            mask,
        }
    }

    /// Construct a new deny-entry with no flags.
    pub fn deny(identity: Identity, mask: AccessMask) -> Self {
        GrantEntry {
            kind: GrantKind::Deny,
            ..GrantEntry::allow(identity, mask)
        }
    }

    /// Construct an entry from every one of its parts.
    pub fn new(kind: GrantKind, flags: u8, size: u16, identity: Identity, mask: AccessMask) -> Self {
        GrantEntry {
            kind,
            flags,
            size,
            identity,
            mask,
        }
    }

    /// Return this entry with `flags` replacing its flags.
    #[must_use]
    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    /// Return true if this entry gives its identity a right to modify the
    /// object it is attached to.
    ///
    /// Entries of unrecognized kinds are assumed to grant whatever their mask
    /// says.
    pub fn grants_modification(&self) -> bool {
        self.kind != GrantKind::Deny
            && self.flags & Self::INHERIT_ONLY == 0
            && self.mask.permits_modification()
    }
}

/// The ownership and access-control information for one filesystem object.
///
/// Two descriptors are compared with [`descriptors_equal`] (which is also
/// what `==` does).  Comparison never mutates either descriptor.
#[derive(Debug, Clone, Eq)]
pub struct PermissionDescriptor {
    /// The owner of the object.
    owner: Identity,
    /// True if the owner was filled in by a default mechanism.
    owner_defaulted: bool,
    /// The owning group of the object, if the platform has one.
    group: Option<Identity>,
    /// True if the group was filled in by a default mechanism.
    group_defaulted: bool,
    /// The ordered list of grant entries.
    grants: Vec<GrantEntry>,
}

impl PermissionDescriptor {
    /// Construct a new descriptor with a given owner and no grants.
    pub fn new(owner: Identity) -> Self {
        PermissionDescriptor {
            owner,
            owner_defaulted: false,
            group: None,
            group_defaulted: false,
            grants: Vec::new(),
        }
    }

    /// Build the descriptor corresponding to a POSIX owner, group and mode.
    pub fn from_mode(uid: u32, gid: u32, mode: u32) -> Self {
        PermissionDescriptor::new(Identity::Uid(uid))
            .with_group(Identity::Gid(gid))
            .with_grant(GrantEntry::allow(
                Identity::Uid(uid),
                AccessMask::from_rwx((mode >> 6) & 0o7),
            ))
            .with_grant(GrantEntry::allow(
                Identity::Gid(gid),
                AccessMask::from_rwx((mode >> 3) & 0o7),
            ))
            .with_grant(GrantEntry::allow(
                Identity::Others,
                AccessMask::from_rwx(mode & 0o7),
            ))
    }

    /// Set the owning group.
    #[must_use]
    pub fn with_group(mut self, group: Identity) -> Self {
        self.group = Some(group);
        self
    }

    /// Set the "defaulted" flags for the owner and the group.
    #[must_use]
    pub fn with_defaulted(mut self, owner_defaulted: bool, group_defaulted: bool) -> Self {
        self.owner_defaulted = owner_defaulted;
        self.group_defaulted = group_defaulted;
        self
    }

    /// Append a grant entry.
    #[must_use]
    pub fn with_grant(mut self, grant: GrantEntry) -> Self {
        self.grants.push(grant);
        self
    }

    /// Return the owner.
    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    /// Return the owning group, if any.
    pub fn group(&self) -> Option<&Identity> {
        self.group.as_ref()
    }

    /// Return true if the owner was defaulted.
    pub fn owner_defaulted(&self) -> bool {
        self.owner_defaulted
    }

    /// Return true if the group was defaulted.
    pub fn group_defaulted(&self) -> bool {
        self.group_defaulted
    }

    /// Return the grant entries, in order.
    pub fn grants(&self) -> &[GrantEntry] {
        &self.grants[..]
    }
}

impl PartialEq for PermissionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        descriptors_equal(self, other)
    }
}

/// Return true if `a` and `b` describe the same ownership and access grants.
///
/// Owners, groups, both "defaulted" flags, and the full ordered list of
/// grant entries must match.  Descriptors with different numbers of entries
/// are unequal without looking further.
pub fn descriptors_equal(a: &PermissionDescriptor, b: &PermissionDescriptor) -> bool {
    if a.grants.len() != b.grants.len() {
        return false;
    }
    a.owner == b.owner
        && a.owner_defaulted == b.owner_defaulted
        && a.group == b.group
        && a.group_defaulted == b.group_defaulted
        && a.grants.iter().zip(b.grants.iter()).all(|(x, y)| x == y)
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn sample() -> PermissionDescriptor {
        PermissionDescriptor::new(Identity::sid("S-1-5-32-544"))
            .with_group(Identity::sid("S-1-5-18"))
            .with_grant(GrantEntry::allow(
                Identity::sid("S-1-5-18"),
                AccessMask::GENERIC_ALL,
            ))
            .with_grant(GrantEntry::allow(
                Identity::sid("S-1-5-11"),
                AccessMask::READ_DATA | AccessMask::EXECUTE,
            ))
    }

    #[test]
    fn rwx_translation() {
        assert_eq!(AccessMask::from_rwx(0), AccessMask::default());
        assert!(!AccessMask::from_rwx(0o5).permits_modification());
        assert!(AccessMask::from_rwx(0o2).permits_modification());
        assert!(AccessMask::from_rwx(0o7).contains(AccessMask::READ_DATA | AccessMask::EXECUTE));
        assert!(!AccessMask::READ_DATA.permits_modification());
        assert!(AccessMask::WRITE_OWNER.permits_modification());
        assert!(AccessMask::GENERIC_WRITE.permits_modification());
    }

    #[test]
    fn from_mode() {
        let d = PermissionDescriptor::from_mode(1000, 100, 0o750);
        assert_eq!(d.owner(), &Identity::Uid(1000));
        assert_eq!(d.group(), Some(&Identity::Gid(100)));
        let g = d.grants();
        assert_eq!(g.len(), 3);
        assert_eq!(g[0].identity, Identity::Uid(1000));
        assert!(g[0].grants_modification());
        assert_eq!(g[1].identity, Identity::Gid(100));
        assert!(!g[1].grants_modification());
        assert_eq!(g[2].identity, Identity::Others);
        assert_eq!(g[2].mask, AccessMask::default());
    }

    #[test]
    fn inherit_only_and_deny_grant_nothing() {
        let write = AccessMask::WRITE_DATA;
        assert!(GrantEntry::allow(Identity::Others, write).grants_modification());
        assert!(!GrantEntry::deny(Identity::Others, write).grants_modification());
        assert!(!GrantEntry::allow(Identity::Others, write)
            .with_flags(GrantEntry::INHERIT_ONLY)
            .grants_modification());
        assert!(
            GrantEntry::new(GrantKind::Other(9), 0, 0, Identity::Invalid, write)
                .grants_modification()
        );
    }

    #[test]
    fn equality() {
        let a = sample();
        assert!(descriptors_equal(&a, &a));
        assert!(descriptors_equal(&a, &sample()));
        assert_eq!(a, sample());

        // One mask differs.
        let b = PermissionDescriptor::new(Identity::sid("S-1-5-32-544"))
            .with_group(Identity::sid("S-1-5-18"))
            .with_grant(GrantEntry::allow(
                Identity::sid("S-1-5-18"),
                AccessMask::GENERIC_ALL,
            ))
            .with_grant(GrantEntry::allow(
                Identity::sid("S-1-5-11"),
                AccessMask::READ_DATA | AccessMask::EXECUTE | AccessMask::APPEND_DATA,
            ));
        assert!(!descriptors_equal(&a, &b));

        // Length differs.
        let c = sample().with_grant(GrantEntry::deny(Identity::Others, AccessMask::WRITE_DATA));
        assert!(!descriptors_equal(&a, &c));

        // Defaulted flags differ.
        let d = sample().with_defaulted(false, true);
        assert!(!descriptors_equal(&a, &d));

        // Only the owner differs.
        let mut f = sample();
        f.owner = Identity::sid("S-1-5-18");
        assert!(!descriptors_equal(&a, &f));

        // Only the group differs, or is missing.
        let g = sample().with_group(Identity::sid("S-1-5-32-544"));
        assert!(!descriptors_equal(&a, &g));
        let mut h = sample();
        h.group = None;
        assert!(!descriptors_equal(&a, &h));

        // Entry flags differ.
        let mut e = sample();
        e.grants[1] = e.grants[1].clone().with_flags(GrantEntry::INHERIT_ONLY);
        assert!(!descriptors_equal(&a, &e));
    }
}
