//! Replace the user's home directory with `${HOME}` when displaying paths.
//!
//! We use this for our log messages, which tend to end up in log files.  A
//! user's home directory usually contains their login name, which we would
//! rather not write there.
//!
//! Errors always show the full path, since whoever reads them needs to know
//! which directory to fix.

use std::{
    fmt::{self, Display},
    path::Path,
};

use extend::ext;
#[cfg(feature = "anon_home")]
use once_cell::sync::Lazy;

/// The canonical form of the current user's home directory, if known.
///
/// A home directory at the filesystem root is ignored.
#[cfg(feature = "anon_home")]
pub(crate) static HOMEDIR: Lazy<Option<std::path::PathBuf>> = Lazy::new(|| {
    dirs::home_dir()
        .map(|p| p.canonicalize().unwrap_or(p))
        .filter(|p| p.parent().is_some())
});

/// Extension trait to display a path with its home directory elided.
#[ext(name = PathExt)]
pub impl Path {
    /// Return a wrapper that displays this path with the home directory (if
    /// any) replaced by `${HOME}`.
    ///
    /// Without the `anon_home` feature, the path is displayed unchanged.
    fn anonymize_home(&self) -> AnonHomePath<'_> {
        AnonHomePath(self)
    }
}

/// A path that displays with the home directory anonymized.
///
/// Returned by [`PathExt::anonymize_home`].
#[derive(Clone, Debug)]
pub struct AnonHomePath<'a>(&'a Path);

impl Display for AnonHomePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[cfg(feature = "anon_home")]
        if let Some(home) = HOMEDIR.as_deref() {
            if let Ok(rest) = self.0.strip_prefix(home) {
                return if rest.as_os_str().is_empty() {
                    write!(f, "${{HOME}}")
                } else {
                    write!(
                        f,
                        "${{HOME}}{}{}",
                        std::path::MAIN_SEPARATOR,
                        rest.display()
                    )
                };
            }
        }
        self.0.display().fmt(f)
    }
}
