//! Package derivation and frame filtering

use std::fmt;

/// Decides whether frames from a package are kept in a captured stack.
///
/// The package passed in is the *full* package derived from the frame's
/// function name (see [`derive_package`]). Any `Fn(&str) -> bool` closure that
/// is `Send + Sync` is a filter too.
///
/// # Example
///
/// ```rust
/// use stackerr::{PackageFilter, ExactPackage};
///
/// let filter = ExactPackage::new("github.com/acme/billing");
/// assert!(filter.include("github.com/acme/billing"));
/// assert!(!filter.include("github.com/acme/ledger"));
///
/// let prefix = |package: &str| package.starts_with("github.com/acme");
/// assert!(prefix.include("github.com/acme/ledger"));
/// ```
pub trait PackageFilter: Send + Sync {
    /// Returns true when frames from `package` should be retained
    fn include(&self, package: &str) -> bool;
}

impl<F> PackageFilter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn include(&self, package: &str) -> bool {
        self(package)
    }
}

/// Filter that retains exactly one full package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactPackage {
    package: String,
}

impl ExactPackage {
    /// Create a filter matching `package` exactly
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
        }
    }

    /// The package this filter matches
    pub fn package(&self) -> &str {
        &self.package
    }
}

impl PackageFilter for ExactPackage {
    fn include(&self, package: &str) -> bool {
        self.package == package
    }
}

impl fmt::Display for ExactPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.package)
    }
}

/// Split a qualified function name into its `(full, short)` package names.
///
/// Names of the form `a/b/pkg.Func.func2` give `("a/b/pkg", "pkg")`; without a
/// path separator the leading token is both (`pkg.Func` gives `("pkg", "pkg")`).
/// The package delimiter is either `.` or `::`, so a demangled Rust path such as
/// `stackerr::error::StackError::new` resolves to its crate name. Leading `<`
/// and `&` of trait-impl paths are ignored.
///
/// A path separator with no delimiter after it leaves `short` empty and `full`
/// ending in the separator.
pub fn derive_package(function: &str) -> (String, String) {
    let name = function.trim_start_matches(&['<', '&'][..]);

    if let Some(slash) = name.rfind('/') {
        let tail = &name[slash + 1..];
        let short = match delimiter(tail) {
            Some(end) => &tail[..end],
            None => "",
        };
        let full = format!("{}{}", &name[..slash + 1], short);
        return (full, short.to_string());
    }

    match delimiter(name) {
        Some(end) => {
            let package = name[..end].to_string();
            (package.clone(), package)
        }
        None => (name.to_string(), String::new()),
    }
}

/// Position of the first `.` or `::` in `s`
fn delimiter(s: &str) -> Option<usize> {
    let dot = s.find('.');
    let path = s.find("::");
    match (dot, path) {
        (Some(d), Some(p)) => Some(d.min(p)),
        (d, p) => d.or(p),
    }
}
