//! # stackerr
//!
//! Errors that remember where they were created.
//!
//! A [`StackError`] holds a message, an optional cause and the call stack
//! captured when it was constructed. The stack can be narrowed to the frames
//! that matter through process-wide [`settings`]: a short package name, a
//! [`PackageFilter`], and a maximum depth.
//!
//! ## Usage
//!
//! ```rust
//! use stackerr::{stackerr, ResultExt, StackError};
//!
//! fn read_config(path: &str) -> Result<String, StackError> {
//!     std::fs::read_to_string(path).wrap_err(format!("reading {}", path))
//! }
//!
//! let err = read_config("/definitely/not/here.toml").unwrap_err();
//! assert!(err.to_string().starts_with("reading /definitely/not/here.toml: "));
//!
//! let err = stackerr!("retry {} of {}", 2, 3);
//! assert_eq!(err.message(), "retry 2 of 3");
//! ```
//!
//! ## Rendering
//!
//! - `{}` prints the message followed by each cause: `load: open: missing`
//! - `{:#}` and `{:?}` add every captured stack after the messages
//! - [`StackError::render`] dispatches on `v`, `s` and `q` verbs
//!
//! ## Packages
//!
//! Frames are filtered on the package derived from their function name with
//! [`derive_package`]. For Rust symbols the package is the crate name, so
//! `settings::set_package_name("my_crate")` keeps only the frames of
//! `my_crate`.

mod error;
mod ext;
mod format;
mod frame;
mod package;
pub mod settings;

pub use error::{Cause, Chain, StackError};
pub use ext::ResultExt;
pub use format::{DefaultFrameFormatter, FileFrameFormatter, FrameFormatter, Render};
pub use frame::{Stack, StackFrame};
pub use package::{derive_package, ExactPackage, PackageFilter};
pub use settings::{ConfigError, Settings};

/// Result type alias using StackError
pub type Result<T> = std::result::Result<T, StackError>;

/// Create a [`StackError`] from a format string.
///
/// The stack starts at the macro call site.
///
/// ```rust
/// let err = stackerr::stackerr!("fooey {}", 2);
/// assert_eq!(err.message(), "fooey 2");
/// ```
#[macro_export]
macro_rules! stackerr {
    ($($arg:tt)*) => {
        $crate::StackError::new(::std::format!($($arg)*))
    };
}

/// Return early with a [`StackError`] built from a format string.
///
/// ```rust
/// fn check(port: u16) -> stackerr::Result<u16> {
///     if port == 0 {
///         stackerr::bail!("invalid port {}", port);
///     }
///     Ok(port)
/// }
///
/// assert_eq!(check(0).unwrap_err().message(), "invalid port 0");
/// ```
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return ::std::result::Result::Err(::std::convert::From::from($crate::stackerr!($($arg)*)))
    };
}
