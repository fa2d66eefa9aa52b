//! Wrapping the error side of a `Result`

use crate::error::{Cause, StackError};
use crate::frame;
use crate::settings;

/// Frames between the capture anchor and the caller of `wrap_err`
const EXTENSION_FRAMES: usize = 1;

/// Adds stack-capturing wrappers to `Result`.
///
/// `Ok` values pass through untouched; an `Err` is wrapped in a
/// [`StackError`] whose stack starts at the call to `wrap_err`.
///
/// ```rust
/// use stackerr::{ResultExt, StackError};
///
/// fn parse(s: &str) -> Result<u16, StackError> {
///     s.parse::<u16>().wrap_err("parsing port")
/// }
///
/// assert_eq!(parse("8080").unwrap(), 8080);
/// let err = parse("http").unwrap_err();
/// assert_eq!(err.message(), "parsing port");
/// assert!(err.cause().is_some());
/// ```
pub trait ResultExt<T> {
    /// Wrap an error with `message`
    fn wrap_err(self, message: impl Into<String>) -> Result<T, StackError>;

    /// Wrap an error with a lazily built message
    fn wrap_err_with<M, F>(self, message: F) -> Result<T, StackError>
    where
        M: Into<String>,
        F: FnOnce() -> M;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<Box<Cause>>,
{
    #[inline(never)]
    fn wrap_err(self, message: impl Into<String>) -> Result<T, StackError> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => {
                let stack = frame::walk(&settings::current(), EXTENSION_FRAMES);
                Err(StackError::from_parts(message, stack, Some(err.into())))
            }
        }
    }

    #[inline(never)]
    fn wrap_err_with<M, F>(self, message: F) -> Result<T, StackError>
    where
        M: Into<String>,
        F: FnOnce() -> M,
    {
        match self {
            Ok(value) => Ok(value),
            Err(err) => {
                let stack = frame::walk(&settings::current(), EXTENSION_FRAMES);
                Err(StackError::from_parts(message(), stack, Some(err.into())))
            }
        }
    }
}
