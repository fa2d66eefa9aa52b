//! The StackError type

use crate::format::Render;
use crate::frame::{self, Stack};
use crate::settings;
use std::error::Error as StdError;
use std::sync::Arc;

/// Error cause as stored and returned by [`StackError`]
pub type Cause = dyn StdError + Send + Sync + 'static;

/// Stack frames between the capture anchor and the caller of a constructor
const CONSTRUCTOR_FRAMES: usize = 1;

/// An error carrying a message, an optional cause and the call stack at the
/// point it was created.
///
/// The value is immutable: [`StackError::with_cause`] returns a new error
/// that shares the message and stack. Clones are cheap.
///
/// # Example
///
/// ```rust
/// use stackerr::StackError;
///
/// let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
/// let err = StackError::wrap_error(io, "loading config");
///
/// assert_eq!(err.message(), "loading config");
/// assert_eq!(err.to_string(), "loading config: no such file");
/// assert!(!err.stack().is_empty());
/// ```
#[derive(Clone)]
pub struct StackError {
    message: Arc<str>,
    stack: Stack,
    cause: Option<Arc<Cause>>,
}

impl StackError {
    /// Create an error with `message` and the caller's stack
    #[inline(never)]
    pub fn new(message: impl Into<String>) -> Self {
        let stack = frame::walk(&settings::current(), CONSTRUCTOR_FRAMES);
        Self::from_parts(message, stack, None)
    }

    /// Wrap `err` with `message`, capturing the stack at this call.
    ///
    /// Returns `None` when there is nothing to wrap.
    ///
    /// ```rust
    /// use stackerr::StackError;
    ///
    /// assert!(StackError::wrap(None::<std::io::Error>, "fooey").is_none());
    ///
    /// let err = StackError::wrap(Some("cause"), "fooey").unwrap();
    /// assert_eq!(err.to_string(), "fooey: cause");
    /// ```
    #[inline(never)]
    pub fn wrap<E>(err: Option<E>, message: impl Into<String>) -> Option<Self>
    where
        E: Into<Box<Cause>>,
    {
        let err = err?;
        let stack = frame::walk(&settings::current(), CONSTRUCTOR_FRAMES);
        Some(Self::from_parts(message, stack, Some(err.into())))
    }

    /// Wrap `err` with `message`, capturing the stack at this call
    #[inline(never)]
    pub fn wrap_error<E>(err: E, message: impl Into<String>) -> Self
    where
        E: Into<Box<Cause>>,
    {
        let stack = frame::walk(&settings::current(), CONSTRUCTOR_FRAMES);
        Self::from_parts(message, stack, Some(err.into()))
    }

    /// Assemble an error from an already captured stack
    pub fn from_parts(message: impl Into<String>, stack: Stack, cause: Option<Box<Cause>>) -> Self {
        Self {
            message: message.into().into(),
            stack,
            cause: cause.map(Arc::from),
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// The message given at construction
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The directly wrapped error, if any
    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_deref()
    }

    /// Unwrap one level: the same as [`StackError::cause`]
    pub fn unwrap(&self) -> Option<&Cause> {
        self.cause()
    }

    /// The stack captured at construction
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Iterate this error and its transitive causes
    pub fn chain(&self) -> Chain<'_> {
        Chain {
            next: Some(self as &(dyn StdError + 'static)),
        }
    }

    /// The innermost error of the cause chain (this error when there is no cause)
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        self.chain()
            .last()
            .unwrap_or(self as &(dyn StdError + 'static))
    }

    // =========================================================================
    // Derived values
    // =========================================================================

    /// A new error with the same message and stack and `cause` as its cause.
    ///
    /// The receiver is left untouched.
    pub fn with_cause(&self, cause: impl Into<Box<Cause>>) -> Self {
        Self {
            message: self.message.clone(),
            stack: self.stack.clone(),
            cause: Some(Arc::from(cause.into())),
        }
    }

    /// A new error with the same message and stack and no cause
    pub fn without_cause(&self) -> Self {
        Self {
            message: self.message.clone(),
            stack: self.stack.clone(),
            cause: None,
        }
    }

    /// Render under a formatting verb (`v`, `s`, `q`); see [`Render`]
    pub fn render(&self, verb: char) -> Render<'_> {
        Render::new(self, verb)
    }
}

impl StdError for StackError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// Iterator over an error and its sources, outermost first.
#[derive(Clone)]
pub struct Chain<'a> {
    next: Option<&'a (dyn StdError + 'static)>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a (dyn StdError + 'static);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.source();
        Some(current)
    }
}
