//! Verb-based rendering of stack errors
//!
//! | Verb  | Output                                                    |
//! |-------|-----------------------------------------------------------|
//! | `v`   | message, then `": "` and the cause's `v` rendering        |
//! | `+v`  | message, the cause's `+v` rendering, then the stack       |
//! | `s`   | message only                                              |
//! | `q`   | message as a quoted, escaped string                       |
//! | other | `%!<verb>(stackerr::StackError)`                          |
//!
//! `Display` renders `v`, while `{:#}` and `Debug` render `+v`. A cause that
//! is not a stack error gets `{:#}` under `+v`.

use crate::error::StackError;
use crate::frame::StackFrame;
use crate::settings;
use std::fmt;

/// Type tag embedded in the unsupported verb marker
const TYPE_TAG: &str = "stackerr::StackError";

/// Renders the stack section of verbose output.
///
/// Writes a start line once, then one line per frame. Each piece is written
/// with its own leading newline so the section can follow the message directly.
pub trait FrameFormatter: Send + Sync {
    /// Write the marker that opens the stack section
    fn start_line(&self, out: &mut dyn fmt::Write) -> fmt::Result;

    /// Write one frame
    fn frame_line(&self, out: &mut dyn fmt::Write, frame: &StackFrame) -> fmt::Result;
}

/// `"\nStack:"` followed by `"\n\t<function>:<line>"` per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFrameFormatter;

impl FrameFormatter for DefaultFrameFormatter {
    fn start_line(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str("\nStack:")
    }

    fn frame_line(&self, out: &mut dyn fmt::Write, frame: &StackFrame) -> fmt::Result {
        write!(out, "\n\t{}:{}", frame.function(), frame.line())
    }
}

/// `"\nStack:"` followed by the function and, on its own line, `file:line`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFrameFormatter;

impl FrameFormatter for FileFrameFormatter {
    fn start_line(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str("\nStack:")
    }

    fn frame_line(&self, out: &mut dyn fmt::Write, frame: &StackFrame) -> fmt::Result {
        write!(out, "\n\t{}\n\t\t{}:{}", frame.function(), frame.file(), frame.line())
    }
}

/// A stack error rendered under one verb.
///
/// Created by [`StackError::render`].
///
/// ```rust
/// use stackerr::StackError;
///
/// let err = StackError::new("fooey").with_cause("cause");
/// assert_eq!(err.render('v').to_string(), "fooey: cause");
/// assert_eq!(err.render('s').to_string(), "fooey");
/// assert_eq!(err.render('q').to_string(), "\"fooey\"");
/// assert_eq!(err.render('d').to_string(), "%!d(stackerr::StackError)");
/// ```
#[derive(Clone, Copy)]
pub struct Render<'a> {
    error: &'a StackError,
    verb: char,
    extended: bool,
}

impl<'a> Render<'a> {
    pub(crate) fn new(error: &'a StackError, verb: char) -> Self {
        Self {
            error,
            verb,
            extended: false,
        }
    }

    /// Set the extended detail flag (`+`)
    pub fn extended(mut self) -> Self {
        self.extended = true;
        self
    }

    /// The verb being rendered
    pub fn verb(&self) -> char {
        self.verb
    }

    /// Whether the extended detail flag is set
    pub fn is_extended(&self) -> bool {
        self.extended
    }
}

impl fmt::Display for Render<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.verb {
            'v' if self.extended => write_verbose(f, self.error),
            'v' => write_plain(f, self.error),
            's' => f.write_str(self.error.message()),
            'q' => write!(f, "{:?}", self.error.message()),
            verb => write!(f, "%!{}({})", verb, TYPE_TAG),
        }
    }
}

impl fmt::Debug for Render<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Render")
            .field("verb", &self.verb)
            .field("extended", &self.extended)
            .finish_non_exhaustive()
    }
}

fn write_plain(f: &mut fmt::Formatter<'_>, error: &StackError) -> fmt::Result {
    f.write_str(error.message())?;
    if let Some(cause) = error.cause() {
        match cause.downcast_ref::<StackError>() {
            Some(inner) => {
                f.write_str(": ")?;
                write_plain(f, inner)?;
            }
            None => write!(f, ": {}", cause)?,
        }
    }
    Ok(())
}

fn write_verbose(f: &mut fmt::Formatter<'_>, error: &StackError) -> fmt::Result {
    f.write_str(error.message())?;
    if let Some(cause) = error.cause() {
        match cause.downcast_ref::<StackError>() {
            Some(inner) => {
                f.write_str(": ")?;
                write_verbose(f, inner)?;
            }
            None => write!(f, ": {:#}", cause)?,
        }
    }

    let stack = error.stack();
    if stack.is_empty() {
        return Ok(());
    }
    let settings = settings::current();
    if let Some(formatter) = settings.frame_formatter() {
        formatter.start_line(&mut *f)?;
        for frame in stack.iter() {
            formatter.frame_line(&mut *f, frame)?;
        }
    }
    Ok(())
}

// =============================================================================
// Standard formatting traits
// =============================================================================

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write_verbose(f, self)
        } else {
            write_plain(f, self)
        }
    }
}

impl fmt::Debug for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_verbose(f, self)
    }
}
