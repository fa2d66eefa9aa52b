//! Call stack capture
//!
//! Walks the native stack with the `backtrace` crate, resolves each frame to
//! function, file and line, and keeps the frames that pass the package filter
//! until the configured depth is reached.

use crate::settings::{self, Settings, DEFAULT_MAX_STACK_DEPTH};
use serde::{Deserialize, Serialize};
use std::hint::black_box;
use std::ops::Deref;
use std::sync::Arc;

/// Frames between the capture anchor and the caller: the public entry point.
///
/// Entry points must not call [`walk`] in tail position, or an optimized build
/// turns it into a sibling call and the entry frame is gone from the stack.
const ENTRY_FRAMES: usize = 1;

/// One captured call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackFrame {
    function: String,
    file: String,
    line: u32,
}

impl StackFrame {
    /// Create a frame from its parts
    pub fn new(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            file: file.into(),
            line,
        }
    }

    /// Fully qualified function name, without the symbol hash
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Source file path, empty when unknown
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Source line, 0 when unknown
    pub fn line(&self) -> u32 {
        self.line
    }
}

/// Captured and filtered frames, innermost (the caller) first.
///
/// Immutable once captured; clones share the same frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stack {
    frames: Arc<[StackFrame]>,
}

impl Default for Stack {
    fn default() -> Self {
        Self::from_frames(Vec::new())
    }
}

impl Stack {
    /// Capture the caller's stack under the global settings.
    ///
    /// The first frame is the code that called `capture`.
    #[inline(never)]
    pub fn capture() -> Self {
        let stack = walk(&settings::current(), ENTRY_FRAMES);
        black_box(&stack);
        stack
    }

    /// Capture the caller's stack under explicit settings
    #[inline(never)]
    pub fn capture_with(settings: &Settings) -> Self {
        let stack = walk(settings, ENTRY_FRAMES);
        black_box(&stack);
        stack
    }

    /// A stack holding `frames` as given
    pub fn from_frames(frames: Vec<StackFrame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    /// An empty stack
    pub fn empty() -> Self {
        Self::default()
    }

    /// The frames as a slice
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }
}

impl Deref for Stack {
    type Target = [StackFrame];

    fn deref(&self) -> &[StackFrame] {
        &self.frames
    }
}

impl<'a> IntoIterator for &'a Stack {
    type Item = &'a StackFrame;
    type IntoIter = std::slice::Iter<'a, StackFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

/// Walk the current stack, skipping `skip` frames past this function.
///
/// Frames up to and including this function are recognized by symbol address
/// rather than counted, so the `backtrace` crate's own frames never leak into
/// the result. Every public capture point calls this directly, never as its
/// last expression.
#[inline(never)]
pub(crate) fn walk(settings: &Settings, skip: usize) -> Stack {
    let max = settings.max_stack_depth();
    if max == 0 {
        return Stack::empty();
    }

    let anchor = walk as *const () as usize;
    let mut anchored = false;
    let mut preamble: Vec<backtrace::Frame> = Vec::new();
    let mut remaining = skip;
    let mut walked = 0usize;
    let mut frames = Vec::with_capacity(max.min(DEFAULT_MAX_STACK_DEPTH));

    backtrace::trace(|frame| {
        walked += 1;
        if !anchored {
            if frame.symbol_address() as usize == anchor {
                anchored = true;
                preamble.clear();
            } else {
                preamble.push(frame.clone());
            }
            return true;
        }
        if remaining > 0 {
            remaining -= 1;
            return true;
        }
        collect(settings, frame, &mut frames, max)
    });

    if !anchored {
        log::debug!(
            "capture anchor not found in {} walked frames, keeping all frames",
            walked
        );
        for frame in &preamble {
            if !collect(settings, frame, &mut frames, max) {
                break;
            }
        }
    }

    log::trace!("captured {} frames ({} walked, limit {})", frames.len(), walked, max);
    Stack::from_frames(frames)
}

/// Resolve one physical frame into `frames`; false once the limit is reached
fn collect(
    settings: &Settings,
    frame: &backtrace::Frame,
    frames: &mut Vec<StackFrame>,
    max: usize,
) -> bool {
    backtrace::resolve_frame(frame, |symbol| {
        if frames.len() >= max {
            return;
        }
        let Some(name) = symbol.name() else {
            return;
        };
        let function = format!("{:#}", name);
        if !settings.should_include(&function) {
            return;
        }
        let file = symbol
            .filename()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        frames.push(StackFrame::new(function, file, symbol.lineno().unwrap_or(0)));
    });
    frames.len() < max
}
