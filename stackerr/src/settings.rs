//! Process-wide capture and rendering settings
//!
//! Stack capture reads the package filter, short package name and maximum
//! depth; verbose rendering reads the frame formatter. The global value is a
//! snapshot swapped atomically, so a capture always sees one consistent set of
//! settings. It is meant to be configured once at startup.
//!
//! ```rust
//! use stackerr::settings;
//!
//! settings::update(|s| s.with_package_name("billing").with_max_stack_depth(8));
//! assert_eq!(settings::current().max_stack_depth(), 8);
//! settings::reset();
//! ```

use crate::format::{DefaultFrameFormatter, FrameFormatter};
use crate::package::{derive_package, ExactPackage, PackageFilter};
use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use std::fmt;
use std::num::ParseIntError;
use std::sync::Arc;
use thiserror::Error;

/// Default maximum number of frames kept per error
pub const DEFAULT_MAX_STACK_DEPTH: usize = 16;

/// Environment variable holding the short package name target
pub const ENV_PACKAGE: &str = "STACKERR_PACKAGE";
/// Environment variable holding an exact full package to filter on
pub const ENV_FILTER_PACKAGE: &str = "STACKERR_FILTER_PACKAGE";
/// Environment variable holding the maximum stack depth
pub const ENV_MAX_DEPTH: &str = "STACKERR_MAX_DEPTH";
/// Environment variable switching the stack section of verbose output
pub const ENV_STACK: &str = "STACKERR_STACK";

static SETTINGS: Lazy<ArcSwap<Settings>> = Lazy::new(|| ArcSwap::from_pointee(Settings::default()));

/// Error reading settings from the environment
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var} value '{value}': {source}")]
    InvalidDepth {
        var: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid {var} value '{value}': expected true, false, 1 or 0")]
    InvalidFlag { var: &'static str, value: String },
}

/// Capture and rendering settings.
///
/// Built with chainable setters, installed globally with [`install`] or
/// [`update`], or passed directly to [`Stack::capture_with`](crate::Stack::capture_with).
#[derive(Clone)]
pub struct Settings {
    package_filter: Option<Arc<dyn PackageFilter>>,
    package_name: String,
    max_stack_depth: usize,
    frame_formatter: Option<Arc<dyn FrameFormatter>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            package_filter: None,
            package_name: String::new(),
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
            frame_formatter: Some(Arc::new(DefaultFrameFormatter)),
        }
    }
}

impl Settings {
    /// Default settings: no filtering, depth 16, built-in frame formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings from `STACKERR_*` environment variables, defaults for unset ones
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`Settings::from_env`] over an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(name) = lookup(ENV_PACKAGE) {
            settings = settings.with_package_name(name.trim());
        }
        if let Some(package) = lookup(ENV_FILTER_PACKAGE) {
            let package = package.trim();
            if !package.is_empty() {
                settings = settings.with_exact_package(package);
            }
        }
        if let Some(value) = lookup(ENV_MAX_DEPTH) {
            let depth = value.trim().parse().map_err(|source| ConfigError::InvalidDepth {
                var: ENV_MAX_DEPTH,
                value: value.clone(),
                source,
            })?;
            settings = settings.with_max_stack_depth(depth);
        }
        if let Some(value) = lookup(ENV_STACK) {
            settings = match value.trim() {
                "true" | "1" => settings.with_frame_formatter(DefaultFrameFormatter),
                "false" | "0" => settings.without_frame_formatter(),
                _ => {
                    return Err(ConfigError::InvalidFlag {
                        var: ENV_STACK,
                        value: value.clone(),
                    })
                }
            };
        }

        log::debug!("stack error settings from environment: {:?}", settings);
        Ok(settings)
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// The package filter, if any
    pub fn package_filter(&self) -> Option<&dyn PackageFilter> {
        self.package_filter.as_deref()
    }

    /// The short package name target, empty when unset
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Maximum number of frames kept per error
    pub fn max_stack_depth(&self) -> usize {
        self.max_stack_depth
    }

    /// The frame formatter used by verbose rendering, if any
    pub fn frame_formatter(&self) -> Option<&dyn FrameFormatter> {
        self.frame_formatter.as_deref()
    }

    // =========================================================================
    // Builders (chainable)
    // =========================================================================

    /// Keep only frames whose short package equals `name` (empty disables)
    pub fn with_package_name(mut self, name: impl Into<String>) -> Self {
        self.package_name = name.into();
        self
    }

    /// Keep only frames whose full package passes `filter`
    pub fn with_package_filter(mut self, filter: impl PackageFilter + 'static) -> Self {
        self.package_filter = Some(Arc::new(filter));
        self
    }

    /// Keep only frames from exactly the full package `package`
    pub fn with_exact_package(self, package: impl Into<String>) -> Self {
        self.with_package_filter(ExactPackage::new(package))
    }

    /// Remove the package filter
    pub fn without_package_filter(mut self) -> Self {
        self.package_filter = None;
        self
    }

    /// Set the maximum number of frames kept per error
    pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }

    /// Render stack sections with `formatter`
    pub fn with_frame_formatter(mut self, formatter: impl FrameFormatter + 'static) -> Self {
        self.frame_formatter = Some(Arc::new(formatter));
        self
    }

    /// Omit stack sections from verbose rendering
    pub fn without_frame_formatter(mut self) -> Self {
        self.frame_formatter = None;
        self
    }

    // =========================================================================
    // Filtering
    // =========================================================================

    /// True when no filter or short package name is configured
    pub fn is_unfiltered(&self) -> bool {
        self.package_filter.is_none() && self.package_name.is_empty()
    }

    /// Whether a frame for `function` is retained under these settings.
    ///
    /// The filter sees the full package, the short name is compared to the
    /// short package; when both are set the frame must pass both.
    pub fn should_include(&self, function: &str) -> bool {
        if self.is_unfiltered() {
            return true;
        }
        let (full, short) = derive_package(function);
        if let Some(filter) = &self.package_filter {
            if !filter.include(&full) {
                return false;
            }
        }
        self.package_name.is_empty() || self.package_name == short
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("package_filter", &self.package_filter.is_some())
            .field("package_name", &self.package_name)
            .field("max_stack_depth", &self.max_stack_depth)
            .field("frame_formatter", &self.frame_formatter.is_some())
            .finish()
    }
}

// =============================================================================
// Global settings
// =============================================================================

/// The current global settings snapshot
pub fn current() -> Arc<Settings> {
    SETTINGS.load_full()
}

/// Replace the global settings
pub fn install(settings: Settings) {
    log::debug!("installing stack error settings: {:?}", settings);
    SETTINGS.store(Arc::new(settings));
}

/// Derive new global settings from the current ones
pub fn update<F>(f: F)
where
    F: Fn(Settings) -> Settings,
{
    let previous = SETTINGS.rcu(|current| Arc::new(f(Settings::clone(current))));
    log::debug!("updated stack error settings (previous: {:?})", previous);
}

/// Restore the default global settings
pub fn reset() {
    install(Settings::default());
}

/// Set the global short package name target (empty disables)
pub fn set_package_name(name: impl Into<String>) {
    let name = name.into();
    update(|s| s.with_package_name(name.clone()));
}

/// Set the global package filter
pub fn set_package_filter(filter: impl PackageFilter + 'static) {
    let filter: Arc<dyn PackageFilter> = Arc::new(filter);
    update(|mut s| {
        s.package_filter = Some(filter.clone());
        s
    });
}

/// Set the global package filter to one matching exactly `package`
pub fn filter_package(package: impl Into<String>) {
    set_package_filter(ExactPackage::new(package));
}

/// Remove the global package filter
pub fn clear_package_filter() {
    update(Settings::without_package_filter);
}

/// Set the global maximum stack depth
pub fn set_max_stack_depth(depth: usize) {
    update(|s| s.with_max_stack_depth(depth));
}

/// Set the global frame formatter
pub fn set_frame_formatter(formatter: impl FrameFormatter + 'static) {
    let formatter: Arc<dyn FrameFormatter> = Arc::new(formatter);
    update(|mut s| {
        s.frame_formatter = Some(formatter.clone());
        s
    });
}

/// Remove the global frame formatter, suppressing stack output
pub fn clear_frame_formatter() {
    update(Settings::without_frame_formatter);
}

/// Serializes tests that touch the global settings and restores the
/// defaults when dropped.
#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::{Mutex, MutexGuard};

    static LOCK: Mutex<()> = parking_lot::const_mutex(());

    pub(crate) struct GlobalGuard {
        _lock: MutexGuard<'static, ()>,
    }

    impl Drop for GlobalGuard {
        fn drop(&mut self) {
            super::reset();
        }
    }

    pub(crate) fn lock() -> GlobalGuard {
        let _ = env_logger::Builder::from_default_env().is_test(true).try_init();
        let guard = GlobalGuard { _lock: LOCK.lock() };
        super::reset();
        guard
    }
}
