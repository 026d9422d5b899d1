//! Tracing targets and spans for the GL context manager.
//!
//! All diagnostics go through the `tracing` crate. Nothing is printed unless
//! the application installs a subscriber:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_lattice_gl=debug")
//!     .init();
//! ```
//!
//! Context creation and teardown log at `info`, format negotiation and
//! binding at `debug`, and individual driver calls at `trace`. Recoverable
//! native failures (a device context that will not release, a rejected swap
//! interval) are reported at `warn` and never returned as errors.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Crate-wide target.
    pub const GL: &str = "horizon_lattice_gl";
    /// Window registration and display groups.
    pub const MANAGER: &str = "horizon_lattice_gl::manager";
    /// Current-context binding.
    pub const BINDER: &str = "horizon_lattice_gl::binder";
    /// Display group matching.
    pub const DISPLAY: &str = "horizon_lattice_gl::display";
    /// Swap interval control.
    pub const VSYNC: &str = "horizon_lattice_gl::vsync";
    /// Native WGL calls.
    pub const WGL: &str = "horizon_lattice_gl::wgl";
    /// Simulated driver calls.
    pub const HEADLESS: &str = "horizon_lattice_gl::headless";
}

/// Span names used for tracing.
pub mod span_names {
    /// Window registration, including format negotiation and context creation.
    pub const WINDOW_CREATE: &str = "horizon_lattice_gl::window_create";
    /// Driver probe during initialization.
    pub const INITIALIZE: &str = "horizon_lattice_gl::initialize";
}

/// A guard that keeps a tracing span entered until dropped.
#[derive(Debug)]
pub struct GlSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl GlSpan {
    /// Enter a span for a manager operation.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: "horizon_lattice_gl", "gl", operation = name);
        Self {
            span: span.entered(),
        }
    }
}
