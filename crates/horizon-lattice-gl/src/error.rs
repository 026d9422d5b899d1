//! Error types for the GL crate.

use thiserror::Error;

use crate::handle::WindowId;

/// A failed native driver call.
///
/// Drivers report failures with this type; the manager decides which public
/// [`GlError`] it becomes depending on the operation in progress.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{call} failed: {message}")]
pub struct DriverError {
    /// The native entry point that failed.
    pub call: &'static str,
    /// Driver or OS supplied detail.
    pub message: String,
}

impl DriverError {
    /// Create a new driver error for the given native call.
    pub fn new(call: &'static str, message: impl Into<String>) -> Self {
        Self {
            call,
            message: message.into(),
        }
    }
}

/// Errors that can occur while managing GL contexts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GlError {
    /// Window dimensions must both be non-zero.
    #[error("invalid window dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// A window with this identifier is already registered.
    #[error("{0} is already registered")]
    DuplicateWindow(WindowId),

    /// The window is not registered with the manager.
    #[error("{0} is not registered")]
    WindowNotFound(WindowId),

    /// Pixel-format negotiation or native context creation failed.
    #[error("failed to create GL context for {window}: {source}")]
    ContextCreation {
        window: WindowId,
        #[source]
        source: DriverError,
    },

    /// The native make-current call failed.
    #[error("failed to make {window} current: {source}")]
    ContextBind {
        window: WindowId,
        #[source]
        source: DriverError,
    },

    /// Presenting the back buffer failed.
    #[error("failed to swap buffers of {window}: {source}")]
    SwapBuffers {
        window: WindowId,
        #[source]
        source: DriverError,
    },

    /// The operation requires a state the manager is not in.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// The manager has not been initialized yet.
    #[error("GL manager not initialized")]
    NotInitialized,

    /// One-time driver probing failed.
    #[error("GL initialization failed: {0}")]
    Initialization(#[source] DriverError),
}

/// Broad classification of a [`GlError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlErrorKind {
    /// Bad identifier or dimensions.
    InvalidArgument,
    /// Operation on an unregistered window.
    NotFound,
    /// Pixel-format negotiation or native context creation failed.
    ContextCreation,
    /// Make-current failed.
    ContextBind,
    /// A native buffer swap failed.
    Present,
    /// Operation requires a state the manager is not in.
    InvalidState,
    /// One-time setup failed.
    Initialization,
}

impl GlError {
    /// Classify this error.
    pub fn kind(&self) -> GlErrorKind {
        match self {
            Self::InvalidDimensions { .. } | Self::DuplicateWindow(_) => {
                GlErrorKind::InvalidArgument
            }
            Self::WindowNotFound(_) => GlErrorKind::NotFound,
            Self::ContextCreation { .. } => GlErrorKind::ContextCreation,
            Self::ContextBind { .. } => GlErrorKind::ContextBind,
            Self::SwapBuffers { .. } => GlErrorKind::Present,
            Self::InvalidState(_) | Self::NotInitialized => GlErrorKind::InvalidState,
            Self::Initialization(_) => GlErrorKind::Initialization,
        }
    }
}

/// Result type for GL operations.
pub type GlResult<T> = Result<T, GlError>;
