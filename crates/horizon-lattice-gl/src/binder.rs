//! Tracking of the calling thread's current context.
//!
//! The native API keeps one current context per thread as hidden global
//! state. [`ContextBinder`] mirrors that slot explicitly so that redundant
//! binds can be skipped and every context-dependent operation knows which
//! window it is acting on.

use tracing::{debug, trace, warn};

use crate::driver::GlDriver;
use crate::error::{GlError, GlResult};
use crate::handle::{DeviceContext, RenderingContext, WindowId};

/// State of the current-context slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinderState {
    /// No window is current.
    #[default]
    Idle,
    /// The given window's context is current.
    Bound(WindowId),
}

/// The sole mutator of the current-context slot.
#[derive(Debug, Default)]
pub(crate) struct ContextBinder {
    state: BinderState,
}

impl ContextBinder {
    /// Create a binder in the [`Idle`](BinderState::Idle) state.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The current state.
    #[inline]
    pub(crate) fn state(&self) -> BinderState {
        self.state
    }

    /// The window that is current, if any.
    #[inline]
    pub(crate) fn current(&self) -> Option<WindowId> {
        match self.state {
            BinderState::Idle => None,
            BinderState::Bound(window) => Some(window),
        }
    }

    /// Whether `window` is the current window.
    #[inline]
    pub(crate) fn is_bound_to(&self, window: WindowId) -> bool {
        self.state == BinderState::Bound(window)
    }

    /// Make `window` current, skipping the native call if it already is.
    pub(crate) fn bind<D: GlDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        window: WindowId,
        dc: DeviceContext,
        context: RenderingContext,
    ) -> GlResult<()> {
        if self.is_bound_to(window) {
            trace!(
                target: "horizon_lattice_gl::binder",
                %window,
                "already current, skipping bind"
            );
            return Ok(());
        }
        self.rebind(driver, window, dc, context)
    }

    /// Issue the native bind unconditionally.
    ///
    /// On failure the slot is unknown, so the binder drops to `Idle` rather
    /// than keep claiming the previous window.
    pub(crate) fn rebind<D: GlDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        window: WindowId,
        dc: DeviceContext,
        context: RenderingContext,
    ) -> GlResult<()> {
        match driver.make_current(dc, context) {
            Ok(()) => {
                debug!(
                    target: "horizon_lattice_gl::binder",
                    %window,
                    "context bound"
                );
                self.state = BinderState::Bound(window);
                Ok(())
            }
            Err(source) => {
                self.state = BinderState::Idle;
                Err(GlError::ContextBind { window, source })
            }
        }
    }

    /// Unbind the current context. Always ends `Idle`.
    pub(crate) fn release<D: GlDriver + ?Sized>(&mut self, driver: &mut D) {
        if let Err(err) = driver.release_current() {
            warn!(
                target: "horizon_lattice_gl::binder",
                error = %err,
                "native release failed"
            );
        }
        if let BinderState::Bound(window) = self.state {
            debug!(
                target: "horizon_lattice_gl::binder",
                %window,
                "context released"
            );
        }
        self.state = BinderState::Idle;
    }

    /// Forget the tracked binding without a native call, after the driver
    /// changed the slot behind our back.
    pub(crate) fn forget(&mut self) {
        self.state = BinderState::Idle;
    }
}
