//! Vertical-sync control through the driver's swap-control extension.

use std::fmt;

use tracing::{debug, warn};

use crate::driver::{GlDriver, SwapControl};

/// Availability of the swap-control extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VsyncSupport {
    /// Not probed yet; probing happens on the first vsync request.
    Unknown,
    /// The driver does not expose swap control. Vsync requests are no-ops.
    Unsupported,
    /// Swap control is available.
    Supported,
}

enum Probe {
    Pending,
    Unsupported,
    Loaded(Box<dyn SwapControl>),
}

/// Lazily resolved swap-control entry points.
pub(crate) struct VsyncController {
    probe: Probe,
}

impl VsyncController {
    pub(crate) fn new() -> Self {
        Self {
            probe: Probe::Pending,
        }
    }

    pub(crate) fn support(&self) -> VsyncSupport {
        match self.probe {
            Probe::Pending => VsyncSupport::Unknown,
            Probe::Unsupported => VsyncSupport::Unsupported,
            Probe::Loaded(_) => VsyncSupport::Supported,
        }
    }

    /// Set the swap interval of the current context.
    ///
    /// Must be called with the target window current. Resolves the extension
    /// on first use. Returns `true` when the interval was applied.
    pub(crate) fn apply<D: GlDriver + ?Sized>(&mut self, driver: &mut D, enabled: bool) -> bool {
        if let Probe::Pending = self.probe {
            self.probe = match driver.load_swap_control() {
                Some(control) => {
                    debug!(
                        target: "horizon_lattice_gl::vsync",
                        "swap control extension loaded"
                    );
                    Probe::Loaded(control)
                }
                None => {
                    warn!(
                        target: "horizon_lattice_gl::vsync",
                        "swap control extension unavailable, vsync requests will be ignored"
                    );
                    Probe::Unsupported
                }
            };
        }

        let Probe::Loaded(control) = &mut self.probe else {
            return false;
        };

        let interval = i32::from(enabled);
        if control.set_interval(interval) {
            debug!(
                target: "horizon_lattice_gl::vsync",
                interval,
                "swap interval set"
            );
            true
        } else {
            warn!(
                target: "horizon_lattice_gl::vsync",
                interval,
                "driver rejected swap interval"
            );
            false
        }
    }

    /// The driver's view of the current context's interval, if queryable.
    pub(crate) fn current_interval(&self) -> Option<i32> {
        match &self.probe {
            Probe::Loaded(control) => control.interval(),
            _ => None,
        }
    }
}

impl fmt::Debug for VsyncController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VsyncController")
            .field("support", &self.support())
            .finish()
    }
}
