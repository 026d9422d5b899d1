//! The boundary between the context manager and the graphics driver.
//!
//! Every native call the manager makes goes through [`GlDriver`]. The WGL
//! implementation lives in [`crate::wgl`] (Windows only); [`crate::headless`]
//! provides one without any native calls.

use crate::config::{GlConfig, PixelFormatRequest};
use crate::error::DriverError;
use crate::handle::{DeviceContext, NativeWindowHandle, PixelFormatId, RenderingContext};

/// Native operations required by [`GlManager`](crate::GlManager).
///
/// Implementations are driven from a single thread: the one whose
/// current-context slot the manager tracks.
pub trait GlDriver {
    /// One-time probe: create (and discard) a context of the configured
    /// profile to prove the driver supports it.
    fn probe(&mut self, config: &GlConfig) -> Result<(), DriverError>;

    /// Lease the device context of a native window.
    fn acquire_device_context(
        &mut self,
        window: NativeWindowHandle,
    ) -> Result<DeviceContext, DriverError>;

    /// Return a leased device context to its window.
    fn release_device_context(
        &mut self,
        window: NativeWindowHandle,
        dc: DeviceContext,
    ) -> Result<(), DriverError>;

    /// Ask the driver for the format closest to `request` on `dc`.
    fn choose_pixel_format(
        &mut self,
        dc: DeviceContext,
        request: &PixelFormatRequest,
    ) -> Result<PixelFormatId, DriverError>;

    /// Apply a negotiated format to `dc`.
    fn apply_pixel_format(
        &mut self,
        dc: DeviceContext,
        format: PixelFormatId,
        request: &PixelFormatRequest,
    ) -> Result<(), DriverError>;

    /// Whether a context created against `existing` can be made current on a
    /// surface configured with `candidate`. Evaluated against `dc`, the
    /// candidate window's device context.
    fn formats_compatible(
        &self,
        dc: DeviceContext,
        existing: PixelFormatId,
        candidate: PixelFormatId,
    ) -> bool;

    /// Create a rendering context for `dc`, optionally sharing objects with
    /// `share`.
    ///
    /// Drivers may change the thread's current context while doing so; the
    /// manager re-establishes its own binding afterwards.
    fn create_context(
        &mut self,
        dc: DeviceContext,
        config: &GlConfig,
        share: Option<RenderingContext>,
    ) -> Result<RenderingContext, DriverError>;

    /// Destroy a rendering context.
    fn delete_context(&mut self, context: RenderingContext) -> Result<(), DriverError>;

    /// Bind `context` to `dc` on the calling thread.
    fn make_current(
        &mut self,
        dc: DeviceContext,
        context: RenderingContext,
    ) -> Result<(), DriverError>;

    /// Unbind whatever context is current on the calling thread.
    fn release_current(&mut self) -> Result<(), DriverError>;

    /// Present the back buffer of `dc`.
    fn swap_buffers(&mut self, dc: DeviceContext) -> Result<(), DriverError>;

    /// Resolve the swap-control extension. Called with a context current.
    ///
    /// `None` means the extension is unavailable, which is not an error.
    fn load_swap_control(&mut self) -> Option<Box<dyn SwapControl>>;
}

/// Resolved swap-control entry points.
///
/// The interval applies to whichever context is current when called.
pub trait SwapControl {
    /// Set the swap interval. Returns `false` if the driver rejected it.
    fn set_interval(&mut self, interval: i32) -> bool;

    /// Query the swap interval, when the driver exposes a getter.
    fn interval(&self) -> Option<i32>;
}
