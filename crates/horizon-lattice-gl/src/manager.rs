//! The multi-window GL context manager.
//!
//! [`GlManager`] maps logical windows onto a smaller set of shared rendering
//! contexts ("display groups") and owns the calling thread's current-context
//! slot, reported by [`GlManager::binder_state`]. Windows whose pixel formats
//! the driver reports as compatible share one context; the rest get their own.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::binder::{BinderState, ContextBinder};
use crate::config::{GlConfig, PixelFormatRequest};
use crate::display::{DisplayGroup, DisplayRegistry};
use crate::driver::GlDriver;
use crate::error::{GlError, GlResult};
use crate::handle::{
    DeviceContext, DisplayGroupId, NativeInstanceHandle, NativeWindowHandle, PixelFormatId,
    RenderingContext, WindowId,
};
use crate::logging::{GlSpan, span_names};
use crate::thread_check::ThreadAffinity;
use crate::vsync::{VsyncController, VsyncSupport};

/// Per-window bookkeeping.
#[derive(Debug, Clone)]
pub struct GlWindow {
    width: u32,
    height: u32,
    use_vsync: bool,
    /// Leased from `native_window` until the entry is destroyed.
    device_context: DeviceContext,
    /// Borrowed; the windowing layer owns it.
    native_window: NativeWindowHandle,
    native_instance: NativeInstanceHandle,
    display: DisplayGroupId,
}

impl GlWindow {
    /// Cached width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Cached height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether vsync was last set on for this window.
    pub fn use_vsync(&self) -> bool {
        self.use_vsync
    }

    /// The leased device context.
    pub fn device_context(&self) -> DeviceContext {
        self.device_context
    }

    /// The native window this entry wraps.
    pub fn native_window(&self) -> NativeWindowHandle {
        self.native_window
    }

    /// The instance handle the window was registered with.
    pub fn native_instance(&self) -> NativeInstanceHandle {
        self.native_instance
    }

    /// The display group the window renders with.
    pub fn display(&self) -> DisplayGroupId {
        self.display
    }
}

/// Manages GL contexts for a set of native windows on one thread.
///
/// # Example
///
/// ```
/// use horizon_lattice_gl::{GlConfig, GlManager, HeadlessDriver, NativeInstanceHandle, WindowId};
///
/// # fn main() -> horizon_lattice_gl::GlResult<()> {
/// let driver = HeadlessDriver::new();
/// let hwnd = driver.create_window();
/// let hinstance = NativeInstanceHandle::from_raw(0x400000).unwrap();
///
/// let mut manager = GlManager::new(driver, GlConfig::default());
/// manager.initialize()?;
/// manager.window_create(WindowId::MAIN, hwnd, hinstance, 800, 600)?;
///
/// manager.window_make_current(WindowId::MAIN)?;
/// manager.set_use_vsync(WindowId::MAIN, true)?;
/// manager.swap_buffers()?;
/// # Ok(())
/// # }
/// ```
pub struct GlManager<D: GlDriver> {
    driver: D,
    config: GlConfig,
    windows: BTreeMap<WindowId, GlWindow>,
    displays: DisplayRegistry,
    binder: ContextBinder,
    vsync: VsyncController,
    initialized: bool,
    affinity: ThreadAffinity,
}

impl<D: GlDriver> GlManager<D> {
    /// Create a manager bound to the calling thread.
    ///
    /// Call [`initialize`](Self::initialize) before creating windows.
    pub fn new(driver: D, config: GlConfig) -> Self {
        Self {
            driver,
            config,
            windows: BTreeMap::new(),
            displays: DisplayRegistry::new(),
            binder: ContextBinder::new(),
            vsync: VsyncController::new(),
            initialized: false,
            affinity: ThreadAffinity::current(),
        }
    }

    /// Probe the driver for the configured context profile.
    ///
    /// Repeated calls after a success are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::Initialization`] if a baseline context of the
    /// configured profile cannot be created.
    pub fn initialize(&mut self) -> GlResult<()> {
        self.affinity.debug_assert_same_thread();
        if self.initialized {
            return Ok(());
        }

        let _span = GlSpan::new(span_names::INITIALIZE);
        self.driver
            .probe(&self.config)
            .map_err(GlError::Initialization)?;
        self.initialized = true;

        let (major, minor) = self.config.context_type.gl_version();
        info!(
            target: "horizon_lattice_gl::manager",
            context_type = ?self.config.context_type,
            gl_major = major,
            gl_minor = minor,
            "GL manager initialized"
        );
        Ok(())
    }

    /// Whether [`initialize`](Self::initialize) has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Register a window using the configured default pixel format.
    ///
    /// # Errors
    ///
    /// - [`GlError::InvalidDimensions`] if either dimension is zero
    /// - [`GlError::DuplicateWindow`] if `id` is already registered
    /// - [`GlError::ContextCreation`] if format negotiation or context
    ///   creation fails; nothing acquired by the call is kept
    /// - [`GlError::ContextBind`] if a new context was created but the
    ///   previously current window could not be bound again; the window is
    ///   not registered, its new display group is kept and no window is current
    /// - [`GlError::NotInitialized`] before [`initialize`](Self::initialize)
    pub fn window_create(
        &mut self,
        id: WindowId,
        window: NativeWindowHandle,
        instance: NativeInstanceHandle,
        width: u32,
        height: u32,
    ) -> GlResult<()> {
        let format = self.config.default_format;
        self.window_create_with_format(id, window, instance, width, height, &format)
    }

    /// Register a window with an explicit pixel format request.
    ///
    /// See [`window_create`](Self::window_create) for errors.
    pub fn window_create_with_format(
        &mut self,
        id: WindowId,
        window: NativeWindowHandle,
        instance: NativeInstanceHandle,
        width: u32,
        height: u32,
        request: &PixelFormatRequest,
    ) -> GlResult<()> {
        self.affinity.debug_assert_same_thread();
        if !self.initialized {
            return Err(GlError::NotInitialized);
        }
        if width == 0 || height == 0 {
            return Err(GlError::InvalidDimensions { width, height });
        }
        if self.windows.contains_key(&id) {
            return Err(GlError::DuplicateWindow(id));
        }

        let _span = GlSpan::new(span_names::WINDOW_CREATE);
        let dc = self
            .driver
            .acquire_device_context(window)
            .map_err(|source| GlError::ContextCreation { window: id, source })?;

        let display = match self.attach_display(id, dc, request) {
            Ok(display) => display,
            Err(err) => {
                self.return_device_context(id, window, dc);
                return Err(err);
            }
        };

        self.windows.insert(
            id,
            GlWindow {
                width,
                height,
                use_vsync: false,
                device_context: dc,
                native_window: window,
                native_instance: instance,
                display,
            },
        );

        let group = display.index();
        info!(
            target: "horizon_lattice_gl::manager",
            window = %id,
            width,
            height,
            group,
            "window created"
        );
        Ok(())
    }

    /// Unregister a window and return its device context.
    ///
    /// If the window is current, the context is released first.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::WindowNotFound`] if `id` is not registered.
    pub fn window_destroy(&mut self, id: WindowId) -> GlResult<()> {
        self.affinity.debug_assert_same_thread();
        let window = self.windows.remove(&id).ok_or(GlError::WindowNotFound(id))?;

        if self.binder.is_bound_to(id) {
            self.binder.release(&mut self.driver);
        }
        self.return_device_context(id, window.native_window, window.device_context);

        info!(
            target: "horizon_lattice_gl::manager",
            window = %id,
            "window destroyed"
        );
        Ok(())
    }

    /// Update a window's cached size. The native surface is not touched.
    ///
    /// # Errors
    ///
    /// - [`GlError::InvalidDimensions`] if either dimension is zero
    /// - [`GlError::WindowNotFound`] if `id` is not registered
    pub fn window_resize(&mut self, id: WindowId, width: u32, height: u32) -> GlResult<()> {
        self.affinity.debug_assert_same_thread();
        if width == 0 || height == 0 {
            return Err(GlError::InvalidDimensions { width, height });
        }
        let window = self.window_mut(id)?;
        window.width = width;
        window.height = height;

        debug!(
            target: "horizon_lattice_gl::manager",
            window = %id,
            width,
            height,
            "window resized"
        );
        Ok(())
    }

    /// Cached width of a window.
    pub fn window_get_width(&self, id: WindowId) -> GlResult<u32> {
        self.window_ref(id).map(GlWindow::width)
    }

    /// Cached height of a window.
    pub fn window_get_height(&self, id: WindowId) -> GlResult<u32> {
        self.window_ref(id).map(GlWindow::height)
    }

    /// Cached width of [`WindowId::MAIN`].
    pub fn main_window_width(&self) -> GlResult<u32> {
        self.window_get_width(WindowId::MAIN)
    }

    /// Cached height of [`WindowId::MAIN`].
    pub fn main_window_height(&self) -> GlResult<u32> {
        self.window_get_height(WindowId::MAIN)
    }

    /// Unbind the current context. Idempotent.
    pub fn release_current(&mut self) {
        self.affinity.debug_assert_same_thread();
        self.binder.release(&mut self.driver);
    }

    /// Re-issue the native bind for the window the manager considers current.
    ///
    /// Use after foreign code may have changed the thread's current context.
    /// Does nothing when no window is current.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::ContextBind`] if the native call fails; no window is
    /// current afterwards.
    pub fn make_current(&mut self) -> GlResult<()> {
        self.affinity.debug_assert_same_thread();
        let Some(id) = self.binder.current() else {
            return Ok(());
        };
        let (dc, context) = self.binding_target(id)?;
        self.binder.rebind(&mut self.driver, id, dc, context)
    }

    /// Make `id` the current window. No native call if it already is.
    ///
    /// # Errors
    ///
    /// - [`GlError::WindowNotFound`] if `id` is not registered
    /// - [`GlError::ContextBind`] if the native call fails; no window is
    ///   current afterwards
    pub fn window_make_current(&mut self, id: WindowId) -> GlResult<()> {
        self.affinity.debug_assert_same_thread();
        self.bind_window(id)
    }

    /// Present the back buffer of the current window.
    ///
    /// # Errors
    ///
    /// - [`GlError::InvalidState`] if no window is current
    /// - [`GlError::SwapBuffers`] if the native swap fails
    pub fn swap_buffers(&mut self) -> GlResult<()> {
        self.affinity.debug_assert_same_thread();
        let id = self
            .binder
            .current()
            .ok_or(GlError::InvalidState("swap_buffers requires a current window"))?;
        let dc = self.window_ref(id)?.device_context;
        self.driver
            .swap_buffers(dc)
            .map_err(|source| GlError::SwapBuffers { window: id, source })
    }

    /// Turn vertical sync on or off for a window.
    ///
    /// The swap interval is context state, so the window is made current for
    /// the call and the previous binding is restored afterwards. Without the
    /// swap-control extension this is a no-op and the cached flag is left
    /// unchanged.
    ///
    /// # Errors
    ///
    /// - [`GlError::WindowNotFound`] if `id` is not registered
    /// - [`GlError::ContextBind`] if `id` cannot be made current, or if the
    ///   previously current window cannot be bound again; the new vsync
    ///   setting is kept in that case and no window is current
    pub fn set_use_vsync(&mut self, id: WindowId, enabled: bool) -> GlResult<()> {
        self.affinity.debug_assert_same_thread();
        self.window_ref(id)?;

        let previous = self.binder.current();
        self.bind_window(id)?;

        if self.vsync.apply(&mut self.driver, enabled) {
            self.window_mut(id)?.use_vsync = enabled;
        }

        if previous != Some(id) {
            self.restore_binding(previous)?;
        }
        Ok(())
    }

    /// The cached vsync flag of a window. Does not query the driver.
    pub fn is_using_vsync(&self, id: WindowId) -> GlResult<bool> {
        self.window_ref(id).map(GlWindow::use_vsync)
    }

    /// Whether the swap-control extension was found, once probed.
    pub fn vsync_support(&self) -> VsyncSupport {
        self.vsync.support()
    }

    /// The swap interval the driver reports for the current context.
    pub fn current_swap_interval(&self) -> Option<i32> {
        self.binder.current()?;
        self.vsync.current_interval()
    }

    /// The device context leased for a window.
    pub fn get_hdc(&self, id: WindowId) -> GlResult<DeviceContext> {
        self.window_ref(id).map(GlWindow::device_context)
    }

    /// The rendering context a window renders with.
    pub fn get_hglrc(&self, id: WindowId) -> GlResult<RenderingContext> {
        let display = self.window_ref(id)?.display;
        self.displays
            .get(display)
            .and_then(DisplayGroup::context)
            .ok_or(GlError::InvalidState("window's display group has no context"))
    }

    /// The window that is current, if any.
    pub fn current_window(&self) -> Option<WindowId> {
        self.binder.current()
    }

    /// The binder's state.
    pub fn binder_state(&self) -> BinderState {
        self.binder.state()
    }

    /// Bookkeeping for a registered window.
    pub fn window(&self, id: WindowId) -> Option<&GlWindow> {
        self.windows.get(&id)
    }

    /// Whether `id` is registered.
    pub fn contains_window(&self, id: WindowId) -> bool {
        self.windows.contains_key(&id)
    }

    /// Number of registered windows.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Registered window identifiers, in ascending order.
    pub fn window_ids(&self) -> Vec<WindowId> {
        self.windows.keys().copied().collect()
    }

    /// Number of display groups (distinct rendering contexts).
    pub fn display_count(&self) -> usize {
        self.displays.len()
    }

    /// A display group by id.
    pub fn display(&self, id: DisplayGroupId) -> Option<&DisplayGroup> {
        self.displays.get(id)
    }

    /// The display group a window belongs to.
    pub fn window_display(&self, id: WindowId) -> GlResult<DisplayGroupId> {
        self.window_ref(id).map(GlWindow::display)
    }

    /// The configuration the manager was created with.
    pub fn config(&self) -> &GlConfig {
        &self.config
    }

    /// The underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn window_ref(&self, id: WindowId) -> GlResult<&GlWindow> {
        self.windows.get(&id).ok_or(GlError::WindowNotFound(id))
    }

    fn window_mut(&mut self, id: WindowId) -> GlResult<&mut GlWindow> {
        self.windows.get_mut(&id).ok_or(GlError::WindowNotFound(id))
    }

    fn binding_target(&self, id: WindowId) -> GlResult<(DeviceContext, RenderingContext)> {
        let dc = self.window_ref(id)?.device_context;
        let context = self.get_hglrc(id)?;
        Ok((dc, context))
    }

    fn bind_window(&mut self, id: WindowId) -> GlResult<()> {
        let (dc, context) = self.binding_target(id)?;
        self.binder.bind(&mut self.driver, id, dc, context)
    }

    /// Put the binding back to `previous`. On failure no window is current.
    fn restore_binding(&mut self, previous: Option<WindowId>) -> GlResult<()> {
        match previous {
            Some(id) => self.bind_window(id),
            None => {
                self.binder.release(&mut self.driver);
                Ok(())
            }
        }
    }

    /// Negotiate a format for `dc` and join or create a display group.
    /// A group reserved here is discarded again if it never got a context.
    fn attach_display(
        &mut self,
        id: WindowId,
        dc: DeviceContext,
        request: &PixelFormatRequest,
    ) -> GlResult<DisplayGroupId> {
        let format = self
            .driver
            .choose_pixel_format(dc, request)
            .map_err(|source| GlError::ContextCreation { window: id, source })?;
        debug!(
            target: "horizon_lattice_gl::manager",
            window = %id,
            format = format.index(),
            "pixel format negotiated"
        );

        let (display, reserved) = self.displays.find_or_create(&self.driver, dc, format);
        if let Err(err) = self.create_context(id, dc, format, request, display) {
            if reserved {
                self.displays.discard_reserved(display);
            }
            return Err(err);
        }
        Ok(display)
    }

    /// Apply `format` to `dc` and give `display` a context if it has none.
    fn create_context(
        &mut self,
        id: WindowId,
        dc: DeviceContext,
        format: PixelFormatId,
        request: &PixelFormatRequest,
        display: DisplayGroupId,
    ) -> GlResult<()> {
        self.driver
            .apply_pixel_format(dc, format, request)
            .map_err(|source| GlError::ContextCreation { window: id, source })?;

        let has_context = self
            .displays
            .get(display)
            .is_some_and(|group| group.context().is_some());
        if has_context {
            return Ok(());
        }

        let share = if self.config.share_contexts {
            self.displays.first_context()
        } else {
            None
        };

        // Creation may leave another context current.
        let previous = self.binder.current();
        let created = self.driver.create_context(dc, &self.config, share);
        self.binder.forget();
        let restored = self.restore_binding(previous);

        let context = created.map_err(|source| GlError::ContextCreation { window: id, source })?;
        self.displays.set_context(display, context);

        let group = display.index();
        info!(
            target: "horizon_lattice_gl::manager",
            group,
            format = format.index(),
            shared = share.is_some(),
            "display group context created"
        );
        restored
    }

    fn return_device_context(&mut self, id: WindowId, window: NativeWindowHandle, dc: DeviceContext) {
        if let Err(err) = self.driver.release_device_context(window, dc) {
            warn!(
                target: "horizon_lattice_gl::manager",
                window = %id,
                error = %err,
                "failed to release device context"
            );
        }
    }
}

impl<D: GlDriver> Drop for GlManager<D> {
    fn drop(&mut self) {
        if self.binder.current().is_some() {
            self.binder.release(&mut self.driver);
        }

        let windows = std::mem::take(&mut self.windows);
        for (id, window) in windows {
            self.return_device_context(id, window.native_window, window.device_context);
        }

        for context in self.displays.drain_contexts() {
            if let Err(err) = self.driver.delete_context(context) {
                warn!(
                    target: "horizon_lattice_gl::manager",
                    error = %err,
                    "failed to delete rendering context"
                );
            }
        }

        if self.initialized {
            info!(target: "horizon_lattice_gl::manager", "GL manager torn down");
        }
    }
}

impl<D: GlDriver> fmt::Debug for GlManager<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlManager")
            .field("windows", &self.windows.len())
            .field("displays", &self.displays.len())
            .field("binder", &self.binder.state())
            .field("vsync", &self.vsync.support())
            .field("initialized", &self.initialized)
            .finish()
    }
}
