//! A driver that makes no native calls.
//!
//! [`HeadlessDriver`] simulates the WGL object model closely enough to run the
//! context manager without a display or GPU: handles are fabricated, pixel
//! formats are grouped into compatibility classes, and make-current is
//! validated the way the real driver validates it. Every call is counted in
//! [`DriverStats`], and individual calls can be made to fail once with
//! [`HeadlessDriver::fail_next`].
//!
//! Clones share state, so a test can keep a clone for inspection after moving
//! the driver into a [`GlManager`](crate::GlManager).
//!
//! Formats are compatible when they agree on color depth and buffering;
//! alpha, depth and stencil bits do not affect compatibility.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroIsize;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::config::{GlConfig, PixelFormatRequest};
use crate::driver::{GlDriver, SwapControl};
use crate::error::DriverError;
use crate::handle::{DeviceContext, NativeWindowHandle, PixelFormatId, RenderingContext};

/// Driver calls that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadlessCall {
    /// [`GlDriver::probe`].
    Probe,
    /// [`GlDriver::acquire_device_context`].
    AcquireDeviceContext,
    /// [`GlDriver::choose_pixel_format`].
    ChoosePixelFormat,
    /// [`GlDriver::apply_pixel_format`].
    ApplyPixelFormat,
    /// [`GlDriver::create_context`].
    CreateContext,
    /// [`GlDriver::make_current`].
    MakeCurrent,
    /// [`GlDriver::swap_buffers`].
    SwapBuffers,
    /// [`SwapControl::set_interval`].
    SwapInterval,
}

/// Number of times each driver entry point was invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub probes: usize,
    pub device_contexts_acquired: usize,
    pub device_contexts_released: usize,
    pub pixel_formats_chosen: usize,
    pub pixel_formats_applied: usize,
    pub contexts_created: usize,
    pub contexts_deleted: usize,
    pub make_current_calls: usize,
    pub release_current_calls: usize,
    pub swap_buffers_calls: usize,
    pub swap_control_loads: usize,
    pub swap_interval_calls: usize,
}

#[derive(Debug)]
struct ContextRecord {
    format: PixelFormatId,
    share: Option<RenderingContext>,
    interval: i32,
}

#[derive(Debug)]
struct HeadlessState {
    next_handle: isize,
    formats: Vec<PixelFormatRequest>,
    leased: HashMap<DeviceContext, NativeWindowHandle>,
    surface_formats: HashMap<DeviceContext, PixelFormatId>,
    contexts: HashMap<RenderingContext, ContextRecord>,
    current: Option<(DeviceContext, RenderingContext)>,
    swap_control: bool,
    failures: HashSet<HeadlessCall>,
    stats: DriverStats,
}

impl HeadlessState {
    fn next_handle(&mut self) -> NonZeroIsize {
        self.next_handle = self.next_handle.saturating_add(0x10);
        NonZeroIsize::new(self.next_handle).unwrap_or(NonZeroIsize::MAX)
    }

    fn take_failure(&mut self, call: HeadlessCall) -> bool {
        self.failures.remove(&call)
    }

    fn format(&self, id: PixelFormatId) -> Option<&PixelFormatRequest> {
        usize::try_from(id.index() - 1)
            .ok()
            .and_then(|index| self.formats.get(index))
    }

    fn same_class(&self, a: PixelFormatId, b: PixelFormatId) -> bool {
        match (self.format(a), self.format(b)) {
            (Some(a), Some(b)) => {
                a.color_bits == b.color_bits && a.double_buffer == b.double_buffer
            }
            _ => false,
        }
    }
}

fn injected(call: &'static str) -> DriverError {
    DriverError::new(call, "injected failure")
}

/// A [`GlDriver`] without native calls.
#[derive(Debug, Clone)]
pub struct HeadlessDriver {
    state: Arc<Mutex<HeadlessState>>,
}

impl Default for HeadlessDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDriver {
    /// Create a driver that supports swap control.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HeadlessState {
                next_handle: 0x1000,
                formats: Vec::new(),
                leased: HashMap::new(),
                surface_formats: HashMap::new(),
                contexts: HashMap::new(),
                current: None,
                swap_control: true,
                failures: HashSet::new(),
                stats: DriverStats::default(),
            })),
        }
    }

    /// Choose whether the swap-control extension is exposed.
    pub fn with_swap_control(self, supported: bool) -> Self {
        self.state.lock().swap_control = supported;
        self
    }

    /// Fabricate a native window handle.
    pub fn create_window(&self) -> NativeWindowHandle {
        NativeWindowHandle::new(self.state.lock().next_handle())
    }

    /// Make the next invocation of `call` fail.
    pub fn fail_next(&self, call: HeadlessCall) {
        self.state.lock().failures.insert(call);
    }

    /// Call counters so far.
    pub fn stats(&self) -> DriverStats {
        self.state.lock().stats
    }

    /// The natively current `(device context, rendering context)` pair.
    pub fn current(&self) -> Option<(DeviceContext, RenderingContext)> {
        self.state.lock().current
    }

    /// Rendering contexts created and not yet deleted.
    pub fn live_contexts(&self) -> usize {
        self.state.lock().contexts.len()
    }

    /// Device contexts leased and not yet released.
    pub fn leased_device_contexts(&self) -> usize {
        self.state.lock().leased.len()
    }

    /// The swap interval last set on `context`.
    pub fn swap_interval(&self, context: RenderingContext) -> Option<i32> {
        self.state.lock().contexts.get(&context).map(|c| c.interval)
    }

    /// The context `context` shares objects with, if any.
    pub fn share_source(&self, context: RenderingContext) -> Option<RenderingContext> {
        self.state.lock().contexts.get(&context).and_then(|c| c.share)
    }
}

impl GlDriver for HeadlessDriver {
    fn probe(&mut self, config: &GlConfig) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.stats.probes += 1;
        if state.take_failure(HeadlessCall::Probe) {
            return Err(injected("probe"));
        }
        trace!(
            target: "horizon_lattice_gl::headless",
            context_type = ?config.context_type,
            "probe"
        );
        Ok(())
    }

    fn acquire_device_context(
        &mut self,
        window: NativeWindowHandle,
    ) -> Result<DeviceContext, DriverError> {
        let mut state = self.state.lock();
        state.stats.device_contexts_acquired += 1;
        if state.take_failure(HeadlessCall::AcquireDeviceContext) {
            return Err(injected("GetDC"));
        }
        let dc = DeviceContext::new(state.next_handle());
        state.leased.insert(dc, window);
        Ok(dc)
    }

    fn release_device_context(
        &mut self,
        window: NativeWindowHandle,
        dc: DeviceContext,
    ) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.stats.device_contexts_released += 1;
        if state.leased.get(&dc) != Some(&window) {
            return Err(DriverError::new(
                "ReleaseDC",
                "device context not leased from window",
            ));
        }
        state.leased.remove(&dc);
        state.surface_formats.remove(&dc);
        Ok(())
    }

    fn choose_pixel_format(
        &mut self,
        dc: DeviceContext,
        request: &PixelFormatRequest,
    ) -> Result<PixelFormatId, DriverError> {
        let mut state = self.state.lock();
        state.stats.pixel_formats_chosen += 1;
        if state.take_failure(HeadlessCall::ChoosePixelFormat) {
            return Err(injected("ChoosePixelFormat"));
        }
        if !state.leased.contains_key(&dc) {
            return Err(DriverError::new("ChoosePixelFormat", "unknown device context"));
        }
        if request.color_bits == 0 {
            return Err(DriverError::new("ChoosePixelFormat", "no matching pixel format"));
        }

        let index = match state.formats.iter().position(|format| format == request) {
            Some(index) => index,
            None => {
                state.formats.push(*request);
                state.formats.len() - 1
            }
        };
        i32::try_from(index + 1)
            .ok()
            .and_then(PixelFormatId::new)
            .ok_or_else(|| DriverError::new("ChoosePixelFormat", "format table exhausted"))
    }

    fn apply_pixel_format(
        &mut self,
        dc: DeviceContext,
        format: PixelFormatId,
        _request: &PixelFormatRequest,
    ) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.stats.pixel_formats_applied += 1;
        if state.take_failure(HeadlessCall::ApplyPixelFormat) {
            return Err(injected("SetPixelFormat"));
        }
        if !state.leased.contains_key(&dc) || state.format(format).is_none() {
            return Err(DriverError::new("SetPixelFormat", "invalid device context or format"));
        }
        match state.surface_formats.get(&dc) {
            Some(existing) if *existing != format => Err(DriverError::new(
                "SetPixelFormat",
                "a different pixel format is already set",
            )),
            _ => {
                state.surface_formats.insert(dc, format);
                Ok(())
            }
        }
    }

    fn formats_compatible(
        &self,
        _dc: DeviceContext,
        existing: PixelFormatId,
        candidate: PixelFormatId,
    ) -> bool {
        existing == candidate || self.state.lock().same_class(existing, candidate)
    }

    fn create_context(
        &mut self,
        dc: DeviceContext,
        _config: &GlConfig,
        share: Option<RenderingContext>,
    ) -> Result<RenderingContext, DriverError> {
        let mut state = self.state.lock();
        state.stats.contexts_created += 1;
        if state.take_failure(HeadlessCall::CreateContext) {
            return Err(injected("wglCreateContextAttribsARB"));
        }
        if !state.leased.contains_key(&dc) {
            return Err(DriverError::new("wglCreateContext", "unknown device context"));
        }
        let format = state
            .surface_formats
            .get(&dc)
            .copied()
            .ok_or_else(|| DriverError::new("wglCreateContext", "no pixel format set"))?;
        if share.is_some_and(|share| !state.contexts.contains_key(&share)) {
            return Err(DriverError::new("wglShareLists", "unknown share context"));
        }

        let context = RenderingContext::new(state.next_handle());
        state.contexts.insert(
            context,
            ContextRecord {
                format,
                share,
                interval: 0,
            },
        );
        Ok(context)
    }

    fn delete_context(&mut self, context: RenderingContext) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.stats.contexts_deleted += 1;
        if state.contexts.remove(&context).is_none() {
            return Err(DriverError::new("wglDeleteContext", "unknown context"));
        }
        if matches!(state.current, Some((_, current)) if current == context) {
            state.current = None;
        }
        Ok(())
    }

    fn make_current(
        &mut self,
        dc: DeviceContext,
        context: RenderingContext,
    ) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.stats.make_current_calls += 1;
        if state.take_failure(HeadlessCall::MakeCurrent) {
            state.current = None;
            return Err(injected("wglMakeCurrent"));
        }

        let surface = state.surface_formats.get(&dc).copied();
        let context_format = state.contexts.get(&context).map(|c| c.format);
        let compatible = match (surface, context_format) {
            (Some(surface), Some(context)) => {
                surface == context || state.same_class(surface, context)
            }
            _ => false,
        };
        if !state.leased.contains_key(&dc) || !compatible {
            state.current = None;
            return Err(DriverError::new("wglMakeCurrent", "invalid handle or incompatible format"));
        }
        state.current = Some((dc, context));
        Ok(())
    }

    fn release_current(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.stats.release_current_calls += 1;
        state.current = None;
        Ok(())
    }

    fn swap_buffers(&mut self, dc: DeviceContext) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.stats.swap_buffers_calls += 1;
        if state.take_failure(HeadlessCall::SwapBuffers) {
            return Err(injected("SwapBuffers"));
        }
        if !state.leased.contains_key(&dc) {
            return Err(DriverError::new("SwapBuffers", "unknown device context"));
        }
        Ok(())
    }

    fn load_swap_control(&mut self) -> Option<Box<dyn SwapControl>> {
        let supported = {
            let mut state = self.state.lock();
            state.stats.swap_control_loads += 1;
            state.swap_control && state.current.is_some()
        };
        if supported {
            Some(Box::new(HeadlessSwapControl {
                state: Arc::clone(&self.state),
            }))
        } else {
            None
        }
    }
}

/// Swap control that records intervals on the current context.
struct HeadlessSwapControl {
    state: Arc<Mutex<HeadlessState>>,
}

impl SwapControl for HeadlessSwapControl {
    fn set_interval(&mut self, interval: i32) -> bool {
        let mut state = self.state.lock();
        state.stats.swap_interval_calls += 1;
        if state.take_failure(HeadlessCall::SwapInterval) {
            return false;
        }
        let Some((_, context)) = state.current else {
            return false;
        };
        match state.contexts.get_mut(&context) {
            Some(record) => {
                record.interval = interval;
                true
            }
            None => false,
        }
    }

    fn interval(&self) -> Option<i32> {
        let state = self.state.lock();
        let (_, context) = state.current?;
        state.contexts.get(&context).map(|c| c.interval)
    }
}
