//! WGL driver for Windows.
//!
//! Contexts are created in two steps: a legacy context is made current so
//! `wglCreateContextAttribsARB` can be resolved, then the real context is
//! created with the configured version and profile and the legacy one is
//! deleted. Drivers without the ARB entry point keep the legacy context.

use std::ffi::c_void;
use std::mem;

use tracing::{debug, trace, warn};
use windows::Win32::Foundation::{BOOL, HINSTANCE, HWND};
use windows::Win32::Graphics::Gdi::{GetDC, HDC, ReleaseDC};
use windows::Win32::Graphics::OpenGL::{
    ChoosePixelFormat, DescribePixelFormat, GetPixelFormat, HGLRC, PFD_DOUBLEBUFFER,
    PFD_DRAW_TO_WINDOW, PFD_SUPPORT_OPENGL, PFD_TYPE_RGBA,
    PIXELFORMATDESCRIPTOR, SetPixelFormat, SwapBuffers, wglCreateContext, wglDeleteContext,
    wglGetProcAddress, wglMakeCurrent, wglShareLists,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DestroyWindow, WINDOW_EX_STYLE, WS_OVERLAPPED,
};
use windows::core::{PCSTR, s, w};

use crate::config::{GlConfig, PixelFormatRequest};
use crate::driver::{GlDriver, SwapControl};
use crate::error::DriverError;
use crate::handle::{DeviceContext, NativeWindowHandle, PixelFormatId, RenderingContext};

const WGL_CONTEXT_MAJOR_VERSION_ARB: i32 = 0x2091;
const WGL_CONTEXT_MINOR_VERSION_ARB: i32 = 0x2092;
const WGL_CONTEXT_FLAGS_ARB: i32 = 0x2094;
const WGL_CONTEXT_PROFILE_MASK_ARB: i32 = 0x9126;
const WGL_CONTEXT_CORE_PROFILE_BIT_ARB: i32 = 0x0001;
const WGL_CONTEXT_DEBUG_BIT_ARB: i32 = 0x0001;
const WGL_CONTEXT_FORWARD_COMPATIBLE_BIT_ARB: i32 = 0x0002;

type CreateContextAttribsArb = unsafe extern "system" fn(HDC, HGLRC, *const i32) -> HGLRC;
type SwapIntervalExt = unsafe extern "system" fn(i32) -> BOOL;
type GetSwapIntervalExt = unsafe extern "system" fn() -> i32;

fn hwnd(window: NativeWindowHandle) -> HWND {
    HWND(window.as_raw() as *mut c_void)
}

fn hdc(dc: DeviceContext) -> HDC {
    HDC(dc.as_raw() as *mut c_void)
}

fn hglrc(context: RenderingContext) -> HGLRC {
    HGLRC(context.as_raw() as *mut c_void)
}

fn last_error(call: &'static str) -> DriverError {
    DriverError::new(call, windows::core::Error::from_win32().to_string())
}

fn win_error(call: &'static str) -> impl FnOnce(windows::core::Error) -> DriverError {
    move |err| DriverError::new(call, err.to_string())
}

/// Resolve a WGL extension entry point. Requires a current context.
///
/// # Safety
///
/// `F` must be the function pointer type of `name`.
unsafe fn load_proc<F: Copy>(name: PCSTR) -> Option<F> {
    let proc = unsafe { wglGetProcAddress(name) }?;
    // Some ICDs return small integers or -1 instead of null.
    let addr = proc as usize;
    if matches!(addr, 1..=3) || addr == usize::MAX {
        return None;
    }
    debug_assert_eq!(mem::size_of::<F>(), mem::size_of_val(&proc));
    Some(unsafe { mem::transmute_copy::<_, F>(&proc) })
}

fn descriptor(request: &PixelFormatRequest) -> PIXELFORMATDESCRIPTOR {
    let mut flags = PFD_DRAW_TO_WINDOW | PFD_SUPPORT_OPENGL;
    if request.double_buffer {
        flags |= PFD_DOUBLEBUFFER;
    }
    PIXELFORMATDESCRIPTOR {
        nSize: mem::size_of::<PIXELFORMATDESCRIPTOR>() as u16,
        nVersion: 1,
        dwFlags: flags,
        iPixelType: PFD_TYPE_RGBA,
        cColorBits: request.color_bits,
        cAlphaBits: request.alpha_bits,
        cDepthBits: request.depth_bits,
        cStencilBits: request.stencil_bits,
        ..Default::default()
    }
}

/// [`GlDriver`] over `opengl32.dll`.
///
/// Must be used on the thread that owns the windows it draws to.
#[derive(Debug, Default)]
pub struct WglDriver {
    _private: (),
}

impl WglDriver {
    /// Create a WGL driver.
    pub fn new() -> Self {
        Self::default()
    }

    fn describe(&self, dc: DeviceContext, format: PixelFormatId) -> Option<PIXELFORMATDESCRIPTOR> {
        let mut pfd = PIXELFORMATDESCRIPTOR::default();
        let max = unsafe {
            DescribePixelFormat(
                hdc(dc),
                format.index(),
                mem::size_of::<PIXELFORMATDESCRIPTOR>() as u32,
                Some(&mut pfd as *mut _),
            )
        };
        (max != 0).then_some(pfd)
    }

    /// Upgrade `legacy` (current on `dc`) to a versioned context.
    ///
    /// Returns `None` when the driver has no `wglCreateContextAttribsARB`.
    fn create_versioned(
        &self,
        dc: HDC,
        config: &GlConfig,
        share: Option<RenderingContext>,
    ) -> Option<Result<HGLRC, DriverError>> {
        let create: CreateContextAttribsArb =
            unsafe { load_proc(s!("wglCreateContextAttribsARB")) }?;

        let (major, minor) = config.context_type.gl_version();
        let mut flags = WGL_CONTEXT_FORWARD_COMPATIBLE_BIT_ARB;
        if config.debug_context {
            flags |= WGL_CONTEXT_DEBUG_BIT_ARB;
        }
        let attribs = [
            WGL_CONTEXT_MAJOR_VERSION_ARB,
            major,
            WGL_CONTEXT_MINOR_VERSION_ARB,
            minor,
            WGL_CONTEXT_FLAGS_ARB,
            flags,
            WGL_CONTEXT_PROFILE_MASK_ARB,
            WGL_CONTEXT_CORE_PROFILE_BIT_ARB,
            0,
        ];

        let share = share.map(hglrc).unwrap_or_default();
        let context = unsafe { create(dc, share, attribs.as_ptr()) };
        if context.0.is_null() {
            return Some(Err(DriverError::new(
                "wglCreateContextAttribsARB",
                format!("GL {major}.{minor} core profile not supported"),
            )));
        }
        Some(Ok(context))
    }
}

impl GlDriver for WglDriver {
    fn probe(&mut self, config: &GlConfig) -> Result<(), DriverError> {
        let instance = unsafe { GetModuleHandleW(None) }.map_err(win_error("GetModuleHandleW"))?;
        // Hidden: no WS_VISIBLE.
        let window = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                w!("STATIC"),
                w!("horizon-lattice-gl probe"),
                WS_OVERLAPPED,
                0,
                0,
                1,
                1,
                None,
                None,
                HINSTANCE(instance.0),
                None,
            )
        }
        .map_err(win_error("CreateWindowExW"))?;

        let result = NativeWindowHandle::from_raw(window.0 as isize)
            .ok_or_else(|| DriverError::new("CreateWindowExW", "null window"))
            .and_then(|probe_window| {
                let dc = self.acquire_device_context(probe_window)?;
                let created = self
                    .choose_pixel_format(dc, &config.default_format)
                    .and_then(|format| self.apply_pixel_format(dc, format, &config.default_format))
                    .and_then(|()| self.create_context(dc, config, None));
                let outcome = match created {
                    Ok(context) => {
                        let _ = self.release_current();
                        self.delete_context(context)
                    }
                    Err(err) => Err(err),
                };
                let _ = self.release_device_context(probe_window, dc);
                outcome
            });

        if let Err(err) = unsafe { DestroyWindow(window) } {
            warn!(
                target: "horizon_lattice_gl::wgl",
                error = %err,
                "failed to destroy probe window"
            );
        }

        if result.is_ok() {
            let (major, minor) = config.context_type.gl_version();
            debug!(
                target: "horizon_lattice_gl::wgl",
                gl_major = major,
                gl_minor = minor,
                "baseline context probe succeeded"
            );
        }
        result
    }

    fn acquire_device_context(
        &mut self,
        window: NativeWindowHandle,
    ) -> Result<DeviceContext, DriverError> {
        let dc = unsafe { GetDC(hwnd(window)) };
        DeviceContext::from_raw(dc.0 as isize).ok_or_else(|| last_error("GetDC"))
    }

    fn release_device_context(
        &mut self,
        window: NativeWindowHandle,
        dc: DeviceContext,
    ) -> Result<(), DriverError> {
        if unsafe { ReleaseDC(hwnd(window), hdc(dc)) } == 1 {
            Ok(())
        } else {
            Err(DriverError::new("ReleaseDC", "device context was not released"))
        }
    }

    fn choose_pixel_format(
        &mut self,
        dc: DeviceContext,
        request: &PixelFormatRequest,
    ) -> Result<PixelFormatId, DriverError> {
        let pfd = descriptor(request);
        let index = unsafe { ChoosePixelFormat(hdc(dc), &pfd) };
        let format = PixelFormatId::new(index).ok_or_else(|| last_error("ChoosePixelFormat"))?;
        trace!(
            target: "horizon_lattice_gl::wgl",
            format = index,
            color_bits = request.color_bits,
            "pixel format chosen"
        );
        Ok(format)
    }

    fn apply_pixel_format(
        &mut self,
        dc: DeviceContext,
        format: PixelFormatId,
        request: &PixelFormatRequest,
    ) -> Result<(), DriverError> {
        // A window's format can be set only once.
        if unsafe { GetPixelFormat(hdc(dc)) } == format.index() {
            return Ok(());
        }
        let pfd = self.describe(dc, format).unwrap_or_else(|| descriptor(request));
        unsafe { SetPixelFormat(hdc(dc), format.index(), &pfd) }.map_err(win_error("SetPixelFormat"))
    }

    /// `wglMakeCurrent` only accepts a device context whose pixel format is
    /// the one the context was created with, so only identical formats share.
    fn formats_compatible(
        &self,
        _dc: DeviceContext,
        existing: PixelFormatId,
        candidate: PixelFormatId,
    ) -> bool {
        existing == candidate
    }

    fn create_context(
        &mut self,
        dc: DeviceContext,
        config: &GlConfig,
        share: Option<RenderingContext>,
    ) -> Result<RenderingContext, DriverError> {
        let dc = hdc(dc);
        let legacy = unsafe { wglCreateContext(dc) }.map_err(win_error("wglCreateContext"))?;
        if let Err(err) = unsafe { wglMakeCurrent(dc, legacy) } {
            let _ = unsafe { wglDeleteContext(legacy) };
            return Err(DriverError::new("wglMakeCurrent", err.to_string()));
        }

        let context = match self.create_versioned(dc, config, share) {
            Some(versioned) => {
                let _ = unsafe { wglMakeCurrent(HDC::default(), HGLRC::default()) };
                let _ = unsafe { wglDeleteContext(legacy) };
                versioned?
            }
            None => {
                warn!(
                    target: "horizon_lattice_gl::wgl",
                    "wglCreateContextAttribsARB unavailable, using legacy context"
                );
                let _ = unsafe { wglMakeCurrent(HDC::default(), HGLRC::default()) };
                if let Some(share) = share {
                    if let Err(err) = unsafe { wglShareLists(hglrc(share), legacy) } {
                        let _ = unsafe { wglDeleteContext(legacy) };
                        return Err(DriverError::new("wglShareLists", err.to_string()));
                    }
                }
                legacy
            }
        };

        RenderingContext::from_raw(context.0 as isize)
            .ok_or_else(|| DriverError::new("wglCreateContext", "null context"))
    }

    fn delete_context(&mut self, context: RenderingContext) -> Result<(), DriverError> {
        unsafe { wglDeleteContext(hglrc(context)) }.map_err(win_error("wglDeleteContext"))
    }

    fn make_current(
        &mut self,
        dc: DeviceContext,
        context: RenderingContext,
    ) -> Result<(), DriverError> {
        unsafe { wglMakeCurrent(hdc(dc), hglrc(context)) }.map_err(win_error("wglMakeCurrent"))
    }

    fn release_current(&mut self) -> Result<(), DriverError> {
        unsafe { wglMakeCurrent(HDC::default(), HGLRC::default()) }
            .map_err(win_error("wglMakeCurrent"))
    }

    fn swap_buffers(&mut self, dc: DeviceContext) -> Result<(), DriverError> {
        unsafe { SwapBuffers(hdc(dc)) }.map_err(win_error("SwapBuffers"))
    }

    fn load_swap_control(&mut self) -> Option<Box<dyn SwapControl>> {
        let set: SwapIntervalExt = unsafe { load_proc(s!("wglSwapIntervalEXT")) }?;
        let get: Option<GetSwapIntervalExt> = unsafe { load_proc(s!("wglGetSwapIntervalEXT")) };
        Some(Box::new(WglSwapControl { set, get }))
    }
}

/// `WGL_EXT_swap_control` entry points.
struct WglSwapControl {
    set: SwapIntervalExt,
    get: Option<GetSwapIntervalExt>,
}

impl SwapControl for WglSwapControl {
    fn set_interval(&mut self, interval: i32) -> bool {
        unsafe { (self.set)(interval) }.as_bool()
    }

    fn interval(&self) -> Option<i32> {
        self.get.map(|get| unsafe { get() })
    }
}
