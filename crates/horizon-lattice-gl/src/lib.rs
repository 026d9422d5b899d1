//! OpenGL context management for native windows in Horizon Lattice.
//!
//! This crate owns the GL rendering contexts behind a set of native windows.
//! Windows whose pixel formats are compatible share a single context (a
//! "display group"); incompatible windows get their own, created as sharing
//! peers of the first so textures and buffers are visible everywhere.
//!
//! # Getting Started
//!
//! Create a [`GlManager`] over a [`GlDriver`], initialize it, then register
//! each window with its native handles:
//!
//! ```
//! use horizon_lattice_gl::{GlConfig, GlManager, HeadlessDriver, NativeInstanceHandle, WindowId};
//!
//! # fn main() -> horizon_lattice_gl::GlResult<()> {
//! let driver = HeadlessDriver::new();
//! let main_hwnd = driver.create_window();
//! let popup_hwnd = driver.create_window();
//! let hinstance = NativeInstanceHandle::from_raw(0x400000).unwrap();
//!
//! let mut manager = GlManager::new(driver, GlConfig::default());
//! manager.initialize()?;
//!
//! manager.window_create(WindowId::MAIN, main_hwnd, hinstance, 1280, 720)?;
//! manager.window_create(WindowId::new(1), popup_hwnd, hinstance, 320, 240)?;
//!
//! // Same pixel format, same context.
//! assert_eq!(manager.display_count(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! On Windows, use [`WglDriver`] with the `HWND`/`HINSTANCE` taken from the
//! window's raw handle:
//!
//! ```ignore
//! use raw_window_handle::HasWindowHandle;
//!
//! let raw = window.window_handle()?.as_raw();
//! let hwnd = NativeWindowHandle::from_raw_window_handle(&raw).unwrap();
//! let hinstance = NativeInstanceHandle::from_raw_window_handle(&raw).unwrap();
//!
//! let mut manager = GlManager::new(WglDriver::new(), GlConfig::default());
//! manager.initialize()?;
//! manager.window_create(WindowId::MAIN, hwnd, hinstance, 1280, 720)?;
//! ```
//!
//! # Rendering
//!
//! Bind a window, draw with GL, then present:
//!
//! ```ignore
//! manager.window_make_current(WindowId::MAIN)?;
//! // ... GL calls ...
//! manager.swap_buffers()?;
//! ```
//!
//! Binding is tracked: making the already-current window current again costs
//! nothing. [`GlManager::make_current`] forces the bind when foreign code may
//! have changed the thread's context.
//!
//! # Threading
//!
//! A manager must be used on the thread that created it. Debug builds panic on
//! cross-thread use; see [`ThreadAffinity`].

mod binder;
mod config;
mod display;
mod driver;
mod error;
mod handle;
mod headless;
pub mod logging;
mod manager;
mod thread_check;
mod vsync;
#[cfg(target_os = "windows")]
mod wgl;

pub use binder::BinderState;
pub use config::{ContextType, GlConfig, PixelFormatRequest};
pub use display::DisplayGroup;
pub use driver::{GlDriver, SwapControl};
pub use error::{DriverError, GlError, GlErrorKind, GlResult};
pub use handle::{
    DeviceContext, DisplayGroupId, NativeInstanceHandle, NativeWindowHandle, PixelFormatId,
    RenderingContext, WindowId,
};
pub use headless::{DriverStats, HeadlessCall, HeadlessDriver};
pub use manager::{GlManager, GlWindow};
pub use thread_check::ThreadAffinity;
pub use vsync::VsyncSupport;
#[cfg(target_os = "windows")]
pub use wgl::WglDriver;

// Re-export for handle conversion.
pub use raw_window_handle;
