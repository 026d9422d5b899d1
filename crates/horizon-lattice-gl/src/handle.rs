//! Identifiers and opaque native handles.
//!
//! Native handles are stored as non-null integers. Which side owns each one
//! is part of the type:
//!
//! - [`NativeWindowHandle`] / [`NativeInstanceHandle`]: borrowed from the
//!   windowing layer, never released here.
//! - [`DeviceContext`]: leased from a native window for as long as the window
//!   is registered.
//! - [`RenderingContext`]: owned by a display group and deleted at teardown.

use std::fmt;
use std::num::NonZeroIsize;

use raw_window_handle::RawWindowHandle;

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        pub struct $name(NonZeroIsize);

        impl $name {
            /// Wrap a non-null native value.
            #[inline]
            pub const fn new(raw: NonZeroIsize) -> Self {
                Self(raw)
            }

            /// Wrap a raw native value. Returns `None` for null.
            #[inline]
            pub fn from_raw(raw: isize) -> Option<Self> {
                NonZeroIsize::new(raw).map(Self)
            }

            /// The raw native value.
            #[inline]
            pub fn as_raw(self) -> isize {
                self.0.get()
            }
        }
    };
}

native_handle! {
    /// A native window handle (`HWND`), borrowed from the windowing layer.
    NativeWindowHandle
}

native_handle! {
    /// A native module/instance handle (`HINSTANCE`) owning a window class.
    NativeInstanceHandle
}

native_handle! {
    /// A device-context handle (`HDC`) leased from a native window.
    DeviceContext
}

native_handle! {
    /// A driver rendering-context handle (`HGLRC`).
    RenderingContext
}

impl NativeWindowHandle {
    /// Extract the `HWND` from a Win32 raw window handle.
    ///
    /// Returns `None` for any other windowing system.
    pub fn from_raw_window_handle(handle: &RawWindowHandle) -> Option<Self> {
        match handle {
            RawWindowHandle::Win32(win32) => Some(Self(win32.hwnd)),
            _ => None,
        }
    }
}

impl NativeInstanceHandle {
    /// Extract the `HINSTANCE` from a Win32 raw window handle, if it carries one.
    pub fn from_raw_window_handle(handle: &RawWindowHandle) -> Option<Self> {
        match handle {
            RawWindowHandle::Win32(win32) => win32.hinstance.map(Self),
            _ => None,
        }
    }
}

/// Logical window identifier assigned by the host's display server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct WindowId(u32);

impl WindowId {
    /// The conventional identifier of the main window.
    pub const MAIN: WindowId = WindowId(0);

    /// Create a window identifier.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The raw identifier.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// Index of a display group, stable for the manager's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayGroupId(usize);

impl DisplayGroupId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the group in creation order.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A driver pixel-format index (1-based, as WGL reports them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormatId(i32);

impl PixelFormatId {
    /// Wrap a driver format index. Returns `None` unless `index > 0`.
    pub const fn new(index: i32) -> Option<Self> {
        if index > 0 { Some(Self(index)) } else { None }
    }

    /// The driver format index.
    #[inline]
    pub const fn index(self) -> i32 {
        self.0
    }
}
