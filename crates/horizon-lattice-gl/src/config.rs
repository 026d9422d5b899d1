//! Configuration for the GL context manager.

/// The context profile requested from the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContextType {
    /// A desktop core context able to run GLES 3.0 shaders (OpenGL 3.3 core).
    #[default]
    Gles3Compatible,
}

impl ContextType {
    /// The desktop OpenGL `(major, minor)` version backing this profile.
    pub fn gl_version(self) -> (i32, i32) {
        match self {
            ContextType::Gles3Compatible => (3, 3),
        }
    }
}

/// Framebuffer attributes requested for a window surface.
///
/// The driver picks the closest format it supports; two requests that differ
/// only in auxiliary buffers may still land in the same compatible format
/// class and therefore share a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormatRequest {
    /// Total color bits.
    pub color_bits: u8,
    /// Alpha channel bits.
    pub alpha_bits: u8,
    /// Depth buffer bits.
    pub depth_bits: u8,
    /// Stencil buffer bits.
    pub stencil_bits: u8,
    /// Request a double-buffered surface.
    pub double_buffer: bool,
}

impl Default for PixelFormatRequest {
    fn default() -> Self {
        Self {
            color_bits: 32,
            alpha_bits: 8,
            depth_bits: 24,
            stencil_bits: 8,
            double_buffer: true,
        }
    }
}

impl PixelFormatRequest {
    /// Set the total color bits.
    pub fn with_color_bits(mut self, bits: u8) -> Self {
        self.color_bits = bits;
        self
    }

    /// Set the alpha channel bits.
    pub fn with_alpha_bits(mut self, bits: u8) -> Self {
        self.alpha_bits = bits;
        self
    }

    /// Set the depth buffer bits.
    pub fn with_depth_bits(mut self, bits: u8) -> Self {
        self.depth_bits = bits;
        self
    }

    /// Set the stencil buffer bits.
    pub fn with_stencil_bits(mut self, bits: u8) -> Self {
        self.stencil_bits = bits;
        self
    }

    /// Enable or disable double buffering.
    pub fn with_double_buffer(mut self, enabled: bool) -> Self {
        self.double_buffer = enabled;
        self
    }
}

/// Configuration options for a [`GlManager`](crate::GlManager).
#[derive(Debug, Clone)]
pub struct GlConfig {
    /// Context profile to create.
    pub context_type: ContextType,
    /// Pixel format used by [`window_create`](crate::GlManager::window_create).
    pub default_format: PixelFormatRequest,
    /// New display groups share objects with the first group's context.
    pub share_contexts: bool,
    /// Request a driver debug context.
    pub debug_context: bool,
}

impl Default for GlConfig {
    fn default() -> Self {
        Self {
            context_type: ContextType::default(),
            default_format: PixelFormatRequest::default(),
            share_contexts: true,
            debug_context: cfg!(debug_assertions),
        }
    }
}

impl GlConfig {
    /// Create a configuration for the given context profile.
    pub fn new(context_type: ContextType) -> Self {
        Self {
            context_type,
            ..Default::default()
        }
    }

    /// Set the default pixel format for new windows.
    pub fn with_default_format(mut self, format: PixelFormatRequest) -> Self {
        self.default_format = format;
        self
    }

    /// Enable or disable object sharing between display groups.
    pub fn with_share_contexts(mut self, share: bool) -> Self {
        self.share_contexts = share;
        self
    }

    /// Enable or disable driver debug contexts.
    pub fn with_debug_context(mut self, debug: bool) -> Self {
        self.debug_context = debug;
        self
    }
}
