//! Display groups: rendering contexts shared by compatible windows.
//!
//! Groups are kept in creation order and never removed while the manager
//! lives. A new window joins the first group whose pixel format the driver
//! reports as compatible with its own; otherwise a new slot is reserved and
//! populated by context creation.

use tracing::debug;

use crate::driver::GlDriver;
use crate::handle::{DeviceContext, DisplayGroupId, PixelFormatId, RenderingContext};

/// One rendering context shared by one or more windows.
#[derive(Debug, Clone)]
pub struct DisplayGroup {
    context: Option<RenderingContext>,
    format: PixelFormatId,
}

impl DisplayGroup {
    fn reserved(format: PixelFormatId) -> Self {
        Self {
            context: None,
            format,
        }
    }

    /// The group's rendering context, once created.
    #[inline]
    pub fn context(&self) -> Option<RenderingContext> {
        self.context
    }

    /// The pixel format the group was created with.
    #[inline]
    pub fn format(&self) -> PixelFormatId {
        self.format
    }
}

/// Ordered collection of display groups.
#[derive(Debug, Default)]
pub(crate) struct DisplayRegistry {
    groups: Vec<DisplayGroup>,
}

impl DisplayRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Find the first group compatible with `format`, or reserve a new,
    /// context-less one. The flag is `true` when a slot was reserved.
    pub(crate) fn find_or_create<D: GlDriver + ?Sized>(
        &mut self,
        driver: &D,
        dc: DeviceContext,
        format: PixelFormatId,
    ) -> (DisplayGroupId, bool) {
        if let Some(index) = self
            .groups
            .iter()
            .position(|group| driver.formats_compatible(dc, group.format, format))
        {
            debug!(
                target: "horizon_lattice_gl::display",
                group = index,
                format = format.index(),
                "joining compatible display group"
            );
            return (DisplayGroupId::new(index), false);
        }

        self.groups.push(DisplayGroup::reserved(format));
        let id = DisplayGroupId::new(self.groups.len() - 1);
        debug!(
            target: "horizon_lattice_gl::display",
            group = id.index(),
            format = format.index(),
            "reserved display group"
        );
        (id, true)
    }

    /// Drop a slot reserved by [`find_or_create`](Self::find_or_create) whose
    /// context was never created.
    pub(crate) fn discard_reserved(&mut self, id: DisplayGroupId) {
        let is_last = id.index() + 1 == self.groups.len();
        if is_last && self.groups[id.index()].context.is_none() {
            self.groups.pop();
            debug!(
                target: "horizon_lattice_gl::display",
                group = id.index(),
                "discarded reserved display group"
            );
        }
    }

    pub(crate) fn get(&self, id: DisplayGroupId) -> Option<&DisplayGroup> {
        self.groups.get(id.index())
    }

    pub(crate) fn set_context(&mut self, id: DisplayGroupId, context: RenderingContext) {
        if let Some(group) = self.groups.get_mut(id.index()) {
            group.context = Some(context);
        }
    }

    /// The oldest existing context, used as the share source for new groups.
    pub(crate) fn first_context(&self) -> Option<RenderingContext> {
        self.groups.iter().find_map(|group| group.context)
    }

    pub(crate) fn len(&self) -> usize {
        self.groups.len()
    }

    /// Remove every group, yielding the contexts that were created.
    pub(crate) fn drain_contexts(&mut self) -> Vec<RenderingContext> {
        self.groups.drain(..).filter_map(|group| group.context).collect()
    }
}
