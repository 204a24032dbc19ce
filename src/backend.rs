//! Capabilities a platform hands to platform-independent widgets.
//!
//! A popover never talks to a windowing system directly. It is given a parent
//! [`WindowFrame`], a [`PopoverSurface`] standing for its native transient
//! window, and a [`DisplayCapabilities`] to ask what the screen can do.

use crate::widget::Size;
use crate::window::WindowId;

pub trait WindowFrame {
    fn window_id(&self) -> WindowId;

    /// False once the native window has been destroyed.
    fn is_alive(&self) -> bool;
}

pub trait DisplayCapabilities {
    /// Whether surfaces on this display carry a per-pixel alpha channel.
    fn supports_alpha(&self) -> bool;
}

/// The native window backing a popover.
pub trait PopoverSurface {
    fn show(&mut self);

    fn grab_focus(&mut self);

    /// Current size of the surface, in surface-local units.
    fn size(&self) -> Size;

    /// Moves the top-left corner of the surface, relative to the parent window.
    fn move_to(&mut self, x: i32, y: i32);

    /// Hides the surface and releases its native resources.
    fn hide(&mut self);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SurfaceKind {
    #[default]
    Normal,
    PopupMenu,
}

/// Window manager hints applied when a native surface is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceHints {
    pub kind: SurfaceKind,
    pub decorated: bool,
    pub skip_taskbar: bool,
    pub skip_pager: bool,
    /// The widget paints its own background.
    pub app_paintable: bool,
    pub transient_for: Option<WindowId>,
    pub destroy_with_parent: bool,
}

impl SurfaceHints {
    pub fn popover(parent: WindowId) -> Self {
        Self {
            kind: SurfaceKind::PopupMenu,
            decorated: false,
            skip_taskbar: true,
            skip_pager: true,
            app_paintable: true,
            transient_for: Some(parent),
            destroy_with_parent: true,
        }
    }

    /// Names of the hints an `xdg_popup` cannot express.
    ///
    /// An `xdg_popup` is always an undecorated, client-painted menu surface
    /// that stays out of taskbars and pagers and dies with its parent.
    pub fn unsupported_by_popup(&self) -> Vec<&'static str> {
        let mut unsupported = Vec::new();
        if self.kind != SurfaceKind::PopupMenu {
            unsupported.push("kind");
        }
        if self.decorated {
            unsupported.push("decorated");
        }
        if !self.skip_taskbar {
            unsupported.push("skip_taskbar");
        }
        if !self.skip_pager {
            unsupported.push("skip_pager");
        }
        if !self.app_paintable {
            unsupported.push("app_paintable");
        }
        if !self.destroy_with_parent {
            unsupported.push("destroy_with_parent");
        }
        unsupported
    }
}

impl Default for SurfaceHints {
    fn default() -> Self {
        Self {
            kind: SurfaceKind::Normal,
            decorated: true,
            skip_taskbar: false,
            skip_pager: false,
            app_paintable: false,
            transient_for: None,
            destroy_with_parent: false,
        }
    }
}
