use std::collections::HashMap;

use smithay_client_toolkit::shell::{
    WaylandSurface,
    xdg::{popup::Popup as XdgPopup, window::Window as XdgWindow},
};
use wayland_client::{Proxy, protocol::wl_surface};

use crate::backend::{PopoverSurface, WindowFrame};
use crate::input::KeyEvent;
use crate::popover::{Popover, PopoverId};
use crate::widget::Size;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

pub struct Window {
    pub id: WindowId,
    pub xdg: XdgWindow,
    pub width: u32,
    pub height: u32,
    pub dirty: bool,
}

impl Window {
    pub fn surface(&self) -> &wl_surface::WlSurface {
        self.xdg.wl_surface()
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl WindowFrame for Window {
    fn window_id(&self) -> WindowId {
        self.id
    }

    fn is_alive(&self) -> bool {
        self.surface().is_alive()
    }
}

/// The `xdg_popup` side of a popover.
///
/// [`PopoverSurface`] calls only record what the popover asked for. The
/// application turns those requests into protocol objects afterwards, since
/// creating a popup needs the event queue and the parent's `xdg_surface`.
#[derive(Default)]
pub struct NativePopover {
    pub xdg: Option<XdgPopup>,
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
    pub visible: bool,
    pub wants_grab: bool,
    pub needs_reposition: bool,
    pub dirty: bool,
}

impl NativePopover {
    pub fn surface(&self) -> Option<&wl_surface::WlSurface> {
        self.xdg.as_ref().map(|popup| popup.wl_surface())
    }
}

impl PopoverSurface for NativePopover {
    fn show(&mut self) {
        self.visible = true;
    }

    fn grab_focus(&mut self) {
        self.wants_grab = true;
    }

    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    fn move_to(&mut self, x: i32, y: i32) {
        if (self.x, self.y) != (x, y) {
            self.x = x;
            self.y = y;
            self.needs_reposition = self.xdg.is_some();
        }
    }

    fn hide(&mut self) {
        // sctk's Popup destroys the protocol objects on drop
        self.xdg = None;
        self.visible = false;
        self.wants_grab = false;
        self.needs_reposition = false;
        self.dirty = false;
    }
}

pub struct PopoverSlot {
    pub popover: Popover,
    pub native: NativePopover,
}

impl PopoverSlot {
    /// Routes a key to the popover and marks it for redraw if it changed.
    ///
    /// Returns whether the popover still holds keyboard focus, which is false
    /// once the key closed it.
    pub fn handle_key(&mut self, event: &KeyEvent) -> bool {
        if self.popover.handle_key(&mut self.native, event) {
            self.native.dirty = self.native.visible;
        }
        self.popover.is_open()
    }
}

pub struct WindowManager {
    pub windows: HashMap<WindowId, Window>,
    pub popovers: HashMap<PopoverId, PopoverSlot>,
    next_window_id: u64,
    next_popover_id: u64,
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowManager {
    pub fn new() -> Self {
        Self {
            windows: HashMap::new(),
            popovers: HashMap::new(),
            next_window_id: 1,
            next_popover_id: 1,
        }
    }

    pub fn next_window_id(&mut self) -> WindowId {
        let id = WindowId(self.next_window_id);
        self.next_window_id += 1;
        id
    }

    pub fn next_popover_id(&mut self) -> PopoverId {
        let id = PopoverId(self.next_popover_id);
        self.next_popover_id += 1;
        id
    }

    pub fn get_window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    pub fn get_window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(&id)
    }

    pub fn get_popover(&self, id: PopoverId) -> Option<&PopoverSlot> {
        self.popovers.get(&id)
    }

    pub fn get_popover_mut(&mut self, id: PopoverId) -> Option<&mut PopoverSlot> {
        self.popovers.get_mut(&id)
    }

    pub fn find_window_by_surface(&self, surface: &wl_surface::WlSurface) -> Option<WindowId> {
        self.windows
            .iter()
            .find(|(_, w)| w.surface() == surface)
            .map(|(id, _)| *id)
    }

    pub fn find_popover_by_surface(&self, surface: &wl_surface::WlSurface) -> Option<PopoverId> {
        self.popovers
            .iter()
            .find(|(_, p)| p.native.surface() == Some(surface))
            .map(|(id, _)| *id)
    }

    pub fn popovers_of(&self, parent: WindowId) -> Vec<PopoverId> {
        self.popovers
            .iter()
            .filter(|(_, p)| p.popover.parent() == parent)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Point;

    use super::*;
    use crate::backend::DisplayCapabilities;
    use crate::input::{Key, KeyState, Modifiers};
    use crate::popover::{ArrowSide, PopoverStyle};
    use crate::widget::{Constraints, LayoutContext, Rect, RenderContext, Widget, WidgetId};

    struct Parent;

    impl WindowFrame for Parent {
        fn window_id(&self) -> WindowId {
            WindowId(1)
        }

        fn is_alive(&self) -> bool {
            true
        }
    }

    struct Alpha;

    impl DisplayCapabilities for Alpha {
        fn supports_alpha(&self) -> bool {
            true
        }
    }

    struct Blank;

    impl Widget for Blank {
        fn id(&self) -> WidgetId {
            WidgetId(0)
        }

        fn layout(&mut self, _constraints: Constraints, _ctx: &mut LayoutContext) -> Size {
            Size::new(10, 10)
        }

        fn render(&self, _bounds: Rect, _ctx: &mut RenderContext) {}
    }

    fn open_slot() -> PopoverSlot {
        let popover = Popover::new(
            PopoverId(1),
            &Parent,
            Box::new(Blank),
            ArrowSide::Top,
            PopoverStyle::default(),
            &Alpha,
        )
        .unwrap();
        let mut slot = PopoverSlot {
            popover,
            native: NativePopover {
                width: 60,
                height: 40,
                ..Default::default()
            },
        };
        assert!(slot.popover.run(&mut slot.native, Point::new(100.0, 50.0)));
        slot
    }

    fn pressed(key: Key) -> KeyEvent {
        KeyEvent {
            key,
            text: None,
            modifiers: Modifiers::default(),
            state: KeyState::Pressed,
        }
    }

    #[test]
    fn test_native_popover_records_requests() {
        let mut native = NativePopover {
            width: 60,
            height: 40,
            ..Default::default()
        };

        native.show();
        native.grab_focus();
        native.move_to(70, 50);

        assert!(native.visible);
        assert!(native.wants_grab);
        assert_eq!((native.x, native.y), (70, 50));
        // No protocol object yet, so the position is applied on creation.
        assert!(!native.needs_reposition);
        assert_eq!(native.size(), Size::new(60, 40));
    }

    #[test]
    fn test_native_popover_hide_clears_requests() {
        let mut native = NativePopover::default();
        native.show();
        native.grab_focus();
        native.dirty = true;

        native.hide();

        assert!(!native.visible);
        assert!(!native.wants_grab);
        assert!(!native.dirty);
        assert!(native.surface().is_none());
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut manager = WindowManager::new();
        assert_eq!(manager.next_window_id(), WindowId(1));
        assert_eq!(manager.next_window_id(), WindowId(2));
        assert_eq!(manager.next_popover_id(), PopoverId(1));
    }

    #[test]
    fn test_escape_through_slot_releases_focus() {
        let mut slot = open_slot();

        assert!(slot.handle_key(&pressed(Key::Enter)));
        assert!(slot.popover.is_open());

        assert!(!slot.handle_key(&pressed(Key::Escape)));
        assert!(!slot.popover.is_open());
        assert!(!slot.native.visible);
        assert!(!slot.native.dirty);
    }

    #[test]
    fn test_key_on_closed_slot_reports_no_focus() {
        let mut slot = open_slot();
        slot.popover.close(&mut slot.native);

        assert!(!slot.handle_key(&pressed(Key::Escape)));
    }
}
