use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState},
    output::{OutputHandler, OutputState},
    reexports::client::{
        Connection, EventQueue, Proxy, QueueHandle,
        globals::registry_queue_init,
        protocol::{wl_keyboard, wl_output, wl_pointer, wl_seat, wl_shm, wl_surface},
    },
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    seat::{
        SeatHandler, SeatState,
        keyboard::{KeyEvent as SctkKeyEvent, KeyboardHandler, Keysym, Modifiers},
        pointer::{
            PointerEvent as SctkPointerEvent, PointerEventKind as SctkPointerEventKind,
            PointerHandler,
        },
    },
    shell::{
        WaylandSurface,
        xdg::{
            XdgPositioner, XdgShell, XdgSurface,
            popup::{Popup as XdgPopup, PopupConfigure, PopupHandler},
            window::{Window as XdgWindow, WindowConfigure, WindowDecorations, WindowHandler},
        },
    },
    shm::{Shm, ShmHandler, slot::SlotPool},
};
use kurbo::Point;
use wayland_protocols::xdg::shell::client::xdg_positioner::{
    Anchor, ConstraintAdjustment, Gravity,
};

use crate::backend::{DisplayCapabilities, PopoverSurface};
use crate::error::Error;
use crate::input::{
    Key, KeyEvent, KeyState, Modifiers as InputModifiers, PointerButton, PointerEvent,
    PointerEventKind,
};
use crate::popover::{ArrowSide, Popover, PopoverId, PopoverStyle};
use crate::render::{Canvas, Rgba};
use crate::text::TextRenderer;
use crate::widget::{Constraints, LayoutContext, Rect, RenderContext, Size, Widget};
use crate::window::{NativePopover, PopoverSlot, Window, WindowId, WindowManager};

/// Alpha support as advertised by the compositor's `wl_shm` formats.
struct ShmCapabilities {
    argb: bool,
}

impl ShmCapabilities {
    fn query(shm: &Shm) -> Self {
        Self {
            argb: shm.formats().contains(&wl_shm::Format::Argb8888),
        }
    }
}

impl DisplayCapabilities for ShmCapabilities {
    fn supports_alpha(&self) -> bool {
        self.argb
    }
}

pub struct App {
    pub running: bool,
    conn: Connection,
    registry_state: RegistryState,
    seat_state: SeatState,
    output_state: OutputState,
    compositor_state: CompositorState,
    xdg_shell: XdgShell,
    shm: Shm,
    pool: Option<SlotPool>,
    text: TextRenderer,
    pub windows: WindowManager,
    keyboard_focus: Option<WindowId>,
    popover_focus: Option<PopoverId>,
    pointer_focus: Option<WindowId>,
    last_serial: u32,
    seat: Option<wl_seat::WlSeat>,
    key_events: Vec<KeyEvent>,
    current_modifiers: InputModifiers,
    // Key repeat state
    repeat_key: Option<KeyEvent>,
    repeat_start: Option<std::time::Instant>,
    last_repeat: Option<std::time::Instant>,
    repeat_delay_ms: u32,
    repeat_rate_ms: u32,
    // Pointer state
    pointer_events: Vec<PointerEvent>,
    pointer_x: f64,
    pointer_y: f64,
    reposition_token: u32,
}

impl App {
    pub fn new() -> Result<(Self, EventQueue<Self>), Box<dyn std::error::Error>> {
        let conn = Connection::connect_to_env()?;
        let (globals, event_queue) = registry_queue_init(&conn)?;
        let qh = event_queue.handle();

        let registry_state = RegistryState::new(&globals);
        let seat_state = SeatState::new(&globals, &qh);
        let output_state = OutputState::new(&globals, &qh);
        let compositor_state = CompositorState::bind(&globals, &qh)?;
        let xdg_shell = XdgShell::bind(&globals, &qh)?;
        let shm = Shm::bind(&globals, &qh)?;

        let pool = SlotPool::new(1920 * 1080 * 4, &shm)?;

        Ok((
            Self {
                running: true,
                conn,
                registry_state,
                seat_state,
                output_state,
                compositor_state,
                xdg_shell,
                shm,
                pool: Some(pool),
                text: TextRenderer::new(),
                windows: WindowManager::new(),
                keyboard_focus: None,
                popover_focus: None,
                pointer_focus: None,
                last_serial: 0,
                seat: None,
                key_events: Vec::new(),
                current_modifiers: InputModifiers::default(),
                repeat_key: None,
                repeat_start: None,
                last_repeat: None,
                repeat_delay_ms: 400, // Typical default: 400ms delay
                repeat_rate_ms: 33,   // ~30 repeats per second
                pointer_events: Vec::new(),
                pointer_x: 0.0,
                pointer_y: 0.0,
                reposition_token: 0,
            },
            event_queue,
        ))
    }

    pub fn create_window(
        &mut self,
        qh: &QueueHandle<Self>,
        title: &str,
        width: u32,
        height: u32,
    ) -> WindowId {
        let surface = self.compositor_state.create_surface(qh);
        let xdg = self
            .xdg_shell
            .create_window(surface, WindowDecorations::ServerDefault, qh);
        xdg.set_title(title.to_string());
        xdg.set_min_size(Some((100, 100)));
        xdg.commit();

        let id = self.windows.next_window_id();
        self.windows.windows.insert(
            id,
            Window {
                id,
                xdg,
                width,
                height,
                dirty: true,
            },
        );

        id
    }

    /// Destroys a window. Popovers it owns are closed and dropped with it.
    pub fn close_window(&mut self, window_id: WindowId) {
        for id in self.windows.popovers_of(window_id) {
            if let Some(mut slot) = self.windows.popovers.remove(&id) {
                slot.popover.parent_destroyed(&mut slot.native);
            }
            if self.popover_focus == Some(id) {
                self.popover_focus = None;
            }
        }

        self.windows.windows.remove(&window_id);
        if self.keyboard_focus == Some(window_id) {
            self.keyboard_focus = None;
        }
        if self.pointer_focus == Some(window_id) {
            self.pointer_focus = None;
        }
    }

    /// Creates a closed popover owned by `parent`, embedding `content`.
    pub fn create_popover(
        &mut self,
        parent: WindowId,
        content: impl Widget + 'static,
        side: ArrowSide,
        style: PopoverStyle,
    ) -> Result<PopoverId, Error> {
        let caps = ShmCapabilities::query(&self.shm);
        let id = self.windows.next_popover_id();
        let window = self
            .windows
            .get_window(parent)
            .ok_or(Error::WindowNotFound(parent))?;
        let popover = Popover::new(id, window, Box::new(content), side, style, &caps)?;

        self.windows.popovers.insert(
            id,
            PopoverSlot {
                popover,
                native: NativePopover::default(),
            },
        );
        Ok(id)
    }

    /// Opens the popover hanging below `anchor`, in parent window coordinates.
    ///
    /// Returns `Ok(false)` if the popover was already open.
    pub fn run_popover(
        &mut self,
        qh: &QueueHandle<Self>,
        id: PopoverId,
        anchor: Point,
    ) -> Result<bool, Error> {
        let slot = self
            .windows
            .popovers
            .get(&id)
            .ok_or(Error::PopoverNotFound(id))?;
        let parent = slot.popover.parent();
        let window = self
            .windows
            .get_window(parent)
            .ok_or(Error::ParentDestroyed(parent))?;
        let max = Size::new(window.width, window.height);

        let Some(slot) = self.windows.popovers.get_mut(&id) else {
            return Err(Error::PopoverNotFound(id));
        };
        if !slot.popover.is_open() {
            let mut ctx = LayoutContext {
                text: &mut self.text,
            };
            let size = slot.popover.natural_size(max, &mut ctx);
            slot.native.width = size.width;
            slot.native.height = size.height;
        }
        if !slot.popover.run(&mut slot.native, anchor) {
            return Ok(false);
        }

        self.sync_popover(qh, id)?;
        Ok(true)
    }

    pub fn close_popover(&mut self, id: PopoverId) -> Result<(), Error> {
        let slot = self
            .windows
            .get_popover_mut(id)
            .ok_or(Error::PopoverNotFound(id))?;
        slot.popover.close(&mut slot.native);
        if self.popover_focus == Some(id) {
            self.popover_focus = None;
        }
        Ok(())
    }

    /// Closes the popover if needed and forgets it.
    pub fn destroy_popover(&mut self, id: PopoverId) -> Result<(), Error> {
        self.close_popover(id)?;
        self.windows.popovers.remove(&id);
        Ok(())
    }

    pub fn popover(&self, id: PopoverId) -> Option<&Popover> {
        self.windows.get_popover(id).map(|slot| &slot.popover)
    }

    pub fn popover_mut(&mut self, id: PopoverId) -> Option<&mut Popover> {
        self.windows.get_popover_mut(id).map(|slot| &mut slot.popover)
    }

    pub fn is_popover_dirty(&self, id: PopoverId) -> bool {
        self.windows
            .get_popover(id)
            .map(|slot| slot.native.visible && slot.native.dirty)
            .unwrap_or(false)
    }

    pub fn mark_popover_dirty(&mut self, id: PopoverId) {
        if let Some(slot) = self.windows.get_popover_mut(id) {
            slot.native.dirty = true;
        }
    }

    fn positioner(&self, native: &NativePopover) -> Result<XdgPositioner, Error> {
        let positioner = XdgPositioner::new(&self.xdg_shell)?;
        positioner.set_size(native.width.max(1) as i32, native.height.max(1) as i32);
        // A 1x1 anchor at the computed origin, growing right and down from it.
        positioner.set_anchor_rect(native.x, native.y, 1, 1);
        positioner.set_anchor(Anchor::TopLeft);
        positioner.set_gravity(Gravity::BottomRight);
        positioner
            .set_constraint_adjustment(ConstraintAdjustment::SlideX | ConstraintAdjustment::FlipY);
        Ok(positioner)
    }

    /// Applies what the popover requested through its surface: creates the
    /// `xdg_popup` when shown, grabs input, and repositions it.
    fn sync_popover(&mut self, qh: &QueueHandle<Self>, id: PopoverId) -> Result<(), Error> {
        let slot = self
            .windows
            .get_popover(id)
            .ok_or(Error::PopoverNotFound(id))?;
        if !slot.native.visible {
            return Ok(());
        }

        if slot.native.xdg.is_none() {
            let hints = slot.popover.hints();
            let unsupported = hints.unsupported_by_popup();
            if !unsupported.is_empty() {
                log::warn!("popover {:?}: xdg_popup ignores hints {:?}", id, unsupported);
            }
            let parent = hints.transient_for.unwrap_or(slot.popover.parent());
            let window = self
                .windows
                .get_window(parent)
                .ok_or(Error::ParentDestroyed(parent))?;
            let positioner = self.positioner(&slot.native)?;
            let surface = self.compositor_state.create_surface(qh);
            let popup = XdgPopup::from_surface(
                Some(window.xdg.xdg_surface()),
                &positioner,
                qh,
                surface,
                &self.xdg_shell,
            )?;

            if slot.native.wants_grab {
                match &self.seat {
                    Some(seat) => popup.xdg_popup().grab(seat, self.last_serial),
                    None => log::warn!("popover {:?}: no seat to grab input with", id),
                }
            }
            popup.wl_surface().commit();

            let Some(slot) = self.windows.get_popover_mut(id) else {
                return Ok(());
            };
            slot.native.xdg = Some(popup);
            slot.native.wants_grab = false;
            slot.native.needs_reposition = false;
            // Wait for configure before drawing
            slot.native.dirty = false;
            return Ok(());
        }

        if slot.native.needs_reposition {
            let positioner = self.positioner(&slot.native)?;
            self.reposition_token = self.reposition_token.wrapping_add(1);
            let token = self.reposition_token;

            let Some(slot) = self.windows.get_popover_mut(id) else {
                return Ok(());
            };
            slot.native.needs_reposition = false;
            if let Some(popup) = &slot.native.xdg {
                if popup.xdg_popup().version() >= 3 {
                    popup.xdg_popup().reposition(&positioner, token);
                } else {
                    log::warn!("popover {:?}: compositor cannot reposition popups", id);
                }
            }
        }
        Ok(())
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Drain and return all pending key events (including repeat events)
    pub fn poll_key_events(&mut self) -> Vec<KeyEvent> {
        // Generate repeat events if a key is held
        if let (Some(key), Some(start)) = (&self.repeat_key, self.repeat_start) {
            let now = std::time::Instant::now();
            let elapsed = now.duration_since(start);
            let delay = std::time::Duration::from_millis(self.repeat_delay_ms as u64);

            if elapsed >= delay {
                let rate = std::time::Duration::from_millis(self.repeat_rate_ms as u64);
                let should_repeat = match self.last_repeat {
                    None => true,
                    Some(last) => now.duration_since(last) >= rate,
                };

                if should_repeat {
                    self.last_repeat = Some(now);
                    let mut repeat_event = key.clone();
                    repeat_event.state = KeyState::Pressed;
                    self.key_events.push(repeat_event);
                }
            }
        }

        std::mem::take(&mut self.key_events)
    }

    /// Pointer events on windows. Events on popovers go to the popover.
    pub fn poll_pointer_events(&mut self) -> Vec<PointerEvent> {
        std::mem::take(&mut self.pointer_events)
    }

    pub fn render_window<F>(&mut self, window_id: WindowId, draw: F)
    where
        F: FnOnce(&mut Canvas),
    {
        let Some(window) = self.windows.get_window_mut(window_id) else {
            return;
        };

        let width = window.width;
        let height = window.height;
        let surface = window.surface().clone();
        window.dirty = false;

        let Some(pool) = self.pool.as_mut() else {
            return;
        };
        present(pool, &surface, width, height, wl_shm::Format::Argb8888, draw);
    }

    /// Lays out `root` to the window size and draws it over `background`.
    pub fn render_widget(&mut self, window_id: WindowId, root: &mut dyn Widget, background: Rgba) {
        let Some(window) = self.windows.get_window_mut(window_id) else {
            return;
        };

        let width = window.width;
        let height = window.height;
        let surface = window.surface().clone();
        window.dirty = false;

        let text = &mut self.text;
        let mut layout_ctx = LayoutContext { text: &mut *text };
        let size = root.layout(Constraints::loose(width, height), &mut layout_ctx);

        let Some(pool) = self.pool.as_mut() else {
            return;
        };
        present(pool, &surface, width, height, wl_shm::Format::Argb8888, |canvas| {
            canvas.clear(background.to_color());
            let mut ctx = RenderContext { canvas, text };
            root.render(Rect::new(0, 0, size.width, size.height), &mut ctx);
        });
    }

    pub fn render_popover(&mut self, id: PopoverId) {
        let Some(slot) = self.windows.popovers.get_mut(&id) else {
            return;
        };
        let Some(surface) = slot.native.surface().cloned() else {
            return;
        };
        let width = slot.native.width;
        let height = slot.native.height;
        slot.native.dirty = false;

        let format = if slot.popover.supports_alpha() {
            wl_shm::Format::Argb8888
        } else {
            wl_shm::Format::Xrgb8888
        };

        let popover = &slot.popover;
        let text = &mut self.text;
        let Some(pool) = self.pool.as_mut() else {
            return;
        };
        present(pool, &surface, width, height, format, |canvas| {
            popover.render(canvas, text)
        });
    }

    pub fn is_window_dirty(&self, window_id: WindowId) -> bool {
        self.windows
            .get_window(window_id)
            .map(|w| w.dirty)
            .unwrap_or(false)
    }

    pub fn mark_window_dirty(&mut self, window_id: WindowId) {
        if let Some(window) = self.windows.get_window_mut(window_id) {
            window.mark_dirty();
        }
    }

    pub fn window_size(&self, window_id: WindowId) -> Option<(u32, u32)> {
        self.windows
            .get_window(window_id)
            .map(|w| (w.width, w.height))
    }

    pub fn flush(&self) {
        if let Err(err) = self.conn.flush() {
            log::error!("failed to flush wayland connection: {err}");
        }
    }

    fn popover_lost_focus(&mut self, id: PopoverId) {
        if let Some(slot) = self.windows.get_popover_mut(id) {
            slot.popover.focus_out(&mut slot.native);
        }
        if self.popover_focus == Some(id) {
            self.popover_focus = None;
        }
    }
}

/// Draws into a fresh shm buffer and commits it to `surface`.
fn present<F>(
    pool: &mut SlotPool,
    surface: &wl_surface::WlSurface,
    width: u32,
    height: u32,
    format: wl_shm::Format,
    draw: F,
) where
    F: FnOnce(&mut Canvas),
{
    if width == 0 || height == 0 {
        return;
    }

    let stride = width * 4;
    let buffer_size = (stride * height) as usize;

    if pool.len() < buffer_size
        && let Err(err) = pool.resize(buffer_size)
    {
        log::error!("failed to grow shm pool to {buffer_size} bytes: {err}");
        return;
    }

    let (buffer, canvas_data) =
        match pool.create_buffer(width as i32, height as i32, stride as i32, format) {
            Ok((buf, data)) => (buf, data),
            Err(err) => {
                log::error!("failed to create {width}x{height} buffer: {err}");
                return;
            }
        };

    {
        let mut canvas = Canvas::new(canvas_data, width, height);
        draw(&mut canvas);
        canvas.finalize_for_wayland();
    }

    surface.attach(Some(buffer.wl_buffer()), 0, 0);
    surface.damage_buffer(0, 0, width as i32, height as i32);
    surface.commit();
}

fn translate_pointer(event: &SctkPointerEvent) -> Option<PointerEvent> {
    let (x, y) = event.position;
    let kind = match &event.kind {
        SctkPointerEventKind::Enter { .. } => PointerEventKind::Enter,
        SctkPointerEventKind::Leave { .. } => PointerEventKind::Leave,
        SctkPointerEventKind::Motion { .. } => PointerEventKind::Motion,
        SctkPointerEventKind::Press { button, .. } => {
            PointerEventKind::Press(PointerButton::from_code(*button))
        }
        SctkPointerEventKind::Release { button, .. } => {
            PointerEventKind::Release(PointerButton::from_code(*button))
        }
        SctkPointerEventKind::Axis { .. } => return None,
    };
    Some(PointerEvent { kind, x, y })
}

// Implement required sctk traits

impl CompositorHandler for App {
    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_factor: i32,
    ) {
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {
    }

    fn frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _time: u32,
    ) {
    }

    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
        let Some(id) = self.windows.find_popover_by_surface(surface) else {
            return;
        };
        let caps = ShmCapabilities::query(&self.shm);
        if let Some(slot) = self.windows.get_popover_mut(id) {
            slot.popover.screen_changed(&caps);
            slot.native.dirty = true;
        }
    }

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }
}

impl OutputHandler for App {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }

    fn new_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
    }

    fn update_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
    }

    fn output_destroyed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
    }
}

impl WindowHandler for App {
    fn request_close(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, window: &XdgWindow) {
        if let Some(id) = self.windows.find_window_by_surface(window.wl_surface()) {
            self.close_window(id);
            if self.windows.windows.is_empty() {
                self.quit();
            }
        }
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        window: &XdgWindow,
        configure: WindowConfigure,
        _serial: u32,
    ) {
        if let Some(id) = self.windows.find_window_by_surface(window.wl_surface())
            && let Some(w) = self.windows.get_window_mut(id)
        {
            let (width, height) = configure.new_size;
            if let (Some(width), Some(height)) = (width, height) {
                w.width = width.get();
                w.height = height.get();
            }
            w.dirty = true;
        }
    }
}

impl PopupHandler for App {
    fn configure(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        popup: &XdgPopup,
        configure: PopupConfigure,
    ) {
        let Some(id) = self.windows.find_popover_by_surface(popup.wl_surface()) else {
            return;
        };
        let Some(slot) = self.windows.get_popover_mut(id) else {
            return;
        };

        let size = Size::new(configure.width.max(0) as u32, configure.height.max(0) as u32);
        if size.width > 0 && size.height > 0 && size != slot.native.size() {
            slot.native.width = size.width;
            slot.native.height = size.height;
            slot.popover.size_allocated(&mut slot.native, size);
        }
        slot.native.dirty = true;

        if let Err(err) = self.sync_popover(qh, id) {
            log::error!("failed to reposition popover {:?}: {err}", id);
        }
    }

    fn done(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, popup: &XdgPopup) {
        log::debug!("compositor dismissed popup");
        if let Some(id) = self.windows.find_popover_by_surface(popup.wl_surface()) {
            self.popover_lost_focus(id);
        }
    }
}

impl SeatHandler for App {
    fn seat_state(&mut self) -> &mut SeatState {
        &mut self.seat_state
    }

    fn new_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {}

    fn new_capability(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        seat: wl_seat::WlSeat,
        capability: smithay_client_toolkit::seat::Capability,
    ) {
        use smithay_client_toolkit::seat::Capability;

        if self.seat.is_none() {
            self.seat = Some(seat.clone());
        }

        if capability == Capability::Keyboard
            && let Err(err) = self.seat_state.get_keyboard(qh, &seat, None)
        {
            log::error!("failed to get keyboard: {err}");
        }

        if capability == Capability::Pointer
            && let Err(err) = self.seat_state.get_pointer(qh, &seat)
        {
            log::error!("failed to get pointer: {err}");
        }
    }

    fn remove_capability(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _seat: wl_seat::WlSeat,
        _capability: smithay_client_toolkit::seat::Capability,
    ) {
    }

    fn remove_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, seat: wl_seat::WlSeat) {
        if self.seat.as_ref() == Some(&seat) {
            self.seat = None;
        }
    }
}

impl KeyboardHandler for App {
    fn enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        surface: &wl_surface::WlSurface,
        _serial: u32,
        _raw: &[u32],
        _keysyms: &[Keysym],
    ) {
        self.popover_focus = self.windows.find_popover_by_surface(surface);
        self.keyboard_focus = match self.popover_focus {
            Some(_) => None,
            None => self.windows.find_window_by_surface(surface),
        };
    }

    fn leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        surface: &wl_surface::WlSurface,
        _serial: u32,
    ) {
        self.keyboard_focus = None;
        if let Some(id) = self.windows.find_popover_by_surface(surface) {
            self.popover_lost_focus(id);
        }
        self.popover_focus = None;
        self.repeat_key = None;
        self.repeat_start = None;
        self.last_repeat = None;
    }

    fn press_key(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        serial: u32,
        event: SctkKeyEvent,
    ) {
        self.last_serial = serial;
        let key_event = KeyEvent {
            key: Key::from_keysym(event.keysym.raw()),
            text: event.utf8.clone(),
            modifiers: self.current_modifiers,
            state: KeyState::Pressed,
        };

        if let Some(id) = self.popover_focus {
            let focused = self
                .windows
                .get_popover_mut(id)
                .is_some_and(|slot| slot.handle_key(&key_event));
            if !focused {
                self.popover_focus = None;
            }
            return;
        }

        self.key_events.push(key_event.clone());

        // Start tracking for key repeat (only for non-modifier keys)
        if !key_event.key.is_modifier() {
            self.repeat_key = Some(key_event);
            self.repeat_start = Some(std::time::Instant::now());
            self.last_repeat = None;
        }
    }

    fn release_key(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        event: SctkKeyEvent,
    ) {
        let key_event = KeyEvent {
            key: Key::from_keysym(event.keysym.raw()),
            text: event.utf8.clone(),
            modifiers: self.current_modifiers,
            state: KeyState::Released,
        };

        if let Some(ref repeat_key) = self.repeat_key
            && repeat_key.key == key_event.key
        {
            self.repeat_key = None;
            self.repeat_start = None;
            self.last_repeat = None;
        }

        if let Some(id) = self.popover_focus {
            let focused = self
                .windows
                .get_popover_mut(id)
                .is_some_and(|slot| slot.handle_key(&key_event));
            if !focused {
                self.popover_focus = None;
            }
            return;
        }

        self.key_events.push(key_event);
    }

    fn update_modifiers(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        modifiers: Modifiers,
        _layout: u32,
    ) {
        self.current_modifiers = InputModifiers {
            shift: modifiers.shift,
            ctrl: modifiers.ctrl,
            alt: modifiers.alt,
            super_: modifiers.logo,
        };
    }
}

impl PointerHandler for App {
    fn pointer_frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _pointer: &wl_pointer::WlPointer,
        events: &[SctkPointerEvent],
    ) {
        for event in events {
            if let SctkPointerEventKind::Press { serial, .. } = &event.kind {
                self.last_serial = *serial;
            }
            let Some(pointer_event) = translate_pointer(event) else {
                continue;
            };

            if let Some(id) = self.windows.find_popover_by_surface(&event.surface) {
                if let Some(slot) = self.windows.get_popover_mut(id) {
                    let size = slot.native.size();
                    if slot.popover.handle_pointer(&pointer_event, size) {
                        slot.native.dirty = true;
                    }
                }
                continue;
            }

            match pointer_event.kind {
                PointerEventKind::Enter => {
                    self.pointer_focus = self.windows.find_window_by_surface(&event.surface);
                    self.pointer_x = pointer_event.x;
                    self.pointer_y = pointer_event.y;
                }
                PointerEventKind::Leave => {
                    self.pointer_focus = None;
                }
                PointerEventKind::Motion => {
                    self.pointer_x = pointer_event.x;
                    self.pointer_y = pointer_event.y;
                }
                PointerEventKind::Press(_) | PointerEventKind::Release(_) => {}
            }

            // Leave and button events carry the last known position
            let (x, y) = match pointer_event.kind {
                PointerEventKind::Enter | PointerEventKind::Motion => {
                    (pointer_event.x, pointer_event.y)
                }
                _ => (self.pointer_x, self.pointer_y),
            };
            self.pointer_events.push(PointerEvent {
                kind: pointer_event.kind,
                x,
                y,
            });
        }
    }
}

impl ShmHandler for App {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm
    }
}

impl ProvidesRegistryState for App {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }
    registry_handlers![OutputState, SeatState];
}

smithay_client_toolkit::delegate_compositor!(App);
smithay_client_toolkit::delegate_output!(App);
smithay_client_toolkit::delegate_shm!(App);
smithay_client_toolkit::delegate_seat!(App);
smithay_client_toolkit::delegate_keyboard!(App);
smithay_client_toolkit::delegate_pointer!(App);
smithay_client_toolkit::delegate_xdg_shell!(App);
smithay_client_toolkit::delegate_xdg_window!(App);
smithay_client_toolkit::delegate_xdg_popup!(App);
smithay_client_toolkit::delegate_registry!(App);
