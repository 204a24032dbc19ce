//! A palette-based color picker.

use crate::event::{Event, SubscriptionId};
use crate::input::{Key, KeyEvent, KeyState, PointerButton, PointerEvent, PointerEventKind};
use crate::render::Rgba;
use crate::widget::{Constraints, LayoutContext, Rect, RenderContext, Size, Widget, WidgetId};

const HUE_COLUMNS: usize = 12;
const LIGHTNESS_ROWS: [f64; 5] = [0.85, 0.7, 0.5, 0.35, 0.2];
const CELL_SIZE: u32 = 18;
const PREVIEW_HEIGHT: u32 = 24;
const PREVIEW_SPACING: u32 = 6;

/// Palette laid out row-major: one row per lightness step followed by a gray ramp.
fn build_palette() -> Vec<Rgba> {
    let mut palette = Vec::with_capacity(HUE_COLUMNS * (LIGHTNESS_ROWS.len() + 1));
    for lightness in LIGHTNESS_ROWS {
        for column in 0..HUE_COLUMNS {
            let hue = column as f64 * 360.0 / HUE_COLUMNS as f64;
            palette.push(Rgba::from_hsl(hue, 1.0, lightness));
        }
    }
    for column in 0..HUE_COLUMNS {
        let level = 1.0 - column as f64 / (HUE_COLUMNS - 1) as f64;
        palette.push(Rgba::from_hsl(0.0, 0.0, level));
    }
    palette
}

pub struct ColorSelector {
    id: WidgetId,
    color: Rgba,
    palette: Vec<Rgba>,
    selected: Option<usize>,
    color_changed: Event<ColorSelector>,
}

impl ColorSelector {
    pub fn new(id: WidgetId) -> Self {
        let palette = build_palette();
        let color = Rgba::WHITE;
        let selected = palette.iter().position(|c| *c == color);
        Self {
            id,
            color,
            palette,
            selected,
            color_changed: Event::new(),
        }
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    /// Sets the current color. Listeners are notified only if the value changes.
    pub fn set_color(&mut self, color: Rgba) {
        if self.color == color {
            return;
        }
        self.color = color;
        self.selected = self.palette.iter().position(|c| *c == color);
        log::debug!("color selector {:?} changed to {}", self.id, color);

        // Handlers borrow the selector, so the event is detached while it fires.
        let mut event = std::mem::take(&mut self.color_changed);
        event.emit(self);
        self.color_changed = event;
    }

    /// Registers a listener called after every color change.
    pub fn on_color_changed(
        &mut self,
        handler: impl FnMut(&ColorSelector) + 'static,
    ) -> SubscriptionId {
        self.color_changed.subscribe(handler)
    }

    pub fn remove_listener(&mut self, id: SubscriptionId) -> bool {
        self.color_changed.unsubscribe(id)
    }

    pub fn palette(&self) -> &[Rgba] {
        &self.palette
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    fn rows(&self) -> usize {
        self.palette.len() / HUE_COLUMNS
    }

    fn palette_origin(bounds: Rect) -> (i32, i32) {
        (bounds.x, bounds.y + (PREVIEW_HEIGHT + PREVIEW_SPACING) as i32)
    }

    fn cell_rect(&self, bounds: Rect, index: usize) -> Rect {
        let (x0, y0) = Self::palette_origin(bounds);
        let column = (index % HUE_COLUMNS) as i32;
        let row = (index / HUE_COLUMNS) as i32;
        Rect::new(
            x0 + column * CELL_SIZE as i32,
            y0 + row * CELL_SIZE as i32,
            CELL_SIZE,
            CELL_SIZE,
        )
    }

    /// Palette index under a point, if any.
    pub fn cell_at(&self, bounds: Rect, x: f64, y: f64) -> Option<usize> {
        let (x0, y0) = Self::palette_origin(bounds);
        let dx = x - x0 as f64;
        let dy = y - y0 as f64;
        if dx < 0.0 || dy < 0.0 {
            return None;
        }
        let column = (dx / CELL_SIZE as f64) as usize;
        let row = (dy / CELL_SIZE as f64) as usize;
        if column >= HUE_COLUMNS || row >= self.rows() {
            return None;
        }
        Some(row * HUE_COLUMNS + column)
    }

    fn move_selection(&mut self, dx: i32, dy: i32) {
        let current = self.selected.unwrap_or(0);
        let columns = HUE_COLUMNS as i32;
        let rows = self.rows() as i32;
        let column = (current as i32 % columns + dx).rem_euclid(columns);
        let row = (current as i32 / columns + dy).clamp(0, rows - 1);
        let index = (row * columns + column) as usize;
        if let Some(color) = self.palette.get(index).copied() {
            self.set_color(color);
        }
    }
}

impl Widget for ColorSelector {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn layout(&mut self, constraints: Constraints, _ctx: &mut LayoutContext) -> Size {
        let width = HUE_COLUMNS as u32 * CELL_SIZE;
        let height = PREVIEW_HEIGHT + PREVIEW_SPACING + self.rows() as u32 * CELL_SIZE;
        Size {
            width: width.clamp(constraints.min_width, constraints.max_width),
            height: height.clamp(constraints.min_height, constraints.max_height),
        }
    }

    fn render(&self, bounds: Rect, ctx: &mut RenderContext) {
        ctx.canvas.fill_rect(
            bounds.x as f32,
            bounds.y as f32,
            (HUE_COLUMNS as u32 * CELL_SIZE) as f32,
            PREVIEW_HEIGHT as f32,
            self.color.to_color(),
        );

        for (index, color) in self.palette.iter().enumerate() {
            let cell = self.cell_rect(bounds, index);
            ctx.canvas.fill_rect(
                cell.x as f32,
                cell.y as f32,
                cell.width as f32,
                cell.height as f32,
                color.to_color(),
            );
        }

        if let Some(index) = self.selected {
            let cell = self.cell_rect(bounds, index);
            ctx.canvas.stroke_rect(
                cell.x as f32 + 1.0,
                cell.y as f32 + 1.0,
                cell.width as f32 - 2.0,
                cell.height as f32 - 2.0,
                2.0,
                Rgba::BLACK.to_color(),
            );
        }
    }

    fn handle_key(&mut self, event: &KeyEvent) -> bool {
        if event.state != KeyState::Pressed {
            return false;
        }
        match event.key {
            Key::Left => self.move_selection(-1, 0),
            Key::Right => self.move_selection(1, 0),
            Key::Up => self.move_selection(0, -1),
            Key::Down => self.move_selection(0, 1),
            _ => return false,
        }
        true
    }

    fn handle_pointer(&mut self, event: &PointerEvent, bounds: Rect) -> bool {
        if event.kind != PointerEventKind::Press(PointerButton::Left) {
            return false;
        }
        let Some(index) = self.cell_at(bounds, event.x, event.y) else {
            return false;
        };
        let color = self.palette[index];
        self.set_color(color);
        true
    }

    fn is_focusable(&self) -> bool {
        true
    }
}
