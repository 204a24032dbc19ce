use std::cell::RefCell;
use std::rc::Rc;

use crate::input::{KeyEvent, PointerEvent};
use crate::render::{Canvas, Rgba};
use crate::text::TextRenderer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WidgetId(pub u64);

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x
            && px < self.x + self.width as i32
            && py >= self.y
            && py < self.y + self.height as i32
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Constraints {
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
}

impl Constraints {
    pub fn tight(width: u32, height: u32) -> Self {
        Self {
            min_width: width,
            max_width: width,
            min_height: height,
            max_height: height,
        }
    }

    pub fn loose(max_width: u32, max_height: u32) -> Self {
        Self {
            min_width: 0,
            max_width,
            min_height: 0,
            max_height,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

pub struct LayoutContext<'a> {
    pub text: &'a mut TextRenderer,
}

pub struct RenderContext<'a, 'b> {
    pub canvas: &'a mut Canvas<'b>,
    pub text: &'a mut TextRenderer,
}

pub trait Widget {
    fn id(&self) -> WidgetId;

    fn layout(&mut self, constraints: Constraints, ctx: &mut LayoutContext) -> Size;

    fn render(&self, bounds: Rect, ctx: &mut RenderContext);

    fn handle_key(&mut self, _event: &KeyEvent) -> bool {
        false
    }

    fn handle_pointer(&mut self, _event: &PointerEvent, _bounds: Rect) -> bool {
        false
    }

    fn is_focusable(&self) -> bool {
        false
    }
}

// Lets a widget sit in a container while its owner keeps a handle to update it.
impl<W: Widget> Widget for Rc<RefCell<W>> {
    fn id(&self) -> WidgetId {
        self.borrow().id()
    }

    fn layout(&mut self, constraints: Constraints, ctx: &mut LayoutContext) -> Size {
        self.borrow_mut().layout(constraints, ctx)
    }

    fn render(&self, bounds: Rect, ctx: &mut RenderContext) {
        self.borrow().render(bounds, ctx);
    }

    fn handle_key(&mut self, event: &KeyEvent) -> bool {
        self.borrow_mut().handle_key(event)
    }

    fn handle_pointer(&mut self, event: &PointerEvent, bounds: Rect) -> bool {
        self.borrow_mut().handle_pointer(event, bounds)
    }

    fn is_focusable(&self) -> bool {
        self.borrow().is_focusable()
    }
}

// Simple container for vertical layout
pub struct VStack {
    id: WidgetId,
    children: Vec<Box<dyn Widget>>,
    spacing: u32,
    cached_sizes: Vec<Size>,
}

impl VStack {
    pub fn new(id: WidgetId) -> Self {
        Self {
            id,
            children: Vec::new(),
            spacing: 0,
            cached_sizes: Vec::new(),
        }
    }

    pub fn spacing(mut self, spacing: u32) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn child(mut self, widget: impl Widget + 'static) -> Self {
        self.children.push(Box::new(widget));
        self
    }

    pub fn add_child(&mut self, widget: impl Widget + 'static) {
        self.children.push(Box::new(widget));
    }
}

impl Widget for VStack {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn layout(&mut self, constraints: Constraints, ctx: &mut LayoutContext) -> Size {
        self.cached_sizes.clear();

        let mut total_height = 0u32;
        let mut max_width = 0u32;

        let child_constraints = Constraints {
            min_width: constraints.min_width,
            max_width: constraints.max_width,
            min_height: 0,
            max_height: constraints.max_height,
        };

        for (i, child) in self.children.iter_mut().enumerate() {
            let size = child.layout(child_constraints, ctx);
            self.cached_sizes.push(size);

            total_height += size.height;
            if i > 0 {
                total_height += self.spacing;
            }
            max_width = max_width.max(size.width);
        }

        Size {
            width: max_width.clamp(constraints.min_width, constraints.max_width),
            height: total_height.clamp(constraints.min_height, constraints.max_height),
        }
    }

    fn render(&self, bounds: Rect, ctx: &mut RenderContext) {
        let mut y = bounds.y;

        for (child, size) in self.children.iter().zip(self.cached_sizes.iter()) {
            let child_bounds = Rect {
                x: bounds.x,
                y,
                width: size.width,
                height: size.height,
            };
            child.render(child_bounds, ctx);
            y += size.height as i32 + self.spacing as i32;
        }
    }

    fn handle_key(&mut self, event: &KeyEvent) -> bool {
        for child in &mut self.children {
            if child.handle_key(event) {
                return true;
            }
        }
        false
    }

    fn handle_pointer(&mut self, event: &PointerEvent, bounds: Rect) -> bool {
        let mut y = bounds.y;

        for (child, size) in self.children.iter_mut().zip(self.cached_sizes.iter()) {
            let child_bounds = Rect {
                x: bounds.x,
                y,
                width: size.width,
                height: size.height,
            };

            if child_bounds.contains(event.x as i32, event.y as i32)
                && child.handle_pointer(event, child_bounds)
            {
                return true;
            }

            y += size.height as i32 + self.spacing as i32;
        }
        false
    }
}

// Simple text label widget
pub struct Label {
    id: WidgetId,
    text: String,
    font_size: f32,
    color: cosmic_text::Color,
    background: Option<Rgba>,
    cached_size: Size,
}

impl Label {
    pub fn new(id: WidgetId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            font_size: 14.0,
            color: cosmic_text::Color::rgb(255, 255, 255),
            background: None,
            cached_size: Size::default(),
        }
    }

    pub fn font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    pub fn color(mut self, color: cosmic_text::Color) -> Self {
        self.color = color;
        self
    }

    pub fn background(mut self, color: Rgba) -> Self {
        self.background = Some(color);
        self
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_background(&mut self, color: Option<Rgba>) {
        self.background = color;
    }

    pub fn background_color(&self) -> Option<Rgba> {
        self.background
    }
}

impl Widget for Label {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn layout(&mut self, constraints: Constraints, ctx: &mut LayoutContext) -> Size {
        let (width, height) = ctx.text.measure_text(&self.text, self.font_size);
        // An empty label still occupies one line so its background shows.
        let height = height.max(self.font_size * 1.2);
        self.cached_size = Size {
            width: (width.ceil() as u32).clamp(constraints.min_width, constraints.max_width),
            height: (height.ceil() as u32).clamp(constraints.min_height, constraints.max_height),
        };
        self.cached_size
    }

    fn render(&self, bounds: Rect, ctx: &mut RenderContext) {
        if let Some(background) = self.background {
            ctx.canvas.fill_rect(
                bounds.x as f32,
                bounds.y as f32,
                bounds.width as f32,
                bounds.height as f32,
                background.to_color(),
            );
        }
        ctx.text.draw_text(
            ctx.canvas,
            &self.text,
            bounds.x,
            bounds.y,
            self.font_size,
            self.color,
        );
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::color_selector::ColorSelector;
    use crate::input::{PointerButton, PointerEventKind};

    struct Fixed {
        id: WidgetId,
        size: Size,
        clicks: Rc<Cell<u32>>,
    }

    impl Fixed {
        fn new(id: u64, width: u32, height: u32) -> Self {
            Self {
                id: WidgetId(id),
                size: Size::new(width, height),
                clicks: Rc::new(Cell::new(0)),
            }
        }
    }

    impl Widget for Fixed {
        fn id(&self) -> WidgetId {
            self.id
        }

        fn layout(&mut self, _constraints: Constraints, _ctx: &mut LayoutContext) -> Size {
            self.size
        }

        fn render(&self, _bounds: Rect, _ctx: &mut RenderContext) {}

        fn handle_pointer(&mut self, _event: &PointerEvent, _bounds: Rect) -> bool {
            self.clicks.set(self.clicks.get() + 1);
            true
        }
    }

    fn click(x: f64, y: f64) -> PointerEvent {
        PointerEvent {
            kind: PointerEventKind::Press(PointerButton::Left),
            x,
            y,
        }
    }

    #[test]
    fn test_rect_contains_is_half_open() {
        let rect = Rect::new(10, 10, 20, 5);
        assert!(rect.contains(10, 10));
        assert!(rect.contains(29, 14));
        assert!(!rect.contains(30, 10));
        assert!(!rect.contains(10, 15));
        assert!(!rect.contains(9, 12));
    }

    #[test]
    fn test_vstack_stacks_children_with_spacing() {
        let mut text = TextRenderer::new();
        let mut ctx = LayoutContext { text: &mut text };
        let mut stack = VStack::new(WidgetId(0))
            .spacing(4)
            .child(Fixed::new(1, 30, 10))
            .child(Fixed::new(2, 50, 20));

        let size = stack.layout(Constraints::loose(200, 200), &mut ctx);
        assert_eq!(size, Size::new(50, 34));
    }

    #[test]
    fn test_vstack_routes_pointer_to_child_under_it() {
        let mut text = TextRenderer::new();
        let mut ctx = LayoutContext { text: &mut text };
        let top = Fixed::new(1, 30, 10);
        let bottom = Fixed::new(2, 30, 10);
        let (top_clicks, bottom_clicks) = (top.clicks.clone(), bottom.clicks.clone());
        let mut stack = VStack::new(WidgetId(0)).spacing(4).child(top).child(bottom);
        stack.layout(Constraints::loose(100, 100), &mut ctx);

        let bounds = Rect::new(0, 0, 100, 100);
        assert!(stack.handle_pointer(&click(5.0, 16.0), bounds));
        // The spacing gap belongs to no child.
        assert!(!stack.handle_pointer(&click(5.0, 12.0), bounds));

        assert_eq!(top_clicks.get(), 0);
        assert_eq!(bottom_clicks.get(), 1);
    }

    #[test]
    fn test_label_setters() {
        let mut label = Label::new(WidgetId(1), "hello");
        assert_eq!(label.text(), "hello");
        assert_eq!(label.background_color(), None);

        label.set_text("world");
        label.set_background(Some(Rgba::RED));
        assert_eq!(label.text(), "world");
        assert_eq!(label.background_color(), Some(Rgba::RED));
    }

    #[test]
    fn test_shared_widget_forwards_to_inner() {
        let inner = Fixed::new(9, 12, 8);
        let clicks = inner.clicks.clone();
        let mut shared = Rc::new(RefCell::new(inner));

        assert_eq!(shared.id(), WidgetId(9));
        assert!(shared.handle_pointer(&click(1.0, 1.0), Rect::new(0, 0, 12, 8)));
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn test_labels_follow_selector_color() {
        let mut selector = ColorSelector::new(WidgetId(1));
        let text_label = Rc::new(RefCell::new(Label::new(WidgetId(2), "")));
        let swatch_label = Rc::new(RefCell::new(Label::new(WidgetId(3), "")));

        let handle = text_label.clone();
        selector.on_color_changed(move |s| handle.borrow_mut().set_text(s.color().to_string()));
        let handle = swatch_label.clone();
        selector.on_color_changed(move |s| handle.borrow_mut().set_background(Some(s.color())));

        selector.set_color(Rgba::ALICE_BLUE);

        assert_eq!(text_label.borrow().text(), "#f0f8ffff");
        assert_eq!(
            swatch_label.borrow().background_color(),
            Some(Rgba::ALICE_BLUE)
        );
    }
}
