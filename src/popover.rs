//! Popovers: transient, undecorated surfaces that hang off an anchor point.
//!
//! The popover paints its own chrome, a rounded body with an arrow on one side,
//! and embeds a child widget inside the body. It opens on [`Popover::run`] and
//! closes when it loses focus, when its parent window goes away, or on request.
//! Every open/close cycle fires the closed notification once.

use std::f64::consts::PI;

use kurbo::{Insets, Point};

use crate::backend::{DisplayCapabilities, PopoverSurface, SurfaceHints, WindowFrame};
use crate::drawing::{DrawingContext, Operator};
use crate::error::Error;
use crate::event::{Event, SubscriptionId};
use crate::input::{Key, KeyEvent, KeyState, PointerEvent};
use crate::render::{Canvas, CanvasContext, Rgba};
use crate::text::TextRenderer;
use crate::widget::{Constraints, LayoutContext, Rect, RenderContext, Size, Widget};
use crate::window::WindowId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PopoverId(pub u64);

/// Edge of the body the arrow protrudes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArrowSide {
    #[default]
    Top,
    Bottom,
}

impl ArrowSide {
    /// Direction the arrow points along the y axis.
    fn direction(self) -> f64 {
        match self {
            ArrowSide::Top => -1.0,
            ArrowSide::Bottom => 1.0,
        }
    }
}

/// Layout constants and colors of the popover chrome.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PopoverStyle {
    /// Space between the child and the surface edges. Default 20.
    pub padding: f64,
    /// Height of the arrow, reserved on the arrow side. Default 20.
    pub arrow_size: f64,
    /// Corner radius of the body. Default 10.
    pub corner_radius: f64,
    /// Gap between the surface edges and the body. Default 5.
    pub border_inset: f64,
    /// Outline width. Default 0.5.
    pub line_width: f64,
    /// Default `rgba(230, 230, 230, 230)`.
    pub body_color: Rgba,
    /// Default opaque black.
    pub outline_color: Rgba,
}

impl Default for PopoverStyle {
    fn default() -> Self {
        Self {
            padding: 20.0,
            arrow_size: 20.0,
            corner_radius: 10.0,
            border_inset: 5.0,
            line_width: 0.5,
            body_color: Rgba::new(230, 230, 230, 230),
            outline_color: Rgba::BLACK,
        }
    }
}

/// The three corners of the arrow. The base lies on the body edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arrow {
    pub base_left: Point,
    pub apex: Point,
    pub base_right: Point,
}

impl Arrow {
    pub fn side_length(&self) -> f64 {
        self.base_left.distance(self.base_right)
    }

    /// Distance from the base to the apex along the y axis.
    pub fn height(&self) -> f64 {
        (self.apex.y - self.base_left.y).abs()
    }
}

impl PopoverStyle {
    pub fn padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }

    pub fn arrow_size(mut self, arrow_size: f64) -> Self {
        self.arrow_size = arrow_size;
        self
    }

    pub fn corner_radius(mut self, radius: f64) -> Self {
        self.corner_radius = radius;
        self
    }

    pub fn border_inset(mut self, inset: f64) -> Self {
        self.border_inset = inset;
        self
    }

    pub fn body_color(mut self, color: Rgba) -> Self {
        self.body_color = color;
        self
    }

    /// Insets of the child area from the surface edges.
    pub fn content_insets(&self, side: ArrowSide) -> Insets {
        let mut insets = Insets::uniform(self.padding);
        match side {
            ArrowSide::Top => insets.y0 += self.arrow_size,
            ArrowSide::Bottom => insets.y1 += self.arrow_size,
        }
        insets
    }

    /// Side of an equilateral triangle whose height is `arrow_size`.
    pub fn arrow_side_length(&self) -> f64 {
        2.0 * self.arrow_size / 3f64.sqrt()
    }

    /// The surface bounds with the origin moved in by the border inset.
    ///
    /// Only the top and left edges are inset: the frame is the inset origin
    /// plus `size - inset`, so its right and bottom edges lie on the surface
    /// edges.
    pub fn frame_rect(&self, size: Size) -> kurbo::Rect {
        let inset = self.border_inset;
        kurbo::Rect::new(
            inset,
            inset,
            (size.width as f64).max(inset),
            (size.height as f64).max(inset),
        )
    }

    /// The rounded body: the frame minus the strip the arrow occupies.
    pub fn body_rect(&self, size: Size, side: ArrowSide) -> kurbo::Rect {
        let frame = self.frame_rect(size);
        match side {
            ArrowSide::Top => kurbo::Rect {
                y0: (frame.y0 + self.arrow_size).min(frame.y1),
                ..frame
            },
            ArrowSide::Bottom => kurbo::Rect {
                y1: (frame.y1 - self.arrow_size).max(frame.y0),
                ..frame
            },
        }
    }

    pub fn arrow(&self, size: Size, side: ArrowSide) -> Arrow {
        let frame = self.frame_rect(size);
        let body = self.body_rect(size, side);
        let base_y = match side {
            ArrowSide::Top => body.y0,
            ArrowSide::Bottom => body.y1,
        };
        let center_x = frame.center().x;
        let half = self.arrow_side_length() / 2.0;
        Arrow {
            base_left: Point::new(center_x - half, base_y),
            apex: Point::new(center_x, base_y + side.direction() * self.arrow_size),
            base_right: Point::new(center_x + half, base_y),
        }
    }
}

/// Appends a closed rounded rectangle made of four quarter arcs.
pub fn rounded_rectangle(ctx: &mut dyn DrawingContext, rect: kurbo::Rect, radius: f64) {
    let (left, right) = (rect.x0, rect.x1);
    let (top, bottom) = (rect.y0, rect.y1);
    let half_pi = PI / 2.0;

    ctx.arc(
        Point::new(left + radius, top + radius),
        radius,
        2.0 * half_pi,
        3.0 * half_pi,
    );
    ctx.arc(
        Point::new(right - radius, top + radius),
        radius,
        3.0 * half_pi,
        4.0 * half_pi,
    );
    ctx.arc(
        Point::new(right - radius, bottom - radius),
        radius,
        0.0,
        half_pi,
    );
    ctx.arc(
        Point::new(left + radius, bottom - radius),
        radius,
        half_pi,
        2.0 * half_pi,
    );
    ctx.close_path();
}

/// Top-left corner that centers a surface of `size` horizontally on `anchor`
/// and hangs it below the anchor.
pub fn popover_origin(anchor: Point, size: Size) -> (i32, i32) {
    (anchor.x as i32 - size.width as i32 / 2, anchor.y as i32)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PopoverState {
    Closed,
    Open { anchor: Point },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    FocusLost,
    ParentDestroyed,
    Requested,
}

pub struct Popover {
    id: PopoverId,
    parent: WindowId,
    side: ArrowSide,
    style: PopoverStyle,
    hints: SurfaceHints,
    content: Box<dyn Widget>,
    state: PopoverState,
    supports_alpha: bool,
    origin: Option<(i32, i32)>,
    last_close: Option<CloseReason>,
    closed: Event<Popover>,
}

impl Popover {
    /// Creates a closed popover owned by `parent`.
    ///
    /// Fails if the parent window has already been destroyed.
    pub fn new(
        id: PopoverId,
        parent: &dyn WindowFrame,
        content: Box<dyn Widget>,
        side: ArrowSide,
        style: PopoverStyle,
        display: &dyn DisplayCapabilities,
    ) -> Result<Self, Error> {
        let parent_id = parent.window_id();
        if !parent.is_alive() {
            return Err(Error::ParentDestroyed(parent_id));
        }

        let mut popover = Self {
            id,
            parent: parent_id,
            side,
            style,
            hints: SurfaceHints::popover(parent_id),
            content,
            state: PopoverState::Closed,
            supports_alpha: false,
            origin: None,
            last_close: None,
            closed: Event::new(),
        };
        popover.screen_changed(display);
        Ok(popover)
    }

    pub fn id(&self) -> PopoverId {
        self.id
    }

    pub fn parent(&self) -> WindowId {
        self.parent
    }

    pub fn side(&self) -> ArrowSide {
        self.side
    }

    pub fn style(&self) -> &PopoverStyle {
        &self.style
    }

    pub fn hints(&self) -> &SurfaceHints {
        &self.hints
    }

    /// Replaces the hints used when the native surface is next created.
    pub fn set_hints(&mut self, hints: SurfaceHints) {
        self.hints = hints;
    }

    pub fn state(&self) -> PopoverState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PopoverState::Open { .. })
    }

    pub fn supports_alpha(&self) -> bool {
        self.supports_alpha
    }

    /// Last position the surface was moved to while open.
    pub fn origin(&self) -> Option<(i32, i32)> {
        self.origin
    }

    pub fn last_close_reason(&self) -> Option<CloseReason> {
        self.last_close
    }

    pub fn content(&self) -> &dyn Widget {
        &*self.content
    }

    pub fn content_mut(&mut self) -> &mut dyn Widget {
        &mut *self.content
    }

    pub fn on_closed(&mut self, handler: impl FnMut(&Popover) + 'static) -> SubscriptionId {
        self.closed.subscribe(handler)
    }

    pub fn remove_closed_listener(&mut self, id: SubscriptionId) -> bool {
        self.closed.unsubscribe(id)
    }

    /// Re-reads the alpha capability. Called whenever the surface moves to
    /// another screen.
    pub fn screen_changed(&mut self, display: &dyn DisplayCapabilities) {
        let supports_alpha = display.supports_alpha();
        if !supports_alpha {
            log::warn!(
                "popover {:?}: display has no alpha channel, using opaque background",
                self.id
            );
        }
        self.supports_alpha = supports_alpha;
    }

    /// Shows the popover hanging below `anchor`.
    ///
    /// Returns false, leaving the popover untouched, if it is already open.
    pub fn run(&mut self, surface: &mut dyn PopoverSurface, anchor: Point) -> bool {
        if self.is_open() {
            log::warn!("popover {:?} is already open, ignoring run", self.id);
            return false;
        }

        surface.show();
        surface.grab_focus();
        self.state = PopoverState::Open { anchor };
        let size = surface.size();
        self.place(surface, size);
        log::debug!("popover {:?} opened at {:?}", self.id, self.origin);
        true
    }

    /// Keeps the popover centered on its anchor after a size change.
    pub fn size_allocated(&mut self, surface: &mut dyn PopoverSurface, size: Size) {
        if self.is_open() {
            self.place(surface, size);
        }
    }

    pub fn focus_out(&mut self, surface: &mut dyn PopoverSurface) {
        self.close_with(surface, CloseReason::FocusLost);
    }

    pub fn parent_destroyed(&mut self, surface: &mut dyn PopoverSurface) {
        self.close_with(surface, CloseReason::ParentDestroyed);
    }

    pub fn close(&mut self, surface: &mut dyn PopoverSurface) {
        self.close_with(surface, CloseReason::Requested);
    }

    fn place(&mut self, surface: &mut dyn PopoverSurface, size: Size) {
        let PopoverState::Open { anchor } = self.state else {
            return;
        };
        let (x, y) = popover_origin(anchor, size);
        surface.move_to(x, y);
        self.origin = Some((x, y));
    }

    fn close_with(&mut self, surface: &mut dyn PopoverSurface, reason: CloseReason) {
        if !self.is_open() {
            return;
        }
        surface.hide();
        self.state = PopoverState::Closed;
        self.origin = None;
        self.last_close = Some(reason);
        log::debug!("popover {:?} closed: {:?}", self.id, reason);

        let mut closed = std::mem::take(&mut self.closed);
        closed.emit(self);
        self.closed = closed;
    }

    /// Area of the surface given to the child widget.
    pub fn content_rect(&self, size: Size) -> Rect {
        let insets = self.style.content_insets(self.side);
        Rect::new(
            insets.x0 as i32,
            insets.y0 as i32,
            (size.width as f64 - insets.x_value()).max(0.0) as u32,
            (size.height as f64 - insets.y_value()).max(0.0) as u32,
        )
    }

    /// Size the surface needs to show the child at its preferred size.
    pub fn natural_size(&mut self, max: Size, ctx: &mut LayoutContext) -> Size {
        let insets = self.style.content_insets(self.side);
        let child_max = Size::new(
            (max.width as f64 - insets.x_value()).max(0.0) as u32,
            (max.height as f64 - insets.y_value()).max(0.0) as u32,
        );
        let child = self
            .content
            .layout(Constraints::loose(child_max.width, child_max.height), ctx);
        Size::new(
            child.width + insets.x_value().ceil() as u32,
            child.height + insets.y_value().ceil() as u32,
        )
    }

    /// Paints the chrome: clears the surface, then draws the body and arrow.
    pub fn paint(&self, ctx: &mut dyn DrawingContext, size: Size) {
        let style = &self.style;

        ctx.set_operator(Operator::Source);
        if self.supports_alpha {
            ctx.set_source(Rgba::new(255, 255, 255, 0));
        } else {
            ctx.set_source(Rgba::WHITE);
        }
        ctx.paint();
        ctx.set_operator(Operator::Over);

        let body = style.body_rect(size, self.side);
        ctx.new_path();
        rounded_rectangle(ctx, body, style.corner_radius);
        ctx.set_source(style.body_color);
        ctx.fill_preserve();
        ctx.set_line_width(style.line_width);
        ctx.set_source(style.outline_color);
        ctx.stroke();

        // The base edge is left unstroked so the arrow merges with the body.
        let half = style.arrow_side_length() / 2.0;
        let rise = self.side.direction() * style.arrow_size;
        let arrow = style.arrow(size, self.side);
        ctx.new_path();
        ctx.move_to(Point::new(arrow.apex.x, arrow.base_left.y));
        ctx.rel_move_to(-half, 0.0);
        ctx.rel_line_to(half, rise);
        ctx.rel_line_to(half, -rise);
        ctx.set_source(style.outline_color);
        ctx.stroke_preserve();
        ctx.close_path();
        ctx.set_source(style.body_color);
        ctx.fill();
    }

    /// Paints the chrome and the child into `canvas`.
    pub fn render(&self, canvas: &mut Canvas, text: &mut TextRenderer) {
        let size = Size::new(canvas.width(), canvas.height());
        {
            let mut ctx = CanvasContext::new(canvas);
            self.paint(&mut ctx, size);
        }
        let mut ctx = RenderContext { canvas, text };
        self.content.render(self.content_rect(size), &mut ctx);
    }

    /// Escape closes the popover; other keys go to the child.
    pub fn handle_key(&mut self, surface: &mut dyn PopoverSurface, event: &KeyEvent) -> bool {
        if !self.is_open() {
            return false;
        }
        if event.key == Key::Escape && event.state == KeyState::Pressed {
            self.close(surface);
            return true;
        }
        self.content.handle_key(event)
    }

    pub fn handle_pointer(&mut self, event: &PointerEvent, size: Size) -> bool {
        if !self.is_open() {
            return false;
        }
        let bounds = self.content_rect(size);
        self.content.handle_pointer(event, bounds)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use float_cmp::approx_eq;
    use kurbo::{BezPath, ParamCurve, PathEl};

    use super::*;
    use crate::drawing::{DrawOp, Recorder};
    use crate::input::Modifiers;
    use crate::widget::WidgetId;

    struct Frame {
        id: WindowId,
        alive: bool,
    }

    impl WindowFrame for Frame {
        fn window_id(&self) -> WindowId {
            self.id
        }

        fn is_alive(&self) -> bool {
            self.alive
        }
    }

    struct Display(bool);

    impl DisplayCapabilities for Display {
        fn supports_alpha(&self) -> bool {
            self.0
        }
    }

    #[derive(Default)]
    struct FakeSurface {
        size: Size,
        calls: Vec<String>,
        position: Option<(i32, i32)>,
        visible: bool,
    }

    impl PopoverSurface for FakeSurface {
        fn show(&mut self) {
            self.visible = true;
            self.calls.push("show".into());
        }

        fn grab_focus(&mut self) {
            self.calls.push("grab_focus".into());
        }

        fn size(&self) -> Size {
            self.size
        }

        fn move_to(&mut self, x: i32, y: i32) {
            self.position = Some((x, y));
            self.calls.push(format!("move_to {x} {y}"));
        }

        fn hide(&mut self) {
            self.visible = false;
            self.calls.push("hide".into());
        }
    }

    struct Blank;

    impl Widget for Blank {
        fn id(&self) -> WidgetId {
            WidgetId(7)
        }

        fn layout(&mut self, _constraints: Constraints, _ctx: &mut LayoutContext) -> Size {
            Size::new(10, 10)
        }

        fn render(&self, _bounds: Rect, _ctx: &mut RenderContext) {}
    }

    fn make_popover(side: ArrowSide, alpha: bool) -> Popover {
        let frame = Frame {
            id: WindowId(1),
            alive: true,
        };
        Popover::new(
            PopoverId(1),
            &frame,
            Box::new(Blank),
            side,
            PopoverStyle::default(),
            &Display(alpha),
        )
        .unwrap()
    }

    fn fake_surface(width: u32, height: u32) -> FakeSurface {
        FakeSurface {
            size: Size::new(width, height),
            ..Default::default()
        }
    }

    fn is_closed(path: &BezPath) -> bool {
        matches!(path.elements().last(), Some(PathEl::ClosePath))
    }

    /// Targets of the move and line elements, in order.
    fn vertices(path: &BezPath) -> Vec<Point> {
        path.elements()
            .iter()
            .filter_map(|el| match *el {
                PathEl::MoveTo(p) | PathEl::LineTo(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    fn count_closed(popover: &mut Popover) -> Rc<Cell<u32>> {
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        popover.on_closed(move |_| counter.set(counter.get() + 1));
        hits
    }

    #[test]
    fn test_content_insets_follow_arrow_side() {
        let style = PopoverStyle::default();

        let top = style.content_insets(ArrowSide::Top);
        assert_eq!(top.y0, style.padding + style.arrow_size);
        assert_eq!(top.y1, style.padding);

        let bottom = style.content_insets(ArrowSide::Bottom);
        assert_eq!(bottom.y0, style.padding);
        assert_eq!(bottom.y1, style.padding + style.arrow_size);

        for insets in [top, bottom] {
            assert_eq!(insets.x0, style.padding);
            assert_eq!(insets.x1, style.padding);
            assert_eq!(insets.y_value(), 2.0 * style.padding + style.arrow_size);
        }
    }

    #[test]
    fn test_arrow_is_equilateral_with_height_of_arrow_size() {
        let style = PopoverStyle::default();
        let side = style.arrow_side_length();
        assert!(approx_eq!(f64, side, 40.0 / 3f64.sqrt(), epsilon = 1e-12));

        for arrow_side in [ArrowSide::Top, ArrowSide::Bottom] {
            let arrow = style.arrow(Size::new(200, 100), arrow_side);
            assert!(approx_eq!(f64, arrow.side_length(), side, epsilon = 1e-9));
            assert!(approx_eq!(f64, arrow.height(), style.arrow_size, epsilon = 1e-9));
            assert!(approx_eq!(
                f64,
                arrow.apex.distance(arrow.base_left),
                side,
                epsilon = 1e-9
            ));
        }
    }

    #[test]
    fn test_arrow_points_away_from_body() {
        let style = PopoverStyle::default();
        let size = Size::new(200, 100);

        let top = style.arrow(size, ArrowSide::Top);
        let body = style.body_rect(size, ArrowSide::Top);
        assert_eq!(top.base_left.y, body.y0);
        assert!(top.apex.y < body.y0);
        assert_eq!(top.apex.x, 102.5);

        let bottom = style.arrow(size, ArrowSide::Bottom);
        let body = style.body_rect(size, ArrowSide::Bottom);
        assert_eq!(bottom.base_left.y, body.y1);
        assert!(bottom.apex.y > body.y1);
        assert_eq!(bottom.apex, Point::new(102.5, 100.0));
    }

    #[test]
    fn test_body_rect_leaves_room_for_arrow() {
        let style = PopoverStyle::default();
        let size = Size::new(200, 100);

        let top = style.body_rect(size, ArrowSide::Top);
        assert_eq!(top, kurbo::Rect::new(5.0, 25.0, 200.0, 100.0));
        assert_eq!((top.width(), top.height()), (195.0, 75.0));

        let bottom = style.body_rect(size, ArrowSide::Bottom);
        assert_eq!(bottom, kurbo::Rect::new(5.0, 5.0, 200.0, 80.0));
    }

    #[test]
    fn test_frame_rect_insets_only_the_origin() {
        let style = PopoverStyle::default();
        let frame = style.frame_rect(Size::new(200, 100));
        assert_eq!(frame, kurbo::Rect::new(5.0, 5.0, 200.0, 100.0));
        assert_eq!(frame.center().x, 102.5);

        let tiny = style.frame_rect(Size::new(2, 2));
        assert_eq!(tiny, kurbo::Rect::new(5.0, 5.0, 5.0, 5.0));
    }

    #[test]
    fn test_rounded_rectangle_is_closed() {
        for (width, height) in [(20.0, 20.0), (100.0, 40.0), (21.5, 300.0)] {
            let mut ctx = Recorder::new();
            let rect = kurbo::Rect::from_origin_size((3.0, 4.0), (width, height));
            rounded_rectangle(&mut ctx, rect, 10.0);
            ctx.fill_preserve();

            let DrawOp::Fill { path, .. } = &ctx.ops()[0] else {
                panic!("expected a fill");
            };
            assert!(is_closed(path));
            assert_eq!(path.elements()[0], PathEl::MoveTo(Point::new(3.0, 14.0)));
            let last = path.segments().last().unwrap();
            assert!(last.end().distance(Point::new(3.0, 14.0)) < 1e-9);
        }
    }

    #[test]
    fn test_paint_clears_transparent_with_alpha() {
        let popover = make_popover(ArrowSide::Top, true);
        let mut ctx = Recorder::new();
        popover.paint(&mut ctx, Size::new(200, 100));

        assert_eq!(
            ctx.ops()[0],
            DrawOp::Paint {
                color: Rgba::new(255, 255, 255, 0),
                operator: Operator::Source,
            }
        );
    }

    #[test]
    fn test_screen_without_alpha_falls_back_to_opaque_white() {
        let mut popover = make_popover(ArrowSide::Top, true);
        popover.screen_changed(&Display(false));
        assert!(!popover.supports_alpha());

        let mut ctx = Recorder::new();
        popover.paint(&mut ctx, Size::new(200, 100));
        assert_eq!(
            ctx.ops()[0],
            DrawOp::Paint {
                color: Rgba::WHITE,
                operator: Operator::Source,
            }
        );

        popover.screen_changed(&Display(true));
        assert!(popover.supports_alpha());
    }

    #[test]
    fn test_paint_draws_body_then_arrow() {
        let popover = make_popover(ArrowSide::Bottom, true);
        let style = *popover.style();
        let size = Size::new(200, 100);
        let mut ctx = Recorder::new();
        popover.paint(&mut ctx, size);

        let ops = ctx.into_ops();
        assert_eq!(ops.len(), 5);

        match &ops[1] {
            DrawOp::Fill {
                path,
                color,
                operator,
            } => {
                assert!(is_closed(path));
                assert_eq!(*color, style.body_color);
                assert_eq!(*operator, Operator::Over);
            }
            other => panic!("unexpected op {other:?}"),
        }
        match &ops[2] {
            DrawOp::Stroke { color, width, .. } => {
                assert_eq!(*color, Rgba::BLACK);
                assert_eq!(*width, 0.5);
            }
            other => panic!("unexpected op {other:?}"),
        }

        let arrow = style.arrow(size, ArrowSide::Bottom);
        match &ops[3] {
            DrawOp::Stroke { path, color, .. } => {
                assert_eq!(*color, Rgba::BLACK);
                assert!(!is_closed(path));
                let vertices = vertices(path);
                // the base edge itself is never drawn
                let [.., left, apex, right] = vertices.as_slice() else {
                    panic!("expected three arrow corners, got {vertices:?}");
                };
                assert!(left.distance(arrow.base_left) < 1e-9);
                assert!(apex.distance(arrow.apex) < 1e-9);
                assert!(right.distance(arrow.base_right) < 1e-9);
                assert!(matches!(path.elements()[path.elements().len() - 3], PathEl::MoveTo(_)));
            }
            other => panic!("unexpected op {other:?}"),
        }
        match &ops[4] {
            DrawOp::Fill { path, color, .. } => {
                assert!(is_closed(path));
                assert_eq!(*color, style.body_color);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn test_new_fails_for_destroyed_parent() {
        let frame = Frame {
            id: WindowId(3),
            alive: false,
        };
        let result = Popover::new(
            PopoverId(1),
            &frame,
            Box::new(Blank),
            ArrowSide::Top,
            PopoverStyle::default(),
            &Display(true),
        );
        assert_eq!(result.err(), Some(Error::ParentDestroyed(WindowId(3))));
    }

    #[test]
    fn test_new_sets_popup_hints() {
        let popover = make_popover(ArrowSide::Top, true);
        let hints = popover.hints();
        assert!(!hints.decorated);
        assert!(hints.skip_taskbar);
        assert!(hints.skip_pager);
        assert!(hints.destroy_with_parent);
        assert_eq!(hints.transient_for, Some(WindowId(1)));
        assert_eq!(popover.state(), PopoverState::Closed);
    }

    #[test]
    fn test_run_centers_on_anchor() {
        let mut popover = make_popover(ArrowSide::Top, true);
        let mut surface = fake_surface(60, 40);

        assert!(popover.run(&mut surface, Point::new(100.0, 50.0)));

        assert_eq!(surface.position, Some((70, 50)));
        assert_eq!(popover.origin(), Some((70, 50)));
        assert_eq!(
            surface.calls,
            vec!["show", "grab_focus", "move_to 70 50"]
        );
        assert_eq!(
            popover.state(),
            PopoverState::Open {
                anchor: Point::new(100.0, 50.0)
            }
        );
    }

    #[test]
    fn test_resize_after_open_recenters() {
        let mut popover = make_popover(ArrowSide::Top, true);
        let mut surface = fake_surface(60, 40);
        popover.run(&mut surface, Point::new(100.0, 50.0));

        popover.size_allocated(&mut surface, Size::new(120, 40));
        assert_eq!(surface.position, Some((40, 50)));

        popover.size_allocated(&mut surface, Size::new(81, 40));
        assert_eq!(surface.position, Some((60, 50)));
    }

    #[test]
    fn test_resize_while_closed_does_not_move() {
        let mut popover = make_popover(ArrowSide::Top, true);
        let mut surface = fake_surface(60, 40);
        popover.size_allocated(&mut surface, Size::new(120, 40));
        assert_eq!(surface.position, None);
    }

    #[test]
    fn test_focus_out_closes_once() {
        let mut popover = make_popover(ArrowSide::Top, true);
        let closed = count_closed(&mut popover);
        let mut surface = fake_surface(60, 40);
        popover.run(&mut surface, Point::new(100.0, 50.0));

        popover.focus_out(&mut surface);
        popover.focus_out(&mut surface);
        popover.parent_destroyed(&mut surface);

        assert_eq!(closed.get(), 1);
        assert_eq!(popover.state(), PopoverState::Closed);
        assert_eq!(popover.last_close_reason(), Some(CloseReason::FocusLost));
        assert!(!surface.visible);
    }

    #[test]
    fn test_parent_destroyed_closes() {
        let mut popover = make_popover(ArrowSide::Bottom, true);
        let closed = count_closed(&mut popover);
        let mut surface = fake_surface(60, 40);
        popover.run(&mut surface, Point::new(10.0, 10.0));

        popover.parent_destroyed(&mut surface);

        assert_eq!(closed.get(), 1);
        assert_eq!(
            popover.last_close_reason(),
            Some(CloseReason::ParentDestroyed)
        );
    }

    #[test]
    fn test_each_cycle_notifies_once() {
        let mut popover = make_popover(ArrowSide::Top, true);
        let closed = count_closed(&mut popover);
        let mut surface = fake_surface(60, 40);

        for _ in 0..3 {
            assert!(popover.run(&mut surface, Point::new(100.0, 50.0)));
            popover.close(&mut surface);
        }

        assert_eq!(closed.get(), 3);
    }

    #[test]
    fn test_second_run_while_open_is_ignored() {
        let mut popover = make_popover(ArrowSide::Top, true);
        let mut surface = fake_surface(60, 40);
        popover.run(&mut surface, Point::new(100.0, 50.0));

        assert!(!popover.run(&mut surface, Point::new(300.0, 300.0)));
        assert_eq!(surface.position, Some((70, 50)));
        assert_eq!(surface.calls.len(), 3);
    }

    #[test]
    fn test_escape_closes() {
        let mut popover = make_popover(ArrowSide::Top, true);
        let closed = count_closed(&mut popover);
        let mut surface = fake_surface(60, 40);
        popover.run(&mut surface, Point::new(100.0, 50.0));

        let escape = KeyEvent {
            key: Key::Escape,
            text: None,
            modifiers: Modifiers::default(),
            state: KeyState::Pressed,
        };
        assert!(popover.handle_key(&mut surface, &escape));
        assert_eq!(closed.get(), 1);
        assert_eq!(popover.last_close_reason(), Some(CloseReason::Requested));
    }

    #[test]
    fn test_closed_listener_sees_closed_state() {
        let mut popover = make_popover(ArrowSide::Top, true);
        let was_open = Rc::new(Cell::new(true));
        let seen = was_open.clone();
        popover.on_closed(move |p| seen.set(p.is_open()));

        let mut surface = fake_surface(60, 40);
        popover.run(&mut surface, Point::new(100.0, 50.0));
        popover.focus_out(&mut surface);

        assert!(!was_open.get());
    }

    #[test]
    fn test_content_rect_excludes_arrow_strip() {
        let popover = make_popover(ArrowSide::Top, true);
        assert_eq!(
            popover.content_rect(Size::new(200, 100)),
            Rect::new(20, 40, 160, 40)
        );

        let popover = make_popover(ArrowSide::Bottom, true);
        assert_eq!(
            popover.content_rect(Size::new(200, 100)),
            Rect::new(20, 20, 160, 40)
        );
    }

    #[test]
    fn test_render_paints_transparent_corners_and_body() {
        let popover = make_popover(ArrowSide::Top, true);
        let (width, height) = (120u32, 90u32);
        let mut data = vec![255u8; (width * height * 4) as usize];
        let mut canvas = Canvas::new(&mut data, width, height);

        {
            let mut ctx = CanvasContext::new(&mut canvas);
            popover.paint(&mut ctx, Size::new(width, height));
        }

        assert_eq!(canvas.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(width - 1, height - 1), Some([0, 0, 0, 0]));
        // Inside the body: premultiplied body color.
        let [_, _, _, alpha] = canvas.pixel(60, 60).unwrap();
        assert_eq!(alpha, 230);
        // Just above the body, at the apex column: inside the arrow.
        let [_, _, _, alpha] = canvas.pixel(62, 22).unwrap();
        assert!(alpha > 0);
        // Same row, far from the arrow: untouched.
        assert_eq!(canvas.pixel(10, 22), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_render_without_alpha_has_white_corners() {
        let popover = make_popover(ArrowSide::Top, false);
        let (width, height) = (120u32, 90u32);
        let mut data = vec![0u8; (width * height * 4) as usize];
        let mut canvas = Canvas::new(&mut data, width, height);

        {
            let mut ctx = CanvasContext::new(&mut canvas);
            popover.paint(&mut ctx, Size::new(width, height));
        }

        assert_eq!(canvas.pixel(0, 0), Some([255, 255, 255, 255]));
    }
}
