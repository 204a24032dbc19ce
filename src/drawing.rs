//! Immediate-mode path drawing.
//!
//! [`DrawingContext`] is the interface popover chrome paints through. It follows
//! the usual current-path model: path construction calls append to a
//! [`BezPath`], `fill`/`stroke` consume it and their `_preserve` variants keep it.

use std::f64::consts::TAU;

use kurbo::{Arc, BezPath, PathEl, Point, Vec2};

use crate::render::Rgba;

/// Flattening tolerance for arcs, in pixels.
const ARC_TOLERANCE: f64 = 0.1;

/// How source pixels combine with what is already on the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Operator {
    /// Blend the source over the destination.
    #[default]
    Over,
    /// Replace the destination with the source, alpha included.
    Source,
}

/// Where the next segment of `path` would start: the end of the last segment,
/// or the subpath start after a close.
pub fn current_point(path: &BezPath) -> Option<Point> {
    let mut start = None;
    let mut current = None;
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                start = Some(p);
                current = Some(p);
            }
            PathEl::LineTo(p) | PathEl::QuadTo(_, p) | PathEl::CurveTo(_, _, p) => {
                current = Some(p)
            }
            PathEl::ClosePath => current = start,
        }
    }
    current
}

pub trait DrawingContext {
    fn set_source(&mut self, color: Rgba);

    fn set_line_width(&mut self, width: f64);

    fn set_operator(&mut self, operator: Operator);

    /// The path under construction.
    fn path(&self) -> &BezPath;

    fn path_mut(&mut self) -> &mut BezPath;

    /// Fills the whole surface with the current source.
    fn paint(&mut self);

    fn fill_preserve(&mut self);

    fn stroke_preserve(&mut self);

    fn new_path(&mut self) {
        *self.path_mut() = BezPath::new();
    }

    fn current_point(&self) -> Option<Point> {
        current_point(self.path())
    }

    fn move_to(&mut self, p: Point) {
        self.path_mut().move_to(p);
    }

    /// Without a current point this behaves like [`move_to`](Self::move_to).
    fn line_to(&mut self, p: Point) {
        let Some(current) = self.current_point() else {
            self.move_to(p);
            return;
        };
        let path = self.path_mut();
        if matches!(path.elements().last(), Some(PathEl::ClosePath)) {
            path.move_to(current);
        }
        path.line_to(p);
    }

    /// Appends a clockwise arc (in y-down coordinates) from `start_angle` to
    /// `end_angle`. An end angle below the start wraps by full turns.
    ///
    /// Without a current point the arc starts a new subpath, otherwise a
    /// straight edge joins the current point to the arc start. Non-finite
    /// input is ignored.
    fn arc(&mut self, center: Point, radius: f64, start_angle: f64, end_angle: f64) {
        if !(radius.is_finite() && start_angle.is_finite() && end_angle.is_finite()) {
            log::warn!("ignoring arc with non-finite radius or angles");
            return;
        }
        let mut sweep = end_angle - start_angle;
        if sweep < 0.0 {
            sweep = sweep.rem_euclid(TAU);
        }
        let start = center + Vec2::from_angle(start_angle) * radius;
        self.line_to(start);
        let arc = Arc {
            center,
            radii: Vec2::new(radius, radius),
            start_angle,
            sweep_angle: sweep,
            x_rotation: 0.0,
        };
        self.path_mut().extend(arc.append_iter(ARC_TOLERANCE));
    }

    fn close_path(&mut self) {
        if self.current_point().is_some() {
            self.path_mut().close_path();
        }
    }

    fn rel_move_to(&mut self, dx: f64, dy: f64) {
        match self.current_point() {
            Some(p) => self.move_to(p + Vec2::new(dx, dy)),
            None => log::warn!("rel_move_to without a current point"),
        }
    }

    fn rel_line_to(&mut self, dx: f64, dy: f64) {
        match self.current_point() {
            Some(p) => self.line_to(p + Vec2::new(dx, dy)),
            None => log::warn!("rel_line_to without a current point"),
        }
    }

    fn fill(&mut self) {
        self.fill_preserve();
        self.new_path();
    }

    fn stroke(&mut self) {
        self.stroke_preserve();
        self.new_path();
    }
}

/// Graphics state shared by drawing context implementations.
#[derive(Clone, Debug)]
pub struct GraphicsState {
    pub source: Rgba,
    pub line_width: f64,
    pub operator: Operator,
    pub path: BezPath,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            source: Rgba::BLACK,
            line_width: 2.0,
            operator: Operator::Over,
            path: BezPath::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Paint {
        color: Rgba,
        operator: Operator,
    },
    Fill {
        path: BezPath,
        color: Rgba,
        operator: Operator,
    },
    Stroke {
        path: BezPath,
        color: Rgba,
        width: f64,
        operator: Operator,
    },
}

/// A drawing context that records operations instead of rasterizing them.
#[derive(Debug, Default)]
pub struct Recorder {
    state: GraphicsState,
    ops: Vec<DrawOp>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<DrawOp> {
        self.ops
    }
}

impl DrawingContext for Recorder {
    fn set_source(&mut self, color: Rgba) {
        self.state.source = color;
    }

    fn set_line_width(&mut self, width: f64) {
        self.state.line_width = width;
    }

    fn set_operator(&mut self, operator: Operator) {
        self.state.operator = operator;
    }

    fn path(&self) -> &BezPath {
        &self.state.path
    }

    fn path_mut(&mut self) -> &mut BezPath {
        &mut self.state.path
    }

    fn paint(&mut self) {
        self.ops.push(DrawOp::Paint {
            color: self.state.source,
            operator: self.state.operator,
        });
    }

    fn fill_preserve(&mut self) {
        self.ops.push(DrawOp::Fill {
            path: self.state.path.clone(),
            color: self.state.source,
            operator: self.state.operator,
        });
    }

    fn stroke_preserve(&mut self) {
        self.ops.push(DrawOp::Stroke {
            path: self.state.path.clone(),
            color: self.state.source,
            width: self.state.line_width,
            operator: self.state.operator,
        });
    }
}
