use std::fmt;

use kurbo::{BezPath, PathEl};

use tiny_skia::{
    BlendMode, Color, FillRule, Paint, PathBuilder, PixmapMut, Rect, Stroke, Transform,
};

use crate::drawing::{DrawingContext, GraphicsState, Operator};

pub struct Canvas<'a> {
    data: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    pub fn new(data: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self, color: Color) {
        let Some(mut pixmap) = PixmapMut::from_bytes(self.data, self.width, self.height) else {
            return;
        };
        pixmap.fill(color);
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let Some(mut pixmap) = PixmapMut::from_bytes(self.data, self.width, self.height) else {
            return;
        };

        let rect = match Rect::from_xywh(x, y, w, h) {
            Some(r) => r,
            None => return,
        };

        let mut paint = Paint::default();
        paint.set_color(color);
        paint.anti_alias = false;

        pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }

    /// Strokes the outline of a rectangle, used for selection highlights.
    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32, color: Color) {
        let Some(mut pixmap) = PixmapMut::from_bytes(self.data, self.width, self.height) else {
            return;
        };
        let Some(rect) = Rect::from_xywh(x, y, w, h) else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color(color);

        let path = PathBuilder::from_rect(rect);
        let stroke = Stroke {
            width,
            ..Default::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    pub fn data(&self) -> &[u8] {
        self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data
    }

    /// Premultiplied RGBA bytes of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        let px = self.data.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Convert from tiny-skia's RGBA to Wayland's BGRA format.
    /// Call this after all drawing is complete, before sending to compositor.
    pub fn finalize_for_wayland(&mut self) {
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.swap(0, 2);
        }
    }
}

fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

/// Rasterizes [`DrawingContext`] calls into a [`Canvas`].
///
/// Borrowed for a single paint pass and dropped with it.
pub struct CanvasContext<'c, 'a> {
    canvas: &'c mut Canvas<'a>,
    state: GraphicsState,
}

impl<'c, 'a> CanvasContext<'c, 'a> {
    pub fn new(canvas: &'c mut Canvas<'a>) -> Self {
        Self {
            canvas,
            state: GraphicsState::default(),
        }
    }

    pub fn canvas(&mut self) -> &mut Canvas<'a> {
        self.canvas
    }

    fn paint_for_state(&self) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(self.state.source.to_color());
        paint.anti_alias = true;
        paint.blend_mode = match self.state.operator {
            Operator::Over => BlendMode::SourceOver,
            Operator::Source => BlendMode::Source,
        };
        paint
    }

    fn pixmap(&mut self) -> Option<PixmapMut<'_>> {
        let (width, height) = (self.canvas.width, self.canvas.height);
        PixmapMut::from_bytes(self.canvas.data, width, height)
    }
}

impl DrawingContext for CanvasContext<'_, '_> {
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
        let paint = self.paint_for_state();
        let (width, height) = (self.canvas.width as f32, self.canvas.height as f32);
        let Some(rect) = Rect::from_xywh(0.0, 0.0, width, height) else {
            return;
        };
        if let Some(mut pixmap) = self.pixmap() {
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    fn fill_preserve(&mut self) {
        let Some(path) = to_skia_path(&self.state.path) else {
            return;
        };
        let paint = self.paint_for_state();
        if let Some(mut pixmap) = self.pixmap() {
            pixmap.fill_path(
                &path,
                &paint,
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    fn stroke_preserve(&mut self) {
        let Some(path) = to_skia_path(&self.state.path) else {
            return;
        };
        let paint = self.paint_for_state();
        let stroke = Stroke {
            width: self.state.line_width as f32,
            ..Default::default()
        };
        if let Some(mut pixmap) = self.pixmap() {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Builds an opaque color from hue (degrees), saturation and lightness (0..=1).
    pub fn from_hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
        let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
        let h = hue.rem_euclid(360.0) / 60.0;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = lightness - c / 2.0;
        let channel = |v: f64| ((v + m).clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::rgb(channel(r), channel(g), channel(b))
    }

    pub fn to_color(&self) -> Color {
        Color::from_rgba8(self.r, self.g, self.b, self.a)
    }

    pub fn to_text_color(&self) -> cosmic_text::Color {
        cosmic_text::Color::rgba(self.r, self.g, self.b, self.a)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }
}

// Common colors
impl Rgba {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    pub const ALICE_BLUE: Self = Self::rgb(240, 248, 255);
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
}
