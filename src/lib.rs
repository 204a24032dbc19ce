mod app;
mod backend;
mod color_selector;
mod drawing;
mod error;
mod event;
mod input;
mod popover;
mod render;
mod text;
mod widget;
mod window;

pub use app::App;
pub use backend::{DisplayCapabilities, PopoverSurface, SurfaceHints, SurfaceKind, WindowFrame};
pub use color_selector::ColorSelector;
pub use drawing::{DrawOp, DrawingContext, GraphicsState, Operator, Recorder, current_point};
pub use error::Error;
pub use event::{Event, SubscriptionId};
pub use input::{
    Key, KeyEvent, KeyState, Modifiers, PointerButton, PointerEvent, PointerEventKind,
};
pub use popover::{
    Arrow, ArrowSide, CloseReason, Popover, PopoverId, PopoverState, PopoverStyle,
    popover_origin, rounded_rectangle,
};
pub use render::{Canvas, CanvasContext, Rgba};
pub use text::TextRenderer;
pub use widget::{
    Constraints, Label, LayoutContext, Rect, RenderContext, Size, VStack, Widget, WidgetId,
};
pub use window::{NativePopover, PopoverSlot, Window, WindowId, WindowManager};

// Re-export key dependencies for users
pub use cosmic_text::Color as TextColor;
pub use kurbo::{self, BezPath, Insets, Point};
pub use smithay_client_toolkit::reexports::client::{EventQueue, QueueHandle};
pub use tiny_skia::Color;
