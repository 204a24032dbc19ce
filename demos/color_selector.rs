use std::cell::RefCell;
use std::rc::Rc;

use popkit::{
    App, ColorSelector, KeyState, Label, PointerButton, PointerEventKind, Rect, Rgba, VStack,
    Widget, WidgetId,
};

/// A color selector stacked over two labels that follow its color.
fn build() -> VStack {
    let selector = Rc::new(RefCell::new(ColorSelector::new(WidgetId(1))));
    let text_label = Rc::new(RefCell::new(Label::new(WidgetId(2), "")));
    let swatch_label = Rc::new(RefCell::new(Label::new(WidgetId(3), "")));

    {
        let text_label = text_label.clone();
        selector.borrow_mut().on_color_changed(move |selector| {
            text_label
                .borrow_mut()
                .set_text(format!("Selected color: {}", selector.color()));
        });
    }
    {
        let swatch_label = swatch_label.clone();
        selector.borrow_mut().on_color_changed(move |selector| {
            swatch_label
                .borrow_mut()
                .set_background(Some(selector.color()));
        });
    }
    selector.borrow_mut().set_color(Rgba::ALICE_BLUE);

    VStack::new(WidgetId(0))
        .spacing(8)
        .child(selector)
        .child(text_label)
        .child(swatch_label)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (mut app, mut event_queue) = App::new()?;
    let qh = event_queue.handle();

    let window_id = app.create_window(&qh, "popkit - Color Selector", 320, 260);
    let mut root = build();
    let background = Rgba::rgb(40, 40, 45);

    while app.running {
        event_queue.blocking_dispatch(&mut app)?;

        let (width, height) = app.window_size(window_id).unwrap_or((320, 260));
        let bounds = Rect::new(0, 0, width, height);

        for event in app.poll_pointer_events() {
            if matches!(event.kind, PointerEventKind::Press(PointerButton::Left))
                && root.handle_pointer(&event, bounds)
            {
                app.mark_window_dirty(window_id);
            }
        }
        for event in app.poll_key_events() {
            if event.state == KeyState::Pressed && root.handle_key(&event) {
                app.mark_window_dirty(window_id);
            }
        }

        if app.is_window_dirty(window_id) {
            app.render_widget(window_id, &mut root, background);
            app.flush();
        }
    }

    Ok(())
}
