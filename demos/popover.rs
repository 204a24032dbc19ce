use std::cell::RefCell;
use std::rc::Rc;

use popkit::{
    App, ArrowSide, ColorSelector, Label, Point, PointerButton, PointerEventKind, PopoverStyle,
    Rgba, VStack, WidgetId,
};

fn content() -> VStack {
    let selector = Rc::new(RefCell::new(ColorSelector::new(WidgetId(1))));
    let label = Rc::new(RefCell::new(
        Label::new(WidgetId(2), "").color(Rgba::BLACK.to_text_color()),
    ));

    let handle = label.clone();
    selector.borrow_mut().on_color_changed(move |selector| {
        let mut label = handle.borrow_mut();
        label.set_text(selector.color().to_string());
        label.set_background(Some(selector.color()));
    });
    selector.borrow_mut().set_color(Rgba::ALICE_BLUE);

    VStack::new(WidgetId(0))
        .spacing(6)
        .child(selector)
        .child(label)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (mut app, mut event_queue) = App::new()?;
    let qh = event_queue.handle();

    let window_id = app.create_window(&qh, "popkit - Popover", 800, 600);
    let popover_id =
        app.create_popover(window_id, content(), ArrowSide::Top, PopoverStyle::default())?;

    if let Some(popover) = app.popover_mut(popover_id) {
        popover.on_closed(|popover| {
            log::info!("popover closed: {:?}", popover.last_close_reason());
        });
    }

    log::info!("Click anywhere in the window to open the popover");

    while app.running {
        event_queue.blocking_dispatch(&mut app)?;

        for event in app.poll_pointer_events() {
            if event.kind == PointerEventKind::Press(PointerButton::Left) {
                let anchor = Point::new(event.x, event.y);
                match app.run_popover(&qh, popover_id, anchor) {
                    Ok(true) => log::info!("popover opened at {:?}", anchor),
                    Ok(false) => {}
                    Err(err) => log::error!("cannot open popover: {err}"),
                }
            }
        }

        if app.is_window_dirty(window_id) {
            app.render_window(window_id, |canvas| {
                canvas.clear(Rgba::rgb(40, 40, 45).to_color());
            });
            app.flush();
        }

        if app.is_popover_dirty(popover_id) {
            app.render_popover(popover_id);
            app.flush();
        }
    }

    Ok(())
}
