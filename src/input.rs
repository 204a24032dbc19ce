use smithay_client_toolkit::seat::keyboard::Keysym;

#[derive(Clone, Debug)]
pub struct KeyEvent {
    pub key: Key,
    pub text: Option<String>,
    pub modifiers: Modifiers,
    pub state: KeyState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub super_: bool,
}

/// Keys widgets react to. Everything else is carried as its raw keysym.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Escape,
    Tab,
    Space,

    Shift,
    Control,
    Alt,
    Super,

    Unknown(u32),
}

impl Key {
    pub fn from_keysym(keysym: u32) -> Self {
        match keysym {
            x if x == Keysym::Up.raw() => Key::Up,
            x if x == Keysym::Down.raw() => Key::Down,
            x if x == Keysym::Left.raw() => Key::Left,
            x if x == Keysym::Right.raw() => Key::Right,

            x if x == Keysym::Return.raw() => Key::Enter,
            x if x == Keysym::Escape.raw() => Key::Escape,
            x if x == Keysym::Tab.raw() => Key::Tab,
            x if x == Keysym::space.raw() => Key::Space,

            x if x == Keysym::Shift_L.raw() || x == Keysym::Shift_R.raw() => Key::Shift,
            x if x == Keysym::Control_L.raw() || x == Keysym::Control_R.raw() => Key::Control,
            x if x == Keysym::Alt_L.raw() || x == Keysym::Alt_R.raw() => Key::Alt,
            x if x == Keysym::Super_L.raw() || x == Keysym::Super_R.raw() => Key::Super,

            _ => Key::Unknown(keysym),
        }
    }

    pub fn is_modifier(&self) -> bool {
        matches!(self, Key::Shift | Key::Control | Key::Alt | Key::Super)
    }
}

#[derive(Clone, Debug)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerEventKind {
    Enter,
    Leave,
    Motion,
    Press(PointerButton),
    Release(PointerButton),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
    Other(u32),
}

impl PointerButton {
    /// Maps a Linux input event code (`BTN_*`).
    pub fn from_code(code: u32) -> Self {
        match code {
            272 => PointerButton::Left,
            273 => PointerButton::Right,
            274 => PointerButton::Middle,
            other => PointerButton::Other(other),
        }
    }
}
