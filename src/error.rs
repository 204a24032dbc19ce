//! Errors reported when creating windows and popovers.

use std::fmt;

use smithay_client_toolkit::error::GlobalError;

use crate::popover::PopoverId;
use crate::window::WindowId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No window with this id is known to the application.
    WindowNotFound(WindowId),
    /// The window exists but has already been destroyed.
    ParentDestroyed(WindowId),
    /// No popover with this id is known to the application.
    PopoverNotFound(PopoverId),
    /// The platform could not create a native surface.
    Platform(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Error::WindowNotFound(id) => write!(f, "window {} does not exist", id.0),
            Error::ParentDestroyed(id) => {
                write!(f, "window {} has already been destroyed", id.0)
            }
            Error::PopoverNotFound(id) => write!(f, "popover {} does not exist", id.0),
            Error::Platform(msg) => write!(f, "platform error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<GlobalError> for Error {
    fn from(src: GlobalError) -> Error {
        Error::Platform(src.to_string())
    }
}
