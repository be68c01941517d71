//! Events handed from the core to command consumers.

use mi_client::Notification;

use crate::error::EventError;

/// Outcome forwarded by a command that waits on MI events.
///
/// A command either yields the notification it was waiting for or the error
/// that ended it.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandEvent {
    /// The command failed
    Error(String),
    /// An event was delivered
    Event(Notification),
}

impl CommandEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, CommandEvent::Error(_))
    }

    /// The delivered notification, if any.
    pub fn notification(&self) -> Option<&Notification> {
        match self {
            CommandEvent::Event(notification) => Some(notification),
            CommandEvent::Error(_) => None,
        }
    }
}

impl From<Notification> for CommandEvent {
    fn from(notification: Notification) -> Self {
        CommandEvent::Event(notification)
    }
}

impl From<EventError> for CommandEvent {
    fn from(error: EventError) -> Self {
        CommandEvent::Error(error.to_string())
    }
}
