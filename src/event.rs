//! Primitive input events and the helpers that fire them.
//!
//! Each helper dispatches exactly one [`SyntheticEvent`] through
//! [`Host::dispatch`] and returns whatever the host reports. Nothing here
//! waits or retries.

use crate::error::Result;
use crate::host::Host;

/// A key identifier together with its legacy numeric key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub key: &'static str,
    pub key_code: u32,
}

/// Pressing this while the input is focused opens the option menu.
pub const ARROW_DOWN: KeyStroke = KeyStroke { key: "ArrowDown", key_code: 40 };

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntheticEvent {
    Focus,
    KeyDown(KeyStroke),
    /// The input's text changed to `value`, as if the user typed it.
    Change { value: String },
    MouseDown,
    Click,
    Blur,
}

impl SyntheticEvent {
    /// DOM event type name.
    pub fn kind(&self) -> &'static str {
        match self {
            SyntheticEvent::Focus => "focus",
            SyntheticEvent::KeyDown(_) => "keydown",
            SyntheticEvent::Change { .. } => "change",
            SyntheticEvent::MouseDown => "mousedown",
            SyntheticEvent::Click => "click",
            SyntheticEvent::Blur => "blur",
        }
    }
}

fn fire<H: Host + ?Sized>(host: &H, target: &H::Node, event: SyntheticEvent) -> Result<()> {
    tracing::trace!(kind = event.kind(), target = ?target, "dispatching event");
    host.dispatch(target, &event)
}

pub fn focus<H: Host + ?Sized>(host: &H, target: &H::Node) -> Result<()> {
    fire(host, target, SyntheticEvent::Focus)
}

pub fn key_down<H: Host + ?Sized>(host: &H, target: &H::Node, key: KeyStroke) -> Result<()> {
    fire(host, target, SyntheticEvent::KeyDown(key))
}

pub fn change<H: Host + ?Sized>(host: &H, target: &H::Node, value: &str) -> Result<()> {
    fire(host, target, SyntheticEvent::Change { value: value.to_string() })
}

pub fn mouse_down<H: Host + ?Sized>(host: &H, target: &H::Node) -> Result<()> {
    fire(host, target, SyntheticEvent::MouseDown)
}

pub fn click<H: Host + ?Sized>(host: &H, target: &H::Node) -> Result<()> {
    fire(host, target, SyntheticEvent::Click)
}

pub fn blur<H: Host + ?Sized>(host: &H, target: &H::Node) -> Result<()> {
    fire(host, target, SyntheticEvent::Blur)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kinds_match_dom_names() {
        assert_eq!(SyntheticEvent::Focus.kind(), "focus");
        assert_eq!(SyntheticEvent::KeyDown(ARROW_DOWN).kind(), "keydown");
        assert_eq!(SyntheticEvent::Change { value: "x".to_string() }.kind(), "change");
        assert_eq!(SyntheticEvent::MouseDown.kind(), "mousedown");
        assert_eq!(SyntheticEvent::Click.kind(), "click");
        assert_eq!(SyntheticEvent::Blur.kind(), "blur");
    }

    #[test]
    fn test_arrow_down_key_code() {
        assert_eq!(ARROW_DOWN.key, "ArrowDown");
        assert_eq!(ARROW_DOWN.key_code, 40);
    }
}
