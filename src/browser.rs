//! [`Host`] over the page's live DOM.
//!
//! Events are real DOM events dispatched synchronously on the target. Text
//! lookups poll the container on an interval until exactly one element
//! matches or the timeout fires.

use std::cell::Cell;

use async_trait::async_trait;
use futures::future::{select, Either}; // For select pattern
use futures_util::stream::StreamExt; // For IntervalStream.next()
use gloo_timers::future::{IntervalStream, TimeoutFuture};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    console, Document, Element, Event, EventInit, FocusEvent, FocusEventInit, HtmlElement, HtmlInputElement,
    KeyboardEvent, KeyboardEventInit, MouseEvent, MouseEventInit, Node,
};

use crate::error::{Result, SelectError};
use crate::event::{KeyStroke, SyntheticEvent};
use crate::host::{Host, TextQuery};

pub const DEFAULT_TIMEOUT_MS: u32 = 1000;
pub const DEFAULT_INTERVAL_MS: u32 = 50; // Polling interval

/// [`Host`] backed by the page's live DOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserHost {
    timeout_ms: u32,
    interval_ms: u32,
}

impl Default for BrowserHost {
    fn default() -> Self {
        BrowserHost { timeout_ms: DEFAULT_TIMEOUT_MS, interval_ms: DEFAULT_INTERVAL_MS }
    }
}

impl BrowserHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long `find_by_text` keeps polling.
    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_interval(mut self, interval_ms: u32) -> Self {
        self.interval_ms = interval_ms.max(1);
        self
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    async fn poll_for_match(&self, root: &Element, query: &TextQuery, last_count: &Cell<usize>) -> Result<Element> {
        let mut interval = IntervalStream::new(self.interval_ms);
        loop {
            let matches = text_matches(root, query)?;
            if let [only] = matches.as_slice() {
                return Ok(only.clone());
            }
            last_count.set(matches.len());
            StreamExt::next(&mut interval).await;
        }
    }
}

// Helper function to get the document
fn get_document() -> Result<Document> {
    let window = web_sys::window().ok_or_else(|| SelectError::Environment { message: "Failed to get window object".to_string() })?;
    window.document().ok_or_else(|| SelectError::Environment { message: "Failed to get document object".to_string() })
}

fn describe(element: &Element) -> String {
    format!("<{}>", element.tag_name().to_lowercase())
}

fn focus_event(kind: &str, bubbles: bool) -> Result<Event> {
    let init = FocusEventInit::new();
    init.set_bubbles(bubbles);
    Ok(FocusEvent::new_with_focus_event_init_dict(kind, &init)?.into())
}

fn key_event(kind: &str, key: &KeyStroke) -> Result<Event> {
    let init = KeyboardEventInit::new();
    init.set_bubbles(true);
    init.set_cancelable(true);
    init.set_key(key.key);
    init.set_code(key.key);
    init.set_key_code(key.key_code);
    Ok(KeyboardEvent::new_with_keyboard_event_init_dict(kind, &init)?.into())
}

fn mouse_event(kind: &str) -> Result<Event> {
    let init = MouseEventInit::new();
    init.set_bubbles(true);
    init.set_cancelable(true);
    init.set_button(0);
    Ok(MouseEvent::new_with_mouse_event_init_dict(kind, &init)?.into())
}

fn plain_event(kind: &str) -> Result<Event> {
    let init = EventInit::new();
    init.set_bubbles(true);
    Ok(Event::new_with_event_init_dict(kind, &init)?)
}

fn fire(target: &Element, event: Result<Event>) -> Result<()> {
    target.dispatch_event(&event?)?;
    Ok(())
}

// Assigning `value` directly would go through any instance-level property a
// framework installed to track the input; the prototype's setter does not.
fn set_native_value(target: &Element, value: &str) -> Result<()> {
    if target.dyn_ref::<HtmlInputElement>().is_some() {
        let proto = js_sys::Object::get_prototype_of(target.as_ref());
        let descriptor = js_sys::Reflect::get_own_property_descriptor(&proto, &JsValue::from_str("value"))?;
        let setter = js_sys::Reflect::get(&descriptor, &JsValue::from_str("set"))?;
        if let Ok(setter) = setter.dyn_into::<js_sys::Function>() {
            setter.call1(target.as_ref(), &JsValue::from_str(value))?;
            return Ok(());
        }
    }
    js_sys::Reflect::set(target.as_ref(), &JsValue::from_str("value"), &JsValue::from_str(value))?;
    Ok(())
}

/// Concatenated text of the element's direct text children.
fn own_text(element: &Element) -> String {
    let children = element.child_nodes();
    let mut text = String::new();
    for i in 0..children.length() {
        if let Some(node) = children.item(i) {
            if node.node_type() == Node::TEXT_NODE {
                text.push_str(&node.text_content().unwrap_or_default());
            }
        }
    }
    text
}

fn text_matches(root: &Element, query: &TextQuery) -> Result<Vec<Element>> {
    let mut matches = Vec::new();
    for element in all_elements(root, "*")? {
        let ignored = element.matches(&query.ignore).map_err(|e| SelectError::InvalidSelector {
            selector: query.ignore.clone(),
            error: e.as_string().unwrap_or_else(|| "Unknown matches error".to_string()),
        })?;
        if !ignored && query.matcher.matches(&own_text(&element)) {
            matches.push(element);
        }
    }
    Ok(matches)
}

fn all_elements(root: &Element, selector: &str) -> Result<Vec<Element>> {
    let node_list = root.query_selector_all(selector).map_err(|e| SelectError::InvalidSelector {
        selector: selector.to_string(),
        error: e.as_string().unwrap_or_else(|| "Unknown querySelectorAll error".to_string()),
    })?;

    let mut elements = Vec::new();
    for i in 0..node_list.length() {
        if let Some(node) = node_list.item(i) {
            if let Some(element) = node.dyn_ref::<Element>() {
                elements.push(element.clone());
            }
        }
    }
    Ok(elements)
}

#[async_trait(?Send)]
impl Host for BrowserHost {
    type Node = Element;

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn dispatch(&self, target: &Element, event: &SyntheticEvent) -> Result<()> {
        if !target.is_connected() {
            return Err(SelectError::Environment {
                message: format!("cannot dispatch {} on detached {}", event.kind(), describe(target)),
            });
        }
        console::log_1(&format!("Dispatching '{}' on {}", event.kind(), describe(target)).into());

        match event {
            SyntheticEvent::Focus => {
                fire(target, focus_event("focus", false))?;
                fire(target, focus_event("focusin", true))
            }
            SyntheticEvent::KeyDown(key) => fire(target, key_event("keydown", key)),
            SyntheticEvent::Change { value } => {
                set_native_value(target, value)?;
                fire(target, plain_event("input"))?;
                fire(target, plain_event("change"))
            }
            SyntheticEvent::MouseDown => fire(target, mouse_event("mousedown")),
            SyntheticEvent::Click => fire(target, mouse_event("click")),
            SyntheticEvent::Blur => {
                let node: &Node = target;
                let focused = get_document()?
                    .active_element()
                    .map_or(false, |active| active.is_same_node(Some(node)));
                match target.dyn_ref::<HtmlElement>() {
                    // A real blur fires blur and focusout itself.
                    Some(element) if focused => Ok(element.blur()?),
                    _ => {
                        fire(target, focus_event("blur", false))?;
                        fire(target, focus_event("focusout", true))
                    }
                }
            }
        }
    }

    fn query_all(&self, root: &Element, selector: &str) -> Result<Vec<Element>> {
        all_elements(root, selector)
    }

    async fn find_by_text(&self, root: &Element, query: &TextQuery) -> Result<Element> {
        let label = query.label();
        console::log_1(&format!("Waiting for '{}' (ignoring '{}')", label, query.ignore).into());

        let last_count = Cell::new(0);
        let main_future = self.poll_for_match(root, query, &last_count);
        let timeout_event = TimeoutFuture::new(self.timeout_ms);

        // Bound to a local so the race drops before `last_count`.
        let outcome = match select(Box::pin(main_future), timeout_event).await {
            Either::Left((result, _)) => result,
            Either::Right((_, _)) => {
                let message = match last_count.get() {
                    0 => format!("NotFound: '{}' not found after {}ms timeout", label, self.timeout_ms),
                    n => format!(
                        "NotFound: {} elements match '{}', expected one, after {}ms timeout",
                        n, label, self.timeout_ms
                    ),
                };
                console::warn_1(&message.clone().into());
                Err(SelectError::NotFound { label, message: Some(message) })
            }
        };
        outcome
    }

    async fn settle(&self) {
        TimeoutFuture::new(0).await;
    }
}
