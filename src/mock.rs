//! In-memory document hosting one scripted searchable select.
//!
//! [`MockDocument`] implements [`Host`] without a browser. Its widget reacts
//! to events the way a react-select style widget does, but only re-renders when
//! the document is flushed (on [`Host::settle`], on every
//! [`Host::find_by_text`] poll, or explicitly through
//! [`MockDocument::flush`]), which reproduces the gap between dispatching an
//! event and seeing its effect.
//!
//! Markup, with the input four levels below the container:
//!
//! ```text
//! div.select                           container
//!   span[aria-live]  > span            highlighted option, announced
//!   div.control
//!     div.value-container
//!       div.single-value | div.multi-value > (label, remove > svg)
//!       div.input-wrapper > input
//!     div.indicators
//!       div.clear-indicator > svg      only while values are selected
//!       div.dropdown-indicator > svg
//!   div.menu > div.option[tabindex]    or inside div.portal when portaled
//! ```

use std::cell::RefCell;
use std::fmt;

use async_trait::async_trait;

use crate::error::{Result, SelectError};
use crate::event::SyntheticEvent;
use crate::host::{normalize_text, Host, TextMatch, TextQuery};

const DEFAULT_POLL_BUDGET: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Default)]
struct NodeData {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    detached: bool,
}

/// Widget description and builder.
#[derive(Debug, Clone)]
pub struct MockSelect {
    options: Vec<String>,
    selected: Vec<String>,
    multi: bool,
    creatable: bool,
    clearable: bool,
    portal: bool,
    create_label: String,
    render_delay: usize,
    poll_budget: usize,
}

impl MockSelect {
    pub fn new<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockSelect {
            options: options.into_iter().map(Into::into).collect(),
            selected: Vec::new(),
            multi: false,
            creatable: false,
            clearable: true,
            portal: false,
            create_label: "Create".to_string(),
            render_delay: 0,
            poll_budget: DEFAULT_POLL_BUDGET,
        }
    }

    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }

    pub fn creatable(mut self, creatable: bool) -> Self {
        self.creatable = creatable;
        self
    }

    pub fn clearable(mut self, clearable: bool) -> Self {
        self.clearable = clearable;
        self
    }

    /// Render the menu into a separate root under `<body>`.
    pub fn portal(mut self, portal: bool) -> Self {
        self.portal = portal;
        self
    }

    /// Word in front of the quoted text on the create menu item.
    pub fn create_label(mut self, label: impl Into<String>) -> Self {
        self.create_label = label.into();
        self
    }

    /// Flushes the menu needs after opening before options show up.
    pub fn render_delay(mut self, flushes: usize) -> Self {
        self.render_delay = flushes;
        self
    }

    /// Polls a text lookup makes before giving up.
    pub fn poll_budget(mut self, polls: usize) -> Self {
        self.poll_budget = polls;
        self
    }

    pub fn selected<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected = values.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Existing(String),
    Create(String),
}

impl Entry {
    fn value(&self) -> &str {
        match self {
            Entry::Existing(label) | Entry::Create(label) => label,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Role {
    Input,
    Option(Entry),
    Remove(String),
    ClearAll,
    Arrow,
}

#[derive(Debug, Default)]
struct WidgetState {
    values: Vec<String>,
    focused: bool,
    menu_open: bool,
    menu_age: usize,
    input_value: String,
    highlighted: usize,
    pending_refocus: bool,
}

struct Dom {
    nodes: Vec<NodeData>,
    roles: Vec<(NodeId, Role)>,
    widget: MockSelect,
    state: WidgetState,
    body: NodeId,
    container: NodeId,
    live_region: NodeId,
    value_container: NodeId,
    input_wrapper: NodeId,
    input: NodeId,
    indicators: NodeId,
    menu_root: NodeId,
    menu: Option<NodeId>,
    log: Vec<(NodeId, SyntheticEvent)>,
    queries: Vec<String>,
}

impl Dom {
    fn create(&mut self, tag: &str, attrs: &[(&str, &str)], text: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            tag: tag.to_string(),
            attrs: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            text: text.to_string(),
            ..NodeData::default()
        });
        id
    }

    fn append(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    fn element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)], text: &str) -> NodeId {
        let id = self.create(tag, attrs, text);
        self.append(parent, id);
        id
    }

    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
        self.mark_detached(id);
    }

    fn mark_detached(&mut self, id: NodeId) {
        self.nodes[id.0].detached = true;
        let children = self.nodes[id.0].children.clone();
        for child in children {
            self.mark_detached(child);
        }
    }

    fn clear_children(&mut self, parent: NodeId, keep: Option<NodeId>) {
        let children = self.nodes[parent.0].children.clone();
        for child in children {
            if Some(child) != keep {
                self.detach(child);
            }
        }
    }

    fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.node(id).attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
    }

    fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let attrs = &mut self.nodes[id.0].attrs;
        match attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
    }

    /// Elements below `root` in document order, `root` excluded.
    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(root).children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    fn role(&self, id: NodeId) -> Option<&Role> {
        self.roles.iter().find(|(node, _)| *node == id).map(|(_, role)| role)
    }

    fn visible_entries(&self) -> Vec<Entry> {
        let filter = self.state.input_value.to_lowercase();
        let mut entries: Vec<Entry> = self
            .widget
            .options
            .iter()
            .filter(|o| !(self.widget.multi && self.state.values.contains(*o)))
            .filter(|o| o.to_lowercase().contains(&filter))
            .map(|o| Entry::Existing(o.clone()))
            .collect();
        let typed = self.state.input_value.trim();
        if self.widget.creatable
            && !typed.is_empty()
            && !self.widget.options.iter().any(|o| o.eq_ignore_ascii_case(typed))
        {
            entries.push(Entry::Create(typed.to_string()));
        }
        entries
    }

    fn entry_text(&self, entry: &Entry) -> String {
        match entry {
            Entry::Existing(label) => label.clone(),
            Entry::Create(text) => format!("{} \"{}\"", self.widget.create_label, text),
        }
    }

    fn open_menu(&mut self) {
        if !self.state.menu_open {
            self.state.menu_open = true;
            self.state.menu_age = 0;
            self.state.highlighted = 0;
        }
    }

    fn close_menu(&mut self) {
        self.state.menu_open = false;
        self.state.menu_age = 0;
    }

    fn choose(&mut self, entry: Entry) {
        if let Entry::Create(text) = &entry {
            self.widget.options.push(text.clone());
        }
        let value = entry.value().to_string();
        if self.widget.multi {
            if !self.state.values.contains(&value) {
                self.state.values.push(value);
            }
        } else {
            self.state.values = vec![value];
        }
        self.state.input_value.clear();
        self.close_menu();
    }

    fn react(&mut self, target: NodeId, event: &SyntheticEvent) {
        let Some(role) = self.role(target).cloned() else {
            return;
        };
        match (role, event) {
            (Role::Input, SyntheticEvent::Focus) => self.state.focused = true,
            (Role::Input, SyntheticEvent::Blur) => {
                self.state.focused = false;
                self.state.input_value.clear();
                self.close_menu();
            }
            (Role::Input, SyntheticEvent::KeyDown(key)) if key.key == "ArrowDown" => {
                if self.state.focused {
                    self.open_menu();
                }
            }
            (Role::Input, SyntheticEvent::Change { value }) => {
                self.state.input_value = value.clone();
                self.open_menu();
                self.state.highlighted = 0;
            }
            (Role::Option(entry), SyntheticEvent::Click) => self.choose(entry),
            (Role::Remove(value), SyntheticEvent::Click) => self.state.values.retain(|v| *v != value),
            (Role::ClearAll, SyntheticEvent::MouseDown) => {
                self.state.values.clear();
                self.close_menu();
                self.state.pending_refocus = true;
            }
            (Role::Arrow, SyntheticEvent::MouseDown) => {
                self.state.focused = true;
                if self.state.menu_open {
                    self.close_menu();
                } else {
                    self.open_menu();
                }
            }
            _ => {}
        }
    }

    fn flush(&mut self) {
        if self.state.pending_refocus {
            self.state.pending_refocus = false;
            self.state.focused = true;
        }
        if self.state.menu_open {
            self.state.menu_age += 1;
        }
        self.render();
    }

    fn render(&mut self) {
        let input_value = self.state.input_value.clone();
        self.set_attribute(self.input, "value", &input_value);
        self.roles.retain(|(_, role)| *role == Role::Input);

        let (value_container, input_wrapper) = (self.value_container, self.input_wrapper);
        self.clear_children(value_container, Some(input_wrapper));
        self.nodes[value_container.0].children.clear();
        for value in self.state.values.clone() {
            if self.widget.multi {
                let chip = self.create("div", &[("class", "multi-value")], "");
                self.append(value_container, chip);
                self.element(chip, "div", &[("class", "multi-value-label")], &value);
                let remove = self.element(chip, "div", &[("class", "multi-value-remove")], "");
                let icon = self.element(remove, "svg", &[("aria-hidden", "true")], "");
                self.roles.push((icon, Role::Remove(value)));
            } else {
                let single = self.create("div", &[("class", "single-value")], &value);
                self.append(value_container, single);
            }
        }
        self.append(value_container, input_wrapper);

        let indicators = self.indicators;
        self.clear_children(indicators, None);
        if self.widget.clearable && !self.state.values.is_empty() {
            let clear = self.element(indicators, "div", &[("class", "clear-indicator")], "");
            let icon = self.element(clear, "svg", &[("aria-hidden", "true")], "");
            self.roles.push((icon, Role::ClearAll));
        }
        let dropdown = self.element(indicators, "div", &[("class", "dropdown-indicator")], "");
        let arrow = self.element(dropdown, "svg", &[("aria-hidden", "true")], "");
        self.roles.push((arrow, Role::Arrow));

        let live_region = self.live_region;
        self.clear_children(live_region, None);
        if let Some(menu) = self.menu.take() {
            self.detach(menu);
        }
        if !self.state.menu_open {
            return;
        }

        let menu_root = self.menu_root;
        let menu = self.element(menu_root, "div", &[("class", "menu")], "");
        self.menu = Some(menu);
        if self.state.menu_age < self.widget.render_delay {
            self.element(menu, "div", &[("class", "menu-notice")], "Loading...");
            return;
        }
        let entries = self.visible_entries();
        if entries.is_empty() {
            self.element(menu, "div", &[("class", "menu-notice")], "No options");
            return;
        }
        for (i, entry) in entries.iter().enumerate() {
            let text = self.entry_text(entry);
            let id = format!("option-{}", i);
            let option = self.element(menu, "div", &[("class", "option"), ("id", id.as_str()), ("tabindex", "-1")], &text);
            self.roles.push((option, Role::Option(entry.clone())));
        }
        let highlighted = self.state.highlighted.min(entries.len() - 1);
        let announced = self.entry_text(&entries[highlighted]);
        self.element(live_region, "span", &[], &announced);
    }

    fn text_matches(&self, root: NodeId, query: &TextQuery) -> Result<Vec<NodeId>> {
        let ignore = SelectorList::parse(&query.ignore)?;
        Ok(self
            .descendants(root)
            .into_iter()
            .filter(|id| !ignore.matches(self, *id))
            .filter(|id| query.matcher.matches(&self.node(*id).text))
            .collect())
    }
}

/// A [`Host`] over an in-memory tree holding a single [`MockSelect`].
pub struct MockDocument {
    dom: RefCell<Dom>,
}

impl fmt::Debug for MockDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dom = self.dom.borrow();
        f.debug_struct("MockDocument")
            .field("nodes", &dom.nodes.len())
            .field("state", &dom.state)
            .finish()
    }
}

impl MockDocument {
    pub fn new(widget: MockSelect) -> Self {
        let mut dom = Dom {
            nodes: Vec::new(),
            roles: Vec::new(),
            state: WidgetState { values: widget.selected.clone(), ..WidgetState::default() },
            widget,
            body: NodeId(0),
            container: NodeId(0),
            live_region: NodeId(0),
            value_container: NodeId(0),
            input_wrapper: NodeId(0),
            input: NodeId(0),
            indicators: NodeId(0),
            menu_root: NodeId(0),
            menu: None,
            log: Vec::new(),
            queries: Vec::new(),
        };
        let body = dom.create("body", &[], "");
        let container = dom.element(body, "div", &[("class", "select")], "");
        let live_region = dom.element(container, "span", &[("aria-live", "polite")], "");
        let control = dom.element(container, "div", &[("class", "control")], "");
        let value_container = dom.element(control, "div", &[("class", "value-container")], "");
        let input_wrapper = dom.element(value_container, "div", &[("class", "input-wrapper")], "");
        let input = dom.element(input_wrapper, "input", &[("type", "text"), ("value", "")], "");
        let indicators = dom.element(control, "div", &[("class", "indicators")], "");
        let menu_root = if dom.widget.portal {
            dom.element(body, "div", &[("class", "portal")], "")
        } else {
            container
        };
        dom.roles.push((input, Role::Input));
        dom.body = body;
        dom.container = container;
        dom.live_region = live_region;
        dom.value_container = value_container;
        dom.input_wrapper = input_wrapper;
        dom.input = input;
        dom.indicators = indicators;
        dom.menu_root = menu_root;
        dom.render();
        MockDocument { dom: RefCell::new(dom) }
    }

    pub fn input(&self) -> NodeId {
        self.dom.borrow().input
    }

    pub fn body(&self) -> NodeId {
        self.dom.borrow().body
    }

    pub fn container(&self) -> NodeId {
        self.dom.borrow().container
    }

    /// An input nested one level deep in a fragment outside the document.
    pub fn orphan_input(&self) -> NodeId {
        let mut dom = self.dom.borrow_mut();
        let wrapper = dom.create("div", &[], "");
        dom.element(wrapper, "input", &[("type", "text")], "")
    }

    /// Run pending widget work and re-render.
    pub fn flush(&self) {
        self.dom.borrow_mut().flush();
    }

    pub fn detach(&self, node: NodeId) {
        self.dom.borrow_mut().detach(node);
    }

    pub fn values(&self) -> Vec<String> {
        self.dom.borrow().state.values.clone()
    }

    pub fn is_menu_open(&self) -> bool {
        self.dom.borrow().state.menu_open
    }

    pub fn is_focused(&self) -> bool {
        self.dom.borrow().state.focused
    }

    pub fn input_value(&self) -> String {
        self.dom.borrow().state.input_value.clone()
    }

    /// Text currently announced by the live region.
    pub fn live_region_text(&self) -> Option<String> {
        let dom = self.dom.borrow();
        dom.node(dom.live_region).children.first().map(|c| dom.node(*c).text.clone())
    }

    /// Every element in the document whose own text is `text`, accessible or not.
    pub fn elements_with_text(&self, text: &str) -> Vec<NodeId> {
        let dom = self.dom.borrow();
        let matcher = TextMatch::from(text);
        dom.descendants(dom.body)
            .into_iter()
            .filter(|id| matcher.matches(&dom.node(*id).text))
            .collect()
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.dom.borrow().attribute(node, name)
    }

    /// Every event dispatched so far, in order.
    pub fn dispatched(&self) -> Vec<(NodeId, SyntheticEvent)> {
        self.dom.borrow().log.clone()
    }

    /// Labels of every text lookup so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.dom.borrow().queries.clone()
    }
}

#[async_trait(?Send)]
impl Host for MockDocument {
    type Node = NodeId;

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.dom.borrow().node(*node).parent
    }

    fn dispatch(&self, target: &NodeId, event: &SyntheticEvent) -> Result<()> {
        let mut dom = self.dom.borrow_mut();
        if dom.node(*target).detached {
            return Err(SelectError::Environment {
                message: format!("cannot dispatch {} on detached node {:?}", event.kind(), target),
            });
        }
        tracing::trace!(kind = event.kind(), ?target, "mock dispatch");
        dom.log.push((*target, event.clone()));
        dom.react(*target, event);
        Ok(())
    }

    fn query_all(&self, root: &NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let dom = self.dom.borrow();
        let selector = SelectorList::parse(selector)?;
        Ok(dom.descendants(*root).into_iter().filter(|id| selector.matches(&dom, *id)).collect())
    }

    async fn find_by_text(&self, root: &NodeId, query: &TextQuery) -> Result<NodeId> {
        let label = query.label();
        let budget = {
            let mut dom = self.dom.borrow_mut();
            dom.queries.push(label.clone());
            dom.widget.poll_budget
        };
        let mut last = 0;
        for _ in 0..budget {
            let mut dom = self.dom.borrow_mut();
            dom.flush();
            let matches = dom.text_matches(*root, query)?;
            if let [only] = matches.as_slice() {
                return Ok(*only);
            }
            last = matches.len();
        }
        let message = (last > 1).then(|| format!("Found multiple elements with the text: {}", label));
        Err(SelectError::NotFound { label, message })
    }

    async fn settle(&self) {
        self.dom.borrow_mut().flush();
    }
}

/// The selector subset the mock understands: tag names, `*`, `[attr]`,
/// `[attr="value"]`, `:not(...)` and comma-separated lists.
#[derive(Debug, Clone, PartialEq)]
struct SelectorList(Vec<Compound>);

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    tag: Option<String>,
    attrs: Vec<(String, Option<String>)>,
    negations: Vec<SelectorList>,
}

impl SelectorList {
    fn parse(selector: &str) -> Result<Self> {
        let invalid = |error: &str| SelectError::InvalidSelector {
            selector: selector.to_string(),
            error: error.to_string(),
        };
        let mut compounds = Vec::new();
        for part in split_top_level(selector) {
            let part = part.trim();
            if part.is_empty() {
                return Err(invalid("empty selector"));
            }
            compounds.push(Compound::parse(part).map_err(|e| invalid(&e))?);
        }
        Ok(SelectorList(compounds))
    }

    fn matches(&self, dom: &Dom, id: NodeId) -> bool {
        self.0.iter().any(|c| c.matches(dom, id))
    }
}

impl Compound {
    fn parse(mut rest: &str) -> std::result::Result<Self, String> {
        let mut compound = Compound::default();
        let tag_len = rest.find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '*')).unwrap_or(rest.len());
        if tag_len > 0 {
            let tag = &rest[..tag_len];
            if tag != "*" {
                compound.tag = Some(tag.to_ascii_lowercase());
            }
            rest = &rest[tag_len..];
        }
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('[') {
                let end = after.find(']').ok_or("unterminated attribute selector")?;
                let body = &after[..end];
                let attr = match body.split_once('=') {
                    Some((name, value)) => {
                        (name.trim().to_string(), Some(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string()))
                    }
                    None => (body.trim().to_string(), None),
                };
                compound.attrs.push(attr);
                rest = &after[end + 1..];
            } else if let Some(after) = rest.strip_prefix(":not(") {
                let end = closing_paren(after).ok_or("unterminated :not(")?;
                let inner = SelectorList::parse(&after[..end]).map_err(|e| e.to_string())?;
                compound.negations.push(inner);
                rest = &after[end + 1..];
            } else {
                return Err(format!("unsupported selector syntax at '{}'", rest));
            }
        }
        Ok(compound)
    }

    fn matches(&self, dom: &Dom, id: NodeId) -> bool {
        let node = dom.node(id);
        if let Some(tag) = &self.tag {
            if node.tag != *tag {
                return false;
            }
        }
        let attrs_ok = self.attrs.iter().all(|(name, value)| match (dom.attribute(id, name), value) {
            (Some(actual), Some(expected)) => actual == *expected,
            (Some(_), None) => true,
            (None, _) => false,
        });
        attrs_ok && self.negations.iter().all(|n| !n.matches(dom, id))
    }
}

fn split_top_level(selector: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let (mut depth, mut quote, mut start) = (0usize, None, 0);
    for (i, c) in selector.char_indices() {
        match (c, quote) {
            ('"' | '\'', None) => quote = Some(c),
            (q, Some(open)) if q == open => quote = None,
            (_, Some(_)) => {}
            ('(' | '[', None) => depth += 1,
            (')' | ']', None) => depth = depth.saturating_sub(1),
            (',', None) if depth == 0 => {
                parts.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&selector[start..]);
    parts
}

fn closing_paren(s: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Own text of `node`, for assertions on rendered labels.
pub fn text_of(doc: &MockDocument, node: NodeId) -> String {
    normalize_text(&doc.dom.borrow().node(node).text)
}
