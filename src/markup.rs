//! In-memory `<select>` built from markup.
//!
//! Stands in for a live document: it answers the coordinator's queries,
//! applies its writes, and records every event the coordinator synthesizes so
//! a replay or a test can inspect the order afterwards.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};

use kuchiki::traits::*;
use kuchiki::{parse_html, NodeRef};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::control::{
    ComputedStyle, ContentState, DocumentId, ElementInfo, ElementKind, Listener, MouseEventKind,
    NodeId, PseudoClass, ScreenRect, SelectControl,
};

// html5ever drops `<hr>` and most other markup inside `<select>`, so the
// control is parsed under a neutral name.
const SELECT_TAG: &str = "frontier-select";

const SYSTEM_SCHEMES: &[&str] = &["about", "chrome", "resource"];

const UA_DEFAULTS: &[(&str, &str)] = &[
    ("display", "block"),
    ("direction", "ltr"),
    ("color", "rgb(0, 0, 0)"),
    ("background-color", "rgba(0, 0, 0, 0)"),
    ("text-shadow", "none"),
    ("text-transform", "none"),
    ("font-family", "sans-serif"),
    ("font-weight", "400"),
    ("font-size", "16px"),
    ("font-style", "normal"),
    ("scrollbar-width", "auto"),
    ("scrollbar-color", "auto"),
];

const INHERITED: &[&str] = &[
    "direction",
    "color",
    "text-shadow",
    "text-transform",
    "font-family",
    "font-weight",
    "font-size",
    "font-style",
    "scrollbar-color",
];

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("markup contains no <select> element")]
    MissingSelect,
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("the <select> element cannot be removed")]
    RemoveRoot,
}

/// Something the coordinator did to the control, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlEvent {
    Mouse {
        target: NodeId,
        event: MouseEventKind,
        pointer: bool,
    },
    ContentState {
        state: ContentState,
        set: bool,
        clear_active_document: bool,
    },
    FinishedInteracting {
        changed: bool,
        handling_user_input: bool,
    },
}

#[derive(Debug, Clone)]
struct MarkupNode {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl MarkupNode {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    fn kind(&self) -> ElementKind {
        match self.tag.as_str() {
            "option" => ElementKind::Option,
            "optgroup" => ElementKind::OptGroup,
            "hr" => ElementKind::Separator,
            _ => ElementKind::Other,
        }
    }
}

#[derive(Debug, Default)]
struct MarkupDom {
    nodes: Vec<Option<MarkupNode>>,
    /// The selected option element; its index moves as siblings come and go.
    selected: Option<NodeId>,
}

impl MarkupDom {
    fn node(&self, id: NodeId) -> Option<&MarkupNode> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MarkupNode, MarkupError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(MarkupError::UnknownNode(id))
    }

    fn insert(&mut self, node: MarkupNode) -> NodeId {
        let id = self.nodes.len();
        if let Some(parent) = node.parent {
            if let Some(Some(parent_node)) = self.nodes.get_mut(parent) {
                parent_node.children.push(id);
            }
        }
        self.nodes.push(Some(node));
        id
    }

    /// `select.options`: options directly under the select or under one of its groups.
    fn options(&self) -> Vec<NodeId> {
        let mut options = Vec::new();
        let Some(root) = self.node(0) else {
            return options;
        };
        for &child in &root.children {
            let Some(node) = self.node(child) else {
                continue;
            };
            match node.kind() {
                ElementKind::Option => options.push(child),
                ElementKind::OptGroup => options.extend(
                    node.children
                        .iter()
                        .copied()
                        .filter(|id| {
                            self.node(*id).map(MarkupNode::kind) == Some(ElementKind::Option)
                        }),
                ),
                _ => {}
            }
        }
        options
    }

    fn option_index(&self, id: NodeId) -> Option<u32> {
        self.options()
            .iter()
            .position(|option| *option == id)
            .map(|index| index as u32)
    }

    fn selected_index(&self) -> i32 {
        self.selected
            .and_then(|id| self.option_index(id))
            .map(|index| index as i32)
            .unwrap_or(-1)
    }

    /// Fall back to the first option once the selected one left the tree.
    fn reset_selection(&mut self) {
        if self.selected.map_or(true, |id| self.option_index(id).is_none()) {
            self.selected = self.options().first().copied();
        }
    }

    fn computed_style(&self, id: NodeId, author: bool) -> ComputedStyle {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(node) = self.node(current) else {
                break;
            };
            chain.push(node);
            cursor = node.parent;
        }

        let mut values: BTreeMap<&str, String> = UA_DEFAULTS
            .iter()
            .map(|(property, value)| (*property, value.to_string()))
            .collect();

        for (depth, node) in chain.iter().rev().enumerate() {
            if depth > 0 {
                for (property, value) in UA_DEFAULTS {
                    if !INHERITED.contains(property) {
                        values.insert(*property, value.to_string());
                    }
                }
            }
            if !author {
                continue;
            }
            for (property, value) in parse_declarations(node.attribute("style").unwrap_or("")) {
                if let Some((known, _)) = UA_DEFAULTS.iter().find(|(name, _)| *name == property) {
                    values.insert(*known, value);
                }
            }
        }

        let used_font_size = values
            .get("font-size")
            .and_then(|size| size.strip_suffix("px"))
            .and_then(|size| size.trim().parse::<f64>().ok())
            .unwrap_or(-1.0);

        let mut style = ComputedStyle::new(used_font_size);
        for (property, value) in values {
            style.set(property, value);
        }
        style
    }
}

pub struct MarkupSelect {
    dom: RefCell<MarkupDom>,
    document: DocumentId,
    url: Url,
    rect: Cell<ScreenRect>,
    open_in_parent_process: Cell<bool>,
    handling_user_input: Cell<bool>,
    pseudo_locks: RefCell<Vec<PseudoClass>>,
    content_states: RefCell<HashSet<ContentState>>,
    listeners: RefCell<HashSet<Listener>>,
    log: RefCell<Vec<ControlEvent>>,
}

impl MarkupSelect {
    /// Build a control from the first `<select>` in `html`.
    pub fn parse(html: &str, url: Url, document: DocumentId) -> Result<Self, MarkupError> {
        let parsed = parse_html().one(rename_select_tags(html));
        let select = parsed
            .select_first(SELECT_TAG)
            .map_err(|_| MarkupError::MissingSelect)?;

        let mut dom = MarkupDom::default();
        collect_node(&mut dom, select.as_node(), None);

        let options = dom.options();
        dom.selected = options
            .iter()
            .rev()
            .find(|id| dom.node(**id).is_some_and(|node| node.has_attribute("selected")))
            .or(options.first())
            .copied();

        Ok(Self {
            dom: RefCell::new(dom),
            document,
            url,
            rect: Cell::new(ScreenRect {
                x: 0.0,
                y: 0.0,
                width: 120.0,
                height: 24.0,
            }),
            open_in_parent_process: Cell::new(false),
            handling_user_input: Cell::new(false),
            pseudo_locks: RefCell::new(Vec::new()),
            content_states: RefCell::new(HashSet::new()),
            listeners: RefCell::new(HashSet::new()),
            log: RefCell::new(Vec::new()),
        })
    }

    pub fn set_bounding_rect(&self, rect: ScreenRect) {
        self.rect.set(rect);
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        let dom = self.dom.borrow();
        dom.nodes.iter().enumerate().find_map(|(node_id, node)| {
            node.as_ref()
                .filter(|node| node.attribute("id") == Some(id))
                .map(|_| node_id)
        })
    }

    pub fn options(&self) -> Vec<NodeId> {
        self.dom.borrow().options()
    }

    pub fn append_element(
        &self,
        parent: NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> Result<NodeId, MarkupError> {
        let mut dom = self.dom.borrow_mut();
        dom.node_mut(parent)?;
        let node = MarkupNode {
            tag: tag.to_ascii_lowercase(),
            attributes: attributes
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            text: text.to_string(),
            parent: Some(parent),
            children: Vec::new(),
        };
        let id = dom.insert(node);
        if dom.selected.is_none() {
            dom.reset_selection();
        }
        Ok(id)
    }

    pub fn remove(&self, node: NodeId) -> Result<(), MarkupError> {
        if node == 0 {
            return Err(MarkupError::RemoveRoot);
        }
        let mut dom = self.dom.borrow_mut();
        let parent = dom.node_mut(node)?.parent;
        if let Some(parent) = parent {
            dom.node_mut(parent)?.children.retain(|child| *child != node);
        }
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            if let Some(removed) = dom.nodes.get_mut(current).and_then(Option::take) {
                pending.extend(removed.children);
            }
        }
        dom.reset_selection();
        Ok(())
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), MarkupError> {
        let mut dom = self.dom.borrow_mut();
        dom.node_mut(node)?
            .attributes
            .insert(name.to_ascii_lowercase(), value.to_string());
        Ok(())
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<(), MarkupError> {
        let mut dom = self.dom.borrow_mut();
        dom.node_mut(node)?.attributes.remove(&name.to_ascii_lowercase());
        Ok(())
    }

    pub fn set_text(&self, node: NodeId, text: &str) -> Result<(), MarkupError> {
        let mut dom = self.dom.borrow_mut();
        dom.node_mut(node)?.text = text.to_string();
        Ok(())
    }

    pub fn is_open_in_parent_process(&self) -> bool {
        self.open_in_parent_process.get()
    }

    pub fn has_pseudo_class_lock(&self) -> bool {
        !self.pseudo_locks.borrow().is_empty()
    }

    pub fn has_content_state(&self, state: ContentState) -> bool {
        self.content_states.borrow().contains(&state)
    }

    pub fn is_listening(&self, listener: Listener) -> bool {
        self.listeners.borrow().contains(&listener)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Everything recorded since the last call.
    pub fn take_log(&self) -> Vec<ControlEvent> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    fn record(&self, event: ControlEvent) {
        self.log.borrow_mut().push(event);
    }
}

impl SelectControl for MarkupSelect {
    fn node_id(&self) -> NodeId {
        0
    }

    fn owner_document(&self) -> DocumentId {
        self.document
    }

    fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.dom
            .borrow()
            .node(parent)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    fn element(&self, node: NodeId) -> ElementInfo {
        let dom = self.dom.borrow();
        let Some(element) = dom.node(node) else {
            return ElementInfo::default();
        };
        let kind = element.kind();
        ElementInfo {
            kind,
            hidden: element.has_attribute("hidden"),
            index: (kind == ElementKind::Option)
                .then(|| dom.option_index(node))
                .flatten(),
            label: element.attribute("label").map(str::to_string),
            text: (kind == ElementKind::Option).then(|| collapse_whitespace(&element.text)),
            disabled: element.has_attribute("disabled"),
            title: element.attribute("title").unwrap_or("").to_string(),
        }
    }

    fn computed_style(&self, node: NodeId) -> ComputedStyle {
        self.dom.borrow().computed_style(node, true)
    }

    fn default_computed_style(&self, node: NodeId) -> ComputedStyle {
        self.dom.borrow().computed_style(node, false)
    }

    fn selected_index(&self) -> i32 {
        self.dom.borrow().selected_index()
    }

    fn set_selected_index(&self, index: i32) {
        let mut dom = self.dom.borrow_mut();
        dom.selected = usize::try_from(index)
            .ok()
            .and_then(|index| dom.options().get(index).copied());
    }

    fn item(&self, index: i32) -> Option<NodeId> {
        let index = usize::try_from(index).ok()?;
        self.dom.borrow().options().get(index).copied()
    }

    fn is_system_principal(&self) -> bool {
        SYSTEM_SCHEMES.contains(&self.url.scheme())
    }

    fn is_dark_background(&self) -> bool {
        let style = self.computed_style(0);
        parse_rgb(style.property_value("background-color"))
            .map(|(r, g, b, a)| a > 0.0 && (0.2125 * r + 0.7154 * g + 0.0721 * b) / 255.0 < 0.5)
            .unwrap_or(false)
    }

    fn bounding_screen_rect(&self) -> ScreenRect {
        self.rect.get()
    }

    fn set_open_in_parent_process(&self, open: bool) {
        self.open_in_parent_process.set(open);
    }

    fn add_pseudo_class_lock(&self, pseudo: PseudoClass) {
        self.pseudo_locks.borrow_mut().push(pseudo);
    }

    fn clear_pseudo_class_locks(&self) {
        self.pseudo_locks.borrow_mut().clear();
    }

    fn set_content_state(&self, state: ContentState) {
        self.content_states.borrow_mut().insert(state);
        self.record(ControlEvent::ContentState {
            state,
            set: true,
            clear_active_document: false,
        });
    }

    fn remove_content_state(&self, state: ContentState, clear_active_document: bool) {
        self.content_states.borrow_mut().remove(&state);
        self.record(ControlEvent::ContentState {
            state,
            set: false,
            clear_active_document,
        });
    }

    fn add_listener(&self, listener: Listener) {
        self.listeners.borrow_mut().insert(listener);
    }

    fn remove_listener(&self, listener: Listener) {
        self.listeners.borrow_mut().remove(&listener);
    }

    fn dispatch_mouse_event(&self, target: NodeId, kind: MouseEventKind) {
        self.record(ControlEvent::Mouse {
            target,
            event: kind,
            pointer: kind.is_pointer_event(),
        });
    }

    fn is_handling_user_input(&self) -> bool {
        self.handling_user_input.get()
    }

    fn set_handling_user_input(&self, handling: bool) {
        self.handling_user_input.set(handling);
    }

    fn user_finished_interacting(&self, changed: bool) {
        self.record(ControlEvent::FinishedInteracting {
            changed,
            handling_user_input: self.handling_user_input.get(),
        });
    }
}

fn collect_node(dom: &mut MarkupDom, node: &NodeRef, parent: Option<NodeId>) {
    let Some(element) = node.as_element() else {
        return;
    };
    let tag = element.name.local.to_string();
    let attributes = element
        .attributes
        .borrow()
        .map
        .iter()
        .map(|(name, attribute)| (name.local.to_string(), attribute.value.clone()))
        .collect();
    let text = if tag == "option" {
        node.text_contents()
    } else {
        String::new()
    };

    let id = dom.insert(MarkupNode {
        tag: if parent.is_none() {
            "select".to_string()
        } else {
            tag
        },
        attributes,
        text,
        parent,
        children: Vec::new(),
    });

    for child in node.children() {
        collect_node(dom, &child, Some(id));
    }
}

/// Renames `<select>` and `</select>` tags, leaving attribute values and text
/// alone. Comments and raw-text elements are not tokenized: a `<select` inside
/// them is still renamed.
fn rename_select_tags(html: &str) -> String {
    let bytes = html.as_bytes();
    let mut out = String::with_capacity(html.len() + 32);
    let mut copied = 0;
    let mut in_tag = false;
    let mut quote = None;
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        if in_tag {
            match quote {
                Some(open) if byte == open => quote = None,
                Some(_) => {}
                None if byte == b'"' || byte == b'\'' => quote = Some(byte),
                None if byte == b'>' => in_tag = false,
                None => {}
            }
            i += 1;
            continue;
        }

        if byte == b'<' {
            let next = bytes.get(i + 1).copied();
            in_tag = next.is_some_and(|next| next.is_ascii_alphabetic() || next == b'/' || next == b'!');
            let name = if next == Some(b'/') { i + 2 } else { i + 1 };
            if in_tag && is_select_name(bytes, name) {
                out.push_str(&html[copied..name]);
                out.push_str(SELECT_TAG);
                copied = name + "select".len();
                i = copied;
                continue;
            }
        }
        i += 1;
    }

    out.push_str(&html[copied..]);
    out
}

fn is_select_name(bytes: &[u8], start: usize) -> bool {
    let end = start + "select".len();
    bytes
        .get(start..end)
        .is_some_and(|name| name.eq_ignore_ascii_case(b"select"))
        && bytes
            .get(end)
            .map_or(true, |next| next.is_ascii_whitespace() || *next == b'>' || *next == b'/')
}

fn parse_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|declaration| declaration.split_once(':'))
        .map(|(property, value)| (property.trim().to_ascii_lowercase(), value.trim().to_string()))
        .filter(|(property, value)| !property.is_empty() && !value.is_empty())
        .collect()
}

// Matches `HTMLOptionElement::text`: strip and collapse ASCII whitespace.
fn collapse_whitespace(text: &str) -> String {
    text.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_rgb(value: &str) -> Option<(f64, f64, f64, f64)> {
    let value = value.trim();
    let inner = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let parts = inner
        .split(',')
        .map(|part| part.trim().parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [r, g, b] => Some((*r, *g, *b, 1.0)),
        [r, g, b, a] => Some((*r, *g, *b, *a)),
        _ => None,
    }
}
