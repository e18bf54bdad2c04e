use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a node inside the document that hosts a `<select>`.
pub type NodeId = usize;

/// Identifies the document that owns a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

/// Identifies the actor pair (content side + parent side) a session talks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Option,
    OptGroup,
    Separator,
    #[default]
    Other,
}

/// The element facts the snapshot builder needs from a child of the control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementInfo {
    pub kind: ElementKind,
    pub hidden: bool,
    /// Position in the control's option list, when the element has one.
    pub index: Option<u32>,
    /// `label` attribute for groups, label override for options.
    pub label: Option<String>,
    /// Rendered text of an option.
    pub text: Option<String>,
    pub disabled: bool,
    pub title: String,
}

/// Computed style of a node, as seen while the pseudo-class lock is held.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedStyle {
    values: BTreeMap<String, String>,
    /// Used font size in CSS pixels, negative when unavailable.
    pub used_font_size: f64,
}

impl ComputedStyle {
    pub fn new(used_font_size: f64) -> Self {
        Self {
            values: BTreeMap::new(),
            used_font_size,
        }
    }

    pub fn with(mut self, property: &str, value: impl Into<String>) -> Self {
        self.set(property, value);
        self
    }

    pub fn set(&mut self, property: &str, value: impl Into<String>) {
        self.values.insert(property.to_string(), value.into());
    }

    /// Mirrors `getPropertyValue`: unknown properties read as the empty string.
    pub fn property_value(&self, property: &str) -> &str {
        self.values.get(property).map(String::as_str).unwrap_or("")
    }

    pub fn display(&self) -> &str {
        self.property_value("display")
    }

    pub fn color(&self) -> &str {
        self.property_value("color")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentState {
    Active,
    Hover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PseudoClass {
    Focus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseEventKind {
    MouseDown,
    MouseUp,
    Click,
}

impl MouseEventKind {
    pub fn name(self) -> &'static str {
        match self {
            MouseEventKind::MouseDown => "mousedown",
            MouseEventKind::MouseUp => "mouseup",
            MouseEventKind::Click => "click",
        }
    }

    /// Clicks are dispatched as `PointerEvent`, everything else as `MouseEvent`.
    pub fn is_pointer_event(self) -> bool {
        matches!(self, MouseEventKind::Click)
    }
}

/// Things a session listens to while its dropdown is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Listener {
    PageHide,
    Blur,
    TransitionEnd,
    Mutations,
}

impl Listener {
    pub const ALL: [Listener; 4] = [
        Listener::PageHide,
        Listener::Blur,
        Listener::TransitionEnd,
        Listener::Mutations,
    ];
}

/// The hosted `<select>` element as the coordinator sees it.
///
/// Implementations are owned by the document. Methods take `&self`; any
/// mutation goes through the implementation's own interior mutability, the
/// same way the DOM bridge hands out node handles.
pub trait SelectControl {
    fn node_id(&self) -> NodeId;
    fn owner_document(&self) -> DocumentId;

    fn children(&self, parent: NodeId) -> Vec<NodeId>;
    fn element(&self, node: NodeId) -> ElementInfo;
    fn computed_style(&self, node: NodeId) -> ComputedStyle;
    /// Style the node would have with no author styling applied.
    fn default_computed_style(&self, node: NodeId) -> ComputedStyle;

    fn selected_index(&self) -> i32;
    fn set_selected_index(&self, index: i32);
    fn item(&self, index: i32) -> Option<NodeId>;

    fn is_system_principal(&self) -> bool;
    fn is_dark_background(&self) -> bool;
    fn bounding_screen_rect(&self) -> ScreenRect;

    fn set_open_in_parent_process(&self, open: bool);
    fn add_pseudo_class_lock(&self, pseudo: PseudoClass);
    fn clear_pseudo_class_locks(&self);
    fn set_content_state(&self, state: ContentState);
    fn remove_content_state(&self, state: ContentState, clear_active_document: bool);

    fn add_listener(&self, listener: Listener);
    fn remove_listener(&self, listener: Listener);

    fn dispatch_mouse_event(&self, target: NodeId, kind: MouseEventKind);
    fn is_handling_user_input(&self) -> bool;
    fn set_handling_user_input(&self, handling: bool);
    /// Fires `input`/`change` on the control when `changed` is true.
    fn user_finished_interacting(&self, changed: bool);
}

/// Marks the document as handling user input until dropped, then puts back
/// whatever an enclosing scope had set.
pub struct UserInputScope<'a> {
    control: &'a dyn SelectControl,
    previous: bool,
}

impl<'a> UserInputScope<'a> {
    pub fn enter(control: &'a dyn SelectControl, handling: bool) -> Self {
        let previous = control.is_handling_user_input();
        control.set_handling_user_input(handling);
        Self { control, previous }
    }
}

impl Drop for UserInputScope<'_> {
    fn drop(&mut self) {
        self.control.set_handling_user_input(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_property_reads_empty() {
        let style = ComputedStyle::new(16.0).with("color", "rgb(0, 0, 0)");
        assert_eq!(style.color(), "rgb(0, 0, 0)");
        assert_eq!(style.property_value("text-shadow"), "");
    }

    #[test]
    fn only_click_is_pointer_flavoured() {
        assert!(MouseEventKind::Click.is_pointer_event());
        assert!(!MouseEventKind::MouseDown.is_pointer_event());
        assert_eq!(MouseEventKind::MouseUp.name(), "mouseup");
    }
}
