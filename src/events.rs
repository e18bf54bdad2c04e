use std::fmt;
use std::rc::Rc;

use crate::control::{DocumentId, NodeId, SelectControl};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenSource {
    Pointer,
    Touch,
}

/// Events the hosting document delivers to the coordinator.
#[derive(Clone)]
pub enum DocumentEvent {
    /// The control asked for its dropdown (`mozshowdropdown[-sourcetouch]`).
    ShowDropDown {
        control: Rc<dyn SelectControl>,
        source: OpenSource,
    },
    /// The control asked for its dropdown to be hidden (`mozhidedropdown`).
    HideDropDown { target: NodeId },
    PageHide { document: DocumentId },
    Blur { target: NodeId },
    TransitionEnd {
        target: NodeId,
        property_name: String,
    },
    /// The subtree observer on `control` reported child, subtree or attribute changes.
    Mutation { control: NodeId },
}

impl DocumentEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DocumentEvent::ShowDropDown {
                source: OpenSource::Pointer,
                ..
            } => "mozshowdropdown",
            DocumentEvent::ShowDropDown {
                source: OpenSource::Touch,
                ..
            } => "mozshowdropdown-sourcetouch",
            DocumentEvent::HideDropDown { .. } => "mozhidedropdown",
            DocumentEvent::PageHide { .. } => "pagehide",
            DocumentEvent::Blur { .. } => "blur",
            DocumentEvent::TransitionEnd { .. } => "transitionend",
            DocumentEvent::Mutation { .. } => "mutation",
        }
    }
}

impl fmt::Debug for DocumentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentEvent::ShowDropDown { control, source } => f
                .debug_struct("ShowDropDown")
                .field("control", &control.node_id())
                .field("source", source)
                .finish(),
            DocumentEvent::HideDropDown { target } => {
                f.debug_struct("HideDropDown").field("target", target).finish()
            }
            DocumentEvent::PageHide { document } => {
                f.debug_struct("PageHide").field("document", document).finish()
            }
            DocumentEvent::Blur { target } => f.debug_struct("Blur").field("target", target).finish(),
            DocumentEvent::TransitionEnd {
                target,
                property_name,
            } => f
                .debug_struct("TransitionEnd")
                .field("target", target)
                .field("property_name", property_name)
                .finish(),
            DocumentEvent::Mutation { control } => {
                f.debug_struct("Mutation").field("control", control).finish()
            }
        }
    }
}
