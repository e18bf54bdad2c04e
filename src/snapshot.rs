use serde::{Deserialize, Serialize};

use crate::control::{ElementKind, NodeId, SelectControl};
use crate::style::{PseudoStyleLock, StyleLockError, StyleRecord, StyleTable};

/// One row of the dropdown as sent to the parent side.
///
/// On the wire both variants are flat objects; separators are the ones
/// carrying `isHR: true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireEntry", try_from = "WireEntry")]
pub enum OptionEntry {
    Option {
        index: Option<u32>,
        is_opt_group: bool,
        text_content: String,
        disabled: bool,
        display: String,
        tooltip: String,
        children: Vec<OptionEntry>,
        style_index: usize,
    },
    /// A run of one or more adjacent `<hr>` siblings.
    Separator {
        index: Option<u32>,
        display: String,
        /// Only present when the author changed the separator color.
        color: Option<String>,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    index: Option<u32>,
    #[serde(rename = "isHR", default, skip_serializing_if = "std::ops::Not::not")]
    is_hr: bool,
    display: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_opt_group: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tooltip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<OptionEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    style_index: Option<usize>,
}

impl From<OptionEntry> for WireEntry {
    fn from(entry: OptionEntry) -> Self {
        match entry {
            OptionEntry::Option {
                index,
                is_opt_group,
                text_content,
                disabled,
                display,
                tooltip,
                children,
                style_index,
            } => WireEntry {
                index,
                is_hr: false,
                display,
                color: None,
                is_opt_group: Some(is_opt_group),
                text_content: Some(text_content),
                disabled: Some(disabled),
                tooltip: Some(tooltip),
                children: Some(children),
                style_index: Some(style_index),
            },
            OptionEntry::Separator {
                index,
                display,
                color,
            } => WireEntry {
                index,
                is_hr: true,
                display,
                color,
                is_opt_group: None,
                text_content: None,
                disabled: None,
                tooltip: None,
                children: None,
                style_index: None,
            },
        }
    }
}

impl TryFrom<WireEntry> for OptionEntry {
    type Error = String;

    fn try_from(wire: WireEntry) -> Result<Self, Self::Error> {
        if wire.is_hr {
            return Ok(OptionEntry::Separator {
                index: wire.index,
                display: wire.display,
                color: wire.color,
            });
        }
        Ok(OptionEntry::Option {
            index: wire.index,
            is_opt_group: wire.is_opt_group.unwrap_or(false),
            text_content: wire.text_content.unwrap_or_default(),
            disabled: wire.disabled.unwrap_or(false),
            display: wire.display,
            tooltip: wire.tooltip.unwrap_or_default(),
            children: wire.children.unwrap_or_default(),
            style_index: wire
                .style_index
                .ok_or_else(|| String::from("option entry without styleIndex"))?,
        })
    }
}

impl OptionEntry {
    pub fn is_separator(&self) -> bool {
        matches!(self, OptionEntry::Separator { .. })
    }

    pub fn text_content(&self) -> Option<&str> {
        match self {
            OptionEntry::Option { text_content, .. } => Some(text_content),
            OptionEntry::Separator { .. } => None,
        }
    }

    pub fn children(&self) -> &[OptionEntry] {
        match self {
            OptionEntry::Option { children, .. } => children,
            OptionEntry::Separator { .. } => &[],
        }
    }

    pub fn style_index(&self) -> Option<usize> {
        match self {
            OptionEntry::Option { style_index, .. } => Some(*style_index),
            OptionEntry::Separator { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionList {
    pub options: Vec<OptionEntry>,
    pub unique_styles: Vec<StyleRecord>,
}

impl OptionList {
    pub fn style_for(&self, entry: &OptionEntry) -> Option<&StyleRecord> {
        entry
            .style_index()
            .and_then(|index| self.unique_styles.get(index))
    }
}

/// Snapshot the control's children. Must run inside the pseudo-style lock.
pub fn build_option_list(
    control: &dyn SelectControl,
    lock: &PseudoStyleLock,
) -> Result<OptionList, StyleLockError> {
    lock.ensure_held()?;
    let mut styles = StyleTable::new();
    let options = build_children(control, control.node_id(), &mut styles);
    Ok(OptionList {
        options,
        unique_styles: styles.into_records(),
    })
}

fn build_children(
    control: &dyn SelectControl,
    parent: NodeId,
    styles: &mut StyleTable,
) -> Vec<OptionEntry> {
    let mut result = Vec::new();
    let mut last_was_separator = false;

    for child in control.children(parent) {
        let info = control.element(child);
        let kind = info.kind;
        if kind == ElementKind::Other || info.hidden {
            continue;
        }

        let style = control.computed_style(child);

        if kind == ElementKind::Separator {
            if last_was_separator {
                continue;
            }
            let default_style = control.default_computed_style(child);
            let color =
                (style.color() != default_style.color()).then(|| style.color().to_string());
            result.push(OptionEntry::Separator {
                index: info.index,
                display: style.display().to_string(),
                color,
            });
            last_was_separator = true;
            continue;
        }
        last_was_separator = false;

        let is_opt_group = kind == ElementKind::OptGroup;
        let text_content = if is_opt_group {
            info.label.clone()
        } else {
            info.label
                .clone()
                .filter(|label| !label.is_empty())
                .or_else(|| info.text.clone())
        }
        .unwrap_or_default();

        let children = if is_opt_group {
            build_children(control, child, styles)
        } else {
            Vec::new()
        };

        result.push(OptionEntry::Option {
            index: info.index,
            is_opt_group,
            text_content,
            disabled: info.disabled,
            display: style.display().to_string(),
            tooltip: info.title,
            children,
            style_index: styles.index_of(&style),
        });
    }

    result
}
