use std::cell::Cell;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::control::{ComputedStyle, PseudoClass, SelectControl};

/// Properties forwarded for every `<option>` and `<optgroup>`.
///
/// The parent-side widget keeps an identical list; both must change together.
pub const OPTION_PROPERTIES: &[&str] = &[
    "direction",
    "color",
    "background-color",
    "text-shadow",
    "text-transform",
    "font-family",
    "font-weight",
    "font-size",
    "font-style",
];

/// Properties forwarded for the `<select>` itself.
pub const SELECT_PROPERTIES: &[&str] = &[
    "direction",
    "color",
    "background-color",
    "text-shadow",
    "text-transform",
    "font-family",
    "font-weight",
    "font-size",
    "font-style",
    "scrollbar-width",
    "scrollbar-color",
];

pub fn is_select_property(property: &str) -> bool {
    SELECT_PROPERTIES.contains(&property)
}

/// Property name to computed value, restricted to one of the lists above.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleRecord(BTreeMap<String, String>);

impl StyleRecord {
    pub fn get(&self, property: &str) -> Option<&str> {
        self.0.get(property).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn supported_styles(style: &ComputedStyle, properties: &[&str]) -> StyleRecord {
    let mut record = BTreeMap::new();
    for &property in properties {
        if property == "font-size" && style.used_font_size >= 0.0 {
            record.insert(property.to_string(), format!("{}px", style.used_font_size));
            continue;
        }
        record.insert(
            property.to_string(),
            style.property_value(property).to_string(),
        );
    }
    StyleRecord(record)
}

/// Deduplicated option styles, shared across every nesting level of a snapshot.
#[derive(Debug, Default)]
pub struct StyleTable {
    records: Vec<StyleRecord>,
}

impl StyleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the option-level record for `style`, inserting it when new.
    pub fn index_of(&mut self, style: &ComputedStyle) -> usize {
        let record = supported_styles(style, OPTION_PROPERTIES);
        // Neighbouring options usually share a style, so search newest first.
        if let Some(index) = self.records.iter().rposition(|existing| *existing == record) {
            return index;
        }
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn into_records(self) -> Vec<StyleRecord> {
        self.records
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StyleLockError {
    #[error("pseudo styles must not be set up yet")]
    AlreadyHeld,
    #[error("pseudo styles must be set up already")]
    NotHeld,
}

/// Guards the window in which the control is forced into `:focus` so that
/// styles read inside it never mix with styles read outside it.
#[derive(Debug, Default)]
pub struct PseudoStyleLock {
    held: Cell<bool>,
}

impl PseudoStyleLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.held.get()
    }

    pub fn acquire<'a>(
        &'a self,
        control: &'a dyn SelectControl,
    ) -> Result<PseudoStyleGuard<'a>, StyleLockError> {
        if self.held.get() {
            return Err(StyleLockError::AlreadyHeld);
        }
        self.held.set(true);
        control.add_pseudo_class_lock(PseudoClass::Focus);
        Ok(PseudoStyleGuard {
            lock: self,
            control,
        })
    }

    pub fn ensure_held(&self) -> Result<(), StyleLockError> {
        if self.held.get() {
            Ok(())
        } else {
            Err(StyleLockError::NotHeld)
        }
    }
}

/// Clears the pseudo-class locks when dropped, on every exit path.
pub struct PseudoStyleGuard<'a> {
    lock: &'a PseudoStyleLock,
    control: &'a dyn SelectControl,
}

impl Drop for PseudoStyleGuard<'_> {
    fn drop(&mut self) {
        self.control.clear_pseudo_class_locks();
        self.lock.held.set(false);
    }
}
