//! Scripted dropdown interactions against a [`MarkupSelect`].
//!
//! A scenario is YAML:
//!
//! ```yaml
//! markup: |
//!   <select><option>A</option><option id="b">B</option></select>
//! steps:
//!   - step: open
//!   - step: select
//!     value: 1
//!   - step: dismiss
//! ```

use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::time::sleep;
use tracing::debug;
use url::Url;

use crate::control::{ActorId, DocumentId, Listener, NodeId, SelectControl};
use crate::coordinator::SelectCoordinator;
use crate::events::{DocumentEvent, OpenSource};
use crate::markup::{ControlEvent, MarkupError, MarkupSelect};
use crate::preferences::{Preferences, PreferencesError};
use crate::protocol::{InboundMessage, OutboundMessage};

const REPLAY_ACTOR: ActorId = ActorId(1);
const REPLAY_DOCUMENT: DocumentId = DocumentId(1);

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid document url: {0}")]
    Url(#[from] url::ParseError),
    #[error("markup error: {0}")]
    Markup(#[from] MarkupError),
    #[error("no element matches '{0}'")]
    UnknownTarget(String),
    #[error("preferences error: {0}")]
    Preferences(#[from] PreferencesError),
}

fn default_url() -> String {
    String::from("https://example.com/")
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_url")]
    pub url: String,
    pub markup: String,
    /// Inline preferences; when absent the host's preferences apply.
    #[serde(default)]
    pub preferences: Option<Preferences>,
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenVia {
    #[default]
    Pointer,
    Touch,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScenarioStep {
    Open {
        #[serde(default)]
        via: OpenVia,
    },
    Select {
        value: i32,
        #[serde(default)]
        closed_with_enter: bool,
    },
    Dismiss,
    MouseOver,
    MouseOut,
    MouseUp {
        #[serde(default)]
        on_anchor: bool,
    },
    SearchFocused,
    Blur,
    BlurPong,
    PageHide,
    ForceHide,
    TransitionEnd {
        property: String,
    },
    AppendOption {
        #[serde(default)]
        parent: Option<String>,
        label: String,
    },
    Remove {
        target: String,
    },
    SetAttribute {
        target: String,
        name: String,
        value: String,
    },
    /// Let pending coalesced updates fire.
    Settle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayEntry {
    Outbound {
        step: usize,
        message: OutboundMessage,
    },
    Control {
        step: usize,
        event: ControlEvent,
    },
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ReplayError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Fill in preferences from `$FRONTIER_SELECT_PREFS` or the Frontier
    /// config dir unless the scenario carries its own.
    pub fn resolve_preferences(&mut self) -> Result<Preferences, ReplayError> {
        if let Some(preferences) = self.preferences {
            return Ok(preferences);
        }
        let preferences = Preferences::from_env()?;
        self.preferences = Some(preferences);
        Ok(preferences)
    }
}

/// Run every step and return what crossed the channel and what the control saw.
pub async fn run_scenario(scenario: &Scenario) -> Result<Vec<ReplayEntry>, ReplayError> {
    let url = Url::parse(&scenario.url)?;
    let control = Rc::new(MarkupSelect::parse(&scenario.markup, url, REPLAY_DOCUMENT)?);
    let (tx, mut rx) = unbounded_channel();
    let preferences = scenario.preferences.unwrap_or_default();

    let mut coordinator = SelectCoordinator::new(preferences);
    coordinator.attach_actor(REPLAY_ACTOR, Rc::new(tx));

    let mut entries = Vec::new();
    for (step, action) in scenario.steps.iter().enumerate() {
        debug!(target = "select", step, ?action, "replaying step");
        apply_step(&mut coordinator, &control, action, preferences.update_delay()).await?;
        collect(step, &control, &mut rx, &mut entries);
    }
    Ok(entries)
}

async fn apply_step(
    coordinator: &mut SelectCoordinator,
    control: &Rc<MarkupSelect>,
    action: &ScenarioStep,
    update_delay: Duration,
) -> Result<(), ReplayError> {
    let node = control.node_id();
    match action {
        ScenarioStep::Open { via } => {
            let source = match via {
                OpenVia::Pointer => OpenSource::Pointer,
                OpenVia::Touch => OpenSource::Touch,
            };
            let control: Rc<dyn SelectControl> = control.clone();
            coordinator.handle_event(REPLAY_ACTOR, DocumentEvent::ShowDropDown { control, source });
        }
        ScenarioStep::Select {
            value,
            closed_with_enter,
        } => coordinator.receive_message(
            REPLAY_ACTOR,
            InboundMessage::SelectItem {
                value: *value,
                closed_with_enter: *closed_with_enter,
            },
        ),
        ScenarioStep::Dismiss => {
            coordinator.receive_message(REPLAY_ACTOR, InboundMessage::Dismissed {})
        }
        ScenarioStep::MouseOver => {
            coordinator.receive_message(REPLAY_ACTOR, InboundMessage::MouseOver {})
        }
        ScenarioStep::MouseOut => {
            coordinator.receive_message(REPLAY_ACTOR, InboundMessage::MouseOut {})
        }
        ScenarioStep::MouseUp { on_anchor } => coordinator.receive_message(
            REPLAY_ACTOR,
            InboundMessage::MouseUp {
                on_anchor: *on_anchor,
            },
        ),
        ScenarioStep::SearchFocused => {
            coordinator.receive_message(REPLAY_ACTOR, InboundMessage::SearchFocused {})
        }
        ScenarioStep::Blur => {
            coordinator.handle_event(REPLAY_ACTOR, DocumentEvent::Blur { target: node })
        }
        ScenarioStep::BlurPong => {
            coordinator.receive_message(REPLAY_ACTOR, InboundMessage::BlurPong {})
        }
        ScenarioStep::PageHide => coordinator.handle_event(
            REPLAY_ACTOR,
            DocumentEvent::PageHide {
                document: control.owner_document(),
            },
        ),
        ScenarioStep::ForceHide => {
            coordinator.handle_event(REPLAY_ACTOR, DocumentEvent::HideDropDown { target: node })
        }
        ScenarioStep::TransitionEnd { property } => coordinator.handle_event(
            REPLAY_ACTOR,
            DocumentEvent::TransitionEnd {
                target: node,
                property_name: property.clone(),
            },
        ),
        ScenarioStep::AppendOption { parent, label } => {
            let parent = resolve_target(control, parent.as_deref())?;
            control.append_element(parent, "option", &[], label)?;
            notify_mutation(coordinator, control);
        }
        ScenarioStep::Remove { target } => {
            control.remove(resolve_target(control, Some(target))?)?;
            notify_mutation(coordinator, control);
        }
        ScenarioStep::SetAttribute {
            target,
            name,
            value,
        } => {
            control.set_attribute(resolve_target(control, Some(target))?, name, value)?;
            notify_mutation(coordinator, control);
        }
        ScenarioStep::Settle => {
            sleep(update_delay + Duration::from_millis(5)).await;
            coordinator.pump();
        }
    }
    Ok(())
}

fn notify_mutation(coordinator: &mut SelectCoordinator, control: &MarkupSelect) {
    if control.is_listening(Listener::Mutations) {
        coordinator.handle_event(
            REPLAY_ACTOR,
            DocumentEvent::Mutation {
                control: control.node_id(),
            },
        );
    }
}

/// `None` or `select` is the control, `#id` looks up an id, digits are node ids.
fn resolve_target(control: &MarkupSelect, target: Option<&str>) -> Result<NodeId, ReplayError> {
    match target {
        None | Some("select") => Ok(control.node_id()),
        Some(raw) => {
            if let Some(id) = raw.strip_prefix('#') {
                return control
                    .find_by_id(id)
                    .ok_or_else(|| ReplayError::UnknownTarget(raw.to_string()));
            }
            raw.parse::<NodeId>()
                .map_err(|_| ReplayError::UnknownTarget(raw.to_string()))
        }
    }
}

fn collect(
    step: usize,
    control: &MarkupSelect,
    rx: &mut UnboundedReceiver<OutboundMessage>,
    entries: &mut Vec<ReplayEntry>,
) {
    for event in control.take_log() {
        entries.push(ReplayEntry::Control { step, event });
    }
    while let Ok(message) = rx.try_recv() {
        entries.push(ReplayEntry::Outbound { step, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scenario_steps() {
        let scenario = Scenario::from_yaml(
            r##"
markup: "<select><option id='a'>A</option></select>"
preferences:
  disable_popup_autohide: true
steps:
  - step: open
    via: touch
  - step: select
    value: 0
    closed_with_enter: true
  - step: set_attribute
    target: "#a"
    name: disabled
    value: ""
  - step: settle
  - step: dismiss
"##,
        )
        .unwrap();
        assert_eq!(scenario.url, "https://example.com/");
        assert_eq!(
            scenario.preferences.map(|prefs| prefs.disable_popup_autohide),
            Some(true)
        );
        assert_eq!(scenario.steps.len(), 5);
        assert!(matches!(
            scenario.steps[0],
            ScenarioStep::Open {
                via: OpenVia::Touch
            }
        ));
    }

    #[tokio::test]
    async fn unknown_target_is_reported() {
        let scenario = Scenario::from_yaml(
            r##"
markup: "<select><option>A</option></select>"
steps:
  - step: remove
    target: "#missing"
"##,
        )
        .unwrap();
        let err = run_scenario(&scenario).await.unwrap_err();
        assert!(matches!(err, ReplayError::UnknownTarget(target) if target == "#missing"));
    }
}
