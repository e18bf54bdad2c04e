//! Side-effect free model of one dropdown interaction.
//!
//! [`SessionState::step`] never touches the control or the channel; it only
//! describes what the driver in [`super::SelectSession`] has to do, in order.

use crate::control::{ContentState, MouseEventKind, NodeId};
use crate::protocol::OutboundMessage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// Created but the dropdown has not been shown yet.
    #[default]
    Pending,
    Open,
    /// Torn down. Every later input is ignored.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseTarget {
    /// The `<select>` itself.
    Control,
    Node(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    Open { opened_via_touch: bool },
    /// The subtree mutated or a tracked style finished transitioning.
    ContentChanged,
    /// The coalesced update timer fired.
    UpdateDue,
    SelectItem { value: i32, closed_with_enter: bool },
    /// The widget closed; `selected` is the option selected at that moment.
    Dismissed { selected: Option<NodeId> },
    MouseOver,
    MouseOut,
    MouseUp { on_anchor: bool },
    SearchFocused,
    Blur,
    BlurPong,
    PageHide,
    ForcedHide,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    AttachListeners,
    ShowDropDown,
    UpdateDropDown,
    ArmUpdate,
    Send(OutboundMessage),
    SetSelectedIndex(i32),
    DispatchMouse {
        target: MouseTarget,
        kind: MouseEventKind,
    },
    SetContentState(ContentState),
    RemoveContentState {
        state: ContentState,
        clear_active_document: bool,
    },
    /// Fire the control's input/change notification under a user-input scope.
    FinishInteraction { changed: bool },
    Teardown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub next: SessionState,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub phase: Phase,
    pub opened_via_touch: bool,
    /// Option selected before the dropdown opened, for change detection.
    pub initial_selection: Option<NodeId>,
    /// Last selection came from a pointer rather than the Enter key.
    pub closed_with_click: bool,
    /// Cleared by `SearchFocused` between a blur ping and its pong.
    pub close_after_blur: bool,
    pub autohide_disabled: bool,
}

impl SessionState {
    pub fn new(initial_selection: Option<NodeId>, autohide_disabled: bool) -> Self {
        Self {
            phase: Phase::Pending,
            opened_via_touch: false,
            initial_selection,
            closed_with_click: false,
            close_after_blur: true,
            autohide_disabled,
        }
    }

    pub fn is_open(&self) -> bool {
        self.phase == Phase::Open
    }

    pub fn step(self, input: SessionInput) -> Step {
        let mut next = self;
        let mut effects = Vec::new();

        match (self.phase, input) {
            (Phase::Pending, SessionInput::Open { opened_via_touch }) => {
                next.phase = Phase::Open;
                next.opened_via_touch = opened_via_touch;
                effects.push(Effect::AttachListeners);
                effects.push(Effect::ShowDropDown);
            }
            (Phase::Open, SessionInput::ContentChanged) => {
                effects.push(Effect::ArmUpdate);
            }
            (Phase::Open, SessionInput::UpdateDue) => {
                effects.push(Effect::UpdateDropDown);
            }
            (
                Phase::Open,
                SessionInput::SelectItem {
                    value,
                    closed_with_enter,
                },
            ) => {
                next.closed_with_click = !closed_with_enter;
                effects.push(Effect::SetSelectedIndex(value));
            }
            (Phase::Open, SessionInput::Dismissed { selected }) => {
                next.phase = Phase::Closed;
                effects = self.dismissal_effects(selected);
            }
            (Phase::Open, SessionInput::MouseOver) => {
                effects.push(Effect::SetContentState(ContentState::Hover));
            }
            (Phase::Open, SessionInput::MouseOut) => {
                effects.push(Effect::RemoveContentState {
                    state: ContentState::Hover,
                    clear_active_document: false,
                });
            }
            (Phase::Open, SessionInput::MouseUp { on_anchor }) => {
                if on_anchor {
                    effects.push(Effect::DispatchMouse {
                        target: MouseTarget::Control,
                        kind: MouseEventKind::MouseUp,
                    });
                }
                effects.push(Effect::RemoveContentState {
                    state: ContentState::Active,
                    clear_active_document: false,
                });
                if on_anchor {
                    effects.push(Effect::DispatchMouse {
                        target: MouseTarget::Control,
                        kind: MouseEventKind::Click,
                    });
                }
            }
            (Phase::Open, SessionInput::SearchFocused) => {
                next.close_after_blur = false;
            }
            (Phase::Open, SessionInput::Blur) => {
                if !self.autohide_disabled {
                    next.close_after_blur = true;
                    effects.push(Effect::Send(OutboundMessage::BlurPing {}));
                }
            }
            (Phase::Open, SessionInput::BlurPong) => {
                if self.close_after_blur {
                    next.phase = Phase::Closed;
                    effects.push(Effect::Send(OutboundMessage::HideDropDown {}));
                    effects.push(Effect::Teardown);
                }
            }
            (Phase::Open, SessionInput::PageHide | SessionInput::ForcedHide) => {
                next.phase = Phase::Closed;
                effects.push(Effect::Send(OutboundMessage::HideDropDown {}));
                effects.push(Effect::Teardown);
            }
            _ => {}
        }

        Step { next, effects }
    }

    // Pointer selections fire mousedown, mouseup, input/change, click in that
    // order; keyboard selections only fire input/change.
    fn dismissal_effects(&self, selected: Option<NodeId>) -> Vec<Effect> {
        let mut effects = Vec::new();
        let click_target = selected
            .filter(|_| self.closed_with_click)
            .map(MouseTarget::Node);

        if let Some(target) = click_target {
            effects.push(Effect::DispatchMouse {
                target,
                kind: MouseEventKind::MouseDown,
            });
            effects.push(Effect::DispatchMouse {
                target,
                kind: MouseEventKind::MouseUp,
            });
        }

        effects.push(Effect::RemoveContentState {
            state: ContentState::Active,
            clear_active_document: true,
        });
        effects.push(Effect::FinishInteraction {
            changed: self.initial_selection != selected,
        });

        if let Some(target) = click_target {
            effects.push(Effect::DispatchMouse {
                target,
                kind: MouseEventKind::Click,
            });
        }

        effects.push(Effect::Teardown);
        effects
    }
}
