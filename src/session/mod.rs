pub mod machine;

use std::rc::Rc;

use tracing::{debug, error, info, warn};

use crate::control::{ActorId, Listener, SelectControl, UserInputScope};
use crate::events::DocumentEvent;
use crate::protocol::{
    InboundMessage, MessageChannel, OutboundMessage, ShowDropDown, UpdateDropDown,
};
use crate::snapshot::build_option_list;
use crate::style::{
    is_select_property, supported_styles, PseudoStyleLock, StyleLockError, StyleRecord,
    SELECT_PROPERTIES,
};
use crate::timers::DeferredTask;

pub use machine::{Effect, MouseTarget, Phase, SessionInput, SessionState, Step};

/// One open dropdown: owns the interaction state and carries out the effects
/// the state machine asks for against the control and the channel.
pub struct SelectSession {
    actor: ActorId,
    state: SessionState,
    control: Option<Rc<dyn SelectControl>>,
    channel: Option<Rc<dyn MessageChannel>>,
    update_timer: Option<DeferredTask>,
    styles: PseudoStyleLock,
}

impl SelectSession {
    /// Attach to `control` and show its dropdown on the parent side.
    pub fn open(
        actor: ActorId,
        control: Rc<dyn SelectControl>,
        channel: Rc<dyn MessageChannel>,
        opened_via_touch: bool,
        autohide_disabled: bool,
        update_timer: DeferredTask,
    ) -> Self {
        let initial_selection = control.item(control.selected_index());
        let mut session = Self {
            actor,
            state: SessionState::new(initial_selection, autohide_disabled),
            control: Some(control),
            channel: Some(channel),
            update_timer: Some(update_timer),
            styles: PseudoStyleLock::new(),
        };
        session.apply(SessionInput::Open { opened_via_touch });
        session
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn is_closed(&self) -> bool {
        self.state.phase == Phase::Closed
    }

    pub fn handle_event(&mut self, event: &DocumentEvent) {
        let Some(control) = self.control.as_ref() else {
            return;
        };
        let node = control.node_id();

        let input = match event {
            DocumentEvent::PageHide { document } if *document == control.owner_document() => {
                SessionInput::PageHide
            }
            DocumentEvent::Blur { target } if *target == node => SessionInput::Blur,
            DocumentEvent::HideDropDown { target } if *target == node => SessionInput::ForcedHide,
            DocumentEvent::TransitionEnd {
                target,
                property_name,
            } if *target == node && is_select_property(property_name) => {
                SessionInput::ContentChanged
            }
            DocumentEvent::Mutation { control: observed } if *observed == node => {
                SessionInput::ContentChanged
            }
            _ => return,
        };

        self.apply(input);
    }

    pub fn receive_message(&mut self, message: InboundMessage) {
        let Some(control) = self.control.as_ref() else {
            return;
        };

        let input = match message {
            InboundMessage::SelectItem {
                value,
                closed_with_enter,
            } => SessionInput::SelectItem {
                value,
                closed_with_enter,
            },
            InboundMessage::Dismissed {} => SessionInput::Dismissed {
                selected: control.item(control.selected_index()),
            },
            InboundMessage::MouseOver {} => SessionInput::MouseOver,
            InboundMessage::MouseOut {} => SessionInput::MouseOut,
            InboundMessage::MouseUp { on_anchor } => SessionInput::MouseUp { on_anchor },
            InboundMessage::SearchFocused {} => SessionInput::SearchFocused,
            InboundMessage::BlurPong {} => SessionInput::BlurPong,
        };

        self.apply(input);
    }

    /// Send the coalesced update if its timer fired. Returns whether it ran.
    pub fn run_due_update(&mut self) -> bool {
        let due = self
            .update_timer
            .as_ref()
            .map(DeferredTask::take_due)
            .unwrap_or(false);
        if due {
            self.apply(SessionInput::UpdateDue);
        }
        due
    }

    pub fn has_pending_update(&self) -> bool {
        self.update_timer
            .as_ref()
            .map(DeferredTask::is_armed)
            .unwrap_or(false)
    }

    fn apply(&mut self, input: SessionInput) {
        let Step { next, effects } = self.state.step(input);
        self.state = next;

        // Dispatching events can run page script; keep our own reference.
        let Some(control) = self.control.clone() else {
            return;
        };
        for effect in effects {
            self.perform(control.as_ref(), effect);
        }
    }

    fn perform(&mut self, control: &dyn SelectControl, effect: Effect) {
        match effect {
            Effect::AttachListeners => {
                for listener in Listener::ALL {
                    control.add_listener(listener);
                }
            }
            Effect::ShowDropDown => {
                if let Err(err) = self.show_drop_down(control) {
                    error!(target = "select", actor = %self.actor, error = %err, "failed to show dropdown");
                }
            }
            Effect::UpdateDropDown => {
                if let Err(err) = self.update_drop_down(control) {
                    error!(target = "select", actor = %self.actor, error = %err, "failed to update dropdown");
                }
            }
            Effect::ArmUpdate => {
                if let Some(timer) = self.update_timer.as_ref() {
                    timer.arm();
                }
            }
            Effect::Send(message) => self.send(message),
            Effect::SetSelectedIndex(index) => control.set_selected_index(index),
            Effect::DispatchMouse { target, kind } => {
                let node = match target {
                    MouseTarget::Control => control.node_id(),
                    MouseTarget::Node(node) => node,
                };
                debug!(target = "select", actor = %self.actor, node, event = kind.name(), "dispatching mouse event");
                control.dispatch_mouse_event(node, kind);
            }
            Effect::SetContentState(state) => control.set_content_state(state),
            Effect::RemoveContentState {
                state,
                clear_active_document,
            } => control.remove_content_state(state, clear_active_document),
            Effect::FinishInteraction { changed } => {
                let _scope = UserInputScope::enter(control, changed);
                control.user_finished_interacting(changed);
            }
            Effect::Teardown => self.teardown(),
        }
    }

    fn show_drop_down(&self, control: &dyn SelectControl) -> Result<(), StyleLockError> {
        control.set_open_in_parent_process(true);
        let message = {
            let _guard = self.styles.acquire(control)?;
            let rect = control.bounding_screen_rect();
            let (style, default_style) = select_styles(control);
            let options = build_option_list(control, &self.styles)?;
            info!(
                target = "select",
                actor = %self.actor,
                options = options.options.len(),
                styles = options.unique_styles.len(),
                "showing dropdown"
            );
            ShowDropDown {
                is_opened_via_touch: self.state.opened_via_touch,
                options,
                rect,
                custom: !control.is_system_principal(),
                selected_index: control.selected_index(),
                is_dark_background: control.is_dark_background(),
                style,
                default_style,
            }
        };
        self.send(OutboundMessage::ShowDropDown(Box::new(message)));
        Ok(())
    }

    fn update_drop_down(&self, control: &dyn SelectControl) -> Result<(), StyleLockError> {
        let message = {
            let _guard = self.styles.acquire(control)?;
            let (style, default_style) = select_styles(control);
            let options = build_option_list(control, &self.styles)?;
            debug!(
                target = "select",
                actor = %self.actor,
                options = options.options.len(),
                "updating dropdown"
            );
            UpdateDropDown {
                options,
                custom: !control.is_system_principal(),
                selected_index: control.selected_index(),
                is_dark_background: control.is_dark_background(),
                style,
                default_style,
            }
        };
        self.send(OutboundMessage::UpdateDropDown(Box::new(message)));
        Ok(())
    }

    fn send(&self, message: OutboundMessage) {
        let Some(channel) = self.channel.as_ref() else {
            return;
        };
        let name = message.name();
        if let Err(err) = channel.send_async_message(message) {
            warn!(target = "select", actor = %self.actor, message = name, error = %err, "failed to send message");
        }
    }

    /// Tear down without replaying anything, for when the actor is gone.
    pub fn abandon(&mut self) {
        if !self.is_closed() {
            self.teardown();
        }
    }

    fn teardown(&mut self) {
        if let Some(control) = self.control.take() {
            control.set_open_in_parent_process(false);
            for listener in Listener::ALL {
                control.remove_listener(listener);
            }
        }
        if let Some(timer) = self.update_timer.take() {
            timer.disarm();
        }
        self.channel = None;
        self.state.phase = Phase::Closed;
        info!(target = "select", actor = %self.actor, "dropdown session closed");
    }
}

fn select_styles(control: &dyn SelectControl) -> (StyleRecord, StyleRecord) {
    let node = control.node_id();
    (
        supported_styles(&control.computed_style(node), SELECT_PROPERTIES),
        supported_styles(&control.default_computed_style(node), SELECT_PROPERTIES),
    )
}
