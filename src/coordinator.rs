use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::task::Waker;

use futures_util::task::AtomicWaker;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::control::ActorId;
use crate::events::{DocumentEvent, OpenSource};
use crate::preferences::Preferences;
use crate::protocol::{InboundMessage, MessageChannel};
use crate::session::SelectSession;
use crate::timers::DeferredTask;

/// Routes document events and parent-side messages to the dropdown session
/// of each actor. One coordinator exists per content process.
pub struct SelectCoordinator {
    handle: Handle,
    preferences: Preferences,
    actors: HashMap<ActorId, Rc<dyn MessageChannel>>,
    sessions: HashMap<ActorId, SelectSession>,
    waker: Arc<AtomicWaker>,
}

impl SelectCoordinator {
    /// Must be called from inside a tokio runtime.
    pub fn new(preferences: Preferences) -> Self {
        Self::with_handle(Handle::current(), preferences)
    }

    pub fn with_handle(handle: Handle, preferences: Preferences) -> Self {
        Self {
            handle,
            preferences,
            actors: HashMap::new(),
            sessions: HashMap::new(),
            waker: Arc::new(AtomicWaker::new()),
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Whether any dropdown in this process is currently open.
    pub fn is_open(&self) -> bool {
        !self.sessions.is_empty()
    }

    pub fn session(&self, actor: ActorId) -> Option<&SelectSession> {
        self.sessions.get(&actor)
    }

    /// Register the channel an actor's messages travel through.
    pub fn attach_actor(&mut self, actor: ActorId, channel: Rc<dyn MessageChannel>) {
        self.actors.insert(actor, channel);
    }

    /// Forget an actor whose channel went away, closing its dropdown without
    /// telling the parent side.
    pub fn detach_actor(&mut self, actor: ActorId) {
        self.actors.remove(&actor);
        if let Some(mut session) = self.sessions.remove(&actor) {
            session.abandon();
        }
    }

    pub fn handle_event(&mut self, actor: ActorId, event: DocumentEvent) {
        // While a dropdown is open its session sees every event first.
        if self.is_open() {
            if let Some(session) = self.sessions.get_mut(&actor) {
                session.handle_event(&event);
            }
            self.reap(actor);
            return;
        }

        let name = event.name();
        let DocumentEvent::ShowDropDown { control, source } = event else {
            debug!(target = "select", %actor, event = name, "ignoring event with no open dropdown");
            return;
        };
        let Some(channel) = self.actors.get(&actor).cloned() else {
            warn!(target = "select", %actor, "dropdown requested by an unattached actor");
            return;
        };

        let timer = DeferredTask::with_handle(
            self.handle.clone(),
            self.preferences.update_delay(),
            Arc::clone(&self.waker),
        );
        let session = SelectSession::open(
            actor,
            control,
            channel,
            source == OpenSource::Touch,
            self.preferences.disable_popup_autohide,
            timer,
        );
        info!(target = "select", %actor, touch = source == OpenSource::Touch, "dropdown opened");
        self.sessions.insert(actor, session);
        self.reap(actor);
    }

    pub fn receive_message(&mut self, actor: ActorId, message: InboundMessage) {
        let Some(session) = self.sessions.get_mut(&actor) else {
            debug!(target = "select", %actor, ?message, "message for actor without a dropdown");
            return;
        };
        session.receive_message(message);
        self.reap(actor);
    }

    /// Run every coalesced update whose timer fired. Returns how many ran.
    pub fn pump(&mut self) -> usize {
        let mut ran = 0;
        for session in self.sessions.values_mut() {
            if session.run_due_update() {
                ran += 1;
            }
        }
        self.sessions.retain(|_, session| !session.is_closed());
        ran
    }

    pub fn has_pending_updates(&self) -> bool {
        self.sessions
            .values()
            .any(SelectSession::has_pending_update)
    }

    /// Wake `waker` whenever a pending update becomes due.
    pub fn register_waker(&self, waker: &Waker) {
        self.waker.register(waker);
    }

    fn reap(&mut self, actor: ActorId) {
        if self
            .sessions
            .get(&actor)
            .is_some_and(SelectSession::is_closed)
        {
            self.sessions.remove(&actor);
        }
    }
}
