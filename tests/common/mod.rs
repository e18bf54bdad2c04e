#![allow(dead_code)]

use std::rc::Rc;

use frontier_select::control::{ActorId, DocumentId, SelectControl};
use frontier_select::coordinator::SelectCoordinator;
use frontier_select::events::{DocumentEvent, OpenSource};
use frontier_select::markup::MarkupSelect;
use frontier_select::preferences::Preferences;
use frontier_select::protocol::OutboundMessage;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use url::Url;

pub const ACTOR: ActorId = ActorId(7);
pub const DOCUMENT: DocumentId = DocumentId(3);

pub fn select(html: &str) -> Rc<MarkupSelect> {
    select_at(html, "https://example.com/page")
}

pub fn select_at(html: &str, url: &str) -> Rc<MarkupSelect> {
    Rc::new(MarkupSelect::parse(html, Url::parse(url).unwrap(), DOCUMENT).expect("markup"))
}

pub struct Harness {
    pub coordinator: SelectCoordinator,
    pub control: Rc<MarkupSelect>,
    pub rx: UnboundedReceiver<OutboundMessage>,
}

impl Harness {
    /// Must be called from inside a tokio runtime.
    pub fn new(html: &str, preferences: Preferences) -> Self {
        Self::with_control(select(html), preferences)
    }

    pub fn with_control(control: Rc<MarkupSelect>, preferences: Preferences) -> Self {
        let (tx, rx) = unbounded_channel();
        let mut coordinator = SelectCoordinator::new(preferences);
        coordinator.attach_actor(ACTOR, Rc::new(tx));
        Self {
            coordinator,
            control,
            rx,
        }
    }

    pub fn open(&mut self, source: OpenSource) {
        let control: Rc<dyn SelectControl> = self.control.clone();
        self.coordinator
            .handle_event(ACTOR, DocumentEvent::ShowDropDown { control, source });
    }

    pub fn event(&mut self, event: DocumentEvent) {
        self.coordinator.handle_event(ACTOR, event);
    }

    pub fn sent(&mut self) -> Vec<OutboundMessage> {
        let mut sent = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            sent.push(message);
        }
        sent
    }

    pub fn sent_names(&mut self) -> Vec<&'static str> {
        self.sent().iter().map(OutboundMessage::name).collect()
    }
}
