mod common;

use frontier_select::control::{ContentState, Listener, MouseEventKind, SelectControl};
use frontier_select::events::{DocumentEvent, OpenSource};
use frontier_select::markup::ControlEvent;
use frontier_select::preferences::Preferences;
use frontier_select::protocol::{InboundMessage, OutboundMessage};

use common::{select_at, Harness, ACTOR, DOCUMENT};

const THREE_OPTIONS: &str = r#"<select>
    <option>A</option>
    <option selected>B</option>
    <option>C</option>
</select>"#;

fn active_cleared() -> ControlEvent {
    ControlEvent::ContentState {
        state: ContentState::Active,
        set: false,
        clear_active_document: true,
    }
}

#[tokio::test]
async fn open_sends_full_snapshot_and_arms_listeners() {
    let mut harness = Harness::new(THREE_OPTIONS, Preferences::default());
    harness.open(OpenSource::Touch);

    assert!(harness.coordinator.is_open());
    assert!(harness.control.is_open_in_parent_process());
    assert!(!harness.control.has_pseudo_class_lock());
    for listener in Listener::ALL {
        assert!(harness.control.is_listening(listener));
    }

    let sent = harness.sent();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        OutboundMessage::ShowDropDown(show) => {
            assert!(show.is_opened_via_touch);
            assert!(show.custom);
            assert_eq!(show.selected_index, 1);
            assert_eq!(show.options.options.len(), 3);
            assert_eq!(show.rect.width, 120.0);
            assert!(!show.is_dark_background);
            assert_eq!(show.style.get("scrollbar-width"), Some("auto"));
            assert_eq!(show.default_style.get("color"), Some("rgb(0, 0, 0)"));
        }
        other => panic!("expected show, got {other:?}"),
    }
}

#[tokio::test]
async fn system_documents_are_not_custom() {
    let control = select_at("<select><option>A</option></select>", "about:preferences");
    let mut harness = Harness::with_control(control, Preferences::default());
    harness.open(OpenSource::Pointer);

    match harness.sent().remove(0) {
        OutboundMessage::ShowDropDown(show) => {
            assert!(!show.custom);
            assert!(!show.is_opened_via_touch);
        }
        other => panic!("expected show, got {other:?}"),
    }
}

#[tokio::test]
async fn dismiss_without_change_fires_no_pointer_events() {
    let mut harness = Harness::new(THREE_OPTIONS, Preferences::default());
    harness.open(OpenSource::Pointer);
    harness.sent();

    harness
        .coordinator
        .receive_message(ACTOR, InboundMessage::Dismissed {});

    assert_eq!(
        harness.control.take_log(),
        vec![
            active_cleared(),
            ControlEvent::FinishedInteracting {
                changed: false,
                handling_user_input: false,
            },
        ]
    );
    assert!(harness.sent().is_empty());
    assert!(!harness.coordinator.is_open());
    assert!(!harness.control.is_open_in_parent_process());
    assert_eq!(harness.control.listener_count(), 0);
}

#[tokio::test]
async fn pointer_selection_replays_legacy_event_order() {
    let mut harness = Harness::new(THREE_OPTIONS, Preferences::default());
    harness.open(OpenSource::Pointer);

    harness.coordinator.receive_message(
        ACTOR,
        InboundMessage::SelectItem {
            value: 2,
            closed_with_enter: false,
        },
    );
    assert_eq!(harness.control.selected_index(), 2);
    assert!(harness.coordinator.is_open());

    harness
        .coordinator
        .receive_message(ACTOR, InboundMessage::Dismissed {});

    let c = harness.control.item(2).unwrap();
    assert_eq!(
        harness.control.take_log(),
        vec![
            ControlEvent::Mouse {
                target: c,
                event: MouseEventKind::MouseDown,
                pointer: false,
            },
            ControlEvent::Mouse {
                target: c,
                event: MouseEventKind::MouseUp,
                pointer: false,
            },
            active_cleared(),
            ControlEvent::FinishedInteracting {
                changed: true,
                handling_user_input: true,
            },
            ControlEvent::Mouse {
                target: c,
                event: MouseEventKind::Click,
                pointer: true,
            },
        ]
    );
    assert!(!harness.control.is_handling_user_input());
    assert!(!harness.coordinator.is_open());
}

#[tokio::test]
async fn keyboard_selection_only_commits() {
    let mut harness = Harness::new(THREE_OPTIONS, Preferences::default());
    harness.open(OpenSource::Pointer);

    harness.coordinator.receive_message(
        ACTOR,
        InboundMessage::SelectItem {
            value: 0,
            closed_with_enter: true,
        },
    );
    harness
        .coordinator
        .receive_message(ACTOR, InboundMessage::Dismissed {});

    assert_eq!(
        harness.control.take_log(),
        vec![
            active_cleared(),
            ControlEvent::FinishedInteracting {
                changed: true,
                handling_user_input: true,
            },
        ]
    );
}

#[tokio::test]
async fn torn_down_session_ignores_everything() {
    let mut harness = Harness::new(THREE_OPTIONS, Preferences::default());
    harness.open(OpenSource::Pointer);
    harness
        .coordinator
        .receive_message(ACTOR, InboundMessage::Dismissed {});
    harness.sent();
    harness.control.take_log();

    for message in [
        InboundMessage::SelectItem {
            value: 0,
            closed_with_enter: false,
        },
        InboundMessage::Dismissed {},
        InboundMessage::MouseOver {},
        InboundMessage::MouseUp { on_anchor: true },
        InboundMessage::BlurPong {},
    ] {
        harness.coordinator.receive_message(ACTOR, message);
    }
    harness.event(DocumentEvent::Blur { target: 0 });
    harness.event(DocumentEvent::PageHide { document: DOCUMENT });

    assert!(harness.sent().is_empty());
    assert!(harness.control.take_log().is_empty());
    assert_eq!(harness.control.selected_index(), 1);
    assert!(!harness.coordinator.is_open());
}

#[tokio::test]
async fn blur_closes_after_pong() {
    let mut harness = Harness::new(THREE_OPTIONS, Preferences::default());
    harness.open(OpenSource::Pointer);
    harness.sent();

    harness.event(DocumentEvent::Blur { target: 0 });
    assert_eq!(harness.sent_names(), vec!["Forms:BlurDropDown-Ping"]);
    assert!(harness.coordinator.is_open());

    harness
        .coordinator
        .receive_message(ACTOR, InboundMessage::BlurPong {});
    assert_eq!(harness.sent_names(), vec!["Forms:HideDropDown"]);
    assert!(!harness.coordinator.is_open());
    assert!(harness.control.take_log().is_empty());
}

#[tokio::test]
async fn search_focus_between_ping_and_pong_keeps_open() {
    let mut harness = Harness::new(THREE_OPTIONS, Preferences::default());
    harness.open(OpenSource::Pointer);
    harness.sent();

    harness.event(DocumentEvent::Blur { target: 0 });
    harness
        .coordinator
        .receive_message(ACTOR, InboundMessage::SearchFocused {});
    harness
        .coordinator
        .receive_message(ACTOR, InboundMessage::BlurPong {});

    assert_eq!(harness.sent_names(), vec!["Forms:BlurDropDown-Ping"]);
    assert!(harness.coordinator.is_open());

    // A fresh blur re-arms closing.
    harness.event(DocumentEvent::Blur { target: 0 });
    harness
        .coordinator
        .receive_message(ACTOR, InboundMessage::BlurPong {});
    assert_eq!(
        harness.sent_names(),
        vec!["Forms:BlurDropDown-Ping", "Forms:HideDropDown"]
    );
    assert!(!harness.coordinator.is_open());
}

#[tokio::test]
async fn autohide_preference_ignores_blur() {
    let preferences = Preferences {
        disable_popup_autohide: true,
        ..Preferences::default()
    };
    let mut harness = Harness::new(THREE_OPTIONS, preferences);
    harness.open(OpenSource::Pointer);
    harness.sent();

    harness.event(DocumentEvent::Blur { target: 0 });
    harness
        .coordinator
        .receive_message(ACTOR, InboundMessage::BlurPong {});

    assert!(harness.sent().is_empty());
    assert!(harness.coordinator.is_open());
}

#[tokio::test]
async fn page_hide_only_for_owner_document() {
    let mut harness = Harness::new(THREE_OPTIONS, Preferences::default());
    harness.open(OpenSource::Pointer);
    harness.sent();

    harness.event(DocumentEvent::PageHide {
        document: frontier_select::DocumentId(99),
    });
    assert!(harness.coordinator.is_open());

    harness.event(DocumentEvent::PageHide { document: DOCUMENT });
    assert_eq!(harness.sent_names(), vec!["Forms:HideDropDown"]);
    assert!(!harness.coordinator.is_open());
    assert!(harness.control.take_log().is_empty());
    assert_eq!(harness.control.listener_count(), 0);
}

#[tokio::test]
async fn forced_hide_skips_replay() {
    let mut harness = Harness::new(THREE_OPTIONS, Preferences::default());
    harness.open(OpenSource::Pointer);
    harness.coordinator.receive_message(
        ACTOR,
        InboundMessage::SelectItem {
            value: 0,
            closed_with_enter: false,
        },
    );
    harness.sent();

    harness.event(DocumentEvent::HideDropDown { target: 42 });
    assert!(harness.coordinator.is_open());

    harness.event(DocumentEvent::HideDropDown { target: 0 });
    assert_eq!(harness.sent_names(), vec!["Forms:HideDropDown"]);
    assert!(harness.control.take_log().is_empty());
    assert!(!harness.coordinator.is_open());
}

#[tokio::test]
async fn hover_and_anchor_mouse_up() {
    let mut harness = Harness::new(THREE_OPTIONS, Preferences::default());
    harness.open(OpenSource::Pointer);

    harness
        .coordinator
        .receive_message(ACTOR, InboundMessage::MouseOver {});
    assert!(harness.control.has_content_state(ContentState::Hover));
    harness
        .coordinator
        .receive_message(ACTOR, InboundMessage::MouseOut {});
    assert!(!harness.control.has_content_state(ContentState::Hover));
    harness.control.take_log();

    harness
        .coordinator
        .receive_message(ACTOR, InboundMessage::MouseUp { on_anchor: true });
    assert_eq!(
        harness.control.take_log(),
        vec![
            ControlEvent::Mouse {
                target: 0,
                event: MouseEventKind::MouseUp,
                pointer: false,
            },
            ControlEvent::ContentState {
                state: ContentState::Active,
                set: false,
                clear_active_document: false,
            },
            ControlEvent::Mouse {
                target: 0,
                event: MouseEventKind::Click,
                pointer: true,
            },
        ]
    );

    harness
        .coordinator
        .receive_message(ACTOR, InboundMessage::MouseUp { on_anchor: false });
    assert_eq!(harness.control.take_log().len(), 1);
    assert!(harness.coordinator.is_open());
}

#[tokio::test]
async fn second_open_while_open_is_swallowed() {
    let mut harness = Harness::new(THREE_OPTIONS, Preferences::default());
    harness.open(OpenSource::Pointer);
    harness.open(OpenSource::Touch);
    assert_eq!(harness.sent_names(), vec!["Forms:ShowDropDown"]);

    harness
        .coordinator
        .receive_message(ACTOR, InboundMessage::Dismissed {});
    harness.open(OpenSource::Pointer);
    assert_eq!(harness.sent_names(), vec!["Forms:ShowDropDown"]);
    assert!(harness.coordinator.is_open());
}

#[tokio::test]
async fn detaching_actor_closes_silently() {
    let mut harness = Harness::new(THREE_OPTIONS, Preferences::default());
    harness.open(OpenSource::Pointer);
    harness.sent();

    harness.coordinator.detach_actor(ACTOR);
    assert!(!harness.coordinator.is_open());
    assert!(harness.sent().is_empty());
    assert!(!harness.control.is_open_in_parent_process());

    // Without a channel, a new open request goes nowhere.
    harness.open(OpenSource::Pointer);
    assert!(!harness.coordinator.is_open());
}

#[tokio::test]
async fn closed_channel_does_not_leak_session() {
    let mut harness = Harness::new(THREE_OPTIONS, Preferences::default());
    harness.open(OpenSource::Pointer);
    harness.rx.close();

    harness.event(DocumentEvent::HideDropDown { target: 0 });
    assert!(!harness.coordinator.is_open());
    assert_eq!(harness.control.listener_count(), 0);
}
