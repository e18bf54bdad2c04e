use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::control::ScreenRect;
use crate::snapshot::OptionList;
use crate::style::StyleRecord;

/// Payload sent when the dropdown first opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowDropDown {
    pub is_opened_via_touch: bool,
    pub options: OptionList,
    pub rect: ScreenRect,
    pub custom: bool,
    pub selected_index: i32,
    pub is_dark_background: bool,
    pub style: StyleRecord,
    pub default_style: StyleRecord,
}

/// Payload sent when the open control changed underneath the dropdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDropDown {
    pub options: OptionList,
    pub custom: bool,
    pub selected_index: i32,
    pub is_dark_background: bool,
    pub style: StyleRecord,
    pub default_style: StyleRecord,
}

/// Messages from the content-side coordinator to the parent-side widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum OutboundMessage {
    #[serde(rename = "Forms:ShowDropDown")]
    ShowDropDown(Box<ShowDropDown>),
    #[serde(rename = "Forms:UpdateDropDown")]
    UpdateDropDown(Box<UpdateDropDown>),
    #[serde(rename = "Forms:HideDropDown")]
    HideDropDown {},
    #[serde(rename = "Forms:BlurDropDown-Ping")]
    BlurPing {},
}

impl OutboundMessage {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundMessage::ShowDropDown(_) => "Forms:ShowDropDown",
            OutboundMessage::UpdateDropDown(_) => "Forms:UpdateDropDown",
            OutboundMessage::HideDropDown {} => "Forms:HideDropDown",
            OutboundMessage::BlurPing {} => "Forms:BlurDropDown-Ping",
        }
    }
}

/// Messages from the parent-side widget back to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum InboundMessage {
    #[serde(rename = "Forms:SelectDropDownItem", rename_all = "camelCase")]
    SelectItem { value: i32, closed_with_enter: bool },
    #[serde(rename = "Forms:DismissedDropDown")]
    Dismissed {},
    #[serde(rename = "Forms:MouseOver")]
    MouseOver {},
    #[serde(rename = "Forms:MouseOut")]
    MouseOut {},
    #[serde(rename = "Forms:MouseUp", rename_all = "camelCase")]
    MouseUp { on_anchor: bool },
    #[serde(rename = "Forms:SearchFocused")]
    SearchFocused {},
    #[serde(rename = "Forms:BlurDropDown-Pong")]
    BlurPong {},
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("message channel closed")]
    Closed,
}

/// Ordered, reliable, asynchronous transport towards the parent side.
pub trait MessageChannel {
    fn send_async_message(&self, message: OutboundMessage) -> Result<(), ChannelError>;
}

impl MessageChannel for UnboundedSender<OutboundMessage> {
    fn send_async_message(&self, message: OutboundMessage) -> Result<(), ChannelError> {
        self.send(message).map_err(|_| ChannelError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inbound_messages_use_actor_names() {
        let parsed: InboundMessage = serde_json::from_value(json!({
            "name": "Forms:SelectDropDownItem",
            "data": { "value": 2, "closedWithEnter": true }
        }))
        .unwrap();
        assert_eq!(
            parsed,
            InboundMessage::SelectItem {
                value: 2,
                closed_with_enter: true
            }
        );

        let parsed: InboundMessage = serde_json::from_value(json!({
            "name": "Forms:MouseUp",
            "data": { "onAnchor": false }
        }))
        .unwrap();
        assert_eq!(parsed, InboundMessage::MouseUp { on_anchor: false });
    }

    #[test]
    fn hide_serializes_empty_payload() {
        let value = serde_json::to_value(OutboundMessage::HideDropDown {}).unwrap();
        assert_eq!(value, json!({ "name": "Forms:HideDropDown", "data": {} }));
        assert_eq!(OutboundMessage::BlurPing {}.name(), "Forms:BlurDropDown-Ping");
    }

    #[test]
    fn closed_sender_reports_closed() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        let err = tx
            .send_async_message(OutboundMessage::BlurPing {})
            .unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
    }
}
