//! The socket wire protocol: `{"event": ..., "data": ...}` frames.

use serde::{Deserialize, Serialize};

use crate::store::messages::MessageView;
use crate::store::rooms::RoomView;

/// Frames a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Subscribe to a room's live traffic and receive its history.
    JoinRoom(String),
    #[serde(rename_all = "camelCase")]
    SendMessage { room_id: String, content: String },
    CreateOrJoinMemoRoom,
}

/// Frames the server pushes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Delivered to every subscriber of the message's room.
    NewMessage(MessageView),
    /// Join acknowledgement: the room's full history, oldest first.
    #[serde(rename_all = "camelCase")]
    RoomMessages {
        room_id: String,
        messages: Vec<MessageView>,
    },
    MemoRoomInfo(RoomView),
    /// Sent only to the connection whose operation failed.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frames_parse() {
        let event: ClientEvent = serde_json::from_str(r#"{"event":"join_room","data":"r1"}"#).unwrap();
        assert!(matches!(event, ClientEvent::JoinRoom(id) if id == "r1"));

        let event: ClientEvent = serde_json::from_str(
            r#"{"event":"send_message","data":{"roomId":"r1","content":"hi"}}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            ClientEvent::SendMessage { room_id, content } if room_id == "r1" && content == "hi"
        ));

        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"create_or_join_memo_room"}"#).unwrap();
        assert!(matches!(event, ClientEvent::CreateOrJoinMemoRoom));
    }

    #[test]
    fn malformed_frames_do_not_parse() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"leave_room","data":"r1"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>("not json").is_err());
    }

    #[test]
    fn server_frames_use_the_event_envelope() {
        let json = serde_json::to_value(ServerEvent::Error {
            message: "nope".to_owned(),
        })
        .unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["data"]["message"], "nope");
    }
}
