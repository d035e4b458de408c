// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sending motions to a device room.
//!
//! Login and transport belong to the host application. The editor only
//! needs the operations of [`MotionService`] and a valid export document.

use crate::export::{convert, ExportDocument};
use crate::project::FrameScale;
use motion_editor_sequencer::Document;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors reported by a motion service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// No valid session
    #[error("Not logged in")]
    NotLoggedIn,

    /// The service refused the request
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Network or protocol failure
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Unique identifier for a device room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub Uuid);

impl RoomId {
    /// Create a new random room ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A room a motion can be sent to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Room identifier
    pub id: RoomId,
    /// Display name
    pub name: String,
}

/// Signed-in account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Display name
    pub name: String,
    /// Contact address
    pub email: Option<String>,
}

/// Session token returned by [`MotionService::login`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token(pub String);

/// Remote motion API
pub trait MotionService {
    /// Start a session
    fn login(&mut self) -> Result<Token, RemoteError>;

    /// Profile of the signed-in account
    fn account_info(&self) -> Result<AccountInfo, RemoteError>;

    /// Rooms available to the account
    fn list_rooms(&self) -> Result<Vec<Room>, RemoteError>;

    /// Deliver a motion to a room
    fn send_motion(&mut self, room: RoomId, motion: &ExportDocument) -> Result<(), RemoteError>;
}

/// Convert a document and send it to `room`
pub fn publish(
    service: &mut dyn MotionService,
    room: RoomId,
    document: &Document,
    scale: FrameScale,
) -> Result<ExportDocument, RemoteError> {
    if !service.list_rooms()?.iter().any(|candidate| candidate.id == room) {
        return Err(RemoteError::Rejected(format!("unknown room {room}")));
    }

    let motion = convert(document, scale);
    service.send_motion(room, &motion)?;
    tracing::info!("Sent motion to room {}", room);
    Ok(motion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion_editor_sequencer::document::HEAD_TRACK;
    use motion_editor_sequencer::HeadKeyframe;

    #[derive(Default)]
    struct FakeService {
        token: Option<Token>,
        rooms: Vec<Room>,
        sent: Vec<(RoomId, ExportDocument)>,
    }

    impl MotionService for FakeService {
        fn login(&mut self) -> Result<Token, RemoteError> {
            let token = Token("session".to_string());
            self.token = Some(token.clone());
            Ok(token)
        }

        fn account_info(&self) -> Result<AccountInfo, RemoteError> {
            self.token.as_ref().ok_or(RemoteError::NotLoggedIn)?;
            Ok(AccountInfo {
                name: "tester".to_string(),
                email: None,
            })
        }

        fn list_rooms(&self) -> Result<Vec<Room>, RemoteError> {
            self.token.as_ref().ok_or(RemoteError::NotLoggedIn)?;
            Ok(self.rooms.clone())
        }

        fn send_motion(&mut self, room: RoomId, motion: &ExportDocument) -> Result<(), RemoteError> {
            self.token.as_ref().ok_or(RemoteError::NotLoggedIn)?;
            self.sent.push((room, motion.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_publish_requires_login() {
        let mut service = FakeService::default();
        let err = publish(&mut service, RoomId::new(), &Document::default(), FrameScale::default()).unwrap_err();
        assert_eq!(err, RemoteError::NotLoggedIn);
    }

    #[test]
    fn test_publish_sends_converted_motion() {
        let room = Room {
            id: RoomId::new(),
            name: "Lab".to_string(),
        };
        let mut service = FakeService {
            rooms: vec![room.clone()],
            ..Default::default()
        };
        service.login().unwrap();
        assert_eq!(service.account_info().unwrap().name, "tester");

        let document = Document::default()
            .add_keyframe(HEAD_TRACK, 5, HeadKeyframe::at(1.0, 1.0).into())
            .unwrap();
        let motion = publish(&mut service, room.id, &document, FrameScale::default()).unwrap();

        assert_eq!(motion.head[0].duration, 500);
        assert_eq!(service.sent.len(), 1);
        assert_eq!(service.sent[0].0, room.id);
    }

    #[test]
    fn test_publish_rejects_unknown_room() {
        let mut service = FakeService::default();
        service.login().unwrap();
        let err = publish(&mut service, RoomId::new(), &Document::default(), FrameScale::default()).unwrap_err();
        assert!(matches!(err, RemoteError::Rejected(_)));
        assert!(service.sent.is_empty());
    }
}
