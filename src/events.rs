use chrono::{DateTime, Local};
use uuid::Uuid;

use crate::error::TransportError;

/// Who said a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "Bạn",
            Role::Model => "DUT",
        }
    }
}

/// One turn of the conversation
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Local::now(),
        }
    }
}

/// Whether a reply is being waited for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    AwaitingResponse,
}

/// Posted by a background reply stream back to the conversation.
///
/// `token` is the reset token current when the stream started.
#[derive(Debug)]
pub struct StreamUpdate {
    pub token: u64,
    pub kind: StreamUpdateKind,
}

#[derive(Debug)]
pub enum StreamUpdateKind {
    Fragment(String),
    Completed,
    Failed(TransportError),
}

impl StreamUpdate {
    pub fn fragment(token: u64, text: String) -> Self {
        Self {
            token,
            kind: StreamUpdateKind::Fragment(text),
        }
    }

    pub fn finished(token: u64, result: Result<(), TransportError>) -> Self {
        let kind = match result {
            Ok(()) => StreamUpdateKind::Completed,
            Err(error) => StreamUpdateKind::Failed(error),
        };
        Self { token, kind }
    }
}
