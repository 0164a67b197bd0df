//! The conversation state machine.
//!
//! A submitted message starts a reply stream on a background task. The task
//! posts every fragment and its final outcome back as a [`StreamUpdate`]
//! tagged with the reset token of the moment it started. Updates are applied
//! on the owner's loop, and only while that token is still current: a reset
//! bumps the token, so anything still in flight from before turns into a
//! no-op. The remote call itself is never aborted.

use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::events::{ControllerState, Message, Role, StreamUpdate, StreamUpdateKind};
use crate::llm::{ChatClient, ChatSession};
use crate::prompts;
use crate::session::SessionManager;
use crate::streaming;

/// What happened to a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// Nothing but whitespace
    Empty,
    /// A reply is still streaming; the text is dropped, not queued
    Busy,
}

/// The reply currently being streamed into the conversation
#[derive(Debug)]
struct PendingReply {
    token: u64,
    placeholder_id: String,
}

pub struct ConversationController<C: ChatClient> {
    sessions: SessionManager<C>,
    messages: Vec<Message>,
    state: ControllerState,
    reset_token: u64,
    pending: Option<PendingReply>,
    updates_tx: mpsc::UnboundedSender<StreamUpdate>,
    updates_rx: mpsc::UnboundedReceiver<StreamUpdate>,
}

impl<C: ChatClient> ConversationController<C> {
    pub fn new(sessions: SessionManager<C>) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            sessions,
            messages: Vec::new(),
            state: ControllerState::Idle,
            reset_token: 0,
            pending: None,
            updates_tx,
            updates_rx,
        }
    }

    /// Send `text` to the model. Must be called inside a tokio runtime.
    pub fn submit(&mut self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Empty;
        }
        if self.state == ControllerState::AwaitingResponse {
            tracing::debug!("submission ignored while awaiting a reply");
            return SubmitOutcome::Busy;
        }

        let token = self.reset_token;
        self.messages.push(Message::new(Role::User, text));
        let placeholder = Message::new(Role::Model, String::new());
        self.pending = Some(PendingReply {
            token,
            placeholder_id: placeholder.id.clone(),
        });
        self.messages.push(placeholder);
        self.state = ControllerState::AwaitingResponse;

        let session = self.sessions.get_session();
        tracing::info!(session = %session.id(), token, chars = text.chars().count(), "message submitted");
        self.spawn_reply(session, text.to_string(), token);

        SubmitOutcome::Accepted
    }

    fn spawn_reply(&self, session: Arc<C::Session>, text: String, token: u64) {
        let updates = self.updates_tx.clone();
        tokio::spawn(async move {
            let fragments = updates.clone();
            let result = streaming::send_streaming(session.as_ref(), &text, |fragment| {
                let _ = fragments.send(StreamUpdate::fragment(token, fragment));
            })
            .await;
            let _ = updates.send(StreamUpdate::finished(token, result));
        });
    }

    /// Apply one update from a reply stream. Returns `false` when the update
    /// was stale and discarded.
    pub fn apply(&mut self, update: StreamUpdate) -> bool {
        if update.token != self.reset_token {
            tracing::debug!(
                update_token = update.token,
                current_token = self.reset_token,
                "discarding stale stream update"
            );
            return false;
        }

        match update.kind {
            StreamUpdateKind::Fragment(text) => {
                if let Some(placeholder) = self.placeholder_mut() {
                    placeholder.content.push_str(&text);
                }
            }
            StreamUpdateKind::Completed => {
                self.finish();
            }
            StreamUpdateKind::Failed(error) => {
                tracing::warn!(token = update.token, %error, "reply failed");
                self.messages.push(Message::new(Role::Model, prompts::APOLOGY));
                self.finish();
            }
        }
        true
    }

    /// Apply every update already waiting, without blocking. Returns how many
    /// were applied (stale ones are not counted).
    pub fn drain_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.updates_rx.try_recv() {
            if self.apply(update) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next update and apply it
    pub async fn pump(&mut self) -> bool {
        match self.updates_rx.recv().await {
            Some(update) => self.apply(update),
            None => false,
        }
    }

    /// Start over: invalidate in-flight replies, clear the conversation and
    /// replace the chat session. Works in either state.
    pub fn reset(&mut self) {
        self.reset_token += 1;
        self.messages.clear();
        self.pending = None;
        self.state = ControllerState::Idle;
        self.sessions.reset_session();
        tracing::info!(token = self.reset_token, session = ?self.session_id(), "conversation reset");
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[cfg(test)]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_awaiting(&self) -> bool {
        self.state == ControllerState::AwaitingResponse
    }

    #[cfg(test)]
    pub fn reset_token(&self) -> u64 {
        self.reset_token
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.sessions.current_session_id()
    }

    /// The model message currently receiving fragments, if any
    pub fn streaming_message(&self) -> Option<&Message> {
        let pending = self.pending.as_ref()?;
        self.messages.iter().find(|m| m.id == pending.placeholder_id)
    }

    fn placeholder_mut(&mut self) -> Option<&mut Message> {
        let pending = self.pending.as_ref()?;
        self.messages
            .iter_mut()
            .rev()
            .find(|m| m.id == pending.placeholder_id)
    }

    fn finish(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(token = pending.token, "reply finished");
        }
        self.state = ControllerState::Idle;
    }
}
