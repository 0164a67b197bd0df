use std::sync::Arc;
use uuid::Uuid;

use crate::llm::{ChatClient, ChatSession, ChatSettings};

/// Owns the one live chat session with the remote model.
///
/// The session is created lazily on first use and replaced, never mutated,
/// when the conversation is reset.
pub struct SessionManager<C: ChatClient> {
    client: C,
    settings: ChatSettings,
    current: Option<Arc<C::Session>>,
}

impl<C: ChatClient> SessionManager<C> {
    pub fn new(client: C, settings: ChatSettings) -> Self {
        Self {
            client,
            settings,
            current: None,
        }
    }

    /// Return the live session, creating it if there is none yet
    pub fn get_session(&mut self) -> Arc<C::Session> {
        let session = self
            .current
            .get_or_insert_with(|| Arc::new(self.client.create_chat(&self.settings)));
        Arc::clone(session)
    }

    /// Drop the live session and create its replacement right away, so the
    /// next message does not pay for setup
    pub fn reset_session(&mut self) {
        let previous = self.current.take().map(|session| session.id());
        let next = self.get_session().id();
        tracing::info!(?previous, %next, "chat session replaced");
    }

    /// Id of the live session, if one exists
    pub fn current_session_id(&self) -> Option<Uuid> {
        self.current.as_ref().map(|session| session.id())
    }

    #[cfg(test)]
    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::{settings, ScriptedClient};

    #[test]
    fn session_is_created_lazily_and_reused() {
        let (client, _streams) = ScriptedClient::new();
        let mut manager = SessionManager::new(client.clone(), settings());

        assert_eq!(client.created(), 0);
        assert_eq!(manager.current_session_id(), None);

        let first = manager.get_session();
        let again = manager.get_session();
        assert_eq!(client.created(), 1);
        assert_eq!(first.id(), again.id());
        assert_eq!(manager.current_session_id(), Some(first.id()));
    }

    #[test]
    fn reset_replaces_session_eagerly() {
        let (client, _streams) = ScriptedClient::new();
        let mut manager = SessionManager::new(client.clone(), settings());
        let before = manager.get_session().id();

        manager.reset_session();

        assert_eq!(client.created(), 2);
        let after = manager.current_session_id().unwrap();
        assert_ne!(before, after);
        assert_eq!(manager.get_session().id(), after);
        assert_eq!(client.created(), 2);
    }

    #[test]
    fn reset_without_session_still_creates_one() {
        let (client, _streams) = ScriptedClient::new();
        let mut manager = SessionManager::new(client.clone(), settings());

        manager.reset_session();

        assert_eq!(client.created(), 1);
        assert!(manager.current_session_id().is_some());
        assert_eq!(manager.settings().model, "test-model");
    }
}
