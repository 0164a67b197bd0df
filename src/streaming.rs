use crate::error::TransportError;
use crate::llm::{ChatSession, LlmEvent};

/// Send `message` on `session` and hand each reply fragment to `on_fragment`,
/// in order, until the reply ends.
///
/// Fragments delivered before a failure stay delivered. Nothing is retried.
pub async fn send_streaming<S, F>(
    session: &S,
    message: &str,
    mut on_fragment: F,
) -> Result<(), TransportError>
where
    S: ChatSession + ?Sized,
    F: FnMut(String),
{
    let mut events = session.send_message_stream(message);
    let mut fragments = 0usize;

    while let Some(event) = events.recv().await {
        match event {
            LlmEvent::TextDelta(text) => {
                fragments += 1;
                on_fragment(text);
            }
            LlmEvent::StreamComplete => {
                tracing::debug!(session = %session.id(), fragments, "stream finished");
                return Ok(());
            }
            LlmEvent::Error(error) => {
                tracing::warn!(session = %session.id(), fragments, %error, "stream failed");
                return Err(error);
            }
        }
    }

    tracing::warn!(session = %session.id(), fragments, "stream dropped without completion");
    Err(TransportError::Disconnected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::{settings, ScriptedClient};
    use crate::llm::ChatClient;

    #[tokio::test]
    async fn fragments_are_delivered_in_order() {
        let (client, mut opened) = ScriptedClient::new();
        let session = client.create_chat(&settings());

        let provider = tokio::spawn(async move {
            let stream = opened.recv().await.unwrap();
            assert_eq!(stream.message, "xin chào");
            for text in ["a", "b", "c"] {
                stream.fragment(text).await;
            }
            stream.complete().await;
        });

        let mut received = Vec::new();
        let result = send_streaming(&session, "xin chào", |text| received.push(text)).await;

        provider.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(received, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn failure_keeps_fragments_already_delivered() {
        let (client, mut opened) = ScriptedClient::new();
        let session = client.create_chat(&settings());

        let provider = tokio::spawn(async move {
            let stream = opened.recv().await.unwrap();
            stream.fragment("partial").await;
            stream.fail().await;
        });

        let mut received = Vec::new();
        let result = send_streaming(&session, "q", |text| received.push(text)).await;

        provider.await.unwrap();
        assert!(matches!(result, Err(TransportError::Remote(_))));
        assert_eq!(received, ["partial"]);
    }

    #[tokio::test]
    async fn dropped_stream_is_a_disconnect() {
        let (client, mut opened) = ScriptedClient::new();
        let session = client.create_chat(&settings());

        let provider = tokio::spawn(async move {
            let stream = opened.recv().await.unwrap();
            stream.fragment("half").await;
            drop(stream);
        });

        let mut received = Vec::new();
        let result = send_streaming(&session, "q", |text| received.push(text)).await;

        provider.await.unwrap();
        assert!(matches!(result, Err(TransportError::Disconnected)));
        assert_eq!(received, ["half"]);
    }
}
