use super::event::ServerMessage;
use super::notifier::{ConnectionId, Notifier};
use actix_web::web::Bytes;
use futures::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Unregisters the connection when the response body is dropped, i.e. when the client goes away.
struct Subscription {
    id: ConnectionId,
    receiver: UnboundedReceiver<ServerMessage>,
    notifier: Arc<Notifier>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.notifier.disconnect(&self.id);
    }
}

/// Opens a connection on `notifier` and returns its id with the SSE body that feeds it.
pub fn open(
    notifier: Arc<Notifier>,
) -> (
    ConnectionId,
    impl Stream<Item = Result<Bytes, Infallible>> + 'static,
) {
    let (id, receiver) = notifier.connect();
    let subscription = Subscription {
        id: id.clone(),
        receiver,
        notifier,
    };

    let body = futures::stream::unfold(subscription, |mut subscription| async move {
        let message = subscription.receiver.recv().await?;
        let frame = Bytes::from(message.to_sse_frame());
        Some((Ok(frame), subscription))
    });

    (id, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn first_frame_announces_connection_and_drop_disconnects() {
        let notifier = Arc::new(Notifier::new());
        let (id, body) = open(notifier.clone());
        let mut body = Box::pin(body);

        let first = body.next().await.unwrap().unwrap();
        let text = String::from_utf8(first.to_vec()).unwrap();
        assert!(text.starts_with("event: connected\n"));
        assert!(text.contains(id.as_str()));
        assert_eq!(notifier.connection_count(), 1);

        drop(body);
        assert_eq!(notifier.connection_count(), 0);
    }
}
