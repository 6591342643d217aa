//! WebSocket [`Transport`] backed by tokio-tungstenite.
//!
//! Every `open` spawns a session task that owns the socket. Queries reach
//! the task over an unbounded channel; frames, the open handshake and the
//! final close flow back to the driver as [`TransportEvent`]s.

use futures::{SinkExt, StreamExt};
use shared::{Endpoint, Transport, TransportError, TransportEvent};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

pub struct WsTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    outbound: Option<mpsc::UnboundedSender<String>>,
}

impl WsTransport {
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            events,
            outbound: None,
        }
    }

    /// Convenience constructor returning the event receiver alongside.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl Transport for WsTransport {
    /// Must be called from inside a tokio runtime.
    fn open(&mut self, endpoint: &Endpoint) -> Result<(), TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);
        tokio::spawn(run_socket(endpoint.url(), rx, self.events.clone()));
        Ok(())
    }

    fn send(&mut self, text: &str) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::NotOpen)?;
        outbound
            .send(text.to_string())
            .map_err(|_| TransportError::Send("session task has stopped".into()))
    }
}

async fn run_socket(
    url: String,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let socket = match connect_async(url.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(err) => {
            tracing::warn!("failed to connect to {url}: {err}");
            let _ = events.send(TransportEvent::Closed);
            return;
        }
    };
    let _ = events.send(TransportEvent::Opened);

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            query = outbound.recv() => match query {
                Some(text) => {
                    if let Err(err) = sink.send(Message::Text(text)).await {
                        tracing::warn!("failed to write to {url}: {err}");
                        break;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    break;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Message(text));
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::warn!("connection to {url} failed: {err}");
                    break;
                }
            },
        }
    }

    tracing::debug!("socket to {url} closed");
    let _ = events.send(TransportEvent::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_before_open_fails() {
        let (mut transport, _events) = WsTransport::channel();
        assert_eq!(transport.send("1 1 2 2 "), Err(TransportError::NotOpen));
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_close() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (mut transport, mut events) = WsTransport::channel();
        transport.open(&Endpoint::new("127.0.0.1", port)).unwrap();
        assert_eq!(events.recv().await, Some(TransportEvent::Closed));
    }
}
