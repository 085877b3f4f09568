//! In-process RCON server for integration tests

#![allow(dead_code)]

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_util::codec::Framed;

use fc_client::Notification;
use fc_core::config::ClientConfig;
use fc_protocol::{Message, MessageFlags, PacketCodec, SequenceId};

/// Upper bound for any single wait in a test
pub const STEP: Duration = Duration::from_secs(5);

/// Listener standing in for a game server
pub struct MockServer {
    listener: TcpListener,
    pub address: String,
}

impl MockServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let address = listener
            .local_addr()
            .expect("Mock server has no address")
            .to_string();
        Self { listener, address }
    }

    /// Client configuration pointing at this server
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.address.clone())
    }

    pub async fn accept(&self) -> Peer {
        let (stream, _) = timeout(STEP, self.listener.accept())
            .await
            .expect("Timed out waiting for client")
            .expect("Accept failed");
        Peer {
            framed: Framed::new(stream, PacketCodec::new()),
        }
    }
}

/// Server side of one client connection
pub struct Peer {
    framed: Framed<TcpStream, PacketCodec>,
}

impl Peer {
    /// Next packet from the client, or `None` once it closed its side
    pub async fn recv(&mut self) -> Option<Message> {
        let item = timeout(STEP, self.framed.next())
            .await
            .expect("Timed out waiting for client packet")?;
        Some(
            item.expect("Stream error")
                .expect("Client sent a malformed packet"),
        )
    }

    /// Next packet, which must be a client request with exactly `words`
    pub async fn expect_request(&mut self, words: &[&str]) -> Message {
        let message = self.recv().await.expect("Client closed the connection");
        assert_eq!(message.flags, MessageFlags::REQUEST, "not a client request");
        assert_eq!(message.words, words, "unexpected request");
        message
    }

    pub async fn send(&mut self, message: Message) {
        self.framed.send(message).await.expect("Failed to send packet");
    }

    /// Answer `request` with `words`
    pub async fn reply(&mut self, request: &Message, words: &[&str]) {
        self.send(response(request.id, words)).await;
    }

    /// Push a server-originated event
    pub async fn event(&mut self, id: u32, words: &[&str]) {
        self.send(Message::event(SequenceId::new(id), strings(words)))
            .await;
    }

    /// Write bytes that bypass the codec
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        let stream = self.framed.get_mut();
        stream.write_all(bytes).await.expect("Failed to write raw bytes");
    }

    /// Wait for the client to close its side
    pub async fn expect_closed(&mut self) {
        let next = timeout(STEP, self.framed.next())
            .await
            .expect("Timed out waiting for client to close");
        assert!(next.is_none(), "expected EOF, got {:?}", next);
    }
}

pub fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// A response to a client request
pub fn response(id: SequenceId, words: &[&str]) -> Message {
    Message::new(
        id,
        MessageFlags {
            response: true,
            from_server: false,
        },
        strings(words),
    )
}

/// Wait for the first notification matching `pred`
pub async fn wait_for<F>(rx: &mut broadcast::Receiver<Notification>, mut pred: F) -> Notification
where
    F: FnMut(&Notification) -> bool,
{
    timeout(STEP, async {
        loop {
            let notification = rx.recv().await.expect("Notification stream ended");
            if pred(&notification) {
                return notification;
            }
        }
    })
    .await
    .expect("Timed out waiting for notification")
}

/// Names of everything already published
pub fn drain_names(rx: &mut broadcast::Receiver<Notification>) -> Vec<String> {
    std::iter::from_fn(|| rx.try_recv().ok())
        .map(|n| n.name().to_string())
        .collect()
}
