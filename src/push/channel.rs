use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use url::Url;

use crate::api::models::Message;
use crate::error::PushError;
use crate::push::codec::{self, Packet, Reply, SocketPacket};

pub const NEW_MESSAGE_EVENT: &str = "newMessage";

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Connected,
    Disconnected,
    NewMessage(Message),
}

/// Shared handle to the push connection. Views subscribe to it instead of
/// opening sockets of their own; dropping the handle stops the connection.
pub struct PushChannel {
    tx: broadcast::Sender<PushEvent>,
    connected: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl PushChannel {
    /// A channel with no connection behind it. Events only arrive through
    /// [`PushChannel::publish`].
    pub fn offline() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx, connected: Arc::new(AtomicBool::new(false)), task: None }
    }

    /// Connect on the current tokio runtime.
    pub fn connect(push_url: &str, reconnect_delay: Duration) -> Result<Self, PushError> {
        Self::connect_on(&Handle::current(), push_url, reconnect_delay)
    }

    pub fn connect_on(handle: &Handle, push_url: &str, reconnect_delay: Duration) -> Result<Self, PushError> {
        let url = socket_url(push_url)?;
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let connected = Arc::new(AtomicBool::new(false));
        let task = handle.spawn(run(url, tx.clone(), connected.clone(), reconnect_delay));
        Ok(Self { tx, connected, task: Some(task) })
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription { rx: self.tx.subscribe() }
    }

    /// Deliver an event to current subscribers as if it came off the wire.
    pub fn publish(&self, event: PushEvent) {
        // no subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Whether the server has accepted the namespace connect on the
    /// current socket.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// One listener on the push channel. Dropping it unsubscribes.
pub struct Subscription {
    rx: broadcast::Receiver<PushEvent>,
}

impl Subscription {
    /// Next event, or `None` once the channel is gone.
    pub async fn recv(&mut self) -> Option<PushEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("push subscriber lagged, {skipped} events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Forwards push events to one consumer from a runtime task. Following a
/// new target or dropping the listener ends the previous forwarding task,
/// and with it that task's subscription.
#[derive(Default)]
pub struct Listener {
    task: Option<JoinHandle<()>>,
}

impl Listener {
    /// Subscribe now and hand every event to `forward` until it returns
    /// `false` or the listener moves on.
    pub fn follow<F>(&mut self, handle: &Handle, channel: &PushChannel, mut forward: F)
    where
        F: FnMut(PushEvent) -> bool + Send + 'static,
    {
        self.stop();
        let mut sub = channel.subscribe();
        self.task = Some(handle.spawn(async move {
            while let Some(event) = sub.recv().await {
                if !forward(event) {
                    break;
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Map the configured push URL onto the engine.io websocket endpoint.
pub fn socket_url(push_url: &str) -> Result<Url, PushError> {
    let mut url = Url::parse(push_url.trim())?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(PushError::Scheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|_| PushError::Scheme(scheme.to_string()))?;
    if url.path() == "/" || url.path().is_empty() {
        url.set_path("/socket.io/");
    }
    url.query_pairs_mut()
        .clear()
        .append_pair("EIO", "4")
        .append_pair("transport", "websocket");
    Ok(url)
}

async fn run(
    url: Url,
    tx: broadcast::Sender<PushEvent>,
    connected: Arc<AtomicBool>,
    reconnect_delay: Duration,
) {
    loop {
        match session(&url, &tx, &connected).await {
            Ok(()) => log::info!("push connection closed"),
            Err(e) => log::warn!("push connection failed: {e}"),
        }
        connected.store(false, Ordering::Relaxed);
        let _ = tx.send(PushEvent::Disconnected);
        tokio::time::sleep(reconnect_delay).await;
        log::debug!("reconnecting push channel to {url}");
    }
}

async fn session(
    url: &Url,
    tx: &broadcast::Sender<PushEvent>,
    connected: &AtomicBool,
) -> Result<(), PushError> {
    let (ws, _) = connect_async(url.as_str()).await?;
    log::info!("push websocket connected to {url}");
    let (mut sink, mut stream) = ws.split();

    // any frame re-arms the deadline; the server pings every interval
    let mut deadline = codec::heartbeat_deadline(codec::DEFAULT_PING_INTERVAL_MS, codec::DEFAULT_PING_TIMEOUT_MS);
    loop {
        let frame = match tokio::time::timeout(deadline, stream.next()).await {
            Ok(Some(frame)) => frame?,
            Ok(None) => return Ok(()),
            Err(_) => return Err(PushError::Silent(deadline)),
        };
        let text = match frame {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => return Ok(()),
            _ => continue,
        };
        let packet = match codec::decode(&text) {
            Ok(packet) => packet,
            Err(e) => {
                log::warn!("ignoring push frame {text:?}: {e}");
                continue;
            }
        };
        match packet {
            Packet::Open(handshake) => {
                log::debug!("engine.io session {}", handshake.sid);
                deadline = handshake.heartbeat_deadline();
                sink.send(WsMessage::Text(codec::encode(Reply::Connect).into())).await?;
            }
            Packet::Ping => sink.send(WsMessage::Text(codec::encode(Reply::Pong).into())).await?,
            Packet::Close => return Ok(()),
            Packet::Message(SocketPacket::Connect(_)) => {
                connected.store(true, Ordering::Relaxed);
                let _ = tx.send(PushEvent::Connected);
            }
            Packet::Message(SocketPacket::Disconnect) => return Ok(()),
            Packet::Message(SocketPacket::ConnectError(data)) => {
                return Err(PushError::Protocol(format!("connect refused: {data}")));
            }
            Packet::Message(SocketPacket::Event { name, mut args, .. }) if name == NEW_MESSAGE_EVENT => {
                if args.is_empty() {
                    log::warn!("{NEW_MESSAGE_EVENT} without payload");
                    continue;
                }
                match serde_json::from_value::<Message>(args.swap_remove(0)) {
                    Ok(message) => {
                        let _ = tx.send(PushEvent::NewMessage(message));
                    }
                    Err(e) => log::warn!("undecodable {NEW_MESSAGE_EVENT} payload: {e}"),
                }
            }
            Packet::Message(SocketPacket::Event { name, .. }) => {
                log::trace!("ignoring push event {name}");
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_url_from_http_base() {
        let url = socket_url("http://localhost:5000").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:5000/socket.io/?EIO=4&transport=websocket");
        let url = socket_url("https://chat.example.com/").unwrap();
        assert_eq!(url.as_str(), "wss://chat.example.com/socket.io/?EIO=4&transport=websocket");
    }

    #[test]
    fn socket_url_keeps_custom_path() {
        let url = socket_url("ws://host:1/custom/io/").unwrap();
        assert_eq!(url.as_str(), "ws://host:1/custom/io/?EIO=4&transport=websocket");
    }

    #[test]
    fn socket_url_rejects_other_schemes() {
        assert!(matches!(socket_url("ftp://host"), Err(PushError::Scheme(_))));
    }

    #[tokio::test]
    async fn dropped_subscription_unsubscribes() {
        let channel = PushChannel::offline();
        let sub = channel.subscribe();
        assert_eq!(channel.subscriber_count(), 1);
        drop(sub);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn published_events_reach_every_subscriber() {
        let channel = PushChannel::offline();
        let mut a = channel.subscribe();
        let mut b = channel.subscribe();
        channel.publish(PushEvent::Connected);
        assert_eq!(a.recv().await, Some(PushEvent::Connected));
        assert_eq!(b.recv().await, Some(PushEvent::Connected));
    }

    async fn until(mut done: impl FnMut() -> bool) {
        for _ in 0..100 {
            if done() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn following_a_new_chat_drops_the_old_subscription() {
        let channel = PushChannel::offline();
        let handle = Handle::current();
        let (first_tx, mut first_rx) = tokio::sync::mpsc::unbounded_channel();
        let (second_tx, mut second_rx) = tokio::sync::mpsc::unbounded_channel();

        let mut listener = Listener::default();
        listener.follow(&handle, &channel, move |e| first_tx.send(e).is_ok());
        assert_eq!(channel.subscriber_count(), 1);

        listener.follow(&handle, &channel, move |e| second_tx.send(e).is_ok());
        until(|| channel.subscriber_count() == 1).await;

        channel.publish(PushEvent::Disconnected);
        assert_eq!(second_rx.recv().await, Some(PushEvent::Disconnected));
        // the first forwarder is gone along with its sender
        assert_eq!(first_rx.recv().await, None);

        drop(listener);
        until(|| channel.subscriber_count() == 0).await;
    }

    #[tokio::test]
    async fn offline_channel_reports_disconnected() {
        assert!(!PushChannel::offline().is_connected());
    }
}
