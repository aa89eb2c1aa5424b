//! Long-lived market-data subscriptions over one WebSocket connection.
//!
//! Single connection, single reader: inbound frames are decompressed,
//! decoded, and parsed strictly in arrival order, then delivered one item
//! per channel send (batch order preserved). Outbound subscribe frames go
//! through a writer task, so sending never blocks reading. Reconnect policy
//! belongs to the transport layer above this client.

use std::collections::HashSet;
use std::io::Read;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tickwire_core::{Endpoint, MarketItem, Params};
use tickwire_converter::{Compression, WsConverter, WsSpec};
use tracing::{debug, info, warn};

use crate::error::FeedError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle. Reconnecting is not modeled here; the owner of
/// the client reconnects by calling [`WsClient::connect`] again, which
/// replays the accumulated subscription set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Subscribed,
}

pub struct WsClient {
    converter: std::sync::Arc<WsConverter>,
    /// Desired subscriptions, accumulated across `subscribe` calls.
    channels: HashSet<String>,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
    shutdown: Option<watch::Sender<bool>>,
    status: ConnectionStatus,
}

impl WsClient {
    pub fn new(spec: WsSpec) -> Result<Self, FeedError> {
        Ok(Self {
            converter: std::sync::Arc::new(WsConverter::new(spec)?),
            channels: HashSet::new(),
            outbound: None,
            reader: None,
            writer: None,
            shutdown: None,
            status: ConnectionStatus::Disconnected,
        })
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn converter(&self) -> &WsConverter {
        &self.converter
    }

    /// Open the connection and return the item stream. Previously requested
    /// channels are re-subscribed immediately.
    pub async fn connect(&mut self) -> Result<mpsc::UnboundedReceiver<MarketItem>, FeedError> {
        self.status = ConnectionStatus::Connecting;
        let (stream, _) = connect_async(self.converter.url())
            .await
            .map_err(|e| {
                self.status = ConnectionStatus::Disconnected;
                FeedError::Transport(format!("connect failed: {e}"))
            })?;
        info!(url = self.converter.url(), "websocket connected");

        let (sink, stream) = stream.split();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (item_tx, item_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        self.writer = Some(tokio::spawn(write_loop(sink, out_rx)));
        self.reader = Some(tokio::spawn(read_loop(
            stream,
            self.converter.clone(),
            item_tx,
            stop_rx,
        )));
        self.outbound = Some(out_tx);
        self.shutdown = Some(stop_tx);
        self.status = ConnectionStatus::Connected;

        if !self.channels.is_empty() {
            let channels: Vec<String> = self.channels.iter().cloned().collect();
            self.send_subscribe(&channels)?;
            self.status = ConnectionStatus::Subscribed;
        }
        Ok(item_rx)
    }

    /// Request channels for every `(endpoint, symbol)` pair. Additive:
    /// repeated calls extend the desired set; channels already requested
    /// are not re-sent. One batched subscribe message covers all newly
    /// added channels.
    pub fn subscribe(
        &mut self,
        endpoints: &[Endpoint],
        symbols: &[&str],
        params: &Params,
    ) -> Result<(), FeedError> {
        let mut added = Vec::new();
        for endpoint in endpoints {
            for symbol in symbols {
                let channel = self.converter.build_subscription(*endpoint, symbol, params)?;
                if self.channels.insert(channel.clone()) {
                    added.push(channel);
                }
            }
        }
        if added.is_empty() {
            return Ok(());
        }
        debug!(count = added.len(), "subscribing to new channels");
        if self.outbound.is_some() {
            self.send_subscribe(&added)?;
            self.status = ConnectionStatus::Subscribed;
        }
        Ok(())
    }

    /// All channels requested so far.
    pub fn subscriptions(&self) -> &HashSet<String> {
        &self.channels
    }

    /// Drop the desired-subscription set (takes effect on next connect).
    pub fn clear_subscriptions(&mut self) {
        self.channels.clear();
    }

    /// Stop frame dispatch. No items are delivered after this returns.
    pub async fn close(&mut self) {
        if let Some(stop) = self.shutdown.take() {
            let _ = stop.send(true);
        }
        self.outbound = None; // writer drains and closes the sink
        if let Some(reader) = self.reader.take() {
            reader.abort();
            let _ = reader.await;
        }
        if let Some(writer) = self.writer.take() {
            let _ = writer.await;
        }
        self.status = ConnectionStatus::Disconnected;
        info!("websocket closed");
    }

    fn send_subscribe(&self, channels: &[String]) -> Result<(), FeedError> {
        let message = self.converter.subscribe_message(channels);
        let tx = self
            .outbound
            .as_ref()
            .ok_or_else(|| FeedError::Transport("not connected".into()))?;
        tx.send(Message::Text(message.to_string()))
            .map_err(|_| FeedError::Transport("connection closed".into()))
    }
}

async fn write_loop(
    mut sink: futures_util::stream::SplitSink<WsStream, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = sink.send(message).await {
            warn!(error = %e, "websocket send failed");
            break;
        }
    }
    let _ = sink.close().await;
}

async fn read_loop(
    mut stream: futures_util::stream::SplitStream<WsStream>,
    converter: std::sync::Arc<WsConverter>,
    items: mpsc::UnboundedSender<MarketItem>,
    stop: watch::Receiver<bool>,
) {
    while let Some(message) = stream.next().await {
        if *stop.borrow() {
            break;
        }
        let bytes = match message {
            Ok(Message::Text(text)) => text.into_bytes(),
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Close(_)) => {
                info!("websocket closed by remote");
                break;
            }
            Ok(_) => continue, // ping/pong handled by tungstenite
            Err(e) => {
                warn!(error = %e, "websocket receive failed");
                break;
            }
        };
        // A bad frame is dropped and reported; it does not tear down the
        // connection.
        let parsed = match decode_frame(&converter, &bytes) {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "dropping undecodable frame");
                continue;
            }
        };
        for item in parsed {
            if *stop.borrow() {
                return;
            }
            if items.send(item).is_err() {
                return; // receiver gone
            }
        }
    }
}

/// Decompress, JSON-decode, and parse one raw frame. Pure with respect to
/// the connection, so it is unit-testable without a socket.
pub fn decode_frame(converter: &WsConverter, bytes: &[u8]) -> Result<Vec<MarketItem>, FeedError> {
    let decoded = decompress(converter.compression(), bytes)?;
    let value: serde_json::Value = serde_json::from_slice(&decoded)
        .map_err(|e| FeedError::Protocol(format!("undecodable frame: {e}")))?;
    Ok(converter.parse(&value)?)
}

/// Apply the exchange's declared frame compression.
pub fn decompress(compression: Compression, bytes: &[u8]) -> Result<Vec<u8>, FeedError> {
    match compression {
        Compression::Identity => Ok(bytes.to_vec()),
        Compression::RawDeflate => {
            let mut out = Vec::new();
            flate2::read::DeflateDecoder::new(bytes)
                .read_to_end(&mut out)
                .map_err(|e| FeedError::Transport(format!("deflate failed: {e}")))?;
            Ok(out)
        }
    }
}
