//! Event-bus client for the cell's backend message server.
//!
//! Carries the logical event surface (`save_agv_action`, `palette_update`,
//! `agv_history_response`, ...) over a single WebSocket connection. Each text
//! frame is one JSON envelope, `{"event": "<name>", "data": <payload>}`, in
//! both directions. Incoming envelopes are decoded into the shape registered
//! for their event name and handed to that handler in arrival order; a decode
//! failure drops the message without disturbing the receive loop.
//!
//! There is no automatic reconnect: when the connection drops, the client
//! transitions to [`Connectivity::Disconnected`] and stays there until the
//! owner calls [`connect`](BusClient::connect) again. Emits issued while
//! disconnected are dropped, not queued.
//!
//! # Example
//!
//! ```rust,ignore
//! use cellway_api::bus::BusClient;
//! use url::Url;
//!
//! let bus = BusClient::new(Url::parse("ws://127.0.0.1:5000/ws")?);
//! bus.subscribe("login_response", |r: LoginResponse| println!("{}", r.message));
//! bus.connect().await?;
//! bus.emit("login_request", &LoginRequest { .. }).await?;
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::Error;

type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, tungstenite::Message>;
type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;
type RawHandler = Box<dyn Fn(serde_json::Value) + Send + Sync>;

// ── Connectivity ─────────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Disconnected,
    Connecting,
    Connected,
}

// ── Wire envelope ────────────────────────────────────────────────────

/// One event on the wire: `{"event": "...", "data": ...}`.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    event: String,
    data: serde_json::Value,
}

// ── BusClient ────────────────────────────────────────────────────────

/// Handle to the backend event bus.
///
/// Cheaply cloneable via an inner `Arc`. One handler per event name;
/// re-registering an event replaces its handler. Handlers run on the bus
/// receive task and must marshal to their own context before touching
/// state owned elsewhere.
#[derive(Clone)]
pub struct BusClient {
    inner: Arc<BusInner>,
}

struct BusInner {
    url: Url,
    connectivity: watch::Sender<Connectivity>,
    handlers: DashMap<String, RawHandler>,
    link: Mutex<Option<Link>>,
}

/// Per-connection resources, torn down together.
struct Link {
    writer: WsWriter,
    cancel: CancellationToken,
    reader: JoinHandle<()>,
}

impl Link {
    async fn shutdown(mut self) {
        self.cancel.cancel();
        let _ = self.reader.await;
        let _ = self.writer.send(tungstenite::Message::Close(None)).await;
    }
}

impl BusClient {
    /// Create a client for the bus at `url`. Does NOT connect — call
    /// [`connect`](Self::connect) to dial and start the receive loop.
    pub fn new(url: Url) -> Self {
        let (connectivity, _) = watch::channel(Connectivity::Disconnected);
        Self {
            inner: Arc::new(BusInner {
                url,
                connectivity,
                handlers: DashMap::new(),
                link: Mutex::new(None),
            }),
        }
    }

    /// Subscribe to connectivity transitions.
    pub fn connectivity(&self) -> watch::Receiver<Connectivity> {
        self.inner.connectivity.subscribe()
    }

    /// Current connectivity state.
    pub fn is_connected(&self) -> bool {
        *self.inner.connectivity.borrow() == Connectivity::Connected
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Dial the backend and start the receive loop.
    ///
    /// Idempotent: calling while connected (or while another connect is in
    /// flight) is a no-op. A handshake failure leaves the client
    /// [`Disconnected`](Connectivity::Disconnected) and is returned as a
    /// typed error — never a panic.
    pub async fn connect(&self) -> Result<(), Error> {
        let mut link = self.inner.link.lock().await;

        if link.is_some() {
            if self.is_connected() {
                debug!("already connected, connect is a no-op");
                return Ok(());
            }
            // The receive loop died since the last connect; tear the stale
            // link down before redialing.
            if let Some(stale) = link.take() {
                stale.shutdown().await;
            }
        }

        let uri: tungstenite::http::Uri = self
            .inner
            .url
            .as_str()
            .parse()
            .map_err(|e: tungstenite::http::uri::InvalidUri| Error::BusConnect(e.to_string()))?;
        let request = ClientRequestBuilder::new(uri);

        let _ = self.inner.connectivity.send(Connectivity::Connecting);
        info!(url = %self.inner.url, "connecting to event bus");

        let (ws_stream, _response) = match tokio_tungstenite::connect_async(request).await {
            Ok(ok) => ok,
            Err(e) => {
                let _ = self.inner.connectivity.send(Connectivity::Disconnected);
                return Err(Error::BusConnect(e.to_string()));
            }
        };

        let (writer, reader) = ws_stream.split();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(receive_loop(
            reader,
            Arc::clone(&self.inner),
            cancel.clone(),
        ));

        *link = Some(Link {
            writer,
            cancel,
            reader: task,
        });
        let _ = self.inner.connectivity.send(Connectivity::Connected);
        info!("event bus connected");
        Ok(())
    }

    /// Close the connection and join the receive loop.
    ///
    /// No-op if already disconnected.
    pub async fn disconnect(&self) {
        let mut link = self.inner.link.lock().await;
        let Some(active) = link.take() else {
            let _ = self.inner.connectivity.send(Connectivity::Disconnected);
            return;
        };

        active.shutdown().await;
        let _ = self.inner.connectivity.send(Connectivity::Disconnected);
        debug!("disconnected from event bus");
    }

    // ── Emit ─────────────────────────────────────────────────────────

    /// Emit an event to the backend, fire-and-forget.
    ///
    /// Returns `Ok(true)` once the frame is handed to the socket. While
    /// disconnected the emit is silently skipped and `Ok(false)` is
    /// returned — the event is dropped, NOT queued for later delivery.
    /// A caller that needs durability must re-emit after reconnecting.
    pub async fn emit<T: Serialize>(&self, event: &str, payload: &T) -> Result<bool, Error> {
        if !self.is_connected() {
            debug!(event, "emit skipped while disconnected");
            return Ok(false);
        }

        let encode = |e: serde_json::Error| Error::Encode {
            event: event.to_owned(),
            source: e,
        };
        let data = serde_json::to_value(payload).map_err(encode)?;
        let frame = serde_json::to_string(&Envelope {
            event: event.to_owned(),
            data,
        })
        .map_err(encode)?;

        let mut link = self.inner.link.lock().await;
        let Some(active) = link.as_mut() else {
            return Ok(false);
        };

        if let Err(e) = active.writer.send(tungstenite::Message::Text(frame.into())).await {
            warn!(event, error = %e, "emit failed, marking bus disconnected");
            let _ = self.inner.connectivity.send(Connectivity::Disconnected);
            return Ok(false);
        }

        trace!(event, "event emitted");
        Ok(true)
    }

    // ── Subscribe ────────────────────────────────────────────────────

    /// Register the handler for `event`, replacing any previous one.
    ///
    /// The raw payload of each arriving envelope is decoded into `T`; on
    /// decode failure the message is logged and dropped, never delivered
    /// partially typed. Handlers run on the receive task, in arrival order
    /// for a given event.
    pub fn subscribe<T, F>(&self, event: &str, handler: F)
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        let name = event.to_owned();
        let wrapped: RawHandler = Box::new(move |value| {
            match serde_json::from_value::<T>(value) {
                Ok(payload) => handler(payload),
                Err(e) => warn!(event = %name, error = %e, "dropping undecodable payload"),
            }
        });
        self.inner.handlers.insert(event.to_owned(), wrapped);
    }

    /// Remove the handler for `event`, if any.
    pub fn unsubscribe(&self, event: &str) {
        self.inner.handlers.remove(event);
    }
}

// ── Receive loop ─────────────────────────────────────────────────────

/// Single task per connection: read frames until cancellation, a close
/// frame, or a socket error, dispatching each envelope as it arrives.
async fn receive_loop(mut reader: WsReader, inner: Arc<BusInner>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            frame = reader.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        dispatch_frame(&text, &inner.handlers);
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite answers pongs automatically
                        trace!("bus ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        match frame {
                            Some(cf) => info!(code = %cf.code, reason = %cf.reason, "bus close frame received"),
                            None => info!("bus close frame received (no payload)"),
                        }
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "bus receive failed");
                        break;
                    }
                    None => {
                        info!("bus stream ended");
                        break;
                    }
                    _ => {
                        // Binary, Pong, Frame — not part of the protocol
                    }
                }
            }
        }
    }

    let _ = inner.connectivity.send(Connectivity::Disconnected);
    debug!("bus receive loop exited");
}

/// Parse one text frame and route it to the registered handler.
///
/// Malformed envelopes and events without a subscriber are dropped here;
/// nothing thrown by parsing can reach the loop above.
fn dispatch_frame(text: &str, handlers: &DashMap<String, RawHandler>) {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "dropping malformed bus frame");
            return;
        }
    };

    match handlers.get(&envelope.event) {
        Some(handler) => handler(envelope.data),
        None => debug!(event = %envelope.event, "no subscriber for event"),
    }
}

// ── Tests ────────────────────────────────────────────────────────────
