//! Browser relay client over `WebSocket`.
//!
//! Each subscription opens one connection per relay, sends a `REQ`, and
//! funnels every frame into a single driver task which owns the
//! [`SubscriptionTracker`]. The driver ends the subscription when the tracker
//! reports completion or the timeout fires, then sends `CLOSE` and shuts the
//! connections.

use crate::config::DEFERRED_DISPATCH_MS;
use crate::net::{
    next_subscription_id, RelayClient, RelayError, RelayEvent, SubscribeRequest, Subscription,
    SubscriptionTracker, TrackerStep,
};
use crate::runtime::SharedRuntime;
use crate::utils::js_error_message;
use crate::wire::{ClientMessage, RelayMessage};
use futures::channel::mpsc::{self, UnboundedSender};
use futures::{FutureExt, StreamExt};
use log::{debug, info, warn};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

/// What a relay connection reports back to the driver.
pub enum Inbound {
    Frame { relay: String, text: String },
    Disconnected { relay: String },
}

/// Opens relay connections. A connection sends `req` once it is up and
/// reports frames and disconnects on `inbound`.
pub trait Connector {
    fn connect(
        &self,
        url: &str,
        req: &str,
        inbound: &UnboundedSender<Inbound>,
    ) -> Result<Box<dyn RelayConnection>, String>;
}

pub trait RelayConnection {
    /// Send `close_frame` if the connection is still up, then shut it.
    fn close(self: Box<Self>, close_frame: &str);
}

/// [`Connector`] over browser websockets.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserSockets;

impl Connector for BrowserSockets {
    fn connect(
        &self,
        url: &str,
        req: &str,
        inbound: &UnboundedSender<Inbound>,
    ) -> Result<Box<dyn RelayConnection>, String> {
        Ok(Box::new(SocketConnection::open(url, req, inbound)?))
    }
}

struct SocketConnection {
    socket: WebSocket,
    _on_open: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
}

impl SocketConnection {
    fn open(url: &str, req: &str, inbound: &UnboundedSender<Inbound>) -> Result<Self, String> {
        let socket = WebSocket::new(url).map_err(js_error_message)?;

        let on_open = {
            let socket = socket.clone();
            let req = req.to_string();
            let relay = url.to_string();
            Closure::wrap(Box::new(move |_event: Event| {
                if let Err(err) = socket.send_with_str(&req) {
                    warn!("Failed to send REQ to {}: {}", relay, js_error_message(err));
                }
            }) as Box<dyn FnMut(Event)>)
        };
        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));

        let on_message = {
            let tx = inbound.clone();
            let relay = url.to_string();
            Closure::wrap(Box::new(move |event: MessageEvent| {
                match event.data().as_string() {
                    Some(text) => {
                        let _ = tx.unbounded_send(Inbound::Frame {
                            relay: relay.clone(),
                            text,
                        });
                    }
                    None => debug!("Ignoring non-text frame from {}", relay),
                }
            }) as Box<dyn FnMut(MessageEvent)>)
        };
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        let on_close = {
            let tx = inbound.clone();
            let relay = url.to_string();
            Closure::wrap(Box::new(move |event: CloseEvent| {
                debug!("{} closed (code {})", relay, event.code());
                let _ = tx.unbounded_send(Inbound::Disconnected {
                    relay: relay.clone(),
                });
            }) as Box<dyn FnMut(CloseEvent)>)
        };
        socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        let on_error = {
            let tx = inbound.clone();
            let relay = url.to_string();
            Closure::wrap(Box::new(move |_event: Event| {
                warn!("Socket error on {}", relay);
                let _ = tx.unbounded_send(Inbound::Disconnected {
                    relay: relay.clone(),
                });
            }) as Box<dyn FnMut(Event)>)
        };
        socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        Ok(Self {
            socket,
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
            _on_error: on_error,
        })
    }
}

impl RelayConnection for SocketConnection {
    fn close(self: Box<Self>, close_frame: &str) {
        if self.socket.ready_state() == WebSocket::OPEN {
            let _ = self.socket.send_with_str(close_frame);
        }
        // Detach handlers before the closures are dropped.
        self.socket.set_onopen(None);
        self.socket.set_onmessage(None);
        self.socket.set_onclose(None);
        self.socket.set_onerror(None);
        let _ = self.socket.close();
    }
}

/// [`RelayClient`] speaking NIP-01 over browser websockets.
#[derive(Clone)]
pub struct WebSocketRelayClient {
    runtime: SharedRuntime,
    connector: Rc<dyn Connector>,
}

impl WebSocketRelayClient {
    pub fn new(runtime: SharedRuntime) -> Self {
        Self::with_connector(runtime, Rc::new(BrowserSockets))
    }

    pub fn with_connector(runtime: SharedRuntime, connector: Rc<dyn Connector>) -> Self {
        Self { runtime, connector }
    }
}

impl RelayClient for WebSocketRelayClient {
    fn subscribe(&self, request: SubscribeRequest) -> Subscription {
        let (tx, rx) = mpsc::unbounded();
        let runtime = Rc::clone(&self.runtime);
        let connector = Rc::clone(&self.connector);
        self.runtime
            .spawn(Box::pin(drive_subscription(runtime, connector, request, tx)));
        rx.boxed_local()
    }
}

async fn drive_subscription(
    runtime: SharedRuntime,
    connector: Rc<dyn Connector>,
    request: SubscribeRequest,
    out: UnboundedSender<Result<RelayEvent, RelayError>>,
) {
    if request.relays.is_empty() {
        let _ = out.unbounded_send(Err(RelayError::NoRelays));
        return;
    }
    if !request.options.immediate {
        runtime.sleep(DEFERRED_DISPATCH_MS).await;
    }

    let subscription_id = next_subscription_id();
    let req = ClientMessage::Req {
        subscription_id: subscription_id.clone(),
        filters: request.filters.clone(),
    }
    .to_json();

    let mut tracker = SubscriptionTracker::new(
        subscription_id.as_str(),
        &request.relays,
        request.filters.clone(),
        request.options.close_on_eose,
    );
    let (inbound_tx, mut inbound) = mpsc::unbounded::<Inbound>();
    let mut connections = Vec::with_capacity(request.relays.len());
    let mut last_error = None;

    for url in &request.relays {
        match connector.connect(url, &req, &inbound_tx) {
            Ok(connection) => connections.push(connection),
            Err(reason) => {
                warn!("Could not open {}: {}", url, reason);
                tracker.on_disconnect(url);
                last_error = Some(RelayError::Connection {
                    url: url.clone(),
                    reason,
                });
            }
        }
    }
    drop(inbound_tx);

    if tracker.all_disconnected() {
        let _ = out.unbounded_send(Err(last_error.unwrap_or(RelayError::NoRelays)));
        return;
    }

    let mut timeout = runtime.sleep(request.options.timeout_ms).fuse();
    let mut delivered = 0usize;
    while !tracker.is_complete() {
        futures::select! {
            next = inbound.next() => match next {
                Some(Inbound::Frame { relay, text }) => match RelayMessage::parse(&text) {
                    Ok(message) => {
                        if let TrackerStep::Deliver(event) = tracker.on_message(&relay, message) {
                            delivered += 1;
                            if out.unbounded_send(Ok(RelayEvent { relay, event })).is_err() {
                                debug!("{} dropped by its consumer", subscription_id);
                                break;
                            }
                        }
                    }
                    Err(e) => debug!("Ignoring frame from {}: {}", relay, e),
                },
                Some(Inbound::Disconnected { relay }) => tracker.on_disconnect(&relay),
                None => break,
            },
            _ = timeout => {
                info!(
                    "{} timed out waiting on {:?}",
                    subscription_id,
                    tracker.open_relays()
                );
                break;
            }
        }
    }

    debug!("{} finished with {} events", subscription_id, delivered);
    let close = ClientMessage::Close {
        subscription_id: subscription_id.clone(),
    }
    .to_json();
    for connection in connections {
        connection.close(&close);
    }
}
