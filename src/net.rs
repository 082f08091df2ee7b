//! Subscription capability and the helpers built on top of it.

use crate::config::SUBSCRIBE_TIMEOUT_MS;
use crate::event::{Filter, SignedEvent};
use crate::wire::RelayMessage;
use futures::stream::LocalBoxStream;
use futures::StreamExt;
use log::debug;
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Delivery options for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Send the request right away instead of after a short dispatch delay.
    pub immediate: bool,
    /// Give up on relays that have not finished after this long.
    pub timeout_ms: u32,
    /// Complete once every relay has sent EOSE.
    pub close_on_eose: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            immediate: true,
            timeout_ms: SUBSCRIBE_TIMEOUT_MS,
            close_on_eose: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscribeRequest {
    pub relays: Vec<String>,
    pub filters: Vec<Filter>,
    pub options: SubscribeOptions,
}

impl SubscribeRequest {
    pub fn new(relays: Vec<String>, filters: Vec<Filter>) -> Self {
        Self {
            relays,
            filters,
            options: SubscribeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SubscribeOptions) -> Self {
        self.options = options;
        self
    }
}

/// An event together with the relay that delivered it.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayEvent {
    pub relay: String,
    pub event: SignedEvent,
}

#[derive(Debug)]
pub enum RelayError {
    NoRelays,
    Connection { url: String, reason: String },
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::NoRelays => write!(f, "No relay could be reached"),
            RelayError::Connection { url, reason } => {
                write!(f, "Connection to {} failed: {}", url, reason)
            }
        }
    }
}

impl std::error::Error for RelayError {}

/// Stream of matching events; it ends when the subscription completes.
pub type Subscription = LocalBoxStream<'static, Result<RelayEvent, RelayError>>;

/// The "subscribe to filtered events" capability.
pub trait RelayClient {
    fn subscribe(&self, request: SubscribeRequest) -> Subscription;
}

/// Drive a subscription to completion, handing every event to `on_event`.
///
/// Returns the number of events delivered. The first error ends the load.
pub async fn load(
    client: &dyn RelayClient,
    request: SubscribeRequest,
    mut on_event: impl FnMut(SignedEvent),
) -> Result<usize, RelayError> {
    let mut subscription = client.subscribe(request);
    let mut delivered = 0;
    while let Some(item) = subscription.next().await {
        let RelayEvent { relay, event } = item?;
        debug!("event {} from {}", event.id, relay);
        on_event(event);
        delivered += 1;
    }
    Ok(delivered)
}

thread_local! {
    static NEXT_SUBSCRIPTION: Cell<u64> = const { Cell::new(0) };
}

/// Page-unique subscription id.
pub fn next_subscription_id() -> String {
    let n = NEXT_SUBSCRIPTION.with(|c| {
        let n = c.get();
        c.set(n + 1);
        n
    });
    format!("sub-{}", n)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelayState {
    Pending,
    Eose,
    Closed,
}

/// What the caller should do with a frame fed to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerStep {
    Deliver(SignedEvent),
    Ignore,
}

/// Per-subscription bookkeeping across relays: which relays have finished
/// and which event ids were already delivered. The first relay to deliver an
/// event id wins; later copies are dropped, as are events matching none of
/// the subscription's filters.
#[derive(Debug)]
pub struct SubscriptionTracker {
    subscription_id: String,
    filters: Vec<Filter>,
    close_on_eose: bool,
    relays: HashMap<String, RelayState>,
    seen: HashSet<String>,
}

impl SubscriptionTracker {
    pub fn new(
        subscription_id: impl Into<String>,
        relays: &[String],
        filters: Vec<Filter>,
        close_on_eose: bool,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            filters,
            close_on_eose,
            relays: relays
                .iter()
                .map(|r| (r.clone(), RelayState::Pending))
                .collect(),
            seen: HashSet::new(),
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn on_message(&mut self, relay: &str, message: RelayMessage) -> TrackerStep {
        if let Some(id) = message.subscription_id() {
            if id != self.subscription_id {
                return TrackerStep::Ignore;
            }
        }

        match message {
            RelayMessage::Event { event, .. } => {
                if !self.accepts(&event) {
                    debug!("{} sent {} outside the filters", relay, event.id);
                    return TrackerStep::Ignore;
                }
                if self.seen.insert(event.id.clone()) {
                    TrackerStep::Deliver(event)
                } else {
                    TrackerStep::Ignore
                }
            }
            RelayMessage::Eose { .. } => {
                self.mark(relay, RelayState::Eose);
                TrackerStep::Ignore
            }
            RelayMessage::Closed { message, .. } => {
                debug!("{} closed {}: {}", relay, self.subscription_id, message);
                self.mark(relay, RelayState::Closed);
                TrackerStep::Ignore
            }
            RelayMessage::Notice { message } => {
                debug!("notice from {}: {}", relay, message);
                TrackerStep::Ignore
            }
            RelayMessage::Ok { .. } => TrackerStep::Ignore,
        }
    }

    /// Record that the connection to `relay` is gone.
    pub fn on_disconnect(&mut self, relay: &str) {
        self.mark(relay, RelayState::Closed);
    }

    pub fn is_complete(&self) -> bool {
        self.relays.values().all(|state| match state {
            RelayState::Closed => true,
            RelayState::Eose => self.close_on_eose,
            RelayState::Pending => false,
        })
    }

    /// Relays that never closed their side of the subscription.
    pub fn open_relays(&self) -> Vec<String> {
        self.relays
            .iter()
            .filter(|(_, state)| **state != RelayState::Closed)
            .map(|(relay, _)| relay.clone())
            .collect()
    }

    pub fn all_disconnected(&self) -> bool {
        self.relays.values().all(|s| *s == RelayState::Closed)
    }

    fn accepts(&self, event: &SignedEvent) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|f| f.matches(event))
    }

    fn mark(&mut self, relay: &str, state: RelayState) {
        if let Some(current) = self.relays.get_mut(relay) {
            // Closed is terminal.
            if *current != RelayState::Closed {
                *current = state;
            }
        }
    }
}
