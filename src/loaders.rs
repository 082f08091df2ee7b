//! Profile and content loaders.
//!
//! [`ProfileLoader`] coalesces profile requests into one kind-0 subscription
//! per batch window and writes decoded profiles into the [`ProfileStore`].
//! [`load_data`] runs the broad content subscription and feeds every author
//! it sees into the profile loader.

use crate::batch::Batcher;
use crate::cache::{Profile, ProfileStore};
use crate::config::{
    CONTENT_LIMIT, CONTENT_WINDOW_DAYS, PROFILE_BATCH_MS, PROFILE_EVENT_BATCH_MS,
};
use crate::event::{kinds, Filter, SignedEvent};
use crate::net::{load, RelayClient, RelayError, SubscribeRequest};
use crate::relays::{relay_list, CONTENT_RELAYS, INDEXER_RELAYS};
use crate::runtime::{now, SharedRuntime};
use crate::utils::DAY_SECS;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::rc::Rc;

/// Tuning for [`ProfileLoader`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// How long requested keys accumulate before one lookup is issued.
    pub batch_ms: u32,
    /// How long inbound profile events accumulate before one cache update.
    pub event_batch_ms: u32,
    pub relays: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_ms: PROFILE_BATCH_MS,
            event_batch_ms: PROFILE_EVENT_BATCH_MS,
            relays: relay_list(INDEXER_RELAYS),
        }
    }
}

/// Authors worth looking up: `requested` in first-seen order, without
/// duplicates and without keys the cache already holds.
pub fn missing_authors(requested: &[String], store: &ProfileStore) -> Vec<String> {
    let mut seen = HashSet::with_capacity(requested.len());
    requested
        .iter()
        .filter(|pk| seen.insert(pk.as_str()) && !store.contains(pk))
        .cloned()
        .collect()
}

pub fn profile_filter(authors: Vec<String>) -> Filter {
    Filter::new().authors(authors).kinds([kinds::PROFILE])
}

/// Content catalog filter: job requests from the last 30 days.
pub fn content_filter(now_secs: u64) -> Filter {
    Filter::new()
        .kinds([kinds::JOB_REQUEST_DISCOVERY, kinds::JOB_REQUEST_SEARCH])
        .since(now_secs.saturating_sub(DAY_SECS * CONTENT_WINDOW_DAYS))
        .limit(CONTENT_LIMIT)
}

/// Decode a kind-0 payload. Anything but a JSON object is rejected.
pub fn parse_profile(content: &str) -> Option<Profile> {
    serde_json::from_str::<Profile>(content).ok()
}

/// Write every decodable profile in `events` under its author.
/// Malformed payloads leave the author's entry untouched.
pub fn apply_profile_events(store: &ProfileStore, events: Vec<SignedEvent>) -> usize {
    store.update(|profiles| {
        let mut applied = 0;
        for event in events {
            match parse_profile(&event.content) {
                Some(profile) => {
                    profiles.insert(event.pubkey, profile);
                    applied += 1;
                }
                None => debug!("Dropping malformed profile from {}", event.pubkey),
            }
        }
        applied
    })
}

struct LoaderInner {
    client: Rc<dyn RelayClient>,
    store: ProfileStore,
    runtime: SharedRuntime,
    config: LoaderConfig,
}

/// Batched profile lookups. Cheap to clone; clones share one batch.
#[derive(Clone)]
pub struct ProfileLoader {
    inner: Rc<LoaderInner>,
    keys: Batcher<String>,
}

impl PartialEq for ProfileLoader {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl ProfileLoader {
    pub fn new(
        client: Rc<dyn RelayClient>,
        store: ProfileStore,
        runtime: SharedRuntime,
        config: LoaderConfig,
    ) -> Self {
        let inner = Rc::new(LoaderInner {
            client,
            store,
            runtime: Rc::clone(&runtime),
            config,
        });
        let keys = {
            let inner = Rc::clone(&inner);
            Batcher::new(inner.config.batch_ms, runtime, move |pubkeys: Vec<String>| {
                flush_profile_batch(&inner, pubkeys)
            })
        };
        Self { inner, keys }
    }

    /// Queue `pubkey` for the next lookup. The result shows up in the store.
    pub fn request_profile(&self, pubkey: impl Into<String>) {
        self.keys.push(pubkey.into());
    }

    pub fn store(&self) -> &ProfileStore {
        &self.inner.store
    }

    pub fn client(&self) -> Rc<dyn RelayClient> {
        Rc::clone(&self.inner.client)
    }
}

fn flush_profile_batch(inner: &Rc<LoaderInner>, pubkeys: Vec<String>) {
    let authors = missing_authors(&pubkeys, &inner.store);
    if authors.is_empty() {
        debug!("All {} requested profiles already cached", pubkeys.len());
        return;
    }
    info!("Looking up {} profiles", authors.len());

    let events = {
        let store = inner.store.clone();
        Batcher::new(
            inner.config.event_batch_ms,
            Rc::clone(&inner.runtime),
            move |events: Vec<SignedEvent>| {
                let applied = apply_profile_events(&store, events);
                debug!("Cached {} profiles", applied);
            },
        )
    };
    let request = SubscribeRequest::new(inner.config.relays.clone(), vec![profile_filter(authors)]);
    let client = Rc::clone(&inner.client);

    inner.runtime.spawn(Box::pin(async move {
        if let Err(err) = load(client.as_ref(), request, |event| events.push(event)).await {
            warn!("Profile lookup failed: {}", err);
        }
    }));
}

/// Subscribe to the content catalog and request the profile of every author
/// seen. Each event is also handed to `on_event`.
pub async fn load_data(
    loader: &ProfileLoader,
    mut on_event: impl FnMut(SignedEvent),
) -> Result<usize, RelayError> {
    let request = SubscribeRequest::new(relay_list(CONTENT_RELAYS), vec![content_filter(now())]);
    let client = loader.client();
    load(client.as_ref(), request, |event| {
        loader.request_profile(event.pubkey.clone());
        on_event(event);
    })
    .await
}
