//! Client-side helpers for a Nostr job-request feed.
//!
//! - [`loaders::ProfileLoader`] batches profile lookups into one relay
//!   subscription per window and caches the results in [`cache::ProfileStore`].
//! - [`loaders::load_data`] pulls the recent job-request catalog.
//! - [`scroller::Scroller`] drives infinite scrolling off animation frames.
//!
//! Networking goes through [`net::RelayClient`]; the browser implementation is
//! [`web_socket::WebSocketRelayClient`].

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod batch;
pub mod cache;
pub mod components;
pub mod config;
pub mod event;
pub mod hooks;
pub mod loaders;
pub mod logging;
pub mod net;
pub mod relays;
pub mod runtime;
pub mod scroller;
pub mod utils;
pub mod web_socket;
pub mod wire;

pub use cache::{profiles, Profile, ProfileStore};
pub use event::{Filter, SignedEvent};
pub use loaders::{load_data, LoaderConfig, ProfileLoader};
pub use net::{load, RelayClient, RelayError, SubscribeOptions, SubscribeRequest};
pub use scroller::{Scroller, ScrollerOptions};

/// Cached profile for `pubkey` as a plain JS object, or `undefined`.
#[wasm_bindgen(js_name = getProfile)]
pub fn get_profile(pubkey: &str) -> JsValue {
    match profiles().get(pubkey) {
        Some(profile) => profile
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .unwrap_or(JsValue::UNDEFINED),
        None => JsValue::UNDEFINED,
    }
}

/// Number of profiles in the page-wide cache.
#[wasm_bindgen(js_name = profileCount)]
pub fn profile_count() -> usize {
    profiles().len()
}

/// Whether `url` is a relay address worth sharing.
#[wasm_bindgen(js_name = isShareableRelayUrl)]
pub fn is_shareable_relay_url(url: &str) -> bool {
    relays::is_shareable_relay_url(url)
}
