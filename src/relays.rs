//! Relay catalogs and relay URL shape checks.

use once_cell::sync::Lazy;
use regex::Regex;

/// Relays queried for profile (kind 0) lookups.
pub const INDEXER_RELAYS: &[&str] = &[
    "wss://purplepag.es",
    "wss://relay.damus.io",
    "wss://relay.nostr.band",
];

/// Relays queried for general content.
pub const CONTENT_RELAYS: &[&str] = &[
    "wss://relay.snort.social",
    "wss://relay.damus.io",
    "wss://offchain.pub",
    "wss://relay.f7z.io",
    "wss://dvms.f7z.io",
    "wss://nos.lol",
    "wss://relay.nostr.net",
    "wss://relay.nostr.band",
];

// scheme://host[:port][/path]
static RELAY_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^wss?://([a-zA-Z0-9-]+(?:\.[a-zA-Z0-9-]+)+)(?::(\d{1,5}))?(?:/[^\s?#]*)?$")
        .unwrap()
});
static IPV4_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})$").unwrap());

/// Owned copy of a catalog, ready to go into a subscribe request.
pub fn relay_list(catalog: &[&str]) -> Vec<String> {
    catalog.iter().map(|url| url.to_string()).collect()
}

/// Whether `url` is a relay address worth sharing with other clients.
///
/// Rejects non-websocket schemes, credentials, hosts without a dot, and
/// loopback, private-network or onion addresses.
pub fn is_shareable_relay_url(url: &str) -> bool {
    let trimmed = url.trim();
    let Some(captures) = RELAY_URL_REGEX.captures(trimmed) else {
        return false;
    };

    let host = captures[1].to_ascii_lowercase();
    if host.ends_with(".onion") || host.ends_with(".local") || host == "localhost" {
        return false;
    }
    if let Some(port) = captures.get(2) {
        match port.as_str().parse::<u32>() {
            Ok(p) if (1..=65535).contains(&p) => {}
            _ => return false,
        }
    }
    if let Some(octets) = IPV4_REGEX.captures(&host) {
        let first: u32 = octets[1].parse().unwrap_or(0);
        let second: u32 = octets[2].parse().unwrap_or(0);
        let private = first == 10
            || first == 127
            || first == 0
            || (first == 192 && second == 168)
            || (first == 172 && (16..=31).contains(&second))
            || (first == 169 && second == 254);
        if private {
            return false;
        }
    }
    true
}
