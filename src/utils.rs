use crate::cache::Profile;
use wasm_bindgen::{JsCast, JsValue};

pub const MINUTE_SECS: u64 = 60;
pub const HOUR_SECS: u64 = 60 * MINUTE_SECS;
pub const DAY_SECS: u64 = 24 * HOUR_SECS;

/// Best-effort text for a thrown JS value.
pub fn js_error_message(err: JsValue) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    match err.dyn_ref::<js_sys::Error>() {
        Some(e) => String::from(e.message()),
        None => format!("{:?}", err),
    }
}

/// Shorten a hex key to `abcdef…7890` for display.
pub fn short_key(pubkey: &str) -> String {
    if pubkey.len() <= 16 || !pubkey.is_ascii() {
        return pubkey.to_string();
    }
    format!("{}…{}", &pubkey[..6], &pubkey[pubkey.len() - 4..])
}

/// Name to show for an author, falling back to the shortened key.
///
/// Looks at `display_name` first, then `name`; blank values are skipped.
pub fn display_name(profile: Option<&Profile>, pubkey: &str) -> String {
    profile
        .and_then(|p| {
            ["display_name", "name"]
                .iter()
                .filter_map(|field| p.get(*field).and_then(|v| v.as_str()))
                .map(str::trim)
                .find(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| short_key(pubkey))
}

/// Coarse age of a timestamp, e.g. "5m", "3h", "12d".
pub fn format_age(created_at: u64, now: u64) -> String {
    let age = now.saturating_sub(created_at);
    if age < MINUTE_SECS {
        "now".to_string()
    } else if age < HOUR_SECS {
        format!("{}m", age / MINUTE_SECS)
    } else if age < DAY_SECS {
        format!("{}h", age / HOUR_SECS)
    } else {
        format!("{}d", age / DAY_SECS)
    }
}
