//! Signed events and subscription filters.

use serde::{Deserialize, Serialize};

/// Event kinds this crate cares about.
pub mod kinds {
    pub const PROFILE: u16 = 0;
    pub const JOB_REQUEST_DISCOVERY: u16 = 5302;
    pub const JOB_REQUEST_SEARCH: u16 = 5303;
}

/// An immutable signed record as delivered by a relay.
///
/// Signatures are carried but never verified here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEvent {
    pub id: String,
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u16,
    #[serde(default)]
    pub tags: Vec<Vec<String>>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sig: String,
}

/// Subscription filter. Absent fields are left out of the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<u16>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = Some(authors.into_iter().map(Into::into).collect());
        self
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = u16>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn since(mut self, since: u64) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: u64) -> Self {
        self.until = Some(until);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Local check of whether `event` satisfies every present constraint.
    pub fn matches(&self, event: &SignedEvent) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.iter().any(|id| *id == event.id) {
                return false;
            }
        }
        if let Some(authors) = &self.authors {
            if !authors.iter().any(|a| *a == event.pubkey) {
                return false;
            }
        }
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }
        if self.since.is_some_and(|since| event.created_at < since) {
            return false;
        }
        if self.until.is_some_and(|until| event.created_at > until) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(pubkey: &str, kind: u16, created_at: u64) -> SignedEvent {
        SignedEvent {
            id: format!("{pubkey}-{kind}-{created_at}"),
            pubkey: pubkey.to_string(),
            created_at,
            kind,
            tags: Vec::new(),
            content: String::new(),
            sig: String::new(),
        }
    }

    #[test]
    fn profile_filter_serializes_only_present_fields() {
        let filter = Filter::new().authors(["a", "b"]).kinds([kinds::PROFILE]);
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"authors": ["a", "b"], "kinds": [0]})
        );
    }

    #[test]
    fn event_defaults_missing_optional_fields() {
        let raw = r#"{"id":"x","pubkey":"p","created_at":5,"kind":1}"#;
        let ev: SignedEvent = serde_json::from_str(raw).unwrap();
        assert!(ev.tags.is_empty());
        assert_eq!(ev.content, "");
    }

    #[test]
    fn matches_checks_every_constraint() {
        let filter = Filter::new().authors(["a"]).kinds([5302]).since(10).until(20);
        assert!(filter.matches(&event("a", 5302, 15)));
        assert!(!filter.matches(&event("b", 5302, 15)));
        assert!(!filter.matches(&event("a", 0, 15)));
        assert!(!filter.matches(&event("a", 5302, 9)));
        assert!(!filter.matches(&event("a", 5302, 21)));
        assert!(Filter::new().matches(&event("z", 7, 0)));
    }
}
