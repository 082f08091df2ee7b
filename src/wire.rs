//! NIP-01 message framing between client and relay.
//!
//! Every frame is a JSON array whose first element names the message type.

use crate::event::{Filter, SignedEvent};
use serde_json::Value;
use std::fmt;

/// Frames the client sends to a relay.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Req {
        subscription_id: String,
        filters: Vec<Filter>,
    },
    Close {
        subscription_id: String,
    },
}

impl ClientMessage {
    pub fn to_json(&self) -> String {
        let frame = match self {
            ClientMessage::Req {
                subscription_id,
                filters,
            } => {
                let mut parts = Vec::with_capacity(filters.len() + 2);
                parts.push(Value::from("REQ"));
                parts.push(Value::from(subscription_id.as_str()));
                // Filter only holds strings and integers, serialization cannot fail.
                parts.extend(
                    filters
                        .iter()
                        .map(|f| serde_json::to_value(f).unwrap_or(Value::Null)),
                );
                Value::Array(parts)
            }
            ClientMessage::Close { subscription_id } => {
                Value::Array(vec![Value::from("CLOSE"), Value::from(subscription_id.as_str())])
            }
        };
        frame.to_string()
    }
}

/// Frames a relay sends to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayMessage {
    Event {
        subscription_id: String,
        event: SignedEvent,
    },
    Eose {
        subscription_id: String,
    },
    Closed {
        subscription_id: String,
        message: String,
    },
    Notice {
        message: String,
    },
    Ok {
        event_id: String,
        accepted: bool,
        message: String,
    },
}

/// Frame decoding errors.
#[derive(Debug)]
pub enum WireError {
    InvalidJson(String),
    NotAnArray,
    UnknownType(String),
    MissingField(&'static str),
    InvalidEvent(String),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::InvalidJson(e) => write!(f, "Frame is not valid JSON: {}", e),
            WireError::NotAnArray => write!(f, "Frame is not a JSON array"),
            WireError::UnknownType(t) => write!(f, "Unknown frame type: {}", t),
            WireError::MissingField(name) => write!(f, "Frame is missing field `{}`", name),
            WireError::InvalidEvent(e) => write!(f, "Event payload is malformed: {}", e),
        }
    }
}

impl std::error::Error for WireError {}

fn string_at(parts: &[Value], idx: usize, name: &'static str) -> Result<String, WireError> {
    parts
        .get(idx)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(WireError::MissingField(name))
}

impl RelayMessage {
    pub fn parse(text: &str) -> Result<Self, WireError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| WireError::InvalidJson(e.to_string()))?;
        let parts = match value {
            Value::Array(parts) => parts,
            _ => return Err(WireError::NotAnArray),
        };
        let kind = string_at(&parts, 0, "type")?;

        match kind.as_str() {
            "EVENT" => {
                let subscription_id = string_at(&parts, 1, "subscription_id")?;
                let raw = parts.get(2).cloned().ok_or(WireError::MissingField("event"))?;
                let event = serde_json::from_value(raw)
                    .map_err(|e| WireError::InvalidEvent(e.to_string()))?;
                Ok(RelayMessage::Event {
                    subscription_id,
                    event,
                })
            }
            "EOSE" => Ok(RelayMessage::Eose {
                subscription_id: string_at(&parts, 1, "subscription_id")?,
            }),
            "CLOSED" => Ok(RelayMessage::Closed {
                subscription_id: string_at(&parts, 1, "subscription_id")?,
                message: string_at(&parts, 2, "message").unwrap_or_default(),
            }),
            "NOTICE" => Ok(RelayMessage::Notice {
                message: string_at(&parts, 1, "message")?,
            }),
            "OK" => Ok(RelayMessage::Ok {
                event_id: string_at(&parts, 1, "event_id")?,
                accepted: parts
                    .get(2)
                    .and_then(Value::as_bool)
                    .ok_or(WireError::MissingField("accepted"))?,
                message: string_at(&parts, 3, "message").unwrap_or_default(),
            }),
            other => Err(WireError::UnknownType(other.to_string())),
        }
    }

    /// Subscription the frame belongs to, if it is subscription-scoped.
    pub fn subscription_id(&self) -> Option<&str> {
        match self {
            RelayMessage::Event {
                subscription_id, ..
            }
            | RelayMessage::Eose { subscription_id }
            | RelayMessage::Closed {
                subscription_id, ..
            } => Some(subscription_id),
            RelayMessage::Notice { .. } | RelayMessage::Ok { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::kinds;
    use serde_json::json;

    #[test]
    fn req_frame_lists_every_filter() {
        let msg = ClientMessage::Req {
            subscription_id: "sub-1".into(),
            filters: vec![
                Filter::new().authors(["a"]).kinds([kinds::PROFILE]),
                Filter::new().limit(5),
            ],
        };
        let value: Value = serde_json::from_str(&msg.to_json()).unwrap();
        assert_eq!(
            value,
            json!(["REQ", "sub-1", {"authors": ["a"], "kinds": [0]}, {"limit": 5}])
        );
    }

    #[test]
    fn close_frame() {
        let msg = ClientMessage::Close {
            subscription_id: "sub-9".into(),
        };
        assert_eq!(msg.to_json(), r#"["CLOSE","sub-9"]"#);
    }

    #[test]
    fn parses_event_frame() {
        let text = json!([
            "EVENT",
            "sub-1",
            {
                "id": "e1",
                "pubkey": "p1",
                "created_at": 1700000000,
                "kind": 0,
                "tags": [["p", "x"]],
                "content": "{\"name\":\"alice\"}",
                "sig": "s"
            }
        ])
        .to_string();

        match RelayMessage::parse(&text).unwrap() {
            RelayMessage::Event {
                subscription_id,
                event,
            } => {
                assert_eq!(subscription_id, "sub-1");
                assert_eq!(event.pubkey, "p1");
                assert_eq!(event.tags, vec![vec!["p".to_string(), "x".to_string()]]);
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn parses_control_frames() {
        assert_eq!(
            RelayMessage::parse(r#"["EOSE","s"]"#).unwrap(),
            RelayMessage::Eose {
                subscription_id: "s".into()
            }
        );
        assert_eq!(
            RelayMessage::parse(r#"["CLOSED","s","rate-limited: slow down"]"#).unwrap(),
            RelayMessage::Closed {
                subscription_id: "s".into(),
                message: "rate-limited: slow down".into()
            }
        );
        assert_eq!(
            RelayMessage::parse(r#"["NOTICE","hello"]"#).unwrap(),
            RelayMessage::Notice {
                message: "hello".into()
            }
        );
        assert_eq!(
            RelayMessage::parse(r#"["OK","e1",true,""]"#).unwrap(),
            RelayMessage::Ok {
                event_id: "e1".into(),
                accepted: true,
                message: String::new()
            }
        );
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(matches!(
            RelayMessage::parse("not json"),
            Err(WireError::InvalidJson(_))
        ));
        assert!(matches!(
            RelayMessage::parse(r#"{"type":"EVENT"}"#),
            Err(WireError::NotAnArray)
        ));
        assert!(matches!(
            RelayMessage::parse(r#"["AUTH","challenge"]"#),
            Err(WireError::UnknownType(t)) if t == "AUTH"
        ));
        assert!(matches!(
            RelayMessage::parse(r#"["EVENT","s"]"#),
            Err(WireError::MissingField("event"))
        ));
        assert!(matches!(
            RelayMessage::parse(r#"["EVENT","s",{"id":1}]"#),
            Err(WireError::InvalidEvent(_))
        ));
    }

    #[test]
    fn subscription_scope() {
        let eose = RelayMessage::parse(r#"["EOSE","abc"]"#).unwrap();
        assert_eq!(eose.subscription_id(), Some("abc"));
        let notice = RelayMessage::parse(r#"["NOTICE","x"]"#).unwrap();
        assert_eq!(notice.subscription_id(), None);
    }
}
