// ── Change notifications ──
//
// Wire shape of the messages published on an entity type's topic. The
// cache parses these for tracing only: every notification means
// "something in this collection may have changed" and triggers a full
// refetch, parseable or not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of change the service announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Created,
    Updated,
    UpdatedMany,
    Deleted,
}

/// A change notification as published on the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotification {
    pub event_type: ChangeKind,
    pub entity_id: i64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChangeNotification {
    /// Parse a raw message body.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_payload() {
        let body = r#"{"eventType":"UPDATED_MANY","entityId":17,"timestamp":"2025-05-01T12:30:00Z"}"#;
        let notification = ChangeNotification::parse(body).unwrap();
        assert_eq!(notification.event_type, ChangeKind::UpdatedMany);
        assert_eq!(notification.entity_id, 17);
        assert!(notification.timestamp.is_some());
    }

    #[test]
    fn timestamp_is_optional() {
        let notification =
            ChangeNotification::parse(r#"{"eventType":"DELETED","entityId":3}"#).unwrap();
        assert_eq!(notification.event_type, ChangeKind::Deleted);
        assert!(notification.timestamp.is_none());
    }

    #[test]
    fn unknown_event_type_is_an_error() {
        assert!(ChangeNotification::parse(r#"{"eventType":"RENAMED","entityId":1}"#).is_err());
    }
}
