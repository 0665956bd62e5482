// Supporting entities referenced by tickets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub id: i64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VenueType {
    Pub,
    Loft,
    OpenArea,
    Mall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    pub id: i64,
    pub name: String,
    pub capacity: i64,
    pub venue_type: VenueType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketEvent {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub min_age: Option<i64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn venue_type_uses_screaming_snake_case() {
        let venue: Venue = serde_json::from_value(json!({
            "id": 1,
            "name": "Yard",
            "capacity": 5000,
            "venueType": "OPEN_AREA"
        }))
        .unwrap();
        assert_eq!(venue.venue_type, VenueType::OpenArea);
    }

    #[test]
    fn event_date_is_optional() {
        let event: TicketEvent =
            serde_json::from_value(json!({ "id": 2, "name": "Spring gala" })).unwrap();
        assert!(event.date.is_none());
        assert!(event.min_age.is_none());
    }
}
