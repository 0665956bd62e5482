use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::supporting::{Coordinates, TicketEvent, Venue};
use super::person::Person;

/// Ticket category, in ascending order of thrift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketType {
    Vip,
    Usual,
    Budgetary,
    Cheap,
}

/// A ticket as the gateway returns it, with its related entities
/// embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: i64,
    pub name: String,
    pub coordinates: Coordinates,
    pub creation_date: DateTime<Utc>,
    #[serde(default)]
    pub person: Option<Person>,
    #[serde(default)]
    pub event: Option<TicketEvent>,
    pub price: f64,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    #[serde(default)]
    pub discount: Option<f64>,
    pub number: i64,
    pub refundable: bool,
    #[serde(default)]
    pub venue: Option<Venue>,
}

/// Write payload for creating or replacing a ticket. Related entities
/// are referenced by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDraft {
    pub name: String,
    pub coordinates_id: Option<i64>,
    pub person_id: Option<i64>,
    pub event_id: Option<i64>,
    pub price: f64,
    #[serde(rename = "type")]
    pub ticket_type: Option<TicketType>,
    pub discount: Option<f64>,
    pub number: i64,
    pub refundable: bool,
    pub venue_id: Option<i64>,
}

/// Payload for the sell operation: assigns a ticket to a person at an
/// adjusted price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellTicketRequest {
    pub ticket_id: i64,
    pub person_id: i64,
    pub price: f64,
}
