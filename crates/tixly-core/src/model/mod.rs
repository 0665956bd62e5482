// ── Domain model ──
//
// Canonical row types for the manageable collections, in the
// gateway's JSON shapes. The cache itself is schema-agnostic; these
// exist so consumers can open typed handles and build write payloads.

mod person;
mod supporting;
mod ticket;

pub use person::{Color, Person};
pub use supporting::{Coordinates, Location, TicketEvent, Venue, VenueType};
pub use ticket::{SellTicketRequest, Ticket, TicketDraft, TicketType};
