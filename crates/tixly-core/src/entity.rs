// ── Entity types and their gateway capabilities ──
//
// One tag per manageable collection, plus the static capability table
// that decides which gateway read operation a fetch uses. The table
// replaces per-call branching: it is consulted once per fetch.

use strum::{Display, EnumIter, EnumString};

/// Tag identifying one of the manageable collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum EntityType {
    Tickets,
    Persons,
    Venues,
    Coordinates,
    Events,
    Locations,
}

/// What a collection's gateway endpoints support.
///
/// Static per entity type -- not per-call logic. A type without
/// `paging` is fetched with the plain list operation and paged
/// client-side by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub paging: bool,
    pub sort: bool,
    pub filter: bool,
}

impl EntityType {
    /// The capability table.
    ///
    /// Tickets is the only collection with server-side sorting and
    /// filtering; every collection pages server-side.
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::Tickets => Capabilities {
                paging: true,
                sort: true,
                filter: true,
            },
            Self::Persons
            | Self::Venues
            | Self::Coordinates
            | Self::Events
            | Self::Locations => Capabilities {
                paging: true,
                sort: false,
                filter: false,
            },
        }
    }

    /// Channel topic carrying this collection's change notifications.
    ///
    /// Fixed convention shared with the gateway; changing it requires a
    /// coordinated change on the service side.
    pub fn topic(self) -> String {
        format!("/topic/{self}")
    }

    /// Relative gateway path for paged reads and point writes.
    pub const fn collection_path(self) -> &'static str {
        match self {
            Self::Tickets => "tickets",
            Self::Persons => "persons",
            Self::Venues => "venues",
            Self::Coordinates => "coordinates",
            Self::Events => "events",
            Self::Locations => "locations",
        }
    }

    /// Relative gateway path for the plain (unpaged) list operation.
    pub const fn list_all_path(self) -> &'static str {
        match self {
            // Tickets exposes its unpaged list on a dedicated route.
            Self::Tickets => "tickets/all",
            other => other.collection_path(),
        }
    }

    /// Default page size the UI uses for this collection.
    pub const fn default_page_size(self) -> u32 {
        match self {
            Self::Tickets => 5,
            _ => 8,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn topic_follows_fixed_convention() {
        assert_eq!(EntityType::Tickets.topic(), "/topic/tickets");
        assert_eq!(EntityType::Persons.topic(), "/topic/persons");
    }

    #[test]
    fn name_round_trips_through_strum() {
        for entity_type in EntityType::iter() {
            let name = entity_type.to_string();
            assert_eq!(EntityType::from_str(&name).unwrap(), entity_type);
        }
    }

    #[test]
    fn only_tickets_sorts_and_filters() {
        for entity_type in EntityType::iter() {
            let caps = entity_type.capabilities();
            assert!(caps.paging);
            assert_eq!(caps.sort, entity_type == EntityType::Tickets);
            assert_eq!(caps.filter, entity_type == EntityType::Tickets);
        }
    }

    #[test]
    fn tickets_unpaged_list_uses_dedicated_route() {
        assert_eq!(EntityType::Tickets.list_all_path(), "tickets/all");
        assert_eq!(EntityType::Coordinates.list_all_path(), "coordinates");
    }
}
