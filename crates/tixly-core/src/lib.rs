//! Reactive data layer between `tixly-api` and UI consumers.
//!
//! This crate owns the entity synchronization cache for the ticketing
//! service:
//!
//! - **[`EntityCache`]** — Per-consumer page management:
//!   [`open()`](EntityCache::open) subscribes to a collection's change
//!   topic, issues the initial fetch, and returns a [`CacheHandle`]
//!   exposing the live [`CachedPage`]. Parameter changes and change
//!   notifications funnel through one sequence-guarded fetch path, so
//!   results apply in issue order regardless of completion order.
//!
//! - **[`SubscriptionRegistry`]** — Topic subscriptions over a shared
//!   [`ChannelTransport`]. Subscribes made before the channel connects
//!   buffer and replay FIFO on connect; active subscriptions are
//!   re-registered after an unexpected reconnect.
//!
//! - **[`QueryParameters`]** — The value type parameterizing one fetch
//!   (paging, sorting, filtering). Structural equality decides whether
//!   replacing parameters costs a network round trip.
//!
//! - **Domain model** ([`model`]) — Row types for the manageable
//!   collections (`Ticket`, `Person`, `Venue`, ...) in the gateway's
//!   JSON shapes.
//!
//! Fetch failures never surface as `Err`: they become the `error`
//! string on the cached page, and the next notification or parameter
//! change retries implicitly.

pub mod cache;
pub mod config;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod model;
pub mod notify;
pub mod page;
pub mod query;
pub mod registry;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{CacheHandle, EntityCache};
pub use config::SyncConfig;
pub use entity::{Capabilities, EntityType};
pub use error::{ApiError, user_message};
pub use gateway::{CollectionGateway, RawPage};
pub use notify::{ChangeKind, ChangeNotification};
pub use page::{CachedPage, TOTAL_UNKNOWN};
pub use query::{QueryParameters, SortOrder};
pub use registry::{ChannelTransport, SubscriptionHandle, SubscriptionRegistry};
pub use stream::PageStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Color,
    Coordinates,
    Location,
    Person,
    SellTicketRequest,
    Ticket,
    TicketDraft,
    TicketEvent,
    TicketType,
    Venue,
    VenueType,
};
