// tixly-api: Async Rust client for the ticketing service (REST gateway + notification channel)

pub mod channel;
pub mod error;
pub mod rest;
pub mod transport;

pub use channel::{ChannelConfig, ChannelEvent, NotificationChannel};
pub use error::Error;
pub use rest::{PageEnvelope, RestClient};
pub use transport::TransportConfig;
