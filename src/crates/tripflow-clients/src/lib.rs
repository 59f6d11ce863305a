//! # tripflow-clients - External tool capabilities
//!
//! The agent graphs treat everything outside the process as a capability
//! behind a trait, so nodes stay testable and provider churn stays local:
//!
//! - [`PlaceSearch`] / [`KakaoPlaceClient`] - keyword place search, fronted
//!   by an explicit injected [`SearchCache`].
//! - [`Calendar`] / [`HttpCalendarClient`] - event registration for saved
//!   itineraries.
//! - [`ShareLinks`] / [`LocalShareLinks`] - share-link creation with an
//!   expiry window.
//! - [`ItineraryStore`] / [`InMemoryItineraryStore`] - the saved-itinerary
//!   boundary the list/calendar/sharing agents read.
//!
//! Every capability call is synchronous from the node's point of view (one
//! await, one domain-shaped result or a [`ClientError`]); the nodes decide
//! whether a failure is fatal for the turn or becomes a softer message.

pub mod calendar;
pub mod itinerary;
pub mod place;
pub mod sharing;

pub use calendar::{Calendar, CalendarEventRef, HttpCalendarClient};
pub use itinerary::{InMemoryItineraryStore, Itinerary, ItineraryStore};
pub use place::{KakaoPlaceClient, Place, PlaceSearch, SearchCache};
pub use sharing::{LocalShareLinks, ShareLink, ShareLinks};

use thiserror::Error;

/// Errors from external capability calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP transport failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with an error status.
    #[error("provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// Provider payload could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Required configuration is missing.
    #[error("missing configuration: {0}")]
    Configuration(String),

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result type for capability calls.
pub type Result<T> = std::result::Result<T, ClientError>;
