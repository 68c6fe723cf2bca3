//! Business logic services.
//!
//! # Services
//!
//! - `lifecycle` - Create, browse, claim, release, complete and cancel requests
//! - `chat` - Per-request message threads between owner and claimant
//!
//! Both borrow a [`Store`](crate::db::Store) and a clock for the duration of
//! one operation, so handlers construct them per request from `AppState`.

pub mod chat;
mod error;
pub mod lifecycle;

pub use chat::{ChatService, ChatSummary, Counterparty, Thread, ThreadMessage};
pub use error::ServiceError;
pub use lifecycle::{BrowseOverview, ClaimedRequest, LifecycleService};
