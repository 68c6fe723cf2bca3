//! Help requests ("orders") and their items.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::id::{AccountId, RequestId};
use super::location::{Location, LocationError};

/// Validation failures for a new request.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// A required text field was missing or blank.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// The pickup date was not an ISO `YYYY-MM-DD` date.
    #[error("invalid pickup date: {0}")]
    InvalidPickupDate(String),
    /// Coordinates out of range.
    #[error(transparent)]
    Location(#[from] LocationError),
}

/// One line of a request: what is needed and how many.
///
/// Quantities are expected to be at least 1; callers validate that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestItem {
    pub name: String,
    pub quantity: i32,
}

/// Read-time lifecycle state of a request.
///
/// Only the claimant is stored; expiry is derived from the pickup date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Unclaimed and not past its pickup date.
    Open,
    /// A helper has committed to it.
    Claimed,
    /// Unclaimed and past its pickup date; hidden from browsing.
    Expired,
}

/// A stored help request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpRequest {
    pub id: RequestId,
    /// Creator of the request. Never changes.
    pub owner_id: AccountId,
    pub message: String,
    pub location: Location,
    pub address: String,
    /// Free-form pickup time as entered (historically `HHMM`).
    pub pickup_time: String,
    pub pickup_date: Option<NaiveDate>,
    /// Items in submission order.
    pub items: Vec<RequestItem>,
    /// Helper currently committed to the request, if any.
    pub claimed_by: Option<AccountId>,
    pub created_at: DateTime<Utc>,
}

impl HelpRequest {
    /// Whether the pickup date lies strictly before `today`.
    ///
    /// Requests without a pickup date never expire.
    #[must_use]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.pickup_date.is_some_and(|date| date < today)
    }

    /// Lifecycle state as of `today`.
    #[must_use]
    pub fn state(&self, today: NaiveDate) -> RequestState {
        if self.claimed_by.is_some() {
            RequestState::Claimed
        } else if self.is_expired(today) {
            RequestState::Expired
        } else {
            RequestState::Open
        }
    }

    /// Whether the request belongs in the browsable set.
    #[must_use]
    pub fn is_available(&self, today: NaiveDate) -> bool {
        self.state(today) == RequestState::Open
    }
}

/// A validated request waiting to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHelpRequest {
    pub message: String,
    pub location: Location,
    pub address: String,
    pub pickup_time: String,
    pub pickup_date: Option<NaiveDate>,
    pub items: Vec<RequestItem>,
}

impl NewHelpRequest {
    /// Validate the free-text fields and assemble a new request.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::MissingField` if `message`, `address` or
    /// `pickup_time` is blank.
    pub fn new(
        message: String,
        location: Location,
        address: String,
        pickup_time: String,
        pickup_date: Option<NaiveDate>,
        items: Vec<RequestItem>,
    ) -> Result<Self, RequestError> {
        require("message", &message)?;
        require("address", &address)?;
        require("collectionTime", &pickup_time)?;

        Ok(Self {
            message,
            location,
            address,
            pickup_time,
            pickup_date,
            items,
        })
    }
}

fn require(field: &'static str, value: &str) -> Result<(), RequestError> {
    if value.trim().is_empty() {
        return Err(RequestError::MissingField(field));
    }
    Ok(())
}

/// Parse an optional ISO pickup date; an empty string means "no date".
///
/// # Errors
///
/// Returns `RequestError::InvalidPickupDate` for anything that is not
/// `YYYY-MM-DD`.
pub fn parse_pickup_date(raw: Option<&str>) -> Result<Option<NaiveDate>, RequestError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| RequestError::InvalidPickupDate(s.to_owned())),
    }
}
