//! Domain types for Neighbourly.
//!
//! This module provides type-safe wrappers for accounts, help requests and
//! chat messages.

pub mod account;
pub mod email;
pub mod id;
pub mod location;
pub mod message;
pub mod request;

pub use account::Account;
pub use email::{Email, EmailError};
pub use id::*;
pub use location::{Location, LocationError};
pub use message::{ChatRole, Counterpart, Message};
pub use request::{
    HelpRequest, NewHelpRequest, RequestError, RequestItem, RequestState, parse_pickup_date,
};
