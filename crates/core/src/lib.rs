//! Neighbourly Core - Domain types and lifecycle rules.
//!
//! This crate provides the types shared by the Neighbourly components:
//! - `server` - HTTP API for requesters and helpers
//! - `cli` - Command-line tools for migrations and demo data
//!
//! # Architecture
//!
//! The core crate contains only types, pure rules and traits - no I/O, no
//! database access, no HTTP clients. The server reads a request from its
//! store, asks [`lifecycle`] whether the caller may perform a transition,
//! and then writes.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, coordinates, requests and messages
//! - [`lifecycle`] - The access predicate, claim policy and transition checks
//! - [`clock`] - Injectable time source for expiry and timestamps

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod clock;
pub mod lifecycle;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use lifecycle::{Access, ClaimPlan, ClaimPolicy, LifecycleError, can_access};
pub use types::*;
