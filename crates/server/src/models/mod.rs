//! Types stored in the session and exchanged with the frontend.

pub mod session;

pub use session::{ProfileError, SessionUser, keys as session_keys};
