//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `CorsLayer` (credentialed requests from the frontend origins)
//! 3. `TraceLayer` (request tracing)
//! 4. Request ID (add unique ID to each request)
//! 5. Session layer (tower-sessions with `PostgreSQL` store)

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{CurrentAccount, OptionalAccount, RequireAccount, set_current_user};
pub use request_id::request_id_middleware;
pub use session::{create_session_layer, session_layer};
