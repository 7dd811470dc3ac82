//! Middleware for the TradeFair API
//!
//! - `identity`: resolves the session to a typed `Principal` once per
//!   request (extractor used by every handler)
//! - `auth`: route-scoped role gate for whole scopes

pub mod auth;
pub mod identity;

pub use auth::RequireRole;
pub use identity::Principal;
