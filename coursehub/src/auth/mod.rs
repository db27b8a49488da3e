//! Authentication and authorization.
//!
//! Users authenticate with email and password; a successful login mints a
//! short-lived HS256 JWT which clients present as `Authorization: Bearer
//! <token>`. Admin-only routes additionally require the `is_admin` claim.
//!
//! # Modules
//!
//! - [`current_user`]: extractor for getting the authenticated user in handlers
//! - [`password`]: password hashing and verification using Argon2
//! - [`session`]: JWT session token creation and verification

pub mod current_user;
pub mod password;
pub mod session;

pub use current_user::require_admin;
