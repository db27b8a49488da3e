//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection or transaction, provides
//! strongly-typed operations, and returns domain models from
//! [`crate::db::models`]. Repositories created from a transaction share its
//! ACID guarantees; the payment verifier relies on this to make the status
//! transition and the entitlement grant atomic.

pub mod courses;
pub mod entitlements;
pub mod payments;
pub mod repository;
pub mod users;

pub use courses::Courses;
pub use entitlements::Entitlements;
pub use payments::Payments;
pub use repository::Repository;
pub use users::Users;
