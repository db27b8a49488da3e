//! API request and response data models.
//!
//! These structures define the public API contract and are distinct from the
//! database models, so storage and wire representations can evolve
//! independently. Key names that the original clients depend on
//! (`purchasedCourse`, `updatedUser`, the provider callback fields) are
//! pinned with serde renames.

pub mod auth;
pub mod courses;
pub mod entitlements;
pub mod pagination;
pub mod payments;
pub mod users;
