//! Database record models matching table schemas.
//!
//! Each model struct corresponds to a database table row. Database models
//! are distinct from API models so storage and wire representations can
//! evolve independently.

pub mod courses;
pub mod payments;
pub mod users;
