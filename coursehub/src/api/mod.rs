//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all endpoints
//! - **[`models`]**: request/response structures defining the wire contract
//!
//! The API surface covers authentication (`/user/*`, `/admin/*`), the course
//! catalogue (`/courses/preview`, `/user/course*`, `/admin/course*`), the
//! checkout flow (`/razorpay/*`), and entitlement management
//! (`/user/purchase*`). OpenAPI documentation is served at `/docs`.

pub mod handlers;
pub mod models;
