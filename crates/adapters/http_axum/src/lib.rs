//! # cropcloud-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON API** for the UI and admin callers
//!   (`/api/devices/{device}/…`, `/api/admin/…`, `/api/registry/…`, …)
//! - Accept inbound device messages over HTTP for deployments without a broker
//! - Map HTTP requests into application service calls (driving adapter)
//! - Map application results and errors into HTTP responses
//!
//! ## Dependency rule
//! Depends on `cropcloud-app` (for port traits and services) and `cropcloud-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
