//! Legend service library.
//!
//! This module exposes the internal modules for testing purposes.

pub mod auth;
pub mod config;
pub mod forwarder;
pub mod handlers;
pub mod legend;
pub mod metrics;
pub mod permissions;
pub mod state;
pub mod tenants;

pub use handlers::router;
