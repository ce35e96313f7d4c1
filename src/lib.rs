//! Stateless token authentication for the waterworks back office.
//!
//! Signed access/refresh tokens, a path-based security policy, and a gate that
//! runs every handler inside a request-scoped identity.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod repos;
pub mod services;
pub mod state;
