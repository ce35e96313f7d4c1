/*
 * Responsibility
 * - Public surface of the API layer (re-export routes())
 */
pub mod dto;
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::{health_routes, routes};
