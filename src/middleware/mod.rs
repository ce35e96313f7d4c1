/*
 * Responsibility
 * - Public interface of the middleware layer
 */
pub mod auth;
pub mod envelope;
pub mod http;
