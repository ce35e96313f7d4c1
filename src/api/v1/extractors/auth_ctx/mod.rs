/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - Provide the authenticated request context (AuthCtx) to handlers
 * - axum glue lives in core, the type in types
 */

mod core;
mod types;

pub use core::CurrentUser;
pub use types::AuthCtx;
