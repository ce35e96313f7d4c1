//! Request-scoped identity.
//!
//! The authentication gate runs each handler inside [`scope`], which installs an
//! [`IdentityContext`] as a tokio task-local for exactly the lifetime of that future.
//! When the future completes, panics or is dropped the value goes with it, so nothing
//! can leak into the next request served by the same worker.

use std::future::Future;

tokio::task_local! {
    static IDENTITY: IdentityContext;
}

/// Optional user id for the request being served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityContext {
    user_id: Option<i64>,
}

impl IdentityContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn set(&mut self, user_id: i64) {
        self.user_id = Some(user_id);
    }

    pub fn get(&self) -> Option<i64> {
        self.user_id
    }

    pub fn clear(&mut self) {
        self.user_id = None;
    }
}

/// Run `fut` with `ctx` installed as the current identity.
pub async fn scope<F>(ctx: IdentityContext, fut: F) -> F::Output
where
    F: Future,
{
    IDENTITY.scope(ctx, fut).await
}

/// User id of the request being served, or `None` outside an authenticated scope.
pub fn current_user_id() -> Option<i64> {
    IDENTITY.try_with(|c| c.get()).ok().flatten()
}
