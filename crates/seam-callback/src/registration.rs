//! Ownership of a registered callback's context.

use std::ops::Deref;
use std::sync::Arc;

use crate::context::{CallbackStats, Tracker};
use crate::token::CallbackToken;

/// A registered callback token that owns its context.
///
/// The token is `Copy` and may be handed to native code freely; the context
/// behind it stays alive until the registration is dropped or released.
/// Releasing while a native caller is still inside the callback is a
/// protocol violation.
pub struct Registration<C: CallbackToken> {
    token: C,
    tracker: Arc<Tracker>,
}

impl<C: CallbackToken> Registration<C> {
    /// # Safety
    ///
    /// `token` must have been produced together with `tracker` and its
    /// context must be owned by no other registration.
    #[doc(hidden)]
    pub unsafe fn new(token: C, tracker: Arc<Tracker>) -> Self {
        Registration { token, tracker }
    }

    /// A copy of the token to pass across the boundary.
    pub fn token(&self) -> C {
        self.token
    }

    pub fn stats(&self) -> CallbackStats {
        self.tracker.stats()
    }

    /// Release the context now.
    pub fn release(self) {
        drop(self)
    }
}

impl<C: CallbackToken> Deref for Registration<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.token
    }
}

impl<C: CallbackToken> Drop for Registration<C> {
    fn drop(&mut self) {
        tracing::trace!(context = ?self.token.context(), "releasing callback registration");
        unsafe { self.token.release_context() }
    }
}

impl<C: CallbackToken + std::fmt::Debug> std::fmt::Debug for Registration<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("token", &self.token)
            .field("stats", &self.tracker.stats())
            .finish()
    }
}
