//! Request tokens: the only cancellation mechanism.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::receipt::RequestToken;

/// Issues monotonically increasing tokens. Only the latest token is
/// current; every earlier run is superseded the instant a new one is
/// issued.
#[derive(Debug, Default)]
pub struct RequestTokens {
    latest: AtomicU64,
}

impl RequestTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token, superseding all earlier ones.
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The most recently issued token, if any.
    pub fn current(&self) -> Option<RequestToken> {
        match self.latest.load(Ordering::SeqCst) {
            0 => None,
            n => Some(RequestToken(n)),
        }
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }
}
