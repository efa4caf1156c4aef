// src/engine/progress.rs

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// Cooperative "keep going?" predicate checked before every step.
#[derive(Clone)]
pub struct Progress {
    check: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl Progress {
    pub fn new<F>(check: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            check: Arc::new(check),
        }
    }

    /// Continue until the token is cancelled.
    pub fn from_token(token: CancellationToken) -> Self {
        Self::new(move || !token.is_cancelled())
    }

    /// Continue while the flag stays true.
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self::new(move || flag.load(Ordering::Acquire))
    }

    pub fn should_continue(&self) -> bool {
        (self.check)()
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}
