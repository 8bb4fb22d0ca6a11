//! Cooperative cancellation for blocking request work.
//!
//! A [`CancelToken`] trips when any of these hold:
//! - shutdown was requested (Ctrl+C)
//! - its deadline passed
//! - [`CancelToken::cancel`] was called on it or a clone

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

use super::state;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request cancelled")]
pub struct Cancelled;

#[derive(Debug, Clone)]
pub struct CancelToken {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::none()
    }
}

impl CancelToken {
    /// Token without a deadline. Still observes shutdown.
    pub fn none() -> Self {
        Self {
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || state::is_shutdown()
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Time left before the deadline; `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// `Err(Cancelled)` once the token has tripped.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
