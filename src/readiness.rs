//! Waiting for the renderer to become drawable.
//!
//! Assets arrive asynchronously, so the first frames may come before the
//! active shader is loaded. [`ReadinessGate`] is polled every frame and turns
//! an endless wait into a [`SetupError::Timeout`].

use instant::{Duration, Instant};

use crate::error::SetupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Waiting,
}

#[derive(Debug, Clone)]
pub struct ReadinessGate {
    started: Instant,
    deadline: Duration,
    opened: bool,
}

impl ReadinessGate {
    pub fn new(deadline: Duration) -> Self {
        Self::starting_at(Instant::now(), deadline)
    }

    pub fn starting_at(started: Instant, deadline: Duration) -> Self {
        Self {
            started,
            deadline,
            opened: false,
        }
    }

    pub fn poll(&mut self, ready: bool) -> Result<Readiness, SetupError> {
        self.poll_at(Instant::now(), ready)
    }

    /// Once ready, the gate stays open and the deadline no longer applies.
    pub fn poll_at(&mut self, now: Instant, ready: bool) -> Result<Readiness, SetupError> {
        if self.opened || ready {
            self.opened = true;
            return Ok(Readiness::Ready);
        }
        let waited = now.saturating_duration_since(self.started);
        if waited >= self.deadline {
            return Err(SetupError::Timeout(waited));
        }
        Ok(Readiness::Waiting)
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }
}
