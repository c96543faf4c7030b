//! Dispatch state machine.
//!
//! ```text
//! RECEIVED → MATCHED → BOUND → PRE_FILTERED → INVOKED → POST_FILTERED → WRITTEN
//! ```
//!
//! `ABORTED` is reachable from every non-terminal state. `RECEIVED` may go
//! straight to `WRITTEN` when the dispatcher answers without a resource
//! method, as for an automatic `OPTIONS` response.

use std::fmt;

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchState {
    /// Pre-match filters and matching.
    Received,
    /// A resource method was selected.
    Matched,
    /// Arguments were bound.
    Bound,
    /// Request filters ran.
    PreFiltered,
    /// The resource method returned or its fault was mapped.
    Invoked,
    /// Response filters ran.
    PostFiltered,
    /// The response was serialised.
    Written,
    /// Dispatch stopped early.
    Aborted,
}

impl DispatchState {
    /// Returns true for `Written` and `Aborted`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Written | Self::Aborted)
    }

    /// Returns true if `next` may follow `self`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Self::Aborted)
                | (Self::Received, Self::Matched | Self::Written)
                | (Self::Matched, Self::Bound)
                | (Self::Bound, Self::PreFiltered)
                | (Self::PreFiltered, Self::Invoked)
                | (Self::Invoked, Self::PostFiltered)
                | (Self::PostFiltered, Self::Written)
        )
    }

    /// Lowercase name used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Matched => "matched",
            Self::Bound => "bound",
            Self::PreFiltered => "pre_filtered",
            Self::Invoked => "invoked",
            Self::PostFiltered => "post_filtered",
            Self::Written => "written",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one request's state and refuses illegal transitions.
#[derive(Debug)]
pub(crate) struct StateTracker {
    current: DispatchState,
}

impl StateTracker {
    pub(crate) const fn new() -> Self {
        Self {
            current: DispatchState::Received,
        }
    }

    pub(crate) const fn current(&self) -> DispatchState {
        self.current
    }

    pub(crate) fn advance(&mut self, next: DispatchState) {
        debug_assert!(
            self.current.can_advance_to(next),
            "illegal dispatch transition {} -> {}",
            self.current,
            next
        );
        tracing::trace!(from = %self.current, to = %next, "dispatch state");
        self.current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DispatchState::*;

    #[test]
    fn test_happy_path() {
        let path = [Received, Matched, Bound, PreFiltered, Invoked, PostFiltered, Written];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_abort_from_any_non_terminal() {
        for state in [Received, Matched, Bound, PreFiltered, Invoked, PostFiltered] {
            assert!(state.can_advance_to(Aborted));
        }
        assert!(!Written.can_advance_to(Aborted));
        assert!(!Aborted.can_advance_to(Aborted));
    }

    #[test]
    fn test_no_skipping() {
        assert!(!Matched.can_advance_to(Invoked));
        assert!(!Bound.can_advance_to(Written));
        assert!(!PostFiltered.can_advance_to(Invoked));
        assert!(Received.can_advance_to(Written));
    }

    #[test]
    fn test_tracker() {
        let mut tracker = StateTracker::new();
        tracker.advance(Matched);
        tracker.advance(Aborted);
        assert_eq!(tracker.current(), Aborted);
        assert_eq!(tracker.current().to_string(), "aborted");
    }
}
