//! Transport lifecycle as seen by the dispatcher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag reporting that the client connection went away.
///
/// The transport keeps one clone and calls [`close`](Self::close); the
/// dispatcher checks it before each response filter and before writing.
/// A handler already running is not interrupted.
///
/// ```
/// use meridian_pipeline::ConnectionState;
///
/// let transport = ConnectionState::new();
/// let dispatcher_side = transport.clone();
/// transport.close();
/// assert!(dispatcher_side.is_closed());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    closed: Arc<AtomicBool>,
}

impl ConnectionState {
    /// An open connection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the connection closed.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Returns true once the connection is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
