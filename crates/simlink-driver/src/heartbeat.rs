//! Connection Monitor - tracks incoming telemetry to detect a silent simulator
//!
//! **Purpose**: Detect if the simulation is still streaming (scene running, socket alive).
//!
//! The monitor stores microseconds elapsed since its own creation instant in an
//! `AtomicU64`, so it is monotonic, unaffected by wall-clock changes and
//! lock-free for both the receive thread and readers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Connection health monitor
///
/// Tracks the time since the last telemetry frame was published.
#[derive(Debug)]
pub struct ConnectionMonitor {
    anchor: Instant,
    last_telemetry_us: AtomicU64,
    timeout: Duration,
}

impl ConnectionMonitor {
    /// Create a new connection monitor
    ///
    /// The connection counts as alive for `timeout` after creation, giving the
    /// simulator a grace period to send its first frame.
    ///
    /// # Example
    /// ```
    /// # use simlink_driver::ConnectionMonitor;
    /// # use std::time::Duration;
    /// let monitor = ConnectionMonitor::new(Duration::from_secs(1));
    /// assert!(monitor.check_connection());
    /// ```
    pub fn new(timeout: Duration) -> Self {
        Self {
            anchor: Instant::now(),
            last_telemetry_us: AtomicU64::new(0),
            timeout,
        }
    }

    /// Check if telemetry arrived within the timeout window
    pub fn check_connection(&self) -> bool {
        self.time_since_last_telemetry() < self.timeout
    }

    /// Register that a telemetry frame was published
    pub fn register_telemetry(&self) {
        self.last_telemetry_us.store(self.now_us(), Ordering::Relaxed);
    }

    /// Get time since the last telemetry frame (or since creation)
    pub fn time_since_last_telemetry(&self) -> Duration {
        let last_us = self.last_telemetry_us.load(Ordering::Relaxed);
        Duration::from_micros(self.now_us().saturating_sub(last_us))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn now_us(&self) -> u64 {
        self.anchor.elapsed().as_micros() as u64
    }
}
