//! Time utilities for the frame loop and simulated clock

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Client start time for uptime tracking
static CLIENT_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize client start time (call once at startup)
pub fn init_client_time() {
    CLIENT_START.get_or_init(Instant::now);
}

/// Get client uptime in seconds
pub fn uptime_secs() -> u64 {
    CLIENT_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Frame and network cadence
pub const DEFAULT_FRAME_RATE: u32 = 60;
pub const ROSTER_POLL_MS: u64 = 500;
pub const LOBBY_POLL_MS: u64 = 2_000;
pub const PUBLISH_THROTTLE_MS: u64 = 100;

/// Delta time for one frame at the given rate (in seconds)
pub fn frame_delta(frame_rate: u32) -> f32 {
    1.0 / frame_rate.max(1) as f32
}

/// Monotonic simulated clock, advanced only by the frame loop.
///
/// Accumulates whole microseconds so repeated frame deltas do not drift
/// the millisecond timestamps handed to timers.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    elapsed_micros: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by a frame delta expressed in seconds
    pub fn advance_secs(&mut self, dt: f32) {
        self.elapsed_micros += (dt.max(0.0) as f64 * 1_000_000.0).round() as u64;
    }

    pub fn now_ms(&self) -> u64 {
        self.elapsed_micros / 1_000
    }
}
