//! Time utilities for the simulation loop

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Tick rate configuration
pub const SIMULATION_TPS: u32 = 60; // 60 ticks per second
pub const SNAPSHOT_TPS: u32 = 30; // 30 state syncs per second

/// Rate the reference tuning was authored at (values were per frame)
pub const REFERENCE_FPS: f32 = 60.0;

/// Upper bound on a single simulation step, so a stalled loop does not
/// tunnel players through platforms on the next tick
pub const MAX_STEP_SECS: f32 = 0.1;

/// Wall-clock stopwatch used to derive the per-tick `dt`
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Seconds since the last lap, restarting the timer
    pub fn lap_secs(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now.duration_since(self.start).as_secs_f32();
        self.start = now;
        dt.min(MAX_STEP_SECS)
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
