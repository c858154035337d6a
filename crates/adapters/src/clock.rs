//! Wall-clock adapter.

use rally_metrics_ports::ClockPort;

/// Clock backed by the host's UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now_epoch_seconds(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}
