//! Wall-clock boundary contract.

/// Source of the recording time stamped on every metric document.
pub trait ClockPort: Send + Sync {
    /// Current time in whole seconds since the Unix epoch.
    fn now_epoch_seconds(&self) -> i64;
}
