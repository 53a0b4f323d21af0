//! Periodic device health reports.

use embassy_time::Duration;

use crate::actuator::{Actuators, ChannelStates};
use crate::config::{DeviceIdentity, FieldString};
use crate::payload::TelemetryReport;
use crate::platform::RuntimeMetrics;

/// Whether at least `interval_ms` has passed since `last_report_ms`.
pub fn due_for_report(now_ms: u64, last_report_ms: u64, interval_ms: u64) -> bool {
    now_ms.saturating_sub(last_report_ms) >= interval_ms
}

/// Everything one telemetry report carries, captured at a single instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub device_id: FieldString,
    /// Milliseconds since boot.
    pub uptime_ms: u64,
    pub free_memory: u32,
    pub signal_strength: i16,
    pub channel_states: ChannelStates,
}

impl TelemetrySnapshot {
    /// Wire form. The report's `uptime` is in whole seconds.
    pub fn report(&self) -> TelemetryReport<'_> {
        TelemetryReport {
            device_id: &self.device_id,
            timestamp: self.uptime_ms,
            uptime: self.uptime_ms / 1000,
            free_heap: self.free_memory,
            wifi_rssi: self.signal_strength,
            relay_states: &self.channel_states,
        }
    }
}

pub fn build_snapshot<A, M>(
    identity: &DeviceIdentity,
    actuators: &A,
    metrics: &M,
    now_ms: u64,
) -> TelemetrySnapshot
where
    A: Actuators + ?Sized,
    M: RuntimeMetrics + ?Sized,
{
    let mut device_id = FieldString::new();
    // Identity fields share the same capacity, so this cannot overflow.
    let _ = device_id.push_str(identity.device_id());
    TelemetrySnapshot {
        device_id,
        uptime_ms: now_ms,
        free_memory: metrics.free_memory(),
        signal_strength: metrics.signal_strength(),
        channel_states: actuators.snapshot_all(),
    }
}

/// Remembers when the last report went out.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryScheduler {
    interval: Duration,
    last_report_ms: u64,
}

impl TelemetryScheduler {
    /// The first report is due one interval after boot.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_report_ms: 0,
        }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        due_for_report(now_ms, self.last_report_ms, self.interval.as_millis())
    }

    pub fn mark_reported(&mut self, now_ms: u64) {
        self.last_report_ms = now_ms;
    }
}
