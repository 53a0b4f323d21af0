//! Board-facing traits for the network interface and runtime metrics, plus
//! adapters for the Embassy stack.

use core::net::Ipv4Addr;

use embassy_time::Instant;

/// The network layer underneath the broker session (usually Wi-Fi).
pub trait NetworkInterface {
    /// Kick off association with the configured network.
    ///
    /// Must return immediately; progress is observed through
    /// [`is_connected`](Self::is_connected).
    fn begin(&mut self);

    /// Whether the interface is associated and has an address.
    fn is_connected(&self) -> bool;

    /// The address assigned to the interface, once connected.
    fn local_address(&self) -> Option<Ipv4Addr>;
}

/// Monotonic milliseconds since boot.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Device health figures reported with telemetry.
pub trait RuntimeMetrics {
    /// Free heap in bytes.
    fn free_memory(&self) -> u32;

    /// Received signal strength of the network link in dBm.
    fn signal_strength(&self) -> i16;
}

/// [`Clock`] backed by the Embassy time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}

/// An `embassy-net` stack counts as connected once DHCP (or static
/// configuration) has handed it an IPv4 address. Association itself is
/// driven by the radio driver's own task, so `begin` has nothing to do.
impl NetworkInterface for embassy_net::Stack<'_> {
    fn begin(&mut self) {}

    fn is_connected(&self) -> bool {
        self.is_link_up() && self.is_config_up()
    }

    fn local_address(&self) -> Option<Ipv4Addr> {
        self.config_v4().map(|config| config.address.address().into())
    }
}
