//! # Startup Configuration
//!
//! Typed configuration values built once before the run loop starts. The
//! device identity is normally baked in at compile time through environment
//! variables (see [`DeviceIdentity::from_build_env`]); everything else has a
//! default matching the relay controller boards this crate was written for.

use core::fmt::Write;

use embassy_time::Duration;
use heapless::String;

use crate::error::ConfigError;
use crate::runtime::registry::MAX_TOPIC_LEN;

/// Maximum length of identity fields (device id, owner, versions).
pub const MAX_FIELD_LEN: usize = 64;

/// Bounded string used for identity fields.
pub type FieldString = String<MAX_FIELD_LEN>;

/// Bounded string used for topic names.
pub type TopicString = String<MAX_TOPIC_LEN>;

const DEFAULT_DEVICE_ID: &str = "hub-000000";
const DEFAULT_OWNER_ID: &str = "unassigned";
const DEFAULT_DEVICE_TYPE: &str = "SmartHomeHub";
const DEFAULT_BUILD_TIMESTAMP: &str = "unknown";

/// Default MQTT-over-TLS port.
pub const DEFAULT_BROKER_PORT: u16 = 8883;

fn bounded<const N: usize>(field: &'static str, value: &str) -> Result<String<N>, ConfigError> {
    let mut owned = String::new();
    owned
        .push_str(value)
        .map_err(|_| ConfigError::FieldTooLong(field))?;
    Ok(owned)
}

/// Who this device is. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    device_id: FieldString,
    owner_id: FieldString,
    firmware_version: FieldString,
    build_timestamp: FieldString,
    device_type: FieldString,
}

impl DeviceIdentity {
    pub fn new(
        device_id: &str,
        owner_id: &str,
        firmware_version: &str,
        build_timestamp: &str,
        device_type: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            device_id: bounded("device_id", device_id)?,
            owner_id: bounded("owner_id", owner_id)?,
            firmware_version: bounded("firmware_version", firmware_version)?,
            build_timestamp: bounded("build_timestamp", build_timestamp)?,
            device_type: bounded("device_type", device_type)?,
        })
    }

    /// Builds the identity from values captured at compile time.
    ///
    /// Reads `RELAY_HUB_DEVICE_ID`, `RELAY_HUB_OWNER_ID`,
    /// `RELAY_HUB_DEVICE_TYPE` and `RELAY_HUB_BUILD_TIMESTAMP`; the firmware
    /// version is the crate version.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        Self::new(
            option_env!("RELAY_HUB_DEVICE_ID").unwrap_or(DEFAULT_DEVICE_ID),
            option_env!("RELAY_HUB_OWNER_ID").unwrap_or(DEFAULT_OWNER_ID),
            env!("CARGO_PKG_VERSION"),
            option_env!("RELAY_HUB_BUILD_TIMESTAMP").unwrap_or(DEFAULT_BUILD_TIMESTAMP),
            option_env!("RELAY_HUB_DEVICE_TYPE").unwrap_or(DEFAULT_DEVICE_TYPE),
        )
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn firmware_version(&self) -> &str {
        &self.firmware_version
    }

    pub fn build_timestamp(&self) -> &str {
        &self.build_timestamp
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }
}

/// The topics a device publishes and subscribes to, derived from its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSet {
    pub control: TopicString,
    pub status: TopicString,
    pub boot: TopicString,
    pub telemetry: TopicString,
}

impl TopicSet {
    pub fn for_device(device_id: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            control: topic(device_id, "digital/control")?,
            status: topic(device_id, "digital/status")?,
            boot: topic(device_id, "system/boot")?,
            telemetry: topic(device_id, "system/telemetry")?,
        })
    }
}

fn topic(device_id: &str, suffix: &str) -> Result<TopicString, ConfigError> {
    let mut name = TopicString::new();
    write!(name, "{device_id}/{suffix}").map_err(|_| ConfigError::FieldTooLong("topic"))?;
    Ok(name)
}

/// Where the broker lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub host: &'static str,
    pub port: u16,
}

impl Default for BrokerEndpoint {
    fn default() -> Self {
        Self {
            host: "localhost",
            port: DEFAULT_BROKER_PORT,
        }
    }
}

/// PEM-encoded credentials handed to the secure channel provider.
///
/// Usually produced with `include_str!` in the board crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityMaterial {
    pub ca_certificate: &'static str,
    pub client_certificate: &'static str,
    pub private_key: &'static str,
}

/// Bounded retry behaviour for one `ensure_*` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    attempt_interval: Duration,
    cooldown: Duration,
}

impl ReconnectPolicy {
    /// `cooldown` is the minimum time between two repair cycles once a cycle
    /// has exhausted its attempts.
    pub fn new(
        max_attempts: u32,
        attempt_interval: Duration,
        cooldown: Duration,
    ) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        Ok(Self {
            max_attempts,
            attempt_interval,
            cooldown,
        })
    }

    /// 20 polls spaced 500 ms apart.
    pub const fn network_default() -> Self {
        Self {
            max_attempts: 20,
            attempt_interval: Duration::from_millis(500),
            cooldown: Duration::from_ticks(0),
        }
    }

    /// 5 connect attempts spaced 2 s apart.
    pub const fn session_default() -> Self {
        Self {
            max_attempts: 5,
            attempt_interval: Duration::from_secs(2),
            cooldown: Duration::from_ticks(0),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn attempt_interval(&self) -> Duration {
        self.attempt_interval
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

/// Everything the run loop needs to know before its first tick.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub identity: DeviceIdentity,
    pub topics: TopicSet,
    pub endpoint: BrokerEndpoint,
    pub material: IdentityMaterial,
    pub network_policy: ReconnectPolicy,
    pub session_policy: ReconnectPolicy,
    /// Time between telemetry reports.
    pub telemetry_interval: Duration,
    /// Idle time at the end of every run loop iteration.
    pub loop_interval: Duration,
    /// How long the indicator LED stays lit after a relay change.
    pub indicator_pulse: Duration,
}

impl HubConfig {
    /// Builds a configuration with default policies and topics derived from
    /// the identity's device id.
    pub fn new(identity: DeviceIdentity) -> Result<Self, ConfigError> {
        let topics = TopicSet::for_device(identity.device_id())?;
        Ok(Self {
            identity,
            topics,
            endpoint: BrokerEndpoint::default(),
            material: IdentityMaterial::default(),
            network_policy: ReconnectPolicy::network_default(),
            session_policy: ReconnectPolicy::session_default(),
            telemetry_interval: Duration::from_secs(60),
            loop_interval: Duration::from_millis(100),
            indicator_pulse: Duration::from_millis(100),
        })
    }

    pub fn with_endpoint(mut self, endpoint: BrokerEndpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_material(mut self, material: IdentityMaterial) -> Self {
        self.material = material;
        self
    }
}
