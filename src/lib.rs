//! # Relay Hub Core for Embedded Controllers
//!
//! `relay-hub` is the device-side core of a smart-home relay controller: a
//! board with a handful of relay channels, a status LED and a network link to
//! an MQTT broker. It keeps the links up, executes switch commands arriving
//! on the device's control topic, acknowledges them, and reports telemetry.
//!
//! ## Core Features
//!
//! - **`no_std` & `no_alloc`:** All buffers are fixed-size `heapless` types.
//! - **Hardware agnostic:** Relays and the LED are `embedded-hal` output
//!   pins; the network, secure channel and broker session are traits the
//!   board crate implements (see [`platform`] and [`transport`]).
//! - **Self-healing links:** Network and session are repaired on every tick
//!   with bounded, configurable retry policies.
//! - **JSON on the wire:** Payloads are encoded with `serde-json-core`.
//!
//! ## Topics
//!
//! Every topic is prefixed with the device id:
//!
//! | Topic | Direction | Payload |
//! |---|---|---|
//! | `{id}/digital/control` | in | `{"relay": 2, "state": true}` |
//! | `{id}/digital/status` | out | acknowledgements and the online status |
//! | `{id}/system/boot` | out | boot report on every session start |
//! | `{id}/system/telemetry` | out | periodic health report |
//!
//! ## Usage
//!
//! ```ignore
//! let config = HubConfig::new(DeviceIdentity::from_build_env()?)?
//!     .with_endpoint(BrokerEndpoint { host: "broker.example.com", port: 8883 })
//!     .with_material(material);
//!
//! let bank = ActuatorBank::new(relays.map(ActuatorChannel::active_low), indicator)?;
//! let connectivity =
//!     ConnectivityManager::new(stack, tls, session, Delay, EmbassyClock, &config);
//! let mut hub = Hub::new(&config, connectivity, bank, metrics);
//! hub.run().await
//! ```

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod actuator;
pub mod config;
pub mod connectivity;
pub mod dispatcher;
pub mod error;
pub mod payload;
pub mod platform;
pub mod runtime;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export key types for easier access at the crate root.
pub use actuator::{ActuatorBank, ActuatorChannel, Actuators, ChannelStates, Indicator, Polarity};
pub use config::{BrokerEndpoint, DeviceIdentity, HubConfig, IdentityMaterial, ReconnectPolicy};
pub use connectivity::{ConnectivityManager, ConnectivityState, LinkState};
pub use dispatcher::{CommandDispatcher, InboundCommand};
pub use error::{ConfigError, HubError, PayloadFault};
pub use platform::{Clock, EmbassyClock, NetworkInterface, RuntimeMetrics};
pub use runtime::Hub;
pub use transport::{InboundMessage, PubSubTransport, SecureChannel};
