//! # Wire Payloads
//!
//! Every message on the wire is one flat JSON object, except telemetry which
//! nests the relay states. Encoding goes into caller-provided buffers through
//! `serde-json-core`, so nothing here allocates.

use core::fmt::{self, Write};

use heapless::{String, Vec};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::actuator::{ChannelStates, MAX_CHANNELS};
use crate::error::{HubError, PayloadFault};

/// Largest payload the hub will encode or accept.
pub const MAX_PAYLOAD_LEN: usize = 512;

/// Serialize `value` into `buf`, returning the written bytes.
pub fn encode<'b, T>(value: &T, buf: &'b mut [u8]) -> Result<&'b [u8], HubError>
where
    T: Serialize + ?Sized,
{
    let len = serde_json_core::to_slice(value, buf).map_err(|_| HubError::PayloadTooLarge)?;
    Ok(&buf[..len])
}

/// Deserialize a JSON payload. Non-UTF-8 input is rejected before parsing.
pub fn decode<'a, T>(bytes: &'a [u8]) -> Result<T, PayloadFault>
where
    T: Deserialize<'a>,
{
    core::str::from_utf8(bytes).map_err(|_| PayloadFault::NotUtf8)?;
    serde_json_core::from_slice::<T>(bytes)
        .map(|(value, _)| value)
        .map_err(|_| PayloadFault::Undecodable)
}

/// Inbound control message: `{"relay": 2, "state": true}`.
///
/// Both fields are optional at this level so a missing field can be told
/// apart from a mistyped one. Keys other than these two are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ControlRequest {
    pub relay: Option<i32>,
    pub state: Option<bool>,
}

/// Acknowledgement published after a relay change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusAck {
    pub relay: i32,
    pub state: bool,
    pub timestamp: u64,
}

/// Published on the status topic whenever a session comes up.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OnlineStatus<'a> {
    pub status: &'a str,
    pub device: &'a str,
    pub timestamp: u64,
}

/// Published on the boot topic whenever a session comes up.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BootReport<'a> {
    pub device_id: &'a str,
    pub fw_version: &'a str,
    pub build_timestamp: &'a str,
    pub owner_id: &'a str,
    pub ip_address: &'a str,
    pub device_type: &'a str,
}

/// Periodic telemetry. `timestamp` is milliseconds since boot, `uptime` is
/// whole seconds.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TelemetryReport<'a> {
    pub device_id: &'a str,
    pub timestamp: u64,
    pub uptime: u64,
    pub free_heap: u32,
    pub wifi_rssi: i16,
    pub relay_states: &'a ChannelStates,
}

fn channel_key(index: usize) -> String<8> {
    let mut key = String::new();
    let _ = write!(key, "relay{index}");
    key
}

/// `{"relay1": true, "relay2": false, ...}`
impl Serialize for ChannelStates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (slot, on) in self.iter().enumerate() {
            map.serialize_entry(channel_key(slot + 1).as_str(), on)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ChannelStates {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ChannelStatesVisitor)
    }
}

struct ChannelStatesVisitor;

impl<'de> Visitor<'de> for ChannelStatesVisitor {
    type Value = ChannelStates;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of relayN keys to booleans")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut slots = [None; MAX_CHANNELS];
        while let Some((key, on)) = map.next_entry::<&'de str, bool>()? {
            let index = key
                .strip_prefix("relay")
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| (1..=MAX_CHANNELS).contains(n))
                .ok_or_else(|| <A::Error as de::Error>::custom("unknown channel key"))?;
            slots[index - 1] = Some(on);
        }

        let mut states = Vec::new();
        for on in slots.iter().map_while(|slot| *slot) {
            let _ = states.push(on);
        }
        if slots[states.len()..].iter().any(Option::is_some) {
            return Err(<A::Error as de::Error>::custom(
                "channel keys are not contiguous",
            ));
        }
        Ok(ChannelStates(states))
    }
}
