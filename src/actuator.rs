//! # Actuator Bank
//!
//! Owns the relay outputs and the indicator LED. Channels are addressed
//! `1..=N` the way they are labelled on the relay module, and every write goes
//! through the channel's polarity so callers only ever deal in on/off.

use core::ops::Deref;

use embassy_time::Duration;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState, StatefulOutputPin};
use heapless::Vec;

use crate::config::HubConfig;
use crate::error::HubError;

/// Upper bound on channels per bank.
pub const MAX_CHANNELS: usize = 16;

/// Which electrical level means "on".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// On drives the pin low. Typical for opto-isolated relay modules.
    ActiveLow,
    ActiveHigh,
}

impl Polarity {
    /// The pin level that represents `on`.
    pub fn level(self, on: bool) -> PinState {
        match (self, on) {
            (Polarity::ActiveHigh, true) | (Polarity::ActiveLow, false) => PinState::High,
            (Polarity::ActiveHigh, false) | (Polarity::ActiveLow, true) => PinState::Low,
        }
    }

    /// Inverse of [`level`](Self::level).
    pub fn is_on(self, level: PinState) -> bool {
        self.level(true) == level
    }
}

/// On/off state of every channel, channel 1 first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelStates(pub(crate) Vec<bool, MAX_CHANNELS>);

impl ChannelStates {
    /// Copies up to [`MAX_CHANNELS`] states.
    pub fn from_slice(states: &[bool]) -> Self {
        let mut out = Vec::new();
        for &on in states.iter().take(MAX_CHANNELS) {
            let _ = out.push(on);
        }
        Self(out)
    }

    /// State of channel `index` (1-based).
    pub fn channel(&self, index: usize) -> Option<bool> {
        index.checked_sub(1).and_then(|slot| self.0.get(slot).copied())
    }
}

impl Deref for ChannelStates {
    type Target = [bool];

    fn deref(&self) -> &[bool] {
        &self.0
    }
}

/// The surface the dispatcher and the telemetry scheduler see.
pub trait Actuators {
    /// Switch channel `index` (1-based) on or off.
    fn set_channel(&mut self, index: usize, on: bool) -> Result<(), HubError>;

    /// Last state written to channel `index`.
    fn get_channel(&self, index: usize) -> Result<bool, HubError>;

    fn snapshot_all(&self) -> ChannelStates;
}

/// One relay output.
pub struct ActuatorChannel<P> {
    pin: P,
    polarity: Polarity,
    state: bool,
}

impl<P: OutputPin> ActuatorChannel<P> {
    pub fn new(pin: P, polarity: Polarity) -> Self {
        Self {
            pin,
            polarity,
            state: false,
        }
    }

    pub fn active_low(pin: P) -> Self {
        Self::new(pin, Polarity::ActiveLow)
    }

    fn drive(&mut self, on: bool) -> Result<(), HubError> {
        self.pin
            .set_state(self.polarity.level(on))
            .map_err(|_| HubError::PinFault)?;
        self.state = on;
        Ok(())
    }
}

/// Status LED flashed after every relay change.
pub struct Indicator<L, D> {
    pin: L,
    delay: D,
    pulse: Duration,
}

impl<L: OutputPin, D: DelayNs> Indicator<L, D> {
    pub fn new(pin: L, delay: D, pulse: Duration) -> Self {
        Self { pin, delay, pulse }
    }

    /// Indicator lit for the configured `indicator_pulse`.
    pub fn from_config(pin: L, delay: D, config: &HubConfig) -> Self {
        Self::new(pin, delay, config.indicator_pulse)
    }

    /// Light the LED for the pulse duration. Blocks the caller.
    pub fn pulse(&mut self) {
        if self.pin.set_high().is_err() {
            warn!("indicator pin write failed");
            return;
        }
        let millis = u32::try_from(self.pulse.as_millis()).unwrap_or(u32::MAX);
        self.delay.delay_ms(millis);
        if self.pin.set_low().is_err() {
            warn!("indicator pin write failed");
        }
    }
}

/// N relay channels plus the indicator.
pub struct ActuatorBank<P, L, D, const N: usize> {
    channels: [ActuatorChannel<P>; N],
    indicator: Indicator<L, D>,
}

impl<P, L, D, const N: usize> ActuatorBank<P, L, D, N>
where
    P: OutputPin,
    L: OutputPin,
    D: DelayNs,
{
    /// Takes ownership of the channels and drives every one of them off.
    pub fn new(
        mut channels: [ActuatorChannel<P>; N],
        indicator: Indicator<L, D>,
    ) -> Result<Self, HubError> {
        const { assert!(N >= 1 && N <= MAX_CHANNELS, "channel count out of range") };

        for channel in channels.iter_mut() {
            channel.drive(false)?;
        }
        info!("{} relay channels initialised off", N);

        Ok(Self {
            channels,
            indicator,
        })
    }

    fn slot(index: usize) -> Result<usize, HubError> {
        index
            .checked_sub(1)
            .filter(|slot| *slot < N)
            .ok_or(HubError::InvalidChannel)
    }
}

impl<P, L, D, const N: usize> ActuatorBank<P, L, D, N>
where
    P: StatefulOutputPin,
    L: OutputPin,
    D: DelayNs,
{
    /// Read the level actually driven on channel `index` and map it back
    /// through the channel's polarity.
    pub fn read_back(&mut self, index: usize) -> Result<bool, HubError> {
        let channel = &mut self.channels[Self::slot(index)?];
        let high = channel.pin.is_set_high().map_err(|_| HubError::PinFault)?;
        Ok(channel.polarity.is_on(PinState::from(high)))
    }
}

impl<P, L, D, const N: usize> Actuators for ActuatorBank<P, L, D, N>
where
    P: OutputPin,
    L: OutputPin,
    D: DelayNs,
{
    fn set_channel(&mut self, index: usize, on: bool) -> Result<(), HubError> {
        let slot = Self::slot(index)?;
        self.channels[slot].drive(on)?;
        info!("relay {} {}", index, if on { "ON" } else { "OFF" });
        self.indicator.pulse();
        Ok(())
    }

    fn get_channel(&self, index: usize) -> Result<bool, HubError> {
        Ok(self.channels[Self::slot(index)?].state)
    }

    fn snapshot_all(&self) -> ChannelStates {
        let mut states = Vec::new();
        for channel in &self.channels {
            let _ = states.push(channel.state);
        }
        ChannelStates(states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePin, SimClock};

    type Bank = ActuatorBank<FakePin, FakePin, crate::testing::SimDelay, 4>;

    fn bank() -> (Bank, [FakePin; 4], FakePin, SimClock) {
        let pins = [FakePin::new(), FakePin::new(), FakePin::new(), FakePin::new()];
        let handles = pins.clone();
        let led = FakePin::new();
        let clock = SimClock::new();
        let channels = pins.map(ActuatorChannel::active_low);
        let indicator = Indicator::new(led.clone(), clock.delay(), Duration::from_millis(100));
        (Bank::new(channels, indicator).unwrap(), handles, led, clock)
    }

    #[test]
    fn channels_start_off() {
        let (bank, pins, led, _) = bank();
        for pin in &pins {
            assert_eq!(pin.level(), Some(PinState::High));
        }
        assert_eq!(*bank.snapshot_all(), [false; 4]);
        assert_eq!(led.pulses(), 0);
    }

    #[test]
    fn set_channel_drives_active_low() {
        let (mut bank, pins, led, clock) = bank();
        bank.set_channel(2, true).unwrap();

        assert_eq!(bank.get_channel(2), Ok(true));
        assert_eq!(pins[1].level(), Some(PinState::Low));
        assert_eq!(pins[0].level(), Some(PinState::High));
        assert_eq!(led.pulses(), 1);
        assert_eq!(led.level(), Some(PinState::Low));
        assert_eq!(clock.now(), 100);

        bank.set_channel(2, false).unwrap();
        assert_eq!(bank.get_channel(2), Ok(false));
        assert_eq!(pins[1].level(), Some(PinState::High));
    }

    #[test]
    fn out_of_range_is_rejected_without_side_effects() {
        let (mut bank, pins, led, _) = bank();
        bank.set_channel(3, true).unwrap();
        let before = bank.snapshot_all();
        let writes: std::vec::Vec<u32> = pins.iter().map(FakePin::writes).collect();

        for index in [0, 5, usize::MAX] {
            assert_eq!(bank.set_channel(index, true), Err(HubError::InvalidChannel));
            assert_eq!(bank.get_channel(index), Err(HubError::InvalidChannel));
        }

        assert_eq!(bank.snapshot_all(), before);
        let after: std::vec::Vec<u32> = pins.iter().map(FakePin::writes).collect();
        assert_eq!(writes, after);
        assert_eq!(led.pulses(), 1);
    }

    #[test]
    fn read_back_matches_latched_state() {
        let (mut bank, _, _, _) = bank();
        bank.set_channel(1, true).unwrap();
        bank.set_channel(4, true).unwrap();
        for index in 1..=4 {
            assert_eq!(bank.read_back(index), bank.get_channel(index));
        }
        assert_eq!(bank.read_back(9), Err(HubError::InvalidChannel));
    }

    #[test]
    fn indicator_uses_configured_pulse() {
        let identity =
            crate::config::DeviceIdentity::new("hub-1", "o", "1.0.0", "b", "hub").unwrap();
        let mut config = HubConfig::new(identity).unwrap();
        config.indicator_pulse = Duration::from_millis(250);

        let led = FakePin::new();
        let clock = SimClock::new();
        let mut indicator = Indicator::from_config(led.clone(), clock.delay(), &config);
        indicator.pulse();

        assert_eq!(clock.now(), 250);
        assert_eq!(led.pulses(), 1);
        assert_eq!(led.level(), Some(PinState::Low));
    }

    #[test]
    fn active_high_polarity() {
        assert_eq!(Polarity::ActiveHigh.level(true), PinState::High);
        assert_eq!(Polarity::ActiveLow.level(true), PinState::Low);
        assert!(Polarity::ActiveLow.is_on(PinState::Low));
        assert!(!Polarity::ActiveHigh.is_on(PinState::Low));
    }

    #[test]
    fn channel_states_are_one_based() {
        let states = ChannelStates::from_slice(&[true, false]);
        assert_eq!(states.channel(1), Some(true));
        assert_eq!(states.channel(2), Some(false));
        assert_eq!(states.channel(0), None);
        assert_eq!(states.channel(3), None);
    }
}
