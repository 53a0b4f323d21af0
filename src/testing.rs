//! Fakes for unit tests: pins, a simulated clock whose delays advance time,
//! a scriptable network interface and an in-memory broker.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::Ipv4Addr;
use std::rc::Rc;
use std::string::{String, ToString};
use std::vec::Vec;

use embedded_hal::digital::{ErrorType, OutputPin, PinState, StatefulOutputPin};

use crate::config::{BrokerEndpoint, IdentityMaterial};
use crate::platform::{Clock, NetworkInterface, RuntimeMetrics};
use crate::transport::{InboundMessage, PubSubTransport, SecureChannel};

/// Output pin that remembers its level. Clones share state.
#[derive(Clone, Default)]
pub struct FakePin {
    level: Rc<Cell<Option<PinState>>>,
    writes: Rc<Cell<u32>>,
    pulses: Rc<Cell<u32>>,
}

impl FakePin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> Option<PinState> {
        self.level.get()
    }

    pub fn writes(&self) -> u32 {
        self.writes.get()
    }

    /// Number of low-to-high transitions.
    pub fn pulses(&self) -> u32 {
        self.pulses.get()
    }

    fn write(&self, state: PinState) {
        if state == PinState::High && self.level.get() != Some(PinState::High) {
            self.pulses.set(self.pulses.get() + 1);
        }
        self.level.set(Some(state));
        self.writes.set(self.writes.get() + 1);
    }
}

impl ErrorType for FakePin {
    type Error = Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.write(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.write(PinState::High);
        Ok(())
    }
}

impl StatefulOutputPin for FakePin {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level.get() == Some(PinState::High))
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.level.get() == Some(PinState::Low))
    }
}

/// Millisecond clock advanced only by its delays.
#[derive(Clone, Default)]
pub struct SimClock {
    nanos: Rc<Cell<u64>>,
    sleeps: Rc<Cell<u32>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.nanos.get() / 1_000_000
    }

    pub fn advance_ms(&self, ms: u64) {
        self.nanos.set(self.nanos.get() + ms * 1_000_000);
    }

    /// Number of `delay_*` calls made through any of this clock's delays.
    pub fn sleeps(&self) -> u32 {
        self.sleeps.get()
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay {
            clock: self.clone(),
        }
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        self.now()
    }
}

#[derive(Clone)]
pub struct SimDelay {
    clock: SimClock,
}

impl SimDelay {
    fn sleep_ns(&mut self, ns: u64) {
        self.clock.nanos.set(self.clock.nanos.get() + ns);
        self.clock.sleeps.set(self.clock.sleeps.get() + 1);
    }
}

impl embedded_hal::delay::DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.sleep_ns(u64::from(ns));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.sleep_ns(u64::from(ms) * 1_000_000);
    }
}

impl embedded_hal_async::delay::DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.sleep_ns(u64::from(ns));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.sleep_ns(u64::from(ms) * 1_000_000);
    }
}

#[derive(Default)]
pub struct NetworkState {
    pub up: bool,
    /// Come up once this many status polls have been made.
    pub up_after_polls: Option<u32>,
    pub polls: u32,
    pub begins: u32,
}

#[derive(Clone, Default)]
pub struct FakeNetwork {
    pub state: Rc<RefCell<NetworkState>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_up(&self, up: bool) {
        let mut state = self.state.borrow_mut();
        state.up = up;
        state.up_after_polls = None;
    }

    pub fn up_after(&self, polls: u32) {
        self.state.borrow_mut().up_after_polls = Some(polls);
    }

    pub fn polls(&self) -> u32 {
        self.state.borrow().polls
    }
}

impl NetworkInterface for FakeNetwork {
    fn begin(&mut self) {
        self.state.borrow_mut().begins += 1;
    }

    fn is_connected(&self) -> bool {
        let mut state = self.state.borrow_mut();
        state.polls += 1;
        if state.up_after_polls.is_some_and(|n| state.polls >= n) {
            state.up = true;
        }
        state.up
    }

    fn local_address(&self) -> Option<Ipv4Addr> {
        self.state.borrow().up.then(|| Ipv4Addr::new(192, 168, 1, 42))
    }
}

#[derive(Clone, Default)]
pub struct FakeSecure {
    pub handshakes: Rc<Cell<u32>>,
    pub fail: Rc<Cell<bool>>,
}

impl SecureChannel for FakeSecure {
    type Error = ();

    async fn handshake(
        &mut self,
        _endpoint: &BrokerEndpoint,
        _material: &IdentityMaterial,
    ) -> Result<(), ()> {
        self.handshakes.set(self.handshakes.get() + 1);
        if self.fail.get() { Err(()) } else { Ok(()) }
    }
}

#[derive(Default)]
pub struct BrokerState {
    pub connected: bool,
    /// Refuse the next N connect attempts.
    pub refuse: u32,
    pub connects: u32,
    pub client_ids: Vec<String>,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, String)>,
    pub inbound: VecDeque<(String, Vec<u8>)>,
    pub fail_publish: bool,
    pub fail_poll: bool,
}

/// In-memory pub/sub session. Clones share the broker state.
#[derive(Default)]
pub struct FakeBroker {
    pub state: Rc<RefCell<BrokerState>>,
    current: Option<(String, Vec<u8>)>,
}

impl FakeBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Rc<RefCell<BrokerState>> {
        self.state.clone()
    }
}

impl BrokerState {
    pub fn deliver(&mut self, topic: &str, payload: &[u8]) {
        self.inbound.push_back((topic.to_string(), payload.to_vec()));
    }

    pub fn published_on(&self, topic: &str) -> Vec<String> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

impl PubSubTransport for FakeBroker {
    type Error = ();

    async fn connect(&mut self, client_id: &str) -> Result<(), ()> {
        let mut state = self.state.borrow_mut();
        state.connects += 1;
        if state.refuse > 0 {
            state.refuse -= 1;
            return Err(());
        }
        state.client_ids.push(client_id.to_string());
        state.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), ()> {
        self.state.borrow_mut().subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ()> {
        let mut state = self.state.borrow_mut();
        if state.fail_publish {
            return Err(());
        }
        let text = String::from_utf8(payload.to_vec()).map_err(|_| ())?;
        state.published.push((topic.to_string(), text));
        Ok(())
    }

    async fn poll(&mut self) -> Result<Option<InboundMessage<'_>>, ()> {
        if self.state.borrow().fail_poll {
            return Err(());
        }
        self.current = self.state.borrow_mut().inbound.pop_front();
        Ok(self.current.as_ref().map(|(topic, payload)| InboundMessage {
            topic: topic.as_str(),
            payload: payload.as_slice(),
        }))
    }
}

#[derive(Clone, Copy)]
pub struct FakeMetrics {
    pub free_memory: u32,
    pub signal_strength: i16,
}

impl Default for FakeMetrics {
    fn default() -> Self {
        Self {
            free_memory: 201_344,
            signal_strength: -61,
        }
    }
}

impl RuntimeMetrics for FakeMetrics {
    fn free_memory(&self) -> u32 {
        self.free_memory
    }

    fn signal_strength(&self) -> i16 {
        self.signal_strength
    }
}
