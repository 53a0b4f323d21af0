//! # Connectivity Manager
//!
//! Keeps two links alive: the network interface underneath, and the broker
//! session on top of it. Both are repaired level-triggered from [`tick`]:
//! every call observes what the collaborators report, walks the repair ladder
//! network first then session, and finally pumps whatever inbound traffic the
//! transport has buffered into a [`MessageHandler`].
//!
//! Retry spacing is awaited in place. On a single-task executor that stalls
//! the whole run loop for the duration of a repair cycle (up to ~10 s for the
//! network with default policies), which matches the behaviour of the boards
//! this crate drives.
//!
//! [`tick`]: ConnectivityManager::tick

use core::fmt::Write;
use core::net::Ipv4Addr;

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use heapless::String;
use serde::Serialize;

use crate::config::{
    BrokerEndpoint, DeviceIdentity, HubConfig, IdentityMaterial, ReconnectPolicy, TopicSet,
};
use crate::error::HubError;
use crate::payload::{self, BootReport, MAX_PAYLOAD_LEN, OnlineStatus};
use crate::platform::{Clock, NetworkInterface};
use crate::runtime::publisher::BufferedOutbox;
use crate::runtime::registry::{MAX_SUBSCRIPTIONS, MAX_TOPIC_LEN, TopicRegistry};
use crate::runtime::traits::{Context, MessageHandler};
use crate::transport::{PubSubTransport, SecureChannel};

/// Maximum number of inbound messages dispatched per tick.
pub const PUMP_BUDGET: usize = 16;

/// Pending responses queued by the handler for one inbound message.
pub const OUTBOX_CAPACITY: usize = 4;

type Outbox = BufferedOutbox<OUTBOX_CAPACITY, MAX_TOPIC_LEN, MAX_PAYLOAD_LEN>;

/// Lifecycle of one link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// State of both links.
///
/// `session` is only ever `Connected` while `network` is `Connected`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectivityState {
    pub network: LinkState,
    pub session: LinkState,
}

impl ConnectivityState {
    /// Both links are up.
    pub fn is_online(&self) -> bool {
        self.network == LinkState::Connected && self.session == LinkState::Connected
    }
}

/// Owns the network interface, the secure channel and the pub/sub transport.
pub struct ConnectivityManager<N, S, T, D, C> {
    network: N,
    secure: S,
    transport: T,
    delay: D,
    clock: C,
    state: ConnectivityState,
    identity: DeviceIdentity,
    topics: TopicSet,
    endpoint: BrokerEndpoint,
    material: IdentityMaterial,
    network_policy: ReconnectPolicy,
    session_policy: ReconnectPolicy,
    /// Earliest time the next network repair cycle may start.
    network_retry_at: Option<u64>,
    /// Earliest time the next session repair cycle may start.
    session_retry_at: Option<u64>,
    address: Option<Ipv4Addr>,
    outbox: Outbox,
}

impl<N, S, T, D, C> ConnectivityManager<N, S, T, D, C>
where
    N: NetworkInterface,
    S: SecureChannel,
    T: PubSubTransport,
    D: DelayNs,
    C: Clock,
{
    /// Both links start `Disconnected`; nothing is touched until the first tick.
    pub fn new(network: N, secure: S, transport: T, delay: D, clock: C, config: &HubConfig) -> Self {
        Self {
            network,
            secure,
            transport,
            delay,
            clock,
            state: ConnectivityState::default(),
            identity: config.identity.clone(),
            topics: config.topics.clone(),
            endpoint: config.endpoint,
            material: config.material,
            network_policy: config.network_policy,
            session_policy: config.session_policy,
            network_retry_at: None,
            session_retry_at: None,
            address: None,
            outbox: Outbox::new(),
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    pub fn is_online(&self) -> bool {
        self.state.is_online()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Address reported by the interface when the network link last came up.
    pub fn local_address(&self) -> Option<Ipv4Addr> {
        self.address
    }

    /// One iteration of link maintenance followed by inbound dispatch.
    ///
    /// Returns the error of a repair cycle that ran out of attempts. The
    /// manager is left in a consistent state either way and the next tick
    /// simply tries again, once the policy cooldown has elapsed since the
    /// failed cycle ended.
    pub async fn tick<H: MessageHandler>(&mut self, handler: &mut H) -> Result<(), HubError> {
        self.observe_links();

        if self.state.network != LinkState::Connected {
            let now = self.clock.now_ms();
            if !cooldown_elapsed(self.network_retry_at, now) {
                return Ok(());
            }
            if let Err(err) = self.ensure_network_link().await {
                let failed_at = self.clock.now_ms();
                self.network_retry_at = Some(failed_at + u64::from(millis(self.network_policy.cooldown())));
                return Err(err);
            }
            self.network_retry_at = None;
        }

        if self.state.session != LinkState::Connected {
            let now = self.clock.now_ms();
            if !cooldown_elapsed(self.session_retry_at, now) {
                return Ok(());
            }
            if let Err(err) = self.ensure_session_link(&*handler).await {
                let failed_at = self.clock.now_ms();
                self.session_retry_at = Some(failed_at + u64::from(millis(self.session_policy.cooldown())));
                return Err(err);
            }
            self.session_retry_at = None;
        }

        self.pump(handler).await;
        Ok(())
    }

    /// Bring the network link up, polling the interface until it reports
    /// connected or the policy runs out of attempts.
    pub async fn ensure_network_link(&mut self) -> Result<(), HubError> {
        if self.state.network == LinkState::Connected && self.network.is_connected() {
            return Ok(());
        }

        self.state.network = LinkState::Connecting;
        self.state.session = LinkState::Disconnected;
        info!("connecting network");
        self.network.begin();

        let max_attempts = self.network_policy.max_attempts();
        let mut attempts = 0;
        while !self.network.is_connected() {
            if attempts == max_attempts {
                self.state.network = LinkState::Disconnected;
                error!("network did not come up after {} attempts", max_attempts);
                return Err(HubError::LinkTimeout);
            }
            attempts += 1;
            self.pause(self.network_policy.attempt_interval()).await;
        }

        self.state.network = LinkState::Connected;
        self.address = self.network.local_address();
        match self.address {
            Some(address) => {
                let octets = address.octets();
                info!(
                    "network connected, address {}.{}.{}.{}",
                    octets[0],
                    octets[1],
                    octets[2],
                    octets[3]
                );
            }
            None => info!("network connected, no address assigned yet"),
        }
        Ok(())
    }

    /// Establish the broker session over an already connected network.
    ///
    /// On success the handler's topics are subscribed and the online status
    /// and boot report are published.
    pub async fn ensure_session_link<H>(&mut self, handler: &H) -> Result<(), HubError>
    where
        H: MessageHandler + ?Sized,
    {
        if self.state.network != LinkState::Connected {
            return Err(HubError::PreconditionFailed);
        }
        if self.state.session == LinkState::Connected && self.transport.is_connected() {
            return Ok(());
        }

        self.state.session = LinkState::Connecting;
        let max_attempts = self.session_policy.max_attempts();
        for attempt in 1..=max_attempts {
            info!("opening broker session, attempt {}/{}", attempt, max_attempts);
            match self.open_session().await {
                Ok(()) => {
                    if !self.network.is_connected() {
                        warn!("network dropped while the session was opening");
                        self.demote_network();
                        return Err(HubError::PreconditionFailed);
                    }
                    self.state.session = LinkState::Connected;
                    info!("broker session established");
                    self.announce_session(handler).await;
                    return Ok(());
                }
                Err(err) => warn!("broker session attempt failed: {}", err),
            }
            if attempt < max_attempts {
                self.pause(self.session_policy.attempt_interval()).await;
            }
        }

        self.state.session = LinkState::Disconnected;
        error!("broker unreachable after {} attempts", max_attempts);
        Err(HubError::BrokerTimeout)
    }

    /// Fire-and-forget publish of a serializable payload.
    pub async fn publish<V: Serialize>(&mut self, topic: &str, value: &V) -> Result<(), HubError> {
        if !self.is_online() {
            return Err(HubError::PreconditionFailed);
        }
        send(&mut self.transport, topic, value).await
    }

    /// Sleep through the injected delay.
    pub async fn pause(&mut self, duration: Duration) {
        self.delay.delay_ms(millis(duration)).await;
    }

    fn observe_links(&mut self) {
        if self.state.network == LinkState::Connected && !self.network.is_connected() {
            warn!("network link lost");
            self.demote_network();
        }
        if self.state.session == LinkState::Connected && !self.transport.is_connected() {
            warn!("broker session lost");
            self.state.session = LinkState::Disconnected;
        }
    }

    fn demote_network(&mut self) {
        self.state.network = LinkState::Disconnected;
        self.state.session = LinkState::Disconnected;
        self.address = None;
    }

    async fn open_session(&mut self) -> Result<(), HubError> {
        self.secure
            .handshake(&self.endpoint, &self.material)
            .await
            .map_err(|_| HubError::HandshakeFailed)?;
        self.transport
            .connect(self.identity.device_id())
            .await
            .map_err(|_| HubError::SessionRefused)
    }

    async fn announce_session<H>(&mut self, handler: &H)
    where
        H: MessageHandler + ?Sized,
    {
        let mut registry = TopicRegistry::<MAX_SUBSCRIPTIONS>::new();
        handler.register(&mut registry);
        for topic in registry.iter() {
            let subscribed = self.transport.subscribe(topic).await;
            match subscribed.map_err(|_| HubError::SubscribeFailed) {
                Ok(()) => info!("subscribed to {}", topic),
                Err(err) => warn!("{} on {}", err, topic),
            }
        }

        let online = OnlineStatus {
            status: "online",
            device: self.identity.device_id(),
            timestamp: self.clock.now_ms(),
        };
        if let Err(err) = send(&mut self.transport, &self.topics.status, &online).await {
            warn!("online status not sent: {}", err);
        }

        let mut address = String::<16>::new();
        match self.address {
            Some(ip) => {
                let _ = write!(address, "{ip}");
            }
            None => {
                let _ = address.push_str("0.0.0.0");
            }
        }
        let boot = BootReport {
            device_id: self.identity.device_id(),
            fw_version: self.identity.firmware_version(),
            build_timestamp: self.identity.build_timestamp(),
            owner_id: self.identity.owner_id(),
            ip_address: &address,
            device_type: self.identity.device_type(),
        };
        if let Err(err) = send(&mut self.transport, &self.topics.boot, &boot).await {
            warn!("boot report not sent: {}", err);
        }
    }

    /// Drain buffered inbound messages into the handler, flushing its
    /// responses after each one.
    async fn pump<H: MessageHandler>(&mut self, handler: &mut H) {
        for _ in 0..PUMP_BUDGET {
            match self.transport.poll().await {
                Ok(Some(msg)) => {
                    debug!("message on {} ({} bytes)", msg.topic, msg.payload.len());
                    let mut ctx = Context::new(&self.clock, &mut self.outbox);
                    handler.on_message(&msg, &mut ctx);
                }
                Ok(None) => return,
                Err(_) => {
                    warn!("transport poll failed, dropping session");
                    self.state.session = LinkState::Disconnected;
                    return;
                }
            }
            self.flush().await;
        }
    }

    async fn flush(&mut self) {
        for request in self.outbox.take() {
            let sent = self.transport.publish(&request.topic, &request.payload).await;
            if sent.is_err() {
                warn!("{} on {}", HubError::PublishFailed, request.topic.as_str());
            }
        }
    }
}

async fn send<T, V>(transport: &mut T, topic: &str, value: &V) -> Result<(), HubError>
where
    T: PubSubTransport,
    V: Serialize + ?Sized,
{
    let mut buf = [0u8; MAX_PAYLOAD_LEN];
    let bytes = payload::encode(value, &mut buf)?;
    transport
        .publish(topic, bytes)
        .await
        .map_err(|_| HubError::PublishFailed)
}

fn cooldown_elapsed(retry_at: Option<u64>, now_ms: u64) -> bool {
    retry_at.is_none_or(|at| now_ms >= at)
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}
