//! The run loop tying connectivity, command dispatch and telemetry together.

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;

use crate::actuator::Actuators;
use crate::config::{DeviceIdentity, HubConfig, TopicString};
use crate::connectivity::ConnectivityManager;
use crate::dispatcher::CommandDispatcher;
use crate::platform::{Clock, NetworkInterface, RuntimeMetrics};
use crate::telemetry::{TelemetryScheduler, build_snapshot};
use crate::transport::{PubSubTransport, SecureChannel};

/// Owns every piece of mutable device state.
///
/// # Type Parameters
///
/// - `N`, `S`, `T`: network interface, secure channel and pub/sub transport
/// - `D`: async delay used for retry spacing and the loop idle time
/// - `C`: monotonic clock
/// - `M`: runtime metrics source
/// - `A`: the relay bank
pub struct Hub<N, S, T, D, C, M, A> {
    identity: DeviceIdentity,
    telemetry_topic: TopicString,
    loop_interval: Duration,
    connectivity: ConnectivityManager<N, S, T, D, C>,
    dispatcher: CommandDispatcher<A>,
    metrics: M,
    telemetry: TelemetryScheduler,
}

impl<N, S, T, D, C, M, A> Hub<N, S, T, D, C, M, A>
where
    N: NetworkInterface,
    S: SecureChannel,
    T: PubSubTransport,
    D: DelayNs,
    C: Clock,
    M: RuntimeMetrics,
    A: Actuators,
{
    pub fn new(
        config: &HubConfig,
        connectivity: ConnectivityManager<N, S, T, D, C>,
        actuators: A,
        metrics: M,
    ) -> Self {
        Self {
            identity: config.identity.clone(),
            telemetry_topic: config.topics.telemetry.clone(),
            loop_interval: config.loop_interval,
            connectivity,
            dispatcher: CommandDispatcher::new(actuators, &config.topics),
            metrics,
            telemetry: TelemetryScheduler::new(config.telemetry_interval),
        }
    }

    pub fn connectivity(&self) -> &ConnectivityManager<N, S, T, D, C> {
        &self.connectivity
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<A> {
        &self.dispatcher
    }

    /// Log the startup banner.
    pub fn announce(&self) {
        info!(
            "{} firmware v{}",
            self.identity.device_type(),
            self.identity.firmware_version()
        );
        info!(
            "device {} owned by {}, built {}",
            self.identity.device_id(),
            self.identity.owner_id(),
            self.identity.build_timestamp()
        );
    }

    /// One pass of the loop body: maintain links, dispatch inbound commands,
    /// then send telemetry if it is due.
    pub async fn tick(&mut self) {
        if let Err(err) = self.connectivity.tick(&mut self.dispatcher).await {
            warn!("connectivity: {}", err);
        }
        self.report_if_due().await;
    }

    /// Run forever.
    pub async fn run(&mut self) -> ! {
        self.announce();
        loop {
            self.tick().await;
            self.connectivity.pause(self.loop_interval).await;
        }
    }

    /// Publish one telemetry report if online and the interval has elapsed.
    ///
    /// A failed publish still counts as the interval's report.
    async fn report_if_due(&mut self) {
        let now = self.connectivity.clock().now_ms();
        if !self.connectivity.is_online() || !self.telemetry.is_due(now) {
            return;
        }

        let snapshot = build_snapshot(
            &self.identity,
            self.dispatcher.actuators(),
            &self.metrics,
            now,
        );
        match self
            .connectivity
            .publish(&self.telemetry_topic, &snapshot.report())
            .await
        {
            Ok(()) => debug!("telemetry sent at {} ms", now),
            Err(err) => warn!("telemetry not sent: {}", err),
        }
        self.telemetry.mark_reported(now);
    }
}
