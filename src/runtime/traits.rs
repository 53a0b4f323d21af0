//! Message handler trait and the sinks it talks to.
//!
//! Handlers never perform async I/O directly. Inbound messages borrow the
//! transport's receive buffer, so a handler cannot publish while it still
//! holds one. Instead it queues responses through a [`PublishOutbox`] and the
//! connectivity manager sends them once the handler has returned and the
//! message is released.

use crate::platform::Clock;
use crate::transport::InboundMessage;

/// Object-safe trait for queuing publish requests.
///
/// Delivery is at most once: a request that does not fit the outbox, or that
/// the transport later rejects, is logged and forgotten.
pub trait PublishOutbox {
    /// Queue a message for publishing.
    ///
    /// Returns `false` when the request was dropped because it did not fit.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool;
}

/// Object-safe trait for collecting topics during registration.
pub trait TopicCollector {
    /// Add a topic to subscribe to. Returns `false` if the collector is full.
    fn add(&mut self, topic: &str) -> bool;
}

/// What a handler gets to work with while processing one message.
pub struct Context<'a> {
    clock: &'a dyn Clock,
    /// Where responses go.
    pub outbox: &'a mut dyn PublishOutbox,
}

impl<'a> Context<'a> {
    pub fn new(clock: &'a dyn Clock, outbox: &'a mut dyn PublishOutbox) -> Self {
        Self { clock, outbox }
    }

    /// Milliseconds since boot, read when called.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

/// Receives inbound messages from an established session.
///
/// The connectivity manager calls [`register`](Self::register) each time a
/// session comes up and subscribes to whatever the handler adds, then feeds
/// every polled message to [`on_message`](Self::on_message), one at a time
/// and in arrival order.
pub trait MessageHandler {
    /// Register the topics this handler wants to receive.
    fn register(&self, collector: &mut dyn TopicCollector);

    /// Handle one inbound message. Must not fail outward.
    fn on_message(&mut self, msg: &InboundMessage<'_>, ctx: &mut Context<'_>);
}

/// Blanket implementation for mutable references.
impl<H: MessageHandler + ?Sized> MessageHandler for &mut H {
    fn register(&self, collector: &mut dyn TopicCollector) {
        (**self).register(collector)
    }

    fn on_message(&mut self, msg: &InboundMessage<'_>, ctx: &mut Context<'_>) {
        (**self).on_message(msg, ctx)
    }
}
