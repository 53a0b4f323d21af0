//! # Session Transport Abstraction
//!
//! The hub does not speak the broker's wire protocol itself. It drives two
//! collaborators: a [`SecureChannel`] that authenticates the device to the
//! broker endpoint, and a [`PubSubTransport`] that runs the publish/subscribe
//! session over it. Both are implemented by the board crate on top of
//! whatever TLS and MQTT stacks it ships.
//!
//! These traits use native `async fn`; the hub awaits every call in place,
//! so a slow collaborator stalls the whole run loop for that long.

use crate::config::{BrokerEndpoint, IdentityMaterial};

/// One message taken off the session's inbound queue.
///
/// Borrows the transport's receive buffer, so it must be dropped before the
/// transport is used again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundMessage<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
}

/// Supplies an authenticated, encrypted byte stream to the broker.
#[allow(async_fn_in_trait)]
pub trait SecureChannel {
    type Error: core::fmt::Debug;

    /// Open the channel to `endpoint`, presenting `material` as the device identity.
    async fn handshake(
        &mut self,
        endpoint: &BrokerEndpoint,
        material: &IdentityMaterial,
    ) -> Result<(), Self::Error>;
}

/// A publish/subscribe session running over the secure channel.
///
/// Publishes are fire-and-forget: `Ok` only means the transport accepted the
/// message for sending.
#[allow(async_fn_in_trait)]
pub trait PubSubTransport {
    type Error: core::fmt::Debug;

    /// Start a session identified by `client_id`.
    async fn connect(&mut self, client_id: &str) -> Result<(), Self::Error>;

    /// Whether the session is still up.
    fn is_connected(&self) -> bool;

    async fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error>;

    /// Take the next buffered inbound message, if any.
    ///
    /// Must not wait for new traffic: `Ok(None)` means the buffer is empty.
    async fn poll(&mut self) -> Result<Option<InboundMessage<'_>>, Self::Error>;
}
