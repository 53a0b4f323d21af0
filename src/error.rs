//! # Error Types
//!
//! Every failure the hub can run into is recovered locally: link and session
//! timeouts are retried on a later tick, bad commands are dropped, failed
//! publishes are logged. The enums here exist so that each of those paths can
//! say precisely what went wrong in the console log and in tests.

use core::fmt;

/// The primary error enum for the hub runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HubError {
    /// The network interface did not come up within the policy's attempt budget.
    LinkTimeout,
    /// A session was requested while the network link was not connected.
    PreconditionFailed,
    /// The broker session could not be established within the attempt budget.
    BrokerTimeout,
    /// The requested channel index is outside `1..=N`.
    InvalidChannel,
    /// An inbound payload could not be turned into a command.
    MalformedPayload(PayloadFault),
    /// The transport rejected an outbound message.
    PublishFailed,
    /// A relay or indicator pin could not be driven.
    PinFault,
    /// The secure channel handshake failed.
    HandshakeFailed,
    /// The broker refused or dropped the session during connect.
    SessionRefused,
    /// The transport rejected a subscription request.
    SubscribeFailed,
    /// An outbound payload or topic did not fit its fixed-size buffer.
    PayloadTooLarge,
}

/// Why an inbound payload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadFault {
    /// The payload bytes are not valid UTF-8.
    NotUtf8,
    /// The payload is not JSON, or a field has the wrong type.
    Undecodable,
    /// A required field is absent.
    Incomplete,
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HubError::LinkTimeout => f.write_str("network link timed out"),
            HubError::PreconditionFailed => f.write_str("network link is down"),
            HubError::BrokerTimeout => f.write_str("broker session timed out"),
            HubError::InvalidChannel => f.write_str("invalid channel"),
            HubError::MalformedPayload(fault) => write!(f, "malformed payload: {fault}"),
            HubError::PublishFailed => f.write_str("publish failed"),
            HubError::PinFault => f.write_str("pin write failed"),
            HubError::HandshakeFailed => f.write_str("secure channel handshake failed"),
            HubError::SessionRefused => f.write_str("broker refused session"),
            HubError::SubscribeFailed => f.write_str("subscribe failed"),
            HubError::PayloadTooLarge => f.write_str("payload too large"),
        }
    }
}

impl fmt::Display for PayloadFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadFault::NotUtf8 => f.write_str("not utf-8"),
            PayloadFault::Undecodable => f.write_str("undecodable"),
            PayloadFault::Incomplete => f.write_str("missing field"),
        }
    }
}

impl From<PayloadFault> for HubError {
    fn from(fault: PayloadFault) -> Self {
        HubError::MalformedPayload(fault)
    }
}

/// Errors raised while building the startup configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A string field exceeds its fixed capacity.
    FieldTooLong(&'static str),
    /// A reconnect policy was configured with zero attempts.
    NoAttempts,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FieldTooLong(field) => write!(f, "{field} is too long"),
            ConfigError::NoAttempts => f.write_str("reconnect policy needs at least one attempt"),
        }
    }
}
