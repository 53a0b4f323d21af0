//! Hub Runtime
//!
//! Glue between the broker session and the rest of the device.
//!
//! # Overview
//!
//! - [`MessageHandler`] receives inbound messages and declares the topics it
//!   wants during session setup through a [`TopicCollector`].
//! - Handlers queue their responses through a [`PublishOutbox`]; the
//!   connectivity manager flushes the [`BufferedOutbox`] after each message.
//! - [`Hub`] owns all mutable state and drives the loop: link maintenance,
//!   command dispatch, telemetry.

pub(crate) mod hub;
pub(crate) mod publisher;
pub(crate) mod registry;
pub(crate) mod traits;

pub use hub::Hub;
pub use publisher::{BufferedOutbox, OwnedPublishRequest};
pub use registry::{MAX_SUBSCRIPTIONS, MAX_TOPIC_LEN, TopicRegistry};
pub use traits::{Context, MessageHandler, PublishOutbox, TopicCollector};
