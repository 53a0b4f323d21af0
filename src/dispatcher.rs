//! # Command Dispatcher
//!
//! Turns control messages into relay changes and acknowledges each change on
//! the status topic. Anything that cannot be executed is logged and dropped:
//! the sender gets no reply for a malformed or out-of-range command.

use crate::actuator::Actuators;
use crate::config::{TopicSet, TopicString};
use crate::error::{HubError, PayloadFault};
use crate::payload::{self, ControlRequest, StatusAck};
use crate::runtime::traits::{Context, MessageHandler, TopicCollector};
use crate::transport::InboundMessage;

/// A decoded, complete control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundCommand {
    /// Channel as sent by the controller. Not yet range checked.
    pub channel: i32,
    pub desired_state: bool,
}

impl InboundCommand {
    pub fn parse(payload: &[u8]) -> Result<Self, PayloadFault> {
        let request: ControlRequest = payload::decode(payload)?;
        match (request.relay, request.state) {
            (Some(channel), Some(desired_state)) => Ok(Self {
                channel,
                desired_state,
            }),
            _ => Err(PayloadFault::Incomplete),
        }
    }
}

/// [`MessageHandler`] for the device's control topic.
pub struct CommandDispatcher<A> {
    actuators: A,
    control_topic: TopicString,
    status_topic: TopicString,
}

impl<A: Actuators> CommandDispatcher<A> {
    pub fn new(actuators: A, topics: &TopicSet) -> Self {
        Self {
            actuators,
            control_topic: topics.control.clone(),
            status_topic: topics.status.clone(),
        }
    }

    pub fn actuators(&self) -> &A {
        &self.actuators
    }

    /// Handle one inbound message. Never fails outward.
    pub fn handle_message(&mut self, topic: &str, payload: &[u8], ctx: &mut Context<'_>) {
        if topic != self.control_topic.as_str() {
            debug!("ignoring message on {}", topic);
            return;
        }

        match self.execute(payload) {
            Ok(command) => self.acknowledge(command, ctx),
            Err(HubError::MalformedPayload(PayloadFault::Incomplete)) => {
                debug!("control message without relay or state dropped");
            }
            Err(err) => warn!("control message dropped: {}", err),
        }
    }

    /// Decode and apply a control payload.
    pub fn execute(&mut self, payload: &[u8]) -> Result<InboundCommand, HubError> {
        let command = InboundCommand::parse(payload)?;
        let index = usize::try_from(command.channel).map_err(|_| HubError::InvalidChannel)?;
        self.actuators.set_channel(index, command.desired_state)?;
        Ok(command)
    }

    fn acknowledge(&self, command: InboundCommand, ctx: &mut Context<'_>) {
        let ack = StatusAck {
            relay: command.channel,
            state: command.desired_state,
            timestamp: ctx.now_ms(),
        };
        let mut buf = [0u8; 96];
        match payload::encode(&ack, &mut buf) {
            Ok(bytes) => {
                if !ctx.outbox.publish(&self.status_topic, bytes) {
                    warn!("status ack for relay {} not queued", command.channel);
                }
            }
            Err(err) => warn!("status ack not encoded: {}", err),
        }
    }
}

impl<A: Actuators> MessageHandler for CommandDispatcher<A> {
    fn register(&self, collector: &mut dyn TopicCollector) {
        if !collector.add(&self.control_topic) {
            warn!("could not register {}", self.control_topic.as_str());
        }
    }

    fn on_message(&mut self, msg: &InboundMessage<'_>, ctx: &mut Context<'_>) {
        self.handle_message(msg.topic, msg.payload, ctx);
    }
}
