//! Buffered outbox used between message handling and the transport.

use heapless::{String, Vec};

use super::traits::PublishOutbox;

/// An owned publish request with inline storage for topic and payload.
#[derive(Debug, Clone)]
pub struct OwnedPublishRequest<const TOPIC_SIZE: usize, const PAYLOAD_SIZE: usize> {
    pub topic: String<TOPIC_SIZE>,
    pub payload: Vec<u8, PAYLOAD_SIZE>,
}

/// A buffered outbox that collects publish requests during handler callbacks.
///
/// # Type Parameters
///
/// - `CAPACITY`: Maximum number of publish requests that can be buffered
/// - `TOPIC_SIZE`: Maximum topic string length
/// - `PAYLOAD_SIZE`: Maximum payload size
pub struct BufferedOutbox<const CAPACITY: usize, const TOPIC_SIZE: usize, const PAYLOAD_SIZE: usize>
{
    requests: Vec<OwnedPublishRequest<TOPIC_SIZE, PAYLOAD_SIZE>, CAPACITY>,
}

impl<const CAPACITY: usize, const TOPIC_SIZE: usize, const PAYLOAD_SIZE: usize>
    BufferedOutbox<CAPACITY, TOPIC_SIZE, PAYLOAD_SIZE>
{
    pub fn new() -> Self {
        Self {
            requests: Vec::new(),
        }
    }

    /// Remove and return every buffered request, oldest first.
    pub fn take(&mut self) -> Vec<OwnedPublishRequest<TOPIC_SIZE, PAYLOAD_SIZE>, CAPACITY> {
        core::mem::replace(&mut self.requests, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }
}

impl<const CAPACITY: usize, const TOPIC_SIZE: usize, const PAYLOAD_SIZE: usize> Default
    for BufferedOutbox<CAPACITY, TOPIC_SIZE, PAYLOAD_SIZE>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAPACITY: usize, const TOPIC_SIZE: usize, const PAYLOAD_SIZE: usize> PublishOutbox
    for BufferedOutbox<CAPACITY, TOPIC_SIZE, PAYLOAD_SIZE>
{
    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        let mut topic_str = String::new();
        if topic_str.push_str(topic).is_err() {
            warn!("outbox: topic too long, dropping publish");
            return false;
        }

        let mut payload_vec = Vec::new();
        if payload_vec.extend_from_slice(payload).is_err() {
            warn!("outbox: payload of {} bytes too large, dropping publish", payload.len());
            return false;
        }

        let req = OwnedPublishRequest {
            topic: topic_str,
            payload: payload_vec,
        };

        if self.requests.push(req).is_err() {
            warn!("outbox: full, dropping publish");
            return false;
        }
        true
    }
}
