//! Topic registration for message handlers.

use heapless::{String, Vec};

use super::traits::TopicCollector;

/// Maximum length for a single topic string.
pub const MAX_TOPIC_LEN: usize = 128;

/// Maximum number of topics a session subscribes to.
pub const MAX_SUBSCRIPTIONS: usize = 8;

/// A registry for topics that handlers want to subscribe to.
///
/// Built fresh every time a session comes up: the handler adds its topics,
/// the connectivity manager subscribes to each one and drops the registry.
#[derive(Default)]
pub struct TopicRegistry<const MAX_TOPICS: usize> {
    topics: Vec<String<MAX_TOPIC_LEN>, MAX_TOPICS>,
}

impl<const MAX_TOPICS: usize> TopicRegistry<MAX_TOPICS> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a topic to the registry by copying the string.
    ///
    /// Returns `false` if the registry is full, the topic is too long, or
    /// the topic is already registered.
    pub fn add_topic(&mut self, topic: &str) -> bool {
        if topic.len() > MAX_TOPIC_LEN || self.iter().any(|known| known == topic) {
            return false;
        }

        let mut owned = String::new();
        if owned.push_str(topic).is_err() {
            return false;
        }

        self.topics.push(owned).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

impl<const MAX_TOPICS: usize> TopicCollector for TopicRegistry<MAX_TOPICS> {
    fn add(&mut self, topic: &str) -> bool {
        self.add_topic(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_topics_are_collapsed() {
        let mut registry = TopicRegistry::<4>::new();
        assert!(registry.add("hub/digital/control"));
        assert!(!registry.add("hub/digital/control"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn full_registry_rejects_topics() {
        let mut registry = TopicRegistry::<1>::new();
        assert!(registry.add("a"));
        assert!(!registry.add("b"));
        assert_eq!(registry.iter().collect::<std::vec::Vec<_>>(), ["a"]);
    }

    #[test]
    fn overlong_topic_is_rejected() {
        let mut registry = TopicRegistry::<1>::new();
        let long = [b'a'; MAX_TOPIC_LEN + 1];
        assert!(!registry.add(core::str::from_utf8(&long).unwrap()));
        assert!(registry.is_empty());
    }
}
