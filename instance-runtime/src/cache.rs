//! Pre-received initialization messages.
//!
//! All initialization inputs of an iteration are fetched together at the top
//! of the reuse loop and demultiplexed to the user's later receive calls.
//! The cache keys messages by port reference, extended with a slot index for
//! vector ports (`bc_in[2]`). A cleanly finished iteration leaves the cache
//! empty.

use {
    crate::message::Message,
    mcf_coupling_model::Reference,
    std::collections::HashMap,
};

/// Store of pre-received initialization messages, keyed by port (and slot).
#[derive(Debug, Default)]
pub struct FInitCache {
    messages: HashMap<Reference, Message>,
}

impl FInitCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all cached messages.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Whether the cache holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of cached messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Cache `message` under `key`.
    ///
    /// First write wins: a key that is already present keeps its original
    /// message. The length probe on a resizable vector port receives slot 0
    /// ahead of the regular slot sweep, so a duplicate key is expected there.
    pub fn insert(&mut self, key: Reference, message: Message) {
        self.messages.entry(key).or_insert(message);
    }

    /// Whether a message is cached under `key`.
    pub fn contains(&self, key: &Reference) -> bool {
        self.messages.contains_key(key)
    }

    /// Remove and return the message cached under `key`.
    pub fn take(&mut self, key: &Reference) -> Option<Message> {
        self.messages.remove(key)
    }

    /// Iterate over all cached entries, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&Reference, &Message)> {
        self.messages.iter()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::message::{Data, Message},
    };

    fn key(s: &str) -> Reference {
        s.parse().unwrap()
    }

    #[test]
    fn test_insert_take_cycle() {
        let mut cache = FInitCache::new();
        assert!(cache.is_empty());

        cache.insert(key("init_in"), Message::new(0.0, Data::Int(42)));
        assert!(cache.contains(&key("init_in")));
        assert_eq!(cache.len(), 1);

        let msg = cache.take(&key("init_in")).unwrap();
        assert_eq!(msg.data, Data::Int(42));
        assert!(cache.take(&key("init_in")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_first_write_wins() {
        let mut cache = FInitCache::new();
        cache.insert(key("bc_in[0]"), Message::new(0.0, Data::Int(1)));
        cache.insert(key("bc_in[0]"), Message::new(0.0, Data::Int(2)));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.take(&key("bc_in[0]")).unwrap().data, Data::Int(1));
    }

    #[test]
    fn test_clear() {
        let mut cache = FInitCache::new();
        cache.insert(key("a"), Message::new(0.0, Data::Nil));
        cache.insert(key("b"), Message::new(0.0, Data::ClosePort));
        assert!(cache.iter().any(|(_, m)| m.data.is_close_port()));
        cache.clear();
        assert!(cache.is_empty());
    }
}
