//! Messages carried through the queue.

use serde::{Deserialize, Serialize};

/// A unit of work produced by a producer and processed by a consumer.
///
/// Carries nothing but an identifier and how long it takes to process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// `"<producer>_<sequence>"`, unique per producer
    pub id: String,

    /// Processing time in ticks (also the token cost of sending it)
    pub duration: u64,
}

impl Message {
    /// Creates the `sequence`-th message of `producer`.
    pub fn new(producer: &str, sequence: u64, duration: u64) -> Self {
        Self {
            id: format!("{}_{}", producer, sequence),
            duration,
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} ticks)", self.id, self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_format() {
        let msg = Message::new("producer_2", 7, 28);
        assert_eq!(msg.id, "producer_2_7");
        assert_eq!(msg.duration, 28);
        assert_eq!(msg.to_string(), "producer_2_7 (28 ticks)");
    }
}
