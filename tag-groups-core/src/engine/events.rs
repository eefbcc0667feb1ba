//! Event sourcing with a tamper-evident journal

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{EngineError, EngineResult, EventLog};

/// Base trait for all events in the system
pub trait Event: Send + Sync {
    /// The state type this event can be applied to
    type State;

    /// Apply this event to the given state. Must not fail: every check
    /// happens before the event is built.
    fn apply(&self, state: &mut Self::State);

    /// Logical kind, stored in the envelope
    fn event_type(&self) -> &'static str;

    /// Optional aggregate id for indexing/filtering (e.g. the tag group id)
    fn aggregate_id(&self) -> Option<String> {
        None
    }
}

/// Standard envelope used to persist events with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_type: String,
    pub event_id: String,
    /// Unix timestamp, milliseconds
    pub timestamp: i64,
    /// Event JSON payload
    pub payload: String,
    pub aggregate_id: Option<String>,
    /// SHA256 over every other field, `previous_hash` included
    pub event_hash: String,
    pub previous_hash: Option<String>,
}

impl EventEnvelope {
    /// Wrap an event, linking it to `previous_hash`
    pub fn wrap<E>(event: &E, previous_hash: Option<String>) -> EngineResult<Self>
    where
        E: Event + Serialize,
    {
        let payload = serde_json::to_string(event)?;
        let mut envelope = Self {
            event_type: event.event_type().to_string(),
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now().timestamp_millis(),
            payload,
            aggregate_id: event.aggregate_id(),
            event_hash: String::new(),
            previous_hash,
        };
        envelope.event_hash = envelope.compute_hash();
        Ok(envelope)
    }

    /// Compute the SHA256 hash of this envelope's content
    pub fn compute_hash(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();

        hasher.update(self.event_type.as_bytes());
        hasher.update(b"|");
        hasher.update(self.event_id.as_bytes());
        hasher.update(b"|");
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(b"|");
        hasher.update(self.payload.as_bytes());
        hasher.update(b"|");
        if let Some(ref agg) = self.aggregate_id {
            hasher.update(agg.as_bytes());
        }
        hasher.update(b"|");
        if let Some(ref prev) = self.previous_hash {
            hasher.update(prev.as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    pub fn verify_hash(&self) -> bool {
        self.event_hash == self.compute_hash()
    }

    /// Decode the payload back into its event
    pub fn decode<E>(&self) -> EngineResult<E>
    where
        E: for<'de> Deserialize<'de>,
    {
        serde_json::from_str(&self.payload).map_err(|e| {
            EngineError::SerializationError(format!(
                "Failed to decode {} event {}: {}",
                self.event_type, self.event_id, e
            ))
        })
    }
}

/// Check every envelope's hash and its link to the one before it
pub fn verify_chain(envelopes: &[EventEnvelope]) -> EngineResult<()> {
    let mut previous: Option<&str> = None;
    for envelope in envelopes {
        if !envelope.verify_hash() || envelope.previous_hash.as_deref() != previous {
            return Err(EngineError::BrokenChain(envelope.event_id.clone()));
        }
        previous = Some(&envelope.event_hash);
    }
    Ok(())
}

/// Appends events to an [`EventLog`], keeping the hash chain continuous
pub struct EventJournal {
    log: Box<dyn EventLog>,
    last_hash: Option<String>,
}

impl EventJournal {
    pub fn new(log: Box<dyn EventLog>) -> Self {
        Self { log, last_hash: None }
    }

    /// Load every stored envelope and verify the chain.
    ///
    /// On success the journal continues the chain from the last envelope.
    pub fn load(&mut self) -> EngineResult<Vec<EventEnvelope>> {
        let envelopes = self.log.load()?;
        verify_chain(&envelopes)?;
        self.last_hash = envelopes.last().map(|e| e.event_hash.clone());
        Ok(envelopes)
    }

    /// Make one event durable
    pub fn record<E>(&mut self, event: &E) -> EngineResult<()>
    where
        E: Event + Serialize,
    {
        let envelope = EventEnvelope::wrap(event, self.last_hash.clone())?;
        self.log.append(&envelope)?;
        self.last_hash = Some(envelope.event_hash);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEventLog;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Bump {
        by: u32,
    }

    impl Event for Bump {
        type State = u32;

        fn apply(&self, state: &mut u32) {
            *state += self.by;
        }

        fn event_type(&self) -> &'static str {
            "bump"
        }

        fn aggregate_id(&self) -> Option<String> {
            Some("counter".to_string())
        }
    }

    #[test]
    fn test_wrap_and_decode() {
        let envelope = EventEnvelope::wrap(&Bump { by: 3 }, None).unwrap();
        assert_eq!(envelope.event_type, "bump");
        assert_eq!(envelope.aggregate_id.as_deref(), Some("counter"));
        assert!(envelope.verify_hash());
        assert_eq!(envelope.decode::<Bump>().unwrap(), Bump { by: 3 });
    }

    #[test]
    fn test_journal_links_events() {
        let mut journal = EventJournal::new(Box::new(MemoryEventLog::new()));
        journal.record(&Bump { by: 1 }).unwrap();
        journal.record(&Bump { by: 2 }).unwrap();

        let envelopes = journal.load().unwrap();
        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0].previous_hash, None);
        assert_eq!(envelopes[1].previous_hash.as_ref(), Some(&envelopes[0].event_hash));
    }

    #[test]
    fn test_tampered_payload_breaks_chain() {
        let first = EventEnvelope::wrap(&Bump { by: 1 }, None).unwrap();
        let mut second = EventEnvelope::wrap(&Bump { by: 2 }, Some(first.event_hash.clone())).unwrap();
        second.payload = r#"{"by":200}"#.to_string();

        let err = verify_chain(&[first, second]).unwrap_err();
        assert!(matches!(err, EngineError::BrokenChain(_)));
    }

    #[test]
    fn test_reordered_events_break_chain() {
        let first = EventEnvelope::wrap(&Bump { by: 1 }, None).unwrap();
        let second = EventEnvelope::wrap(&Bump { by: 2 }, Some(first.event_hash.clone())).unwrap();

        assert!(verify_chain(&[first.clone(), second.clone()]).is_ok());
        assert!(verify_chain(&[second, first]).is_err());
    }
}
