//! Tamper-evident audit log for document signing events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::signature::{LocationData, Provenance};

/// Types of auditable events
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Sent,
    Viewed,
    Signed,
    Completed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Viewed => "viewed",
            Self::Signed => "signed",
            Self::Completed => "completed",
        }
    }
}

/// A single audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub document_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub actor_email: String,
    pub signature_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub location: Option<LocationData>,
    pub user_agent: Option<String>,
    pub details: Option<String>,
    pub previous_hash: Option<String>,
}

impl AuditEvent {
    pub fn new(
        document_id: Uuid,
        action: AuditAction,
        actor_email: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            document_id,
            timestamp,
            action,
            actor_email: actor_email.to_string(),
            signature_id: None,
            ip_address: None,
            location: None,
            user_agent: None,
            details: None,
            previous_hash: None,
        }
    }

    pub fn with_signature(mut self, signature_id: Uuid) -> Self {
        self.signature_id = Some(signature_id);
        self
    }

    pub fn with_provenance(mut self, provenance: &Provenance) -> Self {
        self.ip_address = provenance.ip_address.clone();
        self.location = provenance.location.clone();
        self.user_agent = provenance.user_agent.clone();
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Compute the hash of this event (for chain linking)
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.event_id.as_bytes());
        hasher.update(self.document_id.as_bytes());
        hasher.update(self.timestamp.to_rfc3339().as_bytes());
        hasher.update(self.action.as_str().as_bytes());
        hasher.update(self.actor_email.as_bytes());
        if let Some(ref id) = self.signature_id {
            hasher.update(id.as_bytes());
        }
        if let Some(ref ip) = self.ip_address {
            hasher.update(ip.as_bytes());
        }
        if let Some(place) = self.location.as_ref().and_then(LocationData::display) {
            hasher.update(place.as_bytes());
        }
        if let Some(ref ua) = self.user_agent {
            hasher.update(ua.as_bytes());
        }
        if let Some(ref details) = self.details {
            hasher.update(details.as_bytes());
        }
        if let Some(ref prev) = self.previous_hash {
            hasher.update(prev.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// Append-only chain of audit events for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditChain {
    pub document_id: Uuid,
    pub events: Vec<AuditEvent>,
}

impl AuditChain {
    pub fn new(document_id: Uuid) -> Self {
        Self {
            document_id,
            events: Vec::new(),
        }
    }

    /// Get the hash of the last event (for linking)
    pub fn last_hash(&self) -> Option<String> {
        self.events.last().map(|e| e.compute_hash())
    }

    /// Append an event, linking it to the previous one.
    pub fn push(&mut self, mut event: AuditEvent) -> &AuditEvent {
        event.document_id = self.document_id;
        event.previous_hash = self.last_hash();
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    /// Verify the integrity of the chain
    pub fn verify(&self) -> Result<(), String> {
        let mut expected_prev: Option<String> = None;

        for (i, event) in self.events.iter().enumerate() {
            if event.previous_hash != expected_prev {
                return Err(format!(
                    "Chain broken at event {}: expected prev {:?}, got {:?}",
                    i, expected_prev, event.previous_hash
                ));
            }
            expected_prev = Some(event.compute_hash());
        }

        Ok(())
    }

    pub fn count(&self, action: AuditAction) -> usize {
        self.events.iter().filter(|e| e.action == action).count()
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize audit chain: {}", e))
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Failed to deserialize audit chain: {}", e))
    }

    /// One line per event for display
    pub fn summary(&self) -> Vec<String> {
        self.events
            .iter()
            .map(|e| {
                format!(
                    "[{}] {} - {}",
                    e.timestamp.format("%Y-%m-%d %H:%M UTC"),
                    e.actor_email,
                    e.action.as_str()
                )
            })
            .collect()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn action_strategy() -> impl Strategy<Value = AuditAction> {
        prop_oneof![
            Just(AuditAction::Sent),
            Just(AuditAction::Viewed),
            Just(AuditAction::Signed),
            Just(AuditAction::Completed),
        ]
    }

    fn chain_of(actions: &[AuditAction]) -> AuditChain {
        let doc = Uuid::new_v4();
        let mut chain = AuditChain::new(doc);
        for (i, action) in actions.iter().enumerate() {
            chain.push(AuditEvent::new(
                doc,
                *action,
                &format!("user{}@test.com", i),
                Utc::now(),
            ));
        }
        chain
    }

    proptest! {
        /// Property: Any sequence of appends maintains chain integrity
        #[test]
        fn append_preserves_integrity(actions in prop::collection::vec(action_strategy(), 1..20)) {
            let chain = chain_of(&actions);
            prop_assert!(chain.verify().is_ok());
            prop_assert_eq!(chain.events.len(), actions.len());
        }

        /// Property: Tampering with any event that has a successor breaks verification
        #[test]
        fn tampering_detected(
            actions in prop::collection::vec(action_strategy(), 2..8),
            tamper in any::<prop::sample::Index>(),
        ) {
            let mut chain = chain_of(&actions);
            let idx = tamper.index(chain.events.len() - 1);

            let original = chain.events[idx].actor_email.clone();
            chain.events[idx].actor_email = "tampered@evil.com".to_string();
            prop_assert!(chain.verify().is_err());

            chain.events[idx].actor_email = original;
            prop_assert!(chain.verify().is_ok());
        }

        /// Property: JSON roundtrip keeps the chain verifiable
        #[test]
        fn json_roundtrip(actions in prop::collection::vec(action_strategy(), 1..10)) {
            let chain = chain_of(&actions);
            let restored = AuditChain::from_json(&chain.to_json().unwrap()).unwrap();
            prop_assert!(restored.verify().is_ok());
            prop_assert_eq!(restored, chain);
        }
    }
}
