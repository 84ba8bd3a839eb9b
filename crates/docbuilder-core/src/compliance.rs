//! Compliance checklist the author must acknowledge before signatures.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceItem {
    pub key: String,
    pub label: String,
    pub description: String,
}

impl ComplianceItem {
    pub fn new(key: &str, label: &str, description: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceChecklist {
    items: Vec<ComplianceItem>,
    acknowledged: BTreeSet<String>,
}

impl ComplianceChecklist {
    pub fn new(items: Vec<ComplianceItem>) -> Self {
        Self {
            items,
            acknowledged: BTreeSet::new(),
        }
    }

    pub fn items(&self) -> &[ComplianceItem] {
        &self.items
    }

    pub fn is_acknowledged(&self, key: &str) -> bool {
        self.acknowledged.contains(key)
    }

    /// Tick or untick an item. Returns `false` for an unknown key.
    pub fn set_acknowledged(&mut self, key: &str, acknowledged: bool) -> bool {
        if !self.items.iter().any(|i| i.key == key) {
            return false;
        }
        if acknowledged {
            self.acknowledged.insert(key.to_string());
        } else {
            self.acknowledged.remove(key);
        }
        true
    }

    pub fn acknowledge_all(&mut self) {
        self.acknowledged = self.items.iter().map(|i| i.key.clone()).collect();
    }

    pub fn outstanding(&self) -> Vec<&ComplianceItem> {
        self.items
            .iter()
            .filter(|i| !self.acknowledged.contains(&i.key))
            .collect()
    }

    /// An empty checklist is complete.
    pub fn is_complete(&self) -> bool {
        self.outstanding().is_empty()
    }
}
