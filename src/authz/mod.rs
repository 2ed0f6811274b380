pub mod engine;
pub mod errors;
pub mod loader;
pub mod policy;
pub mod store;
pub mod types;
pub mod web;

use types::ResourcePolicy;

/// Ordered resource policies, loaded from policy documents.
/// Immutable after construction — a reload builds a new table and swaps it in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyTable {
    policies: Vec<ResourcePolicy>,
}

impl PolicyTable {
    pub fn new(policies: Vec<ResourcePolicy>) -> Self {
        Self { policies }
    }

    pub fn policies(&self) -> &[ResourcePolicy] {
        &self.policies
    }

    /// First policy for `resource_kind` by linear scan; later duplicates are never consulted.
    pub fn find(&self, resource_kind: &str) -> Option<&ResourcePolicy> {
        self.policies.iter().find(|p| p.resource == resource_kind)
    }

    pub fn resource_count(&self) -> usize {
        self.policies.len()
    }

    pub fn rule_count(&self) -> usize {
        self.policies.iter().map(|p| p.rules.len()).sum()
    }
}
