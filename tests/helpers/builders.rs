use policy_gate::authz::types::{Effect, ResourcePolicy, Rule};
use policy_gate::authz::PolicyTable;

/// Builder for one resource policy, rules kept in call order
pub struct ResourceBuilder {
    resource: String,
    rules: Vec<Rule>,
}

impl ResourceBuilder {
    pub fn new(resource: &str) -> Self {
        Self {
            resource: resource.to_string(),
            rules: Vec::new(),
        }
    }

    pub fn allow(self, roles: &[&str], actions: &[&str]) -> Self {
        self.rule(roles, actions, Effect::Allow)
    }

    pub fn deny(self, roles: &[&str], actions: &[&str]) -> Self {
        self.rule(roles, actions, Effect::Deny)
    }

    pub fn rule(mut self, roles: &[&str], actions: &[&str], effect: Effect) -> Self {
        self.rules
            .push(Rule::new(roles.iter().copied(), actions.iter().copied(), effect));
        self
    }

    pub fn build(self) -> ResourcePolicy {
        ResourcePolicy::new(self.resource, self.rules)
    }
}

/// Builder for a whole table, resources kept in call order
#[derive(Default)]
pub struct TableBuilder {
    policies: Vec<ResourcePolicy>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(mut self, resource: ResourceBuilder) -> Self {
        self.policies.push(resource.build());
        self
    }

    pub fn build(self) -> PolicyTable {
        PolicyTable::new(self.policies)
    }
}
