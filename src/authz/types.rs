use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use crate::authz::errors::AuthzError;

/// Action value that matches every requested action.
pub const WILDCARD_ACTION: &str = "*";

/// Outcome prescribed by a matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    #[serde(rename = "EFFECT_ALLOW", alias = "allow")]
    Allow,
    #[serde(rename = "EFFECT_DENY", alias = "deny")]
    Deny,
}

impl Effect {
    pub fn is_allow(self) -> bool {
        self == Effect::Allow
    }
}

impl FromStr for Effect {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" | "EFFECT_ALLOW" => Ok(Effect::Allow),
            "deny" | "EFFECT_DENY" => Ok(Effect::Deny),
            other => Err(AuthzError::InvalidEffect(other.to_string())),
        }
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Allow => f.write_str("EFFECT_ALLOW"),
            Effect::Deny => f.write_str("EFFECT_DENY"),
        }
    }
}

// ---------- Policy domain types ----------

/// A single ordered rule of a resource policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub roles: HashSet<String>,
    pub actions: HashSet<String>,
    pub effect: Effect,
}

impl Rule {
    pub fn new<R, A>(roles: R, actions: A, effect: Effect) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            actions: actions.into_iter().map(Into::into).collect(),
            effect,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.actions.contains(WILDCARD_ACTION)
    }

    /// True when at least one of the caller's roles is named by this rule.
    pub fn applies_to<R: AsRef<str>>(&self, roles: &[R]) -> bool {
        roles.iter().any(|r| self.roles.contains(r.as_ref()))
    }
}

/// Ordered rules protecting one resource kind, e.g. "product".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePolicy {
    pub resource: String,
    pub rules: Vec<Rule>,
}

impl ResourcePolicy {
    pub fn new(resource: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            resource: resource.into(),
            rules,
        }
    }
}

/// Top-level shape of a JSON policy document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    pub resource_policies: Vec<ResourcePolicy>,
}

/// Intermediate result from parsing a single policy file.
#[derive(Debug, Clone, Default)]
pub struct ParsedPolicy {
    pub resource_policies: Vec<ResourcePolicy>,
}

impl From<PolicyDocument> for ParsedPolicy {
    fn from(doc: PolicyDocument) -> Self {
        Self {
            resource_policies: doc.resource_policies,
        }
    }
}

// ---------- Decisions ----------

/// Why the evaluator reached its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionReason {
    /// No resource policy exists for the requested kind.
    UnknownResource,
    /// The policy exists but no rule matched the roles and action.
    NoMatchingRule,
    /// Rule `rule_index` of the authoritative policy matched first.
    Matched {
        rule_index: usize,
        effect: Effect,
        /// Matched through the `"*"` action rather than the literal action.
        wildcard: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub reason: DecisionReason,
}

impl Decision {
    pub fn deny(reason: DecisionReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }

    pub fn matched(rule_index: usize, effect: Effect, wildcard: bool) -> Self {
        Self {
            allowed: effect.is_allow(),
            reason: DecisionReason::Matched {
                rule_index,
                effect,
                wildcard,
            },
        }
    }
}

// ---------- API request/response types ----------

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    /// e.g. ["admin", "viewer"]
    #[serde(default)]
    pub roles: Vec<String>,
    /// e.g. "read"
    pub action: String,
    /// e.g. "product"
    pub resource: String,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
}

#[derive(Debug, Serialize)]
pub struct PolicySummary {
    pub resource: String,
    pub rules: usize,
}

#[derive(Debug, Serialize)]
pub struct PoliciesResponse {
    pub resources: Vec<PolicySummary>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub resources: usize,
    pub rules: usize,
}
