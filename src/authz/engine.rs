use crate::authz::errors::AuthzError;
use crate::authz::types::{Decision, DecisionReason};
use crate::authz::PolicyTable;

/// Check whether a principal holding `roles` may perform `action` (e.g. "read")
/// on `resource_kind` (e.g. "product").
///
/// Rules are matched first-match-wins in declared order; anything without an
/// explicit allow is denied.
pub fn is_allowed<R: AsRef<str>>(
    table: &PolicyTable,
    roles: &[R],
    action: &str,
    resource_kind: &str,
) -> bool {
    decide(table, roles, action, resource_kind).allowed
}

/// Same evaluation as [`is_allowed`], also reporting which rule decided.
pub fn decide<R: AsRef<str>>(
    table: &PolicyTable,
    roles: &[R],
    action: &str,
    resource_kind: &str,
) -> Decision {
    let decision = evaluate(table, roles, action, resource_kind);
    tracing::debug!(
        resource = resource_kind,
        action,
        allowed = decision.allowed,
        reason = ?decision.reason,
        "Evaluated authorization request"
    );
    decision
}

fn evaluate<R: AsRef<str>>(
    table: &PolicyTable,
    roles: &[R],
    action: &str,
    resource_kind: &str,
) -> Decision {
    // 1. Unknown resources are denied
    let Some(policy) = table.find(resource_kind) else {
        return Decision::deny(DecisionReason::UnknownResource);
    };

    // 2. First matching rule decides
    for (index, rule) in policy.rules.iter().enumerate() {
        // Wildcard rules win over any later rule for the same roles
        if rule.is_wildcard() && rule.applies_to(roles) {
            return Decision::matched(index, rule.effect, true);
        }

        if rule.actions.contains(action) && rule.applies_to(roles) {
            return Decision::matched(index, rule.effect, false);
        }
    }

    // 3. No rule matched
    Decision::deny(DecisionReason::NoMatchingRule)
}

/// Check and turn a deny into [`AuthzError::Denied`] for request handlers.
pub fn authorize<R: AsRef<str>>(
    table: &PolicyTable,
    roles: &[R],
    action: &str,
    resource_kind: &str,
) -> Result<(), AuthzError> {
    if is_allowed(table, roles, action, resource_kind) {
        Ok(())
    } else {
        Err(AuthzError::Denied {
            action: action.to_string(),
            resource: resource_kind.to_string(),
        })
    }
}
