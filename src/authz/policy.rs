use crate::authz::errors::AuthzError;
use crate::authz::types::*;
use kdl::KdlDocument;

/// Parse a JSON `resourcePolicies` document into typed policy structs.
/// `origin` names the document in error messages.
pub fn parse_json_document(source: &str, origin: &str) -> Result<ParsedPolicy, AuthzError> {
    let doc: PolicyDocument =
        serde_json::from_str(source).map_err(|source| AuthzError::JsonParse {
            path: origin.to_string(),
            source,
        })?;
    Ok(doc.into())
}

/// Parse a KDL document string into typed policy structs.
/// `origin` names the document in error messages.
pub fn parse_kdl_document(source: &str, origin: &str) -> Result<ParsedPolicy, AuthzError> {
    let doc: KdlDocument = source
        .parse()
        .map_err(|e: kdl::KdlError| AuthzError::KdlParse(format!("{origin}: {e}")))?;

    let mut policy = ParsedPolicy::default();

    for node in doc.nodes() {
        match node.name().value() {
            "resource" => {
                let resource = single_string_arg(node).ok_or_else(|| {
                    AuthzError::InvalidPolicy(format!(
                        "{origin}: resource node requires exactly one string argument (e.g. resource \"product\")"
                    ))
                })?;

                let mut rules = Vec::new();

                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        match child.name().value() {
                            "rule" => {
                                rules.push(parse_rule(child, &resource, rules.len(), origin)?)
                            }
                            other => {
                                return Err(AuthzError::InvalidPolicy(format!(
                                    "{origin}: unexpected child `{other}` in resource `{resource}` (expected `rule`)"
                                )));
                            }
                        }
                    }
                }

                policy
                    .resource_policies
                    .push(ResourcePolicy::new(resource, rules));
            }
            other => {
                tracing::warn!("ignoring unknown top-level KDL node `{other}` in {origin}");
            }
        }
    }

    Ok(policy)
}

fn parse_rule(
    node: &kdl::KdlNode,
    resource: &str,
    index: usize,
    origin: &str,
) -> Result<Rule, AuthzError> {
    let at = format!("{origin}: rule #{index} of resource `{resource}`");

    // Only the `effect` property is allowed on the rule node itself
    if let Some(extra) = node
        .entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) != Some("effect"))
    {
        return Err(AuthzError::InvalidPolicy(format!(
            "{at} has unexpected entry `{extra}` (only effect=\"allow\"|\"deny\" is allowed)"
        )));
    }

    let effect = node
        .get("effect")
        .and_then(|v| v.as_string())
        .ok_or_else(|| {
            AuthzError::InvalidPolicy(format!(
                "{at} missing string `effect` property (e.g. effect=\"allow\")"
            ))
        })?;
    let effect = effect.parse::<Effect>().map_err(|_| {
        AuthzError::InvalidPolicy(format!(
            "{at} has invalid effect `{effect}` (expected allow, deny, EFFECT_ALLOW or EFFECT_DENY)"
        ))
    })?;

    let mut roles = None;
    let mut actions = None;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let slot = match child.name().value() {
                "roles" => &mut roles,
                "actions" => &mut actions,
                other => {
                    return Err(AuthzError::InvalidPolicy(format!(
                        "{at} has unexpected child `{other}` (expected `roles` or `actions`)"
                    )));
                }
            };
            if slot.is_some() {
                return Err(AuthzError::InvalidPolicy(format!(
                    "{at} declares `{}` more than once",
                    child.name().value()
                )));
            }
            *slot = Some(dash_list(child, &at)?);
        }
    }

    let roles = roles
        .ok_or_else(|| AuthzError::InvalidPolicy(format!("{at} missing `roles` block")))?;
    let actions = actions
        .ok_or_else(|| AuthzError::InvalidPolicy(format!("{at} missing `actions` block")))?;

    Ok(Rule::new(roles, actions, effect))
}

/// The only entry of a KDL node, when it is an unnamed string argument.
fn single_string_arg(node: &kdl::KdlNode) -> Option<String> {
    match node.entries() {
        [entry] if entry.name().is_none() => entry.value().as_string().map(|s| s.to_string()),
        _ => None,
    }
}

/// Extract dash-list children: every child must be a "-" node with exactly one
/// string argument.
/// Example KDL:
/// ```kdl
/// roles {
///     - "admin"
///     - "editor"
/// }
/// ```
fn dash_list(node: &kdl::KdlNode, at: &str) -> Result<Vec<String>, AuthzError> {
    let list = node.name().value();
    if !node.entries().is_empty() {
        return Err(AuthzError::InvalidPolicy(format!(
            "{at}: `{list}` takes no arguments; list values as `- \"value\"` children"
        )));
    }
    let Some(children) = node.children() else {
        return Ok(Vec::new());
    };
    children
        .nodes()
        .iter()
        .map(|n| {
            let value = (n.name().value() == "-" && n.children().is_none())
                .then(|| single_string_arg(n))
                .flatten();
            value.ok_or_else(|| {
                AuthzError::InvalidPolicy(format!(
                    "{at}: invalid `{list}` entry `{}` (expected `- \"value\"`)",
                    n.to_string().trim()
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_document() {
        let json = r#"
{
  "resourcePolicies": [
    {
      "resource": "product",
      "rules": [
        { "roles": ["admin"], "actions": ["*"], "effect": "EFFECT_ALLOW" },
        { "roles": ["viewer"], "actions": ["read"], "effect": "EFFECT_ALLOW" }
      ]
    },
    {
      "resource": "order",
      "rules": [
        { "roles": ["viewer"], "actions": ["delete"], "effect": "EFFECT_DENY" }
      ]
    }
  ]
}
"#;
        let policy = parse_json_document(json, "inline").unwrap();
        assert_eq!(policy.resource_policies.len(), 2);

        let product = &policy.resource_policies[0];
        assert_eq!(product.resource, "product");
        assert_eq!(product.rules.len(), 2);
        assert!(product.rules[0].is_wildcard());
        assert!(product.rules[1].roles.contains("viewer"));

        assert_eq!(policy.resource_policies[1].rules[0].effect, Effect::Deny);
    }

    #[test]
    fn test_parse_json_unknown_effect() {
        let json = r#"{ "resourcePolicies": [ { "resource": "product", "rules": [
            { "roles": ["admin"], "actions": ["*"], "effect": "ALLOW" } ] } ] }"#;
        let err = parse_json_document(json, "inline").unwrap_err();
        assert!(matches!(err, AuthzError::JsonParse { .. }));
    }

    #[test]
    fn test_parse_json_missing_field() {
        let json = r#"{ "resourcePolicies": [ { "resource": "product", "rules": [
            { "roles": ["admin"], "effect": "EFFECT_ALLOW" } ] } ] }"#;
        let err = parse_json_document(json, "inline").unwrap_err();
        assert!(matches!(err, AuthzError::JsonParse { .. }));
    }

    #[test]
    fn test_parse_json_wrong_value_kind() {
        let json = r#"{ "resourcePolicies": [ { "resource": "product", "rules": [
            { "roles": "admin", "actions": ["*"], "effect": "EFFECT_ALLOW" } ] } ] }"#;
        let err = parse_json_document(json, "inline").unwrap_err();
        assert!(matches!(err, AuthzError::JsonParse { .. }));
    }

    #[test]
    fn test_parse_kdl_resource() {
        let kdl = r#"
resource "product" {
    rule effect="allow" {
        roles {
            - "admin"
        }
        actions {
            - "*"
        }
    }
    rule effect="EFFECT_DENY" {
        roles {
            - "viewer"
            - "guest"
        }
        actions {
            - "delete"
        }
    }
}
"#;
        let policy = parse_kdl_document(kdl, "inline.kdl").unwrap();
        assert_eq!(policy.resource_policies.len(), 1);
        let res = &policy.resource_policies[0];
        assert_eq!(res.resource, "product");
        assert_eq!(res.rules.len(), 2);
        assert_eq!(res.rules[0].effect, Effect::Allow);
        assert!(res.rules[0].is_wildcard());
        assert_eq!(res.rules[1].effect, Effect::Deny);
        assert_eq!(res.rules[1].roles.len(), 2);
        assert!(res.rules[1].actions.contains("delete"));
    }

    #[test]
    fn test_parse_kdl_missing_effect() {
        let kdl = r#"
resource "product" {
    rule {
        roles {
            - "admin"
        }
    }
}
"#;
        let err = parse_kdl_document(kdl, "inline.kdl").unwrap_err();
        assert!(matches!(err, AuthzError::InvalidPolicy(_)));
    }

    #[test]
    fn test_parse_kdl_bad_effect() {
        let kdl = r#"
resource "product" {
    rule effect="permit"
}
"#;
        let err = parse_kdl_document(kdl, "inline.kdl").unwrap_err();
        assert!(matches!(err, AuthzError::InvalidPolicy(msg) if msg.contains("permit")));
    }

    #[test]
    fn test_parse_kdl_unexpected_child() {
        let kdl = r#"
resource "product" {
    permissions {
        - "read"
    }
}
"#;
        let err = parse_kdl_document(kdl, "inline.kdl").unwrap_err();
        assert!(matches!(err, AuthzError::InvalidPolicy(_)));
    }

    #[test]
    fn test_parse_kdl_unnamed_resource() {
        let err = parse_kdl_document("resource", "inline.kdl").unwrap_err();
        assert!(matches!(err, AuthzError::InvalidPolicy(_)));
    }

    #[test]
    fn test_parse_kdl_syntax_error() {
        let err = parse_kdl_document("resource \"product\" {", "products.kdl").unwrap_err();
        assert!(matches!(err, AuthzError::KdlParse(msg) if msg.starts_with("products.kdl")));
    }

    fn assert_rejected(kdl: &str, needle: &str) {
        match parse_kdl_document(kdl, "catalog.kdl") {
            Err(AuthzError::InvalidPolicy(msg)) => {
                assert!(msg.starts_with("catalog.kdl"), "no origin in `{msg}`");
                assert!(msg.contains(needle), "`{needle}` not in `{msg}`");
            }
            other => panic!("expected InvalidPolicy, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_kdl_missing_roles_block() {
        assert_rejected(
            r#"
resource "product" {
    rule effect="allow" {
        actions {
            - "read"
        }
    }
}
"#,
            "missing `roles`",
        );
    }

    #[test]
    fn test_parse_kdl_missing_actions_block() {
        assert_rejected(
            r#"
resource "product" {
    rule effect="allow" {
        roles {
            - "viewer"
        }
    }
}
"#,
            "missing `actions`",
        );
    }

    #[test]
    fn test_parse_kdl_non_string_list_entry() {
        assert_rejected(
            r#"
resource "product" {
    rule effect="allow" {
        roles {
            - "viewer"
        }
        actions {
            - 42
        }
    }
}
"#,
            "invalid `actions` entry",
        );
    }

    #[test]
    fn test_parse_kdl_bare_list_entry() {
        assert_rejected(
            r#"
resource "product" {
    rule effect="allow" {
        roles {
            - "viewer"
        }
        actions {
            read
        }
    }
}
"#,
            "invalid `actions` entry",
        );
    }

    #[test]
    fn test_parse_kdl_extra_list_arguments() {
        assert_rejected(
            r#"
resource "product" {
    rule effect="allow" {
        roles {
            - "viewer" "editor"
        }
        actions {
            - "read"
        }
    }
}
"#,
            "invalid `roles` entry",
        );
    }

    #[test]
    fn test_parse_kdl_list_with_inline_arguments() {
        assert_rejected(
            r#"
resource "product" {
    rule effect="allow" {
        roles "viewer"
        actions {
            - "read"
        }
    }
}
"#,
            "`roles` takes no arguments",
        );
    }

    #[test]
    fn test_parse_kdl_duplicate_block() {
        assert_rejected(
            r#"
resource "product" {
    rule effect="allow" {
        roles {
            - "viewer"
        }
        roles {
            - "admin"
        }
        actions {
            - "read"
        }
    }
}
"#,
            "more than once",
        );
    }

    #[test]
    fn test_parse_kdl_unexpected_rule_entry() {
        assert_rejected(
            r#"
resource "product" {
    rule "ViewerRead" effect="allow" {
        roles {
            - "viewer"
        }
        actions {
            - "read"
        }
    }
}
"#,
            "unexpected entry",
        );
    }

    #[test]
    fn test_parse_kdl_non_string_effect() {
        assert_rejected(
            r#"
resource "product" {
    rule effect=1 {
        roles {
            - "viewer"
        }
        actions {
            - "read"
        }
    }
}
"#,
            "missing string `effect`",
        );
    }

    #[test]
    fn test_parse_kdl_empty_blocks_are_explicit() {
        let kdl = r#"
resource "product" {
    rule effect="deny" {
        roles
        actions {
        }
    }
}
"#;
        let policy = parse_kdl_document(kdl, "inline.kdl").unwrap();
        let rule = &policy.resource_policies[0].rules[0];
        assert!(rule.roles.is_empty());
        assert!(rule.actions.is_empty());
    }
}
