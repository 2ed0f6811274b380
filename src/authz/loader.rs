use std::collections::HashSet;
use std::path::Path;

use crate::authz::errors::AuthzError;
use crate::authz::policy::{parse_json_document, parse_kdl_document};
use crate::authz::types::*;
use crate::authz::PolicyTable;

/// Load policies from a single `.json`/`.kdl` file or from every such file in
/// a directory (sorted by path) and compile them into one immutable `PolicyTable`.
pub fn load_policies(path: &Path, strict: bool) -> Result<PolicyTable, AuthzError> {
    let files = if path.is_dir() {
        // Any unreadable entry aborts the whole load
        let mut entries = std::fs::read_dir(path)?
            .map(|e| e.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.retain(|p| policy_format(p).is_some());
        entries.sort();
        for entry in &entries {
            if !entry.is_file() {
                return Err(AuthzError::InvalidPolicy(format!(
                    "policy entry `{}` is not a readable file",
                    entry.display()
                )));
            }
        }
        entries
    } else if path.is_file() {
        if policy_format(path).is_none() {
            return Err(AuthzError::InvalidPolicy(format!(
                "unsupported policy file `{}` (expected a .json or .kdl extension)",
                path.display()
            )));
        }
        vec![path.to_path_buf()]
    } else {
        return Err(AuthzError::InvalidPolicy(format!(
            "policy path `{}` does not exist",
            path.display()
        )));
    };

    let mut all_parsed = Vec::with_capacity(files.len());
    for file in &files {
        all_parsed.push(parse_file(file)?);
    }

    let table = compile_policies(all_parsed, strict)?;

    tracing::info!(
        files = files.len(),
        resources = table.resource_count(),
        rules = table.rule_count(),
        strict,
        "Loaded authorization policies"
    );

    Ok(table)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PolicyFormat {
    Json,
    Kdl,
}

fn policy_format(path: &Path) -> Option<PolicyFormat> {
    match path.extension()?.to_str()? {
        "json" => Some(PolicyFormat::Json),
        "kdl" => Some(PolicyFormat::Kdl),
        _ => None,
    }
}

fn parse_file(path: &Path) -> Result<ParsedPolicy, AuthzError> {
    let contents =
        std::fs::read_to_string(path).map_err(|source| AuthzError::PolicyLoadError {
            path: path.display().to_string(),
            source,
        })?;
    let origin = path.display().to_string();
    match policy_format(path) {
        Some(PolicyFormat::Json) => parse_json_document(&contents, &origin),
        Some(PolicyFormat::Kdl) => parse_kdl_document(&contents, &origin),
        None => Err(AuthzError::InvalidPolicy(format!(
            "unsupported policy file `{}`",
            path.display()
        ))),
    }
}

/// Concatenate parsed policies in order and validate the result.
///
/// Unreachable or never-matching entries are warnings unless `strict` is set,
/// in which case duplicates and empty rules are rejected.
pub fn compile_policies(parsed: Vec<ParsedPolicy>, strict: bool) -> Result<PolicyTable, AuthzError> {
    let policies: Vec<ResourcePolicy> = parsed
        .into_iter()
        .flat_map(|p| p.resource_policies)
        .collect();

    check_duplicates(&policies, strict)?;
    for policy in &policies {
        check_empty_rules(policy, strict)?;
        warn_shadowed_rules(policy);
    }

    Ok(PolicyTable::new(policies))
}

fn check_duplicates(policies: &[ResourcePolicy], strict: bool) -> Result<(), AuthzError> {
    let mut seen = HashSet::new();
    for policy in policies {
        if !seen.insert(policy.resource.as_str()) {
            if strict {
                return Err(AuthzError::DuplicateResource(policy.resource.clone()));
            }
            tracing::warn!(
                resource = %policy.resource,
                "duplicate resource policy is unreachable; only the first one is used"
            );
        }
    }
    Ok(())
}

fn check_empty_rules(policy: &ResourcePolicy, strict: bool) -> Result<(), AuthzError> {
    for (index, rule) in policy.rules.iter().enumerate() {
        let field = if rule.roles.is_empty() {
            "roles"
        } else if rule.actions.is_empty() {
            "actions"
        } else {
            continue;
        };
        if strict {
            return Err(AuthzError::EmptyRule {
                resource: policy.resource.clone(),
                index,
                field,
            });
        }
        tracing::warn!(
            resource = %policy.resource,
            rule = index,
            field,
            "rule can never match"
        );
    }
    Ok(())
}

/// Warn about rules an earlier wildcard rule always pre-empts.
fn warn_shadowed_rules(policy: &ResourcePolicy) {
    for (index, rule) in policy.rules.iter().enumerate() {
        if rule.roles.is_empty() {
            continue;
        }
        let shadowed_by = policy.rules[..index]
            .iter()
            .position(|earlier| earlier.is_wildcard() && rule.roles.is_subset(&earlier.roles));
        if let Some(earlier) = shadowed_by {
            tracing::warn!(
                resource = %policy.resource,
                rule = index,
                shadowed_by = earlier,
                "rule is shadowed by an earlier wildcard rule and will never decide"
            );
        }
    }
}
