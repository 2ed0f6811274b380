use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AuthzError {
    #[error("Failed to load policy file `{path}`")]
    #[diagnostic(
        code(policy_gate::authz::policy_load),
        help("Check that the file exists and is readable")
    )]
    PolicyLoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON policy document `{path}`")]
    #[diagnostic(
        code(policy_gate::authz::json_parse),
        help("Expected {{ \"resourcePolicies\": [ {{ \"resource\": ..., \"rules\": [ {{ \"roles\": [...], \"actions\": [...], \"effect\": \"EFFECT_ALLOW\" | \"EFFECT_DENY\" }} ] }} ] }}")
    )]
    JsonParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("KDL parse error: {0}")]
    #[diagnostic(
        code(policy_gate::authz::kdl_parse),
        help("Check your KDL file syntax — see https://kdl.dev for the specification")
    )]
    KdlParse(String),

    #[error("Invalid policy: {0}")]
    #[diagnostic(
        code(policy_gate::authz::invalid_policy),
        help("Each KDL policy file must contain `resource` nodes holding `rule` children")
    )]
    InvalidPolicy(String),

    #[error("Invalid effect `{0}`")]
    #[diagnostic(
        code(policy_gate::authz::invalid_effect),
        help("Use `allow`, `deny`, `EFFECT_ALLOW` or `EFFECT_DENY`")
    )]
    InvalidEffect(String),

    #[error("Duplicate policy for resource `{0}`")]
    #[diagnostic(
        code(policy_gate::authz::duplicate_resource),
        help("Only the first policy for a resource is ever consulted; merge the rules into it")
    )]
    DuplicateResource(String),

    #[error("Rule #{index} of resource `{resource}` has no {field}")]
    #[diagnostic(
        code(policy_gate::authz::empty_rule),
        help("A rule without roles or actions can never match; remove it or fill it in")
    )]
    EmptyRule {
        resource: String,
        index: usize,
        field: &'static str,
    },

    #[error("Policy store has no source to reload from")]
    #[diagnostic(code(policy_gate::authz::reload_unavailable))]
    ReloadUnavailable,

    #[error("action {action} denied for resource {resource}")]
    #[diagnostic(code(policy_gate::authz::denied))]
    Denied { action: String, resource: String },

    #[error("I/O error: {0}")]
    #[diagnostic(code(policy_gate::authz::io))]
    Io(#[from] std::io::Error),
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthzError::Denied { .. } => StatusCode::FORBIDDEN,
            AuthzError::ReloadUnavailable => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
