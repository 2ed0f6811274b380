use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::authz::engine;
use crate::authz::store::PolicyStore;
use crate::authz::types::{
    CheckRequest, CheckResponse, PoliciesResponse, PolicySummary, ReloadResponse,
};

/// Decision API over the store. `/v1/reload` is only mounted when `allow_reload` is set.
pub fn router(store: Arc<PolicyStore>, allow_reload: bool) -> Router {
    let mut router = Router::new()
        .route("/v1/check", post(handle_check))
        .route("/v1/explain", post(handle_explain))
        .route("/v1/policies", get(handle_policies))
        .route("/healthz", get(health));

    if allow_reload {
        router = router.route("/v1/reload", post(handle_reload));
    }

    router.with_state(store)
}

async fn handle_check(
    State(store): State<Arc<PolicyStore>>,
    Json(req): Json<CheckRequest>,
) -> impl IntoResponse {
    let allowed = engine::is_allowed(&store.snapshot(), &req.roles, &req.action, &req.resource);
    Json(CheckResponse { allowed })
}

async fn handle_explain(
    State(store): State<Arc<PolicyStore>>,
    Json(req): Json<CheckRequest>,
) -> impl IntoResponse {
    Json(engine::decide(
        &store.snapshot(),
        &req.roles,
        &req.action,
        &req.resource,
    ))
}

async fn handle_policies(State(store): State<Arc<PolicyStore>>) -> impl IntoResponse {
    let table = store.snapshot();
    let resources = table
        .policies()
        .iter()
        .map(|p| PolicySummary {
            resource: p.resource.clone(),
            rules: p.rules.len(),
        })
        .collect();
    Json(PoliciesResponse { resources })
}

async fn handle_reload(State(store): State<Arc<PolicyStore>>) -> impl IntoResponse {
    match store.reload() {
        Ok(table) => Json(ReloadResponse {
            resources: table.resource_count(),
            rules: table.rule_count(),
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
