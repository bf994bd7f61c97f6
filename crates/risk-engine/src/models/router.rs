use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    ComponentKind, EntityId, FactorPayload, ModelId, NewModelSpec, QuestionnaireRef,
    RiskModelTier, RiskRoleId, RiskTier, TenantContext,
};
use super::jobs::JobError;
use super::publish::PublishError;
use super::service::{ModelServiceError, RiskModelService};
use super::store::{ModelStore, StoreError};

/// Router builder exposing the model lifecycle endpoints consumed by the
/// settings UI.
pub fn risk_model_router<S>(service: Arc<RiskModelService<S>>) -> Router
where
    S: ModelStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/risk/models",
            post(create_handler::<S>).get(list_handler::<S>),
        )
        .route(
            "/api/v1/risk/models/:model_id",
            get(detail_handler::<S>).delete(delete_handler::<S>),
        )
        .route(
            "/api/v1/risk/models/:model_id/clone",
            post(clone_handler::<S>),
        )
        .route(
            "/api/v1/risk/models/:model_id/tiers",
            put(tiers_handler::<S>),
        )
        .route(
            "/api/v1/risk/models/:model_id/factors",
            put(factor_handler::<S>),
        )
        .route(
            "/api/v1/risk/models/:model_id/components",
            put(components_handler::<S>),
        )
        .route(
            "/api/v1/risk/models/:model_id/test",
            post(start_test_handler::<S>).get(test_state_handler::<S>),
        )
        .route(
            "/api/v1/risk/models/:model_id/publish",
            post(publish_handler::<S>),
        )
        .route(
            "/api/v1/risk/models/:model_id/disable",
            post(disable_handler::<S>),
        )
        .route(
            "/api/v1/risk/models/:model_id/enable",
            post(enable_handler::<S>),
        )
        .route(
            "/api/v1/risk/tiers",
            get(tier_labels_handler::<S>).put(save_tier_label_handler::<S>),
        )
        .route(
            "/api/v1/risk/assessments/:entity_id/:role",
            get(assessment_handler::<S>),
        )
        .with_state(service)
}

/// Tenant and user identity arrive from the authenticating front layer.
fn context_from(headers: &HeaderMap) -> Result<TenantContext, Response> {
    let tenant = headers
        .get("x-tenant-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            let payload = json!({ "error": "missing x-tenant-id header" });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        })?;
    let user = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("system");

    Ok(TenantContext::new(tenant, user))
}

fn error_response(error: ModelServiceError) -> Response {
    let payload = json!({ "error": error.to_string() });
    let status = match &error {
        ModelServiceError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        ModelServiceError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        ModelServiceError::Lifecycle(_) => StatusCode::CONFLICT,
        ModelServiceError::Publish(PublishError::RecomputeAcknowledgmentTimeout(_))
        | ModelServiceError::Jobs(JobError::AcknowledgmentTimeout(_)) => {
            // The worker may still finish; the caller should poll again.
            StatusCode::ACCEPTED
        }
        ModelServiceError::Publish(_)
        | ModelServiceError::Tiers(_)
        | ModelServiceError::Factor(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ModelServiceError::Store(StoreError::Unavailable(_))
        | ModelServiceError::Source(_)
        | ModelServiceError::Jobs(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, axum::Json(payload)).into_response()
}

async fn create_handler<S>(
    State(service): State<Arc<RiskModelService<S>>>,
    headers: HeaderMap,
    axum::Json(spec): axum::Json<NewModelSpec>,
) -> Response
where
    S: ModelStore + 'static,
{
    let ctx = match context_from(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.create_model(&ctx, spec) {
        Ok(model) => (StatusCode::CREATED, axum::Json(model)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn list_handler<S>(
    State(service): State<Arc<RiskModelService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: ModelStore + 'static,
{
    let ctx = match context_from(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.models(&ctx) {
        Ok(models) => (StatusCode::OK, axum::Json(models)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn detail_handler<S>(
    State(service): State<Arc<RiskModelService<S>>>,
    headers: HeaderMap,
    Path(model_id): Path<String>,
) -> Response
where
    S: ModelStore + 'static,
{
    let ctx = match context_from(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.model_detail(&ctx, &ModelId(model_id)) {
        Ok(detail) => (StatusCode::OK, axum::Json(detail)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn clone_handler<S>(
    State(service): State<Arc<RiskModelService<S>>>,
    headers: HeaderMap,
    Path(model_id): Path<String>,
) -> Response
where
    S: ModelStore + 'static,
{
    let ctx = match context_from(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.clone_model(&ctx, &ModelId(model_id)) {
        Ok(model) => (StatusCode::CREATED, axum::Json(model)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
struct TiersRequest {
    tiers: Vec<RiskModelTier>,
}

async fn tiers_handler<S>(
    State(service): State<Arc<RiskModelService<S>>>,
    headers: HeaderMap,
    Path(model_id): Path<String>,
    axum::Json(request): axum::Json<TiersRequest>,
) -> Response
where
    S: ModelStore + 'static,
{
    let ctx = match context_from(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.replace_tiers(&ctx, &ModelId(model_id), request.tiers) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
struct FactorRequest {
    #[serde(default)]
    questionnaire: Option<QuestionnaireRef>,
    payload: FactorPayload,
}

async fn factor_handler<S>(
    State(service): State<Arc<RiskModelService<S>>>,
    headers: HeaderMap,
    Path(model_id): Path<String>,
    axum::Json(request): axum::Json<FactorRequest>,
) -> Response
where
    S: ModelStore + 'static,
{
    let ctx = match context_from(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.save_factor(
        &ctx,
        &ModelId(model_id),
        request.questionnaire,
        request.payload,
    ) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
struct ComponentsRequest {
    components: BTreeSet<ComponentKind>,
}

async fn components_handler<S>(
    State(service): State<Arc<RiskModelService<S>>>,
    headers: HeaderMap,
    Path(model_id): Path<String>,
    axum::Json(request): axum::Json<ComponentsRequest>,
) -> Response
where
    S: ModelStore + 'static,
{
    let ctx = match context_from(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.set_components(&ctx, &ModelId(model_id), request.components) {
        Ok(model) => (StatusCode::OK, axum::Json(model)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn delete_handler<S>(
    State(service): State<Arc<RiskModelService<S>>>,
    headers: HeaderMap,
    Path(model_id): Path<String>,
) -> Response
where
    S: ModelStore + 'static,
{
    let ctx = match context_from(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.delete_model(&ctx, &ModelId(model_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

async fn start_test_handler<S>(
    State(service): State<Arc<RiskModelService<S>>>,
    headers: HeaderMap,
    Path(model_id): Path<String>,
) -> Response
where
    S: ModelStore + 'static,
{
    let ctx = match context_from(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.start_test(&ctx, &ModelId(model_id)) {
        Ok(start) => (StatusCode::ACCEPTED, axum::Json(start)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn test_state_handler<S>(
    State(service): State<Arc<RiskModelService<S>>>,
    headers: HeaderMap,
    Path(model_id): Path<String>,
) -> Response
where
    S: ModelStore + 'static,
{
    let ctx = match context_from(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.test_state(&ctx, &ModelId(model_id)) {
        Ok(state) => (StatusCode::OK, axum::Json(state)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn publish_handler<S>(
    State(service): State<Arc<RiskModelService<S>>>,
    headers: HeaderMap,
    Path(model_id): Path<String>,
) -> Response
where
    S: ModelStore + 'static,
{
    let ctx = match context_from(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.publish(&ctx, &ModelId(model_id)) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn disable_handler<S>(
    State(service): State<Arc<RiskModelService<S>>>,
    headers: HeaderMap,
    Path(model_id): Path<String>,
) -> Response
where
    S: ModelStore + 'static,
{
    let ctx = match context_from(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.disable(&ctx, &ModelId(model_id)) {
        Ok(model) => (StatusCode::OK, axum::Json(model)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn enable_handler<S>(
    State(service): State<Arc<RiskModelService<S>>>,
    headers: HeaderMap,
    Path(model_id): Path<String>,
) -> Response
where
    S: ModelStore + 'static,
{
    let ctx = match context_from(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.enable(&ctx, &ModelId(model_id)) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn tier_labels_handler<S>(
    State(service): State<Arc<RiskModelService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: ModelStore + 'static,
{
    let ctx = match context_from(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.tier_labels(&ctx) {
        Ok(labels) => (StatusCode::OK, axum::Json(labels)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn save_tier_label_handler<S>(
    State(service): State<Arc<RiskModelService<S>>>,
    headers: HeaderMap,
    axum::Json(tier): axum::Json<RiskTier>,
) -> Response
where
    S: ModelStore + 'static,
{
    let ctx = match context_from(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.save_tier_label(&ctx, tier) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

async fn assessment_handler<S>(
    State(service): State<Arc<RiskModelService<S>>>,
    headers: HeaderMap,
    Path((entity_id, role)): Path<(String, String)>,
) -> Response
where
    S: ModelStore + 'static,
{
    let ctx = match context_from(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.current_assessment(&ctx, &EntityId(entity_id), &RiskRoleId(role)) {
        Ok(Some(assessment)) => (StatusCode::OK, axum::Json(assessment)).into_response(),
        Ok(None) => {
            let payload = json!({ "error": "no current assessment" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}
