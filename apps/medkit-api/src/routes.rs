use axum::extract::{Path, Query, Request, State};
use axum::http::{StatusCode, header::AUTHORIZATION};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use medkit_service::{
	ClearHistoryResponse, DeleteEntryResponse, Error as ServiceError, HistoryResponse,
	MergedHistoryView, SubmitRequest, SubmitResponse, SyncRequest, UsageReport,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/v1/queries", post(submit))
		.route("/v1/history", get(history).delete(clear_history))
		.route("/v1/history/{query_id}", delete(delete_entry))
		.route("/v1/history/sync", post(sync))
		.route_layer(middleware::from_fn_with_state(state.clone(), require_api_token))
		.route("/health", get(health))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/usage/{user_id}", get(usage))
		.route_layer(middleware::from_fn_with_state(state.clone(), require_admin_token))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn submit(
	State(state): State<AppState>,
	Json(payload): Json<SubmitRequest>,
) -> Json<SubmitResponse> {
	// Refusals and backend failures are structured values; the client
	// branches on `success` and `error`, never on the HTTP status.
	Json(state.service.submit_query(payload).await)
}

async fn sync(
	State(state): State<AppState>,
	Json(payload): Json<SyncRequest>,
) -> Result<Json<MergedHistoryView>, ApiError> {
	let response = state.service.sync(payload).await?;
	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct UserParams {
	user_id: Uuid,
}

async fn history(
	State(state): State<AppState>,
	Query(params): Query<UserParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
	let response = state.service.history(params.user_id).await?;
	Ok(Json(response))
}

async fn clear_history(
	State(state): State<AppState>,
	Query(params): Query<UserParams>,
) -> Result<Json<ClearHistoryResponse>, ApiError> {
	let response = state.service.clear_history(params.user_id).await?;
	Ok(Json(response))
}

async fn delete_entry(
	State(state): State<AppState>,
	Path(query_id): Path<i64>,
	Query(params): Query<UserParams>,
) -> Result<Json<DeleteEntryResponse>, ApiError> {
	let response = state.service.delete_entry(params.user_id, query_id).await?;
	Ok(Json(response))
}

async fn usage(
	State(state): State<AppState>,
	Path(user_id): Path<Uuid>,
) -> Result<Json<UsageReport>, ApiError> {
	let response = state.service.usage(user_id).await?;
	Ok(Json(response))
}

async fn require_api_token(
	State(state): State<AppState>,
	req: Request,
	next: Next,
) -> Result<Response, ApiError> {
	check_bearer(&req, state.service.cfg.security.api_auth_token.as_deref())?;
	Ok(next.run(req).await)
}

async fn require_admin_token(
	State(state): State<AppState>,
	req: Request,
	next: Next,
) -> Result<Response, ApiError> {
	check_bearer(&req, state.service.cfg.security.admin_auth_token.as_deref())?;
	Ok(next.run(req).await)
}

fn check_bearer(req: &Request, expected: Option<&str>) -> Result<(), ApiError> {
	let Some(expected) = expected else {
		return Ok(());
	};
	let supplied = req.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok());

	if supplied == Some(format!("Bearer {expected}").as_str()) {
		return Ok(());
	}

	Err(json_error(StatusCode::UNAUTHORIZED, "unauthorized", "Missing or invalid bearer token."))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError::new(status, code, message)
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_request", message),
			ServiceError::NotEntitled { message } =>
				json_error(StatusCode::FORBIDDEN, "not_entitled", message),
			ServiceError::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "not_found", message),
			ServiceError::Provider { message } => {
				tracing::error!(error = message.as_str(), "Provider failure surfaced to API.");

				json_error(
					StatusCode::BAD_GATEWAY,
					"provider_error",
					"An upstream backend failed.",
				)
			},
			ServiceError::Storage { message } => {
				tracing::error!(error = message.as_str(), "Storage failure surfaced to API.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"storage_error",
					"Internal storage failure.",
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
