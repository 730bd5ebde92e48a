//! Job submission and read endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use rankwatch_core::jobs::InsightListFilter;
use rankwatch_core::{Job, JobError, JobRequest, SiteCode};

use super::middleware::AuthUser;
use crate::metrics::{JOBS_REJECTED_TOTAL, JOBS_SUBMITTED_TOTAL};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn job_error_response(e: JobError) -> Response {
    match e {
        JobError::Validation(_) | JobError::Undersupply { .. } => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        JobError::AccessDenied => error_response(StatusCode::FORBIDDEN, e.to_string()),
        JobError::NotFound(_) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        JobError::Queue(_) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
        other => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

fn parse_site(raw: &str) -> Result<SiteCode, Response> {
    SiteCode::from_str(raw).map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub site: String,
}

#[derive(Debug, Deserialize)]
pub struct InsightRequest {
    pub site: String,
    pub asin: String,
    pub range_days: u32,
}

async fn submit(state: &AppState, request: JobRequest, user: &AuthUser) -> Response {
    let kind = request.kind().as_str();
    match state.jobs().submit(request, &user.0).await {
        Ok(job) => {
            JOBS_SUBMITTED_TOTAL.with_label_values(&[kind]).inc();
            (StatusCode::ACCEPTED, Json(job)).into_response()
        }
        Err(e) => {
            if matches!(e, JobError::Validation(_) | JobError::Undersupply { .. }) {
                JOBS_REJECTED_TOTAL.with_label_values(&[kind]).inc();
            }
            job_error_response(e)
        }
    }
}

/// POST /api/v1/jobs/refresh
pub async fn submit_refresh(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<RefreshRequest>,
) -> Response {
    let site = match parse_site(&body.site) {
        Ok(site) => site,
        Err(response) => return response,
    };
    submit(&state, JobRequest::Refresh { site }, &user).await
}

/// POST /api/v1/jobs/insight
pub async fn submit_insight(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<InsightRequest>,
) -> Response {
    let site = match parse_site(&body.site) {
        Ok(site) => site,
        Err(response) => return response,
    };
    submit(
        &state,
        JobRequest::Insight {
            site,
            asin: body.asin,
            range_days: body.range_days,
        },
        &user,
    )
    .await
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> Response {
    match state.jobs().get(&job_id, &user.0).await {
        Ok(job) => Json(job).into_response(),
        Err(e) => job_error_response(e),
    }
}

#[derive(Debug, Serialize)]
pub struct InsightListResponse {
    pub jobs: Vec<Job>,
    pub count: usize,
}

/// GET /api/v1/jobs/insight
pub async fn list_insight(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(filter): Query<InsightListFilter>,
) -> Response {
    match state.jobs().list_insight(&filter, &user.0).await {
        Ok(jobs) => {
            let count = jobs.len();
            Json(InsightListResponse { jobs, count }).into_response()
        }
        Err(e) => job_error_response(e),
    }
}
