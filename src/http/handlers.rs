use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::{ApiError, AppState};
use crate::entity::{format_timestamp, FollowUp, Inquiry, NewFollowUp, NewInquiry};
use crate::service::{ListQuery, StatusUpdate};

type ApiResult = Result<Response, ApiError>;

#[derive(Debug, Serialize)]
struct Envelope<T> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    data: T,
}

fn success<T: Serialize>(code: StatusCode, message: Option<&'static str>, data: T) -> Response {
    let body = Envelope {
        status: "success",
        message,
        data,
    };
    (code, Json(body)).into_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Submitted {
    reference_code: String,
    inquiry: Inquiry,
}

#[derive(Debug, Serialize)]
struct Updated {
    inquiry: Inquiry,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Added {
    follow_up: FollowUp,
}

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
    message: &'static str,
    timestamp: String,
}

pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "success",
        message: "Inquiry desk API is running!",
        timestamp: format_timestamp(&state.service.now()),
    })
}

pub async fn submit_inquiry(
    State(state): State<AppState>,
    payload: Result<Json<NewInquiry>, JsonRejection>,
) -> ApiResult {
    let Json(input) = payload?;
    let inquiry = state.service.submit_inquiry(input).await?;
    Ok(success(
        StatusCode::CREATED,
        Some("Inquiry submitted successfully!"),
        Submitted {
            reference_code: inquiry.reference_code.clone(),
            inquiry,
        },
    ))
}

pub async fn track_inquiry(
    State(state): State<AppState>,
    Path(reference_code): Path<String>,
) -> ApiResult {
    let view = state.service.track_by_reference_code(&reference_code).await?;
    Ok(success(StatusCode::OK, None, view))
}

pub async fn list_inquiries(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let page = state.service.list_inquiries(query).await?;
    Ok(success(StatusCode::OK, None, page))
}

pub async fn get_inquiry(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let detail = state.service.get_inquiry_with_follow_ups(&id).await?;
    Ok(success(StatusCode::OK, None, detail))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> ApiResult {
    let Json(update) = payload?;
    let inquiry = state.service.update_status(&id, update).await?;
    Ok(success(
        StatusCode::OK,
        Some("Inquiry status updated successfully"),
        Updated { inquiry },
    ))
}

pub async fn add_follow_up(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<NewFollowUp>, JsonRejection>,
) -> ApiResult {
    let Json(input) = payload?;
    let follow_up = state.service.add_follow_up(&id, input).await?;
    Ok(success(
        StatusCode::CREATED,
        Some("Follow-up added successfully"),
        Added { follow_up },
    ))
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::RouteNotFound(uri.to_string())
}
