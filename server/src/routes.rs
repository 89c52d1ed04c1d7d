//! HTTP surface: auth, group management, and the score endpoint.

use crate::password;
use crate::sessions::{Session, SessionManager};
use crate::store::{Store, StoreError};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use log::{error, warn};
use serde_json::{json, Value};
use shared::{
    AddMemberRequest, CreateGroupRequest, CreateGroupResponse, GroupView, LoginRequest,
    LoginResponse, MemberView, RegisterRequest, RegisterResponse, ScoreOutcome,
};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: Arc<RwLock<SessionManager>>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/groups", post(create_group_handler))
        .route(
            "/groups/{group_id}",
            get(view_group_handler).delete(delete_group_handler),
        )
        .route("/groups/{group_id}/members", post(add_member_handler))
        .route(
            "/groups/{group_id}/members/{user_id}",
            delete(remove_member_handler),
        )
        .route("/groups/{group_id}/game/score", post(record_score_handler))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"ok": true}))
}

async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let username = request.username.trim();
    if username.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("name and password are required"));
    }

    let password_hash = password::hash(&request.password)
        .map_err(|e| ApiError::internal(format!("password hashing failed: {}", e)))?;

    let user_id = match state.store.create_user(username, &password_hash).await {
        Ok(id) => id,
        Err(StoreError::Conflict) => {
            return Err(ApiError::conflict("that name is already taken"));
        }
        Err(e) => return Err(ApiError::from_store(e)),
    };

    Ok(Json(RegisterResponse { ok: true, user_id }))
}

async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .store
        .user_by_name(request.username.trim())
        .await
        .map_err(ApiError::from_store)?
        .ok_or_else(|| ApiError::unauthorized("invalid name or password"))?;

    if !password::verify(&request.password, &user.password_hash) {
        return Err(ApiError::unauthorized("invalid name or password"));
    }

    let token = state.sessions.write().await.open(user.id, &user.username);
    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
    }))
}

async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let session = require_session(&state, &headers).await?;
    state.sessions.write().await.close(&session.token);
    Ok(Json(json!({"ok": true})))
}

async fn create_group_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateGroupRequest>,
) -> Result<Json<CreateGroupResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("group name is required"));
    }

    let group_id = state
        .store
        .create_group(name, session.user_id)
        .await
        .map_err(ApiError::from_store)?;
    Ok(Json(CreateGroupResponse { ok: true, group_id }))
}

async fn view_group_handler(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<GroupView>, ApiError> {
    let session = require_session(&state, &headers).await?;

    let name = state
        .store
        .group_name(group_id)
        .await
        .map_err(ApiError::from_store)?
        .ok_or_else(|| ApiError::not_found("no such group"))?;

    require_membership(&state, group_id, session.user_id).await?;

    let members = state
        .store
        .members(group_id)
        .await
        .map_err(ApiError::from_store)?
        .into_iter()
        .map(|m| MemberView {
            user_id: m.user_id,
            username: m.username,
            role: m.role,
            status: m.status,
            best_kills: m.best_kills,
        })
        .collect();

    Ok(Json(GroupView {
        group_id,
        name,
        members,
    }))
}

async fn delete_group_handler(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let session = require_session(&state, &headers).await?;

    state
        .store
        .group_name(group_id)
        .await
        .map_err(ApiError::from_store)?
        .ok_or_else(|| ApiError::not_found("no such group"))?;

    require_membership(&state, group_id, session.user_id).await?;

    state
        .store
        .delete_group(group_id)
        .await
        .map_err(ApiError::from_store)?;
    Ok(Json(json!({"ok": true})))
}

async fn add_member_handler(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<AddMemberRequest>,
) -> Result<Json<Value>, ApiError> {
    require_session(&state, &headers).await?;

    state
        .store
        .group_name(group_id)
        .await
        .map_err(ApiError::from_store)?
        .ok_or_else(|| ApiError::not_found("no such group"))?;

    if !state
        .store
        .user_exists(request.user_id)
        .await
        .map_err(ApiError::from_store)?
    {
        return Err(ApiError::not_found("no such user"));
    }

    match state.store.add_member(group_id, request.user_id).await {
        Ok(()) => Ok(Json(json!({"ok": true}))),
        Err(StoreError::Conflict) => Err(ApiError::conflict("already a member")),
        Err(e) => Err(ApiError::from_store(e)),
    }
}

async fn remove_member_handler(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(i64, i64)>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_session(&state, &headers).await?;

    let removed = state
        .store
        .remove_member(group_id, user_id)
        .await
        .map_err(ApiError::from_store)?;
    if !removed {
        return Err(ApiError::not_found("no such membership"));
    }
    Ok(Json(json!({"ok": true})))
}

/// Records a kill count for the caller in the given group, keeping only the
/// running maximum. Submitting a value at or below the stored best is a
/// successful no-op, so retries and stale reports are harmless.
async fn record_score_handler(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<ScoreOutcome>, ApiError> {
    let session = require_session(&state, &headers).await?;

    // Parsed by hand so a missing, fractional, or negative kill count is a
    // client error rather than a deserialization rejection.
    let kills = body
        .get("kills")
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::bad_request("kills must be a non-negative integer"))?;
    if kills < 0 {
        return Err(ApiError::bad_request("kills must be a non-negative integer"));
    }

    let member = require_membership(&state, group_id, session.user_id).await?;

    let previous = member.best_kills;
    let updated = previous.max(kills);
    if kills > previous {
        state
            .store
            .set_best_kills(group_id, session.user_id, kills)
            .await
            .map_err(ApiError::from_store)?;
    }

    Ok(Json(ScoreOutcome {
        ok: true,
        previous,
        updated,
    }))
}

/// Resolves the bearer token to a live session or fails with 401.
async fn require_session(state: &AppState, headers: &HeaderMap) -> Result<Session, ApiError> {
    let token =
        bearer_token(headers).ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;
    let sessions = state.sessions.read().await;
    sessions
        .get(token)
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("session expired or unknown"))
}

async fn require_membership(
    state: &AppState,
    group_id: i64,
    user_id: i64,
) -> Result<crate::store::MemberRecord, ApiError> {
    state
        .store
        .membership(group_id, user_id)
        .await
        .map_err(ApiError::from_store)?
        .ok_or_else(|| ApiError::forbidden("not a group member"))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Persistence failures are logged here and surfaced as a generic
    /// message; the caller never sees database details.
    fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => Self::conflict("already exists"),
            StoreError::NotFound => Self::not_found("no such record"),
            StoreError::Database(e) => {
                error!("persistence failure: {}", e);
                Self::internal("storage unavailable")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(
            "request failed: {} {}",
            self.status.as_u16(),
            self.message
        );
        (self.status, Json(json!({"error": self.message}))).into_response()
    }
}
