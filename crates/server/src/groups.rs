//! Group API endpoints.

use api_types::group::{GroupCreated, GroupNew, MemberListResponse, MemberNew, MemberView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<(StatusCode, Json<GroupCreated>), ServerError> {
    let id = state
        .engine
        .create_group(&payload.name, &user.username)
        .await?;
    Ok((StatusCode::CREATED, Json(GroupCreated { id })))
}

pub async fn add_member(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<MemberNew>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .add_member(group_id, &payload.user_id, &user.username)
        .await?;
    Ok(StatusCode::CREATED)
}

pub async fn list_members(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<MemberListResponse>, ServerError> {
    let members = state
        .engine
        .members(group_id, &user.username)
        .await?
        .into_iter()
        .map(|member| MemberView {
            user_id: member.user_id,
            role: member.role.as_str().to_string(),
        })
        .collect();
    Ok(Json(MemberListResponse { members }))
}
