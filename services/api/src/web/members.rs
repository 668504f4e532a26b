//! services/api/src/web/members.rs
//!
//! Household member administration: listing, role changes and removal.
//! Both admin actions refuse to target the acting admin's own account.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use family_finance_core::domain::Role;
use family_finance_core::policy;
use family_finance_core::ports::StoreError;

use crate::web::rest::{current_member, MemberDto, MessageResponse};
use crate::web::state::AppState;

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /members - All household members, alphabetical
#[utoipa::path(
    get,
    path = "/members",
    responses(
        (status = 200, description = "Household members", body = [MemberDto]),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_members_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let members = state.store.list_members().await.map_err(|e| {
        error!("Failed to list members: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to list members".to_string(),
        )
    })?;
    let body: Vec<MemberDto> = members.into_iter().map(MemberDto::from_domain).collect();
    Ok(Json(body))
}

/// PUT /members/{id}/role - Change another member's role
#[utoipa::path(
    put,
    path = "/members/{id}/role",
    request_body = UpdateRoleRequest,
    params(("id" = Uuid, Path, description = "Member id")),
    responses(
        (status = 200, description = "Role updated", body = MemberDto),
        (status = 400, description = "Invalid role or own account"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Only admins can change roles"),
        (status = 404, description = "Member not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_member_role_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor_id): Extension<Uuid>,
    Path(target_id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let actor = current_member(&state, actor_id).await?;

    // 1. Parse the requested role
    let role = Role::parse(&req.role).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("Unknown role '{}'", req.role),
        )
    })?;

    // 2. Admins only, and never on their own account
    if !policy::can_change_role(&actor, target_id) {
        return Err(if actor.role == Role::Admin {
            (
                StatusCode::BAD_REQUEST,
                "You cannot change your own role".to_string(),
            )
        } else {
            (
                StatusCode::FORBIDDEN,
                "Only admins can change member roles".to_string(),
            )
        });
    }

    // 3. Apply the new role
    let member = state
        .store
        .update_member_role(target_id, role)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "Member not found".to_string())
            }
            other => {
                error!("Failed to update member role: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to update member role".to_string(),
                )
            }
        })?;

    Ok(Json(MemberDto::from_domain(member)))
}

/// DELETE /members/{id} - Remove a member from the household
///
/// The member's sessions, notifications and change-log entries go with
/// them; expenses, incomes and bills they created stay behind with the
/// creator reference cleared.
#[utoipa::path(
    delete,
    path = "/members/{id}",
    params(("id" = Uuid, Path, description = "Member id")),
    responses(
        (status = 200, description = "Member removed", body = MessageResponse),
        (status = 400, description = "Cannot remove own account"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Only admins can remove members"),
        (status = 404, description = "Member not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_member_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor_id): Extension<Uuid>,
    Path(target_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let actor = current_member(&state, actor_id).await?;

    // 1. Admins only, and never on their own account
    if !policy::can_remove_member(&actor, target_id) {
        return Err(if actor.role == Role::Admin {
            (
                StatusCode::BAD_REQUEST,
                "You cannot remove your own account".to_string(),
            )
        } else {
            (
                StatusCode::FORBIDDEN,
                "Only admins can remove members".to_string(),
            )
        });
    }

    // 2. Remove the member and their dependent rows
    state
        .store
        .delete_member(target_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "Member not found".to_string())
            }
            other => {
                error!("Failed to remove member: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to remove member".to_string(),
                )
            }
        })?;

    Ok(Json(MessageResponse::new("Member removed")))
}
