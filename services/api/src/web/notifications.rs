//! services/api/src/web/notifications.rs
//!
//! Household notification endpoints. A notification without an explicit
//! recipient list goes to every member except the sender.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use family_finance_core::domain::{Member, NewNotification, Notification};
use family_finance_core::policy;
use family_finance_core::ports::StoreError;

use crate::web::rest::{
    current_member, load_name_map, member_name_map, member_summary, MemberSummaryDto,
};
use crate::web::state::AppState;

const MIN_MESSAGE_LEN: usize = 4;

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// A notification as returned by the API.
#[derive(Serialize, ToSchema)]
pub struct NotificationDto {
    pub id: Uuid,
    pub message: String,
    pub sender: Option<MemberSummaryDto>,
    pub recipient_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl NotificationDto {
    pub(crate) fn from_domain(
        notification: Notification,
        names: &HashMap<Uuid, String>,
    ) -> Self {
        Self {
            id: notification.id,
            message: notification.message,
            sender: member_summary(Some(notification.sender), names),
            recipient_ids: notification.recipient_ids,
            created_at: notification.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateNotificationRequest {
    pub message: String,
    /// Explicit recipients. Empty or omitted means everyone but the sender.
    pub recipient_ids: Option<Vec<Uuid>>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateNotificationRequest {
    pub message: String,
}

//=========================================================================================
// Recipient Defaulting
//=========================================================================================

/// Resolves the recipient list for a new notification. An empty or missing
/// list falls back to every household member except the sender.
pub fn resolve_recipients(
    requested: Option<Vec<Uuid>>,
    sender: Uuid,
    members: &[Member],
) -> Vec<Uuid> {
    match requested {
        Some(ids) if !ids.is_empty() => ids,
        _ => members
            .iter()
            .filter(|m| m.id != sender)
            .map(|m| m.id)
            .collect(),
    }
}

fn validate_message(message: &str) -> Result<&str, (StatusCode, String)> {
    let message = message.trim();
    if message.len() < MIN_MESSAGE_LEN {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Message must be at least {} characters", MIN_MESSAGE_LEN),
        ));
    }
    Ok(message)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /notifications - All notifications, newest first
#[utoipa::path(
    get,
    path = "/notifications",
    responses(
        (status = 200, description = "Notifications", body = [NotificationDto]),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_notifications_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let notifications = state.store.list_notifications().await.map_err(|e| {
        error!("Failed to list notifications: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to list notifications".to_string(),
        )
    })?;
    let names = load_name_map(&state).await?;
    let body: Vec<NotificationDto> = notifications
        .into_iter()
        .map(|n| NotificationDto::from_domain(n, &names))
        .collect();
    Ok(Json(body))
}

/// POST /notifications - Send a notification to the household
#[utoipa::path(
    post,
    path = "/notifications",
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification sent", body = NotificationDto),
        (status = 400, description = "Message too short"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "View-only members cannot send notifications"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_notification_handler(
    State(state): State<Arc<AppState>>,
    Extension(member_id): Extension<Uuid>,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Check the actor may record entries
    let actor = current_member(&state, member_id).await?;
    if !policy::can_record(actor.role) {
        return Err((
            StatusCode::FORBIDDEN,
            "View-only members cannot send notifications".to_string(),
        ));
    }

    // 2. Validate the message
    let message = validate_message(&req.message)?;

    // 3. Default the recipient list to everyone but the sender
    let members = state.store.list_members().await.map_err(|e| {
        error!("Failed to load members: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load members".to_string(),
        )
    })?;
    let recipient_ids = resolve_recipients(req.recipient_ids, actor.id, &members);

    // 4. Create the notification
    let notification = state
        .store
        .create_notification(NewNotification {
            message: message.to_string(),
            sender: actor.id,
            recipient_ids,
        })
        .await
        .map_err(|e| {
            error!("Failed to create notification: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create notification".to_string(),
            )
        })?;

    let names = member_name_map(&members);
    Ok((
        StatusCode::CREATED,
        Json(NotificationDto::from_domain(notification, &names)),
    ))
}

/// PUT /notifications/{id} - Edit a notification's message
#[utoipa::path(
    put,
    path = "/notifications/{id}",
    request_body = UpdateNotificationRequest,
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification updated", body = NotificationDto),
        (status = 400, description = "Message too short"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Notification not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_notification_handler(
    State(state): State<Arc<AppState>>,
    Extension(member_id): Extension<Uuid>,
    Path(notification_id): Path<Uuid>,
    Json(req): Json<UpdateNotificationRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // Any authenticated member may edit the shared board.
    let _actor = current_member(&state, member_id).await?;

    let message = validate_message(&req.message)?;

    let notification = state
        .store
        .update_notification_message(notification_id, message)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "Notification not found".to_string())
            }
            other => {
                error!("Failed to update notification: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to update notification".to_string(),
                )
            }
        })?;

    let names = load_name_map(&state).await?;
    Ok(Json(NotificationDto::from_domain(notification, &names)))
}
