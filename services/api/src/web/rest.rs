//! services/api/src/web/rest.rs
//!
//! Shared API response types, the master definition for the OpenAPI
//! specification, and small helpers used across the REST handlers.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use family_finance_core::domain::{ChangeRecord, Member};

use crate::web::state::AppState;
use crate::web::{auth, bills, dashboard, expenses, incomes, members, notifications};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        auth::update_profile_handler,
        dashboard::dashboard_handler,
        expenses::list_expenses_handler,
        expenses::create_expense_handler,
        expenses::update_expense_handler,
        expenses::delete_expense_handler,
        expenses::restore_expense_handler,
        expenses::list_deleted_expenses_handler,
        expenses::expense_history_handler,
        bills::list_bills_handler,
        bills::create_bill_handler,
        bills::update_bill_handler,
        bills::delete_bill_handler,
        bills::bill_history_handler,
        incomes::list_incomes_handler,
        incomes::create_income_handler,
        incomes::delete_income_handler,
        members::list_members_handler,
        members::update_member_role_handler,
        members::delete_member_handler,
        notifications::list_notifications_handler,
        notifications::create_notification_handler,
        notifications::update_notification_handler,
    ),
    components(
        schemas(
            MemberDto,
            MemberSummaryDto,
            MessageResponse,
            ChangeRecordDto,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::UpdateProfileRequest,
            dashboard::DashboardResponse,
            dashboard::MonthlyOverviewDto,
            dashboard::SourceTotalDto,
            dashboard::CategoryTotalDto,
            dashboard::UpcomingItemDto,
            expenses::ExpenseDto,
            expenses::CreateExpenseRequest,
            expenses::UpdateExpenseRequest,
            bills::RecurringBillDto,
            bills::SaveBillRequest,
            incomes::IncomeDto,
            incomes::CreateIncomeRequest,
            members::UpdateRoleRequest,
            notifications::NotificationDto,
            notifications::CreateNotificationRequest,
            notifications::UpdateNotificationRequest,
        )
    ),
    tags(
        (name = "Family Finance API", description = "API endpoints for the shared household finance tracker.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared API Response Types
//=========================================================================================

/// A member as returned by the API.
#[derive(Serialize, ToSchema)]
pub struct MemberDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub relationship: String,
    pub role: String,
    pub can_delete: bool,
}

impl MemberDto {
    pub fn from_domain(member: Member) -> Self {
        Self {
            id: member.id,
            name: member.name,
            email: member.email,
            relationship: member.relationship,
            role: member.role.as_str().to_string(),
            can_delete: member.can_delete,
        }
    }
}

/// The short member form embedded in records they created.
#[derive(Serialize, ToSchema)]
pub struct MemberSummaryDto {
    pub id: Uuid,
    pub name: String,
}

/// One entry of a record's change log as returned by the history endpoints.
/// The value snapshots are returned as the JSON they were captured as.
#[derive(Serialize, ToSchema)]
pub struct ChangeRecordDto {
    pub id: Uuid,
    pub action: String,
    pub changed_by: Option<MemberSummaryDto>,
    #[schema(value_type = Option<Object>)]
    pub old_values: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub new_values: Option<serde_json::Value>,
    pub changed_at: DateTime<Utc>,
}

impl ChangeRecordDto {
    pub(crate) fn from_domain(change: ChangeRecord, names: &HashMap<Uuid, String>) -> Self {
        Self {
            id: change.id,
            action: change.action.as_str().to_string(),
            changed_by: member_summary(Some(change.changed_by), names),
            old_values: change
                .old_values
                .and_then(|raw| serde_json::from_str(&raw).ok()),
            new_values: change
                .new_values
                .and_then(|raw| serde_json::from_str(&raw).ok()),
            changed_at: change.changed_at,
        }
    }
}

/// A plain confirmation message.
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

//=========================================================================================
// Handler Helpers
//=========================================================================================

/// Loads the member behind the authenticated session. The middleware already
/// validated the session, so a missing member row means the account was
/// removed while the cookie was still live.
pub(crate) async fn current_member(
    state: &AppState,
    member_id: Uuid,
) -> Result<Member, (StatusCode, String)> {
    state.store.member_by_id(member_id).await.map_err(|e| {
        error!("Failed to load authenticated member: {:?}", e);
        (StatusCode::UNAUTHORIZED, "Unknown member".to_string())
    })
}

/// Builds an id-to-name lookup used to embed `MemberSummaryDto`s.
pub(crate) fn member_name_map(members: &[Member]) -> HashMap<Uuid, String> {
    members.iter().map(|m| (m.id, m.name.clone())).collect()
}

/// Resolves an optional creator id against the name lookup. Members removed
/// from the household leave a `None` behind.
pub(crate) fn member_summary(
    member_id: Option<Uuid>,
    names: &HashMap<Uuid, String>,
) -> Option<MemberSummaryDto> {
    let id = member_id?;
    names.get(&id).map(|name| MemberSummaryDto {
        id,
        name: name.clone(),
    })
}

/// Fetches all members and returns the name lookup in one step.
pub(crate) async fn load_name_map(
    state: &Arc<AppState>,
) -> Result<HashMap<Uuid, String>, (StatusCode, String)> {
    let members = state.store.list_members().await.map_err(|e| {
        error!("Failed to load members: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load members".to_string(),
        )
    })?;
    Ok(member_name_map(&members))
}
