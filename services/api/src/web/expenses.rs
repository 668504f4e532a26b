//! services/api/src/web/expenses.rs
//!
//! Expense endpoints: listing, recording, editing, soft deletion and the
//! admin-only recycle bin. Edits and deletions append to the change log.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use family_finance_core::domain::{
    AuditedEntity, ChangeAction, Expense, ExpenseCategory, ExpenseUpdate, NewChangeRecord,
    NewExpense,
};
use family_finance_core::policy;
use family_finance_core::ports::StoreError;

use crate::web::rest::{
    current_member, load_name_map, member_summary, ChangeRecordDto, MemberSummaryDto,
    MessageResponse,
};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// An expense as returned by the API.
#[derive(Serialize, ToSchema)]
pub struct ExpenseDto {
    pub id: Uuid,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
    pub created_by: Option<MemberSummaryDto>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExpenseDto {
    pub(crate) fn from_domain(expense: Expense, names: &HashMap<Uuid, String>) -> Self {
        Self {
            id: expense.id,
            category: expense.category.as_str().to_string(),
            amount: expense.amount,
            due_date: expense.due_date,
            notes: expense.notes,
            image_url: expense.image_url,
            created_by: member_summary(expense.created_by, names),
            deleted_at: expense.deleted_at,
            created_at: expense.created_at,
            updated_at: expense.updated_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateExpenseRequest {
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
}

/// Partial update. Omitted fields keep their stored value; an empty `notes`
/// or `image_url` string clears the stored value.
#[derive(Deserialize, ToSchema)]
pub struct UpdateExpenseRequest {
    pub category: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub amount: Option<Decimal>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
}

//=========================================================================================
// Change-Log Snapshots
//=========================================================================================

/// The fields captured in `old_values`/`new_values` change-log entries.
#[derive(Serialize)]
struct ExpenseSnapshot {
    category: String,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    due_date: DateTime<Utc>,
    notes: Option<String>,
}

fn snapshot_json(expense: &Expense) -> Option<String> {
    let snapshot = ExpenseSnapshot {
        category: expense.category.as_str().to_string(),
        amount: expense.amount,
        due_date: expense.due_date,
        notes: expense.notes.clone(),
    };
    serde_json::to_string(&snapshot).ok()
}

//=========================================================================================
// Validation Helpers
//=========================================================================================

fn parse_category(raw: &str) -> Result<ExpenseCategory, (StatusCode, String)> {
    ExpenseCategory::parse(raw).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("Unknown expense category '{}'", raw),
        )
    })
}

fn require_positive(amount: Decimal) -> Result<(), (StatusCode, String)> {
    if amount <= Decimal::ZERO {
        return Err((
            StatusCode::BAD_REQUEST,
            "Amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /expenses - All active expenses, soonest due first
#[utoipa::path(
    get,
    path = "/expenses",
    responses(
        (status = 200, description = "Active expenses", body = [ExpenseDto]),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_expenses_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let expenses = state.store.list_active_expenses().await.map_err(|e| {
        error!("Failed to list expenses: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to list expenses".to_string(),
        )
    })?;
    let names = load_name_map(&state).await?;
    let body: Vec<ExpenseDto> = expenses
        .into_iter()
        .map(|e| ExpenseDto::from_domain(e, &names))
        .collect();
    Ok(Json(body))
}

/// POST /expenses - Record a new expense
#[utoipa::path(
    post,
    path = "/expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense recorded", body = ExpenseDto),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "View-only members cannot record expenses"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_expense_handler(
    State(state): State<Arc<AppState>>,
    Extension(member_id): Extension<Uuid>,
    Json(req): Json<CreateExpenseRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Check the actor may record entries
    let actor = current_member(&state, member_id).await?;
    if !policy::can_record(actor.role) {
        return Err((
            StatusCode::FORBIDDEN,
            "View-only members cannot record expenses".to_string(),
        ));
    }

    // 2. Validate the payload
    let category = parse_category(&req.category)?;
    require_positive(req.amount)?;

    // 3. Create the expense
    let expense = state
        .store
        .create_expense(NewExpense {
            category,
            amount: req.amount,
            due_date: req.due_date,
            notes: req.notes,
            image_url: req.image_url,
            created_by: actor.id,
        })
        .await
        .map_err(|e| {
            error!("Failed to create expense: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create expense".to_string(),
            )
        })?;

    let names = load_name_map(&state).await?;
    Ok((
        StatusCode::CREATED,
        Json(ExpenseDto::from_domain(expense, &names)),
    ))
}

/// PUT /expenses/{id} - Edit an expense
#[utoipa::path(
    put,
    path = "/expenses/{id}",
    request_body = UpdateExpenseRequest,
    params(("id" = Uuid, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Expense updated", body = ExpenseDto),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Only admins or the creator can edit an expense"),
        (status = 404, description = "Expense not found"),
        (status = 410, description = "Expense has been deleted"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_expense_handler(
    State(state): State<Arc<AppState>>,
    Extension(member_id): Extension<Uuid>,
    Path(expense_id): Path<Uuid>,
    Json(req): Json<UpdateExpenseRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let actor = current_member(&state, member_id).await?;

    // 1. Load the current record; deleted expenses are gone, not editable
    let expense = state
        .store
        .expense_by_id(expense_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "Expense not found".to_string())
            }
            other => {
                error!("Failed to load expense: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to load expense".to_string(),
                )
            }
        })?;
    if expense.deleted_at.is_some() {
        return Err((StatusCode::GONE, "Expense has been deleted".to_string()));
    }

    // 2. Only admins and the creator may edit
    if !policy::can_edit_expense(&actor, &expense) {
        return Err((
            StatusCode::FORBIDDEN,
            "You can only edit expenses you created".to_string(),
        ));
    }

    // 3. Validate the submitted fields
    let category = match req.category.as_deref() {
        Some(raw) => Some(parse_category(raw)?),
        None => None,
    };
    if let Some(amount) = req.amount {
        require_positive(amount)?;
    }

    // 4. Apply the update
    let old_values = snapshot_json(&expense);
    let updated = state
        .store
        .update_expense(
            expense_id,
            ExpenseUpdate {
                category,
                amount: req.amount,
                due_date: req.due_date,
                notes: req.notes,
                image_url: req.image_url,
            },
        )
        .await
        .map_err(|e| {
            error!("Failed to update expense: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update expense".to_string(),
            )
        })?;

    // 5. Record the edit in the change log
    state
        .store
        .append_change(NewChangeRecord {
            entity: AuditedEntity::Expense,
            entity_id: expense_id,
            action: ChangeAction::Update,
            changed_by: actor.id,
            old_values,
            new_values: snapshot_json(&updated),
        })
        .await
        .map_err(|e| {
            error!("Failed to record expense change: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update expense".to_string(),
            )
        })?;

    let names = load_name_map(&state).await?;
    Ok(Json(ExpenseDto::from_domain(updated, &names)))
}

/// DELETE /expenses/{id} - Soft-delete an expense
#[utoipa::path(
    delete,
    path = "/expenses/{id}",
    params(("id" = Uuid, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Expense deleted", body = MessageResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "No deletion permission"),
        (status = 404, description = "Expense not found"),
        (status = 410, description = "Expense already deleted"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_expense_handler(
    State(state): State<Arc<AppState>>,
    Extension(member_id): Extension<Uuid>,
    Path(expense_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let actor = current_member(&state, member_id).await?;

    // 1. Load the current record
    let expense = state
        .store
        .expense_by_id(expense_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "Expense not found".to_string())
            }
            other => {
                error!("Failed to load expense: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to load expense".to_string(),
                )
            }
        })?;
    if expense.deleted_at.is_some() {
        return Err((
            StatusCode::GONE,
            "Expense has already been deleted".to_string(),
        ));
    }

    // 2. Deletion requires the explicit grant or the admin role
    if !policy::can_delete_expense(&actor) {
        return Err((
            StatusCode::FORBIDDEN,
            "You do not have permission to delete expenses".to_string(),
        ));
    }

    // 3. Soft-delete so the record can be restored later
    let old_values = snapshot_json(&expense);
    state
        .store
        .soft_delete_expense(expense_id, state.clock.now())
        .await
        .map_err(|e| {
            error!("Failed to delete expense: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete expense".to_string(),
            )
        })?;

    // 4. Record the deletion in the change log
    state
        .store
        .append_change(NewChangeRecord {
            entity: AuditedEntity::Expense,
            entity_id: expense_id,
            action: ChangeAction::Delete,
            changed_by: actor.id,
            old_values,
            new_values: None,
        })
        .await
        .map_err(|e| {
            error!("Failed to record expense change: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete expense".to_string(),
            )
        })?;

    Ok(Json(MessageResponse::new("Expense deleted")))
}

/// POST /expenses/{id}/restore - Bring a soft-deleted expense back
#[utoipa::path(
    post,
    path = "/expenses/{id}/restore",
    params(("id" = Uuid, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Expense restored", body = ExpenseDto),
        (status = 400, description = "Expense is not deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Only admins can restore expenses"),
        (status = 404, description = "Expense not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn restore_expense_handler(
    State(state): State<Arc<AppState>>,
    Extension(member_id): Extension<Uuid>,
    Path(expense_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let actor = current_member(&state, member_id).await?;
    if !policy::can_manage_deleted_expenses(actor.role) {
        return Err((
            StatusCode::FORBIDDEN,
            "Only admins can restore expenses".to_string(),
        ));
    }

    let expense = state
        .store
        .expense_by_id(expense_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "Expense not found".to_string())
            }
            other => {
                error!("Failed to load expense: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to load expense".to_string(),
                )
            }
        })?;
    if expense.deleted_at.is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Expense is not deleted".to_string(),
        ));
    }

    let restored = state.store.restore_expense(expense_id).await.map_err(|e| {
        error!("Failed to restore expense: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to restore expense".to_string(),
        )
    })?;

    state
        .store
        .append_change(NewChangeRecord {
            entity: AuditedEntity::Expense,
            entity_id: expense_id,
            action: ChangeAction::Restore,
            changed_by: actor.id,
            old_values: None,
            new_values: None,
        })
        .await
        .map_err(|e| {
            error!("Failed to record expense change: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to restore expense".to_string(),
            )
        })?;

    let names = load_name_map(&state).await?;
    Ok(Json(ExpenseDto::from_domain(restored, &names)))
}

/// GET /expenses/{id}/history - The expense's change log, newest first
#[utoipa::path(
    get,
    path = "/expenses/{id}/history",
    params(("id" = Uuid, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Change log entries", body = [ChangeRecordDto]),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Expense not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn expense_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(member_id): Extension<Uuid>,
    Path(expense_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let _actor = current_member(&state, member_id).await?;

    // 404 for ids that never existed; deleted expenses keep their history.
    state
        .store
        .expense_by_id(expense_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "Expense not found".to_string())
            }
            other => {
                error!("Failed to load expense: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to load expense".to_string(),
                )
            }
        })?;

    let changes = state
        .store
        .changes_for(AuditedEntity::Expense, expense_id)
        .await
        .map_err(|e| {
            error!("Failed to load expense history: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load expense history".to_string(),
            )
        })?;
    let names = load_name_map(&state).await?;
    let body: Vec<ChangeRecordDto> = changes
        .into_iter()
        .map(|c| ChangeRecordDto::from_domain(c, &names))
        .collect();
    Ok(Json(body))
}

/// GET /expenses/deleted - The recycle bin, most recently deleted first
#[utoipa::path(
    get,
    path = "/expenses/deleted",
    responses(
        (status = 200, description = "Soft-deleted expenses", body = [ExpenseDto]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Only admins can view deleted expenses"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_deleted_expenses_handler(
    State(state): State<Arc<AppState>>,
    Extension(member_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let actor = current_member(&state, member_id).await?;
    if !policy::can_manage_deleted_expenses(actor.role) {
        return Err((
            StatusCode::FORBIDDEN,
            "Only admins can view deleted expenses".to_string(),
        ));
    }

    let expenses = state.store.list_deleted_expenses().await.map_err(|e| {
        error!("Failed to list deleted expenses: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to list deleted expenses".to_string(),
        )
    })?;
    let names = load_name_map(&state).await?;
    let body: Vec<ExpenseDto> = expenses
        .into_iter()
        .map(|e| ExpenseDto::from_domain(e, &names))
        .collect();
    Ok(Json(body))
}
