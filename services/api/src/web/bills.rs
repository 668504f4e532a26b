//! services/api/src/web/bills.rs
//!
//! Recurring bill endpoints. Bills drive the upcoming-payments projection on
//! the dashboard; `day_of_month` is derived server-side from the submitted
//! first due date. Updates and deletions append to the change log.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use family_finance_core::domain::{
    AuditedEntity, ChangeAction, Frequency, NewChangeRecord, NewRecurringBill, RecurringBill,
    RecurringBillUpdate,
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

/// A recurring bill as returned by the API.
#[derive(Serialize, ToSchema)]
pub struct RecurringBillDto {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub day_of_month: u32,
    pub frequency: String,
    pub first_due_date: DateTime<Utc>,
    pub created_by: Option<MemberSummaryDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringBillDto {
    pub(crate) fn from_domain(bill: RecurringBill, names: &HashMap<Uuid, String>) -> Self {
        Self {
            id: bill.id,
            name: bill.name,
            amount: bill.amount,
            day_of_month: bill.day_of_month,
            frequency: bill.frequency.as_str().to_string(),
            first_due_date: bill.anchor_date,
            created_by: member_summary(bill.created_by, names),
            created_at: bill.created_at,
            updated_at: bill.updated_at,
        }
    }
}

/// Payload shared by create and update; bill updates replace the whole
/// record the way the bill form submits it.
#[derive(Deserialize, ToSchema)]
pub struct SaveBillRequest {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub frequency: String,
    pub first_due_date: DateTime<Utc>,
}

struct ValidatedBill {
    name: String,
    amount: Decimal,
    frequency: Frequency,
    day_of_month: u32,
    anchor_date: DateTime<Utc>,
}

fn validate_bill(req: SaveBillRequest) -> Result<ValidatedBill, (StatusCode, String)> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name is required".to_string()));
    }
    if req.amount <= Decimal::ZERO {
        return Err((
            StatusCode::BAD_REQUEST,
            "Amount must be greater than zero".to_string(),
        ));
    }
    let frequency = Frequency::parse(&req.frequency).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("Unknown frequency '{}'", req.frequency),
        )
    })?;
    Ok(ValidatedBill {
        name: name.to_string(),
        amount: req.amount,
        frequency,
        day_of_month: req.first_due_date.day(),
        anchor_date: req.first_due_date,
    })
}

//=========================================================================================
// Change-Log Snapshots
//=========================================================================================

#[derive(Serialize)]
struct BillSnapshot {
    name: String,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    day_of_month: u32,
    frequency: String,
    first_due_date: DateTime<Utc>,
}

fn snapshot_json(bill: &RecurringBill) -> Option<String> {
    let snapshot = BillSnapshot {
        name: bill.name.clone(),
        amount: bill.amount,
        day_of_month: bill.day_of_month,
        frequency: bill.frequency.as_str().to_string(),
        first_due_date: bill.anchor_date,
    };
    serde_json::to_string(&snapshot).ok()
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /recurring-bills - All bills, earliest anchor first
#[utoipa::path(
    get,
    path = "/recurring-bills",
    responses(
        (status = 200, description = "Recurring bills", body = [RecurringBillDto]),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_bills_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let bills = state.store.list_bills().await.map_err(|e| {
        error!("Failed to list bills: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to list bills".to_string(),
        )
    })?;
    let names = load_name_map(&state).await?;
    let body: Vec<RecurringBillDto> = bills
        .into_iter()
        .map(|b| RecurringBillDto::from_domain(b, &names))
        .collect();
    Ok(Json(body))
}

/// POST /recurring-bills - Register a new bill
#[utoipa::path(
    post,
    path = "/recurring-bills",
    request_body = SaveBillRequest,
    responses(
        (status = 201, description = "Bill created", body = RecurringBillDto),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "View-only members cannot create bills"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_bill_handler(
    State(state): State<Arc<AppState>>,
    Extension(member_id): Extension<Uuid>,
    Json(req): Json<SaveBillRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Check the actor may record entries
    let actor = current_member(&state, member_id).await?;
    if !policy::can_record(actor.role) {
        return Err((
            StatusCode::FORBIDDEN,
            "View-only members cannot create bills".to_string(),
        ));
    }

    // 2. Validate and derive day_of_month from the first due date
    let bill = validate_bill(req)?;

    // 3. Create the bill
    let created = state
        .store
        .create_bill(NewRecurringBill {
            name: bill.name,
            amount: bill.amount,
            day_of_month: bill.day_of_month,
            frequency: bill.frequency,
            anchor_date: bill.anchor_date,
            created_by: actor.id,
        })
        .await
        .map_err(|e| {
            error!("Failed to create bill: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create bill".to_string(),
            )
        })?;

    let names = load_name_map(&state).await?;
    Ok((
        StatusCode::CREATED,
        Json(RecurringBillDto::from_domain(created, &names)),
    ))
}

/// PUT /recurring-bills/{id} - Replace a bill's details
///
/// Any authenticated member may update any bill; bill upkeep is shared
/// household work. Deletion stays gated below.
#[utoipa::path(
    put,
    path = "/recurring-bills/{id}",
    request_body = SaveBillRequest,
    params(("id" = Uuid, Path, description = "Bill id")),
    responses(
        (status = 200, description = "Bill updated", body = RecurringBillDto),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Bill not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_bill_handler(
    State(state): State<Arc<AppState>>,
    Extension(member_id): Extension<Uuid>,
    Path(bill_id): Path<Uuid>,
    Json(req): Json<SaveBillRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let actor = current_member(&state, member_id).await?;
    if !policy::can_update_bill(&actor) {
        return Err((
            StatusCode::FORBIDDEN,
            "You cannot update this bill".to_string(),
        ));
    }

    // 1. Load the current record for the change-log snapshot
    let existing = state.store.bill_by_id(bill_id).await.map_err(|e| match e {
        StoreError::NotFound(_) => {
            (StatusCode::NOT_FOUND, "Recurring bill not found".to_string())
        }
        other => {
            error!("Failed to load bill: {:?}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load bill".to_string(),
            )
        }
    })?;

    // 2. Validate and apply the replacement values
    let bill = validate_bill(req)?;
    let old_values = snapshot_json(&existing);
    let updated = state
        .store
        .update_bill(
            bill_id,
            RecurringBillUpdate {
                name: bill.name,
                amount: bill.amount,
                day_of_month: bill.day_of_month,
                frequency: bill.frequency,
                anchor_date: bill.anchor_date,
            },
        )
        .await
        .map_err(|e| {
            error!("Failed to update bill: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update bill".to_string(),
            )
        })?;

    // 3. Record the edit in the change log
    state
        .store
        .append_change(NewChangeRecord {
            entity: AuditedEntity::RecurringBill,
            entity_id: bill_id,
            action: ChangeAction::Update,
            changed_by: actor.id,
            old_values,
            new_values: snapshot_json(&updated),
        })
        .await
        .map_err(|e| {
            error!("Failed to record bill change: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update bill".to_string(),
            )
        })?;

    let names = load_name_map(&state).await?;
    Ok(Json(RecurringBillDto::from_domain(updated, &names)))
}

/// GET /recurring-bills/{id}/history - The bill's change log, newest first
///
/// Deleted bills keep their log, so the endpoint answers even when the bill
/// row is gone.
#[utoipa::path(
    get,
    path = "/recurring-bills/{id}/history",
    params(("id" = Uuid, Path, description = "Bill id")),
    responses(
        (status = 200, description = "Change log entries", body = [ChangeRecordDto]),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn bill_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(member_id): Extension<Uuid>,
    Path(bill_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let _actor = current_member(&state, member_id).await?;

    let changes = state
        .store
        .changes_for(AuditedEntity::RecurringBill, bill_id)
        .await
        .map_err(|e| {
            error!("Failed to load bill history: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load bill history".to_string(),
            )
        })?;
    let names = load_name_map(&state).await?;
    let body: Vec<ChangeRecordDto> = changes
        .into_iter()
        .map(|c| ChangeRecordDto::from_domain(c, &names))
        .collect();
    Ok(Json(body))
}

/// DELETE /recurring-bills/{id} - Remove a bill
#[utoipa::path(
    delete,
    path = "/recurring-bills/{id}",
    params(("id" = Uuid, Path, description = "Bill id")),
    responses(
        (status = 200, description = "Bill deleted", body = MessageResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Only admins or the creator can delete a bill"),
        (status = 404, description = "Bill not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_bill_handler(
    State(state): State<Arc<AppState>>,
    Extension(member_id): Extension<Uuid>,
    Path(bill_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let actor = current_member(&state, member_id).await?;

    // 1. Load the bill to check ownership
    let bill = state.store.bill_by_id(bill_id).await.map_err(|e| match e {
        StoreError::NotFound(_) => {
            (StatusCode::NOT_FOUND, "Recurring bill not found".to_string())
        }
        other => {
            error!("Failed to load bill: {:?}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load bill".to_string(),
            )
        }
    })?;

    // 2. Deletion is limited to admins and the bill's creator
    if !policy::can_delete_bill(&actor, &bill) {
        return Err((
            StatusCode::FORBIDDEN,
            "Only admins or the creator can delete this bill".to_string(),
        ));
    }

    // 3. Delete and record it in the change log
    let old_values = snapshot_json(&bill);
    state.store.delete_bill(bill_id).await.map_err(|e| {
        error!("Failed to delete bill: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to delete bill".to_string(),
        )
    })?;

    state
        .store
        .append_change(NewChangeRecord {
            entity: AuditedEntity::RecurringBill,
            entity_id: bill_id,
            action: ChangeAction::Delete,
            changed_by: actor.id,
            old_values,
            new_values: None,
        })
        .await
        .map_err(|e| {
            error!("Failed to record bill change: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete bill".to_string(),
            )
        })?;

    Ok(Json(MessageResponse::new("Recurring bill deleted")))
}
