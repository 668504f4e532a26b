//! services/api/src/web/incomes.rs
//!
//! Income endpoints. Recorded income feeds the monthly overview; sources
//! with no recorded payments fall back to the configured assumptions there.

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

use family_finance_core::domain::{Income, NewIncome};
use family_finance_core::policy;
use family_finance_core::ports::StoreError;

use crate::web::rest::{
    current_member, load_name_map, member_summary, MemberSummaryDto, MessageResponse,
};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// An income payment as returned by the API.
#[derive(Serialize, ToSchema)]
pub struct IncomeDto {
    pub id: Uuid,
    pub source: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub received_date: DateTime<Utc>,
    pub created_by: Option<MemberSummaryDto>,
}

impl IncomeDto {
    pub(crate) fn from_domain(income: Income, names: &HashMap<Uuid, String>) -> Self {
        Self {
            id: income.id,
            source: income.source,
            amount: income.amount,
            received_date: income.received_date,
            created_by: member_summary(income.created_by, names),
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateIncomeRequest {
    pub source: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub received_date: DateTime<Utc>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /incomes - All recorded income, newest first
#[utoipa::path(
    get,
    path = "/incomes",
    responses(
        (status = 200, description = "Recorded income", body = [IncomeDto]),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_incomes_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let incomes = state.store.list_incomes().await.map_err(|e| {
        error!("Failed to list incomes: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to list incomes".to_string(),
        )
    })?;
    let names = load_name_map(&state).await?;
    let body: Vec<IncomeDto> = incomes
        .into_iter()
        .map(|i| IncomeDto::from_domain(i, &names))
        .collect();
    Ok(Json(body))
}

/// POST /incomes - Record an income payment
#[utoipa::path(
    post,
    path = "/incomes",
    request_body = CreateIncomeRequest,
    responses(
        (status = 201, description = "Income recorded", body = IncomeDto),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "View-only members cannot record income"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_income_handler(
    State(state): State<Arc<AppState>>,
    Extension(member_id): Extension<Uuid>,
    Json(req): Json<CreateIncomeRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Check the actor may record entries
    let actor = current_member(&state, member_id).await?;
    if !policy::can_record(actor.role) {
        return Err((
            StatusCode::FORBIDDEN,
            "View-only members cannot record income".to_string(),
        ));
    }

    // 2. Validate the payload
    let source = req.source.trim();
    if source.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Source is required".to_string()));
    }
    if req.amount <= Decimal::ZERO {
        return Err((
            StatusCode::BAD_REQUEST,
            "Amount must be greater than zero".to_string(),
        ));
    }

    // 3. Record it
    let income = state
        .store
        .create_income(NewIncome {
            source: source.to_string(),
            amount: req.amount,
            received_date: req.received_date,
            created_by: actor.id,
        })
        .await
        .map_err(|e| {
            error!("Failed to create income: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create income".to_string(),
            )
        })?;

    let names = load_name_map(&state).await?;
    Ok((
        StatusCode::CREATED,
        Json(IncomeDto::from_domain(income, &names)),
    ))
}

/// DELETE /incomes/{id} - Remove a recorded payment
#[utoipa::path(
    delete,
    path = "/incomes/{id}",
    params(("id" = Uuid, Path, description = "Income id")),
    responses(
        (status = 200, description = "Income deleted", body = MessageResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Only admins or the creator can delete an income"),
        (status = 404, description = "Income not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_income_handler(
    State(state): State<Arc<AppState>>,
    Extension(member_id): Extension<Uuid>,
    Path(income_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let actor = current_member(&state, member_id).await?;

    // 1. Load the income to check ownership
    let income = state
        .store
        .income_by_id(income_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "Income not found".to_string())
            }
            other => {
                error!("Failed to load income: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to load income".to_string(),
                )
            }
        })?;

    // 2. Deletion is limited to admins and the income's creator
    if !policy::can_delete_income(&actor, &income) {
        return Err((
            StatusCode::FORBIDDEN,
            "Only admins or the creator can delete this income".to_string(),
        ));
    }

    // 3. Delete it
    state.store.delete_income(income_id).await.map_err(|e| {
        error!("Failed to delete income: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to delete income".to_string(),
        )
    })?;

    Ok(Json(MessageResponse::new("Income deleted")))
}
