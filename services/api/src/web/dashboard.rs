//! services/api/src/web/dashboard.rs
//!
//! The dashboard endpoint. One request assembles the month-to-date money
//! overview and the upcoming-payments projection; if any record fetch
//! fails the whole response is abandoned rather than served partially.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use family_finance_core::due_id::DueItemOrigin;
use family_finance_core::ports::{RecordStore, StoreError, StoreResult};
use family_finance_core::projection::{upcoming_due_items, DueItem, ProjectionSettings};
use family_finance_core::summary::{
    month_bounds, monthly_overview, IncomeAssumptions, MonthlyOverview,
};

use crate::web::rest::{member_name_map, member_summary, MemberSummaryDto};
use crate::web::state::AppState;

//=========================================================================================
// Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    pub overview: MonthlyOverviewDto,
    pub upcoming: Vec<UpcomingItemDto>,
}

/// Month-to-date totals for the calendar month containing "now".
#[derive(Serialize, ToSchema)]
pub struct MonthlyOverviewDto {
    pub month_label: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_income: Decimal,
    pub income_by_source: Vec<SourceTotalDto>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_spending: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub net_savings: Decimal,
    pub spending_by_category: Vec<CategoryTotalDto>,
}

#[derive(Serialize, ToSchema)]
pub struct SourceTotalDto {
    pub source: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
}

#[derive(Serialize, ToSchema)]
pub struct CategoryTotalDto {
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
}

/// One entry in the upcoming-payments list. `id` is the wire id: the plain
/// expense id for ad-hoc items, the `recurring-` form for projected bills.
#[derive(Serialize, ToSchema)]
pub struct UpcomingItemDto {
    pub id: String,
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub is_recurring: bool,
    pub created_by: Option<MemberSummaryDto>,
}

impl MonthlyOverviewDto {
    fn from_domain(overview: MonthlyOverview) -> Self {
        Self {
            month_label: overview.month_label,
            total_income: overview.total_income,
            income_by_source: overview
                .income_by_source
                .into_iter()
                .map(|(source, amount)| SourceTotalDto { source, amount })
                .collect(),
            total_spending: overview.total_spending,
            net_savings: overview.net_savings,
            spending_by_category: overview
                .spending_by_category
                .into_iter()
                .map(|(category, amount)| CategoryTotalDto {
                    category: category.as_str().to_string(),
                    amount,
                })
                .collect(),
        }
    }
}

//=========================================================================================
// Assembly
//=========================================================================================

/// Gathers everything the dashboard needs from the store and runs the
/// projection and summary over it. Exposed as a free function so it can be
/// exercised against any `RecordStore` implementation.
pub async fn assemble_dashboard(
    store: &dyn RecordStore,
    now: DateTime<Utc>,
    settings: &ProjectionSettings,
    assumptions: &IncomeAssumptions,
) -> StoreResult<DashboardResponse> {
    // 1. Month-to-date overview inputs
    let (month_start, month_end) = month_bounds(now)
        .ok_or_else(|| StoreError::Unexpected(format!("No calendar bounds for {}", now)))?;
    let incomes = store.incomes_received_between(month_start, month_end).await?;
    let month_expenses = store.expenses_due_between(month_start, month_end).await?;
    let overview = monthly_overview(now, assumptions, &incomes, &month_expenses);

    // 2. Upcoming-payments projection inputs
    let window_end = now + chrono::Duration::days(settings.window_days);
    let window_expenses = store.expenses_due_between(now, window_end).await?;
    let bills = store.list_bills().await?;
    let items = upcoming_due_items(now, settings, &bills, &window_expenses);

    // 3. Resolve creator names for the upcoming items
    let members = store.list_members().await?;
    let names = member_name_map(&members);
    let upcoming = items
        .into_iter()
        .map(|item: DueItem| UpcomingItemDto {
            id: item.origin.wire_id(),
            is_recurring: !matches!(item.origin, DueItemOrigin::Expense(_)),
            label: item.label,
            amount: item.amount,
            due_date: item.due_date,
            notes: item.notes,
            created_by: member_summary(item.created_by, &names),
        })
        .collect();

    Ok(DashboardResponse {
        overview: MonthlyOverviewDto::from_domain(overview),
        upcoming,
    })
}

//=========================================================================================
// Handler
//=========================================================================================

/// GET /dashboard - Monthly overview plus upcoming payments
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Dashboard data", body = DashboardResponse),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let now = state.clock.now();
    let dashboard = assemble_dashboard(
        state.store.as_ref(),
        now,
        &state.config.projection,
        &state.config.income_assumptions,
    )
    .await
    .map_err(|e| {
        error!("Failed to assemble dashboard: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to assemble dashboard".to_string(),
        )
    })?;
    Ok(Json(dashboard))
}
