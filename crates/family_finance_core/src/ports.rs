//! crates/family_finance_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AuditedEntity, ChangeRecord, Expense, ExpenseUpdate, Income, Member, MemberCredentials,
    NewChangeRecord, NewExpense, NewIncome, NewMember, NewNotification, NewRecurringBill,
    Notification, RecurringBill, RecurringBillUpdate, Role,
};

//=========================================================================================
// Generic Store Error and Result Types
//=========================================================================================

/// A generic error type for all record-store operations.
/// This abstracts away the specific errors of the backing database.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Conflicting record: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The household's record store. One trait, one backing database; any
/// failure aborts the calling operation rather than yielding partial data.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // --- Member Management ---
    async fn create_member(&self, member: NewMember) -> StoreResult<Member>;

    async fn member_by_id(&self, member_id: Uuid) -> StoreResult<Member>;

    async fn member_credentials_by_email(&self, email: &str) -> StoreResult<MemberCredentials>;

    async fn list_members(&self) -> StoreResult<Vec<Member>>;

    async fn count_members(&self) -> StoreResult<i64>;

    async fn update_member_role(&self, member_id: Uuid, role: Role) -> StoreResult<Member>;

    async fn update_member_name(&self, member_id: Uuid, name: &str) -> StoreResult<Member>;

    /// Removes the member, their notifications and their audit entries.
    /// Records they created survive with `created_by` cleared.
    async fn delete_member(&self, member_id: Uuid) -> StoreResult<()>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        member_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> StoreResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> StoreResult<()>;

    // --- Expenses ---
    async fn create_expense(&self, expense: NewExpense) -> StoreResult<Expense>;

    async fn expense_by_id(&self, expense_id: Uuid) -> StoreResult<Expense>;

    /// Active (non-deleted) expenses, newest due date first.
    async fn list_active_expenses(&self) -> StoreResult<Vec<Expense>>;

    /// Soft-deleted expenses, most recently deleted first.
    async fn list_deleted_expenses(&self) -> StoreResult<Vec<Expense>>;

    /// Active expenses with `due_date` in the inclusive range.
    async fn expenses_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Expense>>;

    async fn update_expense(
        &self,
        expense_id: Uuid,
        update: ExpenseUpdate,
    ) -> StoreResult<Expense>;

    async fn soft_delete_expense(
        &self,
        expense_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn restore_expense(&self, expense_id: Uuid) -> StoreResult<Expense>;

    // --- Change Log ---
    async fn append_change(&self, change: NewChangeRecord) -> StoreResult<()>;

    async fn changes_for(
        &self,
        entity: AuditedEntity,
        entity_id: Uuid,
    ) -> StoreResult<Vec<ChangeRecord>>;

    // --- Recurring Bills ---
    async fn create_bill(&self, bill: NewRecurringBill) -> StoreResult<RecurringBill>;

    async fn bill_by_id(&self, bill_id: Uuid) -> StoreResult<RecurringBill>;

    /// All bill definitions, soonest anchor date first.
    async fn list_bills(&self) -> StoreResult<Vec<RecurringBill>>;

    async fn update_bill(
        &self,
        bill_id: Uuid,
        update: RecurringBillUpdate,
    ) -> StoreResult<RecurringBill>;

    async fn delete_bill(&self, bill_id: Uuid) -> StoreResult<()>;

    // --- Incomes ---
    async fn create_income(&self, income: NewIncome) -> StoreResult<Income>;

    async fn income_by_id(&self, income_id: Uuid) -> StoreResult<Income>;

    async fn list_incomes(&self) -> StoreResult<Vec<Income>>;

    /// Incomes with `received_date` in the inclusive range.
    async fn incomes_received_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Income>>;

    async fn delete_income(&self, income_id: Uuid) -> StoreResult<()>;

    // --- Notifications ---
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> StoreResult<Notification>;

    async fn notification_by_id(&self, notification_id: Uuid) -> StoreResult<Notification>;

    /// All notifications, newest first.
    async fn list_notifications(&self) -> StoreResult<Vec<Notification>>;

    async fn update_notification_message(
        &self,
        notification_id: Uuid,
        message: &str,
    ) -> StoreResult<Notification>;
}

/// Source of the current instant. Injectable so projections and month
/// aggregations stay deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
