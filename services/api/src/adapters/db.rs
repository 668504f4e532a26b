//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `RecordStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use family_finance_core::domain::{
    AuditedEntity, ChangeAction, ChangeRecord, Expense, ExpenseCategory, ExpenseUpdate, Frequency,
    Income, Member, MemberCredentials, NewChangeRecord, NewExpense, NewIncome, NewMember,
    NewNotification, NewRecurringBill, Notification, RecurringBill, RecurringBillUpdate, Role,
};
use family_finance_core::ports::{RecordStore, StoreError, StoreResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `RecordStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> StoreError {
    StoreError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct MemberRecord {
    id: Uuid,
    name: String,
    email: String,
    relationship: String,
    role: String,
    can_delete: bool,
}
impl MemberRecord {
    fn to_domain(self) -> StoreResult<Member> {
        let role = Role::parse(&self.role).ok_or_else(|| {
            StoreError::Unexpected(format!("Unknown role '{}' on member {}", self.role, self.id))
        })?;
        Ok(Member {
            id: self.id,
            name: self.name,
            email: self.email,
            relationship: self.relationship,
            role,
            can_delete: self.can_delete,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> MemberCredentials {
        MemberCredentials {
            member_id: self.id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct BillRecord {
    id: Uuid,
    name: String,
    amount: Decimal,
    day_of_month: i32,
    frequency: String,
    anchor_date: DateTime<Utc>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl BillRecord {
    fn to_domain(self) -> StoreResult<RecurringBill> {
        let frequency = Frequency::parse(&self.frequency).ok_or_else(|| {
            StoreError::Unexpected(format!(
                "Unknown frequency '{}' on bill {}",
                self.frequency, self.id
            ))
        })?;
        Ok(RecurringBill {
            id: self.id,
            name: self.name,
            amount: self.amount,
            day_of_month: self.day_of_month as u32,
            frequency,
            anchor_date: self.anchor_date,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ExpenseRecord {
    id: Uuid,
    category: String,
    amount: Decimal,
    due_date: DateTime<Utc>,
    notes: Option<String>,
    image_url: Option<String>,
    created_by: Option<Uuid>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ExpenseRecord {
    fn to_domain(self) -> StoreResult<Expense> {
        let category = ExpenseCategory::parse(&self.category).ok_or_else(|| {
            StoreError::Unexpected(format!(
                "Unknown category '{}' on expense {}",
                self.category, self.id
            ))
        })?;
        Ok(Expense {
            id: self.id,
            category,
            amount: self.amount,
            due_date: self.due_date,
            notes: self.notes,
            image_url: self.image_url,
            created_by: self.created_by,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ChangeRow {
    id: Uuid,
    entity: String,
    entity_id: Uuid,
    action: String,
    changed_by: Uuid,
    old_values: Option<String>,
    new_values: Option<String>,
    changed_at: DateTime<Utc>,
}
impl ChangeRow {
    fn to_domain(self) -> StoreResult<ChangeRecord> {
        let entity = AuditedEntity::parse(&self.entity).ok_or_else(|| {
            StoreError::Unexpected(format!(
                "Unknown audited entity '{}' on change {}",
                self.entity, self.id
            ))
        })?;
        let action = ChangeAction::parse(&self.action).ok_or_else(|| {
            StoreError::Unexpected(format!(
                "Unknown change action '{}' on change {}",
                self.action, self.id
            ))
        })?;
        Ok(ChangeRecord {
            id: self.id,
            entity,
            entity_id: self.entity_id,
            action,
            changed_by: self.changed_by,
            old_values: self.old_values,
            new_values: self.new_values,
            changed_at: self.changed_at,
        })
    }
}

#[derive(FromRow)]
struct IncomeRecord {
    id: Uuid,
    source: String,
    amount: Decimal,
    received_date: DateTime<Utc>,
    created_by: Option<Uuid>,
}
impl IncomeRecord {
    fn to_domain(self) -> Income {
        Income {
            id: self.id,
            source: self.source,
            amount: self.amount,
            received_date: self.received_date,
            created_by: self.created_by,
        }
    }
}

#[derive(FromRow)]
struct NotificationRecord {
    id: Uuid,
    message: String,
    sender: Uuid,
    created_at: DateTime<Utc>,
    recipient_ids: Vec<Uuid>,
}
impl NotificationRecord {
    fn to_domain(self) -> Notification {
        Notification {
            id: self.id,
            message: self.message,
            sender: self.sender,
            recipient_ids: self.recipient_ids,
            created_at: self.created_at,
        }
    }
}

const MEMBER_COLUMNS: &str = "id, name, email, relationship, role, can_delete";
const BILL_COLUMNS: &str =
    "id, name, amount, day_of_month, frequency, anchor_date, created_by, created_at, updated_at";
const EXPENSE_COLUMNS: &str = "id, category, amount, due_date, notes, image_url, created_by, \
                               deleted_at, created_at, updated_at";
const NOTIFICATION_COLUMNS: &str =
    "n.id, n.message, n.sender, n.created_at, \
     COALESCE(ARRAY_AGG(r.member_id) FILTER (WHERE r.member_id IS NOT NULL), '{}'::uuid[]) \
     AS recipient_ids";

//=========================================================================================
// `RecordStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl RecordStore for DbAdapter {
    // --- Member Management ---

    async fn create_member(&self, member: NewMember) -> StoreResult<Member> {
        let sql = format!(
            "INSERT INTO members (id, name, email, relationship, role, can_delete, hashed_password) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            MEMBER_COLUMNS
        );
        let record = sqlx::query_as::<_, MemberRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&member.name)
            .bind(&member.email)
            .bind(&member.relationship)
            .bind(member.role.as_str())
            .bind(member.can_delete)
            .bind(&member.hashed_password)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StoreError::Conflict(format!("Email {} is already registered", member.email))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn member_by_id(&self, member_id: Uuid) -> StoreResult<Member> {
        let sql = format!("SELECT {} FROM members WHERE id = $1", MEMBER_COLUMNS);
        let record = sqlx::query_as::<_, MemberRecord>(&sql)
            .bind(member_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    StoreError::NotFound(format!("Member {} not found", member_id))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn member_credentials_by_email(&self, email: &str) -> StoreResult<MemberCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password FROM members WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                StoreError::NotFound(format!("No member registered as {}", email))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn list_members(&self) -> StoreResult<Vec<Member>> {
        let sql = format!("SELECT {} FROM members ORDER BY name ASC", MEMBER_COLUMNS);
        let records = sqlx::query_as::<_, MemberRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn count_members(&self) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn update_member_role(&self, member_id: Uuid, role: Role) -> StoreResult<Member> {
        let sql = format!(
            "UPDATE members SET role = $2 WHERE id = $1 RETURNING {}",
            MEMBER_COLUMNS
        );
        let record = sqlx::query_as::<_, MemberRecord>(&sql)
            .bind(member_id)
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    StoreError::NotFound(format!("Member {} not found", member_id))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn update_member_name(&self, member_id: Uuid, name: &str) -> StoreResult<Member> {
        let sql = format!(
            "UPDATE members SET name = $2 WHERE id = $1 RETURNING {}",
            MEMBER_COLUMNS
        );
        let record = sqlx::query_as::<_, MemberRecord>(&sql)
            .bind(member_id)
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    StoreError::NotFound(format!("Member {} not found", member_id))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn delete_member(&self, member_id: Uuid) -> StoreResult<()> {
        // Sessions and notifications cascade; expenses, incomes and bills
        // keep their rows with created_by cleared (FK SET NULL).
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query("DELETE FROM change_log WHERE changed_by = $1")
            .bind(member_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(member_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "Member {} not found",
                member_id
            )));
        }

        tx.commit().await.map_err(unexpected)
    }

    // --- Auth Sessions ---

    async fn create_auth_session(
        &self,
        session_id: &str,
        member_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO auth_sessions (session_id, member_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(session_id)
        .bind(member_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> StoreResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT member_id FROM auth_sessions WHERE session_id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                StoreError::NotFound("Session is missing or expired".to_string())
            }
            _ => unexpected(e),
        })
    }

    async fn delete_auth_session(&self, session_id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Expenses ---

    async fn create_expense(&self, expense: NewExpense) -> StoreResult<Expense> {
        let sql = format!(
            "INSERT INTO expenses (id, category, amount, due_date, notes, image_url, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            EXPENSE_COLUMNS
        );
        let record = sqlx::query_as::<_, ExpenseRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(expense.category.as_str())
            .bind(expense.amount)
            .bind(expense.due_date)
            .bind(&expense.notes)
            .bind(&expense.image_url)
            .bind(expense.created_by)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        record.to_domain()
    }

    async fn expense_by_id(&self, expense_id: Uuid) -> StoreResult<Expense> {
        let sql = format!("SELECT {} FROM expenses WHERE id = $1", EXPENSE_COLUMNS);
        let record = sqlx::query_as::<_, ExpenseRecord>(&sql)
            .bind(expense_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    StoreError::NotFound(format!("Expense {} not found", expense_id))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn list_active_expenses(&self) -> StoreResult<Vec<Expense>> {
        let sql = format!(
            "SELECT {} FROM expenses WHERE deleted_at IS NULL ORDER BY due_date ASC",
            EXPENSE_COLUMNS
        );
        let records = sqlx::query_as::<_, ExpenseRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn list_deleted_expenses(&self) -> StoreResult<Vec<Expense>> {
        let sql = format!(
            "SELECT {} FROM expenses WHERE deleted_at IS NOT NULL ORDER BY deleted_at DESC",
            EXPENSE_COLUMNS
        );
        let records = sqlx::query_as::<_, ExpenseRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn expenses_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Expense>> {
        let sql = format!(
            "SELECT {} FROM expenses \
             WHERE deleted_at IS NULL AND due_date >= $1 AND due_date <= $2 \
             ORDER BY due_date ASC",
            EXPENSE_COLUMNS
        );
        let records = sqlx::query_as::<_, ExpenseRecord>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn update_expense(
        &self,
        expense_id: Uuid,
        update: ExpenseUpdate,
    ) -> StoreResult<Expense> {
        // Omitted notes and image_url fields keep their stored value; an
        // empty string clears them. Other fields keep their value when
        // omitted.
        let sql = format!(
            "UPDATE expenses SET \
                 category = COALESCE($2::text, category), \
                 amount = COALESCE($3::numeric, amount), \
                 due_date = COALESCE($4::timestamptz, due_date), \
                 notes = CASE WHEN $5::text IS NULL THEN notes ELSE NULLIF($5::text, '') END, \
                 image_url = CASE WHEN $6::text IS NULL THEN image_url ELSE NULLIF($6::text, '') END, \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            EXPENSE_COLUMNS
        );
        let record = sqlx::query_as::<_, ExpenseRecord>(&sql)
            .bind(expense_id)
            .bind(update.category.map(|c| c.as_str().to_string()))
            .bind(update.amount)
            .bind(update.due_date)
            .bind(update.notes)
            .bind(update.image_url)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    StoreError::NotFound(format!("Expense {} not found", expense_id))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn soft_delete_expense(
        &self,
        expense_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE expenses SET deleted_at = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(expense_id)
        .bind(deleted_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "Expense {} not found",
                expense_id
            )));
        }
        Ok(())
    }

    async fn restore_expense(&self, expense_id: Uuid) -> StoreResult<Expense> {
        let sql = format!(
            "UPDATE expenses SET deleted_at = NULL, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            EXPENSE_COLUMNS
        );
        let record = sqlx::query_as::<_, ExpenseRecord>(&sql)
            .bind(expense_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    StoreError::NotFound(format!("Expense {} not found", expense_id))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    // --- Change Log ---

    async fn append_change(&self, change: NewChangeRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO change_log (id, entity, entity_id, action, changed_by, old_values, new_values) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::new_v4())
        .bind(change.entity.as_str())
        .bind(change.entity_id)
        .bind(change.action.as_str())
        .bind(change.changed_by)
        .bind(&change.old_values)
        .bind(&change.new_values)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn changes_for(
        &self,
        entity: AuditedEntity,
        entity_id: Uuid,
    ) -> StoreResult<Vec<ChangeRecord>> {
        let records = sqlx::query_as::<_, ChangeRow>(
            "SELECT id, entity, entity_id, action, changed_by, old_values, new_values, changed_at \
             FROM change_log WHERE entity = $1 AND entity_id = $2 ORDER BY changed_at DESC",
        )
        .bind(entity.as_str())
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    // --- Recurring Bills ---

    async fn create_bill(&self, bill: NewRecurringBill) -> StoreResult<RecurringBill> {
        let sql = format!(
            "INSERT INTO recurring_bills (id, name, amount, day_of_month, frequency, anchor_date, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            BILL_COLUMNS
        );
        let record = sqlx::query_as::<_, BillRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&bill.name)
            .bind(bill.amount)
            .bind(bill.day_of_month as i32)
            .bind(bill.frequency.as_str())
            .bind(bill.anchor_date)
            .bind(bill.created_by)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        record.to_domain()
    }

    async fn bill_by_id(&self, bill_id: Uuid) -> StoreResult<RecurringBill> {
        let sql = format!("SELECT {} FROM recurring_bills WHERE id = $1", BILL_COLUMNS);
        let record = sqlx::query_as::<_, BillRecord>(&sql)
            .bind(bill_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    StoreError::NotFound(format!("Recurring bill {} not found", bill_id))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn list_bills(&self) -> StoreResult<Vec<RecurringBill>> {
        let sql = format!(
            "SELECT {} FROM recurring_bills ORDER BY anchor_date ASC",
            BILL_COLUMNS
        );
        let records = sqlx::query_as::<_, BillRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn update_bill(
        &self,
        bill_id: Uuid,
        update: RecurringBillUpdate,
    ) -> StoreResult<RecurringBill> {
        let sql = format!(
            "UPDATE recurring_bills SET \
                 name = $2, amount = $3, day_of_month = $4, frequency = $5, \
                 anchor_date = $6, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            BILL_COLUMNS
        );
        let record = sqlx::query_as::<_, BillRecord>(&sql)
            .bind(bill_id)
            .bind(&update.name)
            .bind(update.amount)
            .bind(update.day_of_month as i32)
            .bind(update.frequency.as_str())
            .bind(update.anchor_date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    StoreError::NotFound(format!("Recurring bill {} not found", bill_id))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn delete_bill(&self, bill_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM recurring_bills WHERE id = $1")
            .bind(bill_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "Recurring bill {} not found",
                bill_id
            )));
        }
        Ok(())
    }

    // --- Incomes ---

    async fn create_income(&self, income: NewIncome) -> StoreResult<Income> {
        let record = sqlx::query_as::<_, IncomeRecord>(
            "INSERT INTO incomes (id, source, amount, received_date, created_by) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, source, amount, received_date, created_by",
        )
        .bind(Uuid::new_v4())
        .bind(&income.source)
        .bind(income.amount)
        .bind(income.received_date)
        .bind(income.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn income_by_id(&self, income_id: Uuid) -> StoreResult<Income> {
        let record = sqlx::query_as::<_, IncomeRecord>(
            "SELECT id, source, amount, received_date, created_by FROM incomes WHERE id = $1",
        )
        .bind(income_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                StoreError::NotFound(format!("Income {} not found", income_id))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn list_incomes(&self) -> StoreResult<Vec<Income>> {
        let records = sqlx::query_as::<_, IncomeRecord>(
            "SELECT id, source, amount, received_date, created_by FROM incomes \
             ORDER BY received_date DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn incomes_received_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Income>> {
        let records = sqlx::query_as::<_, IncomeRecord>(
            "SELECT id, source, amount, received_date, created_by FROM incomes \
             WHERE received_date >= $1 AND received_date <= $2 \
             ORDER BY received_date DESC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_income(&self, income_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM incomes WHERE id = $1")
            .bind(income_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "Income {} not found",
                income_id
            )));
        }
        Ok(())
    }

    // --- Notifications ---

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> StoreResult<Notification> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let id = Uuid::new_v4();
        let created_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "INSERT INTO notifications (id, message, sender) VALUES ($1, $2, $3) \
             RETURNING created_at",
        )
        .bind(id)
        .bind(&notification.message)
        .bind(notification.sender)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        for recipient_id in &notification.recipient_ids {
            sqlx::query(
                "INSERT INTO notification_recipients (notification_id, member_id) \
                 VALUES ($1, $2)",
            )
            .bind(id)
            .bind(recipient_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;

        Ok(Notification {
            id,
            message: notification.message,
            sender: notification.sender,
            recipient_ids: notification.recipient_ids,
            created_at,
        })
    }

    async fn notification_by_id(&self, notification_id: Uuid) -> StoreResult<Notification> {
        let sql = format!(
            "SELECT {} FROM notifications n \
             LEFT JOIN notification_recipients r ON r.notification_id = n.id \
             WHERE n.id = $1 \
             GROUP BY n.id, n.message, n.sender, n.created_at",
            NOTIFICATION_COLUMNS
        );
        let record = sqlx::query_as::<_, NotificationRecord>(&sql)
            .bind(notification_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    StoreError::NotFound(format!("Notification {} not found", notification_id))
                }
                _ => unexpected(e),
            })?;
        Ok(record.to_domain())
    }

    async fn list_notifications(&self) -> StoreResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {} FROM notifications n \
             LEFT JOIN notification_recipients r ON r.notification_id = n.id \
             GROUP BY n.id, n.message, n.sender, n.created_at \
             ORDER BY n.created_at DESC",
            NOTIFICATION_COLUMNS
        );
        let records = sqlx::query_as::<_, NotificationRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_notification_message(
        &self,
        notification_id: Uuid,
        message: &str,
    ) -> StoreResult<Notification> {
        let result = sqlx::query("UPDATE notifications SET message = $2 WHERE id = $1")
            .bind(notification_id)
            .bind(message)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "Notification {} not found",
                notification_id
            )));
        }
        self.notification_by_id(notification_id).await
    }
}
