//! Shared test support: an in-memory `RecordStore` and a fixed clock.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use family_finance_core::domain::{
    AuditedEntity, AuthSession, ChangeRecord, Expense, ExpenseUpdate, Income, Member,
    MemberCredentials, NewChangeRecord, NewExpense, NewIncome, NewMember, NewNotification,
    NewRecurringBill, Notification, RecurringBill, RecurringBillUpdate, Role,
};
use family_finance_core::ports::{Clock, RecordStore, StoreError, StoreResult};
use family_finance_core::projection::ProjectionSettings;
use family_finance_core::summary::IncomeAssumptions;

use api_lib::config::Config;
use api_lib::web::state::AppState;

/// A clock pinned to one instant so projections are reproducible.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// Builds an `AppState` over the in-memory store with the clock pinned
/// to `now`, for driving handlers directly.
pub fn test_state(store: Arc<InMemoryStore>, now: DateTime<Utc>) -> Arc<AppState> {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
    store.set_clock(clock.clone());
    Arc::new(AppState {
        store,
        clock,
        config: Arc::new(Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            database_url: "postgres://unused".to_string(),
            log_level: tracing::Level::INFO,
            cors_origin: "http://localhost:3000".to_string(),
            projection: ProjectionSettings::default(),
            income_assumptions: IncomeAssumptions::household_defaults(),
        }),
    })
}

/// A `RecordStore` backed by plain vectors, mirroring the Postgres
/// adapter's ordering and not-found semantics.
#[derive(Default)]
pub struct InMemoryStore {
    pub members: Mutex<Vec<(Member, String)>>,
    pub sessions: Mutex<Vec<AuthSession>>,
    pub expenses: Mutex<Vec<Expense>>,
    pub bills: Mutex<Vec<RecurringBill>>,
    pub incomes: Mutex<Vec<Income>>,
    pub notifications: Mutex<Vec<Notification>>,
    pub changes: Mutex<Vec<ChangeRecord>>,
    fail_bills: AtomicBool,
    /// Clock shared with the `AppState` so session expiry checks agree
    /// with the handlers' pinned time; real time when none is injected.
    clock: Mutex<Option<Arc<dyn Clock>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aligns the store's notion of "now" with the harness clock.
    pub fn set_clock(&self, clock: Arc<dyn Clock>) {
        *self.clock.lock().unwrap() = Some(clock);
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| c.now())
            .unwrap_or_else(Utc::now)
    }

    /// Makes `list_bills` fail, simulating a backend outage mid-request.
    pub fn break_bills(&self) {
        self.fail_bills.store(true, Ordering::SeqCst);
    }

    /// Seeds a member directly, bypassing registration.
    pub fn insert_member(&self, name: &str, role: Role) -> Member {
        let member = Member {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            relationship: "Relative".to_string(),
            role,
            can_delete: role == Role::Admin,
        };
        self.members
            .lock()
            .unwrap()
            .push((member.clone(), "hash".to_string()));
        member
    }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> StoreError {
    StoreError::NotFound(format!("{} {} not found", what, id))
}

#[async_trait]
impl RecordStore for InMemoryStore {
    // --- Members ---

    async fn create_member(&self, member: NewMember) -> StoreResult<Member> {
        let mut members = self.members.lock().unwrap();
        if members.iter().any(|(m, _)| m.email == member.email) {
            return Err(StoreError::Conflict(format!(
                "Email {} is already registered",
                member.email
            )));
        }
        let created = Member {
            id: Uuid::new_v4(),
            name: member.name,
            email: member.email,
            relationship: member.relationship,
            role: member.role,
            can_delete: member.can_delete,
        };
        members.push((created.clone(), member.hashed_password));
        Ok(created)
    }

    async fn member_by_id(&self, member_id: Uuid) -> StoreResult<Member> {
        self.members
            .lock()
            .unwrap()
            .iter()
            .find(|(m, _)| m.id == member_id)
            .map(|(m, _)| m.clone())
            .ok_or_else(|| not_found("Member", member_id))
    }

    async fn member_credentials_by_email(&self, email: &str) -> StoreResult<MemberCredentials> {
        self.members
            .lock()
            .unwrap()
            .iter()
            .find(|(m, _)| m.email == email)
            .map(|(m, hash)| MemberCredentials {
                member_id: m.id,
                email: m.email.clone(),
                hashed_password: hash.clone(),
            })
            .ok_or_else(|| not_found("Member", email))
    }

    async fn list_members(&self) -> StoreResult<Vec<Member>> {
        let mut members: Vec<Member> = self
            .members
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.clone())
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    async fn count_members(&self) -> StoreResult<i64> {
        Ok(self.members.lock().unwrap().len() as i64)
    }

    async fn update_member_role(&self, member_id: Uuid, role: Role) -> StoreResult<Member> {
        let mut members = self.members.lock().unwrap();
        let entry = members
            .iter_mut()
            .find(|(m, _)| m.id == member_id)
            .ok_or_else(|| not_found("Member", member_id))?;
        entry.0.role = role;
        Ok(entry.0.clone())
    }

    async fn update_member_name(&self, member_id: Uuid, name: &str) -> StoreResult<Member> {
        let mut members = self.members.lock().unwrap();
        let entry = members
            .iter_mut()
            .find(|(m, _)| m.id == member_id)
            .ok_or_else(|| not_found("Member", member_id))?;
        entry.0.name = name.to_string();
        Ok(entry.0.clone())
    }

    async fn delete_member(&self, member_id: Uuid) -> StoreResult<()> {
        let mut members = self.members.lock().unwrap();
        let before = members.len();
        members.retain(|(m, _)| m.id != member_id);
        if members.len() == before {
            return Err(not_found("Member", member_id));
        }
        self.sessions
            .lock()
            .unwrap()
            .retain(|s| s.member_id != member_id);
        self.changes
            .lock()
            .unwrap()
            .retain(|c| c.changed_by != member_id);
        let mut notifications = self.notifications.lock().unwrap();
        notifications.retain(|n| n.sender != member_id);
        for notification in notifications.iter_mut() {
            notification.recipient_ids.retain(|id| *id != member_id);
        }
        for expense in self.expenses.lock().unwrap().iter_mut() {
            if expense.created_by == Some(member_id) {
                expense.created_by = None;
            }
        }
        for bill in self.bills.lock().unwrap().iter_mut() {
            if bill.created_by == Some(member_id) {
                bill.created_by = None;
            }
        }
        for income in self.incomes.lock().unwrap().iter_mut() {
            if income.created_by == Some(member_id) {
                income.created_by = None;
            }
        }
        Ok(())
    }

    // --- Auth Sessions ---

    async fn create_auth_session(
        &self,
        session_id: &str,
        member_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.sessions.lock().unwrap().push(AuthSession {
            id: session_id.to_string(),
            member_id,
            expires_at,
        });
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> StoreResult<Uuid> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == session_id && s.expires_at > self.now())
            .map(|s| s.member_id)
            .ok_or_else(|| StoreError::NotFound("Session is missing or expired".to_string()))
    }

    async fn delete_auth_session(&self, session_id: &str) -> StoreResult<()> {
        self.sessions.lock().unwrap().retain(|s| s.id != session_id);
        Ok(())
    }

    // --- Expenses ---

    async fn create_expense(&self, expense: NewExpense) -> StoreResult<Expense> {
        let now = Utc::now();
        let created = Expense {
            id: Uuid::new_v4(),
            category: expense.category,
            amount: expense.amount,
            due_date: expense.due_date,
            notes: expense.notes,
            image_url: expense.image_url,
            created_by: Some(expense.created_by),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.expenses.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn expense_by_id(&self, expense_id: Uuid) -> StoreResult<Expense> {
        self.expenses
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == expense_id)
            .cloned()
            .ok_or_else(|| not_found("Expense", expense_id))
    }

    async fn list_active_expenses(&self) -> StoreResult<Vec<Expense>> {
        let mut expenses: Vec<Expense> = self
            .expenses
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.deleted_at.is_none())
            .cloned()
            .collect();
        expenses.sort_by_key(|e| e.due_date);
        Ok(expenses)
    }

    async fn list_deleted_expenses(&self) -> StoreResult<Vec<Expense>> {
        let mut expenses: Vec<Expense> = self
            .expenses
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.deleted_at.is_some())
            .cloned()
            .collect();
        expenses.sort_by_key(|e| std::cmp::Reverse(e.deleted_at));
        Ok(expenses)
    }

    async fn expenses_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Expense>> {
        let mut expenses: Vec<Expense> = self
            .expenses
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.deleted_at.is_none() && e.due_date >= start && e.due_date <= end)
            .cloned()
            .collect();
        expenses.sort_by_key(|e| e.due_date);
        Ok(expenses)
    }

    async fn update_expense(
        &self,
        expense_id: Uuid,
        update: ExpenseUpdate,
    ) -> StoreResult<Expense> {
        let mut expenses = self.expenses.lock().unwrap();
        let expense = expenses
            .iter_mut()
            .find(|e| e.id == expense_id)
            .ok_or_else(|| not_found("Expense", expense_id))?;
        if let Some(category) = update.category {
            expense.category = category;
        }
        if let Some(amount) = update.amount {
            expense.amount = amount;
        }
        if let Some(due_date) = update.due_date {
            expense.due_date = due_date;
        }
        if let Some(notes) = update.notes {
            expense.notes = if notes.is_empty() { None } else { Some(notes) };
        }
        if let Some(image_url) = update.image_url {
            expense.image_url = if image_url.is_empty() {
                None
            } else {
                Some(image_url)
            };
        }
        expense.updated_at = Utc::now();
        Ok(expense.clone())
    }

    async fn soft_delete_expense(
        &self,
        expense_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut expenses = self.expenses.lock().unwrap();
        let expense = expenses
            .iter_mut()
            .find(|e| e.id == expense_id)
            .ok_or_else(|| not_found("Expense", expense_id))?;
        expense.deleted_at = Some(deleted_at);
        Ok(())
    }

    async fn restore_expense(&self, expense_id: Uuid) -> StoreResult<Expense> {
        let mut expenses = self.expenses.lock().unwrap();
        let expense = expenses
            .iter_mut()
            .find(|e| e.id == expense_id)
            .ok_or_else(|| not_found("Expense", expense_id))?;
        expense.deleted_at = None;
        Ok(expense.clone())
    }

    // --- Change Log ---

    async fn append_change(&self, change: NewChangeRecord) -> StoreResult<()> {
        self.changes.lock().unwrap().push(ChangeRecord {
            id: Uuid::new_v4(),
            entity: change.entity,
            entity_id: change.entity_id,
            action: change.action,
            changed_by: change.changed_by,
            old_values: change.old_values,
            new_values: change.new_values,
            changed_at: Utc::now(),
        });
        Ok(())
    }

    async fn changes_for(
        &self,
        entity: AuditedEntity,
        entity_id: Uuid,
    ) -> StoreResult<Vec<ChangeRecord>> {
        // Newest first; reverse insertion order stands in for the adapter's
        // changed_at ordering.
        let changes: Vec<ChangeRecord> = self
            .changes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|c| c.entity == entity && c.entity_id == entity_id)
            .cloned()
            .collect();
        Ok(changes)
    }

    // --- Recurring Bills ---

    async fn create_bill(&self, bill: NewRecurringBill) -> StoreResult<RecurringBill> {
        let now = Utc::now();
        let created = RecurringBill {
            id: Uuid::new_v4(),
            name: bill.name,
            amount: bill.amount,
            day_of_month: bill.day_of_month,
            frequency: bill.frequency,
            anchor_date: bill.anchor_date,
            created_by: Some(bill.created_by),
            created_at: now,
            updated_at: now,
        };
        self.bills.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn bill_by_id(&self, bill_id: Uuid) -> StoreResult<RecurringBill> {
        self.bills
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == bill_id)
            .cloned()
            .ok_or_else(|| not_found("Recurring bill", bill_id))
    }

    async fn list_bills(&self) -> StoreResult<Vec<RecurringBill>> {
        if self.fail_bills.load(Ordering::SeqCst) {
            return Err(StoreError::Unexpected("bills backend offline".to_string()));
        }
        let mut bills: Vec<RecurringBill> = self.bills.lock().unwrap().clone();
        bills.sort_by_key(|b| b.anchor_date);
        Ok(bills)
    }

    async fn update_bill(
        &self,
        bill_id: Uuid,
        update: RecurringBillUpdate,
    ) -> StoreResult<RecurringBill> {
        let mut bills = self.bills.lock().unwrap();
        let bill = bills
            .iter_mut()
            .find(|b| b.id == bill_id)
            .ok_or_else(|| not_found("Recurring bill", bill_id))?;
        bill.name = update.name;
        bill.amount = update.amount;
        bill.day_of_month = update.day_of_month;
        bill.frequency = update.frequency;
        bill.anchor_date = update.anchor_date;
        bill.updated_at = Utc::now();
        Ok(bill.clone())
    }

    async fn delete_bill(&self, bill_id: Uuid) -> StoreResult<()> {
        let mut bills = self.bills.lock().unwrap();
        let before = bills.len();
        bills.retain(|b| b.id != bill_id);
        if bills.len() == before {
            return Err(not_found("Recurring bill", bill_id));
        }
        Ok(())
    }

    // --- Incomes ---

    async fn create_income(&self, income: NewIncome) -> StoreResult<Income> {
        let created = Income {
            id: Uuid::new_v4(),
            source: income.source,
            amount: income.amount,
            received_date: income.received_date,
            created_by: Some(income.created_by),
        };
        self.incomes.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn income_by_id(&self, income_id: Uuid) -> StoreResult<Income> {
        self.incomes
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == income_id)
            .cloned()
            .ok_or_else(|| not_found("Income", income_id))
    }

    async fn list_incomes(&self) -> StoreResult<Vec<Income>> {
        let mut incomes: Vec<Income> = self.incomes.lock().unwrap().clone();
        incomes.sort_by_key(|i| std::cmp::Reverse(i.received_date));
        Ok(incomes)
    }

    async fn incomes_received_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Income>> {
        let mut incomes: Vec<Income> = self
            .incomes
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.received_date >= start && i.received_date <= end)
            .cloned()
            .collect();
        incomes.sort_by_key(|i| std::cmp::Reverse(i.received_date));
        Ok(incomes)
    }

    async fn delete_income(&self, income_id: Uuid) -> StoreResult<()> {
        let mut incomes = self.incomes.lock().unwrap();
        let before = incomes.len();
        incomes.retain(|i| i.id != income_id);
        if incomes.len() == before {
            return Err(not_found("Income", income_id));
        }
        Ok(())
    }

    // --- Notifications ---

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> StoreResult<Notification> {
        let created = Notification {
            id: Uuid::new_v4(),
            message: notification.message,
            sender: notification.sender,
            recipient_ids: notification.recipient_ids,
            created_at: Utc::now(),
        };
        self.notifications.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn notification_by_id(&self, notification_id: Uuid) -> StoreResult<Notification> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.id == notification_id)
            .cloned()
            .ok_or_else(|| not_found("Notification", notification_id))
    }

    async fn list_notifications(&self) -> StoreResult<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self.notifications.lock().unwrap().clone();
        notifications.sort_by_key(|n| std::cmp::Reverse(n.created_at));
        Ok(notifications)
    }

    async fn update_notification_message(
        &self,
        notification_id: Uuid,
        message: &str,
    ) -> StoreResult<Notification> {
        let mut notifications = self.notifications.lock().unwrap();
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == notification_id)
            .ok_or_else(|| not_found("Notification", notification_id))?;
        notification.message = message.to_string();
        Ok(notification.clone())
    }
}
