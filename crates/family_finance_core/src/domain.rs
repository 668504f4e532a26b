//! crates/family_finance_core/src/domain.rs
//!
//! Defines the pure, core data structures for the household ledger.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

//=========================================================================================
// Members and Roles
//=========================================================================================

/// Access level of a household member.
///
/// Wire names (`ADMIN` / `MEMBER` / `VIEW_ONLY`) are fixed; the REST layer and
/// the database both speak them through [`Role::as_str`] and [`Role::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Member,
    ViewOnly,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Member => "MEMBER",
            Role::ViewOnly => "VIEW_ONLY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "MEMBER" => Some(Role::Member),
            "VIEW_ONLY" => Some(Role::ViewOnly),
            _ => None,
        }
    }
}

/// A household member - used throughout the app.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Free-text relationship to the household, e.g. "Daughter" or
    /// "Power of Attorney".
    pub relationship: String,
    pub role: Role,
    /// Per-member grant allowing expense deletion without the admin role.
    pub can_delete: bool,
}

// Only used internally for login - contains sensitive data.
#[derive(Debug, Clone)]
pub struct MemberCredentials {
    pub member_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// Fields required to register a new member.
#[derive(Debug, Clone)]
pub struct NewMember {
    pub name: String,
    pub email: String,
    pub relationship: String,
    pub role: Role,
    pub can_delete: bool,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie).
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub member_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Recurring Bills
//=========================================================================================

/// How often a recurring bill falls due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Monthly,
    Quarterly,
    Yearly,
    OneTime,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Monthly => "MONTHLY",
            Frequency::Quarterly => "QUARTERLY",
            Frequency::Yearly => "YEARLY",
            Frequency::OneTime => "ONE_TIME",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MONTHLY" => Some(Frequency::Monthly),
            "QUARTERLY" => Some(Frequency::Quarterly),
            "YEARLY" => Some(Frequency::Yearly),
            "ONE_TIME" => Some(Frequency::OneTime),
            _ => None,
        }
    }
}

/// A rule describing a periodically-due obligation rather than a single
/// dated transaction.
#[derive(Debug, Clone)]
pub struct RecurringBill {
    pub id: Uuid,
    pub name: String,
    pub amount: Decimal,
    /// Calendar day (1-31) the obligation recurs on, derived from the
    /// caller-supplied first due date when the bill is created or updated.
    pub day_of_month: u32,
    pub frequency: Frequency,
    /// The most recently known due date. For one-time bills this is the
    /// single occurrence; for recurring bills it is the historical seed the
    /// projection advances from, not necessarily a future date.
    pub anchor_date: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a recurring bill.
#[derive(Debug, Clone)]
pub struct NewRecurringBill {
    pub name: String,
    pub amount: Decimal,
    pub day_of_month: u32,
    pub frequency: Frequency,
    pub anchor_date: DateTime<Utc>,
    pub created_by: Uuid,
}

/// Replacement values for a recurring bill. Updates are whole-record, the
/// way the bill form submits them.
#[derive(Debug, Clone)]
pub struct RecurringBillUpdate {
    pub name: String,
    pub amount: Decimal,
    pub day_of_month: u32,
    pub frequency: Frequency,
    pub anchor_date: DateTime<Utc>,
}

//=========================================================================================
// Expenses
//=========================================================================================

/// The closed set of household expense categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpenseCategory {
    Mortgage,
    PropertyTaxes,
    Electricity,
    Water,
    Gas,
    Groceries,
    Insurance,
    TherapyExpenses,
}

impl ExpenseCategory {
    /// Every category, in the display order the dashboard reports them.
    pub const ALL: [ExpenseCategory; 8] = [
        ExpenseCategory::Mortgage,
        ExpenseCategory::PropertyTaxes,
        ExpenseCategory::Electricity,
        ExpenseCategory::Water,
        ExpenseCategory::Gas,
        ExpenseCategory::Groceries,
        ExpenseCategory::Insurance,
        ExpenseCategory::TherapyExpenses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Mortgage => "Mortgage",
            ExpenseCategory::PropertyTaxes => "Property Taxes",
            ExpenseCategory::Electricity => "Electricity",
            ExpenseCategory::Water => "Water",
            ExpenseCategory::Gas => "Gas",
            ExpenseCategory::Groceries => "Groceries",
            ExpenseCategory::Insurance => "Insurance",
            ExpenseCategory::TherapyExpenses => "Therapy Expenses",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

/// A one-off dated expense entered directly, independent of any recurrence
/// rule.
#[derive(Debug, Clone)]
pub struct Expense {
    pub id: Uuid,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
    /// Receipt image location. Uploading is handled elsewhere; the ledger
    /// only carries the URL through.
    pub image_url: Option<String>,
    pub created_by: Option<Uuid>,
    /// Soft-delete marker. Deleted expenses stay queryable for the audit
    /// trail but never participate in dashboards or projections.
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fields required to record a new expense.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
    pub created_by: Uuid,
}

/// Partial update for an expense. `None` fields are left unchanged; an empty
/// `notes` or `image_url` string clears the stored value.
#[derive(Debug, Clone, Default)]
pub struct ExpenseUpdate {
    pub category: Option<ExpenseCategory>,
    pub amount: Option<Decimal>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
}

//=========================================================================================
// Versioned-Record Audit Trail
//=========================================================================================

/// Which mutable entity a change entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditedEntity {
    Expense,
    RecurringBill,
}

impl AuditedEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditedEntity::Expense => "EXPENSE",
            AuditedEntity::RecurringBill => "RECURRING_BILL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "EXPENSE" => Some(AuditedEntity::Expense),
            "RECURRING_BILL" => Some(AuditedEntity::RecurringBill),
            _ => None,
        }
    }
}

/// What happened to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Update,
    Delete,
    Restore,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Update => "UPDATE",
            ChangeAction::Delete => "DELETE",
            ChangeAction::Restore => "RESTORE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UPDATE" => Some(ChangeAction::Update),
            "DELETE" => Some(ChangeAction::Delete),
            "RESTORE" => Some(ChangeAction::Restore),
            _ => None,
        }
    }
}

/// One immutable entry in a record's change log.
///
/// Every mutable entity shares this shape: current row in its own table,
/// append-only history keyed by entity kind and id. `old_values` /
/// `new_values` hold JSON snapshots serialised at the API boundary; the
/// core treats them as opaque strings.
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    pub id: Uuid,
    pub entity: AuditedEntity,
    pub entity_id: Uuid,
    pub action: ChangeAction,
    pub changed_by: Uuid,
    /// Snapshot before the change. Restores carry no snapshots at all.
    pub old_values: Option<String>,
    pub new_values: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Fields required to append a change entry.
#[derive(Debug, Clone)]
pub struct NewChangeRecord {
    pub entity: AuditedEntity,
    pub entity_id: Uuid,
    pub action: ChangeAction,
    pub changed_by: Uuid,
    pub old_values: Option<String>,
    pub new_values: Option<String>,
}

//=========================================================================================
// Incomes
//=========================================================================================

/// A recorded income payment (pension, social security, family support...).
#[derive(Debug, Clone)]
pub struct Income {
    pub id: Uuid,
    pub source: String,
    pub amount: Decimal,
    pub received_date: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

/// Fields required to record an income payment.
#[derive(Debug, Clone)]
pub struct NewIncome {
    pub source: String,
    pub amount: Decimal,
    pub received_date: DateTime<Utc>,
    pub created_by: Uuid,
}

//=========================================================================================
// Notifications
//=========================================================================================

/// An in-app notice sent from one member to some or all of the others.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub sender: Uuid,
    pub recipient_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to send a notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub message: String,
    pub sender: Uuid,
    pub recipient_ids: Vec<Uuid>,
}
