pub mod domain;
pub mod due_id;
pub mod policy;
pub mod ports;
pub mod projection;
pub mod summary;

pub use domain::{
    AuditedEntity, AuthSession, ChangeAction, ChangeRecord, Expense, ExpenseCategory,
    ExpenseUpdate, Frequency, Income, Member, MemberCredentials, NewChangeRecord, NewExpense,
    NewIncome, NewMember, NewNotification, NewRecurringBill, Notification, RecurringBill,
    RecurringBillUpdate, Role,
};
pub use due_id::DueItemOrigin;
pub use ports::{Clock, RecordStore, StoreError, StoreResult};
pub use projection::{upcoming_due_items, DueItem, MonthEndPolicy, ProjectionSettings};
pub use summary::{
    month_bounds, monthly_overview, IncomeAssumption, IncomeAssumptions, MonthlyOverview,
};
