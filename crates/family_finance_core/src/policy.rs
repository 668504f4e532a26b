//! crates/family_finance_core/src/policy.rs
//!
//! Who may do what. Pure predicates over members and records; the REST
//! handlers enforce them and translate refusals into 403s.

use uuid::Uuid;

use crate::domain::{Expense, Income, Member, RecurringBill, Role};

/// View-only members read everything but record nothing: no expenses,
/// bills, incomes or notifications.
pub fn can_record(role: Role) -> bool {
    role != Role::ViewOnly
}

/// Expense edits belong to admins and the recording member.
pub fn can_edit_expense(actor: &Member, expense: &Expense) -> bool {
    actor.role == Role::Admin || expense.created_by == Some(actor.id)
}

/// Expense deletion takes the admin role or the per-member deletion grant.
pub fn can_delete_expense(actor: &Member) -> bool {
    actor.role == Role::Admin || actor.can_delete
}

/// Restoring expenses and listing the deleted pile is admin work.
pub fn can_manage_deleted_expenses(role: Role) -> bool {
    role == Role::Admin
}

/// Bill upkeep is shared household work: every authenticated member may
/// rewrite any bill, with no ownership gate. Deletion stays gated below.
pub fn can_update_bill(_actor: &Member) -> bool {
    true
}

pub fn can_delete_bill(actor: &Member, bill: &RecurringBill) -> bool {
    actor.role == Role::Admin || bill.created_by == Some(actor.id)
}

pub fn can_delete_income(actor: &Member, income: &Income) -> bool {
    actor.role == Role::Admin || income.created_by == Some(actor.id)
}

/// Role changes are admin-only and never self-applied.
pub fn can_change_role(actor: &Member, target_id: Uuid) -> bool {
    actor.role == Role::Admin && actor.id != target_id
}

/// Removing a member is admin-only, and nobody removes themselves.
pub fn can_remove_member(actor: &Member, target_id: Uuid) -> bool {
    actor.role == Role::Admin && actor.id != target_id
}
