//! crates/family_finance_core/src/projection.rs
//!
//! The bill projection engine: turns recurrence rules plus point-in-time
//! expense records into a bounded, sorted view of near-term due items.
//!
//! The engine is pure. It performs no I/O, never fails, and assumes its
//! inputs were validated at the write boundary (`day_of_month` in 1-31,
//! expenses pre-filtered to the window and to non-deleted rows).

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{Expense, Frequency, RecurringBill};
use crate::due_id::DueItemOrigin;

//=========================================================================================
// Settings and Output Types
//=========================================================================================

/// What to do when a bill's `day_of_month` does not exist in the target
/// month (day 31 in April, day 30 in February, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonthEndPolicy {
    /// Roll the excess days into the next month: day 31 of April becomes
    /// May 1. This reproduces the behaviour the ledger has always had
    /// (JavaScript `Date.setDate` semantics), so it is the default.
    #[default]
    Overflow,
    /// Saturate to the last valid day of the month: day 31 of April
    /// becomes April 30.
    Clamp,
}

/// Tuning knobs for one projection run.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionSettings {
    /// Forward horizon in days; occurrences past `now + window_days` are
    /// not surfaced.
    pub window_days: i64,
    /// Maximum number of items returned after sorting.
    pub max_items: usize,
    pub month_end: MonthEndPolicy,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            window_days: 30,
            max_items: 10,
            month_end: MonthEndPolicy::Overflow,
        }
    }
}

/// One upcoming obligation. Transient: recomputed on every request, never
/// stored.
#[derive(Debug, Clone)]
pub struct DueItem {
    pub origin: DueItemOrigin,
    /// Display label: the expense category for ad-hoc items, the bill name
    /// for projected occurrences.
    pub label: String,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
}

//=========================================================================================
// The Projection Engine
//=========================================================================================

/// Merges ad-hoc expenses with the next occurrence of every recurring bill
/// that falls inside `[now, now + window_days]`, sorted ascending by due
/// date and truncated to `max_items`.
///
/// Ad-hoc expenses pass through 1:1; range-filtering them is the record
/// store's job. Each recurring bill contributes at most one occurrence:
/// the first one at or after `now`, even when a stale anchor would leave
/// room for a second inside the window. The sort is stable, so expenses
/// precede bill occurrences that share a due date.
pub fn upcoming_due_items(
    now: DateTime<Utc>,
    settings: &ProjectionSettings,
    bills: &[RecurringBill],
    expenses: &[Expense],
) -> Vec<DueItem> {
    let window_end = now + Duration::days(settings.window_days);

    let mut items: Vec<DueItem> = expenses
        .iter()
        .map(|expense| DueItem {
            origin: DueItemOrigin::Expense(expense.id),
            label: expense.category.as_str().to_string(),
            amount: expense.amount,
            due_date: expense.due_date,
            notes: expense.notes.clone(),
            created_by: expense.created_by,
        })
        .collect();

    for bill in bills {
        let Some(occurrence) = next_occurrence(bill, now, settings.month_end) else {
            continue;
        };
        if occurrence > window_end {
            continue;
        }
        let origin = match bill.frequency {
            Frequency::OneTime => DueItemOrigin::OneTimeBill(bill.id),
            _ => DueItemOrigin::BillOccurrence(bill.id, occurrence),
        };
        items.push(DueItem {
            origin,
            label: bill.name.clone(),
            amount: bill.amount,
            due_date: occurrence,
            notes: None,
            created_by: None,
        });
    }

    items.sort_by_key(|item| item.due_date);
    items.truncate(settings.max_items);
    items
}

/// The first occurrence of `bill` at or after `now`, or `None` when the
/// bill has none (a one-time bill whose date already passed).
///
/// Advancement per frequency:
/// - one-time: the anchor date itself, only if it has not passed;
/// - monthly: `day_of_month` applied to the current month, advancing one
///   month when that day already went by;
/// - quarterly / yearly: step forward from the anchor in 3- or 12-month
///   increments, re-applying `day_of_month` after each step, until the
///   candidate reaches `now`.
pub fn next_occurrence(
    bill: &RecurringBill,
    now: DateTime<Utc>,
    policy: MonthEndPolicy,
) -> Option<DateTime<Utc>> {
    match bill.frequency {
        Frequency::OneTime => (bill.anchor_date >= now).then_some(bill.anchor_date),
        Frequency::Monthly => {
            let candidate = occurrence_in_month(now, 0, bill.day_of_month, policy)?;
            if candidate >= now {
                Some(candidate)
            } else {
                occurrence_in_month(now, 1, bill.day_of_month, policy)
            }
        }
        Frequency::Quarterly => advance_from_anchor(bill, now, 3, policy),
        Frequency::Yearly => advance_from_anchor(bill, now, 12, policy),
    }
}

/// Walks the anchor forward in `step_months` increments until it is no
/// longer in the past. An anchor already at or past `now` is returned
/// untouched, day-of-month and all.
fn advance_from_anchor(
    bill: &RecurringBill,
    now: DateTime<Utc>,
    step_months: i32,
    policy: MonthEndPolicy,
) -> Option<DateTime<Utc>> {
    let mut candidate = bill.anchor_date;
    while candidate < now {
        candidate = occurrence_in_month(candidate, step_months, bill.day_of_month, policy)?;
    }
    Some(candidate)
}

/// Builds the occurrence that lands `months_ahead` calendar months after
/// `base`, on `day_of_month`, keeping `base`'s time of day.
///
/// When the day does not exist in the target month the result follows the
/// [`MonthEndPolicy`]: either rolled into the following month by the
/// excess days or clamped to the month's last day. Returns `None` only if
/// the resulting date cannot be represented, which cannot happen for
/// in-range inputs.
fn occurrence_in_month(
    base: DateTime<Utc>,
    months_ahead: i32,
    day_of_month: u32,
    policy: MonthEndPolicy,
) -> Option<DateTime<Utc>> {
    let total_months = base.year() * 12 + base.month0() as i32 + months_ahead;
    let mut year = total_months.div_euclid(12);
    let mut month = total_months.rem_euclid(12) as u32 + 1;

    let month_len = days_in_month(year, month);
    let day = if day_of_month <= month_len {
        day_of_month
    } else {
        match policy {
            MonthEndPolicy::Clamp => month_len,
            MonthEndPolicy::Overflow => {
                // At most 3 days spill over (31 into a 28-day month), so
                // the overflow always fits in the following month.
                if month == 12 {
                    year += 1;
                    month = 1;
                } else {
                    month += 1;
                }
                day_of_month - month_len
            }
        }
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(Utc.from_utc_datetime(&NaiveDateTime::new(date, base.time())))
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) {
                29
            } else {
                28
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExpenseCategory;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    fn bill(
        n: u128,
        name: &str,
        day_of_month: u32,
        frequency: Frequency,
        anchor: DateTime<Utc>,
    ) -> RecurringBill {
        RecurringBill {
            id: Uuid::from_u128(n),
            name: name.to_string(),
            amount: Decimal::new(10000, 2),
            day_of_month,
            frequency,
            anchor_date: anchor,
            created_by: None,
            created_at: anchor,
            updated_at: anchor,
        }
    }

    fn expense(n: u128, due: DateTime<Utc>) -> Expense {
        Expense {
            id: Uuid::from_u128(n),
            category: ExpenseCategory::Groceries,
            amount: Decimal::new(4550, 2),
            due_date: due,
            notes: None,
            image_url: None,
            created_by: Some(Uuid::from_u128(900)),
            deleted_at: None,
            created_at: due,
            updated_at: due,
        }
    }

    fn settings() -> ProjectionSettings {
        ProjectionSettings::default()
    }

    #[test]
    fn ad_hoc_expenses_pass_through_unchanged() {
        let now = at(2024, 6, 1);
        let e = expense(1, at(2024, 6, 12));
        let items = upcoming_due_items(now, &settings(), &[], &[e.clone()]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].origin, DueItemOrigin::Expense(e.id));
        assert_eq!(items[0].label, "Groceries");
        assert_eq!(items[0].amount, e.amount);
        assert_eq!(items[0].due_date, e.due_date);
        assert_eq!(items[0].created_by, e.created_by);
    }

    #[test]
    fn one_time_bill_outside_window_contributes_nothing() {
        let now = at(2024, 6, 1);
        let past = bill(1, "Roof repair", 15, Frequency::OneTime, at(2024, 5, 15));
        let far = bill(2, "Car insurance", 20, Frequency::OneTime, at(2024, 8, 20));
        let items = upcoming_due_items(now, &settings(), &[past, far], &[]);
        assert!(items.is_empty());
    }

    #[test]
    fn one_time_bill_inside_window_uses_its_anchor() {
        let now = at(2024, 6, 1);
        let b = bill(1, "Roof repair", 15, Frequency::OneTime, at(2024, 6, 15));
        let items = upcoming_due_items(now, &settings(), &[b.clone()], &[]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].origin, DueItemOrigin::OneTimeBill(b.id));
        assert_eq!(items[0].due_date, at(2024, 6, 15));
        assert_eq!(items[0].label, "Roof repair");
    }

    #[test]
    fn monthly_bill_with_stale_anchor_projects_current_month() {
        // Anchor two months in the past; the occurrence still lands on the
        // 15th of the evaluation month.
        let now = at(2024, 6, 1);
        let b = bill(1, "Internet", 15, Frequency::Monthly, at(2024, 4, 15));
        let items = upcoming_due_items(now, &settings(), &[b.clone()], &[]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].due_date, at(2024, 6, 15));
        assert_eq!(
            items[0].origin,
            DueItemOrigin::BillOccurrence(b.id, at(2024, 6, 15))
        );
    }

    #[test]
    fn monthly_bill_already_past_advances_one_month() {
        let now = at(2024, 6, 10);
        let b = bill(1, "Internet", 5, Frequency::Monthly, at(2024, 1, 5));
        let items = upcoming_due_items(now, &settings(), &[b], &[]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].due_date, at(2024, 7, 5));
    }

    #[test]
    fn monthly_day_31_overflows_into_next_month() {
        // April has 30 days; day 31 rolls to May 1 instead of clamping.
        let now = at(2024, 4, 2);
        let b = bill(1, "Mortgage", 31, Frequency::Monthly, at(2024, 1, 31));
        let items = upcoming_due_items(now, &settings(), &[b], &[]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].due_date, at(2024, 5, 1));
    }

    #[test]
    fn clamp_policy_saturates_to_month_end() {
        let now = at(2024, 4, 2);
        let clamped = ProjectionSettings {
            month_end: MonthEndPolicy::Clamp,
            ..settings()
        };
        let b = bill(1, "Mortgage", 31, Frequency::Monthly, at(2024, 1, 31));
        let items = upcoming_due_items(now, &clamped, &[b], &[]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].due_date, at(2024, 4, 30));
    }

    #[test]
    fn quarterly_bill_advances_past_stale_occurrences() {
        // Anchored in January, evaluated in July: the engine steps through
        // April 10th and lands on July 10th, the first candidate >= now.
        let now = at(2024, 7, 1);
        let b = bill(1, "Water", 10, Frequency::Quarterly, at(2024, 1, 10));
        let items = upcoming_due_items(now, &settings(), &[b], &[]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].due_date, at(2024, 7, 10));
    }

    #[test]
    fn yearly_bill_advances_in_twelve_month_steps() {
        let now = at(2024, 9, 1);
        let b = bill(1, "Property Taxes", 20, Frequency::Yearly, at(2022, 9, 20));
        let items = upcoming_due_items(now, &settings(), &[b], &[]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].due_date, at(2024, 9, 20));
    }

    #[test]
    fn future_anchor_is_returned_untouched() {
        let now = at(2024, 6, 1);
        let b = bill(1, "Gas", 12, Frequency::Quarterly, at(2024, 6, 12));
        let items = upcoming_due_items(now, &settings(), &[b], &[]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].due_date, at(2024, 6, 12));
    }

    #[test]
    fn merged_output_is_sorted_and_window_bounded() {
        // Three ad-hoc expenses on window days 2/5/29 and two bills, one
        // due on day 10 and one past the window on day 40.
        let now = at(2024, 6, 1);
        let expenses = vec![
            expense(1, at(2024, 6, 30)),
            expense(2, at(2024, 6, 3)),
            expense(3, at(2024, 6, 6)),
        ];
        let bills = vec![
            bill(10, "Internet", 11, Frequency::Monthly, at(2024, 1, 11)),
            bill(11, "Roof repair", 11, Frequency::OneTime, at(2024, 7, 11)),
        ];
        let items = upcoming_due_items(now, &settings(), &bills, &expenses);

        let due: Vec<_> = items.iter().map(|i| i.due_date).collect();
        assert_eq!(
            due,
            vec![at(2024, 6, 3), at(2024, 6, 6), at(2024, 6, 11), at(2024, 6, 30)]
        );
        let window_end = now + Duration::days(30);
        assert!(items.iter().all(|i| i.due_date >= now && i.due_date <= window_end));
    }

    #[test]
    fn output_is_truncated_to_max_items() {
        let now = at(2024, 6, 1);
        let expenses: Vec<Expense> = (1..=12)
            .map(|d| expense(d as u128, at(2024, 6, d)))
            .collect();
        let items = upcoming_due_items(now, &settings(), &[], &expenses);

        assert_eq!(items.len(), 10);
        assert_eq!(items[9].due_date, at(2024, 6, 10));
    }

    #[test]
    fn equal_due_dates_keep_expenses_before_bills() {
        let now = at(2024, 6, 1);
        let e = expense(1, at(2024, 6, 15));
        let b = bill(2, "Internet", 15, Frequency::Monthly, at(2024, 5, 15));
        let items = upcoming_due_items(now, &settings(), &[b.clone()], &[e.clone()]);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].origin, DueItemOrigin::Expense(e.id));
        assert_eq!(
            items[1].origin,
            DueItemOrigin::BillOccurrence(b.id, at(2024, 6, 15))
        );
    }

    #[test]
    fn stale_anchor_still_yields_a_single_occurrence() {
        // Day 1 of the month: both June 1st and July 1st sit inside the
        // inclusive 30-day window, but only the first occurrence is kept.
        let now = at(2024, 6, 1);
        let b = bill(1, "Mortgage", 1, Frequency::Monthly, at(2023, 1, 1));
        let items = upcoming_due_items(now, &settings(), &[b], &[]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].due_date, at(2024, 6, 1));
    }

    #[test]
    fn projection_is_idempotent_for_identical_inputs() {
        let now = at(2024, 6, 1);
        let bills = vec![
            bill(1, "Internet", 15, Frequency::Monthly, at(2024, 4, 15)),
            bill(2, "Water", 10, Frequency::Quarterly, at(2024, 1, 10)),
        ];
        let expenses = vec![expense(3, at(2024, 6, 20))];

        let first = upcoming_due_items(now, &settings(), &bills, &expenses);
        let second = upcoming_due_items(now, &settings(), &bills, &expenses);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.origin, b.origin);
            assert_eq!(a.due_date, b.due_date);
            assert_eq!(a.amount, b.amount);
        }
    }

    #[test]
    fn february_overflow_in_leap_and_common_years() {
        let b = bill(1, "Mortgage", 30, Frequency::Monthly, at(2023, 1, 30));

        // 2024 is a leap year: day 30 of February rolls 1 day into March.
        let leap = upcoming_due_items(at(2024, 2, 1), &settings(), &[b.clone()], &[]);
        assert_eq!(leap[0].due_date, at(2024, 3, 1));

        // 2023 is not: the same bill rolls 2 days over.
        let common = upcoming_due_items(at(2023, 2, 1), &settings(), &[b], &[]);
        assert_eq!(common[0].due_date, at(2023, 3, 2));
    }
}
