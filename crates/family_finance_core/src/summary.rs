//! crates/family_finance_core/src/summary.rs
//!
//! Monthly household overview: income by source, spending by category and
//! the resulting net savings, aggregated over one calendar month.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::{Expense, ExpenseCategory, Income};
use crate::projection::days_in_month;

//=========================================================================================
// Income Assumptions
//=========================================================================================

/// A standing monthly income the household counts on even when no payment
/// was recorded for it.
#[derive(Debug, Clone)]
pub struct IncomeAssumption {
    pub source: String,
    pub amount: Decimal,
}

/// Ordered table of standing income assumptions.
///
/// An assumption contributes its amount only when the month's recorded
/// total for that source is missing or zero; a zero total counts as
/// unreported rather than as an explicit "this source paid nothing".
#[derive(Debug, Clone, Default)]
pub struct IncomeAssumptions(Vec<IncomeAssumption>);

impl IncomeAssumptions {
    pub fn new(entries: Vec<IncomeAssumption>) -> Self {
        Self(entries)
    }

    /// The household's standing assumptions: Social Security pays 1900 a
    /// month, retirement accounts pay nothing until drawdown starts.
    pub fn household_defaults() -> Self {
        Self(vec![
            IncomeAssumption {
                source: "Social Security".to_string(),
                amount: Decimal::new(1900, 0),
            },
            IncomeAssumption {
                source: "401k/IRA".to_string(),
                amount: Decimal::ZERO,
            },
        ])
    }

    pub fn entries(&self) -> &[IncomeAssumption] {
        &self.0
    }
}

//=========================================================================================
// Monthly Overview
//=========================================================================================

/// One month's aggregated financial picture.
#[derive(Debug, Clone)]
pub struct MonthlyOverview {
    /// Human label for the month, e.g. "June 2024".
    pub month_label: String,
    pub total_income: Decimal,
    /// Source totals in first-recorded order; assumed sources the month
    /// never recorded are appended after them.
    pub income_by_source: Vec<(String, Decimal)>,
    pub total_spending: Decimal,
    pub net_savings: Decimal,
    /// Every category in reporting order; categories with no spending
    /// report zero.
    pub spending_by_category: Vec<(ExpenseCategory, Decimal)>,
}

/// Inclusive bounds of `now`'s calendar month: the 1st at midnight through
/// the last day at 23:59:59. The record store range-filters with these.
///
/// `None` only for datetimes chrono cannot represent, which cannot arise
/// from a valid `now`.
pub fn month_bounds(now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let year = now.year();
    let month = now.month();
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))?;
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)?;
    Some((
        Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN)),
        Utc.from_utc_datetime(&last.and_time(end_of_day)),
    ))
}

/// Aggregates one month of pre-filtered records into the overview.
///
/// `incomes` and `expenses` are the month's slice as returned by the
/// record store (expenses active only); this function does no date
/// filtering of its own.
pub fn monthly_overview(
    now: DateTime<Utc>,
    assumptions: &IncomeAssumptions,
    incomes: &[Income],
    expenses: &[Expense],
) -> MonthlyOverview {
    let mut income_by_source: Vec<(String, Decimal)> = Vec::new();
    for income in incomes {
        match income_by_source
            .iter_mut()
            .find(|(source, _)| *source == income.source)
        {
            Some((_, total)) => *total += income.amount,
            None => income_by_source.push((income.source.clone(), income.amount)),
        }
    }

    for assumption in assumptions.entries() {
        match income_by_source
            .iter_mut()
            .find(|(source, _)| *source == assumption.source)
        {
            Some((_, total)) if total.is_zero() => *total = assumption.amount,
            Some(_) => {}
            None => income_by_source.push((assumption.source.clone(), assumption.amount)),
        }
    }

    let total_income: Decimal = income_by_source.iter().map(|(_, amount)| *amount).sum();
    let total_spending: Decimal = expenses.iter().map(|expense| expense.amount).sum();

    let spending_by_category: Vec<(ExpenseCategory, Decimal)> = ExpenseCategory::ALL
        .iter()
        .map(|category| {
            let total = expenses
                .iter()
                .filter(|expense| expense.category == *category)
                .map(|expense| expense.amount)
                .sum();
            (*category, total)
        })
        .collect();

    MonthlyOverview {
        month_label: now.format("%B %Y").to_string(),
        total_income,
        income_by_source,
        total_spending,
        net_savings: total_income - total_spending,
        spending_by_category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn income(source: &str, amount: i64) -> Income {
        Income {
            id: Uuid::new_v4(),
            source: source.to_string(),
            amount: Decimal::new(amount, 0),
            received_date: at(2024, 6, 5),
            created_by: None,
        }
    }

    fn expense(category: ExpenseCategory, cents: i64) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            category,
            amount: Decimal::new(cents, 2),
            due_date: at(2024, 6, 10),
            notes: None,
            image_url: None,
            created_by: None,
            deleted_at: None,
            created_at: at(2024, 6, 1),
            updated_at: at(2024, 6, 1),
        }
    }

    #[test]
    fn month_bounds_cover_first_midnight_to_last_second() {
        let (start, end) = month_bounds(at(2024, 6, 17)).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).unwrap());
    }

    #[test]
    fn month_bounds_handle_december_and_leap_february() {
        let (_, december_end) = month_bounds(at(2024, 12, 3)).unwrap();
        assert_eq!(
            december_end,
            Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap()
        );

        let (_, february_end) = month_bounds(at(2024, 2, 3)).unwrap();
        assert_eq!(
            february_end,
            Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap()
        );
    }

    #[test]
    fn recorded_income_is_grouped_by_source() {
        let overview = monthly_overview(
            at(2024, 6, 17),
            &IncomeAssumptions::default(),
            &[
                income("Pension", 1200),
                income("Part-time work", 300),
                income("Pension", 150),
            ],
            &[],
        );

        assert_eq!(
            overview.income_by_source,
            vec![
                ("Pension".to_string(), Decimal::new(1350, 0)),
                ("Part-time work".to_string(), Decimal::new(300, 0)),
            ]
        );
        assert_eq!(overview.total_income, Decimal::new(1650, 0));
    }

    #[test]
    fn assumptions_fill_in_unrecorded_sources() {
        let overview = monthly_overview(
            at(2024, 6, 17),
            &IncomeAssumptions::household_defaults(),
            &[income("Pension", 1200)],
            &[],
        );

        assert_eq!(
            overview.income_by_source,
            vec![
                ("Pension".to_string(), Decimal::new(1200, 0)),
                ("Social Security".to_string(), Decimal::new(1900, 0)),
                ("401k/IRA".to_string(), Decimal::ZERO),
            ]
        );
        assert_eq!(overview.total_income, Decimal::new(3100, 0));
    }

    #[test]
    fn recorded_source_beats_its_assumption() {
        let overview = monthly_overview(
            at(2024, 6, 17),
            &IncomeAssumptions::household_defaults(),
            &[income("Social Security", 2100)],
            &[],
        );

        assert_eq!(
            overview.income_by_source[0],
            ("Social Security".to_string(), Decimal::new(2100, 0))
        );
        assert_eq!(overview.total_income, Decimal::new(2100, 0));
    }

    #[test]
    fn zero_recorded_total_counts_as_unreported() {
        let overview = monthly_overview(
            at(2024, 6, 17),
            &IncomeAssumptions::household_defaults(),
            &[income("Social Security", 0)],
            &[],
        );

        assert_eq!(
            overview.income_by_source[0],
            ("Social Security".to_string(), Decimal::new(1900, 0))
        );
    }

    #[test]
    fn assumption_table_is_overridable() {
        let assumptions = IncomeAssumptions::new(vec![IncomeAssumption {
            source: "Social Security".to_string(),
            amount: Decimal::new(2200, 0),
        }]);
        let overview = monthly_overview(at(2024, 6, 17), &assumptions, &[], &[]);

        assert_eq!(
            overview.income_by_source,
            vec![("Social Security".to_string(), Decimal::new(2200, 0))]
        );
    }

    #[test]
    fn spending_by_category_is_zero_filled_in_reporting_order() {
        let overview = monthly_overview(
            at(2024, 6, 17),
            &IncomeAssumptions::default(),
            &[],
            &[
                expense(ExpenseCategory::Groceries, 12050),
                expense(ExpenseCategory::Water, 4000),
                expense(ExpenseCategory::Groceries, 950),
            ],
        );

        let categories: Vec<ExpenseCategory> = overview
            .spending_by_category
            .iter()
            .map(|(category, _)| *category)
            .collect();
        assert_eq!(categories, ExpenseCategory::ALL.to_vec());

        let by_category: Vec<(ExpenseCategory, Decimal)> = overview
            .spending_by_category
            .iter()
            .filter(|(_, total)| !total.is_zero())
            .cloned()
            .collect();
        assert_eq!(
            by_category,
            vec![
                (ExpenseCategory::Water, Decimal::new(4000, 2)),
                (ExpenseCategory::Groceries, Decimal::new(13000, 2)),
            ]
        );
    }

    #[test]
    fn net_savings_is_income_minus_spending() {
        let overview = monthly_overview(
            at(2024, 6, 17),
            &IncomeAssumptions::household_defaults(),
            &[income("Pension", 1000)],
            &[expense(ExpenseCategory::Mortgage, 120000)],
        );

        // 1000 pension + 1900 assumed social security, minus 1200 mortgage.
        assert_eq!(overview.total_income, Decimal::new(2900, 0));
        assert_eq!(overview.total_spending, Decimal::new(120000, 2));
        assert_eq!(overview.net_savings, Decimal::new(1700, 0));
        assert_eq!(overview.month_label, "June 2024");
    }
}
