//! crates/family_finance_core/src/due_id.rs
//!
//! Tagged origin for projected due items, plus the one place where it is
//! encoded to / decoded from the wire id format the frontend keys on.
//!
//! Wire format:
//!   - ad-hoc expense: the expense's own id, verbatim
//!   - one-time bill:  "recurring-<bill id>"
//!   - recurring occurrence: "recurring-<bill id>-<ISO-8601 occurrence>"
//!
//! The prefix, separator and ISO timestamp format are a contract with the
//! client, which maps a projected item back to its source bill for editing.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// Canonical textual length of a hyphenated UUID.
const UUID_LEN: usize = 36;

const RECURRING_PREFIX: &str = "recurring-";

/// Where a projected due item came from.
///
/// Projected occurrences have no row of their own, so their identity is
/// carried as a tagged value and only flattened to a string at the API
/// boundary. Both halves of the codec live here; nothing else in the
/// repository builds or inspects these strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueItemOrigin {
    /// A stored ad-hoc expense.
    Expense(Uuid),
    /// A one-time bill; its single occurrence is the bill's anchor date.
    OneTimeBill(Uuid),
    /// A projected occurrence of a recurring bill on a specific date.
    BillOccurrence(Uuid, DateTime<Utc>),
}

impl DueItemOrigin {
    /// Encodes the origin as the wire id the client expects.
    pub fn wire_id(&self) -> String {
        match self {
            DueItemOrigin::Expense(id) => id.to_string(),
            DueItemOrigin::OneTimeBill(bill_id) => {
                format!("{}{}", RECURRING_PREFIX, bill_id)
            }
            DueItemOrigin::BillOccurrence(bill_id, occurrence) => format!(
                "{}{}-{}",
                RECURRING_PREFIX,
                bill_id,
                occurrence.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
        }
    }

    /// Decodes a wire id back into its origin.
    ///
    /// UUIDs and ISO timestamps are both full of hyphens, so the split is
    /// positional: after the `recurring-` prefix the bill id occupies
    /// exactly [`UUID_LEN`] characters, and anything past the following
    /// separator is the occurrence timestamp.
    pub fn parse(wire: &str) -> Option<Self> {
        let Some(rest) = wire.strip_prefix(RECURRING_PREFIX) else {
            return Uuid::parse_str(wire).ok().map(DueItemOrigin::Expense);
        };

        if rest.len() == UUID_LEN {
            let bill_id = Uuid::parse_str(rest).ok()?;
            return Some(DueItemOrigin::OneTimeBill(bill_id));
        }

        let id_part = rest.get(..UUID_LEN)?;
        let bill_id = Uuid::parse_str(id_part).ok()?;
        let timestamp = rest.get(UUID_LEN..)?.strip_prefix('-')?;
        let occurrence = DateTime::parse_from_rfc3339(timestamp).ok()?;
        Some(DueItemOrigin::BillOccurrence(
            bill_id,
            occurrence.with_timezone(&Utc),
        ))
    }

    /// The id of the underlying stored record, whichever variant this is.
    pub fn source_id(&self) -> Uuid {
        match self {
            DueItemOrigin::Expense(id) => *id,
            DueItemOrigin::OneTimeBill(id) => *id,
            DueItemOrigin::BillOccurrence(id, _) => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bill_id() -> Uuid {
        // Second group is all digits, like the ISO year a naive parser
        // would latch onto.
        Uuid::parse_str("a1b2c3d4-2024-4a6b-8c0d-1e2f3a4b5c6d").unwrap()
    }

    #[test]
    fn expense_ids_pass_through_verbatim() {
        let id = Uuid::from_u128(7);
        let origin = DueItemOrigin::Expense(id);
        assert_eq!(origin.wire_id(), id.to_string());
        assert_eq!(DueItemOrigin::parse(&origin.wire_id()), Some(origin));
    }

    #[test]
    fn one_time_bill_encodes_prefix_only() {
        let origin = DueItemOrigin::OneTimeBill(bill_id());
        let wire = origin.wire_id();
        assert_eq!(wire, format!("recurring-{}", bill_id()));
        assert_eq!(DueItemOrigin::parse(&wire), Some(origin));
    }

    #[test]
    fn occurrence_encodes_iso_millis_with_z() {
        let at = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap();
        let origin = DueItemOrigin::BillOccurrence(bill_id(), at);
        assert_eq!(
            origin.wire_id(),
            format!("recurring-{}-2024-06-15T09:30:00.000Z", bill_id())
        );
    }

    #[test]
    fn occurrence_survives_round_trip_despite_hyphens() {
        // The bill id contains a digits-only group and the timestamp adds
        // two more hyphens; the positional split must not be fooled.
        let at = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let origin = DueItemOrigin::BillOccurrence(bill_id(), at);
        assert_eq!(DueItemOrigin::parse(&origin.wire_id()), Some(origin));
    }

    #[test]
    fn source_id_ignores_the_variant() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(DueItemOrigin::Expense(bill_id()).source_id(), bill_id());
        assert_eq!(
            DueItemOrigin::BillOccurrence(bill_id(), at).source_id(),
            bill_id()
        );
    }

    #[test]
    fn malformed_ids_parse_to_none() {
        assert_eq!(DueItemOrigin::parse("recurring-not-a-uuid"), None);
        assert_eq!(
            DueItemOrigin::parse(&format!("recurring-{}-not-a-date", bill_id())),
            None
        );
        assert_eq!(DueItemOrigin::parse("plainly-wrong"), None);
    }
}
