//! services/api/src/adapters/clock.rs
//!
//! The wall-clock implementation of the core `Clock` port. Tests substitute
//! a fixed clock so projections stay deterministic.

use chrono::{DateTime, Utc};
use family_finance_core::ports::Clock;

#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
