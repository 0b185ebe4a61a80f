//! Drip-delay arithmetic.
//!
//! A delay turns `granted_at` into the instant access opens. Days and
//! weeks are fixed-width offsets; months are calendar months, preserving
//! the day of month and clamping at month-end (Jan 31 + 1 month is the
//! last day of February).

use chrono::{DateTime, Days, Months, Utc};
use serde::{Deserialize, Serialize};

/// Unit of a drip delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "delay_unit", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    Days,
    Weeks,
    Months,
}

/// A deferred-availability window attached to a grant or override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDelay {
    pub value: u32,
    pub unit: DelayUnit,
}

impl AccessDelay {
    /// The instant access opens, anchored to `granted_at`.
    pub fn available_at(self, granted_at: DateTime<Utc>) -> DateTime<Utc> {
        let shifted = match self.unit {
            DelayUnit::Days => granted_at.checked_add_days(Days::new(u64::from(self.value))),
            DelayUnit::Weeks => granted_at.checked_add_days(Days::new(7 * u64::from(self.value))),
            DelayUnit::Months => granted_at.checked_add_months(Months::new(self.value)),
        };
        // Out-of-range dates only happen near the end of representable
        // time; saturate rather than wrap.
        shifted.unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
