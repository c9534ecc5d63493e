//! Billing period keys.

use chrono::{DateTime, Utc};

/// Billing-month key (`"YYYY-MM"`, UTC) for the given instant.
pub fn billing_month(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

/// Billing-month key for the current instant.
pub fn current_billing_month() -> String {
    billing_month(Utc::now())
}
