//! Daily rate tiers and settlement arithmetic.
//!
//! Day counts use calendar dates only; the time of day never changes a
//! charge.

use crate::domain::types::Money;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub const SHORT_PLAN_MAX_DAYS: i64 = 7;
pub const MEDIUM_PLAN_MAX_DAYS: i64 = 15;

pub const SHORT_PLAN_DAILY_RATE: Decimal = dec!(30.00);
pub const MEDIUM_PLAN_DAILY_RATE: Decimal = dec!(28.00);
pub const LONG_PLAN_DAILY_RATE: Decimal = dec!(22.00);

pub const LATE_FEE_PER_DAY: Decimal = dec!(50.00);
pub const SHORT_PLAN_EARLY_RETURN_PENALTY: Decimal = dec!(0.20);
pub const LONG_PLAN_EARLY_RETURN_PENALTY: Decimal = dec!(0.40);

/// Whole calendar days between the UTC dates of two instants
pub fn calendar_days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    days_between_dates(from.date_naive(), to.date_naive())
}

fn days_between_dates(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Rate fixed at creation from the planned length
pub fn daily_rate_for_plan(plan_days: i64) -> Money {
    let rate = if plan_days <= SHORT_PLAN_MAX_DAYS {
        SHORT_PLAN_DAILY_RATE
    } else if plan_days <= MEDIUM_PLAN_MAX_DAYS {
        MEDIUM_PLAN_DAILY_RATE
    } else {
        LONG_PLAN_DAILY_RATE
    };
    Money::from_decimal(rate)
}

pub fn early_return_penalty_rate(expected_days: i64) -> Decimal {
    if expected_days <= SHORT_PLAN_MAX_DAYS {
        SHORT_PLAN_EARLY_RETURN_PENALTY
    } else {
        LONG_PLAN_EARLY_RETURN_PENALTY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    Early,
    OnTime,
    Late,
}

/// Breakdown of the final charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub kind: ReturnKind,
    pub expected_days: i64,
    pub actual_days: i64,
    pub daily_rate: Money,
    pub base_cost: Money,
    pub early_return_penalty: Money,
    pub late_fee: Money,
    pub total: Money,
}

impl Settlement {
    /// Callers guarantee `returned_at >= started_at`.
    pub fn compute(
        started_at: DateTime<Utc>,
        expected_end: DateTime<Utc>,
        returned_at: DateTime<Utc>,
        daily_rate: Money,
    ) -> Self {
        let expected_days = calendar_days_between(started_at, expected_end);
        let actual_days = calendar_days_between(started_at, returned_at);

        if actual_days < expected_days {
            let remaining_days = expected_days - actual_days;
            let base_cost = daily_rate.times_days(actual_days);
            let penalty = daily_rate
                .times_days(remaining_days)
                .multiply(early_return_penalty_rate(expected_days));

            Self {
                kind: ReturnKind::Early,
                expected_days,
                actual_days,
                daily_rate,
                base_cost,
                early_return_penalty: penalty,
                late_fee: Money::zero(),
                total: base_cost.add(penalty),
            }
        } else {
            let late_days = actual_days - expected_days;
            let base_cost = daily_rate.times_days(expected_days);
            let late_fee = Money::from_decimal(LATE_FEE_PER_DAY).times_days(late_days);

            Self {
                kind: if late_days > 0 {
                    ReturnKind::Late
                } else {
                    ReturnKind::OnTime
                },
                expected_days,
                actual_days,
                daily_rate,
                base_cost,
                early_return_penalty: Money::zero(),
                late_fee,
                total: base_cost.add(late_fee),
            }
        }
    }
}
