//! Billing arithmetic for the subscription state machine
//!
//! Pure date/price helpers; the SQL transitions live in the subscription and
//! admin handlers.

use chrono::{Months, NaiveDate};

use crate::models::{BillingCycle, SubscriptionPlan};

/// Cycle end date anchored at `from` (approval time for verifications,
/// previous renewal date for renewals).
pub fn cycle_end(from: NaiveDate, cycle: BillingCycle) -> NaiveDate {
    from + Months::new(cycle.months())
}

/// Price of one billing cycle for a plan. Semi-annual and annual carry a
/// small discount over stacked monthly payments.
pub fn cycle_price(plan: SubscriptionPlan, cycle: BillingCycle) -> f64 {
    let monthly = plan.monthly_price();
    match cycle {
        BillingCycle::Monthly => monthly,
        BillingCycle::SemiAnnual => monthly * 6.0 * 0.95,
        BillingCycle::Annual => monthly * 12.0 * 0.90,
    }
}

/// Renewal anchor: advance from the previous renewal date when one exists,
/// never from today, so late renewals do not drift the billing day.
pub fn next_renewal_from(previous: Option<NaiveDate>, today: NaiveDate, cycle: BillingCycle) -> NaiveDate {
    cycle_end(previous.unwrap_or(today), cycle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn monthly_cycle_adds_one_month() {
        assert_eq!(cycle_end(d(2026, 1, 15), BillingCycle::Monthly), d(2026, 2, 15));
    }

    #[test]
    fn semi_annual_cycle_adds_six_months() {
        assert_eq!(cycle_end(d(2026, 1, 15), BillingCycle::SemiAnnual), d(2026, 7, 15));
    }

    #[test]
    fn annual_cycle_adds_one_year() {
        assert_eq!(cycle_end(d(2026, 3, 10), BillingCycle::Annual), d(2027, 3, 10));
    }

    #[test]
    fn month_end_clamps_instead_of_overflowing() {
        // Jan 31 + 1 month lands on Feb 28/29, not Mar 2
        assert_eq!(cycle_end(d(2026, 1, 31), BillingCycle::Monthly), d(2026, 2, 28));
    }

    #[test]
    fn renewal_anchors_at_previous_renewal_date() {
        let previous = Some(d(2026, 1, 1));
        let today = d(2026, 2, 20); // renewing late
        assert_eq!(
            next_renewal_from(previous, today, BillingCycle::Monthly),
            d(2026, 2, 1)
        );
    }

    #[test]
    fn first_renewal_anchors_at_today() {
        let today = d(2026, 2, 20);
        assert_eq!(
            next_renewal_from(None, today, BillingCycle::Annual),
            d(2027, 2, 20)
        );
    }

    #[test]
    fn annual_price_carries_discount() {
        let monthly = cycle_price(SubscriptionPlan::Basic, BillingCycle::Monthly);
        let annual = cycle_price(SubscriptionPlan::Basic, BillingCycle::Annual);
        assert!(annual < monthly * 12.0);
        assert_eq!(annual, monthly * 12.0 * 0.90);
    }
}
