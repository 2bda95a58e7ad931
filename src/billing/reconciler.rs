//! Fee ledger reconciliation.
//!
//! Pure functions only; every mutation site (record payment, cancel payment,
//! administrative edits, fee creation) computes the next ledger state here
//! and writes it inside its own database transaction. Status is never stored
//! independently of these rules.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::models::{FeeStatus, MonthlyFee};
use crate::error::BillingError;

/// The fields of a monthly fee that participate in reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSnapshot {
    pub amount: Decimal,
    pub amount_paid: Decimal,
    pub discount_amount: Decimal,
    pub late_fee_amount: Decimal,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub status: FeeStatus,
}

impl From<&MonthlyFee> for FeeSnapshot {
    fn from(fee: &MonthlyFee) -> Self {
        FeeSnapshot {
            amount: fee.amount,
            amount_paid: fee.amount_paid,
            discount_amount: fee.discount_amount,
            late_fee_amount: fee.late_fee_amount,
            due_date: fee.due_date,
            paid_date: fee.paid_date,
            status: fee.status,
        }
    }
}

/// The reconciled state to persist after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub amount_paid: Decimal,
    pub status: FeeStatus,
    pub paid_date: Option<NaiveDate>,
}

impl FeeSnapshot {
    /// Authoritative pending balance:
    /// `amount - amount_paid + discount_amount - late_fee_amount`.
    ///
    /// The adjustment signs are a product rule carried over verbatim; do not
    /// rearrange them.
    pub fn remaining(&self) -> Decimal {
        self.amount - self.amount_paid + self.discount_amount - self.late_fee_amount
    }

    /// Largest payment the fee can accept. Bounded by the pending balance
    /// and by `amount - amount_paid` so that `amount_paid` can never exceed
    /// `amount`, whichever is stricter.
    pub fn max_payment(&self) -> Decimal {
        self.remaining().min(self.amount - self.amount_paid)
    }

    /// Derive the status from the ledger fields. First match wins.
    ///
    /// `exempt` is a manually-set terminal state: once a fee is exempt the
    /// automatic derivation leaves it alone.
    pub fn derive_status(&self, today: NaiveDate) -> FeeStatus {
        if self.status == FeeStatus::Exempt {
            FeeStatus::Exempt
        } else if self.remaining() <= Decimal::ZERO {
            FeeStatus::Paid
        } else if today > self.due_date {
            FeeStatus::Overdue
        } else if self.amount_paid > Decimal::ZERO {
            FeeStatus::Partial
        } else {
            FeeStatus::Pending
        }
    }
}

/// Check a proposed payment against the ledger without mutating anything.
pub fn validate_payment(fee: &FeeSnapshot, amount: Decimal) -> Result<(), BillingError> {
    if amount <= Decimal::ZERO {
        return Err(BillingError::NonPositiveAmount(amount));
    }

    let max = fee.max_payment();
    if amount > max {
        return Err(BillingError::Overdraw {
            requested: amount,
            remaining: max,
        });
    }

    Ok(())
}

/// Apply an accepted payment: credit the amount, rederive the status and
/// stamp `paid_date` with the payment's date only when the fee becomes
/// fully paid.
pub fn apply_payment(
    fee: &FeeSnapshot,
    amount: Decimal,
    payment_date: NaiveDate,
    today: NaiveDate,
) -> Result<Reconciled, BillingError> {
    validate_payment(fee, amount)?;

    let next = FeeSnapshot {
        amount_paid: fee.amount_paid + amount,
        ..*fee
    };
    let status = next.derive_status(today);

    Ok(Reconciled {
        amount_paid: next.amount_paid,
        status,
        paid_date: if status == FeeStatus::Paid {
            Some(payment_date)
        } else {
            None
        },
    })
}

/// Reconcile the fee against a recomputed effective total, as after a
/// payment cancellation or an administrative `amount_paid` edit. The zero
/// case needs no special handling: zero paid derives to pending or overdue
/// through the ordered rules.
pub fn reconcile_total(
    fee: &FeeSnapshot,
    effective_total: Decimal,
    today: NaiveDate,
) -> Result<Reconciled, BillingError> {
    if effective_total < Decimal::ZERO || effective_total > fee.amount {
        return Err(BillingError::AmountPaidExceedsTotal {
            amount_paid: effective_total,
            amount: fee.amount,
        });
    }

    let next = FeeSnapshot {
        amount_paid: effective_total,
        ..*fee
    };
    let status = next.derive_status(today);

    Ok(Reconciled {
        amount_paid: effective_total,
        status,
        paid_date: if status == FeeStatus::Paid {
            fee.paid_date.or(Some(today))
        } else {
            None
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot(amount: Decimal, paid: Decimal) -> FeeSnapshot {
        FeeSnapshot {
            amount,
            amount_paid: paid,
            discount_amount: Decimal::ZERO,
            late_fee_amount: Decimal::ZERO,
            due_date: day(2024, 6, 1),
            paid_date: None,
            status: FeeStatus::Pending,
        }
    }

    const BEFORE_DUE: NaiveDate = match NaiveDate::from_ymd_opt(2024, 5, 15) {
        Some(d) => d,
        None => panic!(),
    };
    const AFTER_DUE: NaiveDate = match NaiveDate::from_ymd_opt(2024, 6, 15) {
        Some(d) => d,
        None => panic!(),
    };

    #[test]
    fn zero_remaining_always_derives_paid() {
        let fee = snapshot(dec!(1000), dec!(1000));
        assert_eq!(fee.derive_status(BEFORE_DUE), FeeStatus::Paid);
        // Paid wins over overdue even past the due date.
        assert_eq!(fee.derive_status(AFTER_DUE), FeeStatus::Paid);
    }

    #[test]
    fn overdue_wins_over_partial() {
        let fee = snapshot(dec!(1000), dec!(600));
        assert_eq!(fee.derive_status(AFTER_DUE), FeeStatus::Overdue);
        assert_eq!(fee.derive_status(BEFORE_DUE), FeeStatus::Partial);
    }

    #[test]
    fn past_due_zero_paid_is_overdue() {
        let fee = snapshot(dec!(1000), dec!(0));
        assert_eq!(fee.derive_status(AFTER_DUE), FeeStatus::Overdue);
        assert_eq!(fee.derive_status(BEFORE_DUE), FeeStatus::Pending);
    }

    #[test]
    fn exempt_is_terminal() {
        let fee = FeeSnapshot {
            status: FeeStatus::Exempt,
            ..snapshot(dec!(1000), dec!(1000))
        };
        assert_eq!(fee.derive_status(BEFORE_DUE), FeeStatus::Exempt);
        assert_eq!(fee.derive_status(AFTER_DUE), FeeStatus::Exempt);

        let next = apply_payment(
            &FeeSnapshot {
                status: FeeStatus::Exempt,
                ..snapshot(dec!(1000), dec!(0))
            },
            dec!(100),
            BEFORE_DUE,
            BEFORE_DUE,
        )
        .unwrap();
        assert_eq!(next.status, FeeStatus::Exempt);
    }

    #[test]
    fn partial_then_full_payment_scenario() {
        let fee = snapshot(dec!(1000), dec!(0));

        let first = apply_payment(&fee, dec!(600), BEFORE_DUE, BEFORE_DUE).unwrap();
        assert_eq!(first.status, FeeStatus::Partial);
        assert_eq!(first.amount_paid, dec!(600));
        assert_eq!(first.paid_date, None);

        let after_first = FeeSnapshot {
            amount_paid: first.amount_paid,
            status: first.status,
            ..fee
        };
        assert_eq!(after_first.remaining(), dec!(400));

        let second = apply_payment(&after_first, dec!(400), BEFORE_DUE, BEFORE_DUE).unwrap();
        assert_eq!(second.status, FeeStatus::Paid);
        assert_eq!(second.paid_date, Some(BEFORE_DUE));
        let settled = FeeSnapshot {
            amount_paid: second.amount_paid,
            status: second.status,
            ..fee
        };
        assert!(settled.remaining() <= Decimal::ZERO);
    }

    #[test]
    fn overdraw_is_rejected() {
        let fee = snapshot(dec!(1000), dec!(0));
        let err = apply_payment(&fee, dec!(1200), BEFORE_DUE, BEFORE_DUE).unwrap_err();
        assert!(matches!(err, BillingError::Overdraw { .. }));

        // Accepted payments never push amount_paid past amount.
        let almost = snapshot(dec!(1000), dec!(999));
        assert!(validate_payment(&almost, dec!(1)).is_ok());
        assert!(validate_payment(&almost, dec!(2)).is_err());
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let fee = snapshot(dec!(1000), dec!(0));
        assert!(matches!(
            validate_payment(&fee, Decimal::ZERO),
            Err(BillingError::NonPositiveAmount(_))
        ));
        assert!(matches!(
            validate_payment(&fee, dec!(-5)),
            Err(BillingError::NonPositiveAmount(_))
        ));
    }

    #[test]
    fn adjustments_tighten_the_payment_bound() {
        // remaining = amount - paid + discount - late_fee
        let fee = FeeSnapshot {
            discount_amount: dec!(0),
            late_fee_amount: dec!(100),
            ..snapshot(dec!(1000), dec!(0))
        };
        // Late fee shrinks remaining below amount - paid, so it binds.
        assert_eq!(fee.remaining(), dec!(900));
        assert_eq!(fee.max_payment(), dec!(900));
        assert!(validate_payment(&fee, dec!(950)).is_err());

        // Discount raises remaining above amount - paid; the amount-paid
        // ceiling binds instead.
        let fee = FeeSnapshot {
            discount_amount: dec!(100),
            late_fee_amount: dec!(0),
            ..snapshot(dec!(1000), dec!(0))
        };
        assert_eq!(fee.remaining(), dec!(1100));
        assert_eq!(fee.max_payment(), dec!(1000));
        assert!(validate_payment(&fee, dec!(1050)).is_err());
        assert!(validate_payment(&fee, dec!(1000)).is_ok());
    }

    #[test]
    fn cancelling_sole_payment_resets_to_pending() {
        let fee = FeeSnapshot {
            status: FeeStatus::Paid,
            paid_date: Some(BEFORE_DUE),
            ..snapshot(dec!(1000), dec!(1000))
        };

        let next = reconcile_total(&fee, Decimal::ZERO, BEFORE_DUE).unwrap();
        assert_eq!(next.amount_paid, Decimal::ZERO);
        assert_eq!(next.status, FeeStatus::Pending);
        assert_eq!(next.paid_date, None);
    }

    #[test]
    fn cancelling_past_due_derives_overdue_not_pending() {
        let fee = FeeSnapshot {
            status: FeeStatus::Paid,
            paid_date: Some(BEFORE_DUE),
            ..snapshot(dec!(1000), dec!(1000))
        };

        let next = reconcile_total(&fee, Decimal::ZERO, AFTER_DUE).unwrap();
        assert_eq!(next.status, FeeStatus::Overdue);
        assert_eq!(next.paid_date, None);
    }

    #[test]
    fn reconcile_rejects_totals_above_amount() {
        let fee = snapshot(dec!(1000), dec!(0));
        assert!(matches!(
            reconcile_total(&fee, dec!(1001), BEFORE_DUE),
            Err(BillingError::AmountPaidExceedsTotal { .. })
        ));
        assert!(matches!(
            reconcile_total(&fee, dec!(-1), BEFORE_DUE),
            Err(BillingError::AmountPaidExceedsTotal { .. })
        ));
    }

    #[test]
    fn reconcile_keeps_paid_date_while_still_paid() {
        let fee = FeeSnapshot {
            status: FeeStatus::Paid,
            paid_date: Some(BEFORE_DUE),
            ..snapshot(dec!(1000), dec!(1000))
        };

        // Two payments, one cancelled, the other still covers the fee.
        let next = reconcile_total(&fee, dec!(1000), AFTER_DUE).unwrap();
        assert_eq!(next.status, FeeStatus::Paid);
        assert_eq!(next.paid_date, Some(BEFORE_DUE));
    }
}
