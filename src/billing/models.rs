use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use std::fmt;
use uuid::Uuid;

use crate::error::BillingError;

/// Derived state of a billing obligation. `Exempt` is the only manually-set
/// terminal state; every other value is recomputed on mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "fee_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FeeStatus {
    Pending,
    Paid,
    Overdue,
    Partial,
    Exempt,
}

impl FeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeStatus::Pending => "pending",
            FeeStatus::Paid => "paid",
            FeeStatus::Overdue => "overdue",
            FeeStatus::Partial => "partial",
            FeeStatus::Exempt => "exempt",
        }
    }
}

impl fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Check,
    Card,
    Other,
}

/// Billing period in `YYYY-MM` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    raw: String,
    first_day: NaiveDate,
}

impl Period {
    pub fn parse(s: &str) -> Result<Self, BillingError> {
        let invalid = || BillingError::InvalidPeriod(s.to_string());

        let bytes = s.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(invalid());
        }

        let year: i32 = s[..4].parse().map_err(|_| invalid())?;
        let month: u32 = s[5..7].parse().map_err(|_| invalid())?;
        let first_day = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;

        Ok(Period {
            raw: s.to_string(),
            first_day,
        })
    }

    /// First day of the period, used as the default due date.
    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Monthly fee entity - one billing obligation per (community, house, period)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MonthlyFee {
    pub id: Uuid,
    pub community_id: Uuid,
    pub user_id: Uuid,
    pub house_id: Uuid,
    pub period: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_paid: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub late_fee_amount: Decimal,

    pub status: FeeStatus,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,

    pub payment_method: Option<PaymentMethod>,
    pub receipt_number: Option<String>,
    pub notes: Option<String>,
    pub is_recurring: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MonthlyFee {
    /// Authoritative pending balance. Discounts are added and late fees
    /// subtracted; the sign convention is inherited from the product rules
    /// and must not be rearranged.
    pub fn remaining(&self) -> Decimal {
        self.amount - self.amount_paid + self.discount_amount - self.late_fee_amount
    }

    pub fn is_fully_paid(&self) -> bool {
        self.remaining() <= Decimal::ZERO
    }
}

/// Payment entity - an application of money against exactly one monthly fee.
/// Soft-cancelled only; `is_cancelled` transitions false -> true exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub monthly_fee_id: Uuid,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub receipt_number: Option<String>,
    pub notes: Option<String>,
    pub paid_date: NaiveDate,

    pub is_cancelled: bool,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,

    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Cancellation is one-way; a cancelled payment is rejected here and
    /// never re-enters the effective set.
    pub fn ensure_active(&self) -> Result<(), BillingError> {
        if self.is_cancelled {
            Err(BillingError::AlreadyCancelled(self.id))
        } else {
            Ok(())
        }
    }
}

/// Per-status aggregation row for the financial summary.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FinancialSummaryRow {
    pub status: FeeStatus,
    pub fee_count: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_paid: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_discounts: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_late_fees: Decimal,
}

/// Active vs cancelled payment totals for a single fee.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub fee_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_paid: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_cancelled: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub remaining_amount: Decimal,
    pub active_payment_count: i64,
    pub cancelled_payment_count: i64,
    pub status: FeeStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fee(amount: Decimal, paid: Decimal, discount: Decimal, late_fee: Decimal) -> MonthlyFee {
        MonthlyFee {
            id: Uuid::new_v4(),
            community_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            house_id: Uuid::new_v4(),
            period: "2024-01".to_string(),
            amount,
            amount_paid: paid,
            discount_amount: discount,
            late_fee_amount: late_fee,
            status: FeeStatus::Pending,
            due_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            paid_date: None,
            payment_method: None,
            receipt_number: None,
            notes: None,
            is_recurring: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn remaining_preserves_adjustment_sign_convention() {
        let f = fee(dec!(1000), dec!(200), dec!(50), dec!(30));
        assert_eq!(f.remaining(), dec!(820));
    }

    #[test]
    fn fully_paid_at_zero_or_below() {
        assert!(fee(dec!(1000), dec!(1000), dec!(0), dec!(0)).is_fully_paid());
        assert!(fee(dec!(1000), dec!(950), dec!(0), dec!(50)).is_fully_paid());
        assert!(!fee(dec!(1000), dec!(999), dec!(0), dec!(0)).is_fully_paid());
    }

    fn payment(is_cancelled: bool) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            monthly_fee_id: Uuid::new_v4(),
            amount: dec!(500),
            payment_method: PaymentMethod::Cash,
            receipt_number: None,
            notes: None,
            paid_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            is_cancelled,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn cancellation_is_one_way() {
        assert!(payment(false).ensure_active().is_ok());
        assert!(matches!(
            payment(true).ensure_active(),
            Err(BillingError::AlreadyCancelled(_))
        ));
    }

    #[test]
    fn period_parsing() {
        let p = Period::parse("2024-02").unwrap();
        assert_eq!(p.as_str(), "2024-02");
        assert_eq!(p.first_day(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());

        assert!(Period::parse("2024-13").is_err());
        assert!(Period::parse("2024-00").is_err());
        assert!(Period::parse("202402").is_err());
        assert!(Period::parse("2024-2").is_err());
        assert!(Period::parse("abcd-ef").is_err());
    }
}
