use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use super::models::{
    FeeStatus, FinancialSummaryRow, MonthlyFee, Payment, PaymentMethod, PaymentSummary, Period,
};
use super::reconciler::{self, FeeSnapshot};
use crate::error::{AppResult, BillingError};

const FEE_COLUMNS: &str = "id, community_id, user_id, house_id, period, amount, amount_paid, \
     discount_amount, late_fee_amount, status, due_date, paid_date, payment_method, \
     receipt_number, notes, is_recurring, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, monthly_fee_id, amount, payment_method, receipt_number, \
     notes, paid_date, is_cancelled, cancelled_at, cancelled_by, cancellation_reason, \
     created_by, created_at";

/// A new billing obligation, before reconciliation.
#[derive(Debug, Clone)]
pub struct NewFee {
    pub community_id: Uuid,
    pub user_id: Uuid,
    pub house_id: Uuid,
    pub period: Period,
    pub amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub discount_amount: Decimal,
    pub late_fee_amount: Decimal,
    pub notes: Option<String>,
    pub is_recurring: bool,
}

/// A payment to apply against a fee.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub receipt_number: Option<String>,
    pub notes: Option<String>,
    pub paid_date: Option<NaiveDate>,
}

/// Whitelisted administrative edits. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct FeeUpdate {
    pub amount: Option<Decimal>,
    pub amount_paid: Option<Decimal>,
    pub status: Option<FeeStatus>,
    pub due_date: Option<NaiveDate>,
    pub paid_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    pub receipt_number: Option<String>,
    pub notes: Option<String>,
    pub discount_amount: Option<Decimal>,
    pub late_fee_amount: Option<Decimal>,
    pub is_recurring: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct FeeFilter {
    pub community_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub status: Option<FeeStatus>,
    pub period: Option<String>,
}

/// Billing repository - the source of truth for fees and payments.
///
/// Every mutation runs in a single transaction with the fee row locked
/// `FOR UPDATE`, so concurrent payments against the same fee serialize at
/// the database and the overdraw check always sees the latest total.
pub struct BillingRepository {
    pub pool: PgPool,
}

impl BillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ========== FEE OPERATIONS ==========

    pub async fn create_fee(&self, new: NewFee) -> AppResult<MonthlyFee> {
        let mut tx = self.pool.begin().await?;

        let community_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM communities WHERE id = $1)",
        )
        .bind(new.community_id)
        .fetch_one(&mut *tx)
        .await?;
        if !community_exists {
            return Err(BillingError::CommunityNotFound(new.community_id).into());
        }

        let user_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(new.user_id)
                .fetch_one(&mut *tx)
                .await?;
        if !user_exists {
            return Err(BillingError::UserNotFound(new.user_id).into());
        }

        let house_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM houses WHERE id = $1 AND community_id = $2)",
        )
        .bind(new.house_id)
        .bind(new.community_id)
        .fetch_one(&mut *tx)
        .await?;
        if !house_exists {
            return Err(BillingError::HouseNotFound(new.house_id).into());
        }

        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM monthly_fees \
             WHERE community_id = $1 AND house_id = $2 AND period = $3)",
        )
        .bind(new.community_id)
        .bind(new.house_id)
        .bind(new.period.as_str())
        .fetch_one(&mut *tx)
        .await?;
        if duplicate {
            return Err(BillingError::DuplicateFee {
                house_id: new.house_id,
                period: new.period.to_string(),
            }
            .into());
        }

        let due_date = new.due_date.unwrap_or_else(|| new.period.first_day());
        let snapshot = FeeSnapshot {
            amount: new.amount,
            amount_paid: Decimal::ZERO,
            discount_amount: new.discount_amount,
            late_fee_amount: new.late_fee_amount,
            due_date,
            paid_date: None,
            status: FeeStatus::Pending,
        };
        let status = snapshot.derive_status(Utc::now().date_naive());

        let fee = sqlx::query_as::<_, MonthlyFee>(&format!(
            "INSERT INTO monthly_fees \
                 (community_id, user_id, house_id, period, amount, discount_amount, \
                  late_fee_amount, status, due_date, notes, is_recurring) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {FEE_COLUMNS}"
        ))
        .bind(new.community_id)
        .bind(new.user_id)
        .bind(new.house_id)
        .bind(new.period.as_str())
        .bind(new.amount)
        .bind(new.discount_amount)
        .bind(new.late_fee_amount)
        .bind(status)
        .bind(due_date)
        .bind(new.notes)
        .bind(new.is_recurring)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(fee_id = %fee.id, period = %fee.period, amount = %fee.amount, "monthly fee created");
        Ok(fee)
    }

    pub async fn get_fee(&self, fee_id: Uuid) -> AppResult<MonthlyFee> {
        sqlx::query_as::<_, MonthlyFee>(&format!(
            "SELECT {FEE_COLUMNS} FROM monthly_fees WHERE id = $1"
        ))
        .bind(fee_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| BillingError::FeeNotFound(fee_id).into())
    }

    pub async fn list_fees(
        &self,
        filter: &FeeFilter,
        page: i64,
        limit: i64,
        sort_by: &str,
        sort_desc: bool,
    ) -> AppResult<(Vec<MonthlyFee>, i64)> {
        // Sort column comes from a whitelist, never from raw input.
        let order_col = match sort_by {
            "due_date" => "due_date",
            "amount" => "amount",
            "status" => "status",
            "created_at" => "created_at",
            _ => "period",
        };
        let direction = if sort_desc { "DESC" } else { "ASC" };

        let fees = sqlx::query_as::<_, MonthlyFee>(&format!(
            "SELECT {FEE_COLUMNS} FROM monthly_fees \
             WHERE ($1::uuid IS NULL OR community_id = $1) \
               AND ($2::uuid IS NULL OR user_id = $2) \
               AND ($3::fee_status IS NULL OR status = $3) \
               AND ($4::text IS NULL OR period = $4) \
             ORDER BY {order_col} {direction}, due_date ASC \
             LIMIT $5 OFFSET $6"
        ))
        .bind(filter.community_id)
        .bind(filter.user_id)
        .bind(filter.status)
        .bind(filter.period.as_deref())
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM monthly_fees \
             WHERE ($1::uuid IS NULL OR community_id = $1) \
               AND ($2::uuid IS NULL OR user_id = $2) \
               AND ($3::fee_status IS NULL OR status = $3) \
               AND ($4::text IS NULL OR period = $4)",
        )
        .bind(filter.community_id)
        .bind(filter.user_id)
        .bind(filter.status)
        .bind(filter.period.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok((fees, total))
    }

    pub async fn fees_by_user(&self, user_id: Uuid, filter: &FeeFilter) -> AppResult<Vec<MonthlyFee>> {
        let fees = sqlx::query_as::<_, MonthlyFee>(&format!(
            "SELECT {FEE_COLUMNS} FROM monthly_fees \
             WHERE user_id = $1 \
               AND ($2::uuid IS NULL OR community_id = $2) \
               AND ($3::fee_status IS NULL OR status = $3) \
               AND ($4::text IS NULL OR period = $4) \
             ORDER BY period DESC, due_date ASC",
        ))
        .bind(user_id)
        .bind(filter.community_id)
        .bind(filter.status)
        .bind(filter.period.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(fees)
    }

    pub async fn fees_by_community(
        &self,
        community_id: Uuid,
        filter: &FeeFilter,
    ) -> AppResult<Vec<MonthlyFee>> {
        let fees = sqlx::query_as::<_, MonthlyFee>(&format!(
            "SELECT {FEE_COLUMNS} FROM monthly_fees \
             WHERE community_id = $1 \
               AND ($2::uuid IS NULL OR user_id = $2) \
               AND ($3::fee_status IS NULL OR status = $3) \
               AND ($4::text IS NULL OR period = $4) \
             ORDER BY period DESC, due_date ASC",
        ))
        .bind(community_id)
        .bind(filter.user_id)
        .bind(filter.status)
        .bind(filter.period.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(fees)
    }

    pub async fn update_fee(&self, fee_id: Uuid, update: FeeUpdate) -> AppResult<MonthlyFee> {
        let mut tx = self.pool.begin().await?;
        let fee = Self::lock_fee(&mut tx, fee_id).await?;

        let snapshot = FeeSnapshot {
            amount: update.amount.unwrap_or(fee.amount),
            amount_paid: fee.amount_paid,
            discount_amount: update.discount_amount.unwrap_or(fee.discount_amount),
            late_fee_amount: update.late_fee_amount.unwrap_or(fee.late_fee_amount),
            due_date: update.due_date.unwrap_or(fee.due_date),
            paid_date: update.paid_date.or(fee.paid_date),
            status: update.status.unwrap_or(fee.status),
        };
        let new_total = update.amount_paid.unwrap_or(fee.amount_paid);
        let next = reconciler::reconcile_total(&snapshot, new_total, Utc::now().date_naive())?;

        let fee = sqlx::query_as::<_, MonthlyFee>(&format!(
            "UPDATE monthly_fees SET \
                 amount = $2, amount_paid = $3, discount_amount = $4, late_fee_amount = $5, \
                 status = $6, due_date = $7, paid_date = $8, \
                 payment_method = COALESCE($9, payment_method), \
                 receipt_number = COALESCE($10, receipt_number), \
                 notes = COALESCE($11, notes), \
                 is_recurring = $12, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {FEE_COLUMNS}"
        ))
        .bind(fee_id)
        .bind(snapshot.amount)
        .bind(next.amount_paid)
        .bind(snapshot.discount_amount)
        .bind(snapshot.late_fee_amount)
        .bind(next.status)
        .bind(snapshot.due_date)
        .bind(next.paid_date)
        .bind(update.payment_method)
        .bind(update.receipt_number)
        .bind(update.notes)
        .bind(update.is_recurring.unwrap_or(fee.is_recurring))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(fee_id = %fee.id, status = %fee.status, "monthly fee updated");
        Ok(fee)
    }

    /// Hard delete, guarded: a fee with any payment record (cancelled or
    /// not) or a non-zero paid amount is never deleted.
    pub async fn delete_fee(&self, fee_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let fee = Self::lock_fee(&mut tx, fee_id).await?;

        let payment_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM payments WHERE monthly_fee_id = $1",
        )
        .bind(fee_id)
        .fetch_one(&mut *tx)
        .await?;

        if payment_count > 0 || fee.amount_paid > Decimal::ZERO {
            return Err(BillingError::HasPayments(fee_id).into());
        }

        sqlx::query("DELETE FROM monthly_fees WHERE id = $1")
            .bind(fee_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(fee_id = %fee_id, "monthly fee deleted");
        Ok(())
    }

    // ========== PAYMENT OPERATIONS ==========

    /// Record a payment against a fee. One transaction: lock the fee,
    /// validate against the current total, insert the payment record and
    /// write the reconciled fee state.
    pub async fn record_payment(
        &self,
        fee_id: Uuid,
        new: NewPayment,
        created_by: Uuid,
    ) -> AppResult<(Payment, MonthlyFee)> {
        let mut tx = self.pool.begin().await?;
        let fee = Self::lock_fee(&mut tx, fee_id).await?;

        let today = Utc::now().date_naive();
        let paid_date = new.paid_date.unwrap_or(today);
        let next =
            reconciler::apply_payment(&FeeSnapshot::from(&fee), new.amount, paid_date, today)?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "INSERT INTO payments \
                 (monthly_fee_id, amount, payment_method, receipt_number, notes, paid_date, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(fee_id)
        .bind(new.amount)
        .bind(new.payment_method)
        .bind(new.receipt_number.clone())
        .bind(new.notes.clone())
        .bind(paid_date)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        let fee = sqlx::query_as::<_, MonthlyFee>(&format!(
            "UPDATE monthly_fees SET \
                 amount_paid = $2, status = $3, paid_date = $4, payment_method = $5, \
                 receipt_number = COALESCE($6, receipt_number), \
                 notes = COALESCE($7, notes), updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {FEE_COLUMNS}"
        ))
        .bind(fee_id)
        .bind(next.amount_paid)
        .bind(next.status)
        .bind(next.paid_date)
        .bind(new.payment_method)
        .bind(new.receipt_number)
        .bind(new.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            fee_id = %fee.id,
            payment_id = %payment.id,
            amount = %payment.amount,
            status = %fee.status,
            "payment recorded"
        );
        Ok((payment, fee))
    }

    pub async fn get_payment(&self, payment_id: Uuid) -> AppResult<Payment> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| BillingError::PaymentNotFound(payment_id).into())
    }

    pub async fn payments_for_fee(&self, fee_id: Uuid) -> AppResult<Vec<Payment>> {
        // 404 on an unknown fee rather than an empty list.
        self.get_fee(fee_id).await?;

        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments \
             WHERE monthly_fee_id = $1 ORDER BY paid_date DESC, created_at DESC"
        ))
        .bind(fee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Soft-cancel a payment and reconcile the owning fee against the sum
    /// of its remaining effective payments. Cancellation is one-way.
    pub async fn cancel_payment(
        &self,
        payment_id: Uuid,
        cancelled_by: Uuid,
        reason: String,
    ) -> AppResult<(Payment, MonthlyFee)> {
        let mut tx = self.pool.begin().await?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1 FOR UPDATE"
        ))
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BillingError::PaymentNotFound(payment_id))?;

        payment.ensure_active()?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "UPDATE payments SET \
                 is_cancelled = TRUE, cancelled_at = NOW(), cancelled_by = $2, \
                 cancellation_reason = $3 \
             WHERE id = $1 \
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(payment_id)
        .bind(cancelled_by)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await?;

        let fee = Self::lock_fee(&mut tx, payment.monthly_fee_id).await?;

        let effective_total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM payments \
             WHERE monthly_fee_id = $1 AND is_cancelled = FALSE",
        )
        .bind(fee.id)
        .fetch_one(&mut *tx)
        .await?;

        let next = reconciler::reconcile_total(
            &FeeSnapshot::from(&fee),
            effective_total,
            Utc::now().date_naive(),
        )?;

        let fee = sqlx::query_as::<_, MonthlyFee>(&format!(
            "UPDATE monthly_fees SET \
                 amount_paid = $2, status = $3, paid_date = $4, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {FEE_COLUMNS}"
        ))
        .bind(fee.id)
        .bind(next.amount_paid)
        .bind(next.status)
        .bind(next.paid_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            payment_id = %payment.id,
            fee_id = %fee.id,
            amount_paid = %fee.amount_paid,
            status = %fee.status,
            "payment cancelled"
        );
        Ok((payment, fee))
    }

    pub async fn payment_summary(&self, fee_id: Uuid) -> AppResult<PaymentSummary> {
        let fee = self.get_fee(fee_id).await?;

        let rows = sqlx::query_as::<_, (bool, Decimal, i64)>(
            "SELECT is_cancelled, COALESCE(SUM(amount), 0), COUNT(*) \
             FROM payments WHERE monthly_fee_id = $1 GROUP BY is_cancelled",
        )
        .bind(fee_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summary = PaymentSummary {
            fee_amount: fee.amount,
            total_paid: Decimal::ZERO,
            total_cancelled: Decimal::ZERO,
            remaining_amount: Decimal::ZERO,
            active_payment_count: 0,
            cancelled_payment_count: 0,
            status: fee.status,
        };
        for (is_cancelled, total, count) in rows {
            if is_cancelled {
                summary.total_cancelled = total;
                summary.cancelled_payment_count = count;
            } else {
                summary.total_paid = total;
                summary.active_payment_count = count;
            }
        }
        summary.remaining_amount = fee.remaining();

        Ok(summary)
    }

    // ========== FEE GENERATION ==========

    /// Generate the period's fees for every resident of a community that
    /// has an assigned house and no fee for that period yet. Idempotent:
    /// rerunning for the same period generates nothing new.
    pub async fn generate_fees_for_period(
        &self,
        community_id: Uuid,
        period: &Period,
    ) -> AppResult<Vec<MonthlyFee>> {
        let mut tx = self.pool.begin().await?;

        let monthly_fee = sqlx::query_scalar::<_, Decimal>(
            "SELECT monthly_fee FROM communities WHERE id = $1",
        )
        .bind(community_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BillingError::CommunityNotFound(community_id))?;

        let residents = sqlx::query_as::<_, (Uuid, Option<Uuid>)>(
            "SELECT id, house_id FROM users \
             WHERE community_id = $1 AND role = 'resident' ORDER BY created_at",
        )
        .bind(community_id)
        .fetch_all(&mut *tx)
        .await?;

        let billed = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT user_id, house_id FROM monthly_fees \
             WHERE community_id = $1 AND period = $2",
        )
        .bind(community_id)
        .bind(period.as_str())
        .fetch_all(&mut *tx)
        .await?;
        let billed_users: HashSet<Uuid> = billed.iter().map(|&(user_id, _)| user_id).collect();
        let billed_houses: HashSet<Uuid> = billed.iter().map(|&(_, house_id)| house_id).collect();

        let due_date = period.first_day();
        let mut generated = Vec::new();

        for (user_id, house_id) in generation_targets(&residents, &billed_users, &billed_houses) {
            let fee = sqlx::query_as::<_, MonthlyFee>(&format!(
                "INSERT INTO monthly_fees \
                     (community_id, user_id, house_id, period, amount, status, due_date) \
                 VALUES ($1, $2, $3, $4, $5, 'pending', $6) \
                 RETURNING {FEE_COLUMNS}"
            ))
            .bind(community_id)
            .bind(user_id)
            .bind(house_id)
            .bind(period.as_str())
            .bind(monthly_fee)
            .bind(due_date)
            .fetch_one(&mut *tx)
            .await?;

            generated.push(fee);
        }

        tx.commit().await?;

        info!(
            community_id = %community_id,
            period = %period,
            count = generated.len(),
            "monthly fees generated"
        );
        Ok(generated)
    }

    // ========== REPORTING ==========

    pub async fn financial_summary(
        &self,
        community_id: Uuid,
        period: Option<&str>,
    ) -> AppResult<Vec<FinancialSummaryRow>> {
        let rows = sqlx::query_as::<_, FinancialSummaryRow>(
            "SELECT status, COUNT(*) AS fee_count, \
                    COALESCE(SUM(amount), 0) AS total_amount, \
                    COALESCE(SUM(amount_paid), 0) AS total_paid, \
                    COALESCE(SUM(discount_amount), 0) AS total_discounts, \
                    COALESCE(SUM(late_fee_amount), 0) AS total_late_fees \
             FROM monthly_fees \
             WHERE community_id = $1 AND ($2::text IS NULL OR period = $2) \
             GROUP BY status",
        )
        .bind(community_id)
        .bind(period)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ========== INTERNAL ==========

    async fn lock_fee(
        tx: &mut Transaction<'_, Postgres>,
        fee_id: Uuid,
    ) -> AppResult<MonthlyFee> {
        sqlx::query_as::<_, MonthlyFee>(&format!(
            "SELECT {FEE_COLUMNS} FROM monthly_fees WHERE id = $1 FOR UPDATE"
        ))
        .bind(fee_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| BillingError::FeeNotFound(fee_id).into())
    }
}

/// Pick the residents to bill for a period. Skips residents without an
/// assigned house, residents who already have a fee for the period, and
/// residents whose house is already billed for it (housemates share one
/// fee; the schema allows one fee per (community, house, period)).
fn generation_targets(
    residents: &[(Uuid, Option<Uuid>)],
    billed_users: &HashSet<Uuid>,
    billed_houses: &HashSet<Uuid>,
) -> Vec<(Uuid, Uuid)> {
    let mut houses = billed_houses.clone();
    let mut targets = Vec::new();

    for &(user_id, house_id) in residents {
        let Some(house_id) = house_id else {
            // A resident without a house has nothing to bill.
            continue;
        };
        if billed_users.contains(&user_id) || !houses.insert(house_id) {
            continue;
        }
        targets.push((user_id, house_id));
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn housemates_share_one_generated_fee() {
        let house = Uuid::new_v4();
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());
        let residents = vec![(first, Some(house)), (second, Some(house))];

        let targets = generation_targets(&residents, &HashSet::new(), &HashSet::new());
        assert_eq!(targets, vec![(first, house)]);
    }

    #[test]
    fn residents_without_houses_are_skipped() {
        let residents = vec![(Uuid::new_v4(), None)];
        let targets = generation_targets(&residents, &HashSet::new(), &HashSet::new());
        assert!(targets.is_empty());
    }

    #[test]
    fn generation_is_idempotent_per_period() {
        let residents = vec![
            (Uuid::new_v4(), Some(Uuid::new_v4())),
            (Uuid::new_v4(), Some(Uuid::new_v4())),
        ];

        let first_run = generation_targets(&residents, &HashSet::new(), &HashSet::new());
        assert_eq!(first_run.len(), 2);

        let billed_users: HashSet<Uuid> = first_run.iter().map(|&(user, _)| user).collect();
        let billed_houses: HashSet<Uuid> = first_run.iter().map(|&(_, house)| house).collect();
        let second_run = generation_targets(&residents, &billed_users, &billed_houses);
        assert!(second_run.is_empty());
    }

    #[test]
    fn house_billed_for_the_period_is_skipped() {
        // A fee created manually for the house counts as billed.
        let house = Uuid::new_v4();
        let residents = vec![(Uuid::new_v4(), Some(house))];
        let billed_houses = HashSet::from([house]);

        let targets = generation_targets(&residents, &HashSet::new(), &billed_houses);
        assert!(targets.is_empty());
    }
}
