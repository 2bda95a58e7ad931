use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::models::{
    FeeStatus, FinancialSummaryRow, MonthlyFee, Payment, PaymentMethod, PaymentSummary, Period,
};
use super::repository::{FeeFilter, FeeUpdate, NewFee, NewPayment};
use crate::api::handler::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthContext;
use crate::middleware::validation::ValidatedJson;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

fn validate_positive(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_positive"))
    }
}

fn validate_non_negative(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount >= Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_non_negative"))
    }
}

fn default_true() -> bool {
    true
}

// ========== REQUESTS ==========

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMonthlyFeeRequest {
    pub community_id: Uuid,
    pub user_id: Uuid,
    pub house_id: Uuid,
    pub period: String,
    #[validate(custom = "validate_non_negative")]
    pub amount: Decimal,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub discount_amount: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub late_fee_amount: Decimal,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    #[serde(default = "default_true")]
    pub is_recurring: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMonthlyFeeRequest {
    #[validate(custom = "validate_non_negative")]
    pub amount: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub amount_paid: Option<Decimal>,
    pub status: Option<FeeStatus>,
    pub due_date: Option<NaiveDate>,
    pub paid_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    #[validate(length(max = 50))]
    pub receipt_number: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    #[validate(custom = "validate_non_negative")]
    pub discount_amount: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub late_fee_amount: Option<Decimal>,
    pub is_recurring: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    #[validate(custom = "validate_positive")]
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 50))]
    pub receipt_number: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    pub paid_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub monthly_fee_id: Uuid,
    #[validate(custom = "validate_positive")]
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 50))]
    pub receipt_number: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    pub paid_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelPaymentRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateFeesRequest {
    pub community_id: Uuid,
    pub period: String,
}

#[derive(Debug, Deserialize)]
pub struct FeeListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<FeeStatus>,
    pub period: Option<String>,
    pub community_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeeScopeQuery {
    pub status: Option<FeeStatus>,
    pub period: Option<String>,
    pub community_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub community_id: Uuid,
    pub period: Option<String>,
}

// ========== RESPONSES ==========

#[derive(Serialize)]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_fees: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Serialize)]
pub struct FeeListResponse {
    pub monthly_fees: Vec<MonthlyFee>,
    pub pagination: Pagination,
}

#[derive(Serialize)]
pub struct PaymentRecordedResponse {
    pub payment: Payment,
    pub monthly_fee: MonthlyFee,
}

#[derive(Serialize)]
pub struct GeneratedFeesResponse {
    pub count: usize,
    pub period: String,
    pub community_id: Uuid,
}

#[derive(Serialize)]
pub struct FinancialSummaryResponse {
    pub community_id: Uuid,
    pub period: Option<String>,
    pub by_status: Vec<FinancialSummaryRow>,
}

fn checked_period(period: &Option<String>) -> AppResult<Option<String>> {
    if let Some(p) = period {
        Period::parse(p)?;
    }
    Ok(period.clone())
}

/// Descending unless the caller asks for ascending, in any case.
fn sort_descending(order: Option<&str>) -> bool {
    !order.map_or(false, |o| o.eq_ignore_ascii_case("asc"))
}

// ========== FEE HANDLERS ==========

pub async fn list_fees(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<FeeListQuery>,
) -> AppResult<(StatusCode, Json<FeeListResponse>)> {
    ctx.require_admin()?;

    let filter = FeeFilter {
        community_id: query.community_id,
        user_id: query.user_id,
        status: query.status,
        period: checked_period(&query.period)?,
    };

    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let sort_by = query.sort_by.as_deref().unwrap_or("period");
    let sort_desc = sort_descending(query.sort_order.as_deref());

    let (fees, total) = state
        .billing
        .list_fees(&filter, page, limit, sort_by, sort_desc)
        .await?;

    let total_pages = (total + limit - 1) / limit;
    let response = FeeListResponse {
        monthly_fees: fees,
        pagination: Pagination {
            current_page: page,
            total_pages,
            total_fees: total,
            has_next: page < total_pages,
            has_prev: page > 1,
        },
    };

    Ok((StatusCode::OK, Json(response)))
}

pub async fn create_fee(
    State(state): State<AppState>,
    ctx: AuthContext,
    ValidatedJson(req): ValidatedJson<CreateMonthlyFeeRequest>,
) -> AppResult<(StatusCode, Json<MonthlyFee>)> {
    ctx.require_admin()?;

    let period = Period::parse(&req.period)?;
    let fee = state
        .billing
        .create_fee(NewFee {
            community_id: req.community_id,
            user_id: req.user_id,
            house_id: req.house_id,
            period,
            amount: req.amount,
            due_date: req.due_date,
            discount_amount: req.discount_amount,
            late_fee_amount: req.late_fee_amount,
            notes: req.notes,
            is_recurring: req.is_recurring,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(fee)))
}

pub async fn my_fees(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<FeeScopeQuery>,
) -> AppResult<(StatusCode, Json<Vec<MonthlyFee>>)> {
    let filter = FeeFilter {
        community_id: query.community_id,
        user_id: None,
        status: query.status,
        period: checked_period(&query.period)?,
    };

    let fees = state.billing.fees_by_user(ctx.user_id, &filter).await?;
    Ok((StatusCode::OK, Json(fees)))
}

pub async fn get_fee(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(fee_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<MonthlyFee>)> {
    let fee = state.billing.get_fee(fee_id).await?;

    if !ctx.can_view_user(fee.user_id) {
        return Err(AppError::Forbidden(
            "You may only view your own monthly fees".to_string(),
        ));
    }

    Ok((StatusCode::OK, Json(fee)))
}

pub async fn update_fee(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(fee_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateMonthlyFeeRequest>,
) -> AppResult<(StatusCode, Json<MonthlyFee>)> {
    ctx.require_admin()?;

    let fee = state
        .billing
        .update_fee(
            fee_id,
            FeeUpdate {
                amount: req.amount,
                amount_paid: req.amount_paid,
                status: req.status,
                due_date: req.due_date,
                paid_date: req.paid_date,
                payment_method: req.payment_method,
                receipt_number: req.receipt_number,
                notes: req.notes,
                discount_amount: req.discount_amount,
                late_fee_amount: req.late_fee_amount,
                is_recurring: req.is_recurring,
            },
        )
        .await?;

    Ok((StatusCode::OK, Json(fee)))
}

pub async fn delete_fee(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(fee_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    ctx.require_super_admin()?;

    state.billing.delete_fee(fee_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn generate_fees(
    State(state): State<AppState>,
    ctx: AuthContext,
    ValidatedJson(req): ValidatedJson<GenerateFeesRequest>,
) -> AppResult<(StatusCode, Json<GeneratedFeesResponse>)> {
    ctx.require_admin()?;

    let period = Period::parse(&req.period)?;
    let generated = state
        .billing
        .generate_fees_for_period(req.community_id, &period)
        .await?;

    let response = GeneratedFeesResponse {
        count: generated.len(),
        period: period.to_string(),
        community_id: req.community_id,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn financial_summary(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<SummaryQuery>,
) -> AppResult<(StatusCode, Json<FinancialSummaryResponse>)> {
    ctx.require_admin()?;

    let period = checked_period(&query.period)?;
    let by_status = state
        .billing
        .financial_summary(query.community_id, period.as_deref())
        .await?;

    let response = FinancialSummaryResponse {
        community_id: query.community_id,
        period,
        by_status,
    };
    Ok((StatusCode::OK, Json(response)))
}

// ========== PAYMENT HANDLERS ==========

pub async fn record_fee_payment(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(fee_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<RecordPaymentRequest>,
) -> AppResult<(StatusCode, Json<PaymentRecordedResponse>)> {
    ctx.require_admin()?;

    let (payment, monthly_fee) = state
        .billing
        .record_payment(
            fee_id,
            NewPayment {
                amount: req.amount,
                payment_method: req.payment_method,
                receipt_number: req.receipt_number,
                notes: req.notes,
                paid_date: req.paid_date,
            },
            ctx.user_id,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentRecordedResponse {
            payment,
            monthly_fee,
        }),
    ))
}

pub async fn create_payment(
    State(state): State<AppState>,
    ctx: AuthContext,
    ValidatedJson(req): ValidatedJson<CreatePaymentRequest>,
) -> AppResult<(StatusCode, Json<PaymentRecordedResponse>)> {
    ctx.require_admin()?;

    let (payment, monthly_fee) = state
        .billing
        .record_payment(
            req.monthly_fee_id,
            NewPayment {
                amount: req.amount,
                payment_method: req.payment_method,
                receipt_number: req.receipt_number,
                notes: req.notes,
                paid_date: req.paid_date,
            },
            ctx.user_id,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentRecordedResponse {
            payment,
            monthly_fee,
        }),
    ))
}

pub async fn list_fee_payments(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(fee_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Vec<Payment>>)> {
    ctx.require_admin()?;

    let payments = state.billing.payments_for_fee(fee_id).await?;
    Ok((StatusCode::OK, Json(payments)))
}

pub async fn fee_payment_summary(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(fee_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<PaymentSummary>)> {
    ctx.require_admin()?;

    let summary = state.billing.payment_summary(fee_id).await?;
    Ok((StatusCode::OK, Json(summary)))
}

pub async fn get_payment(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(payment_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Payment>)> {
    ctx.require_admin()?;

    let payment = state.billing.get_payment(payment_id).await?;
    Ok((StatusCode::OK, Json(payment)))
}

pub async fn cancel_payment(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(payment_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CancelPaymentRequest>,
) -> AppResult<(StatusCode, Json<PaymentRecordedResponse>)> {
    ctx.require_admin()?;

    let (payment, monthly_fee) = state
        .billing
        .cancel_payment(payment_id, ctx.user_id, req.reason)
        .await?;

    Ok((
        StatusCode::OK,
        Json(PaymentRecordedResponse {
            payment,
            monthly_fee,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_order_is_case_insensitive() {
        assert!(!sort_descending(Some("asc")));
        assert!(!sort_descending(Some("ASC")));
        assert!(sort_descending(Some("desc")));
        assert!(sort_descending(Some("DESC")));
        assert!(sort_descending(None));
        assert!(sort_descending(Some("sideways")));
    }
}
