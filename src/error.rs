use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::migrate::MigrateError;
use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Billing error: {0}")]
    Billing(#[from] BillingError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Fee-ledger errors. Every rejection here is a synchronous, caller-visible
/// validation failure; none of them are retried or treated as fatal.
#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Monthly fee not found: {0}")]
    FeeNotFound(Uuid),

    #[error("Payment not found: {0}")]
    PaymentNotFound(Uuid),

    #[error("Community not found: {0}")]
    CommunityNotFound(Uuid),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("House not found: {0}")]
    HouseNotFound(Uuid),

    #[error("Payment amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("Payment of {requested} exceeds the pending balance of {remaining}")]
    Overdraw { requested: Decimal, remaining: Decimal },

    #[error("Amount paid {amount_paid} cannot exceed the fee amount {amount}")]
    AmountPaidExceedsTotal { amount_paid: Decimal, amount: Decimal },

    #[error("Payment {0} is already cancelled")]
    AlreadyCancelled(Uuid),

    #[error("A monthly fee already exists for house {house_id} in period {period}")]
    DuplicateFee { house_id: Uuid, period: String },

    #[error("Monthly fee {0} has registered payments and cannot be deleted")]
    HasPayments(Uuid),

    #[error("Invalid period {0:?}, expected YYYY-MM")]
    InvalidPeriod(String),
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            AppError::Billing(BillingError::FeeNotFound(id)) => (
                StatusCode::NOT_FOUND,
                "FEE_NOT_FOUND",
                format!("Monthly fee not found: {}", id),
                None,
            ),
            AppError::Billing(BillingError::PaymentNotFound(id)) => (
                StatusCode::NOT_FOUND,
                "PAYMENT_NOT_FOUND",
                format!("Payment not found: {}", id),
                None,
            ),
            AppError::Billing(BillingError::CommunityNotFound(id)) => (
                StatusCode::NOT_FOUND,
                "COMMUNITY_NOT_FOUND",
                format!("Community not found: {}", id),
                None,
            ),
            AppError::Billing(BillingError::UserNotFound(id)) => (
                StatusCode::NOT_FOUND,
                "USER_NOT_FOUND",
                format!("User not found: {}", id),
                None,
            ),
            AppError::Billing(BillingError::HouseNotFound(id)) => (
                StatusCode::NOT_FOUND,
                "HOUSE_NOT_FOUND",
                format!("House not found: {}", id),
                None,
            ),
            AppError::Billing(BillingError::NonPositiveAmount(amount)) => (
                StatusCode::BAD_REQUEST,
                "NON_POSITIVE_AMOUNT",
                format!("Payment amount must be positive, got {}", amount),
                None,
            ),
            AppError::Billing(BillingError::Overdraw { requested, remaining }) => (
                StatusCode::BAD_REQUEST,
                "PAYMENT_OVERDRAW",
                format!(
                    "Payment of {} exceeds the pending balance of {}",
                    requested, remaining
                ),
                Some(serde_json::json!({
                    "requested": requested,
                    "remaining": remaining,
                })),
            ),
            AppError::Billing(BillingError::AmountPaidExceedsTotal { amount_paid, amount }) => (
                StatusCode::BAD_REQUEST,
                "AMOUNT_PAID_EXCEEDS_TOTAL",
                format!(
                    "Amount paid {} cannot exceed the fee amount {}",
                    amount_paid, amount
                ),
                None,
            ),
            AppError::Billing(BillingError::AlreadyCancelled(id)) => (
                StatusCode::CONFLICT,
                "PAYMENT_ALREADY_CANCELLED",
                format!("Payment {} is already cancelled", id),
                None,
            ),
            AppError::Billing(BillingError::DuplicateFee { house_id, period }) => (
                StatusCode::CONFLICT,
                "DUPLICATE_FEE",
                format!(
                    "A monthly fee already exists for house {} in period {}",
                    house_id, period
                ),
                Some(serde_json::json!({
                    "house_id": house_id,
                    "period": period,
                })),
            ),
            AppError::Billing(BillingError::HasPayments(id)) => (
                StatusCode::CONFLICT,
                "FEE_HAS_PAYMENTS",
                format!(
                    "Monthly fee {} has registered payments and cannot be deleted",
                    id
                ),
                None,
            ),
            AppError::Billing(BillingError::InvalidPeriod(period)) => (
                StatusCode::BAD_REQUEST,
                "INVALID_PERIOD",
                format!("Invalid period {:?}, expected YYYY-MM", period),
                None,
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg, None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
                None,
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
                None,
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("Error converting: {:?}", error))
    }
}

impl From<rust_decimal::Error> for AppError {
    fn from(error: rust_decimal::Error) -> Self {
        AppError::InvalidInput(format!("Decimal conversion error: {:?}", error))
    }
}

impl From<MigrateError> for AppError {
    fn from(error: MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {:?}", error))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
