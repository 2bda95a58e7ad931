use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::models::{Community, Currency, House, Role, User};
use super::repository::{NewCommunity, NewResident};
use crate::api::handler::AppState;
use crate::billing::handlers::FeeScopeQuery;
use crate::billing::models::{MonthlyFee, Period};
use crate::billing::repository::FeeFilter;
use crate::error::AppResult;
use crate::middleware::auth::AuthContext;
use crate::middleware::validation::ValidatedJson;

fn validate_non_negative(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount >= Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_non_negative"))
    }
}

fn default_currency() -> Currency {
    Currency::Mxn
}

fn default_role() -> Role {
    Role::Resident
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommunityRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(length(min = 5, max = 200))]
    pub address: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
    #[validate(custom = "validate_non_negative")]
    pub monthly_fee: Decimal,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    #[validate(range(min = 1, max = 1000))]
    pub total_houses: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateHouseRequest {
    #[validate(length(min = 1, max = 20))]
    pub number: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateResidentRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub house_id: Option<Uuid>,
    #[serde(default = "default_role")]
    pub role: Role,
}

pub async fn create_community(
    State(state): State<AppState>,
    ctx: AuthContext,
    ValidatedJson(req): ValidatedJson<CreateCommunityRequest>,
) -> AppResult<(StatusCode, Json<Community>)> {
    ctx.require_super_admin()?;

    let community = state
        .communities
        .create_community(NewCommunity {
            name: req.name,
            address: req.address,
            description: req.description,
            monthly_fee: req.monthly_fee,
            currency: req.currency,
            total_houses: req.total_houses,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(community)))
}

pub async fn get_community(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Path(community_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Community>)> {
    let community = state.communities.get_community(community_id).await?;
    Ok((StatusCode::OK, Json(community)))
}

pub async fn create_house(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(community_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateHouseRequest>,
) -> AppResult<(StatusCode, Json<House>)> {
    ctx.require_admin()?;

    let house = state
        .communities
        .create_house(community_id, req.number)
        .await?;
    Ok((StatusCode::CREATED, Json(house)))
}

pub async fn list_houses(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(community_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Vec<House>>)> {
    ctx.require_admin()?;

    let houses = state.communities.list_houses(community_id).await?;
    Ok((StatusCode::OK, Json(houses)))
}

pub async fn create_resident(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(community_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateResidentRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    ctx.require_admin()?;
    // Only a super admin may mint other admins.
    if req.role != Role::Resident {
        ctx.require_super_admin()?;
    }

    let user = state
        .communities
        .create_resident(
            community_id,
            NewResident {
                name: req.name,
                email: req.email,
                house_id: req.house_id,
                role: req.role,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn community_fees(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(community_id): Path<Uuid>,
    Query(query): Query<FeeScopeQuery>,
) -> AppResult<(StatusCode, Json<Vec<MonthlyFee>>)> {
    ctx.require_admin()?;

    if let Some(period) = &query.period {
        Period::parse(period)?;
    }
    let filter = FeeFilter {
        community_id: None,
        user_id: query.user_id,
        status: query.status,
        period: query.period,
    };

    let fees = state
        .billing
        .fees_by_community(community_id, &filter)
        .await?;
    Ok((StatusCode::OK, Json(fees)))
}
