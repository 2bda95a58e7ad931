use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::models::{Community, Currency, House, Role, User};
use crate::error::{AppError, AppResult, BillingError};

#[derive(Debug, Clone)]
pub struct NewCommunity {
    pub name: String,
    pub address: String,
    pub description: String,
    pub monthly_fee: Decimal,
    pub currency: Currency,
    pub total_houses: i32,
}

#[derive(Debug, Clone)]
pub struct NewResident {
    pub name: String,
    pub email: String,
    pub house_id: Option<Uuid>,
    pub role: Role,
}

pub struct CommunityRepository {
    pub pool: PgPool,
}

impl CommunityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_community(&self, new: NewCommunity) -> AppResult<Community> {
        let community = sqlx::query_as::<_, Community>(
            "INSERT INTO communities (name, address, description, monthly_fee, currency, total_houses) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, name, address, description, monthly_fee, currency, total_houses, \
                       is_active, created_at, updated_at",
        )
        .bind(new.name)
        .bind(new.address)
        .bind(new.description)
        .bind(new.monthly_fee)
        .bind(new.currency)
        .bind(new.total_houses)
        .fetch_one(&self.pool)
        .await?;

        info!(community_id = %community.id, name = %community.name, "community created");
        Ok(community)
    }

    pub async fn get_community(&self, community_id: Uuid) -> AppResult<Community> {
        sqlx::query_as::<_, Community>(
            "SELECT id, name, address, description, monthly_fee, currency, total_houses, \
                    is_active, created_at, updated_at \
             FROM communities WHERE id = $1",
        )
        .bind(community_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| BillingError::CommunityNotFound(community_id).into())
    }

    pub async fn create_house(&self, community_id: Uuid, number: String) -> AppResult<House> {
        self.get_community(community_id).await?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM houses WHERE community_id = $1 AND number = $2)",
        )
        .bind(community_id)
        .bind(&number)
        .fetch_one(&self.pool)
        .await?;
        if exists {
            return Err(AppError::Conflict(format!(
                "House {} already exists in this community",
                number
            )));
        }

        let house = sqlx::query_as::<_, House>(
            "INSERT INTO houses (community_id, number) VALUES ($1, $2) \
             RETURNING id, community_id, number, created_at",
        )
        .bind(community_id)
        .bind(number)
        .fetch_one(&self.pool)
        .await?;

        Ok(house)
    }

    pub async fn list_houses(&self, community_id: Uuid) -> AppResult<Vec<House>> {
        self.get_community(community_id).await?;

        let houses = sqlx::query_as::<_, House>(
            "SELECT id, community_id, number, created_at \
             FROM houses WHERE community_id = $1 ORDER BY number",
        )
        .bind(community_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(houses)
    }

    pub async fn create_resident(&self, community_id: Uuid, new: NewResident) -> AppResult<User> {
        self.get_community(community_id).await?;

        if let Some(house_id) = new.house_id {
            let house_ok = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM houses WHERE id = $1 AND community_id = $2)",
            )
            .bind(house_id)
            .bind(community_id)
            .fetch_one(&self.pool)
            .await?;
            if !house_ok {
                return Err(BillingError::HouseNotFound(house_id).into());
            }
        }

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(&new.email)
        .fetch_one(&self.pool)
        .await?;
        if taken {
            return Err(AppError::Conflict(format!(
                "Email {} is already registered",
                new.email
            )));
        }

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (community_id, house_id, name, email, role) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, community_id, house_id, name, email, role, created_at, updated_at",
        )
        .bind(community_id)
        .bind(new.house_id)
        .bind(new.name)
        .bind(new.email)
        .bind(new.role)
        .fetch_one(&self.pool)
        .await?;

        info!(user_id = %user.id, community_id = %community_id, role = %user.role, "user registered");
        Ok(user)
    }
}
