use std::{sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::{
    api::handler::AppState, billing::repository::BillingRepository,
    community::repository::CommunityRepository, error::AppResult,
};

pub async fn initialize_app_state(database_url: &str) -> AppResult<AppState> {
    info!("Initializing application components ...");

    let pool = initialize_database(database_url).await?;

    let billing = Arc::new(BillingRepository::new(pool.clone()));
    info!("✅ Billing repository initialized");

    let communities = Arc::new(CommunityRepository::new(pool.clone()));
    info!("✅ Community repository initialized");

    Ok(AppState {
        billing,
        communities,
    })
}

async fn initialize_database(database_url: &str) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(50)
        .min_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}
