use std::sync::Arc;

use axum::Json;

use crate::billing::repository::BillingRepository;
use crate::community::repository::CommunityRepository;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub billing: Arc<BillingRepository>,
    pub communities: Arc<CommunityRepository>,
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "community-backend",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
