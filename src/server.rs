use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    api::handler::{health_check, AppState},
    billing::handlers::{
        cancel_payment, create_fee, create_payment, delete_fee, fee_payment_summary,
        financial_summary, generate_fees, get_fee, get_payment, list_fee_payments, list_fees,
        my_fees, record_fee_payment, update_fee,
    },
    community::handlers::{
        community_fees, create_community, create_house, create_resident, get_community,
        list_houses,
    },
};

pub async fn create_app(state: AppState) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let app = Router::new()
        // Public health check endpoint
        .route("/health", get(health_check))
        .nest(
            "/api/v1",
            Router::new()
                // Monthly fee endpoints
                .route("/monthly-fees", get(list_fees).post(create_fee))
                .route("/monthly-fees/me", get(my_fees))
                .route("/monthly-fees/summary", get(financial_summary))
                .route("/monthly-fees/generate", post(generate_fees))
                .route(
                    "/monthly-fees/:fee_id",
                    get(get_fee).put(update_fee).delete(delete_fee),
                )
                .route(
                    "/monthly-fees/:fee_id/payments",
                    get(list_fee_payments).post(record_fee_payment),
                )
                .route(
                    "/monthly-fees/:fee_id/payments/summary",
                    get(fee_payment_summary),
                )
                // Payment endpoints
                .route("/payments", post(create_payment))
                .route("/payments/:payment_id", get(get_payment))
                .route("/payments/:payment_id/cancel", post(cancel_payment))
                // Community endpoints
                .route("/communities", post(create_community))
                .route("/communities/:community_id", get(get_community))
                .route(
                    "/communities/:community_id/houses",
                    get(list_houses).post(create_house),
                )
                .route("/communities/:community_id/residents", post(create_resident))
                .route("/communities/:community_id/monthly-fees", get(community_fees)),
        )
        .layer(CompressionLayer::new())
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
