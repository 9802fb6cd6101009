use std::net::SocketAddr;

use axum::{extract::State, routing::get, Json, Router};
use tower_http::cors::CorsLayer;

use crate::{
    auth,
    error::AppResult,
    logging::with_http_tracing,
    state::AppState,
    users::{
        self,
        dto::{HealthResponse, MessageResponse},
    },
};

pub fn build_app(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth::router())
        .merge(users::router())
        .with_state(state)
        .layer(CorsLayer::permissive());
    with_http_tracing(router)
}

async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "User Management API is running".into(),
    })
}

async fn health(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let users_count = state.store.count().await?;
    Ok(Json(HealthResponse {
        status: "healthy".into(),
        users_count,
    }))
}

pub async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
