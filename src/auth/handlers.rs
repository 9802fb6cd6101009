use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use crate::{
    auth::{dto::LoginRequest, services},
    error::AppResult,
    state::AppState,
    users::dto::PublicUser,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<PublicUser>> {
    let user = services::login(
        state.store.as_ref(),
        payload.username.trim(),
        &payload.password,
    )
    .await?;
    Ok(Json(user))
}
