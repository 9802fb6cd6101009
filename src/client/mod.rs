//! Server-rendered frontend that talks to the API over HTTP and keeps the
//! logged-in user in a server-side session.

pub mod api;
pub mod handlers;
pub mod session;
pub mod stats;
pub mod views;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::{config::ClientConfig, logging::with_http_tracing};
use api::ApiClient;
use session::SessionStore;

#[derive(Clone)]
pub struct ClientState {
    pub api: ApiClient,
    pub sessions: Arc<SessionStore>,
    pub config: Arc<ClientConfig>,
}

impl ClientState {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let api = ApiClient::new(config.api_url.clone(), config.request_timeout)?;
        Ok(Self {
            api,
            sessions: Arc::new(SessionStore::new(config.session_idle_timeout)),
            config: Arc::new(config),
        })
    }
}

pub fn build_client_app(state: ClientState) -> Router {
    let router = Router::new()
        .route("/", get(handlers::index))
        .route("/login", get(handlers::login_form).post(handlers::login_submit))
        .route("/logout", get(handlers::logout))
        .route("/dashboard", get(handlers::dashboard))
        .route("/users", get(handlers::users_list).post(handlers::create_user))
        .route("/users/:id", delete(handlers::delete_user))
        .route("/users/:id/toggle", post(handlers::toggle_user))
        .route("/profile", get(handlers::profile))
        .route("/reports", get(handlers::reports))
        .route("/settings", get(handlers::settings))
        .with_state(state);
    with_http_tracing(router)
}
