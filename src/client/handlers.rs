use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use super::{
    api::ApiError,
    session::{self, CurrentSession, Flash, FlashKind},
    stats::UserStats,
    views, ClientState,
};
use crate::users::{
    dto::{CreateUserRequest, SearchQuery},
    repo_types::Role,
};

const API_UNREACHABLE: &str = "API unreachable. Please check if the API server is running.";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserForm {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct DeleteResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeleteResult {
    fn failed(error: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            error: Some(error.into()),
        })
    }
}

fn api_error_message(e: &ApiError) -> String {
    match e {
        ApiError::Unreachable(_) => "API unreachable".to_string(),
        ApiError::Status { detail, .. } => detail.clone(),
        ApiError::Decode(_) => "Unexpected response from API".to_string(),
    }
}

fn none_if_blank(s: String) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

pub async fn index(session: Option<CurrentSession>) -> Redirect {
    match session {
        Some(_) => Redirect::to("/dashboard"),
        None => Redirect::to("/login"),
    }
}

pub async fn login_form(session: Option<CurrentSession>) -> Response {
    match session {
        Some(_) => Redirect::to("/dashboard").into_response(),
        None => views::login_page(None).into_response(),
    }
}

#[instrument(skip(state, jar, form))]
pub async fn login_submit(
    State(state): State<ClientState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.api.login(form.username.trim(), &form.password).await {
        Ok(user) => {
            info!(user_id = user.id, username = %user.username, "login successful");
            if let Some(previous) = session::session_id(&jar) {
                state.sessions.remove(&previous);
            }
            let id = state.sessions.create(user);
            state
                .sessions
                .flash(&id, FlashKind::Success, "Login successful!");
            (
                jar.add(session::session_cookie(id)),
                Redirect::to("/dashboard"),
            )
                .into_response()
        }
        Err(e) if e.is_unreachable() => {
            error!(error = %e, "api connection error during login");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                views::login_page(Some(Flash::new(FlashKind::Error, API_UNREACHABLE))),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, username = %form.username, "login rejected");
            let status = e.status().unwrap_or(StatusCode::BAD_GATEWAY);
            (
                status,
                views::login_page(Some(Flash::new(FlashKind::Error, api_error_message(&e)))),
            )
                .into_response()
        }
    }
}

pub async fn logout(State(state): State<ClientState>, jar: CookieJar) -> Response {
    if let Some(id) = session::session_id(&jar) {
        if let Some(user) = state.sessions.remove(&id) {
            info!(user_id = user.id, "logged out");
        }
    }
    (
        jar.remove(session::removal_cookie()),
        views::login_page(Some(views::logged_out())),
    )
        .into_response()
}

#[instrument(skip(state, session), fields(user_id = session.user.id))]
pub async fn dashboard(State(state): State<ClientState>, session: CurrentSession) -> Html<String> {
    let flashes = state.sessions.take_flashes(&session.id);
    match state.api.list_users(None).await {
        Ok(users) => {
            let stats = UserStats::from_users(&users);
            let recent = &users[..users.len().min(5)];
            views::dashboard_page(&session.user, &flashes, &stats, recent, None)
        }
        Err(e) => {
            error!(error = %e, "dashboard: list users failed");
            views::dashboard_page(
                &session.user,
                &flashes,
                &UserStats::default(),
                &[],
                Some(&api_error_message(&e)),
            )
        }
    }
}

#[instrument(skip(state, session, query), fields(user_id = session.user.id))]
pub async fn users_list(
    State(state): State<ClientState>,
    session: CurrentSession,
    Query(query): Query<SearchQuery>,
) -> Html<String> {
    let flashes = state.sessions.take_flashes(&session.id);
    let search = query.q.as_deref();
    match state.api.list_users(search).await {
        Ok(users) => views::users_page(&session.user, &flashes, &users, search, None),
        Err(e) => {
            error!(error = %e, "users list failed");
            views::users_page(
                &session.user,
                &flashes,
                &[],
                search,
                Some(&api_error_message(&e)),
            )
        }
    }
}

#[instrument(skip(state, session, form), fields(user_id = session.user.id))]
pub async fn create_user(
    State(state): State<ClientState>,
    session: CurrentSession,
    Form(form): Form<CreateUserForm>,
) -> Redirect {
    if !session.is_admin() {
        warn!("non-admin tried to create a user");
        state.sessions.flash(
            &session.id,
            FlashKind::Error,
            "Permission denied. Only administrators can create users.",
        );
        return Redirect::to("/users");
    }

    let req = CreateUserRequest {
        username: form.username,
        email: form.email,
        password: form.password,
        first_name: none_if_blank(form.first_name),
        last_name: none_if_blank(form.last_name),
        role: form.role,
    };
    match state.api.create_user(&req).await {
        Ok(user) => {
            info!(created_id = user.id, "user created");
            state
                .sessions
                .flash(&session.id, FlashKind::Success, "User created successfully!");
        }
        Err(e) if e.is_unreachable() => {
            error!(error = %e, "create user: api unreachable");
            state.sessions.flash(
                &session.id,
                FlashKind::Error,
                "API unreachable, please try again later",
            );
        }
        Err(e) => {
            warn!(error = %e, "create user failed");
            state.sessions.flash(
                &session.id,
                FlashKind::Error,
                format!("Error: {}", api_error_message(&e)),
            );
        }
    }
    Redirect::to("/users")
}

#[instrument(skip(state, session))]
pub async fn delete_user(
    State(state): State<ClientState>,
    session: Option<CurrentSession>,
    Path(id): Path<i64>,
) -> Json<DeleteResult> {
    let Some(session) = session else {
        return DeleteResult::failed("Not authenticated");
    };
    if !session.is_admin() {
        warn!(user_id = session.user.id, "non-admin tried to delete a user");
        return DeleteResult::failed("Permission denied");
    }
    if id == session.user.id {
        warn!(user_id = id, "admin tried to delete own account");
        return DeleteResult::failed("You cannot delete your own account");
    }
    match state.api.delete_user(id).await {
        Ok(()) => {
            info!(deleted_id = id, "user deleted");
            Json(DeleteResult {
                success: true,
                error: None,
            })
        }
        Err(e) => {
            error!(error = %e, deleted_id = id, "delete user failed");
            DeleteResult::failed(api_error_message(&e))
        }
    }
}

#[instrument(skip(state, session), fields(user_id = session.user.id))]
pub async fn toggle_user(
    State(state): State<ClientState>,
    session: CurrentSession,
    Path(id): Path<i64>,
) -> Redirect {
    if !session.is_admin() {
        warn!("non-admin tried to toggle a user");
        state.sessions.flash(
            &session.id,
            FlashKind::Error,
            "Permission denied. Only administrators can change user status.",
        );
        return Redirect::to("/users");
    }
    match state.api.toggle_active(id).await {
        Ok(user) => {
            let verb = if user.is_active { "activated" } else { "deactivated" };
            if user.id == session.user.id {
                state.sessions.refresh_user(&session.id, user.clone());
            }
            state.sessions.flash(
                &session.id,
                FlashKind::Success,
                format!("User {} {verb}", user.username),
            );
        }
        Err(e) => {
            error!(error = %e, target_id = id, "toggle user failed");
            state.sessions.flash(
                &session.id,
                FlashKind::Error,
                format!("Error: {}", api_error_message(&e)),
            );
        }
    }
    Redirect::to("/users")
}

pub async fn profile(State(state): State<ClientState>, session: CurrentSession) -> Html<String> {
    let flashes = state.sessions.take_flashes(&session.id);
    views::profile_page(&session.user, &flashes)
}

#[instrument(skip(state, session), fields(user_id = session.user.id))]
pub async fn reports(State(state): State<ClientState>, session: CurrentSession) -> Html<String> {
    let flashes = state.sessions.take_flashes(&session.id);
    match state.api.list_users(None).await {
        Ok(users) => views::reports_page(
            &session.user,
            &flashes,
            &UserStats::from_users(&users),
            None,
        ),
        Err(e) => {
            error!(error = %e, "reports: list users failed");
            views::reports_page(
                &session.user,
                &flashes,
                &UserStats::default(),
                Some(&api_error_message(&e)),
            )
        }
    }
}

pub async fn settings(State(state): State<ClientState>, session: CurrentSession) -> Html<String> {
    let flashes = state.sessions.take_flashes(&session.id);
    let health = state.api.health().await;
    let health = health.as_ref().map_err(|e| {
        warn!(error = %e, "health check failed");
        if e.is_unreachable() {
            API_UNREACHABLE
        } else {
            "API returned an error"
        }
    });
    views::settings_page(&session.user, &flashes, &state.config, health)
}
