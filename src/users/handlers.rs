use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    error::AppResult,
    state::AppState,
    users::{
        dto::{CreateUserRequest, MessageResponse, PublicUser, SearchQuery, UpdateUserRequest},
        services,
    },
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/", get(list_users))
        .route("/users/:id", get(get_user))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/", post(create_user))
        .route("/users/:id", axum::routing::put(update_user).delete(delete_user))
        .route("/users/:id/toggle-active", post(toggle_active))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<PublicUser>>> {
    let users = match query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(term) => state.store.search(term).await?,
        None => state.store.list().await?,
    };
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<PublicUser>> {
    let user = state.store.get(id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<Json<PublicUser>> {
    let user = services::create_user(state.store.as_ref(), payload).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<PublicUser>> {
    let user = services::update_user(state.store.as_ref(), id, payload).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn toggle_active(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<PublicUser>> {
    let user = state.store.toggle_active(id).await?;
    info!(user_id = user.id, is_active = user.is_active, "user active flag toggled");
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    let deleted = state.store.delete(id).await?;
    info!(user_id = deleted.id, username = %deleted.username, "user deleted");
    Ok(Json(MessageResponse {
        message: "User deleted successfully".into(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{app::build_app, state::AppState};

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn user_body(name: &str) -> Value {
        json!({
            "username": name,
            "email": format!("{name}@example.com"),
            "password": "testpass",
            "first_name": "Test",
            "last_name": "User"
        })
    }

    #[tokio::test]
    async fn create_then_list_returns_both_without_hashes() {
        let app = build_app(AppState::in_memory());

        let (status, a) = call(&app, Method::POST, "/users/", Some(user_body("alice"))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, b) = call(&app, Method::POST, "/users", Some(user_body("bob"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(a["role"], "user");
        assert_eq!(a["is_active"], true);
        assert!(a["id"].as_i64().unwrap() < b["id"].as_i64().unwrap());

        let (status, list) = call(&app, Method::GET, "/users/", None).await;
        assert_eq!(status, StatusCode::OK);
        let list = list.as_array().unwrap();
        let names: Vec<&str> = list.iter().map(|u| u["username"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["admin", "alice", "bob"]);

        let raw = serde_json::to_string(list).unwrap();
        assert!(!raw.contains("password"));
        assert!(!raw.contains(&crate::auth::password::hash_password("testpass")));
    }

    #[tokio::test]
    async fn duplicate_create_is_bad_request() {
        let app = build_app(AppState::in_memory());
        let (status, body) = call(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"username": "admin", "email": "new@example.com", "password": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Username or email already exists");

        let (_, list) = call(&app, Method::GET, "/users/", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_required_field_is_rejected() {
        let app = build_app(AppState::in_memory());
        let (status, _) = call(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"username": "nomail", "password": "x"})),
        )
        .await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn get_update_delete_lifecycle() {
        let app = build_app(AppState::in_memory());
        let (_, created) = call(&app, Method::POST, "/users/", Some(user_body("carol"))).await;
        let id = created["id"].as_i64().unwrap();

        let (status, fetched) = call(&app, Method::GET, &format!("/users/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["username"], "carol");

        let (status, updated) = call(
            &app,
            Method::PUT,
            &format!("/users/{id}"),
            Some(json!({"last_name": "Smith", "first_name": null, "role": "admin"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["last_name"], "Smith");
        assert_eq!(updated["first_name"], "Test");
        assert_eq!(updated["role"], "admin");
        assert_eq!(updated["email"], "carol@example.com");

        let (status, toggled) =
            call(&app, Method::POST, &format!("/users/{id}/toggle-active"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(toggled["is_active"], false);

        let (status, body) = call(&app, Method::DELETE, &format!("/users/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User deleted successfully");

        let (status, body) = call(&app, Method::GET, &format!("/users/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "User not found");
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let app = build_app(AppState::in_memory());
        let (status, _) = call(&app, Method::DELETE, "/users/404", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, Method::PUT, "/users/404", Some(json!({"role": "user"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, Method::POST, "/users/404/toggle-active", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, list) = call(&app, Method::GET, "/users/", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_into_taken_email_is_conflict() {
        let app = build_app(AppState::in_memory());
        let (_, created) = call(&app, Method::POST, "/users/", Some(user_body("dave"))).await;
        let id = created["id"].as_i64().unwrap();
        let (status, _) = call(
            &app,
            Method::PUT,
            &format!("/users/{id}"),
            Some(json!({"email": "admin@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_supports_search() {
        let app = build_app(AppState::in_memory());
        call(&app, Method::POST, "/users/", Some(user_body("erin"))).await;
        let (status, hits) = call(&app, Method::GET, "/users/?q=ERI", None).await;
        assert_eq!(status, StatusCode::OK);
        let hits = hits.as_array().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["username"], "erin");
    }

    #[tokio::test]
    async fn login_endpoint() {
        let app = build_app(AppState::in_memory());
        let (status, user) = call(
            &app,
            Method::POST,
            "/auth/login",
            Some(json!({"username": "admin", "password": "admin"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["username"], "admin");
        assert_eq!(user["role"], "admin");
        assert!(user.get("password_hash").is_none());

        let (wrong, wrong_body) = call(
            &app,
            Method::POST,
            "/auth/login",
            Some(json!({"username": "admin", "password": "nope"})),
        )
        .await;
        let (unknown, unknown_body) = call(
            &app,
            Method::POST,
            "/auth/login",
            Some(json!({"username": "ghost", "password": "admin"})),
        )
        .await;
        assert_eq!(wrong, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_body, unknown_body);
        assert_eq!(wrong_body["detail"], "Invalid credentials");
    }
}
