use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::{CreateUserRequest, UpdateUserRequest},
    repo::UserStore,
    repo_types::{NewUser, User, UserPatch},
};
use crate::{
    auth::password::hash_password,
    error::{AppError, AppResult},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    Ok(email)
}

/// Validate a create request, hash its password and insert it.
pub async fn create_user(store: &dyn UserStore, req: CreateUserRequest) -> AppResult<User> {
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::validation("username is required"));
    }
    let email = normalize_email(&req.email)?;
    if req.password.is_empty() {
        return Err(AppError::validation("password is required"));
    }

    let new_user = NewUser {
        username,
        email,
        password_hash: hash_password(&req.password),
        first_name: non_blank(req.first_name),
        last_name: non_blank(req.last_name),
        role: req.role,
    };

    match store.create(new_user).await {
        Ok(user) => {
            info!(user_id = user.id, username = %user.username, "user created");
            Ok(user)
        }
        Err(e) => {
            if matches!(e, AppError::Conflict(_)) {
                warn!(username = %req.username, "user already exists");
            }
            Err(e)
        }
    }
}

/// Turn an update request into a patch. Blank strings count as absent.
pub fn build_patch(req: UpdateUserRequest) -> AppResult<UserPatch> {
    let email = match non_blank(req.email) {
        Some(e) => Some(normalize_email(&e)?),
        None => None,
    };
    Ok(UserPatch {
        username: non_blank(req.username),
        email,
        first_name: non_blank(req.first_name),
        last_name: non_blank(req.last_name),
        role: req.role,
        is_active: req.is_active,
    })
}

pub async fn update_user(store: &dyn UserStore, id: i64, req: UpdateUserRequest) -> AppResult<User> {
    let patch = build_patch(req)?;
    let user = store.update(id, patch).await?;
    info!(user_id = user.id, "user updated");
    Ok(user)
}
