use tracing::{info, warn};

use super::password::verify_password;
use crate::{
    error::{AppError, AppResult},
    users::{dto::PublicUser, repo::UserStore},
};

/// Check a username/password pair against the store.
///
/// Unknown usernames and wrong passwords both yield `InvalidCredentials`;
/// only the log line tells them apart.
pub async fn login(store: &dyn UserStore, username: &str, password: &str) -> AppResult<PublicUser> {
    let Some(user) = store.find_by_username(username).await? else {
        warn!(%username, "login unknown username");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash) {
        warn!(%username, user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = user.id, %username, "user logged in");
    Ok(PublicUser::from(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{memory::MemoryUserStore, repo_types::Role};

    #[tokio::test]
    async fn login_with_correct_password_returns_public_user() {
        let store = MemoryUserStore::seeded();
        let user = login(&store, "admin", "admin").await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.username, "admin");
        assert_eq!(user.role, Role::Admin);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_fail_alike() {
        let store = MemoryUserStore::seeded();
        let wrong = login(&store, "admin", "nope").await.unwrap_err();
        let unknown = login(&store, "ghost", "admin").await.unwrap_err();
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }
}
