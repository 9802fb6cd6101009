use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;

use super::{
    repo::{UserStore, DUPLICATE_USER},
    repo_types::{NewUser, Role, User, UserPatch},
};
use crate::{
    auth::password::hash_password,
    error::{AppError, AppResult},
};

/// Process-local store used in demo mode. Every operation runs under one lock,
/// so check-then-insert sequences cannot interleave.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding the demo admin (`admin` / `admin`).
    pub fn seeded() -> Self {
        let admin = User {
            id: 1,
            username: "admin".into(),
            email: "admin@example.com".into(),
            password_hash: hash_password("admin"),
            first_name: Some("Admin".into()),
            last_name: Some("User".into()),
            role: Role::Admin,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        Self {
            users: Mutex::new(vec![admin]),
        }
    }
}

fn matches_term(user: &User, needle: &str) -> bool {
    let hit = |v: &str| v.to_lowercase().contains(needle);
    hit(&user.username)
        || hit(&user.email)
        || user.first_name.as_deref().is_some_and(hit)
        || user.last_name.as_deref().is_some_and(hit)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let mut users = self.users.lock();
        if users
            .iter()
            .any(|u| u.username == new_user.username || u.email == new_user.email)
        {
            return Err(AppError::conflict(DUPLICATE_USER));
        }

        let id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let user = User {
            id,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            role: new_user.role,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn get(&self, id: i64) -> AppResult<User> {
        self.users
            .lock()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.users.lock().iter().find(|u| u.email == email).cloned())
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        Ok(self.users.lock().clone())
    }

    async fn search(&self, term: &str) -> AppResult<Vec<User>> {
        let needle = term.trim().to_lowercase();
        Ok(self
            .users
            .lock()
            .iter()
            .filter(|u| matches_term(u, &needle))
            .cloned()
            .collect())
    }

    async fn update(&self, id: i64, patch: UserPatch) -> AppResult<User> {
        let mut users = self.users.lock();
        let idx = users
            .iter()
            .position(|u| u.id == id)
            .ok_or(AppError::NotFound)?;

        if let Some(name) = patch.username.as_deref() {
            if users.iter().any(|u| u.id != id && u.username == name) {
                return Err(AppError::conflict("Username already exists"));
            }
        }
        if let Some(email) = patch.email.as_deref() {
            if users.iter().any(|u| u.id != id && u.email == email) {
                return Err(AppError::conflict("Email already exists"));
            }
        }

        patch.apply(&mut users[idx]);
        Ok(users[idx].clone())
    }

    async fn toggle_active(&self, id: i64) -> AppResult<User> {
        let mut users = self.users.lock();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AppError::NotFound)?;
        user.is_active = !user.is_active;
        user.updated_at = Some(OffsetDateTime::now_utc());
        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> AppResult<User> {
        let mut users = self.users.lock();
        let idx = users
            .iter()
            .position(|u| u.id == id)
            .ok_or(AppError::NotFound)?;
        Ok(users.remove(idx))
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.users.lock().len())
    }
}
