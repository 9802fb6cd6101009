use async_trait::async_trait;

use super::repo_types::{NewUser, User, UserPatch};
use crate::error::AppResult;

pub const DUPLICATE_USER: &str = "Username or email already exists";

/// Storage backend for user records.
///
/// Implementations keep `username` and `email` unique across all records,
/// never change an assigned `id`, and leave the store untouched when an
/// operation fails.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user; `Conflict` if the username or email is taken.
    async fn create(&self, new_user: NewUser) -> AppResult<User>;

    /// `NotFound` if no user has this id.
    async fn get(&self, id: i64) -> AppResult<User>;

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// All users in id order.
    async fn list(&self) -> AppResult<Vec<User>>;

    /// Case-insensitive substring match over username, email and names.
    async fn search(&self, term: &str) -> AppResult<Vec<User>>;

    async fn update(&self, id: i64, patch: UserPatch) -> AppResult<User>;

    async fn toggle_active(&self, id: i64) -> AppResult<User>;

    /// Hard delete. Returns the removed record.
    async fn delete(&self, id: i64) -> AppResult<User>;

    async fn count(&self) -> AppResult<usize>;
}
