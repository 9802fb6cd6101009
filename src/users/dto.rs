use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{Role, User};

/// Public part of the user returned to clients. Carries no password material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

impl PublicUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// "First Last" when either is known, the username otherwise.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            self.username.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// Request body for user creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// Request body for partial update. Absent and `null` fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub users_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_defaults() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"username":"a","email":"a@example.com","password":"pw"}"#,
        )
        .unwrap();
        assert_eq!(req.role, Role::User);
        assert!(req.first_name.is_none());
        assert!(req.last_name.is_none());
    }

    #[test]
    fn create_request_rejects_unknown_role() {
        let res: Result<CreateUserRequest, _> = serde_json::from_str(
            r#"{"username":"a","email":"a@example.com","password":"pw","role":"root"}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn update_request_null_is_absent() {
        let req: UpdateUserRequest =
            serde_json::from_str(r#"{"first_name":null,"is_active":false}"#).unwrap();
        assert!(req.first_name.is_none());
        assert_eq!(req.is_active, Some(false));
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"is_active":false}"#);
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut user = PublicUser {
            id: 1,
            username: "admin".into(),
            email: "admin@example.com".into(),
            first_name: None,
            last_name: None,
            role: Role::Admin,
            is_active: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: None,
        };
        assert_eq!(user.display_name(), "admin");
        assert!(user.is_admin());

        user.first_name = Some("Admin".into());
        user.last_name = Some("User".into());
        assert_eq!(user.display_name(), "Admin User");
    }

    #[test]
    fn public_user_roundtrips_through_json() {
        let json = r#"{"id":3,"username":"b","email":"b@example.com","first_name":null,
            "last_name":"B","role":"user","is_active":true,"created_at":"2024-05-01T10:00:00Z"}"#;
        let user: PublicUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, 3);
        assert!(user.updated_at.is_none());
        assert!(!user.is_admin());
    }
}
