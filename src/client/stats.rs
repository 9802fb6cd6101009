use crate::users::{dto::PublicUser, repo_types::Role};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub total_users: usize,
    pub active_users: usize,
    pub inactive_users: usize,
    pub admin_users: usize,
    pub regular_users: usize,
}

impl UserStats {
    pub fn from_users(users: &[PublicUser]) -> Self {
        let active_users = users.iter().filter(|u| u.is_active).count();
        let admin_users = users.iter().filter(|u| u.role == Role::Admin).count();
        Self {
            total_users: users.len(),
            active_users,
            inactive_users: users.len() - active_users,
            admin_users,
            regular_users: users.len() - admin_users,
        }
    }

    /// Share of active users, 0-100.
    pub fn active_percent(&self) -> u32 {
        if self.total_users == 0 {
            return 0;
        }
        ((self.active_users * 100) / self.total_users) as u32
    }
}
