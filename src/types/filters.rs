use clap::ValueEnum;
use serde::Serialize;

use super::{Role, Status, User};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleFilter {
    #[default]
    All,
    Admin,
    User,
}

impl RoleFilter {
    pub fn matches(self, role: Role) -> bool {
        match self {
            RoleFilter::All => true,
            RoleFilter::Admin => role == Role::Admin,
            RoleFilter::User => role == Role::User,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    pub fn matches(self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => status == Status::Active,
            StatusFilter::Inactive => status == Status::Inactive,
        }
    }
}

/// Client-side filters over the loaded page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserFilters {
    pub search: String,
    pub role: RoleFilter,
    pub status: StatusFilter,
}

impl UserFilters {
    /// Case-insensitive substring search over email, role and status, then
    /// the role and status filters.
    pub fn matches(&self, user: &User) -> bool {
        let term = self.search.trim().to_lowercase();
        let found = term.is_empty()
            || user.email.to_lowercase().contains(&term)
            || user.role.label().contains(&term)
            || user.status.label().contains(&term);

        found && self.role.matches(user.role) && self.status.matches(user.status)
    }
}
