//! Backend response shapes and their normalization.
//!
//! The backend is not consistent about where it puts list data and
//! pagination, so each accepted shape is an explicit variant and a pure
//! function maps it to the canonical [`Page`].

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::types::{Page, Pagination, User};

/// `{success, data, error?, message?}` envelope around single-object replies.
#[derive(Deserialize, Debug)]
pub struct Envelope<T> {
    pub success: Option<bool>,
    pub data: Option<T>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn into_data(self) -> Result<T, ApiError> {
        if self.success == Some(false) {
            return Err(rejection(self.error, self.message));
        }
        self.data.ok_or(ApiError::EmptyResponse)
    }
}

/// Turn an explicit `success: false` body into an error, if it is one.
pub fn check_rejected(body: &Value) -> Result<(), ApiError> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let text = |key: &str| body.get(key).and_then(Value::as_str).map(String::from);
        return Err(rejection(text("error"), text("message")));
    }
    Ok(())
}

fn rejection(error: Option<String>, message: Option<String>) -> ApiError {
    error
        .or(message)
        .map(ApiError::Rejected)
        .unwrap_or(ApiError::Unknown)
}

/// Deserialize an enveloped payload.
pub fn parse_enveloped<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    check_rejected(&body)?;
    let envelope: Envelope<T> = serde_json::from_value(body)
        .map_err(|e| ApiError::UnexpectedShape(e.to_string()))?;
    envelope.into_data()
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaginationWire {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub total: Option<u64>,
    pub total_count: Option<u64>,
    pub total_pages: Option<u32>,
    pub has_next_page: Option<bool>,
    pub has_prev_page: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct NestedUsers {
    pub users: Vec<User>,
    #[serde(default)]
    pub pagination: Option<PaginationWire>,
}

/// Every list shape the backend is known to send.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum UserListWire {
    /// `{success, data: [..], pagination}`
    Flat {
        #[serde(default)]
        success: Option<bool>,
        data: Vec<User>,
        #[serde(default)]
        pagination: Option<PaginationWire>,
    },
    /// `{success, data: {users: [..], pagination?}, pagination?}`
    Nested {
        #[serde(default)]
        success: Option<bool>,
        data: NestedUsers,
        #[serde(default)]
        pagination: Option<PaginationWire>,
    },
    /// A bare array of users.
    Bare(Vec<User>),
}

impl UserListWire {
    pub fn from_value(body: Value) -> Result<Self, ApiError> {
        check_rejected(&body)?;
        serde_json::from_value(body).map_err(|_| {
            ApiError::UnexpectedShape("expected a user list with data and pagination".into())
        })
    }

    /// Drop the pagination and keep the records.
    pub fn into_users(self) -> Vec<User> {
        match self {
            UserListWire::Flat { data, .. } => data,
            UserListWire::Nested { data, .. } => data.users,
            UserListWire::Bare(users) => users,
        }
    }

    /// Map any accepted shape to the canonical page.
    ///
    /// Missing pagination fields fall back to what was requested and to the
    /// number of records received.
    pub fn normalize(self, requested_page: u32, requested_limit: u32) -> Page<User> {
        let (success, users, wire) = match self {
            UserListWire::Flat {
                success,
                data,
                pagination,
            } => (success, data, pagination),
            UserListWire::Nested {
                success,
                data,
                pagination,
            } => (success, data.users, pagination.or(data.pagination)),
            UserListWire::Bare(users) => (None, users, None),
        };

        let wire = wire.unwrap_or_default();
        let total = wire
            .total
            .or(wire.total_count)
            .unwrap_or(users.len() as u64);

        Page {
            success: success.unwrap_or(true),
            pagination: Pagination::normalized(
                wire.page.unwrap_or(requested_page),
                wire.limit.unwrap_or(requested_limit),
                total,
                wire.total_pages,
                wire.has_next_page,
                wire.has_prev_page,
            ),
            data: users,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum Verdict {
    Bool(bool),
    Valid { valid: bool },
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum VerifyWire {
    Wrapped { data: Verdict },
    Direct(Verdict),
}

/// Read the boolean out of a verify reply.
pub fn parse_verification(body: Value) -> Result<bool, ApiError> {
    check_rejected(&body)?;
    let wire: VerifyWire = serde_json::from_value(body)
        .map_err(|_| ApiError::UnexpectedShape("expected a verification result".into()))?;

    let verdict = match wire {
        VerifyWire::Wrapped { data } => data,
        VerifyWire::Direct(verdict) => verdict,
    };

    Ok(match verdict {
        Verdict::Bool(valid) | Verdict::Valid { valid } => valid,
    })
}
