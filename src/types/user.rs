use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Account role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    /// Parse a role label, falling back to `User` for anything unrecognized.
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Account status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Inactive,
}

impl Status {
    /// Parse a status label, falling back to `Active` for anything unrecognized.
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("inactive") {
            Status::Inactive
        } else {
            Status::Active
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Inactive => "inactive",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A user record as listed by the backend.
///
/// Every field tolerates `null`, a missing key, or an unexpected scalar, so
/// one malformed record is left for verification to drop instead of failing
/// the whole page.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct User {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(deserialize_with = "lenient_role")]
    pub role: Role,
    #[serde(deserialize_with = "lenient_status")]
    pub status: Status,
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(deserialize_with = "lenient_string")]
    pub email_hash: String,
    #[serde(deserialize_with = "lenient_string")]
    pub signature: String,
}

/// Strings as-is, numbers and booleans as text, anything else empty.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_role<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Role, D::Error> {
    lenient_string(deserializer).map(|label| Role::from_label(&label))
}

fn lenient_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Status, D::Error> {
    lenient_string(deserializer).map(|label| Status::from_label(&label))
}

impl User {
    /// Both cryptographic fields are present, so the record can be verified.
    pub fn has_crypto_fields(&self) -> bool {
        !self.email_hash.is_empty() && !self.signature.is_empty()
    }
}

/// Body of a create request.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub role: Role,
    pub status: Status,
}

/// Body of a partial update; absent fields are left untouched.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.role.is_none() && self.status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_user_uses_defaults() {
        let user: User = serde_json::from_str(r#"{"id": "1"}"#).unwrap();
        assert_eq!(user.id, "1");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.status, Status::Active);
        assert!(!user.has_crypto_fields());
    }

    #[test]
    fn test_null_and_odd_fields_do_not_fail() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": 42,
            "email": null,
            "role": "superuser",
            "status": null,
            "created_at": null,
            "email_hash": null,
            "signature": null
        }))
        .unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(user.email, "");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.status, Status::Active);
        assert!(!user.has_crypto_fields());
    }

    #[test]
    fn test_update_skips_absent_fields() {
        let update = UserUpdate {
            status: Some(Status::Inactive),
            ..UserUpdate::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"status": "inactive"})
        );
    }

    #[test]
    fn test_labels_fall_back() {
        assert_eq!(Role::from_label("ADMIN"), Role::Admin);
        assert_eq!(Role::from_label("superuser"), Role::User);
        assert_eq!(Status::from_label("inactive"), Status::Inactive);
        assert_eq!(Status::from_label(""), Status::Active);
    }
}
