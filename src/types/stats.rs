use serde::{Deserialize, Serialize};

use super::User;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct UserStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    pub admins: u64,
    pub users: u64,
}

/// One day of the signups chart.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChartPoint {
    pub date: String,
    pub users: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicKey {
    pub public_key: String,
    #[serde(default)]
    pub algorithm: String,
    #[serde(default)]
    pub hash_algorithm: String,
}

/// Advisory export details taken from response headers.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportMetadata {
    pub count: Option<u64>,
    pub format: Option<String>,
    pub size: Option<u64>,
}

/// A decoded binary export.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DecodedCollection {
    pub users: Vec<User>,
    pub total_count: u64,
    pub exported_at: String,
    pub algorithm: String,
    pub hash_algorithm: String,
}
