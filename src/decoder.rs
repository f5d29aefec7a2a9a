//! Decoding of binary user exports.
//!
//! The message layout is not compiled in: it is read from a `.proto` file on
//! first use, so the backend can own the schema. Decoded messages go through a
//! generic JSON form and are then mapped onto [`User`], accepting either
//! snake_case or camelCase field names depending on how the schema spells
//! them.

use std::path::{Path, PathBuf};

use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor, SerializeOptions};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use crate::error::ApiError;
use crate::types::{DecodedCollection, Role, Status, User};

const USER_MESSAGE: &str = "user.User";
const COLLECTION_MESSAGE: &str = "user.UserCollection";

pub const DEFAULT_ALGORITHM: &str = "RSA-2048";
pub const DEFAULT_HASH_ALGORITHM: &str = "SHA-384";

struct Schema {
    user: MessageDescriptor,
    collection: MessageDescriptor,
}

pub struct Decoder {
    schema_path: PathBuf,
    schema: OnceCell<Schema>,
}

impl Decoder {
    pub fn new(schema_path: impl Into<PathBuf>) -> Self {
        Self {
            schema_path: schema_path.into(),
            schema: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.schema.initialized()
    }

    /// Load the schema once. Callers racing the first load all wait on it; a
    /// failed load is reported and retried on the next call.
    async fn schema(&self) -> Result<&Schema, ApiError> {
        self.schema
            .get_or_try_init(|| async { load_schema(&self.schema_path) })
            .await
    }

    pub async fn decode_collection(&self, bytes: &[u8]) -> Result<DecodedCollection, ApiError> {
        let schema = self.schema().await?;
        let decoded = decode_to_json(&schema.collection, bytes)?;
        let collection = canonical_collection(&decoded, &now());

        tracing::debug!(
            users = collection.users.len(),
            total_count = collection.total_count,
            algorithm = %collection.algorithm,
            "decoded user collection"
        );
        Ok(collection)
    }

    pub async fn decode_user(&self, bytes: &[u8]) -> Result<User, ApiError> {
        let schema = self.schema().await?;
        let decoded = decode_to_json(&schema.user, bytes)?;
        let record = decoded
            .as_object()
            .ok_or_else(|| ApiError::Decode("user is not a message".into()))?;
        Ok(canonical_user(record, &now()))
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn load_schema(path: &Path) -> Result<Schema, ApiError> {
    let file = path
        .file_name()
        .ok_or_else(|| ApiError::Schema(format!("{} is not a file", path.display())))?;
    let include = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let files = protox::compile([file], [include]).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "failed to compile schema");
        ApiError::Schema(e.to_string())
    })?;
    let pool = DescriptorPool::from_file_descriptor_set(files)
        .map_err(|e| ApiError::Schema(e.to_string()))?;

    let lookup = |name: &str| {
        pool.get_message_by_name(name)
            .ok_or_else(|| ApiError::Schema(format!("message {name} not found")))
    };

    let schema = Schema {
        user: lookup(USER_MESSAGE)?,
        collection: lookup(COLLECTION_MESSAGE)?,
    };
    tracing::info!(path = %path.display(), "binary schema loaded");
    Ok(schema)
}

fn decode_to_json(descriptor: &MessageDescriptor, bytes: &[u8]) -> Result<Value, ApiError> {
    let mut message = DynamicMessage::new(descriptor.clone());
    message
        .merge(bytes)
        .map_err(|e| ApiError::Decode(e.to_string()))?;

    let options = SerializeOptions::new()
        .use_proto_field_name(true)
        .skip_default_fields(false);

    message
        .serialize_with_options(serde_json::value::Serializer, &options)
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// First non-empty string among the snake_case and camelCase spellings.
fn pick<'a>(record: &'a Map<String, Value>, snake: &str, camel: &str) -> Option<&'a str> {
    [snake, camel]
        .into_iter()
        .filter_map(|key| record.get(key).and_then(Value::as_str))
        .find(|v| !v.is_empty())
}

fn pick_or(record: &Map<String, Value>, snake: &str, camel: &str, default: &str) -> String {
    pick(record, snake, camel).unwrap_or(default).to_string()
}

pub fn canonical_user(record: &Map<String, Value>, now: &str) -> User {
    User {
        id: pick_or(record, "id", "id", ""),
        email: pick_or(record, "email", "email", ""),
        role: pick(record, "role", "role")
            .map(Role::from_label)
            .unwrap_or_default(),
        status: pick(record, "status", "status")
            .map(Status::from_label)
            .unwrap_or_default(),
        created_at: pick_or(record, "created_at", "createdAt", now),
        email_hash: pick_or(record, "email_hash", "emailHash", ""),
        signature: pick_or(record, "signature", "signature", ""),
    }
}

pub fn canonical_collection(decoded: &Value, now: &str) -> DecodedCollection {
    let empty = Map::new();
    let root = decoded.as_object().unwrap_or(&empty);

    let users: Vec<User> = root
        .get("users")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(|record| canonical_user(record, now))
                .collect()
        })
        .unwrap_or_default();

    // 64-bit integers arrive as strings
    let total_count = ["total_count", "totalCount"]
        .into_iter()
        .filter_map(|key| root.get(key))
        .find_map(|v| {
            v.as_u64()
                .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        })
        .filter(|n| *n > 0)
        .unwrap_or(users.len() as u64);

    DecodedCollection {
        total_count,
        exported_at: pick_or(root, "exported_at", "exportedAt", now),
        algorithm: pick_or(root, "algorithm", "algorithm", DEFAULT_ALGORITHM),
        hash_algorithm: pick_or(root, "hash_algorithm", "hashAlgorithm", DEFAULT_HASH_ALGORITHM),
        users,
    }
}
