//! In-memory backend for controller tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::client::{BinaryExport, UserApi};
use crate::error::ApiError;
use crate::types::{
    ChartPoint, ExportMetadata, NewUser, Page, Pagination, PublicKey, Role, Status, User,
    UserStats, UserUpdate,
};

#[derive(Clone, Copy)]
pub enum Verify {
    Valid,
    Invalid,
    Fail,
}

#[derive(Default)]
pub struct FakeApi {
    pub users: Mutex<Vec<User>>,
    pub verdicts: HashMap<String, Verify>,
    pub fail_list: Option<ApiError>,
    pub fail_mutations: Option<ApiError>,
    pub fail_stats: Option<ApiError>,
    pub binary: Vec<u8>,
    pub list_calls: Mutex<Vec<(u32, u32)>>,
    pub verify_calls: Mutex<Vec<String>>,
    pub delete_calls: Mutex<Vec<String>>,
    pub export_calls: AtomicUsize,
    /// When set, deletes wait for a notification before completing.
    pub delete_gate: Option<Arc<Notify>>,
}

pub fn user(id: &str, email: &str) -> User {
    User {
        id: id.to_string(),
        email: email.to_string(),
        role: Role::User,
        status: Status::Active,
        created_at: "2025-01-01T00:00:00Z".to_string(),
        email_hash: format!("hash-{id}"),
        signature: format!("sig-{id}"),
    }
}

impl FakeApi {
    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users),
            ..Self::default()
        }
    }

    pub fn verdict(mut self, id: &str, verdict: Verify) -> Self {
        self.verdicts.insert(format!("hash-{id}"), verdict);
        self
    }

    pub fn list_calls(&self) -> Vec<(u32, u32)> {
        self.list_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserApi for FakeApi {
    async fn list_users(&self, page: u32, limit: u32) -> Result<Page<User>, ApiError> {
        self.list_calls.lock().unwrap().push((page, limit));
        if let Some(err) = &self.fail_list {
            return Err(err.clone());
        }

        let users = self.users.lock().unwrap();
        let start = ((page - 1) * limit) as usize;
        let data: Vec<User> = users
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(Page {
            success: true,
            data,
            pagination: Pagination::normalized(page, limit, users.len() as u64, None, None, None),
        })
    }

    async fn get_user(&self, id: &str) -> Result<User, ApiError> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn create_user(&self, new: &NewUser) -> Result<User, ApiError> {
        if let Some(err) = &self.fail_mutations {
            return Err(err.clone());
        }
        let mut users = self.users.lock().unwrap();
        let mut created = user(&(users.len() + 1).to_string(), &new.email);
        created.role = new.role;
        created.status = new.status;
        users.push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<User, ApiError> {
        if let Some(err) = &self.fail_mutations {
            return Err(err.clone());
        }
        let mut users = self.users.lock().unwrap();
        let found = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(ApiError::NotFound)?;
        if let Some(email) = &update.email {
            found.email = email.clone();
        }
        if let Some(role) = update.role {
            found.role = role;
        }
        if let Some(status) = update.status {
            found.status = status;
        }
        Ok(found.clone())
    }

    async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        self.delete_calls.lock().unwrap().push(id.to_string());
        if let Some(gate) = &self.delete_gate {
            gate.notified().await;
        }
        if let Some(err) = &self.fail_mutations {
            return Err(err.clone());
        }
        self.users.lock().unwrap().retain(|u| u.id != id);
        Ok(())
    }

    async fn stats(&self) -> Result<UserStats, ApiError> {
        if let Some(err) = &self.fail_stats {
            return Err(err.clone());
        }
        let total = self.users.lock().unwrap().len() as u64;
        Ok(UserStats {
            total,
            active: total,
            ..UserStats::default()
        })
    }

    async fn chart(&self, days: u32) -> Result<Vec<ChartPoint>, ApiError> {
        Ok((0..days)
            .map(|d| ChartPoint {
                date: format!("2025-01-{:02}", d + 1),
                users: u64::from(d),
            })
            .collect())
    }

    async fn export_binary(&self) -> Result<BinaryExport, ApiError> {
        self.export_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.fail_list {
            return Err(err.clone());
        }
        Ok(BinaryExport {
            bytes: self.binary.clone(),
            metadata: ExportMetadata {
                count: Some(self.users.lock().unwrap().len() as u64),
                format: Some("protobuf".to_string()),
                size: Some(self.binary.len() as u64),
            },
        })
    }

    async fn export_json(&self) -> Result<Vec<User>, ApiError> {
        self.export_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.fail_list {
            return Err(err.clone());
        }
        Ok(self.users.lock().unwrap().clone())
    }

    async fn public_key(&self) -> Result<PublicKey, ApiError> {
        Ok(PublicKey {
            public_key: "-----BEGIN PUBLIC KEY-----".to_string(),
            algorithm: "RSA-2048".to_string(),
            hash_algorithm: "SHA-384".to_string(),
        })
    }

    async fn verify_signature(&self, data: &str, _signature: &str) -> Result<bool, ApiError> {
        self.verify_calls.lock().unwrap().push(data.to_string());
        match self.verdicts.get(data).copied().unwrap_or(Verify::Valid) {
            Verify::Valid => Ok(true),
            Verify::Invalid => Ok(false),
            Verify::Fail => Err(ApiError::Server),
        }
    }

    async fn health(&self) -> Result<Value, ApiError> {
        Ok(json!({ "status": "ok" }))
    }
}
