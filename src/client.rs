use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;

use crate::cache::MemoCache;
use crate::config::Config;
use crate::error::{AdminError, ApiError};
use crate::responses::{self, UserListWire};
use crate::retry::{with_rate_limit_retry, RetryPolicy};
use crate::session::TokenStore;
use crate::types::{
    ChartPoint, ExportMetadata, NewUser, Page, PublicKey, User, UserStats, UserUpdate,
};

const USERS_PATH: &str = "/api/users";
const STATS_PATH: &str = "/api/users/stats";
const CHART_PATH: &str = "/api/users/chart";
const EXPORT_PATH: &str = "/api/users/export";
const PUBLIC_KEY_PATH: &str = "/api/users/crypto/public-key";
const VERIFY_PATH: &str = "/api/users/crypto/verify";
const HEALTH_PATH: &str = "/health";

/// Binary export payload with its advisory headers.
#[derive(Debug, Clone)]
pub struct BinaryExport {
    pub bytes: Vec<u8>,
    pub metadata: ExportMetadata,
}

/// Backend capabilities the controllers depend on.
#[async_trait]
pub trait UserApi: Send + Sync {
    async fn list_users(&self, page: u32, limit: u32) -> Result<Page<User>, ApiError>;
    async fn get_user(&self, id: &str) -> Result<User, ApiError>;
    async fn create_user(&self, user: &NewUser) -> Result<User, ApiError>;
    async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<User, ApiError>;
    async fn delete_user(&self, id: &str) -> Result<(), ApiError>;
    async fn stats(&self) -> Result<UserStats, ApiError>;
    async fn chart(&self, days: u32) -> Result<Vec<ChartPoint>, ApiError>;
    async fn export_binary(&self) -> Result<BinaryExport, ApiError>;
    async fn export_json(&self) -> Result<Vec<User>, ApiError>;
    async fn public_key(&self) -> Result<PublicKey, ApiError>;
    async fn verify_signature(&self, data: &str, signature: &str) -> Result<bool, ApiError>;
    async fn health(&self) -> Result<Value, ApiError>;
}

/// HTTP plumbing shared between direct calls and memoized fetches.
#[derive(Clone)]
struct Transport {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl Transport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), url);
        if let Some(token) = self.tokens.token() {
            request = request.bearer_auth(token);
        }

        tracing::debug!(%method, path, "api request");

        let response = build(request).send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "api request failed");
            ApiError::from(e)
        })?;

        let status = response.status();
        tracing::debug!(%method, path, status = status.as_u16(), "api response");

        if status == StatusCode::UNAUTHORIZED {
            tracing::info!("unauthorized, clearing stored token");
            self.tokens.clear();
        }

        if !status.is_success() {
            let err = ApiError::from_status(status);
            tracing::warn!(%method, path, status = status.as_u16(), error = %err, "api error");
            return Err(err);
        }

        Ok(response)
    }

    async fn json(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Value, ApiError> {
        let response = self.send(method, path, build).await?;
        Ok(response.json::<Value>().await?)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        self.json(Method::GET, path, |r| r.query(query)).await
    }
}

pub struct ApiClient {
    transport: Transport,
    memo: MemoCache<Value>,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(config: &Config, tokens: Arc<dyn TokenStore>) -> crate::error::Result<Self> {
        let base_url = config.api_url();
        Url::parse(&base_url).map_err(|_| AdminError::InvalidUrl(base_url.clone()))?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(AdminError::ClientBuild)?;

        Ok(Self {
            transport: Transport {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
                tokens,
            },
            memo: MemoCache::default(),
            retry: RetryPolicy::default(),
        })
    }

    #[cfg(test)]
    fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Memoized GET, retried while rate limited.
    async fn memoized_get(
        &self,
        key: String,
        path: &'static str,
        query: Vec<(&'static str, String)>,
    ) -> Result<Value, ApiError> {
        let transport = self.transport.clone();
        let retry = self.retry.clone();

        self.memo
            .get_or_fetch(&key, move || async move {
                with_rate_limit_retry(&retry, || transport.get_json(path, &query)).await
            })
            .await
    }

    async fn enveloped<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<T, ApiError> {
        let value = self
            .transport
            .json(method, path, |r| match body {
                Some(body) => r.json(body),
                None => r,
            })
            .await?;
        responses::parse_enveloped(value)
    }
}

fn require_id(id: &str) -> Result<(), ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::Validation);
    }
    Ok(())
}

fn user_path(id: &str) -> String {
    format!("{USERS_PATH}/{id}")
}

/// Read the advisory export headers; unparseable values are dropped.
fn export_metadata(headers: &HeaderMap) -> ExportMetadata {
    let text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
    };

    ExportMetadata {
        count: text("x-user-count").and_then(|v| v.parse().ok()),
        format: text("x-format"),
        size: text("x-size").and_then(|v| v.parse().ok()),
    }
}

#[async_trait]
impl UserApi for ApiClient {
    async fn list_users(&self, page: u32, limit: u32) -> Result<Page<User>, ApiError> {
        if page < 1 || limit == 0 {
            return Err(ApiError::Validation);
        }

        let body = self
            .transport
            .get_json(
                USERS_PATH,
                &[("page", page.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        Ok(UserListWire::from_value(body)?.normalize(page, limit))
    }

    async fn get_user(&self, id: &str) -> Result<User, ApiError> {
        require_id(id)?;
        self.enveloped(Method::GET, &user_path(id), None::<&()>).await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        self.enveloped(Method::POST, USERS_PATH, Some(user)).await
    }

    async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<User, ApiError> {
        require_id(id)?;
        self.enveloped(Method::PUT, &user_path(id), Some(update)).await
    }

    async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        require_id(id)?;
        let response = self
            .transport
            .send(Method::DELETE, &user_path(id), |r| r)
            .await?;

        // 204 replies carry no body
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(());
        }
        let body: Value = serde_json::from_str(&text)
            .map_err(|e| ApiError::UnexpectedShape(e.to_string()))?;
        responses::check_rejected(&body)
    }

    async fn stats(&self) -> Result<UserStats, ApiError> {
        let body = self
            .memoized_get("stats".to_string(), STATS_PATH, Vec::new())
            .await?;
        responses::parse_enveloped(body)
    }

    async fn chart(&self, days: u32) -> Result<Vec<ChartPoint>, ApiError> {
        let body = self
            .memoized_get(
                format!("chart:{days}"),
                CHART_PATH,
                vec![("days", days.to_string())],
            )
            .await?;
        responses::parse_enveloped(body)
    }

    async fn export_binary(&self) -> Result<BinaryExport, ApiError> {
        let cache_bust = chrono::Utc::now().timestamp_millis().to_string();
        let response = self
            .transport
            .send(Method::GET, EXPORT_PATH, |r| r.query(&[("t", cache_bust)]))
            .await?;

        let metadata = export_metadata(response.headers());
        let bytes = response.bytes().await?.to_vec();

        tracing::debug!(bytes = bytes.len(), ?metadata, "binary export received");
        Ok(BinaryExport { bytes, metadata })
    }

    async fn export_json(&self) -> Result<Vec<User>, ApiError> {
        let body = self.transport.get_json(USERS_PATH, &[]).await?;
        Ok(UserListWire::from_value(body)?.into_users())
    }

    async fn public_key(&self) -> Result<PublicKey, ApiError> {
        self.enveloped(Method::GET, PUBLIC_KEY_PATH, None::<&()>)
            .await
    }

    async fn verify_signature(&self, data: &str, signature: &str) -> Result<bool, ApiError> {
        let payload = json!({ "data": data, "signature": signature });
        let body = self
            .transport
            .json(Method::POST, VERIFY_PATH, |r| r.json(&payload))
            .await?;
        responses::parse_verification(body)
    }

    async fn health(&self) -> Result<Value, ApiError> {
        self.transport.get_json(HEALTH_PATH, &[]).await
    }
}
