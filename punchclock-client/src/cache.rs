//! Request interception layer at the server origin.
//!
//! | request                                  | decision                                   |
//! |------------------------------------------|--------------------------------------------|
//! | not GET, or another origin               | bypass: straight to the network, not cached|
//! | GET, hit in the active generation        | cached response, no network call           |
//! | GET, miss, 2xx basic, allow-listed path  | network response, stored                   |
//! | GET, miss, any other network response    | network response, not stored               |
//! | GET, network failure, navigation         | cached fallback document, or 503           |
//! | GET, network failure, anything else      | synthesized 503                            |
//!
//! Cached responses are never revalidated. Exactly one generation is active and activating
//! it drops every other generation.

use crate::database::Database;
use crate::error::ClientError;
use crate::settings::Settings;
use async_trait::async_trait;
use eyre::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode, Url};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// A top level document load.
    Navigate,
    Other,
}

#[derive(Debug, Clone)]
pub struct CacheRequest {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
}

impl CacheRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            mode: RequestMode::Other,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn navigate(url: Url) -> Self {
        Self {
            mode: RequestMode::Navigate,
            ..Self::get(url)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    Synthesized,
}

#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    /// Final url after redirects.
    pub url: Url,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub source: ResponseSource,
}

impl CachedResponse {
    fn offline(url: Url) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            url,
            content_type: Some("text/plain".into()),
            body: b"Offline".to_vec(),
            source: ResponseSource::Synthesized,
        }
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// The network side of the cache.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Errors only when no response was received at all.
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, ClientError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, ClientError> {
        let res = self
            .client
            .request(request.method.clone(), request.url.clone())
            .timeout(self.timeout)
            .send()
            .await?;

        let status = res.status();
        let url = res.url().clone();
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|x| x.to_str().ok())
            .map(String::from);
        let body = res.bytes().await?.to_vec();

        Ok(CachedResponse {
            status,
            url,
            content_type,
            body,
            source: ResponseSource::Network,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Bypass,
    Intercept,
}

#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub origin: Url,
    pub generation: String,
    pub cacheable_prefixes: Vec<String>,
    pub precache: Vec<String>,
    pub fallback_path: String,
}

impl CachePolicy {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let origin = Url::parse(&settings.server_address)
            .wrap_err_with(|| format!("Invalid server address {}", settings.server_address))?;

        Ok(Self {
            origin,
            generation: settings.cache_generation.clone(),
            cacheable_prefixes: settings.cacheable_prefixes.clone(),
            precache: settings.precache.clone(),
            fallback_path: settings.fallback_path.clone(),
        })
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        self.origin
            .join(path)
            .wrap_err_with(|| format!("Invalid path {path}"))
    }

    fn is_cacheable(&self, url: &Url) -> bool {
        self.cacheable_prefixes
            .iter()
            .any(|prefix| url.path().starts_with(prefix.as_str()))
    }
}

pub struct ResponseCache {
    pool: SqlitePool,
    policy: CachePolicy,
    fetcher: Arc<dyn Fetcher>,
}

impl ResponseCache {
    pub fn new(db: &Database, policy: CachePolicy, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            pool: db.pool.clone(),
            policy,
            fetcher,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn decide(&self, request: &CacheRequest) -> Decision {
        if request.method != Method::GET {
            return Decision::Bypass;
        }
        if request.url.origin() != self.policy.origin.origin() {
            return Decision::Bypass;
        }
        Decision::Intercept
    }

    /// Makes the configured generation the only one. Returns how many generations were dropped.
    pub async fn activate(&self) -> Result<u64, sqlx::Error> {
        let generation = self.policy.generation.as_str();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            insert into cache_generations(name, activated_at) values(?1, ?2)
            on conflict(name) do nothing
            "#,
        )
        .bind(generation)
        .bind(OffsetDateTime::now_utc().unix_timestamp())
        .execute(&mut *tx)
        .await?;
        sqlx::query("delete from cached_responses where generation != ?1")
            .bind(generation)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("delete from cache_generations where name != ?1")
            .bind(generation)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if removed > 0 {
            info!("activated cache {generation}, dropped {removed} old generations");
        }
        Ok(removed)
    }

    /// Fetches the precache list into the active generation. Returns how many were stored.
    pub async fn install(&self) -> Result<usize> {
        let mut stored = 0;
        for path in &self.policy.precache {
            let request = CacheRequest::get(self.policy.url(path)?);
            match self.fetcher.fetch(&request).await {
                Ok(response) if response.status.is_success() => {
                    self.store(&request, &response).await?;
                    stored += 1;
                }
                Ok(response) => warn!("not precaching {path}: status {}", response.status),
                Err(err) => warn!("not precaching {path}: {err}"),
            }
        }

        Ok(stored)
    }

    pub async fn generations(&self) -> Result<Vec<String>, sqlx::Error> {
        let res: Vec<(String,)> = sqlx::query_as("select name from cache_generations order by name")
            .fetch_all(&self.pool)
            .await?;

        Ok(res.into_iter().map(|(name,)| name).collect())
    }

    /// GET a path on the origin through the cache.
    pub async fn get(&self, path: &str) -> Result<CachedResponse> {
        let request = CacheRequest::get(self.policy.url(path)?);
        Ok(self.fetch(&request).await?)
    }

    pub async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, ClientError> {
        if self.decide(request) == Decision::Bypass {
            return self.fetcher.fetch(request).await;
        }

        match self.lookup(&request.method, &request.url).await {
            Ok(Some(hit)) => {
                debug!("cache hit {}", request.url);
                return Ok(hit);
            }
            Ok(None) => {}
            Err(err) => warn!("cache lookup failed {err}"),
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if self.should_store(request, &response) {
                    if let Err(err) = self.store(request, &response).await {
                        warn!("Failed to cache {}: {err}", request.url);
                    }
                }
                Ok(response)
            }
            Err(err) => {
                debug!("network failure for {}: {err}", request.url);
                Ok(self.offline_response(request).await)
            }
        }
    }

    fn should_store(&self, request: &CacheRequest, response: &CachedResponse) -> bool {
        let basic = response.url == request.url;
        response.status.is_success() && basic && self.policy.is_cacheable(&request.url)
    }

    async fn offline_response(&self, request: &CacheRequest) -> CachedResponse {
        if request.mode == RequestMode::Navigate {
            if let Ok(fallback) = self.policy.url(&self.policy.fallback_path) {
                match self.lookup(&Method::GET, &fallback).await {
                    Ok(Some(hit)) => return hit,
                    Ok(None) => {}
                    Err(err) => warn!("fallback lookup failed {err}"),
                }
            }
        }

        CachedResponse::offline(request.url.clone())
    }

    async fn lookup(
        &self,
        method: &Method,
        url: &Url,
    ) -> Result<Option<CachedResponse>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            select status, content_type, body from cached_responses
            where generation = ?1 and method = ?2 and url = ?3
            "#,
        )
        .bind(self.policy.generation.as_str())
        .bind(method.as_str())
        .bind(url.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status = u16::try_from(row.try_get::<i64, _>("status")?)
            .ok()
            .and_then(|x| StatusCode::from_u16(x).ok())
            .unwrap_or(StatusCode::OK);

        Ok(Some(CachedResponse {
            status,
            url: url.clone(),
            content_type: row.try_get("content_type")?,
            body: row.try_get("body")?,
            source: ResponseSource::Cache,
        }))
    }

    async fn store(
        &self,
        request: &CacheRequest,
        response: &CachedResponse,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            insert into cached_responses(
                generation, method, url, status, content_type, body, cached_at
            )
            values(?1, ?2, ?3, ?4, ?5, ?6, ?7)
            on conflict(generation, method, url) do update set
                status = ?4,
                content_type = ?5,
                body = ?6,
                cached_at = ?7
            "#,
        )
        .bind(self.policy.generation.as_str())
        .bind(request.method.as_str())
        .bind(request.url.as_str())
        .bind(i64::from(response.status.as_u16()))
        .bind(response.content_type.as_deref())
        .bind(response.body.as_slice())
        .bind(OffsetDateTime::now_utc().unix_timestamp())
        .execute(&self.pool)
        .await?;

        debug!("cached {}", request.url);
        Ok(())
    }
}
