//! HTTP-backed reservation repository.
//!
//! Reads go through a TTL cache keyed by date range; identical concurrent
//! fetches are coalesced onto one in-flight request. Mutations invalidate
//! the cache so the follow-up bypass re-fetch sees live data.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use moka::sync::Cache;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use roomsync_core::{CachePolicy, ReservationRepository};
use roomsync_domain::constants::{FETCH_CACHE_MAX_RANGES, FETCH_CACHE_TTL_SECS};
use roomsync_domain::{
    Config, DateRange, DayClearEvent, HistoryEvent, Reservation, ReservationPatch,
    ReservationStatus, Result, RoomSyncError, Room,
};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::api::auth::SessionProvider;
use crate::errors::status_to_error;
use crate::http::HttpClient;

type SharedFetch = Shared<BoxFuture<'static, Result<Vec<Reservation>>>>;

/// Configuration for the reservation API client.
#[derive(Debug, Clone)]
pub struct ReservationApiConfig {
    /// Base URL for the API (e.g. "https://rooms.example.com/api").
    pub base_url: String,
    /// Timeout for API requests.
    pub timeout: Duration,
    /// Read cache entry lifetime.
    pub cache_ttl: Duration,
    /// Maximum cached ranges.
    pub cache_max_ranges: u64,
}

impl Default for ReservationApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(FETCH_CACHE_TTL_SECS),
            cache_max_ranges: FETCH_CACHE_MAX_RANGES,
        }
    }
}

impl ReservationApiConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.api.base_url.clone(),
            timeout: Duration::from_secs(config.api.timeout_seconds),
            cache_ttl: Duration::from_secs(config.cache.ttl_seconds),
            cache_max_ranges: config.cache.max_ranges,
        }
    }
}

struct ClientInner {
    http: HttpClient,
    base_url: String,
    session: Arc<dyn SessionProvider>,
    cache: Cache<String, Vec<Reservation>>,
    /// In-flight fetches by range key. The ticket lets a bypass fetch
    /// replace a joinable entry without the finished future removing the
    /// newer one.
    inflight: Mutex<HashMap<String, (u64, SharedFetch)>>,
    next_ticket: AtomicU64,
}

impl ClientInner {
    fn inflight(&self) -> MutexGuard<'_, HashMap<String, (u64, SharedFetch)>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn authed(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let token = self.session.access_token().await?;
        Ok(self
            .http
            .request(method, url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json"))
    }

    async fn check(&self, response: Response, url: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_to_error(status, url, &body))
    }

    async fn parse<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        if response.status() == StatusCode::NO_CONTENT {
            return serde_json::from_value(serde_json::Value::Null)
                .map_err(|e| RoomSyncError::Internal(format!("empty body not deserializable: {e}")));
        }
        response
            .json()
            .await
            .map_err(|e| RoomSyncError::Internal(format!("failed to parse response: {e}")))
    }

    async fn fetch_remote(&self, range: DateRange) -> Result<Vec<Reservation>> {
        let url = format!(
            "{}/reservations?start={}&end={}",
            self.base_url, range.start, range.end
        );
        let request = self.authed(Method::GET, &url).await?;
        let response = self.http.send(request).await?;
        let response = self.check(response, &url).await?;
        self.parse(response).await
    }
}

/// Reservation repository over the room-reservation HTTP API.
#[derive(Clone)]
pub struct ReservationApiClient {
    inner: Arc<ClientInner>,
}

impl ReservationApiClient {
    pub fn new(
        config: ReservationApiConfig,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self> {
        let http = HttpClient::builder().timeout(config.timeout).build()?;
        let cache = Cache::builder()
            .time_to_live(config.cache_ttl)
            .max_capacity(config.cache_max_ranges)
            .build();

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                session,
                cache,
                inflight: Mutex::new(HashMap::new()),
                next_ticket: AtomicU64::new(0),
            }),
        })
    }

    fn range_key(range: DateRange) -> String {
        format!("{}..{}", range.start, range.end)
    }

    /// Install a new shared fetch for `key`, replacing any current entry.
    fn install_fetch(&self, key: String, range: DateRange) -> SharedFetch {
        let inner = Arc::clone(&self.inner);
        let ticket = inner.next_ticket.fetch_add(1, Ordering::Relaxed);
        let future_key = key.clone();
        let future_inner = Arc::clone(&self.inner);

        let shared: SharedFetch = async move {
            let result = future_inner.fetch_remote(range).await;
            if let Ok(records) = &result {
                future_inner.cache.insert(future_key.clone(), records.clone());
            }
            // Only remove the entry this very fetch installed.
            let mut inflight = future_inner.inflight();
            if inflight.get(&future_key).map(|(t, _)| *t) == Some(ticket) {
                inflight.remove(&future_key);
            }
            result
        }
        .boxed()
        .shared();

        inner.inflight().insert(key, (ticket, shared.clone()));
        shared
    }
}

#[async_trait]
impl ReservationRepository for ReservationApiClient {
    /// Fetch reservations intersecting `range`.
    ///
    /// `Default` policy consults the TTL cache and joins any identical
    /// in-flight request. `Bypass` always issues a fresh request; its result
    /// repopulates the cache.
    #[instrument(skip(self), fields(start = %range.start, end = %range.end))]
    async fn fetch_range(
        &self,
        range: DateRange,
        policy: CachePolicy,
    ) -> Result<Vec<Reservation>> {
        let key = Self::range_key(range);

        if policy == CachePolicy::Default {
            if let Some(hit) = self.inner.cache.get(&key) {
                debug!(key, "fetch served from cache");
                return Ok(hit);
            }
            let joinable = self.inner.inflight().get(&key).map(|(_, f)| f.clone());
            if let Some(pending) = joinable {
                debug!(key, "joining in-flight fetch");
                return pending.await;
            }
        }

        self.install_fetch(key, range).await
    }

    async fn update_status(&self, id: &str, status: ReservationStatus) -> Result<()> {
        let url = format!("{}/reservations/{id}/status", self.inner.base_url);
        let request = self
            .inner
            .authed(Method::PUT, &url)
            .await?
            .json(&serde_json::json!({ "reservationStatus": status }));
        let response = self.inner.http.send(request).await?;
        self.inner.check(response, &url).await?;
        self.inner.cache.invalidate_all();
        Ok(())
    }

    async fn update_fields(&self, id: &str, patch: &ReservationPatch) -> Result<Reservation> {
        let url = format!("{}/reservations/{id}", self.inner.base_url);
        let request = self.inner.authed(Method::PUT, &url).await?.json(patch);
        let response = self.inner.http.send(request).await?;
        let response = self.inner.check(response, &url).await?;
        let updated = self.inner.parse(response).await?;
        self.inner.cache.invalidate_all();
        Ok(updated)
    }

    async fn delete_reservation(&self, id: &str) -> Result<()> {
        let url = format!("{}/reservations/{id}", self.inner.base_url);
        let request = self.inner.authed(Method::DELETE, &url).await?;
        let response = self.inner.http.send(request).await?;
        self.inner.check(response, &url).await?;
        self.inner.cache.invalidate_all();
        Ok(())
    }

    async fn fetch_history(&self, day: NaiveDate, room: &Room) -> Result<Vec<HistoryEvent>> {
        let url = format!("{}/reservations/history", self.inner.base_url);
        let request = self
            .inner
            .authed(Method::GET, &url)
            .await?
            .query(&[("date", day.to_string()), ("room", room.to_string())]);
        let response = self.inner.http.send(request).await?;
        let response = self.inner.check(response, &url).await?;
        let mut events: Vec<HistoryEvent> = self.inner.parse(response).await?;
        // Newest first regardless of server ordering.
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(events)
    }

    async fn fetch_day_clear_events(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DayClearEvent>> {
        let url = format!("{}/day-clear-events", self.inner.base_url);
        let mut request = self.inner.authed(Method::GET, &url).await?;
        if let Some(since) = since {
            request = request.query(&[("since", since.to_rfc3339())]);
        }
        let response = self.inner.http.send(request).await?;
        let response = self.inner.check(response, &url).await?;
        self.inner.parse(response).await
    }

    async fn consume_event(&self, id: &str) -> Result<()> {
        let url = format!("{}/day-clear-events/{id}/consume", self.inner.base_url);
        let request = self.inner.authed(Method::POST, &url).await?;
        let response = self.inner.http.send(request).await?;
        self.inner.check(response, &url).await?;
        Ok(())
    }

    async fn consume_events(&self, ids: &[String]) -> Result<()> {
        let url = format!("{}/day-clear-events/consume", self.inner.base_url);
        let request = self
            .inner
            .authed(Method::POST, &url)
            .await?
            .json(&serde_json::json!({ "ids": ids }));
        let response = self.inner.http.send(request).await?;
        self.inner.check(response, &url).await?;
        Ok(())
    }

    fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all();
        self.inner.inflight().clear();
    }
}
