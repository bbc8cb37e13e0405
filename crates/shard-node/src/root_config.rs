//! Root-config fetch-API client (§9: "Async fetch caching via LRU
//! decorator"): learns a debtor's root-configured target interest rate
//! over HTTP, caching each response for a short TTL so a burst of
//! `configure_account` calls for the same debtor doesn't hammer the API.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration as StdDuration, Instant};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RootConfigData {
    pub interest_rate_target: f32,
}

struct CacheEntry {
    fetched_at: Instant,
    data: RootConfigData,
}

pub struct RootConfigClient {
    http: reqwest::Client,
    base_url: String,
    ttl: StdDuration,
    cache: Mutex<HashMap<i64, CacheEntry>>,
}

impl RootConfigClient {
    pub fn new(base_url: String, ttl: StdDuration) -> Self {
        Self { http: reqwest::Client::new(), base_url, ttl, cache: Mutex::new(HashMap::new()) }
    }

    /// Fetches (or returns a cached) `RootConfigData` for `debtor_id`.
    pub async fn get(&self, debtor_id: i64) -> anyhow::Result<RootConfigData> {
        if let Some(entry) = self.cache.lock().expect("root config cache poisoned").get(&debtor_id) {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(entry.data.clone());
            }
        }

        let url = format!("{}/debtors/{}/config", self.base_url, debtor_id);
        let data: RootConfigData = self.http.get(&url).send().await?.error_for_status()?.json().await?;

        self.cache
            .lock()
            .expect("root config cache poisoned")
            .insert(debtor_id, CacheEntry { fetched_at: Instant::now(), data: data.clone() });
        Ok(data)
    }
}
