//! Advisory client for AI pricing suggestions.
//!
//! - Talks to any OpenAI-compatible `chat/completions` endpoint.
//! - Keeps a 60-minute in-memory cache, optionally backed by the disk cache.
//! - Never fails: errors fall back to a stale answer or the offline heuristic.

use std::{
    collections::HashMap,
    env,
    str::FromStr,
    sync::Arc,
    time::{Duration, SystemTime},
};

use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{
    accept_candidate, fallback_suggestion, CandidateSuggestion, PriceSuggestion, PricingRequest,
    SuggestionSource,
};
use crate::infra::cache::{SuggestionCacheStore, SUGGESTION_CACHE_TTL};
use crate::util::version::user_agent;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_TIMEOUT_SECS: u64 = 20;

const SYSTEM_PROMPT: &str = "Kamu membantu UMKM Indonesia menentukan harga jual. \
Jawab hanya dengan JSON: {\"recommended_price\": number, \"min_price\": number, \
\"max_price\": number, \"margin_percent\": number, \"rationale\": string}. \
Harga dalam rupiah, tidak boleh di bawah HPP.";

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error: {0}")]
    Api(String),
    #[error("no API key configured")]
    MissingApiKey,
    #[error("unusable model answer: {0}")]
    Unparseable(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdvisorConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl AdvisorConfig {
    /// Reads `OMSETKU_AI_BASE_URL`, `OMSETKU_AI_MODEL`, `OMSETKU_AI_API_KEY`
    /// and `OMSETKU_AI_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let base_url = non_empty("OMSETKU_AI_BASE_URL")
            .map(|url| if url.ends_with('/') { url } else { format!("{url}/") })
            .unwrap_or(defaults.base_url);
        let timeout = non_empty("OMSETKU_AI_TIMEOUT_SECS")
            .and_then(|secs| secs.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        Self {
            base_url,
            model: non_empty("OMSETKU_AI_MODEL").unwrap_or(defaults.model),
            api_key: non_empty("OMSETKU_AI_API_KEY"),
            timeout,
        }
    }
}

#[derive(Clone)]
pub struct PricingAdvisor {
    http: Client,
    base_url: Url,
    model: String,
    api_key: Option<String>,
    cache: Arc<Mutex<HashMap<String, Cached<PriceSuggestion>>>>,
    disk: Option<SuggestionCacheStore>,
    ttl: Duration,
}

impl PricingAdvisor {
    pub fn new(config: AdvisorConfig) -> Result<Self, AdvisorError> {
        let base_url = Url::parse(&config.base_url)?;
        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            model: config.model,
            api_key: config.api_key,
            cache: Arc::new(Mutex::new(HashMap::new())),
            disk: None,
            ttl: DEFAULT_TTL,
        })
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_disk_cache(mut self, store: SuggestionCacheStore) -> Self {
        self.disk = Some(store);
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn suggest(&self, request: &PricingRequest) -> PriceSuggestion {
        let key = request.cache_key();

        if let Some(cached) = self.cached(&key).await {
            debug!("serving in-memory suggestion for {key}");
            return cached;
        }

        if let Some(entry) = self.disk.as_ref().and_then(|disk| disk.get(&key)) {
            if !entry.is_expired() {
                debug!(
                    "serving disk suggestion for {key} (age: {})",
                    entry.age_string()
                );
                self.store_memory(&key, entry.suggestion.clone()).await;
                return entry.suggestion.with_source(SuggestionSource::Cached);
            }
        }

        match self.request_suggestion(request).await {
            Ok(suggestion) => {
                info!(
                    "model suggested {} for {}",
                    suggestion.recommended_price,
                    request.product_name
                );
                self.store(&key, &suggestion).await;
                suggestion
            }
            Err(AdvisorError::MissingApiKey) => {
                debug!("no API key; using offline estimate");
                self.stale_or_fallback(&key, request).await
            }
            Err(err) => {
                warn!("pricing request failed: {err}");
                self.stale_or_fallback(&key, request).await
            }
        }
    }

    async fn request_suggestion(
        &self,
        request: &PricingRequest,
    ) -> Result<PriceSuggestion, AdvisorError> {
        let api_key = self.api_key.as_deref().ok_or(AdvisorError::MissingApiKey)?;
        let url = self.base_url.join("chat/completions")?;
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.2,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: describe(request),
                },
            ],
        };

        let response: ChatResponse = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AdvisorError::Api("response missing content".into()))?;

        parse_suggestion(&content, request).ok_or(AdvisorError::Unparseable(content))
    }

    async fn stale_or_fallback(&self, key: &str, request: &PricingRequest) -> PriceSuggestion {
        if let Some(stale) = self.cache.lock().await.get(key).map(Cached::stale) {
            return stale;
        }
        if let Some(entry) = self.disk.as_ref().and_then(|disk| disk.get(key)) {
            return entry.suggestion.with_source(SuggestionSource::Stale);
        }
        fallback_suggestion(request)
    }

    async fn cached(&self, key: &str) -> Option<PriceSuggestion> {
        let cache = self.cache.lock().await;
        cache.get(key).and_then(|entry| entry.if_fresh(self.ttl))
    }

    /// Entries older than the disk TTL are dropped; younger ones stay for stale fallback.
    async fn store_memory(&self, key: &str, suggestion: PriceSuggestion) {
        let mut cache = self.cache.lock().await;
        cache.retain(|_, entry| !entry.is_older_than(SUGGESTION_CACHE_TTL));
        cache.insert(key.to_string(), Cached::new(suggestion, SystemTime::now()));
    }

    async fn store(&self, key: &str, suggestion: &PriceSuggestion) {
        self.store_memory(key, suggestion.clone()).await;
        if let Some(disk) = &self.disk {
            if let Err(err) = disk.put(key, suggestion.clone()) {
                warn!("failed to save suggestion cache: {err}");
            }
        }
    }
}

struct Cached<T> {
    value: T,
    fetched_at: SystemTime,
}

impl Cached<PriceSuggestion> {
    fn new(value: PriceSuggestion, fetched_at: SystemTime) -> Self {
        Self { value, fetched_at }
    }

    fn if_fresh(&self, ttl: Duration) -> Option<PriceSuggestion> {
        let fresh = self
            .fetched_at
            .elapsed()
            .map(|elapsed| elapsed <= ttl)
            .unwrap_or(false);
        fresh.then(|| self.value.clone().with_source(SuggestionSource::Cached))
    }

    fn is_older_than(&self, age: Duration) -> bool {
        self.fetched_at
            .elapsed()
            .map(|elapsed| elapsed > age)
            .unwrap_or(false)
    }

    fn stale(&self) -> PriceSuggestion {
        self.value.clone().with_source(SuggestionSource::Stale)
    }
}

fn describe(request: &PricingRequest) -> String {
    let mut text = format!(
        "Produk: {}\nHPP per unit: {}",
        request.product_name.trim(),
        request.hpp.normalize()
    );
    if let Some(category) = request.category.as_deref().filter(|c| !c.trim().is_empty()) {
        text.push_str(&format!("\nKategori: {}", category.trim()));
    }
    if let Some(price) = request.current_price {
        text.push_str(&format!("\nHarga jual saat ini: {}", price.normalize()));
    }
    text
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SuggestionDto {
    #[serde(default, alias = "recommended", alias = "price", alias = "harga")]
    recommended_price: Option<LooseDecimal>,
    #[serde(default, alias = "min")]
    min_price: Option<LooseDecimal>,
    #[serde(default, alias = "max")]
    max_price: Option<LooseDecimal>,
    #[serde(default, alias = "margin")]
    margin_percent: Option<LooseDecimal>,
    #[serde(default, alias = "reason", alias = "alasan")]
    rationale: Option<String>,
}

impl From<SuggestionDto> for CandidateSuggestion {
    fn from(dto: SuggestionDto) -> Self {
        Self {
            recommended_price: dto.recommended_price.map(|d| d.0),
            min_price: dto.min_price.map(|d| d.0),
            max_price: dto.max_price.map(|d| d.0),
            margin_percent: dto.margin_percent.map(|d| d.0),
            rationale: dto.rationale,
        }
    }
}

/// Reads the first `{ ... }` block of a model answer. Models like to wrap
/// JSON in prose or code fences.
fn parse_suggestion(content: &str, request: &PricingRequest) -> Option<PriceSuggestion> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    let dto: SuggestionDto = serde_json::from_str(&content[start..=end]).ok()?;
    accept_candidate(request, dto.into())
}

/// Decimal that also accepts strings such as `"Rp 15.000"` or `"12,5"`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LooseDecimal(Decimal);

impl<'de> Deserialize<'de> for LooseDecimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct NumberOrString;

        impl<'de> serde::de::Visitor<'de> for NumberOrString {
            type Value = LooseDecimal;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a number or numeric string")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(LooseDecimal(Decimal::from(value)))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(LooseDecimal(Decimal::from(value)))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Decimal::try_from(value)
                    .map(LooseDecimal)
                    .map_err(E::custom)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                parse_amount(value)
                    .map(LooseDecimal)
                    .ok_or_else(|| E::custom(format!("not an amount: {value}")))
            }
        }

        deserializer.deserialize_any(NumberOrString)
    }
}

/// Parses rupiah-style amounts. A separator followed only by three-digit
/// groups is a thousands separator; when both appear, the last one is decimal.
fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("Rp")
        .or_else(|| trimmed.strip_prefix("rp"))
        .or_else(|| trimmed.strip_prefix("IDR"))
        .unwrap_or(trimmed);
    let cleaned: String = trimmed
        .trim_end_matches(",-")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if dot > comma => cleaned.replace(',', ""),
        (Some(_), Some(_)) => cleaned.replace('.', "").replace(',', "."),
        (None, Some(_)) if is_grouped(&cleaned, ',') => cleaned.replace(',', ""),
        (None, Some(_)) => cleaned.replace(',', "."),
        (Some(_), None) if is_grouped(&cleaned, '.') => cleaned.replace('.', ""),
        _ => cleaned,
    };
    Decimal::from_str(&normalized).ok()
}

fn is_grouped(value: &str, separator: char) -> bool {
    let mut parts = value.split(separator);
    let head_ok = parts
        .next()
        .map(|head| !head.is_empty() && head.len() <= 3)
        .unwrap_or(false);
    let mut saw_group = false;
    let groups_ok = parts.all(|part| {
        saw_group = true;
        part.len() == 3 && part.chars().all(|c| c.is_ascii_digit())
    });
    head_ok && saw_group && groups_ok
}
