//! Outbound I/O: the pricing advisor and its disk cache.

pub mod advisor;
pub mod cache;

pub use advisor::{AdvisorConfig, AdvisorError, PricingAdvisor};
pub use cache::{CachedSuggestion, SuggestionCache, SuggestionCacheStore, SUGGESTION_CACHE_TTL};
