//! Pricing suggestions: request/answer types, the offline heuristic, and
//! the sanity checks a model answer has to pass before it is shown.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::util::money::round_to_step;

const FALLBACK_MIN_MARKUP: Decimal = Decimal::from_parts(12, 0, 0, false, 1);
const FALLBACK_MARKUP: Decimal = Decimal::from_parts(13, 0, 0, false, 1);
const FALLBACK_MAX_MARKUP: Decimal = Decimal::from_parts(15, 0, 0, false, 1);
const PRICE_STEP: Decimal = Decimal::ONE_HUNDRED;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingRequest {
    pub product_name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub hpp: Decimal,
    #[serde(default)]
    pub current_price: Option<Decimal>,
}

impl PricingRequest {
    /// Same product at the same HPP shares a cached answer.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}",
            self.product_name.trim().to_lowercase(),
            self.hpp.normalize()
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    Model,
    Cached,
    Stale,
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceSuggestion {
    pub recommended_price: Decimal,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub margin_percent: Decimal,
    pub rationale: String,
    pub source: SuggestionSource,
}

impl PriceSuggestion {
    pub fn with_source(mut self, source: SuggestionSource) -> Self {
        self.source = source;
        self
    }
}

/// Offline heuristic: 30% over HPP, range 20% to 50%, rounded to Rp 100.
pub fn fallback_suggestion(request: &PricingRequest) -> PriceSuggestion {
    let hpp = request.hpp.max(Decimal::ZERO);
    PriceSuggestion {
        recommended_price: round_to_step(hpp * FALLBACK_MARKUP, PRICE_STEP),
        min_price: round_to_step(hpp * FALLBACK_MIN_MARKUP, PRICE_STEP),
        max_price: round_to_step(hpp * FALLBACK_MAX_MARKUP, PRICE_STEP),
        margin_percent: Decimal::from(30),
        rationale: "Perkiraan otomatis: margin 30% dari HPP (kisaran 20% - 50%).".to_string(),
        source: SuggestionSource::Fallback,
    }
}

/// Raw figures as read from a model answer, before validation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CandidateSuggestion {
    pub recommended_price: Option<Decimal>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub margin_percent: Option<Decimal>,
    pub rationale: Option<String>,
}

/// Accepts a candidate only if it is internally consistent and does not sell below HPP.
pub fn accept_candidate(
    request: &PricingRequest,
    candidate: CandidateSuggestion,
) -> Option<PriceSuggestion> {
    let recommended = candidate.recommended_price?;
    if recommended <= Decimal::ZERO || recommended < request.hpp {
        return None;
    }

    let min_price = candidate.min_price.unwrap_or(recommended);
    let max_price = candidate.max_price.unwrap_or(recommended);
    if min_price < Decimal::ZERO || min_price > recommended || max_price < recommended {
        return None;
    }

    let margin_percent = match candidate.margin_percent {
        Some(margin) if margin >= Decimal::ZERO => margin,
        Some(_) => return None,
        None if request.hpp > Decimal::ZERO => {
            (recommended - request.hpp) / request.hpp * Decimal::ONE_HUNDRED
        }
        None => Decimal::ZERO,
    };

    Some(PriceSuggestion {
        recommended_price: recommended,
        min_price,
        max_price,
        margin_percent,
        rationale: candidate
            .rationale
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_default(),
        source: SuggestionSource::Model,
    })
}
