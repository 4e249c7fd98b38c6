//! Filter expressions for keyword suggestion requests
//!
//! DataForSEO Labs takes filters as a flat array alternating conditions and logical
//! operators, e.g.
//!
//! ```text
//! [["keyword_info.search_volume", ">=", 100], "and", ["keyword", "like", "%seo%"]]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::{ApiError, ApiResult};
use crate::KeywordIntent;

const SEARCH_VOLUME: &str = "keyword_info.search_volume";
const CPC: &str = "keyword_info.cpc";
const COMPETITION: &str = "keyword_info.competition";
const KEYWORD_DIFFICULTY: &str = "keyword_properties.keyword_difficulty";
const KEYWORD: &str = "keyword";
const MAIN_INTENT: &str = "search_intent_info.main_intent";

/// Upstream cap on conditions per request
pub const MAX_CONDITIONS: usize = 8;

/// Optional bounds on suggested keywords
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordFilters {
    /// Minimum monthly search volume
    pub min_search_volume: Option<u64>,
    /// Maximum monthly search volume
    pub max_search_volume: Option<u64>,
    /// Minimum cost per click
    pub min_cpc: Option<f64>,
    /// Maximum cost per click
    pub max_cpc: Option<f64>,
    /// Minimum paid competition, 0..100
    pub min_ppc: Option<f64>,
    /// Maximum paid competition, 0..100
    pub max_ppc: Option<f64>,
    /// Minimum keyword difficulty, 0..100
    pub min_keyword_difficulty: Option<u32>,
    /// Maximum keyword difficulty, 0..100
    pub max_keyword_difficulty: Option<u32>,
    /// Substring the keyword must contain
    pub include_keyword: Option<String>,
    /// Substring the keyword must not contain
    pub exclude_keyword: Option<String>,
    /// Accepted main intents
    pub search_intents: Vec<KeywordIntent>,
}

impl KeywordFilters {
    /// No filters
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the search volume
    pub fn search_volume(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_search_volume = min;
        self.max_search_volume = max;
        self
    }

    /// Bound the cost per click
    pub fn cpc(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_cpc = min;
        self.max_cpc = max;
        self
    }

    /// Bound paid competition on a 0..100 scale
    pub fn ppc(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_ppc = min;
        self.max_ppc = max;
        self
    }

    /// Bound keyword difficulty
    pub fn keyword_difficulty(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_keyword_difficulty = min;
        self.max_keyword_difficulty = max;
        self
    }

    /// Keep keywords containing `text`
    pub fn include(mut self, text: impl Into<String>) -> Self {
        self.include_keyword = Some(text.into());
        self
    }

    /// Drop keywords containing `text`
    pub fn exclude(mut self, text: impl Into<String>) -> Self {
        self.exclude_keyword = Some(text.into());
        self
    }

    /// Keep only these main intents
    pub fn intents(mut self, intents: impl IntoIterator<Item = KeywordIntent>) -> Self {
        self.search_intents = intents.into_iter().collect();
        self
    }

    fn conditions(&self) -> Vec<Value> {
        let mut conditions = Vec::new();
        let mut range = |field: &str, min: Option<Value>, max: Option<Value>| {
            if let Some(min) = min {
                conditions.push(json!([field, ">=", min]));
            }
            if let Some(max) = max {
                conditions.push(json!([field, "<=", max]));
            }
        };

        range(
            SEARCH_VOLUME,
            self.min_search_volume.map(Value::from),
            self.max_search_volume.map(Value::from),
        );
        range(CPC, self.min_cpc.map(Value::from), self.max_cpc.map(Value::from));
        range(
            COMPETITION,
            self.min_ppc.map(|v| Value::from(v / 100.0)),
            self.max_ppc.map(|v| Value::from(v / 100.0)),
        );
        range(
            KEYWORD_DIFFICULTY,
            self.min_keyword_difficulty.map(Value::from),
            self.max_keyword_difficulty.map(Value::from),
        );

        if let Some(text) = self.include_keyword.as_deref().filter(|t| !t.is_empty()) {
            conditions.push(json!([KEYWORD, "like", format!("%{text}%")]));
        }
        if let Some(text) = self.exclude_keyword.as_deref().filter(|t| !t.is_empty()) {
            conditions.push(json!([KEYWORD, "not_like", format!("%{text}%")]));
        }
        if !self.search_intents.is_empty() {
            let intents: Vec<String> = self.search_intents.iter().map(ToString::to_string).collect();
            conditions.push(json!([MAIN_INTENT, "in", intents]));
        }

        conditions
    }

    /// Whether no condition is set
    pub fn is_empty(&self) -> bool {
        self.conditions().is_empty()
    }

    /// Upstream filter array, conditions joined with `"and"`.
    ///
    /// Empty when no condition is set.
    ///
    /// # Errors
    /// Generic error when more than [`MAX_CONDITIONS`] conditions are set.
    pub fn build(&self) -> ApiResult<Vec<Value>> {
        let conditions = self.conditions();
        if conditions.len() > MAX_CONDITIONS {
            return Err(ApiError::generic(
                format!(
                    "Too many keyword filters: {} conditions, at most {MAX_CONDITIONS} allowed",
                    conditions.len()
                ),
                0,
            ));
        }

        let mut filters = Vec::with_capacity(conditions.len() * 2);
        for (i, condition) in conditions.into_iter().enumerate() {
            if i > 0 {
                filters.push(Value::from("and"));
            }
            filters.push(condition);
        }
        Ok(filters)
    }
}
