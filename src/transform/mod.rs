//! Response transformers
//!
//! Each transformer takes the raw JSON envelope of one endpoint and produces a
//! [`TransformResult`] of flat records. Raw items are decoded once into the
//! `Raw*` schemas below; missing or null fields fall back to zero values, so a sparse
//! upstream record still yields a complete output record.

use serde::{Deserialize, Serialize};

use crate::parser::null_as_default;
use crate::{AgeDistribution, BacklinksData, GenderDistribution, MonthlySearch};

/// Account balance extraction
pub mod account;
/// Trend, competition and intent analytics
pub mod analysis;
/// Keywords a domain ranks for
pub mod domain_keywords;
/// Keyword overview records
pub mod keyword_overview;
/// Keyword suggestion records
pub mod keyword_suggestions;

pub use account::extract_balance;
pub use analysis::{analyze_trend, calculate_trend, classify_competition_level, classify_keyword_intent};
pub use domain_keywords::{transform_domain_keywords, DomainKeyword};
pub use keyword_overview::{transform_keyword_overview, KeywordOverview};
pub use keyword_suggestions::{transform_keyword_suggestions, KeywordSuggestion};

/// Transformed records plus call metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformResult<T> {
    /// Records in upstream order
    pub data: T,
    /// Total matches upstream, which may exceed the records returned
    pub total_results: u64,
    /// Cost charged for the call
    pub cost: f64,
    /// Status of the first task
    pub status_code: u32,
}

impl<T> TransformResult<T> {
    /// Whether the upstream task reported plain success
    pub fn is_ok(&self) -> bool {
        self.status_code == crate::gateway::endpoints::TASK_OK
    }
}

/// `keyword_info` block shared by the Labs endpoints
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawKeywordInfo {
    #[serde(default)]
    pub search_volume: Option<u64>,
    #[serde(default)]
    pub competition: Option<f64>,
    #[serde(default)]
    pub competition_level: Option<String>,
    #[serde(default)]
    pub cpc: Option<f64>,
    #[serde(default)]
    pub low_top_of_page_bid: Option<f64>,
    #[serde(default)]
    pub high_top_of_page_bid: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub monthly_searches: Vec<MonthlySearch>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSearchIntentInfo {
    #[serde(default)]
    pub main_intent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawKeywordProperties {
    #[serde(default)]
    pub keyword_difficulty: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub search_intent_info: RawSearchIntentInfo,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawBacklinksInfo {
    #[serde(default)]
    pub backlinks: Option<f64>,
    #[serde(default)]
    pub dofollow: Option<f64>,
    #[serde(default)]
    pub referring_pages: Option<f64>,
    #[serde(default)]
    pub referring_domains: Option<f64>,
    #[serde(default)]
    pub rank: Option<f64>,
    #[serde(default)]
    pub main_domain_rank: Option<f64>,
}

impl RawBacklinksInfo {
    /// Backlink profile, present only when upstream reported a backlink count
    pub fn to_backlinks_data(&self) -> Option<BacklinksData> {
        let backlinks = self.backlinks?;
        Some(BacklinksData {
            backlinks,
            dofollow_backlinks: self.dofollow.unwrap_or_default(),
            referring_pages: self.referring_pages.unwrap_or_default(),
            referring_domains: self.referring_domains.unwrap_or_default(),
            page_rank: self.rank.unwrap_or_default(),
            domain_rank: self.main_domain_rank.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawGender {
    #[serde(default)]
    pub male: Option<f64>,
    #[serde(default)]
    pub female: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawClickstreamInfo {
    #[serde(default)]
    pub gender_distribution: Option<RawGender>,
    #[serde(default)]
    pub age_distribution: Option<AgeDistribution>,
}

impl RawClickstreamInfo {
    pub fn gender(&self) -> Option<GenderDistribution> {
        self.gender_distribution.as_ref().map(|g| GenderDistribution {
            male: g.male.unwrap_or_default(),
            female: g.female.unwrap_or_default(),
        })
    }
}

/// Item shape of `keyword_suggestions` and `keyword_overview`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawKeywordItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub keyword: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location_code: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keyword_info: RawKeywordInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keyword_properties: RawKeywordProperties,
    #[serde(default, deserialize_with = "null_as_default")]
    pub search_intent_info: RawSearchIntentInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_backlinks_info: RawBacklinksInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clickstream_keyword_info: RawClickstreamInfo,
}
