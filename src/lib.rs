//! # Keyword Data Gateway Library
//!
//! A resilient client for the DataForSEO keyword data API. The API is paid, rate limited
//! and wraps every answer in a task envelope with its own status codes, so this crate
//! puts an access layer in front of it that handles all of that before data reaches
//! the caller.
//!
//! ## Features
//!
//! - **Validated Configuration**: credentials, sandbox flag, timeouts and retry budget checked up front
//! - **Error Classification**: every failure becomes one of five typed error kinds
//! - **Rate Limiting**: 60s sliding window, 10s burst window and escalating backoff
//! - **Retry Orchestration**: exponential backoff with jitter, honoring server retry hints
//! - **Cache-Aside**: optional external cache keyed by a reversible request fingerprint
//! - **Session Metrics**: request counts, credits spent, latency and rate-limit hits
//! - **Typed Records**: envelope parsing and normalization into flat keyword records
//!
//! ## Quick Start
//!
//! ```no_run
//! use keyword_data_gateway::gateway::{config::{create_config, ConfigInput}, DataForSeoClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = create_config(ConfigInput::with_credentials("login", "password"))?;
//! let client = DataForSeoClient::new(config)?;
//!
//! let result = client
//!     .get_keyword_suggestions("running shoes", 2840, "en", &[], 50, 0)
//!     .await?;
//! println!("{} suggestions, cost {}", result.data.len(), result.cost);
//! println!("{:?}", client.get_metrics());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`gateway`] - Configuration, error classification, transport, rate limiting, retries and the client façade
//! - [`parser`] - Task envelope parsing
//! - [`transform`] - Keyword record transformers and trend analysis
//! - [`cache`] - Cache-aside layer and cache stores
//! - [`metrics`] - Session metrics and Prometheus emission
//! - [`output`] - JSON and CSV writers for transformed results
//! - [`cli`] - Command line interface

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Cache-aside layer and cache stores
pub mod cache;

/// CLI command implementations
pub mod cli;

/// API access layer
pub mod gateway;

/// Session metrics and Prometheus emission
pub mod metrics;

/// Output writers for transformed results
pub mod output;

/// Task envelope parsing
pub mod parser;

/// Response transformers and derived analytics
pub mod transform;

pub use gateway::error::{ApiError, ApiResult};
pub use gateway::DataForSeoClient;

/// One month of search volume history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySearch {
    /// Calendar year
    #[serde(default, deserialize_with = "parser::null_as_default")]
    pub year: i32,
    /// Calendar month (1-12)
    #[serde(default, deserialize_with = "parser::null_as_default")]
    pub month: u32,
    /// Searches in that month, 0 when the upstream reported none
    #[serde(default, deserialize_with = "parser::null_as_default")]
    pub search_volume: u64,
}

/// Percentage change of search volume over 1, 3 and 12 month lookbacks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchVolumeTrend {
    /// Change against the previous month
    pub monthly: i64,
    /// Change against three months back
    pub quarterly: i64,
    /// Change against twelve months back
    pub yearly: i64,
}

/// Direction of a search volume series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// Growth above 10%
    Up,
    /// Decline beyond 10%
    Down,
    /// Anything in between
    Stable,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Stable => "stable",
        };
        write!(f, "{s}")
    }
}

/// Direction, seasonality and growth of a search volume series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    /// Overall direction
    pub direction: TrendDirection,
    /// Coefficient of variation of the series, two decimals
    pub seasonality_score: f64,
    /// Percent growth of the latest month against the comparison month
    pub growth_rate: i64,
}

impl Default for TrendAnalysis {
    fn default() -> Self {
        Self {
            direction: TrendDirection::Stable,
            seasonality_score: 0.0,
            growth_rate: 0,
        }
    }
}

/// Competition bucket derived from a 0..1 competition score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompetitionLevel {
    /// Score below 0.2
    #[serde(rename = "LOW")]
    Low,
    /// Score from 0.2 up to 0.7
    #[serde(rename = "MEDIUM")]
    Medium,
    /// Score from 0.7 up to 0.85
    #[serde(rename = "HIGH")]
    High,
    /// Score of 0.85 and above
    #[serde(rename = "VERY_HIGH")]
    VeryHigh,
}

impl std::fmt::Display for CompetitionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompetitionLevel::Low => "LOW",
            CompetitionLevel::Medium => "MEDIUM",
            CompetitionLevel::High => "HIGH",
            CompetitionLevel::VeryHigh => "VERY_HIGH",
        };
        write!(f, "{s}")
    }
}

impl FromStr for CompetitionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LOW" => Ok(CompetitionLevel::Low),
            "MEDIUM" => Ok(CompetitionLevel::Medium),
            "HIGH" => Ok(CompetitionLevel::High),
            "VERY_HIGH" => Ok(CompetitionLevel::VeryHigh),
            _ => Err(format!("Invalid competition level: {s}")),
        }
    }
}

/// Search intent behind a keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordIntent {
    /// Looking for information
    Informational,
    /// Looking for a specific site or page
    Navigational,
    /// Researching before a purchase
    Commercial,
    /// Ready to buy
    Transactional,
}

impl std::fmt::Display for KeywordIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            KeywordIntent::Informational => "informational",
            KeywordIntent::Navigational => "navigational",
            KeywordIntent::Commercial => "commercial",
            KeywordIntent::Transactional => "transactional",
        };
        write!(f, "{s}")
    }
}

impl FromStr for KeywordIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "informational" => Ok(KeywordIntent::Informational),
            "navigational" => Ok(KeywordIntent::Navigational),
            "commercial" => Ok(KeywordIntent::Commercial),
            "transactional" => Ok(KeywordIntent::Transactional),
            _ => Err(format!("Invalid keyword intent: {s}")),
        }
    }
}

/// Average backlink profile of the pages ranking for a keyword
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BacklinksData {
    /// Backlinks
    pub backlinks: f64,
    /// Dofollow backlinks
    pub dofollow_backlinks: f64,
    /// Referring pages
    pub referring_pages: f64,
    /// Referring domains
    pub referring_domains: f64,
    /// Page rank
    pub page_rank: f64,
    /// Main domain rank
    pub domain_rank: f64,
}

/// Share of male and female searchers
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenderDistribution {
    /// Male share
    pub male: f64,
    /// Female share
    pub female: f64,
}

/// Searcher share keyed by age bracket (e.g. "18-24")
pub type AgeDistribution = BTreeMap<String, f64>;
