//! DataForSEO endpoint configuration
//!
//! Production and sandbox differ only by host. Sandbox answers with dummy data and
//! charges nothing, so it shares every path below.

/// Production API root
pub const PRODUCTION_BASE_URL: &str = "https://api.dataforseo.com/v3";

/// Sandbox API root
pub const SANDBOX_BASE_URL: &str = "https://sandbox.dataforseo.com/v3";

/// Account details including the remaining balance (GET)
pub const USER_DATA: &str = "/appendix/user_data";

/// Labs keyword suggestions for a seed keyword (POST)
pub const KEYWORD_SUGGESTIONS: &str = "/dataforseo_labs/google/keyword_suggestions/live";

/// Labs keyword overview for up to 700 keywords (POST)
pub const KEYWORD_OVERVIEW: &str = "/dataforseo_labs/google/keyword_overview/live";

/// Google Ads keywords relevant to a site (POST)
pub const KEYWORDS_FOR_SITE: &str = "/keywords_data/google_ads/keywords_for_site/live";

/// Task status reported for a fully successful task
pub const TASK_OK: u32 = 20_000;

/// Lowest task status code that signals a task-level failure
pub const TASK_ERROR_THRESHOLD: u32 = 40_000;

/// Public operations exposed by the client, used for logging, metrics labels and cache keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Account balance lookup
    AccountBalance,
    /// Keyword suggestions for a seed keyword
    KeywordSuggestions,
    /// Overview for a list of keywords
    KeywordsOverview,
    /// Keywords a domain is relevant for
    KeywordsForDomain,
}

impl Operation {
    /// Endpoint path below the base URL
    pub fn path(&self) -> &'static str {
        match self {
            Operation::AccountBalance => USER_DATA,
            Operation::KeywordSuggestions => KEYWORD_SUGGESTIONS,
            Operation::KeywordsOverview => KEYWORD_OVERVIEW,
            Operation::KeywordsForDomain => KEYWORDS_FOR_SITE,
        }
    }

    /// Stable operation name, also the cache key prefix
    pub fn name(&self) -> &'static str {
        match self {
            Operation::AccountBalance => "account-balance",
            Operation::KeywordSuggestions => "keyword-suggestions",
            Operation::KeywordsOverview => "keywords-overview",
            Operation::KeywordsForDomain => "keywords-for-domain",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Join a base URL and an endpoint path without doubling the slash
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
