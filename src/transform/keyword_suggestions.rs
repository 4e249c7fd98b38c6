use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::analysis::{analyze_trend, calculate_trend};
use super::{RawKeywordItem, TransformResult};
use crate::gateway::error::ApiResult;
use crate::parser::parse_response;
use crate::{BacklinksData, MonthlySearch, SearchVolumeTrend, TrendAnalysis};

/// One suggested keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordSuggestion {
    /// Position in the response
    pub id: usize,
    /// Keyword text
    pub keyword: String,
    /// Location the data applies to
    pub location_code: u32,
    /// Language the data applies to
    pub language_code: String,
    /// Average monthly searches
    pub search_volume: u64,
    /// Paid competition score, 0..1
    pub ppc: f64,
    /// Paid competition level as reported upstream
    pub ppc_level: String,
    /// Cost per click
    pub cpc: f64,
    /// Low top-of-page bid
    pub low_top_page_bid: Option<f64>,
    /// High top-of-page bid
    pub high_top_page_bid: Option<f64>,
    /// Monthly search history
    pub monthly_searches: Vec<MonthlySearch>,
    /// 1/3/12 month volume changes
    pub search_volume_trend: SearchVolumeTrend,
    /// Direction and seasonality of the history
    pub trend_analysis: TrendAnalysis,
    /// Main search intent reported upstream
    pub search_intent: Option<String>,
    /// Keyword difficulty, 0..100
    pub keyword_difficulty: Option<u32>,
    /// Average backlink profile of ranking pages
    pub avg_backlinks_data: Option<BacklinksData>,
}

fn transform_item(index: usize, item: RawKeywordItem) -> KeywordSuggestion {
    let info = item.keyword_info;
    let properties = item.keyword_properties;

    KeywordSuggestion {
        id: index,
        search_volume_trend: calculate_trend(&info.monthly_searches),
        trend_analysis: analyze_trend(&info.monthly_searches),
        keyword: item.keyword,
        location_code: item.location_code,
        language_code: item.language_code,
        search_volume: info.search_volume.unwrap_or_default(),
        ppc: info.competition.unwrap_or_default(),
        ppc_level: info.competition_level.unwrap_or_default(),
        cpc: info.cpc.unwrap_or_default(),
        low_top_page_bid: info.low_top_of_page_bid,
        high_top_page_bid: info.high_top_of_page_bid,
        monthly_searches: info.monthly_searches,
        search_intent: properties
            .search_intent_info
            .main_intent
            .or(item.search_intent_info.main_intent),
        keyword_difficulty: properties.keyword_difficulty,
        avg_backlinks_data: item.avg_backlinks_info.to_backlinks_data(),
    }
}

/// Transform a `keyword_suggestions/live` response
///
/// # Errors
/// Envelope errors from [`parse_response`], including task failures.
pub fn transform_keyword_suggestions(raw: &Value) -> ApiResult<TransformResult<Vec<KeywordSuggestion>>> {
    let parsed = parse_response::<RawKeywordItem>(raw)?;
    let cost = parsed.cost;

    let Some(task) = parsed.tasks.into_iter().next() else {
        return Ok(TransformResult {
            data: Vec::new(),
            total_results: 0,
            cost,
            status_code: 0,
        });
    };

    let data: Vec<_> = task
        .items
        .into_iter()
        .enumerate()
        .map(|(index, item)| transform_item(index, item))
        .collect();

    Ok(TransformResult {
        data,
        total_results: task.total_count,
        cost,
        status_code: task.status_code,
    })
}
