//! `keywords_for_site` records
//!
//! Unlike the Labs endpoints this one returns its records directly in
//! `tasks[0].result[]` with the count in `tasks[0].result_count`. The `competition`
//! field arrives either as a 0..1 score or as a level string, depending on API version.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use super::analysis::{calculate_trend, classify_competition_level, classify_keyword_intent};
use super::TransformResult;
use crate::gateway::error::{ApiError, ApiResult};
use crate::parser::{null_as_default, task_header, tasks_array};
use crate::{CompetitionLevel, KeywordIntent, MonthlySearch, SearchVolumeTrend};

/// A keyword the target domain ranks or bids for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainKeyword {
    /// Keyword text
    pub keyword: String,
    /// Average monthly searches
    pub search_volume: u64,
    /// Cost per click
    pub cpc: f64,
    /// Competition score, 0..1
    pub competition: f64,
    /// Competition level, upstream when given, else derived from the score
    pub competition_level: CompetitionLevel,
    /// Monthly search history
    pub monthly_searches: Vec<MonthlySearch>,
    /// 1/3/12 month volume changes
    pub search_volume_trend: SearchVolumeTrend,
    /// Intent guessed from the keyword wording
    pub intent: KeywordIntent,
}

#[derive(Debug, Default, Deserialize)]
struct RawDomainKeyword {
    #[serde(default, deserialize_with = "null_as_default")]
    keyword: String,
    #[serde(default)]
    search_volume: Option<u64>,
    #[serde(default)]
    cpc: Option<f64>,
    #[serde(default)]
    competition: Option<Value>,
    #[serde(default)]
    competition_level: Option<String>,
    #[serde(default)]
    competition_index: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    monthly_searches: Vec<MonthlySearch>,
}

impl RawDomainKeyword {
    /// Score from a numeric `competition`, else `competition_index` scaled down from 0..100
    fn score(&self) -> f64 {
        self.competition
            .as_ref()
            .and_then(Value::as_f64)
            .or_else(|| self.competition_index.map(|index| index / 100.0))
            .unwrap_or_default()
    }

    /// Level string from `competition_level`, or from `competition` when it is a string
    fn upstream_level(&self) -> Option<CompetitionLevel> {
        self.competition_level
            .as_deref()
            .or_else(|| self.competition.as_ref().and_then(Value::as_str))
            .and_then(|level| CompetitionLevel::from_str(level).ok())
    }
}

fn transform_item(item: RawDomainKeyword) -> DomainKeyword {
    let competition = item.score();
    let competition_level = item
        .upstream_level()
        .unwrap_or_else(|| classify_competition_level(competition));

    DomainKeyword {
        search_volume_trend: calculate_trend(&item.monthly_searches),
        intent: classify_keyword_intent(&item.keyword),
        search_volume: item.search_volume.unwrap_or_default(),
        cpc: item.cpc.unwrap_or_default(),
        competition,
        competition_level,
        monthly_searches: item.monthly_searches,
        keyword: item.keyword,
    }
}

/// Transform a `keywords_for_site/live` response
///
/// # Errors
/// Missing `tasks`, a task status of 40000 or above, or records that fail to decode.
pub fn transform_domain_keywords(raw: &Value) -> ApiResult<TransformResult<Vec<DomainKeyword>>> {
    let tasks = tasks_array(raw)?;
    let cost = raw.get("cost").and_then(Value::as_f64).unwrap_or_default();

    let Some(task) = tasks.first() else {
        return Ok(TransformResult {
            data: Vec::new(),
            total_results: 0,
            cost,
            status_code: 0,
        });
    };
    let header = task_header(task)?;

    let records: Vec<RawDomainKeyword> = match task.get("result") {
        Some(result) if !result.is_null() => Vec::deserialize(result).map_err(|e| {
            ApiError::generic(format!("Invalid result in API response: {e}"), 0).with_body(task.clone())
        })?,
        _ => Vec::new(),
    };

    let data: Vec<_> = records.into_iter().map(transform_item).collect();
    let total_results = task
        .get("result_count")
        .and_then(Value::as_u64)
        .unwrap_or(data.len() as u64);

    Ok(TransformResult {
        data,
        total_results,
        cost,
        status_code: header.status_code,
    })
}
