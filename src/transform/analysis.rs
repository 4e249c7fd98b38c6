//! Derived keyword analytics: volume trends, competition buckets and search intent

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{CompetitionLevel, KeywordIntent, MonthlySearch, SearchVolumeTrend, TrendAnalysis, TrendDirection};

/// Growth beyond this percentage (either way) leaves the stable band
const TREND_THRESHOLD_PERCENT: i64 = 10;

static TRANSACTIONAL: Lazy<Option<Regex>> = Lazy::new(|| {
    intent_pattern("buy|purchase|order|price|pricing|cheap|deal|discount|coupon|shop|store|sale|subscribe|hire")
});

static COMMERCIAL: Lazy<Option<Regex>> =
    Lazy::new(|| intent_pattern("best|top|review|compare|comparison|vs|versus|alternative|recommend"));

static NAVIGATIONAL: Lazy<Option<Regex>> = Lazy::new(|| {
    intent_pattern("login|sign in|signin|sign up|signup|official|website|homepage|account|dashboard|app")
});

/// Case-insensitive whole-word alternation
fn intent_pattern(words: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i)\b({words})\b")).ok()
}

fn mentions(pattern: &Lazy<Option<Regex>>, keyword: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(keyword))
}

/// `Math.round` semantics: halves round towards positive infinity
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Percent change from `previous` to `current`.
///
/// A zero baseline yields 100 when there is any current volume, 0 otherwise.
pub fn percent_change(current: u64, previous: u64) -> i64 {
    if previous == 0 {
        return if current > 0 { 100 } else { 0 };
    }
    let (current, previous) = (current as f64, previous as f64);
    round_half_up((current - previous) / previous * 100.0)
}

/// Month-over-month, quarter and year changes of a monthly series.
///
/// The series is ordered newest first; lookbacks missing from it compare the newest
/// month with itself and report 0.
pub fn calculate_trend(monthly_searches: &[MonthlySearch]) -> SearchVolumeTrend {
    if monthly_searches.is_empty() {
        return SearchVolumeTrend::default();
    }

    let mut sorted = monthly_searches.to_vec();
    sorted.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));

    let current = sorted[0].search_volume;
    let lookback = |index: usize| sorted.get(index).map_or(current, |m| m.search_volume);

    SearchVolumeTrend {
        monthly: percent_change(current, lookback(1)),
        quarterly: percent_change(current, lookback(3)),
        yearly: percent_change(current, lookback(11)),
    }
}

/// Direction, seasonality and growth of a monthly series.
///
/// Growth compares the newest month against twelve months earlier when the series is
/// long enough, otherwise against the oldest month.
pub fn analyze_trend(monthly_searches: &[MonthlySearch]) -> TrendAnalysis {
    if monthly_searches.len() < 2 {
        return TrendAnalysis::default();
    }

    let mut sorted = monthly_searches.to_vec();
    sorted.sort_by_key(|m| (m.year, m.month));
    let volumes: Vec<u64> = sorted.iter().map(|m| m.search_volume).collect();

    let latest = volumes[volumes.len() - 1];
    let comparison = if volumes.len() >= 12 {
        volumes[volumes.len() - 12]
    } else {
        volumes[0]
    };
    let growth_rate = percent_change(latest, comparison);

    let n = volumes.len() as f64;
    let mean = volumes.iter().map(|v| *v as f64).sum::<f64>() / n;
    let seasonality_score = if mean == 0.0 {
        0.0
    } else {
        let variance = volumes
            .iter()
            .map(|v| (*v as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        round_half_up(variance.sqrt() / mean * 100.0) as f64 / 100.0
    };

    let direction = if growth_rate > TREND_THRESHOLD_PERCENT {
        TrendDirection::Up
    } else if growth_rate < -TREND_THRESHOLD_PERCENT {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    };

    TrendAnalysis {
        direction,
        seasonality_score,
        growth_rate,
    }
}

/// Bucket a 0..1 competition score.
///
/// The 0.2 and 0.4 steps both land in MEDIUM; the ladder is kept step for step so
/// bucket edges stay where downstream reports expect them.
pub fn classify_competition_level(score: f64) -> CompetitionLevel {
    match score {
        s if s < 0.2 => CompetitionLevel::Low,
        s if s < 0.4 => CompetitionLevel::Medium,
        s if s < 0.7 => CompetitionLevel::Medium,
        s if s < 0.85 => CompetitionLevel::High,
        _ => CompetitionLevel::VeryHigh,
    }
}

/// Guess search intent from the wording of a keyword.
///
/// Transactional wording wins over commercial, commercial over navigational; anything
/// else is informational.
pub fn classify_keyword_intent(keyword: &str) -> KeywordIntent {
    if mentions(&TRANSACTIONAL, keyword) {
        KeywordIntent::Transactional
    } else if mentions(&COMMERCIAL, keyword) {
        KeywordIntent::Commercial
    } else if mentions(&NAVIGATIONAL, keyword) {
        KeywordIntent::Navigational
    } else {
        KeywordIntent::Informational
    }
}
