//! Raw API payloads through the transformers

use serde_json::{json, Value};

use keyword_data_gateway::transform::{
    transform_domain_keywords, transform_keyword_suggestions, DomainKeyword,
};
use keyword_data_gateway::{CompetitionLevel, KeywordIntent, TrendDirection};

fn year_of_growth() -> Value {
    let months: Vec<Value> = (1..=12)
        .rev()
        .map(|m| json!({"year": 2023, "month": m, "search_volume": 90 + m * 10}))
        .collect();
    json!(months)
}

#[test]
fn test_suggestion_trend_fields() {
    let raw = json!({
        "cost": 0.01,
        "tasks": [{
            "status_code": 20000,
            "result": [{
                "total_count": 1,
                "items": [{
                    "keyword": "standing desk",
                    "keyword_info": {
                        "search_volume": 210,
                        "competition": 0.55,
                        "monthly_searches": year_of_growth()
                    }
                }]
            }]
        }]
    });

    let record = &transform_keyword_suggestions(&raw).unwrap().data[0];
    assert_eq!(record.id, 0);
    assert_eq!(record.monthly_searches.len(), 12);
    // 210 against 200, 180 and 100
    assert_eq!(record.search_volume_trend.monthly, 5);
    assert_eq!(record.search_volume_trend.quarterly, 17);
    assert_eq!(record.search_volume_trend.yearly, 110);
    assert_eq!(record.trend_analysis.direction, TrendDirection::Up);
    assert_eq!(record.trend_analysis.growth_rate, 110);
    assert!(record.trend_analysis.seasonality_score > 0.0);
}

#[test]
fn test_domain_keywords_classified() {
    let raw = json!({
        "cost": 0.05,
        "tasks": [{
            "status_code": 20000,
            "result_count": 3,
            "result": [
                {"keyword": "buy standing desk", "search_volume": 900, "competition": 0.9},
                {"keyword": "best standing desk 2024", "search_volume": 700, "competition_index": 30},
                {"keyword": "how tall should a desk be", "search_volume": 300}
            ]
        }]
    });

    let result = transform_domain_keywords(&raw).unwrap();
    let levels: Vec<(KeywordIntent, CompetitionLevel)> = result
        .data
        .iter()
        .map(|k: &DomainKeyword| (k.intent, k.competition_level))
        .collect();
    assert_eq!(
        levels,
        vec![
            (KeywordIntent::Transactional, CompetitionLevel::VeryHigh),
            (KeywordIntent::Commercial, CompetitionLevel::Medium),
            (KeywordIntent::Informational, CompetitionLevel::Low),
        ]
    );
    assert_eq!(result.total_results, 3);
}

#[test]
fn test_task_failure_surfaces_as_error() {
    let raw = json!({"tasks": [{"status_code": 40501, "status_message": "Invalid Field: 'location_code'."}]});
    let err = transform_domain_keywords(&raw).unwrap_err();
    assert_eq!(err.status_code(), 40501);
    assert!(err.message().contains("location_code"));
}
