//! Task envelope parsing
//!
//! Every DataForSEO response looks like:
//!
//! ```text
//! { version, cost, tasks: [ { status_code, status_message, cost,
//!                             result: [ { total_count, items: [..] | null } ] } ] }
//! ```
//!
//! Task status codes of 40000 and above are errors even when HTTP said 200, so they are
//! raised here rather than passed on as empty data. `items: null` (what the API sends when
//! nothing matched) becomes an empty vector.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::gateway::endpoints::TASK_ERROR_THRESHOLD;
use crate::gateway::error::{ApiError, ApiResult};

/// Deserialize `null` or a missing field as `T::default()`.
///
/// Use together with `#[serde(default)]`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parsed response envelope
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse<T> {
    /// Tasks in response order
    pub tasks: Vec<ParsedTask<T>>,
    /// Total cost of the call
    pub cost: f64,
    /// API version string
    pub version: String,
}

impl<T> ParsedResponse<T> {
    /// The first task, which is the only one for live endpoints
    pub fn first_task(&self) -> Option<&ParsedTask<T>> {
        self.tasks.first()
    }
}

/// One parsed task
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTask<T> {
    /// Task status (20000 is success)
    pub status_code: u32,
    /// Task status message
    pub status_message: String,
    /// Task cost
    pub cost: f64,
    /// Items from `result[0].items`, never null
    pub items: Vec<T>,
    /// `result[0].total_count`, or the item count when absent
    pub total_count: u64,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    cost: f64,
}

/// Task header shared by every endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RawTaskHeader {
    /// Task status
    #[serde(default, deserialize_with = "null_as_default")]
    pub status_code: u32,
    /// Task status message
    #[serde(default, deserialize_with = "null_as_default")]
    pub status_message: String,
    /// Task cost
    #[serde(default, deserialize_with = "null_as_default")]
    pub cost: f64,
}

#[derive(Debug, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
struct RawResult<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    items: Vec<T>,
    #[serde(default)]
    total_count: Option<u64>,
}

fn invalid(message: impl Into<String>, body: &Value) -> ApiError {
    ApiError::generic(message, 0).with_body(body.clone())
}

/// The `tasks` array of an envelope.
///
/// # Errors
/// Generic error (status 0) when `tasks` is missing or not an array.
pub fn tasks_array(raw: &Value) -> ApiResult<&Vec<Value>> {
    raw.get("tasks")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("Invalid API response: missing tasks array", raw))
}

/// Decode a task header and reject task-level failures.
///
/// # Errors
/// Generic error carrying the task status when it is 40000 or above.
pub fn task_header(task: &Value) -> ApiResult<RawTaskHeader> {
    let header = RawTaskHeader::deserialize(task)
        .map_err(|e| invalid(format!("Invalid task in API response: {e}"), task))?;

    if header.status_code >= TASK_ERROR_THRESHOLD {
        return Err(ApiError::generic(
            format!("Task error {}: {}", header.status_code, header.status_message),
            header.status_code,
        )
        .with_body(task.clone()));
    }

    Ok(header)
}

/// Parse an envelope whose items live under `result[0].items`.
///
/// Items are decoded into `T`; items that do not fit `T` fail the whole parse.
///
/// # Errors
/// - missing or non-array `tasks`
/// - a task status of 40000 or above (raised on the first such task)
/// - items that fail to decode
pub fn parse_response<T: DeserializeOwned>(raw: &Value) -> ApiResult<ParsedResponse<T>> {
    let raw_tasks = tasks_array(raw)?;
    let envelope = RawEnvelope::deserialize(raw)
        .map_err(|e| invalid(format!("Invalid API response: {e}"), raw))?;

    let tasks = raw_tasks
        .iter()
        .map(parse_task)
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(ParsedResponse {
        tasks,
        cost: envelope.cost,
        version: envelope.version,
    })
}

fn parse_task<T: DeserializeOwned>(task: &Value) -> ApiResult<ParsedTask<T>> {
    let header = task_header(task)?;

    let first_result = task
        .get("result")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .filter(|first| !first.is_null());

    let (items, total_count) = match first_result {
        Some(first) => {
            let result = RawResult::<T>::deserialize(first)
                .map_err(|e| invalid(format!("Invalid result in API response: {e}"), task))?;
            let total = result.total_count.unwrap_or(result.items.len() as u64);
            (result.items, total)
        }
        None => (Vec::new(), 0),
    };

    Ok(ParsedTask {
        status_code: header.status_code,
        status_message: header.status_message,
        cost: header.cost,
        items,
        total_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_items() {
        let raw = json!({
            "version": "0.1.20240801",
            "cost": 0.0101,
            "tasks": [{
                "status_code": 20000,
                "status_message": "Ok.",
                "cost": 0.0101,
                "result": [{"total_count": 120, "items": [{"keyword": "a"}, {"keyword": "b"}]}]
            }]
        });

        let parsed = parse_response::<Value>(&raw).unwrap();
        assert_eq!(parsed.version, "0.1.20240801");
        assert!((parsed.cost - 0.0101).abs() < 1e-12);
        let task = parsed.first_task().unwrap();
        assert_eq!(task.status_code, 20000);
        assert_eq!(task.items.len(), 2);
        assert_eq!(task.total_count, 120);
    }

    #[test]
    fn test_null_items_become_empty() {
        let raw = json!({"tasks": [{"status_code": 20000, "result": [{"items": null}]}]});
        let task = &parse_response::<Value>(&raw).unwrap().tasks[0];
        assert!(task.items.is_empty());
        assert_eq!(task.total_count, 0);
    }

    #[test]
    fn test_missing_result() {
        let raw = json!({"tasks": [{"status_code": 20000}]});
        let parsed = parse_response::<Value>(&raw).unwrap();
        assert_eq!(parsed.version, "");
        assert_eq!(parsed.cost, 0.0);
        assert!(parsed.tasks[0].items.is_empty());
        assert_eq!(parsed.tasks[0].total_count, 0);

        let raw = json!({"tasks": [{"status_code": 20000, "result": null}]});
        assert!(parse_response::<Value>(&raw).unwrap().tasks[0].items.is_empty());
    }

    #[test]
    fn test_total_count_defaults_to_item_count() {
        let raw = json!({"tasks": [{"status_code": 20000, "result": [{"items": [1, 2, 3]}]}]});
        let parsed = parse_response::<u32>(&raw).unwrap();
        assert_eq!(parsed.tasks[0].total_count, 3);
        assert_eq!(parsed.tasks[0].items, vec![1, 2, 3]);
    }

    #[test]
    fn test_task_error_raises() {
        let raw = json!({"tasks": [{
            "status_code": 40501,
            "status_message": "Invalid Field: 'keyword'.",
            "result": null
        }]});
        let err = parse_response::<Value>(&raw).unwrap_err();
        assert_eq!(err.status_code(), 40501);
        assert!(err.message().contains("40501"));
        assert_eq!(err.message(), "Task error 40501: Invalid Field: 'keyword'.");
        assert_eq!(err.response_body().unwrap()["status_code"], 40501);
    }

    #[test]
    fn test_missing_tasks_raises() {
        for raw in [json!({"version": "x"}), json!({"tasks": "nope"}), json!({"tasks": null})] {
            let err = parse_response::<Value>(&raw).unwrap_err();
            assert_eq!(err.status_code(), 0);
            assert_eq!(err.message(), "Invalid API response: missing tasks array");
        }
    }

    #[test]
    fn test_mistyped_items_rejected() {
        let raw = json!({"tasks": [{"status_code": 20000, "result": [{"items": ["x"]}]}]});
        let err = parse_response::<u32>(&raw).unwrap_err();
        assert_eq!(err.status_code(), 0);
        assert!(err.message().starts_with("Invalid result"));
    }
}
