use serde_json::Value;

use crate::gateway::error::ApiResult;
use crate::parser::{task_header, tasks_array};

/// Account balance from a `user_data` response.
///
/// `None` when the response carries no balance.
///
/// # Errors
/// Missing `tasks` or a failed task.
pub fn extract_balance(raw: &Value) -> ApiResult<Option<f64>> {
    let Some(task) = tasks_array(raw)?.first() else {
        return Ok(None);
    };
    task_header(task)?;

    Ok(task
        .pointer("/result/0/money/balance")
        .and_then(Value::as_f64))
}
