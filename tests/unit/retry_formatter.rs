use std::collections::HashMap;
use std::time::Duration;

use keyword_data_gateway::gateway::error::Failure;
use keyword_data_gateway::gateway::retry_formatter::{RetryContext, RetryErrorType};
use keyword_data_gateway::gateway::{classify, ApiError};

fn error_for(status: u16) -> ApiError {
    classify(Failure::status(status, HashMap::new(), None))
}

fn sample_context(err: &ApiError, attempt: u32) -> RetryContext {
    RetryContext::new(attempt, 4, err, Duration::from_secs(4), "keyword_suggestions")
}

#[test]
fn format_retry_captures_attempt_and_wait() {
    let message = sample_context(&error_for(429), 2).format_retry();
    assert!(message.contains("keyword_suggestions"));
    assert!(message.contains("attempt 2/4"));
    assert!(message.contains("rate limit exceeded"));
    assert!(message.contains("4.0 seconds"));
}

#[test]
fn format_success_includes_operation() {
    let message = sample_context(&error_for(503), 3).format_success();
    assert_eq!(message, "Retry attempt 3/4 for keyword_suggestions succeeded");
}

#[test]
fn format_failure_lists_suggestions() {
    let output = sample_context(&error_for(502), 4).format_failure();
    assert!(output.contains("[FAILED] keyword_suggestions failed after 4 attempt(s)"));
    assert!(output.contains("bad gateway"));
    assert!(output.contains("try again later"));
    assert!(output.contains("--max-retries (current: 3)"));
}

#[test]
fn error_types_follow_classification() {
    assert_eq!(RetryErrorType::from_error(&error_for(401)), RetryErrorType::AuthFailed(401));
    assert_eq!(RetryErrorType::from_error(&error_for(402)), RetryErrorType::QuotaExceeded);
    assert_eq!(RetryErrorType::from_error(&error_for(500)), RetryErrorType::ServerError(500));
    assert_eq!(RetryErrorType::from_error(&error_for(404)), RetryErrorType::ClientError(404));
    assert_eq!(
        RetryErrorType::from_error(&ApiError::generic("Task failed", 40501)),
        RetryErrorType::TaskError(40501)
    );
    assert_eq!(
        RetryErrorType::from_error(&classify(Failure::network("ECONNREFUSED", "refused"))),
        RetryErrorType::ConnectionFailed
    );
}
