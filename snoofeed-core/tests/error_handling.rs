use snoofeed_core::{
    ConfigError, CoreError, ErrorExt, ErrorReporter, IngestError, RedditApiError, StorageError,
};
use std::time::Duration;

#[test]
fn test_error_codes() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    assert_eq!(reddit_error.error_code(), "REDDIT_API");

    let storage_error = CoreError::Storage(StorageError::WriteFailed {
        path: "storage.json".to_string(),
        source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
    });
    assert_eq!(storage_error.error_code(), "STORAGE");

    let ingest_error = CoreError::Ingest(IngestError::RequestCeilingExceeded {
        max_requests: 10,
        cursor: Some("t3_abc".to_string()),
        batch_size: 4,
    });
    assert_eq!(ingest_error.error_code(), "INGEST");

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "reddit.client_id".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");
}

#[test]
fn test_retryable_errors() {
    let retryable_error =
        CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert!(retryable_error.is_retryable());

    let exhausted = CoreError::Ingest(IngestError::RecoveryExhausted {
        cursor: None,
        attempts: 2,
        batch_size: 0,
    });
    assert!(!exhausted.is_retryable());
    assert_eq!(exhausted.retry_after(), None);

    let corrupt = StorageError::CorruptState {
        path: "storage.json".to_string(),
        source: serde_json::from_str::<u8>("nope").unwrap_err(),
    };
    assert!(!corrupt.is_retryable());
}

#[test]
fn test_retry_after() {
    let rate_limit_error =
        CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert_eq!(
        rate_limit_error.retry_after(),
        Some(Duration::from_secs(60))
    );

    let server_error = CoreError::RedditApi(RedditApiError::ServerError { status_code: 503 });
    assert_eq!(server_error.retry_after(), Some(Duration::from_secs(30)));
}

#[test]
fn test_ingest_errors_carry_run_context() {
    let error = IngestError::RequestCeilingExceeded {
        max_requests: 20,
        cursor: Some("t3_zzz".to_string()),
        batch_size: 7,
    };
    let message = error.to_string();
    assert!(message.contains("20"));
    assert!(message.contains("t3_zzz"));
    assert!(message.contains("7"));
}

#[test]
fn test_user_friendly_messages() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    let message = reddit_error.user_friendly_message();
    assert!(message.contains("authentication token is invalid"));

    let config_error = CoreError::Config(ConfigError::MissingEnvironmentVariable {
        var_name: "SNOOFEED_REDDIT_PASSWORD".to_string(),
    });
    let message = config_error.user_friendly_message();
    assert!(message.contains("SNOOFEED_REDDIT_PASSWORD"));
}

#[test]
fn test_error_reporter() {
    let reporter = ErrorReporter::new()
        .with_error_reporting(true)
        .with_warning_reporting(true);
    let error = CoreError::RedditApi(RedditApiError::InvalidToken);

    // This test just ensures the methods don't panic
    reporter.report_error(&error);
    reporter.report_warning(&error);
}
