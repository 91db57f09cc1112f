use crate::config::{BackendFamily, DispatchConfig};
use crate::core_types::ReplyShape;
use crate::error::LlmError;
use crate::internals::rate_limit::Throttle;
use crate::providers::http::error_from_status;
use crate::providers::local::strip_role_echo;
use crate::providers::{BackendAdapter, NativeGenAdapter};
use crate::tests::helpers::{answering_adapter, unreachable_adapters};
use reqwest::StatusCode;
use std::sync::Arc;

#[cfg(test)]
mod tests {
    use super::*;

    // Unit Tests for NativeGenAdapter response parsing
    //
    // UNIT UNDER TEST: NativeGenAdapter::parse_response (concrete implementation)
    //
    // BUSINESS RESPONSIBILITY:
    //   - Reads the reply from whichever field the model family uses
    //   - Keeps an unexpected but present answer instead of failing
    //
    // TEST COVERAGE:
    //   - output.text
    //   - output.message as a string and as an object
    //   - Missing fields and non-JSON bodies fall back to the raw body

    #[test]
    fn test_native_reads_output_text() {
        // Arrange
        let body = r#"{"output":{"text":"政策对象: 居民"},"request_id":"r1"}"#;

        // Act
        let reply = NativeGenAdapter::parse_response(body);

        // Assert
        assert_eq!(reply.content, "政策对象: 居民");
        assert_eq!(reply.shape, ReplyShape::Clean);
    }

    #[test]
    fn test_native_reads_output_message_when_text_missing() {
        // Arrange
        let as_string = r#"{"output":{"message":"您好！"}}"#;
        let as_object = r#"{"output":{"message":{"role":"assistant","content":"您好！"}}}"#;

        // Act
        let from_string = NativeGenAdapter::parse_response(as_string);
        let from_object = NativeGenAdapter::parse_response(as_object);

        // Assert
        assert_eq!(from_string.content, "您好！");
        assert_eq!(from_string.shape, ReplyShape::Clean);
        assert_eq!(from_object.content, "您好！");
        assert_eq!(from_object.shape, ReplyShape::Clean);
    }

    #[test]
    fn test_native_falls_back_to_raw_body() {
        // Arrange
        let no_fields = r#"{"output":{"choices":[]}}"#;
        let not_json = "plain text answer";

        // Act
        let structured = NativeGenAdapter::parse_response(no_fields);
        let plain = NativeGenAdapter::parse_response(not_json);

        // Assert
        assert_eq!(structured.shape, ReplyShape::RawFallback);
        assert_eq!(structured.content, no_fields);
        assert_eq!(plain.shape, ReplyShape::RawFallback);
        assert_eq!(plain.content, not_json);
    }

    // Unit Tests for LocalHttpAdapter helpers
    //
    // UNIT UNDER TEST: strip_role_echo
    //
    // BUSINESS RESPONSIBILITY:
    //   - Removes a chat-template echo preceding the local model's answer
    //
    // TEST COVERAGE:
    //   - Echo present and absent

    #[test]
    fn test_strip_role_echo() {
        // Arrange
        let echoed = "system\n助手\nuser\n你好\nassistant\n您好！";

        // Act & Assert
        assert_eq!(strip_role_echo(echoed), "您好！");
        assert_eq!(strip_role_echo("您好！"), "您好！");
    }

    // Unit Tests for status mapping
    //
    // UNIT UNDER TEST: error_from_status
    //
    // BUSINESS RESPONSIBILITY:
    //   - Translates backend HTTP statuses into the error taxonomy
    //
    // TEST COVERAGE:
    //   - 401/403, 429 with and without Retry-After, 5xx

    #[test]
    fn test_status_mapping() {
        // Arrange
        let family = BackendFamily::CompatibleChat;

        // Act
        let unauthorized = error_from_status(family, StatusCode::UNAUTHORIZED, None, "bad key");
        let forbidden = error_from_status(family, StatusCode::FORBIDDEN, None, "");
        let limited = error_from_status(family, StatusCode::TOO_MANY_REQUESTS, Some(7), "");
        let limited_default = error_from_status(family, StatusCode::TOO_MANY_REQUESTS, None, "");
        let server = error_from_status(family, StatusCode::BAD_GATEWAY, None, "upstream");

        // Assert
        assert!(matches!(unauthorized, LlmError::AuthenticationFailed { .. }));
        assert!(matches!(forbidden, LlmError::AuthenticationFailed { .. }));
        assert!(matches!(
            limited,
            LlmError::RateLimitExceeded {
                retry_after_seconds: 7
            }
        ));
        assert!(matches!(
            limited_default,
            LlmError::RateLimitExceeded {
                retry_after_seconds: 60
            }
        ));
        assert!(matches!(server, LlmError::RequestFailed { .. }));
        assert!(server.is_retryable());
    }

    // Unit Tests for AdapterSet
    //
    // UNIT UNDER TEST: AdapterSet (concrete implementation)
    //
    // BUSINESS RESPONSIBILITY:
    //   - Holds exactly one adapter per backend family
    //
    // TEST COVERAGE:
    //   - Production adapters report their own family
    //   - Overrides replace only the targeted family

    #[test]
    fn test_adapter_set_serves_each_family() {
        // Arrange
        let config = DispatchConfig::default();

        // Act
        let adapters = unreachable_adapters(&config);

        // Assert
        for family in BackendFamily::ALL {
            assert_eq!(adapters.for_family(family).family(), family);
        }
    }

    #[test]
    fn test_adapter_override_replaces_one_family() {
        // Arrange
        let config = DispatchConfig::default();
        let mock = answering_adapter(BackendFamily::LocalHttp, "ok");

        // Act
        let adapters = unreachable_adapters(&config)
            .with_adapter(BackendFamily::LocalHttp, Arc::new(mock));

        // Assert
        assert_eq!(
            adapters.for_family(BackendFamily::LocalHttp).family(),
            BackendFamily::LocalHttp
        );
        assert_eq!(
            adapters.for_family(BackendFamily::NativeGen).family(),
            BackendFamily::NativeGen
        );
    }

    // Throttle
    //
    // UNIT UNDER TEST: Throttle::per_minute / acquire
    //
    // TEST COVERAGE:
    //   - Missing or zero quota disables throttling
    //   - A configured quota admits its burst without waiting

    #[test]
    fn test_throttle_disabled_without_quota() {
        assert!(!Throttle::per_minute(None).is_enabled());
        assert!(!Throttle::per_minute(Some(0)).is_enabled());
        assert!(Throttle::per_minute(Some(60)).is_enabled());
    }

    #[tokio::test]
    async fn test_throttle_admits_burst_immediately() {
        // Arrange
        let throttle = Throttle::per_minute(Some(5));

        // Act
        let admitted = tokio::time::timeout(std::time::Duration::from_secs(1), async {
            for _ in 0..5 {
                throttle.acquire().await;
            }
        })
        .await;

        // Assert
        assert!(admitted.is_ok(), "Quota of 5 admits 5 requests at once");
    }
}
