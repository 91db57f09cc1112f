use crate::core_types::{
    AdapterReply, CallOutcome, CallRequest, ChatMessage, MessageRole, OutcomeStatus,
};
use crate::error::{FailureKind, LlmError};
use std::time::Duration;

#[cfg(test)]
mod tests {
    use super::*;

    // Unit Tests for CallRequest and ChatMessage
    //
    // UNIT UNDER TEST: CallRequest (concrete implementation)
    //
    // BUSINESS RESPONSIBILITY:
    //   - Carries one prompt, shared read-only by every per-model worker
    //   - Builds the system + user pair for chat-style backends
    //
    // TEST COVERAGE:
    //   - Message order and roles
    //   - Empty system prompt omitted
    //   - Wire serialization of roles

    #[test]
    fn test_chat_messages_put_system_first() {
        // Arrange
        let request = CallRequest::new("你好", "你是一个善于分析政策文本的助手。");

        // Act
        let messages = request.chat_messages();

        // Assert
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1], ChatMessage::user("你好"));
    }

    #[test]
    fn test_empty_system_prompt_is_omitted() {
        // Arrange
        let request = CallRequest::new("你好", "");

        // Act
        let messages = request.chat_messages();

        // Assert
        assert_eq!(messages, vec![ChatMessage::user("你好")]);
    }

    #[test]
    fn test_roles_serialize_lowercase() {
        // Arrange
        let message = ChatMessage::system("s");

        // Act
        let json = serde_json::to_value(&message).unwrap();

        // Assert
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "s");
    }

    // Unit Tests for CallOutcome
    //
    // UNIT UNDER TEST: CallOutcome (concrete implementation)
    //
    // BUSINESS RESPONSIBILITY:
    //   - Normalizes every backend result into one record shape
    //   - Keeps raw-fallback replies distinguishable from clean ones
    //
    // TEST COVERAGE:
    //   - Clean, raw-fallback and error outcomes
    //   - Synthesized timeout and incomplete outcomes
    //   - Serialized shape (status, time in seconds)

    #[test]
    fn test_clean_reply_becomes_success() {
        // Arrange
        let reply = AdapterReply::clean("您好！");

        // Act
        let outcome = CallOutcome::from_reply("model-ok", reply, Duration::from_millis(250), 1);

        // Assert
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.content.as_deref(), Some("您好！"));
        assert!(outcome.error.is_none());
        assert!(outcome.is_success());
        assert!(!outcome.is_raw_fallback());
    }

    #[test]
    fn test_raw_fallback_is_usable_but_distinguishable() {
        // Arrange
        let reply = AdapterReply::raw_fallback("{\"unexpected\":true}");

        // Act
        let outcome = CallOutcome::from_reply("baichuan2-7b-chat", reply, Duration::ZERO, 1);

        // Assert
        assert_eq!(outcome.status, OutcomeStatus::RawFallback);
        assert!(outcome.is_success());
        assert!(outcome.is_raw_fallback());
    }

    #[test]
    fn test_error_outcome_records_kind_and_attempts() {
        // Arrange
        let error = LlmError::request_failed("connection refused", None);

        // Act
        let outcome = CallOutcome::from_error("model-down", &error, Duration::from_secs(3), 3);

        // Assert
        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert!(outcome.content.is_none());
        assert_eq!(outcome.kind, Some(FailureKind::Transport));
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.error.unwrap().contains("connection refused"));
    }

    #[test]
    fn test_synthesized_outcomes() {
        // Arrange & Act
        let timed_out = CallOutcome::timed_out("slow", Duration::from_secs(300));
        let incomplete = CallOutcome::incomplete("lost", Duration::from_secs(1));

        // Assert
        assert_eq!(timed_out.kind, Some(FailureKind::Timeout));
        assert_eq!(timed_out.elapsed, Duration::from_secs(300));
        assert_eq!(incomplete.kind, Some(FailureKind::Incomplete));
        assert_eq!(incomplete.error.as_deref(), Some("incomplete"));
        assert!(!incomplete.is_success());
    }

    #[test]
    fn test_sub_second_timeout_message_keeps_precision() {
        // Arrange & Act
        let timed_out = CallOutcome::timed_out("slow", Duration::from_millis(500));

        // Assert
        assert_eq!(
            timed_out.error.as_deref(),
            Some("Request timed out after 500ms")
        );
    }

    #[test]
    fn test_outcome_serializes_time_in_seconds() {
        // Arrange
        let outcome = CallOutcome::from_reply(
            "model-ok",
            AdapterReply::clean("ok"),
            Duration::from_millis(1500),
            1,
        );

        // Act
        let json = serde_json::to_value(&outcome).unwrap();

        // Assert
        assert_eq!(json["status"], "success");
        assert_eq!(json["time"], 1.5);
        assert_eq!(json["model_name"], "model-ok");
    }
}
