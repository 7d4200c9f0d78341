//! Tests for provider trait

use super::*;

#[test]
fn test_provider_capabilities() {
    let caps = ProviderCapabilities {
        supports_tools: true,
        supports_system_instruction: false,
    };

    assert!(caps.supports_tools);
    assert!(!caps.supports_system_instruction);
}

#[test]
fn test_priority_order() {
    assert!(ProviderKind::Anthropic.priority() < ProviderKind::OpenAI.priority());
    assert_eq!(ProviderKind::PRIORITY[0], ProviderKind::Anthropic);

    let mut kinds = vec![ProviderKind::OpenAI, ProviderKind::Anthropic];
    kinds.sort_by_key(|k| k.priority());
    assert_eq!(kinds, ProviderKind::PRIORITY.to_vec());
}

#[test]
fn test_display_and_serde() {
    assert_eq!(ProviderKind::OpenAI.to_string(), "openai");
    assert_eq!(
        serde_json::to_value(ProviderKind::Anthropic).unwrap(),
        serde_json::json!("anthropic")
    );
    let kind: ProviderKind = serde_json::from_value(serde_json::json!("openai")).unwrap();
    assert_eq!(kind, ProviderKind::OpenAI);
}

#[test]
fn test_credentials() {
    assert_eq!(ProviderKind::Anthropic.credential_env_var(), "ANTHROPIC_API_KEY");
    assert_eq!(
        ProviderKind::OpenAI.placeholder_credential(),
        "sk-placeholder-replace-me"
    );
    assert_ne!(
        ProviderKind::Anthropic.placeholder_credential(),
        ProviderKind::OpenAI.placeholder_credential()
    );
}

struct EchoProvider;

#[async_trait::async_trait]
impl Provider for EchoProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let text = request
            .conversation()
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(CompletionResponse::new(text, vec![], Default::default()))
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_tools: false,
            supports_system_instruction: true,
        }
    }
}

#[tokio::test]
async fn test_provider_trait_object() {
    use crate::normalized::ConversationMessage;

    let provider: Box<dyn Provider> = Box::new(EchoProvider);
    let response = provider
        .complete(CompletionRequest::new(vec![ConversationMessage::user("ping")]))
        .await
        .unwrap();
    assert_eq!(response.text, "ping");
    assert!(response.tool_calls.is_none());
}
