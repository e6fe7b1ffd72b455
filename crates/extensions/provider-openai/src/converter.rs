//! Conversion between protocol and API types.

use tracing::debug;
use webpilot_protocols::{
    CompletionRequest, CompletionResponse, Message, MessageRole, ProviderError, Usage,
};

use crate::api::{ApiMessage, ApiResponse};

/// Protocol messages in API form; a request-level system prompt goes first.
pub fn convert_messages(request: &CompletionRequest) -> Vec<ApiMessage> {
    let system = request.system.as_ref().map(|content| ApiMessage {
        role: "system".to_string(),
        content: content.clone(),
    });
    system
        .into_iter()
        .chain(request.messages.iter().map(convert_message))
        .collect()
}

fn convert_message(msg: &Message) -> ApiMessage {
    let role = match msg.role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    };
    ApiMessage {
        role: role.to_string(),
        content: msg.content.clone(),
    }
}

/// First choice of an API response.
pub fn parse_response(response: ApiResponse) -> Result<CompletionResponse, ProviderError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("no choices".to_string()))?;
    if choice.finish_reason.as_deref() == Some("length") {
        debug!(model = %response.model, "Completion truncated at max_tokens");
    }
    let usage = response
        .usage
        .map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        id: response.id,
        model: response.model,
        message: Message::assistant(choice.message.content.unwrap_or_default()),
        usage,
    })
}
