//! Capability boundary for the external text-generation service.

use funnel_core::FunnelResult;
use std::fmt;
use std::time::Duration;

/// Instructions sent with every request; pins the JSON shape parsed by
/// [`crate::parse_insights`].
pub const SYSTEM_PROMPT: &str = r#"You are an expert marketing analytics consultant specializing in conversion funnel optimization.
Your task is to analyze funnel data and provide actionable insights for marketing teams.

Provide analysis in JSON format with the following structure:
{
    "summary": "Executive summary of funnel performance",
    "recommendations": ["List of specific actionable recommendations"],
    "priorities": ["List of optimization priorities in order of impact"],
    "insights": {
        "key_findings": ["Key insights from the data"],
        "opportunities": ["Specific opportunities identified"],
        "risks": ["Potential risks or concerns"]
    }
}

Focus on practical, implementable recommendations that marketing teams can act on immediately."#;

/// Everything a provider needs to make one chat-completion style call.
#[derive(Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub api_key: String,
    pub system_prompt: &'static str,
    /// Carries the formatted funnel context.
    pub user_message: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("user_message_len", &self.user_message.len())
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Produces insight JSON text for a funnel context.
///
/// Implementations must honour `request.timeout` and map transport or
/// service failures to `FunnelError::ExternalServiceUnavailable`.
pub trait InsightProvider: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> FunnelResult<String>;
}
