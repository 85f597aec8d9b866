//! Request construction for gateway probes.
//!
//! A probe is always the same chat completion; only the correlation id
//! changes between invocations.

use crate::config::{GatewayConfig, ProbeConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header carrying the API Management subscription key.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
/// Client request id header, echoed back by Azure.
pub const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";
/// Correlation id header, used by gateway policies for tracing.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
/// Placeholder the gateway may overwrite with the backend it picked.
pub const REQUEST_BACKEND_HEADER: &str = "x-request-backend";

const SYSTEM_PROMPT: &str = "You are a helpful AI assistant. You always try to provide \
                             accurate answers or follow up with another question if not.";
const USER_PROMPT: &str = "What is the best way to get to London from Berlin?";

/// Per-invocation identity and credentials.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Id sent in both the client request id and correlation id headers.
    pub correlation_id: Uuid,
    /// Gateway base URL.
    pub gateway_url: String,
    /// Subscription key.
    pub subscription_key: String,
    /// When the context was created.
    pub issued_at: DateTime<Utc>,
}

impl RequestContext {
    /// Create a context with a freshly generated correlation id.
    pub fn new(gateway: &GatewayConfig) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            gateway_url: gateway.gateway_url.clone(),
            subscription_key: gateway.subscription_key.clone(),
            issued_at: Utc::now(),
        }
    }

    /// The correlation id as sent on the wire.
    pub fn request_id(&self) -> String {
        self.correlation_id.to_string()
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Create a message with the given role.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Chat completion payload in the Azure OpenAI shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Ordered conversation.
    pub messages: Vec<ChatMessage>,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling mass.
    pub top_p: f32,
    /// Frequency penalty.
    pub frequency_penalty: f32,
    /// Presence penalty.
    pub presence_penalty: f32,
}

impl CompletionRequest {
    /// The fixed probe template with a custom user prompt.
    pub fn with_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![
                ChatMessage::new("system", SYSTEM_PROMPT),
                ChatMessage::new("user", prompt),
            ],
            max_tokens: 200,
            temperature: 0.7,
            top_p: 0.95,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self::with_prompt(USER_PROMPT)
    }
}

/// A fully formed HTTP request, ready for the transport.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    /// Always `POST`.
    pub method: reqwest::Method,
    /// Completions endpoint including the `api-version` query.
    pub url: String,
    /// Outbound headers in send order.
    pub headers: Vec<(&'static str, String)>,
    /// JSON body.
    pub body: CompletionRequest,
}

impl ProbeRequest {
    /// Build the probe request for a context.
    ///
    /// Nothing is validated: an empty gateway URL or key yields a request
    /// that fails once it reaches the transport.
    pub fn build(ctx: &RequestContext, config: &ProbeConfig) -> Self {
        let request_id = ctx.request_id();

        Self {
            method: reqwest::Method::POST,
            url: completions_url(&ctx.gateway_url, config),
            headers: vec![
                (SUBSCRIPTION_KEY_HEADER, ctx.subscription_key.clone()),
                ("Content-Type", "application/json".to_string()),
                (CLIENT_REQUEST_ID_HEADER, request_id.clone()),
                (CORRELATION_ID_HEADER, request_id),
                (REQUEST_BACKEND_HEADER, "unknown".to_string()),
            ],
            body: CompletionRequest::default(),
        }
    }

    /// Look up an outbound header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// `{gateway}/openai/deployments/{model}/chat/completions?api-version={version}`.
pub fn completions_url(gateway_url: &str, config: &ProbeConfig) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        gateway_url, config.model, config.api_version
    )
}
