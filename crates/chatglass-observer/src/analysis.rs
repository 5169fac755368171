//! Request/response channel to the external analysis collaborator.
//!
//! The engine only prepares the payload and receives the reply; transport
//! policy (timeouts, retries) belongs to the caller. The channel must
//! tolerate never hearing back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Action tag carried by every analysis request.
pub const ANALYZE_TEXT_ACTION: &str = "ANALYZE_TEXT";

/// Outbound analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub action: String,
    pub text: String,
}

impl AnalyzeRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            action: ANALYZE_TEXT_ACTION.to_string(),
            text: text.into(),
        }
    }
}

/// Inbound analysis reply, delivered at most once per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireResponse", into = "WireResponse")]
pub enum AnalyzeResponse {
    Success(Value),
    Failure(String),
}

/// Wire shape: `{success: true, data} | {success: false, error}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<AnalyzeResponse> for WireResponse {
    fn from(resp: AnalyzeResponse) -> Self {
        match resp {
            AnalyzeResponse::Success(data) => WireResponse {
                success: true,
                data: Some(data),
                error: None,
            },
            AnalyzeResponse::Failure(error) => WireResponse {
                success: false,
                data: None,
                error: Some(error),
            },
        }
    }
}

impl From<WireResponse> for AnalyzeResponse {
    fn from(wire: WireResponse) -> Self {
        if wire.success {
            AnalyzeResponse::Success(wire.data.unwrap_or(Value::Null))
        } else {
            AnalyzeResponse::Failure(
                wire.error.unwrap_or_else(|| "unspecified error".to_string()),
            )
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        AnalysisError::Transport(e.to_string())
    }
}

/// The outbound channel. Implementations deliver the reply exactly once or
/// not at all; they never deliver twice.
#[async_trait]
pub trait AnalysisChannel: Send + Sync {
    async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse, AnalysisError>;
}

/// HTTP JSON channel. Deliberately carries no request timeout; bounding the
/// wait is the caller's responsibility.
pub struct HttpAnalysisChannel {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpAnalysisChannel {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AnalysisChannel for HttpAnalysisChannel {
    async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse, AnalysisError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;
        Ok(response.json::<AnalyzeResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn request_carries_the_action_tag() {
        let request = AnalyzeRequest::new("hello there");
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(
            wire,
            json!({"action": "ANALYZE_TEXT", "text": "hello there"})
        );
    }

    #[test]
    fn response_wire_shapes_round_trip() {
        let ok: AnalyzeResponse =
            serde_json::from_value(json!({"success": true, "data": {"tone": "warm"}})).unwrap();
        assert_eq!(ok, AnalyzeResponse::Success(json!({"tone": "warm"})));

        let err: AnalyzeResponse =
            serde_json::from_value(json!({"success": false, "error": "over quota"})).unwrap();
        assert_eq!(err, AnalyzeResponse::Failure("over quota".to_string()));

        let wire = serde_json::to_value(AnalyzeResponse::Failure("nope".into())).unwrap();
        assert_eq!(wire, json!({"success": false, "error": "nope"}));
    }

    #[tokio::test]
    async fn http_channel_posts_and_parses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .and(body_json(json!({"action": "ANALYZE_TEXT", "text": "ping"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "data": {"summary": "pong"}})),
            )
            .mount(&server)
            .await;

        let endpoint = Url::parse(&format!("{}/analyze", server.uri())).unwrap();
        let channel = HttpAnalysisChannel::new(endpoint);
        let reply = channel.analyze(AnalyzeRequest::new("ping")).await.unwrap();
        assert_eq!(reply, AnalyzeResponse::Success(json!({"summary": "pong"})));
    }

    #[tokio::test]
    async fn http_channel_surfaces_failure_replies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "error": "model unavailable"})),
            )
            .mount(&server)
            .await;

        let channel = HttpAnalysisChannel::new(Url::parse(&server.uri()).unwrap());
        let reply = channel
            .analyze(AnalyzeRequest::new("anything"))
            .await
            .unwrap();
        assert_eq!(
            reply,
            AnalyzeResponse::Failure("model unavailable".to_string())
        );
    }
}
