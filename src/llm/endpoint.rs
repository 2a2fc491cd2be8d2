//! Client for the application's own inference endpoint

use crate::core::error::{Result, WireError};
use crate::llm::backend::{InferenceBackend, InferenceRequest, InferenceResponse};
use async_trait::async_trait;
use reqwest::Client;

/// Posts the request as camelCase JSON and reads back `{response, structuredData, error}`
pub struct EndpointClient {
    client: Client,
    url: String,
}

impl EndpointClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl InferenceBackend for EndpointClient {
    async fn infer(&self, request: &InferenceRequest) -> Result<InferenceResponse> {
        let response = self.client.post(&self.url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(WireError::RemoteCall(format!("{}: {}", status, error_text)));
        }

        let body: InferenceResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(WireError::RemoteCall(error));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url() {
        let client = EndpointClient::new("http://localhost:3000/api/ai");
        assert_eq!(client.url(), "http://localhost:3000/api/ai");
    }
}
