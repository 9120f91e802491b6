//! # Upscale Service Client
//!
//! HTTP client for the remote upscaling endpoint, behind the
//! [`UpscaleService`] trait so the control loop can be driven by a mock
//! implementation in tests without touching the network.
//!
//! ## Protocol
//!
//! One upscale is two round trips:
//! 1. `POST <api_url>` with a multipart form: part `image` (binary, filename
//!    `image.png`, content-type `image/png`) and part `scale` = `"2"`. The
//!    service answers with a JSON body carrying a `result_url`.
//! 2. `GET <result_url>` for the actual upscaled bytes.
//!
//! There is no retry, no authentication beyond the static headers, and no
//! timeout beyond the client default.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::error::PipelineError;

/// Abstract interface to an image upscaling capability.
///
/// Takes an encoded image buffer, returns a higher-resolution encoded buffer.
/// Implementations must be shareable across concurrently processed files.
#[async_trait]
pub trait UpscaleService: Send + Sync {
    /// Upscale one image buffer, nominally doubling its linear dimensions.
    async fn upscale(&self, image: &[u8]) -> Result<Vec<u8>>;
}

/// JSON body returned by the upscale endpoint on success.
#[derive(Debug, Deserialize)]
struct UpscaleResult {
    result_url: String,
}

/// Production [`UpscaleService`] backed by `reqwest`.
///
/// Holds one shared HTTP client; connection pooling across concurrent
/// pipelines comes from the client itself.
pub struct HttpUpscaleClient {
    client: reqwest::Client,
    api_url: String,
}

impl HttpUpscaleClient {
    /// Create a client for the given upscale endpoint.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl UpscaleService for HttpUpscaleClient {
    async fn upscale(&self, image: &[u8]) -> Result<Vec<u8>> {
        let part = Part::bytes(image.to_vec())
            .file_name("image.png")
            .mime_str("image/png")?;
        let form = Form::new().part("image", part).text("scale", "2");

        let response = self
            .client
            .post(&self.api_url)
            .header(USER_AGENT, "Mozilla/5.0")
            .header(ACCEPT, "application/json")
            .header("x-client-version", "web")
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::upscale_request(response.status()).into());
        }

        let body = response.bytes().await?;
        let result: UpscaleResult = serde_json::from_slice(&body)?;

        let download = self.client.get(&result.result_url).send().await?;
        if !download.status().is_success() {
            return Err(PipelineError::upscale_download(download.status()).into());
        }

        Ok(download.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_upscale_posts_form_and_downloads_result() {
        let server = MockServer::start().await;
        let payload = vec![7u8; 64];

        Mock::given(method("POST"))
            .and(path("/image/upscale/v1"))
            .and(header("accept", "application/json"))
            .and(header("x-client-version", "web"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result_url": format!("{}/results/abc", server.uri())
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/results/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpUpscaleClient::new(format!("{}/image/upscale/v1", server.uri()));
        let bytes = client.upscale(b"fake image bytes").await.unwrap();
        assert_eq!(bytes, payload);
    }

    #[tokio::test]
    async fn test_non_success_post_is_a_request_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = HttpUpscaleClient::new(server.uri());
        let error = client.upscale(b"bytes").await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<PipelineError>(),
            Some(PipelineError::UpscaleRequest { .. })
        ));
    }

    #[tokio::test]
    async fn test_non_success_download_is_a_download_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result_url": format!("{}/results/missing", server.uri())
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/results/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HttpUpscaleClient::new(server.uri());
        let error = client.upscale(b"bytes").await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<PipelineError>(),
            Some(PipelineError::UpscaleDownload { .. })
        ));
    }
}
