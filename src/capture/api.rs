//! Remote HTTP screenshot API provider
//!
//! Requests a rendered screenshot from a screenshotlayer-compatible service:
//! access key, target URL, viewport, and format go out as query parameters;
//! raw image bytes come back. Non-2xx responses and bodies that do not decode
//! as an image are failures, eligible for worker-level retry.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::{title_from_url, CaptureError, CaptureProvider, RawCapture};
use crate::types::{PageAttributes, Viewport};

pub struct ApiProvider {
    client: reqwest::Client,
    endpoint: String,
    access_key: String,
}

impl ApiProvider {
    pub fn new(
        endpoint: String,
        access_key: String,
        timeout: Duration,
    ) -> Result<Self, CaptureError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("websnap/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            access_key,
        })
    }
}

#[async_trait]
impl CaptureProvider for ApiProvider {
    async fn capture(&self, url: &Url, viewport: Viewport) -> Result<RawCapture, CaptureError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("access_key", self.access_key.as_str()),
                ("url", url.as_str()),
                ("viewport", &viewport.to_string()),
                ("format", "JPG"),
                ("width", &viewport.width.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptureError::ApiStatus(status.as_u16()));
        }

        let bytes = response.bytes().await?.to_vec();

        // Screenshot services report some errors as 200s with a JSON body;
        // reject anything that does not sniff as an image.
        if image::guess_format(&bytes).is_err() {
            return Err(CaptureError::MalformedImage);
        }

        Ok(RawCapture {
            bytes,
            attributes: PageAttributes {
                title: Some(title_from_url(url)),
                ..PageAttributes::default()
            },
        })
    }

    fn name(&self) -> &'static str {
        "api"
    }
}
