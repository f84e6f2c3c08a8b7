use crate::config::AnalyzerConfig;
use crate::error::{Result, ScanError};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// A successfully downloaded page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Where the page ended up after redirects.
    pub final_url: Url,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub body: String,
    pub response_time: Duration,
}

pub struct PageFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl PageFetcher {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.page_timeout())
            .connect_timeout(config.page_timeout() / 2)
            .redirect(reqwest::redirect::Policy::limited(config.page_max_redirects))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// GET `url` and read its body.
    ///
    /// Non-2xx responses, bodies larger than the configured limit and
    /// non-markup content types are errors.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        debug!("Fetching {}", url);

        let start = Instant::now();
        let mut response = self.client.get(url.clone()).send().await?;
        let response_time = start.elapsed();

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if let Some(ref ct) = content_type
            && !is_markup(ct)
        {
            return Err(ScanError::Parse(format!("unsupported content type {}", ct)));
        }

        if let Some(length) = response.content_length()
            && length > self.max_body_bytes as u64
        {
            return Err(self.too_large());
        }

        let final_url = response.url().clone();
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ScanError::Body(e.to_string()))?
        {
            if bytes.len() + chunk.len() > self.max_body_bytes {
                return Err(self.too_large());
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!(
            "Fetched {} ({} bytes in {:?})",
            final_url,
            bytes.len(),
            response_time
        );

        Ok(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
            response_time,
        })
    }

    fn too_large(&self) -> ScanError {
        ScanError::Body(format!(
            "response exceeds {} bytes",
            self.max_body_bytes
        ))
    }
}

fn is_markup(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.is_empty() || mime.starts_with("text/") || mime.contains("html") || mime.ends_with("xml")
}
