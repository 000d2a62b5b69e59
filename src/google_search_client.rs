// src/google_search_client.rs
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

const CUSTOM_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
const SCRAPE_URL: &str = "https://www.google.com/search";
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Request error: {0}")]
    Request(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Request(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct GoogleSearchClient {
    client: Client,
    credentials: Option<(String, String)>,
    timeout: Duration,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct CustomSearchResponse {
    #[serde(default)]
    pub items: Vec<CustomSearchItem>,
    #[serde(rename = "searchInformation")]
    pub search_information: Option<SearchInformation>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct SearchInformation {
    #[serde(rename = "totalResults", default)]
    pub total_results: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CustomSearchItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(rename = "displayLink", default)]
    pub display_link: String,
    #[serde(rename = "fileFormat", default)]
    pub file_format: String,
    pub image: Option<CustomSearchImage>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CustomSearchImage {
    #[serde(rename = "thumbnailLink")]
    pub thumbnail_link: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(rename = "contextLink")]
    pub context_link: Option<String>,
}

/// Body and content type of a fetched image.
pub struct FetchedImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl GoogleSearchClient {
    pub fn new(api_key: Option<String>, engine_id: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            credentials: api_key.zip(engine_id),
            timeout,
        }
    }

    pub fn has_api_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Custom Search JSON API, image mode.
    pub async fn search_images(
        &self,
        query: &str,
        start: u32,
        num: u32,
        img_size: &str,
        img_type: &str,
    ) -> Result<CustomSearchResponse, SearchError> {
        let (api_key, engine_id) = self
            .credentials
            .as_ref()
            .ok_or_else(|| SearchError::Request("Custom Search API is not configured".into()))?;

        let mut params = HashMap::new();
        params.insert("key", api_key.clone());
        params.insert("cx", engine_id.clone());
        params.insert("q", query.to_string());
        params.insert("searchType", "image".to_string());
        params.insert("start", start.to_string());
        params.insert("num", num.to_string());
        params.insert("safe", "active".to_string());
        params.insert("imgSize", img_size.to_string());
        params.insert("imgType", img_type.to_string());
        params.insert("fileType", "jpg,png,webp".to_string());

        info!("🔍 Custom Search: '{}' (start={}, num={})", query, start, num);

        let response = self
            .client
            .get(CUSTOM_SEARCH_URL)
            .header("Accept-Encoding", "gzip")
            .query(&params)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await?;
            error!("Custom Search API error: {}", error_text);
            return Err(SearchError::Api {
                status,
                message: error_text,
            });
        }

        let results = response.json::<CustomSearchResponse>().await?;
        info!("✅ Custom Search returned {} items for '{}'", results.items.len(), query);
        Ok(results)
    }

    /// Raw HTML of the Google Images results page.
    pub async fn fetch_results_page(
        &self,
        query: &str,
        start: u32,
        tbs: Option<&str>,
    ) -> Result<String, SearchError> {
        let mut url = format!(
            "{}?q={}&tbm=isch&start={}",
            SCRAPE_URL,
            urlencoding::encode(query),
            start
        );
        if let Some(tbs) = tbs {
            url.push_str("&tbs=");
            url.push_str(tbs);
        }

        info!("📡 Fetching image results page: {}", url);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", BROWSER_USER_AGENT)
            .header("Accept", "text/html,application/xhtml+xml")
            .header("Accept-Language", "zh-TW,zh;q=0.9,en;q=0.8")
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Api {
                status: response.status().as_u16(),
                message: "results page request failed".to_string(),
            });
        }

        Ok(response.text().await?)
    }

    pub async fn fetch_image(&self, image_url: &str) -> Result<FetchedImage, SearchError> {
        info!("⬇️ Downloading image: {}", image_url);

        let response = self
            .client
            .get(image_url)
            .header("User-Agent", BROWSER_USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Api {
                status: response.status().as_u16(),
                message: format!("Failed to download image: {}", response.status()),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let bytes = response.bytes().await?.to_vec();
        Ok(FetchedImage {
            content_type,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_require_both_values() {
        let timeout = Duration::from_secs(5);
        assert!(!GoogleSearchClient::new(Some("k".into()), None, timeout).has_api_credentials());
        assert!(GoogleSearchClient::new(Some("k".into()), Some("cx".into()), timeout).has_api_credentials());
    }

    #[test]
    fn test_custom_search_response_parses() {
        let body = r#"{
            "searchInformation": {"totalResults": "1230"},
            "items": [{
                "title": "Walrus on ice",
                "link": "https://upload.wikimedia.org/walrus.jpg",
                "snippet": "A walrus",
                "displayLink": "commons.wikimedia.org",
                "fileFormat": "image/jpeg",
                "image": {"thumbnailLink": "https://t/1.jpg", "width": 800, "height": 600,
                          "contextLink": "https://commons.wikimedia.org/wiki/Walrus"}
            }]
        }"#;
        let parsed: CustomSearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.search_information.unwrap().total_results, "1230");
        assert_eq!(parsed.items[0].image.as_ref().unwrap().width, Some(800));
    }
}
