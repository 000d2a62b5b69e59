use serde::{Deserialize, Serialize};

pub const MAX_QUERY_CHARS: usize = 100;
pub const DEFAULT_PER_PAGE: u32 = 12;
pub const MAX_PER_PAGE: u32 = 30;
/// Custom Search stops serving results past the hundredth.
pub const MAX_PAGE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub per_page: Option<i64>,
    #[serde(default)]
    pub orientation: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default, rename = "type")]
    pub image_type: Option<String>,
}

/// A search request after validation and defaulting.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub page: u32,
    pub per_page: u32,
    pub orientation: String,
    pub size: String,
    pub image_type: String,
}

impl SearchRequest {
    pub fn validate(self) -> Result<SearchQuery, String> {
        let query = self
            .query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .ok_or_else(|| "Please provide a search keyword".to_string())?;

        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(format!(
                "Search keyword is too long (max {} characters)",
                MAX_QUERY_CHARS
            ));
        }

        let page = match self.page {
            Some(p) if p >= 1 => match u32::try_from(p) {
                Ok(p) if p <= MAX_PAGE => p,
                _ => return Err(format!("Page must be between 1 and {}", MAX_PAGE)),
            },
            _ => 1,
        };
        let per_page = match self.per_page {
            Some(n) if (1..=MAX_PER_PAGE as i64).contains(&n) => n as u32,
            _ => DEFAULT_PER_PAGE,
        };

        Ok(SearchQuery {
            query,
            page,
            per_page,
            orientation: self.orientation.unwrap_or_else(|| "any".to_string()),
            size: self.size.unwrap_or_else(|| "medium".to_string()),
            image_type: self.image_type.unwrap_or_else(|| "photo".to_string()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResult {
    pub id: String,
    pub url: String,
    pub thumb_url: Option<String>,
    pub title: String,
    pub description: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub source_url: Option<String>,
    pub file_type: String,
    pub platform: String,
    pub attribution: String,
    pub download_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    pub total_results: u64,
    pub results: Vec<ImageResult>,
    /// Same list as `results`; the frontend reads this key.
    pub images: Vec<ImageResult>,
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    pub message: String,
}

impl SearchResponse {
    pub fn new(query: &str, results: Vec<ImageResult>, platform: &str) -> Self {
        Self {
            success: true,
            query: query.to_string(),
            page: None,
            per_page: None,
            total_results: results.len() as u64,
            images: results.clone(),
            results,
            platform: platform.to_string(),
            mode: None,
            message: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub filename: String,
    pub file_path: String,
    pub file_size: u64,
    pub download_url: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOption {
    pub id: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOptions {
    pub sizes: Vec<SearchOption>,
    pub types: Vec<SearchOption>,
    pub orientations: Vec<SearchOption>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: Option<&str>) -> SearchRequest {
        SearchRequest {
            query: query.map(str::to_string),
            page: None,
            per_page: None,
            orientation: None,
            size: None,
            image_type: None,
        }
    }

    #[test]
    fn test_validate_applies_defaults() {
        let q = request(Some("  walrus ")).validate().unwrap();
        assert_eq!(q.query, "walrus");
        assert_eq!(q.page, 1);
        assert_eq!(q.per_page, DEFAULT_PER_PAGE);
        assert_eq!(q.orientation, "any");
        assert_eq!(q.size, "medium");
        assert_eq!(q.image_type, "photo");
    }

    #[test]
    fn test_validate_rejects_missing_and_long_queries() {
        assert!(request(None).validate().is_err());
        assert!(request(Some("   ")).validate().is_err());
        let long = "x".repeat(MAX_QUERY_CHARS + 1);
        assert!(request(Some(&long)).validate().is_err());
    }

    #[test]
    fn test_out_of_range_paging_falls_back() {
        let mut req = request(Some("cat"));
        req.page = Some(0);
        req.per_page = Some(31);
        let q = req.validate().unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.per_page, DEFAULT_PER_PAGE);
    }

    #[test]
    fn test_huge_page_is_rejected() {
        for page in [MAX_PAGE as i64 + 1, u32::MAX as i64, 4_294_967_296, i64::MAX] {
            let mut req = request(Some("cat"));
            req.page = Some(page);
            assert!(req.validate().is_err(), "page {} accepted", page);
        }

        let mut req = request(Some("cat"));
        req.page = Some(MAX_PAGE as i64);
        assert_eq!(req.validate().unwrap().page, MAX_PAGE);
    }
}
