// src/services/image_search.rs
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::google_search_client::{CustomSearchItem, GoogleSearchClient, SearchError};
use crate::models::search::{
    DownloadResponse, ImageResult, SearchOption, SearchOptions, SearchQuery, SearchResponse,
};

/// Hosts serving Google's own page chrome rather than search results.
const GOOGLE_ASSET_HOSTS: [&str; 3] = ["ssl.gstatic.com", "www.gstatic.com", "fonts.gstatic.com"];
const PRIORITY_DOMAINS: [&str; 4] = ["wikipedia.org", "wikimedia.org", "unsplash.com", "pexels.com"];
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

/// Queries containing one of these keys get a fixed set of picsum seeds.
/// Latin keys must match a whole word of the query.
const KEYWORD_SEEDS: [(&str, [u32; 6]); 20] = [
    ("海象", [1001, 1002, 1003, 1004, 1005, 1006]),
    ("walrus", [1001, 1002, 1003, 1004, 1005, 1006]),
    ("貓", [200, 201, 202, 203, 204, 205]),
    ("cat", [200, 201, 202, 203, 204, 205]),
    ("狗", [220, 221, 222, 223, 224, 225]),
    ("dog", [220, 221, 222, 223, 224, 225]),
    ("花", [100, 101, 102, 103, 104, 105]),
    ("flower", [100, 101, 102, 103, 104, 105]),
    ("山", [300, 301, 302, 303, 304, 305]),
    ("mountain", [300, 301, 302, 303, 304, 305]),
    ("海", [400, 401, 402, 403, 404, 405]),
    ("sea", [400, 401, 402, 403, 404, 405]),
    ("車", [500, 501, 502, 503, 504, 505]),
    ("car", [500, 501, 502, 503, 504, 505]),
    ("建築", [600, 601, 602, 603, 604, 605]),
    ("building", [600, 601, 602, 603, 604, 605]),
    ("食物", [700, 701, 702, 703, 704, 705]),
    ("food", [700, 701, 702, 703, 704, 705]),
    ("人物", [800, 801, 802, 803, 804, 805]),
    ("people", [800, 801, 802, 803, 804, 805]),
];

lazy_static! {
    static ref IMAGE_URL_PATTERNS: Vec<Regex> = [
        // escaped JSON embedded in the page scripts
        r"\\x22(https?://[^\\]+?\.(?:jpg|jpeg|png|webp|gif)[^\\]*?)\\x22",
        r#"(?i)"(https?://[^"\s]+?\.(?:jpg|jpeg|png|webp|gif)(?:\?[^"]*)?)""#,
        r#"(?i)(?:src|data-src)="(https?://[^"\s]+?\.(?:jpg|jpeg|png|webp|gif)[^"]*)""#,
        r#""(https://encrypted-tbn\d\.gstatic\.com/images\?[^"]*)""#,
        r#""(https://lh\d+\.googleusercontent\.com/[^"]*)""#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect();
    static ref LOOSE_URL_PATTERN: Regex =
        Regex::new(r#"(?i)(https?://[a-z0-9.-]+\.[a-z]{2,}/[^\s<>"']*\.(?:jpg|jpeg|png|webp|gif))"#)
            .expect("valid regex");
}

fn host_of(url: &str) -> &str {
    url.split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url)
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
}

fn is_google_asset(url: &str) -> bool {
    let host = host_of(url);
    GOOGLE_ASSET_HOSTS.contains(&host) || host == "www.png"
}

/// Lowercase extension from the URL path, defaulting to `jpg`.
pub fn extension_from_url(url: &str) -> &'static str {
    let path = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url)
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let ext = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
    IMAGE_EXTENSIONS
        .iter()
        .find(|candidate| **candidate == ext)
        .copied()
        .unwrap_or("jpg")
}

/// Pulls candidate image URLs out of a results page, at most `limit` of them,
/// in order of first appearance.
pub fn extract_image_urls(html: &str, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    let mut collect = |pattern: &Regex, urls: &mut Vec<String>| {
        for captures in pattern.captures_iter(html) {
            if urls.len() >= limit {
                break;
            }
            let Some(m) = captures.get(1) else { continue };
            let url = m.as_str();
            if is_google_asset(url) || !seen.insert(url.to_string()) {
                continue;
            }
            urls.push(url.to_string());
        }
    };

    for pattern in IMAGE_URL_PATTERNS.iter() {
        collect(pattern, &mut urls);
        if urls.len() * 3 >= limit * 2 {
            break;
        }
    }

    if urls.is_empty() {
        collect(&LOOSE_URL_PATTERN, &mut urls);
    }

    urls
}

fn is_priority(url: &str) -> bool {
    PRIORITY_DOMAINS.iter().any(|d| url.contains(d))
        || (url.starts_with("https://")
            && [".jpg", ".jpeg", ".png", ".webp"].iter().any(|e| url.contains(e))
            && !url.contains("encrypted-tbn"))
}

/// Stable partition: well-known photo hosts and direct https images first.
pub fn prioritize(urls: Vec<String>) -> Vec<String> {
    let (mut priority, other): (Vec<_>, Vec<_>) = urls.into_iter().partition(|u| is_priority(u));
    priority.extend(other);
    priority
}

/// Spacers, tiny logos and truncated matches.
pub fn should_skip(url: &str) -> bool {
    let tiny_logo = url.to_lowercase().contains("logo")
        && ["16x16", "32x32", "48x48"].iter().any(|s| url.contains(s));
    url.contains("/1x1_")
        || url.contains("spacer.gif")
        || (url.starts_with("data:image") && url.len() < 200)
        || tiny_logo
        || url.len() < 20
}

/// `tbs` filter for the results page, e.g. `isz:m,itp:photo`.
pub fn scrape_filters(query: &SearchQuery) -> Option<String> {
    let mut filters = Vec::new();
    match query.size.as_str() {
        "large" => filters.push("isz:l"),
        "medium" => filters.push("isz:m"),
        "icon" => filters.push("isz:i"),
        _ => {}
    }
    match query.orientation.as_str() {
        "landscape" => filters.push("iar:w"),
        "portrait" => filters.push("iar:t"),
        _ => {}
    }
    match query.image_type.as_str() {
        "photo" => filters.push("itp:photo"),
        "clipart" => filters.push("itp:clipart"),
        "lineart" => filters.push("itp:lineart"),
        "face" => filters.push("itp:face"),
        _ => {}
    }
    (!filters.is_empty()).then(|| filters.join(","))
}

fn page_offset(query: &SearchQuery) -> u32 {
    query.page.saturating_sub(1).saturating_mul(query.per_page)
}

fn matches_keyword(query: &str, key: &str) -> bool {
    if key.is_ascii() {
        query
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|word| word.eq_ignore_ascii_case(key))
    } else {
        query.contains(key)
    }
}

fn demo_seeds(query: &str, count: usize) -> Vec<u32> {
    if let Some((_, seeds)) = KEYWORD_SEEDS.iter().find(|(key, _)| matches_keyword(query, key)) {
        return seeds.iter().take(count).copied().collect();
    }
    let digest = Sha256::digest(query.as_bytes());
    let base = u32::from_str_radix(&hex::encode(&digest[..4]), 16).unwrap_or_default() as u64;
    (0..count as u64).map(|i| ((base + i) % 1000) as u32).collect()
}

/// Lorem Picsum placeholders for when nothing real can be found.
pub fn demo_results(query: &str, count: usize) -> Vec<ImageResult> {
    demo_seeds(query, count)
        .into_iter()
        .enumerate()
        .map(|(i, seed)| {
            let url = format!("https://picsum.photos/800/600?random={}", seed);
            ImageResult {
                id: format!("demo_{}_{}", query, i + 1),
                thumb_url: Some(format!("https://picsum.photos/300/200?random={}", seed)),
                title: format!("Sample image: {} #{}", query, i + 1),
                description: format!("A sample image related to '{}'", query),
                width: Some(800),
                height: Some(600),
                source_url: Some("https://picsum.photos".to_string()),
                file_type: "JPG".to_string(),
                platform: "demo".to_string(),
                attribution: "Demo image source: Lorem Picsum".to_string(),
                download_url: url.clone(),
                url,
            }
        })
        .collect()
}

fn api_result(item: &CustomSearchItem, unix: i64) -> ImageResult {
    let image = item.image.clone().unwrap_or_default();
    ImageResult {
        id: format!("{}_{}", item.title.replace(' ', "_"), unix),
        url: item.link.clone(),
        thumb_url: image.thumbnail_link,
        title: item.title.clone(),
        description: item.snippet.clone(),
        width: image.width,
        height: image.height,
        source_url: image.context_link,
        file_type: item.file_format.to_uppercase(),
        platform: "google".to_string(),
        attribution: format!("Source: {}", item.display_link),
        download_url: item.link.clone(),
    }
}

fn scraped_result(query: &str, url: &str, unix: i64, n: usize) -> ImageResult {
    ImageResult {
        id: format!("google_scrape_{}_{}", unix, n),
        url: url.to_string(),
        thumb_url: Some(url.to_string()),
        title: format!("{} - image {}", query, n + 1),
        description: format!("Image related to '{}' found on Google", query),
        width: None,
        height: None,
        source_url: None,
        file_type: extension_from_url(url).to_uppercase(),
        platform: "google".to_string(),
        attribution: "Source: Google Images".to_string(),
        download_url: url.to_string(),
    }
}

/// Turns scraped URLs into at most `per_page` results.
pub fn scraped_results(query: &str, urls: Vec<String>, per_page: usize) -> Vec<ImageResult> {
    let unix = chrono::Utc::now().timestamp();
    prioritize(urls)
        .iter()
        .take(per_page * 3)
        .filter(|url| !should_skip(url))
        .take(per_page)
        .enumerate()
        .map(|(n, url)| scraped_result(query, url, unix, n))
        .collect()
}

/// Reduces a user-supplied filename to a safe basename.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}

pub fn default_download_name(image_url: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "google_img_{}_{}.{}",
        chrono::Utc::now().timestamp(),
        &id[..8],
        extension_from_url(image_url)
    )
}

pub fn search_options() -> SearchOptions {
    let opt = |id, name| SearchOption { id, name };
    SearchOptions {
        sizes: vec![
            opt("any", "Any size"),
            opt("large", "Large"),
            opt("medium", "Medium"),
            opt("icon", "Icon"),
        ],
        types: vec![
            opt("photo", "Photo"),
            opt("clipart", "Clip art"),
            opt("lineart", "Line drawing"),
            opt("face", "Face"),
        ],
        orientations: vec![
            opt("any", "Any orientation"),
            opt("landscape", "Landscape"),
            opt("portrait", "Portrait"),
        ],
    }
}

#[derive(Debug, Clone)]
pub struct ImageSearchService {
    client: GoogleSearchClient,
    download_dir: PathBuf,
}

impl ImageSearchService {
    pub fn new(client: GoogleSearchClient, download_dir: PathBuf) -> Self {
        Self {
            client,
            download_dir,
        }
    }

    pub fn uses_api(&self) -> bool {
        self.client.has_api_credentials()
    }

    pub fn download_dir(&self) -> &PathBuf {
        &self.download_dir
    }

    /// Custom Search API first, then the results page, then demo images.
    pub async fn search(&self, query: &SearchQuery) -> SearchResponse {
        if self.uses_api() {
            match self.search_with_api(query).await {
                Ok(response) => return response,
                Err(e) => tracing::warn!("⚠️ Custom Search failed, falling back to scraping: {}", e),
            }
        }
        self.search_with_scraping(query).await
    }

    async fn search_with_api(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError> {
        let start = page_offset(query).saturating_add(1);
        let img_size = match query.orientation.as_str() {
            "landscape" => "large",
            "portrait" => "medium",
            _ => query.size.as_str(),
        };

        let data = self
            .client
            .search_images(
                &query.query,
                start,
                query.per_page.min(10),
                img_size,
                &query.image_type,
            )
            .await?;

        let unix = chrono::Utc::now().timestamp();
        let results: Vec<ImageResult> = data.items.iter().map(|item| api_result(item, unix)).collect();
        let total = data
            .search_information
            .and_then(|info| info.total_results.parse::<u64>().ok())
            .unwrap_or(results.len() as u64);

        let mut response = SearchResponse::new(&query.query, results, "google");
        response.page = Some(query.page);
        response.per_page = Some(query.per_page);
        response.total_results = total;
        response.message = format!("Found {} images", response.results.len());
        Ok(response)
    }

    async fn search_with_scraping(&self, query: &SearchQuery) -> SearchResponse {
        let per_page = query.per_page as usize;
        let start = page_offset(query);
        let filters = scrape_filters(query);

        let html = match self
            .client
            .fetch_results_page(&query.query, start, filters.as_deref())
            .await
        {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("⚠️ Results page unavailable, showing demo images: {}", e);
                return self.demo_response(&query.query, per_page);
            }
        };

        let urls = extract_image_urls(&html, per_page * 3);
        tracing::info!("🔍 Found {} candidate image URLs for '{}'", urls.len(), query.query);

        let mut results = scraped_results(&query.query, urls, per_page);
        if results.len() < 3 {
            tracing::info!("📷 Few scraped results, topping up with demo images");
            results.extend(demo_results(&query.query, per_page - results.len()));
        }

        let mut response = SearchResponse::new(&query.query, results, "google");
        response.page = Some(query.page);
        response.per_page = Some(query.per_page);
        response.mode = Some("web_scraping".to_string());
        response.message = format!("Found {} images (web scraping mode)", response.results.len());
        response
    }

    fn demo_response(&self, query: &str, per_page: usize) -> SearchResponse {
        let mut response = SearchResponse::new(query, demo_results(query, per_page), "demo");
        response.mode = Some("fallback".to_string());
        response.message = format!(
            "Demo mode: showing {} sample images for \"{}\"",
            response.results.len(),
            query
        );
        response
    }

    pub async fn download(
        &self,
        image_url: &str,
        filename: Option<&str>,
    ) -> Result<DownloadResponse, SearchError> {
        if !(image_url.starts_with("http://") || image_url.starts_with("https://")) {
            return Err(SearchError::InvalidContent(
                "Image URL must start with http:// or https://".to_string(),
            ));
        }

        let filename = filename
            .and_then(sanitize_filename)
            .unwrap_or_else(|| default_download_name(image_url));

        let fetched = self.client.fetch_image(image_url).await?;
        if !fetched.content_type.starts_with("image/") {
            return Err(SearchError::InvalidContent(format!(
                "Not a valid image format: {}",
                fetched.content_type
            )));
        }
        if fetched.bytes.is_empty() {
            return Err(SearchError::InvalidContent("Downloaded file is empty".to_string()));
        }

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let path = self.download_dir.join(&filename);
        tokio::fs::write(&path, &fetched.bytes).await?;

        tracing::info!("✅ Downloaded {} ({} bytes)", filename, fetched.bytes.len());

        Ok(DownloadResponse {
            success: true,
            file_path: path.display().to_string(),
            file_size: fetched.bytes.len() as u64,
            download_url: format!("/static/downloaded_images/{}", filename),
            message: format!("Image downloaded: {}", filename),
            filename,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google_search_client::CustomSearchImage;

    fn query(size: &str, orientation: &str, image_type: &str) -> SearchQuery {
        SearchQuery {
            query: "walrus".into(),
            page: 1,
            per_page: 12,
            orientation: orientation.into(),
            size: size.into(),
            image_type: image_type.into(),
        }
    }

    #[test]
    fn test_scrape_filters() {
        assert_eq!(
            scrape_filters(&query("large", "portrait", "clipart")).as_deref(),
            Some("isz:l,iar:t,itp:clipart")
        );
        assert_eq!(scrape_filters(&query("any", "any", "any")), None);
    }

    #[test]
    fn test_extract_skips_google_assets_and_duplicates() {
        let html = r#"
            <img src="https://www.gstatic.com/images/branding/logo.png">
            "https://upload.wikimedia.org/walrus.jpg"
            "https://upload.wikimedia.org/walrus.jpg"
            <img data-src="https://cdn.example.com/photos/walrus-2.png?w=800">
            "https://encrypted-tbn0.gstatic.com/images?q=tbn:abc"
        "#;
        let urls = extract_image_urls(html, 30);
        assert!(urls.contains(&"https://upload.wikimedia.org/walrus.jpg".to_string()));
        assert!(urls.iter().any(|u| u.starts_with("https://cdn.example.com/photos/walrus-2.png")));
        assert!(urls.iter().all(|u| !u.contains("www.gstatic.com")));
        assert_eq!(
            urls.iter().filter(|u| u.contains("wikimedia")).count(),
            1
        );
    }

    #[test]
    fn test_extract_respects_limit() {
        let html: String = (0..50)
            .map(|i| format!("\"https://img.example.com/p/{}.jpg\"\n", i))
            .collect();
        assert_eq!(extract_image_urls(&html, 9).len(), 9);
    }

    #[test]
    fn test_prioritize_keeps_relative_order() {
        let urls = vec![
            "http://plain.example.com/a.jpg".to_string(),
            "https://encrypted-tbn1.gstatic.com/images?q=1".to_string(),
            "https://images.pexels.com/b.jpeg".to_string(),
            "https://cdn.example.com/c.png".to_string(),
        ];
        let sorted = prioritize(urls);
        assert_eq!(sorted[0], "https://images.pexels.com/b.jpeg");
        assert_eq!(sorted[1], "https://cdn.example.com/c.png");
        assert_eq!(sorted[2], "http://plain.example.com/a.jpg");
    }

    #[test]
    fn test_should_skip() {
        assert!(should_skip("https://example.com/img/1x1_pixel.gif"));
        assert!(should_skip("https://example.com/spacer.gif"));
        assert!(should_skip("https://example.com/Logo_32x32.png"));
        assert!(should_skip("http://a.b/c.jpg"));
        assert!(!should_skip("https://upload.wikimedia.org/walrus.jpg"));
    }

    #[test]
    fn test_scraped_results_shape() {
        let urls = vec![
            "https://example.com/spacer.gif".to_string(),
            "https://upload.wikimedia.org/walrus.png".to_string(),
        ];
        let results = scraped_results("walrus", urls, 12);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "walrus - image 1");
        assert_eq!(results[0].file_type, "PNG");
        assert!(results[0].id.starts_with("google_scrape_"));
    }

    #[test]
    fn test_demo_results_use_keyword_seeds() {
        let results = demo_results("a cute 貓 photo", 8);
        assert_eq!(results.len(), 6);
        assert_eq!(results[0].url, "https://picsum.photos/800/600?random=200");
        assert_eq!(results[0].id, "demo_a cute 貓 photo_1");
        assert_eq!(results[0].platform, "demo");
    }

    #[test]
    fn test_demo_results_hash_seeds_are_stable() {
        let a = demo_results("zeppelin", 4);
        let b = demo_results("zeppelin", 4);
        assert_eq!(a.len(), 4);
        assert_eq!(a[2].url, b[2].url);
    }

    #[test]
    fn test_keyword_seeds_match_whole_words() {
        assert_eq!(demo_seeds("red car at night", 1), vec![500]);
        assert_eq!(demo_seeds("Cat", 1), vec![200]);
        assert_ne!(demo_seeds("cartoon fox", 1), vec![500]);
        assert_ne!(demo_seeds("seahorse", 1), vec![400]);
        assert_eq!(demo_seeds("一台車", 1), vec![500]);
    }

    #[test]
    fn test_page_offset_saturates() {
        let mut q = query("medium", "any", "photo");
        q.page = 3;
        assert_eq!(page_offset(&q), 24);
        q.page = u32::MAX;
        q.per_page = 30;
        assert_eq!(page_offset(&q), u32::MAX);
        q.page = 0;
        assert_eq!(page_offset(&q), 0);
    }

    #[test]
    fn test_api_item_mapping() {
        let item = CustomSearchItem {
            title: "Walrus on ice".into(),
            link: "https://upload.wikimedia.org/walrus.jpg".into(),
            snippet: "A walrus".into(),
            display_link: "commons.wikimedia.org".into(),
            file_format: "image/jpeg".into(),
            image: Some(CustomSearchImage {
                thumbnail_link: Some("https://t/1.jpg".into()),
                width: Some(800),
                height: Some(600),
                context_link: Some("https://commons.wikimedia.org/wiki/Walrus".into()),
            }),
        };
        let result = api_result(&item, 1700000000);
        assert_eq!(result.id, "Walrus_on_ice_1700000000");
        assert_eq!(result.file_type, "IMAGE/JPEG");
        assert_eq!(result.attribution, "Source: commons.wikimedia.org");
        assert_eq!(result.width, Some(800));
    }

    #[test]
    fn test_extension_and_filenames() {
        assert_eq!(extension_from_url("https://x.com/a/b.PNG?size=2"), "png");
        assert_eq!(extension_from_url("https://x.com/a/b.bmp"), "jpg");
        assert_eq!(extension_from_url("https://x.com/a/photo"), "jpg");

        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename("my walrus.jpg").as_deref(), Some("mywalrus.jpg"));
        assert_eq!(sanitize_filename("..").as_deref(), None);

        let name = default_download_name("https://x.com/a.webp");
        assert!(name.starts_with("google_img_"));
        assert!(name.ends_with(".webp"));
    }

    #[test]
    fn test_search_options_lists() {
        let options = search_options();
        assert_eq!(options.sizes.len(), 4);
        assert_eq!(options.types[0].id, "photo");
        assert_eq!(options.orientations.len(), 3);
    }

    #[tokio::test]
    async fn test_download_rejects_non_http_urls() {
        let service = ImageSearchService::new(
            GoogleSearchClient::new(None, None, std::time::Duration::from_secs(1)),
            std::env::temp_dir(),
        );
        let err = service.download("file:///etc/passwd", None).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidContent(_)));
    }
}
