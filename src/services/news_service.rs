use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::Mutex;
use tracing::warn;

use crate::errors::{LauncherError, Result};
use crate::models::NewsItem;

const DEFAULT_NEWS_URL: &str = "https://hytale.com/news";
const CACHE_TTL: Duration = Duration::from_secs(5 * 60);
const USER_AGENT: &str = "HyPrism/1.0";

static ARTICLE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a[^>]+href="(/news/\d+/\d+/[^"]+)"[^>]*>([\s\S]*?)</a>"#)
        .expect("article link pattern")
});
static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<h[1-6][^>]*>([^<]+)</h[1-6]>|<strong>([^<]+)</strong>")
        .expect("heading pattern")
});
static ARTICLE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2}(?:st|nd|rd|th)?\s+\d{4}",
    )
    .expect("date pattern")
});
static AUTHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Posted by ([^<\n]+)").expect("author pattern"));
static OG_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<meta[^>]+property=["']og:image["'][^>]+content=["']([^"']+)["']"#)
        .expect("og:image pattern")
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

struct NewsCache {
    items: Vec<NewsItem>,
    fetched_at: Instant,
}

/// Scrapes the official news page. Completely independent of session state;
/// a fetch failure serves whatever was cached and never produces a visible
/// launcher error.
pub struct NewsService {
    client: reqwest::Client,
    base_url: String,
    cache: Mutex<Option<NewsCache>>,
}

impl NewsService {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_NEWS_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(6))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url,
            cache: Mutex::new(None),
        }
    }

    /// Returns up to `limit` articles, newest first. Served from cache for
    /// five minutes; a failed refresh falls back to the stale cache.
    pub async fn get_news(&self, limit: usize) -> Result<Vec<NewsItem>> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < CACHE_TTL && !cached.items.is_empty() {
                return Ok(truncated(&cached.items, limit));
            }
        }

        match self.fetch(limit).await {
            Ok(items) => {
                *cache = Some(NewsCache {
                    items: items.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(truncated(&items, limit))
            }
            Err(err) => match cache.as_ref() {
                Some(stale) if !stale.items.is_empty() => {
                    warn!(%err, "news refresh failed, serving stale cache");
                    Ok(truncated(&stale.items, limit))
                }
                _ => Err(err),
            },
        }
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<NewsItem>> {
        let response = self.client.get(&self.base_url).send().await?;
        if !response.status().is_success() {
            return Err(LauncherError::Backend(format!(
                "news page returned HTTP {}",
                response.status().as_u16()
            )));
        }
        let body = response.text().await?;
        let mut items = parse_news_html(&body, limit);

        for item in &mut items {
            if let Some(image) = self.fetch_article_image(&item.url).await {
                item.image_url = image;
            }
        }
        Ok(items)
    }

    /// Best-effort og:image lookup on the article page itself.
    async fn fetch_article_image(&self, url: &str) -> Option<String> {
        let response = self.client.get(url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body = response.text().await.ok()?;
        OG_IMAGE
            .captures(&body)
            .map(|captures| captures[1].to_string())
    }
}

impl Default for NewsService {
    fn default() -> Self {
        Self::new()
    }
}

fn truncated(items: &[NewsItem], limit: usize) -> Vec<NewsItem> {
    items.iter().take(limit).cloned().collect()
}

fn parse_news_html(html: &str, limit: usize) -> Vec<NewsItem> {
    let mut items = Vec::new();

    for captures in ARTICLE_LINK.captures_iter(html) {
        if items.len() >= limit {
            break;
        }
        let path = &captures[1];
        let content = &captures[2];

        // Short anchors are navigation, not articles.
        if content.len() < 50 {
            continue;
        }

        let title = HEADING
            .captures(content)
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| first_line(&strip_html(content)));
        if title.is_empty() {
            continue;
        }

        let date = ARTICLE_DATE
            .find(content)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let author = AUTHOR
            .captures(content)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_default();

        let mut excerpt = strip_html(content);
        if let Some(stripped) = excerpt.strip_prefix(title.as_str()) {
            excerpt = stripped.trim().to_string();
        }
        let excerpt = truncate_at(&excerpt, 200);

        items.push(NewsItem {
            title,
            excerpt,
            url: format!("https://hytale.com{path}"),
            date,
            author,
            image_url: String::new(),
        });
    }

    items
}

fn first_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    truncate_at(line, 100)
}

/// Byte-length cap that never splits a UTF-8 character.
fn truncate_at(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

fn strip_html(content: &str) -> String {
    let without_tags = TAG.replace_all(content, " ");
    WHITESPACE.replace_all(&without_tags, " ").trim().to_string()
}
