//! Feed icon loading.
//!
//! A terminal cannot draw a favicon, so a loaded icon is represented by a
//! single glyph (the uppercase initial of the site's host). What matters is
//! whether the site actually serves an icon: a row only shows the glyph
//! after a successful load.

use async_trait::async_trait;
use lru::LruCache;
use reqwest::redirect::Policy;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::models::WebFeed;
use crate::util::{check_fetch_url, UrlCheckError};

/// Largest icon body accepted.
const MAX_ICON_SIZE: usize = 1024 * 1024;

const DEFAULT_CACHE_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedIcon {
    pub glyph: char,
    pub source: String,
}

#[derive(Debug, Error)]
pub enum IconError {
    #[error("Feed has no URL to derive an icon from")]
    NoSource,
    #[error("Refusing icon URL: {0}")]
    Url(#[from] UrlCheckError),
    #[error("Icon request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Icon response was empty or larger than 1 MiB")]
    BadBody,
}

/// Supplies icons for feeds. Loading may fail; failure is `None`.
#[async_trait]
pub trait IconLoader: Send + Sync {
    async fn load_icon(&self, feed: &WebFeed) -> Option<FeedIcon>;
}

/// HTTP client for icon requests: small idle pool, at most 3 redirects,
/// and no redirect loops.
pub fn icon_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(Policy::custom(|attempt| {
            if attempt.previous().len() >= 3 {
                return attempt.error("Too many redirects (max 3)");
            }
            if attempt
                .previous()
                .iter()
                .any(|prev| prev.as_str() == attempt.url().as_str())
            {
                return attempt.error("Redirect loop detected");
            }
            attempt.follow()
        }))
        .pool_max_idle_per_host(2)
        .timeout(timeout)
        .build()
}

/// Fetches `/favicon.ico` (or the feed's explicit icon URL) over HTTP and
/// remembers the outcome per URL.
pub struct FaviconLoader {
    client: reqwest::Client,
    timeout: Duration,
    allow_local: bool,
    cache: Mutex<LruCache<String, Option<FeedIcon>>>,
}

impl FaviconLoader {
    pub fn new(client: reqwest::Client, timeout: Duration, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size)
            .or(NonZeroUsize::new(DEFAULT_CACHE_SIZE))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            client,
            timeout,
            allow_local: false,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Permit loopback/private hosts (for local test servers).
    pub fn allow_local_hosts(mut self) -> Self {
        self.allow_local = true;
        self
    }

    /// The URL the icon is requested from: the feed's icon URL if it has
    /// one, else `/favicon.ico` on the home page host, else on the feed host.
    ///
    /// # Arguments
    ///
    /// * `feed` - The feed whose icon is wanted
    ///
    /// # Returns
    ///
    /// A URL that passed the fetch check and may be requested as is.
    ///
    /// # Errors
    ///
    /// - [`IconError::NoSource`] if the feed has neither an icon, a home page
    ///   nor a feed URL
    /// - [`IconError::Url`] if the chosen URL fails [`check_fetch_url`]
    pub fn icon_url(&self, feed: &WebFeed) -> Result<Url, IconError> {
        if let Some(icon_url) = &feed.icon_url {
            return Ok(check_fetch_url(icon_url, self.allow_local)?);
        }
        let base = feed
            .home_page_url
            .as_deref()
            .unwrap_or(feed.url.as_str());
        if base.is_empty() {
            return Err(IconError::NoSource);
        }
        let base = check_fetch_url(base, self.allow_local)?;
        Ok(base
            .join("/favicon.ico")
            .map_err(UrlCheckError::from)?)
    }

    async fn fetch(&self, url: &Url) -> Result<FeedIcon, IconError> {
        let response = tokio::time::timeout(self.timeout, self.client.get(url.as_str()).send())
            .await
            .map_err(|_| IconError::Timeout)??;

        if !response.status().is_success() {
            return Err(IconError::HttpStatus(response.status().as_u16()));
        }
        if response
            .content_length()
            .is_some_and(|len| len as usize > MAX_ICON_SIZE)
        {
            return Err(IconError::BadBody);
        }

        let body = tokio::time::timeout(self.timeout, response.bytes())
            .await
            .map_err(|_| IconError::Timeout)??;
        if body.is_empty() || body.len() > MAX_ICON_SIZE {
            return Err(IconError::BadBody);
        }

        Ok(FeedIcon {
            glyph: host_initial(url),
            source: url.to_string(),
        })
    }

    fn cached(&self, key: &str) -> Option<Option<FeedIcon>> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn remember(&self, key: String, icon: Option<FeedIcon>) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, icon);
    }
}

#[async_trait]
impl IconLoader for FaviconLoader {
    async fn load_icon(&self, feed: &WebFeed) -> Option<FeedIcon> {
        let url = match self.icon_url(feed) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(feed_id = %feed.feed_id, error = %e, "No usable icon URL");
                return None;
            }
        };

        let key = url.to_string();
        if let Some(hit) = self.cached(&key) {
            return hit;
        }

        let icon = match self.fetch(&url).await {
            Ok(icon) => Some(icon),
            Err(e) => {
                tracing::debug!(feed_id = %feed.feed_id, url = %url, error = %e, "Icon load failed");
                None
            }
        };
        self.remember(key, icon.clone());
        icon
    }
}

/// Uppercase first alphanumeric character of the host, skipping `www.`.
fn host_initial(url: &Url) -> char {
    url.host_str()
        .map(|h| h.strip_prefix("www.").unwrap_or(h))
        .and_then(|h| h.chars().find(char::is_ascii_alphanumeric))
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('#')
}
