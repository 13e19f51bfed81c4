use std::time::Duration;

/// Base URL to select reports by id
pub const DEFAULT_EVENT_URL: &str = "http://www.ufostalker.com:8080/event";

/// Base URL to select reports by term
pub const DEFAULT_SEARCH_URL: &str = "http://ufostalker.com:8080/search";

/// Geocoding service queried when a report carries no coordinates
pub const DEFAULT_GEOCODE_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Organization who logged the sightings
pub const SOURCE: &str = "MUFON";

/// Number of items per page when a term search is used
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Time between requests in milliseconds
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 5000;

/// Custom user agent; the default one is blocked upstream
pub const USER_AGENT: &str = "mufon-crawler";

/// Endpoint and rate-limit settings shared by both crawl modes.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub event_url: String,
    pub search_url: String,
    pub geocode_url: String,
    pub page_size: usize,
    pub request_delay: Duration,
}

impl CrawlerConfig {
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.request_delay = Duration::from_millis(delay_ms);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            event_url: DEFAULT_EVENT_URL.to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            geocode_url: DEFAULT_GEOCODE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
        }
    }
}
