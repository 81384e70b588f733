use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::LookupError;
use crate::page::parse_shabbat_page;
use crate::times::CalendarTimes;

pub const DEFAULT_BASE_URL: &str = "https://www.yeshiva.org.il/calendar/shabatot";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const USER_AGENT: &str = concat!("luz/", env!("CARGO_PKG_VERSION"));

/// Calendar pages are a few hundred KiB at most.
pub const MAX_PAGE_BYTES: u64 = 8 * 1024 * 1024;

/// Source of the upcoming Shabbat times for a named place.
pub trait TimeLookup {
    fn lookup(&self, place: &str) -> Result<CalendarTimes, LookupError>;
}

impl<T: TimeLookup + ?Sized> TimeLookup for &T {
    fn lookup(&self, place: &str) -> Result<CalendarTimes, LookupError> {
        (**self).lookup(place)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Looks times up on the calendar web service. Requests are synchronous.
#[derive(Debug, Clone)]
pub struct HttpTimeLookup {
    client: Client,
    config: CalendarConfig,
}

impl HttpTimeLookup {
    pub fn new(config: CalendarConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn fetch_page(&self, place: &str) -> Result<String, LookupError> {
        let http = |source: reqwest::Error| LookupError::Http {
            place: place.to_string(),
            source,
        };

        log::debug!("fetching calendar page for `{place}` from {}", self.config.base_url);
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[("place", place)])
            .send()
            .map_err(http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                place: place.to_string(),
                status: status.as_u16(),
            });
        }
        if let Some(len) = response.content_length() {
            if len > MAX_PAGE_BYTES {
                return Err(LookupError::unexpected(format!(
                    "calendar page too large (limit {MAX_PAGE_BYTES} bytes, Content-Length {len} bytes)"
                )));
            }
        }

        let body = response.bytes().map_err(http)?;
        if body.len() as u64 > MAX_PAGE_BYTES {
            return Err(LookupError::unexpected(format!(
                "calendar page too large (limit {MAX_PAGE_BYTES} bytes, received {} bytes)",
                body.len()
            )));
        }
        String::from_utf8(body.to_vec())
            .map_err(|_| LookupError::unexpected("calendar page is not valid UTF-8"))
    }
}

impl TimeLookup for HttpTimeLookup {
    fn lookup(&self, place: &str) -> Result<CalendarTimes, LookupError> {
        let html = self.fetch_page(place)?;
        let times = parse_shabbat_page(&html, place)?;
        log::info!(
            "calendar: {} (portion {}, entry {}, exit {})",
            times.place,
            times.portion,
            times.entry,
            times.exit
        );
        Ok(times)
    }
}

/// In-memory lookup, for tests and offline use.
#[derive(Debug, Clone, Default)]
pub struct StaticTimeLookup {
    places: HashMap<String, CalendarTimes>,
}

impl StaticTimeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `times` under its own `place`.
    pub fn insert(&mut self, times: CalendarTimes) -> Option<CalendarTimes> {
        self.places.insert(times.place.clone(), times)
    }

    #[must_use]
    pub fn with(mut self, times: CalendarTimes) -> Self {
        self.insert(times);
        self
    }
}

impl TimeLookup for StaticTimeLookup {
    fn lookup(&self, place: &str) -> Result<CalendarTimes, LookupError> {
        self.places
            .get(place)
            .cloned()
            .ok_or_else(|| LookupError::PlaceNotFound {
                place: place.to_string(),
            })
    }
}
