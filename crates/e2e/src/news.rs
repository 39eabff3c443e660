//! Paginated news listing as a record source

use async_trait::async_trait;
use chrono::NaiveDateTime;
use gridwatch_common::{PageSource, Record, Result};
use std::time::Duration;
use tracing::debug;

use crate::driver::Page;

pub const TITLE_LINK: &str = "span.titleline > a";
pub const AGE: &str = "span.age";
pub const MORE_LINK: &str = "a.morelink";

/// Field names on collected article records
pub mod fields {
    pub const TITLE: &str = "title";
    /// Raw `title` attribute of the age span
    pub const DATE: &str = "date";
    /// Publication time as epoch seconds, blank when unparseable
    pub const PUBLISHED: &str = "published";
}

/// Newest-articles listing, one page of articles at a time
pub struct NewsSource<'a> {
    page: &'a mut dyn Page,
    ready_timeout: Duration,
}

impl<'a> NewsSource<'a> {
    pub fn new(page: &'a mut dyn Page) -> Self {
        Self {
            page,
            ready_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }
}

#[async_trait]
impl<'a> PageSource for NewsSource<'a> {
    async fn extract_current_page(&mut self) -> Result<Vec<Record>> {
        self.page.wait_for_selector(AGE, self.ready_timeout).await?;

        let titles = self.page.inner_texts(TITLE_LINK).await?;
        let dates = self.page.attributes(AGE, "title").await?;

        let records: Vec<Record> = titles
            .into_iter()
            .zip(dates)
            .filter_map(|(title, date)| {
                let date = date?.trim().to_string();
                if date.is_empty() {
                    return None;
                }
                let published = parse_published(&date)
                    .map(|ts| ts.to_string())
                    .unwrap_or_default();
                Some(
                    Record::new()
                        .with(fields::TITLE, title.trim())
                        .with(fields::DATE, date)
                        .with(fields::PUBLISHED, published),
                )
            })
            .collect();

        debug!("Extracted {} article(s)", records.len());
        Ok(records)
    }

    async fn has_next_page(&mut self) -> Result<bool> {
        Ok(self.page.count(MORE_LINK).await? > 0)
    }

    async fn advance_page(&mut self) -> Result<()> {
        self.page.click_and_wait_for_navigation(MORE_LINK, 0).await?;
        Ok(())
    }
}

/// Parse an age-span timestamp into epoch seconds
///
/// Accepts `2024-05-01T12:00:00 1714564800` (ISO time followed by epoch
/// seconds) and a bare `2024-05-01T12:00:00`, read as UTC.
pub fn parse_published(raw: &str) -> Option<i64> {
    let mut parts = raw.split_whitespace();
    let iso = parts.next()?;

    if let Some(epoch) = parts.next().and_then(|p| p.parse::<i64>().ok()) {
        return Some(epoch);
    }

    NaiveDateTime::parse_from_str(iso.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}
