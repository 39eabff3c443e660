//! Bounded collection of records from a paginated source

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// One structured row of extracted field values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, keeping insertion order
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A paged data source
#[async_trait]
pub trait PageSource: Send {
    /// Records on the currently visible page, in display order
    async fn extract_current_page(&mut self) -> Result<Vec<Record>>;

    /// Whether another page can be requested
    async fn has_next_page(&mut self) -> Result<bool>;

    /// Move to the next page, returning once it is ready
    async fn advance_page(&mut self) -> Result<()>;
}

/// Why a collection stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TargetReached,
    /// The source had no further pages
    Exhausted,
    /// `max_pages` was reached before the target
    PageLimit,
    /// The source failed; the failure is kept on the collection
    Failed,
}

/// Warning raised when a collection stops short of its target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionWarning {
    pub collected: usize,
    pub target: usize,
}

/// Limits for a collection run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectOptions {
    pub target: usize,
    pub max_pages: Option<usize>,
}

impl CollectOptions {
    pub fn new(target: usize) -> Self {
        Self {
            target,
            max_pages: None,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }
}

/// Records gathered by one collection run
#[derive(Debug)]
pub struct Collection {
    records: Vec<Record>,
    target: usize,
    pages_visited: usize,
    stop: StopReason,
    failure: Option<Error>,
}

impl Collection {
    fn new(target: usize) -> Self {
        Self {
            records: Vec::with_capacity(target.min(1024)),
            target,
            pages_visited: 0,
            stop: StopReason::TargetReached,
            failure: None,
        }
    }

    fn remaining(&self) -> usize {
        self.target.saturating_sub(self.records.len())
    }

    fn fail(mut self, err: Error) -> Self {
        warn!(
            "Collection failed after {} record(s) on page {}: {}",
            self.records.len(),
            self.pages_visited,
            err
        );
        self.stop = StopReason::Failed;
        self.failure = Some(err);
        self
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn pages_visited(&self) -> usize {
        self.pages_visited
    }

    pub fn stop_reason(&self) -> &StopReason {
        &self.stop
    }

    pub fn failure(&self) -> Option<&Error> {
        self.failure.as_ref()
    }

    /// Shortfall warning when the source ran out before the target
    pub fn warning(&self) -> Option<CollectionWarning> {
        match self.stop {
            StopReason::Exhausted | StopReason::PageLimit => Some(CollectionWarning {
                collected: self.records.len(),
                target: self.target,
            }),
            _ => None,
        }
    }

    /// Records, provided the target was met exactly
    pub fn require_target(self) -> Result<Vec<Record>> {
        if let Some(err) = self.failure {
            return Err(err);
        }
        if self.records.len() < self.target {
            return Err(Error::CollectionExhausted {
                collected: self.records.len(),
                target: self.target,
            });
        }
        Ok(self.records)
    }
}

/// Collect up to `target` records from `source`
pub async fn collect<S>(source: &mut S, target: usize) -> Collection
where
    S: PageSource + ?Sized,
{
    collect_with(source, CollectOptions::new(target)).await
}

/// Collect records from `source` under `options`
///
/// Stops when the target is met, the source has no further page, or a
/// source call fails. Records gathered before a failure are kept.
pub async fn collect_with<S>(source: &mut S, options: CollectOptions) -> Collection
where
    S: PageSource + ?Sized,
{
    let mut collection = Collection::new(options.target);

    while collection.remaining() > 0 {
        let page = match source.extract_current_page().await {
            Ok(page) => page,
            Err(e) => return collection.fail(e),
        };
        collection.pages_visited += 1;

        let take = collection.remaining().min(page.len());
        collection.records.extend(page.into_iter().take(take));
        debug!(
            "Page {}: took {} record(s), {} of {} collected",
            collection.pages_visited,
            take,
            collection.records.len(),
            collection.target
        );

        if collection.remaining() == 0 {
            break;
        }

        if let Some(max) = options.max_pages {
            if collection.pages_visited >= max {
                collection.stop = StopReason::PageLimit;
                break;
            }
        }

        match source.has_next_page().await {
            Ok(true) => {}
            Ok(false) => {
                collection.stop = StopReason::Exhausted;
                break;
            }
            Err(e) => return collection.fail(e),
        }

        if let Err(e) = source.advance_page().await {
            return collection.fail(e);
        }
    }

    if let Some(w) = collection.warning() {
        info!(
            "Source exhausted: collected {} of {} record(s)",
            w.collected, w.target
        );
    }

    collection
}
