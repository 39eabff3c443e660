//! Per-scenario context
//!
//! Owns the page handle and the values steps hand to one another. A context
//! lives for exactly one scenario and is closed when the scenario ends.

use gridwatch_common::Collection;
use tracing::warn;

use crate::config::EnvConfig;
use crate::driver::Page;
use crate::error::E2eResult;
use crate::grid::{GridPage, GridTiming};
use crate::news::NewsSource;

/// Values carried between the steps of one scenario
#[derive(Debug, Default)]
pub struct ScenarioState {
    /// Column most recently sorted
    pub last_column: Option<String>,
    /// Rendered values read right after the last sort
    pub last_values: Vec<String>,
    /// Row count before the first filter was applied
    pub initial_row_count: Option<usize>,
    /// Articles gathered from the news listing
    pub articles: Option<Collection>,
}

/// Everything a step may touch while a scenario runs
pub struct ScenarioContext {
    page: Box<dyn Page>,
    pub config: EnvConfig,
    pub timing: GridTiming,
    pub state: ScenarioState,
    closed: bool,
}

impl ScenarioContext {
    pub fn new(page: Box<dyn Page>, config: EnvConfig) -> Self {
        Self {
            page,
            config,
            timing: GridTiming::default(),
            state: ScenarioState::default(),
            closed: false,
        }
    }

    pub fn with_timing(mut self, timing: GridTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn page(&mut self) -> &mut dyn Page {
        self.page.as_mut()
    }

    /// Grid view over the scenario's page
    pub fn grid(&mut self) -> GridPage<'_> {
        GridPage::new(self.page.as_mut()).with_timing(self.timing)
    }

    /// News listing over the scenario's page
    pub fn news(&mut self) -> NewsSource<'_> {
        NewsSource::new(self.page.as_mut()).with_ready_timeout(self.timing.load.deadline)
    }

    /// Release the page; later calls are no-ops
    pub async fn close(&mut self) -> E2eResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.page.close().await.map_err(|e| {
            warn!("Error closing page: {}", e);
            e
        })
    }
}
