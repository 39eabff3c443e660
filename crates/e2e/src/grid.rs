//! Data-grid page object
//!
//! Semantic operations over an AG Grid style data grid: load checks, header
//! lookup, column values, sorting, floating filters and column visibility.

use futures::FutureExt;
use gridwatch_common::{parse_number, poll_with, Direction, Error, PollOptions};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info};

use crate::driver::Page;
use crate::error::{E2eError, E2eResult};
use crate::resolver::{Resolver, Strategy};

/// Grid selectors
pub mod selectors {
    pub const ROOT: &str = ".ag-root";
    pub const HEADER: &str = ".ag-header";
    pub const HEADER_CELL: &str = ".ag-header-row-column .ag-header-cell";
    pub const ROWS: &str = ".ag-center-cols-container .ag-row";
    pub const FIRST_ROW: &str = ".ag-center-cols-container .ag-row[row-index=\"0\"]";
    pub const TEXT_INPUT: &str = ".ag-input-field-input.ag-text-field-input";
    pub const STATUS_BAR: &str = ".ag-status-bar";
    pub const SIDE_BAR: &str = ".ag-side-bar";
    pub const TOOL_PANEL: &str = ".ag-tool-panel-wrapper";
    pub const COLUMN_SELECT_ITEM: &str = ".ag-column-select-column";
}

use selectors::*;

/// Default number of rendered rows read per column
pub const DEFAULT_VALUE_LIMIT: usize = 50;

static ROW_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d[\d,.]*)").expect("row count pattern is valid"));

/// A resolved grid column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Header text as rendered
    pub label: String,
    /// Zero-based position among header cells
    pub position: usize,
    /// `aria-colindex` of the header cell, when present
    pub colindex: Option<u32>,
}

impl Column {
    /// Selector matching this column's rendered body cells
    pub fn cell_selector(&self) -> String {
        match self.colindex {
            Some(n) => format!("{} .ag-cell[aria-colindex=\"{}\"]", ROWS, n),
            None => format!("{} .ag-cell:nth-child({})", ROWS, self.position + 1),
        }
    }
}

/// Footer row summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    pub text: String,
    pub rows: u64,
}

/// Timing knobs for grid interactions
#[derive(Debug, Clone, Copy)]
pub struct GridTiming {
    /// Deadline for the grid to render its first row
    pub load: PollOptions,
    /// Deadline for a UI reaction (sort indicator, filter, panel)
    pub settle: PollOptions,
    /// Pause after the grid reports ready
    pub stabilize: Duration,
}

impl Default for GridTiming {
    fn default() -> Self {
        Self {
            load: PollOptions::from_millis(15_000, 100),
            settle: PollOptions::from_millis(5_000, 100),
            stabilize: Duration::from_millis(150),
        }
    }
}

/// Grid operations over a borrowed page
pub struct GridPage<'a> {
    page: &'a mut dyn Page,
    timing: GridTiming,
}

impl<'a> GridPage<'a> {
    pub fn new(page: &'a mut dyn Page) -> Self {
        Self {
            page,
            timing: GridTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: GridTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Wait until the grid root, header and at least one row are rendered
    ///
    /// Fails if the page logged console errors while loading.
    pub async fn wait_for_load(&mut self) -> E2eResult<Duration> {
        let deadline = self.timing.load.deadline;
        self.page.wait_for_selector(ROOT, deadline).await?;
        self.page.wait_for_selector(HEADER, deadline).await?;

        let elapsed = poll_with(
            &mut *self.page,
            |page| async move { Ok::<_, E2eError>(page.count(ROWS).await? > 0) }.boxed(),
            self.timing.load,
        )
        .await
        .into_result("grid rows")?;

        let errors = self.page.console_errors().await?;
        if !errors.is_empty() {
            return Err(E2eError::AssertionFailed(format!(
                "Console errors detected while loading grid:\n{}",
                errors.join("\n")
            )));
        }

        tokio::time::sleep(self.timing.stabilize).await;
        info!("Grid loaded in {:?}", elapsed);
        Ok(elapsed)
    }

    pub async fn row_count(&mut self) -> E2eResult<usize> {
        self.page.count(ROWS).await
    }

    /// Rendered header labels, trimmed
    pub async fn header_labels(&mut self) -> E2eResult<Vec<String>> {
        let labels = self.page.inner_texts(HEADER_CELL).await?;
        Ok(labels.into_iter().map(|l| l.trim().to_string()).collect())
    }

    /// Whether any header label contains `name`, ignoring case
    pub async fn has_header(&mut self, name: &str) -> E2eResult<bool> {
        let needle = name.to_lowercase();
        Ok(self
            .header_labels()
            .await?
            .iter()
            .any(|l| l.to_lowercase().contains(&needle)))
    }

    /// Find a column by case-insensitive partial label match
    pub async fn column(&mut self, name: &str) -> E2eResult<Column> {
        let labels = self.header_labels().await?;
        let needle = name.to_lowercase();

        let position = labels
            .iter()
            .position(|l| l.to_lowercase().contains(&needle))
            .ok_or_else(|| Error::not_found("Column", name, labels.clone()))?;

        let colindex = self
            .page
            .attribute(HEADER_CELL, position, "aria-colindex")
            .await?
            .and_then(|v| v.trim().parse().ok());

        Ok(Column {
            label: labels[position].clone(),
            position,
            colindex,
        })
    }

    /// Currently rendered values of `column`, at most `limit`
    pub async fn column_values(&mut self, column: &Column, limit: usize) -> E2eResult<Vec<String>> {
        let mut values = self.page.inner_texts(&column.cell_selector()).await?;
        values.truncate(limit);
        debug!("Read {} value(s) from '{}'", values.len(), column.label);
        Ok(values.into_iter().map(|v| v.trim().to_string()).collect())
    }

    /// Parse the row count out of the status bar
    pub async fn footer(&mut self) -> E2eResult<Footer> {
        let resolved = Resolver::new("row summary footer")
            .or(Strategy::text(STATUS_BAR, "Rows"))
            .or(Strategy::text("body", "Rows :"))
            .resolve(self.page)
            .await?;

        let texts = self.page.inner_texts(&resolved.selector).await?;
        let text = texts
            .iter()
            .find(|t| t.to_lowercase().contains("rows"))
            .or_else(|| texts.first())
            .cloned()
            .unwrap_or_default();

        let rows = parse_row_count(&text).ok_or_else(|| {
            E2eError::AssertionFailed(format!(
                "Could not parse a numeric row count from footer text: \"{}\"",
                text
            ))
        })?;

        Ok(Footer { text, rows })
    }

    /// Click the column header until its sort indicator shows `direction`
    pub async fn sort(&mut self, name: &str, direction: Direction) -> E2eResult<Column> {
        let column = self.column(name).await?;
        let wanted = direction.aria_sort();
        let position = column.position;

        // Headers cycle none -> ascending -> descending
        for click in 1..=3 {
            let before = self.sort_state(position).await?;
            if before.as_deref() == Some(wanted) {
                debug!("'{}' sorted {} after {} click(s)", column.label, wanted, click - 1);
                return Ok(column);
            }
            self.page.click(HEADER_CELL, position).await?;

            let changed = poll_with(
                &mut *self.page,
                |page| {
                    let before = before.clone();
                    async move {
                        let state = page.attribute(HEADER_CELL, position, "aria-sort").await?;
                        Ok::<_, E2eError>(state != before)
                    }
                    .boxed()
                },
                self.timing.settle.with_interval(Duration::from_millis(50)),
            )
            .await;

            if !changed.satisfied {
                break;
            }
        }

        match self.sort_state(position).await?.as_deref() {
            Some(state) if state == wanted => Ok(column),
            state => Err(E2eError::StepFailed {
                step: format!("sort:{}", name),
                reason: format!(
                    "header never showed aria-sort=\"{}\" (last: {:?})",
                    wanted, state
                ),
            }),
        }
    }

    async fn sort_state(&mut self, position: usize) -> E2eResult<Option<String>> {
        self.page.attribute(HEADER_CELL, position, "aria-sort").await
    }

    fn filter_input(column: &Column) -> Resolver {
        let mut resolver = Resolver::new(format!("floating filter for '{}'", column.label));
        if let Some(n) = column.colindex {
            resolver = resolver.or(Strategy::css(format!(
                ".ag-floating-filter[aria-colindex=\"{}\"] {}",
                n, TEXT_INPUT
            )));
            resolver = resolver.or(Strategy::css(format!("[aria-colindex=\"{}\"] {}", n, TEXT_INPUT)));
        }
        resolver.or(Strategy::css(TEXT_INPUT))
    }

    /// Type `token` into the column's floating filter and apply it
    pub async fn filter(&mut self, name: &str, token: &str) -> E2eResult<Column> {
        let column = self.column(name).await?;
        let input = Self::filter_input(&column).resolve(self.page).await?;

        self.page.click(&input.selector, 0).await?;
        self.page.fill(&input.selector, 0, "").await?;
        self.page.fill(&input.selector, 0, token).await?;
        self.page.press(&input.selector, 0, "Enter").await?;

        info!("Filtered '{}' by \"{}\"", column.label, token);
        Ok(column)
    }

    /// Clear the column's floating filter
    pub async fn clear_filter(&mut self, name: &str) -> E2eResult<()> {
        let column = self.column(name).await?;
        let input = Self::filter_input(&column).resolve(self.page).await?;

        self.page.fill(&input.selector, 0, "").await?;
        self.page.press(&input.selector, 0, "Enter").await?;
        Ok(())
    }

    /// Wait until every rendered value of `column` contains `token`
    ///
    /// Blank cells are ignored; at least one non-blank value is required.
    pub async fn wait_for_filtered(&mut self, column: &Column, token: &str) -> E2eResult<Vec<String>> {
        let selector = column.cell_selector();
        let needle = token.to_lowercase();

        let result = poll_with(
            &mut *self.page,
            |page| {
                let selector = selector.clone();
                let needle = needle.clone();
                async move {
                    let values = page.inner_texts(&selector).await?;
                    Ok::<_, E2eError>(all_contain(&values, &needle))
                }
                .boxed()
            },
            self.timing.settle,
        )
        .await;

        let values = self.column_values(column, usize::MAX).await?;
        if result.satisfied {
            return Ok(values);
        }

        let offending: Vec<&String> = values
            .iter()
            .filter(|v| !v.trim().is_empty() && !v.to_lowercase().contains(&needle))
            .collect();
        Err(E2eError::AssertionFailed(format!(
            "'{}' values do not all contain \"{}\" after {:?}; offending: {:?}",
            column.label, token, result.elapsed, offending
        )))
    }

    /// Wait until at least `min_rows` rows are rendered
    pub async fn wait_for_rows(&mut self, min_rows: usize) -> E2eResult<usize> {
        poll_with(
            &mut *self.page,
            |page| async move { Ok::<_, E2eError>(page.count(ROWS).await? >= min_rows) }.boxed(),
            self.timing.settle,
        )
        .await
        .into_result(&format!("at least {} grid row(s)", min_rows))?;
        self.row_count().await
    }

    /// Open the Columns tool panel
    pub async fn open_columns_panel(&mut self) -> E2eResult<()> {
        if self.page.count(COLUMN_SELECT_ITEM).await? > 0 {
            return Ok(());
        }

        let tab = Resolver::new("Columns side button")
            .or(Strategy::attribute("button", "aria-label", "Columns"))
            .or(Strategy::text(".ag-side-buttons", "Columns"))
            .or(Strategy::css(".ag-side-button"))
            .try_resolve(self.page)
            .await?;

        if let Some(tab) = tab {
            self.page.click(&tab.selector, 0).await?;
        }

        poll_with(
            &mut *self.page,
            |page| {
                async move {
                    let panels = page.count(&format!("{}, {}", SIDE_BAR, TOOL_PANEL)).await?;
                    Ok::<_, E2eError>(panels > 0)
                }
                .boxed()
            },
            self.timing.settle,
        )
        .await
        .into_result("Columns panel")?;
        Ok(())
    }

    /// Show or hide a column through the Columns panel checkbox
    pub async fn set_column_visible(&mut self, name: &str, visible: bool) -> E2eResult<()> {
        let checkbox = Resolver::new(format!("Columns panel checkbox for '{}'", name))
            .or(Strategy::css(format!(
                "{}:has-text(\"{}\") input[type=\"checkbox\"]",
                COLUMN_SELECT_ITEM, name
            )))
            .or(Strategy::css(format!(
                "{} >> text={} >> xpath=.. >> input[type=\"checkbox\"]",
                TOOL_PANEL, name
            )))
            .resolve(self.page)
            .await?;

        self.page.set_checked(&checkbox.selector, 0, visible).await?;

        let needle = name.to_lowercase();
        poll_with(
            &mut *self.page,
            |page| {
                let needle = needle.clone();
                async move {
                    let labels = page.inner_texts(HEADER_CELL).await?;
                    let present = labels.iter().any(|l| l.to_lowercase().contains(&needle));
                    Ok::<_, E2eError>(present == visible)
                }
                .boxed()
            },
            self.timing.settle,
        )
        .await
        .into_result(&format!(
            "column '{}' to be {}",
            name,
            if visible { "shown" } else { "hidden" }
        ))?;
        Ok(())
    }

    /// Select the first rendered row via its checkbox, or by clicking it
    pub async fn select_first_row(&mut self) -> E2eResult<()> {
        let target = Resolver::new("first row")
            .or(Strategy::css(format!("{} input[type=\"checkbox\"]", FIRST_ROW)))
            .or(Strategy::css(FIRST_ROW))
            .or(Strategy::css(ROWS))
            .resolve(self.page)
            .await?;
        self.page.click(&target.selector, 0).await
    }

    pub async fn is_first_row_selected(&mut self) -> E2eResult<bool> {
        let class = match self.page.attribute(FIRST_ROW, 0, "class").await? {
            Some(class) => Some(class),
            None => self.page.attribute(ROWS, 0, "class").await?,
        };
        Ok(class
            .map(|c| c.split_whitespace().any(|c| c == "ag-row-selected"))
            .unwrap_or(false))
    }
}

fn all_contain(values: &[String], needle: &str) -> bool {
    let mut non_blank = values.iter().filter(|v| !v.trim().is_empty()).peekable();
    non_blank.peek().is_some() && non_blank.all(|v| v.to_lowercase().contains(needle))
}

/// Extract a whole row count from the first numeric run in `text`
pub fn parse_row_count(text: &str) -> Option<u64> {
    let run = ROW_COUNT
        .captures(text)?
        .get(1)?
        .as_str()
        .trim_end_matches(|c| c == '.' || c == ',');
    let rows = parse_number(run)?;
    (rows >= 0.0 && rows.fract() == 0.0).then_some(rows as u64)
}
