//! In-memory pages for scenario tests

#![allow(dead_code)]

use async_trait::async_trait;
use gridwatch_common::normalize;
use gridwatch_e2e::grid::selectors::*;
use gridwatch_e2e::news::{AGE, MORE_LINK, TITLE_LINK};
use gridwatch_e2e::runner::PageLauncher;
use gridwatch_e2e::{Browser, E2eError, E2eResult, EnvConfig, Page};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn env() -> EnvConfig {
    EnvConfig {
        env: "test".to_string(),
        base_url: "http://grid.test".to_string(),
        browser: Browser::Chromium,
        headless: true,
        step_timeout: Duration::from_secs(30),
    }
}

fn unknown(op: &str, selector: &str) -> E2eError {
    E2eError::Command {
        op: op.to_string(),
        selector: selector.to_string(),
        reason: "no such element".to_string(),
    }
}

fn between<'s>(s: &'s str, start: &str, end: &str) -> Option<&'s str> {
    let from = s.find(start)? + start.len();
    let len = s[from..].find(end)?;
    Some(&s[from..from + len])
}

/// Scripted AG Grid style page
pub struct FakeGrid {
    columns: Vec<String>,
    hidden: Vec<bool>,
    rows: Vec<Vec<String>>,
    sort: Option<(usize, &'static str)>,
    filter: Option<(usize, String)>,
    pending: Option<(usize, String)>,
    footer: String,
    selected: bool,
    panel_open: bool,
    pub visited: Vec<String>,
    pub closes: Arc<AtomicUsize>,
}

impl FakeGrid {
    pub fn new(columns: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            hidden: vec![false; columns.len()],
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            sort: None,
            filter: None,
            pending: None,
            footer: format!("Rows: {}", rows.len()),
            selected: false,
            panel_open: false,
            visited: Vec::new(),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sample grid with a sparse numeric column
    pub fn sample() -> Self {
        Self::new(
            &["Name", "Language", "Country", "Bank Balance"],
            &[
                &["Tony Smith", "English", "Ireland", "1,200"],
                &["Andrew Connell", "French", "France", ""],
                &["Kevin Flanagan", "German", "Germany", "85"],
                &["Tony Blair", "Spanish", "Spain", "40,000"],
                &["Sophie Beckham", "English", "United Kingdom", "3"],
            ],
        )
    }

    pub fn with_footer(mut self, footer: &str) -> Self {
        self.footer = footer.to_string();
        self
    }

    fn visible(&self) -> Vec<usize> {
        (0..self.columns.len()).filter(|&i| !self.hidden[i]).collect()
    }

    fn view(&self) -> Vec<&Vec<String>> {
        let mut rows: Vec<&Vec<String>> = self
            .rows
            .iter()
            .filter(|r| match &self.filter {
                Some((col, token)) => r[*col].to_lowercase().contains(&token.to_lowercase()),
                None => true,
            })
            .collect();

        if let Some((col, dir)) = self.sort {
            rows.sort_by(|a, b| {
                let ord = normalize(&a[col]).compare(&normalize(&b[col]));
                if dir == "descending" {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        rows
    }

    fn cell_column(selector: &str) -> Option<usize> {
        let rest = selector.strip_prefix(ROWS)?;
        let n: usize = between(rest, "aria-colindex=\"", "\"")?.parse().ok()?;
        n.checked_sub(1)
    }

    fn filter_column(selector: &str) -> Option<usize> {
        if !selector.ends_with(TEXT_INPUT) {
            return None;
        }
        let n: usize = between(selector, "aria-colindex=\"", "\"")?.parse().ok()?;
        n.checked_sub(1)
    }

    fn column_named(&self, name: &str) -> Option<usize> {
        let needle = name.to_lowercase();
        self.columns.iter().position(|c| c.to_lowercase().contains(&needle))
    }
}

#[async_trait]
impl Page for FakeGrid {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        self.visited.push(url.to_string());
        Ok(())
    }

    async fn title(&mut self) -> E2eResult<String> {
        Ok("AG Grid Demo".to_string())
    }

    async fn count(&mut self, selector: &str) -> E2eResult<usize> {
        let visible = !self.view().is_empty();
        let n = match selector {
            ROOT | HEADER => 1,
            ROWS => self.view().len(),
            HEADER_CELL => self.visible().len(),
            FIRST_ROW => visible as usize,
            COLUMN_SELECT_ITEM => {
                if self.panel_open {
                    self.columns.len()
                } else {
                    0
                }
            }
            s if s.starts_with(".ag-status-bar >> text=") => 1,
            s if s.starts_with("button[aria-label=\"Columns\"]") => 1,
            s if s.starts_with(SIDE_BAR) => self.panel_open as usize,
            s if s.starts_with(COLUMN_SELECT_ITEM) && s.contains("has-text") => {
                let name = between(s, "has-text(\"", "\")").unwrap_or_default();
                (self.panel_open && self.column_named(name).is_some()) as usize
            }
            s if s.starts_with(".ag-floating-filter[") => Self::filter_column(s).is_some() as usize,
            _ => 0,
        };
        Ok(n)
    }

    async fn inner_texts(&mut self, selector: &str) -> E2eResult<Vec<String>> {
        if selector == HEADER_CELL {
            return Ok(self.visible().iter().map(|&i| self.columns[i].clone()).collect());
        }
        if selector.starts_with(".ag-status-bar") {
            return Ok(vec![self.footer.clone()]);
        }
        if let Some(col) = Self::cell_column(selector) {
            return Ok(self.view().iter().map(|r| r[col].clone()).collect());
        }
        Ok(Vec::new())
    }

    async fn attributes(&mut self, selector: &str, name: &str) -> E2eResult<Vec<Option<String>>> {
        match (selector, name) {
            (HEADER_CELL, "aria-colindex") => Ok(self
                .visible()
                .iter()
                .map(|i| Some((i + 1).to_string()))
                .collect()),
            (HEADER_CELL, "aria-sort") => Ok(self
                .visible()
                .iter()
                .map(|&i| match self.sort {
                    Some((col, dir)) if col == i => Some(dir.to_string()),
                    _ => Some("none".to_string()),
                })
                .collect()),
            (FIRST_ROW, "class") => {
                let class = if self.selected {
                    "ag-row ag-row-selected"
                } else {
                    "ag-row"
                };
                Ok(vec![Some(class.to_string())])
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn click(&mut self, selector: &str, nth: usize) -> E2eResult<()> {
        if selector == HEADER_CELL {
            let col = *self.visible().get(nth).ok_or_else(|| unknown("click", selector))?;
            self.sort = match self.sort {
                Some((c, "ascending")) if c == col => Some((col, "descending")),
                Some((c, "descending")) if c == col => None,
                _ => Some((col, "ascending")),
            };
            return Ok(());
        }
        if selector == FIRST_ROW {
            self.selected = true;
            return Ok(());
        }
        if selector.starts_with("button[aria-label=\"Columns\"]") {
            self.panel_open = true;
            return Ok(());
        }
        if Self::filter_column(selector).is_some() {
            return Ok(());
        }
        Err(unknown("click", selector))
    }

    async fn fill(&mut self, selector: &str, _nth: usize, value: &str) -> E2eResult<()> {
        let col = Self::filter_column(selector).ok_or_else(|| unknown("fill", selector))?;
        self.pending = Some((col, value.to_string()));
        Ok(())
    }

    async fn press(&mut self, selector: &str, _nth: usize, key: &str) -> E2eResult<()> {
        if key != "Enter" {
            return Err(unknown("press", selector));
        }
        if let Some((col, value)) = self.pending.take() {
            self.filter = if value.is_empty() {
                None
            } else {
                Some((col, value))
            };
        }
        Ok(())
    }

    async fn set_checked(&mut self, selector: &str, _nth: usize, checked: bool) -> E2eResult<()> {
        let name = between(selector, "has-text(\"", "\")").ok_or_else(|| unknown("check", selector))?;
        let col = self.column_named(name).ok_or_else(|| unknown("check", selector))?;
        self.hidden[col] = !checked;
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, _timeout: Duration) -> E2eResult<()> {
        if self.count(selector).await? > 0 {
            Ok(())
        } else {
            Err(unknown("wait_for_selector", selector))
        }
    }

    async fn click_and_wait_for_navigation(&mut self, selector: &str, _nth: usize) -> E2eResult<()> {
        Err(unknown("click_and_navigate", selector))
    }

    async fn close(&mut self) -> E2eResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Newest-articles listing split into pages
pub struct FakeNews {
    pages: Vec<Vec<(String, String)>>,
    current: usize,
    pub closes: Arc<AtomicUsize>,
}

impl FakeNews {
    /// `pages` pages of `per_page` articles, newest first
    pub fn descending(pages: usize, per_page: usize) -> Self {
        let start: i64 = 1_714_564_800;
        let mut n = 0;
        let pages = (0..pages)
            .map(|_| {
                (0..per_page)
                    .map(|_| {
                        let ts = start - n * 60;
                        n += 1;
                        let iso = chrono::DateTime::from_timestamp(ts, 0)
                            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
                            .unwrap_or_default();
                        (format!("Article {}", n), format!("{} {}", iso, ts))
                    })
                    .collect()
            })
            .collect();
        Self {
            pages,
            current: 0,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Swap two articles on the first page
    pub fn with_swapped(mut self, a: usize, b: usize) -> Self {
        self.pages[0].swap(a, b);
        self
    }

    /// Replace the age title of one article on the first page
    pub fn with_date(mut self, index: usize, date: &str) -> Self {
        self.pages[0][index].1 = date.to_string();
        self
    }
}

#[async_trait]
impl Page for FakeNews {
    async fn goto(&mut self, _url: &str) -> E2eResult<()> {
        self.current = 0;
        Ok(())
    }

    async fn title(&mut self) -> E2eResult<String> {
        Ok("New Links | Hacker News".to_string())
    }

    async fn count(&mut self, selector: &str) -> E2eResult<usize> {
        Ok(match selector {
            MORE_LINK => (self.current + 1 < self.pages.len()) as usize,
            TITLE_LINK | AGE => self.pages[self.current].len(),
            _ => 0,
        })
    }

    async fn inner_texts(&mut self, selector: &str) -> E2eResult<Vec<String>> {
        match selector {
            TITLE_LINK => Ok(self.pages[self.current].iter().map(|(t, _)| t.clone()).collect()),
            _ => Ok(Vec::new()),
        }
    }

    async fn attributes(&mut self, selector: &str, name: &str) -> E2eResult<Vec<Option<String>>> {
        match (selector, name) {
            (AGE, "title") => Ok(self.pages[self.current]
                .iter()
                .map(|(_, d)| Some(d.clone()))
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    async fn click(&mut self, selector: &str, _nth: usize) -> E2eResult<()> {
        Err(unknown("click", selector))
    }

    async fn fill(&mut self, selector: &str, _nth: usize, _value: &str) -> E2eResult<()> {
        Err(unknown("fill", selector))
    }

    async fn press(&mut self, selector: &str, _nth: usize, _key: &str) -> E2eResult<()> {
        Err(unknown("press", selector))
    }

    async fn set_checked(&mut self, selector: &str, _nth: usize, _checked: bool) -> E2eResult<()> {
        Err(unknown("check", selector))
    }

    async fn wait_for_selector(&mut self, selector: &str, _timeout: Duration) -> E2eResult<()> {
        if self.count(selector).await? > 0 {
            Ok(())
        } else {
            Err(unknown("wait_for_selector", selector))
        }
    }

    async fn click_and_wait_for_navigation(&mut self, selector: &str, _nth: usize) -> E2eResult<()> {
        if selector != MORE_LINK || self.current + 1 >= self.pages.len() {
            return Err(unknown("click_and_navigate", selector));
        }
        self.current += 1;
        Ok(())
    }

    async fn close(&mut self) -> E2eResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Page whose navigation never finishes
pub struct HangingPage {
    pub closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Page for HangingPage {
    async fn goto(&mut self, _url: &str) -> E2eResult<()> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn title(&mut self) -> E2eResult<String> {
        Ok(String::new())
    }

    async fn count(&mut self, _selector: &str) -> E2eResult<usize> {
        Ok(0)
    }

    async fn inner_texts(&mut self, _selector: &str) -> E2eResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn attributes(&mut self, _selector: &str, _name: &str) -> E2eResult<Vec<Option<String>>> {
        Ok(Vec::new())
    }

    async fn click(&mut self, selector: &str, _nth: usize) -> E2eResult<()> {
        Err(unknown("click", selector))
    }

    async fn fill(&mut self, selector: &str, _nth: usize, _value: &str) -> E2eResult<()> {
        Err(unknown("fill", selector))
    }

    async fn press(&mut self, selector: &str, _nth: usize, _key: &str) -> E2eResult<()> {
        Err(unknown("press", selector))
    }

    async fn set_checked(&mut self, selector: &str, _nth: usize, _checked: bool) -> E2eResult<()> {
        Err(unknown("check", selector))
    }

    async fn wait_for_selector(&mut self, selector: &str, _timeout: Duration) -> E2eResult<()> {
        Err(unknown("wait_for_selector", selector))
    }

    async fn click_and_wait_for_navigation(&mut self, selector: &str, _nth: usize) -> E2eResult<()> {
        Err(unknown("click_and_navigate", selector))
    }

    async fn close(&mut self) -> E2eResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Launcher handing out pages built by a factory, counting closes
pub struct FakeLauncher {
    factory: Box<dyn Fn(Arc<AtomicUsize>) -> Box<dyn Page> + Send + Sync>,
    pub launches: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    fail: bool,
}

impl FakeLauncher {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(Arc<AtomicUsize>) -> Box<dyn Page> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            launches: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }
    }

    pub fn grid() -> Self {
        Self::new(|closes| {
            let mut grid = FakeGrid::sample();
            grid.closes = closes;
            Box::new(grid)
        })
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::grid()
        }
    }
}

#[async_trait]
impl PageLauncher for FakeLauncher {
    async fn launch(&self) -> E2eResult<Box<dyn Page>> {
        if self.fail {
            return Err(E2eError::PlaywrightNotFound);
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok((self.factory)(self.closes.clone()))
    }
}
