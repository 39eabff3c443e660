//! Declarative YAML scenario specification

use gridwatch_common::{Direction, FieldKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{E2eError, E2eResult};

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order
    pub steps: Vec<Step>,
}

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to the base URL (or a path below it)
    OpenBase {
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        expect_title: Option<String>,
    },

    /// Wait for the grid root, header and first row
    WaitForGrid {
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// At least one data row is rendered
    AssertRowsRendered,

    /// Every listed header is rendered
    AssertHeaders { headers: Vec<String> },

    /// The footer row summary contains `contains` and a numeric count
    AssertFooter { contains: String },

    /// Sort a column through its header
    Sort { column: String, direction: Direction },

    /// The values read after the last sort are ordered
    AssertSorted {
        column: String,
        direction: Direction,
        #[serde(default)]
        kind: FieldKind,
        #[serde(default)]
        min_non_empty: Option<f64>,
        /// Rendered rows read from the column
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Apply a floating filter
    Filter { column: String, token: String },

    /// Every rendered cell of the column contains the token
    AssertFiltered { column: String, token: String },

    /// Clear a floating filter
    ClearFilter { column: String },

    /// Rows are back to at least the pre-filter count
    AssertUnfiltered,

    /// Open the Columns side panel
    OpenColumnsPanel,

    /// Toggle a column through the Columns panel
    SetColumnVisible { column: String, visible: bool },

    /// A header is (or is not) present
    AssertHeaderVisible { column: String, visible: bool },

    /// Select the first rendered row
    SelectFirstRow,

    /// The first rendered row is selected
    AssertFirstRowSelected,

    /// Gather articles from the paginated listing
    CollectArticles { target: usize },

    /// Collected articles are ordered by publication time
    AssertArticlesSorted {
        #[serde(default = "default_article_direction")]
        direction: Direction,
        /// Require the full target count
        #[serde(default)]
        exact: bool,
    },

    /// Wait a fixed amount of time (use sparingly)
    Sleep { ms: u64 },

    /// Log a message (for debugging)
    Log { message: String },
}

fn default_article_direction() -> Direction {
    Direction::Descending
}

impl Step {
    /// Short label used in logs and results
    pub fn name(&self) -> String {
        match self {
            Step::OpenBase { path, .. } => format!("open_base:{}", path.as_deref().unwrap_or("/")),
            Step::WaitForGrid { .. } => "wait_for_grid".to_string(),
            Step::AssertRowsRendered => "assert_rows_rendered".to_string(),
            Step::AssertHeaders { headers } => format!("assert_headers:{}", headers.join(",")),
            Step::AssertFooter { contains } => format!("assert_footer:{}", contains),
            Step::Sort { column, direction } => format!("sort:{}:{}", column, direction),
            Step::AssertSorted { column, direction, .. } => {
                format!("assert_sorted:{}:{}", column, direction)
            }
            Step::Filter { column, token } => format!("filter:{}={}", column, token),
            Step::AssertFiltered { column, token } => format!("assert_filtered:{}={}", column, token),
            Step::ClearFilter { column } => format!("clear_filter:{}", column),
            Step::AssertUnfiltered => "assert_unfiltered".to_string(),
            Step::OpenColumnsPanel => "open_columns_panel".to_string(),
            Step::SetColumnVisible { column, visible } => {
                format!("set_column_visible:{}={}", column, visible)
            }
            Step::AssertHeaderVisible { column, visible } => {
                format!("assert_header_visible:{}={}", column, visible)
            }
            Step::SelectFirstRow => "select_first_row".to_string(),
            Step::AssertFirstRowSelected => "assert_first_row_selected".to_string(),
            Step::CollectArticles { target } => format!("collect_articles:{}", target),
            Step::AssertArticlesSorted { direction, .. } => {
                format!("assert_articles_sorted:{}", direction)
            }
            Step::Sleep { ms } => format!("sleep:{}ms", ms),
            Step::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }
}

impl ScenarioSpec {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        if spec.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("Scenario '{}' has no steps", spec.name)));
        }
        Ok(spec)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory, sorted by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        if !dir.is_dir() {
            return Err(E2eError::SpecParse(format!(
                "Scenario directory not found: {}",
                dir.display()
            )));
        }

        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let spec = Self::from_file(entry.path())?;
            specs.push(spec);
        }

        Ok(specs)
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }
}
