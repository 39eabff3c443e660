//! Step execution against a scenario context

use futures::FutureExt;
use gridwatch_common::{collect, poll_with, Error, FieldKind, OrderingVerifier};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::grid::{GridPage, DEFAULT_VALUE_LIMIT};
use crate::news::fields;
use crate::scenario::ScenarioContext;
use crate::spec::Step;

/// Result of executing a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
    /// Non-fatal finding, such as a short article collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Execute one step, bounded by the configured step timeout
pub async fn execute_step(ctx: &mut ScenarioContext, step: &Step) -> StepResult {
    let start = Instant::now();
    let step_name = step.name();
    let limit = ctx.config.step_timeout;

    debug!("Executing step: {}", step_name);

    let outcome = match tokio::time::timeout(limit, run_step(ctx, step)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(E2eError::Timeout(format!(
            "step '{}' after {} ms",
            step_name,
            limit.as_millis()
        ))),
    };

    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(warning) => {
            if let Some(w) = &warning {
                warn!("{}: {}", step_name, w);
            }
            StepResult {
                success: true,
                step_name,
                duration_ms,
                error: None,
                warning,
            }
        }
        Err(e) => StepResult {
            success: false,
            step_name,
            duration_ms,
            error: Some(e.to_string()),
            warning: None,
        },
    }
}

/// Run a step, returning a warning when it passed with a caveat
async fn run_step(ctx: &mut ScenarioContext, step: &Step) -> E2eResult<Option<String>> {
    match step {
        Step::OpenBase { path, expect_title } => {
            let url = ctx.config.url(path.as_deref().unwrap_or(""));
            info!("Opening {}", url);
            ctx.page().goto(&url).await?;

            if let Some(expected) = expect_title {
                let title = ctx.page().title().await?;
                if !title.contains(expected.as_str()) {
                    return Err(E2eError::AssertionFailed(format!(
                        "Page title \"{}\" does not contain \"{}\"",
                        title, expected
                    )));
                }
            }
        }

        Step::WaitForGrid { timeout_ms } => {
            let mut timing = ctx.timing;
            if let Some(ms) = timeout_ms {
                timing.load.deadline = Duration::from_millis(*ms);
            }
            GridPage::new(ctx.page()).with_timing(timing).wait_for_load().await?;
        }

        Step::AssertRowsRendered => {
            let rows = ctx.grid().row_count().await?;
            if rows == 0 {
                return Err(E2eError::AssertionFailed("Grid rendered no rows".to_string()));
            }
            debug!("{} row(s) rendered", rows);
        }

        Step::AssertHeaders { headers } => {
            let labels = ctx.grid().header_labels().await?;
            let missing: Vec<&str> = headers
                .iter()
                .filter(|h| {
                    let needle = h.to_lowercase();
                    !labels.iter().any(|l| l.to_lowercase().contains(&needle))
                })
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Err(Error::not_found("Header", &missing.join(", "), labels).into());
            }
        }

        Step::AssertFooter { contains } => {
            let footer = ctx.grid().footer().await?;
            if !footer.text.to_lowercase().contains(&contains.to_lowercase()) {
                return Err(E2eError::AssertionFailed(format!(
                    "Footer \"{}\" does not contain \"{}\"",
                    footer.text, contains
                )));
            }
            info!("Footer reports {} row(s)", footer.rows);
        }

        Step::Sort { column, direction } => {
            let mut grid = ctx.grid();
            let resolved = grid.sort(column, *direction).await?;
            let values = grid.column_values(&resolved, DEFAULT_VALUE_LIMIT).await?;
            ctx.state.last_column = Some(resolved.label);
            ctx.state.last_values = values;
        }

        Step::AssertSorted {
            column,
            direction,
            kind,
            min_non_empty,
            limit,
        } => {
            let resolved = ctx.grid().column(column).await?;

            // Reuse the values read right after sorting this column
            let values = if limit.is_none()
                && ctx.state.last_column.as_deref() == Some(resolved.label.as_str())
            {
                ctx.state.last_values.clone()
            } else {
                ctx.grid()
                    .column_values(&resolved, limit.unwrap_or(DEFAULT_VALUE_LIMIT))
                    .await?
            };

            let mut verifier = OrderingVerifier::new(*direction).with_kind(*kind);
            if let Some(fraction) = min_non_empty {
                verifier = verifier.with_min_non_empty(*fraction);
            }
            let report = verifier.check(&resolved.label, &values)?;
            info!(
                "'{}' is {} ({}/{} non-empty)",
                resolved.label, direction, report.non_empty, report.total
            );
        }

        Step::Filter { column, token } => {
            if ctx.state.initial_row_count.is_none() {
                let rows = ctx.grid().row_count().await?;
                ctx.state.initial_row_count = Some(rows);
            }
            let resolved = ctx.grid().filter(column, token).await?;
            debug!("Filtered '{}' by \"{}\"", resolved.label, token);
        }

        Step::AssertFiltered { column, token } => {
            let mut grid = ctx.grid();
            let resolved = grid.column(column).await?;
            let values = grid.wait_for_filtered(&resolved, token).await?;
            debug!("{} value(s) match \"{}\"", values.len(), token);
        }

        Step::ClearFilter { column } => {
            ctx.grid().clear_filter(column).await?;
        }

        Step::AssertUnfiltered => {
            let initial = ctx.state.initial_row_count.ok_or_else(|| E2eError::StepFailed {
                step: step.name(),
                reason: "no filter was applied earlier in the scenario".to_string(),
            })?;
            let rows = ctx.grid().wait_for_rows(initial).await?;
            debug!("{} row(s) after clearing (was {})", rows, initial);
        }

        Step::OpenColumnsPanel => ctx.grid().open_columns_panel().await?,

        Step::SetColumnVisible { column, visible } => {
            ctx.grid().set_column_visible(column, *visible).await?
        }

        Step::AssertHeaderVisible { column, visible } => {
            let present = ctx.grid().has_header(column).await?;
            if present != *visible {
                return Err(E2eError::AssertionFailed(format!(
                    "Header '{}' expected {} but is {}",
                    column,
                    if *visible { "visible" } else { "hidden" },
                    if present { "visible" } else { "hidden" }
                )));
            }
        }

        Step::SelectFirstRow => ctx.grid().select_first_row().await?,

        Step::AssertFirstRowSelected => {
            let settle = ctx.timing.settle;
            poll_with(
                ctx.page(),
                |page| async move { GridPage::new(page).is_first_row_selected().await }.boxed(),
                settle,
            )
            .await
            .into_result("first row to be selected")?;
        }

        Step::CollectArticles { target } => {
            let collection = collect(&mut ctx.news(), *target).await;
            info!(
                "Collected {} of {} article(s) from {} page(s)",
                collection.len(),
                collection.target(),
                collection.pages_visited()
            );

            if let Some(failure) = collection.failure() {
                return Err(E2eError::StepFailed {
                    step: step.name(),
                    reason: format!(
                        "collection failed after {} article(s): {}",
                        collection.len(),
                        failure
                    ),
                });
            }

            let warning = collection.warning().map(|w| {
                format!(
                    "listing ran out after {} of {} article(s)",
                    w.collected, w.target
                )
            });
            ctx.state.articles = Some(collection);
            return Ok(warning);
        }

        Step::AssertArticlesSorted { direction, exact } => {
            let articles = ctx.state.articles.as_ref().ok_or_else(|| E2eError::StepFailed {
                step: step.name(),
                reason: "no articles were collected earlier in the scenario".to_string(),
            })?;

            let shortfall = articles.warning();
            if *exact {
                if let Some(w) = &shortfall {
                    return Err(Error::CollectionExhausted {
                        collected: w.collected,
                        target: w.target,
                    }
                    .into());
                }
            }

            if let Some(record) = articles
                .records()
                .iter()
                .find(|r| r.get(fields::PUBLISHED).map_or(true, |p| p.trim().is_empty()))
            {
                return Err(E2eError::AssertionFailed(format!(
                    "Invalid date for article '{}': '{}'",
                    record.get(fields::TITLE).unwrap_or(""),
                    record.get(fields::DATE).unwrap_or("")
                )));
            }

            let report = OrderingVerifier::new(*direction)
                .with_kind(FieldKind::Number)
                .with_min_non_empty(1.0)
                .check_field(articles.records(), fields::PUBLISHED)?;
            info!(
                "{} article(s) ordered {} by publication time",
                report.total, direction
            );

            return Ok(shortfall.map(|w| {
                format!("checked {} of {} requested article(s)", w.collected, w.target)
            }));
        }

        Step::Sleep { ms } => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }

        Step::Log { message } => {
            info!("[scenario] {}", message);
        }
    }

    Ok(None)
}
