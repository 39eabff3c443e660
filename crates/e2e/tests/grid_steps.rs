//! Grid scenario steps against an in-memory grid

mod support;

use gridwatch_common::{Direction, FieldKind};
use gridwatch_e2e::grid::GridPage;
use gridwatch_e2e::steps::execute_step;
use gridwatch_e2e::{ScenarioContext, Step};
use support::{env, FakeGrid};

fn sort(column: &str, direction: Direction) -> Step {
    Step::Sort {
        column: column.to_string(),
        direction,
    }
}

fn assert_sorted(column: &str, direction: Direction, kind: FieldKind) -> Step {
    Step::AssertSorted {
        column: column.to_string(),
        direction,
        kind,
        min_non_empty: None,
        limit: None,
    }
}

async fn run(ctx: &mut ScenarioContext, steps: &[Step]) {
    for step in steps {
        let result = execute_step(ctx, step).await;
        assert!(result.success, "{} failed: {:?}", result.step_name, result.error);
    }
}

#[tokio::test(start_paused = true)]
async fn test_grid_loads_and_shows_headers() {
    let mut ctx = ScenarioContext::new(Box::new(FakeGrid::sample()), env());
    run(
        &mut ctx,
        &[
            Step::OpenBase {
                path: None,
                expect_title: Some("AG Grid".to_string()),
            },
            Step::WaitForGrid { timeout_ms: None },
            Step::AssertRowsRendered,
            Step::AssertHeaders {
                headers: vec!["name".to_string(), "Language".to_string()],
            },
            Step::AssertFooter {
                contains: "Rows".to_string(),
            },
        ],
    )
    .await;
    assert_eq!(ctx.grid().footer().await.unwrap().rows, 5);
}

#[tokio::test(start_paused = true)]
async fn test_missing_header_lists_candidates() {
    let mut ctx = ScenarioContext::new(Box::new(FakeGrid::sample()), env());
    let result = execute_step(
        &mut ctx,
        &Step::AssertHeaders {
            headers: vec!["Salary".to_string()],
        },
    )
    .await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.contains("Salary"), "{}", error);
    assert!(error.contains("Name, Language, Country, Bank Balance"), "{}", error);
}

#[tokio::test(start_paused = true)]
async fn test_sort_both_directions() {
    let mut ctx = ScenarioContext::new(Box::new(FakeGrid::sample()), env());
    run(
        &mut ctx,
        &[
            sort("language", Direction::Ascending),
            assert_sorted("language", Direction::Ascending, FieldKind::Auto),
            sort("language", Direction::Descending),
            assert_sorted("language", Direction::Descending, FieldKind::Auto),
            sort("balance", Direction::Descending),
            assert_sorted("balance", Direction::Descending, FieldKind::Number),
        ],
    )
    .await;

    assert_eq!(ctx.state.last_column.as_deref(), Some("Bank Balance"));
    assert_eq!(ctx.state.last_values[0], "40,000");
    assert_eq!(ctx.state.last_values.last().map(String::as_str), Some(""));
}

#[tokio::test(start_paused = true)]
async fn test_unsorted_column_reports_violation() {
    let mut ctx = ScenarioContext::new(Box::new(FakeGrid::sample()), env());
    let result = execute_step(
        &mut ctx,
        &assert_sorted("Name", Direction::Ascending, FieldKind::Text),
    )
    .await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.contains("Name"), "{}", error);
    assert!(error.contains("Tony Smith"), "{}", error);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_column_fails_sort() {
    let mut ctx = ScenarioContext::new(Box::new(FakeGrid::sample()), env());
    let result = execute_step(&mut ctx, &sort("Salary", Direction::Ascending)).await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("Candidates"));
}

#[tokio::test(start_paused = true)]
async fn test_filter_and_clear() {
    let mut ctx = ScenarioContext::new(Box::new(FakeGrid::sample()), env());
    run(
        &mut ctx,
        &[
            Step::Filter {
                column: "Name".to_string(),
                token: "tony".to_string(),
            },
            Step::AssertFiltered {
                column: "Name".to_string(),
                token: "Tony".to_string(),
            },
        ],
    )
    .await;
    assert_eq!(ctx.state.initial_row_count, Some(5));
    assert_eq!(ctx.grid().row_count().await.unwrap(), 2);

    run(
        &mut ctx,
        &[
            Step::ClearFilter {
                column: "Name".to_string(),
            },
            Step::AssertUnfiltered,
        ],
    )
    .await;
    assert_eq!(ctx.grid().row_count().await.unwrap(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_filtered_assertion_times_out_on_mismatch() {
    let mut ctx = ScenarioContext::new(Box::new(FakeGrid::sample()), env());
    let result = execute_step(
        &mut ctx,
        &Step::AssertFiltered {
            column: "Name".to_string(),
            token: "tony".to_string(),
        },
    )
    .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("Andrew Connell"));
}

#[tokio::test(start_paused = true)]
async fn test_unfiltered_requires_prior_filter() {
    let mut ctx = ScenarioContext::new(Box::new(FakeGrid::sample()), env());
    let result = execute_step(&mut ctx, &Step::AssertUnfiltered).await;
    assert!(!result.success);
}

#[tokio::test(start_paused = true)]
async fn test_hide_and_show_column() {
    let mut ctx = ScenarioContext::new(Box::new(FakeGrid::sample()), env());
    run(
        &mut ctx,
        &[
            Step::OpenColumnsPanel,
            Step::SetColumnVisible {
                column: "Country".to_string(),
                visible: false,
            },
            Step::AssertHeaderVisible {
                column: "Country".to_string(),
                visible: false,
            },
            Step::SetColumnVisible {
                column: "Country".to_string(),
                visible: true,
            },
            Step::AssertHeaderVisible {
                column: "Country".to_string(),
                visible: true,
            },
        ],
    )
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_select_first_row() {
    let mut ctx = ScenarioContext::new(Box::new(FakeGrid::sample()), env());
    let before = execute_step(&mut ctx, &Step::AssertFirstRowSelected).await;
    assert!(!before.success);

    run(&mut ctx, &[Step::SelectFirstRow, Step::AssertFirstRowSelected]).await;
}

#[tokio::test(start_paused = true)]
async fn test_footer_without_count_fails() {
    let grid = FakeGrid::sample().with_footer("Rows: loading");
    let mut ctx = ScenarioContext::new(Box::new(grid), env());
    let result = execute_step(
        &mut ctx,
        &Step::AssertFooter {
            contains: "Rows".to_string(),
        },
    )
    .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("Rows: loading"));
}

#[tokio::test(start_paused = true)]
async fn test_column_lookup_is_partial_and_case_insensitive() {
    let mut grid = FakeGrid::sample();
    let mut page = GridPage::new(&mut grid);

    let column = page.column("bank").await.unwrap();
    assert_eq!(column.label, "Bank Balance");
    assert_eq!(column.position, 3);
    assert_eq!(column.colindex, Some(4));

    let values = page.column_values(&column, 2).await.unwrap();
    assert_eq!(values, vec!["1,200", ""]);
}

#[tokio::test(start_paused = true)]
async fn test_min_non_empty_threshold_decides_sparse_column() {
    let mut ctx = ScenarioContext::new(Box::new(FakeGrid::sample()), env());
    run(&mut ctx, &[sort("balance", Direction::Descending)]).await;

    let step = |fraction: f64| Step::AssertSorted {
        column: "balance".to_string(),
        direction: Direction::Descending,
        kind: FieldKind::Number,
        min_non_empty: Some(fraction),
        limit: None,
    };

    // Four of five balances are filled in
    let strict = execute_step(&mut ctx, &step(0.9)).await;
    assert!(!strict.success);
    assert!(strict.error.unwrap().contains("Insufficient data"));

    let lenient = execute_step(&mut ctx, &step(0.75)).await;
    assert!(lenient.success, "{:?}", lenient.error);
}
