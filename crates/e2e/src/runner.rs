//! Scenario runner: loads specs, launches one page per scenario, runs steps

use async_trait::async_trait;
use gridwatch_common::PollOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::{EnvConfig, DEFAULT_STEP_TIMEOUT_MS};
use crate::driver::{Page, PlaywrightConfig, PlaywrightPage};
use crate::error::{E2eError, E2eResult};
use crate::grid::GridTiming;
use crate::preflight;
use crate::scenario::ScenarioContext;
use crate::spec::ScenarioSpec;
use crate::steps::{execute_step, StepResult};

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl TestResult {
    fn failed(name: &str, error: String) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            duration_ms: 0,
            steps: vec![],
            warnings: vec![],
            error: Some(error),
        }
    }
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    /// Warnings from every scenario, prefixed with the scenario name
    #[serde(default)]
    pub warnings: Vec<String>,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Opens a fresh page for each scenario
#[async_trait]
pub trait PageLauncher: Send + Sync {
    async fn launch(&self) -> E2eResult<Box<dyn Page>>;
}

/// Launches Playwright-driven browser pages
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
}

impl PlaywrightLauncher {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }

    /// Launcher for the browser and head mode selected by `env`
    pub fn for_env(env: &EnvConfig) -> Self {
        Self::new(PlaywrightConfig {
            browser: env.browser,
            headless: env.headless,
            ..PlaywrightConfig::default()
        })
    }
}

#[async_trait]
impl PageLauncher for PlaywrightLauncher {
    async fn launch(&self) -> E2eResult<Box<dyn Page>> {
        let page = PlaywrightPage::launch(&self.config).await?;
        Ok(Box::new(page))
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub specs_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Only run scenarios carrying this tag
    pub tag: Option<String>,
    /// Only run the scenario with this name
    pub name: Option<String>,
    /// Upper bound for a single step
    pub step_timeout: Duration,
    /// Deadline for the grid to render its first row
    pub grid_load_timeout: Duration,
    /// Check the base URL is reachable before launching browsers
    pub preflight: bool,
    pub preflight_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            specs_dir: PathBuf::from("specs"),
            output_dir: PathBuf::from("test-results"),
            tag: None,
            name: None,
            step_timeout: Duration::from_millis(DEFAULT_STEP_TIMEOUT_MS),
            grid_load_timeout: Duration::from_secs(15),
            preflight: true,
            preflight_timeout: Duration::from_secs(30),
        }
    }
}

/// Main scenario runner
pub struct TestRunner {
    config: RunnerConfig,
    env: EnvConfig,
    launcher: Box<dyn PageLauncher>,
}

impl TestRunner {
    pub fn new(config: RunnerConfig, env: EnvConfig, launcher: Box<dyn PageLauncher>) -> Self {
        Self {
            config,
            env,
            launcher,
        }
    }

    /// Runner that drives real browsers through Playwright
    pub fn with_playwright(config: RunnerConfig, env: EnvConfig) -> Self {
        let launcher = PlaywrightLauncher::for_env(&env);
        Self::new(config, env, Box::new(launcher))
    }

    /// Load specs, applying the configured tag and name filters
    pub fn load_specs(&self) -> E2eResult<Vec<ScenarioSpec>> {
        let mut specs = ScenarioSpec::load_all(&self.config.specs_dir)?;

        if let Some(tag) = &self.config.tag {
            specs.retain(|s| s.tags.iter().any(|t| t == tag));
        }
        if let Some(name) = &self.config.name {
            specs.retain(|s| &s.name == name);
            if specs.is_empty() {
                return Err(E2eError::SpecParse(format!("Scenario not found: {}", name)));
            }
        }

        debug!("Loaded {} scenario(s) from {}", specs.len(), self.config.specs_dir.display());
        Ok(specs)
    }

    /// Run every scenario selected by the configuration
    pub async fn run_all(&self) -> E2eResult<TestSuiteResult> {
        let specs = self.load_specs()?;
        self.run_specs(&specs).await
    }

    /// Run a specific scenario by name
    pub async fn run_test(&self, name: &str) -> E2eResult<TestResult> {
        let specs = ScenarioSpec::load_all(&self.config.specs_dir)?;
        let spec = specs
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Scenario not found: {}", name)))?;

        self.preflight().await?;
        Ok(self.run_spec(&spec).await)
    }

    /// Poll the base URL until reachable, when enabled
    pub async fn preflight(&self) -> E2eResult<()> {
        if !self.config.preflight {
            return Ok(());
        }
        let options = PollOptions::new(self.config.preflight_timeout)
            .with_interval(Duration::from_millis(500));
        preflight::wait_for_reachable(&self.env.base_url, options).await?;
        Ok(())
    }

    /// Run a list of scenarios sequentially
    pub async fn run_specs(&self, specs: &[ScenarioSpec]) -> E2eResult<TestSuiteResult> {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut warnings = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        if !specs.is_empty() {
            self.preflight().await?;
        }

        info!("Running {} scenario(s) against {} ({})...", specs.len(), self.env.base_url, self.env.env);

        for spec in specs {
            let result = self.run_spec(spec).await;
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            warnings.extend(result.warnings.iter().map(|w| format!("{}: {}", result.name, w)));
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!("Scenario results: {} passed, {} failed ({} ms)", passed, failed, duration_ms);
        for w in &warnings {
            warn!("{}", w);
        }

        Ok(TestSuiteResult {
            total: specs.len(),
            passed,
            failed,
            duration_ms,
            warnings,
            results,
        })
    }

    fn timing(&self) -> GridTiming {
        let mut timing = GridTiming::default();
        timing.load.deadline = self.config.grid_load_timeout;
        timing
    }

    /// Run a single scenario on a freshly launched page
    ///
    /// Steps stop at the first failure. The page is closed on every path.
    pub async fn run_spec(&self, spec: &ScenarioSpec) -> TestResult {
        let start = Instant::now();
        debug!("Running scenario: {}", spec.name);

        let page = match self.launcher.launch().await {
            Ok(page) => page,
            Err(e) => return TestResult::failed(&spec.name, format!("Failed to launch page: {}", e)),
        };

        let mut env = self.env.clone();
        env.step_timeout = self.config.step_timeout;
        let mut ctx = ScenarioContext::new(page, env).with_timing(self.timing());

        let mut step_results = Vec::new();
        let mut warnings = Vec::new();
        let mut test_error: Option<String> = None;

        for step in &spec.steps {
            let result = execute_step(&mut ctx, step).await;
            if let Some(w) = &result.warning {
                warnings.push(w.clone());
            }

            if !result.success {
                test_error = result
                    .error
                    .as_ref()
                    .map(|e| format!("{}: {}", result.step_name, e));
                step_results.push(result);
                break;
            }
            step_results.push(result);
        }

        if let Err(e) = ctx.close().await {
            warnings.push(format!("page did not close cleanly: {}", e));
        }

        TestResult {
            name: spec.name.clone(),
            success: test_error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps: step_results,
            warnings,
            error: test_error,
        }
    }

    /// Write suite results to `test-results.json` in the output directory
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.config.output_dir, results)
    }
}

/// Write suite results to `test-results.json` under `output_dir`
pub fn write_results(output_dir: &Path, results: &TestSuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("test-results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}
