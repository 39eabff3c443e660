//! gridwatch browser scenarios
//!
//! Drives a real browser through Playwright and checks data grids and
//! paginated listings with the verification engine in `gridwatch-common`:
//! - Reads environment configuration once, before any browser starts
//! - Parses declarative YAML scenario specs
//! - Runs each scenario on its own page and always closes it
//! - Writes a JSON results file
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   TestRunner                                │
//! │    ├── preflight(base_url)                                  │
//! │    ├── PageLauncher::launch() -> Box<dyn Page>              │
//! │    └── run_spec(ScenarioSpec) -> TestResult                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioContext (page + carried state)                     │
//! │    ├── GridPage   sort / filter / columns / footer          │
//! │    └── NewsSource PageSource for collect()                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  gridwatch-common                                           │
//! │    normalize · compare · OrderingVerifier · poll · collect  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod grid;
pub mod news;
pub mod preflight;
pub mod resolver;
pub mod runner;
pub mod scenario;
pub mod spec;
pub mod steps;

pub use config::EnvConfig;
pub use driver::{Browser, Page, PlaywrightPage};
pub use error::{E2eError, E2eResult};
pub use runner::{PageLauncher, TestRunner};
pub use scenario::ScenarioContext;
pub use spec::{ScenarioSpec, Step};
